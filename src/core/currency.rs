#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Currency {
    pub code: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
}

pub const CURRENCIES: &[Currency] = &[
    Currency { code: "USD", symbol: "$", name: "US Dollar" },
    Currency { code: "EUR", symbol: "€", name: "Euro" },
    Currency { code: "GBP", symbol: "£", name: "British Pound" },
    Currency { code: "INR", symbol: "₹", name: "Indian Rupee" },
    Currency { code: "CAD", symbol: "C$", name: "Canadian Dollar" },
    Currency { code: "AUD", symbol: "A$", name: "Australian Dollar" },
    Currency { code: "JPY", symbol: "¥", name: "Japanese Yen" },
    Currency { code: "CNY", symbol: "¥", name: "Chinese Yuan" },
    Currency { code: "CHF", symbol: "CHF", name: "Swiss Franc" },
    Currency { code: "SEK", symbol: "kr", name: "Swedish Krona" },
    Currency { code: "NZD", symbol: "NZ$", name: "New Zealand Dollar" },
    Currency { code: "MXN", symbol: "MX$", name: "Mexican Peso" },
    Currency { code: "SGD", symbol: "S$", name: "Singapore Dollar" },
    Currency { code: "HKD", symbol: "HK$", name: "Hong Kong Dollar" },
    Currency { code: "NOK", symbol: "kr", name: "Norwegian Krone" },
    Currency { code: "KRW", symbol: "₩", name: "South Korean Won" },
    Currency { code: "TRY", symbol: "₺", name: "Turkish Lira" },
    Currency { code: "RUB", symbol: "₽", name: "Russian Ruble" },
    Currency { code: "BRL", symbol: "R$", name: "Brazilian Real" },
    Currency { code: "ZAR", symbol: "R", name: "South African Rand" },
];

// Currencies written with the symbol after the amount
const SUFFIX_SYMBOL: &[&str] = &["EUR", "SEK", "NOK"];

pub fn find_currency(code: &str) -> Option<&'static Currency> {
    CURRENCIES.iter().find(|c| c.code.eq_ignore_ascii_case(code))
}

pub fn currency_symbol(code: &str) -> &'static str {
    find_currency(code).map(|c| c.symbol).unwrap_or("$")
}

pub fn currency_name(code: &str) -> &'static str {
    find_currency(code).map(|c| c.name).unwrap_or("US Dollar")
}

/// Formats `amount` with two decimals and the currency's symbol.
pub fn format_currency(amount: f64, code: &str) -> String {
    let symbol = currency_symbol(code);
    let formatted = format!("{:.2}", amount);
    if SUFFIX_SYMBOL.iter().any(|c| c.eq_ignore_ascii_case(code)) {
        format!("{}{}", formatted, symbol)
    } else {
        format!("{}{}", symbol, formatted)
    }
}
