//! # Display Formatting
//!
//! Pure helpers used by tables, cards and exports to render numbers, dates,
//! postal codes and stock levels.

use chrono::{DateTime, NaiveDate, Utc};

use crate::i18n::{Language, Message};
use crate::types::StockStatus;

/// Inserts a thousands separator into a non-negative integer.
///
/// ```rust
/// use estoque_core::format::group_thousands;
///
/// assert_eq!(group_thousands(1234567, '.'), "1.234.567");
/// assert_eq!(group_thousands(999, ','), "999");
/// ```
pub fn group_thousands(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

/// Formats an integer count with the language's thousands separator.
pub fn format_number(value: i64, language: Language) -> String {
    let (thousands, _) = language.separators();
    let grouped = group_thousands(value.unsigned_abs(), thousands);
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Formats a calendar date: `31/12/2024` (pt-BR, es) or `12/31/2024` (en).
pub fn format_date(date: NaiveDate, language: Language) -> String {
    match language {
        Language::En => date.format("%m/%d/%Y").to_string(),
        Language::PtBr | Language::Es => date.format("%d/%m/%Y").to_string(),
    }
}

/// Formats a timestamp as date plus 24h time (UTC).
pub fn format_datetime(timestamp: DateTime<Utc>, language: Language) -> String {
    format!(
        "{} {}",
        format_date(timestamp.date_naive(), language),
        timestamp.format("%H:%M")
    )
}

/// ISO `YYYY-MM-DD`, used in export file names.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats 8 postal-code digits as `12345-678`.
///
/// Anything that is not exactly 8 digits is returned unchanged.
pub fn format_postal_code(digits: &str) -> String {
    if digits.len() == 8 && digits.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}", &digits[..5], &digits[5..])
    } else {
        digits.to_string()
    }
}

/// Translated label for a stock status.
pub fn stock_status_label(status: StockStatus, language: Language) -> &'static str {
    let message = match status {
        StockStatus::InStock => Message::StockInStock,
        StockStatus::Low => Message::StockLow,
        StockStatus::Out => Message::StockOut,
    };
    language.translations().get(message)
}

/// Stock level with its unit, e.g. `1.200 un`.
pub fn format_stock(quantity: i64, unit: &str, language: Language) -> String {
    format!("{} {}", format_number(quantity, language), unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0, '.'), "0");
        assert_eq!(group_thousands(100, '.'), "100");
        assert_eq!(group_thousands(1000, '.'), "1.000");
        assert_eq!(group_thousands(123456, ','), "123,456");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(-12345, Language::PtBr), "-12.345");
        assert_eq!(format_number(12345, Language::En), "12,345");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(format_date(date, Language::PtBr), "31/12/2024");
        assert_eq!(format_date(date, Language::En), "12/31/2024");
        assert_eq!(iso_date(date), "2024-12-31");
    }

    #[test]
    fn test_format_datetime() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(format_datetime(ts, Language::Es), "05/03/2024 14:07");
    }

    #[test]
    fn test_format_postal_code() {
        assert_eq!(format_postal_code("01310100"), "01310-100");
        assert_eq!(format_postal_code("0131"), "0131");
    }

    #[test]
    fn test_stock_labels() {
        assert_eq!(stock_status_label(StockStatus::Low, Language::En), "Low stock");
        assert_eq!(stock_status_label(StockStatus::Out, Language::PtBr), "Sem estoque");
        assert_eq!(format_stock(1200, "un", Language::PtBr), "1.200 un");
    }
}
