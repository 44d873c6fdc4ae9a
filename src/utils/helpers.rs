//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum length for person names
pub const MAX_NAME_LEN: usize = 100;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
            .unwrap_or_else(|_| unreachable!("static email pattern is valid"))
    })
}

fn slug_regex() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| {
        Regex::new(r"^[a-z0-9]+(?:_[a-z0-9]+)*$")
            .unwrap_or_else(|_| unreachable!("static slug pattern is valid"))
    })
}

/// Validate email format
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 255 && email_regex().is_match(email)
}

/// Lowercase and trim an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalise a mobile number to digits with an optional leading `+`
///
/// Spaces, dashes, dots and parentheses are dropped. Returns `None` when the
/// result is not 10..=15 digits long or contains other characters.
pub fn normalize_mobile(mobile: &str) -> Option<String> {
    let trimmed = mobile.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return None,
        }
    }

    if (10..=15).contains(&digits.len()) {
        Some(format!("{}{}", plus, digits))
    } else {
        None
    }
}

/// True when the identifier looks like an email rather than a mobile number
pub fn is_email_identifier(identifier: &str) -> bool {
    identifier.contains('@')
}

/// Validate a required person name, returning the trimmed value
pub fn validate_name(field: &str, value: &str) -> Result<String, String> {
    let trimmed = normalize_whitespace(value);
    if trimmed.is_empty() {
        return Err(format!("{} is required", field));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(format!("{} must be at most {} characters", field, MAX_NAME_LEN));
    }
    Ok(trimmed)
}

/// Validate a password against the length policy
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    Ok(())
}

/// Check that a value is a lowercase slug (`a-z`, `0-9`, single underscores)
pub fn is_valid_slug(value: &str) -> bool {
    value.len() <= 64 && slug_regex().is_match(value)
}

/// Turn free text into a slug suitable for enum values
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    slug
}

/// Escape `%`, `_` and `\` so user input is matched literally by ILIKE
pub fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build a `%term%` ILIKE pattern from raw search input
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term.trim()))
}

/// Calculate pagination offset
pub fn calculate_offset(page: u32, page_size: u32) -> i64 {
    i64::from(page.saturating_sub(1)) * i64::from(page_size)
}

/// Number of pages needed for `total` items
pub fn total_pages(total: i64, page_size: u32) -> u32 {
    if total <= 0 || page_size == 0 {
        return 0;
    }
    let size = i64::from(page_size);
    let pages = (total + size - 1) / size;
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Generate a new sub-family number, e.g. `SF-20240517-K3M9QZ`
pub fn generate_sub_family_number() -> String {
    format!(
        "SF-{}-{}",
        Utc::now().format("%Y%m%d"),
        generate_random_string(6).to_uppercase()
    )
}

/// Generate a random alphanumeric string
pub fn generate_random_string(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                            0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim optional text, mapping blank values to `None`
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Round a percentage to one decimal place
pub fn round_percentage(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("asha.patel@example.org"));
        assert!(is_valid_email("a+b@sub.example.co"));
        assert!(!is_valid_email("asha@"));
        assert!(!is_valid_email("no-at-sign.example.org"));
        assert!(!is_valid_email("two@@example.org"));
    }

    #[test]
    fn test_normalize_mobile() {
        assert_eq!(normalize_mobile("+91 98765-43210"), Some("+919876543210".to_string()));
        assert_eq!(normalize_mobile("(555) 123.4567"), Some("5551234567".to_string()));
        assert_eq!(normalize_mobile("12345"), None);
        assert_eq!(normalize_mobile("98765abc43"), None);
        assert_eq!(normalize_mobile("++919876543210"), None);
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("First name", "  Asha   Rani "), Ok("Asha Rani".to_string()));
        assert!(validate_name("First name", "   ").is_err());
        assert!(validate_name("First name", &"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_slugs() {
        assert_eq!(slugify("Daughter in Law"), "daughter_in_law");
        assert_eq!(slugify("  --Step  Son-- "), "step_son");
        assert!(is_valid_slug("daughter_in_law"));
        assert!(!is_valid_slug("Daughter"));
        assert!(!is_valid_slug("a__b"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(contains_pattern(" shah "), "%shah%");
    }

    #[test]
    fn test_pagination_math() {
        assert_eq!(calculate_offset(1, 20), 0);
        assert_eq!(calculate_offset(3, 20), 40);
        assert_eq!(calculate_offset(0, 20), 0);
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
    }

    #[test]
    fn test_sub_family_number_format() {
        let number = generate_sub_family_number();
        assert!(number.starts_with("SF-"));
        assert_eq!(number.len(), "SF-20240101-ABCDEF".len());
    }

    #[test]
    fn test_clean_optional() {
        assert_eq!(clean_optional(Some("  ".to_string())), None);
        assert_eq!(clean_optional(Some(" Pune ".to_string())), Some("Pune".to_string()));
        assert_eq!(clean_optional(None), None);
    }

    #[test]
    fn test_round_percentage() {
        assert_eq!(round_percentage(33.333), 33.3);
        assert_eq!(round_percentage(66.666), 66.7);
    }
}
