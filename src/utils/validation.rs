use regex::Regex;
use validator::ValidationError;

lazy_static::lazy_static! {
    static ref OBJECT_ID_REGEX: Regex = Regex::new(r"^[0-9a-fA-F]{24}$").unwrap();
    static ref ADMIN_PASSWORD_CHARSET: Regex = Regex::new(r"^[A-Za-z\d@$!%*?&]{8,}$").unwrap();
}

const ADMIN_SPECIALS: &str = "@$!%*?&";

/// Product ids issued by the catalog are 24 hex digit object ids.
pub fn is_object_id(value: &str) -> bool {
    OBJECT_ID_REGEX.is_match(value)
}

/// Customer passwords: 8+ characters with a lowercase, an uppercase and a
/// special (non alphanumeric) character.
pub fn validate_customer_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(ValidationError::new("password_too_short"));
    }

    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());

    if !has_lower || !has_upper || !has_special {
        return Err(ValidationError::new("password_complexity"));
    }

    Ok(())
}

/// Admin passwords are stricter: only `[A-Za-z0-9@$!%*?&]`, and every class
/// must be present.
pub fn validate_admin_password(password: &str) -> Result<(), ValidationError> {
    if !ADMIN_PASSWORD_CHARSET.is_match(password) {
        return Err(ValidationError::new("password_charset"));
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| ADMIN_SPECIALS.contains(c));

    if !has_lower || !has_upper || !has_digit || !has_special {
        return Err(ValidationError::new("password_complexity"));
    }

    Ok(())
}

/// Split comma separated tags ("shampoo, organic") into a trimmed list.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trim category names and drop blanks and repeats, keeping first-seen order.
pub fn normalize_categories(categories: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(categories.len());
    for category in categories {
        let trimmed = category.trim();
        if trimmed.is_empty() || seen.iter().any(|c| c.eq_ignore_ascii_case(trimmed)) {
            continue;
        }
        seen.push(trimmed.to_string());
    }
    seen
}
