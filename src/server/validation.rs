use crate::server::response::ApiError;

const MAX_NAME_LEN: usize = 120;
const MAX_TITLE_LEN: usize = 200;
const MAX_EMAIL_LEN: usize = 254;

/// Emails are compared case-insensitively and ignoring surrounding
/// whitespace; normalize once at the boundary so the store only ever sees
/// the canonical form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<String, ApiError> {
    let email = normalize_email(email);
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return Err(ApiError::bad_request("Please provide a valid email"));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ApiError::bad_request("Please provide a valid email"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ApiError::bad_request("Please provide a valid email"));
    }

    Ok(email)
}

pub fn validate_display_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name cannot be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

pub fn validate_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Title cannot be empty"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "Title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

pub fn validate_price(price: i64) -> Result<i64, ApiError> {
    if price < 0 {
        return Err(ApiError::bad_request("Price cannot be negative"));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("A@X.COM ").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@nodot").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_price_bounds() {
        assert_eq!(validate_price(0).unwrap(), 0);
        assert_eq!(validate_price(50).unwrap(), 50);
        assert!(validate_price(-1).is_err());
    }
}
