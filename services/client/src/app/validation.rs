//! services/client/src/app/validation.rs
//!
//! Local form validation. Runs before any network call; a failure never reaches
//! the backend or the notification bus.

use crate::error::{ClientError, ClientResult};
use habit_tracker_core::domain::Registration;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

/// Ten digits, starting with 6 to 9.
static MOBILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[6-9][0-9]{9}$").expect("mobile pattern is valid"));

static USERNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,20}$").expect("username pattern is valid"));

static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z\s'-]+$").expect("name pattern is valid"));

pub const PASSWORD_MIN_LENGTH: usize = 6;
const PASSWORD_MAX_LENGTH: usize = 100;
const EMAIL_MAX_LENGTH: usize = 100;

/// A single field check. `Err` carries the message shown next to the field.
pub type FieldResult = Result<(), String>;

pub fn validate_email(email: &str) -> FieldResult {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".into());
    }
    if !EMAIL.is_match(email) {
        return Err("Please enter a valid email address (e.g., user@example.com)".into());
    }
    if email.len() > EMAIL_MAX_LENGTH {
        return Err("Email address is too long (max 100 characters)".into());
    }
    if email.contains("..") {
        return Err("Email address cannot contain consecutive dots".into());
    }
    if email.starts_with('.') || email.ends_with('.') {
        return Err("Email address cannot start or end with a dot".into());
    }
    Ok(())
}

/// Accepts formatting characters (spaces, dashes); only the digits are checked.
pub fn validate_mobile(mobile: &str) -> FieldResult {
    if mobile.trim().is_empty() {
        return Err("Mobile number is required".into());
    }
    let digits: String = mobile.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 10 {
        return Err("Mobile number must be exactly 10 digits".into());
    }
    if !MOBILE.is_match(&digits) {
        return Err("Mobile number must be exactly 10 digits starting with 6, 7, 8, or 9".into());
    }
    Ok(())
}

pub fn validate_username(username: &str) -> FieldResult {
    let username = username.trim();
    let length = username.chars().count();
    if username.is_empty() {
        Err("Username is required".into())
    } else if length < 3 {
        Err("Username must be at least 3 characters long".into())
    } else if length > 20 {
        Err("Username must be less than 20 characters long".into())
    } else if !USERNAME.is_match(username) {
        Err("Username can only contain letters, numbers, and underscores".into())
    } else {
        Ok(())
    }
}

/// Checks length and, when `confirmation` is given, that both entries match.
pub fn validate_password(password: &str, confirmation: Option<&str>) -> FieldResult {
    let length = password.chars().count();
    if password.is_empty() {
        return Err("Password is required".into());
    }
    if length < PASSWORD_MIN_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LENGTH
        ));
    }
    if length > PASSWORD_MAX_LENGTH {
        return Err("Password is too long (max 100 characters)".into());
    }
    match confirmation {
        Some(confirmation) if confirmation != password => Err("Passwords do not match".into()),
        _ => Ok(()),
    }
}

/// `field` is the label used in messages, e.g. "First name".
pub fn validate_name(name: &str, field: &str) -> FieldResult {
    let name = name.trim();
    let length = name.chars().count();
    if name.is_empty() {
        Err(format!("{} is required", field))
    } else if length < 2 {
        Err(format!("{} must be at least 2 characters long", field))
    } else if length > 50 {
        Err(format!("{} is too long (max 50 characters)", field))
    } else if !NAME.is_match(name) {
        Err(format!(
            "{} can only contain letters, spaces, hyphens, and apostrophes",
            field
        ))
    } else {
        Ok(())
    }
}

/// Validates every field of the sign-up form. All failures are collected into
/// one `ClientError::Validation`, joined with ", ".
pub fn validate_registration(registration: &Registration) -> ClientResult<()> {
    let checks = [
        validate_name(&registration.first_name, "First name"),
        validate_name(&registration.last_name, "Last name"),
        validate_username(&registration.username),
        validate_email(&registration.email),
        validate_mobile(&registration.mobile_number),
        validate_password(&registration.password, Some(&registration.confirm_password)),
    ];
    collect(checks)
}

/// Validates the password reset form.
pub fn validate_password_reset(email: &str, otp: &str, password: &str, confirmation: &str) -> ClientResult<()> {
    let otp_check = if otp.trim().is_empty() {
        Err("Verification code is required".to_string())
    } else {
        Ok(())
    };
    collect([
        validate_email(email),
        otp_check,
        validate_password(password, Some(confirmation)),
    ])
}

fn collect<I: IntoIterator<Item = FieldResult>>(checks: I) -> ClientResult<()> {
    let errors: Vec<String> = checks.into_iter().filter_map(Result::err).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ClientError::Validation(errors.join(", ")))
    }
}

/// Keeps only digits, at most ten of them.
pub fn format_mobile_input(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).take(10).collect()
}

/// Corrections for common email domain typos and completions of partially typed
/// domains.
pub fn email_suggestions(email: &str) -> Vec<String> {
    const COMMON_DOMAINS: [&str; 5] = [
        "gmail.com",
        "yahoo.com",
        "hotmail.com",
        "outlook.com",
        "rediffmail.com",
    ];
    const TYPOS: [(&str, &str); 5] = [
        ("gamil.com", "gmail.com"),
        ("gmial.com", "gmail.com"),
        ("yahooo.com", "yahoo.com"),
        ("hotmial.com", "hotmail.com"),
        ("outlook.co", "outlook.com"),
    ];

    let Some((local, domain)) = email.split_once('@') else {
        return Vec::new();
    };
    let mut suggestions = Vec::new();
    if let Some((_, fixed)) = TYPOS.iter().find(|(typo, _)| *typo == domain) {
        suggestions.push(format!("{}@{}", local, fixed));
    }
    let lowered = domain.to_lowercase();
    if domain.len() > 2 {
        suggestions.extend(
            COMMON_DOMAINS
                .iter()
                .filter(|common| common.starts_with(&lowered))
                .map(|common| format!("{}@{}", local, common)),
        );
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_registration() -> Registration {
        Registration {
            first_name: "Ada".into(),
            last_name: "O'Neil".into(),
            username: "ada_99".into(),
            email: "ada@example.com".into(),
            mobile_number: "98765 43210".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_a_complete_registration() {
        assert!(validate_registration(&valid_registration()).is_ok());
    }

    #[test]
    fn collects_every_failure_into_one_message() {
        let registration = Registration {
            email: "not-an-email".into(),
            confirm_password: "different".into(),
            ..valid_registration()
        };
        match validate_registration(&registration) {
            Err(ClientError::Validation(message)) => {
                assert_eq!(
                    message,
                    "Please enter a valid email address (e.g., user@example.com), Passwords do not match"
                );
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn field_rules() {
        assert!(validate_email("a..b@example.com").is_err());
        assert!(validate_email("  ").is_err());
        assert!(validate_mobile("5876543210").is_err());
        assert!(validate_mobile("987654321").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_password("12345", None).is_err());
        assert!(validate_password("123456", None).is_ok());
        assert!(validate_name("A", "First name").is_err());
        assert_eq!(
            validate_name("R2D2", "Last name"),
            Err("Last name can only contain letters, spaces, hyphens, and apostrophes".into())
        );
    }

    #[test]
    fn password_reset_requires_a_code() {
        assert!(validate_password_reset("a@b.io", "123456", "secret1", "secret1").is_ok());
        assert!(validate_password_reset("a@b.io", " ", "secret1", "secret1").is_err());
    }

    #[test]
    fn mobile_input_keeps_ten_digits() {
        assert_eq!(format_mobile_input("+91 98765-43210"), "9198765432");
        assert_eq!(format_mobile_input(""), "");
    }

    #[test]
    fn suggests_fixes_for_common_domains() {
        assert_eq!(email_suggestions("ada@gamil.com"), vec!["ada@gmail.com"]);
        assert_eq!(email_suggestions("ada@hot"), vec!["ada@hotmail.com"]);
        assert!(email_suggestions("ada").is_empty());
        assert!(email_suggestions("ada@example.com").is_empty());
    }
}
