//! Client-side checks for the login and registration forms. Failures are
//! reported inline and never reach the network.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"))
}

fn letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z]").expect("letter regex"))
}

fn digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d").expect("digit regex"))
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if !email_re().is_match(email) {
        return Err("Please enter a valid email address".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    if !letter_re().is_match(password) || !digit_re().is_match(password) {
        return Err("Password must contain at least one letter and one number".to_string());
    }
    Ok(())
}

/// Login only checks presence and shape; password strength is a registration
/// concern.
pub fn validate_login(email: &str, password: &str) -> Vec<FieldError> {
    let mut out = Vec::new();
    if let Err(message) = validate_email(email) {
        out.push(FieldError {
            field: "email",
            message,
        });
    }
    if password.is_empty() {
        out.push(FieldError {
            field: "password",
            message: "Password is required".to_string(),
        });
    }
    out
}

pub fn validate_registration(form: &RegistrationForm) -> Vec<FieldError> {
    let mut out = Vec::new();
    if let Err(message) = validate_email(&form.email) {
        out.push(FieldError {
            field: "email",
            message,
        });
    }
    if let Err(message) = validate_password(&form.password) {
        out.push(FieldError {
            field: "password",
            message,
        });
    }
    if form.password != form.confirm_password {
        out.push(FieldError {
            field: "confirm_password",
            message: "Passwords do not match".to_string(),
        });
    }
    out
}

pub fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
