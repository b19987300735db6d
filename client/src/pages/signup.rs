//! Signup page: account registration followed by an automatic login.
//!
//! Field limits mirror the backend's user model so most rejections happen
//! before a request is sent. The password check runs first.

#[cfg(test)]
#[path = "signup_test.rs"]
mod signup_test;

use super::{FormError, PageOutcome};
use crate::app::Route;
use crate::net::types::RegisterRequest;
use crate::state::session::{SessionError, SessionStore};
use crate::state::ui::Notices;

pub const MAX_NAME_CHARS: usize = 50;
pub const MAX_EMAIL_CHARS: usize = 100;
pub const MAX_PASSWORD_CHARS: usize = 120;

fn required(field: &'static str, value: &str, max: usize) -> Result<String, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FormError::Required(field));
    }
    if value.chars().count() > max {
        return Err(FormError::TooLong { field, max });
    }
    Ok(value.to_owned())
}

/// Loose address shape: `local@domain.tld`, no whitespace.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, _)| !host.is_empty())
        && !domain.ends_with('.')
}

#[derive(Clone, Debug, Default)]
pub struct SignupPage {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Option<String>,
    pub error: Option<String>,
    pub busy: bool,
}

impl SignupPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the form and build the registration payload.
    ///
    /// # Errors
    ///
    /// [`FormError::PasswordMismatch`] takes precedence over every field rule.
    pub fn validate(&self) -> Result<RegisterRequest, FormError> {
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        let first_name = required("First name", &self.first_name, MAX_NAME_CHARS)?;
        let last_name = required("Last name", &self.last_name, MAX_NAME_CHARS)?;
        let email = required("Email", &self.email, MAX_EMAIL_CHARS)?;
        if !looks_like_email(&email) {
            return Err(FormError::InvalidEmail);
        }
        if self.password.is_empty() {
            return Err(FormError::Required("Password"));
        }
        if self.password.chars().count() > MAX_PASSWORD_CHARS {
            return Err(FormError::TooLong { field: "Password", max: MAX_PASSWORD_CHARS });
        }
        let role = self
            .role
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_owned);

        Ok(RegisterRequest { first_name, last_name, email, password: self.password.clone(), role })
    }

    pub async fn submit(&mut self, session: &SessionStore, notices: &mut Notices) -> PageOutcome {
        if self.busy {
            return PageOutcome::Stay;
        }
        let request = match self.validate() {
            Ok(request) => request,
            Err(err) => {
                let text = err.to_string();
                notices.error(text.clone());
                self.error = Some(text);
                return PageOutcome::Stay;
            }
        };

        self.busy = true;
        self.error = None;
        let result = session.signup(&request).await;
        self.busy = false;

        match result {
            Ok(_) => {
                notices.success("Account created successfully!");
                PageOutcome::Navigate(Route::Dashboard)
            }
            Err(SessionError::Superseded) => PageOutcome::Stay,
            Err(err) => {
                let text = err.message();
                notices.error(text.clone());
                self.error = Some(text);
                PageOutcome::Stay
            }
        }
    }
}
