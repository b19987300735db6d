//! Login page: email + password exchanged for a session credential.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use super::{FormError, PageOutcome};
use crate::app::Route;
use crate::state::session::{SessionError, SessionStore};
use crate::state::ui::Notices;

const LOGIN_FAILED: &str = "Login failed";

/// Trim the email and require both fields.
///
/// # Errors
///
/// Returns [`FormError::Required`] naming the first empty field.
pub fn validate_login_input(email: &str, password: &str) -> Result<(String, String), FormError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(FormError::Required("Email"));
    }
    if password.is_empty() {
        return Err(FormError::Required("Password"));
    }
    Ok((email.to_owned(), password.to_owned()))
}

/// Inline text for a failed login: whatever the server said, else a fixed line.
fn failure_text(err: &SessionError) -> String {
    match err {
        SessionError::Api(api) => api.server_text().unwrap_or_else(|| LOGIN_FAILED.to_owned()),
        other => other.message(),
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoginPage {
    pub email: String,
    pub password: String,
    pub error: Option<String>,
    pub busy: bool,
}

impl LoginPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submit(&mut self, session: &SessionStore, notices: &mut Notices) -> PageOutcome {
        if self.busy {
            return PageOutcome::Stay;
        }
        let (email, password) = match validate_login_input(&self.email, &self.password) {
            Ok(input) => input,
            Err(err) => {
                self.error = Some(err.to_string());
                return PageOutcome::Stay;
            }
        };

        self.busy = true;
        self.error = None;
        let result = session.login(&email, &password).await;
        self.busy = false;

        match result {
            Ok(_) => {
                notices.success("Logged in");
                PageOutcome::Navigate(Route::Dashboard)
            }
            Err(SessionError::Superseded) => PageOutcome::Stay,
            Err(err) => {
                let text = failure_text(&err);
                notices.error(text.clone());
                self.error = Some(text);
                PageOutcome::Stay
            }
        }
    }
}
