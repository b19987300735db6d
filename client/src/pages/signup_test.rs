use super::*;
use crate::net::api::{LOGIN_PATH, REGISTER_PATH};
use crate::net::error::ApiError;
use crate::state::session::SessionPhase;
use crate::state::ui::NoticeLevel;
use crate::test_helpers::session_fixture;

fn valid_form() -> SignupPage {
    SignupPage {
        first_name: "Grace".to_owned(),
        last_name: "Hopper".to_owned(),
        email: "grace@example.com".to_owned(),
        password: "cobol".to_owned(),
        confirm_password: "cobol".to_owned(),
        ..SignupPage::new()
    }
}

// =============================================================
// validate
// =============================================================

#[test]
fn validate_builds_trimmed_request() {
    let mut form = valid_form();
    form.first_name = "  Grace ".to_owned();
    form.role = Some("  ".to_owned());

    let request = form.validate().unwrap();
    assert_eq!(request.first_name, "Grace");
    assert_eq!(request.email, "grace@example.com");
    assert_eq!(request.role, None);
}

#[test]
fn password_mismatch_wins_over_field_errors() {
    let form = SignupPage { password: "a".to_owned(), confirm_password: "b".to_owned(), ..SignupPage::new() };
    assert_eq!(form.validate(), Err(FormError::PasswordMismatch));
    assert_eq!(FormError::PasswordMismatch.to_string(), "Passwords do not match");
}

#[test]
fn names_are_required_and_bounded() {
    let mut form = valid_form();
    form.first_name = " ".to_owned();
    assert_eq!(form.validate(), Err(FormError::Required("First name")));

    form.first_name = "x".repeat(MAX_NAME_CHARS + 1);
    let err = form.validate().unwrap_err();
    assert_eq!(err.to_string(), "First name cannot exceed 50 characters");

    form.first_name = "x".repeat(MAX_NAME_CHARS);
    form.last_name = String::new();
    assert_eq!(form.validate(), Err(FormError::Required("Last name")));
}

#[test]
fn email_shape_is_checked() {
    for bad in ["grace", "grace@", "@example.com", "grace@example", "gr ace@example.com", "a@b@c.com"] {
        let form = SignupPage { email: bad.to_owned(), ..valid_form() };
        assert_eq!(form.validate(), Err(FormError::InvalidEmail), "{bad}");
    }
}

#[test]
fn email_and_password_limits() {
    let long_email = format!("{}@example.com", "a".repeat(MAX_EMAIL_CHARS));
    let form = SignupPage { email: long_email, ..valid_form() };
    assert_eq!(form.validate(), Err(FormError::TooLong { field: "Email", max: MAX_EMAIL_CHARS }));

    let long_pw = "p".repeat(MAX_PASSWORD_CHARS + 1);
    let form = SignupPage { password: long_pw.clone(), confirm_password: long_pw, ..valid_form() };
    assert_eq!(form.validate(), Err(FormError::TooLong { field: "Password", max: MAX_PASSWORD_CHARS }));

    let form = SignupPage { password: String::new(), confirm_password: String::new(), ..valid_form() };
    assert_eq!(form.validate(), Err(FormError::Required("Password")));
}

// =============================================================
// submit
// =============================================================

#[tokio::test]
async fn mismatched_passwords_never_reach_the_server() {
    let (_storage, api, session) = session_fixture();
    let mut notices = Notices::new();
    let mut form = SignupPage { confirm_password: "other".to_owned(), ..valid_form() };

    assert_eq!(form.submit(&session, &mut notices).await, PageOutcome::Stay);
    assert_eq!(form.error.as_deref(), Some("Passwords do not match"));
    assert_eq!(notices.last().unwrap().level, NoticeLevel::Error);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn successful_signup_lands_on_dashboard() {
    let (_storage, api, session) = session_fixture();
    let mut notices = Notices::new();
    let mut form = valid_form();

    let outcome = form.submit(&session, &mut notices).await;
    assert_eq!(outcome, PageOutcome::Navigate(Route::Dashboard));
    assert_eq!(notices.last().unwrap().message, "Account created successfully!");
    assert_eq!(api.call_count(REGISTER_PATH), 1);
    assert_eq!(session.snapshot().profile.unwrap().first_name, "Grace");
}

#[tokio::test]
async fn duplicate_email_shows_server_message() {
    let (_storage, api, session) = session_fixture();
    let mut notices = Notices::new();
    let mut form = SignupPage { email: "ada@example.com".to_owned(), ..valid_form() };

    assert_eq!(form.submit(&session, &mut notices).await, PageOutcome::Stay);
    assert_eq!(form.error.as_deref(), Some("Error: Email is already in use!"));
    assert_eq!(api.call_count(LOGIN_PATH), 0);
    assert_eq!(session.snapshot().phase, SessionPhase::Anonymous);
}

#[tokio::test]
async fn rejected_registration_without_text_uses_fallback() {
    let (_storage, api, session) = session_fixture();
    api.fail_register(ApiError::Validation(String::new()));
    let mut notices = Notices::new();
    let mut form = valid_form();

    assert_eq!(form.submit(&session, &mut notices).await, PageOutcome::Stay);
    assert_eq!(form.error.as_deref(), Some("Please check the form and try again"));
    assert!(!form.busy);
}
