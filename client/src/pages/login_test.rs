use super::*;
use crate::net::api::LOGIN_PATH;
use crate::net::error::ApiError;
use crate::state::session::SessionPhase;
use crate::state::ui::NoticeLevel;
use crate::test_helpers::session_fixture;

fn filled(email: &str, password: &str) -> LoginPage {
    LoginPage { email: email.to_owned(), password: password.to_owned(), ..LoginPage::new() }
}

#[test]
fn validate_login_input_trims_email_and_requires_both_fields() {
    assert_eq!(
        validate_login_input("  ada@example.com ", "secret"),
        Ok(("ada@example.com".to_owned(), "secret".to_owned()))
    );
    assert_eq!(validate_login_input("   ", "secret"), Err(FormError::Required("Email")));
    assert_eq!(validate_login_input("ada@example.com", ""), Err(FormError::Required("Password")));
}

#[test]
fn password_is_not_trimmed() {
    assert_eq!(
        validate_login_input("a@b.com", " pw "),
        Ok(("a@b.com".to_owned(), " pw ".to_owned()))
    );
}

#[tokio::test]
async fn submit_success_notifies_and_navigates_to_dashboard() {
    let (_storage, _api, session) = session_fixture();
    let mut notices = Notices::new();
    let mut page = filled(" ada@example.com ", "secret");

    let outcome = page.submit(&session, &mut notices).await;
    assert_eq!(outcome, PageOutcome::Navigate(Route::Dashboard));
    assert_eq!(page.error, None);
    assert!(!page.busy);
    assert_eq!(notices.last().unwrap().message, "Logged in");
    assert_eq!(session.snapshot().phase, SessionPhase::Authenticated);
}

#[tokio::test]
async fn submit_with_empty_field_makes_no_call() {
    let (_storage, api, session) = session_fixture();
    let mut notices = Notices::new();
    let mut page = filled("ada@example.com", "");

    assert_eq!(page.submit(&session, &mut notices).await, PageOutcome::Stay);
    assert_eq!(page.error.as_deref(), Some("Password is required"));
    assert_eq!(api.call_count(LOGIN_PATH), 0);
    assert!(notices.is_empty());
}

#[tokio::test]
async fn submit_rejected_shows_server_text() {
    let (_storage, _api, session) = session_fixture();
    let mut notices = Notices::new();
    let mut page = filled("ada@example.com", "wrong");

    assert_eq!(page.submit(&session, &mut notices).await, PageOutcome::Stay);
    assert_eq!(page.error.as_deref(), Some("Bad credentials"));
    let notice = notices.last().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Bad credentials");
}

#[tokio::test]
async fn submit_without_server_text_says_login_failed() {
    let (_storage, api, session) = session_fixture();
    api.fail_next_profile(ApiError::Network("connection refused".to_owned()));
    let mut notices = Notices::new();
    let mut page = filled("ada@example.com", "secret");

    assert_eq!(page.submit(&session, &mut notices).await, PageOutcome::Stay);
    assert_eq!(page.error.as_deref(), Some("Login failed"));
    assert_eq!(session.snapshot().phase, SessionPhase::Anonymous);
}
