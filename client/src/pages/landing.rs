//! Public landing page. Its call to action depends on the session.

#[cfg(test)]
#[path = "landing_test.rs"]
mod landing_test;

use crate::app::Route;
use crate::state::session::Session;

#[derive(Clone, Copy, Debug, Default)]
pub struct LandingPage;

impl LandingPage {
    /// Button label and target for the hero call to action.
    #[must_use]
    pub fn primary_action(session: &Session) -> (&'static str, Route) {
        if session.is_authenticated() {
            ("Go to dashboard", Route::Dashboard)
        } else {
            ("Get started", Route::Signup)
        }
    }
}
