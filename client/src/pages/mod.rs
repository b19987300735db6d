//! Page modules for route-level screens.
//!
//! ARCHITECTURE
//! ============
//! Each page is a view model: form fields, inline error, and the submit/load
//! orchestration against the [`SessionStore`](crate::state::session::SessionStore).
//! Rendering is left to the host, which reads the fields and follows the
//! returned [`PageOutcome`].

pub mod dashboard;
pub mod landing;
pub mod login;
pub mod signup;

use crate::app::Route;

/// What the host should do after a page action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    Stay,
    Navigate(Route),
}

/// Client-side form rejections, checked before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Named field is empty.
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} cannot exceed {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Email should be valid")]
    InvalidEmail,
}
