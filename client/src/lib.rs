//! # sphere-client
//!
//! Client core for the ClientSphere CRM front end: the REST API client, the
//! credential persistence port, the session store, the navigation gate, and
//! view models for the landing, login, signup, and dashboard pages.
//!
//! Rendering is left to the host. Views receive a [`state::session::SessionStore`]
//! by reference and return navigation outcomes, so they can be driven from a
//! terminal, a test, or a UI toolkit alike.

pub mod app;
pub mod config;
pub mod net;
pub mod pages;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;
