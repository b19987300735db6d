//! Client-side state: persisted credential, session lifecycle, and notices.

pub mod session;
pub mod storage;
pub mod ui;
