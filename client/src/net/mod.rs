//! Networking modules for the CRM REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` defines the `CrmApi` seam and its HTTP implementation, `error`
//! classifies failures, and `types` defines the wire schema.

pub mod api;
pub mod error;
pub mod types;
