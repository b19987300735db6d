//! Wire DTOs for the CRM REST API.
//!
//! DESIGN
//! ======
//! Field names follow the backend's camelCase JSON. Everything the dashboard
//! only displays is optional so a sparse or partially migrated record still
//! deserializes; identifiers are the one required field.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// AUTH
// =============================================================================

/// The authenticated user's record as returned by `GET /api/auth/me`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Server-assigned user identifier.
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Role name (e.g. `"USER"`, `"ADMIN"`).
    #[serde(default)]
    pub role: Option<String>,
    /// ISO 8601 creation timestamp, if the server sends one.
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Profile {
    /// `"First Last"`, trimmed when either part is blank.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

/// Body of `POST /api/auth/login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful response of `POST /api/auth/login`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    /// Bearer credential for subsequent requests.
    pub token: String,
    #[serde(default, deserialize_with = "deserialize_opt_i64_from_number")]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Body of `POST /api/auth/register`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// Omitted from the body when absent; the server defaults to `USER`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Outcome of a successful registration.
///
/// Some backends echo the created profile, others answer with a plain
/// acknowledgement such as `"User registered successfully!"`.
#[derive(Clone, Debug, PartialEq)]
pub enum Registration {
    Profile(Profile),
    Acknowledged(String),
}

// =============================================================================
// DASHBOARD ENTITIES
// =============================================================================

/// A sales lead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    /// Pipeline status (e.g. `"New"`, `"Qualified"`, `"Lost"`).
    #[serde(default)]
    pub status: Option<String>,
}

/// A customer contact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
}

/// A deal in the sales pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Monetary value of the deal.
    #[serde(default)]
    pub value: Option<f64>,
    /// Pipeline stage (e.g. `"PROSPECTING"`, `"CLOSED_WON"`).
    #[serde(default)]
    pub stage: Option<String>,
    /// Win probability in percent.
    #[serde(default)]
    pub probability: Option<i32>,
    /// Expected close date (`YYYY-MM-DD`).
    #[serde(default)]
    pub close_date: Option<String>,
}

/// A scheduled or completed activity (call, email, meeting, task).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

// =============================================================================
// NUMBER HELPERS
// =============================================================================

fn deserialize_i64_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    i64_from_value(&value).map_err(D::Error::custom)
}

fn deserialize_opt_i64_from_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    i64_from_value(&value).map(Some).map_err(D::Error::custom)
}

fn i64_from_value(value: &serde_json::Value) -> Result<i64, &'static str> {
    let number = match value {
        serde_json::Value::Number(number) => number,
        serde_json::Value::String(text) => return text.trim().parse().map_err(|_| "expected numeric string"),
        _ => return Err("expected number"),
    };
    if let Some(int) = number.as_i64() {
        return Ok(int);
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    if let Some(float) = number.as_f64()
        && float.is_finite()
        && float.fract() == 0.0
        && float >= i64::MIN as f64
        && float <= i64::MAX as f64
    {
        return Ok(float as i64);
    }
    Err("expected integer-compatible number")
}
