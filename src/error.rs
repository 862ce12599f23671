//! Error types for obras_hub
//!
//! - Session failures (login, token validation)
//! - Create-time field validation
//! - Persistence failures (Sled, JSON codec)
//! - Startup configuration

use serde::Serialize;

/// Session authority failures.
///
/// `InvalidCredentials` is returned both for an unknown email and for a wrong
/// password; callers never learn which one it was.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email and password are required")]
    MalformedRequest,

    #[error("session expired")]
    ExpiredSession,

    #[error("invalid session")]
    InvalidSession,

    /// Token could not be signed
    #[error("token signing failed: {0}")]
    Signing(String),

    /// Identity lookup failed in the persistence layer
    #[error("identity directory unavailable: {0}")]
    Directory(String),
}

/// A single rejected field on a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

fn render(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{} {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Create-time validation failure carrying one message per offending field.
#[derive(Debug, thiserror::Error, Clone, Default, PartialEq, Eq, Serialize)]
#[error("validation failed: {}", render(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }
}

/// Store and persistence failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} {id} not found")]
    UnknownEntity { kind: &'static str, id: u64 },

    #[error("{kind} {id} already exists")]
    DuplicateId { kind: &'static str, id: u64 },

    #[error("corrupt key in tree {0}")]
    CorruptKey(&'static str),
}

/// Startup configuration failures. Any of these aborts initialization.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OBRAS_JWT_SECRET is not set; refusing to start without a signing secret")]
    MissingSecret,

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}
