//! The caller context and services handle crossing the crate boundary
//! (spec §6).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// An opaque, host-populated dependency-resolution handle (spec §6:
/// "an opaque services handle for dependency resolution"). The framework
/// never inspects it; consumers downcast to the concrete type they
/// registered.
pub type Services = Arc<dyn Any + Send + Sync>;

/// A services handle carrying nothing, for hosts and tests that don't need
/// dependency injection.
pub fn empty_services() -> Services {
    Arc::new(())
}

#[derive(Debug, Error)]
#[error("failed to deliver response: {0}")]
pub struct RespondError(pub String);

/// A reply sent back to the caller via [`Caller::respond`].
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Value(crate::value::Value),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Text(s) => write!(f, "{s}"),
            Reply::Value(v) => write!(f, "{v}"),
        }
    }
}

/// The caller invoking a command — provided by the host (spec §6).
#[async_trait]
pub trait Caller: Send + Sync {
    /// A stable identifier for the caller (used by conditions such as
    /// `RequireRole`).
    fn id(&self) -> &str;

    /// A human-readable display name.
    fn display_name(&self) -> &str;

    /// Deliver a reply. May suspend (spec §5: the result handler is a
    /// suspension point).
    async fn respond(&self, message: Reply) -> Result<(), RespondError>;
}

/// A minimal [`Caller`] useful for tests and simple hosts.
pub struct SimpleCaller {
    pub id: String,
    pub display_name: String,
}

impl SimpleCaller {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

#[async_trait]
impl Caller for SimpleCaller {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn respond(&self, _message: Reply) -> Result<(), RespondError> {
        Ok(())
    }
}
