//! Layered error definitions
//!
//! Categorized by source: registry / construction / delivery / aggregate

use std::fmt;

use thiserror::Error;

/// Boxed cause carried by construction and per-target failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type
#[derive(Debug, Error)]
pub enum BroadcastError {
    // ===== Registry Errors =====
    /// Scheme registered twice
    #[error("broadcaster scheme '{scheme}' is already registered")]
    DuplicateScheme { scheme: String },

    /// No constructor registered for scheme
    #[error("no broadcaster registered for scheme '{scheme}'")]
    UnknownScheme { scheme: String },

    /// URI could not be parsed
    #[error("invalid broadcaster uri '{uri}': {message}")]
    InvalidUri { uri: String, message: String },

    // ===== Construction Errors =====
    /// Target constructor failed
    #[error("failed to create broadcaster for '{uri}': {message}")]
    Construction {
        uri: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    // ===== Fan-out Errors =====
    /// A single target failed to deliver
    #[error("[{target}] failed to broadcast message: {source}")]
    Delivery {
        target: String,
        #[source]
        source: BoxError,
    },

    /// A single target rejected a logger
    #[error("[{target}] failed to set logger: {source}")]
    SetLogger {
        target: String,
        #[source]
        source: BoxError,
    },

    /// One or more target failures collected during fan-out
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl BroadcastError {
    /// Create invalid uri error
    pub fn invalid_uri(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Create construction error without an underlying cause
    pub fn construction(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            uri: uri.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create construction error wrapping the cause
    pub fn construction_with(
        uri: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Construction {
            uri: uri.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Tag a delivery failure with the target that produced it
    pub fn delivery(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Delivery {
            target: target.into(),
            source: source.into(),
        }
    }

    /// Tag a set-logger failure with the target that produced it
    pub fn set_logger(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::SetLogger {
            target: target.into(),
            source: source.into(),
        }
    }

    /// Name of the failing target, if this error is attributed to one
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Delivery { target, .. } | Self::SetLogger { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Combined failure of one or more targets
///
/// Entries keep the order in which failures were collected.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<BroadcastError>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: BroadcastError) {
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[BroadcastError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<BroadcastError> {
        self.errors
    }

    /// Names of every failing target, in collection order
    pub fn targets(&self) -> Vec<&str> {
        self.errors.iter().filter_map(BroadcastError::target).collect()
    }
}

impl FromIterator<BroadcastError> for AggregateError {
    fn from_iter<I: IntoIterator<Item = BroadcastError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "one or more errors occurred, {} failed:", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n\t* {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
