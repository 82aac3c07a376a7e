//! Normalized error types for the facade

use crate::transport::TransportError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Broad classification of an [`EsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connectivity or timeout, potentially transient
    Transport,
    /// The cluster processed the request and returned an error status
    Remote,
    /// A request could not be encoded or a response could not be decoded
    Serialization,
    /// Misuse: reused builder, closed facade, invalid addressing
    IllegalState,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Remote => "remote",
            ErrorKind::Serialization => "serialization",
            ErrorKind::IllegalState => "illegal_state",
        }
    }
}

/// Error returned by every facade operation.
///
/// The display form is the operation context; the underlying failure is
/// reachable through [`std::error::Error::source`].
#[derive(Error, Debug)]
pub enum EsError {
    #[error("{context}")]
    Transport {
        context: String,
        #[source]
        source: TransportError,
    },

    #[error("{context}")]
    Remote {
        context: String,
        #[source]
        source: Option<TransportError>,
    },

    #[error("{context}")]
    Serialization {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("{context}")]
    IllegalState { context: String },
}

impl EsError {
    /// Normalize a transport failure for the operation described by `context`.
    pub fn from_transport(context: impl Into<String>, err: TransportError) -> Self {
        let context = context.into();
        match err {
            TransportError::Rejected { .. } => EsError::Remote {
                context,
                source: Some(err),
            },
            TransportError::Encode(_) | TransportError::Decode(_) => EsError::Serialization {
                context,
                source: Box::new(err),
            },
            TransportError::Connection(_) | TransportError::Timeout(_) | TransportError::Closed => {
                EsError::Transport {
                    context,
                    source: err,
                }
            }
        }
    }

    pub fn remote(context: impl Into<String>) -> Self {
        EsError::Remote {
            context: context.into(),
            source: None,
        }
    }

    pub fn serialization(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        EsError::Serialization {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn illegal_state(context: impl Into<String>) -> Self {
        EsError::IllegalState {
            context: context.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EsError::Transport { .. } => ErrorKind::Transport,
            EsError::Remote { .. } => ErrorKind::Remote,
            EsError::Serialization { .. } => ErrorKind::Serialization,
            EsError::IllegalState { .. } => ErrorKind::IllegalState,
        }
    }

    pub fn context(&self) -> &str {
        match self {
            EsError::Transport { context, .. }
            | EsError::Remote { context, .. }
            | EsError::Serialization { context, .. }
            | EsError::IllegalState { context } => context,
        }
    }

    /// The transport failure behind this error, if any.
    pub fn transport_cause(&self) -> Option<&TransportError> {
        match self {
            EsError::Transport { source, .. } => Some(source),
            EsError::Remote { source, .. } => source.as_ref(),
            EsError::Serialization { source, .. } => source.downcast_ref::<TransportError>(),
            EsError::IllegalState { .. } => None,
        }
    }

    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self.transport_cause() {
            Some(TransportError::Connection(_)) => "connection",
            Some(TransportError::Timeout(_)) => "timeout",
            Some(TransportError::Closed) => "closed",
            Some(TransportError::Rejected { .. }) => "rejected",
            Some(TransportError::Encode(_)) => "encode",
            Some(TransportError::Decode(_)) => "decode",
            None => self.kind().as_str(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EsError>;
