//! Error types for the vendor API clients.
//!
//! Every variant records which [`System`] produced it, so a failure message
//! stored in the workflow record reads on its own.

use thiserror::Error;

use super::System;

/// Errors that can occur while talking to the tracker or wiki APIs.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (DNS, refused connection, dropped body).
    #[error("{system} network error: {source}")]
    Network {
        system: System,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-2xx status.
    #[error("{system} returned status {status}: {message}")]
    Status {
        system: System,
        status: u16,
        message: String,
    },

    /// A 2xx response whose body carries the vendor's error indicator.
    #[error("{system} reported an error: {body}")]
    Vendor { system: System, body: String },

    /// A 2xx response that could not be understood.
    #[error("{system} sent a malformed response: {detail}")]
    Malformed { system: System, detail: String },
}

impl ApiError {
    pub fn system(&self) -> System {
        match self {
            ApiError::Network { system, .. }
            | ApiError::Status { system, .. }
            | ApiError::Vendor { system, .. }
            | ApiError::Malformed { system, .. } => *system,
        }
    }

    /// Whether the failure happened below the HTTP protocol level.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        let err = ApiError::Status {
            system: System::Tracker,
            status: 401,
            message: "Unauthorized".into(),
        };
        assert_eq!(err.to_string(), "tracker returned status 401: Unauthorized");
        assert!(!err.is_transport());
    }

    #[test]
    fn vendor_display() {
        let err = ApiError::Vendor {
            system: System::Wiki,
            body: "backup already running".into(),
        };
        assert_eq!(err.to_string(), "wiki reported an error: backup already running");
        assert_eq!(err.system(), System::Wiki);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiError>();
    }
}
