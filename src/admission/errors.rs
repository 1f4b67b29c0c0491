// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Admission error types.

use super::decision::{Status, StatusReason};
use crate::authorization::AuthorizerError;
use thiserror::Error;

/// Result type for admission operations.
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// DenialKind classifies why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialKind {
    /// A field value is malformed. Detected locally.
    Semantic,
    /// The requesting user lacks a permission, or the permission could not be checked.
    Authorization,
    /// The request could not be processed at all.
    Internal,
}

/// AdmissionError represents errors that can occur during admission.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// BadRequest indicates a malformed field value.
    #[error("{0}")]
    BadRequest(String),

    /// Forbidden indicates the user lacks a required permission.
    #[error("{0}")]
    Forbidden(String),

    /// AuthorizationFailed indicates the authorizer gave no answer.
    #[error("unable to authorize user \"{user}\": {source}")]
    AuthorizationFailed {
        user: String,
        #[source]
        source: AuthorizerError,
    },

    /// Internal represents an internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AdmissionError {
    /// Create a new BadRequest error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AdmissionError::BadRequest(msg.into())
    }

    /// Create a new Forbidden error.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        AdmissionError::Forbidden(msg.into())
    }

    /// Create an AuthorizationFailed error for the given user.
    pub fn authorization_failed(user: impl Into<String>, source: AuthorizerError) -> Self {
        AdmissionError::AuthorizationFailed {
            user: user.into(),
            source,
        }
    }

    /// Create an Internal error.
    pub fn internal_error(msg: impl Into<String>) -> Self {
        AdmissionError::Internal(msg.into())
    }

    pub fn kind(&self) -> DenialKind {
        match self {
            AdmissionError::BadRequest(_) => DenialKind::Semantic,
            AdmissionError::Forbidden(_) | AdmissionError::AuthorizationFailed { .. } => {
                DenialKind::Authorization
            }
            AdmissionError::Internal(_) => DenialKind::Internal,
        }
    }

    /// Returns the status reported back to the API server.
    pub fn status(&self) -> Status {
        let reason = match self.kind() {
            DenialKind::Semantic => StatusReason::BadRequest,
            DenialKind::Authorization => StatusReason::Forbidden,
            DenialKind::Internal => StatusReason::InternalError,
        };
        Status::failure(reason, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::ContextError;

    #[test]
    fn test_error_kinds() {
        let tests = vec![
            (AdmissionError::bad_request("bad"), DenialKind::Semantic, 400),
            (AdmissionError::forbidden("no"), DenialKind::Authorization, 403),
            (
                AdmissionError::authorization_failed("alice", AuthorizerError::provider("boom")),
                DenialKind::Authorization,
                403,
            ),
            (AdmissionError::internal_error("oops"), DenialKind::Internal, 500),
        ];

        for (err, kind, code) in tests {
            assert_eq!(err.kind(), kind, "{}", err);
            assert_eq!(err.status().code, code, "{}", err);
        }
    }

    #[test]
    fn test_messages_are_passed_through() {
        let err = AdmissionError::bad_request("url \"x\" is invalid in client configs");
        assert_eq!(err.to_string(), "url \"x\" is invalid in client configs");
        assert_eq!(err.status().message, "url \"x\" is invalid in client configs");
    }

    #[test]
    fn test_authorization_failure_differs_from_policy_denial() {
        let err = AdmissionError::authorization_failed(
            "alice",
            AuthorizerError::Context(ContextError::DeadlineExceeded),
        );
        assert_eq!(
            err.to_string(),
            "unable to authorize user \"alice\": request deadline exceeded"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
