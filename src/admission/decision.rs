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

//! Admission decisions returned to the API server.

use super::errors::AdmissionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// StatusReason is the machine-readable reason of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusReason {
    BadRequest,
    Forbidden,
    InternalError,
}

impl StatusReason {
    pub fn code(&self) -> u16 {
        match self {
            StatusReason::BadRequest => 400,
            StatusReason::Forbidden => 403,
            StatusReason::InternalError => 500,
        }
    }
}

/// Status carries the details of a denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub code: u16,
    pub reason: StatusReason,
    pub message: String,
}

impl Status {
    pub fn failure(reason: StatusReason, message: impl Into<String>) -> Self {
        Self {
            code: reason.code(),
            reason,
            message: message.into(),
        }
    }
}

/// Decision is the outcome of one admission pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub uid: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Status>,
    /// The object with defaults applied. Only set by the mutation pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patched_object: Option<Value>,
}

impl Decision {
    pub fn allow(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            allowed: true,
            result: None,
            patched_object: None,
        }
    }

    pub fn deny(uid: &str, err: &AdmissionError) -> Self {
        Self {
            uid: uid.to_string(),
            allowed: false,
            result: Some(err.status()),
            patched_object: None,
        }
    }

    pub fn with_patched_object(mut self, object: Value) -> Self {
        self.patched_object = Some(object);
        self
    }

    /// Returns the denial message, if the request was denied.
    pub fn reason(&self) -> Option<&str> {
        self.result.as_ref().map(|status| status.message.as_str())
    }
}
