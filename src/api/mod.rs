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

//! API object types handled by the admission plugins.

pub mod cluster;

use serde_json::Value;
use std::any::Any;

/// ApiObject is a trait for API objects that can be used in admission.
pub trait ApiObject: Send + Sync {
    /// Returns the object as Any for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns the object as mutable Any for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Returns the kind of this object.
    fn kind(&self) -> &str;

    /// Serializes the object back into its JSON representation.
    fn to_value(&self) -> serde_json::Result<Value>;
}

/// UnstructuredObject carries an object whose kind no plugin knows about.
///
/// Plugins never downcast to it, so requests for other kinds pass through
/// the chain untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct UnstructuredObject {
    pub kind: String,
    pub value: Value,
}

impl UnstructuredObject {
    pub fn new(kind: &str, value: Value) -> Self {
        Self {
            kind: kind.to_string(),
            value,
        }
    }
}

impl ApiObject for UnstructuredObject {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn to_value(&self) -> serde_json::Result<Value> {
        Ok(self.value.clone())
    }
}
