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

//! Operation filter shared by the admission plugins.

use super::interfaces::{Interface, Operation};

/// Handler decides which operations a plugin takes part in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    operations: Vec<Operation>,
}

impl Handler {
    /// Create a new Handler that handles the given operations.
    pub fn new(operations: &[Operation]) -> Self {
        let mut ops = operations.to_vec();
        ops.dedup();
        Self { operations: ops }
    }

    /// Create a new Handler for CREATE and UPDATE, the only operations the
    /// cluster admission plugins act on. DELETE and CONNECT pass through.
    pub fn new_create_update() -> Self {
        Self::new(&[Operation::Create, Operation::Update])
    }
}

impl Interface for Handler {
    fn handles(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }
}
