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

//! Admission control for cluster registration resources.
//!
//! This crate decides whether create and update requests for
//! `ManagedCluster` and `ManagedClusterSetBinding` objects may be stored,
//! and fills in the fields the system owns before they are. The checks are
//! organised as admission plugins behind the [`MutationInterface`] and
//! [`ValidationInterface`] traits and chained by an [`Engine`].
//!
//! Permission checks are delegated to an [`Authorizer`] supplied by the
//! caller. Transport, TLS and webhook registration are left to the embedding
//! server.

pub mod admission;
pub mod api;
pub mod authorization;
pub mod config;
pub mod engine;
pub mod plugins;

// Re-export commonly used types
pub use admission::{
    AdmissionError, AdmissionRequest, AdmissionResult, Attributes, AttributesRecord, Decision,
    Handler, Interface, MutationInterface, Operation, PluginContext, Plugins, RequestContext,
    ValidationInterface,
};
pub use api::cluster::{ManagedCluster, ManagedClusterSetBinding, Taint, TaintEffect};
pub use authorization::{Authorizer, AuthorizerAttributes, AuthorizerError, UserInfo};
pub use config::{Config, ConfigError};
pub use engine::Engine;
