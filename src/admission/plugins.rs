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

//! Plugin registry for admission controllers.

use super::clock::{Clock, RealClock};
use super::errors::{AdmissionError, AdmissionResult};
use super::interfaces::{MutationInterface, Operation, ValidationInterface};
use crate::authorization::Authorizer;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// PluginContext hands plugins the collaborators they depend on.
#[derive(Clone)]
pub struct PluginContext {
    pub authorizer: Arc<dyn Authorizer>,
    pub clock: Arc<dyn Clock>,
}

impl PluginContext {
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            authorizer,
            clock: Arc::new(RealClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// AdmissionPlugin is an instantiated plugin, tagged with the pass it takes part in.
#[derive(Clone)]
pub enum AdmissionPlugin {
    Mutating(Arc<dyn MutationInterface>),
    Validating(Arc<dyn ValidationInterface>),
}

impl AdmissionPlugin {
    pub fn handles(&self, operation: Operation) -> bool {
        match self {
            AdmissionPlugin::Mutating(plugin) => plugin.handles(operation),
            AdmissionPlugin::Validating(plugin) => plugin.handles(operation),
        }
    }
}

/// Factory is a function that creates an admission plugin instance.
pub type Factory = fn(context: &PluginContext) -> AdmissionResult<AdmissionPlugin>;

/// Plugins is a registry of admission plugins.
#[derive(Default)]
pub struct Plugins {
    registry: RwLock<BTreeMap<String, Factory>>,
}

impl Plugins {
    /// Create a new empty plugin registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new admission plugin with the given name and factory.
    pub fn register(&self, name: &str, factory: Factory) {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), factory);
    }

    /// Get a factory for the given plugin name.
    pub fn get_factory(&self, name: &str) -> Option<Factory> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    /// Get all registered plugin names, sorted.
    pub fn registered_names(&self) -> Vec<String> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Check if a plugin is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.get_factory(name).is_some()
    }

    /// Create a new instance of the named plugin.
    pub fn new_from_plugins(&self, name: &str, context: &PluginContext) -> AdmissionResult<AdmissionPlugin> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| AdmissionError::internal_error(format!("unknown admission plugin: {}", name)))?;
        factory(context)
    }
}
