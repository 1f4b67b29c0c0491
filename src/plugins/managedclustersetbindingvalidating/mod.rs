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

//! ManagedClusterSetBinding validating admission controller.
//!
//! A binding must be named after the cluster set it targets, and the
//! requesting user must be allowed to `create` the `managedclustersets/bind`
//! subresource of that cluster set.

use super::{check_access, typed_objects};
use crate::admission::{
    changed, AdmissionError, AdmissionPlugin, AdmissionResult, Attributes, Handler, Interface,
    Operation, PluginContext, Plugins, ValidationInterface,
};
use crate::api::cluster::{
    ManagedClusterSetBinding, CLUSTER_GROUP, MANAGED_CLUSTER_SETS_RESOURCE,
    MANAGED_CLUSTER_SET_BINDINGS_RESOURCE,
};
use crate::authorization::{Authorizer, RequestAuthorizer, ResourceCheck};
use std::sync::Arc;

/// Plugin name for the ManagedClusterSetBinding validating admission controller.
pub const PLUGIN_NAME: &str =
    "managedclustersetbindingvalidators.admission.cluster.open-cluster-management.io";

/// Register the plugin with the plugin registry.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |context: &PluginContext| {
        Ok(AdmissionPlugin::Validating(Arc::new(Plugin::new(
            context.authorizer.clone(),
        ))))
    });
}

/// Plugin validates ManagedClusterSetBinding requests.
pub struct Plugin {
    handler: Handler,
    authorizer: Arc<dyn Authorizer>,
}

impl Plugin {
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            handler: Handler::new_create_update(),
            authorizer,
        }
    }
}

impl Interface for Plugin {
    fn handles(&self, operation: Operation) -> bool {
        self.handler.handles(operation)
    }
}

impl ValidationInterface for Plugin {
    fn validate(&self, attributes: &dyn Attributes) -> AdmissionResult<()> {
        if !attributes
            .get_resource()
            .is(CLUSTER_GROUP, MANAGED_CLUSTER_SET_BINDINGS_RESOURCE)
        {
            return Ok(());
        }
        if !attributes.get_subresource().is_empty() {
            return Ok(());
        }

        let (binding, old_binding) = match typed_objects::<ManagedClusterSetBinding>(attributes)? {
            Some(objects) => objects,
            None => return Ok(()),
        };

        if binding.name() != binding.spec.cluster_set {
            return Err(AdmissionError::bad_request(
                "The ManagedClusterSetBinding must have the same name as the target ManagedClusterSet",
            ));
        }

        // Metadata-only updates keep the already authorized target.
        if !changed(old_binding, binding, |b| b.spec.cluster_set.as_str()) {
            return Ok(());
        }

        let authz = RequestAuthorizer::new(
            self.authorizer.as_ref(),
            attributes.get_user_info(),
            attributes.get_context(),
        );
        let check = ResourceCheck::new("create", CLUSTER_GROUP, MANAGED_CLUSTER_SETS_RESOURCE)
            .subresource("bind")
            .named(&binding.spec.cluster_set);
        if !check_access(&authz, &check)? {
            return Err(AdmissionError::forbidden(format!(
                "user \"{}\" is not allowed to bind cluster set \"{}\"",
                authz.user().username,
                binding.spec.cluster_set
            )));
        }
        Ok(())
    }
}
