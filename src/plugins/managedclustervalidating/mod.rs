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

//! ManagedCluster validating admission controller.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. every `spec.managedClusterClientConfigs[*].url` must be an absolute URL
//!    with a scheme and a host;
//! 2. changing `spec.hubAcceptsClient` (or creating an accepted cluster)
//!    requires `update` on `managedclusters/accept` for this cluster;
//! 3. adding, changing or removing the cluster-set label requires `create`
//!    on `managedclustersets/join` for the affected cluster set.
//!
//! The affected cluster set is the one named by the new label value, or the
//! old value when the label is removed. Moving a cluster from set X to set Y
//! is checked against Y only: leaving X needs no permission of its own,
//! even though the denial message speaks of adding and removing.

use super::{check_access, typed_objects};
use crate::admission::{
    changed, AdmissionError, AdmissionPlugin, AdmissionResult, Attributes, Handler, Interface,
    Operation, PluginContext, Plugins, ValidationInterface,
};
use crate::api::cluster::{
    ManagedCluster, CLUSTER_GROUP, MANAGED_CLUSTERS_RESOURCE, MANAGED_CLUSTER_SETS_RESOURCE,
    REGISTER_GROUP,
};
use crate::authorization::{Authorizer, RequestAuthorizer, ResourceCheck};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Plugin name for the ManagedCluster validating admission controller.
pub const PLUGIN_NAME: &str = "managedclustervalidators.admission.cluster.open-cluster-management.io";

/// Register the plugin with the plugin registry.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |context: &PluginContext| {
        Ok(AdmissionPlugin::Validating(Arc::new(Plugin::new(
            context.authorizer.clone(),
        ))))
    });
}

/// Plugin validates ManagedCluster requests.
pub struct Plugin {
    handler: Handler,
    authorizer: Arc<dyn Authorizer>,
}

impl Plugin {
    /// Create a new plugin that delegates permission checks to `authorizer`.
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
            .is(CLUSTER_GROUP, MANAGED_CLUSTERS_RESOURCE)
        {
            return Ok(());
        }
        if !attributes.get_subresource().is_empty() {
            return Ok(());
        }

        let (cluster, old_cluster) = match typed_objects::<ManagedCluster>(attributes)? {
            Some(objects) => objects,
            None => return Ok(()),
        };

        validate_client_configs(cluster)?;

        let authz = RequestAuthorizer::new(
            self.authorizer.as_ref(),
            attributes.get_user_info(),
            attributes.get_context(),
        );
        validate_hub_accepts_client(&authz, cluster, old_cluster)?;
        validate_cluster_set(&authz, cluster, old_cluster)
    }
}

fn validate_client_configs(cluster: &ManagedCluster) -> AdmissionResult<()> {
    for config in &cluster.spec.managed_cluster_client_configs {
        if !is_valid_url(&config.url) {
            return Err(AdmissionError::bad_request(format!(
                "url \"{}\" is invalid in client configs",
                config.url
            )));
        }
    }
    Ok(())
}

/// An absolute URL with a scheme and a non-empty host. `127.0.0.1:8001` is
/// not one: without a scheme it does not parse as absolute.
fn is_valid_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => !url.scheme().is_empty() && url.host_str().is_some_and(|host| !host.is_empty()),
        Err(_) => false,
    }
}

fn validate_hub_accepts_client(
    authz: &RequestAuthorizer<'_>,
    cluster: &ManagedCluster,
    old_cluster: Option<&ManagedCluster>,
) -> AdmissionResult<()> {
    if !changed(old_cluster, cluster, |c| c.spec.hub_accepts_client) {
        return Ok(());
    }

    let check = ResourceCheck::new("update", REGISTER_GROUP, MANAGED_CLUSTERS_RESOURCE)
        .subresource("accept")
        .named(cluster.name());
    if !check_access(authz, &check)? {
        return Err(AdmissionError::forbidden(format!(
            "user \"{}\" cannot update the HubAcceptsClient field",
            authz.user().username
        )));
    }
    Ok(())
}

fn validate_cluster_set(
    authz: &RequestAuthorizer<'_>,
    cluster: &ManagedCluster,
    old_cluster: Option<&ManagedCluster>,
) -> AdmissionResult<()> {
    if !changed(old_cluster, cluster, ManagedCluster::cluster_set) {
        return Ok(());
    }

    // Joining or moving is checked against the new set, leaving against the old one.
    let cluster_set = match cluster
        .cluster_set()
        .or_else(|| old_cluster.and_then(ManagedCluster::cluster_set))
    {
        Some(name) => name,
        None => return Ok(()),
    };
    debug!(cluster = %cluster.name(), cluster_set, "cluster set membership changed");

    let check = ResourceCheck::new("create", CLUSTER_GROUP, MANAGED_CLUSTER_SETS_RESOURCE)
        .subresource("join")
        .named(cluster_set);
    if !check_access(authz, &check)? {
        return Err(AdmissionError::forbidden(format!(
            "user \"{}\" cannot add/remove a ManagedCluster to/from ManagedClusterSet \"{}\"",
            authz.user().username,
            cluster_set
        )));
    }
    Ok(())
}
