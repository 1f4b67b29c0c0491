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

//! ManagedCluster defaulting admission controller.
//!
//! This admission controller fills in the system-owned fields of a
//! ManagedCluster before it is stored:
//!
//! - `spec.leaseDurationSeconds` is set to [`DEFAULT_LEASE_DURATION_SECONDS`]
//!   whenever it is not positive, on every CREATE and UPDATE.
//! - `spec.taints[*].timeAdded` records when a (key, value, effect) triple
//!   first appeared. Taints already present on the old object keep their
//!   timestamp regardless of position; any other taint is stamped with the
//!   admission time.
//!
//! The plugin never rejects a request.

use crate::admission::{
    AdmissionError, AdmissionPlugin, AdmissionResult, Attributes, Clock, Handler, Interface,
    MutationInterface, Operation, PluginContext, Plugins,
};
use crate::api::cluster::{
    ManagedCluster, Taint, TaintIdentity, CLUSTER_GROUP, MANAGED_CLUSTERS_RESOURCE,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Plugin name for the ManagedCluster defaulting admission controller.
pub const PLUGIN_NAME: &str = "managedclustermutators.admission.cluster.open-cluster-management.io";

/// Lease duration applied when a ManagedCluster has none.
pub const DEFAULT_LEASE_DURATION_SECONDS: i32 = 60;

/// Register the plugin with the plugin registry.
pub fn register(plugins: &Plugins) {
    plugins.register(PLUGIN_NAME, |context: &PluginContext| {
        Ok(AdmissionPlugin::Mutating(Arc::new(Plugin::new(
            context.clock.clone(),
        ))))
    });
}

/// Plugin holds state for and implements the admission plugin.
pub struct Plugin {
    handler: Handler,
    clock: Arc<dyn Clock>,
}

impl Plugin {
    /// Create a new defaulting plugin that stamps taints with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            handler: Handler::new_create_update(),
            clock,
        }
    }
}

impl Interface for Plugin {
    fn handles(&self, operation: Operation) -> bool {
        self.handler.handles(operation)
    }
}

impl MutationInterface for Plugin {
    fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
        if !attributes
            .get_resource()
            .is(CLUSTER_GROUP, MANAGED_CLUSTERS_RESOURCE)
        {
            return Ok(());
        }
        if !attributes.get_subresource().is_empty() {
            return Ok(());
        }

        // Copy the old taints out first; the new object is borrowed mutably below.
        let old_taints = match (attributes.get_operation(), attributes.get_old_object()) {
            (Operation::Update, Some(obj)) => match obj.as_any().downcast_ref::<ManagedCluster>() {
                Some(old) => old.spec.taints.clone(),
                None => {
                    return Err(AdmissionError::internal_error(format!(
                        "unexpected object of kind {}",
                        obj.kind()
                    )));
                }
            },
            _ => Vec::new(),
        };

        let cluster = match attributes.get_object_mut() {
            Some(obj) => {
                let kind = obj.kind().to_string();
                match obj.as_any_mut().downcast_mut::<ManagedCluster>() {
                    Some(cluster) => cluster,
                    None => {
                        return Err(AdmissionError::internal_error(format!(
                            "unexpected object of kind {}",
                            kind
                        )));
                    }
                }
            }
            None => return Ok(()),
        };

        if cluster.spec.lease_duration_seconds <= 0 {
            debug!(
                cluster = %cluster.metadata.name,
                from = cluster.spec.lease_duration_seconds,
                to = DEFAULT_LEASE_DURATION_SECONDS,
                "defaulting lease duration"
            );
            cluster.spec.lease_duration_seconds = DEFAULT_LEASE_DURATION_SECONDS;
        }

        set_taint_time_added(&old_taints, &mut cluster.spec.taints, self.clock.now());
        Ok(())
    }
}

/// Stamp every taint with the time its (key, value, effect) triple first appeared.
fn set_taint_time_added(old_taints: &[Taint], taints: &mut [Taint], now: DateTime<Utc>) {
    let added: HashMap<TaintIdentity<'_>, DateTime<Utc>> = old_taints
        .iter()
        .filter_map(|taint| taint.time_added.map(|added| (taint.identity(), added)))
        .collect();

    for taint in taints.iter_mut() {
        let time_added = added.get(&taint.identity()).copied().unwrap_or(now);
        taint.time_added = Some(time_added);
    }
}
