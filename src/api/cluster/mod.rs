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

//! Cluster management API types (ManagedCluster, ManagedClusterSetBinding).
//!
//! The types mirror the JSON shape of the open-cluster-management APIs.
//! Fields the admission plugins never look at are kept in `extra` maps so a
//! decoded object serializes back without losing anything.

use super::{ApiObject, UnstructuredObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// API group of ManagedCluster, ManagedClusterSet and ManagedClusterSetBinding.
pub const CLUSTER_GROUP: &str = "cluster.open-cluster-management.io";

/// API group that carries the registration capabilities (e.g. `accept`).
pub const REGISTER_GROUP: &str = "register.open-cluster-management.io";

/// Resource name of ManagedCluster.
pub const MANAGED_CLUSTERS_RESOURCE: &str = "managedclusters";

/// Resource name of ManagedClusterSet.
pub const MANAGED_CLUSTER_SETS_RESOURCE: &str = "managedclustersets";

/// Resource name of ManagedClusterSetBinding.
pub const MANAGED_CLUSTER_SET_BINDINGS_RESOURCE: &str = "managedclustersetbindings";

/// Kind of ManagedCluster.
pub const MANAGED_CLUSTER_KIND: &str = "ManagedCluster";

/// Kind of ManagedClusterSetBinding.
pub const MANAGED_CLUSTER_SET_BINDING_KIND: &str = "ManagedClusterSetBinding";

/// Label that places a ManagedCluster into a ManagedClusterSet.
pub const CLUSTER_SET_LABEL: &str = "cluster.open-cluster-management.io/clusterset";

// ============================================================================
// Object Metadata
// ============================================================================

/// ObjectMeta holds the metadata fields the plugins work with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ObjectMeta {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Taint Types
// ============================================================================

/// TaintEffect describes how a taint affects cluster selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaintEffect {
    /// The cluster is not selected by placements that do not tolerate it.
    NoSelect,
    /// The scheduler tries not to select the cluster.
    PreferNoSelect,
    /// Only placements that have not already selected the cluster are affected.
    NoSelectIfNew,
}

impl TaintEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaintEffect::NoSelect => "NoSelect",
            TaintEffect::PreferNoSelect => "PreferNoSelect",
            TaintEffect::NoSelectIfNew => "NoSelectIfNew",
        }
    }
}

impl fmt::Display for TaintEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Taint marks a ManagedCluster. `time_added` is owned by the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taint {
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    pub effect: TaintEffect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_added: Option<DateTime<Utc>>,
}

/// TaintIdentity is the (key, value, effect) triple that identifies a taint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaintIdentity<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub effect: TaintEffect,
}

impl Taint {
    /// Create a new taint without a timestamp.
    pub fn new(key: &str, value: &str, effect: TaintEffect) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            effect,
            time_added: None,
        }
    }

    /// Returns the identity triple of this taint.
    pub fn identity(&self) -> TaintIdentity<'_> {
        TaintIdentity {
            key: &self.key,
            value: &self.value,
            effect: self.effect,
        }
    }
}

// ============================================================================
// ManagedCluster
// ============================================================================

/// ClientConfig describes how the hub reaches the managed cluster's API server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClientConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            extra: Map::new(),
        }
    }
}

/// ManagedClusterSpec is the desired state of a ManagedCluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_cluster_client_configs: Vec<ClientConfig>,
    #[serde(default)]
    pub hub_accepts_client: bool,
    #[serde(default)]
    pub lease_duration_seconds: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// ManagedCluster represents a cluster registered with the hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCluster {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ManagedClusterSpec,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ManagedCluster {
    pub fn new(name: &str) -> Self {
        Self {
            api_version: format!("{}/v1", CLUSTER_GROUP),
            kind: MANAGED_CLUSTER_KIND.to_string(),
            metadata: ObjectMeta::named(name),
            ..Default::default()
        }
    }

    pub fn with_hub_accepts_client(mut self, accepted: bool) -> Self {
        self.spec.hub_accepts_client = accepted;
        self
    }

    pub fn with_client_config(mut self, url: &str) -> Self {
        self.spec.managed_cluster_client_configs.push(ClientConfig::new(url));
        self
    }

    pub fn with_lease_duration_seconds(mut self, seconds: i32) -> Self {
        self.spec.lease_duration_seconds = seconds;
        self
    }

    pub fn with_taints(mut self, taints: Vec<Taint>) -> Self {
        self.spec.taints = taints;
        self
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.metadata.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Returns the ManagedClusterSet this cluster belongs to, if any.
    /// An empty label value means no membership.
    pub fn cluster_set(&self) -> Option<&str> {
        self.metadata
            .labels
            .get(CLUSTER_SET_LABEL)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

impl ApiObject for ManagedCluster {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn kind(&self) -> &str {
        MANAGED_CLUSTER_KIND
    }

    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

// ============================================================================
// ManagedClusterSetBinding
// ============================================================================

/// ManagedClusterSetBindingSpec names the ManagedClusterSet to bind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterSetBindingSpec {
    #[serde(default)]
    pub cluster_set: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// ManagedClusterSetBinding makes a ManagedClusterSet available in a namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterSetBinding {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ManagedClusterSetBindingSpec,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ManagedClusterSetBinding {
    pub fn new(namespace: &str, name: &str, cluster_set: &str) -> Self {
        Self {
            api_version: format!("{}/v1beta1", CLUSTER_GROUP),
            kind: MANAGED_CLUSTER_SET_BINDING_KIND.to_string(),
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: namespace.to_string(),
                ..Default::default()
            },
            spec: ManagedClusterSetBindingSpec {
                cluster_set: cluster_set.to_string(),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.metadata.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

impl ApiObject for ManagedClusterSetBinding {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn kind(&self) -> &str {
        MANAGED_CLUSTER_SET_BINDING_KIND
    }

    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a raw object into its typed representation.
///
/// Objects of the cluster group are decoded by kind; anything else is kept
/// as an [`UnstructuredObject`].
pub fn decode_object(group: &str, kind: &str, value: Value) -> serde_json::Result<Box<dyn ApiObject>> {
    if group != CLUSTER_GROUP {
        return Ok(Box::new(UnstructuredObject::new(kind, value)));
    }
    match kind {
        MANAGED_CLUSTER_KIND => Ok(Box::new(serde_json::from_value::<ManagedCluster>(value)?)),
        MANAGED_CLUSTER_SET_BINDING_KIND => Ok(Box::new(
            serde_json::from_value::<ManagedClusterSetBinding>(value)?,
        )),
        _ => Ok(Box::new(UnstructuredObject::new(kind, value))),
    }
}
