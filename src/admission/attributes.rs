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

//! Admission attributes that describe an admission request.

use super::context::RequestContext;
use super::interfaces::Operation;
use crate::api::cluster::{
    ManagedCluster, ManagedClusterSetBinding, CLUSTER_GROUP, MANAGED_CLUSTERS_RESOURCE,
    MANAGED_CLUSTER_KIND, MANAGED_CLUSTER_SET_BINDINGS_RESOURCE, MANAGED_CLUSTER_SET_BINDING_KIND,
};
use crate::api::ApiObject;
use crate::authorization::UserInfo;
use serde::{Deserialize, Serialize};

/// GroupVersionResource identifies a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionResource {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }

    /// Reports whether this is `resource` of `group`, at any version.
    pub fn is(&self, group: &str, resource: &str) -> bool {
        self.group == group && self.resource == resource
    }
}

/// GroupVersionKind identifies a kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// Attributes is an interface used by AdmissionController to get information about a request
/// that is used to make an admission decision.
pub trait Attributes {
    /// Returns the name of the object as presented in the request.
    fn get_name(&self) -> &str;

    /// Returns the namespace associated with the request (if any).
    fn get_namespace(&self) -> &str;

    /// Returns the resource being requested.
    fn get_resource(&self) -> &GroupVersionResource;

    /// Returns the name of the subresource being requested.
    fn get_subresource(&self) -> &str;

    /// Returns the operation being performed.
    fn get_operation(&self) -> Operation;

    /// Returns the object from the incoming request.
    fn get_object(&self) -> Option<&dyn ApiObject>;

    /// Returns the object as a mutable reference.
    fn get_object_mut(&mut self) -> Option<&mut (dyn ApiObject + 'static)>;

    /// Returns the existing object (only populated for UPDATE and DELETE requests).
    fn get_old_object(&self) -> Option<&dyn ApiObject>;

    /// Returns the kind of object being manipulated.
    fn get_kind(&self) -> &GroupVersionKind;

    /// Returns the user making the request.
    fn get_user_info(&self) -> &UserInfo;

    /// Returns the deadline and cancellation state of the request.
    fn get_context(&self) -> &RequestContext;

    /// Check if this request is a dry run.
    fn is_dry_run(&self) -> bool;
}

/// AttributesRecord is a concrete implementation of Attributes.
pub struct AttributesRecord {
    pub uid: String,
    pub name: String,
    pub namespace: String,
    pub resource: GroupVersionResource,
    pub subresource: String,
    pub operation: Operation,
    pub object: Option<Box<dyn ApiObject>>,
    pub old_object: Option<Box<dyn ApiObject>>,
    pub kind: GroupVersionKind,
    pub user_info: UserInfo,
    pub context: RequestContext,
    pub dry_run: bool,
}

impl AttributesRecord {
    /// Create a new AttributesRecord with an anonymous user and a background context.
    pub fn new(
        name: &str,
        namespace: &str,
        resource: GroupVersionResource,
        kind: GroupVersionKind,
        operation: Operation,
        object: Option<Box<dyn ApiObject>>,
        old_object: Option<Box<dyn ApiObject>>,
    ) -> Self {
        Self {
            uid: String::new(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            resource,
            subresource: String::new(),
            operation,
            object,
            old_object,
            kind,
            user_info: UserInfo::default(),
            context: RequestContext::background(),
            dry_run: false,
        }
    }

    /// Helper to create attributes for a ManagedCluster request.
    pub fn new_managed_cluster(
        operation: Operation,
        cluster: ManagedCluster,
        old_cluster: Option<ManagedCluster>,
    ) -> Self {
        Self::new(
            &cluster.metadata.name.clone(),
            "",
            GroupVersionResource::new(CLUSTER_GROUP, "v1", MANAGED_CLUSTERS_RESOURCE),
            GroupVersionKind::new(CLUSTER_GROUP, "v1", MANAGED_CLUSTER_KIND),
            operation,
            Some(Box::new(cluster)),
            old_cluster.map(|c| Box::new(c) as Box<dyn ApiObject>),
        )
    }

    /// Helper to create attributes for a ManagedClusterSetBinding request.
    pub fn new_cluster_set_binding(
        operation: Operation,
        binding: ManagedClusterSetBinding,
        old_binding: Option<ManagedClusterSetBinding>,
    ) -> Self {
        Self::new(
            &binding.metadata.name.clone(),
            &binding.metadata.namespace.clone(),
            GroupVersionResource::new(CLUSTER_GROUP, "v1beta1", MANAGED_CLUSTER_SET_BINDINGS_RESOURCE),
            GroupVersionKind::new(CLUSTER_GROUP, "v1beta1", MANAGED_CLUSTER_SET_BINDING_KIND),
            operation,
            Some(Box::new(binding)),
            old_binding.map(|b| Box::new(b) as Box<dyn ApiObject>),
        )
    }

    pub fn with_user(mut self, user_info: UserInfo) -> Self {
        self.user_info = user_info;
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_subresource(mut self, subresource: &str) -> Self {
        self.subresource = subresource.to_string();
        self
    }
}

impl Attributes for AttributesRecord {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn get_namespace(&self) -> &str {
        &self.namespace
    }

    fn get_resource(&self) -> &GroupVersionResource {
        &self.resource
    }

    fn get_subresource(&self) -> &str {
        &self.subresource
    }

    fn get_operation(&self) -> Operation {
        self.operation
    }

    fn get_object(&self) -> Option<&dyn ApiObject> {
        self.object.as_deref()
    }

    fn get_object_mut(&mut self) -> Option<&mut (dyn ApiObject + 'static)> {
        self.object.as_deref_mut()
    }

    fn get_old_object(&self) -> Option<&dyn ApiObject> {
        self.old_object.as_deref()
    }

    fn get_kind(&self) -> &GroupVersionKind {
        &self.kind
    }

    fn get_user_info(&self) -> &UserInfo {
        &self.user_info
    }

    fn get_context(&self) -> &RequestContext {
        &self.context
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}
