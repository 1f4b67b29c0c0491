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

//! Decoding of admission review requests into typed attributes.

use super::attributes::{AttributesRecord, GroupVersionKind, GroupVersionResource};
use super::context::RequestContext;
use super::errors::{AdmissionError, AdmissionResult};
use super::interfaces::Operation;
use crate::api::cluster::decode_object;
use crate::api::ApiObject;
use crate::authorization::UserInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// AdmissionRequest is the request half of an AdmissionReview as sent by
/// the API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    #[serde(default)]
    pub uid: String,
    pub kind: GroupVersionKind,
    pub resource: GroupVersionResource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_resource: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub operation: Operation,
    #[serde(default)]
    pub user_info: UserInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Value>,
    #[serde(default)]
    pub dry_run: bool,
}

impl AdmissionRequest {
    /// Parse a request from its JSON body.
    pub fn from_slice(body: &[u8]) -> AdmissionResult<Self> {
        serde_json::from_slice(body)
            .map_err(|e| AdmissionError::bad_request(format!("malformed admission request: {}", e)))
    }
}

fn decode(kind: &GroupVersionKind, value: Option<Value>, field: &str) -> AdmissionResult<Option<Box<dyn ApiObject>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => decode_object(&kind.group, &kind.kind, value)
            .map(Some)
            .map_err(|e| {
                AdmissionError::bad_request(format!("failed to decode {} as {}: {}", field, kind.kind, e))
            }),
    }
}

impl TryFrom<AdmissionRequest> for AttributesRecord {
    type Error = AdmissionError;

    fn try_from(request: AdmissionRequest) -> AdmissionResult<Self> {
        let object = decode(&request.kind, request.object, "object")?;
        let old_object = decode(&request.kind, request.old_object, "oldObject")?;

        Ok(AttributesRecord {
            uid: request.uid,
            name: request.name,
            namespace: request.namespace.unwrap_or_default(),
            resource: request.resource,
            subresource: request.sub_resource.unwrap_or_default(),
            operation: request.operation,
            object,
            old_object,
            kind: request.kind,
            user_info: request.user_info,
            context: RequestContext::background(),
            dry_run: request.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::Attributes;
    use crate::api::cluster::{ManagedCluster, CLUSTER_GROUP};
    use crate::api::UnstructuredObject;
    use serde_json::json;

    const CLUSTER_UPDATE: &str = r#"{
        "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
        "kind": {"group": "cluster.open-cluster-management.io", "version": "v1", "kind": "ManagedCluster"},
        "resource": {"group": "cluster.open-cluster-management.io", "version": "v1", "resource": "managedclusters"},
        "name": "cluster1",
        "operation": "UPDATE",
        "userInfo": {"username": "system:serviceaccount:default:sa", "groups": ["system:serviceaccounts"]},
        "object": {
            "apiVersion": "cluster.open-cluster-management.io/v1",
            "kind": "ManagedCluster",
            "metadata": {"name": "cluster1"},
            "spec": {"hubAcceptsClient": true, "leaseDurationSeconds": 60}
        },
        "oldObject": {
            "apiVersion": "cluster.open-cluster-management.io/v1",
            "kind": "ManagedCluster",
            "metadata": {"name": "cluster1"},
            "spec": {"hubAcceptsClient": false, "leaseDurationSeconds": 60}
        },
        "dryRun": false
    }"#;

    #[test]
    fn test_decode_cluster_update() {
        let request = AdmissionRequest::from_slice(CLUSTER_UPDATE.as_bytes()).unwrap();
        let attrs = AttributesRecord::try_from(request).unwrap();

        assert_eq!(attrs.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert_eq!(attrs.get_operation(), Operation::Update);
        assert_eq!(attrs.get_namespace(), "");
        assert_eq!(attrs.get_user_info().username, "system:serviceaccount:default:sa");

        let cluster = attrs
            .get_object()
            .and_then(|o| o.as_any().downcast_ref::<ManagedCluster>())
            .unwrap();
        assert!(cluster.spec.hub_accepts_client);

        let old = attrs
            .get_old_object()
            .and_then(|o| o.as_any().downcast_ref::<ManagedCluster>())
            .unwrap();
        assert!(!old.spec.hub_accepts_client);
    }

    #[test]
    fn test_decode_null_old_object() {
        let request: AdmissionRequest = serde_json::from_value(json!({
            "kind": {"group": CLUSTER_GROUP, "version": "v1", "kind": "ManagedCluster"},
            "resource": {"group": CLUSTER_GROUP, "version": "v1", "resource": "managedclusters"},
            "operation": "CREATE",
            "object": {"metadata": {"name": "c"}},
            "oldObject": null
        }))
        .unwrap();
        let attrs = AttributesRecord::try_from(request).unwrap();
        assert!(attrs.get_object().is_some());
        assert!(attrs.get_old_object().is_none());
    }

    #[test]
    fn test_decode_unknown_kind() {
        let request: AdmissionRequest = serde_json::from_value(json!({
            "kind": {"group": "", "version": "v1", "kind": "ConfigMap"},
            "resource": {"group": "", "version": "v1", "resource": "configmaps"},
            "namespace": "default",
            "operation": "CREATE",
            "object": {"metadata": {"name": "cm"}, "data": {"a": "b"}}
        }))
        .unwrap();
        let attrs = AttributesRecord::try_from(request).unwrap();
        assert_eq!(attrs.get_namespace(), "default");
        assert!(attrs
            .get_object()
            .and_then(|o| o.as_any().downcast_ref::<UnstructuredObject>())
            .is_some());
    }

    #[test]
    fn test_decode_malformed_object_is_bad_request() {
        let request: AdmissionRequest = serde_json::from_value(json!({
            "kind": {"group": CLUSTER_GROUP, "version": "v1", "kind": "ManagedCluster"},
            "resource": {"group": CLUSTER_GROUP, "version": "v1", "resource": "managedclusters"},
            "operation": "CREATE",
            "object": {"metadata": {"name": "c"}, "spec": {"leaseDurationSeconds": "sixty"}}
        }))
        .unwrap();
        let err = AttributesRecord::try_from(request).err().unwrap();
        assert!(matches!(err, AdmissionError::BadRequest(_)), "{}", err);
    }

    #[test]
    fn test_malformed_body() {
        let err = AdmissionRequest::from_slice(b"{not json").err().unwrap();
        assert!(err.to_string().starts_with("malformed admission request"));
    }
}
