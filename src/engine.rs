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

//! The admission chain.
//!
//! An [`Engine`] owns the enabled plugins in configured order and runs one of
//! two passes over a request:
//!
//! - the mutation pass runs every mutating plugin that handles the operation
//!   and, when defaulting changed the object, returns it as the patched
//!   object;
//! - the validation pass runs every validating plugin and stops at the first
//!   denial.
//!
//! Neither pass keeps state between requests, so one engine can serve any
//! number of concurrent requests.

use crate::admission::{
    AdmissionError, AdmissionPlugin, AdmissionRequest, AdmissionResult, Attributes,
    AttributesRecord, Decision, MutationInterface, PluginContext, Plugins, RequestContext,
    ValidationInterface,
};
use crate::api::ApiObject;
use crate::config::{Config, ConfigError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span};

/// Engine runs admission requests through the enabled plugins.
pub struct Engine {
    mutators: Vec<(String, Arc<dyn MutationInterface>)>,
    validators: Vec<(String, Arc<dyn ValidationInterface>)>,
    authorization_timeout: Duration,
}

impl Engine {
    /// Build the chain named by `config` from the factories in `plugins`.
    pub fn new(config: &Config, plugins: &Plugins, context: &PluginContext) -> Result<Self, ConfigError> {
        let mut mutators = Vec::new();
        let mut validators = Vec::new();

        for name in &config.plugins {
            if !plugins.is_registered(name) {
                return Err(ConfigError::UnknownPlugin(name.clone()));
            }
            let plugin = plugins
                .new_from_plugins(name, context)
                .map_err(|source| ConfigError::Plugin {
                    name: name.clone(),
                    source,
                })?;
            match plugin {
                AdmissionPlugin::Mutating(plugin) => mutators.push((name.clone(), plugin)),
                AdmissionPlugin::Validating(plugin) => validators.push((name.clone(), plugin)),
            }
        }

        debug!(
            mutators = mutators.len(),
            validators = validators.len(),
            "admission chain initialized"
        );
        Ok(Self {
            mutators,
            validators,
            authorization_timeout: config.authorization_timeout(),
        })
    }

    /// Names of the enabled mutating plugins, in run order.
    pub fn mutating_plugins(&self) -> impl Iterator<Item = &str> {
        self.mutators.iter().map(|(name, _)| name.as_str())
    }

    /// Names of the enabled validating plugins, in run order.
    pub fn validating_plugins(&self) -> impl Iterator<Item = &str> {
        self.validators.iter().map(|(name, _)| name.as_str())
    }

    /// Run the mutation pass over a decoded request.
    ///
    /// When a plugin changed the object, the decision carries it as it should
    /// be persisted. Requests with nothing to default carry no patch.
    pub fn admit(&self, attributes: &mut AttributesRecord) -> Decision {
        let span = request_span("mutate", attributes);
        let _enter = span.enter();

        match self.mutate(attributes) {
            Ok(patched) => {
                debug!(patched = patched.is_some(), "request admitted");
                let decision = Decision::allow(&attributes.uid);
                match patched {
                    Some(object) => decision.with_patched_object(object),
                    None => decision,
                }
            }
            Err(err) => deny(&attributes.uid, &err),
        }
    }

    /// Run the validation pass over a decoded request.
    pub fn validate(&self, attributes: &AttributesRecord) -> Decision {
        let span = request_span("validate", attributes);
        let _enter = span.enter();

        match self.run_validators(attributes) {
            Ok(()) => {
                debug!("request allowed");
                Decision::allow(&attributes.uid)
            }
            Err(err) => deny(&attributes.uid, &err),
        }
    }

    /// Decode `request` and run the mutation pass.
    ///
    /// `context` is bounded by the configured authorization timeout unless it
    /// already carries a deadline.
    pub fn review_mutation(&self, request: AdmissionRequest, context: RequestContext) -> Decision {
        let uid = request.uid.clone();
        match self.decode(request, context) {
            Ok(mut attributes) => self.admit(&mut attributes),
            Err(err) => deny(&uid, &err),
        }
    }

    /// Decode `request` and run the validation pass.
    pub fn review_validation(&self, request: AdmissionRequest, context: RequestContext) -> Decision {
        let uid = request.uid.clone();
        match self.decode(request, context) {
            Ok(attributes) => self.validate(&attributes),
            Err(err) => deny(&uid, &err),
        }
    }

    /// Decode `request`, mutate it and validate the mutated object.
    ///
    /// This is the whole chain as the API server applies it. An allowed
    /// decision carries the patched object of the mutation pass.
    pub fn review(&self, request: AdmissionRequest, context: RequestContext) -> Decision {
        let uid = request.uid.clone();
        let mut attributes = match self.decode(request, context) {
            Ok(attributes) => attributes,
            Err(err) => return deny(&uid, &err),
        };

        let mutated = self.admit(&mut attributes);
        if !mutated.allowed {
            return mutated;
        }
        let validated = self.validate(&attributes);
        match (validated.allowed, mutated.patched_object) {
            (true, Some(object)) => validated.with_patched_object(object),
            _ => validated,
        }
    }

    fn decode(&self, request: AdmissionRequest, context: RequestContext) -> AdmissionResult<AttributesRecord> {
        let mut context = context;
        context.ensure_deadline(self.authorization_timeout);
        Ok(AttributesRecord::try_from(request)?.with_context(context))
    }

    /// Returns the mutated object if any plugin changed it.
    fn mutate(&self, attributes: &mut AttributesRecord) -> AdmissionResult<Option<Value>> {
        let operation = attributes.get_operation();
        if !self.mutators.iter().any(|(_, plugin)| plugin.handles(operation)) {
            return Ok(None);
        }

        let before = encode(attributes.get_object())?;
        for (name, plugin) in &self.mutators {
            if !plugin.handles(operation) {
                continue;
            }
            debug!(plugin = %name, "running mutating plugin");
            plugin.admit(attributes)?;
        }
        let after = encode(attributes.get_object())?;

        Ok(after.filter(|after| before.as_ref() != Some(after)))
    }

    fn run_validators(&self, attributes: &AttributesRecord) -> AdmissionResult<()> {
        for (name, plugin) in &self.validators {
            if !plugin.handles(attributes.get_operation()) {
                continue;
            }
            debug!(plugin = %name, "running validating plugin");
            plugin.validate(attributes)?;
        }
        Ok(())
    }
}

fn encode(object: Option<&dyn ApiObject>) -> AdmissionResult<Option<Value>> {
    object
        .map(|object| object.to_value())
        .transpose()
        .map_err(|e| AdmissionError::internal_error(format!("failed to encode object: {}", e)))
}

fn request_span(pass: &'static str, attributes: &AttributesRecord) -> tracing::Span {
    info_span!(
        "admission",
        pass,
        uid = %attributes.uid,
        operation = %attributes.operation,
        kind = %attributes.kind.kind,
        namespace = %attributes.namespace,
        name = %attributes.name,
        user = %attributes.user_info.username,
        dry_run = attributes.dry_run
    )
}

fn deny(uid: &str, err: &AdmissionError) -> Decision {
    info!(kind = ?err.kind(), reason = %err, "request denied");
    Decision::deny(uid, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{FakeClock, Operation, StatusReason};
    use crate::api::cluster::{
        ManagedCluster, ManagedClusterSetBinding, Taint, TaintEffect, CLUSTER_SET_LABEL,
    };
    use crate::authorization::testing::FakeAuthorizer;
    use crate::authorization::{AuthorizerError, UserInfo};
    use crate::plugins::{
        managedclustermutating, managedclustersetbindingvalidating, managedclustervalidating,
        register_all_admission_plugins, ALL_ORDERED_PLUGINS,
    };
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn new_engine(config: &Config, authorizer: FakeAuthorizer) -> Engine {
        let plugins = Plugins::new();
        register_all_admission_plugins(&plugins);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let context = PluginContext::new(Arc::new(authorizer)).with_clock(Arc::new(FakeClock::new(now)));
        Engine::new(config, &plugins, &context).unwrap()
    }

    #[test]
    fn test_new_orders_plugins() {
        let engine = new_engine(&Config::default(), FakeAuthorizer::new());
        assert_eq!(
            engine.mutating_plugins().collect::<Vec<_>>(),
            vec![managedclustermutating::PLUGIN_NAME]
        );
        assert_eq!(
            engine.validating_plugins().collect::<Vec<_>>(),
            vec![
                managedclustervalidating::PLUGIN_NAME,
                managedclustersetbindingvalidating::PLUGIN_NAME
            ]
        );
    }

    #[test]
    fn test_new_rejects_unknown_plugin() {
        let plugins = Plugins::new();
        register_all_admission_plugins(&plugins);
        let context = PluginContext::new(Arc::new(FakeAuthorizer::new()));
        let config = Config {
            plugins: vec!["NamespaceLifecycle".to_string()],
            ..Config::default()
        };
        let err = Engine::new(&config, &plugins, &context).err().unwrap();
        assert!(matches!(err, ConfigError::UnknownPlugin(ref name) if name == "NamespaceLifecycle"));
    }

    #[test]
    fn test_admit_returns_defaulted_object() {
        let engine = new_engine(&Config::default(), FakeAuthorizer::new());
        let cluster = ManagedCluster::new("cluster1")
            .with_taints(vec![Taint::new("foo", "bar", TaintEffect::NoSelect)]);
        let mut attrs = AttributesRecord::new_managed_cluster(Operation::Create, cluster, None);

        let decision = engine.admit(&mut attrs);
        assert!(decision.allowed);
        let patched = decision.patched_object.unwrap();
        assert_eq!(patched["spec"]["leaseDurationSeconds"], json!(60));
        assert_eq!(patched["spec"]["taints"][0]["timeAdded"], json!("2024-05-01T12:00:00Z"));
    }

    #[test]
    fn test_admit_without_mutators_has_no_patch() {
        let config = Config {
            plugins: vec![managedclustervalidating::PLUGIN_NAME.to_string()],
            ..Config::default()
        };
        let engine = new_engine(&config, FakeAuthorizer::new());
        let mut attrs =
            AttributesRecord::new_managed_cluster(Operation::Create, ManagedCluster::new("c1"), None);
        let decision = engine.admit(&mut attrs);
        assert!(decision.allowed);
        assert!(decision.patched_object.is_none());
    }

    #[test]
    fn test_admit_skips_delete() {
        let engine = new_engine(&Config::default(), FakeAuthorizer::new());
        let mut attrs =
            AttributesRecord::new_managed_cluster(Operation::Delete, ManagedCluster::new("c1"), None);
        let decision = engine.admit(&mut attrs);
        assert!(decision.allowed);
        assert!(decision.patched_object.is_none());
    }

    #[test]
    fn test_review_mutation_patches_only_defaulted_objects() {
        struct TestCase {
            name: &'static str,
            kind: serde_json::Value,
            resource: serde_json::Value,
            object: serde_json::Value,
            expect_patch: bool,
        }

        let cluster_kind = json!({"group": "cluster.open-cluster-management.io", "version": "v1", "kind": "ManagedCluster"});
        let cluster_resource = json!({"group": "cluster.open-cluster-management.io", "version": "v1", "resource": "managedclusters"});
        let tests = vec![
            TestCase {
                name: "binding",
                kind: json!({"group": "cluster.open-cluster-management.io", "version": "v1beta1", "kind": "ManagedClusterSetBinding"}),
                resource: json!({"group": "cluster.open-cluster-management.io", "version": "v1beta1", "resource": "managedclustersetbindings"}),
                object: json!({"metadata": {"name": "a", "namespace": "ns1", "labels": {}}, "spec": {"clusterSet": "a"}}),
                expect_patch: false,
            },
            TestCase {
                name: "unknown kind",
                kind: json!({"group": "", "version": "v1", "kind": "ConfigMap"}),
                resource: json!({"group": "", "version": "v1", "resource": "configmaps"}),
                object: json!({"metadata": {"name": "cm"}, "data": {"a": "b"}}),
                expect_patch: false,
            },
            TestCase {
                name: "cluster with nothing to default",
                kind: cluster_kind.clone(),
                resource: cluster_resource.clone(),
                object: json!({"metadata": {"name": "c1"}, "spec": {"leaseDurationSeconds": 30}}),
                expect_patch: false,
            },
            TestCase {
                name: "cluster without lease",
                kind: cluster_kind,
                resource: cluster_resource,
                object: json!({"metadata": {"name": "c1"}, "spec": {}}),
                expect_patch: true,
            },
        ];

        let engine = new_engine(&Config::default(), FakeAuthorizer::new());
        for test in tests {
            let request: AdmissionRequest = serde_json::from_value(json!({
                "uid": "uid-4",
                "kind": test.kind,
                "resource": test.resource,
                "operation": "CREATE",
                "object": test.object,
            }))
            .unwrap();

            let decision = engine.review_mutation(request, RequestContext::background());
            assert!(decision.allowed, "{}: {:?}", test.name, decision.result);
            assert_eq!(
                decision.patched_object.is_some(),
                test.expect_patch,
                "{}: {:?}",
                test.name,
                decision.patched_object
            );
        }
    }

    #[test]
    fn test_review_with_unrepresentable_timeout() {
        let config = Config {
            authorization_timeout_seconds: u64::MAX,
            plugins: ALL_ORDERED_PLUGINS.iter().map(|name| name.to_string()).collect(),
        };
        let engine = new_engine(&config, FakeAuthorizer::new());
        let request: AdmissionRequest = serde_json::from_value(json!({
            "uid": "uid-5",
            "kind": {"group": "cluster.open-cluster-management.io", "version": "v1", "kind": "ManagedCluster"},
            "resource": {"group": "cluster.open-cluster-management.io", "version": "v1", "resource": "managedclusters"},
            "operation": "CREATE",
            "userInfo": {"username": "bob"},
            "object": {"metadata": {"name": "cluster1"}, "spec": {"hubAcceptsClient": true}}
        }))
        .unwrap();

        let decision = engine.review(request, RequestContext::background());
        assert!(!decision.allowed);
        assert_eq!(
            decision.reason(),
            Some("user \"bob\" cannot update the HubAcceptsClient field")
        );
    }

    #[test]
    fn test_validate_denials() {
        struct TestCase {
            name: &'static str,
            attrs: AttributesRecord,
            authorizer: FakeAuthorizer,
            expected_reason: Option<StatusReason>,
        }

        let tests = vec![
            TestCase {
                name: "valid cluster",
                attrs: AttributesRecord::new_managed_cluster(
                    Operation::Create,
                    ManagedCluster::new("c1").with_client_config("https://127.0.0.1:8443"),
                    None,
                ),
                authorizer: FakeAuthorizer::new(),
                expected_reason: None,
            },
            TestCase {
                name: "invalid url",
                attrs: AttributesRecord::new_managed_cluster(
                    Operation::Create,
                    ManagedCluster::new("c1").with_client_config("127.0.0.1:8001"),
                    None,
                ),
                authorizer: FakeAuthorizer::new(),
                expected_reason: Some(StatusReason::BadRequest),
            },
            TestCase {
                name: "unauthorized join",
                attrs: AttributesRecord::new_managed_cluster(
                    Operation::Create,
                    ManagedCluster::new("c1").with_label(CLUSTER_SET_LABEL, "dev"),
                    None,
                ),
                authorizer: FakeAuthorizer::new(),
                expected_reason: Some(StatusReason::Forbidden),
            },
            TestCase {
                name: "provider failure",
                attrs: AttributesRecord::new_managed_cluster(
                    Operation::Create,
                    ManagedCluster::new("c1").with_hub_accepts_client(true),
                    None,
                ),
                authorizer: FakeAuthorizer::failing(AuthorizerError::provider("unavailable")),
                expected_reason: Some(StatusReason::Forbidden),
            },
            TestCase {
                name: "binding name mismatch",
                attrs: AttributesRecord::new_cluster_set_binding(
                    Operation::Create,
                    ManagedClusterSetBinding::new("ns1", "a", "b"),
                    None,
                ),
                authorizer: FakeAuthorizer::new(),
                expected_reason: Some(StatusReason::BadRequest),
            },
        ];

        for test in tests {
            let engine = new_engine(&Config::default(), test.authorizer);
            let attrs = test.attrs.with_user(UserInfo::new("bob"));
            let decision = engine.validate(&attrs);
            assert_eq!(decision.allowed, test.expected_reason.is_none(), "{}", test.name);
            assert_eq!(
                decision.result.as_ref().map(|status| status.reason),
                test.expected_reason,
                "{}",
                test.name
            );
            assert!(decision.patched_object.is_none(), "{}", test.name);
        }
    }

    #[test]
    fn test_review_mutates_then_validates() {
        let engine = new_engine(&Config::default(), FakeAuthorizer::new());
        let request: AdmissionRequest = serde_json::from_value(json!({
            "uid": "uid-1",
            "kind": {"group": "cluster.open-cluster-management.io", "version": "v1", "kind": "ManagedCluster"},
            "resource": {"group": "cluster.open-cluster-management.io", "version": "v1", "resource": "managedclusters"},
            "name": "cluster1",
            "operation": "CREATE",
            "userInfo": {"username": "bob"},
            "object": {
                "apiVersion": "cluster.open-cluster-management.io/v1",
                "kind": "ManagedCluster",
                "metadata": {"name": "cluster1"},
                "spec": {"managedClusterClientConfigs": [{"url": "https://127.0.0.1:8443"}]}
            }
        }))
        .unwrap();

        let decision = engine.review(request, RequestContext::background());
        assert!(decision.allowed, "{:?}", decision.result);
        assert_eq!(decision.uid, "uid-1");
        assert_eq!(decision.patched_object.unwrap()["spec"]["leaseDurationSeconds"], json!(60));
    }

    #[test]
    fn test_review_reports_decode_errors() {
        let engine = new_engine(&Config::default(), FakeAuthorizer::new());
        let request: AdmissionRequest = serde_json::from_value(json!({
            "uid": "uid-2",
            "kind": {"group": "cluster.open-cluster-management.io", "version": "v1", "kind": "ManagedCluster"},
            "resource": {"group": "cluster.open-cluster-management.io", "version": "v1", "resource": "managedclusters"},
            "operation": "CREATE",
            "object": {"metadata": {"name": "cluster1"}, "spec": {"hubAcceptsClient": "yes"}}
        }))
        .unwrap();

        let decision = engine.review_validation(request, RequestContext::background());
        assert!(!decision.allowed);
        assert_eq!(decision.uid, "uid-2");
        assert_eq!(decision.result.unwrap().reason, StatusReason::BadRequest);
    }

    #[test]
    fn test_review_applies_authorization_timeout() {
        let config = Config {
            authorization_timeout_seconds: 0,
            plugins: ALL_ORDERED_PLUGINS.iter().map(|name| name.to_string()).collect(),
        };
        let engine = new_engine(&config, FakeAuthorizer::new());
        let request: AdmissionRequest = serde_json::from_value(json!({
            "uid": "uid-3",
            "kind": {"group": "cluster.open-cluster-management.io", "version": "v1", "kind": "ManagedCluster"},
            "resource": {"group": "cluster.open-cluster-management.io", "version": "v1", "resource": "managedclusters"},
            "operation": "CREATE",
            "userInfo": {"username": "bob"},
            "object": {"metadata": {"name": "cluster1"}, "spec": {"hubAcceptsClient": true}}
        }))
        .unwrap();

        let decision = engine.review_validation(request, RequestContext::background());
        assert!(!decision.allowed);
        assert_eq!(
            decision.reason(),
            Some("unable to authorize user \"bob\": request deadline exceeded")
        );
    }
}
