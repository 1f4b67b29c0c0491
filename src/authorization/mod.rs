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

//! Delegated authorization.
//!
//! The admission plugins never decide permissions themselves. They describe
//! the access they need as [`AuthorizerAttributes`] and ask an [`Authorizer`],
//! typically backed by SubjectAccessReviews against the API server.
//!
//! Every failure to get an answer is a denial: provider errors, an expired
//! request deadline and cancellation all surface as [`AuthorizerError`].

use crate::admission::{ContextError, RequestContext};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace};

// ============================================================================
// User Info
// ============================================================================

/// UserInfo describes the identity making a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl UserInfo {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            uid: String::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_groups(username: &str, groups: Vec<String>) -> Self {
        Self {
            username: username.to_string(),
            uid: String::new(),
            groups,
        }
    }
}

// ============================================================================
// Authorizer
// ============================================================================

/// Authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The authorizer allows the action.
    Allow,
    /// The authorizer denies the action.
    Deny,
    /// The authorizer has no opinion on the action.
    NoOpinion,
}

/// AuthorizerError is returned when no decision could be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizerError {
    /// The request context expired or was cancelled.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The authorization provider failed.
    #[error("{0}")]
    Provider(String),
}

impl AuthorizerError {
    pub fn provider(msg: impl Into<String>) -> Self {
        AuthorizerError::Provider(msg.into())
    }
}

/// Authorizer attributes for authorization checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizerAttributes {
    pub user: String,
    pub groups: Vec<String>,
    pub verb: String,
    pub api_group: String,
    pub resource: String,
    pub subresource: String,
    pub name: String,
}

impl AuthorizerAttributes {
    fn new(user: &UserInfo, check: &ResourceCheck) -> Self {
        Self {
            user: user.username.clone(),
            groups: user.groups.clone(),
            verb: check.verb.to_string(),
            api_group: check.api_group.to_string(),
            resource: check.resource.to_string(),
            subresource: check.subresource.to_string(),
            name: check.name.clone(),
        }
    }
}

/// Authorizer answers whether a user may perform an action.
///
/// Implementations should poll `ctx` while waiting on a remote provider and
/// give up once [`RequestContext::err`] reports an error.
pub trait Authorizer: Send + Sync {
    fn authorize(
        &self,
        ctx: &RequestContext,
        attrs: &AuthorizerAttributes,
    ) -> Result<Decision, AuthorizerError>;
}

/// ResourceCheck names one permission a plugin needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceCheck {
    pub verb: &'static str,
    pub api_group: &'static str,
    pub resource: &'static str,
    pub subresource: &'static str,
    pub name: String,
}

impl ResourceCheck {
    pub fn new(verb: &'static str, api_group: &'static str, resource: &'static str) -> Self {
        Self {
            verb,
            api_group,
            resource,
            subresource: "",
            name: String::new(),
        }
    }

    pub fn subresource(mut self, subresource: &'static str) -> Self {
        self.subresource = subresource;
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

// ============================================================================
// Per-request authorization
// ============================================================================

/// RequestAuthorizer asks the authorizer on behalf of one request.
///
/// Answers are memoised per [`ResourceCheck`], so a tuple reaches the
/// provider at most once for the lifetime of the request.
pub struct RequestAuthorizer<'a> {
    authorizer: &'a dyn Authorizer,
    user: &'a UserInfo,
    ctx: &'a RequestContext,
    answers: RefCell<HashMap<ResourceCheck, bool>>,
}

impl<'a> RequestAuthorizer<'a> {
    pub fn new(authorizer: &'a dyn Authorizer, user: &'a UserInfo, ctx: &'a RequestContext) -> Self {
        Self {
            authorizer,
            user,
            ctx,
            answers: RefCell::new(HashMap::new()),
        }
    }

    pub fn user(&self) -> &UserInfo {
        self.user
    }

    /// Reports whether the user is allowed to perform `check`.
    ///
    /// Only an explicit `Allow` permits; `Deny` and `NoOpinion` do not.
    pub fn allowed(&self, check: &ResourceCheck) -> Result<bool, AuthorizerError> {
        if let Some(allowed) = self.answers.borrow().get(check) {
            trace!(?check, allowed, "reusing authorization answer");
            return Ok(*allowed);
        }

        self.ctx.check()?;
        let attrs = AuthorizerAttributes::new(self.user, check);
        let decision = self.authorizer.authorize(self.ctx, &attrs)?;
        // An answer that arrives after the deadline is not trusted.
        self.ctx.check()?;

        let allowed = decision == Decision::Allow;
        debug!(
            user = %self.user.username,
            verb = check.verb,
            resource = check.resource,
            subresource = check.subresource,
            name = %check.name,
            ?decision,
            "authorization decision"
        );
        self.answers.borrow_mut().insert(check.clone(), allowed);
        Ok(allowed)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeAuthorizer;
    use super::*;
    use crate::admission::CancellationFlag;
    use std::time::{Duration, Instant};

    fn join_check(name: &str) -> ResourceCheck {
        ResourceCheck::new("create", "cluster.open-cluster-management.io", "managedclustersets")
            .subresource("join")
            .named(name)
    }

    #[test]
    fn test_allowed_only_on_explicit_allow() {
        let authorizer = FakeAuthorizer::new().allow("alice", join_check("dev"));
        let alice = UserInfo::new("alice");
        let bob = UserInfo::new("bob");
        let ctx = RequestContext::background();

        let authz = RequestAuthorizer::new(&authorizer, &alice, &ctx);
        assert_eq!(authz.allowed(&join_check("dev")), Ok(true));
        assert_eq!(authz.allowed(&join_check("prod")), Ok(false));

        let authz = RequestAuthorizer::new(&authorizer, &bob, &ctx);
        assert_eq!(authz.allowed(&join_check("dev")), Ok(false));
    }

    #[test]
    fn test_answers_are_memoised_per_check() {
        let authorizer = FakeAuthorizer::new().allow("alice", join_check("dev"));
        let alice = UserInfo::new("alice");
        let ctx = RequestContext::background();
        let authz = RequestAuthorizer::new(&authorizer, &alice, &ctx);

        for _ in 0..3 {
            assert_eq!(authz.allowed(&join_check("dev")), Ok(true));
        }
        assert_eq!(authz.allowed(&join_check("prod")), Ok(false));
        assert_eq!(authorizer.calls().len(), 2);
    }

    #[test]
    fn test_attributes_carry_user_and_check() {
        let authorizer = FakeAuthorizer::new();
        let user = UserInfo::with_groups("alice", vec!["admins".to_string()]);
        let ctx = RequestContext::background();
        let authz = RequestAuthorizer::new(&authorizer, &user, &ctx);

        authz.allowed(&join_check("dev")).unwrap();

        let calls = authorizer.calls();
        assert_eq!(
            calls[0],
            AuthorizerAttributes {
                user: "alice".to_string(),
                groups: vec!["admins".to_string()],
                verb: "create".to_string(),
                api_group: "cluster.open-cluster-management.io".to_string(),
                resource: "managedclustersets".to_string(),
                subresource: "join".to_string(),
                name: "dev".to_string(),
            }
        );
    }

    #[test]
    fn test_provider_error_is_returned() {
        let authorizer = FakeAuthorizer::failing(AuthorizerError::provider("connection refused"));
        let user = UserInfo::new("alice");
        let ctx = RequestContext::background();
        let authz = RequestAuthorizer::new(&authorizer, &user, &ctx);

        assert_eq!(
            authz.allowed(&join_check("dev")),
            Err(AuthorizerError::provider("connection refused"))
        );
    }

    #[test]
    fn test_cancelled_context_skips_provider() {
        let authorizer = FakeAuthorizer::new().allow("alice", join_check("dev"));
        let user = UserInfo::new("alice");
        let flag = CancellationFlag::new();
        let ctx = RequestContext::background().with_cancellation(flag.clone());
        flag.cancel();

        let authz = RequestAuthorizer::new(&authorizer, &user, &ctx);
        assert_eq!(
            authz.allowed(&join_check("dev")),
            Err(AuthorizerError::Context(ContextError::Cancelled))
        );
        assert!(authorizer.calls().is_empty());
    }

    #[test]
    fn test_expired_deadline_skips_provider() {
        let authorizer = FakeAuthorizer::new().allow("alice", join_check("dev"));
        let user = UserInfo::new("alice");
        let ctx = RequestContext::with_deadline(Instant::now() - Duration::from_secs(1));

        let authz = RequestAuthorizer::new(&authorizer, &user, &ctx);
        assert_eq!(
            authz.allowed(&join_check("dev")),
            Err(AuthorizerError::Context(ContextError::DeadlineExceeded))
        );
        assert!(authorizer.calls().is_empty());
    }

    #[test]
    fn test_late_answer_is_discarded() {
        struct SlowAuthorizer;

        impl Authorizer for SlowAuthorizer {
            fn authorize(
                &self,
                _ctx: &RequestContext,
                _attrs: &AuthorizerAttributes,
            ) -> Result<Decision, AuthorizerError> {
                std::thread::sleep(Duration::from_millis(50));
                Ok(Decision::Allow)
            }
        }

        let user = UserInfo::new("alice");
        let ctx = RequestContext::with_deadline(Instant::now() + Duration::from_millis(10));
        let authz = RequestAuthorizer::new(&SlowAuthorizer, &user, &ctx);

        assert_eq!(
            authz.allowed(&join_check("dev")),
            Err(AuthorizerError::Context(ContextError::DeadlineExceeded))
        );
    }
}
