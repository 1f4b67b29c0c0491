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

//! Admission plugins for the cluster registration resources.

pub mod managedclustermutating;
pub mod managedclustersetbindingvalidating;
pub mod managedclustervalidating;

use crate::admission::{AdmissionError, AdmissionResult, Attributes, Operation, Plugins};
use crate::api::ApiObject;
use crate::authorization::{RequestAuthorizer, ResourceCheck};

/// All plugins in execution order: defaulting runs before validation.
pub const ALL_ORDERED_PLUGINS: &[&str] = &[
    managedclustermutating::PLUGIN_NAME,
    managedclustervalidating::PLUGIN_NAME,
    managedclustersetbindingvalidating::PLUGIN_NAME,
];

/// Register all admission plugins.
pub fn register_all_admission_plugins(plugins: &Plugins) {
    managedclustermutating::register(plugins);
    managedclustervalidating::register(plugins);
    managedclustersetbindingvalidating::register(plugins);
}

fn downcast<T: 'static>(object: &dyn ApiObject) -> AdmissionResult<&T> {
    object.as_any().downcast_ref::<T>().ok_or_else(|| {
        AdmissionError::internal_error(format!("unexpected object of kind {}", object.kind()))
    })
}

/// Returns the new object and, for updates, the old object of a request.
///
/// `None` means the request carries no object and there is nothing to check.
pub(crate) fn typed_objects<'a, T: 'static>(
    attributes: &'a dyn Attributes,
) -> AdmissionResult<Option<(&'a T, Option<&'a T>)>> {
    let object = match attributes.get_object() {
        Some(obj) => downcast::<T>(obj)?,
        None => return Ok(None),
    };

    let old_object = match (attributes.get_operation(), attributes.get_old_object()) {
        (Operation::Create, _) => None,
        (_, Some(obj)) => Some(downcast::<T>(obj)?),
        (Operation::Update, None) => {
            return Err(AdmissionError::internal_error(
                "old object is required for UPDATE operations",
            ));
        }
        (_, None) => None,
    };

    Ok(Some((object, old_object)))
}

/// Asks the authorizer for `check`, failing closed when no answer is available.
pub(crate) fn check_access(authz: &RequestAuthorizer<'_>, check: &ResourceCheck) -> AdmissionResult<bool> {
    authz.allowed(check).map_err(|err| {
        tracing::warn!(
            user = %authz.user().username,
            resource = check.resource,
            subresource = check.subresource,
            name = %check.name,
            error = %err,
            "authorization check failed, denying request"
        );
        AdmissionError::authorization_failed(&authz.user().username, err)
    })
}
