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

//! Field change detection between the old and new object of a request.

/// Reports whether the field picked by `selector` differs between `old` and `new`.
///
/// A missing old object (CREATE) is compared as if the field held its zero
/// value, so setting a field on creation counts as a change while leaving it
/// unset does not.
pub fn changed<'a, T, V, F>(old: Option<&'a T>, new: &'a T, selector: F) -> bool
where
    V: PartialEq + Default,
    F: Fn(&'a T) -> V,
{
    let previous = old.map(&selector).unwrap_or_default();
    previous != selector(new)
}
