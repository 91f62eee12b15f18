// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The documented attribute directories.
//!
//! Three immutable maps exist: project attributes, instance attributes, and
//! instance guest attributes. Membership says an attribute name is part of
//! the documented surface; whether a value is actually served is decided by
//! the dispatcher (most entries are stubbed).
//!
//! See
//! <https://cloud.google.com/compute/docs/metadata/predefined-metadata-keys>.

use std::collections::HashSet;
use std::sync::LazyLock;

/// An immutable attribute directory.
///
/// Listings use the declared order; membership tests are O(1) and
/// case-sensitive.
pub struct AttributeMap {
    names: &'static [&'static str],
    index: HashSet<&'static str>,
}

impl AttributeMap {
    fn new(names: &'static [&'static str]) -> Self {
        Self {
            names,
            index: names.iter().copied().collect(),
        }
    }

    /// Reports whether `name` is a documented attribute.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// The attribute names in declared order.
    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    /// The newline-joined directory listing.
    pub fn listing(&self) -> String {
        self.names.join("\n")
    }
}

/// Project-level attributes, stored under
/// `/computeMetadata/v1/project/attributes/`.
pub static PROJECT_ATTRIBUTES: LazyLock<AttributeMap> = LazyLock::new(|| {
    AttributeMap::new(&[
        "disable-legacy-endpoints",
        "enable-guest-attributes",
        "enable-os-inventory",
        "enable-oslogin",
        "google-compute-default-region",
        "google-compute-default-zone",
        "ssh-keys",
        // Deprecated; kept because the real directory still lists it.
        "sshKeys",
        "vmdnssetting",
    ])
});

/// Instance-level attributes, stored under
/// `/computeMetadata/v1/instance/attributes/`.
pub static INSTANCE_ATTRIBUTES: LazyLock<AttributeMap> =
    LazyLock::new(|| AttributeMap::new(&["enable-oslogin", "vmdnssetting", "ssh-keys"]));

/// Instance guest attributes, stored under
/// `/computeMetadata/v1/instance/guest-attributes/`.
pub static GUEST_ATTRIBUTES: LazyLock<AttributeMap> =
    LazyLock::new(|| AttributeMap::new(&["guestInventory", "hostkeys"]));
