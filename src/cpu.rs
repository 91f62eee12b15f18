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

//! CPU identification for the `instance/cpu-platform` endpoint.
//!
//! The endpoint reports a GCE platform name ("Intel Skylake", "AMD Rome",
//! ...) derived from the host's vendor/family/model triple. The mapping
//! covers the microarchitectures Compute Engine actually offers; anything
//! else reports `Unknown CPU Platform`.

/// The CPU vendor, as reported by the identification leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vendor {
    Intel,
    Amd,
    Unknown,
}

/// A vendor/family/model triple identifying the host CPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuIdentity {
    pub vendor: Vendor,
    pub family: u32,
    pub model: u32,
}

/// Probes the host CPU.
// `__cpuid` became a safe fn after Rust 1.85; the blocks are still required
// at the declared rust-version.
#[allow(unused_unsafe)]
#[cfg(target_arch = "x86_64")]
pub fn identity() -> CpuIdentity {
    use std::arch::x86_64::__cpuid;

    // SAFETY: leaves 0 and 1 are defined on every x86_64 processor.
    let leaf0 = unsafe { __cpuid(0) };
    let mut vendor_bytes = [0u8; 12];
    vendor_bytes[0..4].copy_from_slice(&leaf0.ebx.to_le_bytes());
    vendor_bytes[4..8].copy_from_slice(&leaf0.edx.to_le_bytes());
    vendor_bytes[8..12].copy_from_slice(&leaf0.ecx.to_le_bytes());
    let vendor = match &vendor_bytes {
        b"GenuineIntel" => Vendor::Intel,
        b"AuthenticAMD" => Vendor::Amd,
        _ => Vendor::Unknown,
    };

    // SAFETY: see above.
    let leaf1 = unsafe { __cpuid(1) };
    let base_family = (leaf1.eax >> 8) & 0xf;
    let base_model = (leaf1.eax >> 4) & 0xf;
    let ext_family = (leaf1.eax >> 20) & 0xff;
    let ext_model = (leaf1.eax >> 16) & 0xf;

    let family = if base_family == 0xf {
        base_family + ext_family
    } else {
        base_family
    };
    // The extended model bits only apply to family 6 and 15.
    let model = if base_family == 0x6 || base_family == 0xf {
        (ext_model << 4) | base_model
    } else {
        base_model
    };

    CpuIdentity {
        vendor,
        family,
        model,
    }
}

/// Probes the host CPU.
#[cfg(not(target_arch = "x86_64"))]
pub fn identity() -> CpuIdentity {
    CpuIdentity {
        vendor: Vendor::Unknown,
        family: 0,
        model: 0,
    }
}

/// Maps a CPU identity to the platform name Compute Engine reports.
pub fn platform_name(id: &CpuIdentity) -> &'static str {
    match (id.vendor, id.family) {
        (Vendor::Intel, 6) => match id.model {
            42 => "Intel Sandy Bridge",
            58 => "Intel Ivy Bridge",
            60 | 63 | 69 | 70 => "Intel Haswell",
            61 | 71 | 79 | 86 => "Intel Broadwell",
            78 | 85 | 94 => "Intel Skylake",
            106 | 108 | 125 | 126 => "Intel Ice Lake",
            143 => "Intel Sapphire Rapids",
            173 => "Intel Emerald Rapids",
            _ => "Unknown CPU Platform",
        },
        (Vendor::Amd, 23) => "AMD Rome",
        (Vendor::Amd, 25) => "AMD Milan",
        (Vendor::Amd, 26) => "AMD Turin",
        _ => "Unknown CPU Platform",
    }
}
