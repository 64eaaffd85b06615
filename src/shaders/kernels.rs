// SPDX-License-Identifier: GPL-3.0-only

//! Compute kernel library
//!
//! Kernels are WGSL compute shaders embedded in the binary. A kernel directory
//! can override any of them with a `<name>.wgsl` file containing the kernel
//! body; the shared prelude from `common.wgsl` is always prepended.
//!
//! The library is built once and validated up front with naga, so a broken or
//! missing kernel is reported by name before any GPU object exists.

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::common::COMMON_FUNCTIONS;
use crate::constants::render::{KERNEL_ENTRY_POINT, WORKGROUP_SIZE};
use crate::errors::RenderError;

/// Named compute kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    Passthrough,
    Pixellate,
    CrtScreen,
    Glitch,
    StereoGlasses,
    Spectral,
    Alien,
    AlienAlt,
    Inversion,
}

impl Kernel {
    pub const ALL: [Kernel; 9] = [
        Kernel::Passthrough,
        Kernel::Pixellate,
        Kernel::CrtScreen,
        Kernel::Glitch,
        Kernel::StereoGlasses,
        Kernel::Spectral,
        Kernel::Alien,
        Kernel::AlienAlt,
        Kernel::Inversion,
    ];

    /// Kernel name, also the override file stem
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Passthrough => "passthrough",
            Kernel::Pixellate => "pixellate",
            Kernel::CrtScreen => "crt_screen",
            Kernel::Glitch => "glitch",
            Kernel::StereoGlasses => "stereo_glasses",
            Kernel::Spectral => "spectral",
            Kernel::Alien => "alien",
            Kernel::AlienAlt => "alien_alt",
            Kernel::Inversion => "inversion",
        }
    }

    /// Kernel body shipped with the binary
    pub fn embedded_body(&self) -> &'static str {
        match self {
            Kernel::Passthrough => include_str!("kernels/passthrough.wgsl"),
            Kernel::Pixellate => include_str!("kernels/pixellate.wgsl"),
            Kernel::CrtScreen => include_str!("kernels/crt_screen.wgsl"),
            Kernel::Glitch => include_str!("kernels/glitch.wgsl"),
            Kernel::StereoGlasses => include_str!("kernels/stereo_glasses.wgsl"),
            Kernel::Spectral => include_str!("kernels/spectral.wgsl"),
            Kernel::Alien => include_str!("kernels/alien.wgsl"),
            Kernel::AlienAlt => include_str!("kernels/alien_alt.wgsl"),
            Kernel::Inversion => include_str!("kernels/inversion.wgsl"),
        }
    }
}

impl std::fmt::Display for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated kernel sources, complete with the shared prelude
#[derive(Debug, Clone)]
pub struct KernelLibrary {
    sources: HashMap<Kernel, String>,
}

impl KernelLibrary {
    /// Library of the kernels shipped with the binary
    pub fn embedded() -> Result<Self, RenderError> {
        Self::from_bodies(Kernel::ALL.iter().map(|k| (*k, k.embedded_body().to_string())))
    }

    /// Library with per-kernel overrides read from `kernel_dir`
    pub fn load(kernel_dir: Option<&Path>) -> Result<Self, RenderError> {
        let Some(dir) = kernel_dir else {
            return Self::embedded();
        };

        info!(dir = %dir.display(), "Loading kernel overrides");
        let mut bodies = Vec::with_capacity(Kernel::ALL.len());
        for kernel in Kernel::ALL {
            let path = dir.join(format!("{}.wgsl", kernel.name()));
            let body = if path.is_file() {
                debug!(kernel = kernel.name(), path = %path.display(), "Kernel override");
                std::fs::read_to_string(&path).map_err(|e| RenderError::KernelCompile {
                    name: kernel.name().to_string(),
                    message: format!("{}: {}", path.display(), e),
                })?
            } else {
                kernel.embedded_body().to_string()
            };
            bodies.push((kernel, body));
        }
        Self::from_bodies(bodies)
    }

    /// Build from explicit kernel bodies
    ///
    /// Every kernel in [`Kernel::ALL`] must be present and valid; otherwise no
    /// library is produced.
    pub fn from_bodies<I>(bodies: I) -> Result<Self, RenderError>
    where
        I: IntoIterator<Item = (Kernel, String)>,
    {
        let mut sources = HashMap::new();
        for (kernel, body) in bodies {
            let source = format!("{}\n{}", COMMON_FUNCTIONS, body);
            validate_kernel(kernel.name(), &source)?;
            sources.insert(kernel, source);
        }

        if let Some(missing) = Kernel::ALL.iter().find(|k| !sources.contains_key(k)) {
            return Err(RenderError::MissingKernel(missing.name().to_string()));
        }

        debug!(count = sources.len(), "Kernel library validated");
        Ok(Self { sources })
    }

    /// Full WGSL source of a kernel
    pub fn source(&self, kernel: Kernel) -> Result<&str, RenderError> {
        self.sources
            .get(&kernel)
            .map(String::as_str)
            .ok_or_else(|| RenderError::MissingKernel(kernel.name().to_string()))
    }
}

/// Parse and validate a kernel, checking its compute entry point
pub fn validate_kernel(name: &str, source: &str) -> Result<(), RenderError> {
    let compile_error = |message: String| RenderError::KernelCompile {
        name: name.to_string(),
        message,
    };

    let module =
        naga::front::wgsl::parse_str(source).map_err(|e| compile_error(e.emit_to_string(source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| compile_error(e.as_inner().to_string()))?;

    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.name == KERNEL_ENTRY_POINT && ep.stage == naga::ShaderStage::Compute)
        .ok_or_else(|| compile_error(format!("no compute entry point '{}'", KERNEL_ENTRY_POINT)))?;

    if entry.workgroup_size != [WORKGROUP_SIZE, WORKGROUP_SIZE, 1] {
        return Err(compile_error(format!(
            "workgroup size {:?}, expected {}x{}",
            entry.workgroup_size, WORKGROUP_SIZE, WORKGROUP_SIZE
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_kernels_validate() {
        for kernel in Kernel::ALL {
            let source = format!("{}\n{}", COMMON_FUNCTIONS, kernel.embedded_body());
            if let Err(e) = validate_kernel(kernel.name(), &source) {
                panic!("{}", e);
            }
        }
        assert!(KernelLibrary::embedded().is_ok());
    }

    #[test]
    fn test_missing_kernel_fails_library() {
        let bodies = Kernel::ALL
            .iter()
            .filter(|k| **k != Kernel::Glitch)
            .map(|k| (*k, k.embedded_body().to_string()));
        match KernelLibrary::from_bodies(bodies) {
            Err(RenderError::MissingKernel(name)) => assert_eq!(name, "glitch"),
            other => panic!("expected missing kernel, got {:?}", other),
        }
    }

    #[test]
    fn test_broken_kernel_reported_by_name() {
        let bodies = Kernel::ALL.iter().map(|k| {
            let body = if *k == Kernel::Spectral {
                "fn main( {".to_string()
            } else {
                k.embedded_body().to_string()
            };
            (*k, body)
        });
        match KernelLibrary::from_bodies(bodies) {
            Err(RenderError::KernelCompile { name, .. }) => assert_eq!(name, "spectral"),
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_workgroup_size_rejected() {
        let body = "@compute @workgroup_size(8, 8, 1)\nfn main(@builtin(global_invocation_id) id: vec3<u32>) {\n    if (!in_bounds(id)) { return; }\n}\n";
        let source = format!("{}\n{}", COMMON_FUNCTIONS, body);
        assert!(validate_kernel("small", &source).is_err());
    }

    #[test]
    fn test_override_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("inversion.wgsl"),
            Kernel::Passthrough.embedded_body(),
        )
        .unwrap();
        let library = KernelLibrary::load(Some(dir.path())).unwrap();
        assert!(
            library
                .source(Kernel::Inversion)
                .unwrap()
                .contains("Copies the input unchanged")
        );
        assert!(
            library
                .source(Kernel::Alien)
                .unwrap()
                .contains("SATURATION")
        );
    }
}
