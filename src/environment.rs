// src/environment.rs
//! Lighting environment inspected at variant-selection time.
//!
//! The environment is borrowed read-only by the selector; the light count
//! scratch struct is stack-local per call, so nothing here is shared
//! mutable state.

use crate::attributes::TextureHandle;

/// A cubemap bound to the environment (IBL source).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubemapAttribute {
    pub texture: TextureHandle,
}

impl CubemapAttribute {
    pub fn new(texture: TextureHandle) -> Self {
        Self { texture }
    }
}

/// Light classification as far as variant selection cares: only counts per
/// kind matter, not parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
    /// Anything the shader pipeline has no code path for.
    Other,
}

/// Environment state relevant to shader variant selection.
#[derive(Debug, Clone, Default)]
pub struct LightingEnvironment {
    pub ambient_light: bool,
    pub fog: bool,
    /// Specular half of a split IBL pair. Highest priority cubemap.
    pub specular_env: Option<CubemapAttribute>,
    /// Diffuse half of a split IBL pair, also usable alone.
    pub diffuse_env: Option<CubemapAttribute>,
    /// Generic environment map, lowest priority.
    pub environment_map: Option<CubemapAttribute>,
    pub brdf_lut: Option<TextureHandle>,
    pub lights: Vec<LightKind>,
}

impl LightingEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cubemap IBL sampling should use, probed in priority order:
    /// separate specular, then diffuse, then the generic environment map.
    /// The boolean is true when the separate-specular slot won.
    pub fn ibl_cubemap(&self) -> Option<(CubemapAttribute, bool)> {
        if let Some(cubemap) = self.specular_env {
            Some((cubemap, true))
        } else if let Some(cubemap) = self.diffuse_env {
            Some((cubemap, false))
        } else {
            self.environment_map.map(|cubemap| (cubemap, false))
        }
    }
}

/// Per-kind light counts, computed on the stack for each variant-key build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightsInfo {
    pub directional: u32,
    pub point: u32,
    pub spot: u32,
    pub misc: u32,
}

impl LightsInfo {
    pub fn from_environment(environment: &LightingEnvironment) -> Self {
        let mut info = LightsInfo::default();
        for light in &environment.lights {
            match light {
                LightKind::Directional => info.directional += 1,
                LightKind::Point => info.point += 1,
                LightKind::Spot => info.spot += 1,
                LightKind::Other => info.misc += 1,
            }
        }
        info
    }
}
