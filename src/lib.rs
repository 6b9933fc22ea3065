// src/lib.rs
//! glTF PBR material translation and shader variant selection.
//!
//! Two pieces, sharing one data model:
//!
//! - [`material_loader`]: decoded glTF material record + texture resolver →
//!   runtime [`attributes::MaterialAttributeSet`]. Runs once per material
//!   at load time.
//! - [`shader_provider`]: renderable (vertex layout + material attributes +
//!   lighting environment) → cached compiled shader variant. Runs on the
//!   render thread; first sight of a configuration compiles, every later
//!   sight is a cache hit.
//!
//! Document parsing, texture upload and the GPU API itself stay behind
//! collaborator traits ([`material_loader::TextureResolver`],
//! [`shader_provider::ShaderCompiler`],
//! [`shader_provider::GraphicsCapabilities`]).

pub mod attributes;
pub mod document;
pub mod environment;
pub mod error;
pub mod material_loader;
pub mod mesh;
pub mod shader_provider;

pub use attributes::{
    AttributeKind, BlendingAttribute, CullFaceMode, MaterialAttribute, MaterialAttributeSet,
    MinFilter, TextureHandle, TextureReference, UvTransform,
};
pub use document::{MaterialRecord, TextureInfoRecord};
pub use environment::{CubemapAttribute, LightKind, LightingEnvironment, LightsInfo};
pub use error::{Error, Result};
pub use material_loader::{PbrMaterialLoader, TextureResolver};
pub use mesh::{RenderableDescriptor, VertexAttributeSlot, VertexLayout, VertexUsage};
pub use shader_provider::{
    ApiVersion, BackendKind, CompiledProgram, DefaultPrefixBuilder, GraphicsCapabilities,
    ManualSrgb, PbrShaderConfig, PbrShaderProvider, PrefixBuilder, ShaderCompiler, ShaderProgram,
    ShaderVariantKey, MAX_BONE_INFLUENCE, MAX_MORPH_TARGETS,
};
