// src/shader_provider.rs
//! Shader variant selection and program caching.
//!
//! - Derives a preprocessor prefix (variant key) from a renderable's vertex
//!   layout, material attributes and lighting environment.
//! - Validates backend capability limits; hard limits fail, soft limits warn
//!   through `log` and compilation proceeds.
//! - Caches compiled programs keyed by the exact prefix string (xxh3
//!   fingerprint map, stored-prefix equality verified on every hit).
//!
//! Single-threaded by contract: selection takes `&mut self` and must run on
//! the thread owning the graphics context. Shard providers per context if
//! you need parallel rendering.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use log::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::attributes::AttributeKind;
use crate::environment::LightsInfo;
use crate::error::{Error, Result};
use crate::mesh::{RenderableDescriptor, VertexUsage};

/// Morph target channels supported per kind (position/normal/tangent).
pub const MAX_MORPH_TARGETS: u32 = 8;
/// Bone influence attribute slots supported by the skinning path.
pub const MAX_BONE_INFLUENCE: u32 = 8;

// ---------- Collaborator seams ----------

/// Result record of an external shader compile.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    /// Opaque program handle owned by the graphics backend.
    pub handle: u64,
    pub is_compiled: bool,
    /// Compiler log; may be non-empty on success (warnings).
    pub log: String,
}

/// Black-box shader compiler of the underlying graphics API.
pub trait ShaderCompiler {
    fn compile(&self, vertex_src: &str, fragment_src: &str, prefix: &str) -> CompiledProgram;
}

/// Graphics backend family; selects the exact shading-language profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Desktop,
    Mobile,
    Web,
}

/// Graphics API version as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    #[inline]
    pub fn at_least(self, major: u32, minor: u32) -> bool {
        self.major > major || (self.major == major && self.minor >= minor)
    }
}

/// Capability probe of the live graphics context.
pub trait GraphicsCapabilities {
    fn api_version(&self) -> ApiVersion;
    fn backend_kind(&self) -> BackendKind;
    fn supports_extension(&self, name: &str) -> bool;
}

/// Builds the generic (non-PBR) part of the prefix: skinning and other
/// per-renderable shader configuration.
pub trait PrefixBuilder {
    fn base_prefix(&self, renderable: &RenderableDescriptor, config: &PbrShaderConfig) -> String;
}

/// Default base prefix: bone weight slots, the skeleton bone count, and the
/// material's alpha handling flags.
#[derive(Debug, Default)]
pub struct DefaultPrefixBuilder;

impl PrefixBuilder for DefaultPrefixBuilder {
    fn base_prefix(&self, renderable: &RenderableDescriptor, config: &PbrShaderConfig) -> String {
        let mut prefix = String::new();
        for slot in renderable.layout.slots() {
            if slot.usage == VertexUsage::BoneWeight {
                let _ = writeln!(prefix, "#define boneWeight{}Flag", slot.unit);
            }
        }
        if renderable.num_bones > 0 && renderable.layout.has_usage(VertexUsage::BoneWeight) {
            let _ = writeln!(prefix, "#define numBones {}", config.num_bones);
        }
        if renderable.material.has(AttributeKind::AlphaTest) {
            let _ = writeln!(prefix, "#define alphaTestFlag");
        }
        if renderable.material.has(AttributeKind::Blending) {
            let _ = writeln!(prefix, "#define blendedFlag");
        }
        prefix
    }
}

// ---------- Configuration ----------

/// Manual sRGB decode mode applied in the fragment shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManualSrgb {
    None,
    Fast,
    #[default]
    Accurate,
}

/// Provider configuration. Shader sources default to the embedded GLSL
/// templates; replace them to use your own.
pub struct PbrShaderConfig {
    pub vertex_shader: String,
    pub fragment_shader: String,
    /// Explicit version/profile header. When set it wins over backend
    /// detection.
    pub glsl_version: Option<String>,
    pub num_bones: u32,
    pub num_vertex_colors: u32,
    pub num_directional_lights: u32,
    pub num_point_lights: u32,
    pub num_spot_lights: u32,
    pub manual_srgb: ManualSrgb,
    /// Whether tangent-space shading (normal mapping) is requested; drives
    /// the derivative-extension fallback on backends without GLSL 3.
    pub use_tangent_space: bool,
}

impl Default for PbrShaderConfig {
    fn default() -> Self {
        Self {
            vertex_shader: include_str!("shaders/pbr.vs.glsl").to_string(),
            fragment_shader: include_str!("shaders/pbr.fs.glsl").to_string(),
            glsl_version: None,
            num_bones: 12,
            num_vertex_colors: 1,
            num_directional_lights: 2,
            num_point_lights: 5,
            num_spot_lights: 0,
            manual_srgb: ManualSrgb::Accurate,
            use_tangent_space: true,
        }
    }
}

// ---------- Variant key ----------

/// Derived preprocessor configuration: version header, base prefix block
/// and an ordered, deduplicated define list. Two renderables producing the
/// same key share one compiled program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderVariantKey {
    version: Option<String>,
    base: String,
    defines: Vec<String>,
}

impl ShaderVariantKey {
    fn new(version: Option<String>, base: String) -> Self {
        Self {
            version,
            base,
            defines: Vec::new(),
        }
    }

    fn push_define(&mut self, define: impl Into<String>) {
        let define = define.into();
        if !self.defines.contains(&define) {
            self.defines.push(define);
        }
    }

    pub fn defines(&self) -> &[String] {
        &self.defines
    }

    /// True when a define with this name (first token) is present.
    pub fn has_define(&self, name: &str) -> bool {
        self.defines
            .iter()
            .any(|d| d.split_whitespace().next() == Some(name))
    }

    /// Canonical macro prefix: version header, base block, then one
    /// `#define` line per entry in derivation order.
    pub fn prefix(&self) -> String {
        let mut out = String::new();
        if let Some(version) = &self.version {
            out.push_str(version);
        }
        out.push_str(&self.base);
        for define in &self.defines {
            let _ = writeln!(out, "#define {define}");
        }
        out
    }

    /// Cache identity of this key: the xxh3 hash of [`Self::prefix`].
    pub fn fingerprint(&self) -> u64 {
        Self::hash_prefix(&self.prefix())
    }

    fn hash_prefix(prefix: &str) -> u64 {
        xxh3_64(prefix.as_bytes())
    }
}

/// A compiled program owned by the cache, shared by every renderable that
/// derives the same variant key.
#[derive(Debug)]
pub struct ShaderProgram {
    handle: u64,
    prefix: String,
}

impl ShaderProgram {
    pub fn handle(&self) -> u64 {
        self.handle
    }

    /// The exact macro prefix this program was compiled with (version
    /// header included); also its cache identity.
    pub fn macro_prefix(&self) -> &str {
        &self.prefix
    }
}

struct CacheEntry {
    prefix: String,
    program: Arc<ShaderProgram>,
}

// ---------- Provider ----------

/// Selects or lazily compiles shader variants for renderables.
pub struct PbrShaderProvider<C, G> {
    config: PbrShaderConfig,
    compiler: C,
    capabilities: G,
    prefix_builder: Box<dyn PrefixBuilder>,
    shaders: HashMap<u64, CacheEntry>,
}

impl<C: ShaderCompiler, G: GraphicsCapabilities> PbrShaderProvider<C, G> {
    pub fn new(config: PbrShaderConfig, compiler: C, capabilities: G) -> Self {
        Self {
            config,
            compiler,
            capabilities,
            prefix_builder: Box::new(DefaultPrefixBuilder),
            shaders: HashMap::new(),
        }
    }

    pub fn with_prefix_builder(mut self, builder: impl PrefixBuilder + 'static) -> Self {
        self.prefix_builder = Box::new(builder);
        self
    }

    pub fn config(&self) -> &PbrShaderConfig {
        &self.config
    }

    /// Number of distinct compiled variants currently cached.
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Drop every cached program. Outstanding `Arc`s keep their programs
    /// alive until the callers release them.
    pub fn clear(&mut self) {
        self.shaders.clear();
    }

    /// Return the cached program for this renderable, compiling it first if
    /// this configuration has never been seen.
    pub fn select_or_create(
        &mut self,
        renderable: &RenderableDescriptor,
    ) -> Result<Arc<ShaderProgram>> {
        let key = self.build_variant_key(renderable)?;
        let prefix = key.prefix();
        let fingerprint = ShaderVariantKey::hash_prefix(&prefix);

        if let Some(entry) = self.shaders.get(&fingerprint) {
            if entry.prefix == prefix {
                return Ok(entry.program.clone());
            }
            // different prefix behind the same fingerprint; recompile and
            // let the new entry take the slot
            warn!("variant fingerprint collision on {fingerprint:#018x}");
        }

        self.warn_soft_limits(renderable);

        let compiled = self.compiler.compile(
            &self.config.vertex_shader,
            &self.config.fragment_shader,
            &prefix,
        );
        if !compiled.is_compiled {
            return Err(Error::ShaderCompilation { log: compiled.log });
        }
        if compiled.log.is_empty() {
            debug!("shader compilation success ({} defines)", key.defines().len());
        } else {
            warn!("shader compilation warnings:\n{}", compiled.log);
        }

        let program = Arc::new(ShaderProgram {
            handle: compiled.handle,
            prefix: prefix.clone(),
        });

        // re-derive the key and compare before caching: with the built-in
        // derivation this always passes, so the only thing it can catch is a
        // custom `PrefixBuilder` that is not deterministic for a renderable
        if !self.can_render(&program, renderable) {
            return Err(Error::ShaderCompatibility(
                "freshly built program cannot render its own renderable".into(),
            ));
        }

        self.shaders.insert(
            fingerprint,
            CacheEntry {
                prefix,
                program: program.clone(),
            },
        );
        Ok(program)
    }

    /// Whether `program` is usable for `renderable`: its stored prefix must
    /// equal the prefix this renderable derives today.
    pub fn can_render(&self, program: &ShaderProgram, renderable: &RenderableDescriptor) -> bool {
        match self.build_variant_key(renderable) {
            Ok(key) => key.prefix() == program.macro_prefix(),
            Err(_) => false,
        }
    }

    /// Derive the variant key for a renderable without touching the cache.
    ///
    /// Fails on hard limits: missing derivative extension, more than two UV
    /// sets, packed vertex colors.
    pub fn build_variant_key(&self, renderable: &RenderableDescriptor) -> Result<ShaderVariantKey> {
        let caps = &self.capabilities;
        let api = caps.api_version();
        let backend = caps.backend_kind();
        let gl3 = api.at_least(3, 0);

        // base prefix from the generic per-renderable configuration
        let base = self.prefix_builder.base_prefix(renderable, &self.config);

        // language/profile header, explicit config override wins
        let version = match &self.config.glsl_version {
            Some(version) => Some(version.clone()),
            None if gl3 => match backend {
                BackendKind::Desktop => Some("#version 130\n#define GLSL3\n".to_string()),
                BackendKind::Mobile => Some("#version 300 es\n#define GLSL3\n".to_string()),
                BackendKind::Web => None,
            },
            None => None,
        };
        let mut key = ShaderVariantKey::new(version, base);

        // tangent-space shading without tangent data needs derivatives
        if (backend == BackendKind::Web || !gl3)
            && self.config.use_tangent_space
            && !renderable.layout.has_usage(VertexUsage::Tangent)
        {
            if caps.supports_extension("GL_OES_standard_derivatives") {
                key.push_define("USE_DERIVATIVES_EXT");
            } else {
                return Err(Error::MissingCapability(
                    "GL_OES_standard_derivatives extension or tangent vertex attribute required"
                        .into(),
                ));
            }
        }

        // morph targets
        for slot in renderable.layout.slots() {
            if slot.unit >= MAX_MORPH_TARGETS {
                continue;
            }
            match slot.usage {
                VertexUsage::PositionTarget => {
                    key.push_define(format!("position{}Flag", slot.unit))
                }
                VertexUsage::NormalTarget => key.push_define(format!("normal{}Flag", slot.unit)),
                VertexUsage::TangentTarget => {
                    key.push_define(format!("tangent{}Flag", slot.unit))
                }
                _ => {}
            }
        }

        // lighting
        let material = renderable.material;
        let environment = renderable.environment;
        if material.has(AttributeKind::Unlit) {
            key.push_define("unlitFlag");
        } else {
            if material.has(AttributeKind::MetallicRoughnessTexture) {
                key.push_define("metallicRoughnessTextureFlag");
            }
            if material.has(AttributeKind::OcclusionTexture) {
                key.push_define("occlusionTextureFlag");
            }

            if let Some((cubemap, separate)) = environment.ibl_cubemap() {
                if separate {
                    key.push_define("diffuseSpecularEnvSeparateFlag");
                }
                key.push_define("USE_IBL");

                let lod_supported = if gl3 {
                    true
                } else if caps.supports_extension("EXT_shader_texture_lod") {
                    key.push_define("USE_TEXTURE_LOD_EXT");
                    true
                } else {
                    false
                };
                if lod_supported && cubemap.texture.min_filter.uses_mipmaps() {
                    key.push_define("USE_TEX_LOD");
                }

                if environment.brdf_lut.is_some() {
                    key.push_define("brdfLUTTexture");
                }
            }
            if environment.ambient_light {
                key.push_define("ambientLightFlag");
            }

            if self.config.manual_srgb != ManualSrgb::None {
                key.push_define("MANUAL_SRGB");
                if self.config.manual_srgb == ManualSrgb::Fast {
                    key.push_define("SRGB_FAST_APPROXIMATION");
                }
            }
        }

        // UV channel redirects run even for unlit materials
        let mut max_uv_index: Option<u32> = None;
        let mut redirect = |key: &mut ShaderVariantKey, name: &str, uv_index: u32| {
            key.push_define(format!("v_{name}UV v_texCoord{uv_index}"));
            max_uv_index = Some(max_uv_index.map_or(uv_index, |max| max.max(uv_index)));
        };
        if let Some(reference) = material.diffuse_texture() {
            redirect(&mut key, "diffuse", reference.uv_index);
        }
        if let Some(reference) = material.texture(AttributeKind::EmissiveTexture) {
            redirect(&mut key, "emissive", reference.uv_index);
        }
        if let Some(reference) = material.texture(AttributeKind::NormalTexture) {
            redirect(&mut key, "normal", reference.uv_index);
        }
        if let Some(reference) = material.texture(AttributeKind::MetallicRoughnessTexture) {
            redirect(&mut key, "metallicRoughness", reference.uv_index);
        }
        if let Some(reference) = material.texture(AttributeKind::OcclusionTexture) {
            redirect(&mut key, "occlusion", reference.uv_index);
        }

        match max_uv_index {
            Some(max) if max > 1 => {
                return Err(Error::UnsupportedConfiguration(
                    "more than two texture-coordinate sets not supported".into(),
                ));
            }
            Some(max) => {
                key.push_define("textureFlag");
                if max == 1 {
                    key.push_define("textureCoord1Flag");
                }
            }
            None => {}
        }

        if environment.fog {
            key.push_define("fogEquationFlag");
        }

        for slot in renderable.layout.slots() {
            match slot.usage {
                VertexUsage::ColorUnpacked => key.push_define(format!("color{}Flag", slot.unit)),
                VertexUsage::ColorPacked => {
                    return Err(Error::UnsupportedConfiguration(
                        "packed vertex color attribute not supported".into(),
                    ));
                }
                _ => {}
            }
        }

        Ok(key)
    }

    /// Soft capability limits: overflow never aborts, the shader silently
    /// ignores or clamps the excess data.
    fn warn_soft_limits(&self, renderable: &RenderableDescriptor) {
        let layout = renderable.layout;

        let count = |usage| layout.max_unit(usage).map_or(0, |unit| unit + 1);
        let num_bone_influence = count(VertexUsage::BoneWeight);
        let num_color = count(VertexUsage::ColorUnpacked);
        let num_morph_target = count(VertexUsage::PositionTarget)
            .max(count(VertexUsage::NormalTarget))
            .max(count(VertexUsage::TangentTarget));

        if num_bone_influence > MAX_BONE_INFLUENCE {
            warn!(
                "more than {MAX_BONE_INFLUENCE} bone influence attributes not supported: {num_bone_influence} found"
            );
        }
        if num_morph_target > MAX_MORPH_TARGETS {
            warn!(
                "more than {MAX_MORPH_TARGETS} morph target attributes not supported: {num_morph_target} found"
            );
        }
        if num_color > self.config.num_vertex_colors {
            warn!(
                "more than {} color attributes not supported: {num_color} found",
                self.config.num_vertex_colors
            );
        }

        let lights = LightsInfo::from_environment(renderable.environment);
        if lights.directional > self.config.num_directional_lights {
            warn!(
                "too many directional lights detected: {}/{}",
                lights.directional, self.config.num_directional_lights
            );
        }
        if lights.point > self.config.num_point_lights {
            warn!(
                "too many point lights detected: {}/{}",
                lights.point, self.config.num_point_lights
            );
        }
        if lights.spot > self.config.num_spot_lights {
            warn!(
                "too many spot lights detected: {}/{}",
                lights.spot, self.config.num_spot_lights
            );
        }
        if lights.misc > 0 {
            warn!("unknown light kinds not supported: {} found", lights.misc);
        }
    }
}
