// src/document.rs
//! Decoded glTF material records.
//!
//! These structs mirror the material portion of a glTF 2.0 document, field
//! names preserved (`emissiveFactor`, `pbrMetallicRoughness`, `KHR_*`
//! extension blocks). Parsing the raw document is the caller's business —
//! any JSON source that can feed serde produces these records. Defaults
//! follow the glTF schema so a sparse document decodes to the same record
//! an explicit one would.

use serde::Deserialize;

fn default_scale() -> f32 {
    1.0
}

fn default_strength() -> f32 {
    1.0
}

fn default_factor() -> f32 {
    1.0
}

fn default_uv_scale() -> [f32; 2] {
    [1.0, 1.0]
}

/// A texture binding: index into the document's texture array plus the UV
/// channel it samples. `index` is only meaningful to the texture resolver.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextureInfoRecord {
    pub index: u32,
    pub tex_coord: u32,
    pub extensions: Option<TextureInfoExtensions>,
}

/// Extension blocks attached to a texture binding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextureInfoExtensions {
    #[serde(rename = "KHR_texture_transform")]
    pub texture_transform: Option<TextureTransformRecord>,
}

/// `KHR_texture_transform`: offset/scale/rotation in UV space, optionally
/// overriding the UV channel of the base binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextureTransformRecord {
    pub offset: [f32; 2],
    #[serde(default = "default_uv_scale")]
    pub scale: [f32; 2],
    pub rotation: f32,
    /// Only overrides the base `texCoord` when explicitly present.
    pub tex_coord: Option<u32>,
}

impl Default for TextureTransformRecord {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            scale: [1.0, 1.0],
            rotation: 0.0,
            tex_coord: None,
        }
    }
}

/// `normalTexture`: a texture binding plus the normal scale scalar.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalTextureRecord {
    #[serde(flatten)]
    pub info: TextureInfoRecord,
    /// Taken verbatim when the texture is present, zero included.
    #[serde(default = "default_scale")]
    pub scale: f32,
}

/// `occlusionTexture`: a texture binding plus the occlusion strength scalar.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcclusionTextureRecord {
    #[serde(flatten)]
    pub info: TextureInfoRecord,
    #[serde(default = "default_strength")]
    pub strength: f32,
}

/// `pbrMetallicRoughness` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PbrMetallicRoughnessRecord {
    pub base_color_factor: Option<[f32; 4]>,
    #[serde(default = "default_factor")]
    pub metallic_factor: f32,
    #[serde(default = "default_factor")]
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureInfoRecord>,
    pub base_color_texture: Option<TextureInfoRecord>,
}

impl Default for PbrMetallicRoughnessRecord {
    fn default() -> Self {
        Self {
            base_color_factor: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            base_color_texture: None,
        }
    }
}

/// `KHR_materials_pbrSpecularGlossiness` extension block (legacy PBR
/// alternative; may coexist with the metallic-roughness block).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecularGlossinessRecord {
    pub diffuse_factor: Option<[f32; 4]>,
    pub specular_factor: Option<[f32; 3]>,
    #[serde(default = "default_factor")]
    pub glossiness_factor: f32,
    pub diffuse_texture: Option<TextureInfoRecord>,
    pub specular_glossiness_texture: Option<TextureInfoRecord>,
}

impl Default for SpecularGlossinessRecord {
    fn default() -> Self {
        Self {
            diffuse_factor: None,
            specular_factor: None,
            glossiness_factor: 1.0,
            diffuse_texture: None,
            specular_glossiness_texture: None,
        }
    }
}

/// `KHR_materials_unlit` carries no parameters; its presence is the signal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnlitRecord {}

/// Extension blocks attached to a material.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialExtensions {
    #[serde(rename = "KHR_materials_pbrSpecularGlossiness")]
    pub pbr_specular_glossiness: Option<SpecularGlossinessRecord>,
    #[serde(rename = "KHR_materials_unlit")]
    pub unlit: Option<UnlitRecord>,
}

/// A decoded glTF material.
///
/// `alpha_mode` stays a raw string: validation (and rejection of unknown
/// modes) belongs to the loader, and `None` is distinct from `"OPAQUE"`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialRecord {
    pub name: Option<String>,
    pub emissive_factor: Option<[f32; 3]>,
    pub emissive_texture: Option<TextureInfoRecord>,
    pub double_sided: Option<bool>,
    pub normal_texture: Option<NormalTextureRecord>,
    pub occlusion_texture: Option<OcclusionTextureRecord>,
    pub alpha_mode: Option<String>,
    pub alpha_cutoff: Option<f32>,
    pub pbr_metallic_roughness: Option<PbrMetallicRoughnessRecord>,
    pub extensions: Option<MaterialExtensions>,
}

impl MaterialRecord {
    /// Specular-glossiness extension block, if any.
    pub fn specular_glossiness(&self) -> Option<&SpecularGlossinessRecord> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.pbr_specular_glossiness.as_ref())
    }

    /// True when the unlit extension is present.
    pub fn is_unlit(&self) -> bool {
        self.extensions
            .as_ref()
            .map(|ext| ext.unlit.is_some())
            .unwrap_or(false)
    }
}
