// src/attributes.rs
//! Runtime material attribute set.
//!
//! A translated material is an ordered mapping from [`AttributeKind`] to a
//! typed [`MaterialAttribute`] value. Keys are unique; setting a kind twice
//! overwrites the previous value. The shader variant selector only ever
//! reads this set, it never mutates it.

use glam::{Vec2, Vec4};
use std::collections::BTreeMap;

/// Minification filter of a resolved texture. The variant selector inspects
/// it to decide whether cubemap LOD sampling is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinFilter {
    Nearest,
    #[default]
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl MinFilter {
    /// True for any filter that reads from mip levels.
    #[inline]
    pub fn uses_mipmaps(self) -> bool {
        !matches!(self, MinFilter::Nearest | MinFilter::Linear)
    }
}

/// Opaque handle to a loaded GPU texture, produced by the external
/// texture resolver. The crate never dereferences it; it only keys on the
/// id and reads the min filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    pub id: u32,
    pub min_filter: MinFilter,
}

impl TextureHandle {
    pub fn new(id: u32, min_filter: MinFilter) -> Self {
        Self { id, min_filter }
    }
}

/// Per-texture UV transform (`KHR_texture_transform`). Identity when the
/// extension is absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvTransform {
    pub offset: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
}

impl Default for UvTransform {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
        }
    }
}

impl UvTransform {
    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// A texture slot value: resolved handle, UV channel index and UV transform.
///
/// UV channels 0 and 1 are supported; anything above that is rejected at
/// variant-selection time, not here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureReference {
    pub texture: TextureHandle,
    pub uv_index: u32,
    pub transform: UvTransform,
}

impl TextureReference {
    pub fn new(texture: TextureHandle, uv_index: u32) -> Self {
        Self {
            texture,
            uv_index,
            transform: UvTransform::default(),
        }
    }
}

/// Face culling state. Only written when the document disables culling
/// (`doubleSided`); absence means the renderer's default (backface culling).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullFaceMode {
    Disabled,
    Back,
    Front,
}

/// Alpha blending state. `opacity` defaults to fully opaque and is reduced
/// to the base-color alpha for BLEND materials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendingAttribute {
    pub opacity: f32,
}

impl Default for BlendingAttribute {
    fn default() -> Self {
        Self { opacity: 1.0 }
    }
}

/// Attribute kinds. One value per kind; the `Ord` derive fixes iteration
/// order of the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKind {
    BaseColorFactor,
    Emissive,
    /// Legacy specular-glossiness diffuse color.
    Diffuse,
    /// Legacy specular-glossiness specular color.
    Specular,
    Metallic,
    Roughness,
    NormalScale,
    OcclusionStrength,
    /// Derived from `glossinessFactor`; see the loader for the mapping.
    Shininess,
    BaseColorTexture,
    MetallicRoughnessTexture,
    EmissiveTexture,
    NormalTexture,
    OcclusionTexture,
    /// Legacy specular-glossiness diffuse texture slot.
    DiffuseTexture,
    /// Legacy specular-glossiness texture slot.
    SpecularTexture,
    /// Suppresses all lighting at shading time. PBR attributes stay in the
    /// set; the shader just ignores them.
    Unlit,
    CullFace,
    AlphaTest,
    Blending,
}

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialAttribute {
    Color(Vec4),
    Scalar(f32),
    Texture(TextureReference),
    Flag,
    CullFace(CullFaceMode),
    Blending(BlendingAttribute),
}

/// Ordered kind → value mapping plus an optional identifier.
///
/// Created once per loaded material and immutable afterwards; shared by
/// every renderable that uses the material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialAttributeSet {
    pub name: Option<String>,
    attributes: BTreeMap<AttributeKind, MaterialAttribute>,
}

impl MaterialAttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the value for `kind`.
    pub fn set(&mut self, kind: AttributeKind, value: MaterialAttribute) {
        self.attributes.insert(kind, value);
    }

    #[inline]
    pub fn has(&self, kind: AttributeKind) -> bool {
        self.attributes.contains_key(&kind)
    }

    #[inline]
    pub fn get(&self, kind: AttributeKind) -> Option<&MaterialAttribute> {
        self.attributes.get(&kind)
    }

    /// Texture reference stored under `kind`, if any.
    pub fn texture(&self, kind: AttributeKind) -> Option<&TextureReference> {
        match self.attributes.get(&kind) {
            Some(MaterialAttribute::Texture(reference)) => Some(reference),
            _ => None,
        }
    }

    pub fn color(&self, kind: AttributeKind) -> Option<Vec4> {
        match self.attributes.get(&kind) {
            Some(MaterialAttribute::Color(color)) => Some(*color),
            _ => None,
        }
    }

    pub fn scalar(&self, kind: AttributeKind) -> Option<f32> {
        match self.attributes.get(&kind) {
            Some(MaterialAttribute::Scalar(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn blending(&self) -> Option<&BlendingAttribute> {
        match self.attributes.get(&AttributeKind::Blending) {
            Some(MaterialAttribute::Blending(blending)) => Some(blending),
            _ => None,
        }
    }

    /// The texture slot that feeds the diffuse sampler. Both the PBR base
    /// color texture and the legacy specular-glossiness diffuse texture map
    /// onto the same shader slot; when a material carries both, the
    /// specular-glossiness one wins, matching translation order.
    pub fn diffuse_texture(&self) -> Option<&TextureReference> {
        self.texture(AttributeKind::DiffuseTexture)
            .or_else(|| self.texture(AttributeKind::BaseColorTexture))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributeKind, &MaterialAttribute)> {
        self.attributes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites_same_kind() {
        let mut set = MaterialAttributeSet::new();
        set.set(AttributeKind::Metallic, MaterialAttribute::Scalar(1.0));
        set.set(AttributeKind::Metallic, MaterialAttribute::Scalar(0.25));

        assert_eq!(set.len(), 1);
        assert_eq!(set.scalar(AttributeKind::Metallic), Some(0.25));
    }

    #[test]
    fn test_iteration_order_is_stable() {
        let mut set = MaterialAttributeSet::new();
        set.set(AttributeKind::Blending, MaterialAttribute::Blending(BlendingAttribute::default()));
        set.set(AttributeKind::BaseColorFactor, MaterialAttribute::Color(Vec4::ONE));
        set.set(AttributeKind::Roughness, MaterialAttribute::Scalar(0.5));

        let kinds: Vec<_> = set.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                AttributeKind::BaseColorFactor,
                AttributeKind::Roughness,
                AttributeKind::Blending,
            ]
        );
    }

    #[test]
    fn test_typed_accessors_reject_other_variants() {
        let mut set = MaterialAttributeSet::new();
        set.set(AttributeKind::Unlit, MaterialAttribute::Flag);

        assert!(set.has(AttributeKind::Unlit));
        assert_eq!(set.scalar(AttributeKind::Unlit), None);
        assert_eq!(set.texture(AttributeKind::Unlit), None);
    }

    #[test]
    fn test_blending_defaults_opaque() {
        assert_eq!(BlendingAttribute::default().opacity, 1.0);
    }

    #[test]
    fn test_diffuse_texture_prefers_specular_glossiness_slot() {
        let base = TextureReference::new(TextureHandle::new(1, MinFilter::Linear), 0);
        let legacy = TextureReference::new(TextureHandle::new(2, MinFilter::Linear), 1);

        let mut set = MaterialAttributeSet::new();
        set.set(AttributeKind::BaseColorTexture, MaterialAttribute::Texture(base));
        assert_eq!(set.diffuse_texture().unwrap().texture.id, 1);

        // specular-glossiness overwrites the shared diffuse sampler slot
        set.set(AttributeKind::DiffuseTexture, MaterialAttribute::Texture(legacy));
        assert_eq!(set.diffuse_texture().unwrap().texture.id, 2);
        assert_eq!(set.diffuse_texture().unwrap().uv_index, 1);
    }

    #[test]
    fn test_mipmap_filters() {
        assert!(MinFilter::LinearMipmapLinear.uses_mipmaps());
        assert!(MinFilter::NearestMipmapNearest.uses_mipmaps());
        assert!(!MinFilter::Linear.uses_mipmaps());
        assert!(!MinFilter::Nearest.uses_mipmaps());
    }
}
