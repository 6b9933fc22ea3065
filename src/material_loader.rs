// src/material_loader.rs
//! Material Translator: decoded glTF material record → runtime attribute set.
//!
//! Runs once per loaded material. Rules apply in a fixed precedence order;
//! later rules may add to or overwrite earlier ones (notably the blend
//! opacity, which needs both the alpha mode and the base-color factor).
//! The only failure mode is an unrecognized `alphaMode` string.

use glam::{Vec2, Vec4};
use log::debug;

use crate::attributes::{
    AttributeKind, BlendingAttribute, CullFaceMode, MaterialAttribute, MaterialAttributeSet,
    TextureHandle, TextureReference, UvTransform,
};
use crate::document::{MaterialRecord, TextureInfoRecord};
use crate::error::{Error, Result};

/// Resolves a texture binding of the document to a loaded GPU texture.
/// Texture decoding and upload live behind this seam.
pub trait TextureResolver {
    fn resolve(&self, info: &TextureInfoRecord) -> TextureHandle;
}

impl<F> TextureResolver for F
where
    F: Fn(&TextureInfoRecord) -> TextureHandle,
{
    fn resolve(&self, info: &TextureInfoRecord) -> TextureHandle {
        self(info)
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn map_color4(factor: Option<[f32; 4]>, default: Vec4) -> Vec4 {
    factor.map(Vec4::from_array).unwrap_or(default)
}

fn map_color3(factor: Option<[f32; 3]>, default: Vec4) -> Vec4 {
    factor
        .map(|rgb| Vec4::new(rgb[0], rgb[1], rgb[2], 1.0))
        .unwrap_or(default)
}

/// Translates material records using an external texture resolver.
pub struct PbrMaterialLoader<R: TextureResolver> {
    resolver: R,
}

impl<R: TextureResolver> PbrMaterialLoader<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// Translate one material record. Never fails except on an unknown
    /// `alphaMode` string.
    pub fn load_material(&self, record: &MaterialRecord) -> Result<MaterialAttributeSet> {
        let mut material = MaterialAttributeSet::new();

        if let Some(name) = &record.name {
            material.name = Some(name.clone());
        }

        if let Some(factor) = record.emissive_factor {
            material.set(
                AttributeKind::Emissive,
                MaterialAttribute::Color(map_color3(Some(factor), Vec4::new(0.0, 0.0, 0.0, 1.0))),
            );
        }

        if let Some(info) = &record.emissive_texture {
            material.set(
                AttributeKind::EmissiveTexture,
                MaterialAttribute::Texture(self.texture_map(info)),
            );
        }

        if record.double_sided == Some(true) {
            material.set(
                AttributeKind::CullFace,
                MaterialAttribute::CullFace(CullFaceMode::Disabled),
            );
        }

        if let Some(normal) = &record.normal_texture {
            material.set(
                AttributeKind::NormalTexture,
                MaterialAttribute::Texture(self.texture_map(&normal.info)),
            );
            // verbatim, zero included
            material.set(
                AttributeKind::NormalScale,
                MaterialAttribute::Scalar(normal.scale),
            );
        }

        if let Some(occlusion) = &record.occlusion_texture {
            material.set(
                AttributeKind::OcclusionTexture,
                MaterialAttribute::Texture(self.texture_map(&occlusion.info)),
            );
            material.set(
                AttributeKind::OcclusionStrength,
                MaterialAttribute::Scalar(occlusion.strength),
            );
        }

        let mut alpha_blend = false;
        match record.alpha_mode.as_deref() {
            Some("OPAQUE") => {
                // nothing to do
            }
            Some("MASK") => {
                let cutoff = record.alpha_cutoff.unwrap_or(0.5);
                material.set(AttributeKind::AlphaTest, MaterialAttribute::Scalar(cutoff));
                // the alpha test needs a well-defined blend state
                material.set(
                    AttributeKind::Blending,
                    MaterialAttribute::Blending(BlendingAttribute::default()),
                );
            }
            Some("BLEND") => {
                // opacity is set from the base-color factor below
                material.set(
                    AttributeKind::Blending,
                    MaterialAttribute::Blending(BlendingAttribute::default()),
                );
                alpha_blend = true;
            }
            Some(other) => {
                return Err(Error::UnsupportedValue(format!(
                    "unknown alpha mode: {other}"
                )));
            }
            None => {
                // absent is distinct from OPAQUE: no alpha attribute at all
            }
        }

        if let Some(pbr) = &record.pbr_metallic_roughness {
            let base_color = map_color4(pbr.base_color_factor, Vec4::ONE);

            material.set(
                AttributeKind::BaseColorFactor,
                MaterialAttribute::Color(base_color),
            );
            material.set(
                AttributeKind::Metallic,
                MaterialAttribute::Scalar(pbr.metallic_factor),
            );
            material.set(
                AttributeKind::Roughness,
                MaterialAttribute::Scalar(pbr.roughness_factor),
            );

            if let Some(info) = &pbr.metallic_roughness_texture {
                material.set(
                    AttributeKind::MetallicRoughnessTexture,
                    MaterialAttribute::Texture(self.texture_map(info)),
                );
            }

            if let Some(info) = &pbr.base_color_texture {
                material.set(
                    AttributeKind::BaseColorTexture,
                    MaterialAttribute::Texture(self.texture_map(info)),
                );
            }

            if alpha_blend {
                material.set(
                    AttributeKind::Blending,
                    MaterialAttribute::Blending(BlendingAttribute {
                        opacity: base_color.w,
                    }),
                );
            }
        }

        // extensions: specular-glossiness and the base PBR block are
        // independent, both may be populated at once
        if let Some(sg) = record.specular_glossiness() {
            material.set(
                AttributeKind::Diffuse,
                MaterialAttribute::Color(map_color4(sg.diffuse_factor, Vec4::ONE)),
            );
            material.set(
                AttributeKind::Specular,
                MaterialAttribute::Color(map_color3(sg.specular_factor, Vec4::ONE)),
            );
            // normalized glossiness mapped onto a shininess exponent; kept
            // for compatibility with other implementations of this format
            material.set(
                AttributeKind::Shininess,
                MaterialAttribute::Scalar(lerp(1.0, 100.0, sg.glossiness_factor)),
            );
            if let Some(info) = &sg.diffuse_texture {
                material.set(
                    AttributeKind::DiffuseTexture,
                    MaterialAttribute::Texture(self.texture_map(info)),
                );
            }
            if let Some(info) = &sg.specular_glossiness_texture {
                material.set(
                    AttributeKind::SpecularTexture,
                    MaterialAttribute::Texture(self.texture_map(info)),
                );
            }
        }

        if record.is_unlit() {
            material.set(AttributeKind::Unlit, MaterialAttribute::Flag);
        }

        debug!(
            "loaded material {:?}: {} attributes",
            material.name,
            material.len()
        );
        Ok(material)
    }

    /// Build a texture slot: resolve the handle, take the UV channel from
    /// the record, then let `KHR_texture_transform` override transform and
    /// (only when explicitly given) the UV channel.
    fn texture_map(&self, info: &TextureInfoRecord) -> TextureReference {
        let handle = self.resolver.resolve(info);
        let mut reference = TextureReference::new(handle, info.tex_coord);

        if let Some(transform) = info
            .extensions
            .as_ref()
            .and_then(|ext| ext.texture_transform.as_ref())
        {
            reference.transform = UvTransform {
                offset: Vec2::from_array(transform.offset),
                scale: Vec2::from_array(transform.scale),
                rotation: transform.rotation,
            };
            if let Some(tex_coord) = transform.tex_coord {
                reference.uv_index = tex_coord;
            }
        }

        reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::MinFilter;
    use serde_json::json;

    fn resolver(info: &TextureInfoRecord) -> TextureHandle {
        TextureHandle::new(info.index, MinFilter::Linear)
    }

    fn loader() -> PbrMaterialLoader<fn(&TextureInfoRecord) -> TextureHandle> {
        PbrMaterialLoader::new(resolver as fn(&TextureInfoRecord) -> TextureHandle)
    }

    fn load(value: serde_json::Value) -> Result<MaterialAttributeSet> {
        let record: MaterialRecord = serde_json::from_value(value).unwrap();
        loader().load_material(&record)
    }

    #[test]
    fn test_valid_alpha_modes() {
        for mode in ["OPAQUE", "MASK", "BLEND"] {
            assert!(load(json!({ "alphaMode": mode })).is_ok(), "mode {mode}");
        }
    }

    #[test]
    fn test_unknown_alpha_mode_fails() {
        let err = load(json!({ "alphaMode": "DITHER" })).unwrap_err();
        assert!(err.is_unsupported_value());
        assert!(err.to_string().contains("DITHER"));
    }

    #[test]
    fn test_absent_alpha_mode_sets_no_alpha_attributes() {
        let material = load(json!({})).unwrap();
        assert!(!material.has(AttributeKind::AlphaTest));
        assert!(!material.has(AttributeKind::Blending));

        // explicit OPAQUE behaves the same at the attribute level
        let opaque = load(json!({ "alphaMode": "OPAQUE" })).unwrap();
        assert!(!opaque.has(AttributeKind::Blending));
    }

    #[test]
    fn test_mask_cutoff_defaults() {
        let material = load(json!({ "alphaMode": "MASK" })).unwrap();
        assert_eq!(material.scalar(AttributeKind::AlphaTest), Some(0.5));
        assert!(material.has(AttributeKind::Blending));

        let material = load(json!({ "alphaMode": "MASK", "alphaCutoff": 0.2 })).unwrap();
        assert_eq!(material.scalar(AttributeKind::AlphaTest), Some(0.2));
    }

    #[test]
    fn test_blend_opacity_follows_base_color_alpha() {
        let material = load(json!({
            "alphaMode": "BLEND",
            "pbrMetallicRoughness": { "baseColorFactor": [1.0, 1.0, 1.0, 0.4] }
        }))
        .unwrap();
        assert_eq!(material.blending().unwrap().opacity, 0.4);

        // without a metallic-roughness block the opacity stays opaque
        let material = load(json!({ "alphaMode": "BLEND" })).unwrap();
        assert_eq!(material.blending().unwrap().opacity, 1.0);
    }

    #[test]
    fn test_pbr_block_defaults() {
        let material = load(json!({ "pbrMetallicRoughness": {} })).unwrap();
        assert_eq!(
            material.color(AttributeKind::BaseColorFactor),
            Some(Vec4::ONE)
        );
        assert_eq!(material.scalar(AttributeKind::Metallic), Some(1.0));
        assert_eq!(material.scalar(AttributeKind::Roughness), Some(1.0));
    }

    #[test]
    fn test_emissive_and_double_sided() {
        let material = load(json!({
            "emissiveFactor": [0.1, 0.2, 0.3],
            "doubleSided": true
        }))
        .unwrap();
        assert_eq!(
            material.color(AttributeKind::Emissive),
            Some(Vec4::new(0.1, 0.2, 0.3, 1.0))
        );
        assert_eq!(
            material.get(AttributeKind::CullFace),
            Some(&MaterialAttribute::CullFace(CullFaceMode::Disabled))
        );

        let one_sided = load(json!({ "doubleSided": false })).unwrap();
        assert!(!one_sided.has(AttributeKind::CullFace));
    }

    #[test]
    fn test_normal_scale_taken_verbatim() {
        let material = load(json!({
            "normalTexture": { "index": 1, "scale": 0.0 }
        }))
        .unwrap();
        assert_eq!(material.scalar(AttributeKind::NormalScale), Some(0.0));

        let defaulted = load(json!({ "normalTexture": { "index": 1 } })).unwrap();
        assert_eq!(defaulted.scalar(AttributeKind::NormalScale), Some(1.0));
    }

    #[test]
    fn test_occlusion_strength() {
        let material = load(json!({
            "occlusionTexture": { "index": 4, "strength": 0.7 }
        }))
        .unwrap();
        assert!(material.has(AttributeKind::OcclusionTexture));
        assert_eq!(material.scalar(AttributeKind::OcclusionStrength), Some(0.7));
    }

    #[test]
    fn test_texture_transform_overrides_uv_channel() {
        let material = load(json!({
            "pbrMetallicRoughness": {
                "baseColorTexture": {
                    "index": 0,
                    "texCoord": 0,
                    "extensions": {
                        "KHR_texture_transform": {
                            "offset": [0.5, 0.0],
                            "scale": [2.0, 2.0],
                            "rotation": 0.25,
                            "texCoord": 1
                        }
                    }
                }
            }
        }))
        .unwrap();

        let reference = material.texture(AttributeKind::BaseColorTexture).unwrap();
        assert_eq!(reference.uv_index, 1);
        assert_eq!(reference.transform.offset, Vec2::new(0.5, 0.0));
        assert_eq!(reference.transform.scale, Vec2::new(2.0, 2.0));
        assert_eq!(reference.transform.rotation, 0.25);
    }

    #[test]
    fn test_texture_transform_without_tex_coord_keeps_base_channel() {
        let material = load(json!({
            "emissiveTexture": {
                "index": 2,
                "texCoord": 1,
                "extensions": {
                    "KHR_texture_transform": { "offset": [0.1, 0.1] }
                }
            }
        }))
        .unwrap();

        let reference = material.texture(AttributeKind::EmissiveTexture).unwrap();
        assert_eq!(reference.uv_index, 1);
        assert!(!reference.transform.is_identity());
    }

    #[test]
    fn test_specular_glossiness_extension() {
        let material = load(json!({
            "pbrMetallicRoughness": { "metallicFactor": 0.0 },
            "extensions": {
                "KHR_materials_pbrSpecularGlossiness": {
                    "diffuseFactor": [0.5, 0.5, 0.5, 1.0],
                    "specularFactor": [1.0, 0.9, 0.8],
                    "glossinessFactor": 0.5,
                    "diffuseTexture": { "index": 7 },
                    "specularGlossinessTexture": { "index": 8 }
                }
            }
        }))
        .unwrap();

        assert_eq!(
            material.color(AttributeKind::Diffuse),
            Some(Vec4::new(0.5, 0.5, 0.5, 1.0))
        );
        assert_eq!(
            material.color(AttributeKind::Specular),
            Some(Vec4::new(1.0, 0.9, 0.8, 1.0))
        );
        // documented approximation: lerp(1, 100, glossiness), not a
        // physically derived exponent
        assert_eq!(material.scalar(AttributeKind::Shininess), Some(50.5));
        assert_eq!(material.texture(AttributeKind::DiffuseTexture).unwrap().texture.id, 7);
        assert_eq!(material.texture(AttributeKind::SpecularTexture).unwrap().texture.id, 8);

        // both shading models populated at once
        assert!(material.has(AttributeKind::Metallic));
        assert!(material.has(AttributeKind::Diffuse));
    }

    #[test]
    fn test_unlit_flag() {
        let material = load(json!({
            "extensions": { "KHR_materials_unlit": {} },
            "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] }
        }))
        .unwrap();

        assert!(material.has(AttributeKind::Unlit));
        // unlit does not strip the PBR attributes from the set
        assert!(material.has(AttributeKind::BaseColorFactor));
    }

    #[test]
    fn test_name_pass_through() {
        let material = load(json!({ "name": "gold" })).unwrap();
        assert_eq!(material.name.as_deref(), Some("gold"));
    }
}
