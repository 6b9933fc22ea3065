// src/mesh.rs
//! Vertex layout description and the renderable descriptor fed to the
//! shader variant selector.

use crate::attributes::MaterialAttributeSet;
use crate::environment::LightingEnvironment;

/// Semantic usage of a vertex attribute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexUsage {
    Position,
    Normal,
    Tangent,
    TexCoords,
    BoneWeight,
    /// Per-vertex color stored as floats.
    ColorUnpacked,
    /// Per-vertex color packed into a single word. Not supported by the
    /// shader pipeline; variant selection rejects it.
    ColorPacked,
    /// Morph target channels (one unit per target).
    PositionTarget,
    NormalTarget,
    TangentTarget,
}

/// One vertex attribute: semantic usage plus unit index (UV set, morph
/// target number, bone weight slot, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeSlot {
    pub usage: VertexUsage,
    pub unit: u32,
}

/// The full vertex layout of a mesh, as a flat slot list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexLayout {
    slots: Vec<VertexAttributeSlot>,
}

impl VertexLayout {
    pub fn new(slots: Vec<VertexAttributeSlot>) -> Self {
        Self { slots }
    }

    /// Builder-style helper, mostly for tests and procedural meshes.
    pub fn with(mut self, usage: VertexUsage, unit: u32) -> Self {
        self.slots.push(VertexAttributeSlot { usage, unit });
        self
    }

    pub fn slots(&self) -> &[VertexAttributeSlot] {
        &self.slots
    }

    pub fn has_usage(&self, usage: VertexUsage) -> bool {
        self.slots.iter().any(|slot| slot.usage == usage)
    }

    /// Highest unit index present for `usage`, if any slot matches.
    pub fn max_unit(&self, usage: VertexUsage) -> Option<u32> {
        self.slots
            .iter()
            .filter(|slot| slot.usage == usage)
            .map(|slot| slot.unit)
            .max()
    }
}

/// Read-only view of one draw candidate: vertex layout, translated material
/// and lighting environment, plus the generic shader configuration the base
/// prefix builder consumes.
///
/// Everything is borrowed for the duration of variant computation; the
/// selector never mutates it.
#[derive(Clone, Copy)]
pub struct RenderableDescriptor<'a> {
    pub layout: &'a VertexLayout,
    pub material: &'a MaterialAttributeSet,
    pub environment: &'a LightingEnvironment,
    /// Bone count of the skeleton driving this renderable, zero when
    /// unskinned.
    pub num_bones: u32,
}
