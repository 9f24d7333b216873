//! Uniform Resolution
//!
//! Decides, for every uniform slot of a bound material's shader, where the
//! value for this draw comes from.
//!
//! | Slot kind | 1st                         | 2nd                              | 3rd            |
//! |-----------|-----------------------------|----------------------------------|----------------|
//! | value     | node global (by name)       | material local value (by name)   | shader default |
//! | texture   | node global texture (name)  | material texture at slot's unit  | nothing bound  |
//!
//! A candidate whose type or element count does not match the slot is passed
//! over and the next source is tried.

use smallvec::SmallVec;

use crate::resources::material::Material;
use crate::resources::shader::{ShaderDescriptor, UniformDesc};
use crate::resources::uniforms::{ShaderStage, TextureRef, UniformValue};
use crate::scene::{NodeKey, SceneNodes};

/// Where a resolved uniform came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformSource {
    Node,
    Material,
    ShaderDefault,
    /// No source supplied anything.
    Unset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformBinding {
    Value(UniformValue),
    Texture { unit: u32, texture: Option<TextureRef> },
    Unset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUniform {
    pub name: String,
    pub stage: ShaderStage,
    pub source: UniformSource,
    pub binding: UniformBinding,
}

impl ResolvedUniform {
    /// The resolved value, for value slots.
    #[must_use]
    pub fn value(&self) -> Option<&UniformValue> {
        match &self.binding {
            UniformBinding::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The bound texture, for texture slots.
    #[must_use]
    pub fn texture(&self) -> Option<&TextureRef> {
        match &self.binding {
            UniformBinding::Texture { texture, .. } => texture.as_ref(),
            _ => None,
        }
    }
}

pub type ResolvedUniforms = SmallVec<[ResolvedUniform; 8]>;

/// Resolves every slot of `shader` for one draw of `material` owned by `node`.
#[must_use]
pub fn resolve_uniforms(
    shader: &ShaderDescriptor,
    material: &Material,
    scene: &dyn SceneNodes,
    node: NodeKey,
) -> ResolvedUniforms {
    shader
        .uniforms()
        .iter()
        .map(|slot| match slot.texture_unit {
            Some(unit) => resolve_texture(slot, unit, material, scene, node),
            None => resolve_value(slot, material, scene, node),
        })
        .collect()
}

fn resolve_value(slot: &UniformDesc, material: &Material, scene: &dyn SceneNodes, node: NodeKey) -> ResolvedUniform {
    let (source, binding) = if let Some(v) = scene
        .global_uniform(node, &slot.name)
        .filter(|v| v.matches(slot.kind, slot.count))
    {
        (UniformSource::Node, UniformBinding::Value(v))
    } else if let Some(v) = material
        .uniform_value(&slot.name)
        .filter(|v| v.matches(slot.kind, slot.count))
    {
        (UniformSource::Material, UniformBinding::Value(v.clone()))
    } else if let Some(v) = &slot.default {
        (UniformSource::ShaderDefault, UniformBinding::Value(v.clone()))
    } else {
        (UniformSource::Unset, UniformBinding::Unset)
    };

    ResolvedUniform {
        name: slot.name.clone(),
        stage: slot.stage,
        source,
        binding,
    }
}

fn resolve_texture(
    slot: &UniformDesc,
    unit: u32,
    material: &Material,
    scene: &dyn SceneNodes,
    node: NodeKey,
) -> ResolvedUniform {
    let (source, texture) = if let Some(t) = scene.global_texture(node, &slot.name) {
        (UniformSource::Node, Some(t))
    } else if let Some(t) = material.texture(unit) {
        (UniformSource::Material, Some(t.clone()))
    } else {
        (UniformSource::Unset, None)
    };

    ResolvedUniform {
        name: slot.name.clone(),
        stage: slot.stage,
        source,
        binding: UniformBinding::Texture { unit, texture },
    }
}
