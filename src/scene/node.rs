use glam::{Affine3A, Vec3};
use rustc_hash::FxHashMap;

use crate::resources::uniforms::{TextureRef, UniformValue};

/// A flat scene node: the hot data the renderer reads per draw.
///
/// Hierarchy and transform propagation belong to the host engine; it writes
/// the resulting world matrix here.
///
/// Named uniform and texture overrides act as node-global values and take
/// precedence over anything the node's materials set.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub world_matrix: Affine3A,
    uniforms: FxHashMap<String, UniformValue>,
    textures: FxHashMap<String, TextureRef>,
}

impl Node {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            world_matrix: Affine3A::IDENTITY,
            uniforms: FxHashMap::default(),
            textures: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.world_matrix.translation = position.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.world_matrix.translation.into()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.world_matrix.translation = position.into();
    }

    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.uniforms.insert(name.to_string(), value.into());
    }

    pub fn remove_uniform(&mut self, name: &str) -> Option<UniformValue> {
        self.uniforms.remove(name)
    }

    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    pub fn set_texture(&mut self, name: &str, texture: impl Into<TextureRef>) {
        self.textures.insert(name.to_string(), texture.into());
    }

    pub fn remove_texture(&mut self, name: &str) -> Option<TextureRef> {
        self.textures.remove(name)
    }

    #[must_use]
    pub fn texture(&self, name: &str) -> Option<&TextureRef> {
        self.textures.get(name)
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("Node")
    }
}
