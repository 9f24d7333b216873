use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::resources::uniforms::{TextureRef, UniformValue};
use crate::scene::camera::Camera;
use crate::scene::global_names as names;
use crate::scene::node::Node;
use crate::scene::{NodeKey, SceneNodes};

/// Reference scene: a flat node table, one active camera and scene-wide
/// named globals.
///
/// Global uniform lookup for a node resolves, in order:
/// 1. the node's own named override,
/// 2. a well-known transform/camera name ([`global_names`](crate::scene::global_names)),
/// 3. a scene-wide named global.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeKey, Node>,
    pub camera: Camera,
    globals: FxHashMap<String, UniformValue>,
    global_textures: FxHashMap<String, TextureRef>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_camera(camera: Camera) -> Self {
        Self {
            camera,
            ..Self::default()
        }
    }

    /// Starts building a node
    pub fn build_node(&mut self, name: &str) -> NodeBuilder<'_> {
        NodeBuilder::new(self, name)
    }

    pub fn add_node(&mut self, node: Node) -> NodeKey {
        self.nodes.insert(node)
    }

    /// Removes a node. The caller is responsible for telling the renderer
    /// (see [`Renderer::on_node_destroyed`](crate::renderer::Renderer::on_node_destroyed)).
    pub fn remove_node(&mut self, key: NodeKey) -> Option<Node> {
        self.nodes.remove(key)
    }

    #[must_use]
    pub fn get_node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn get_node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter_nodes(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.nodes.iter()
    }

    pub fn set_global_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.globals.insert(name.to_string(), value.into());
    }

    pub fn remove_global_uniform(&mut self, name: &str) -> Option<UniformValue> {
        self.globals.remove(name)
    }

    pub fn set_global_texture(&mut self, name: &str, texture: impl Into<TextureRef>) {
        self.global_textures.insert(name.to_string(), texture.into());
    }

    pub fn remove_global_texture(&mut self, name: &str) -> Option<TextureRef> {
        self.global_textures.remove(name)
    }

    fn well_known(&self, node: &Node, name: &str) -> Option<UniformValue> {
        let cam = &self.camera;
        let value: UniformValue = match name {
            names::WORLD_MATRIX => Mat4::from(node.world_matrix).into(),
            names::VIEW_MATRIX => cam.view_matrix().into(),
            names::PROJECTION_MATRIX => cam.projection_matrix().into(),
            names::VIEW_PROJECTION_MATRIX => cam.view_projection_matrix().into(),
            names::WORLD_VIEW_PROJECTION_MATRIX => {
                (cam.view_projection_matrix() * Mat4::from(node.world_matrix)).into()
            }
            names::CAMERA_POSITION => cam.position().into(),
            names::CAMERA_DIRECTION => cam.forward().into(),
            names::CAMERA_NEAR => cam.near.into(),
            names::CAMERA_FAR => cam.far.into(),
            _ => return None,
        };
        Some(value)
    }
}

impl SceneNodes for Scene {
    fn contains(&self, node: NodeKey) -> bool {
        self.nodes.contains_key(node)
    }

    fn world_position(&self, node: NodeKey) -> Option<Vec3> {
        self.nodes.get(node).map(Node::world_position)
    }

    fn global_uniform(&self, node: NodeKey, name: &str) -> Option<UniformValue> {
        let n = self.nodes.get(node)?;
        n.uniform(name)
            .cloned()
            .or_else(|| self.well_known(n, name))
            .or_else(|| self.globals.get(name).cloned())
    }

    fn global_texture(&self, node: NodeKey, name: &str) -> Option<TextureRef> {
        let n = self.nodes.get(node)?;
        n.texture(name)
            .or_else(|| self.global_textures.get(name))
            .cloned()
    }

    fn view_origin(&self) -> Vec3 {
        self.camera.position()
    }

    fn view_direction(&self) -> Vec3 {
        self.camera.forward()
    }
}

pub struct NodeBuilder<'a> {
    scene: &'a mut Scene,
    node: Node,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(scene: &'a mut Scene, name: &str) -> Self {
        Self {
            scene,
            node: Node::new(name),
        }
    }

    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.node.set_position(Vec3::new(x, y, z));
        self
    }

    #[must_use]
    pub fn with_uniform(mut self, name: &str, value: impl Into<UniformValue>) -> Self {
        self.node.set_uniform(name, value);
        self
    }

    #[must_use]
    pub fn with_texture(mut self, name: &str, texture: impl Into<TextureRef>) -> Self {
        self.node.set_texture(name, texture);
        self
    }

    /// Inserts the node into the scene and returns its key.
    pub fn build(self) -> NodeKey {
        self.scene.add_node(self.node)
    }
}
