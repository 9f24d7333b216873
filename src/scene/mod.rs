//! Scene-side collaborators of the frame core.
//!
//! The renderer never walks a scene graph. It holds a [`NodeKey`] per proxy
//! and asks a [`SceneNodes`] implementation for the few things a draw needs:
//! the node's world position (for depth sorting) and node-global uniform and
//! texture values (for uniform resolution).
//!
//! [`Scene`] is the reference implementation: a flat node table plus one
//! active camera, answering the well-known names in [`global_names`].

pub mod camera;
pub mod node;
pub mod scene;

pub use camera::{Camera, ProjectionType};
pub use node::Node;
pub use scene::Scene;

use glam::Vec3;
use slotmap::new_key_type;

use crate::resources::uniforms::{TextureRef, UniformValue};

new_key_type! {
    /// Weak reference from a proxy to its owning scene node.
    pub struct NodeKey;
}

/// Uniform names a scene supplies from transform and camera state.
pub mod global_names {
    pub const WORLD_MATRIX: &str = "u_WorldMatrix";
    pub const VIEW_MATRIX: &str = "u_ViewMatrix";
    pub const PROJECTION_MATRIX: &str = "u_ProjectionMatrix";
    pub const VIEW_PROJECTION_MATRIX: &str = "u_ViewProjectionMatrix";
    pub const WORLD_VIEW_PROJECTION_MATRIX: &str = "u_WorldViewProjectionMatrix";
    pub const CAMERA_POSITION: &str = "u_CameraPosition";
    pub const CAMERA_DIRECTION: &str = "u_CameraDirection";
    pub const CAMERA_NEAR: &str = "u_CameraNear";
    pub const CAMERA_FAR: &str = "u_CameraFar";

    pub const ALL: [&str; 9] = [
        WORLD_MATRIX,
        VIEW_MATRIX,
        PROJECTION_MATRIX,
        VIEW_PROJECTION_MATRIX,
        WORLD_VIEW_PROJECTION_MATRIX,
        CAMERA_POSITION,
        CAMERA_DIRECTION,
        CAMERA_NEAR,
        CAMERA_FAR,
    ];
}

/// Read-only view of scene state the renderer queries while drawing.
///
/// Every lookup takes a possibly stale [`NodeKey`]; implementations return
/// `None` for nodes that no longer exist.
pub trait SceneNodes {
    fn contains(&self, node: NodeKey) -> bool;

    /// World-space position of the node's origin.
    fn world_position(&self, node: NodeKey) -> Option<Vec3>;

    /// Node-global value for a uniform slot, if the scene supplies one.
    fn global_uniform(&self, node: NodeKey, name: &str) -> Option<UniformValue>;

    /// Node-global texture override for a texture slot.
    fn global_texture(&self, node: NodeKey, name: &str) -> Option<TextureRef>;

    /// Origin of the sort axis (the active camera position).
    fn view_origin(&self) -> Vec3;

    /// Unit direction of the sort axis (the active camera forward vector).
    fn view_direction(&self) -> Vec3;
}
