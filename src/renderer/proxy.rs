use std::sync::Arc;

use bitflags::bitflags;
use slotmap::new_key_type;

use crate::renderer::backend::DrawStateId;
use crate::resources::material::MaterialRef;
use crate::resources::mesh::Mesh;
use crate::scene::NodeKey;

new_key_type! {
    /// Generation-checked handle to a registry-owned proxy.
    pub struct ProxyHandle;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProxyFlags: u32 {
        const CAST_SHADOW        = 1 << 0;
        const CUSTOM_DEPTH       = 1 << 1;
        /// Only the ray tracer sees this proxy; raster queues skip it.
        const RAYTRACED_ONLY     = 1 << 2;
        /// Proxy may be submitted to queues.
        const SUBMIT_ENABLED     = 1 << 3;
        /// Backend built acceleration-structure data for this proxy.
        const RAYTRACING_CAPABLE = 1 << 4;
    }
}

impl Default for ProxyFlags {
    fn default() -> Self {
        Self::SUBMIT_ENABLED | Self::CAST_SHADOW
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    /// Rasterized with a mesh.
    Render,
    /// Dispatched as compute work; has no mesh.
    Compute,
}

/// A drawable or computable unit: mesh + material + owning node.
///
/// Owned by the [`ProxyRegistry`](crate::renderer::registry::ProxyRegistry);
/// everything else refers to it by [`ProxyHandle`].
#[derive(Debug)]
pub struct RenderProxy {
    pub(crate) handle: ProxyHandle,
    pub(crate) kind: ProxyKind,
    pub(crate) mesh: Option<Arc<Mesh>>,
    pub(crate) material: MaterialRef,
    pub(crate) node: NodeKey,
    pub flags: ProxyFlags,
    pub(crate) draw_state: DrawStateId,
}

impl RenderProxy {
    #[inline]
    #[must_use]
    pub fn handle(&self) -> ProxyHandle {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn material(&self) -> &MaterialRef {
        &self.material
    }

    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeKey {
        self.node
    }

    #[inline]
    #[must_use]
    pub fn draw_state(&self) -> DrawStateId {
        self.draw_state
    }

    /// Whether a queue may draw this proxy: submission enabled, not
    /// ray-traced only, and (for render proxies) a mesh with at least one
    /// primitive.
    #[must_use]
    pub fn is_submittable(&self) -> bool {
        if !self.flags.contains(ProxyFlags::SUBMIT_ENABLED) || self.flags.contains(ProxyFlags::RAYTRACED_ONLY) {
            return false;
        }
        match self.kind {
            ProxyKind::Render => self.mesh.as_ref().is_some_and(|m| m.is_drawable()),
            ProxyKind::Compute => true,
        }
    }
}
