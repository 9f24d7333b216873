//! Renderer Backend Interface
//!
//! [`RenderBackend`] is the narrow GPU-facing surface the frame core drives.
//! A backend owns device objects; the core only ever holds the opaque ids it
//! hands out ([`DrawStateId`], [`TargetId`]).
//!
//! Call order within a frame:
//!
//! ```text
//! begin_frame
//!   begin_target(fb) ─ draw / dispatch ... ─ end_target(fb)   (per stage)
//! present
//! ```

use crate::errors::Result;
use crate::renderer::framebuffer::{ColorAttachment, DepthStencilAttachment};
use crate::renderer::proxy::{ProxyHandle, ProxyKind};
use crate::renderer::resolve::ResolvedUniform;
use crate::resources::material::Material;
use crate::resources::mesh::Mesh;
use crate::resources::shader::RenderState;

/// Backend-owned per-proxy draw state (pipeline object, vertex bindings, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawStateId(pub u64);

/// Backend-owned render target (swap surface or offscreen attachments).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

/// One draw (or dispatch) as seen by the backend.
#[derive(Debug, Clone, Copy)]
pub struct DrawCommand<'a> {
    pub proxy: ProxyHandle,
    pub kind: ProxyKind,
    pub draw_state: DrawStateId,
    pub target: TargetId,
    /// Identifies the `(shader path, macro set)` program.
    pub program_key: u64,
    pub render_state: RenderState,
    /// `None` for compute proxies.
    pub mesh: Option<&'a Mesh>,
    /// Every uniform slot of the shader, resolved.
    pub uniforms: &'a [ResolvedUniform],
}

pub trait RenderBackend {
    /// Backend name (for logging).
    fn name(&self) -> &str;

    // === Proxy draw state ===

    /// Allocates draw state for a proxy. Failure is the one fatal error the
    /// core surfaces to callers.
    fn create_draw_state(
        &mut self,
        proxy: ProxyHandle,
        kind: ProxyKind,
        mesh: Option<&Mesh>,
        material: &Material,
    ) -> Result<DrawStateId>;

    fn release_draw_state(&mut self, id: DrawStateId);

    // === Targets ===

    fn create_window_target(&mut self) -> Result<TargetId>;

    fn create_offscreen_target(&mut self, width: u32, height: u32, color_count: usize) -> Result<TargetId>;

    fn resize_target(&mut self, target: TargetId, width: u32, height: u32);

    fn release_target(&mut self, target: TargetId);

    /// Resizes the swap surface.
    fn resize_surface(&mut self, width: u32, height: u32);

    /// Current swap surface size in pixels.
    fn window_size(&self) -> (u32, u32);

    /// Binds a target and applies its clear policy. Returns `false` if the
    /// target cannot be bound this frame.
    fn begin_target(&mut self, target: TargetId, colors: &[ColorAttachment], depth: Option<&DepthStencilAttachment>) -> bool;

    fn end_target(&mut self, target: TargetId);

    // === Work submission ===

    fn draw(&mut self, cmd: &DrawCommand<'_>);

    fn dispatch(&mut self, cmd: &DrawCommand<'_>);

    fn begin_frame(&mut self);

    fn present(&mut self);
}
