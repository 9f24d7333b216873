//! Frame Context
//!
//! [`FrameContext`] carries the disjoint borrows of [`Renderer`] state that
//! stages and queues need while a frame is recorded. The renderer splits its
//! fields into this struct so the active pipeline can be borrowed mutably at
//! the same time.
//!
//! [`Renderer`]: crate::renderer::Renderer

use crate::renderer::backend::{DrawCommand, RenderBackend, TargetId};
use crate::renderer::framebuffer::WindowTarget;
use crate::renderer::proxy::{ProxyHandle, ProxyKind};
use crate::renderer::registry::ProxyRegistry;
use crate::renderer::resolve::resolve_uniforms;
use crate::renderer::settings::RendererSettings;
use crate::resources::shader::ShaderLibrary;
use crate::scene::SceneNodes;

/// Per-frame counters returned by
/// [`Renderer::render_frame`](crate::renderer::Renderer::render_frame).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: u32,
    pub dispatches: u32,
    /// Handle no longer resolves (proxy destroyed after submission).
    pub skipped_unresolved: u32,
    /// Submission disabled, ray-traced only, or empty mesh.
    pub skipped_not_submittable: u32,
    /// Material could not be bound to its shader.
    pub skipped_unbound: u32,
    /// Stages whose framebuffer could not be begun.
    pub stages_skipped: u32,
}

impl FrameStats {
    #[must_use]
    pub fn skipped(&self) -> u32 {
        self.skipped_unresolved + self.skipped_not_submittable + self.skipped_unbound
    }
}

pub struct FrameContext<'a> {
    pub backend: &'a mut dyn RenderBackend,
    pub window: &'a mut WindowTarget,
    pub proxies: &'a ProxyRegistry,
    pub shaders: &'a mut ShaderLibrary,
    pub scene: &'a dyn SceneNodes,
    pub settings: &'a RendererSettings,
    pub stats: FrameStats,
}

impl FrameContext<'_> {
    /// Resolves `handle`, prepares its material and issues the draw (or
    /// dispatch) into `target`. Returns whether work was submitted.
    pub fn draw_proxy(&mut self, handle: ProxyHandle, target: TargetId) -> bool {
        let Some(proxy) = self.proxies.resolve(handle) else {
            self.stats.skipped_unresolved += 1;
            if self.settings.log_skipped_draws {
                log::debug!("Skipping stale proxy handle {handle:?}");
            }
            return false;
        };

        if !proxy.is_submittable() {
            self.stats.skipped_not_submittable += 1;
            if self.settings.log_skipped_draws {
                log::debug!("Skipping proxy {handle:?}: not submittable");
            }
            return false;
        }

        let mut material = proxy.material().write();
        let shader = if material.prepare(self.shaders) {
            material.shader().cloned()
        } else {
            None
        };
        let Some(shader) = shader else {
            self.stats.skipped_unbound += 1;
            if self.settings.log_skipped_draws {
                log::debug!("Skipping proxy {handle:?}: material '{}' is unbound", material.name);
            }
            return false;
        };

        let uniforms = resolve_uniforms(&shader, &material, self.scene, proxy.node());
        drop(material);

        let cmd = DrawCommand {
            proxy: handle,
            kind: proxy.kind(),
            draw_state: proxy.draw_state(),
            target,
            program_key: shader.program_key(),
            render_state: *shader.render_state(),
            mesh: proxy.mesh.as_deref(),
            uniforms: &uniforms,
        };

        match proxy.kind() {
            ProxyKind::Render => {
                self.backend.draw(&cmd);
                self.stats.draws += 1;
            }
            ProxyKind::Compute => {
                self.backend.dispatch(&cmd);
                self.stats.dispatches += 1;
            }
        }
        true
    }
}
