//! Renderer
//!
//! [`Renderer`] is the explicit context object of the frame core. It owns:
//!
//! - the backend (`Box<dyn RenderBackend>`)
//! - the [`ProxyRegistry`]
//! - the [`ShaderLibrary`]
//! - every loaded [`RenderPipeline`] and which one is active
//! - the [`WindowTarget`] shared by all window framebuffers
//!
//! # Frame flow
//!
//! ```text
//! scene traversal ── submit(handle) ──▶ material.render_stage() ──▶ active pipeline
//!                                                                     └─ stage ─ queue
//! render_frame(scene):
//!   begin_frame ─▶ for stage: begin fb ─▶ queues (sort, resolve, draw) ─▶ end fb ─▶ present
//! ```
//!
//! Mutation always goes through `&mut Renderer`; the core graph has no
//! interior locking.

pub mod backend;
pub mod framebuffer;
pub mod graph;
pub mod headless;
pub mod proxy;
pub mod registry;
pub mod resolve;
pub mod settings;

use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

use crate::errors::{RenderError, Result};
use crate::resources::material::MaterialRef;
use crate::resources::mesh::Mesh;
use crate::resources::shader::ShaderLibrary;
use crate::scene::{NodeKey, SceneNodes};

pub use backend::{DrawCommand, DrawStateId, RenderBackend, TargetId};
pub use framebuffer::{
    ColorAttachment, DepthStencilAttachment, Framebuffer, FramebufferKind, FramebufferTable, WINDOW_FRAMEBUFFER,
    WindowTarget,
};
pub use graph::{FrameContext, FrameStats, PipelineConfig, RenderPipeline, RenderQueue, RenderStage, SortOrder};
pub use headless::{BackendEvent, HeadlessBackend, HeadlessRecorder};
pub use proxy::{ProxyFlags, ProxyHandle, ProxyKind, RenderProxy};
pub use registry::ProxyRegistry;
pub use resolve::{ResolvedUniform, UniformBinding, UniformSource, resolve_uniforms};
pub use settings::RendererSettings;

new_key_type! {
    pub struct PipelineKey;
}

pub struct Renderer {
    backend: Box<dyn RenderBackend>,
    proxies: ProxyRegistry,
    shaders: ShaderLibrary,
    pipelines: SlotMap<PipelineKey, RenderPipeline>,
    active_pipeline: Option<PipelineKey>,
    window_target: WindowTarget,
    settings: RendererSettings,
    last_stats: FrameStats,
}

impl Renderer {
    /// Creates the renderer with one active pipeline built from
    /// `settings.default_pipeline` (or the built-in default).
    #[must_use]
    pub fn new(backend: Box<dyn RenderBackend>, settings: RendererSettings) -> Self {
        let pipeline = match settings.default_pipeline.as_deref() {
            Some(text) => RenderPipeline::load(text),
            None => RenderPipeline::default(),
        };
        log::info!("Renderer initialized with '{}' backend", backend.name());

        let mut pipelines = SlotMap::with_key();
        let key = pipelines.insert(pipeline);
        Self {
            backend,
            proxies: ProxyRegistry::new(),
            shaders: ShaderLibrary::new(),
            pipelines,
            active_pipeline: Some(key),
            window_target: WindowTarget::default(),
            settings,
            last_stats: FrameStats::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[inline]
    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    #[inline]
    #[must_use]
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn shaders(&self) -> &ShaderLibrary {
        &self.shaders
    }

    #[inline]
    pub fn shaders_mut(&mut self) -> &mut ShaderLibrary {
        &mut self.shaders
    }

    #[inline]
    #[must_use]
    pub fn proxies(&self) -> &ProxyRegistry {
        &self.proxies
    }

    // ========================================================================
    // Proxies
    // ========================================================================

    /// Creates a rasterized proxy. `raytracing` marks it ray-tracing capable.
    pub fn create_render_proxy(
        &mut self,
        mesh: Arc<Mesh>,
        material: MaterialRef,
        node: NodeKey,
        raytracing: bool,
    ) -> Result<ProxyHandle> {
        let mut flags = ProxyFlags::default();
        flags.set(ProxyFlags::RAYTRACING_CAPABLE, raytracing);
        self.proxies.create(
            self.backend.as_mut(),
            ProxyKind::Render,
            Some(mesh),
            material,
            node,
            flags,
        )
    }

    /// Creates a compute proxy; queues dispatch it instead of drawing.
    pub fn create_compute_proxy(&mut self, material: MaterialRef, node: NodeKey) -> Result<ProxyHandle> {
        let flags = ProxyFlags::SUBMIT_ENABLED;
        self.proxies
            .create(self.backend.as_mut(), ProxyKind::Compute, None, material, node, flags)
    }

    /// Destroys a batch of proxies; unknown handles are ignored.
    pub fn destroy_render_proxies(&mut self, handles: &[ProxyHandle]) -> usize {
        self.proxies.destroy(self.backend.as_mut(), handles)
    }

    /// Swaps mesh and material of a live proxy and rebuilds its draw state.
    pub fn rebuild_render_proxy(
        &mut self,
        handle: ProxyHandle,
        mesh: Option<Arc<Mesh>>,
        material: MaterialRef,
    ) -> Result<bool> {
        self.proxies.rebuild(self.backend.as_mut(), handle, mesh, material)
    }

    #[must_use]
    pub fn resolve_proxy(&self, handle: ProxyHandle) -> Option<&RenderProxy> {
        self.proxies.resolve(handle)
    }

    /// Replaces a proxy's flags. Returns `false` for an unknown handle.
    pub fn set_proxy_flags(&mut self, handle: ProxyHandle, flags: ProxyFlags) -> bool {
        match self.proxies.get_mut(handle) {
            Some(proxy) => {
                proxy.flags = flags;
                true
            }
            None => false,
        }
    }

    /// Destroys every proxy owned by `node`. Call when the node is removed
    /// from the scene.
    pub fn on_node_destroyed(&mut self, node: NodeKey) -> usize {
        let handles = self.proxies.handles_owned_by(node);
        if !handles.is_empty() {
            log::debug!("Node {node:?} destroyed, releasing {} proxies", handles.len());
        }
        self.proxies.destroy(self.backend.as_mut(), &handles)
    }

    // ========================================================================
    // Framebuffers (on the active pipeline)
    // ========================================================================

    /// Declares offscreen framebuffer `id` on the active pipeline and
    /// allocates its target. A zero size follows the window size.
    pub fn create_framebuffer_offscreen(&mut self, id: u32, width: u32, height: u32, color_count: usize) -> Result<()> {
        self.create_framebuffer(Framebuffer::offscreen(id, width, height, color_count))
    }

    /// Declares a window-backed framebuffer `id` on the active pipeline. It
    /// shares the one swap-surface target with every other window framebuffer.
    pub fn create_framebuffer_window(&mut self, id: u32) -> Result<()> {
        self.create_framebuffer(Framebuffer::window(id))
    }

    fn create_framebuffer(&mut self, framebuffer: Framebuffer) -> Result<()> {
        let id = framebuffer.id();
        let Some(pipeline) = self.active_pipeline.and_then(|k| self.pipelines.get_mut(k)) else {
            return Err(RenderError::NoActivePipeline);
        };
        let table = pipeline.framebuffers_mut();
        table.insert(self.backend.as_mut(), framebuffer)?;
        if let Err(e) = table.realize(self.backend.as_mut(), &mut self.window_target, id) {
            table.remove(self.backend.as_mut(), id);
            return Err(e);
        }
        Ok(())
    }

    /// Removes framebuffer `id` from the active pipeline.
    pub fn release_framebuffer(&mut self, id: u32) -> bool {
        let Some(key) = self.active_pipeline else {
            return false;
        };
        match self.pipelines.get_mut(key) {
            Some(p) => p.framebuffers_mut().remove(self.backend.as_mut(), id),
            None => false,
        }
    }

    #[must_use]
    pub fn window_width(&self) -> u32 {
        self.backend.window_size().0
    }

    #[must_use]
    pub fn window_height(&self) -> u32 {
        self.backend.window_size().1
    }

    // ========================================================================
    // Pipelines
    // ========================================================================

    pub fn add_pipeline(&mut self, pipeline: RenderPipeline) -> PipelineKey {
        self.pipelines.insert(pipeline)
    }

    /// Loads a description (falling back to the default on errors) and adds
    /// it without activating it.
    pub fn load_pipeline(&mut self, text: &str) -> PipelineKey {
        self.add_pipeline(RenderPipeline::load(text))
    }

    /// Removes a pipeline and releases its targets. Removing the active
    /// pipeline leaves the renderer without one until another is activated.
    pub fn remove_pipeline(&mut self, key: PipelineKey) -> Option<RenderPipeline> {
        let mut pipeline = self.pipelines.remove(key)?;
        pipeline.release(self.backend.as_mut());
        if self.active_pipeline == Some(key) {
            log::warn!("Active pipeline '{}' removed", pipeline.name);
            self.active_pipeline = None;
        }
        Some(pipeline)
    }

    /// Makes `key` the active pipeline. Pending submissions of the previous
    /// one are dropped.
    pub fn set_active_pipeline(&mut self, key: PipelineKey) -> bool {
        if !self.pipelines.contains_key(key) {
            return false;
        }
        if let Some(prev) = self.active_pipeline
            && prev != key
            && let Some(p) = self.pipelines.get_mut(prev)
        {
            p.clear();
        }
        self.active_pipeline = Some(key);
        true
    }

    #[inline]
    #[must_use]
    pub fn active_pipeline_key(&self) -> Option<PipelineKey> {
        self.active_pipeline
    }

    #[must_use]
    pub fn active_pipeline(&self) -> Option<&RenderPipeline> {
        self.pipelines.get(self.active_pipeline?)
    }

    pub fn active_pipeline_mut(&mut self) -> Option<&mut RenderPipeline> {
        self.pipelines.get_mut(self.active_pipeline?)
    }

    #[must_use]
    pub fn pipeline(&self, key: PipelineKey) -> Option<&RenderPipeline> {
        self.pipelines.get(key)
    }

    /// Replaces the active pipeline's graph. See [`RenderPipeline::reload`].
    pub fn reload_active_pipeline(&mut self, text: &str) -> bool {
        let Some(pipeline) = self.active_pipeline.and_then(|k| self.pipelines.get_mut(k)) else {
            log::warn!("reload_active_pipeline: no active pipeline");
            return false;
        };
        pipeline.reload(self.backend.as_mut(), text)
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Routes a visible proxy into the active pipeline, using its material's
    /// stage and queue. Stale handles and unknown stages are dropped.
    pub fn submit(&mut self, handle: ProxyHandle) -> bool {
        let Some(proxy) = self.proxies.resolve(handle) else {
            return false;
        };
        let Some(pipeline) = self.active_pipeline.and_then(|k| self.pipelines.get_mut(k)) else {
            return false;
        };
        let material = proxy.material().read();
        pipeline.add_renderable(material.render_stage(), handle, material.render_queue())
    }

    /// Renders the active pipeline: begin frame, every stage, present.
    pub fn render_frame(&mut self, scene: &dyn SceneNodes) -> FrameStats {
        let Some(pipeline) = self.active_pipeline.and_then(|k| self.pipelines.get_mut(k)) else {
            log::warn!("render_frame: no active pipeline");
            return FrameStats::default();
        };

        let mut ctx = FrameContext {
            backend: self.backend.as_mut(),
            window: &mut self.window_target,
            proxies: &self.proxies,
            shaders: &mut self.shaders,
            scene,
            settings: &self.settings,
            stats: FrameStats::default(),
        };
        pipeline.render(&mut ctx);

        self.last_stats = ctx.stats;
        self.last_stats
    }

    #[inline]
    #[must_use]
    pub fn last_frame_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Draws one proxy immediately into framebuffer `framebuffer` of the
    /// active pipeline, outside of any queue.
    pub fn draw(&mut self, handle: ProxyHandle, framebuffer: u32, scene: &dyn SceneNodes) -> bool {
        let Some(pipeline) = self.active_pipeline.and_then(|k| self.pipelines.get_mut(k)) else {
            return false;
        };
        let table = pipeline.framebuffers_mut();
        let Some(target) = table.begin(self.backend.as_mut(), &mut self.window_target, framebuffer) else {
            return false;
        };

        let mut ctx = FrameContext {
            backend: self.backend.as_mut(),
            window: &mut self.window_target,
            proxies: &self.proxies,
            shaders: &mut self.shaders,
            scene,
            settings: &self.settings,
            stats: FrameStats::default(),
        };
        let drawn = ctx.draw_proxy(handle, target);
        table.end(self.backend.as_mut(), &self.window_target, framebuffer);
        drawn
    }

    /// Starts a frame on the backend; pair with [`present`](Self::present)
    /// when driving draws manually.
    pub fn begin_render(&mut self) {
        self.backend.begin_frame();
    }

    pub fn present(&mut self) {
        self.backend.present();
    }

    /// Resizes the surface and every window-sized framebuffer of every pipeline.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.backend.resize_surface(width, height);
        for (_, pipeline) in &mut self.pipelines {
            pipeline.on_resize(self.backend.as_mut(), width, height);
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.proxies.clear(self.backend.as_mut());
        for (_, pipeline) in &mut self.pipelines {
            pipeline.release(self.backend.as_mut());
        }
        self.window_target.release(self.backend.as_mut());
    }
}
