//! Framebuffers
//!
//! A [`Framebuffer`] is the pipeline-side description of a render target:
//! color attachment clear policies, an optional depth/stencil attachment and
//! a size policy. Offscreen targets are created lazily on first `begin` and
//! released when the framebuffer (or its pipeline) goes away.
//!
//! Id `0` is the window framebuffer. Every [`FramebufferTable`] contains it.
//! All window framebuffers, across every pipeline, draw into the single
//! swap-surface target held by a [`WindowTarget`].

use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

use crate::errors::{RenderError, Result};
use crate::renderer::backend::{RenderBackend, TargetId};
use crate::renderer::graph::config::{FramebufferConfig, deserialize_flexible_bool};

/// Id of the window framebuffer.
pub const WINDOW_FRAMEBUFFER: u32 = 0;

fn yes() -> bool {
    true
}

fn one() -> f32 {
    1.0
}

/// Clear policy of one color attachment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorAttachment {
    #[serde(default = "yes", deserialize_with = "deserialize_flexible_bool")]
    pub clear: bool,
    #[serde(default)]
    pub value: [f32; 4],
}

impl Default for ColorAttachment {
    fn default() -> Self {
        Self {
            clear: true,
            value: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Clear policy of the depth/stencil attachment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthStencilAttachment {
    #[serde(default = "yes", deserialize_with = "deserialize_flexible_bool")]
    pub clear: bool,
    #[serde(default = "one")]
    pub value: f32,
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub clear_stencil: bool,
    #[serde(default)]
    pub stencil: u32,
}

impl Default for DepthStencilAttachment {
    fn default() -> Self {
        Self {
            clear: true,
            value: 1.0,
            clear_stencil: false,
            stencil: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramebufferKind {
    #[default]
    Window,
    Offscreen,
}

#[derive(Debug)]
pub struct Framebuffer {
    id: u32,
    kind: FramebufferKind,
    /// Fixed size; `None` follows the window size.
    size: Option<(u32, u32)>,
    pub colors: SmallVec<[ColorAttachment; 4]>,
    pub depth: Option<DepthStencilAttachment>,
    /// Owned offscreen target. Always `None` for window framebuffers.
    target: Option<TargetId>,
    /// Added implicitly rather than declared in the description.
    implicit: bool,
}

/// A clone describes the same attachments but owns no backend target.
impl Clone for Framebuffer {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind,
            size: self.size,
            colors: self.colors.clone(),
            depth: self.depth,
            target: None,
            implicit: self.implicit,
        }
    }
}

impl Framebuffer {
    #[must_use]
    pub fn window(id: u32) -> Self {
        Self {
            id,
            kind: FramebufferKind::Window,
            size: None,
            colors: smallvec![ColorAttachment::default()],
            depth: Some(DepthStencilAttachment::default()),
            target: None,
            implicit: false,
        }
    }

    /// Offscreen framebuffer with `color_count` attachments. A zero size
    /// follows the window size.
    #[must_use]
    pub fn offscreen(id: u32, width: u32, height: u32, color_count: usize) -> Self {
        Self {
            id,
            kind: FramebufferKind::Offscreen,
            size: (width > 0 && height > 0).then_some((width, height)),
            colors: smallvec![ColorAttachment::default(); color_count],
            depth: Some(DepthStencilAttachment::default()),
            target: None,
            implicit: false,
        }
    }

    #[must_use]
    pub fn from_config(config: &FramebufferConfig) -> Self {
        let size = match (config.width, config.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        };
        Self {
            id: config.id,
            kind: config.kind,
            size,
            colors: config.colors.iter().copied().collect(),
            depth: config.depth,
            target: None,
            implicit: false,
        }
    }

    #[must_use]
    pub fn to_config(&self) -> FramebufferConfig {
        FramebufferConfig {
            id: self.id,
            kind: self.kind,
            width: self.size.map(|(w, _)| w),
            height: self.size.map(|(_, h)| h),
            colors: self.colors.to_vec(),
            depth: self.depth,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> FramebufferKind {
        self.kind
    }

    /// `true` when the attachments track the window size.
    #[inline]
    #[must_use]
    pub fn is_window_sized(&self) -> bool {
        self.size.is_none()
    }

    #[must_use]
    pub fn size(&self, backend: &dyn RenderBackend) -> (u32, u32) {
        self.size.unwrap_or_else(|| backend.window_size())
    }

    /// The offscreen target, once realized. Window framebuffers report
    /// `None`; their target lives in the [`WindowTarget`].
    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    fn ensure_target(&mut self, backend: &mut dyn RenderBackend, window: &mut WindowTarget) -> Result<TargetId> {
        if self.kind == FramebufferKind::Window {
            return window.acquire(backend);
        }
        if let Some(target) = self.target {
            return Ok(target);
        }
        let (w, h) = self.size(backend);
        let target = backend.create_offscreen_target(w, h, self.colors.len())?;
        self.target = Some(target);
        Ok(target)
    }

    fn bound_target(&self, window: &WindowTarget) -> Option<TargetId> {
        match self.kind {
            FramebufferKind::Window => window.get(),
            FramebufferKind::Offscreen => self.target,
        }
    }

    /// Releases the owned offscreen target. Window framebuffers own nothing.
    fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(target) = self.target.take() {
            backend.release_target(target);
        }
    }
}

/// The swap-surface target shared by every window framebuffer.
///
/// Owned by the [`Renderer`](crate::renderer::Renderer): created on first
/// use and released when the renderer goes away or the backend refuses to
/// bind it.
#[derive(Debug, Default)]
pub struct WindowTarget {
    target: Option<TargetId>,
}

impl WindowTarget {
    /// Returns the window target, creating it on first call.
    pub fn acquire(&mut self, backend: &mut dyn RenderBackend) -> Result<TargetId> {
        if let Some(target) = self.target {
            return Ok(target);
        }
        let target = backend.create_window_target()?;
        self.target = Some(target);
        Ok(target)
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<TargetId> {
        self.target
    }

    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(target) = self.target.take() {
            backend.release_target(target);
        }
    }
}

/// Framebuffers of one pipeline, by id.
#[derive(Debug, Clone)]
pub struct FramebufferTable {
    framebuffers: Vec<Framebuffer>,
}

impl Default for FramebufferTable {
    fn default() -> Self {
        let mut window = Framebuffer::window(WINDOW_FRAMEBUFFER);
        window.implicit = true;
        Self {
            framebuffers: vec![window],
        }
    }
}

impl FramebufferTable {
    /// Builds the table from description entries, adding the window
    /// framebuffer if the description does not declare id 0.
    #[must_use]
    pub fn from_configs(configs: &[FramebufferConfig]) -> Self {
        let mut framebuffers: Vec<Framebuffer> = configs.iter().map(Framebuffer::from_config).collect();
        if !framebuffers.iter().any(|fb| fb.id == WINDOW_FRAMEBUFFER) {
            let mut window = Framebuffer::window(WINDOW_FRAMEBUFFER);
            window.implicit = true;
            framebuffers.insert(0, window);
        }
        Self { framebuffers }
    }

    /// Description entries for every explicitly declared framebuffer.
    #[must_use]
    pub fn to_configs(&self) -> Vec<FramebufferConfig> {
        self.framebuffers
            .iter()
            .filter(|fb| !fb.implicit)
            .map(Framebuffer::to_config)
            .collect()
    }

    /// Adds a framebuffer. Only the implied window entry may be replaced.
    pub fn insert(&mut self, backend: &mut dyn RenderBackend, framebuffer: Framebuffer) -> Result<()> {
        if let Some(existing) = self.framebuffers.iter_mut().find(|fb| fb.id == framebuffer.id) {
            if !existing.implicit {
                return Err(RenderError::DuplicateFramebuffer(framebuffer.id));
            }
            existing.release(backend);
            *existing = framebuffer;
            return Ok(());
        }
        self.framebuffers.push(framebuffer);
        Ok(())
    }

    /// Removes a framebuffer and releases its target. The window framebuffer
    /// cannot be removed.
    pub fn remove(&mut self, backend: &mut dyn RenderBackend, id: u32) -> bool {
        if id == WINDOW_FRAMEBUFFER {
            return false;
        }
        let Some(idx) = self.framebuffers.iter().position(|fb| fb.id == id) else {
            return false;
        };
        let mut fb = self.framebuffers.remove(idx);
        fb.release(backend);
        true
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Framebuffer> {
        self.framebuffers.iter().find(|fb| fb.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Framebuffer> {
        self.framebuffers.iter_mut().find(|fb| fb.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Framebuffer> {
        self.framebuffers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    /// Creates the backend target now instead of on first use.
    pub fn realize(&mut self, backend: &mut dyn RenderBackend, window: &mut WindowTarget, id: u32) -> Result<TargetId> {
        let fb = self.get_mut(id).ok_or(RenderError::UnknownFramebuffer(id))?;
        fb.ensure_target(backend, window)
    }

    /// Binds framebuffer `id` and applies its clear policy.
    ///
    /// Returns `None` when the id is unknown or the target cannot be created
    /// or bound; the caller skips its stage for this frame. A target the
    /// backend refuses to bind is dropped and re-created on the next call.
    pub fn begin(&mut self, backend: &mut dyn RenderBackend, window: &mut WindowTarget, id: u32) -> Option<TargetId> {
        let Some(fb) = self.get_mut(id) else {
            log::debug!("Framebuffer {id} is not declared");
            return None;
        };
        let target = match fb.ensure_target(backend, window) {
            Ok(target) => target,
            Err(e) => {
                log::error!("Framebuffer {id}: {e}");
                return None;
            }
        };
        if backend.begin_target(target, &fb.colors, fb.depth.as_ref()) {
            return Some(target);
        }
        log::warn!("Framebuffer {id}: target {target:?} could not be bound, dropping it");
        match fb.kind {
            FramebufferKind::Window => window.release(backend),
            FramebufferKind::Offscreen => fb.release(backend),
        }
        None
    }

    /// Returns `false` for an unknown or never-realized framebuffer.
    pub fn end(&mut self, backend: &mut dyn RenderBackend, window: &WindowTarget, id: u32) -> bool {
        match self.get(id).and_then(|fb| fb.bound_target(window)) {
            Some(target) => {
                backend.end_target(target);
                true
            }
            None => false,
        }
    }

    /// Resizes every realized window-sized offscreen target.
    pub fn on_resize(&mut self, backend: &mut dyn RenderBackend, width: u32, height: u32) {
        for fb in &mut self.framebuffers {
            if fb.kind == FramebufferKind::Offscreen
                && fb.is_window_sized()
                && let Some(target) = fb.target
            {
                backend.resize_target(target, width, height);
            }
        }
    }

    /// Releases every offscreen target; framebuffers are re-realized on next
    /// use. The shared window target is untouched.
    pub fn release_all(&mut self, backend: &mut dyn RenderBackend) {
        for fb in &mut self.framebuffers {
            fb.release(backend);
        }
    }
}
