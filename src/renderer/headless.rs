//! Headless Backend
//!
//! A [`RenderBackend`] that performs no GPU work and records every call as a
//! [`BackendEvent`]. Used by tests and by tooling that validates pipeline
//! descriptions offline.
//!
//! The event log lives behind a [`HeadlessRecorder`], a cheap cloneable
//! handle that stays usable after the backend is boxed into a
//! [`Renderer`](crate::renderer::Renderer):
//!
//! ```rust,ignore
//! let backend = HeadlessBackend::new(800, 600);
//! let recorder = backend.recorder();
//! let mut renderer = Renderer::new(Box::new(backend), RendererSettings::default());
//! // ...
//! assert_eq!(recorder.drawn(), vec![h1, h2]);
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::errors::{RenderError, Result};
use crate::renderer::backend::{DrawCommand, DrawStateId, RenderBackend, TargetId};
use crate::renderer::framebuffer::{ColorAttachment, DepthStencilAttachment};
use crate::renderer::proxy::{ProxyHandle, ProxyKind};
use crate::renderer::resolve::ResolvedUniform;
use crate::resources::material::Material;
use crate::resources::mesh::Mesh;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    CreateDrawState { id: DrawStateId, proxy: ProxyHandle, kind: ProxyKind },
    ReleaseDrawState(DrawStateId),
    CreateTarget { id: TargetId, window: bool, width: u32, height: u32 },
    ResizeTarget { id: TargetId, width: u32, height: u32 },
    ReleaseTarget(TargetId),
    ResizeSurface { width: u32, height: u32 },
    BeginTarget { id: TargetId, cleared_colors: usize, cleared_depth: bool },
    EndTarget(TargetId),
    Draw { proxy: ProxyHandle, target: TargetId, program_key: u64, uniforms: Vec<ResolvedUniform> },
    Dispatch { proxy: ProxyHandle, target: TargetId, program_key: u64, uniforms: Vec<ResolvedUniform> },
    BeginFrame,
    Present,
}

#[derive(Debug, Default)]
struct RecorderState {
    events: Vec<BackendEvent>,
    /// Remaining draw-state allocations before failure; `None` = unlimited.
    draw_state_budget: Option<usize>,
    fail_targets: bool,
    live_draw_states: usize,
    live_targets: usize,
}

/// Shared view of a [`HeadlessBackend`]'s event log and failure switches.
#[derive(Debug, Clone, Default)]
pub struct HeadlessRecorder {
    state: Arc<Mutex<RecorderState>>,
}

impl HeadlessRecorder {
    fn push(&self, event: BackendEvent) {
        self.state.lock().events.push(event);
    }

    #[must_use]
    pub fn events(&self) -> Vec<BackendEvent> {
        self.state.lock().events.clone()
    }

    /// Returns and clears the event log.
    pub fn take_events(&self) -> Vec<BackendEvent> {
        std::mem::take(&mut self.state.lock().events)
    }

    pub fn clear(&self) {
        self.state.lock().events.clear();
    }

    /// Proxies drawn, in submission order.
    #[must_use]
    pub fn drawn(&self) -> Vec<ProxyHandle> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                BackendEvent::Draw { proxy, .. } => Some(*proxy),
                _ => None,
            })
            .collect()
    }

    /// Proxies dispatched, in submission order.
    #[must_use]
    pub fn dispatched(&self) -> Vec<ProxyHandle> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                BackendEvent::Dispatch { proxy, .. } => Some(*proxy),
                _ => None,
            })
            .collect()
    }

    /// Resolved uniforms of the most recent draw of `proxy`.
    #[must_use]
    pub fn last_uniforms(&self, proxy: ProxyHandle) -> Option<Vec<ResolvedUniform>> {
        self.state.lock().events.iter().rev().find_map(|e| match e {
            BackendEvent::Draw { proxy: p, uniforms, .. } | BackendEvent::Dispatch { proxy: p, uniforms, .. }
                if *p == proxy =>
            {
                Some(uniforms.clone())
            }
            _ => None,
        })
    }

    #[must_use]
    pub fn count(&self, pred: impl Fn(&BackendEvent) -> bool) -> usize {
        self.state.lock().events.iter().filter(|e| pred(e)).count()
    }

    /// Draw states allocated and not yet released.
    #[must_use]
    pub fn live_draw_states(&self) -> usize {
        self.state.lock().live_draw_states
    }

    /// Targets created and not yet released.
    #[must_use]
    pub fn live_targets(&self) -> usize {
        self.state.lock().live_targets
    }

    /// Allows `n` more draw-state allocations, then fails every further one.
    pub fn set_draw_state_budget(&self, n: Option<usize>) {
        self.state.lock().draw_state_budget = n;
    }

    /// Makes every target creation fail.
    pub fn set_fail_targets(&self, fail: bool) {
        self.state.lock().fail_targets = fail;
    }
}

#[derive(Debug)]
pub struct HeadlessBackend {
    recorder: HeadlessRecorder,
    window_size: (u32, u32),
    next_id: u64,
    draw_states: FxHashMap<DrawStateId, ProxyHandle>,
    /// Live targets and whether each is the window target.
    targets: FxHashMap<TargetId, bool>,
}

impl HeadlessBackend {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            recorder: HeadlessRecorder::default(),
            window_size: (width, height),
            next_id: 1,
            draw_states: FxHashMap::default(),
            targets: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn recorder(&self) -> HeadlessRecorder {
        self.recorder.clone()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn create_target(&mut self, window: bool, width: u32, height: u32) -> Result<TargetId> {
        {
            let mut state = self.recorder.state.lock();
            if state.fail_targets {
                return Err(RenderError::BackendAllocation("headless target allocation disabled".to_string()));
            }
            state.live_targets += 1;
        }
        let id = TargetId(self.next_id());
        self.targets.insert(id, window);
        self.recorder.push(BackendEvent::CreateTarget { id, window, width, height });
        Ok(id)
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl RenderBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_draw_state(
        &mut self,
        proxy: ProxyHandle,
        kind: ProxyKind,
        _mesh: Option<&Mesh>,
        _material: &Material,
    ) -> Result<DrawStateId> {
        {
            let mut state = self.recorder.state.lock();
            if let Some(budget) = state.draw_state_budget.as_mut() {
                if *budget == 0 {
                    return Err(RenderError::BackendAllocation("headless draw-state budget exhausted".to_string()));
                }
                *budget -= 1;
            }
            state.live_draw_states += 1;
        }
        let id = DrawStateId(self.next_id());
        self.draw_states.insert(id, proxy);
        self.recorder.push(BackendEvent::CreateDrawState { id, proxy, kind });
        Ok(id)
    }

    fn release_draw_state(&mut self, id: DrawStateId) {
        if self.draw_states.remove(&id).is_some() {
            self.recorder.state.lock().live_draw_states -= 1;
            self.recorder.push(BackendEvent::ReleaseDrawState(id));
        } else {
            log::warn!("Headless: release of unknown draw state {id:?}");
        }
    }

    fn create_window_target(&mut self) -> Result<TargetId> {
        let (w, h) = self.window_size;
        self.create_target(true, w, h)
    }

    fn create_offscreen_target(&mut self, width: u32, height: u32, _color_count: usize) -> Result<TargetId> {
        self.create_target(false, width, height)
    }

    fn resize_target(&mut self, target: TargetId, width: u32, height: u32) {
        if self.targets.contains_key(&target) {
            self.recorder.push(BackendEvent::ResizeTarget { id: target, width, height });
        }
    }

    fn release_target(&mut self, target: TargetId) {
        if self.targets.remove(&target).is_some() {
            self.recorder.state.lock().live_targets -= 1;
            self.recorder.push(BackendEvent::ReleaseTarget(target));
        }
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
        self.recorder.push(BackendEvent::ResizeSurface { width, height });
    }

    fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    fn begin_target(
        &mut self,
        target: TargetId,
        colors: &[ColorAttachment],
        depth: Option<&DepthStencilAttachment>,
    ) -> bool {
        if !self.targets.contains_key(&target) {
            return false;
        }
        self.recorder.push(BackendEvent::BeginTarget {
            id: target,
            cleared_colors: colors.iter().filter(|c| c.clear).count(),
            cleared_depth: depth.is_some_and(|d| d.clear),
        });
        true
    }

    fn end_target(&mut self, target: TargetId) {
        self.recorder.push(BackendEvent::EndTarget(target));
    }

    fn draw(&mut self, cmd: &DrawCommand<'_>) {
        self.recorder.push(BackendEvent::Draw {
            proxy: cmd.proxy,
            target: cmd.target,
            program_key: cmd.program_key,
            uniforms: cmd.uniforms.to_vec(),
        });
    }

    fn dispatch(&mut self, cmd: &DrawCommand<'_>) {
        self.recorder.push(BackendEvent::Dispatch {
            proxy: cmd.proxy,
            target: cmd.target,
            program_key: cmd.program_key,
            uniforms: cmd.uniforms.to_vec(),
        });
    }

    fn begin_frame(&mut self) {
        self.recorder.push(BackendEvent::BeginFrame);
    }

    fn present(&mut self) {
        self.recorder.push(BackendEvent::Present);
    }
}
