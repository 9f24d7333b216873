//! Render Stage
//!
//! A named phase of the frame: one target framebuffer and an ordered list of
//! [`RenderQueue`]s. Queues run in declared order, which is the contract that
//! makes e.g. opaque-before-transparent blending correct.

use crate::renderer::framebuffer::FramebufferTable;
use crate::renderer::graph::config::StageConfig;
use crate::renderer::graph::context::FrameContext;
use crate::renderer::graph::queue::RenderQueue;
use crate::renderer::proxy::ProxyHandle;

#[derive(Debug, Clone)]
pub struct RenderStage {
    name: String,
    framebuffer: u32,
    queues: Vec<RenderQueue>,
}

impl RenderStage {
    #[must_use]
    pub fn new(name: &str, framebuffer: u32) -> Self {
        Self {
            name: name.to_string(),
            framebuffer,
            queues: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &StageConfig) -> Self {
        Self {
            name: config.name.clone(),
            framebuffer: config.framebuffer.id,
            queues: config.queues.iter().map(RenderQueue::from_config).collect(),
        }
    }

    #[must_use]
    pub fn to_config(&self) -> StageConfig {
        let mut config = StageConfig::new(&self.name, self.framebuffer);
        config.queues = self.queues.iter().map(RenderQueue::to_config).collect();
        config
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn framebuffer(&self) -> u32 {
        self.framebuffer
    }

    #[inline]
    #[must_use]
    pub fn queues(&self) -> &[RenderQueue] {
        &self.queues
    }

    #[must_use]
    pub fn queue(&self, name: &str) -> Option<&RenderQueue> {
        self.queues.iter().find(|q| q.name() == name)
    }

    /// Appends `handle` to the named queue, or to the first (default) queue
    /// when `queue` is `None` or names a queue this stage does not have.
    ///
    /// Returns `false` if the stage has no queues.
    pub fn add_renderable(&mut self, handle: ProxyHandle, queue: Option<&str>) -> bool {
        let idx = match queue {
            Some(name) => self.queues.iter().position(|q| q.name() == name).unwrap_or_else(|| {
                log::debug!(
                    "Stage '{}' has no queue '{}', using its default queue",
                    self.name,
                    name
                );
                0
            }),
            None => 0,
        };
        match self.queues.get_mut(idx) {
            Some(q) => {
                q.add_renderable(handle);
                true
            }
            None => {
                log::debug!("Stage '{}' has no queues, dropping submission", self.name);
                false
            }
        }
    }

    /// Binds the stage framebuffer and runs every queue.
    ///
    /// If the framebuffer cannot be begun the stage is skipped for this
    /// frame; its queues are still cleared. Returns whether the stage ran.
    pub fn render(&mut self, ctx: &mut FrameContext<'_>, framebuffers: &mut FramebufferTable) -> bool {
        let Some(target) = framebuffers.begin(&mut *ctx.backend, &mut *ctx.window, self.framebuffer) else {
            log::debug!(
                "Stage '{}' skipped: framebuffer {} could not be begun",
                self.name,
                self.framebuffer
            );
            ctx.stats.stages_skipped += 1;
            self.clear();
            return false;
        };

        for queue in &mut self.queues {
            queue.render(ctx, target);
        }

        framebuffers.end(&mut *ctx.backend, &*ctx.window, self.framebuffer);
        true
    }

    pub fn clear(&mut self) {
        for queue in &mut self.queues {
            queue.clear();
        }
    }
}
