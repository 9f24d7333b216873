//! Render Pipeline
//!
//! Ordered [`RenderStage`]s plus a [`FramebufferTable`], built from a
//! [`PipelineConfig`]. Loading never fails: malformed descriptions fall back
//! to the built-in default and the error is logged.

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::renderer::backend::RenderBackend;
use crate::renderer::framebuffer::FramebufferTable;
use crate::renderer::graph::config::PipelineConfig;
use crate::renderer::graph::context::FrameContext;
use crate::renderer::graph::stage::RenderStage;
use crate::renderer::proxy::ProxyHandle;

#[derive(Debug, Clone)]
pub struct RenderPipeline {
    pub name: String,
    stages: Vec<RenderStage>,
    stage_index: FxHashMap<String, usize>,
    framebuffers: FramebufferTable,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl RenderPipeline {
    /// Builds the graph from an already validated description.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        let stages: Vec<RenderStage> = config.stages.iter().map(RenderStage::from_config).collect();
        let stage_index = stages
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name().to_string(), i))
            .collect();
        Self {
            name: "Pipeline".to_string(),
            stages,
            stage_index,
            framebuffers: FramebufferTable::from_configs(&config.framebuffers),
        }
    }

    /// Parses `text`; on failure logs the error and returns the default pipeline.
    #[must_use]
    pub fn load(text: &str) -> Self {
        match PipelineConfig::parse(text) {
            Ok(config) => Self::from_config(&config),
            Err(e) => {
                log::error!("Invalid pipeline description, using default pipeline: {e}");
                Self::default()
            }
        }
    }

    /// Reads and loads a description file, falling back to the default
    /// pipeline on I/O or parse errors.
    #[must_use]
    pub fn load_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let mut pipeline = Self::load(&text);
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    pipeline.name = stem.to_string();
                }
                pipeline
            }
            Err(e) => {
                log::error!("Cannot read pipeline '{}', using default pipeline: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Replaces the whole graph with a new description, releasing the old
    /// offscreen targets. Pending submissions are discarded.
    ///
    /// Returns `false` if `text` was invalid and the default was loaded instead.
    pub fn reload(&mut self, backend: &mut dyn RenderBackend, text: &str) -> bool {
        self.framebuffers.release_all(backend);
        let (next, ok) = match PipelineConfig::parse(text) {
            Ok(config) => (Self::from_config(&config), true),
            Err(e) => {
                log::error!("Invalid pipeline description on reload, using default pipeline: {e}");
                (Self::default(), false)
            }
        };
        let name = std::mem::take(&mut self.name);
        *self = next;
        self.name = name;
        ok
    }

    /// Description of the live graph.
    #[must_use]
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            framebuffers: self.framebuffers.to_configs(),
            stages: self.stages.iter().map(RenderStage::to_config).collect(),
        }
    }

    /// Serializes the live graph to the description format.
    pub fn save(&self) -> Result<String> {
        self.to_config().to_text()
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.save()?)?;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn stages(&self) -> &[RenderStage] {
        &self.stages
    }

    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&RenderStage> {
        self.stage_index.get(name).map(|&i| &self.stages[i])
    }

    #[inline]
    #[must_use]
    pub fn framebuffers(&self) -> &FramebufferTable {
        &self.framebuffers
    }

    #[inline]
    pub fn framebuffers_mut(&mut self) -> &mut FramebufferTable {
        &mut self.framebuffers
    }

    /// Routes a handle to `stage`, into `queue` or the stage's default queue.
    /// Unknown stages drop the submission.
    pub fn add_renderable(&mut self, stage: &str, handle: ProxyHandle, queue: Option<&str>) -> bool {
        match self.stage_index.get(stage) {
            Some(&i) => self.stages[i].add_renderable(handle, queue),
            None => {
                log::debug!("Pipeline '{}' has no stage '{}', dropping submission", self.name, stage);
                false
            }
        }
    }

    /// Records one frame: begin frame, stages in declared order, present.
    pub fn render(&mut self, ctx: &mut FrameContext<'_>) {
        ctx.backend.begin_frame();
        for stage in &mut self.stages {
            stage.render(ctx, &mut self.framebuffers);
        }
        ctx.backend.present();
    }

    /// Drops all pending submissions without drawing.
    pub fn clear(&mut self) {
        for stage in &mut self.stages {
            stage.clear();
        }
    }

    pub fn on_resize(&mut self, backend: &mut dyn RenderBackend, width: u32, height: u32) {
        self.framebuffers.on_resize(backend, width, height);
    }

    /// Releases every backend target owned by this pipeline.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        self.framebuffers.release_all(backend);
    }
}
