//! Declarative render graph
//!
//! - [`PipelineConfig`]: the serde description (`pipeline → stages → queues`)
//! - [`RenderPipeline`]: ordered stages plus a framebuffer table
//! - [`RenderStage`]: one framebuffer, ordered queues
//! - [`RenderQueue`]: per-frame handle list with optional depth sort
//! - [`FrameContext`]: borrows of renderer state used while recording a frame

pub mod config;
pub mod context;
pub mod pipeline;
pub mod queue;
pub mod stage;

pub use config::{
    DEFAULT_PIPELINE, FramebufferConfig, FramebufferRef, PipelineConfig, QueueConfig, RENDER_QUEUE_CLASS, StageConfig,
};
pub use context::{FrameContext, FrameStats};
pub use pipeline::RenderPipeline;
pub use queue::{RenderQueue, SortOrder};
pub use stage::RenderStage;
