//! Renderer Settings
//!
//! Plain configuration consumed by [`Renderer::new`](crate::renderer::Renderer::new).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_pipeline::renderer::{RendererSettings, SortOrder};
//!
//! // Defaults: built-in "Final" pipeline, back-to-front sorting
//! let settings = RendererSettings::default();
//!
//! // Depth-prepass style ordering and a custom startup pipeline
//! let settings = RendererSettings {
//!     default_sort_order: SortOrder::FrontToBack,
//!     default_pipeline: Some(std::fs::read_to_string("pipelines/forward.json")?),
//!     ..Default::default()
//! };
//! ```

use crate::renderer::graph::queue::SortOrder;

/// Global renderer configuration.
///
/// | Field                 | Default       | Effect                                                        |
/// |-----------------------|---------------|---------------------------------------------------------------|
/// | `default_sort_order`  | `BackToFront` | Direction for sorted queues that do not set `SortOrder`       |
/// | `default_pipeline`    | `None`        | Description text for the startup pipeline (`None` = built-in) |
/// | `log_skipped_draws`   | `false`       | `log::debug!` every draw skipped for a dead or unbound proxy  |
/// | `window_size`         | `1280 x 720`  | Initial surface size reported by the headless backend         |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererSettings {
    pub default_sort_order: SortOrder,
    pub default_pipeline: Option<String>,
    pub log_skipped_draws: bool,
    pub window_size: (u32, u32),
}

impl Default for RendererSettings {
    #[inline]
    fn default() -> Self {
        Self {
            default_sort_order: SortOrder::BackToFront,
            default_pipeline: None,
            log_skipped_draws: false,
            window_size: (1280, 720),
        }
    }
}

impl RendererSettings {
    #[must_use]
    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.default_sort_order = order;
        self
    }

    #[must_use]
    pub fn with_pipeline(mut self, text: &str) -> Self {
        self.default_pipeline = Some(text.to_string());
        self
    }
}
