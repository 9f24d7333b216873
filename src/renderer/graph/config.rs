//! Pipeline Description
//!
//! The declarative form of a [`RenderPipeline`](super::pipeline::RenderPipeline):
//! a JSON tree `pipeline → stages[] → queues[]` plus an optional framebuffer
//! table.
//!
//! ```json
//! {
//!   "pipeline": {
//!     "framebuffers": [
//!       { "id": 1, "kind": "offscreen", "width": 512, "height": 512,
//!         "colors": [ { "clear": true, "value": [0, 0, 0, 0] } ] }
//!     ],
//!     "stages": [
//!       { "name": "Shadow", "framebuffer": { "id": 1 },
//!         "queues": [ { "class": "RenderQueue", "Name": "Casters", "Sort": "1", "SortOrder": "FrontToBack" } ] },
//!       { "name": "Final",
//!         "queues": [ { "class": "RenderQueue", "Name": "Opaque", "Sort": false },
//!                     { "class": "RenderQueue", "Name": "Transparent", "Sort": true } ] }
//!     ]
//!   }
//! }
//! ```
//!
//! Boolean attributes accept `true`/`false`, `1`/`0` and their string forms,
//! and are always written back as JSON booleans. A stage without a
//! `framebuffer` targets the window framebuffer (id 0).

use std::fmt;

use rustc_hash::FxHashSet;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::errors::{RenderError, Result};
use crate::renderer::framebuffer::{ColorAttachment, DepthStencilAttachment, FramebufferKind, WINDOW_FRAMEBUFFER};
use crate::renderer::graph::queue::SortOrder;

/// The only queue class the core implements.
pub const RENDER_QUEUE_CLASS: &str = "RenderQueue";

/// Built-in description used when none is given or the given one is invalid.
pub const DEFAULT_PIPELINE: &str = r#"{
  "pipeline": {
    "stages": [
      {
        "name": "Final",
        "framebuffer": { "id": 0 },
        "queues": [
          { "class": "RenderQueue", "Name": "Opaque", "Sort": false },
          { "class": "RenderQueue", "Name": "Transparent", "Sort": true }
        ]
      }
    ]
  }
}"#;

// ============================================================================
// Flexible booleans
// ============================================================================

struct FlexibleBoolVisitor;

impl Visitor<'_> for FlexibleBoolVisitor {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean, 0/1, or one of \"true\", \"false\", \"1\", \"0\"")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<bool, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<bool, E> {
        match v {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<bool, E> {
        match v {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<bool, E> {
        match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
        }
    }
}

/// Accepts `true`, `1`, `"true"`, `"1"` (and the false forms) as a bool.
pub fn deserialize_flexible_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(FlexibleBoolVisitor)
}

// ============================================================================
// Description types
// ============================================================================

fn render_queue_class() -> String {
    RENDER_QUEUE_CLASS.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "render_queue_class")]
    pub class: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Sort", default, deserialize_with = "deserialize_flexible_bool")]
    pub sort: bool,
    /// `None` uses the renderer's default sort order.
    #[serde(rename = "SortOrder", default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

impl QueueConfig {
    #[must_use]
    pub fn new(name: &str, sort: bool) -> Self {
        Self {
            class: render_queue_class(),
            name: name.to_string(),
            sort,
            sort_order: None,
        }
    }

    #[must_use]
    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = Some(order);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FramebufferRef {
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    #[serde(default)]
    pub queues: Vec<QueueConfig>,
    #[serde(default)]
    pub framebuffer: FramebufferRef,
}

impl StageConfig {
    #[must_use]
    pub fn new(name: &str, framebuffer: u32) -> Self {
        Self {
            name: name.to_string(),
            queues: Vec::new(),
            framebuffer: FramebufferRef { id: framebuffer },
        }
    }

    #[must_use]
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queues.push(queue);
        self
    }
}

fn default_colors() -> Vec<ColorAttachment> {
    vec![ColorAttachment::default()]
}

fn default_depth() -> Option<DepthStencilAttachment> {
    Some(DepthStencilAttachment::default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramebufferConfig {
    pub id: u32,
    #[serde(default)]
    pub kind: FramebufferKind,
    /// Absent (with `height`) means window sized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default = "default_colors")]
    pub colors: Vec<ColorAttachment>,
    #[serde(default = "default_depth")]
    pub depth: Option<DepthStencilAttachment>,
}

/// Parsed pipeline description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub framebuffers: Vec<FramebufferConfig>,
    pub stages: Vec<StageConfig>,
}

#[derive(Deserialize)]
struct Document {
    pipeline: PipelineConfig,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    pipeline: &'a PipelineConfig,
}

impl Default for PipelineConfig {
    /// One stage "Final" on the window framebuffer with an unsorted "Opaque"
    /// and a sorted "Transparent" queue.
    fn default() -> Self {
        Self {
            framebuffers: Vec::new(),
            stages: vec![
                StageConfig::new("Final", WINDOW_FRAMEBUFFER)
                    .with_queue(QueueConfig::new("Opaque", false))
                    .with_queue(QueueConfig::new("Transparent", true)),
            ],
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a description.
    pub fn parse(text: &str) -> Result<Self> {
        let doc: Document = serde_json::from_str(text)?;
        doc.pipeline.validate()?;
        Ok(doc.pipeline)
    }

    /// Serializes to the description format (pretty-printed).
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&DocumentRef { pipeline: self })?)
    }

    /// Structural checks: at least one stage, unique stage names, unique
    /// framebuffer ids. Unknown queue classes and references to undeclared
    /// framebuffers are only warned about.
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(RenderError::EmptyPipeline);
        }

        let mut ids = FxHashSet::default();
        for fb in &self.framebuffers {
            if !ids.insert(fb.id) {
                return Err(RenderError::DuplicateFramebuffer(fb.id));
            }
        }
        ids.insert(WINDOW_FRAMEBUFFER);

        let mut names = FxHashSet::default();
        for stage in &self.stages {
            if !names.insert(stage.name.as_str()) {
                return Err(RenderError::DuplicateStage(stage.name.clone()));
            }
            if !ids.contains(&stage.framebuffer.id) {
                log::warn!(
                    "Stage '{}' targets undeclared framebuffer {}; it will be skipped until one is created",
                    stage.name,
                    stage.framebuffer.id
                );
            }
            if stage.queues.is_empty() {
                log::warn!("Stage '{}' has no queues; submissions to it are dropped", stage.name);
            }
            for queue in &stage.queues {
                if queue.class != RENDER_QUEUE_CLASS {
                    log::warn!(
                        "Queue '{}' in stage '{}' has unknown class '{}'; loading it as {}",
                        queue.name,
                        stage.name,
                        queue.class,
                        RENDER_QUEUE_CLASS
                    );
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageConfig> {
        self.stages.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_text_matches_default_config() {
        assert_eq!(PipelineConfig::parse(DEFAULT_PIPELINE).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_flexible_booleans() {
        let text = r#"{ "pipeline": { "stages": [ { "name": "S", "queues": [
            { "Name": "a", "Sort": "true" },
            { "Name": "b", "Sort": "1" },
            { "Name": "c", "Sort": 1 },
            { "Name": "d", "Sort": "0" },
            { "Name": "e" }
        ] } ] } }"#;
        let config = PipelineConfig::parse(text).unwrap();
        let sorts: Vec<bool> = config.stages[0].queues.iter().map(|q| q.sort).collect();
        assert_eq!(sorts, vec![true, true, true, false, false]);
        assert!(config.to_text().unwrap().contains("\"Sort\": true"));
    }

    #[test]
    fn test_rejects_bad_boolean() {
        let text = r#"{ "pipeline": { "stages": [ { "name": "S", "queues": [ { "Name": "a", "Sort": "maybe" } ] } ] } }"#;
        assert!(matches!(PipelineConfig::parse(text), Err(RenderError::Parse(_))));
    }

    #[test]
    fn test_validation_errors() {
        let dup = r#"{ "pipeline": { "stages": [ { "name": "A" }, { "name": "A" } ] } }"#;
        assert!(matches!(PipelineConfig::parse(dup), Err(RenderError::DuplicateStage(name)) if name == "A"));

        let empty = r#"{ "pipeline": { "stages": [] } }"#;
        assert!(matches!(PipelineConfig::parse(empty), Err(RenderError::EmptyPipeline)));

        let fbs = r#"{ "pipeline": { "framebuffers": [ { "id": 2 }, { "id": 2 } ], "stages": [ { "name": "A" } ] } }"#;
        assert!(matches!(PipelineConfig::parse(fbs), Err(RenderError::DuplicateFramebuffer(2))));
    }

    #[test]
    fn test_unknown_class_is_kept() {
        let text = r#"{ "pipeline": { "stages": [ { "name": "S", "queues": [ { "class": "FancyQueue", "Name": "q" } ] } ] } }"#;
        let config = PipelineConfig::parse(text).unwrap();
        assert_eq!(config.stages[0].queues[0].class, "FancyQueue");
    }
}
