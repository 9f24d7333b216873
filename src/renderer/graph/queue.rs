//! Render Queue
//!
//! An ordered, per-frame collection of proxy handles. Handles are appended
//! during scene traversal, optionally depth-sorted, drawn, and cleared once
//! per frame.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::renderer::backend::TargetId;
use crate::renderer::graph::config::QueueConfig;
use crate::renderer::graph::context::FrameContext;
use crate::renderer::proxy::ProxyHandle;
use crate::renderer::registry::ProxyRegistry;
use crate::scene::SceneNodes;

/// Direction of a sorted queue along the camera axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Farthest first (blending correctness).
    #[default]
    BackToFront,
    /// Nearest first (early-z friendly).
    FrontToBack,
}

#[derive(Debug, Clone)]
pub struct RenderQueue {
    name: String,
    /// Class string as declared, kept for round-tripping.
    class: String,
    sort: bool,
    sort_order: Option<SortOrder>,
    items: Vec<ProxyHandle>,
}

impl RenderQueue {
    #[must_use]
    pub fn new(name: &str, sort: bool) -> Self {
        Self::from_config(&QueueConfig::new(name, sort))
    }

    #[must_use]
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            name: config.name.clone(),
            class: config.class.clone(),
            sort: config.sort,
            sort_order: config.sort_order,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn to_config(&self) -> QueueConfig {
        QueueConfig {
            class: self.class.clone(),
            name: self.name.clone(),
            sort: self.sort,
            sort_order: self.sort_order,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.sort
    }

    #[inline]
    #[must_use]
    pub fn sort_order(&self) -> Option<SortOrder> {
        self.sort_order
    }

    #[inline]
    pub fn add_renderable(&mut self, handle: ProxyHandle) {
        self.items.push(handle);
    }

    /// Handles in current draw order.
    #[inline]
    #[must_use]
    pub fn handles(&self) -> &[ProxyHandle] {
        &self.items
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Stable sort on camera-axis depth of each proxy's owning node.
    ///
    /// Depth is `dot(position - view_origin, view_direction)`. Handles whose
    /// proxy or node cannot be resolved go last; ties keep submission order.
    pub fn sort(&mut self, proxies: &ProxyRegistry, scene: &dyn SceneNodes, order: SortOrder) {
        let origin = scene.view_origin();
        let dir = scene.view_direction();

        let mut keyed: Vec<(Option<f32>, ProxyHandle)> = self
            .items
            .iter()
            .map(|&h| {
                let depth = proxies
                    .resolve(h)
                    .and_then(|p| scene.world_position(p.node()))
                    .map(|pos| (pos - origin).dot(dir));
                (depth, h)
            })
            .collect();

        keyed.sort_by(|(a, _), (b, _)| match (a, b) {
            (Some(a), Some(b)) => match order {
                SortOrder::BackToFront => b.total_cmp(a),
                SortOrder::FrontToBack => a.total_cmp(b),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        self.items.clear();
        self.items.extend(keyed.into_iter().map(|(_, h)| h));
    }

    /// Sorts (if configured), draws every handle into `target`, then clears.
    pub fn render(&mut self, ctx: &mut FrameContext<'_>, target: TargetId) {
        if self.sort {
            let order = self.sort_order.unwrap_or(ctx.settings.default_sort_order);
            self.sort(ctx.proxies, ctx.scene, order);
        }
        for &handle in &self.items {
            ctx.draw_proxy(handle, target);
        }
        self.items.clear();
    }
}
