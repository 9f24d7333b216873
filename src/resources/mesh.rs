//! Mesh data handed to the backend.
//!
//! The core only needs a mesh's primitive count (to decide whether a proxy
//! is drawable), its topology and its local bounds. Vertex layout and upload
//! are the backend's business.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Primitive topology of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
    LineStrip,
    PointList,
}

impl Topology {
    /// Number of primitives formed by `element_count` vertices or indices.
    #[must_use]
    pub fn primitive_count(self, element_count: u32) -> u32 {
        match self {
            Self::TriangleList => element_count / 3,
            Self::TriangleStrip => element_count.saturating_sub(2),
            Self::LineList => element_count / 2,
            Self::LineStrip => element_count.saturating_sub(1),
            Self::PointList => element_count,
        }
    }
}

/// Axis-aligned bounding box in mesh-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[must_use]
    pub fn from_points(points: &[Vec3]) -> Self {
        points.iter().fold(Self::EMPTY, |bb, &p| Self {
            min: bb.min.min(p),
            max: bb.max.max(p),
        })
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// CPU-side mesh description.
#[derive(Debug, Clone)]
pub struct Mesh {
    id: u64,
    pub name: String,
    pub topology: Topology,
    pub positions: Vec<Vec3>,
    pub indices: Option<Vec<u32>>,
    pub bounds: BoundingBox,
}

impl Mesh {
    #[must_use]
    pub fn new(name: &str, topology: Topology, positions: Vec<Vec3>, indices: Option<Vec<u32>>) -> Self {
        let bounds = BoundingBox::from_points(&positions);
        Self {
            id: NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            topology,
            positions,
            indices,
            bounds,
        }
    }

    /// A single triangle, handy for tooling and tests.
    #[must_use]
    pub fn triangle() -> Self {
        Self::new(
            "Triangle",
            Topology::TriangleList,
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            None,
        )
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Vertex or index count that the draw consumes.
    #[must_use]
    pub fn element_count(&self) -> u32 {
        match &self.indices {
            Some(indices) => indices.len() as u32,
            None => self.positions.len() as u32,
        }
    }

    #[must_use]
    pub fn primitive_count(&self) -> u32 {
        self.topology.primitive_count(self.element_count())
    }

    /// Whether the mesh has at least one triangle or line to rasterize.
    /// Point lists never qualify.
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.topology != Topology::PointList && self.primitive_count() > 0
    }
}
