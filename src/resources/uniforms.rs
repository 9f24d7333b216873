//! Uniform Value Types
//!
//! Shader parameters travel through the pipeline as tagged byte blobs:
//! [`UniformValue`] pairs a [`UniformType`] and element count with the raw
//! bytes a backend uploads. Typed constructors and accessors go through
//! `bytemuck`, so callers never build the byte layout by hand.
//!
//! Texture parameters are not values; they bind a [`TextureRef`].

use std::fmt;

use bytemuck::Pod;
use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::{RenderError, Result};

// ============================================================================
// Uniform Type
// ============================================================================

/// Declared type of a shader uniform slot.
///
/// The serialized names follow the shader description format
/// (`SPT_FLOAT`, `SPT_VEC4`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniformType {
    #[serde(rename = "SPT_INT")]
    Int,
    #[serde(rename = "SPT_FLOAT")]
    Float,
    #[serde(rename = "SPT_VEC2")]
    Vec2,
    #[serde(rename = "SPT_VEC3")]
    Vec3,
    #[serde(rename = "SPT_VEC4")]
    Vec4,
    #[serde(rename = "SPT_MAT4")]
    Mat4,
    #[serde(rename = "SPT_TEXTURE")]
    Texture,
}

impl UniformType {
    /// Size in bytes of one element of this type.
    #[inline]
    #[must_use]
    pub const fn element_size(self) -> usize {
        match self {
            Self::Int | Self::Float | Self::Texture => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 => 16,
            Self::Mat4 => 64,
        }
    }

    /// Number of scalar components in one element.
    #[inline]
    #[must_use]
    pub const fn components(self) -> usize {
        match self {
            Self::Int | Self::Float | Self::Texture => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
            Self::Mat4 => 16,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_texture(self) -> bool {
        matches!(self, Self::Texture)
    }
}

/// Shader stage that owns a uniform slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    Vertex,
    #[default]
    Fragment,
    Compute,
}

// ============================================================================
// Texture References
// ============================================================================

/// Opaque identifier of a texture owned by the backend or asset layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

impl From<u64> for TextureId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A texture binding: either an already-loaded texture or an asset path the
/// backend resolves lazily.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureRef {
    Id(TextureId),
    Path(String),
}

impl From<TextureId> for TextureRef {
    fn from(id: TextureId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for TextureRef {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for TextureRef {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

// ============================================================================
// Uniform Value
// ============================================================================

/// A typed uniform value stored as raw bytes.
///
/// Arrays are supported through `count`; the byte length is always
/// `kind.element_size() * count`.
#[derive(Clone, PartialEq)]
pub struct UniformValue {
    kind: UniformType,
    count: u32,
    bytes: SmallVec<[u8; 64]>,
}

impl UniformValue {
    fn from_pod<T: Pod>(kind: UniformType, data: &[T]) -> Self {
        Self {
            kind,
            count: data.len() as u32,
            bytes: SmallVec::from_slice(bytemuck::cast_slice(data)),
        }
    }

    #[must_use]
    pub fn int(v: i32) -> Self {
        Self::from_pod(UniformType::Int, &[v])
    }

    #[must_use]
    pub fn float(v: f32) -> Self {
        Self::from_pod(UniformType::Float, &[v])
    }

    #[must_use]
    pub fn vec2(v: Vec2) -> Self {
        Self::from_pod(UniformType::Vec2, &[v])
    }

    #[must_use]
    pub fn vec3(v: Vec3) -> Self {
        Self::from_pod(UniformType::Vec3, &[v])
    }

    #[must_use]
    pub fn vec4(v: Vec4) -> Self {
        Self::from_pod(UniformType::Vec4, &[v])
    }

    #[must_use]
    pub fn mat4(m: Mat4) -> Self {
        Self::from_pod(UniformType::Mat4, &[m])
    }

    #[must_use]
    pub fn float_array(values: &[f32]) -> Self {
        Self::from_pod(UniformType::Float, values)
    }

    #[must_use]
    pub fn vec4_array(values: &[Vec4]) -> Self {
        Self::from_pod(UniformType::Vec4, values)
    }

    /// Builds a value from raw bytes, validating the length against the type.
    pub fn from_bytes(name: &str, kind: UniformType, count: u32, bytes: &[u8]) -> Result<Self> {
        if kind.is_texture() {
            return Err(RenderError::InvalidUniformValue {
                name: name.to_string(),
                reason: "texture slots take a texture reference, not bytes".to_string(),
            });
        }
        let expected = kind.element_size() * count as usize;
        if bytes.len() != expected {
            return Err(RenderError::InvalidUniformValue {
                name: name.to_string(),
                reason: format!("expected {expected} bytes, got {}", bytes.len()),
            });
        }
        Ok(Self {
            kind,
            count,
            bytes: SmallVec::from_slice(bytes),
        })
    }

    /// Parses the textual default-value form used by shader descriptions.
    ///
    /// Components are separated by `;`, `,` or whitespace and listed element
    /// after element: a `SPT_VEC4` reads `"1;0;0;1"`, a `SPT_VEC3` with count 2
    /// reads `"1 0 0; 0 1 0"`. Matrices list 16 column-major components.
    pub fn parse(name: &str, kind: UniformType, count: u32, text: &str) -> Result<Self> {
        let invalid = |reason: String| RenderError::InvalidUniformValue {
            name: name.to_string(),
            reason,
        };

        if kind.is_texture() {
            return Err(invalid("texture slots have no value default".to_string()));
        }

        let parts: Vec<&str> = text
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|p| !p.is_empty())
            .collect();
        let expected = kind.components() * count as usize;
        if parts.len() != expected {
            return Err(invalid(format!(
                "{:?}x{count} needs {expected} component(s), found {}",
                kind,
                parts.len()
            )));
        }

        let mut bytes: SmallVec<[u8; 64]> = SmallVec::with_capacity(kind.element_size() * count as usize);
        for part in parts {
            if kind == UniformType::Int {
                let v: i32 = part
                    .parse()
                    .map_err(|_| invalid(format!("'{part}' is not an integer")))?;
                bytes.extend_from_slice(bytemuck::bytes_of(&v));
            } else {
                let v: f32 = part
                    .parse()
                    .map_err(|_| invalid(format!("'{part}' is not a number")))?;
                bytes.extend_from_slice(bytemuck::bytes_of(&v));
            }
        }

        Ok(Self { kind, count, bytes })
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> UniformType {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether this value can fill a slot of the given type and count.
    #[inline]
    #[must_use]
    pub fn matches(&self, kind: UniformType, count: u32) -> bool {
        self.kind == kind && self.count == count
    }

    fn first<T: Pod>(&self, kind: UniformType) -> Option<T> {
        if self.kind != kind || self.bytes.len() < std::mem::size_of::<T>() {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(&self.bytes[..std::mem::size_of::<T>()]))
    }

    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        self.first(UniformType::Int)
    }

    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        self.first(UniformType::Float)
    }

    #[must_use]
    pub fn as_vec2(&self) -> Option<Vec2> {
        self.first(UniformType::Vec2)
    }

    #[must_use]
    pub fn as_vec3(&self) -> Option<Vec3> {
        self.first(UniformType::Vec3)
    }

    #[must_use]
    pub fn as_vec4(&self) -> Option<Vec4> {
        self.first(UniformType::Vec4)
    }

    #[must_use]
    pub fn as_mat4(&self) -> Option<Mat4> {
        self.first(UniformType::Mat4)
    }
}

impl fmt::Debug for UniformValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniformValue")
            .field("kind", &self.kind)
            .field("count", &self.count)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::int(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        Self::mat4(m)
    }
}
