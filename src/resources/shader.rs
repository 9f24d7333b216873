//! Shader Descriptors
//!
//! A [`ShaderTemplate`] is the authored, un-specialized description of a
//! shader: its fixed render state and every uniform slot it may declare.
//! Compiling a template against a macro set ([`ShaderDefines`]) yields a
//! [`ShaderDescriptor`], the view the rest of the core works with:
//!
//! - slots guarded by a macro that is not enabled are dropped,
//! - texture slots receive texture units in declaration order,
//! - textual default values are parsed into [`UniformValue`]s.
//!
//! [`ShaderLibrary`] owns the templates and caches descriptors per
//! `(path, macro set)`.
//!
//! # Description format
//!
//! ```json
//! {
//!   "name": "lit",
//!   "render_state": { "cull": "Back", "blend": "Opaque" },
//!   "uniforms": [
//!     { "name": "u_WorldMatrix", "type": "SPT_MAT4", "stage": "vertex" },
//!     { "name": "u_Color", "type": "SPT_VEC4", "value": "1 1 1 1" },
//!     { "name": "u_NormalMap", "type": "SPT_TEXTURE", "macro": "USE_NORMAL_MAP" }
//!   ]
//! }
//! ```

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::errors::{RenderError, Result};
use crate::resources::shader_defines::ShaderDefines;
use crate::resources::uniforms::{ShaderStage, UniformType, UniformValue};
use crate::resources::version_tracker::ChangeTracker;

// ============================================================================
// Render State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CullMode {
    None,
    #[default]
    Back,
    Front,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Opaque,
    Alpha,
    Additive,
    Premultiplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompareFunc {
    Never,
    Less,
    #[default]
    LessEqual,
    Equal,
    Greater,
    GreaterEqual,
    NotEqual,
    Always,
}

/// Depth/stencil policy of a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthStencilState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: CompareFunc,
    pub stencil_test: bool,
    pub stencil_func: CompareFunc,
    pub stencil_ref: u32,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            depth_func: CompareFunc::LessEqual,
            stencil_test: false,
            stencil_func: CompareFunc::Always,
            stencil_ref: 0,
        }
    }
}

/// Fixed-function state baked into a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderState {
    pub cull: CullMode,
    pub blend: BlendMode,
    pub depth: DepthStencilState,
}

impl RenderState {
    #[inline]
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.blend != BlendMode::Opaque
    }
}

// ============================================================================
// Template (authored form)
// ============================================================================

fn default_count() -> u32 {
    1
}

/// One uniform slot as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformTemplate {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: UniformType,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub stage: ShaderStage,
    /// Textual default value (see [`UniformValue::parse`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Macro that must be enabled for this slot to exist.
    #[serde(default, rename = "macro", skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
}

impl UniformTemplate {
    #[must_use]
    pub fn new(name: &str, kind: UniformType) -> Self {
        Self {
            name: name.to_string(),
            kind,
            count: 1,
            stage: ShaderStage::default(),
            value: None,
            requires: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub fn with_stage(mut self, stage: ShaderStage) -> Self {
        self.stage = stage;
        self
    }

    #[must_use]
    pub fn requires_macro(mut self, name: &str) -> Self {
        self.requires = Some(name.to_string());
        self
    }
}

/// Authored shader description, before macro specialization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShaderTemplate {
    pub name: String,
    #[serde(default)]
    pub render_state: RenderState,
    #[serde(default)]
    pub uniforms: Vec<UniformTemplate>,
}

impl ShaderTemplate {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_render_state(mut self, render_state: RenderState) -> Self {
        self.render_state = render_state;
        self
    }

    #[must_use]
    pub fn with_uniform(mut self, uniform: UniformTemplate) -> Self {
        self.uniforms.push(uniform);
        self
    }

    /// Parses and validates a JSON shader description.
    pub fn from_json(text: &str) -> Result<Self> {
        let template: Self = serde_json::from_str(text)?;
        template.validate()?;
        Ok(template)
    }

    /// Checks for duplicate slot names and unparsable defaults.
    pub fn validate(&self) -> Result<()> {
        let mut seen = FxHashSet::default();
        for u in &self.uniforms {
            if !seen.insert(u.name.as_str()) {
                return Err(RenderError::InvalidUniformValue {
                    name: u.name.clone(),
                    reason: "declared more than once".to_string(),
                });
            }
            if u.count == 0 {
                return Err(RenderError::InvalidUniformValue {
                    name: u.name.clone(),
                    reason: "count must be at least 1".to_string(),
                });
            }
            if let Some(text) = &u.value
                && !u.kind.is_texture()
            {
                UniformValue::parse(&u.name, u.kind, u.count, text)?;
            }
        }
        Ok(())
    }

    /// Specializes the template for a macro set.
    pub fn specialize(&self, path: &str, defines: &ShaderDefines) -> Result<ShaderDescriptor> {
        let mut uniforms = Vec::with_capacity(self.uniforms.len());
        let mut next_texture_unit = 0u32;

        for u in &self.uniforms {
            if let Some(required) = &u.requires
                && !defines.contains(required)
            {
                continue;
            }

            let default = match (&u.value, u.kind.is_texture()) {
                (Some(text), false) => Some(UniformValue::parse(&u.name, u.kind, u.count, text)?),
                _ => None,
            };

            let texture_unit = if u.kind.is_texture() {
                let unit = next_texture_unit;
                next_texture_unit += 1;
                Some(unit)
            } else {
                None
            };

            uniforms.push(UniformDesc {
                name: u.name.clone(),
                kind: u.kind,
                count: u.count,
                stage: u.stage,
                default,
                texture_unit,
            });
        }

        Ok(ShaderDescriptor {
            path: path.to_string(),
            name: self.name.clone(),
            program_key: program_key(path, defines),
            render_state: self.render_state,
            uniforms,
            texture_count: next_texture_unit,
        })
    }
}

fn program_key(path: &str, defines: &ShaderDefines) -> u64 {
    use std::hash::BuildHasher;
    rustc_hash::FxBuildHasher.hash_one((path, defines.compute_hash()))
}

// ============================================================================
// Descriptor (compiled form)
// ============================================================================

/// A uniform slot declared by a compiled shader.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformDesc {
    pub name: String,
    pub kind: UniformType,
    pub count: u32,
    pub stage: ShaderStage,
    /// Compiled-in default; `None` for textures and slots without one.
    pub default: Option<UniformValue>,
    /// Assigned texture unit for texture slots.
    pub texture_unit: Option<u32>,
}

/// A shader specialized for one macro set.
#[derive(Debug, Clone)]
pub struct ShaderDescriptor {
    path: String,
    name: String,
    program_key: u64,
    render_state: RenderState,
    uniforms: Vec<UniformDesc>,
    texture_count: u32,
}

impl ShaderDescriptor {
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable key identifying this `(path, macro set)` program, for backend caches.
    #[inline]
    #[must_use]
    pub fn program_key(&self) -> u64 {
        self.program_key
    }

    #[inline]
    #[must_use]
    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    #[inline]
    #[must_use]
    pub fn uniforms(&self) -> &[UniformDesc] {
        &self.uniforms
    }

    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&UniformDesc> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    #[inline]
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.uniform(name).is_some()
    }

    #[inline]
    #[must_use]
    pub fn texture_count(&self) -> u32 {
        self.texture_count
    }
}

// ============================================================================
// Library
// ============================================================================

/// Registry of shader templates by path, with a compiled-descriptor cache.
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    templates: FxHashMap<String, Arc<ShaderTemplate>>,
    compiled: FxHashMap<(String, ShaderDefines), Arc<ShaderDescriptor>>,
    tracker: ChangeTracker,
}

impl ShaderLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the template at `path`.
    ///
    /// Replacing bumps [`version`](Self::version), which makes every bound
    /// material re-match its uniforms before its next draw.
    pub fn register(&mut self, path: &str, template: ShaderTemplate) {
        self.compiled.retain(|(p, _), _| p != path);
        if self
            .templates
            .insert(path.to_string(), Arc::new(template))
            .is_some()
        {
            log::debug!("Shader template '{path}' replaced");
        }
        self.tracker.changed();
    }

    /// Parses a JSON description and registers it.
    pub fn register_json(&mut self, path: &str, text: &str) -> Result<()> {
        let template = ShaderTemplate::from_json(text)?;
        self.register(path, template);
        Ok(())
    }

    /// Removes a template. Materials using it fall back to Unbound on their next rebind.
    pub fn remove(&mut self, path: &str) -> bool {
        self.compiled.retain(|(p, _), _| p != path);
        let removed = self.templates.remove(path).is_some();
        if removed {
            self.tracker.changed();
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.templates.contains_key(path)
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }

    /// Compiles (or fetches from cache) the descriptor for `path` + `defines`.
    pub fn compile(&mut self, path: &str, defines: &ShaderDefines) -> Result<Arc<ShaderDescriptor>> {
        let key = (path.to_string(), defines.clone());
        if let Some(desc) = self.compiled.get(&key) {
            return Ok(desc.clone());
        }

        let template = self
            .templates
            .get(path)
            .ok_or_else(|| RenderError::ShaderNotFound(path.to_string()))?;
        let desc = Arc::new(template.specialize(path, defines)?);
        log::debug!(
            "Compiled shader '{}' with {} macro(s): {} uniform slot(s)",
            path,
            defines.len(),
            desc.uniforms().len()
        );
        self.compiled.insert(key, desc.clone());
        Ok(desc)
    }

    /// Number of cached descriptors.
    #[must_use]
    pub fn compiled_count(&self) -> usize {
        self.compiled.len()
    }
}
