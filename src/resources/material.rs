//! Materials
//!
//! A [`Material`] names a shader by path, enables a set of feature macros and
//! carries per-instance uniform values and textures keyed by uniform name.
//!
//! # Binding state
//!
//! ```text
//!            set_shader_path / set_macros
//!   Bound ───────────────────────────────▶ Matching
//!     ▲                                       │
//!     └──────────── prepare() succeeds ───────┤
//!                                             │ prepare() fails
//!   Unbound ◀─────────────────────────────────┘
//! ```
//!
//! Mutations never re-match eagerly: they bump a [`ChangeTracker`] that the
//! draw path polls through [`Material::prepare`] once per draw. A material
//! whose shader cannot be compiled stays `Unbound` and is retried only after
//! the material or the [`ShaderLibrary`] changes again.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::resources::shader::{ShaderDescriptor, ShaderLibrary};
use crate::resources::shader_defines::ShaderDefines;
use crate::resources::uniforms::{TextureRef, UniformValue};
use crate::resources::version_tracker::ChangeTracker;

/// Stage a material targets when none is set.
pub const DEFAULT_RENDER_STAGE: &str = "Final";

/// Shared, lockable material reference held by proxies.
pub type MaterialRef = Arc<RwLock<Material>>;

/// Shader-binding state of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingState {
    /// No shader program built (never prepared, or the shader is missing/invalid).
    Unbound,
    /// Shader or macros changed; uniforms must be re-matched before drawing.
    Matching,
    /// Ready to draw.
    Bound,
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,

    shader_path: String,
    defines: ShaderDefines,
    render_stage: String,
    render_queue: Option<String>,

    values: FxHashMap<String, UniformValue>,
    textures: FxHashMap<String, TextureRef>,
    texture_units: SmallVec<[Option<TextureRef>; 8]>,

    shader: Option<Arc<ShaderDescriptor>>,
    state: BindingState,
    program: ChangeTracker,
    content: ChangeTracker,
    /// `(program version, library version)` at the last successful match.
    bound_versions: (u64, u64),
    /// `(program version, library version)` of the last compile attempt.
    last_attempt: Option<(u64, u64)>,
}

impl Material {
    #[must_use]
    pub fn new(shader_path: &str) -> Self {
        Self {
            name: "Material".to_string(),
            shader_path: shader_path.to_string(),
            defines: ShaderDefines::new(),
            render_stage: DEFAULT_RENDER_STAGE.to_string(),
            render_queue: None,
            values: FxHashMap::default(),
            textures: FxHashMap::default(),
            texture_units: SmallVec::new(),
            shader: None,
            state: BindingState::Unbound,
            program: ChangeTracker::new(),
            content: ChangeTracker::new(),
            bound_versions: (0, 0),
            last_attempt: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    #[must_use]
    pub fn with_stage(mut self, stage: &str) -> Self {
        self.render_stage = stage.to_string();
        self
    }

    #[must_use]
    pub fn with_queue(mut self, queue: &str) -> Self {
        self.render_queue = Some(queue.to_string());
        self
    }

    #[must_use]
    pub fn with_macros<S: AsRef<str>>(mut self, macros: &[S]) -> Self {
        self.set_macros(macros);
        self
    }

    /// Wraps the material for sharing between proxies.
    #[must_use]
    pub fn into_shared(self) -> MaterialRef {
        Arc::new(RwLock::new(self))
    }

    // === Shader & macros ===

    #[inline]
    #[must_use]
    pub fn shader_path(&self) -> &str {
        &self.shader_path
    }

    pub fn set_shader_path(&mut self, path: &str) {
        if self.shader_path != path {
            self.shader_path = path.to_string();
            self.invalidate_program();
        }
    }

    #[inline]
    #[must_use]
    pub fn defines(&self) -> &ShaderDefines {
        &self.defines
    }

    /// Replaces the macro set (authoring form, see [`ShaderDefines::enable`]).
    pub fn set_macros<S: AsRef<str>>(&mut self, macros: &[S]) {
        let defines = ShaderDefines::from_macros(macros);
        if defines != self.defines {
            self.defines = defines;
            self.invalidate_program();
        }
    }

    /// Enables or disables a single macro.
    pub fn set_macro(&mut self, macro_str: &str, enabled: bool) {
        let changed = if enabled {
            let before = self.defines.clone();
            self.defines.enable(macro_str);
            before != self.defines
        } else {
            let name = macro_str.split_whitespace().next().unwrap_or_default();
            self.defines.remove(name)
        };
        if changed {
            self.invalidate_program();
        }
    }

    #[must_use]
    pub fn is_macro_used(&self, name: &str) -> bool {
        self.defines.contains(name)
    }

    fn invalidate_program(&mut self) {
        self.program.changed();
        if self.state == BindingState::Bound {
            self.state = BindingState::Matching;
        }
    }

    // === Routing ===

    /// Name of the pipeline stage this material submits to.
    #[inline]
    #[must_use]
    pub fn render_stage(&self) -> &str {
        &self.render_stage
    }

    pub fn set_render_stage(&mut self, stage: &str) {
        self.render_stage = stage.to_string();
    }

    /// Queue within the stage, or `None` for the stage's default queue.
    #[inline]
    #[must_use]
    pub fn render_queue(&self) -> Option<&str> {
        self.render_queue.as_deref()
    }

    pub fn set_render_queue(&mut self, queue: Option<&str>) {
        self.render_queue = queue.map(str::to_string);
    }

    // === Uniform values ===

    /// Sets a local uniform value.
    ///
    /// Returns `false` (and keeps the old value) if the bound shader declares
    /// `name` with a different type or element count.
    pub fn set_uniform_value(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        let value = value.into();
        if self.state == BindingState::Bound
            && let Some(slot) = self.shader.as_ref().and_then(|s| s.uniform(name))
            && !value.matches(slot.kind, slot.count)
        {
            log::warn!(
                "Material '{}': value for '{}' is {:?}x{}, shader declares {:?}x{}",
                self.name,
                name,
                value.kind(),
                value.count(),
                slot.kind,
                slot.count
            );
            return false;
        }
        self.values.insert(name.to_string(), value);
        self.content.changed();
        true
    }

    #[must_use]
    pub fn uniform_value(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn clear_uniform_value(&mut self, name: &str) -> bool {
        let removed = self.values.remove(name).is_some();
        if removed {
            self.content.changed();
        }
        removed
    }

    /// Binds a texture (loaded id or asset path) to a texture uniform.
    pub fn set_uniform_texture(&mut self, name: &str, texture: impl Into<TextureRef>) {
        let texture = texture.into();
        if let Some(unit) = self.bound_texture_unit(name) {
            self.texture_units[unit] = Some(texture.clone());
        }
        self.textures.insert(name.to_string(), texture);
        self.content.changed();
    }

    pub fn clear_uniform_texture(&mut self, name: &str) -> bool {
        if let Some(unit) = self.bound_texture_unit(name) {
            self.texture_units[unit] = None;
        }
        let removed = self.textures.remove(name).is_some();
        if removed {
            self.content.changed();
        }
        removed
    }

    #[must_use]
    pub fn uniform_texture(&self, name: &str) -> Option<&TextureRef> {
        self.textures.get(name)
    }

    /// Texture bound to a texture unit of the matched shader.
    #[must_use]
    pub fn texture(&self, unit: u32) -> Option<&TextureRef> {
        self.texture_units.get(unit as usize).and_then(Option::as_ref)
    }

    fn bound_texture_unit(&self, name: &str) -> Option<usize> {
        if self.state != BindingState::Bound {
            return None;
        }
        self.shader
            .as_ref()?
            .uniform(name)?
            .texture_unit
            .map(|u| u as usize)
    }

    // === Binding ===

    #[inline]
    #[must_use]
    pub fn state(&self) -> BindingState {
        self.state
    }

    /// The matched shader, present only while `Bound`.
    #[must_use]
    pub fn shader(&self) -> Option<&Arc<ShaderDescriptor>> {
        if self.state == BindingState::Bound {
            self.shader.as_ref()
        } else {
            None
        }
    }

    /// Version of the material's uniform/texture content.
    #[inline]
    #[must_use]
    pub fn content_version(&self) -> u64 {
        self.content.version()
    }

    /// Brings the binding up to date. Returns whether the material can draw.
    pub fn prepare(&mut self, library: &mut ShaderLibrary) -> bool {
        let versions = (self.program.version(), library.version());

        match self.state {
            BindingState::Bound if self.bound_versions == versions => return true,
            BindingState::Unbound if self.last_attempt == Some(versions) => return false,
            _ => {}
        }

        self.last_attempt = Some(versions);
        self.state = BindingState::Matching;

        match library.compile(&self.shader_path, &self.defines) {
            Ok(shader) => {
                self.match_uniforms(&shader);
                self.shader = Some(shader);
                self.state = BindingState::Bound;
                self.bound_versions = versions;
                true
            }
            Err(e) => {
                log::warn!("Material '{}' is unbound: {}", self.name, e);
                self.shader = None;
                self.texture_units.clear();
                self.state = BindingState::Unbound;
                false
            }
        }
    }

    /// Re-matches local values against the shader's declared slots.
    ///
    /// Entries the shader does not declare (or declares with another type)
    /// are dropped; declared slots without a local value fall back to the
    /// shader default at resolve time.
    fn match_uniforms(&mut self, shader: &ShaderDescriptor) {
        let name = &self.name;
        self.values.retain(|key, value| {
            let keep = shader
                .uniform(key)
                .is_some_and(|slot| !slot.kind.is_texture() && value.matches(slot.kind, slot.count));
            if !keep {
                log::debug!("Material '{name}': dropping stale uniform '{key}'");
            }
            keep
        });
        self.textures.retain(|key, _| {
            let keep = shader.uniform(key).is_some_and(|slot| slot.kind.is_texture());
            if !keep {
                log::debug!("Material '{name}': dropping stale texture '{key}'");
            }
            keep
        });

        self.texture_units.clear();
        self.texture_units.resize(shader.texture_count() as usize, None);
        for (key, texture) in &self.textures {
            if let Some(unit) = shader.uniform(key).and_then(|slot| slot.texture_unit) {
                self.texture_units[unit as usize] = Some(texture.clone());
            }
        }

        self.content.changed();
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new("")
    }
}
