//! Core resource definitions
//!
//! Backend-independent data the frame core works with:
//! - [`ShaderTemplate`] / [`ShaderDescriptor`]: shader uniform slots and render state
//! - [`ShaderLibrary`]: template registry and per-macro-set compile cache
//! - [`Material`]: shader reference, macros and per-instance uniform values
//! - [`Mesh`]: topology, positions and bounds
//! - [`UniformValue`]: typed uniform bytes

pub mod material;
pub mod mesh;
pub mod shader;
pub mod shader_defines;
pub mod uniforms;
pub mod version_tracker;

pub use material::{BindingState, DEFAULT_RENDER_STAGE, Material, MaterialRef};
pub use mesh::{BoundingBox, Mesh, Topology};
pub use shader::{
    BlendMode, CompareFunc, CullMode, DepthStencilState, RenderState, ShaderDescriptor, ShaderLibrary,
    ShaderTemplate, UniformDesc, UniformTemplate,
};
pub use shader_defines::ShaderDefines;
pub use uniforms::{ShaderStage, TextureId, TextureRef, UniformType, UniformValue};
pub use version_tracker::ChangeTracker;
