#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! # Myth Pipeline
//!
//! Frame orchestration core: decides every frame which recorded proxies are
//! drawn, in what order, into which framebuffers, and with which uniform
//! bindings.
//!
//! - [`renderer::graph`]: declarative pipeline → stage → queue graph
//! - [`renderer::registry`]: handle-based proxy lifetime table
//! - [`renderer::resolve`]: node → material → shader-default uniform resolution
//! - [`resources`]: shaders, materials, meshes, uniform values
//! - [`scene`]: the node lookups the renderer needs, and a reference scene
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use myth_pipeline::prelude::*;
//!
//! let mut renderer = Renderer::new(Box::new(HeadlessBackend::default()), RendererSettings::default());
//! renderer.shaders_mut().register_json("unlit", UNLIT_JSON)?;
//!
//! let mut scene = Scene::new();
//! let node = scene.build_node("quad").with_position(0.0, 0.0, -5.0).build();
//! let material = Material::new("unlit").into_shared();
//! let proxy = renderer.create_render_proxy(Arc::new(Mesh::triangle()), material, node, false)?;
//!
//! renderer.submit(proxy);
//! let stats = renderer.render_frame(&scene);
//! ```

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod utils;

pub use errors::{RenderError, Result};
pub use renderer::{
    FrameStats, HeadlessBackend, PipelineKey, ProxyFlags, ProxyHandle, RenderBackend, RenderPipeline, Renderer,
    RendererSettings, SortOrder,
};
pub use resources::{Material, MaterialRef, Mesh, ShaderDefines, ShaderLibrary, ShaderTemplate, UniformValue};
pub use scene::{Camera, Node, NodeKey, Scene, SceneNodes};
pub use utils::interner;

pub mod prelude {
    pub use crate::renderer::{
        BackendEvent, FrameStats, HeadlessBackend, HeadlessRecorder, PipelineConfig, ProxyFlags, ProxyHandle,
        RenderBackend, RenderPipeline, Renderer, RendererSettings, SortOrder,
    };
    pub use crate::resources::{
        BindingState, Material, MaterialRef, Mesh, ShaderLibrary, ShaderTemplate, TextureId, TextureRef,
        UniformTemplate, UniformType, UniformValue,
    };
    pub use crate::scene::{Camera, Node, NodeKey, Scene, SceneNodes};
}
