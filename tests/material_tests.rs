//! Material Binding Tests
//!
//! Tests for:
//! - Unbound → Matching → Bound transitions and retry policy
//! - Re-matching after shader, macro and library changes
//! - Texture unit assignment
//! - Uniform precedence (node global → material → shader default)

use glam::{Vec3, Vec4};
use myth_pipeline::renderer::{ResolvedUniform, UniformSource, resolve_uniforms};
use myth_pipeline::resources::{
    BindingState, Material, ShaderLibrary, ShaderTemplate, TextureId, TextureRef, UniformTemplate, UniformType,
    UniformValue,
};
use myth_pipeline::scene::{NodeKey, Scene, global_names};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn unlit() -> ShaderTemplate {
    ShaderTemplate::new("unlit")
        .with_uniform(UniformTemplate::new(global_names::WORLD_MATRIX, UniformType::Mat4))
        .with_uniform(UniformTemplate::new("u_Color", UniformType::Vec4).with_default("1;1;1;1"))
        .with_uniform(UniformTemplate::new("u_Opacity", UniformType::Float).with_default("1"))
        .with_uniform(UniformTemplate::new("u_Tint", UniformType::Vec3))
        .with_uniform(UniformTemplate::new("u_Map", UniformType::Texture).requires_macro("USE_MAP"))
        .with_uniform(UniformTemplate::new("u_NormalMap", UniformType::Texture).requires_macro("USE_NORMAL_MAP"))
}

fn library() -> ShaderLibrary {
    let mut lib = ShaderLibrary::new();
    lib.register("unlit", unlit());
    lib
}

fn find<'a>(uniforms: &'a [ResolvedUniform], name: &str) -> &'a ResolvedUniform {
    uniforms
        .iter()
        .find(|u| u.name == name)
        .unwrap_or_else(|| panic!("uniform '{name}' not resolved"))
}

// ============================================================================
// Binding state machine
// ============================================================================

#[test]
fn new_material_is_unbound() {
    let material = Material::new("unlit");
    assert_eq!(material.state(), BindingState::Unbound);
    assert!(material.shader().is_none());
    assert_eq!(material.render_stage(), "Final");
    assert_eq!(material.render_queue(), None);
}

#[test]
fn prepare_binds_registered_shader() {
    let mut lib = library();
    let mut material = Material::new("unlit");

    assert!(material.prepare(&mut lib));
    assert_eq!(material.state(), BindingState::Bound);
    assert_eq!(material.shader().unwrap().name(), "unlit");

    // Already bound: nothing to do, same descriptor.
    let key = material.shader().unwrap().program_key();
    assert!(material.prepare(&mut lib));
    assert_eq!(material.shader().unwrap().program_key(), key);
}

#[test]
fn missing_shader_stays_unbound_until_library_changes() {
    init_logger();
    let mut lib = ShaderLibrary::new();
    let mut material = Material::new("unlit");

    assert!(!material.prepare(&mut lib));
    assert_eq!(material.state(), BindingState::Unbound);
    assert!(!material.prepare(&mut lib));
    assert_eq!(material.state(), BindingState::Unbound);

    lib.register("unlit", unlit());
    assert!(material.prepare(&mut lib));
    assert_eq!(material.state(), BindingState::Bound);
}

#[test]
fn macro_change_moves_bound_to_matching() {
    let mut lib = library();
    let mut material = Material::new("unlit");
    material.prepare(&mut lib);
    assert!(!material.shader().unwrap().declares("u_Map"));

    material.set_macro("USE_MAP", true);
    assert!(material.is_macro_used("USE_MAP"));
    assert_eq!(material.state(), BindingState::Matching);
    assert!(material.shader().is_none());

    assert!(material.prepare(&mut lib));
    assert_eq!(material.state(), BindingState::Bound);
    assert!(material.shader().unwrap().declares("u_Map"));

    // Same macro set again is not a change.
    material.set_macros(&["USE_MAP"]);
    assert_eq!(material.state(), BindingState::Bound);

    material.set_macro("USE_MAP", false);
    assert!(!material.is_macro_used("USE_MAP"));
    assert_eq!(material.state(), BindingState::Matching);
}

#[test]
fn shader_path_change_rebinds() {
    let mut lib = library();
    lib.register(
        "points",
        ShaderTemplate::new("points").with_uniform(UniformTemplate::new("u_PointSize", UniformType::Float)),
    );

    let mut material = Material::new("unlit");
    material.prepare(&mut lib);
    material.set_uniform_value("u_Opacity", 0.5_f32);

    material.set_shader_path("points");
    assert_eq!(material.state(), BindingState::Matching);
    assert!(material.prepare(&mut lib));
    assert_eq!(material.shader().unwrap().name(), "points");
    assert!(material.uniform_value("u_Opacity").is_none());
}

#[test]
fn removed_shader_unbinds() {
    init_logger();
    let mut lib = library();
    let mut material = Material::new("unlit");
    material.prepare(&mut lib);

    assert!(lib.remove("unlit"));
    assert!(!material.prepare(&mut lib));
    assert_eq!(material.state(), BindingState::Unbound);
    assert!(material.shader().is_none());
}

// ============================================================================
// Uniform matching
// ============================================================================

#[test]
fn rematch_drops_stale_and_mismatched_values() {
    init_logger();
    let mut lib = library();
    let mut material = Material::new("unlit");

    // Unbound: nothing to check against yet.
    assert!(material.set_uniform_value("u_Stale", 3.0_f32));
    assert!(material.set_uniform_value("u_Color", 0.5_f32));
    assert!(material.set_uniform_value("u_Opacity", 0.25_f32));

    material.prepare(&mut lib);
    assert!(material.uniform_value("u_Stale").is_none());
    assert!(material.uniform_value("u_Color").is_none());
    assert!(approx(material.uniform_value("u_Opacity").unwrap().as_f32().unwrap(), 0.25));
}

#[test]
fn bound_material_rejects_mismatched_type() {
    init_logger();
    let mut lib = library();
    let mut material = Material::new("unlit");
    material.prepare(&mut lib);

    assert!(material.set_uniform_value("u_Opacity", 0.75_f32));
    assert!(!material.set_uniform_value("u_Opacity", Vec4::ONE));
    assert!(approx(material.uniform_value("u_Opacity").unwrap().as_f32().unwrap(), 0.75));

    assert!(!material.set_uniform_value("u_Color", UniformValue::vec4_array(&[Vec4::ONE, Vec4::ZERO])));
    assert!(material.set_uniform_value("u_Color", Vec4::new(1.0, 0.0, 0.0, 1.0)));
}

#[test]
fn content_version_tracks_edits() {
    let mut material = Material::new("unlit");
    let v0 = material.content_version();

    material.set_uniform_value("u_Opacity", 0.5_f32);
    let v1 = material.content_version();
    assert!(v1 > v0);

    assert!(!material.clear_uniform_value("u_Missing"));
    assert_eq!(material.content_version(), v1);
    assert!(material.clear_uniform_value("u_Opacity"));
    assert!(material.content_version() > v1);
}

#[test]
fn library_replacement_rematches() {
    let mut lib = library();
    let mut material = Material::new("unlit");
    material.prepare(&mut lib);
    material.set_uniform_value("u_Opacity", 0.5_f32);

    lib.register(
        "unlit",
        ShaderTemplate::new("unlit").with_uniform(UniformTemplate::new("u_Color", UniformType::Vec4)),
    );
    assert!(material.prepare(&mut lib));
    assert!(material.uniform_value("u_Opacity").is_none());
    assert!(material.shader().unwrap().declares("u_Color"));
}

// ============================================================================
// Texture units
// ============================================================================

#[test]
fn texture_units_follow_declared_order() {
    let mut lib = library();
    let mut material = Material::new("unlit").with_macros(&["USE_NORMAL_MAP"]);
    material.set_uniform_texture("u_NormalMap", "normal.png");

    material.prepare(&mut lib);
    assert_eq!(material.texture(0), Some(&TextureRef::Path("normal.png".to_string())));
    assert_eq!(material.texture(1), None);

    // Enabling USE_MAP inserts u_Map ahead of u_NormalMap.
    material.set_macro("USE_MAP", true);
    material.prepare(&mut lib);
    material.set_uniform_texture("u_Map", TextureId(7));

    assert_eq!(material.texture(0), Some(&TextureRef::Id(TextureId(7))));
    assert_eq!(material.texture(1), Some(&TextureRef::Path("normal.png".to_string())));

    assert!(material.clear_uniform_texture("u_Map"));
    assert_eq!(material.texture(0), None);
}

#[test]
fn texture_for_disabled_slot_is_dropped() {
    let mut lib = library();
    let mut material = Material::new("unlit");
    material.set_uniform_texture("u_Map", "albedo.png");

    material.prepare(&mut lib);
    assert!(material.uniform_texture("u_Map").is_none());
    assert_eq!(material.texture(0), None);
}

// ============================================================================
// Uniform precedence
// ============================================================================

struct Fixture {
    scene: Scene,
    plain: NodeKey,
    overriding: NodeKey,
    mismatched: NodeKey,
}

fn fixture() -> Fixture {
    let mut scene = Scene::new();
    let plain = scene.build_node("plain").with_position(1.0, 2.0, 3.0).build();
    let overriding = scene
        .build_node("overriding")
        .with_uniform("u_Opacity", 0.25_f32)
        .with_texture("u_Map", "node.png")
        .build();
    let mismatched = scene.build_node("mismatched").with_uniform("u_Color", 0.5_f32).build();
    Fixture {
        scene,
        plain,
        overriding,
        mismatched,
    }
}

#[test]
fn value_precedence() {
    let f = fixture();
    let mut lib = library();
    let mut material = Material::new("unlit").with_macros(&["USE_MAP"]);
    material.prepare(&mut lib);
    material.set_uniform_value("u_Color", Vec4::new(1.0, 0.0, 0.0, 1.0));
    material.set_uniform_value("u_Opacity", 0.5_f32);
    let shader = material.shader().cloned().unwrap();

    let plain = resolve_uniforms(&shader, &material, &f.scene, f.plain);
    assert_eq!(find(&plain, "u_Color").source, UniformSource::Material);
    assert_eq!(find(&plain, "u_Opacity").source, UniformSource::Material);
    assert_eq!(find(&plain, "u_Tint").source, UniformSource::Unset);
    assert!(find(&plain, "u_Tint").value().is_none());

    let world = find(&plain, global_names::WORLD_MATRIX);
    assert_eq!(world.source, UniformSource::Node);
    let translation = world.value().unwrap().as_mat4().unwrap().w_axis.truncate();
    assert!(approx(translation.x, 1.0) && approx(translation.y, 2.0) && approx(translation.z, 3.0));

    let overriding = resolve_uniforms(&shader, &material, &f.scene, f.overriding);
    let opacity = find(&overriding, "u_Opacity");
    assert_eq!(opacity.source, UniformSource::Node);
    assert!(approx(opacity.value().unwrap().as_f32().unwrap(), 0.25));

    // A float is not a vec4: the node candidate is passed over.
    let mismatched = resolve_uniforms(&shader, &material, &f.scene, f.mismatched);
    let color = find(&mismatched, "u_Color");
    assert_eq!(color.source, UniformSource::Material);
    assert_eq!(color.value().unwrap().as_vec4(), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
}

#[test]
fn shader_default_is_last_resort() {
    let f = fixture();
    let mut lib = library();
    let mut material = Material::new("unlit");
    material.prepare(&mut lib);
    let shader = material.shader().cloned().unwrap();

    let resolved = resolve_uniforms(&shader, &material, &f.scene, f.plain);
    let color = find(&resolved, "u_Color");
    assert_eq!(color.source, UniformSource::ShaderDefault);
    assert_eq!(color.value().unwrap().as_vec4(), Some(Vec4::ONE));
    assert_eq!(find(&resolved, "u_Opacity").source, UniformSource::ShaderDefault);
}

#[test]
fn scene_globals_count_as_node_values() {
    let mut f = fixture();
    f.scene.set_global_uniform("u_Tint", Vec3::new(0.2, 0.4, 0.6));

    let mut lib = library();
    let mut material = Material::new("unlit");
    material.prepare(&mut lib);
    let shader = material.shader().cloned().unwrap();

    let resolved = resolve_uniforms(&shader, &material, &f.scene, f.plain);
    let tint = find(&resolved, "u_Tint");
    assert_eq!(tint.source, UniformSource::Node);
    assert_eq!(tint.value().unwrap().as_vec3(), Some(Vec3::new(0.2, 0.4, 0.6)));
}

#[test]
fn texture_precedence() {
    let f = fixture();
    let mut lib = library();
    let mut material = Material::new("unlit").with_macros(&["USE_MAP"]);
    material.prepare(&mut lib);
    let shader = material.shader().cloned().unwrap();

    let unset = resolve_uniforms(&shader, &material, &f.scene, f.plain);
    assert_eq!(find(&unset, "u_Map").source, UniformSource::Unset);
    assert!(find(&unset, "u_Map").texture().is_none());

    material.set_uniform_texture("u_Map", "material.png");
    let from_material = resolve_uniforms(&shader, &material, &f.scene, f.plain);
    assert_eq!(find(&from_material, "u_Map").source, UniformSource::Material);
    assert_eq!(
        find(&from_material, "u_Map").texture(),
        Some(&TextureRef::Path("material.png".to_string()))
    );

    let from_node = resolve_uniforms(&shader, &material, &f.scene, f.overriding);
    assert_eq!(find(&from_node, "u_Map").source, UniformSource::Node);
    assert_eq!(find(&from_node, "u_Map").texture(), Some(&TextureRef::Path("node.png".to_string())));
}

#[test]
fn stale_node_falls_back_to_material() {
    let mut f = fixture();
    f.scene.remove_node(f.overriding);

    let mut lib = library();
    let mut material = Material::new("unlit");
    material.prepare(&mut lib);
    material.set_uniform_value("u_Opacity", 0.5_f32);
    let shader = material.shader().cloned().unwrap();

    let resolved = resolve_uniforms(&shader, &material, &f.scene, f.overriding);
    assert_eq!(find(&resolved, "u_Opacity").source, UniformSource::Material);
    assert_eq!(find(&resolved, global_names::WORLD_MATRIX).source, UniformSource::Unset);
}
