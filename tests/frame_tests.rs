//! Frame Recording Tests
//!
//! Tests for:
//! - Submission routing and per-frame queue draining
//! - Depth sorting (both directions, stability, per-queue override)
//! - Shared window target and framebuffer ownership across pipelines
//! - Skip accounting (stale handles, flags, unbound materials, missing framebuffers)
//! - Compute dispatch, immediate draws, resize
//! - Uniforms as seen by the backend

use std::sync::Arc;

use glam::Vec4;
use myth_pipeline::errors::RenderError;
use myth_pipeline::renderer::{
    BackendEvent, HeadlessBackend, HeadlessRecorder, ProxyFlags, ProxyHandle, RenderQueue, Renderer, RendererSettings,
    SortOrder, UniformSource,
};
use myth_pipeline::resources::{Material, MaterialRef, Mesh, ShaderTemplate, UniformTemplate, UniformType};
use myth_pipeline::scene::{NodeKey, Scene, global_names};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn unlit() -> ShaderTemplate {
    ShaderTemplate::new("unlit")
        .with_uniform(UniformTemplate::new(global_names::WORLD_VIEW_PROJECTION_MATRIX, UniformType::Mat4))
        .with_uniform(UniformTemplate::new("u_Color", UniformType::Vec4).with_default("1;1;1;1"))
        .with_uniform(UniformTemplate::new("u_Opacity", UniformType::Float).with_default("1"))
}

fn setup_with(settings: RendererSettings) -> (Renderer, HeadlessRecorder, Scene) {
    init_logger();
    let backend = HeadlessBackend::new(800, 600);
    let recorder = backend.recorder();
    let mut renderer = Renderer::new(Box::new(backend), settings);
    renderer.shaders_mut().register("unlit", unlit());
    (renderer, recorder, Scene::new())
}

fn setup() -> (Renderer, HeadlessRecorder, Scene) {
    setup_with(RendererSettings::default())
}

fn proxy(renderer: &mut Renderer, material: &MaterialRef, node: NodeKey) -> ProxyHandle {
    renderer
        .create_render_proxy(Arc::new(Mesh::triangle()), material.clone(), node, false)
        .unwrap()
}

fn transparent() -> MaterialRef {
    Material::new("unlit").with_queue("Transparent").into_shared()
}

// ============================================================================
// Submission & draining
// ============================================================================

#[test]
fn submitted_proxies_are_drawn_once() {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("a").build();
    let material = Material::new("unlit").into_shared();
    let handles: Vec<_> = (0..3).map(|_| proxy(&mut renderer, &material, node)).collect();

    for &h in &handles {
        assert!(renderer.submit(h));
    }
    let stats = renderer.render_frame(&scene);
    assert_eq!(stats.draws, 3);
    assert_eq!(stats.skipped(), 0);
    // Unsorted queue keeps submission order.
    assert_eq!(recorder.drawn(), handles);

    recorder.clear();
    let stats = renderer.render_frame(&scene);
    assert_eq!(stats.draws, 0);
    assert!(recorder.drawn().is_empty());
    assert_eq!(renderer.last_frame_stats(), stats);
}

#[test]
fn frame_is_bracketed_by_begin_and_present() {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("a").build();
    let h = proxy(&mut renderer, &Material::new("unlit").into_shared(), node);
    renderer.submit(h);
    renderer.render_frame(&scene);

    let events = recorder.events();
    let kinds: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            BackendEvent::BeginFrame => Some("begin_frame"),
            BackendEvent::CreateTarget { window: true, .. } => Some("create_window"),
            BackendEvent::BeginTarget { .. } => Some("begin_target"),
            BackendEvent::Draw { .. } => Some("draw"),
            BackendEvent::EndTarget(_) => Some("end_target"),
            BackendEvent::Present => Some("present"),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["begin_frame", "create_window", "begin_target", "draw", "end_target", "present"]
    );

    // Window framebuffer clears one color attachment and depth.
    assert_eq!(
        recorder.count(|e| matches!(
            e,
            BackendEvent::BeginTarget {
                cleared_colors: 1,
                cleared_depth: true,
                ..
            }
        )),
        1
    );
}

#[test]
fn unknown_stage_is_not_submitted() {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("a").build();
    let material = Material::new("unlit").with_stage("Bloom").into_shared();
    let h = proxy(&mut renderer, &material, node);

    assert!(!renderer.submit(h));
    renderer.render_frame(&scene);
    assert!(recorder.drawn().is_empty());
}

// ============================================================================
// Depth sorting
// ============================================================================

/// Three proxies at depths 5, 1, 5 along the default camera's forward axis.
fn depth_scenario(settings: RendererSettings) -> (Vec<ProxyHandle>, Vec<ProxyHandle>) {
    let (mut renderer, recorder, mut scene) = setup_with(settings);
    let material = transparent();

    let far_a = scene.build_node("far_a").with_position(0.0, 0.0, -5.0).build();
    let near = scene.build_node("near").with_position(0.0, 0.0, -1.0).build();
    let far_b = scene.build_node("far_b").with_position(0.0, 0.0, -5.0).build();

    let p1 = proxy(&mut renderer, &material, far_a);
    let p2 = proxy(&mut renderer, &material, near);
    let p3 = proxy(&mut renderer, &material, far_b);
    for h in [p1, p2, p3] {
        renderer.submit(h);
    }
    renderer.render_frame(&scene);
    (vec![p1, p2, p3], recorder.drawn())
}

#[test]
fn back_to_front_is_default() {
    let (p, drawn) = depth_scenario(RendererSettings::default());
    assert_eq!(drawn, vec![p[0], p[2], p[1]]);
}

#[test]
fn front_to_back_keeps_ties_in_submission_order() {
    let settings = RendererSettings::default().with_sort_order(SortOrder::FrontToBack);
    let (p, drawn) = depth_scenario(settings);
    assert_eq!(drawn, vec![p[1], p[0], p[2]]);
}

#[test]
fn queue_sort_order_overrides_default() {
    let text = r#"{ "pipeline": { "stages": [ { "name": "Final", "queues": [
        { "class": "RenderQueue", "Name": "Transparent", "Sort": true, "SortOrder": "FrontToBack" } ] } ] } }"#;
    let settings = RendererSettings::default().with_pipeline(text);
    let (p, drawn) = depth_scenario(settings);
    assert_eq!(drawn, vec![p[1], p[0], p[2]]);
}

#[test]
fn unsorted_queue_ignores_depth() {
    let (mut renderer, recorder, mut scene) = setup();
    let material = Material::new("unlit").into_shared();
    let near = scene.build_node("near").with_position(0.0, 0.0, -1.0).build();
    let far = scene.build_node("far").with_position(0.0, 0.0, -9.0).build();

    let a = proxy(&mut renderer, &material, near);
    let b = proxy(&mut renderer, &material, far);
    renderer.submit(a);
    renderer.submit(b);
    renderer.render_frame(&scene);
    assert_eq!(recorder.drawn(), vec![a, b]);
}

#[test]
fn proxy_with_removed_node_sorts_last() {
    let (mut renderer, recorder, mut scene) = setup();
    let material = transparent();
    let orphan_node = scene.build_node("orphan").with_position(0.0, 0.0, -50.0).build();
    let near = scene.build_node("near").with_position(0.0, 0.0, -1.0).build();
    let far = scene.build_node("far").with_position(0.0, 0.0, -9.0).build();

    let orphan = proxy(&mut renderer, &material, orphan_node);
    let a = proxy(&mut renderer, &material, near);
    let b = proxy(&mut renderer, &material, far);
    scene.remove_node(orphan_node);

    for h in [orphan, a, b] {
        renderer.submit(h);
    }
    renderer.render_frame(&scene);
    assert_eq!(recorder.drawn(), vec![b, a, orphan]);
}

#[test]
fn resorting_equal_depths_is_stable() {
    let (mut renderer, _, mut scene) = setup();
    let material = transparent();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let node = scene.build_node(&format!("n{i}")).with_position(0.0, 0.0, -3.0).build();
            proxy(&mut renderer, &material, node)
        })
        .collect();

    let mut queue = RenderQueue::new("Transparent", true);
    for &h in &handles {
        queue.add_renderable(h);
    }
    for order in [SortOrder::BackToFront, SortOrder::FrontToBack, SortOrder::BackToFront] {
        queue.sort(renderer.proxies(), &scene, order);
        assert_eq!(queue.handles(), handles.as_slice());
    }
}

#[test]
fn destroyed_proxy_in_sorted_queue_sorts_last_and_is_skipped() {
    let (mut renderer, recorder, mut scene) = setup();
    let material = transparent();
    let far = scene.build_node("far").with_position(0.0, 0.0, -9.0).build();
    let near = scene.build_node("near").with_position(0.0, 0.0, -1.0).build();

    let doomed = proxy(&mut renderer, &material, far);
    let a = proxy(&mut renderer, &material, near);
    let b = proxy(&mut renderer, &material, far);
    for h in [doomed, a, b] {
        renderer.submit(h);
    }
    renderer.destroy_render_proxies(&[doomed]);

    let mut queue = RenderQueue::new("Transparent", true);
    for h in [doomed, a, b] {
        queue.add_renderable(h);
    }
    queue.sort(renderer.proxies(), &scene, SortOrder::BackToFront);
    assert_eq!(queue.handles(), &[b, a, doomed]);

    let stats = renderer.render_frame(&scene);
    assert_eq!(stats.skipped_unresolved, 1);
    assert_eq!(recorder.drawn(), vec![b, a]);
}

// ============================================================================
// Skips
// ============================================================================

#[test]
fn destroyed_after_submit_is_skipped() {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("a").build();
    let material = Material::new("unlit").into_shared();
    let doomed = proxy(&mut renderer, &material, node);
    let kept = proxy(&mut renderer, &material, node);

    renderer.submit(doomed);
    renderer.submit(kept);
    renderer.destroy_render_proxies(&[doomed]);

    let stats = renderer.render_frame(&scene);
    assert_eq!(stats.draws, 1);
    assert_eq!(stats.skipped_unresolved, 1);
    assert_eq!(recorder.drawn(), vec![kept]);
}

#[test]
fn stale_handle_is_not_submitted() {
    let (mut renderer, _, mut scene) = setup();
    let node = scene.build_node("a").build();
    let h = proxy(&mut renderer, &Material::new("unlit").into_shared(), node);
    renderer.destroy_render_proxies(&[h]);

    assert!(!renderer.submit(h));
}

#[test]
fn flags_gate_drawing() {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("a").build();
    let material = Material::new("unlit").into_shared();
    let disabled = proxy(&mut renderer, &material, node);
    let traced = proxy(&mut renderer, &material, node);
    renderer.set_proxy_flags(disabled, ProxyFlags::CAST_SHADOW);
    renderer.set_proxy_flags(traced, ProxyFlags::SUBMIT_ENABLED | ProxyFlags::RAYTRACED_ONLY);

    renderer.submit(disabled);
    renderer.submit(traced);
    let stats = renderer.render_frame(&scene);
    assert_eq!(stats.skipped_not_submittable, 2);
    assert!(recorder.drawn().is_empty());
}

#[test]
fn unbound_material_is_skipped() {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("a").build();
    let missing = Material::new("not_registered").into_shared();
    let h = proxy(&mut renderer, &missing, node);

    renderer.submit(h);
    let stats = renderer.render_frame(&scene);
    assert_eq!(stats.skipped_unbound, 1);
    assert!(recorder.drawn().is_empty());

    // Becomes drawable once the shader shows up.
    renderer.shaders_mut().register("not_registered", unlit());
    renderer.submit(h);
    assert_eq!(renderer.render_frame(&scene).draws, 1);
}

#[test]
fn stage_with_missing_framebuffer_is_skipped() -> anyhow::Result<()> {
    let text = r#"{ "pipeline": { "stages": [
        { "name": "Shadow", "framebuffer": { "id": 5 },
          "queues": [ { "class": "RenderQueue", "Name": "Casters", "Sort": false } ] },
        { "name": "Final",
          "queues": [ { "class": "RenderQueue", "Name": "Opaque", "Sort": false } ] } ] } }"#;
    let (mut renderer, recorder, mut scene) = setup_with(RendererSettings::default().with_pipeline(text));
    let node = scene.build_node("a").build();
    let caster = proxy(&mut renderer, &Material::new("unlit").with_stage("Shadow").into_shared(), node);
    let visible = proxy(&mut renderer, &Material::new("unlit").into_shared(), node);

    renderer.submit(caster);
    renderer.submit(visible);
    let stats = renderer.render_frame(&scene);
    assert_eq!(stats.stages_skipped, 1);
    assert_eq!(recorder.drawn(), vec![visible]);

    // The skipped stage dropped its queue: declaring the framebuffer alone
    // draws nothing until the proxy is submitted again.
    renderer.create_framebuffer_offscreen(5, 512, 512, 0)?;
    recorder.clear();
    let stats = renderer.render_frame(&scene);
    assert_eq!(stats.stages_skipped, 0);
    assert_eq!(stats.draws, 0);

    renderer.submit(caster);
    renderer.render_frame(&scene);
    assert_eq!(recorder.drawn(), vec![caster]);
    Ok(())
}

#[test]
fn failed_target_allocation_skips_stage() {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("a").build();
    let h = proxy(&mut renderer, &Material::new("unlit").into_shared(), node);

    recorder.set_fail_targets(true);
    renderer.submit(h);
    let stats = renderer.render_frame(&scene);
    assert_eq!(stats.stages_skipped, 1);
    assert!(recorder.drawn().is_empty());

    recorder.set_fail_targets(false);
    renderer.submit(h);
    assert_eq!(renderer.render_frame(&scene).draws, 1);
}

// ============================================================================
// Compute, immediate draws, pipelines
// ============================================================================

#[test]
fn compute_proxy_is_dispatched() -> anyhow::Result<()> {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("particles").build();
    let h = renderer.create_compute_proxy(Material::new("unlit").into_shared(), node)?;

    renderer.submit(h);
    let stats = renderer.render_frame(&scene);
    assert_eq!(stats.dispatches, 1);
    assert_eq!(stats.draws, 0);
    assert_eq!(recorder.dispatched(), vec![h]);
    Ok(())
}

#[test]
fn immediate_draw_bypasses_queues() {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("a").build();
    let h = proxy(&mut renderer, &Material::new("unlit").into_shared(), node);

    renderer.begin_render();
    assert!(renderer.draw(h, 0, &scene));
    assert!(!renderer.draw(h, 42, &scene));
    renderer.present();

    assert_eq!(recorder.drawn(), vec![h]);
    assert_eq!(recorder.count(|e| matches!(e, BackendEvent::Present)), 1);
}

#[test]
fn switching_pipelines_drops_pending_work() {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("a").build();
    let h = proxy(&mut renderer, &Material::new("unlit").into_shared(), node);
    let first = renderer.active_pipeline_key().unwrap();

    renderer.submit(h);
    let second = renderer.load_pipeline("{}");
    assert!(renderer.set_active_pipeline(second));
    assert!(renderer.set_active_pipeline(first));

    renderer.render_frame(&scene);
    assert!(recorder.drawn().is_empty());
}

#[test]
fn reload_active_pipeline_releases_targets() {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("a").build();
    let h = proxy(&mut renderer, &Material::new("unlit").into_shared(), node);
    renderer.submit(h);
    renderer.render_frame(&scene);
    renderer.create_framebuffer_offscreen(1, 64, 64, 1).unwrap();
    assert_eq!(recorder.live_targets(), 2);

    let text = r#"{ "pipeline": { "stages": [ { "name": "Overlay",
        "queues": [ { "class": "RenderQueue", "Name": "Ui", "Sort": false } ] } ] } }"#;
    assert!(renderer.reload_active_pipeline(text));
    // The shared window target outlives the reload.
    assert_eq!(recorder.live_targets(), 1);
    assert_eq!(renderer.active_pipeline().unwrap().stages()[0].name(), "Overlay");

    // Old stage name no longer routes.
    assert!(!renderer.submit(h));
}

#[test]
fn window_target_is_shared_across_pipelines() -> anyhow::Result<()> {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("a").build();
    let h = proxy(&mut renderer, &Material::new("unlit").into_shared(), node);
    let first = renderer.active_pipeline_key().unwrap();
    renderer.create_framebuffer_window(5)?;

    let second = renderer.load_pipeline("{}");
    for key in [second, first] {
        assert!(renderer.set_active_pipeline(key));
        renderer.submit(h);
        assert_eq!(renderer.render_frame(&scene).draws, 1);
    }
    assert!(renderer.draw(h, 5, &scene));

    assert_eq!(recorder.count(|e| matches!(e, BackendEvent::CreateTarget { window: true, .. })), 1);
    assert_eq!(recorder.live_targets(), 1);

    renderer.remove_pipeline(first);
    assert_eq!(recorder.live_targets(), 1);
    drop(renderer);
    assert_eq!(recorder.live_targets(), 0);
    Ok(())
}

#[test]
fn cloned_pipeline_outlives_its_original() {
    let text = r#"{ "pipeline": {
        "framebuffers": [ { "id": 1, "kind": "offscreen", "width": 128, "height": 128 } ],
        "stages": [ { "name": "Final", "framebuffer": { "id": 1 },
          "queues": [ { "class": "RenderQueue", "Name": "Opaque", "Sort": false } ] } ] } }"#;
    let (mut renderer, recorder, mut scene) = setup_with(RendererSettings::default().with_pipeline(text));
    let node = scene.build_node("a").build();
    let h = proxy(&mut renderer, &Material::new("unlit").into_shared(), node);
    renderer.submit(h);
    assert_eq!(renderer.render_frame(&scene).draws, 1);

    let original = renderer.active_pipeline_key().unwrap();
    let copy = renderer.active_pipeline().unwrap().clone();
    let copy = renderer.add_pipeline(copy);
    renderer.remove_pipeline(original);
    assert!(renderer.set_active_pipeline(copy));

    for _ in 0..2 {
        renderer.submit(h);
        let stats = renderer.render_frame(&scene);
        assert_eq!(stats.draws, 1);
        assert_eq!(stats.stages_skipped, 0);
    }
    assert_eq!(recorder.count(|e| matches!(e, BackendEvent::CreateTarget { window: false, .. })), 2);
}

#[test]
fn framebuffer_without_active_pipeline_is_a_config_error() {
    let (mut renderer, recorder, _) = setup();
    let key = renderer.active_pipeline_key().unwrap();
    renderer.remove_pipeline(key);

    assert!(matches!(
        renderer.create_framebuffer_offscreen(1, 64, 64, 1),
        Err(RenderError::NoActivePipeline)
    ));
    assert!(matches!(renderer.create_framebuffer_window(2), Err(RenderError::NoActivePipeline)));
    assert_eq!(recorder.live_targets(), 0);
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn resize_updates_window_sized_targets() -> anyhow::Result<()> {
    let (mut renderer, recorder, _) = setup();
    renderer.create_framebuffer_offscreen(1, 0, 0, 1)?;
    renderer.create_framebuffer_offscreen(2, 256, 256, 1)?;
    assert_eq!(renderer.window_width(), 800);
    assert_eq!(renderer.window_height(), 600);

    recorder.clear();
    renderer.on_resize(1024, 768);
    assert_eq!(renderer.window_width(), 1024);
    assert_eq!(renderer.window_height(), 768);

    let resized = recorder.count(|e| matches!(e, BackendEvent::ResizeTarget { width: 1024, height: 768, .. }));
    assert_eq!(resized, 1);
    assert_eq!(recorder.count(|e| matches!(e, BackendEvent::ResizeTarget { .. })), 1);
    Ok(())
}

#[test]
fn duplicate_framebuffer_is_rejected() -> anyhow::Result<()> {
    let (mut renderer, recorder, _) = setup();
    renderer.create_framebuffer_offscreen(3, 64, 64, 1)?;
    assert!(renderer.create_framebuffer_window(3).is_err());
    assert_eq!(recorder.live_targets(), 1);

    assert!(renderer.release_framebuffer(3));
    assert_eq!(recorder.live_targets(), 0);
    assert!(!renderer.release_framebuffer(3));
    Ok(())
}

// ============================================================================
// Uniforms at the backend
// ============================================================================

#[test]
fn backend_receives_resolved_uniforms() {
    let (mut renderer, recorder, mut scene) = setup();
    let node = scene.build_node("a").with_uniform("u_Opacity", 0.5_f32).build();
    let material = Material::new("unlit").into_shared();
    material.write().set_uniform_value("u_Color", Vec4::new(0.0, 1.0, 0.0, 1.0));
    let h = proxy(&mut renderer, &material, node);

    renderer.submit(h);
    renderer.render_frame(&scene);

    let uniforms = recorder.last_uniforms(h).unwrap();
    let source = |name: &str| uniforms.iter().find(|u| u.name == name).map(|u| u.source);
    assert_eq!(source(global_names::WORLD_VIEW_PROJECTION_MATRIX), Some(UniformSource::Node));
    assert_eq!(source("u_Color"), Some(UniformSource::Material));
    assert_eq!(source("u_Opacity"), Some(UniformSource::Node));

    let color = uniforms.iter().find(|u| u.name == "u_Color").unwrap();
    assert_eq!(color.value().unwrap().as_vec4(), Some(Vec4::new(0.0, 1.0, 0.0, 1.0)));
}
