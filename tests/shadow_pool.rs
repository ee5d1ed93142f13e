use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use glam::Vec3;

use scene_renderer::gpu::{Command, Device, HeadlessDevice, RenderTarget};
use scene_renderer::materials::{Material, MaterialRegistry};
use scene_renderer::renderer::{FrameParams, RenderMode};
use scene_renderer::scene::{
    Aabb, Camera, CustomDraw, DrawStage, Light, MeshInstance, MeshKind, NodeContent, Scene,
    ShadowAlgorithm, ShadowSettings, Transform,
};
use scene_renderer::{RenderSettings, SceneRenderer};

fn shadowed_fixture() -> (SceneRenderer, HeadlessDevice, Scene, MaterialRegistry) {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut scene = Scene::new();
    scene.add_camera(Camera {
        eye: Vec3::new(0.0, 4.0, 10.0),
        target: Vec3::ZERO,
        ..Camera::default()
    });

    let mut materials = MaterialRegistry::new();
    let steel = materials.add_material(Material::new("steel", Vec3::splat(0.7)));

    for x in [-2.0f32, 0.0, 2.0] {
        let mesh_id = scene.add_mesh_instance(
            MeshInstance::new(0, Aabb::unit_cube(), vec![steel]).with_counts(24, 36),
        );
        scene.graph_mut().add_node(
            None,
            Transform::from_translation(Vec3::new(x, 0.5, 0.0)),
            NodeContent::Mesh(mesh_id),
        );
    }

    scene.add_light(
        Light::directional(Vec3::new(-0.3, -1.0, -0.2).normalize(), Vec3::ONE, 1.0)
            .with_shadow(ShadowSettings::default()),
    );
    scene.add_light(
        Light::spot(
            Vec3::new(0.0, 6.0, 0.0),
            Vec3::NEG_Y,
            20.0,
            0.3,
            0.6,
            Vec3::ONE,
            2.0,
        )
        .with_shadow(ShadowSettings {
            algorithm: ShadowAlgorithm::Variance {
                min_variance: 1e-4,
                cutoff: 0.2,
            },
            resolution: 512,
        }),
    );
    scene.add_light(
        Light::point(Vec3::new(3.0, 3.0, 3.0), 15.0, Vec3::ONE, 1.0)
            .with_shadow(ShadowSettings::default()),
    );

    let mut renderer = SceneRenderer::new(RenderSettings::default());
    let mut device = HeadlessDevice::new();
    renderer.bake_gpu_assets(&mut device, &mut scene, &mut materials);
    (renderer, device, scene, materials)
}

#[test]
fn every_acquired_shadow_texture_returns_by_frame_end() {
    let (mut renderer, mut device, mut scene, mut materials) = shadowed_fixture();

    renderer.render_scene_graph(
        &mut device,
        &mut scene,
        &mut materials,
        &FrameParams::new(RenderMode::ForwardWithPrepass),
    );

    let pool = renderer.shadow_pool();
    // Directional depth + spot depth + spot moments + point depth.
    assert_eq!(pool.acquire_count(), 4);
    assert_eq!(pool.release_count(), 4);
    assert_eq!(pool.outstanding(), 0);
    assert_eq!(renderer.last_frame_stats().shadow_passes, 3);
}

#[test]
fn later_frames_reuse_pooled_textures() {
    let (mut renderer, mut device, mut scene, mut materials) = shadowed_fixture();
    let frame = FrameParams::new(RenderMode::ForwardWithPrepass);

    renderer.render_scene_graph(&mut device, &mut scene, &mut materials, &frame);
    let textures_after_first = device.live_textures();

    for _ in 0..3 {
        renderer.render_scene_graph(&mut device, &mut scene, &mut materials, &frame);
    }
    assert_eq!(
        device.live_textures(),
        textures_after_first,
        "steady-state frames must not create textures"
    );
    assert_eq!(renderer.shadow_pool().outstanding(), 0);
}

#[test]
fn all_shadow_targets_render_before_any_screen_draw() {
    let (mut renderer, mut device, mut scene, mut materials) = shadowed_fixture();
    device.take_commands();

    renderer.render_scene_graph(
        &mut device,
        &mut scene,
        &mut materials,
        &FrameParams::new(RenderMode::ForwardWithPrepass),
    );

    let commands = device.commands();
    let mut target_is_screen = false;
    let mut seen_screen_draw = false;
    for command in commands {
        match command {
            Command::SetRenderTarget(RenderTarget::Screen) => target_is_screen = true,
            Command::SetRenderTarget(RenderTarget::Textures { .. }) => {
                target_is_screen = false;
                assert!(
                    !seen_screen_draw,
                    "shadow pass recorded after shading began"
                );
            }
            Command::Draw(_) if target_is_screen => seen_screen_draw = true,
            _ => {}
        }
    }
    assert!(seen_screen_draw, "the frame drew to the screen");
}

fn faulting_callback(_device: &mut dyn Device, draw: &CustomDraw<'_>) {
    if draw.stage == DrawStage::Shaded {
        panic!("injected fault in custom mesh");
    }
}

#[test]
fn injected_fault_mid_shading_cannot_leak_shadow_textures() {
    let (mut renderer, mut device, mut scene, mut materials) = shadowed_fixture();

    let bomb = scene.add_mesh_instance(
        MeshInstance::new(0, Aabb::unit_cube(), vec![]).with_kind(MeshKind::Custom {
            callback: faulting_callback,
            user: Arc::new(()),
        }),
    );
    scene
        .graph_mut()
        .add_node(None, Transform::IDENTITY, NodeContent::Mesh(bomb));

    let result = catch_unwind(AssertUnwindSafe(|| {
        renderer.render_scene_graph(
            &mut device,
            &mut scene,
            &mut materials,
            &FrameParams::new(RenderMode::ForwardWithPrepass),
        );
    }));
    assert!(result.is_err(), "the injected fault must surface");

    let pool = renderer.shadow_pool();
    assert_eq!(
        pool.acquire_count(),
        pool.release_count(),
        "scope guard must balance the pool during unwinding"
    );
    assert_eq!(pool.outstanding(), 0);
}

#[test]
fn shadow_map_mode_renders_depth_only() {
    let (mut renderer, mut device, mut scene, mut materials) = shadowed_fixture();
    device.take_commands();

    renderer.render_scene_graph(
        &mut device,
        &mut scene,
        &mut materials,
        &FrameParams::new(RenderMode::ShadowMap),
    );

    let stats = renderer.last_frame_stats();
    assert_eq!(stats.shadow_passes, 3);
    assert!(stats.shadow_draw_calls > 0);
    assert_eq!(stats.shading_draw_calls, 0);
    assert_eq!(stats.prepass_draw_calls, 0);
    assert_eq!(renderer.shadow_pool().outstanding(), 0);
}
