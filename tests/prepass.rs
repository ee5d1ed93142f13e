use glam::{Mat4, Vec3};

use scene_renderer::gpu::{Command, DepthFunc, DepthState, HeadlessDevice};
use scene_renderer::materials::{Material, MaterialRegistry};
use scene_renderer::renderer::{FrameParams, RenderMode};
use scene_renderer::scene::{Aabb, Camera, MeshInstance, NodeContent, Scene, Transform};
use scene_renderer::{RenderSettings, SceneRenderer};

/// CPU rendition of the shared vertex transform both passes run.
fn pass_depth(view_proj: Mat4, model: Mat4, vertex: Vec3) -> f32 {
    let clip = view_proj * model * vertex.extend(1.0);
    clip.z / clip.w
}

#[test]
fn identical_transforms_survive_the_equal_depth_test() {
    let view = Mat4::look_at_rh(Vec3::new(4.0, 3.0, 8.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh_gl(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
    let view_proj = proj * view;

    let model = Mat4::from_translation(Vec3::new(0.5, 0.0, -2.0)) * Mat4::from_rotation_y(0.7);
    let vertices = [
        Vec3::new(-0.5, -0.5, 0.0),
        Vec3::new(0.5, -0.5, 0.3),
        Vec3::new(0.0, 0.6, -0.2),
    ];

    for vertex in vertices {
        let prepass = pass_depth(view_proj, model, vertex);
        let shading = pass_depth(view_proj, model, vertex);
        // EQUAL rejects anything that is not bit-identical; both passes run
        // the same transform, so the depth must match exactly.
        assert_eq!(prepass.to_bits(), shading.to_bits());
    }
}

#[test]
fn a_perturbed_model_matrix_fails_the_equal_depth_test_everywhere() {
    let view = Mat4::look_at_rh(Vec3::new(4.0, 3.0, 8.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh_gl(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
    let view_proj = proj * view;

    let model = Mat4::from_translation(Vec3::new(0.5, 0.0, -2.0));
    // Simulated bug: the matrix moved between pass 0 and pass 1.
    let perturbed = Mat4::from_translation(Vec3::new(0.5, 0.0, -2.01));
    let vertices = [
        Vec3::new(-0.5, -0.5, 0.0),
        Vec3::new(0.5, -0.5, 0.3),
        Vec3::new(0.0, 0.6, -0.2),
    ];

    let mut passing = 0;
    for vertex in vertices {
        let prepass = pass_depth(view_proj, model, vertex);
        let shading = pass_depth(view_proj, perturbed, vertex);
        if prepass.to_bits() == shading.to_bits() {
            passing += 1;
        }
    }
    assert_eq!(passing, 0, "a broken matrix must fail every fragment");
}

fn prepass_fixture() -> (SceneRenderer, HeadlessDevice, Scene, MaterialRegistry) {
    let mut scene = Scene::new();
    scene.add_camera(Camera {
        eye: Vec3::new(0.0, 2.0, 8.0),
        target: Vec3::ZERO,
        ..Camera::default()
    });
    let mut materials = MaterialRegistry::new();
    let steel = materials.add_material(Material::new("steel", Vec3::splat(0.7)));

    for x in [-1.5f32, 1.5] {
        let mesh_id = scene.add_mesh_instance(
            MeshInstance::new(0, Aabb::unit_cube(), vec![steel]).with_counts(24, 36),
        );
        scene.graph_mut().add_node(
            None,
            Transform::from_translation(Vec3::new(x, 0.0, 0.0)),
            NodeContent::Mesh(mesh_id),
        );
    }

    let settings = RenderSettings {
        shadow_maps: false,
        ..RenderSettings::default()
    };
    let mut renderer = SceneRenderer::new(settings);
    let mut device = HeadlessDevice::new();
    renderer.bake_gpu_assets(&mut device, &mut scene, &mut materials);
    (renderer, device, scene, materials)
}

#[test]
fn prepass_disables_color_and_shading_tests_for_equality() {
    let (mut renderer, mut device, mut scene, mut materials) = prepass_fixture();
    device.take_commands();

    renderer.render_scene_graph(
        &mut device,
        &mut scene,
        &mut materials,
        &FrameParams::new(RenderMode::ForwardWithPrepass),
    );

    // Partition draws by the depth/color state they ran under.
    let mut color_writes = true;
    let mut depth = DepthState::SINGLE_PASS;
    let mut prepass_draws = 0;
    let mut shading_draws = 0;
    for command in device.commands() {
        match command {
            Command::SetColorWrites(enabled) => color_writes = *enabled,
            Command::SetDepthState(state) => depth = *state,
            Command::Draw(_) => {
                if !color_writes && depth.write && depth.func == DepthFunc::Less {
                    prepass_draws += 1;
                } else if color_writes && !depth.write && depth.func == DepthFunc::Equal {
                    shading_draws += 1;
                } else {
                    panic!("draw under unexpected state: writes={color_writes} {depth:?}");
                }
            }
            _ => {}
        }
    }
    assert_eq!(prepass_draws, 2);
    assert_eq!(shading_draws, 2);

    let stats = renderer.last_frame_stats();
    assert_eq!(stats.prepass_draw_calls, 2);
    assert_eq!(stats.shading_draw_calls, 2);
}

#[test]
fn both_passes_upload_identical_object_transforms() {
    let (mut renderer, mut device, mut scene, mut materials) = prepass_fixture();
    device.take_commands();

    renderer.render_scene_graph(
        &mut device,
        &mut scene,
        &mut materials,
        &FrameParams::new(RenderMode::ForwardWithPrepass),
    );

    // Slot 1 carries the per-item model/normal matrices. The prepass and
    // shading pass iterate the same batches, so their upload sequences
    // must be byte-identical or the EQUAL depth test breaks.
    let object_uploads: Vec<&Vec<u8>> = device
        .uniform_payloads()
        .iter()
        .filter(|(slot, _)| *slot == 1)
        .map(|(_, bytes)| bytes)
        .collect();
    assert_eq!(object_uploads.len(), 4, "two meshes, two passes");
    assert_eq!(object_uploads[0], object_uploads[2]);
    assert_eq!(object_uploads[1], object_uploads[3]);
}

#[test]
fn single_pass_mode_keeps_depth_writes_on() {
    let (mut renderer, mut device, mut scene, mut materials) = prepass_fixture();
    device.take_commands();

    renderer.render_scene_graph(
        &mut device,
        &mut scene,
        &mut materials,
        &FrameParams::new(RenderMode::ForwardNoPrepass),
    );

    let mut depth = DepthState::SINGLE_PASS;
    for command in device.commands() {
        match command {
            Command::SetDepthState(state) => depth = *state,
            Command::Draw(_) => {
                assert!(depth.write);
                assert_eq!(depth.func, DepthFunc::Less);
            }
            _ => {}
        }
    }
    assert_eq!(renderer.last_frame_stats().prepass_draw_calls, 0);
}
