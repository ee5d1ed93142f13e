use super::camera::Camera;
use super::events::{EventQueue, SceneEvent};
use super::graph::{GraphVisitor, SceneGraph};
use super::lights::{Light, LightConfig};
use super::mesh::MeshInstance;

/// Scene container: transform graph, camera/light lists and the mesh
/// instance table, plus the queued event stream the renderer drains.
///
/// Light slots are stable: removal leaves a hole so graph nodes and shadow
/// assignments keyed by light index stay valid.
#[derive(Default)]
pub struct Scene {
    graph: SceneGraph,
    cameras: Vec<Camera>,
    lights: Vec<Option<Light>>,
    meshes: Vec<MeshInstance>,
    events: EventQueue,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn walk(&self, visitor: &mut dyn GraphVisitor) {
        self.graph.walk(visitor);
    }

    // Cameras

    pub fn add_camera(&mut self, camera: Camera) -> u32 {
        let index = self.cameras.len() as u32;
        self.cameras.push(camera);
        index
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    pub fn camera(&self, index: usize) -> Option<&Camera> {
        self.cameras.get(index)
    }

    pub fn camera_mut(&mut self, index: usize) -> Option<&mut Camera> {
        self.cameras.get_mut(index)
    }

    pub fn set_show_frustum(&mut self, index: usize, show: bool) {
        if let Some(camera) = self.cameras.get_mut(index) {
            if camera.show_frustum != show {
                camera.show_frustum = show;
                self.events.push(SceneEvent::CameraFrustumToggled {
                    camera: index as u32,
                });
            }
        }
    }

    // Lights

    pub fn add_light(&mut self, light: Light) -> u32 {
        let index = self.lights.len() as u32;
        self.lights.push(Some(light));
        self.events.push(SceneEvent::LightAdded);
        index
    }

    pub fn remove_light(&mut self, index: u32) -> Option<Light> {
        let removed = self.lights.get_mut(index as usize)?.take();
        if removed.is_some() {
            self.events.push(SceneEvent::LightRemoved);
        }
        removed
    }

    pub fn light(&self, index: u32) -> Option<&Light> {
        self.lights.get(index as usize)?.as_ref()
    }

    pub fn light_mut(&mut self, index: u32) -> Option<&mut Light> {
        self.lights.get_mut(index as usize)?.as_mut()
    }

    /// Active lights with their stable indices.
    pub fn lights(&self) -> impl Iterator<Item = (u32, &Light)> {
        self.lights
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|light| (index as u32, light)))
    }

    pub fn light_count(&self) -> usize {
        self.lights.iter().filter(|slot| slot.is_some()).count()
    }

    /// Current per-kind light counts, the scene half of every program key.
    pub fn light_config(&self) -> LightConfig {
        LightConfig::of(self.lights().map(|(_, light)| light))
    }

    // Mesh instances

    pub fn add_mesh_instance(&mut self, mut instance: MeshInstance) -> u32 {
        let mesh_id = self.meshes.len() as u32;
        instance.mesh_id = mesh_id;
        self.meshes.push(instance);
        mesh_id
    }

    pub fn mesh_instance_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn mesh_instance(&self, mesh_id: u32) -> Option<&MeshInstance> {
        self.meshes.get(mesh_id as usize)
    }

    pub fn mesh_instance_mut(&mut self, mesh_id: u32) -> Option<&mut MeshInstance> {
        self.meshes.get_mut(mesh_id as usize)
    }

    /// Resolves the instancing parent for a mesh: the instance owning the
    /// vertex data, or the mesh itself when it has none.
    pub fn instancing_parent(&self, mesh_id: u32) -> Option<&MeshInstance> {
        let instance = self.mesh_instance(mesh_id)?;
        match instance.instancing_parent {
            Some(parent_id) => {
                let parent = self.mesh_instance(parent_id);
                if parent.is_none() {
                    log::warn!(
                        "mesh {} references missing instancing parent {}",
                        mesh_id,
                        parent_id
                    );
                }
                parent
            }
            None => Some(instance),
        }
    }

    // Events

    pub fn queue_event(&mut self, event: SceneEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::bounds::Aabb;
    use glam::Vec3;

    #[test]
    fn light_removal_keeps_indices_stable() {
        let mut scene = Scene::new();
        let a = scene.add_light(Light::ambient(Vec3::ONE));
        let b = scene.add_light(Light::point(Vec3::ZERO, 5.0, Vec3::ONE, 1.0));
        let c = scene.add_light(Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0));

        scene.remove_light(b);
        assert!(scene.light(a).is_some());
        assert!(scene.light(b).is_none());
        assert!(scene.light(c).is_some());
        assert_eq!(scene.light_count(), 2);
    }

    #[test]
    fn mutations_queue_events() {
        let mut scene = Scene::new();
        let light = scene.add_light(Light::ambient(Vec3::ONE));
        scene.remove_light(light);
        scene.remove_light(light); // second removal is a no-op

        let events = scene.drain_events();
        assert_eq!(events, vec![SceneEvent::LightAdded, SceneEvent::LightRemoved]);
        assert!(scene.drain_events().is_empty());
    }

    #[test]
    fn instancing_parent_falls_back_to_self() {
        let mut scene = Scene::new();
        let parent =
            scene.add_mesh_instance(MeshInstance::new(0, Aabb::unit_cube(), vec![0]));
        let copy = scene.add_mesh_instance(
            MeshInstance::new(0, Aabb::unit_cube(), vec![0]).with_instancing_parent(parent),
        );

        assert_eq!(scene.instancing_parent(parent).unwrap().mesh_id, parent);
        assert_eq!(scene.instancing_parent(copy).unwrap().mesh_id, parent);
    }
}
