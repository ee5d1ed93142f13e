use glam::Mat4;

use super::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// What a graph node carries. Mesh and light nodes reference entries in the
/// scene's instance and light tables by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeContent {
    Group,
    Mesh(u32),
    Light(u32),
}

#[derive(Debug)]
struct Node {
    transform: Transform,
    content: NodeContent,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// Visitor callbacks invoked by the depth-first walk.
///
/// `update_model_matrix` fires for every mesh node before `visit_mesh` so a
/// consumer can record matrices even for meshes it later skips; lights get
/// their world transform through `update_light`.
pub trait GraphVisitor {
    fn update_model_matrix(&mut self, _mesh_id: u32, _model: &Mat4) {}
    fn update_light(&mut self, _light: u32, _world: &Mat4) {}
    fn visit_mesh(&mut self, mesh_id: u32, model: &Mat4);
}

/// Parented transform hierarchy, walked depth-first once per frame.
#[derive(Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(
        &mut self,
        parent: Option<NodeId>,
        transform: Transform,
        content: NodeContent,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            transform,
            content,
            children: Vec::new(),
            parent,
        });
        match parent {
            Some(parent) => self.nodes[parent.index()].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn set_transform(&mut self, node: NodeId, transform: Transform) {
        self.nodes[node.index()].transform = transform;
    }

    pub fn transform(&self, node: NodeId) -> Transform {
        self.nodes[node.index()].transform
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth-first traversal. Parent transforms apply before children; each
    /// node's world matrix is its parent's world matrix times its local TRS.
    pub fn walk(&self, visitor: &mut dyn GraphVisitor) {
        // (node, parent world matrix), pushed in reverse for in-order DFS.
        let mut stack: Vec<(NodeId, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|&root| (root, Mat4::IDENTITY))
            .collect();

        while let Some((id, parent_world)) = stack.pop() {
            let node = &self.nodes[id.index()];
            let world = parent_world * node.transform.matrix();

            match node.content {
                NodeContent::Group => {}
                NodeContent::Mesh(mesh_id) => {
                    visitor.update_model_matrix(mesh_id, &world);
                    visitor.visit_mesh(mesh_id, &world);
                }
                NodeContent::Light(light) => visitor.update_light(light, &world),
            }

            for &child in node.children.iter().rev() {
                stack.push((child, world));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    struct Collector {
        meshes: Vec<(u32, Vec3)>,
        lights: Vec<(u32, Vec3)>,
    }

    impl GraphVisitor for Collector {
        fn update_light(&mut self, light: u32, world: &Mat4) {
            self.lights.push((light, world.transform_point3(Vec3::ZERO)));
        }

        fn visit_mesh(&mut self, mesh_id: u32, model: &Mat4) {
            self.meshes
                .push((mesh_id, model.transform_point3(Vec3::ZERO)));
        }
    }

    #[test]
    fn parent_transform_applies_before_child() {
        let mut graph = SceneGraph::new();
        let parent = graph.add_node(
            None,
            Transform::from_translation(Vec3::new(5.0, 0.0, 0.0)),
            NodeContent::Group,
        );
        graph.add_node(
            Some(parent),
            Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)),
            NodeContent::Mesh(0),
        );

        let mut collector = Collector {
            meshes: Vec::new(),
            lights: Vec::new(),
        };
        graph.walk(&mut collector);

        assert_eq!(collector.meshes.len(), 1);
        let (_, position) = collector.meshes[0];
        assert!(position.abs_diff_eq(Vec3::new(5.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn walk_is_depth_first_in_insertion_order() {
        let mut graph = SceneGraph::new();
        let a = graph.add_node(None, Transform::IDENTITY, NodeContent::Group);
        graph.add_node(Some(a), Transform::IDENTITY, NodeContent::Mesh(0));
        graph.add_node(Some(a), Transform::IDENTITY, NodeContent::Mesh(1));
        let b = graph.add_node(None, Transform::IDENTITY, NodeContent::Group);
        graph.add_node(Some(b), Transform::IDENTITY, NodeContent::Mesh(2));

        let mut collector = Collector {
            meshes: Vec::new(),
            lights: Vec::new(),
        };
        graph.walk(&mut collector);

        let order: Vec<u32> = collector.meshes.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn lights_receive_world_transforms() {
        let mut graph = SceneGraph::new();
        let rig = graph.add_node(
            None,
            Transform::from_translation(Vec3::new(0.0, 10.0, 0.0)),
            NodeContent::Group,
        );
        graph.add_node(Some(rig), Transform::IDENTITY, NodeContent::Light(3));

        let mut collector = Collector {
            meshes: Vec::new(),
            lights: Vec::new(),
        };
        graph.walk(&mut collector);

        assert_eq!(collector.lights.len(), 1);
        let (light, position) = collector.lights[0];
        assert_eq!(light, 3);
        assert!(position.abs_diff_eq(Vec3::new(0.0, 10.0, 0.0), 1e-6));
    }
}
