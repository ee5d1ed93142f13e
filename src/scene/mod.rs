pub mod bounds;
pub mod camera;
pub mod curve;
pub mod events;
pub mod graph;
pub mod lights;
pub mod mesh;
pub mod scene;
pub mod transform;

pub use bounds::Aabb;
pub use camera::Camera;
pub use curve::CurveChannel;
pub use events::SceneEvent;
pub use graph::{GraphVisitor, NodeContent, NodeId, SceneGraph};
pub use lights::{
    Falloff, Light, LightConfig, LightKind, ShadowAlgorithm, ShadowSettings,
    MAX_DIRECTIONAL_LIGHTS, MAX_POINT_LIGHTS, MAX_SPOT_LIGHTS,
};
pub use mesh::{CustomDraw, CustomRenderFn, DrawStage, MaterialId, MeshInstance, MeshKind};
pub use scene::Scene;
pub use transform::Transform;
