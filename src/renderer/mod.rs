pub mod batch;
pub mod entries;
pub mod frustum;
pub mod helpers;
pub mod passes;
pub mod renderer;
pub mod shadows;
pub mod uniforms;

pub use batch::{MaterialBatchEntry, MaterialBatcher};
pub use entries::{normal_matrix, BatchedKind, MeshMaterialItem, MeshRenderEntry};
pub use frustum::{in_front_of_camera, Frustum, FrustumQuery};
pub use helpers::HelperRenderers;
pub use passes::RenderMode;
pub use renderer::{
    CullMode, FrameParams, FrameStats, IndexedProperty, IndexedValue, SceneRenderer,
};
pub use shadows::{ShadowFrame, ShadowMapAssignment, ShadowTexturePool, TextureKey};
pub use uniforms::{CameraUniform, LightsUniform, ObjectUniform};
