//! Forward scene renderer.
//!
//! Walks a scene graph once per frame, culls against the camera frustum,
//! groups mesh instances by resolved shader program, and drives a two-pass
//! (depth prepass + shading) forward pipeline with optional shadow mapping.
//! Per-frame bookkeeping lives in bulk-reclaimed pools so a frame performs
//! no sustained allocation churn; shadow targets come from a reusable pool
//! with scope-guaranteed release.
//!
//! The graphics API sits behind the [`gpu::Device`] trait; tests drive the
//! renderer with the recording [`gpu::HeadlessDevice`].

pub mod gpu;
pub mod materials;
pub mod pool;
pub mod renderer;
pub mod scene;
pub mod settings;

pub use materials::{Material, MaterialFlags, MaterialRegistry, SpecialPrograms};
pub use pool::{PoolHandle, ResourcePool};
pub use renderer::{
    CullMode, FrameParams, FrameStats, IndexedProperty, IndexedValue, RenderMode, SceneRenderer,
};
pub use settings::RenderSettings;
