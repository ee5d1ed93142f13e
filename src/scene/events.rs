/// Cross-cutting scene changes the renderer must react to.
///
/// Queued on the scene by its mutation methods and drained by the renderer
/// at the top of every frame; collaborators holding the renderer directly
/// can push the same values through `SceneRenderer::notify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    /// A light joined the scene: every resolved shader variant is stale.
    LightAdded,
    /// A light left the scene: same blast radius as an addition.
    LightRemoved,
    /// A material's resolved program went stale.
    MaterialInvalidated { material: u32 },
    /// A camera's frustum-preview flag flipped.
    CameraFrustumToggled { camera: u32 },
}

#[derive(Default)]
pub struct EventQueue {
    pending: Vec<SceneEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: SceneEvent) {
        self.pending.push(event);
    }

    pub fn drain(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
