use super::handle::{GeometryHandle, ProgramHandle, TextureHandle};

/// Depth comparison used for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthFunc {
    Less,
    Equal,
    Always,
}

/// Depth test/write configuration bracketing a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test: bool,
    pub write: bool,
    pub func: DepthFunc,
}

impl DepthState {
    pub const PREPASS: Self = Self {
        test: true,
        write: true,
        func: DepthFunc::Less,
    };

    pub const SHADING_AFTER_PREPASS: Self = Self {
        test: true,
        write: false,
        func: DepthFunc::Equal,
    };

    pub const SINGLE_PASS: Self = Self {
        test: true,
        write: true,
        func: DepthFunc::Less,
    };
}

/// Texture formats the renderer requests for shadow targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Depth32,
    Rgba16Float,
}

#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub label: &'static str,
    pub size: u32,
    pub format: TextureFormat,
}

#[derive(Debug, Clone)]
pub struct ProgramDesc {
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct GeometryDesc {
    pub label: String,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// Where draws land: the default framebuffer or an off-screen texture pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Screen,
    Textures {
        color: Option<TextureHandle>,
        depth: TextureHandle,
    },
}

/// Uniform-block binding slots shared by every program the renderer drives.
pub const CAMERA_UNIFORM_SLOT: u32 = 0;
pub const OBJECT_UNIFORM_SLOT: u32 = 1;
pub const LIGHTS_UNIFORM_SLOT: u32 = 2;

/// First texture binding slot for shadow maps sampled during shading.
pub const SHADOW_TEXTURE_SLOT_BASE: u32 = 8;

/// The graphics capability the renderer calls into.
///
/// Program linking, buffer allocation and texture creation live behind this
/// trait; the renderer only orchestrates. All calls happen on the designated
/// submission thread, in the order issued.
pub trait Device {
    fn create_geometry(&mut self, desc: &GeometryDesc) -> GeometryHandle;
    fn destroy_geometry(&mut self, geometry: GeometryHandle);

    fn create_program(&mut self, desc: &ProgramDesc) -> ProgramHandle;
    /// Links a program. Returns false when the program cannot be used.
    fn link_program(&mut self, program: ProgramHandle) -> bool;

    fn create_texture(&mut self, desc: &TextureDesc) -> TextureHandle;
    fn destroy_texture(&mut self, texture: TextureHandle);

    fn set_render_target(&mut self, target: RenderTarget);
    fn clear_depth(&mut self, value: f32);
    fn clear_color(&mut self, rgba: [f32; 4]);

    fn set_depth_state(&mut self, state: DepthState);
    fn set_color_writes(&mut self, enabled: bool);

    fn bind_program(&mut self, program: ProgramHandle);
    fn bind_texture(&mut self, slot: u32, texture: TextureHandle);
    fn upload_uniforms(&mut self, slot: u32, bytes: &[u8]);

    fn draw(&mut self, geometry: GeometryHandle);
}
