use super::device::{DepthState, Device, GeometryDesc, ProgramDesc, RenderTarget, TextureDesc};
use super::handle::{
    Geometry, GeometryHandle, HandleAllocator, Program, ProgramHandle, Texture, TextureHandle,
};

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetRenderTarget(RenderTarget),
    ClearDepth(f32),
    ClearColor([f32; 4]),
    SetDepthState(DepthState),
    SetColorWrites(bool),
    BindProgram(ProgramHandle),
    BindTexture { slot: u32, texture: TextureHandle },
    UploadUniforms { slot: u32, len: usize },
    Draw(GeometryHandle),
}

/// Device implementation that records the command stream instead of talking
/// to a GPU. Backs the test suite and headless smoke runs; uniform payloads
/// are kept verbatim so tests can decode what a pass uploaded.
#[derive(Default)]
pub struct HeadlessDevice {
    programs: HandleAllocator<Program>,
    textures: HandleAllocator<Texture>,
    geometries: HandleAllocator<Geometry>,
    linked: Vec<ProgramHandle>,
    commands: Vec<Command>,
    uniform_payloads: Vec<(u32, Vec<u8>)>,
    pub fail_link: bool,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Uniform payloads in upload order, paired with their slot.
    pub fn uniform_payloads(&self) -> &[(u32, Vec<u8>)] {
        &self.uniform_payloads
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, Command::Draw(_)))
            .count()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.live_count()
    }

    pub fn is_linked(&self, program: ProgramHandle) -> bool {
        self.linked.contains(&program)
    }
}

impl Device for HeadlessDevice {
    fn create_geometry(&mut self, _desc: &GeometryDesc) -> GeometryHandle {
        self.geometries.alloc()
    }

    fn destroy_geometry(&mut self, geometry: GeometryHandle) {
        self.geometries.free(geometry);
    }

    fn create_program(&mut self, _desc: &ProgramDesc) -> ProgramHandle {
        self.programs.alloc()
    }

    fn link_program(&mut self, program: ProgramHandle) -> bool {
        if self.fail_link {
            return false;
        }
        if !self.programs.is_live(program) {
            log::warn!("link requested for a dead program handle");
            return false;
        }
        if !self.linked.contains(&program) {
            self.linked.push(program);
        }
        true
    }

    fn create_texture(&mut self, _desc: &TextureDesc) -> TextureHandle {
        self.textures.alloc()
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.free(texture);
    }

    fn set_render_target(&mut self, target: RenderTarget) {
        self.commands.push(Command::SetRenderTarget(target));
    }

    fn clear_depth(&mut self, value: f32) {
        self.commands.push(Command::ClearDepth(value));
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.commands.push(Command::ClearColor(rgba));
    }

    fn set_depth_state(&mut self, state: DepthState) {
        self.commands.push(Command::SetDepthState(state));
    }

    fn set_color_writes(&mut self, enabled: bool) {
        self.commands.push(Command::SetColorWrites(enabled));
    }

    fn bind_program(&mut self, program: ProgramHandle) {
        debug_assert!(self.programs.is_live(program), "binding a dead program");
        self.commands.push(Command::BindProgram(program));
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureHandle) {
        debug_assert!(self.textures.is_live(texture), "binding a dead texture");
        self.commands.push(Command::BindTexture { slot, texture });
    }

    fn upload_uniforms(&mut self, slot: u32, bytes: &[u8]) {
        self.commands.push(Command::UploadUniforms {
            slot,
            len: bytes.len(),
        });
        self.uniform_payloads.push((slot, bytes.to_vec()));
    }

    fn draw(&mut self, geometry: GeometryHandle) {
        debug_assert!(self.geometries.is_live(geometry), "drawing dead geometry");
        self.commands.push(Command::Draw(geometry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::device::DepthFunc;

    #[test]
    fn records_state_transitions_in_order() {
        let mut device = HeadlessDevice::new();
        device.set_color_writes(false);
        device.set_depth_state(DepthState {
            test: true,
            write: true,
            func: DepthFunc::Less,
        });
        device.set_color_writes(true);

        assert_eq!(
            device.commands(),
            &[
                Command::SetColorWrites(false),
                Command::SetDepthState(DepthState {
                    test: true,
                    write: true,
                    func: DepthFunc::Less,
                }),
                Command::SetColorWrites(true),
            ]
        );
    }

    #[test]
    fn texture_lifecycle_is_balanced() {
        let mut device = HeadlessDevice::new();
        let desc = TextureDesc {
            label: "test",
            size: 256,
            format: crate::gpu::TextureFormat::Depth32,
        };
        let a = device.create_texture(&desc);
        let b = device.create_texture(&desc);
        assert_eq!(device.live_textures(), 2);
        device.destroy_texture(a);
        device.destroy_texture(b);
        assert_eq!(device.live_textures(), 0);
    }
}
