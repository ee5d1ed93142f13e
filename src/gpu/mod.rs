pub mod device;
pub mod handle;
pub mod headless;

pub use device::{
    DepthFunc, DepthState, Device, GeometryDesc, ProgramDesc, RenderTarget, TextureDesc,
    TextureFormat, CAMERA_UNIFORM_SLOT, LIGHTS_UNIFORM_SLOT, OBJECT_UNIFORM_SLOT,
    SHADOW_TEXTURE_SLOT_BASE,
};
pub use handle::{GeometryHandle, Handle, HandleAllocator, ProgramHandle, TextureHandle};
pub use headless::{Command, HeadlessDevice};
