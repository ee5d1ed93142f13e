use std::collections::HashMap;

use bitflags::bitflags;
use glam::Vec3;

use crate::gpu::{Device, ProgramDesc, ProgramHandle};
use crate::scene::{LightConfig, MaterialId};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MaterialFlags: u32 {
        const EMISSIVE      = 1 << 0;
        const DOUBLE_SIDED  = 1 << 1;
        const UNLIT         = 1 << 2;
        const VERTEX_COLORS = 1 << 3;
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub base_color: Vec3,
    pub flags: MaterialFlags,
}

impl Material {
    pub fn new(name: impl Into<String>, base_color: Vec3) -> Self {
        Self {
            name: name.into(),
            base_color,
            flags: MaterialFlags::empty(),
        }
    }

    pub fn with_flags(mut self, flags: MaterialFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_unlit(&self) -> bool {
        self.flags.contains(MaterialFlags::UNLIT)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default", Vec3::ONE)
    }
}

/// Identity of one resolved program variant: material x scene light
/// configuration x shadow use. The generation component retires cached
/// variants when a material is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ProgramKey {
    material: MaterialId,
    generation: u32,
    lights: LightConfig,
    shadows: bool,
}

/// Shared programs that are not material variants: the depth-clip program
/// the prepass runs every batch through, the diagnostic visualizers, and
/// the depth-only programs shadow rendering uses.
#[derive(Debug, Clone, Copy)]
pub struct SpecialPrograms {
    pub depth_clip: ProgramHandle,
    pub normals: ProgramHandle,
    pub texcoords: ProgramHandle,
    pub shadow_depth: ProgramHandle,
    pub variance_depth: ProgramHandle,
}

struct MaterialEntry {
    material: Material,
    generation: u32,
}

/// Material table plus the memoized program cache.
///
/// `resolve_program` creates and links each distinct variant exactly once;
/// editing a material bumps its generation so stale variants simply stop
/// being found, and the edit is queued for the renderer to invalidate its
/// batches.
#[derive(Default)]
pub struct MaterialRegistry {
    entries: Vec<MaterialEntry>,
    programs: HashMap<ProgramKey, ProgramHandle>,
    special: Option<SpecialPrograms>,
    pending_invalidations: Vec<MaterialId>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = self.entries.len() as MaterialId;
        self.entries.push(MaterialEntry {
            material,
            generation: 0,
        });
        id
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.entries.get(id as usize).map(|entry| &entry.material)
    }

    pub fn material_count(&self) -> usize {
        self.entries.len()
    }

    /// Edits a material in place. Cached program variants for it go stale
    /// and the change is queued for batch invalidation.
    pub fn update_material(&mut self, id: MaterialId, material: Material) {
        let Some(entry) = self.entries.get_mut(id as usize) else {
            log::warn!("update of unknown material {}", id);
            return;
        };
        entry.material = material;
        self.invalidate_material(id);
    }

    pub fn invalidate_material(&mut self, id: MaterialId) {
        let Some(entry) = self.entries.get_mut(id as usize) else {
            log::warn!("invalidation of unknown material {}", id);
            return;
        };
        entry.generation = entry.generation.wrapping_add(1);
        self.programs.retain(|key, _| key.material != id);
        self.pending_invalidations.push(id);
    }

    /// Material edits since the last drain; the renderer folds these into a
    /// batch invalidation at frame start.
    pub fn take_invalidations(&mut self) -> Vec<MaterialId> {
        std::mem::take(&mut self.pending_invalidations)
    }

    /// Looks up or creates the program for (material, lights, shadows).
    ///
    /// Returns `None` when the material is unknown or the program fails to
    /// link; the caller skips the mesh layer and the frame degrades rather
    /// than aborts.
    pub fn resolve_program(
        &mut self,
        device: &mut dyn Device,
        id: MaterialId,
        lights: LightConfig,
        shadows: bool,
    ) -> Option<ProgramHandle> {
        let entry = self.entries.get(id as usize)?;
        let key = ProgramKey {
            material: id,
            generation: entry.generation,
            lights,
            shadows,
        };

        if let Some(&program) = self.programs.get(&key) {
            return Some(program);
        }

        let label = format!(
            "{}:a{}d{}p{}s{}{}",
            entry.material.name,
            lights.ambient,
            lights.directional,
            lights.point,
            lights.spot,
            if shadows { ":shadowed" } else { "" }
        );
        let program = device.create_program(&ProgramDesc { label });
        if !device.link_program(program) {
            log::warn!("program for material {} failed to link", id);
            return None;
        }
        self.programs.insert(key, program);
        Some(program)
    }

    /// The shared non-material programs, created and linked on first use.
    pub fn special_programs(&mut self, device: &mut dyn Device) -> SpecialPrograms {
        if let Some(special) = self.special {
            return special;
        }
        let mut create = |label: &str| {
            let program = device.create_program(&ProgramDesc {
                label: label.to_string(),
            });
            if !device.link_program(program) {
                // These programs ship with the renderer; failure to link
                // one is a build defect, not scene data.
                panic!("built-in program '{}' failed to link", label);
            }
            program
        };
        let special = SpecialPrograms {
            depth_clip: create("depth_clip"),
            normals: create("normals_preview"),
            texcoords: create("texcoords_preview"),
            shadow_depth: create("shadow_depth"),
            variance_depth: create("variance_shadow_depth"),
        };
        self.special = Some(special);
        special
    }

    pub fn cached_program_count(&self) -> usize {
        self.programs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessDevice;

    fn registry_with_one_material() -> (MaterialRegistry, MaterialId) {
        let mut registry = MaterialRegistry::new();
        let id = registry.add_material(Material::new("brushed_steel", Vec3::splat(0.8)));
        (registry, id)
    }

    #[test]
    fn resolve_is_memoized_per_variant() {
        let (mut registry, id) = registry_with_one_material();
        let mut device = HeadlessDevice::new();
        let lights = LightConfig {
            directional: 1,
            ..LightConfig::default()
        };

        let a = registry.resolve_program(&mut device, id, lights, false).unwrap();
        let b = registry.resolve_program(&mut device, id, lights, false).unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.cached_program_count(), 1);

        let shadowed = registry.resolve_program(&mut device, id, lights, true).unwrap();
        assert_ne!(a, shadowed);
        assert_eq!(registry.cached_program_count(), 2);
    }

    #[test]
    fn light_config_change_is_a_new_variant() {
        let (mut registry, id) = registry_with_one_material();
        let mut device = HeadlessDevice::new();

        let one = registry
            .resolve_program(&mut device, id, LightConfig { point: 1, ..Default::default() }, false)
            .unwrap();
        let two = registry
            .resolve_program(&mut device, id, LightConfig { point: 2, ..Default::default() }, false)
            .unwrap();
        assert_ne!(one, two);
    }

    #[test]
    fn invalidation_evicts_cached_variants() {
        let (mut registry, id) = registry_with_one_material();
        let mut device = HeadlessDevice::new();
        let lights = LightConfig::default();

        let before = registry.resolve_program(&mut device, id, lights, false).unwrap();
        registry.invalidate_material(id);
        assert_eq!(registry.cached_program_count(), 0);
        assert_eq!(registry.take_invalidations(), vec![id]);

        let after = registry.resolve_program(&mut device, id, lights, false).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn link_failure_resolves_to_none() {
        let (mut registry, id) = registry_with_one_material();
        let mut device = HeadlessDevice::new();
        device.fail_link = true;
        assert!(registry
            .resolve_program(&mut device, id, LightConfig::default(), false)
            .is_none());
        assert_eq!(registry.cached_program_count(), 0);
    }

    #[test]
    fn special_programs_are_created_once() {
        let mut registry = MaterialRegistry::new();
        let mut device = HeadlessDevice::new();
        let first = registry.special_programs(&mut device);
        let second = registry.special_programs(&mut device);
        assert_eq!(first.depth_clip, second.depth_clip);
        assert!(device.is_linked(first.normals));
    }
}
