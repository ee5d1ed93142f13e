use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default = "RenderSettings::default_shadow_maps")]
    pub shadow_maps: bool,
    #[serde(default = "RenderSettings::default_shadow_map_size")]
    pub shadow_map_size: u32,
    #[serde(default)]
    pub show_bounding_boxes: bool,
    #[serde(default)]
    pub show_normals: bool,
    #[serde(default)]
    pub show_light_gizmos: bool,
    #[serde(default = "RenderSettings::default_mesh_entry_prealloc")]
    pub mesh_entry_prealloc: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shadow_maps: Self::default_shadow_maps(),
            shadow_map_size: Self::default_shadow_map_size(),
            show_bounding_boxes: false,
            show_normals: false,
            show_light_gizmos: false,
            mesh_entry_prealloc: Self::default_mesh_entry_prealloc(),
        }
    }
}

impl RenderSettings {
    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RenderSettings>(&contents) {
                Ok(settings) => {
                    info!("Loaded render settings from {:?}", path);
                    settings.validate()
                }
                Err(err) => {
                    warn!(
                        "Failed to parse {:?} ({}). Falling back to default render settings.",
                        path, err
                    );
                    RenderSettings::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Render settings file {:?} not found. Using default settings.",
                    path
                );
                RenderSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }
        }
    }

    fn validate(mut self) -> Self {
        if self.shadow_map_size == 0 {
            warn!("Shadow map size must be greater than zero. Using default value.");
            self.shadow_map_size = Self::default_shadow_map_size();
        }

        if self.mesh_entry_prealloc == 0 {
            warn!("Mesh entry preallocation must be greater than zero. Using default value.");
            self.mesh_entry_prealloc = Self::default_mesh_entry_prealloc();
        }

        self
    }

    const fn default_shadow_maps() -> bool {
        true
    }

    const fn default_shadow_map_size() -> u32 {
        2048
    }

    const fn default_mesh_entry_prealloc() -> usize {
        256
    }
}
