use glam::Vec3;

use super::curve::CurveChannel;

pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;
pub const MAX_POINT_LIGHTS: usize = 16;
pub const MAX_SPOT_LIGHTS: usize = 8;

/// Distance attenuation policy for point and spot lights.
#[derive(Debug, Clone)]
pub enum Falloff {
    Off,
    Linear,
    InverseDistance,
    InverseDistanceSquared,
    /// Attenuation scale sampled from an authored channel at frame time.
    Curve(CurveChannel<f32>),
}

/// Shadow-map generation algorithm for a casting light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShadowAlgorithm {
    Plain,
    Variance { min_variance: f32, cutoff: f32 },
}

#[derive(Debug, Clone, Copy)]
pub struct ShadowSettings {
    pub algorithm: ShadowAlgorithm,
    /// Map resolution; 0 defers to the renderer's configured default.
    pub resolution: u32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            algorithm: ShadowAlgorithm::Plain,
            resolution: 0,
        }
    }
}

/// Closed set of light kinds. Position/direction fields are world-space and
/// refreshed by the graph walk when the light sits on a scene node.
#[derive(Debug, Clone)]
pub enum LightKind {
    Ambient,
    Directional {
        direction: Vec3,
    },
    Point {
        position: Vec3,
        range: f32,
        falloff: Falloff,
    },
    Spot {
        position: Vec3,
        direction: Vec3,
        range: f32,
        inner_angle: f32,
        outer_angle: f32,
        falloff: Falloff,
    },
}

#[derive(Debug, Clone)]
pub struct Light {
    pub kind: LightKind,
    pub color: CurveChannel<Vec3>,
    pub intensity: CurveChannel<f32>,
    pub shadow: Option<ShadowSettings>,
}

impl Light {
    pub fn ambient(color: Vec3) -> Self {
        Self {
            kind: LightKind::Ambient,
            color: CurveChannel::constant(color),
            intensity: CurveChannel::constant(1.0),
            shadow: None,
        }
    }

    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional {
                direction: direction.normalize_or_zero(),
            },
            color: CurveChannel::constant(color),
            intensity: CurveChannel::constant(intensity),
            shadow: None,
        }
    }

    pub fn point(position: Vec3, range: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Point {
                position,
                range,
                falloff: Falloff::InverseDistanceSquared,
            },
            color: CurveChannel::constant(color),
            intensity: CurveChannel::constant(intensity),
            shadow: None,
        }
    }

    pub fn spot(
        position: Vec3,
        direction: Vec3,
        range: f32,
        inner_angle: f32,
        outer_angle: f32,
        color: Vec3,
        intensity: f32,
    ) -> Self {
        Self {
            kind: LightKind::Spot {
                position,
                direction: direction.normalize_or_zero(),
                range,
                inner_angle,
                outer_angle,
                falloff: Falloff::InverseDistanceSquared,
            },
            color: CurveChannel::constant(color),
            intensity: CurveChannel::constant(intensity),
            shadow: None,
        }
    }

    pub fn with_shadow(mut self, settings: ShadowSettings) -> Self {
        self.shadow = Some(settings);
        self
    }

    pub fn with_color_channel(mut self, color: CurveChannel<Vec3>) -> Self {
        self.color = color;
        self
    }

    pub fn with_intensity_channel(mut self, intensity: CurveChannel<f32>) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn casts_shadows(&self) -> bool {
        // Ambient light has no direction to cast from.
        self.shadow.is_some() && !matches!(self.kind, LightKind::Ambient)
    }

    /// Color scaled by intensity at `time`.
    pub fn sampled_color(&self, time: f32) -> Vec3 {
        self.color.sample(time) * self.intensity.sample(time)
    }
}

/// Count of lights per kind, used to key resolved shader programs: adding or
/// removing a light changes every material's program variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightConfig {
    pub ambient: u32,
    pub directional: u32,
    pub point: u32,
    pub spot: u32,
}

impl LightConfig {
    pub fn of<'a>(lights: impl IntoIterator<Item = &'a Light>) -> Self {
        let mut config = Self::default();
        for light in lights {
            match light.kind {
                LightKind::Ambient => config.ambient += 1,
                LightKind::Directional { .. } => config.directional += 1,
                LightKind::Point { .. } => config.point += 1,
                LightKind::Spot { .. } => config.spot += 1,
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampled_color_scales_by_intensity() {
        let light = Light::directional(Vec3::NEG_Y, Vec3::new(1.0, 0.5, 0.25), 2.0);
        assert!(light
            .sampled_color(0.0)
            .abs_diff_eq(Vec3::new(2.0, 1.0, 0.5), 1e-6));
    }

    #[test]
    fn ambient_never_casts_shadows() {
        let light = Light::ambient(Vec3::ONE).with_shadow(ShadowSettings::default());
        assert!(!light.casts_shadows());
    }

    #[test]
    fn light_config_counts_kinds() {
        let lights = vec![
            Light::ambient(Vec3::ONE),
            Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0),
            Light::point(Vec3::ZERO, 5.0, Vec3::ONE, 1.0),
            Light::point(Vec3::ONE, 5.0, Vec3::ONE, 1.0),
        ];
        let config = LightConfig::of(&lights);
        assert_eq!(config, LightConfig::of(lights.iter()));
        assert_eq!(config.ambient, 1);
        assert_eq!(config.directional, 1);
        assert_eq!(config.point, 2);
        assert_eq!(config.spot, 0);
    }
}
