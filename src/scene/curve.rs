use glam::Vec3;

/// Linear interpolation between two channel values.
pub trait Lerp: Copy {
    fn lerp_to(self, other: Self, factor: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp_to(self, other: Self, factor: f32) -> Self {
        self + (other - self) * factor
    }
}

impl Lerp for Vec3 {
    fn lerp_to(self, other: Self, factor: f32) -> Self {
        self.lerp(other, factor)
    }
}

/// Time-indexed sampler over sorted keyframes, clamped at both ends.
///
/// Light colors and intensities are authored as channels and evaluated at
/// the frame time; the renderer never sees the keyframes themselves.
#[derive(Debug, Clone)]
pub struct CurveChannel<T> {
    times: Vec<f32>,
    values: Vec<T>,
}

impl<T: Lerp> CurveChannel<T> {
    pub fn constant(value: T) -> Self {
        Self {
            times: vec![0.0],
            values: vec![value],
        }
    }

    /// Keys must be sorted by time; out-of-order keys are a contract
    /// violation.
    pub fn from_keys(keys: Vec<(f32, T)>) -> Self {
        debug_assert!(
            keys.windows(2).all(|pair| pair[0].0 <= pair[1].0),
            "curve keys must be sorted by time"
        );
        let (times, values) = keys.into_iter().unzip();
        Self { times, values }
    }

    pub fn sample(&self, time: f32) -> T
    where
        T: Default,
    {
        let Some((lower, upper, factor)) = self.sample_indices(time) else {
            log::warn!("sampling an empty curve channel");
            return T::default();
        };
        if lower == upper {
            return self.values[lower];
        }
        self.values[lower].lerp_to(self.values[upper], factor)
    }

    fn sample_indices(&self, time: f32) -> Option<(usize, usize, f32)> {
        if self.times.is_empty() {
            return None;
        }
        if self.times.len() == 1 || time <= self.times[0] {
            return Some((0, 0, 0.0));
        }

        let last_index = self.times.len() - 1;
        if time >= self.times[last_index] {
            return Some((last_index, last_index, 0.0));
        }

        match self
            .times
            .binary_search_by(|probe| probe.partial_cmp(&time).unwrap())
        {
            Ok(index) => Some((index, index, 0.0)),
            Err(upper) => {
                let lower = upper - 1;
                let start = self.times[lower];
                let end = self.times[upper];
                let factor = (time - start) / (end - start);
                Some((lower, upper, factor))
            }
        }
    }
}
