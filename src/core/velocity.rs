use crate::core::clip::ClipData;
use tracing::debug;

/// Bone selection and reduction parameters for the velocity targets.
#[derive(Debug, Clone)]
pub struct VelocityParams {
    selected: Vec<bool>,
    cap: f32,
    threshold: f32,
}

impl VelocityParams {
    pub fn new(bone_count: usize) -> Self {
        Self {
            selected: vec![false; bone_count],
            cap: 5.0,
            threshold: 0.1,
        }
    }

    pub fn cap(&self) -> f32 {
        self.cap
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn selected(&self) -> &[bool] {
        &self.selected
    }

    /// Velocity cap is kept at 1.0 or above.
    pub fn set_cap(&mut self, value: f32) {
        self.cap = value.max(1.0);
    }

    /// Noise floor is kept non-negative.
    pub fn set_threshold(&mut self, value: f32) {
        self.threshold = value.max(0.0);
    }

    pub fn toggle(&mut self, bone: usize) {
        if let Some(flag) = self.selected.get_mut(bone) {
            *flag = !*flag;
        }
    }

    pub fn set_selected(&mut self, mask: Vec<bool>) {
        if mask.len() == self.selected.len() {
            self.selected = mask;
        }
    }

    pub fn select_all(&mut self) {
        self.selected.fill(true);
    }
}

/// Per-frame scalar motion-energy targets reduced from the selected bones.
/// `regular`/`inverse` are the raw fitness targets; the normalised variants
/// exist for display only.
#[derive(Debug, Clone, Default)]
pub struct VelocityProfile {
    pub regular: Vec<f32>,
    pub inverse: Vec<f32>,
    pub regular_normalised: Vec<f32>,
    pub inverse_normalised: Vec<f32>,
}

impl VelocityProfile {
    pub fn compute(clip: &ClipData, params: &VelocityParams) -> Self {
        let mut profile = Self::default();
        profile.recompute(clip, params);
        profile
    }

    /// Full recompute; runs whenever selection, cap, or threshold changes.
    pub fn recompute(&mut self, clip: &ClipData, params: &VelocityParams) {
        let frames = clip.total_frames();
        let bones = clip.bone_count();

        self.regular = reduce(clip, params, frames, bones, |b| b);
        self.inverse = reduce(clip, params, frames, bones, |b| clip.mirrored(b));
        self.regular_normalised = min_max_normalise(&self.regular);
        self.inverse_normalised = min_max_normalise(&self.inverse);

        debug!(
            frames,
            cap = params.cap,
            threshold = params.threshold,
            "recomputed velocity profile"
        );
    }

    /// Mean per-frame motion energy over a frame range, both polarities.
    pub fn interval_energy(&self, start: usize, end: usize) -> f32 {
        if self.regular.is_empty() || start > end {
            return 0.0;
        }
        let len = end - start + 1;
        let mut sum = 0.0;
        for i in start..=end.min(self.regular.len() - 1) {
            sum += self.regular[i] + self.inverse[i];
        }
        sum / len as f32
    }
}

fn reduce(
    clip: &ClipData,
    params: &VelocityParams,
    frames: usize,
    bones: usize,
    map: impl Fn(usize) -> usize,
) -> Vec<f32> {
    let mut out = vec![0.0f32; frames];
    for (frame, value) in out.iter_mut().enumerate() {
        let mut sum = 0.0;
        for bone in 0..bones {
            if params.selected.get(map(bone)).copied().unwrap_or(false) {
                sum += clip.bone_velocity(frame, bone).min(params.cap);
            }
        }
        if sum < params.threshold {
            sum = 0.0;
        }
        *value = sum;
    }
    out
}

fn min_max_normalise(values: &[f32]) -> Vec<f32> {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    let span = max - min;
    if !span.is_finite() || span <= 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|&v| (v - min) / span).collect()
}

#[cfg(test)]
mod tests {
    use super::{VelocityParams, VelocityProfile};
    use crate::core::clip::ClipData;

    fn clip() -> ClipData {
        ClipData {
            framerate: 30.0,
            bone_names: vec!["l_foot".into(), "r_foot".into()],
            velocities: vec![
                vec![0.05, 0.0],
                vec![2.0, 0.0],
                vec![9.0, 0.0],
                vec![0.0, 3.0],
            ],
            symmetry: vec![1, 0],
        }
    }

    #[test]
    fn threshold_clamps_to_zero() {
        let c = clip();
        let mut p = VelocityParams::new(2);
        p.set_selected(vec![true, false]);
        p.set_threshold(0.1);
        let profile = VelocityProfile::compute(&c, &p);
        assert_eq!(profile.regular[0], 0.0, "below-threshold sum must be zeroed");
        assert_eq!(profile.regular[1], 2.0);
    }

    #[test]
    fn cap_limits_each_bone() {
        let c = clip();
        let mut p = VelocityParams::new(2);
        p.set_selected(vec![true, false]);
        p.set_cap(5.0);
        let profile = VelocityProfile::compute(&c, &p);
        assert_eq!(profile.regular[2], 5.0);
    }

    #[test]
    fn inverse_uses_mirrored_selection() {
        let c = clip();
        let mut p = VelocityParams::new(2);
        p.set_selected(vec![true, false]);
        let profile = VelocityProfile::compute(&c, &p);
        // Bone 1 mirrors into the selected bone 0, so the inverse signal
        // reads bone 1's motion.
        assert_eq!(profile.inverse[3], 3.0);
        assert_eq!(profile.regular[3], 0.0);
    }

    #[test]
    fn flat_signal_normalises_to_zero() {
        let c = ClipData {
            framerate: 30.0,
            bone_names: vec!["root".into()],
            velocities: vec![vec![1.0]; 4],
            symmetry: Vec::new(),
        };
        let mut p = VelocityParams::new(1);
        p.select_all();
        let profile = VelocityProfile::compute(&c, &p);
        assert!(profile.regular_normalised.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn params_clamp_to_safe_minimums() {
        let mut p = VelocityParams::new(1);
        p.set_cap(0.0);
        p.set_threshold(-1.0);
        assert_eq!(p.cap(), 1.0);
        assert_eq!(p.threshold(), 0.0);
    }
}
