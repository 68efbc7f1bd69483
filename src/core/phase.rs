use tracing::warn;

/// One optimizer commit: blended cycle signal, its normalised form, and the
/// detected cycle-turning-point keyframes.
#[derive(Debug, Clone, Default)]
pub struct PhaseAssignment {
    pub cycle: Vec<f32>,
    pub normalised_cycle: Vec<f32>,
    pub keys: Vec<bool>,
}

/// Persisted phase annotation for one clip. Sole owner of the durable
/// buffers; the optimizer writes back only through [`PhaseFunction::commit`].
#[derive(Debug, Clone)]
pub struct PhaseFunction {
    phase: Vec<f32>,
    keys: Vec<bool>,
    cycle: Vec<f32>,
    normalised_cycle: Vec<f32>,
}

impl PhaseFunction {
    pub fn new(frames: usize) -> Self {
        Self {
            phase: vec![0.0; frames],
            keys: vec![false; frames],
            cycle: vec![0.0; frames],
            normalised_cycle: vec![0.0; frames],
        }
    }

    /// Restore from previously persisted phase values; frames holding an
    /// exact 1.0 are keyframe anchors.
    pub fn from_phase(values: Vec<f32>) -> Self {
        let keys = values.iter().map(|&p| p == 1.0).collect();
        let frames = values.len();
        Self {
            phase: values,
            keys,
            cycle: vec![0.0; frames],
            normalised_cycle: vec![0.0; frames],
        }
    }

    pub fn len(&self) -> usize {
        self.phase.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phase.is_empty()
    }

    pub fn phase(&self) -> &[f32] {
        &self.phase
    }

    pub fn keys(&self) -> &[bool] {
        &self.keys
    }

    pub fn cycle(&self) -> &[f32] {
        &self.cycle
    }

    pub fn normalised_cycle(&self) -> &[f32] {
        &self.normalised_cycle
    }

    pub fn phase_at(&self, frame: usize) -> f32 {
        self.phase.get(frame).copied().unwrap_or(0.0)
    }

    pub fn is_key(&self, frame: usize) -> bool {
        self.keys.get(frame).copied().unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.phase.fill(0.0);
        self.keys.fill(false);
        self.cycle.fill(0.0);
        self.normalised_cycle.fill(0.0);
    }

    /// Nearest keyframe before `frame`, falling back to the first frame.
    pub fn previous_key(&self, frame: usize) -> usize {
        let frame = frame.min(self.len().saturating_sub(1));
        (0..frame).rev().find(|&i| self.keys[i]).unwrap_or(0)
    }

    /// Nearest keyframe after `frame`, falling back to the last frame.
    pub fn next_key(&self, frame: usize) -> usize {
        let last = self.len().saturating_sub(1);
        ((frame + 1)..=last).find(|&i| self.keys[i]).unwrap_or(last)
    }

    /// Manually mark or unmark a keyframe, re-interpolating around it.
    pub fn set_key(&mut self, frame: usize, value: bool) {
        if frame >= self.len() {
            warn!(frame, "set_key: frame out of range, ignored");
            return;
        }
        if self.keys[frame] == value {
            return;
        }
        self.keys[frame] = value;
        self.phase[frame] = if value { 1.0 } else { 0.0 };
        self.reinterpolate_around(frame);
    }

    /// Override a keyframe's phase anchor, re-interpolating around it.
    pub fn set_phase(&mut self, frame: usize, value: f32) {
        if frame >= self.len() {
            warn!(frame, "set_phase: frame out of range, ignored");
            return;
        }
        if self.phase[frame] == value {
            return;
        }
        self.phase[frame] = value;
        self.reinterpolate_around(frame);
    }

    /// Apply one optimizer commit: replace cycle/keys buffers, anchor the
    /// keyframes (0 at the very first frame, 1 elsewhere), and rebuild the
    /// continuous phase by keyframe interpolation.
    pub fn commit(&mut self, assignment: PhaseAssignment) {
        let frames = self.len();
        if assignment.cycle.len() != frames
            || assignment.normalised_cycle.len() != frames
            || assignment.keys.len() != frames
        {
            warn!(
                frames,
                cycle = assignment.cycle.len(),
                keys = assignment.keys.len(),
                "commit: assignment size mismatch, ignored"
            );
            return;
        }
        self.cycle = assignment.cycle;
        self.normalised_cycle = assignment.normalised_cycle;
        self.keys = assignment.keys;
        self.phase.fill(0.0);
        for frame in 0..frames {
            if self.keys[frame] {
                self.phase[frame] = if frame == 0 { 0.0 } else { 1.0 };
            }
        }
        self.interpolate_all();
    }

    /// Rebuild every non-keyframe phase from the keyframe anchors with an
    /// iterative bracket walk.
    pub fn interpolate_all(&mut self) {
        if self.is_empty() {
            return;
        }
        let mut a = 0;
        let mut b = self.next_key(a);
        while a != b {
            self.interpolate_span(a, b);
            a = b;
            b = self.next_key(a);
        }
    }

    fn reinterpolate_around(&mut self, frame: usize) {
        let prev = self.previous_key(frame);
        let next = self.next_key(frame);
        if self.is_key(frame) {
            self.interpolate_span(prev, frame);
            self.interpolate_span(frame, next);
        } else {
            self.interpolate_span(prev, next);
        }
    }

    fn interpolate_span(&mut self, a: usize, b: usize) {
        self.fill_interior(a, b);
        if a == 0 {
            self.anchor_first();
        }
        if b + 1 == self.len() {
            self.anchor_last();
        }
    }

    /// Linear-in-time interpolation between two bracketing keyframes; the
    /// left anchor wraps through `value mod 1`.
    fn fill_interior(&mut self, a: usize, b: usize) {
        if b <= a + 1 {
            return;
        }
        let dist = (b - a) as f32;
        let pa = self.phase[a].rem_euclid(1.0);
        let pb = self.phase[b];
        for i in (a + 1)..b {
            let rate_a = (i - a) as f32 / dist;
            let rate_b = (b - i) as f32 / dist;
            self.phase[i] = rate_b * pa + rate_a * pb;
        }
    }

    /// The first frame is always a keyframe; its anchor derives from the
    /// ratio of the two following key gaps rather than interpolation.
    fn anchor_first(&mut self) {
        self.keys[0] = true;
        let n1 = self.next_key(0);
        let n2 = self.next_key(n1);
        let x = n1 as f32;
        let m = (n2 - n1) as f32;
        if m > 0.0 {
            let anchor = (1.0 - x / m).clamp(0.0, 1.0);
            if self.phase[0] != anchor {
                self.phase[0] = anchor;
                self.fill_interior(0, n1);
            }
        }
    }

    /// Mirror rule for the final frame, from the two preceding key gaps.
    fn anchor_last(&mut self) {
        let last = self.len() - 1;
        self.keys[last] = true;
        let p1 = self.previous_key(last);
        let p2 = self.previous_key(p1);
        let x = (last - p1) as f32;
        let m = (p1 - p2) as f32;
        if m > 0.0 {
            let anchor = (x / m).clamp(0.0, 1.0);
            if self.phase[last] != anchor {
                self.phase[last] = anchor;
                self.fill_interior(p1, last);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PhaseAssignment, PhaseFunction};

    fn committed(frames: usize, key_frames: &[usize]) -> PhaseFunction {
        let mut keys = vec![false; frames];
        for &k in key_frames {
            keys[k] = true;
        }
        let mut fun = PhaseFunction::new(frames);
        fun.commit(PhaseAssignment {
            cycle: vec![0.0; frames],
            normalised_cycle: vec![0.0; frames],
            keys,
        });
        fun
    }

    #[test]
    fn interior_frames_follow_bracket_formula() {
        let fun = committed(20, &[0, 5, 10, 15]);
        // Between keys 5 and 10: pa = 1 mod 1 = 0, pb = 1.
        for i in 6..10 {
            let expected = (i - 5) as f32 / 5.0;
            assert!(
                (fun.phase_at(i) - expected).abs() < 1e-6,
                "frame {i}: {} != {expected}",
                fun.phase_at(i)
            );
        }
    }

    #[test]
    fn phase_stays_in_unit_range() {
        let fun = committed(30, &[0, 7, 13, 22]);
        for i in 0..30 {
            let p = fun.phase_at(i);
            assert!((0.0..=1.0).contains(&p), "frame {i}: {p}");
            if !fun.is_key(i) {
                assert!(p < 1.0, "non-key frame {i} reached 1.0");
            }
        }
    }

    #[test]
    fn boundary_frames_forced_to_keys() {
        let fun = committed(30, &[10, 20]);
        assert!(fun.is_key(0));
        assert!(fun.is_key(29));
    }

    #[test]
    fn first_anchor_uses_gap_ratio() {
        let fun = committed(30, &[10, 20]);
        // x = 10 to the first key, m = 10 between the first two keys.
        assert!((fun.phase_at(0) - 0.0).abs() < 1e-6);
        let fun = committed(30, &[4, 16]);
        assert!((fun.phase_at(0) - (1.0 - 4.0 / 12.0)).abs() < 1e-6);
    }

    #[test]
    fn last_anchor_uses_gap_ratio() {
        let fun = committed(30, &[10, 20]);
        // x = 29 - 20 = 9, m = 20 - 10 = 10.
        assert!((fun.phase_at(29) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn manual_key_toggling_reinterpolates() {
        let mut fun = committed(30, &[10, 20]);
        fun.set_key(15, true);
        assert!(fun.is_key(15));
        assert_eq!(fun.phase_at(15), 1.0);
        // Halfway between keys 10 and 15: left anchor wraps to 0.
        assert!((fun.phase_at(12) - 0.4).abs() < 1e-6);
        fun.set_key(15, false);
        assert!(!fun.is_key(15));
    }

    #[test]
    fn out_of_range_edits_are_ignored() {
        let mut fun = committed(10, &[5]);
        let before = fun.phase().to_vec();
        fun.set_key(99, true);
        fun.set_phase(99, 0.5);
        assert_eq!(fun.phase(), &before[..]);
    }

    #[test]
    fn restore_from_persisted_phase_marks_keys() {
        let fun = PhaseFunction::from_phase(vec![0.0, 0.5, 1.0, 0.2]);
        assert!(!fun.is_key(1));
        assert!(fun.is_key(2));
    }
}
