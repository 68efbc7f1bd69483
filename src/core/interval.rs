use crate::core::clip::ClipData;

/// Inclusive frame range fitted by one population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, frame: usize) -> bool {
        frame >= self.start && frame <= self.end
    }
}

/// Split the clip timeline into fixed-duration windows. Boundary timestamps
/// map through the clip's frame lookup; the final interval absorbs any
/// remainder so the partition covers every frame exactly once.
pub fn partition(clip: &ClipData, window_sec: f32) -> Vec<Interval> {
    let total = clip.total_frames();
    if total == 0 {
        return Vec::new();
    }
    let last = total - 1;
    if !window_sec.is_finite() || window_sec <= 0.0 || window_sec >= clip.total_time() {
        return vec![Interval::new(0, last)];
    }

    let count = ((clip.total_time() / window_sec).ceil() as usize).max(1);
    let mut bounds = Vec::with_capacity(count + 1);
    bounds.push(0usize);
    for i in 1..count {
        let frame = clip.frame_at_time(i as f32 * window_sec);
        let prev = *bounds.last().unwrap();
        // Degenerate windows collapse; keep boundaries strictly increasing.
        if frame > prev && frame <= last {
            bounds.push(frame);
        }
    }
    bounds.push(total);

    bounds
        .windows(2)
        .map(|pair| Interval::new(pair[0], pair[1] - 1))
        .collect()
}
