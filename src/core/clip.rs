use serde::{Deserialize, Serialize};

/// Motion-clip data contract: everything the optimizer needs from the
/// surrounding motion pipeline. Velocities are per-frame, per-bone linear
/// velocity magnitudes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipData {
    pub framerate: f32,
    pub bone_names: Vec<String>,
    /// Row per frame, one magnitude per bone.
    pub velocities: Vec<Vec<f32>>,
    /// Bone index -> mirrored bone index. Empty means identity.
    #[serde(default)]
    pub symmetry: Vec<usize>,
}

impl ClipData {
    pub fn total_frames(&self) -> usize {
        self.velocities.len()
    }

    pub fn bone_count(&self) -> usize {
        self.bone_names.len()
    }

    pub fn total_time(&self) -> f32 {
        self.total_frames() as f32 / self.framerate
    }

    pub fn timestamp_of(&self, frame: usize) -> f32 {
        frame as f32 / self.framerate
    }

    /// Nearest frame index for a timestamp, clamped to the valid range.
    pub fn frame_at_time(&self, sec: f32) -> usize {
        if sec <= 0.0 || self.total_frames() == 0 {
            return 0;
        }
        let idx = (sec as f64 * self.framerate as f64).round() as usize;
        idx.min(self.total_frames() - 1)
    }

    pub fn bone_velocity(&self, frame: usize, bone: usize) -> f32 {
        self.velocities
            .get(frame)
            .and_then(|row| row.get(bone))
            .copied()
            .unwrap_or(0.0)
    }

    /// Mirrored bone index; identity when no symmetry table is present or
    /// the entry is out of range.
    pub fn mirrored(&self, bone: usize) -> usize {
        match self.symmetry.get(bone) {
            Some(&m) if m < self.bone_count() => m,
            _ => bone,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.framerate.is_finite() || self.framerate <= 0.0 {
            return Err(format!("framerate must be positive, got {}", self.framerate));
        }
        if self.velocities.is_empty() {
            return Err("clip has no frames".into());
        }
        let bones = self.bone_count();
        for (i, row) in self.velocities.iter().enumerate() {
            if row.len() != bones {
                return Err(format!(
                    "frame {} has {} bone velocities, expected {}",
                    i,
                    row.len(),
                    bones
                ));
            }
        }
        if !self.symmetry.is_empty() {
            if self.symmetry.len() != bones {
                return Err(format!(
                    "symmetry table has {} entries, expected {}",
                    self.symmetry.len(),
                    bones
                ));
            }
            if let Some(bad) = self.symmetry.iter().find(|&&m| m >= bones) {
                return Err(format!("symmetry entry {bad} out of range"));
            }
        }
        Ok(())
    }
}
