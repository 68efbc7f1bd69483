use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    #[serde(default = "EvolutionConfig::default_amplitude")]
    pub amplitude: f32,
    #[serde(default = "EvolutionConfig::default_frequency")]
    pub frequency: f32,
    #[serde(default = "EvolutionConfig::default_shift")]
    pub shift: f32,
    #[serde(default = "EvolutionConfig::default_offset")]
    pub offset: f32,
    #[serde(default = "EvolutionConfig::default_slope")]
    pub slope: f32,
    #[serde(default = "EvolutionConfig::default_window_sec")]
    pub window_sec: f32,
    #[serde(default = "EvolutionConfig::default_behaviour")]
    pub behaviour: f32,
    #[serde(default = "EvolutionConfig::default_blending")]
    pub blending: f32,
    #[serde(default = "EvolutionConfig::default_steep_penalty")]
    pub steep_penalty: bool,
}

impl EvolutionConfig {
    fn default_amplitude() -> f32 {
        10.0
    }
    fn default_frequency() -> f32 {
        2.5
    }
    fn default_shift() -> f32 {
        std::f32::consts::PI
    }
    fn default_offset() -> f32 {
        10.0
    }
    fn default_slope() -> f32 {
        5.0
    }
    fn default_window_sec() -> f32 {
        5.0
    }
    fn default_behaviour() -> f32 {
        1.0
    }
    fn default_blending() -> f32 {
        1.0
    }
    fn default_steep_penalty() -> bool {
        true
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            amplitude: Self::default_amplitude(),
            frequency: Self::default_frequency(),
            shift: Self::default_shift(),
            offset: Self::default_offset(),
            slope: Self::default_slope(),
            window_sec: Self::default_window_sec(),
            behaviour: Self::default_behaviour(),
            blending: Self::default_blending(),
            steep_penalty: Self::default_steep_penalty(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityConfig {
    #[serde(default = "VelocityConfig::default_cap")]
    pub cap: f32,
    #[serde(default = "VelocityConfig::default_threshold")]
    pub threshold: f32,
}

impl VelocityConfig {
    fn default_cap() -> f32 {
        5.0
    }
    fn default_threshold() -> f32 {
        0.1
    }
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            cap: Self::default_cap(),
            threshold: Self::default_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Generations to run; 0 means until interrupted.
    #[serde(default = "RunConfig::default_ticks")]
    pub ticks: u64,
    #[serde(default = "RunConfig::default_report_every")]
    pub report_every: u64,
    #[serde(default = "RunConfig::default_seed")]
    pub seed: u64,
}

impl RunConfig {
    fn default_ticks() -> u64 {
        500
    }
    fn default_report_every() -> u64 {
        25
    }
    fn default_seed() -> u64 {
        0
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: Self::default_ticks(),
            report_every: Self::default_report_every(),
            seed: Self::default_seed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub velocity: VelocityConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl AppConfig {
    fn round_f32(x: f32) -> f32 {
        (x * 1_000_000.0).round() / 1_000_000.0
    }

    fn format_f32_compact(x: f32) -> String {
        let mut s = format!("{:.6}", x);
        while s.contains('.') && s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        if s.is_empty() { "0".to_string() } else { s }
    }

    fn rounded(mut self) -> Self {
        self.evolution.amplitude = Self::round_f32(self.evolution.amplitude);
        self.evolution.frequency = Self::round_f32(self.evolution.frequency);
        self.evolution.shift = Self::round_f32(self.evolution.shift);
        self.evolution.offset = Self::round_f32(self.evolution.offset);
        self.evolution.slope = Self::round_f32(self.evolution.slope);
        self.evolution.window_sec = Self::round_f32(self.evolution.window_sec);
        self.evolution.behaviour = Self::round_f32(self.evolution.behaviour);
        self.evolution.blending = Self::round_f32(self.evolution.blending);
        self.velocity.cap = Self::round_f32(self.velocity.cap);
        self.velocity.threshold = Self::round_f32(self.velocity.threshold);
        self
    }

    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            match fs::read_to_string(path_obj) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => return cfg,
                    Err(err) => {
                        eprintln!("Failed to parse config {path}: {err}. Using defaults.");
                    }
                },
                Err(err) => {
                    eprintln!("Failed to read config {path}: {err}. Using defaults.");
                }
            }
            return Self::default();
        }

        // File does not exist: write defaults and return them.
        let default_cfg = Self::default().rounded();
        if let Ok(text) = toml::to_string_pretty(&default_cfg) {
            let mut commented = String::new();
            for line in text.lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    commented.push('\n');
                } else if trimmed.starts_with('[') && trimmed.ends_with(']') {
                    commented.push_str(line);
                    commented.push('\n');
                } else {
                    let mut out_line = line.to_string();
                    if let Some((lhs, rhs)) = line.split_once('=') {
                        let rhs_trim = rhs.trim();
                        let has_decimal = rhs_trim.contains('.');
                        if (has_decimal || rhs_trim.contains('e') || rhs_trim.contains('E'))
                            && !rhs_trim.contains('"')
                            && rhs_trim != "true"
                            && rhs_trim != "false"
                        {
                            if let Ok(val) = rhs_trim.parse::<f32>() {
                                let mut formatted = Self::format_f32_compact(val);
                                if has_decimal && !formatted.contains('.') {
                                    formatted.push_str(".0");
                                }
                                out_line = format!("{} = {}", lhs.trim(), formatted);
                            }
                        }
                    }
                    commented.push_str("# ");
                    commented.push_str(&out_line);
                    commented.push('\n');
                }
            }
            if let Err(err) = fs::write(path_obj, commented) {
                eprintln!("Failed to write default config to {path}: {err}");
            }
        } else {
            eprintln!("Failed to serialize default config; continuing with defaults");
        }
        default_cfg
    }
}
