use clap::ValueEnum;
use thiserror::Error;

/// How the raw correlation-weighted average is centered before it is
/// reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CenterMode {
    /// Responses are centered on the scale midpoint before weighting, so
    /// a neutral response maps to 0 and negative weights invert naturally.
    PosCentered,
    /// The weighted average is reported on the raw response scale.
    Raw,
}

impl CenterMode {
    pub fn label(&self) -> &'static str {
        match self {
            CenterMode::PosCentered => "pos_centered",
            CenterMode::Raw => "raw",
        }
    }
}

/// Bounds of the numeric judgment scale shared by every run file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseScale {
    pub min: f64,
    pub max: f64,
}

impl ResponseScale {
    /// The six-point PVQ Likert scale ("not like me at all" .. "very much
    /// like me") used by the portrait battery.
    pub fn likert_6() -> Self {
        Self { min: 1.0, max: 6.0 }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("weight threshold {0} outside [0, 1)")]
    ThresholdOutOfRange(f64),
    #[error("response scale [{min}, {max}] is not a valid range")]
    InvalidScale { min: f64, max: f64 },
    #[error("coverage floor {0} outside [0, 1]")]
    CoverageFloorOutOfRange(f64),
}

/// Parameters of one scoring run. Validated once at startup; every output
/// file produced under a config embeds its label so differently configured
/// runs never collide on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreConfig {
    pub threshold: f64,
    pub center_mode: CenterMode,
    pub scale: ResponseScale,
    pub coverage_floor: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            center_mode: CenterMode::PosCentered,
            scale: ResponseScale::likert_6(),
            coverage_floor: 0.5,
        }
    }
}

impl ScoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || self.threshold < 0.0 || self.threshold >= 1.0 {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold));
        }
        if !self.scale.min.is_finite()
            || !self.scale.max.is_finite()
            || self.scale.min >= self.scale.max
        {
            return Err(ConfigError::InvalidScale {
                min: self.scale.min,
                max: self.scale.max,
            });
        }
        if !self.coverage_floor.is_finite()
            || self.coverage_floor < 0.0
            || self.coverage_floor > 1.0
        {
            return Err(ConfigError::CoverageFloorOutOfRange(self.coverage_floor));
        }
        Ok(())
    }

    pub fn label(&self) -> String {
        format!("{}_{}", self.threshold, self.center_mode.label())
    }
}
