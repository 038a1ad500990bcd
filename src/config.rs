//! Configuration for the timegrapher core.
//!
//! Every section has a `Default` matching the built-in constants, so a
//! config file only needs the keys it wants to change:
//!
//! ```toml
//! [watch]
//! bph = 28800
//! lift_angle = 50
//!
//! [display]
//! trace_zoom = 4
//! ```

use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::constants::{
    DEFAULT_LA, DEFAULT_ZOOM, MAX_BPH, MAX_LA, MAX_REFRESH_HZ, MAX_ZOOM, MIN_BPH, MIN_LA,
    MIN_REFRESH_HZ, MIN_ZOOM,
};
use crate::error::{Result, TickgraphError};

/// Beat rate selection: either guessed from the measured period or pinned by the user.
///
/// # Parsing
/// Anything that is not an integer in `[MIN_BPH, MAX_BPH]` parses as
/// `Automatic`, so parsing never fails.
///
/// ```
/// use tickgraph::config::BphSetting;
///
/// let bph: BphSetting = "28800".parse().unwrap();
/// assert_eq!(bph, BphSetting::Fixed(28800));
/// let bph: BphSetting = "Automatic".parse().unwrap();
/// assert_eq!(bph, BphSetting::Automatic);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "BphValue")]
pub enum BphSetting {
    #[default]
    Automatic,
    Fixed(u32),
}

impl BphSetting {
    /// Pin to `bph` if it is within the accepted range, else fall back to `Automatic`.
    pub fn from_value(bph: i64) -> Self {
        if (MIN_BPH as i64..=MAX_BPH as i64).contains(&bph) {
            Self::Fixed(bph as u32)
        } else {
            log::warn!("bph {} outside [{}, {}], using automatic", bph, MIN_BPH, MAX_BPH);
            Self::Automatic
        }
    }

    /// Hint passed to the analysis engine; 0 means "no preference".
    pub fn hint(&self) -> u32 {
        match self {
            Self::Automatic => 0,
            Self::Fixed(bph) => *bph,
        }
    }

    pub fn fixed(&self) -> Option<u32> {
        match self {
            Self::Automatic => None,
            Self::Fixed(bph) => Some(*bph),
        }
    }
}

impl fmt::Display for BphSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Automatic => write!(f, "Automatic"),
            Self::Fixed(bph) => write!(f, "{}", bph),
        }
    }
}

impl FromStr for BphSetting {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<i64>() {
            Ok(n) => Self::from_value(n),
            Err(_) => {
                if !s.eq_ignore_ascii_case("automatic") {
                    log::warn!("Unrecognised bph {:?}, using automatic", s);
                }
                Self::Automatic
            }
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BphValue {
    Number(i64),
    Text(String),
}

impl From<BphValue> for BphSetting {
    fn from(value: BphValue) -> Self {
        match value {
            BphValue::Number(n) => Self::from_value(n),
            BphValue::Text(s) => s.parse().unwrap_or_default(),
        }
    }
}

/// Clamp a user supplied lift angle: out-of-range values reset to the default.
pub fn sanitize_lift_angle(la: f64) -> f64 {
    if (MIN_LA..=MAX_LA).contains(&la) {
        la
    } else {
        log::warn!("Lift angle {} outside [{}, {}], using {}", la, MIN_LA, MAX_LA, DEFAULT_LA);
        DEFAULT_LA
    }
}

/// System-wide timegrapher configuration
///
/// # Example
/// ```
/// use tickgraph::config::TimegrapherConfig;
///
/// let config = TimegrapherConfig::from_toml_str("[watch]\nlift_angle = 44\n").unwrap();
/// assert_eq!(config.watch.lift_angle, 44.0);
/// assert_eq!(config.display.refresh_hz, 10.0);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimegrapherConfig {
    pub audio: AudioConfig,
    pub display: DisplayConfig,
    pub watch: WatchConfig,
}

/// Audio clock configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Nominal sample rate the engine is opened with, in Hz
    pub sample_rate: u32,
    /// Measured sound card rate, when it differs from the nominal one
    pub real_sample_rate: Option<f64>,
}

impl AudioConfig {
    /// Sample rate used to convert sample counts into time
    pub fn effective_sample_rate(&self) -> f64 {
        self.real_sample_rate.unwrap_or(self.sample_rate as f64)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            real_sample_rate: None,
        }
    }
}

/// Chart refresh configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Refresh ticks per second
    pub refresh_hz: f64,
    /// Initial paperstrip zoom (sweeps per row, 1-20)
    pub trace_zoom: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_hz: 10.0,
            trace_zoom: DEFAULT_ZOOM,
        }
    }
}

/// Watch under test
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub bph: BphSetting,
    /// Lift angle in degrees
    pub lift_angle: f64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            bph: BphSetting::Automatic,
            lift_angle: DEFAULT_LA,
        }
    }
}

impl TimegrapherConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| TickgraphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    fn validate(&mut self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(TickgraphError::Config("sample_rate must be positive".into()));
        }
        if let Some(real) = self.audio.real_sample_rate
            && !(real.is_finite() && real > 0.0)
        {
            return Err(TickgraphError::Config(format!(
                "real_sample_rate must be positive, got {}",
                real
            )));
        }
        let refresh_hz = self.display.refresh_hz;
        if !(MIN_REFRESH_HZ..=MAX_REFRESH_HZ).contains(&refresh_hz) {
            return Err(TickgraphError::Config(format!(
                "refresh_hz must be within [{}, {}], got {}",
                MIN_REFRESH_HZ, MAX_REFRESH_HZ, refresh_hz
            )));
        }
        self.display.trace_zoom = self.display.trace_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.watch.lift_angle = sanitize_lift_angle(self.watch.lift_angle);
        Ok(())
    }
}
