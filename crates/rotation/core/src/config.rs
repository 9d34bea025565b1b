/// Tunable parameters for one solver session.
///
/// Every section falls back to its defaults when omitted, so an empty
/// document is a valid configuration.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverConfig {
    pub timing: TimingConfig,
    pub engine: EngineConfig,
    pub frame: FrameConfig,
    pub bus: BusConfig,
}

/// Cycle clock parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimingConfig {
    /// Fraction of the cycle length below which a weave counts as late.
    pub late_weave_fraction: f32,
    /// Lock time assumed for actions whose definition omits one.
    pub default_lock_time: f32,
    /// Floor applied to every cycle length, in seconds.
    pub min_cycle_length: f32,
    /// Number of committed actions remembered for "last used" checks.
    pub history_len: usize,
}

impl TimingConfig {
    pub const DEFAULT_LATE_WEAVE_FRACTION: f32 = 0.4;
    pub const DEFAULT_LOCK_TIME: f32 = 0.6;
    pub const DEFAULT_MIN_CYCLE_LENGTH: f32 = 0.01;
    pub const DEFAULT_HISTORY_LEN: usize = 8;
    /// Upper bound for `history_len`.
    pub const MAX_HISTORY_LEN: usize = 32;

    /// Minimum cycle length actually used, never below the hard floor.
    pub fn cycle_floor(&self) -> f32 {
        if self.min_cycle_length.is_finite() {
            self.min_cycle_length.max(Self::DEFAULT_MIN_CYCLE_LENGTH)
        } else {
            Self::DEFAULT_MIN_CYCLE_LENGTH
        }
    }

    /// Late-weave fraction clamped into `0.0..=1.0`.
    pub fn weave_fraction(&self) -> f32 {
        if self.late_weave_fraction.is_finite() {
            self.late_weave_fraction.clamp(0.0, 1.0)
        } else {
            Self::DEFAULT_LATE_WEAVE_FRACTION
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            late_weave_fraction: Self::DEFAULT_LATE_WEAVE_FRACTION,
            default_lock_time: Self::DEFAULT_LOCK_TIME,
            min_cycle_length: Self::DEFAULT_MIN_CYCLE_LENGTH,
            history_len: Self::DEFAULT_HISTORY_LEN,
        }
    }
}

/// Priority engine parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Maximum weave actions emitted in one tick.
    pub max_weaves_per_tick: usize,
    /// Publish a per-rule trace for every tick.
    pub trace: bool,
}

impl EngineConfig {
    pub const DEFAULT_MAX_WEAVES: usize = 2;
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_weaves_per_tick: Self::DEFAULT_MAX_WEAVES,
            trace: false,
        }
    }
}

/// Frame loop parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FrameConfig {
    /// Interval between ticks in milliseconds.
    pub interval_ms: u64,
}

impl FrameConfig {
    pub const DEFAULT_INTERVAL_MS: u64 = 16;
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::DEFAULT_INTERVAL_MS,
        }
    }
}

/// Event bus parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BusConfig {
    /// Per-topic broadcast buffer.
    pub capacity: usize,
}

impl BusConfig {
    pub const DEFAULT_CAPACITY: usize = 256;
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
        }
    }
}
