//! The declarative stay-up/wake policy. Thresholds, windows, rounding and
//! the tier table are all data so that a hardware generation with different
//! numbers is a config edit, not a code change.

use serde::Deserialize;

use super::clock::TimeOfDay;

/// Which way a computed wake time snaps onto the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundDir {
    Down,
    Up,
}

/// Per-tier wake choice: a delay past the end of the stay-up, or a fixed
/// time tomorrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WakePolicy {
    After { after_mins: u32 },
    At { at: TimeOfDay },
}

/// One battery bracket. Matched on `level >= min_level`, top-down,
/// first match wins.
#[derive(Debug, Clone, Deserialize)]
pub struct Tier {
    pub min_level: u8,
    pub stay_up_mins: u32,
    pub wake: WakePolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulePolicy {
    /// Before this, the node shuts down immediately whatever the battery.
    pub night_until: TimeOfDay,
    /// Fixed wake used by the night and early-morning clauses and as the
    /// late-clamp target.
    pub morning_wake: TimeOfDay,
    /// Between `night_until` and this, a short battery-independent stay-up.
    pub grace_until: TimeOfDay,
    pub grace_stay_up_mins: u32,
    /// Wake times are snapped to this grid (minutes).
    pub round_to_mins: u32,
    pub round: RoundDir,
    /// Rounded wakes at or past this are pushed to the next morning.
    pub late_cutoff: TimeOfDay,
    /// Fallback wake (tomorrow) when the battery is critical or unreadable.
    pub emergency_wake: TimeOfDay,
    pub tiers: Vec<Tier>,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            night_until: TimeOfDay::hm(5, 30),
            morning_wake: TimeOfDay::hm(8, 0),
            grace_until: TimeOfDay::hm(8, 30),
            grace_stay_up_mins: 60,
            round_to_mins: 15,
            round: RoundDir::Down,
            late_cutoff: TimeOfDay::hm(23, 0),
            emergency_wake: TimeOfDay::hm(12, 0),
            tiers: vec![
                Tier {
                    min_level: 80,
                    stay_up_mins: 120,
                    wake: WakePolicy::After { after_mins: 180 },
                },
                Tier {
                    min_level: 70,
                    stay_up_mins: 60,
                    wake: WakePolicy::After { after_mins: 240 },
                },
                Tier {
                    min_level: 60,
                    stay_up_mins: 40,
                    wake: WakePolicy::After { after_mins: 260 },
                },
                Tier {
                    min_level: 50,
                    stay_up_mins: 30,
                    wake: WakePolicy::At { at: TimeOfDay::hm(9, 0) },
                },
                Tier {
                    min_level: 40,
                    stay_up_mins: 15,
                    wake: WakePolicy::At { at: TimeOfDay::hm(9, 0) },
                },
            ],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("round_to_mins must be non-zero")]
    ZeroGrid,
    #[error("tiers must be ordered highest min_level first")]
    UnorderedTiers,
    #[error("night_until must not be after grace_until")]
    InvertedWindows,
}

impl SchedulePolicy {
    /// Shape checks on a loaded policy. The tier table is consulted
    /// top-down, so an unordered table would shadow lower brackets.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.round_to_mins == 0 {
            return Err(PolicyError::ZeroGrid);
        }
        if self.night_until > self.grace_until {
            return Err(PolicyError::InvertedWindows);
        }
        if self
            .tiers
            .windows(2)
            .any(|w| w[0].min_level <= w[1].min_level)
        {
            return Err(PolicyError::UnorderedTiers);
        }
        Ok(())
    }
}
