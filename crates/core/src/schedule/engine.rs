//! The boot-time decision: given the minute of day and the battery reading,
//! how long to stay powered and when the board should wake the node again.
//! Pure and deterministic — the live controller and the offline table dump
//! call the same function.

use serde::Serialize;

use super::clock::{AbsMinute, TimeOfDay};
use super::policy::{RoundDir, SchedulePolicy, WakePolicy};

/// Outcome of one evaluation. `reason` doubles as the wall message handed
/// to the host shutdown command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// 0 means shut down immediately.
    pub stay_up_mins: u32,
    /// Strictly in the future relative to `now`, already rounded.
    pub wake_at: AbsMinute,
    pub reason: String,
}

pub fn evaluate(policy: &SchedulePolicy, now: TimeOfDay, level: Option<u8>) -> Decision {
    // Night-time wins over any battery state.
    let (stay_up_mins, wake, reason) = if now < policy.night_until {
        (
            0,
            AbsMinute::today(policy.morning_wake),
            "night-time immediate shutdown".to_owned(),
        )
    } else if now < policy.grace_until {
        (
            policy.grace_stay_up_mins,
            AbsMinute::today(policy.morning_wake),
            format!(
                "early-morning scheduled {}-minute shutdown",
                policy.grace_stay_up_mins
            ),
        )
    } else {
        let tier = level.and_then(|lv| policy.tiers.iter().find(|t| lv >= t.min_level));
        match (tier, level) {
            (Some(tier), Some(lv)) => {
                let wake = match tier.wake {
                    WakePolicy::After { after_mins } => AbsMinute::from_minutes(
                        now.minutes() + tier.stay_up_mins + after_mins,
                    ),
                    WakePolicy::At { at } => AbsMinute::tomorrow(at),
                };
                (
                    tier.stay_up_mins,
                    wake,
                    format!(
                        "scheduled {}-minute shutdown (battery {lv})",
                        tier.stay_up_mins
                    ),
                )
            }
            (_, Some(lv)) => (
                0,
                AbsMinute::tomorrow(policy.emergency_wake),
                format!("battery critical ({lv}), emergency shutdown"),
            ),
            (_, None) => (
                0,
                AbsMinute::tomorrow(policy.emergency_wake),
                "battery unreadable, emergency shutdown".to_owned(),
            ),
        }
    };

    let wake = match policy.round {
        RoundDir::Down => wake.round_down(policy.round_to_mins),
        RoundDir::Up => wake.round_up(policy.round_to_mins),
    };
    let wake = clamp_late(wake, policy);
    // Day-wrap correction: the target must be strictly ahead of `now`.
    let wake_at = wake.next_after(now);

    Decision {
        stay_up_mins,
        wake_at,
        reason,
    }
}

/// The board must never be told to wake in the dead of night: a wake at or
/// past the late cutoff slides to the next morning, one before the morning
/// time slides forward to that day's morning.
fn clamp_late(wake: AbsMinute, policy: &SchedulePolicy) -> AbsMinute {
    use super::clock::MINUTES_PER_DAY;

    let day = wake.minutes() / MINUTES_PER_DAY;
    let tod = wake.time_of_day();
    if tod >= policy.late_cutoff {
        AbsMinute::from_minutes((day + 1) * MINUTES_PER_DAY + policy.morning_wake.minutes())
    } else if tod < policy.morning_wake {
        AbsMinute::from_minutes(day * MINUTES_PER_DAY + policy.morning_wake.minutes())
    } else {
        wake
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::policy::Tier;

    fn policy() -> SchedulePolicy {
        SchedulePolicy::default()
    }

    fn at(minutes: u32) -> TimeOfDay {
        TimeOfDay::from_minutes(minutes)
    }

    const LEVELS: [Option<u8>; 9] = [
        None,
        Some(0),
        Some(10),
        Some(40),
        Some(50),
        Some(60),
        Some(70),
        Some(80),
        Some(100),
    ];

    #[test]
    fn night_suppression_ignores_battery() {
        let p = policy();
        for level in LEVELS {
            for now in (0..330).step_by(7) {
                let d = evaluate(&p, at(now), level);
                assert_eq!(d.stay_up_mins, 0, "now={now} level={level:?}");
                assert_eq!(d.wake_at, AbsMinute::today(p.morning_wake));
                assert_eq!(d.reason, "night-time immediate shutdown");
            }
        }
    }

    #[test]
    fn grace_window_ignores_battery() {
        let p = policy();
        for level in LEVELS {
            for now in (330..510).step_by(11) {
                let d = evaluate(&p, at(now), level);
                assert_eq!(d.stay_up_mins, p.grace_stay_up_mins);
                assert_eq!(d.wake_at.time_of_day(), p.morning_wake);
                // Past the morning time the wake has wrapped to tomorrow.
                assert!(d.wake_at.minutes() > now);
            }
        }
    }

    #[test]
    fn stay_up_monotone_in_level() {
        let p = policy();
        let now = at(720);
        let mut prev = evaluate(&p, now, None).stay_up_mins;
        for lv in 0..=100 {
            let stay = evaluate(&p, now, Some(lv)).stay_up_mins;
            assert!(stay >= prev, "level {lv} shortened the stay-up");
            prev = stay;
        }
    }

    #[test]
    fn wake_is_always_on_grid_and_outside_the_night() {
        let p = policy();
        for level in LEVELS {
            for now in (0..1440).step_by(13) {
                let d = evaluate(&p, at(now), level);
                assert_eq!(d.wake_at.minutes() % p.round_to_mins, 0);
                let tod = d.wake_at.time_of_day();
                assert!(
                    tod >= p.morning_wake && tod < p.late_cutoff,
                    "wake {tod} lands in the suppressed window (now={now}, level={level:?})"
                );
                assert!(d.wake_at.minutes() > now, "wake not in the future");
            }
        }
    }

    #[test]
    fn evaluate_is_pure() {
        let p = policy();
        let a = evaluate(&p, at(615), Some(73));
        let b = evaluate(&p, at(615), Some(73));
        assert_eq!(a, b);
    }

    #[test]
    fn two_am_full_battery_shuts_down_until_morning() {
        let d = evaluate(&policy(), at(120), Some(90));
        assert_eq!(d.stay_up_mins, 0);
        assert_eq!(d.wake_at, AbsMinute::today(TimeOfDay::hm(8, 0)));
    }

    #[test]
    fn ten_am_healthy_battery_takes_the_top_tier() {
        let d = evaluate(&policy(), at(600), Some(85));
        assert_eq!(d.stay_up_mins, 120);
        // 600 + 120 + 180, already a grid multiple, before the cutoff.
        assert_eq!(d.wake_at.minutes(), 900);
    }

    #[test]
    fn unreadable_battery_is_the_emergency_case() {
        let d = evaluate(&policy(), at(600), None);
        assert_eq!(d.stay_up_mins, 0);
        assert_eq!(d.wake_at, AbsMinute::tomorrow(TimeOfDay::hm(12, 0)));
        assert!(d.reason.contains("emergency"));
    }

    #[test]
    fn fixed_tier_wake_lands_tomorrow_morning() {
        let d = evaluate(&policy(), at(600), Some(45));
        assert_eq!(d.stay_up_mins, 15);
        assert_eq!(d.wake_at, AbsMinute::tomorrow(TimeOfDay::hm(9, 0)));
    }

    #[test]
    fn late_relative_wake_is_clamped_to_next_morning() {
        // 22:00 + 120 stay + 180 offset = 03:00 tomorrow, before the morning
        // time: must slide to tomorrow 08:00.
        let d = evaluate(&policy(), at(1320), Some(90));
        assert_eq!(d.wake_at, AbsMinute::tomorrow(TimeOfDay::hm(8, 0)));

        // 20:00 + 120 + 180 = 01:00 tomorrow — same clamp.
        let d = evaluate(&policy(), at(1200), Some(90));
        assert_eq!(d.wake_at, AbsMinute::tomorrow(TimeOfDay::hm(8, 0)));
    }

    #[test]
    fn rounding_direction_is_honored() {
        let mut p = policy();
        p.tiers = vec![Tier {
            min_level: 10,
            stay_up_mins: 20,
            wake: WakePolicy::After { after_mins: 187 },
        }];
        // 600 + 20 + 187 = 807: down → 795, up → 810.
        let down = evaluate(&p, at(600), Some(50));
        assert_eq!(down.wake_at.minutes(), 795);
        p.round = RoundDir::Up;
        let up = evaluate(&p, at(600), Some(50));
        assert_eq!(up.wake_at.minutes(), 810);
    }
}
