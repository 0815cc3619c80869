//! Minute-of-day arithmetic. All scheduling works in integer minutes on the
//! local wall clock; the only calendar awareness is "today vs tomorrow".

use std::fmt;

use chrono::Timelike;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const MINUTES_PER_DAY: u32 = 1440;

/// Minute of the local day, `[0, 1440)`. Parses and prints as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const fn hm(hour: u32, minute: u32) -> Self {
        Self((((hour * 60) + minute) % MINUTES_PER_DAY) as u16)
    }

    pub const fn from_minutes(minutes: u32) -> Self {
        Self((minutes % MINUTES_PER_DAY) as u16)
    }

    pub const fn minutes(self) -> u32 {
        self.0 as u32
    }

    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| TimeParseError(s.to_owned()))?;
        let hour: u32 = h.parse().map_err(|_| TimeParseError(s.to_owned()))?;
        let minute: u32 = m.parse().map_err(|_| TimeParseError(s.to_owned()))?;
        if hour >= 24 || minute >= 60 {
            return Err(TimeParseError(s.to_owned()));
        }
        Ok(Self::hm(hour, minute))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid time `{0}`, expected HH:MM")]
pub struct TimeParseError(String);

/// Absolute minute on the controller's two-day horizon, counted from today
/// 00:00. Values of 1440 and above land on a following day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AbsMinute(u32);

impl AbsMinute {
    pub const fn new(days: u32, hour: u32, minute: u32) -> Self {
        Self(((days * 24 + hour) * 60) + minute)
    }

    pub const fn today(t: TimeOfDay) -> Self {
        Self(t.minutes())
    }

    pub const fn tomorrow(t: TimeOfDay) -> Self {
        Self(MINUTES_PER_DAY + t.minutes())
    }

    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    pub const fn minutes(self) -> u32 {
        self.0
    }

    pub const fn time_of_day(self) -> TimeOfDay {
        TimeOfDay::from_minutes(self.0)
    }

    pub fn round_down(self, grid: u32) -> Self {
        Self(self.0 - self.0 % grid)
    }

    pub fn round_up(self, grid: u32) -> Self {
        Self(self.0 + (grid - self.0 % grid) % grid)
    }

    /// Push forward by whole days until strictly after `now` today.
    pub fn next_after(self, now: TimeOfDay) -> Self {
        let mut m = self.0;
        while m <= now.minutes() {
            m += MINUTES_PER_DAY;
        }
        Self(m)
    }

    /// Minutes from `now` today until this instant. The wake timer hardware
    /// takes a delay, never an absolute time; a target already behind `now`
    /// is wrapped forward a day rather than handed over negative.
    pub fn delay_from(self, now: TimeOfDay) -> u32 {
        let mut delta = self.0 as i64 - now.minutes() as i64;
        while delta <= 0 {
            delta += MINUTES_PER_DAY as i64;
        }
        delta as u32
    }
}

impl fmt::Display for AbsMinute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 / MINUTES_PER_DAY {
            0 => write!(f, "today {}", self.time_of_day()),
            1 => write!(f, "tomorrow {}", self.time_of_day()),
            n => write!(f, "in {n} days {}", self.time_of_day()),
        }
    }
}

impl Serialize for AbsMinute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Source of "what minute is it". The supervisor never reads the wall clock
/// directly so tests can pin time.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimeOfDay;
}

/// The local wall clock.
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> TimeOfDay {
        let t = chrono::Local::now().time();
        TimeOfDay::hm(t.hour(), t.minute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        assert_eq!(TimeOfDay::parse("05:30").unwrap(), TimeOfDay::hm(5, 30));
        assert_eq!(TimeOfDay::hm(23, 5).to_string(), "23:05");
        assert!(TimeOfDay::parse("24:00").is_err());
        assert!(TimeOfDay::parse("12:60").is_err());
        assert!(TimeOfDay::parse("noon").is_err());
    }

    #[test]
    fn day_offset_arithmetic() {
        assert_eq!(AbsMinute::new(1, 12, 0).minutes(), 2160);
        assert_eq!(AbsMinute::tomorrow(TimeOfDay::hm(9, 0)).minutes(), 1980);
        assert_eq!(
            AbsMinute::new(1, 9, 0).time_of_day(),
            TimeOfDay::hm(9, 0)
        );
    }

    #[test]
    fn rounding() {
        assert_eq!(AbsMinute::from_minutes(907).round_down(15).minutes(), 900);
        assert_eq!(AbsMinute::from_minutes(907).round_up(15).minutes(), 915);
        assert_eq!(AbsMinute::from_minutes(900).round_down(15).minutes(), 900);
        assert_eq!(AbsMinute::from_minutes(900).round_up(15).minutes(), 900);
    }

    #[test]
    fn next_after_wraps_whole_days() {
        let morning = AbsMinute::today(TimeOfDay::hm(8, 0));
        assert_eq!(morning.next_after(TimeOfDay::hm(2, 0)).minutes(), 480);
        assert_eq!(morning.next_after(TimeOfDay::hm(8, 0)).minutes(), 1920);
        assert_eq!(morning.next_after(TimeOfDay::hm(8, 20)).minutes(), 1920);
    }

    #[test]
    fn delay_is_always_positive() {
        let wake = AbsMinute::tomorrow(TimeOfDay::hm(12, 0));
        assert_eq!(wake.delay_from(TimeOfDay::hm(10, 0)), 1560);
        // Target nominally behind "now" wraps forward instead of going
        // negative.
        let past = AbsMinute::today(TimeOfDay::hm(8, 0));
        assert_eq!(past.delay_from(TimeOfDay::hm(9, 0)), 1380);
        assert_eq!(past.delay_from(TimeOfDay::hm(8, 0)), 1440);
    }

    #[test]
    fn display_names_the_day() {
        assert_eq!(
            AbsMinute::today(TimeOfDay::hm(15, 0)).to_string(),
            "today 15:00"
        );
        assert_eq!(
            AbsMinute::tomorrow(TimeOfDay::hm(9, 0)).to_string(),
            "tomorrow 09:00"
        );
    }
}
