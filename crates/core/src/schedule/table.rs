//! Offline rendering of the full decision table. `birdboxd schedule` prints
//! this so a policy edit can be eyeballed before it is deployed to a node
//! that only boots a few times a day.

use std::fmt::Write;

use super::clock::TimeOfDay;
use super::engine::evaluate;
use super::policy::SchedulePolicy;

/// Battery columns worth showing: the sensor-fault case, one value inside
/// each default bracket, and the extremes.
const LEVELS: [Option<u8>; 8] = [
    None,
    Some(10),
    Some(40),
    Some(50),
    Some(60),
    Some(70),
    Some(85),
    Some(100),
];

pub fn render(policy: &SchedulePolicy) -> String {
    let mut out = String::new();
    for now in (0..24 * 60).step_by(30) {
        let now = TimeOfDay::from_minutes(now);
        for level in LEVELS {
            let d = evaluate(policy, now, level);
            let level = match level {
                Some(v) => format!("{v:>3}"),
                None => "  -".to_owned(),
            };
            let _ = writeln!(
                out,
                "{now}  level {level}  stay {:>3}m  wake {:<15}  {}",
                d.stay_up_mins,
                d.wake_at.to_string(),
                d.reason
            );
        }
    }
    out
}
