//! Power controller for a solar-powered, battery-backed field camera node.
//!
//! Each boot, the daemon decides how long to stay powered from the time of
//! day and the battery charge, keeps the external hardware watchdog alive
//! while up, and schedules the wake timer before handing the host off to
//! shutdown. The decision itself is a pure function over a declarative
//! policy table; everything hardware-shaped sits behind traits.

pub mod config;
pub mod controller;
pub mod device;
pub mod schedule;
