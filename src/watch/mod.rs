//! Event watching over the aggregated cluster log stream.
//!
//! ## Key Responsibilities
//! 1. Define the [`EventWatch`] contract: arm before the triggering action,
//!    match regex patterns against lines that arrive after arming, wait with
//!    bounded timeouts.
//! 2. Provide the file-tailing implementation used against the control host's
//!    aggregated syslog.
//!
//! Watchers are armed strictly before the action that can produce a matching
//! event; patterns may be set or extended after arming without losing events,
//! because matching replays everything captured since the armed position.

mod log_watcher;
mod watcher;

pub use log_watcher::*;
pub use watcher::*;
