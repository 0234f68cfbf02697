//! Fleet construction and ownership.
//!
//! ## Key Responsibilities
//! 1. Provision one coordinator plus N agents in bounded, readiness-gated
//!    chunks (chunk k+1 never spawns before chunk k verifies).
//! 2. Retry failed spawns under the configured backoff policy, destroying the
//!    half-created node between attempts.
//! 3. Expose random selection queries over the agent fleet for scenarios.
//! 4. Tear the fleet down, honoring the cleanup policy.

mod environment;
mod selection;

pub use environment::*;
