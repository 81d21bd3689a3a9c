//! Challenge and streak rules, free of any storage or HTTP concerns.
//!
//! Every function takes the aggregate it mutates plus an explicit `now`, so
//! callers decide how the aggregate is loaded and persisted.

pub mod calendar;
pub mod challenge;
pub mod error;
pub mod invite;
pub mod notifications;
pub mod poke;
pub mod streak;

pub use error::{ChallengeError, ErrorKind};
