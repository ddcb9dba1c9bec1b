//! Threshold evaluation and the alert lifecycle.
//!
//! Plugins turn samples into a [`Status`] through their [`Limits`]; alerting
//! samples feed the [`AlertLog`], and configured commands go through the
//! [`ActionDispatcher`].

pub mod actions;
pub mod events;
pub mod thresholds;

pub use actions::{ActionDispatcher, ActionRunner, CommandRunner};
pub use events::{AlertEntry, AlertLog, AlertSample};
pub use thresholds::{Limits, Status, Threshold, ThresholdBoard};
