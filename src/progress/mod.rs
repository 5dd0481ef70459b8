//! Progress aggregation for the supervisor and executive dashboards.
//!
//! Records are read per user through a [`source::ProgressSource`], bucketed by
//! [`week`], folded into counts by [`reducer`] and turned into percentages and
//! status tiers by [`format`].

pub mod format;
pub mod reducer;
pub mod source;
pub mod week;

#[cfg(test)]
pub mod memory;
