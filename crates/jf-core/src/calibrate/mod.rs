//! Threshold calibration.
//!
//! Two procedures turn a score distribution into a decision threshold:
//! - Operating-point search: the threshold maximizing the G-mean of the two
//!   class recalls on a labeled sample.
//! - Quantile calibration: the `q`-th quantile of an unlabeled sample, used
//!   to recalibrate on the most recent test scores.

mod operating_point;
mod threshold;

pub use operating_point::{analyze_results, OperatingPoint};
pub use threshold::{calculate_th_from_test, tail};
