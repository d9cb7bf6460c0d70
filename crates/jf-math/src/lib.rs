//! jitflow math utilities.

pub mod math;

pub use math::auc::*;
pub use math::decay::*;
pub use math::moments::*;
pub use math::quantile::*;
