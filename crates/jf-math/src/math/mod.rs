//! Core math modules.

pub mod auc;
pub mod decay;
pub mod moments;
pub mod quantile;
