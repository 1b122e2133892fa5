//! Trace replay for `lecar-cache`.
//!
//! Reads request traces, feeds every request through a LeCaR cache and
//! reports how it fared.

pub mod input;
pub mod models;
pub mod runner;
pub mod stats;
