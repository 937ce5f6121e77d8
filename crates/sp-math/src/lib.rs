//! SpikePhi math utilities.

pub mod math;

pub use math::radix::*;
pub use math::stochastic::*;
