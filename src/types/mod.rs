//! Type system for the lpg language
//!
//! - [`Type`]: the closed set of type constructors
//! - [`IntegerRange`]: bounded integer types and their arithmetic
//! - [`IntervalSet`]: used for integer match exhaustiveness

pub mod core;
pub mod range;

pub use self::core::*;
pub use range::{IntegerRange, IntervalSet};
