//! Utility functions and helpers.

pub mod bitops;

pub use bitops::{is_power_of_two, next_power_of_two};
