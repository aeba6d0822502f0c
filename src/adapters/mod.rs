//! Hardware backends implementing the port traits.
//!
//! - [`sim`]: in-memory lines, touch chip and ADC for host runs and tests
//! - [`hal`]: output lines over any `embedded-hal` 1.0 implementation

pub mod hal;
pub mod sim;
