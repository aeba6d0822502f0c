//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the simulation backend and the fakes in `mock_hw`. All tests
//! run on the host with no real hardware required.

mod board_tests;
mod effect_tests;
mod input_tests;
mod mock_hw;
mod task_tests;
