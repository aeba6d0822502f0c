//! Boundary types shared by every driver.
//!
//! All interaction with hardware happens through the **port traits** in
//! [`ports`]; the values those ports deliver live in [`events`].

pub mod events;
pub mod ports;
