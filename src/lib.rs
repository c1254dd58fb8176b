//! Attenuation calculator
//!
//! Free-space path loss between a ground asset following a trajectory and a
//! constellation of relay satellites propagated from two-line elements.

pub mod attenuation;
pub mod commands;
pub mod data;
pub mod geometry;
pub mod orbit;
