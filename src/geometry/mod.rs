//! Earth geometry and radio link models
//!
//! - `ellipsoid`: oblate-spheroid Earth and the line-of-sight occlusion test
//! - `link_budget`: free-space path loss
//! - `geodesy`: geodetic <-> Earth-fixed Cartesian conversion (via satkit)

mod ellipsoid;
mod geodesy;
mod link_budget;

pub use ellipsoid::*;
pub use geodesy::*;
pub use link_budget::*;
