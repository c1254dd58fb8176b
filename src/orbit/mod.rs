//! Orbital elements: validation, retrieval and position queries
//!
//! - `elements`: validated two-line element sets and the ordered relay catalog
//! - `fetch`: bounded-concurrency retrieval with per-id failure isolation
//! - `source`: SGP4 (via satkit) positions in the Earth-fixed frame

mod elements;
mod fetch;
mod source;

pub use elements::*;
pub use fetch::*;
pub use source::*;

#[cfg(test)]
pub(crate) use elements::tests as test_support;
