//! Doshii cloud protocol types
//!
//! - [`ws`]: events pushed over the socket feed
//! - [`report`]: bodies of the REST reporting calls

pub mod report;
pub mod ws;

pub use report::*;
pub use ws::*;
