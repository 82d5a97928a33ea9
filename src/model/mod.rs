//! Version-independent filter model.
//!
//! Values are immutable trees compared structurally. They are built by
//! callers or by a decoder and consumed by an encoder; nothing here knows
//! about wire revisions.

mod expr;
mod filter;

pub use expr::*;
pub use filter::*;
