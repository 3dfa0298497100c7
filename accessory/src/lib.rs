//! Slide Curtain Accessory Bridge
//!
//! Bridges a single Slide curtain controller into a smart-home accessory
//! platform. The device reports only a raw position on an inverted scale;
//! this crate converts between the two encodings, reconciles polled
//! readings into current/target position and motion state, and exposes the
//! result as a small capability surface the accessory host binds to its
//! characteristics.

mod accessory;
mod config;
mod error;
mod position;
mod reconciler;

pub use accessory::*;
pub use config::*;
pub use error::*;
pub use position::*;
pub use reconciler::*;
