//! Tilegrab - grid-based map tile capture
//!
//! This library turns a destination (a place name or an explicit coordinate
//! box) into a grid of rendered map images. It provides the Web Mercator
//! tile algebra, the capture grid builder, a bounded-concurrency batch
//! scheduler, the geocoding client and the renderer driver, plus the
//! configuration and logging plumbing the CLI sits on.

pub mod config;
pub mod geo;
pub mod geocode;
pub mod grid;
pub mod logging;
pub mod mercator;
pub mod queue;
pub mod render;
pub mod session;

/// Crate version, from the package manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
