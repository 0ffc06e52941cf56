//! mapsync geodiff adapter - IDiffEngine over the geodiff executable
//!
//! Implements the `IDiffEngine` port from `mapsync-core` by spawning the
//! external `geodiff` binary. It is a driven (secondary) adapter in the
//! hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`GeodiffEngine`] - Full `IDiffEngine` implementation
//! - [`runner`] - Process invocation with stderr capture and exit checking
//!
//! All process details (argument layout, driver flags, JSON output files)
//! stay inside this crate; the synchronization engine only sees typed
//! operations.

pub mod engine;
pub mod runner;

pub use engine::GeodiffEngine;
