//! mapsync remote adapter - hosted project client
//!
//! Implements the `IProjectClient` port from `mapsync-core`: HTTP access to
//! the project server plus management of the local working copy (the on-disk
//! mirror of one project version). It is a driven (secondary) adapter in the
//! hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`RemoteClient`] - Thin HTTP client for the server API (login, project
//!   info, raw file download, push transactions)
//! - [`WorkingCopy`] - Working-copy layout and metadata: the `.mapsync`
//!   directory with version info, file records and pristine base copies
//! - [`RemoteProjectClient`] - Full `IProjectClient` implementation gluing
//!   the two together

pub mod client;
pub mod provider;
pub mod workdir;

pub use client::RemoteClient;
pub use provider::RemoteProjectClient;
pub use workdir::WorkingCopy;
