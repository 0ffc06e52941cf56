//! mapsync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `Dataset`, `SchemaComment`, `ProjectVersion`, changeset
//!   summaries and detail records, the `SyncOutcome` result type
//! - **Port definitions** - Traits for adapters: `IDiffEngine`,
//!   `IProjectClient`, `ISchemaCatalog`
//! - **Configuration** - Typed config with validation for schema/project pairs
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure types with no external I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`mapsync-geodiff`, `mapsync-remote`, `mapsync-pg`).
//! The synchronization state machine in `mapsync-engine` drives domain
//! transitions through the port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
