//! # Ground-Motion Record Processing Core
//!
//! This crate implements the record-processing pipeline used to compare
//! simulated and observed ground-motion records across earthquake scenarios:
//! the chain that turns a raw time series plus a requested set of processing
//! operations (unit conversion, filtering, integration, differentiation,
//! tapering, response spectra) into a cached, reusable derived series.
//!
//! Derived series are deduplicated through a content-addressed cache keyed
//! by the semantic identity of a (source record, operation chain, target
//! unit) triple: two requests that differ only in representation hit the
//! same entry, while requests that differ in any processing parameter never
//! collide.
//!
//! ## Crate structure
//!
//! - **`waveform`**: the immutable sampled-series type with its unit kind
//!   and component label.
//! - **`descriptor`**: the canonical, order-sensitive description of a
//!   processing chain, with unit-flow validation.
//! - **`transform`**: the pure numeric transforms (Butterworth filtering,
//!   Kaiser tapers, integration/differentiation, response spectra).
//! - **`fingerprint`**: deterministic cache-key derivation via SHA-256.
//! - **`store`**: the abstract key-value interface plus in-memory and disk
//!   backends.
//! - **`cache`**: the content-addressed cache with single-flight compute
//!   gates and per-record invalidation.
//! - **`resolver`**: the public entry point turning a request into a
//!   waveform, with injected collaborators.
//! - **`config`**: settings loaded from TOML files.
//! - **`error`**: the crate-wide `GmError` enum.
//!
//! Incident/station metadata management, project-folder layout, plotting,
//! and the persistence engine itself are external collaborators and are not
//! reimplemented here.

pub mod cache;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod fingerprint;
pub mod resolver;
pub mod store;
pub mod transform;
pub mod waveform;

pub use cache::RecordCache;
pub use config::Settings;
pub use descriptor::{Operation, OperationDescriptor, TaperEnd};
pub use error::{GmError, GmResult};
pub use fingerprint::{fingerprint, Fingerprint};
pub use resolver::{RecordLoader, RecordRef, RecordRequest, RecordResolver};
pub use store::{DiskStore, KeyValueStore, MemoryStore};
pub use waveform::{Component, UnitKind, Waveform};
