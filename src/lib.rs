//! # DicomStore Backend Library
//!
//! A small REST service that stores uploaded DICOM files on local disk and
//! serves their raw bytes, selected tag values and a PNG rendering of the
//! first frame.
//!
//! ## Architecture
//!
//! - **Axum**: HTTP server and routing
//! - **Tokio**: async runtime; DICOM decoding runs on the blocking pool
//! - **dicom-rs**: parsing, dictionary lookups and pixel decoding
//! - **Serde**: JSON envelopes
//!
//! ## Core Components
//!
//! - [`storage`]: one file per record under a fixed directory
//! - [`dicom`]: tag extraction and PNG rendering
//! - [`routes`]: HTTP handlers
//! - [`app`]: router plus middleware stack
//! - [`config`]: layered configuration
//! - [`error`]: handler error type and the `{success, feedback}` error envelope
//! - [`metrics`]: request counters
//! - [`middleware`]: security headers and request validation
//! - [`state`]: shared application state
//! - [`types`]: response envelopes and query DTOs

pub mod app;
pub mod config;
pub mod dicom;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod storage;
pub mod types;

#[cfg(test)]
mod tests;
