//! Integration and unit tests for the DicomStore service.
//!
//! ## Test Modules
//!
//! - **fixtures**: synthetic DICOM files shared by the other modules
//! - **api_tests**: record endpoints end to end through the full middleware stack
//! - **health_api_tests**: probes, metrics and version endpoints
//! - **config_tests**: configuration loading and validation
//! - **error_tests**: error envelope and feedback mapping
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test
//! cargo test api_tests
//! ```


pub mod api_tests;
