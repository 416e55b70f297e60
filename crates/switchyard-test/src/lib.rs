//! Switchyard Test - Shared test utilities for the Switchyard dispatch core.
//!
//! This crate provides mock handlers and transports, fixtures for common
//! schemas, and a harness that wires a pipeline the way the service does.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! switchyard-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use switchyard_test::{DispatchHarness, RecordingHandler, profile_attributes};
//! use switchyard_config::AdapterMode;
//!
//! #[tokio::test]
//! async fn test_inline_publish() {
//!     let harness = DispatchHarness::new(AdapterMode::Inline);
//!     let handler = RecordingHandler::new();
//!     harness.subscribe_profile(&handler);
//!
//!     harness.pipeline.publish("profile_updated", &profile_attributes(1, 2)).await.unwrap();
//!
//!     assert_eq!(handler.count(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
