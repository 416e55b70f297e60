//! Switchyard Dispatch - dual-path event delivery and consumption.
//!
//! This crate provides:
//! - A publish pipeline that validates events and routes them through a
//!   swappable delivery adapter
//! - Inline, distributed, and composite delivery adapters
//! - A consumer-group worker that heartbeats mid-batch
//! - The consumption cutover flag and the transport boundary
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use switchyard_dispatch::prelude::*;
//! use switchyard_events::{Attributes, EventSchemaRegistry, attributes};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let registry = EventSchemaRegistry::new();
//! registry.register("profile_updated", ["account_id"]).unwrap();
//!
//! let pipeline =
//!     PublishPipeline::new("events", Arc::new(registry), Arc::new(InlineAdapter::new()));
//! pipeline
//!     .subscribe(
//!         "profile_updated",
//!         Subscriber::new("audit", ["account_id"], |_: &Attributes| Ok(())),
//!     )
//!     .unwrap();
//!
//! let receipt = pipeline
//!     .publish("profile_updated", &attributes([("account_id", 42)]))
//!     .await
//!     .unwrap();
//! assert_eq!(receipt, DeliveryReceipt::Inline { handlers: 1 });
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod adapter;
pub mod cutover;
pub mod error;
pub mod pipeline;
pub mod setup;
pub mod subscriber;
pub mod transport;
pub mod worker;

pub use adapter::{
    CompositeAdapter, DeliveryAdapter, DeliveryReceipt, DistributedAdapter, InlineAdapter,
};
pub use cutover::{AtomicCutover, CutoverController, DEFAULT_CUTOVER_VAR, EnvCutover};
pub use error::{AdapterFailure, HandlerError, PublishError, PublishResult, TransportError};
pub use pipeline::PublishPipeline;
pub use subscriber::{EventHandler, Subscriber};
pub use transport::{InMemoryTransport, PartitionView, SubmitAck, Transport, TransportRecord};
pub use worker::{
    BatchReport, ConsumeGate, ConsumerGroupWorker, LivenessTracker, WorkerConfig, WorkerPool,
    WorkerState, WorkerSummary, spawn_workers,
};
