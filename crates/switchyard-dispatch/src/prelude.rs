//! Prelude module - commonly used types for convenient import.
//!
//! Use `use switchyard_dispatch::prelude::*;` to import all essential types.

pub use crate::{
    AtomicCutover, CompositeAdapter, ConsumeGate, ConsumerGroupWorker, CutoverController,
    DeliveryAdapter, DeliveryReceipt, DistributedAdapter, EventHandler, HandlerError,
    InMemoryTransport, InlineAdapter, PublishError, PublishPipeline, PublishResult, Subscriber,
    Transport, TransportError, TransportRecord, WorkerConfig, WorkerState, spawn_workers,
};
