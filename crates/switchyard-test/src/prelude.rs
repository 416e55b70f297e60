//! Prelude module - commonly used test helpers for convenient import.

pub use crate::fixtures::{
    ORDER_PLACED, PROFILE_UPDATED, order_attributes, profile_attributes, test_config,
    test_registry, test_worker_config,
};
pub use crate::harness::{DispatchHarness, init_test_logging};
pub use crate::mocks::{FailingHandler, RecordingHandler, RecordingTransport};
