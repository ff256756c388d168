use std::any::Any;

pub mod worker_pool;

pub use worker_pool::{Processor, WorkerPool, WorkerPoolHandle, WorkerReport};

/// Extracts a readable message from a thread panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
