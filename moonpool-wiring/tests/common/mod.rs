//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use moonpool_wiring::prelude::*;

/// Install a test log subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .try_init();
}

/// Unhandled sink that records the message types it saw.
#[derive(Clone, Default)]
pub struct RecordingSink {
    seen: Arc<Mutex<Vec<TypeKey>>>,
    calls: Arc<AtomicUsize>,
}

impl RecordingSink {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<TypeKey> {
        self.seen.lock().expect("sink lock").clone()
    }
}

impl UnhandledSink for RecordingSink {
    fn unhandled(&self, _owner: TypeKey, message: &dyn Message) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .expect("sink lock")
            .push(message.message_type());
    }
}
