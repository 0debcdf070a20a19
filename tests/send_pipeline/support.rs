//! Shared helpers for send pipeline tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use broker_sender::broker::{HandleId, InMemoryBroker, Lifecycle};
use broker_sender::{BrokerSender, Resource, SenderConfig};
use tracing_subscriber::EnvFilter;

pub const ORDERS: &str = "orders.in";

pub fn config() -> SenderConfig {
    SenderConfig::new(ORDERS).unwrap()
}

pub fn sender(broker: &InMemoryBroker, config: SenderConfig) -> BrokerSender<InMemoryBroker> {
    BrokerSender::new(broker.clone(), config)
}

/// The lifecycle of one complete, successful send whose connection got
/// handle id `connection`.
pub fn full_lifecycle(connection: u64) -> Vec<Lifecycle> {
    let id = |offset| HandleId {
        connection,
        handle: connection + offset,
    };
    vec![
        Lifecycle::Opened(Resource::Connection, id(0)),
        Lifecycle::Opened(Resource::Session, id(1)),
        Lifecycle::Opened(Resource::Producer, id(2)),
        Lifecycle::Closed(Resource::Producer, id(2)),
        Lifecycle::Closed(Resource::Session, id(1)),
        Lifecycle::Closed(Resource::Connection, id(0)),
    ]
}

/// Resources closed, in the order they were closed.
pub fn closed_order(broker: &InMemoryBroker) -> Vec<Resource> {
    broker
        .lifecycle()
        .into_iter()
        .filter_map(|event| match event {
            Lifecycle::Closed(resource, _) => Some(resource),
            Lifecycle::Opened(..) => None,
        })
        .collect()
}

/// Resources opened, in the order they were opened.
pub fn opened_order(broker: &InMemoryBroker) -> Vec<Resource> {
    broker
        .lifecycle()
        .into_iter()
        .filter_map(|event| match event {
            Lifecycle::Opened(resource, _) => Some(resource),
            Lifecycle::Closed(..) => None,
        })
        .collect()
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a subscriber that records this crate's log output.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("broker_sender=trace"))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    let output = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (output, logs)
}
