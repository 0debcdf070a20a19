use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use broker_sender::broker::{InMemoryBroker, Lifecycle};
use broker_sender::{MessageSender, Resource};

use crate::support::{config, sender};

const THREADS: usize = 8;
const SENDS_PER_THREAD: usize = 25;

#[test]
fn concurrent_sends_use_independent_resources() {
    let broker = InMemoryBroker::new();
    let sender = Arc::new(sender(&broker, config()));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let sender = Arc::clone(&sender);
            thread::spawn(move || {
                for i in 0..SENDS_PER_THREAD {
                    sender
                        .send_json(&format!(r#"{{"thread":{},"seq":{}}}"#, t, i))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let total = THREADS * SENDS_PER_THREAD;
    assert_eq!(broker.sent().len(), total);
    for resource in [Resource::Connection, Resource::Session, Resource::Producer] {
        assert_eq!(broker.opened(resource), total);
        assert_eq!(broker.closed(resource), total);
    }

    let mut per_connection: BTreeMap<u64, Vec<Lifecycle>> = BTreeMap::new();
    for event in broker.lifecycle() {
        per_connection
            .entry(event.id().connection)
            .or_default()
            .push(event);
    }
    assert_eq!(per_connection.len(), total);
    for (connection, events) in per_connection {
        let shape: Vec<(bool, Resource)> = events
            .iter()
            .map(|event| (matches!(event, Lifecycle::Opened(..)), event.resource()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (true, Resource::Connection),
                (true, Resource::Session),
                (true, Resource::Producer),
                (false, Resource::Producer),
                (false, Resource::Session),
                (false, Resource::Connection),
            ],
            "connection {}",
            connection
        );
        let opened: Vec<_> = events[..3].iter().map(Lifecycle::id).collect();
        let closed: Vec<_> = events[3..].iter().rev().map(Lifecycle::id).collect();
        assert_eq!(opened, closed, "connection {} closed another send's handle", connection);
    }
}

#[test]
fn shared_factory_behind_arc() {
    let broker = Arc::new(InMemoryBroker::new());
    let orders = broker_sender::BrokerSender::new(Arc::clone(&broker), config());
    let audit = broker_sender::BrokerSender::new(
        Arc::clone(&broker),
        broker_sender::SenderConfig::new("topic:audit").unwrap(),
    );

    orders.send_json("{}").unwrap();
    audit.send_json("{}").unwrap();

    let names: Vec<String> = broker
        .sent()
        .iter()
        .map(|m| m.destination.name().to_string())
        .collect();
    assert_eq!(names, vec!["orders.in", "audit"]);
}
