use std::collections::HashMap;
use std::time::Duration;

use broker_sender::broker::{Body, Fault, InMemoryBroker, InMemoryDestination};
use broker_sender::{
    DeliveryMode, EncodingError, MessageSender, PayloadSerializer, Resource, SendFailure,
};
use serde::Serialize;

use crate::support::{config, full_lifecycle, sender, ORDERS};

#[test]
fn json_send_opens_one_triple_and_closes_it_in_reverse() {
    let broker = InMemoryBroker::new();
    let sender = sender(&broker, config().with_persistent(true));

    sender.send_json(r#"{"a":1}"#).unwrap();

    assert_eq!(broker.lifecycle(), full_lifecycle(1));
    let sent = broker.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].destination, InMemoryDestination::Queue(ORDERS.into()));
    assert_eq!(sent[0].body, Body::Text(r#"{"a":1}"#.into()));
    assert_eq!(sent[0].delivery_mode, DeliveryMode::Persistent);
    assert_eq!(sent[0].time_to_live, None);
}

struct RefusingSerializer;

impl PayloadSerializer for RefusingSerializer {
    fn serialize<T: Serialize + ?Sized>(&self, _value: &T) -> Result<String, EncodingError> {
        Err(EncodingError::new("cannot encode"))
    }
}

#[test]
fn serializer_failure_never_touches_the_broker() {
    #[derive(Serialize)]
    struct Order {
        id: u32,
    }

    let broker = InMemoryBroker::new();
    let sender = sender(&broker, config()).with_serializer(RefusingSerializer);

    let err = sender.send(&Order { id: 1 }).unwrap_err();

    assert!(matches!(err.cause(), SendFailure::Encoding(_)));
    assert!(broker.lifecycle().is_empty());
    assert!(broker.sent().is_empty());
}

#[test]
fn resolution_failure_closes_session_and_connection_without_producer() {
    let broker = InMemoryBroker::new();
    broker.inject(Fault::CreateDestination);
    let sender = sender(&broker, config());

    let err = sender.send_json("{}").unwrap_err();

    assert!(matches!(
        err.cause(),
        SendFailure::ResourceAcquisition {
            resource: Resource::Destination,
            ..
        }
    ));
    assert_eq!(broker.opened(Resource::Producer), 0);
    assert_eq!(broker.closed(Resource::Producer), 0);
    assert_eq!(
        crate::support::closed_order(&broker),
        vec![Resource::Session, Resource::Connection]
    );
}

#[test]
fn bytes_send_with_ttl_and_property() {
    let broker = InMemoryBroker::new();
    let sender = sender(&broker, config().with_time_to_live(30));
    let properties = HashMap::from([("env".to_string(), "prod".to_string())]);

    sender.send_bytes(&[1, 2, 3], Some(&properties)).unwrap();

    let sent = &broker.sent()[0];
    assert_eq!(sent.time_to_live, Some(Duration::from_millis(30_000)));
    assert_eq!(sent.bytes(), Some(&[1u8, 2, 3][..]));
    assert_eq!(sent.properties.len(), 1);
    assert_eq!(sent.properties.get("env").map(String::as_str), Some("prod"));
}

#[test]
fn topic_prefix_sends_to_topic() {
    let broker = InMemoryBroker::new();
    let sender = sender(
        &broker,
        broker_sender::SenderConfig::new("topic:prices").unwrap(),
    );

    sender.send_json("{}").unwrap();

    assert_eq!(
        broker.sent()[0].destination,
        InMemoryDestination::Topic("prices".into())
    );
}

#[test]
fn every_send_builds_a_fresh_scope() {
    let broker = InMemoryBroker::new();
    let sender = sender(&broker, config());

    sender.send_json("1").unwrap();
    sender.send_json("2").unwrap();

    assert_eq!(broker.opened(Resource::Connection), 2);
    assert_eq!(broker.closed(Resource::Connection), 2);
    let mut expected = full_lifecycle(1);
    expected.extend(full_lifecycle(4));
    assert_eq!(broker.lifecycle(), expected);
}
