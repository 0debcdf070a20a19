//! Mapping destination names to broker destinations.

use crate::broker::Session;
use crate::error::BrokerError;

/// Resolves a configured destination name into a destination of session `S`.
///
/// Closures of the matching shape implement this trait, so a one-off
/// resolver can be passed inline.
pub trait DestinationResolver<S: Session>: Send + Sync {
    fn resolve(&self, session: &S, name: &str) -> Result<S::Destination, BrokerError>;
}

impl<S, F> DestinationResolver<S> for F
where
    S: Session,
    F: Fn(&S, &str) -> Result<S::Destination, BrokerError> + Send + Sync,
{
    fn resolve(&self, session: &S, name: &str) -> Result<S::Destination, BrokerError> {
        self(session, name)
    }
}

/// Resolves `topic:<name>` to a topic and `queue:<name>` or a bare `<name>`
/// to a queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixDestinationResolver;

impl PrefixDestinationResolver {
    pub const TOPIC_PREFIX: &'static str = "topic:";
    pub const QUEUE_PREFIX: &'static str = "queue:";
}

impl<S: Session> DestinationResolver<S> for PrefixDestinationResolver {
    fn resolve(&self, session: &S, name: &str) -> Result<S::Destination, BrokerError> {
        let (topic, bare) = match name.strip_prefix(Self::TOPIC_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, name.strip_prefix(Self::QUEUE_PREFIX).unwrap_or(name)),
        };
        if bare.is_empty() {
            return Err(BrokerError::InvalidDestination(name.to_string()));
        }
        if topic {
            session.create_topic(bare)
        } else {
            session.create_queue(bare)
        }
    }
}
