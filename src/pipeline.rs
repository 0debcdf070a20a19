//! The resource-scoped send pipeline.
//!
//! Every send runs through [`SendPipeline::run`], which is the only code that
//! opens and closes broker resources:
//!
//! ```text
//! Idle ─▶ ConnectionOpen ─▶ SessionOpen ─▶ DestinationResolved ─▶ ProducerOpen
//!                                                                      │
//!     Closed ◀── Sent ◀── MessageBuilt ◀── Configured ◀────────────────┘
//! ```
//!
//! A failure at any step skips straight to teardown. Whatever was opened is
//! closed producer first, then session, then connection, and the failure is
//! returned once teardown is done.

use tracing::{debug, trace};

use crate::broker::{AcknowledgeMode, Connection, ConnectionFactory, Producer, Session, SessionOf};
use crate::config::SenderConfig;
use crate::destination::DestinationResolver;
use crate::error::{Resource, SendFailure};
use crate::message::MessageSpec;
use crate::scope::Scoped;

/// Progress of a single send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PipelineState {
    Idle,
    ConnectionOpen,
    SessionOpen,
    DestinationResolved,
    ProducerOpen,
    Configured,
    MessageBuilt,
    Sent,
    Closed,
}

/// One send's worth of collaborators.
///
/// Holds no broker resources itself; each [`SendPipeline::run`] acquires and
/// releases its own connection, session and producer.
pub struct SendPipeline<'a, F, R> {
    factory: &'a F,
    resolver: &'a R,
    config: &'a SenderConfig,
}

impl<'a, F, R> SendPipeline<'a, F, R>
where
    F: ConnectionFactory,
    R: DestinationResolver<SessionOf<F>>,
{
    pub fn new(factory: &'a F, resolver: &'a R, config: &'a SenderConfig) -> Self {
        SendPipeline {
            factory,
            resolver,
            config,
        }
    }

    /// Send `spec` to the configured destination.
    pub fn run(&self, spec: MessageSpec<'_, SessionOf<F>>) -> Result<(), SendFailure> {
        let mut state = PipelineState::Idle;
        let result = self.execute(spec, &mut state);
        // Every scoped resource is released by the time execute returns.
        match &result {
            Ok(()) => trace!(destination = %self.config.destination(), ?state, "send complete"),
            Err(error) => debug!(
                destination = %self.config.destination(),
                failed_after = ?state,
                error = %error,
                "send failed"
            ),
        }
        advance(&mut state, PipelineState::Closed);
        result
    }

    fn execute(
        &self,
        spec: MessageSpec<'_, SessionOf<F>>,
        state: &mut PipelineState,
    ) -> Result<(), SendFailure> {
        let connection = Scoped::new(
            Resource::Connection,
            self.factory
                .create_connection()
                .map_err(SendFailure::acquire(Resource::Connection))?,
        );
        advance(state, PipelineState::ConnectionOpen);

        let session = Scoped::new(
            Resource::Session,
            connection
                .create_session(false, AcknowledgeMode::Auto)
                .map_err(SendFailure::acquire(Resource::Session))?,
        );
        advance(state, PipelineState::SessionOpen);

        let destination = self
            .resolver
            .resolve(&session, self.config.destination())
            .map_err(SendFailure::acquire(Resource::Destination))?;
        advance(state, PipelineState::DestinationResolved);

        let mut producer = Scoped::new(
            Resource::Producer,
            session
                .create_producer(&destination)
                .map_err(SendFailure::acquire(Resource::Producer))?,
        );
        advance(state, PipelineState::ProducerOpen);

        producer
            .set_delivery_mode(self.config.delivery_mode())
            .map_err(SendFailure::ProducerConfiguration)?;
        if let Some(ttl) = self.config.time_to_live() {
            producer
                .set_time_to_live(ttl)
                .map_err(SendFailure::ProducerConfiguration)?;
        }
        advance(state, PipelineState::Configured);

        let message = spec.build(&session)?;
        advance(state, PipelineState::MessageBuilt);

        producer.send(message).map_err(SendFailure::Transmit)?;
        advance(state, PipelineState::Sent);

        Ok(())
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    trace!(from = ?*state, to = ?next, "pipeline");
    *state = next;
}
