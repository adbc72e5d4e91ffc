//! Observer hooks around remote session commands.

use crate::error::SessionError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Command name traced around the start-of-request read and TTL renewal.
pub const START_COMMAND: &str = "session.start";

/// Command name traced around the flush transaction.
pub const FLUSH_COMMAND: &str = "session.flush";

/// Receives one start/finish pair per traced command.
pub trait CommandTracer: Send {
    fn command_start(&mut self, target: &str, command: &str, key: &str);

    fn command_finish(&mut self, error: Option<&SessionError>);
}

/// Creates a fresh tracer for each traced command.
pub type TracerFactory = Arc<dyn Fn() -> Box<dyn CommandTracer> + Send + Sync>;

/// Tracer emitting one `tracing` event per finished command.
#[derive(Debug, Default)]
pub struct TracingTracer {
    current: Option<InFlight>,
}

#[derive(Debug)]
struct InFlight {
    target: String,
    command: String,
    key: String,
    started: Instant,
}

impl TracingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory handing out a new `TracingTracer` per command.
    pub fn factory() -> TracerFactory {
        Arc::new(|| Box::new(TracingTracer::new()) as Box<dyn CommandTracer>)
    }
}

impl CommandTracer for TracingTracer {
    fn command_start(&mut self, target: &str, command: &str, key: &str) {
        self.current = Some(InFlight {
            target: target.to_string(),
            command: command.to_string(),
            key: key.to_string(),
            started: Instant::now(),
        });
    }

    fn command_finish(&mut self, error: Option<&SessionError>) {
        let Some(cmd) = self.current.take() else {
            return;
        };
        let elapsed_us = cmd.started.elapsed().as_micros() as u64;

        match error {
            None => debug!(
                target_store = %cmd.target,
                command = %cmd.command,
                key = %cmd.key,
                elapsed_us,
                success = true,
                "Session command finished"
            ),
            Some(err) => warn!(
                target_store = %cmd.target,
                command = %cmd.command,
                key = %cmd.key,
                elapsed_us,
                success = false,
                error = %err,
                "Session command failed"
            ),
        }
    }
}

/// Wraps `fut` in a start/finish pair when a factory is configured.
pub(crate) async fn traced<T, F>(
    factory: Option<&TracerFactory>,
    target: &str,
    command: &str,
    key: &str,
    fut: F,
) -> Result<T, SessionError>
where
    F: Future<Output = Result<T, SessionError>>,
{
    let Some(factory) = factory else {
        return fut.await;
    };

    let mut tracer = factory();
    tracer.command_start(target, command, key);
    let result = fut.await;
    tracer.command_finish(result.as_ref().err());
    result
}
