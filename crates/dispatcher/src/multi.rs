//! MultiBroadcaster - concurrent fan-out to many targets
//!
//! Every call spawns one task per target, gated by a semaphore sized to the
//! concurrency cap, and aggregates the outcome all-or-none: a composite
//! identifier when every target succeeded, one aggregate error otherwise.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use contracts::{
    AggregateError, BroadcastConfig, BroadcastError, Broadcaster, CancelToken, DeliveryId,
    DispatchMode, Logger, Message,
};

use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::registry::Registry;

const DEFAULT_NAME: &str = "multi";

/// Builder for creating a MultiBroadcaster
pub struct MultiBroadcasterBuilder {
    name: String,
    broadcasters: Vec<Arc<dyn Broadcaster>>,
    mode: DispatchMode,
    max_concurrency: Option<usize>,
    logger: Option<Logger>,
}

impl MultiBroadcasterBuilder {
    pub fn new() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            broadcasters: Vec::new(),
            mode: DispatchMode::default(),
            max_concurrency: None,
            logger: None,
        }
    }

    /// Apply mode and concurrency cap from configuration
    pub fn config(self, config: &BroadcastConfig) -> Self {
        Self {
            mode: config.mode,
            max_concurrency: config.max_concurrency,
            ..self
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Cap on targets invoked at once; ignored in sequential mode
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcasters.push(broadcaster);
        self
    }

    /// Resolve each URI through `registry`, in order
    ///
    /// The first failure aborts the whole build and is returned unchanged.
    #[instrument(name = "multi_builder_resolve_uris", skip(self, registry, uris))]
    pub async fn resolve_uris<I, S>(mut self, registry: &Registry, uris: I) -> Result<Self, BroadcastError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for uri in uris {
            let uri = uri.as_ref();
            let broadcaster = registry.resolve(uri).await.inspect_err(|e| {
                warn!(uri = %uri, error = %e, "Failed to create broadcaster");
            })?;
            debug!(uri = %uri, target = broadcaster.name(), "Broadcaster resolved");
            self.broadcasters.push(broadcaster);
        }
        Ok(self)
    }

    pub fn build(self) -> MultiBroadcaster {
        MultiBroadcaster {
            name: self.name,
            broadcasters: self.broadcasters,
            mode: self.mode,
            max_concurrency: self.max_concurrency,
            logger: RwLock::new(self.logger.unwrap_or_default()),
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }
}

impl Default for MultiBroadcasterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Composite broadcaster that fans a message out to every target it holds
///
/// The target list is fixed at construction, so fan-out reads it without locking.
pub struct MultiBroadcaster {
    name: String,
    broadcasters: Vec<Arc<dyn Broadcaster>>,
    mode: DispatchMode,
    max_concurrency: Option<usize>,
    logger: RwLock<Logger>,
    metrics: Arc<DispatchMetrics>,
}

/// Result of one task
enum Outcome<T> {
    Completed(T),
    Failed(BroadcastError),
    /// Scope was cancelled before the target was called
    Skipped,
}

/// Everything the coordinator collected once all tasks finished
struct FanOut<T> {
    values: Vec<T>,
    failures: AggregateError,
    skipped: usize,
}

impl<T> FanOut<T> {
    /// Keep the result only if every target was called and the scope is still live
    fn unless_cancelled(self, cancelled: bool) -> Option<Self> {
        (!cancelled && self.skipped == 0).then_some(self)
    }
}

impl MultiBroadcaster {
    /// Concurrent dispatcher over already-built targets
    pub fn new(broadcasters: Vec<Arc<dyn Broadcaster>>) -> Self {
        broadcasters
            .into_iter()
            .fold(MultiBroadcasterBuilder::new(), MultiBroadcasterBuilder::with_broadcaster)
            .build()
    }

    /// Concurrent dispatcher over the targets addressed by `uris`
    pub async fn from_uris<I, S>(registry: &Registry, uris: I) -> Result<Self, BroadcastError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(MultiBroadcasterBuilder::new()
            .resolve_uris(registry, uris)
            .await?
            .build())
    }

    pub fn builder() -> MultiBroadcasterBuilder {
        MultiBroadcasterBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.broadcasters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.broadcasters.is_empty()
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Names of the held targets, in construction order
    pub fn target_names(&self) -> Vec<&str> {
        self.broadcasters.iter().map(|b| b.name()).collect()
    }

    /// Get counters accumulated across calls
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of semaphore permits for one call
    fn permits(&self) -> usize {
        let targets = self.broadcasters.len().max(1);
        match self.mode {
            DispatchMode::Sequential => 1,
            DispatchMode::Concurrent => self.max_concurrency.unwrap_or(targets).clamp(1, targets),
        }
    }

    fn logger(&self) -> Logger {
        self.logger.read().clone()
    }

    /// Run `call` against every target and wait for all of them
    ///
    /// Returns `None` when `cancel` fires before every task has reported, or
    /// when any task saw the cancellation and never called its target.
    /// Failures are tagged with the target name through `tag`.
    async fn fan_out<T, F, Fut>(
        &self,
        cancel: &CancelToken,
        call: F,
        tag: fn(String, BroadcastError) -> BroadcastError,
    ) -> Option<FanOut<T>>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn Broadcaster>, CancelToken) -> Fut + Send,
        Fut: Future<Output = Result<T, BroadcastError>> + Send + 'static,
    {
        let scope = cancel.child();
        let _scope_guard = scope.drop_guard();
        let permits = Arc::new(Semaphore::new(self.permits()));
        let mut tasks = JoinSet::new();

        for broadcaster in &self.broadcasters {
            let name = broadcaster.name().to_string();
            let scope = scope.clone();
            let permits = Arc::clone(&permits);
            let metrics = Arc::clone(&self.metrics);
            // Targets get their own child so they cannot cancel siblings
            let pending = call(Arc::clone(broadcaster), scope.child());

            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (name, Outcome::Skipped);
                };
                if scope.is_cancelled() {
                    return (name, Outcome::Skipped);
                }

                metrics.inc_dispatched();
                let outcome = match AssertUnwindSafe(pending).catch_unwind().await {
                    Ok(Ok(value)) => Outcome::Completed(value),
                    Ok(Err(e)) => Outcome::Failed(e),
                    Err(_) => Outcome::Failed(BroadcastError::Other("target panicked".to_string())),
                };
                (name, outcome)
            });
        }

        let collect = async {
            let mut values = Vec::with_capacity(self.broadcasters.len());
            let mut failures = AggregateError::new();
            let mut skipped = 0;

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((name, Outcome::Completed(value))) => {
                        self.metrics.inc_delivered();
                        observability::metrics::record_delivery(&name, true);
                        values.push(value);
                    }
                    Ok((name, Outcome::Failed(e))) => {
                        self.metrics.inc_failed();
                        observability::metrics::record_delivery(&name, false);
                        failures.push(tag(name, e));
                    }
                    Ok((_, Outcome::Skipped)) => {
                        self.metrics.inc_skipped();
                        skipped += 1;
                    }
                    Err(e) => {
                        self.metrics.inc_failed();
                        failures.push(tag(self.name.clone(), BroadcastError::Other(e.to_string())));
                    }
                }
            }

            FanOut {
                values,
                failures,
                skipped,
            }
        };

        // Cancellation can land after the check above but before collect finishes
        let fan_out = tokio::select! {
            biased;
            _ = scope.cancelled() => None,
            fan_out = collect => fan_out.unless_cancelled(scope.is_cancelled()),
        };

        // Tasks still in the set are aborted on return
        self.metrics.add_skipped(tasks.len() as u64);
        fan_out
    }
}

#[async_trait]
impl Broadcaster for MultiBroadcaster {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "multi_broadcast_message",
        skip(self, cancel, message),
        fields(targets = self.broadcasters.len(), permits = self.permits())
    )]
    async fn broadcast_message(
        &self,
        cancel: &CancelToken,
        message: &Message,
    ) -> Result<DeliveryId, BroadcastError> {
        let started = Instant::now();
        let logger = self.logger();
        let message = Arc::new(message.clone());

        let outcome = self
            .fan_out(
                cancel,
                move |broadcaster, scope| {
                    let message = Arc::clone(&message);
                    async move { broadcaster.broadcast_message(&scope, &message).await }
                },
                BroadcastError::delivery,
            )
            .await;

        observability::metrics::record_dispatch_duration_ms(started.elapsed().as_secs_f64() * 1000.0);

        match outcome {
            None => {
                logger.in_scope(|| warn!(dispatcher = %self.name, "Broadcast cancelled before all targets completed"));
                Ok(DeliveryId::Null)
            }
            Some(FanOut { values, failures, .. }) if failures.is_empty() => {
                logger.in_scope(|| {
                    info!(dispatcher = %self.name, deliveries = values.len(), "Broadcast delivered")
                });
                Ok(DeliveryId::Composite(values))
            }
            Some(FanOut { failures, .. }) => {
                logger.in_scope(|| {
                    warn!(dispatcher = %self.name, failed = failures.len(), error = %failures, "Broadcast failed")
                });
                Err(BroadcastError::Aggregate(failures))
            }
        }
    }

    #[instrument(
        name = "multi_set_logger",
        skip(self, cancel, logger),
        fields(targets = self.broadcasters.len(), logger = logger.name())
    )]
    async fn set_logger(&self, cancel: &CancelToken, logger: Logger) -> Result<(), BroadcastError> {
        *self.logger.write() = logger.clone();

        let outcome = self
            .fan_out(
                cancel,
                move |broadcaster, scope| {
                    let logger = logger.clone();
                    async move { broadcaster.set_logger(&scope, logger).await }
                },
                BroadcastError::set_logger,
            )
            .await;

        match outcome {
            None => {
                debug!(dispatcher = %self.name, "Set logger cancelled");
                Ok(())
            }
            Some(FanOut { failures, .. }) if failures.is_empty() => Ok(()),
            Some(FanOut { failures, .. }) => Err(BroadcastError::Aggregate(failures)),
        }
    }
}
