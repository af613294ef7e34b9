//! Check dispatch: cache resolution, pooled execution, counters, metrics.
//!
//! One [`Dispatcher`] instance is shared by every inbound request. It owns the
//! routine cache, the invocation counters, and the optional metrics sink as an
//! explicitly constructed service context — there are no process-wide
//! singletons behind it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::RoutineCache;
use crate::counters::InvocationCounters;
use crate::isolate::run_isolated;
use crate::loader::LoadError;
use crate::report::parse_report;
use crate::routine::CheckRoutine;
use crate::sink::MetricsSink;

/// Errors that cross the dispatcher boundary.
///
/// Everything else — routine errors, pool trouble, unparseable output — is
/// absorbed and expressed as severity-coded report text.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No source exists for the requested check name. Distinct from a check
    /// failure; the invocation counter is not touched.
    #[error("no such check: {name}")]
    NotFound {
        name: String,
        #[source]
        source: LoadError,
    },
}

/// Dispatcher tuning knobs.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Execute routine bodies on the blocking worker pool so a slow check
    /// cannot stall the request-accepting path.
    pub offload: bool,

    /// Leading segment of forwarded metric paths.
    pub metrics_prefix: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            offload: true,
            metrics_prefix: "checkserver".to_string(),
        }
    }
}

/// Executes named checks and accounts for them.
pub struct Dispatcher {
    cache: Arc<RoutineCache>,
    counters: InvocationCounters,
    sink: Option<Arc<dyn MetricsSink>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(cache: Arc<RoutineCache>, config: DispatcherConfig) -> Self {
        Self {
            cache,
            counters: InvocationCounters::new(),
            sink: None,
            config,
        }
    }

    /// Attach a metrics sink; numeric perf fields of every report get
    /// forwarded to it.
    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run the named check and return its report text.
    pub async fn handle(&self, name: &str, args: &[String]) -> Result<String, DispatchError> {
        let routine = self
            .cache
            .resolve(name)
            .map_err(|source| DispatchError::NotFound {
                name: name.to_string(),
                source,
            })?;

        // Argv convention: the check's own invocation name leads.
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(format!("check_{name}"));
        argv.extend_from_slice(args);

        let invocation = Uuid::new_v4();
        info!(event = "check.started", check = %name, invocation = %invocation);

        let output = if self.config.offload {
            self.run_pooled(name, routine, argv).await
        } else {
            run_isolated(name, routine.as_ref(), &argv)
        };

        self.counters.increment(name).await;
        info!(
            event = "check.finished",
            check = %name,
            invocation = %invocation,
            bytes = output.len(),
        );

        if let Some(sink) = &self.sink {
            self.forward_metrics(sink.as_ref(), name, &output).await;
        }

        Ok(output)
    }

    /// Invalidate the cached routine for `name`. Reports whether an entry was
    /// dropped; never fails.
    pub fn reload(&self, name: &str) -> bool {
        let dropped = self.cache.invalidate(name);
        if dropped {
            info!(check = %name, "routine cache entry invalidated");
        }
        dropped
    }

    /// Snapshot of the per-check invocation counters.
    pub async fn counters(&self) -> BTreeMap<String, u64> {
        self.counters.snapshot().await
    }

    /// Execute on the blocking pool, falling back to the calling task when the
    /// pool misbehaves.
    ///
    /// Blank output is read as pool malfunction and retried synchronously.
    /// This is a heuristic, not a timeout: it also swallows checks whose
    /// legitimate output is empty.
    async fn run_pooled(
        &self,
        name: &str,
        routine: Arc<dyn CheckRoutine>,
        argv: Vec<String>,
    ) -> String {
        let task_name = name.to_string();
        let task_routine = Arc::clone(&routine);
        let task_argv = argv.clone();
        let pooled =
            tokio::task::spawn_blocking(move || {
                run_isolated(&task_name, task_routine.as_ref(), &task_argv)
            })
            .await;

        match pooled {
            Ok(output) if !output.trim().is_empty() => output,
            Ok(_) => {
                warn!(check = %name, "worker pool returned blank output; re-running synchronously");
                run_isolated(name, routine.as_ref(), &argv)
            }
            Err(err) => {
                warn!(check = %name, error = %err, "worker pool task failed; re-running synchronously");
                run_isolated(name, routine.as_ref(), &argv)
            }
        }
    }

    /// Forward every numeric perf field of `output` to the sink, then make
    /// sure its flush loop is running. Parse failures mean "no metrics".
    async fn forward_metrics(&self, sink: &dyn MetricsSink, name: &str, output: &str) {
        let parsed = match parse_report(output) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(check = %name, error = %err, "unparseable check output; no metrics forwarded");
                return;
            }
        };

        for (field, perf) in &parsed.perf {
            if let Some(value) = perf.value {
                let path = format!("{}.{}.{}", self.config.metrics_prefix, name, field);
                sink.enqueue(&path, value).await;
            }
        }
        sink.ensure_started().await;
    }
}
