//! checkd core library
//!
//! Everything needed to run monitoring checks by name: the status model and
//! response builder for check bodies, the routine cache and execution
//! isolator, and the dispatcher that ties them to invocation counters and a
//! metrics sink.

pub mod args;
pub mod cache;
pub mod counters;
pub mod dispatch;
pub mod isolate;
pub mod loader;
pub mod lookup;
pub mod probe;
pub mod report;
pub mod response;
pub mod routine;
pub mod sink;
pub mod status;
pub mod telemetry;

pub use cache::RoutineCache;
pub use counters::InvocationCounters;
pub use dispatch::{DispatchError, Dispatcher, DispatcherConfig};
pub use isolate::run_isolated;
pub use loader::{LoadError, RoutineLoader, ScriptLoader, ScriptRoutine, StaticLoader};
pub use lookup::{lookup, percent, stat_value};
pub use report::{parse_report, ParsedReport, PerfValue, ReportParseError};
pub use response::ResponseBuilder;
pub use routine::{CheckContext, CheckResult, CheckRoutine, CheckSignal};
pub use sink::{GraphiteSink, MetricsSink};
pub use status::{Maximum, Minimum, Rule, Severity};
pub use telemetry::init_tracing;

/// checkd version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
