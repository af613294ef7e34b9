//! Routine discovery and loading.
//!
//! A check named `X` maps to the source location `check_X` under the
//! configured check directory; that naming rule is what keeps existing check
//! inventories working. Two loaders are provided:
//!
//! - [`ScriptLoader`] resolves `check_X` to an executable on disk and wraps it
//!   as a subprocess-backed routine.
//! - [`StaticLoader`] serves statically compiled routines from an in-memory
//!   registry (embedded checks and tests).

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use anyhow::Context;

use crate::routine::{CheckContext, CheckResult, CheckRoutine};

/// Errors produced while resolving a check name to a routine.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no such file: {}", path.display())]
    NotFound { path: PathBuf },
}

/// Resolves a check name to a runnable routine.
pub trait RoutineLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<Arc<dyn CheckRoutine>, LoadError>;
}

/// Loads `check_X` executables from a check directory.
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    check_dir: PathBuf,
}

impl ScriptLoader {
    pub fn new(check_dir: impl Into<PathBuf>) -> Self {
        Self {
            check_dir: check_dir.into(),
        }
    }
}

impl RoutineLoader for ScriptLoader {
    fn load(&self, name: &str) -> Result<Arc<dyn CheckRoutine>, LoadError> {
        let path = self.check_dir.join(format!("check_{name}"));
        if !path.is_file() {
            return Err(LoadError::NotFound { path });
        }
        Ok(Arc::new(ScriptRoutine { path }))
    }
}

/// A check routine backed by an executable script.
///
/// The script receives the argv tail (everything after the conventional
/// invocation name) and its combined stdout and stderr are captured. Its exit
/// status is deliberately ignored: severity travels in the report text.
#[derive(Debug)]
pub struct ScriptRoutine {
    path: PathBuf,
}

impl CheckRoutine for ScriptRoutine {
    fn run(&self, ctx: &mut CheckContext, args: &[String]) -> CheckResult {
        let mut command = Command::new(&self.path);
        if args.len() > 1 {
            command.args(&args[1..]);
        }
        let output = command
            .output()
            .with_context(|| format!("failed to run {}", self.path.display()))?;
        ctx.write(&String::from_utf8_lossy(&output.stdout));
        ctx.write(&String::from_utf8_lossy(&output.stderr));
        Ok(())
    }
}

/// In-memory registry of statically compiled routines.
#[derive(Default)]
pub struct StaticLoader {
    routines: HashMap<String, Arc<dyn CheckRoutine>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routine(
        mut self,
        name: impl Into<String>,
        routine: Arc<dyn CheckRoutine>,
    ) -> Self {
        self.routines.insert(name.into(), routine);
        self
    }
}

impl RoutineLoader for StaticLoader {
    fn load(&self, name: &str) -> Result<Arc<dyn CheckRoutine>, LoadError> {
        self.routines
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                path: PathBuf::from(format!("check_{name}")),
            })
    }
}
