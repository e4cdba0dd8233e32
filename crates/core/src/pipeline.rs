//! Two-phase compilation over a shared type system.
//!
//! Phase 1 runs serially: each unit registers its top-level declarations,
//! so duplicate definitions across units are detected deterministically.
//! Phase 2 checks unit bodies in parallel; it only reads the shared global
//! symbols and writes unit-local scopes.

use crate::config::CompileConf;
use crate::error::{CompileError, Result};
use crate::type_system::TypeSystem;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

pub trait CompilationUnit: Send + Sync {
    fn name(&self) -> &str;

    /// Registers top-level declarations into shared scopes.
    fn declare(&self, ts: &TypeSystem) -> Result<()>;

    /// Type-checks bodies against the declared symbol set.
    fn check(&self, ts: &TypeSystem) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub units: usize,
    pub threads: usize,
}

pub struct CompilationExecutor {
    conf: CompileConf,
}

impl CompilationExecutor {
    pub fn new(conf: CompileConf) -> Self {
        Self {
            conf: conf.normalized(),
        }
    }

    /// Runs both phases; returns the first error, in unit order.
    pub fn exec(&self, ts: &TypeSystem, units: &mut [Box<dyn CompilationUnit>]) -> Result<CompileStats> {
        if self.conf.deterministic {
            units.sort_by(|a, b| a.name().cmp(b.name()));
        }

        let start = Instant::now();
        for unit in units.iter() {
            debug!(unit = unit.name(), "declaring");
            unit.declare(ts)?;
        }
        info!(units = units.len(), elapsed_ms = start.elapsed().as_millis() as u64, "declarations registered");

        let threads = self.conf.threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("bhl-check-{i}"))
            .build()
            .map_err(|e| CompileError::Internal(format!("failed to build worker pool: {e}")))?;

        let start = Instant::now();
        let raw: Vec<Result<()>> = pool.install(|| {
            units
                .par_iter()
                .map(|unit| {
                    debug!(unit = unit.name(), "checking");
                    unit.check(ts)
                })
                .collect()
        });
        for result in raw {
            result?;
        }
        info!(units = units.len(), threads, elapsed_ms = start.elapsed().as_millis() as u64, "bodies checked");

        Ok(CompileStats {
            units: units.len(),
            threads,
        })
    }
}
