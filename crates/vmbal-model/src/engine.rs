//! Solver engine contract and the bundled `microlp` adapter.
//!
//! The rest of the crate only talks to [`SolverEngine`]: a model goes in,
//! a status and (when one exists) a full variable assignment come out.
//! Engines never return a partial or default solution on failure; crashes,
//! timeouts and internal errors are all reported as
//! [`SolveStatus::NotSolved`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use microlp::{ComparisonOp, OptimizationDirection, Problem};
use tracing::{debug, info, warn};

use vmbal_core::SolveStatus;

use crate::model::{Model, Relation, VarKind};

/// Tolerance used when deciding constraints the engine never sees and when
/// sanity-checking returned values.
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Per-solve knobs threaded through to the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveSettings {
    /// Give up and report `NotSolved` after this long.
    ///
    /// `microlp` cannot be interrupted: on timeout the solver thread is
    /// abandoned and keeps running on its own core until the solve ends.
    /// Every timed-out call holds one such thread until then.
    pub time_limit: Option<Duration>,
}

impl SolveSettings {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

/// Values for every model variable plus the objective they achieve.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSolution {
    /// Indexed by [`VarId::index`](crate::model::VarId::index).
    pub values: Vec<f64>,
    pub objective: f64,
}

/// What an engine reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutcome {
    pub status: SolveStatus,
    /// Present exactly when `status.has_solution()`.
    pub solution: Option<EngineSolution>,
    /// Human-readable reason for outcomes without a solution.
    pub detail: Option<String>,
}

impl EngineOutcome {
    pub fn solved(status: SolveStatus, values: Vec<f64>, objective: f64) -> Self {
        Self {
            status,
            solution: Some(EngineSolution { values, objective }),
            detail: None,
        }
    }

    pub fn unsolved(status: SolveStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            solution: None,
            detail: Some(detail.into()),
        }
    }
}

/// A synchronous mixed-integer solver.
///
/// Implementations must be safe to call from several threads at once with
/// independent models.
pub trait SolverEngine: Send + Sync {
    /// Engine name for logging.
    fn name(&self) -> &str;

    /// Minimize `model`'s objective subject to its constraints.
    fn solve(&self, model: &Model, settings: &SolveSettings) -> EngineOutcome;
}

/// Pure-Rust branch-and-bound engine backed by the `microlp` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicrolpEngine;

impl MicrolpEngine {
    pub fn new() -> Self {
        Self
    }
}

type RawResult = Result<Vec<f64>, microlp::Error>;

impl SolverEngine for MicrolpEngine {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, model: &Model, settings: &SolveSettings) -> EngineOutcome {
        let started = Instant::now();
        let stats = model.stats();
        debug!(
            engine = self.name(),
            variables = stats.variables,
            binaries = stats.binaries,
            constraints = stats.constraints,
            time_limit = ?settings.time_limit,
            "solving model"
        );

        let (problem, handles) = match translate(model) {
            Ok(translated) => translated,
            Err(outcome) => return outcome,
        };

        let run = move || -> thread::Result<RawResult> {
            panic::catch_unwind(AssertUnwindSafe(|| {
                problem
                    .solve()
                    .map(|sol| handles.iter().map(|v| *sol.var_value(*v)).collect::<Vec<f64>>())
            }))
        };

        let result = match settings.time_limit {
            None => run(),
            Some(limit) => match run_with_limit(run, limit) {
                Ok(result) => result,
                Err(outcome) => return outcome,
            },
        };

        let outcome = match result {
            Ok(raw) => interpret(model, raw),
            Err(payload) => EngineOutcome::unsolved(
                SolveStatus::NotSolved,
                format!("solver panicked: {}", panic_message(payload.as_ref())),
            ),
        };

        info!(
            engine = self.name(),
            status = %outcome.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "solve finished"
        );
        outcome
    }
}

/// Build the `microlp` problem. Constraints with an empty left-hand side
/// are decided here; a violated one short-circuits to `Infeasible`.
fn translate(model: &Model) -> Result<(Problem, Vec<microlp::Variable>), EngineOutcome> {
    let mut obj = vec![0.0; model.vars().len()];
    for (var, coeff) in model.objective().terms() {
        obj[var.index()] = *coeff;
    }

    let mut problem = Problem::new(OptimizationDirection::Minimize);
    let handles: Vec<microlp::Variable> = model
        .vars()
        .iter()
        .zip(&obj)
        .map(|(def, &coeff)| match def.kind {
            VarKind::Binary => problem.add_binary_var(coeff),
            VarKind::Continuous => problem.add_var(coeff, (def.lower, def.upper)),
        })
        .collect();

    for c in model.constraints() {
        if c.expr.is_empty() {
            if c.relation.holds(0.0, c.rhs, FEASIBILITY_TOLERANCE) {
                continue;
            }
            debug!(constraint = %c.name, "empty constraint cannot hold");
            return Err(EngineOutcome::unsolved(
                SolveStatus::Infeasible,
                format!("constraint {} reduces to 0 {} {}", c.name, c.relation, c.rhs),
            ));
        }
        let terms: Vec<(microlp::Variable, f64)> = c
            .expr
            .terms()
            .iter()
            .map(|(var, coeff)| (handles[var.index()], *coeff))
            .collect();
        problem.add_constraint(terms, comparison(c.relation), c.rhs);
    }

    Ok((problem, handles))
}

fn comparison(relation: Relation) -> ComparisonOp {
    match relation {
        Relation::Eq => ComparisonOp::Eq,
        Relation::Le => ComparisonOp::Le,
        Relation::Ge => ComparisonOp::Ge,
    }
}

/// Run `f` on a worker thread and abandon it after `limit`.
fn run_with_limit<F>(f: F, limit: Duration) -> Result<thread::Result<RawResult>, EngineOutcome>
where
    F: FnOnce() -> thread::Result<RawResult> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("vmbal-solve".to_string())
        .spawn(move || {
            let _ = tx.send(f());
        });
    if let Err(e) = spawned {
        return Err(EngineOutcome::unsolved(
            SolveStatus::NotSolved,
            format!("failed to start solver thread: {e}"),
        ));
    }

    match rx.recv_timeout(limit) {
        Ok(result) => Ok(result),
        Err(RecvTimeoutError::Timeout) => {
            warn!(?limit, "solver time limit reached, abandoning solve");
            Err(EngineOutcome::unsolved(
                SolveStatus::NotSolved,
                format!("time limit of {limit:?} reached"),
            ))
        }
        Err(RecvTimeoutError::Disconnected) => Err(EngineOutcome::unsolved(
            SolveStatus::NotSolved,
            "solver thread exited without a result",
        )),
    }
}

fn interpret(model: &Model, raw: RawResult) -> EngineOutcome {
    match raw {
        Ok(values) => {
            let violated = model.violations(&values, FEASIBILITY_TOLERANCE * 10.0);
            // Optimality is only claimed for values that check out against
            // the model; anything else is downgraded to Feasible.
            let status = if violated.is_empty() {
                SolveStatus::Optimal
            } else {
                warn!(
                    count = violated.len(),
                    first = %violated[0],
                    "solver returned values outside tolerance"
                );
                SolveStatus::Feasible
            };
            let objective = model.objective().evaluate(&values);
            EngineOutcome::solved(status, values, objective)
        }
        Err(microlp::Error::Infeasible) => {
            EngineOutcome::unsolved(SolveStatus::Infeasible, "problem is infeasible")
        }
        Err(microlp::Error::Unbounded) => {
            EngineOutcome::unsolved(SolveStatus::Unbounded, "problem is unbounded")
        }
        Err(microlp::Error::InternalError(msg)) => {
            EngineOutcome::unsolved(SolveStatus::NotSolved, format!("solver error: {msg}"))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
