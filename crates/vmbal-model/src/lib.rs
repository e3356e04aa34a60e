//! vmbal-model — the rebalancing optimization model.
//!
//! Translates a [`RebalanceProblem`] into a mixed-integer linear model,
//! hands it to a [`SolverEngine`], and projects the answer back into a
//! [`RebalancePlan`]. Every call builds a fresh model; nothing is shared
//! between calls.
//!
//! # Components
//!
//! - **`model`** — solver-agnostic variables, constraints, objective
//! - **`builder`** — decision variables and hard/soft constraints
//! - **`objective`** — weighted balance / migration / soft-violation terms
//! - **`engine`** — solver contract and the `microlp` adapter
//! - **`project`** — solved values to domain-level plan
//! - **`report`** — human-readable plan summary
//!
//! ```text
//! RawSpec ─► SpecNormalizer ─► ConstraintModelBuilder ─► ObjectiveComposer
//!                                                              │
//!                 RebalancePlan ◄─ ResultProjector ◄─ SolverEngine
//! ```

pub mod builder;
pub mod engine;
pub mod error;
pub mod model;
pub mod objective;
pub mod project;
pub mod report;

use std::time::Instant;

use tracing::info;

use vmbal_core::{RebalancePlan, RebalanceProblem, SpecNormalizer};

pub use builder::{BuiltModel, ConstraintModelBuilder, DecisionVars};
pub use engine::{EngineOutcome, EngineSolution, MicrolpEngine, SolveSettings, SolverEngine};
pub use error::{ModelError, ModelResult, ProjectionError};
pub use model::{LinearExpr, Model, ModelStats, Relation, VarId, VarKind};
pub use objective::ObjectiveComposer;
pub use project::ResultProjector;
pub use report::format_plan;

/// Build the full model for `problem`, objective included.
pub fn build_model(problem: &RebalanceProblem) -> BuiltModel {
    let mut built = ConstraintModelBuilder::new(problem).build();
    let objective = ObjectiveComposer::new(problem.weights()).compose(&built.vars);
    built.model.set_objective(objective);
    built
}

/// Build, solve and project one rebalancing problem.
pub fn optimize(
    problem: &RebalanceProblem,
    engine: &dyn SolverEngine,
    settings: &SolveSettings,
) -> ModelResult<RebalancePlan> {
    let started = Instant::now();

    let built = build_model(problem);
    let outcome = engine.solve(&built.model, settings);
    let plan = ResultProjector::new(problem, &built).project(&outcome)?;

    info!(
        engine = engine.name(),
        status = %plan.status,
        objective = ?plan.objective,
        migrations = plan.migration_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "rebalance optimized"
    );
    Ok(plan)
}

/// JSON in, JSON out: the caller-facing boundary.
pub fn solve_json(
    input: &str,
    normalizer: &SpecNormalizer,
    engine: &dyn SolverEngine,
    settings: &SolveSettings,
    pretty: bool,
) -> ModelResult<String> {
    let problem = normalizer.normalize_json(input)?;
    let plan = optimize(&problem, engine, settings)?;
    Ok(plan.to_json(pretty)?)
}
