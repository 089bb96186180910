use clap::{Args, Subcommand, ValueEnum};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Drain the audit queue into the store until stopped.
    Work(WorkArgs),
    /// Re-insert batches from rescue files.
    Recover,
    /// Delete audit records older than the retention window.
    Prune(PruneArgs),
    /// Record one entity mutation through the configured dispatch mode.
    Emit(EmitArgs),
}

#[derive(Clone, Debug, Args)]
pub struct WorkArgs {
    /// Stop after this many loop iterations (0 runs until a signal).
    #[arg(long)]
    pub max_loops: Option<u64>,
}

#[derive(Clone, Debug, Args)]
pub struct PruneArgs {
    /// Retention in days. Overrides `retention.prune_days`.
    #[arg(
        long,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(tally_config::MAX_PRUNE_DAYS))
    )]
    pub days: Option<u32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum EmitKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Clone, Debug, Args)]
pub struct EmitArgs {
    /// Mutation kind.
    #[arg(long, value_enum)]
    pub kind: EmitKind,

    /// Entity type, e.g. `App\Models\User`.
    pub subject_type: String,

    /// Entity identifier.
    pub subject_id: String,

    /// Attributes before the change, as a JSON object (updated, deleted).
    #[arg(long)]
    pub before: Option<String>,

    /// Attributes after the change, as a JSON object (created, updated).
    #[arg(long)]
    pub after: Option<String>,

    /// Id of the acting user.
    #[arg(long)]
    pub actor: Option<String>,
}
