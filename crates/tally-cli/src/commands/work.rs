use anyhow::Context;
use tally_worker::{Worker, WorkerSettings, signal};
use tokio_util::sync::CancellationToken;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::WorkArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `tally work`.
pub async fn handle(args: &WorkArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let settings = WorkerSettings::from_config(&ctx.config.worker)
        .with_max_loops(args.max_loops.unwrap_or(0));

    let shutdown = CancellationToken::new();
    let listener = signal::watch_for_shutdown(shutdown.clone())
        .context("failed to install shutdown signal handlers")?;

    let worker = Worker::new(
        &ctx.queue,
        &ctx.db,
        ctx.rescue.clone(),
        settings,
        shutdown.clone(),
    );
    let result = worker.run().await;

    // Releases the listener when the loop ended on its own.
    shutdown.cancel();
    if let Err(error) = listener.await {
        tracing::warn!(%error, "signal listener ended abnormally");
    }

    let summary = result.context("audit worker stopped on a fatal error")?;
    output(&summary, flags.format)
}
