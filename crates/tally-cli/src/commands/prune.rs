use tally_worker::prune;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::PruneArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `tally prune`.
pub async fn handle(args: &PruneArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let days = ctx.config.retention.resolve(args.days);
    let report = prune(&ctx.db, days).await?;
    output(&report, flags.format)
}
