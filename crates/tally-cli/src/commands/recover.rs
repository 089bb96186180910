use tally_worker::Recovery;

use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

/// Handle `tally recover`.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let report = Recovery::run(&ctx.db, &ctx.rescue).await?;
    output(&report, flags.format)
}
