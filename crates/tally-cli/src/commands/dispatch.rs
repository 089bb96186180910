use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Work(args) => commands::work::handle(&args, ctx, flags).await,
        Commands::Recover => commands::recover::handle(ctx, flags).await,
        Commands::Prune(args) => commands::prune::handle(&args, ctx, flags).await,
        Commands::Emit(args) => commands::emit::handle(&args, ctx, flags).await,
    }
}
