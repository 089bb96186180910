use anyhow::Context;
use tally_config::TallyConfig;

use crate::cli::GlobalFlags;

/// Load `.env`, then the layered configuration.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<TallyConfig> {
    if let Some(path) = &flags.config
        && !path.is_file()
    {
        anyhow::bail!("config file '{}' does not exist", path.display());
    }

    let config = TallyConfig::load_with_dotenv(flags.config.as_deref())
        .context("failed to load tally configuration")?;

    tracing::debug!(
        dispatch_mode = %config.dispatch.mode,
        queue_connection = %config.queue.connection,
        queue_key = %config.queue.key,
        database = %config.storage.database_path,
        rescue_dir = %config.storage.rescue_dir,
        "configuration loaded"
    );
    Ok(config)
}
