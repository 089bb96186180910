use anyhow::Context;
use tally_config::TallyConfig;
use tally_db::{SqlQueue, TallyDb};
use tally_worker::RescueStore;

/// Shared handles for command handlers.
pub struct AppContext {
    pub config: TallyConfig,
    pub db: TallyDb,
    pub queue: SqlQueue,
    pub rescue: RescueStore,
}

impl AppContext {
    /// Open the store, the queue and the rescue directory described by `config`.
    pub async fn init(config: TallyConfig) -> anyhow::Result<Self> {
        let database_path = &config.storage.database_path;
        let db = TallyDb::open_local(database_path)
            .await
            .with_context(|| format!("failed to open audit store at {database_path}"))?;

        let queue = if config.queue.uses_store_connection() {
            SqlQueue::shared(&db, config.queue.key.as_str())
        } else {
            let connection = &config.queue.connection;
            SqlQueue::open(connection, config.queue.key.as_str())
                .await
                .with_context(|| format!("failed to open queue database at {connection}"))?
        };

        let rescue = RescueStore::new(config.storage.rescue_dir())
            .context("failed to prepare rescue store")?;

        Ok(Self {
            config,
            db,
            queue,
            rescue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_config::StorageConfig;
    use tally_db::AuditQueue;

    fn config_in(dir: &std::path::Path) -> TallyConfig {
        TallyConfig {
            storage: StorageConfig {
                database_path: dir.join("audit.db").to_string_lossy().into_owned(),
                rescue_dir: dir.join("rescue").to_string_lossy().into_owned(),
            },
            ..TallyConfig::default()
        }
    }

    #[tokio::test]
    async fn default_queue_lives_in_store_database() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::init(config_in(dir.path())).await.unwrap();

        ctx.queue.push("payload").await.unwrap();
        assert!(!dir.path().join("queue.db").exists());
        assert_eq!(ctx.queue.key(), "audit_pkg:buffer");

        let shared = SqlQueue::shared(&ctx.db, "audit_pkg:buffer");
        assert_eq!(shared.pop().await.unwrap().as_deref(), Some("payload"));
    }

    #[tokio::test]
    async fn named_queue_connection_uses_separate_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.queue.connection = dir.path().join("queue.db").to_string_lossy().into_owned();

        let ctx = AppContext::init(config).await.unwrap();
        ctx.queue.push("payload").await.unwrap();

        assert!(dir.path().join("queue.db").exists());
        let store_side = SqlQueue::shared(&ctx.db, "audit_pkg:buffer");
        assert!(store_side.is_empty().await.unwrap());
    }
}
