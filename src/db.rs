use crate::error::AppError;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;

// Embed SQL migrations at compile time for deterministic startup
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_create_users",
        include_str!("../migrations/0001_create_users.sql"),
    ),
    (
        "0002_create_contacts",
        include_str!("../migrations/0002_create_contacts.sql"),
    ),
    (
        "0003_create_messages",
        include_str!("../migrations/0003_create_messages.sql"),
    ),
];

pub fn init_pool(database_url: &str, max_size: usize) -> Result<Pool, AppError> {
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e| AppError::Config(format!("invalid DATABASE_URL: {e}")))?;

    let manager = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );

    Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|e| AppError::StartServer(format!("build pool: {e}")))
}

pub async fn run_migrations(pool: &Pool) -> Result<(), AppError> {
    let client = pool.get().await?;

    for (name, sql) in MIGRATIONS {
        match client.batch_execute(sql).await {
            Ok(_) => tracing::info!(migration = %name, "migration applied"),
            Err(e) => {
                // All statements are IF NOT EXISTS; anything else is fatal.
                return Err(AppError::StartServer(format!("migration {name}: {e}")));
            }
        }
    }

    Ok(())
}
