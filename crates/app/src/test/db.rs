//! Database test utilities and shared infrastructure

use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use sqlx::{Connection, PgConnection, PgPool};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres as PostgresImage;
use tokio::sync::{OnceCell, mpsc};

const USER: &str = "ranksync_test";
const PASSWORD: &str = "ranksync_test_password";

/// Database names must be 1-63 characters, start with a letter or underscore
/// and contain only letters, digits, underscores and dollar signs.
fn validate_database_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name.len() > 63 {
        return Err("database name must be 1-63 characters long".to_string());
    }

    if !name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
    {
        return Err("database name must start with a letter or underscore".to_string());
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    {
        return Err(
            "database name can only contain letters, digits, underscores and dollar signs"
                .to_string(),
        );
    }

    let reserved_words = [
        "user", "table", "select", "insert", "update", "delete", "drop", "create", "alter",
        "index", "database", "schema", "role", "grant", "revoke",
    ];

    if reserved_words
        .iter()
        .any(|&word| name.eq_ignore_ascii_case(word))
    {
        return Err(format!("database name '{name}' is a reserved word"));
    }

    Ok(())
}

async fn init_postgres_container() -> ContainerAsync<PostgresImage> {
    PostgresImage::default()
        .with_user(USER)
        .with_password(PASSWORD)
        .with_db_name("ranksync_test")
        .with_env_var("POSTGRES_INITDB_ARGS", "--auth-host=trust")
        .start()
        .await
        .expect("failed to start PostgreSQL container")
}

/// Started once and shared by every test in the binary.
static POSTGRES_CONTAINER: Lazy<OnceCell<ContainerAsync<PostgresImage>>> = Lazy::new(OnceCell::new);

static CLEANUP_SENDER: Lazy<OnceCell<mpsc::UnboundedSender<String>>> = Lazy::new(OnceCell::new);

async fn init_cleanup_task() -> mpsc::UnboundedSender<String> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(db_name) = receiver.recv().await {
            if let Err(error) = cleanup_database(&db_name).await {
                tracing::warn!(database = %db_name, error = %error, "failed to drop test database");
            }
        }
    });

    sender
}

fn host() -> String {
    std::env::var("TESTCONTAINERS_HOST_OVERRIDE").unwrap_or_else(|_err| "localhost".to_string())
}

fn url(port: u16, database: &str) -> String {
    format!("postgresql://{USER}:{PASSWORD}@{host}:{port}/{database}", host = host())
}

async fn cleanup_database(db_name: &str) -> Result<(), sqlx::Error> {
    let Some(container) = POSTGRES_CONTAINER.get() else {
        return Ok(());
    };

    let Ok(port) = container.get_host_port_ipv4(5432).await else {
        return Ok(());
    };

    if validate_database_name(db_name).is_err() {
        return Ok(());
    }

    let mut conn = PgConnection::connect(&url(port, "postgres")).await?;

    sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\""))
        .execute(&mut conn)
        .await?;

    conn.close().await
}

/// One uniquely named, fully migrated database inside the shared container.
///
/// Every test gets its own database, so services commit normally and no
/// rollback is needed between tests. The database is dropped in the
/// background once the `TestDb` goes out of scope.
#[derive(Debug, Clone)]
pub(crate) struct TestDb {
    pool: PgPool,
    name: String,
}

impl Drop for TestDb {
    fn drop(&mut self) {
        if let Some(sender) = CLEANUP_SENDER.get() {
            sender.send(self.name.clone()).ok();
        }
    }
}

impl TestDb {
    pub(crate) async fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();

        let thread_id = std::thread::current().id();

        let name =
            format!("ranksync_test_{nanos}_{thread_id:?}").replace([':', ' ', '(', ')'], "");

        Self::new_with_db_name(&name).await
    }

    pub(crate) async fn new_with_db_name(db_name: &str) -> Self {
        CLEANUP_SENDER.get_or_init(init_cleanup_task).await;

        if let Err(error) = validate_database_name(db_name) {
            panic!("invalid database name '{db_name}': {error}");
        }

        let container = POSTGRES_CONTAINER
            .get_or_init(init_postgres_container)
            .await;

        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("failed to get container port");

        let mut conn = PgConnection::connect(&url(port, "postgres"))
            .await
            .expect("failed to connect to postgres database");

        sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
            .execute(&mut conn)
            .await
            .expect("failed to create test database");

        conn.close()
            .await
            .expect("failed to close admin connection");

        let pool = PgPool::connect(&url(port, db_name))
            .await
            .expect("failed to create pool for database");

        crate::database::migrate(&pool)
            .await
            .expect("failed to run migrations");

        Self {
            pool,
            name: db_name.to_string(),
        }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn database_names_are_validated() {
        for valid in ["valid_name", "_underscore_start", "test123", "db$with$dollar"] {
            assert!(validate_database_name(valid).is_ok(), "{valid} should pass");
        }

        for invalid in [
            "",
            "123invalid",
            "-invalid",
            "invalid-hyphen",
            "invalid.dot",
            "invalid space",
            "USER",
            "select",
        ] {
            assert!(validate_database_name(invalid).is_err(), "{invalid} should fail");
        }

        assert!(validate_database_name(&"a".repeat(64)).is_err());
    }

    #[tokio::test]
    async fn migrated_database_has_every_table() -> TestResult {
        let test_db = TestDb::new().await;

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::TEXT FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name <> '_sqlx_migrations' \
             ORDER BY table_name",
        )
        .fetch_all(test_db.pool())
        .await?;

        assert_eq!(
            tables,
            vec![
                "decision_templates",
                "links",
                "submissions",
                "sync_jobs",
                "verification_challenges"
            ]
        );

        Ok(())
    }
}
