use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PoolError};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod seed;
pub mod store;
pub mod views;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const IN_MEMORY: &str = ":memory:";

/// Applied to every pooled connection. SQLite leaves foreign keys off unless
/// asked per connection.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn establish_pool(database_url: &str) -> Result<DbPool, PoolError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let builder = Pool::builder().connection_customizer(Box::new(SqlitePragmas));

    // Each connection to ":memory:" is its own database, so keep exactly one
    // alive for the lifetime of the pool.
    let builder = if database_url == IN_MEMORY {
        builder.max_size(1).idle_timeout(None).max_lifetime(None)
    } else {
        builder
    };

    builder.build(manager)
}
