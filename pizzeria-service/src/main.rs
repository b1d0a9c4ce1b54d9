use clap::Parser;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pizzeria_service::config::{Cli, Commands, Settings};
use pizzeria_service::{establish_pool, handlers, seed, store, DbPool};

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let pool = migrated_pool(&cli.settings)?;

    match cli.command {
        Commands::Serve => serve(&cli.settings, pool).await,
        Commands::Migrate => Ok(()),
        Commands::Seed => {
            let mut conn = pool.get()?;
            seed::run(&mut conn)?;
            Ok(())
        }
    }
}

fn migrated_pool(settings: &Settings) -> Result<DbPool, Box<dyn std::error::Error>> {
    let database_url = settings.database_url();
    let pool = establish_pool(&database_url)?;
    let mut conn = pool.get()?;
    store::run_migrations(&mut conn)?;
    info!(%database_url, "database ready");
    Ok(pool)
}

async fn serve(settings: &Settings, pool: DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let app = handlers::router(pool);

    let listener = tokio::net::TcpListener::bind(settings.bind_address).await?;
    info!("Pizzeria service listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrated_pool_is_ready_for_queries() {
        let settings = Settings {
            database_url: Some(":memory:".to_string()),
            bind_address: "127.0.0.1:0".parse().unwrap(),
        };

        let pool = migrated_pool(&settings).unwrap();
        let mut conn = pool.get().unwrap();

        assert!(store::list_restaurants(&mut conn).unwrap().is_empty());
        seed::run(&mut conn).unwrap();
        assert_eq!(store::list_pizzas(&mut conn).unwrap().len(), 3);
    }
}
