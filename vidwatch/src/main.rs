use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use vidwatch::cli::{Args, Commands};
use vidwatch::config::AppConfig;
use vidwatch::services::ServiceContainer;
use vidwatch::{database, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    let log_guard = logging::init_logging(config.log_dir.as_deref())?;

    // Initialize database
    let pool = database::init_pool(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    database::run_migrations(&pool).await?;

    let container = ServiceContainer::new(pool, &config);

    let result = match args.command {
        Commands::Run => {
            log_guard.start_retention_cleanup(container.cancellation_token());
            container.start()?;
            info!("vidwatch running, press Ctrl+C to stop");
            shutdown_signal().await;
            Ok(())
        }
        Commands::Add {
            platform,
            url,
            channel,
            guild,
        } => container
            .accounts
            .add(platform, &url, &channel, guild)
            .await
            .map(|account| {
                println!(
                    "Successfully added {} monitor for <{}> in <#{}> (ID: {}).",
                    account.platform, account.source_url, account.destination_channel_id, account.id
                );
            }),
        Commands::Remove { id } => container.accounts.remove(id).await.map(|()| {
            println!("Removed monitor ID: {id}");
        }),
        Commands::List => container.accounts.summary().await.map(|summary| {
            println!("{summary}");
        }),
    };

    container.shutdown().await?;
    Ok(result?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
