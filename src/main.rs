use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;

use linguabot::broadcast::{BroadcastPaths, BroadcastService};
use linguabot::cli::{Cli, Commands};
use linguabot::core::{config, init_logger};
use linguabot::gate::{AdminDirectory, MembershipGate};
use linguabot::storage::create_pool;
use linguabot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramProbe};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load environment variables from .env if present, before any config is read
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::logging::LOG_FILE_PATH, *config::logging::LOG_LEVEL)?;

    match cli.command {
        Some(Commands::Migrate { db_path }) => {
            let path = db_path.unwrap_or_else(|| config::database::DB_PATH.clone());
            log::info!("Applying migrations to {}", path);
            create_pool(&path)?;
            log::info!("Database schema is up to date");
            Ok(())
        }
        Some(Commands::Run) | None => run_bot().await,
    }
}

async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");

    let pool = create_pool(&config::database::DB_PATH)?;
    let bot = create_bot()?;

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let admins = AdminDirectory::from_config(pool.clone());
    if config::admin::ADMIN_IDS.is_empty() {
        log::warn!("ADMIN_IDS is empty, only admins added with /admin_add can run admin commands");
    }
    let gate = MembershipGate::new(pool.clone(), Arc::new(TelegramProbe::new(bot.clone())), admins);
    let deps = HandlerDeps::new(pool, gate, BroadcastService::new(), BroadcastPaths::from_config());

    let listener = teloxide::update_listeners::Polling::builder(bot.clone())
        .drop_pending_updates()
        .build();

    Dispatcher::builder(bot, schema(deps))
        .dependencies(DependencyMap::new())
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
