use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use gatebird::application::{Client, CommandDefinition, MessageOptions};
use gatebird::domain::entities::Interaction;
use gatebird::domain::{Event, EventType, HandlerResult};
use gatebird::infrastructure::{BotConfig, CliArgs, ConfigError, StorageManager};

fn init_logging(config: &BotConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<BotConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

async fn ping(client: Client, interaction: Interaction) -> HandlerResult {
    client.defer_reply(&interaction, true).await?;
    let ping = client.ping().await?;

    let gateway = ping
        .gateway
        .map_or_else(|| "n/a".to_string(), |latency| format!("{} ms", latency.as_millis()));
    let content = format!("Pong! REST {} ms, gateway {gateway}", ping.rest.as_millis());

    client
        .edit_reply(&interaction, MessageOptions::from(content))
        .await?;
    Ok(())
}

fn create_client(config: &BotConfig) -> Result<Client> {
    let mut ping_command = CommandDefinition::slash("ping", "Shows REST and gateway latency");
    if let Some(guild_id) = config.test_guild {
        ping_command = ping_command.in_guilds(vec![guild_id]);
    }

    let client = Client::builder()
        .gateway_config(config.gateway_config()?)
        .on(EventType::Ready, |client: Client, _event: Event| async move {
            if let Some(user) = client.user() {
                info!(user = %user.display_name(), "Bot is online");
            }
            HandlerResult::Ok(())
        })
        .command(ping_command, ping)
        .build()?;

    Ok(client)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = gatebird::VERSION, "Starting gatebird");

    let token = args.token.clone().ok_or(ConfigError::MissingToken)?;

    let client = create_client(&config)?;
    client.login(&token).await?;

    let shutdown = client.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            shutdown.close().await;
        }
    });

    if let Err(e) = client.wait().await {
        error!(error = %e, "Gateway stopped");
        return Err(e.into());
    }

    Ok(())
}
