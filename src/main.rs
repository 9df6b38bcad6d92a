use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use yt_mirrorbot::bot::{BotSettings, MirrorBot};
use yt_mirrorbot::channels::ChannelIdStore;
use yt_mirrorbot::config;
use yt_mirrorbot::discord::DiscordClient;
use yt_mirrorbot::live::MarkupClassifier;
use yt_mirrorbot::scheduler::Scheduler;
use yt_mirrorbot::state::AppState;
use yt_mirrorbot::youtube::YouTubeClient;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print an example config file and exit
    #[arg(long)]
    print_example_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if args.print_example_config {
        print!("{}", config::example());
        return Ok(());
    }

    // Configuration problems are fatal before any connection is made.
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let timeout = cfg.app.request_timeout();
    let youtube = Arc::new(YouTubeClient::new(cfg.youtube.api_key.clone(), timeout)?);
    let chat = Arc::new(DiscordClient::new(
        cfg.discord.bot_token.clone(),
        cfg.discord.guild_id,
        timeout,
    )?);
    let classifier = Arc::new(
        MarkupClassifier::new(youtube.clone()).with_dump_path(cfg.app.live_dump_path()),
    );
    let channels = ChannelIdStore::load_from(cfg.app.channel_ids_path()).await;

    let bot = Arc::new(MirrorBot::new(
        BotSettings::from_config(&cfg),
        youtube,
        chat,
        classifier,
        AppState::new(channels),
    ));

    info!(guild = cfg.discord.guild_id, channel = %cfg.youtube.channel_id, "starting mirror bot");
    if let Err(err) = bot.ensure_display_channels().await {
        error!(?err, "failed to set up display channels");
    }
    if let Err(err) = bot.refresh_members().await {
        error!(?err, "failed to refresh member count");
    }
    match bot.refresh_feed().await {
        Ok(_) => {
            let queued = bot.state().queue.lock().await.len();
            info!(queue = queued, "initial feed load done");
        }
        Err(err) => error!(?err, "initial feed load failed"),
    }

    let scheduler = Scheduler::start(bot, &cfg.schedule);
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    scheduler.shutdown();
    Ok(())
}
