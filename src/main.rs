mod ui;

use std::error::Error;

use clap::{Parser, Subcommand};
use collabforge_realtime::api::ApiClient;
use collabforge_realtime::config::{self, AppConfig};
use collabforge_realtime::format::{DEFAULT_GROUP_GAP_MINUTES, format_chat_time, group_messages};
use collabforge_realtime::{RealtimeClient, WsConnector};
use dotenvy::dotenv;
use ui::TerminalApp;

#[derive(Parser)]
#[command(
    name = "collabforge-chat",
    version,
    about = "Terminal client for CollabForge realtime chat"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, PartialEq, Eq)]
enum Mode {
    /// Interactive chat session (default)
    Chat {
        /// Conversation to join once connected
        #[arg(long)]
        conversation: Option<String>,
        /// User that plain input lines are sent to
        #[arg(long)]
        to: Option<String>,
    },
    /// List conversations of the configured user
    Conversations,
    /// Print the message history of a conversation
    History { conversation_id: String },
    /// Write a config file with default values
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let app_config = config::load_config(&cli.config).apply_env();

    let mode = cli.mode.unwrap_or(Mode::Chat {
        conversation: None,
        to: None,
    });
    match mode {
        Mode::InitConfig => {
            config::save_config(&cli.config, &AppConfig::default())?;
            println!("Wrote default config to {}", cli.config);
        }
        Mode::Conversations => run_conversations(&app_config).await?,
        Mode::History { conversation_id } => run_history(&app_config, &conversation_id).await?,
        Mode::Chat { conversation, to } => run_chat(app_config, conversation, to).await,
    }
    Ok(())
}

async fn run_chat(app_config: AppConfig, conversation: Option<String>, recipient: Option<String>) {
    let (handle, events) = RealtimeClient::spawn(app_config.client_config(), WsConnector);
    log::info!("Chat client started against {}", app_config.socket_url);

    let app = TerminalApp::new(handle, events, app_config.typing_debounce(), conversation, recipient);
    if let Err(err) = app.run().await {
        log::error!("Terminal session terminated: {err}");
    }
}

async fn run_conversations(app_config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let api = ApiClient::new(app_config.api_url.clone(), app_config.token.clone());
    let conversations = api.get_conversations().await?;
    if conversations.is_empty() {
        println!("No conversations yet");
    }
    for conversation in &conversations {
        println!("{}", ui::render::conversation_line(conversation));
    }
    Ok(())
}

async fn run_history(app_config: &AppConfig, conversation_id: &str) -> Result<(), Box<dyn Error>> {
    let api = ApiClient::new(app_config.api_url.clone(), app_config.token.clone());
    let messages = api.get_messages(conversation_id).await?;
    if messages.is_empty() {
        println!("No messages in {conversation_id}");
        return Ok(());
    }

    for group in group_messages(&messages, DEFAULT_GROUP_GAP_MINUTES) {
        let first = group.messages[0];
        println!("{} · {}", first.sender_name(), format_chat_time(first.created_at));
        for message in &group.messages {
            println!("  {}", ui::render::message_line(message));
        }
    }
    Ok(())
}
