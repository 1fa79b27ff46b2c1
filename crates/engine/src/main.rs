//! TaleWeave Engine - Main entry point.
//!
//! Serves one console session on stdin/stdout.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taleweave_domain::{PlayerState, SessionId};
use taleweave_engine::infrastructure::settings::DialogueSettings;
use taleweave_engine::App;

const CONSOLE_SESSION: &str = "console";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taleweave_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting TaleWeave Engine");

    let settings = DialogueSettings::from_env();
    tracing::info!(
        content_path = %settings.content_path.display(),
        default_provider = %settings.default_provider,
        max_conversations = settings.max_conversations_per_player,
        timeout_minutes = settings.timeout_minutes,
        "Settings loaded"
    );

    let app = App::new(settings);
    let report = app.load_content().await;
    if report.loaded.is_empty() {
        tracing::warn!("No dialogue trees loaded; every NPC will decline to talk");
    }
    let restored = app.start().await;
    tracing::info!(restored, "Dialogue engine ready");

    let session = SessionId::new(CONSOLE_SESSION);
    let player_name = std::env::var("TALEWEAVE_PLAYER_NAME").unwrap_or_else(|_| "Traveler".into());
    app.join(
        session.clone(),
        PlayerState::new("player", player_name).in_room(app.settings.start_room.clone()),
    )
    .await;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all(format!("Commands: {}, quit\n", app.commands.names().join(", ")).as_bytes())
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = app
            .commands
            .dispatch(&session, line)
            .await
            .unwrap_or_else(|| "Huh?".to_string());
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }

    app.shutdown().await;
    tracing::info!("TaleWeave Engine stopped");
    Ok(())
}

/// Load `.env` files from the workspace root.
fn load_dotenv_from_repo_root() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
