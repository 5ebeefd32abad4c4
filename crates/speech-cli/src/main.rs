//! `speech` entry point.

use std::process::ExitCode;

use clap::Parser;
use speech_tts::{CommandPlatform, TextToSpeechEngine};

use speech_cli::{Cli, Commands, handlers};

/// Log level is controlled by `RUST_LOG` (default: warn).
fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let engine = TextToSpeechEngine::with_config(
        CommandPlatform::new(cli.backend_config()),
        cli.engine_config(),
    );

    let succeeded = match &cli.command {
        Commands::Say { text, flush, .. } => handlers::say(&engine, text, *flush).await?,
        Commands::Voices { language, json } => {
            handlers::voices(&engine, language.as_ref(), *json).await?;
            true
        }
        Commands::Earcon { name, file } => handlers::earcon(&engine, name, file).await?,
    };

    engine.shutdown();

    if succeeded {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!("Utterance did not complete");
        Ok(ExitCode::FAILURE)
    }
}
