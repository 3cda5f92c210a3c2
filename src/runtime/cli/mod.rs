pub mod commands;
pub mod render;
pub mod session;

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

use crate::adapters::classifier::PixelStatsClassifier;
use crate::adapters::config::Settings;
use crate::adapters::emitter::TerminalEmitter;
use crate::adapters::llm::GeminiAdapter;
use crate::core::completion::CompletionOrchestrator;
use crate::core::error::DynError;

use commands::parse_command;
use session::{ChatSession, Reply};

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

pub async fn run() -> Result<(), DynError> {
    let settings_path = Settings::global_config_path();
    let settings = Settings::load_from(&settings_path);
    log::info!(
        "loaded settings from {} (model {})",
        settings_path.display(),
        settings.model()
    );

    let orchestrator = CompletionOrchestrator::new(
        Arc::new(GeminiAdapter::default()),
        Arc::new(TerminalEmitter::stdout()),
    );
    let mut session = ChatSession::new(
        settings,
        Some(settings_path),
        orchestrator,
        Arc::new(PixelStatsClassifier),
    );

    println!("skinchat: type a message, or /help for commands.");
    if session.settings().chat_api_key().is_none() {
        println!("No API key configured. Set GEMINI_API_KEY or use /key <api key>.");
    }
    prompt();

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    while let Some(line) = lines.next().await {
        let line = line?;
        let Some(parsed) = parse_command(&line) else {
            prompt();
            continue;
        };

        let outcome = match parsed {
            Ok(command) => session.execute(command).await,
            Err(usage) => Err(usage),
        };
        match outcome {
            Ok(Reply::Quit) => break,
            Ok(Reply::Text(text)) => {
                if !text.is_empty() {
                    println!("{text}");
                }
                match session.complete_pending().await {
                    Ok(Some(notice)) => println!("{notice}"),
                    Ok(None) => {}
                    Err(e) => println!("Error: {e}"),
                }
            }
            Err(e) => println!("Error: {e}"),
        }
        prompt();
    }

    log::info!("session ended");
    Ok(())
}
