use std::io::{self, BufRead, Write};

use ecomarket_core::chrono::Utc;
use ecomarket_core::config::{AppConfig, LoadOptions};
use ecomarket_core::SessionId;

use crate::bootstrap::{build_orchestrator, init_logging};
use crate::commands::CommandResult;

pub fn run(session: Option<String>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let session_id =
        SessionId(session.unwrap_or_else(|| format!("cli-{}", Utc::now().timestamp())));

    let result = runtime.block_on(async {
        let (orchestrator, pool) = build_orchestrator(&config)
            .await
            .map_err(|error| ("bootstrap", error.to_string(), 4u8))?;

        println!("EcoMarket asistente (sesión {session_id}). Escribe `salir` para terminar.");

        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            print!("> ");
            let _ = io::stdout().flush();

            let Some(Ok(line)) = lines.next() else {
                break;
            };
            let utterance = line.trim();
            if utterance.is_empty() {
                continue;
            }
            if matches!(utterance.to_lowercase().as_str(), "salir" | "exit" | "quit") {
                break;
            }

            let outcome = orchestrator.handle_turn(&session_id, utterance).await;
            println!("{}", outcome.reply);
        }

        pool.close().await;
        Ok::<(), (&'static str, String, u8)>(())
    });

    match result {
        Ok(()) => CommandResult::success("chat", format!("session {session_id} ended")),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("chat", error_class, message, exit_code)
        }
    }
}
