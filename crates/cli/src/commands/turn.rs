use ecomarket_core::config::{AppConfig, LoadOptions};
use ecomarket_core::SessionId;

use crate::bootstrap::build_orchestrator;
use crate::commands::CommandResult;

/// Runs one turn and prints the structured outcome as JSON, for scripting
/// and smoke checks. Session state persists only for the process lifetime,
/// so multi-turn flows belong in `chat`.
pub fn run(session: &str, text: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "turn",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "turn",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let session_id = SessionId(session.to_string());

    let result = runtime.block_on(async {
        let (orchestrator, pool) = build_orchestrator(&config)
            .await
            .map_err(|error| ("bootstrap", error.to_string(), 4u8))?;

        let outcome = orchestrator.handle_turn(&session_id, text).await;
        pool.close().await;

        serde_json::to_string_pretty(&outcome)
            .map_err(|error| ("serialization", error.to_string(), 5u8))
    });

    match result {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("turn", error_class, message, exit_code)
        }
    }
}
