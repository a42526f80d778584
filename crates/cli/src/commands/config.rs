use ecomarket_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_secret(key.expose_secret()))
        .unwrap_or_else(|| "(unset)".to_string());

    let lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
        format!("  database.url = {}", config.database.url),
        format!("  database.max_connections = {}", config.database.max_connections),
        format!("  database.timeout_secs = {}", config.database.timeout_secs),
        format!("  directory.lookup_timeout_secs = {}", config.directory.lookup_timeout_secs),
        format!("  retrieval.fan_out = {}", config.retrieval.fan_out),
        format!("  policy.return_window_days = {}", config.policy.return_window_days),
        format!("  labels.base_url = {}", config.labels.base_url),
        format!("  llm.provider = {:?}", config.llm.provider),
        format!("  llm.model = {}", config.llm.model),
        format!("  llm.base_url = {}", config.llm.base_url.as_deref().unwrap_or("(unset)")),
        format!("  llm.api_key = {api_key}"),
        format!("  llm.timeout_secs = {}", config.llm.timeout_secs),
        format!("  logging.level = {}", config.logging.level),
        format!("  logging.format = {:?}", config.logging.format),
    ];

    lines.join("\n")
}

fn redact_secret(value: &str) -> String {
    if value.len() <= 4 {
        return "****".to_string();
    }
    format!("{}****", &value[..4])
}

#[cfg(test)]
mod tests {
    use super::redact_secret;

    #[test]
    fn redaction_keeps_only_a_short_prefix() {
        assert_eq!(redact_secret("sk-abcdef123456"), "sk-a****");
        assert_eq!(redact_secret("key"), "****");
    }
}
