use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => {
            println!("environment:  {:?}", config.environment);
            println!("port:         {}", config.server.port);
            println!("database:     {}", redact_url(&config.database.url));
            println!("workers:      {} (poll every {}s)", config.worker.concurrency, config.worker.poll_interval_secs);
            println!("producer:     {} ({})", config.producer.base_url, config.producer.model);
            println!("producer key: {}", if config.producer.api_key.is_some() { "set" } else { "missing" });
            println!(
                "plan quotas:  trial={} start={} optimal={} profi={}",
                config.plans.trial, config.plans.start, config.plans.optimal, config.plans.profi
            );
        }
    }
    Ok(())
}

fn redact_url(raw: &str) -> String {
    url::Url::parse(raw)
        .map(|url| DatabaseManager::redacted(&url))
        .unwrap_or_else(|_| "<invalid url>".to_string())
}
