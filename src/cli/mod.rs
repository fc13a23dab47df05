pub mod commands;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::types::Role;

#[derive(Parser)]
#[command(name = "metal-vector")]
#[command(about = "Metal Vector - company analysis API server and admin tooling")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server and the background worker pool (default)")]
    Serve {
        #[arg(long, help = "Apply pending database migrations before serving")]
        migrate: bool,
    },

    #[command(about = "Apply pending database migrations and exit")]
    Migrate,

    #[command(about = "Issue a session token for an existing user id")]
    Token {
        #[arg(long, help = "User id (sub claim)")]
        user_id: Uuid,
        #[arg(long, default_value = "user", help = "Role claim: user or admin")]
        role: Role,
    },

    #[command(about = "Print the effective configuration with secrets omitted")]
    Config,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command.unwrap_or(Commands::Serve { migrate: false }) {
        Commands::Serve { migrate } => commands::serve::handle(config, migrate).await,
        Commands::Migrate => commands::migrate::handle(&config).await,
        Commands::Token { user_id, role } => commands::token::handle(&config, user_id, role, output_format),
        Commands::Config => commands::config::handle(&config, output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["metal-vector", "serve", "--migrate"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { migrate: true })));

        let cli = Cli::try_parse_from(["metal-vector"]).unwrap();
        assert!(cli.command.is_none());

        let id = Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from(["metal-vector", "--json", "token", "--user-id", &id, "--role", "admin"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Some(Commands::Token { role: Role::Admin, .. })));

        assert!(Cli::try_parse_from(["metal-vector", "token", "--user-id", "nope"]).is_err());
    }
}
