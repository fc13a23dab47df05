use serde_json::json;
use uuid::Uuid;

use crate::auth::TokenService;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::types::Role;

/// Sign a token with the configured secret. The role claim is advisory:
/// requests are authorized with the role stored for the user.
pub fn handle(config: &AppConfig, user_id: Uuid, role: Role, output_format: OutputFormat) -> anyhow::Result<()> {
    let tokens = TokenService::from_config(&config.security)?;
    let token = tokens.issue(user_id, role)?;

    match output_format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "token": token, "userId": user_id, "role": role, "expiresIn": tokens.expiry_secs() })
        ),
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}
