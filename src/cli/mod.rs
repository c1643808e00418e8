pub mod utils;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::json;

use crate::config::AppConfig;
use crate::database::models::Role;
use crate::database::{DatabaseManager, UserCredentials};

#[derive(Parser)]
#[command(name = "devcamper")]
#[command(about = "DevCamper operator CLI - schema migrations and account administration")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Grant a role to an existing account")]
    Promote {
        /// Email of the account to update
        email: String,

        #[arg(long, default_value = "admin", value_parser = parse_role)]
        role: Role,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse()
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = AppConfig::from_env();
    let db = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    let result = execute(cli.command, &db, output_format).await;
    db.close().await;
    result
}

async fn execute(command: Commands, db: &DatabaseManager, output_format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Commands::Migrate => {
            db.migrate().await?;
            utils::output_success(&output_format, "Migrations applied", None)
        }
        Commands::Promote { email, role } => {
            if !UserCredentials::set_role(db.pool(), &email, role).await? {
                bail!("no user with email {}", email);
            }
            utils::output_success(
                &output_format,
                &format!("{} is now {}", email, role),
                Some(json!({ "email": email, "role": role })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_defaults_to_admin() {
        let cli = Cli::try_parse_from(["devcamper", "promote", "jane@gmail.com"]).unwrap();
        match cli.command {
            Commands::Promote { email, role } => {
                assert_eq!(email, "jane@gmail.com");
                assert_eq!(role, Role::Admin);
            }
            _ => panic!("expected promote"),
        }
    }

    #[test]
    fn promote_accepts_explicit_role_and_json_output() {
        let cli = Cli::try_parse_from(["devcamper", "--json", "promote", "a@b.io", "--role", "publisher"]).unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Promote { role: Role::Publisher, .. }));
    }

    #[test]
    fn rejects_unknown_roles() {
        assert!(Cli::try_parse_from(["devcamper", "promote", "a@b.io", "--role", "root"]).is_err());
    }
}
