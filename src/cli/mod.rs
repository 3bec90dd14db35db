pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "smartrecruit")]
#[command(about = "SmartRecruit CLI - operator tooling for the SmartRecruit API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "Output in YAML format")]
    pub yaml: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Print the permission descriptor generated for a role")]
    Permissions {
        #[arg(long, help = "Role: super-admin, admin or reviewer")]
        role: String,
    },

    #[command(about = "Mint a development JWT for a user")]
    Token {
        #[arg(long, help = "User id (the token subject)")]
        user: uuid::Uuid,

        #[arg(long, help = "Email claim")]
        email: Option<String>,

        #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<i64>,
    },

    #[command(about = "Check database connectivity")]
    Health,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else if cli.yaml {
            OutputFormat::Yaml
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Permissions { role } => commands::permissions::handle(&role, output_format),
        Commands::Token { user, email, hours } => commands::token::handle(user, email, hours, output_format),
        Commands::Health => commands::health::handle(output_format).await,
    }
}
