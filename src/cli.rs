use clap::{Args, Parser, Subcommand};

/// Mapbox provider — manage Mapbox access tokens declaratively
#[derive(Parser)]
#[command(name = "mapbox-provider", version, about)]
pub struct Cli {
    /// Access token; overrides MAPBOX_ACCESS_TOKEN when non-empty
    #[arg(long, global = true)]
    pub access_token: Option<String>,

    /// Print secret attributes instead of masking them
    #[arg(long, global = true)]
    pub reveal: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "MAPBOX_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage scoped access tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Print the provider and resource schemas
    Schema,
}

#[derive(Args)]
pub struct TokenFields {
    /// Description for the token
    #[arg(long)]
    pub note: String,
    /// Scope to grant (repeatable or comma-separated)
    #[arg(long = "scope", required = true, value_delimiter = ',')]
    pub scopes: Vec<String>,
    /// URL the token is restricted to (repeatable or comma-separated)
    #[arg(long = "allowed-url", value_delimiter = ',')]
    pub allowed_urls: Vec<String>,
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Create a new token
    Create {
        #[arg(long)]
        username: String,
        #[command(flatten)]
        fields: TokenFields,
    },
    /// Refresh a token by its TOKEN-ID:USERNAME identifier
    Read {
        #[arg(long)]
        id: String,
    },
    /// Change note, scopes or allowed URLs of an existing token
    Update {
        #[arg(long)]
        id: String,
        #[command(flatten)]
        fields: TokenFields,
    },
    /// Delete a token
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Import an existing token and print its state
    Import {
        #[arg(long)]
        id: String,
    },
}
