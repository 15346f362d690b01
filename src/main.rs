use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mapbox_provider::config::{self, ProviderConfig};
use mapbox_provider::provider::MapboxProvider;
use mapbox_provider::resource::token::token_schema;
use mapbox_provider::{
    Diagnostic, PlanAction, ProviderError, ReadOutcome, Resource, TokenId, TokenPlan,
    TokenResource, TokenState,
};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();

    let json = args.log_json;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "mapbox_provider=info".into()),
        ))
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: cli::Cli) -> anyhow::Result<()> {
    match args.command {
        cli::Commands::Schema => {
            let schemas = serde_json::json!({
                "provider": MapboxProvider::schema(),
                "resources": { "mapbox_token": token_schema() },
            });
            println!("{}", serde_json::to_string_pretty(&schemas)?);
            Ok(())
        }
        cli::Commands::Token { command } => {
            let mut provider = MapboxProvider::new(env!("CARGO_PKG_VERSION"));
            let diags = provider.configure(
                &ProviderConfig {
                    access_token: args.access_token,
                },
                &config::load(),
            );
            for diag in diags.iter() {
                eprintln!("{}\n", diag);
            }
            if diags.has_error() {
                anyhow::bail!("provider configuration failed");
            }

            let resource = provider.token_resource()?;
            handle_token_command(&resource, command, args.reveal).await
        }
    }
}

async fn handle_token_command(
    resource: &TokenResource,
    command: cli::TokenCommands,
    reveal: bool,
) -> anyhow::Result<()> {
    match command {
        cli::TokenCommands::Create { username, fields } => {
            let desired = plan_from_fields(username, fields);
            let state = resource
                .create(&desired)
                .await
                .map_err(|e| report("create token", e))?;
            print_state(&state, reveal)
        }
        cli::TokenCommands::Read { id } => {
            let state = refresh(resource, resource.import_state(&id)).await?;
            print_state(&state, reveal)
        }
        cli::TokenCommands::Import { id } => {
            tracing::info!(id = %id, "importing token");
            let state = refresh(resource, resource.import_state(&id)).await?;
            print_state(&state, reveal)
        }
        cli::TokenCommands::Update { id, fields } => {
            let prior = refresh(resource, resource.import_state(&id)).await?;
            let desired = plan_from_fields(prior.username.clone(), fields);

            let state = match resource.plan(Some(&prior), &desired) {
                PlanAction::NoChange => {
                    tracing::info!(id = %id, "no changes");
                    prior
                }
                PlanAction::Update { changed } => {
                    tracing::info!(id = %id, ?changed, "updating token in place");
                    resource
                        .update(&prior, &desired)
                        .await
                        .map_err(|e| report("update token", e))?
                }
                action => anyhow::bail!("unexpected plan for in-place update: {:?}", action),
            };
            print_state(&state, reveal)
        }
        cli::TokenCommands::Delete { id } => {
            TokenId::parse(&id).map_err(|e| report("delete token", e))?;
            resource
                .delete(&resource.import_state(&id))
                .await
                .map_err(|e| report("delete token", e))?;
            println!("deleted {}", id);
            Ok(())
        }
    }
}

async fn refresh(resource: &TokenResource, state: TokenState) -> anyhow::Result<TokenState> {
    let id = state.id.clone();
    match resource
        .read(&state)
        .await
        .map_err(|e| report("read token", e))?
    {
        ReadOutcome::Found(state) => Ok(state),
        ReadOutcome::NotFound => anyhow::bail!("token {} not found", id),
    }
}

fn plan_from_fields(username: String, fields: cli::TokenFields) -> TokenPlan {
    TokenPlan {
        username,
        note: fields.note,
        scopes: fields.scopes.into_iter().collect(),
        allowed_urls: fields.allowed_urls.into_iter().collect(),
    }
}

fn print_state(state: &TokenState, reveal: bool) -> anyhow::Result<()> {
    let shown = if reveal { state.clone() } else { state.redacted() };
    let json = serde_json::to_string_pretty(&shown).context("failed to render token state")?;
    println!("{}", json);
    Ok(())
}

/// Print the diagnostic for a failed step and hand the error back to `?`.
fn report(action: &str, err: ProviderError) -> anyhow::Error {
    eprintln!("{}\n", Diagnostic::from_error(action, &err));
    anyhow::Error::new(err).context(format!("unable to {}", action))
}
