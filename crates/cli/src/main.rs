mod add_commands;
mod agent_commands;
mod config_commands;
mod convert_commands;
mod import_commands;
mod list_commands;
mod meta_commands;
mod onboarding;
mod output;
mod project_commands;
mod remove_commands;
mod runtime;
mod status_commands;
mod update_commands;

use {
    clap::{Parser, Subcommand},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "skillbox",
    about = "Local-first, agent-agnostic skills manager",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a skill from a URL, a GitHub repo, or an ingest JSON file.
    Add(add_commands::AddArgs),
    /// Print agent-friendly usage.
    Agent {
        /// JSON output.
        #[arg(long)]
        json: bool,
    },
    /// View or edit skillbox config.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Fetch a source and scaffold a draft skill from it.
    Convert(convert_commands::ConvertArgs),
    /// Import a local skill directory into the store.
    Import {
        /// Path to skill directory.
        path: String,
        /// JSON output.
        #[arg(long)]
        json: bool,
    },
    /// List indexed and discovered skills.
    List(list_commands::ListArgs),
    /// Manage skill metadata.
    Meta {
        #[command(subcommand)]
        action: meta_commands::MetaAction,
    },
    /// Manage projects.
    Project {
        #[command(subcommand)]
        action: project_commands::ProjectAction,
    },
    /// Remove a skill or its installs for one project.
    Remove(remove_commands::RemoveArgs),
    /// Check tracked skills against their sources.
    Status {
        /// JSON output.
        #[arg(long)]
        json: bool,
    },
    /// Refetch skills from their sources.
    Update(update_commands::UpdateArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);
    onboarding::run_onboarding()?;

    match cli.command {
        Commands::Add(args) => add_commands::handle_add(args).await,
        Commands::Agent { json } => agent_commands::handle_agent(json),
        Commands::Config { action } => config_commands::handle_config(action),
        Commands::Convert(args) => convert_commands::handle_convert(args).await,
        Commands::Import { path, json } => import_commands::handle_import(&path, json).await,
        Commands::List(args) => list_commands::handle_list(args).await,
        Commands::Meta { action } => meta_commands::handle_meta(action).await,
        Commands::Project { action } => project_commands::handle_project(action).await,
        Commands::Remove(args) => remove_commands::handle_remove(args).await,
        Commands::Status { json } => status_commands::handle_status(json).await,
        Commands::Update(args) => update_commands::handle_update(args).await,
    }
}
