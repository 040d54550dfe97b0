//! CommitForge CLI - Main entry point

mod app;
mod commands;
mod report;
mod terminal;

use clap::{Parser, Subcommand};
use commands::Outcome;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CommitForge - split uncommitted work into coherent commits
#[derive(Parser, Debug)]
#[command(name = "commitforge")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    command: Command,

    /// Provider to use for this run (anthropic, openai, groq, ollama or a configured name)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model to use for this run
    #[arg(long, global = true)]
    model: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Propose a set of commits for the current changes and apply them
    Compose {
        /// Stage everything (including untracked files) before analyzing
        #[arg(short, long)]
        all: bool,

        /// Apply the proposal without review
        #[arg(short, long)]
        yes: bool,

        /// Extra instructions for the grouping
        #[arg(short, long)]
        instructions: Option<String>,
    },
    /// Generate a message for the staged changes and commit
    Commit {
        /// Commit without confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Ask for a cleanup patch on the staged changes
    Deslop {
        /// Reference the cleanup compares against (default: latest tag, then HEAD)
        #[arg(short, long)]
        base: Option<String>,

        /// Extra instructions for the cleanup
        #[arg(short, long)]
        prompt: Option<String>,

        /// Keep the patch without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Show or change model settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the model used for each task and where it comes from
    Show,
    /// Set the model for a task (message, grouping, cleanup)
    SetModel {
        task: String,
        provider: String,
        model: String,

        /// Write to the user settings instead of the repository
        #[arg(long)]
        global: bool,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(args: Args) -> anyhow::Result<Outcome> {
    let overrides = app::overrides(&args);

    match args.command {
        Command::Compose {
            all,
            yes,
            instructions,
        } => {
            let ctx = app::AppContext::open(overrides)?;
            commands::compose::run(&ctx, all, yes, instructions.as_deref()).await
        }
        Command::Commit { yes } => {
            let ctx = app::AppContext::open(overrides)?;
            commands::commit::run(&ctx, yes).await
        }
        Command::Deslop { base, prompt, yes } => {
            let ctx = app::AppContext::open(overrides)?;
            commands::deslop::run(&ctx, base.as_deref(), prompt.as_deref(), yes).await
        }
        Command::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&overrides),
            ConfigAction::SetModel {
                task,
                provider,
                model,
                global,
            } => commands::config::set_model(&task, &provider, &model, global),
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    // dropping `run` tears down any open generation session
    let result = tokio::select! {
        result = run(args) => result,
        _ = tokio::signal::ctrl_c() => Ok(Outcome::Interrupted),
    };

    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            report::print_error(&err);
            ExitCode::FAILURE
        }
    }
}
