//! Moodboard CLI - drive a moodboard project file without a canvas.
//!
//! Opens a session on a JSON project file, applies the requested edits or
//! generation prompts, and saves before exiting. Image generation uses the
//! built-in mock generator.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mb_session::SessionConfig;
use std::path::PathBuf;

/// Moodboard CLI - inspect and edit moodboard projects
#[derive(Parser)]
#[command(name = "moodboard")]
#[command(about = "Headless driver for moodboard project files")]
struct Cli {
    /// Session config file (JSON); defaults apply otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a project's title and elements
    Show {
        /// Project file, e.g. boards/1.json
        project: PathBuf,
    },

    /// Queue generation prompts and wait for them to finish
    Generate {
        project: PathBuf,

        /// One task per prompt, run in order
        #[arg(required = true)]
        prompts: Vec<String>,

        /// Element id to use as a reference (repeatable)
        #[arg(long = "select")]
        select: Vec<String>,

        /// Make every generation fail
        #[arg(long)]
        fail: bool,

        /// Simulated generation time per task
        #[arg(long, default_value_t = 1500)]
        latency_ms: u64,
    },

    /// Add a text element at the viewport centre
    AddText {
        project: PathBuf,

        /// Text content (default: "New Text")
        text: Option<String>,
    },

    /// Add a card from the template library
    AddCard {
        project: PathBuf,

        /// hook, inspiration, template, product, or constraint
        card_type: String,

        /// Template index within the card type
        #[arg(long, default_value_t = 0)]
        template: usize,
    },

    /// Create an empty project file
    New {
        /// Directory to create the project in
        dir: PathBuf,

        #[arg(long, default_value = "")]
        title: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(SessionConfig::default().with_env_overrides()?),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Show { project } => commands::show(&project, &config, &mut out).await,
        Commands::Generate {
            project,
            prompts,
            select,
            fail,
            latency_ms,
        } => {
            let options = commands::GenerateOptions {
                prompts,
                select,
                fail,
                latency: std::time::Duration::from_millis(latency_ms),
            };
            commands::generate(&project, config, options, &mut out).await
        }
        Commands::AddText { project, text } => {
            commands::add_text(&project, config, text.as_deref(), &mut out).await
        }
        Commands::AddCard {
            project,
            card_type,
            template,
        } => commands::add_card(&project, config, &card_type, template, &mut out).await,
        Commands::New { dir, title } => commands::new_project(&dir, &title, &mut out).await,
    }
}
