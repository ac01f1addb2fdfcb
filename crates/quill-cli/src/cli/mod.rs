//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use quill_core::config;
use quill_core::core::interrupt;
use quill_core::logging::{self, LogTarget};

mod commands;

#[derive(Parser)]
#[command(name = "quill")]
#[command(version)]
#[command(about = "Edit a markdown document by chatting with an assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Markdown file to edit (default: `[document] path`, then $QUILL_HOME/document.md)
    #[arg(long, value_name = "PATH", global = true)]
    document: Option<PathBuf>,

    /// Override the model from config
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Extra instructions appended to the system prompt (empty clears config)
    #[arg(long, global = true)]
    system_prompt: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Runs one non-interactive turn against the document
    Exec {
        /// The request to send to the assistant
        #[arg(short, long)]
        prompt: String,

        /// Print the resulting document to stdout after the reply
        #[arg(long)]
        print_document: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Inspect or reset the working document
    Document {
        #[command(subcommand)]
        command: DocumentCommands,
    },

    /// Render a markdown file to stdout the way the document panel shows it
    Render {
        /// Markdown file to render
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Use the line-oriented renderer instead of the full markdown one
        #[arg(long)]
        simple: bool,

        /// Wrap width in columns
        #[arg(long, default_value_t = 80)]
        width: usize,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
}

#[derive(clap::Subcommand)]
enum DocumentCommands {
    /// Show the path of the working document
    Path,
    /// Print the working document
    Show,
    /// Replace the working document with the starter template
    Reset,
    /// Make PATH the default document in config.toml
    Use {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init()?;

    // The TUI owns the terminal, so chat logs to a file.
    let target = if cli.command.is_none() {
        LogTarget::File
    } else {
        LogTarget::Stderr
    };
    let _log_guard = logging::init(target)?;

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        command,
        document,
        model,
        system_prompt,
    } = cli;

    // Commands that must work with a broken or missing config.
    match &command {
        Some(Commands::Config { command }) => {
            return match command {
                ConfigCommands::Path => {
                    commands::config::path();
                    Ok(())
                }
                ConfigCommands::Init => commands::config::init(),
                ConfigCommands::Generate => commands::config::generate(),
            };
        }
        Some(Commands::Render {
            file,
            simple,
            width,
        }) => return commands::render::run(file, *simple, *width),
        _ => {}
    }

    let mut config = config::Config::load().context("load config")?;
    if let Some(model) = model {
        config.model = model;
    }
    if let Some(sp) = system_prompt.as_deref() {
        let trimmed = sp.trim();
        config.system_prompt = (!trimmed.is_empty()).then(|| trimmed.to_string());
        config.system_prompt_file = None;
    }
    let document_path = document.unwrap_or_else(|| config.document_path());
    tracing::debug!(
        document = %document_path.display(),
        model = %config.model,
        "configuration resolved"
    );

    let Some(command) = command else {
        return commands::chat::run(&config, &document_path).await;
    };

    match command {
        Commands::Exec {
            prompt,
            print_document,
        } => {
            commands::exec::run(commands::exec::ExecRunOptions {
                prompt: &prompt,
                config: &config,
                document_path: &document_path,
                print_document,
            })
            .await
        }
        Commands::Document { command } => match command {
            DocumentCommands::Path => {
                commands::document::path(&document_path);
                Ok(())
            }
            DocumentCommands::Show => commands::document::show(&document_path),
            DocumentCommands::Reset => commands::document::reset(&document_path),
            DocumentCommands::Use { path } => commands::document::use_path(&path),
        },
        Commands::Config { .. } | Commands::Render { .. } => Ok(()),
    }
}
