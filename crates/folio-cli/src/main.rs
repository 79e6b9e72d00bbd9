//! folio CLI
//!
//! Command-line editor and viewer for the portfolio content store.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use folio_core::{Config, ContentKey};

mod commands;
mod output;

use commands::parse_key;
use commands::project::NewProject;
use commands::skill::NewSkill;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "folio - edit and watch portfolio content")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to config file (default: ~/.config/folio/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show content with the tier it was resolved from
    Show {
        /// Content key (all keys when omitted)
        #[arg(value_parser = parse_key)]
        key: Option<ContentKey>,
    },
    /// Replace a whole field with a raw value
    Set {
        #[arg(value_parser = parse_key)]
        key: ContentKey,
        /// New value (JSON text for structured keys)
        value: Option<String>,
        /// Read the value from a file
        #[arg(short, long, conflicts_with = "value")]
        file: Option<PathBuf>,
    },
    /// Landing page header lines
    Header {
        #[command(subcommand)]
        command: Option<HeaderCommands>,
    },
    /// Tagline text
    Tagline {
        #[command(subcommand)]
        command: Option<TaglineCommands>,
    },
    /// Skill cards
    Skill {
        #[command(subcommand)]
        command: Option<SkillCommands>,
    },
    /// Project tiles
    Project {
        #[command(subcommand)]
        command: Option<ProjectCommands>,
    },
    /// Verified credentials section
    Verified {
        #[command(subcommand)]
        command: Option<VerifiedCommands>,
    },
    /// Upload an image and add it to the uploaded images list
    Upload {
        /// File to upload
        file: PathBuf,
        /// Embed the file as a data URL instead of uploading it
        #[arg(long)]
        inline: bool,
    },
    /// List uploaded images
    Images,
    /// Print content changes as they happen (Ctrl-C to stop)
    Watch {
        /// Poll interval in milliseconds (default: poll_interval_ms from config)
        #[arg(short, long)]
        interval: Option<u64>,
        /// Only report these keys
        #[arg(value_parser = parse_key)]
        keys: Vec<ContentKey>,
    },
    /// Show server reachability and local cache state
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum HeaderCommands {
    /// Show the header lines
    Show,
    /// Replace header lines in order (1 to 4 lines)
    Set {
        #[arg(required = true, num_args = 1..=4)]
        lines: Vec<String>,
    },
}

#[derive(Subcommand)]
enum TaglineCommands {
    /// Show the tagline
    Show,
    /// Replace the tagline
    Set { text: String },
}

#[derive(Subcommand)]
enum SkillCommands {
    /// List skill cards
    #[command(alias = "ls")]
    List,
    /// Add a skill card
    Add(NewSkill),
    /// Remove a skill card
    #[command(alias = "rm")]
    Remove { id: String },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// List project tiles
    #[command(alias = "ls")]
    List,
    /// Add a project tile
    Add(NewProject),
    /// Remove a project tile
    #[command(alias = "rm")]
    Remove { id: String },
}

#[derive(Subcommand)]
enum VerifiedCommands {
    /// Show the section
    Show,
    /// Replace the about text
    About { text: String },
    /// Replace the photo URL
    Photo { url: String },
    /// Add an academic result
    ResultAdd {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Image URL
        #[arg(short, long, default_value = "")]
        image: String,
    },
    /// Remove an academic result
    ResultRemove { id: String },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (server_url, poll_interval_ms, data_dir, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work even when the stored config is unusable
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let client = commands::open_client(&config)?;
    let editor = folio_core::ContentEditor::new(client.clone());

    match cli.command {
        Commands::Show { key } => commands::content::show(&editor, key, &output).await,
        Commands::Set { key, value, file } => {
            commands::content::set(&editor, key, value, file, &output).await
        }
        Commands::Header { command } => match command {
            Some(HeaderCommands::Show) | None => commands::header::show(&editor, &output).await,
            Some(HeaderCommands::Set { lines }) => {
                commands::header::set(&editor, lines, &output).await
            }
        },
        Commands::Tagline { command } => match command {
            Some(TaglineCommands::Show) | None => commands::tagline::show(&editor, &output).await,
            Some(TaglineCommands::Set { text }) => {
                commands::tagline::set(&editor, text, &output).await
            }
        },
        Commands::Skill { command } => match command {
            Some(SkillCommands::List) | None => commands::skill::list(&editor, &output).await,
            Some(SkillCommands::Add(new)) => commands::skill::add(&editor, new, &output).await,
            Some(SkillCommands::Remove { id }) => {
                commands::skill::remove(&editor, id, &output).await
            }
        },
        Commands::Project { command } => match command {
            Some(ProjectCommands::List) | None => commands::project::list(&editor, &output).await,
            Some(ProjectCommands::Add(new)) => commands::project::add(&editor, new, &output).await,
            Some(ProjectCommands::Remove { id }) => {
                commands::project::remove(&editor, id, &output).await
            }
        },
        Commands::Verified { command } => match command {
            Some(VerifiedCommands::Show) | None => {
                commands::verified::show(&editor, &output).await
            }
            Some(VerifiedCommands::About { text }) => {
                commands::verified::set_about(&editor, text, &output).await
            }
            Some(VerifiedCommands::Photo { url }) => {
                commands::verified::set_photo(&editor, url, &output).await
            }
            Some(VerifiedCommands::ResultAdd {
                title,
                description,
                image,
            }) => commands::verified::add_result(&editor, title, description, image, &output).await,
            Some(VerifiedCommands::ResultRemove { id }) => {
                commands::verified::remove_result(&editor, id, &output).await
            }
        },
        Commands::Upload { file, inline } => {
            commands::upload::upload(&editor, &file, inline, &output).await
        }
        Commands::Images => commands::upload::list(&editor, &output).await,
        Commands::Watch { interval, keys } => {
            let interval = Duration::from_millis(interval.unwrap_or(config.poll_interval_ms).max(1));
            commands::watch::watch(&client, interval, keys, &output).await
        }
        Commands::Status => commands::status::show(&client, &config, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Log to a file when FOLIO_LOG is set, so normal output stays clean
fn init_logging(config: &Config) {
    let Ok(filter) = std::env::var("FOLIO_LOG") else {
        return;
    };

    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let log_file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = if filter.contains('=') {
        EnvFilter::new(filter)
    } else {
        EnvFilter::new(format!("folio_core={},folio_cli={}", filter, filter))
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging to {:?}", log_path);
}
