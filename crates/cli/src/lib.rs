pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use slotkeeper_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "slotkeeper",
    about = "Slotkeeper appointment gateway CLI",
    long_about = "Operate the appointment store and run the tool gateway that a conversational \
                  assistant calls to schedule, search, update and delete appointments.",
    after_help = "Examples:\n  slotkeeper migrate\n  slotkeeper call list_all_appointments\n  \
                  slotkeeper call search_for_appointments --args '{\"criteria\":\"date\",\"value\":\"2024-12-25\"}'\n  \
                  slotkeeper serve < calls.jsonl"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Config file to load instead of slotkeeper.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Database URL, overriding file and environment")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Log level, overriding file and environment")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Refuse direct bulk deletes; require preview and confirm")]
    require_delete_preview: bool,
}

impl GlobalArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                log_level: self.log_level.clone(),
                require_delete_preview: self.require_delete_preview.then_some(true),
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo appointments; safe to run repeatedly")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, database connectivity and schema state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print the tool catalog as JSON Schema")]
    Tools,
    #[command(about = "Invoke one tool and print its reply")]
    Call {
        #[arg(help = "Tool name, e.g. schedule_appointment")]
        tool: String,
        #[arg(long = "args", help = "Tool arguments as a JSON object")]
        arguments: Option<String>,
    },
    #[command(about = "Answer JSON-lines tool calls from stdin on stdout")]
    Serve,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.global.load_options();

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(options),
        Command::Seed => commands::seed::run(options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(options, json) }
        }
        Command::Tools => commands::tools::run(),
        Command::Call { tool, arguments } => {
            commands::call::run(options, &tool, arguments.as_deref())
        }
        Command::Serve => commands::serve::run(options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr; stdout carries command payloads and `serve` replies.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
