mod logging;

use std::{io::IsTerminal as _, path::PathBuf, process::exit};

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{CommandFactory as _, Parser, Subcommand, ValueEnum};
use license_core::{
    codec::{Codec as _, JsonCodec, MsgpackCodec},
    io::{PathStore, Sink},
    license::License,
    manager::{LicenseConsumerManager, StoreManager},
};
use license_guard::{
    disabling::DisablingManager,
    state::{FlagFile, StateGuard as _},
};

fn main() {
    let args = Args::parse();
    handle_result(run_args(args));
}

fn run_args(args: Args) -> Result<()> {
    let mut logger = logging::set_up(logging::Options {
        verbose: args.options.verbose,
        color: std::io::stderr().is_terminal(),
    })?;
    run_command(&args.options, &args.command)?;
    logger.tear_down()
}

fn run_command(options: &Options, command: &Commands) -> Result<()> {
    match command {
        Commands::Install { file } => with_manager(options, |manager| {
            manager
                .install(&PathStore::new(file))
                .with_context(|| format!("could not install license from {}", file.display()))?;
            println!(
                "License installed. Remove {} to enable the application again.",
                options.guard_file.display()
            );
            Ok(())
        }),
        Commands::Uninstall => with_manager(options, |manager| {
            manager
                .uninstall()
                .context("could not uninstall license")?;
            println!("License uninstalled.");
            Ok(())
        }),
        Commands::Show => with_manager(options, |manager| {
            let license = manager.load().context("could not load license")?;
            println!("{}", serde_json::to_string_pretty(&license)?);
            Ok(())
        }),
        Commands::Verify => with_manager(options, |manager| {
            manager.verify().context("license verification failed")?;
            println!("License is valid.");
            Ok(())
        }),
        Commands::Status => {
            let guard = FlagFile::new(&options.guard_file);
            let status = if guard.is_enabled() {
                "enabled"
            } else {
                "disabled"
            };
            println!("{}", status);
            Ok(())
        }
        Commands::Enable => {
            FlagFile::new(&options.guard_file).set_enabled(true);
            Ok(())
        }
        Commands::Create {
            holder,
            issuer,
            days,
            output,
        } => {
            let now = Utc::now();
            let mut license = License::new(&options.subject, holder, issuer, now);
            license.not_before = Some(now);
            license.not_after = match *days {
                Some(days) => Some(
                    Duration::try_days(days)
                        .and_then(|validity| now.checked_add_signed(validity))
                        .ok_or_else(|| anyhow::anyhow!("--days {} is out of range", days))?,
                ),
                None => None,
            };
            encode(options.format, &PathStore::new(output), &license)
                .with_context(|| format!("could not write license to {}", output.display()))
        }
        Commands::GenerateMan => (|| {
            let cmd = Args::command();
            let man = clap_mangen::Man::new(cmd);
            let mut buffer: Vec<u8> = Default::default();
            man.render(&mut buffer)?;
            println!("{}", String::from_utf8(buffer)?);
            Ok(())
        })(),
        Commands::GenerateMarkdown => {
            let opts = clap_markdown::MarkdownOptions::new().show_footer(false);
            let markdown: String = clap_markdown::help_markdown_custom::<Args>(&opts);
            println!("{}", markdown);
            Ok(())
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(
                *shell,
                &mut cmd,
                "license-runner",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

/// Run `f` with the guarded store manager described by `options`.
fn with_manager<T>(
    options: &Options,
    f: impl FnOnce(&dyn LicenseConsumerManager) -> Result<T>,
) -> Result<T> {
    let guard = FlagFile::new(&options.guard_file);
    let store = PathStore::new(&options.store);
    match options.format {
        Format::Msgpack => f(&DisablingManager::new(
            guard,
            StoreManager::new(options.subject.as_str(), store, MsgpackCodec),
        )),
        Format::Json => f(&DisablingManager::new(
            guard,
            StoreManager::new(options.subject.as_str(), store, JsonCodec),
        )),
    }
}

fn encode(format: Format, sink: &dyn Sink, license: &License) -> Result<()> {
    match format {
        Format::Msgpack => MsgpackCodec.encode(sink, license)?,
        Format::Json => JsonCodec.encode(sink, license)?,
    }
    Ok(())
}

fn handle_result(r: Result<()>) {
    match r {
        Ok(()) => {}
        Err(e) => {
            eprintln!("license-runner error: {:#}", e);
            exit(1);
        }
    }
}

/// Install and uninstall licenses while the licensed application is disabled
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: Options,
}

#[derive(Parser, Debug, Clone)]
struct Options {
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    /// The file that holds the installed license
    #[arg(long, global = true, default_value = "license.store")]
    store: PathBuf,

    /// The subject that installed licenses must be issued for
    #[arg(long, global = true, default_value = "default")]
    subject: String,

    /// Marker file that disables the licensed application while it exists
    #[arg(long, global = true, default_value = "license.disabled")]
    guard_file: PathBuf,

    /// Encoding of license files and of the store
    #[arg(long, global = true, value_enum, default_value_t = Format::Msgpack)]
    format: Format,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    /// Binary MessagePack
    Msgpack,
    /// JSON text
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install a license file, disabling the application while doing so
    Install {
        /// The license file, encoded according to --format
        file: PathBuf,
    },

    /// Uninstall the installed license, disabling the application while doing so
    Uninstall,

    /// Print the installed license as JSON
    Show,

    /// Check that the installed license is valid now
    Verify,

    /// Print whether the application is enabled
    Status,

    /// Enable the application again
    Enable,

    /// Write a new, unsigned license file for --subject
    ///
    /// This is meant for trying out installation and for tests.
    Create {
        #[arg(long)]
        holder: String,

        #[arg(long, default_value = "license-runner")]
        issuer: String,

        /// Number of days the license is valid; unlimited if omitted
        #[arg(long)]
        days: Option<i64>,

        #[arg(long, short)]
        output: PathBuf,
    },

    /// Generate markdown documentation for license-runner
    #[command(hide = true)]
    GenerateMarkdown,

    /// Generate a manpage for license-runner
    #[command(hide = true)]
    GenerateMan,

    /// Generate shell completion for license-runner
    #[command(hide = true)]
    GenerateCompletion {
        /// The shell to generate completion for
        #[arg(long)]
        shell: clap_complete::Shell,
    },
}
