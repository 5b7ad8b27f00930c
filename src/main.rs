//! Pickr CLI application entry point
//!
//! Hosts the selection coordinator on a desktop. Content handles are served
//! from directories configured as mounts, the permission prompt and the
//! picker are answered on the terminal, and the selection record lives in a
//! sled database so an interrupted run can be recovered.
//!
//! # Usage
//!
//! ```bash
//! # Pick a single file, typing its path at the prompt
//! pickr pick
//!
//! # Pick several images given up front, bytes loaded into memory
//! pickr pick -f image -m --with-data ~/a.png content://photos/b.png
//!
//! # Pick a directory
//! pickr pick -f dir
//!
//! # Retrieve the outcome of a run that was interrupted
//! pickr recover --json
//!
//! # Show how a handle would resolve
//! pickr resolve content://com.example.files/docs/report.pdf
//! ```
//!
//! # Configuration
//!
//! Configuration is stored in the user's config directory
//! (`~/.config/pickr/config.toml` on Linux) and created with defaults on
//! first run.

use pickr::{
    PickrError,
    cache::ResultCache,
    cli::{Cli, Commands, ConfigCommands},
    config::PickrConfig,
    coordinator::{CoordinatorSettings, PendingSelection, SelectionCoordinator},
    handle::ContentHandle,
    logging,
    outcome::SelectionOutcome,
    output,
    platform::{
        HostEvent, Platform,
        local::{ConfiguredVolumes, MountedProvider},
        terminal::{TerminalPermissions, TerminalPicker},
    },
    resolver::HandleResolver,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;
use tracing::debug;

type Result<T> = std::result::Result<T, PickrError>;

/// How long to wait for an outcome before draining host events again
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Print an outcome, returning whether it was a failure
fn print_outcome(outcome: &SelectionOutcome, json: bool, quiet: bool) -> Result<bool> {
    if json {
        let rendered = output::outcome_json(outcome)
            .map_err(|e| PickrError::InvalidInput(format!("Failed to render outcome: {e}")))?;
        println!("{rendered}");
    } else {
        for line in output::outcome_lines(outcome, quiet) {
            println!("{line}");
        }
    }
    Ok(outcome.failure_code().is_some())
}

fn open_cache(config: &PickrConfig) -> Result<Arc<ResultCache>> {
    Ok(Arc::new(ResultCache::open(&config.state_path)?))
}

/// Build a coordinator backed by the local host
fn coordinator(
    config: &PickrConfig,
    cache: Arc<ResultCache>,
    assume_yes: bool,
    preset: Vec<ContentHandle>,
) -> (SelectionCoordinator, Receiver<HostEvent>) {
    let (events_tx, events_rx) = mpsc::channel();
    let platform = Platform {
        provider: Arc::new(MountedProvider::from_config(config)),
        volumes: Arc::new(ConfiguredVolumes::from_config(config)),
        permissions: Box::new(TerminalPermissions::new(assume_yes, events_tx.clone())),
        launcher: Box::new(TerminalPicker::new(preset, events_tx)),
        status: None,
    };
    (
        SelectionCoordinator::new(platform, cache, CoordinatorSettings::from(config)),
        events_rx,
    )
}

/// Feed host events into the coordinator until the outcome arrives
fn pump(
    coordinator: &mut SelectionCoordinator,
    events: &Receiver<HostEvent>,
    pending: &PendingSelection,
) -> Result<SelectionOutcome> {
    loop {
        while let Ok(event) = events.try_recv() {
            debug!(?event, "host event");
            coordinator.handle_event(event);
        }
        if let Some(outcome) = pending.wait_timeout(POLL_INTERVAL)? {
            coordinator.wait_for_worker();
            return Ok(outcome);
        }
    }
}

/// A handle given on the command line, or a path relative to the working directory
fn parse_handle(raw: &str) -> Result<ContentHandle> {
    if raw.contains("://") {
        return Ok(ContentHandle::parse(raw)?);
    }
    Ok(ContentHandle::from_path(std::path::absolute(raw)?)?)
}

fn handle_pick_command(config: &PickrConfig, command: &Commands, quiet: bool) -> Result<bool> {
    let Commands::Pick {
        handles,
        yes,
        json,
        ..
    } = command
    else {
        return Err(PickrError::InvalidInput("not a pick command".into()));
    };

    let request = command.selection_request()?;
    let preset = handles
        .iter()
        .map(String::as_str)
        .map(parse_handle)
        .collect::<Result<Vec<_>>>()?;

    let cache = open_cache(config)?;
    let (mut coordinator, events) = coordinator(config, cache, *yes, preset);

    if let Some(earlier) = coordinator.recover()? {
        if !quiet && !json {
            println!("Outcome of an earlier, interrupted selection:");
        }
        print_outcome(&earlier, *json, quiet)?;
    }

    let pending = coordinator.select(request)?;
    let outcome = pump(&mut coordinator, &events, &pending)?;
    print_outcome(&outcome, *json, quiet)
}

fn handle_recover_command(config: &PickrConfig, json: bool, quiet: bool) -> Result<bool> {
    let cache = open_cache(config)?;
    let (mut coordinator, _events) = coordinator(config, cache, false, Vec::new());

    match coordinator.recover()? {
        Some(outcome) => print_outcome(&outcome, json, quiet),
        None => {
            if json {
                println!("null");
            } else if !quiet {
                println!("Nothing pending");
            }
            Ok(false)
        }
    }
}

fn handle_resolve_command(config: &PickrConfig, raw: &str, quiet: bool) -> Result<()> {
    let handle = ContentHandle::parse(raw)?;
    let resolver = HandleResolver::new(
        Arc::new(MountedProvider::from_config(config)),
        Arc::new(ConfiguredVolumes::from_config(config)),
        config.document_handles,
    );
    let resolution = resolver.resolve(&handle);
    println!("{}", output::resolution_line(&handle, &resolution, quiet));
    Ok(())
}

fn handle_clear_cache_command(config: &PickrConfig, quiet: bool) -> Result<()> {
    let cache = open_cache(config)?;
    let (coordinator, _events) = coordinator(config, cache, false, Vec::new());
    let removed = coordinator.clear_temporary_files()?;
    if !quiet {
        if removed {
            println!("Removed cached copies under {}", config.cache_root.display());
        } else {
            println!("Nothing to remove");
        }
    }
    Ok(())
}

fn handle_config_command(config: &PickrConfig, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => print!("{}", config.to_toml()?),
        ConfigCommands::Path => println!("{}", PickrConfig::config_path()?.display()),
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    let config = match &cli.config {
        Some(path) => PickrConfig::load_from(path)?,
        None => PickrConfig::load()?,
    };

    let _log_guard = logging::init(cli.verbose, config.log_dir.as_deref())?;

    let quiet = cli.quiet || config.quiet;

    let failed = match &cli.command {
        command @ Commands::Pick { .. } => handle_pick_command(&config, command, quiet)?,
        Commands::Recover { json } => handle_recover_command(&config, *json, quiet)?,
        Commands::Resolve { handle } => {
            handle_resolve_command(&config, handle, quiet)?;
            false
        }
        Commands::ClearCache => {
            handle_clear_cache_command(&config, quiet)?;
            false
        }
        Commands::Config { command } => {
            handle_config_command(&config, *command)?;
            false
        }
    };

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
