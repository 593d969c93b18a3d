//! Edge deploy CLI entrypoint.
//!
//! This is the main entrypoint for the edge-deploy command-line tool.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use edge_deploy::cli::{Cli, Commands, LogFormat, OutputFormatter, StateCommands};
use edge_deploy::deploy::{DeployOptions, Orchestrator};
use edge_deploy::error::{EdgeDeployError, ManifestError, Result};
use edge_deploy::manifest::{Manifest, ManifestLoader, ManifestValidator};
use edge_deploy::platform::Clients;
use edge_deploy::settings::PlatformSettings;
use edge_deploy::state::{LocalState, LocalStateStore, StateStore, generate_holder_id};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let Cli {
        project,
        manifest,
        output,
        command,
        ..
    } = cli;
    let formatter = OutputFormatter::new(output);
    let manifest = manifest.as_deref();

    match command {
        Commands::Deploy {
            path,
            artifact,
            preset,
            template,
            firewall,
            auto,
        } => {
            let mut options = DeployOptions::new(&project)
                .with_firewall(firewall)
                .with_auto(auto);
            if let Some(path) = path {
                options = options.with_static_dir(path);
            }
            if let Some(artifact) = artifact {
                options = options.with_artifact(artifact);
            }
            if let Some(preset) = preset {
                options = options.with_preset(preset);
            }
            if let Some(template) = template {
                options = options.with_template(template);
            }
            cmd_deploy(&options, manifest, &formatter).await
        }
        Commands::Plan { preset, template } => {
            let mut options = DeployOptions::new(&project);
            if let Some(preset) = preset {
                options = options.with_preset(preset);
            }
            if let Some(template) = template {
                options = options.with_template(template);
            }
            cmd_plan(&options, manifest, &formatter).await
        }
        Commands::Validate { warnings } => cmd_validate(&project, manifest, warnings, &formatter),
        Commands::State { command } => cmd_state(&project, command, &formatter).await,
    }
}

/// Deploy the project.
async fn cmd_deploy(
    options: &DeployOptions,
    manifest_path: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let manifest = read_manifest(&options.project_dir, manifest_path, false)?;
    ManifestValidator::new().validate(&manifest)?;

    let settings = PlatformSettings::load(&options.project_dir)?;
    let clients = Clients::from_settings(&settings)?;
    let store = LocalStateStore::for_project(&options.project_dir);

    // Held from the state read to the final save.
    let lock = store.acquire_lock(&generate_holder_id()).await?;
    let outcome = deploy_locked(options, &manifest, &clients, &store, formatter).await;

    if let Err(e) = store.release_lock(&lock.lock_id).await {
        warn!("Failed to release state lock {}: {e}", lock.lock_id);
    }

    outcome
}

/// Loads state and runs the deploy while the caller holds the state lock.
async fn deploy_locked(
    options: &DeployOptions,
    manifest: &Manifest,
    clients: &Clients,
    store: &LocalStateStore,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut state = load_or_init_state(store, &options.project_dir, manifest).await?;
    let orchestrator = Orchestrator::new(options, clients, store);

    if !options.auto {
        let preview = orchestrator.preview(manifest, &state);
        eprintln!("{}", formatter.format_preview(&state.name, &preview));

        if !confirm("Do you want to deploy? [y/N]: ")? {
            eprintln!("Deploy cancelled.");
            return Ok(());
        }
    }

    let result = orchestrator.deploy(manifest, &mut state).await?;
    eprintln!("{}", formatter.format_result(&result));

    Ok(())
}

/// Show what a deploy would do.
async fn cmd_plan(
    options: &DeployOptions,
    manifest_path: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let manifest = read_manifest(&options.project_dir, manifest_path, false)?;
    ManifestValidator::new().validate(&manifest)?;

    let settings = PlatformSettings::load(&options.project_dir)?;
    let clients = Clients::from_settings(&settings)?;
    let store = LocalStateStore::for_project(&options.project_dir);
    let state = load_or_init_state(&store, &options.project_dir, &manifest).await?;

    let preview = Orchestrator::new(options, &clients, &store).preview(&manifest, &state);
    eprintln!("{}", formatter.format_preview(&state.name, &preview));

    Ok(())
}

/// Validate the manifest.
fn cmd_validate(
    project_dir: &Path,
    manifest_path: Option<&Path>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let manifest = read_manifest(project_dir, manifest_path, true)?;
    let result = ManifestValidator::new().check(&manifest);

    eprintln!(
        "{}",
        formatter.format_validation(&manifest, &result, show_warnings)
    );

    match result.errors.first() {
        Some(first) => Err(ManifestError::validation(first.message.clone(), first.field.clone()).into()),
        None => Ok(()),
    }
}

/// State management commands.
async fn cmd_state(
    project_dir: &Path,
    command: StateCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let store = LocalStateStore::for_project(project_dir);

    match command {
        StateCommands::Show => {
            let state = store.load_required().await?;
            eprintln!("{}", formatter.format_state(&state));
        }
        StateCommands::Lock { holder } => {
            let holder = holder.unwrap_or_else(generate_holder_id);
            let lock = store.acquire_lock(&holder).await?;
            eprintln!("{}", formatter.format_lock(&lock));
        }
        StateCommands::Unlock { lock_id, force } => {
            if force {
                store.force_unlock().await?;
                eprintln!("State forcefully unlocked.");
            } else if let Some(id) = lock_id {
                store.release_lock(&id).await?;
                eprintln!("State unlocked.");
            } else {
                return Err(EdgeDeployError::internal(
                    "Provide --lock-id or use --force",
                ));
            }
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Reads the manifest from an explicit path or the default locations.
///
/// Deploys run without a manifest when none is found and `required` is false.
fn read_manifest(project_dir: &Path, manifest_path: Option<&Path>, required: bool) -> Result<Manifest> {
    let loader = ManifestLoader::new(project_dir);

    if let Some(path) = manifest_path {
        return loader.parse(path);
    }

    match loader.locate() {
        Ok(path) => loader.parse(path),
        Err(e) if !required => {
            info!("{e}; continuing without a manifest");
            Ok(Manifest::default())
        }
        Err(e) => Err(e),
    }
}

/// Loads the project state, or starts a new one on first deploy.
async fn load_or_init_state(
    store: &LocalStateStore,
    project_dir: &Path,
    manifest: &Manifest,
) -> Result<LocalState> {
    if let Some(state) = store.load().await? {
        debug!("Loaded state for '{}'", state.name);
        return Ok(state);
    }

    let name = project_name(project_dir, manifest)?;
    info!("No state found, starting new project '{name}'");
    Ok(LocalState::new(&name))
}

/// Project name: the declared application, else the project directory name.
fn project_name(project_dir: &Path, manifest: &Manifest) -> Result<String> {
    if let Some(app) = manifest.application() {
        return Ok(app.name.clone());
    }

    let dir = std::fs::canonicalize(project_dir)?;
    dir.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| {
            EdgeDeployError::internal(format!(
                "Cannot derive a project name from {}",
                dir.display()
            ))
        })
}

/// Asks for a yes/no confirmation on stderr.
fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case("y"))
}
