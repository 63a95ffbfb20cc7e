use super::print::{render_cells, render_info, render_migrated, render_saved};
use super::setup::{Cli, Commands};
use clap::Parser;
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use workbook::config::WorkbookConfig;
use workbook::error::Result;
use workbook::package::{AllowAll, CancellationToken, SaveOptions, WorkbookPackage};

/// Overrides the platform config directory.
const CONFIG_DIR_ENV: &str = "WORKBOOK_CONFIG_DIR";

struct AppContext {
    config: WorkbookConfig,
    cancel: CancellationToken,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let ctx = init_context()?;

    match cli.command {
        Commands::Info { path } => handle_info(&ctx, &path),
        Commands::Cells { path } => handle_cells(&ctx, &path),
        Commands::Save {
            path,
            output,
            archive,
        } => handle_save(&ctx, &path, output, archive),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn init_context() -> Result<AppContext> {
    let config = match config_dir() {
        Some(dir) => WorkbookConfig::load(dir)?,
        None => WorkbookConfig::default(),
    };
    Ok(AppContext {
        config,
        cancel: CancellationToken::new(),
    })
}

fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    ProjectDirs::from("com", "xamarin", "workbook").map(|dirs| dirs.config_dir().to_path_buf())
}

fn open(ctx: &AppContext, path: &Path) -> Result<WorkbookPackage> {
    WorkbookPackage::open_with_config(path, ctx.config.clone(), &AllowAll, &ctx.cancel)
}

fn handle_info(ctx: &AppContext, path: &Path) -> Result<()> {
    let package = open(ctx, path)?;
    let dependencies = package.dependency_files()?;
    print!("{}", render_info(&package, &dependencies));
    package.close()
}

fn handle_cells(ctx: &AppContext, path: &Path) -> Result<()> {
    let package = open(ctx, path)?;
    print!("{}", render_cells(package.page()));
    package.close()
}

fn handle_save(
    ctx: &AppContext,
    path: &Path,
    output: Option<PathBuf>,
    archive: bool,
) -> Result<()> {
    let mut package = open(ctx, path)?;
    let migrating = package.page().needs_migration();

    let mut operation = package.create_save_operation();
    if let Some(output) = output {
        operation.destination = output;
    }
    if archive {
        operation.options = SaveOptions::ARCHIVE;
    }

    package.save(&operation, &ctx.cancel)?;
    print!("{}", render_saved(&operation.destination, &package));
    if migrating {
        print!("{}", render_migrated());
    }
    package.close()
}
