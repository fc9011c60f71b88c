use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use futures::executor::block_on;
use lazypack::{
    BuildContext, BuildHost, Config, DiagnosticLevel, LazyModuleGenerator, SourceTarget,
    fs::{DiskFileSystem, MemoryFileSystem},
    host::FileSystem,
    manifest::load_manifest,
};
use log::{LevelFilter, debug, error, info, warn};

/// Assemble lazily loadable component bundles from a build manifest
#[derive(Debug, Parser)]
#[command(name = "lazypack", version, about)]
struct Cli {
    /// Build manifest produced by the bundler
    #[arg(short, long)]
    manifest: PathBuf,

    /// Output directory; repeat to write to several destinations
    #[arg(short = 'o', long = "out-dir")]
    out_dirs: Vec<PathBuf>,

    /// Language level of the emitted code
    #[arg(long, value_enum)]
    target: Option<SourceTarget>,

    /// Minify every output
    #[arg(long)]
    minify: bool,

    /// Use content hashes as bundle identifiers
    #[arg(long)]
    hash: bool,

    /// Config file to use instead of ./lazypack.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run the pipeline without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if !self.out_dirs.is_empty() {
            config.destinations.clone_from(&self.out_dirs);
        }
        if let Some(target) = self.target {
            config.source_target = target;
        }
        config.minify_js |= self.minify;
        config.hash_file_names |= self.hash;
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::new();
    match verbose {
        0 => builder.filter_level(LevelFilter::Info).parse_default_env(),
        1 => builder.filter_level(LevelFilter::Debug),
        _ => builder.filter_level(LevelFilter::Trace),
    };
    builder.init();
}

/// Returns `false` when the build recorded error diagnostics
fn run(cli: &Cli) -> Result<bool> {
    let project_dir = std::env::current_dir().context("Failed to read current directory")?;
    let mut config = Config::load(cli.config.as_deref(), &project_dir)?;
    cli.apply(&mut config);
    config.validate()?;
    debug!("Effective config: {config:?}");

    let manifest = load_manifest(&cli.manifest)?;

    let memory = Arc::new(MemoryFileSystem::new());
    let fs: Arc<dyn FileSystem> = if cli.dry_run {
        memory.clone()
    } else {
        Arc::new(DiskFileSystem)
    };
    let host = BuildHost::from_config(&config, fs);
    let build_ctx = BuildContext::new(manifest.entry_modules);

    let bundle_modules = block_on(
        LazyModuleGenerator::new(&config, &host).generate(&build_ctx, manifest.artifacts),
    )?;

    for bundle_module in &bundle_modules {
        debug!(
            "{}: {}",
            bundle_module.entry_key,
            bundle_module
                .outputs
                .iter()
                .map(|output| format!("{}={}", output.mode_name, output.file_name))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if cli.dry_run {
        for path in memory.paths() {
            info!("Would write {}", path.display());
        }
    }

    let diagnostics = build_ctx.diagnostics.snapshot();
    for diagnostic in &diagnostics {
        match diagnostic.level {
            DiagnosticLevel::Error => error!("{diagnostic}"),
            DiagnosticLevel::Warning => warn!("{diagnostic}"),
        }
    }

    info!(
        "Generated {} lazy bundles into {} destination(s) with {} diagnostic(s)",
        bundle_modules.len(),
        config.destinations.len(),
        diagnostics.len()
    );
    Ok(!build_ctx.diagnostics.has_errors())
}
