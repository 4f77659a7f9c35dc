mod build;
mod commands;
mod core;
mod npm;
mod pipeline;
mod release;
mod ui;
mod utils;

use clap::{Parser, Subcommand};
use commands::args::{BuildArgs, ReleaseArgs};
use core::config::BuildOverrides;
use core::error::{AddonError, print_error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Build, package and publish native Node addons
#[derive(Parser)]
#[command(name = "cargo")]
#[command(bin_name = "cargo")]
#[command(styles = get_styles())]
enum CargoCli {
  Addon(AddonCli),
}

#[derive(Parser)]
#[command(name = "addon")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct AddonCli {
  /// Project directory (where package.json and addon.toml live)
  #[arg(long, global = true, value_name = "DIR")]
  cwd: Option<PathBuf>,

  /// Root of the platform packages (default: npm)
  #[arg(long, global = true, value_name = "DIR")]
  npm_dir: Option<PathBuf>,

  /// Verbose output (debug logs, cargo --verbose)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the addon for one or more targets
  Build {
    #[command(flatten)]
    build: BuildArgs,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Create or refresh one npm package per target
  CreateNpmDirs {
    /// Plan only, write nothing
    #[arg(long)]
    dry_run: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Copy built .node files into their platform packages
  Artifacts {
    /// Directory to collect from (default: output dir)
    #[arg(long, value_name = "DIR")]
    artifacts_dir: Option<PathBuf>,
    /// Fail when any platform package has no artifact
    #[arg(long)]
    require_all: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Update manifests, publish platform packages, create the release
  Prepublish {
    #[command(flatten)]
    release: ReleaseArgs,
    /// Show what would happen without writing or publishing
    #[arg(long)]
    dry_run: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Sync the root package.json version into every platform package
  Version {
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Run the whole pipeline: build, npm dirs, artifacts, prepublish, version
  Release {
    #[command(flatten)]
    build: BuildArgs,
    #[command(flatten)]
    release: ReleaseArgs,
    /// Directory to collect from (default: output dir)
    #[arg(long, value_name = "DIR")]
    artifacts_dir: Option<PathBuf>,
    /// Fail when any platform package has no artifact
    #[arg(long)]
    require_all: bool,
    /// Publish stage dry run
    #[arg(long)]
    dry_run: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Print the effective configuration
  Config {
    #[command(flatten)]
    build: BuildArgs,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(verbose: bool) {
  // RUST_LOG wins over --verbose
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if verbose {
      EnvFilter::new("cargo_addon=debug")
    } else {
      EnvFilter::new("cargo_addon=info")
    }
  });

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .without_time()
    .with_writer(std::io::stderr)
    .init();
}

fn main() {
  let CargoCli::Addon(cli) = CargoCli::parse();
  init_tracing(cli.verbose);

  let current_dir = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  // Build args only exist on some commands; the rest resolve from addon.toml
  let mut overrides = match &cli.command {
    Commands::Build { build, .. } | Commands::Release { build, .. } | Commands::Config { build } => build.overrides(),
    _ => BuildOverrides::default(),
  };
  overrides.cwd = cli.cwd.clone();
  if cli.verbose {
    overrides.verbose = Some(true);
  }

  // Resolve configuration once; every command reads it from here
  let mut ctx = match core::context::ProjectContext::build(&current_dir, &overrides) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };
  if let Some(dir) = cli.npm_dir {
    ctx.config.npm.dir = Some(dir);
  }
  if let Commands::Artifacts {
    artifacts_dir: Some(dir),
    ..
  }
  | Commands::Release {
    artifacts_dir: Some(dir),
    ..
  } = &cli.command
  {
    ctx.config.npm.artifacts_dir = Some(dir.clone());
  }
  let ctx = ctx;

  let result = match cli.command {
    Commands::Build { json, .. } => commands::run_build(&ctx, json),
    Commands::CreateNpmDirs { dry_run, json } => commands::run_create_npm_dirs(&ctx, dry_run, json),
    Commands::Artifacts { require_all, json, .. } => commands::run_artifacts(&ctx, require_all, json),
    Commands::Prepublish { release, dry_run, json } => {
      commands::run_prepublish(&ctx, &release.settings(), dry_run, json)
    }
    Commands::Version { json } => commands::run_version(&ctx, json),
    Commands::Release {
      release,
      require_all,
      dry_run,
      json,
      ..
    } => commands::run_release(&ctx, &release.settings(), dry_run, require_all, json),
    Commands::Config { .. } => commands::run_config(&ctx),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: AddonError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
