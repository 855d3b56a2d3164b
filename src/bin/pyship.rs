//! pyship CLI
//!
//! Release automation for Python packages: build and upload to PyPI, create
//! the GitHub repository, or run the complete release.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use pyship::core::config_loader::CONFIG_FILENAME;
use pyship::orchestration::SUMMARY_FILENAME;
use pyship::{
    BuildOptions, BuildPublisher, CommandRunner, ConfigLoadOptions, ConfigLoader, DryRunExecutor,
    GithubOptions, PipelineReport, PublishOptions, ReleasePublisher, RepoProvisioner,
    SafeCommandExecutor, ShipConfig, StepStatus, TaskContext, validation,
};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Release automation for Python packages
#[derive(Parser)]
#[command(name = "pyship")]
#[command(version)]
#[command(about = "Release automation for Python packages", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Project directory
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Configuration file (defaults to <project-dir>/.pyship.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print commands instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Kill any single command running longer than this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Print the step report as JSON instead of the summary
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the distribution and upload it to PyPI
    Build {
        /// Upload to Test PyPI
        #[arg(long)]
        test: bool,

        /// Skip the test suite
        #[arg(long)]
        skip_tests: bool,

        /// Keep build/, dist/ and *.egg-info
        #[arg(long)]
        skip_clean: bool,
    },

    /// Create and configure the GitHub repository
    Github {
        /// Do not push the local tree
        #[arg(long)]
        skip_push: bool,

        /// Do not create the GitHub release
        #[arg(long)]
        skip_release: bool,
    },

    /// Validate, test, publish to GitHub and PyPI, then verify
    Publish {
        /// Skip the test suite, linter and type checker
        #[arg(long)]
        skip_tests: bool,

        /// Skip the GitHub stage
        #[arg(long)]
        skip_github: bool,

        /// Skip the PyPI stage
        #[arg(long)]
        skip_pypi: bool,

        /// Upload to Test PyPI instead of PyPI
        #[arg(long)]
        test_pypi: bool,
    },

    /// Validate the configuration and the package without running anything
    Check,

    /// Write a starter .pyship.yaml
    Init {
        /// GitHub owner of the repository
        #[arg(long, default_value = "your-github-user")]
        owner: String,

        /// Package name (defaults to the project directory name)
        #[arg(long)]
        name: Option<String>,

        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    match run(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "pyship=debug,info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

/// One of the three release pipelines, with its flags
enum Pipeline {
    Build(BuildOptions),
    Github(GithubOptions),
    Publish(PublishOptions),
}

async fn run(cli: Cli) -> Result<i32> {
    let global = cli.global;

    let pipeline = match cli.command {
        Commands::Init { owner, name, force } => {
            return init_command(&global.project_dir, &owner, name, force).await;
        }
        Commands::Check => {
            let config = load_config(&global).await?;
            return check_command(&global.project_dir, &config).await;
        }
        Commands::Build {
            test,
            skip_tests,
            skip_clean,
        } => Pipeline::Build(BuildOptions {
            test,
            skip_tests,
            skip_clean,
        }),
        Commands::Github {
            skip_push,
            skip_release,
        } => Pipeline::Github(GithubOptions {
            skip_push,
            skip_release,
        }),
        Commands::Publish {
            skip_tests,
            skip_github,
            skip_pypi,
            test_pypi,
        } => Pipeline::Publish(PublishOptions {
            skip_tests,
            skip_github,
            skip_pypi,
            test_pypi,
        }),
    };

    let config = load_config(&global).await?;
    let runner = build_runner(&global, &config)?;
    let ctx =
        TaskContext::new(runner.as_ref(), &global.project_dir, &config).dry_run(global.dry_run);

    let report = match pipeline {
        Pipeline::Build(options) => BuildPublisher::new(ctx).run(&options).await,
        Pipeline::Github(options) => RepoProvisioner::new(ctx).run(&options).await,
        Pipeline::Publish(options) => {
            let report = ReleasePublisher::new(ctx).run(&options).await;
            if report.status_of("summary report") == Some(StepStatus::Passed) {
                println!("Summary written to {}", SUMMARY_FILENAME);
            }
            report
        }
    };

    if global.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if report.success { 0 } else { 1 });
    }
    Ok(print_report(&report))
}

async fn load_config(global: &GlobalArgs) -> Result<ShipConfig> {
    let mut options = ConfigLoadOptions::for_project(&global.project_dir);
    options.config_file = global.config.clone();

    let config = ConfigLoader::load(options)
        .await
        .context("failed to load configuration")?;
    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

/// Real executor, or the dry-run logger wrapping it for read-only checks
fn build_runner(global: &GlobalArgs, config: &ShipConfig) -> Result<Box<dyn CommandRunner>> {
    let mut executor = SafeCommandExecutor::new(&global.project_dir)
        .with_context(|| format!("cannot run commands in {}", global.project_dir.display()))?
        .allow(config.package().python);
    if let Some(secs) = global.timeout {
        executor.set_timeout(Duration::from_secs(secs));
    }

    if global.dry_run {
        Ok(Box::new(DryRunExecutor::with_read_only(executor)))
    } else {
        Ok(Box::new(executor))
    }
}

fn print_report(report: &PipelineReport) -> i32 {
    println!("\n📋 {} ({})\n", report.pipeline, report.run_id);
    for step in &report.steps {
        let icon = match step.status {
            StepStatus::Passed => "✅",
            StepStatus::Failed => "❌",
            StepStatus::Warned => "⚠️ ",
            StepStatus::Skipped => "⏭️ ",
        };
        match &step.message {
            Some(message) => println!(
                "  {} {} ({}ms): {}",
                icon, step.name, step.duration_ms, message
            ),
            None => println!("  {} {} ({}ms)", icon, step.name, step.duration_ms),
        }
    }

    if report.success {
        let warnings = report.warnings().count();
        if warnings > 0 {
            println!("\n✅ Completed with {} warning(s)", warnings);
        } else {
            println!("\n✅ Completed successfully");
        }
        return 0;
    }

    eprintln!("\n❌ {} failed", report.pipeline);
    if let Some(error) = &report.error {
        eprintln!("  {}", error);
    }
    if !report.suggested_actions.is_empty() {
        eprintln!("\nSuggested actions:");
        for action in &report.suggested_actions {
            eprintln!("  - {}", action);
        }
    }
    1
}

async fn check_command(project_dir: &Path, config: &ShipConfig) -> Result<i32> {
    println!("\n🔍 Release Check\n");

    let result = ConfigLoader::validate(config);
    println!("{}\n", ConfigLoader::format_validation_result(&result));

    // A package that cannot be read at all is one more problem to list
    let problems =
        match validation::package_problems(project_dir, &config.package(), &config.content()).await
        {
            Ok(problems) => problems,
            Err(e) => vec![e],
        };
    if problems.is_empty() {
        println!("✅ Package is ready to publish");
    } else {
        println!("❌ Package problems:");
        for problem in &problems {
            println!("  - [{}] {}", problem.code(), problem);
        }
    }

    Ok(if result.valid && problems.is_empty() { 0 } else { 1 })
}

async fn init_command(
    project_dir: &Path,
    owner: &str,
    name: Option<String>,
    force: bool,
) -> Result<i32> {
    println!("\n🎯 Initialize pyship\n");

    let path = project_dir.join(CONFIG_FILENAME);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let name = match name {
        Some(name) => name,
        None => project_dir
            .canonicalize()
            .with_context(|| format!("cannot resolve {}", project_dir.display()))?
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("cannot derive a package name from the project directory")?,
    };

    let yaml = serde_yaml::to_string(&ShipConfig::starter(&name, owner))?;
    tokio::fs::write(&path, yaml)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!("✅ Wrote {}", path.display());
    Ok(0)
}
