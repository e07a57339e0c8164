use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use deplog_core::{short_hash, FailurePolicy, ImageTag, PipelineError, Variant};
use deplog_engine::{CliEngine, ContainerEngine};
use deplog_manifest::{ManifestError, ProjectManifest};
use deplog_runner::{
    plan_jobs, run_job, Config, FsPublisher, JobSpec, PlanSettings, RunContext, RunSummary, VariantScheduler,
};

#[derive(Parser)]
#[command(name = "deplog", version, about = "Build each variant of a Python package and log its dependencies")]
struct Cli {
    /// Config file (default: <project>/deplog.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build one image from a build file and write its dependency log
    Run {
        build_file: PathBuf,
        output_log_path: PathBuf,
        subtitle: String,
        image_tag: Option<String>,
        #[arg(long)]
        use_alternate_engine: bool,
        /// Build context directory
        #[arg(long, default_value = ".")]
        context: PathBuf,
        /// Package to leave out of its own freeze listing
        #[arg(long)]
        self_package: Option<String>,
        #[arg(long)]
        repo: Option<String>,
    },

    /// Build the base install and every extra, one log per variant
    RunAll {
        #[arg(long, default_value = ".")]
        project: PathBuf,
        /// Extra to build (repeatable); default: every extra in the manifest
        #[arg(long = "extra")]
        extras: Vec<String>,
        /// Variants in flight at once; 0 = no limit
        #[arg(long)]
        jobs: Option<usize>,
        #[arg(long)]
        fail_fast: bool,
        #[arg(long)]
        use_alternate_engine: bool,
        /// Write a JSON summary of the run here
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Print the extras declared by the project manifest
    ListVariants {
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },

    /// Print the package name declared by the project manifest
    PackageName {
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },

    /// Check that the container engine is installed and responding
    Doctor {
        #[arg(long)]
        use_alternate_engine: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // help and --version are not errors
            return if e.use_stderr() { ExitCode::from(1) } else { ExitCode::SUCCESS };
        }
    };

    match dispatch(cli).await {
        Ok(code) => exit_code(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code(error_code(&e))
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir()?;

    match cli.cmd {
        Command::Run { build_file, output_log_path, subtitle, image_tag, use_alternate_engine, context, self_package, repo } => {
            if !build_file.is_file() {
                return Err(PipelineError::InputNotFound(build_file).into());
            }
            let cfg = load_config(cli.config.as_deref(), &cwd)?;
            let build_file_content =
                std::fs::read_to_string(&build_file).with_context(|| format!("read {}", build_file.display()))?;
            let image_tag = match image_tag {
                Some(t) => ImageTag::from_str(t),
                None => derived_tag(&cfg.engine.image_prefix, &output_log_path),
            };
            let self_package = self_package.or_else(|| cfg.project.self_package.clone()).unwrap_or_default();

            let mut ctx = run_context(&cfg, engine(&cfg, use_alternate_engine), self_package, context);
            if let Some(repo) = repo {
                ctx.repo = repo;
            }
            let spec = JobSpec { variant: Variant::Base, build_file_content, image_tag, subtitle, target_path: output_log_path };
            let outcome = run_job(&ctx, spec).await;
            let path = outcome.result?;
            println!("{}", path.display());
            Ok(0)
        }
        Command::RunAll { project, extras, jobs, fail_fast, use_alternate_engine, summary } => {
            let project = cwd.join(project);
            let cfg = load_config(cli.config.as_deref(), &project)?;

            let manifest = match deplog_manifest::discover(&project) {
                Ok(m) => Some(m),
                Err(ManifestError::NotFound(_)) if !extras.is_empty() => None,
                Err(e) => return Err(e.into()),
            };
            let extras = match (&manifest, extras.is_empty()) {
                (Some(m), true) => m.extras.clone(),
                _ => extras,
            };
            let self_package = cfg
                .project
                .self_package
                .clone()
                .or_else(|| manifest.as_ref().and_then(|m| m.package_name.clone()))
                .unwrap_or_default();
            let display_name = if self_package.is_empty() { project_label(&project) } else { self_package.clone() };

            let settings = PlanSettings {
                base_image: cfg.engine.base_image.clone(),
                install_root: cfg.project.install_root.clone(),
                image_prefix: cfg.engine.image_prefix.clone(),
                log_dir: cfg.log_dir(&project),
                log_file_name: cfg.logs.file_name.clone(),
                display_name,
            };
            let planned = plan_jobs(&settings, &extras)?;
            debug!(variants = planned.len(), "planned jobs");

            let engine = engine(&cfg, use_alternate_engine);
            let engine_name = engine.describe();
            let ctx = run_context(&cfg, engine, self_package, project.clone());
            let policy = if fail_fast { FailurePolicy::FailFast } else { cfg.scheduler.failure_policy };
            let result = VariantScheduler::new(Arc::new(ctx))
                .with_concurrency(jobs.unwrap_or(cfg.scheduler.jobs))
                .with_policy(policy)
                .run_all(planned)
                .await?;

            for outcome in &result.outcomes {
                match &outcome.result {
                    Ok(path) => println!("ok    {:<16} {}", outcome.variant.to_string(), path.display()),
                    Err(e) => println!("FAIL  {:<16} {}", outcome.variant.to_string(), e),
                }
            }
            if let Some(path) = summary {
                RunSummary::from_result(&result, engine_name).write_to(&cwd.join(path))?;
            }
            info!(run_id = %result.run_id, code = result.exit_code(), "run-all finished");
            Ok(result.exit_code())
        }
        Command::ListVariants { project } => {
            for extra in read_manifest(&cwd.join(project))?.extras {
                println!("{extra}");
            }
            Ok(0)
        }
        Command::PackageName { project } => {
            let manifest = read_manifest(&cwd.join(project))?;
            println!("{}", manifest.package_name.as_deref().unwrap_or("UNKNOWN"));
            Ok(0)
        }
        Command::Doctor { use_alternate_engine } => {
            let cfg = load_config(cli.config.as_deref(), &cwd)?;
            let version = deplog_runner::doctor(&cli_engine(&cfg, use_alternate_engine)).await?;
            println!("{version}");
            println!("OK");
            Ok(0)
        }
    }
}

fn load_config(explicit: Option<&Path>, project: &Path) -> anyhow::Result<Config> {
    match explicit {
        Some(path) => Config::load_from(path),
        None => Config::load_or_default(&Config::config_path(project)),
    }
}

fn read_manifest(project: &Path) -> anyhow::Result<ProjectManifest> {
    Ok(deplog_manifest::discover(project)?)
}

fn cli_engine(cfg: &Config, use_alternate: bool) -> CliEngine {
    let kind = if use_alternate { cfg.engine.kind.alternate() } else { cfg.engine.kind };
    match &cfg.engine.program {
        // a configured program only applies to the configured engine
        Some(program) if !use_alternate => CliEngine::with_program(kind, program.clone()),
        _ => CliEngine::new(kind),
    }
}

fn engine(cfg: &Config, use_alternate: bool) -> Arc<dyn ContainerEngine> {
    Arc::new(cli_engine(cfg, use_alternate))
}

fn run_context(cfg: &Config, engine: Arc<dyn ContainerEngine>, self_package: String, context_dir: PathBuf) -> RunContext {
    let mut ctx = RunContext::new(engine, Arc::new(FsPublisher::new()), self_package, context_dir);
    ctx.repo = cfg.project.repo.clone().unwrap_or_default();
    ctx.keep_images = cfg.engine.keep_images;
    ctx
}

/// `<prefix>-<log stem>-<hash of the log path>` for a `run` without an explicit tag.
fn derived_tag(prefix: &str, output_log_path: &Path) -> ImageTag {
    let stem = output_log_path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
    ImageTag::compose(&[prefix, stem, &short_hash(&output_log_path.display().to_string())])
}

fn project_label(project: &Path) -> String {
    project.file_name().and_then(|s| s.to_str()).unwrap_or("project").to_string()
}

fn error_code(e: &anyhow::Error) -> i32 {
    if let Some(p) = e.downcast_ref::<PipelineError>() {
        return p.exit_code();
    }
    match e.downcast_ref::<ManifestError>() {
        Some(ManifestError::NotFound(_)) => 2,
        _ => 1,
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
