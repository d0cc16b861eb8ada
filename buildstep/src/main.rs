//! Build-pipeline step runner.
//!
//! Runs `make`, `build-image` and `push-image` in that order against a
//! repository working directory, each only when its input files exist.

use std::path::PathBuf;

use anyhow::{Context, Result};
use buildstep::StepError;
use buildstep::actions::resolve_identity;
use buildstep::exit_codes;
use buildstep::io::config::{ProcessEnv, Settings};
use buildstep::io::git::Git;
use buildstep::io::process::ProcessRunner;
use buildstep::step::{
    Orchestrator, StepReporter, TracingReporter, default_steps, select_steps,
};
use buildstep::workspace::Workspace;
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "buildstep",
    version,
    about = "Minimal build-pipeline step runner"
)]
struct Cli {
    /// Repository working directory to inspect and build in.
    #[arg(short = 'C', long, global = true, default_value = ".")]
    workdir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every needed step in order, stopping at the first failure.
    Run {
        /// Only consider the named step (repeatable). Order stays fixed.
        #[arg(long = "step", value_name = "NAME")]
        steps: Vec<String>,
    },
    /// Print which steps are needed, without running any.
    Plan,
    /// Print the build identifier the image steps would use.
    Identity,
}

fn main() {
    buildstep::logging::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{:#}", err);
        std::process::exit(exit_code(&err));
    }
}

/// Step failures keep their taxonomy through `anyhow` context; anything else
/// is a bad invocation.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<StepError>() {
        Some(step_err) => exit_codes::for_step_error(step_err),
        None => exit_codes::INVALID,
    }
}

fn run(cli: Cli) -> Result<()> {
    let env = ProcessEnv;
    let settings = Settings::from_env(&env).context("invalid buildstep settings")?;
    let commands = ProcessRunner::new(settings.timeout).kill_on_hang(settings.kill_on_hang);
    let refs = Git::new(&cli.workdir).with_comparison(settings.comparison);
    let ws = Workspace::new(&cli.workdir, &env, &commands, &refs)
        .with_reference(&settings.reference);
    let orchestrator = Orchestrator::new(TracingReporter);

    match cli.command {
        Command::Run { steps } => cmd_run(&orchestrator, &ws, &steps),
        Command::Plan => cmd_plan(&orchestrator, &ws),
        Command::Identity => cmd_identity(&ws),
    }
}

fn cmd_run<R: StepReporter>(
    orchestrator: &Orchestrator<R>,
    ws: &Workspace<'_>,
    names: &[String],
) -> Result<()> {
    let steps = select_steps(&default_steps(), names)?;
    let summary = orchestrator.run_all(ws, &steps).context("pipeline failed")?;
    info!(ran = ?summary.ran(), skipped = ?summary.skipped(), "pipeline finished");
    Ok(())
}

fn cmd_plan<R: StepReporter>(orchestrator: &Orchestrator<R>, ws: &Workspace<'_>) -> Result<()> {
    for planned in orchestrator.plan(ws, &default_steps()) {
        let verdict = if planned.needed { "run" } else { "skip" };
        println!("{}\t{verdict}", planned.name);
    }
    Ok(())
}

fn cmd_identity(ws: &Workspace<'_>) -> Result<()> {
    let (cfg, identity) = resolve_identity(ws).context("resolve build identity")?;
    println!("{}", identity.build_id());
    for tag in identity.tags(&cfg.image) {
        println!("{tag}");
    }
    Ok(())
}
