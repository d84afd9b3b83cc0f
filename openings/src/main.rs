//! `openings` - build and drill a chess opening repertoire.
//!
//! ```text
//! openings compile notes.txt -o repertoire.json   notes -> evaluated node records
//! openings upload repertoire.json                 replace the stored repertoire
//! openings window 42 --pred 1 --succ 2            slice of the stored tree
//! openings next                                   pick the next exercise
//! openings try <id> --success                     record an attempt
//! openings profile --ease-coef 0.5                show or tune the profile
//! openings exercise add custom.json               store a hand-written exercise
//! ```
//!
//! Results are printed as JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use repertoire::{
    compile_notes, export_notes, EvalOptions, NodeRecord, RepertoireTree, UciEvaluator,
    UciEvaluatorConfig,
};
use serde::Serialize;
use training::{Exercise, ProfileUpdate, TrainingScheduler, TrainingStore};

mod config;

#[derive(Parser)]
#[command(name = "openings", about = "Opening repertoire builder and trainer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a notes file into evaluated node records.
    Compile(CompileArgs),
    /// Replace the stored repertoire and regenerate all exercises.
    Upload {
        /// Node records produced by `compile`.
        records: PathBuf,
    },
    /// Print a window of the stored tree around a node.
    Window {
        uid: u32,
        /// Ancestor levels to climb first.
        #[arg(long)]
        pred: Option<u32>,
        /// Descendant levels to include; unbounded when omitted.
        #[arg(long)]
        succ: Option<u32>,
    },
    /// Pick the next exercise to train.
    Next,
    /// Record the outcome of an attempt.
    #[command(group(ArgGroup::new("outcome").required(true).args(["success", "failure"])))]
    Try {
        /// Exercise id.
        id: String,
        #[arg(long)]
        success: bool,
        #[arg(long)]
        failure: bool,
    },
    /// Show the training profile, or update the given fields.
    Profile(ProfileArgs),
    /// Manage exercises directly.
    Exercise {
        #[command(subcommand)]
        action: ExerciseAction,
    },
}

#[derive(Args)]
struct CompileArgs {
    /// Notes text file.
    notes: PathBuf,
    /// Where to write the node records.
    #[arg(short, long, default_value = "repertoire.json")]
    output: PathBuf,
    /// Engine search depth.
    #[arg(short, long, default_value_t = 18)]
    depth: u8,
    /// Engine `Contempt` option.
    #[arg(short = 't', long, default_value_t = 0, allow_negative_numbers = true)]
    contempt: i32,
    /// Re-evaluate nodes that already carry an evaluation in the notes.
    #[arg(short = 'v', long = "override")]
    override_existing: bool,
    /// Also write the notes back out, with the evaluations, to this file.
    #[arg(short, long)]
    copy: Option<PathBuf>,
    /// Spaces per ply in the copied notes.
    #[arg(long, default_value_t = 4)]
    copy_indent: usize,
}

#[derive(Args)]
struct ProfileArgs {
    #[arg(long)]
    failure_coef: Option<f64>,
    #[arg(long)]
    inactivity_coef: Option<f64>,
    #[arg(long)]
    ease_coef: Option<f64>,
    #[arg(long)]
    spreading: Option<f64>,
    #[arg(long)]
    volatility: Option<f64>,
}

#[derive(Subcommand)]
enum ExerciseAction {
    /// Store an exercise read from a JSON file.
    Add { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Compile(args) => compile(args).await,
        Commands::Upload { records } => upload(&records),
        Commands::Window { uid, pred, succ } => window(uid, pred, succ),
        Commands::Next => next().await,
        Commands::Try {
            id,
            success,
            failure,
        } => {
            debug_assert!(success != failure);
            try_exercise(&id, success).await
        }
        Commands::Profile(args) => profile(args).await,
        Commands::Exercise {
            action: ExerciseAction::Add { file },
        } => add_exercise(&file),
    }
}

async fn compile(args: CompileArgs) -> Result<()> {
    let notes = std::fs::read_to_string(&args.notes)
        .with_context(|| format!("failed to read notes {:?}", args.notes))?;

    let mut evaluator = UciEvaluator::new(UciEvaluatorConfig {
        engine_path: config::get_engine_path(),
        timeout: config::get_engine_timeout(),
        retries: config::get_engine_retries(),
        threads: config::get_engine_threads(),
        hash_mb: config::get_engine_hash_mb(),
    });
    let options = EvalOptions {
        depth: args.depth,
        contempt: Some(args.contempt),
        override_existing: args.override_existing,
    };
    let compiled = compile_notes(&notes, &mut evaluator, options).await;
    evaluator.shutdown().await;
    let records = compiled.context("failed to compile notes")?;

    if let Some(copy) = &args.copy {
        let tree = RepertoireTree::from_records(records.clone())?;
        tracing::info!("Reproducing notes to {:?}", copy);
        std::fs::write(copy, export_notes(&tree, args.copy_indent)?)
            .with_context(|| format!("failed to write {:?}", copy))?;
    }

    tracing::info!("Writing output to {:?}", args.output);
    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("failed to write {:?}", args.output))?;
    Ok(())
}

fn store() -> TrainingStore {
    let dir = config::get_data_dir();
    tracing::debug!("Using data directory {:?}", dir);
    TrainingStore::new(dir)
}

fn upload(path: &Path) -> Result<()> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
    let records: Vec<NodeRecord> =
        serde_json::from_str(&contents).context("records are not valid JSON")?;
    let summary = store().upload(records, config::get_training_span(), now_timestamp())?;
    print_json(&serde_json::json!({
        "nodes": summary.nodes,
        "exercises": summary.exercises,
        "removed_exercises": summary.removed_exercises,
        "removed_trainings": summary.removed_trainings,
    }))
}

fn window(uid: u32, pred: Option<u32>, succ: Option<u32>) -> Result<()> {
    let Some(tree) = store().load_tree()? else {
        bail!("no repertoire uploaded yet");
    };
    print_json(&tree.window(uid, pred, succ)?)
}

async fn next() -> Result<()> {
    let scheduler = TrainingScheduler::open(store())?;
    let now = now_timestamp();
    let (exercise, training) = scheduler.select_next(now, &mut rand::rng()).await?;
    let weight = scheduler.compute_weight(&training, now).await;
    print_json(&serde_json::json!({
        "exercise": exercise,
        "training": training,
        "weight": weight,
    }))
}

async fn try_exercise(id: &str, success: bool) -> Result<()> {
    let scheduler = TrainingScheduler::open(store())?;
    let result = scheduler.add_try(id, success, now_timestamp()).await?;
    print_json(&serde_json::json!({
        "training": result.training,
        "profile": result.profile,
    }))
}

async fn profile(args: ProfileArgs) -> Result<()> {
    let scheduler = TrainingScheduler::open(store())?;
    let update = ProfileUpdate {
        failure_coef: args.failure_coef,
        inactivity_coef: args.inactivity_coef,
        ease_coef: args.ease_coef,
        elo_spreading: args.spreading,
        elo_volatility: args.volatility,
    };
    let profile = if update.is_empty() {
        scheduler.profile().await
    } else {
        scheduler.update_profile(&update).await?
    };
    print_json(&profile)
}

fn add_exercise(path: &Path) -> Result<()> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
    let mut exercise: Exercise =
        serde_json::from_str(&contents).context("exercise is not valid JSON")?;
    if exercise.created_at == 0 {
        exercise.created_at = now_timestamp();
    }
    let scheduler = TrainingScheduler::open(store())?;
    scheduler.add_exercise(&exercise)?;
    print_json(&exercise)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Current unix timestamp in seconds.
fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
