//! rolesim - persona fusion and rubric evaluation CLI
//!
//! Thin command layer over the `rolesim` library. Every command prints its
//! result to stdout as JSON; logs and errors go to stderr.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use rolesim::catalog::{CatalogLookup, PersonaSelection, TraitCatalog, TraitDimension};
use rolesim::cli::{
    CatalogSubcommand, Cli, Commands, ConfigSubcommand, IdSubcommand, PersonaArgs, SessionSubcommand,
};
use rolesim::config::{self, RolesimConfig};
use rolesim::difficulty::{self, DifficultyInput};
use rolesim::error::{Error, Result};
use rolesim::fusion::{compose_job, FocusArea, PregenJob, Pregenerator};
use rolesim::identity;
use rolesim::logging;
use rolesim::rubric::{self, CompetencyRubric, RubricStore, TranscriptSummary, Turn};
use rolesim::session::{SessionPlan, SessionPlanner, SessionRequest};
use rolesim::version;

fn main() {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    // Commands that don't need configuration or full logging
    match &cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand.clone(), cli.config.as_deref());
        }
        _ => {}
    }

    let config = RolesimConfig::load(cli.config.as_deref())?;

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    debug!(version = %build.full_version(), target = %build.target, "Starting rolesim");

    match cli.command {
        Commands::Catalog { subcommand } => handle_catalog_command(&config, subcommand),
        Commands::Difficulty { value } => run_difficulty(value.as_deref()),
        Commands::Compose { persona } => run_compose(&config, &persona),
        Commands::Session { subcommand } => handle_session_command(&config, subcommand),
        Commands::Id { subcommand } => handle_id_command(&config, subcommand),
        Commands::Evaluate {
            scores,
            transcript,
            competencies,
            analysis,
            difficulty,
        } => run_evaluate(
            &config,
            &scores,
            transcript.as_deref(),
            &competencies,
            analysis,
            difficulty.as_deref(),
        ),
        Commands::ReviewPrompt {
            difficulty,
            transcript,
            competencies,
        } => run_review_prompt(&config, difficulty.as_deref(), transcript.as_deref(), &competencies),
        Commands::Pregen {
            jobs,
            max_concurrent,
        } => run_pregen(&config, &jobs, max_concurrent),
        Commands::Version | Commands::Config { .. } => {
            // Already handled above
            unreachable!();
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Difficulty as typed on the command line: JSON when it parses, else raw text.
fn difficulty_value(raw: Option<&str>) -> serde_json::Value {
    match raw {
        None => serde_json::Value::Null,
        Some(text) => serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.to_string())),
    }
}

fn session_request(catalog: &TraitCatalog, args: &PersonaArgs) -> Result<SessionRequest> {
    let age_group = match &args.age_group {
        Some(key) => key.clone(),
        None => catalog
            .age_group_for(args.age)
            .map(|g| g.key.clone())
            .ok_or_else(|| Error::unknown_key(TraitDimension::AgeGroup, format!("age {}", args.age)))?,
    };

    Ok(SessionRequest {
        selection: PersonaSelection {
            mood: args.mood.clone(),
            communication_style: args.style.clone(),
            archetype: args.archetype.clone(),
            age_group,
        },
        age: args.age,
        industry: args.industry.clone(),
        subcategory: args.subcategory.clone(),
        focus_areas: args.focus.iter().map(FocusArea::named).collect(),
        difficulty: difficulty_value(args.difficulty.as_deref()),
    })
}

/// Rubrics for the requested competencies in request order, or all of them.
fn select_rubrics<'a>(store: &'a RubricStore, ids: &[String]) -> Result<Vec<&'a CompetencyRubric>> {
    if ids.is_empty() {
        return Ok(store.rubrics().iter().collect());
    }
    ids.iter()
        .map(|id| {
            store
                .rubric(id)
                .ok_or_else(|| Error::rubric_invalid(format!("unknown competency '{}'", id)))
        })
        .collect()
}

fn session_planner(config: &RolesimConfig, catalog: Arc<dyn CatalogLookup>) -> Result<SessionPlanner> {
    Ok(SessionPlanner::new(
        catalog,
        config.composer(),
        config.identity_manager()?,
    ))
}

// ─────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────

/// Handle catalog subcommands
fn handle_catalog_command(config: &RolesimConfig, subcommand: CatalogSubcommand) -> Result<()> {
    match subcommand {
        CatalogSubcommand::List { dimension } => {
            let catalog = config.load_catalog()?;
            let dimensions: Vec<TraitDimension> = match dimension {
                Some(d) => vec![d],
                None => TraitDimension::all().to_vec(),
            };
            let listing: Vec<_> = dimensions
                .iter()
                .map(|d| {
                    json!({
                        "dimension": d,
                        "entries": catalog.entries(*d),
                    })
                })
                .collect();
            print_json(&json!({
                "version": catalog.version,
                "dimensions": listing,
            }))
        }
    }
}

fn run_difficulty(raw: Option<&str>) -> Result<()> {
    let value = difficulty_value(raw);
    let input = DifficultyInput::from(&value);
    let tier = difficulty::normalize(&input);
    print_json(&json!({
        "input": value,
        "tier": tier,
        "label": tier.label(),
        "displayOrder": tier.display_order(),
        "description": tier.description(),
        "disclosure": tier.disclosure_guidance(),
    }))
}

fn run_compose(config: &RolesimConfig, args: &PersonaArgs) -> Result<()> {
    let catalog = config.load_catalog()?;
    let request = session_request(&catalog, args)?;
    let job = PregenJob {
        name: None,
        selection: request.selection,
        age: request.age,
        industry: request.industry,
        subcategory: request.subcategory,
        focus_areas: request.focus_areas,
        difficulty: request.difficulty,
    };

    let output = compose_job(&catalog, &config.composer(), &job)?;
    info!(fingerprint = %output.fingerprint, tier = %output.tier, "Fusion block composed");
    print_json(&output)
}

/// Handle session subcommands
fn handle_session_command(config: &RolesimConfig, subcommand: SessionSubcommand) -> Result<()> {
    let plan = match subcommand {
        SessionSubcommand::Start { persona } => {
            let catalog = Arc::new(config.load_catalog()?);
            let request = session_request(&catalog, &persona)?;
            session_planner(config, catalog)?.start(&request)?
        }
        SessionSubcommand::Replay { plan, retry } => {
            let recorded: SessionPlan = read_json(&plan)?;
            // Replays carry their persona inline; the catalog is never consulted
            let planner = session_planner(config, Arc::new(TraitCatalog::default()))?;
            planner.replay(&recorded, retry)?
        }
    };
    print_json(&plan)
}

/// Handle identity subcommands
fn handle_id_command(config: &RolesimConfig, subcommand: IdSubcommand) -> Result<()> {
    let manager = config.identity_manager()?;

    match subcommand {
        IdSubcommand::New => print_json(&manager.issue_fresh()),
        IdSubcommand::Replay { original, retry } => print_json(&manager.issue_replay(&original, retry)?),
        IdSubcommand::Parse { id } => print_json(&identity::parse(&id)?),
    }
}

fn run_evaluate(
    config: &RolesimConfig,
    scores_path: &Path,
    transcript_path: Option<&Path>,
    competency_ids: &[String],
    analysis: Option<String>,
    raw_difficulty: Option<&str>,
) -> Result<()> {
    let store = config.load_rubric()?;
    let scores: HashMap<String, f64> = read_json(scores_path)?;
    let tier = difficulty::normalize_value(&difficulty_value(raw_difficulty));
    let rubrics = select_rubrics(&store, competency_ids)?;

    for id in scores.keys() {
        if !rubrics.iter().any(|r| &r.competency.id == id) {
            warn!(competency = %id, "Score supplied for a competency outside the review");
        }
    }

    let mut review = rubric::evaluate_rubrics(rubrics, &scores, tier);

    if let Some(path) = transcript_path {
        let turns: Vec<Turn> = read_json(path)?;
        review = review.with_transcript(TranscriptSummary::from_turns(&turns));
    }
    if let Some(text) = analysis {
        review = review.with_analysis(text);
    }

    info!(
        difficulty = %tier,
        competencies = review.competencies.len(),
        scored = review.scored().count(),
        overall = ?review.overall_score,
        "Evaluation complete"
    );
    print_json(&review)
}

fn run_review_prompt(
    config: &RolesimConfig,
    raw_difficulty: Option<&str>,
    transcript_path: Option<&Path>,
    competency_ids: &[String],
) -> Result<()> {
    let store = config.load_rubric()?;
    let tier = difficulty::normalize_value(&difficulty_value(raw_difficulty));
    let rubrics = select_rubrics(&store, competency_ids)?;

    let summary = match transcript_path {
        Some(path) => {
            let turns: Vec<Turn> = read_json(path)?;
            Some(TranscriptSummary::from_turns(&turns))
        }
        None => None,
    };

    let prompt = rubric::render_evaluation_prompt(rubrics.iter().copied(), tier, summary.as_ref());
    debug!(difficulty = %tier, competencies = rubrics.len(), "Evaluation prompt rendered");
    print_json(&json!({
        "difficulty": tier,
        "competencies": rubrics.iter().map(|r| &r.competency.id).collect::<Vec<_>>(),
        "transcript": summary,
        "prompt": prompt,
    }))
}

fn run_pregen(config: &RolesimConfig, jobs_path: &Path, max_concurrent: Option<usize>) -> Result<()> {
    let jobs: Vec<PregenJob> = read_json(jobs_path)?;
    let catalog: Arc<dyn CatalogLookup> = Arc::new(config.load_catalog()?);
    let pregenerator = Pregenerator::new(
        catalog,
        config.composer(),
        max_concurrent.unwrap_or(config.pregen.max_concurrent),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(pregenerator.max_concurrent().min(num_cpus::get()).max(1))
        .thread_name("rolesim-pregen")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    let report = runtime.block_on(pregenerator.run(jobs));
    info!(
        completed = report.completed(),
        failed = report.failed(),
        peak_running = report.peak_running,
        "Pre-generation batch finished"
    );

    print_json(&json!({
        "completed": report.completed(),
        "failed": report.failed(),
        "peakRunning": report.peak_running,
        "results": report.entries(),
    }))
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand, config_path: Option<&str>) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = RolesimConfig::load(config_path)?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate => {
            let cfg = RolesimConfig::load(config_path)?;
            let catalog = cfg.load_catalog()?;
            let rubric = cfg.load_rubric()?;
            println!(
                "Configuration is valid ({} catalog entries, {} competencies).",
                catalog.len(),
                rubric.len()
            );
        }
    }

    Ok(())
}
