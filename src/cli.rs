//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for rolesim.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::catalog::TraitDimension;

/// rolesim - persona fusion and rubric evaluation for role-play training
///
/// Composes simulated client personas from the trait catalog, issues session
/// identities for fresh runs and replays, and scores finished sessions
/// against competency rubrics. Results are written to stdout as JSON.
#[derive(Parser, Debug)]
#[command(name = "rolesim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, env = "ROLESIM_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect the trait catalog
    Catalog {
        #[command(subcommand)]
        subcommand: CatalogSubcommand,
    },

    /// Normalize a difficulty value onto a tier
    Difficulty {
        /// Raw value; parsed as JSON when possible, otherwise taken as text
        value: Option<String>,
    },

    /// Compose the fusion prompt block for a persona
    Compose {
        #[command(flatten)]
        persona: PersonaArgs,
    },

    /// Plan and replay sessions
    Session {
        #[command(subcommand)]
        subcommand: SessionSubcommand,
    },

    /// Simulation identity operations
    Id {
        #[command(subcommand)]
        subcommand: IdSubcommand,
    },

    /// Evaluate competency scores against the rubric
    Evaluate {
        /// JSON object mapping competency id to score
        #[arg(short, long)]
        scores: PathBuf,

        /// JSON array of {role, content} transcript turns
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Restrict the review to these competencies (repeatable)
        #[arg(long = "competency")]
        competencies: Vec<String>,

        /// Narrative analysis to use instead of the generated summary
        #[arg(long)]
        analysis: Option<String>,

        /// Session difficulty selecting tier-specific bands (any spelling)
        #[arg(long)]
        difficulty: Option<String>,
    },

    /// Print the scoring instructions for an evaluation collaborator
    ReviewPrompt {
        /// Session difficulty selecting tier-specific bands (any spelling)
        #[arg(long)]
        difficulty: Option<String>,

        /// JSON array of {role, content} transcript turns
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Restrict the prompt to these competencies (repeatable)
        #[arg(long = "competency")]
        competencies: Vec<String>,
    },

    /// Pre-generate fusion payloads for a batch of persona configurations
    Pregen {
        /// JSON array of jobs
        #[arg(short, long)]
        jobs: PathBuf,

        /// Maximum jobs composed at once (0 = one per CPU)
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Persona selection and session context shared by `compose` and `session start`
#[derive(Args, Debug, Clone)]
pub struct PersonaArgs {
    /// Mood key
    #[arg(long)]
    pub mood: String,

    /// Communication style key
    #[arg(long)]
    pub style: String,

    /// Archetype key
    #[arg(long)]
    pub archetype: String,

    /// Age group key (derived from --age when omitted)
    #[arg(long)]
    pub age_group: Option<String>,

    /// Client age in years
    #[arg(long)]
    pub age: u32,

    /// Industry the scenario takes place in
    #[arg(long)]
    pub industry: String,

    /// Industry subcategory
    #[arg(long)]
    pub subcategory: Option<String>,

    /// Focus area name (repeatable)
    #[arg(long = "focus")]
    pub focus: Vec<String>,

    /// Difficulty value, same rules as the `difficulty` command
    #[arg(long)]
    pub difficulty: Option<String>,
}

/// Catalog subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CatalogSubcommand {
    /// List catalog entries
    List {
        /// Only this dimension (mood, communication-style, archetype, age-group, core-trait, quirk)
        #[arg(short, long)]
        dimension: Option<TraitDimension>,
    },
}

/// Session subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionSubcommand {
    /// Plan a fresh session
    Start {
        #[command(flatten)]
        persona: PersonaArgs,
    },

    /// Plan a replay of a recorded session plan
    Replay {
        /// Session plan JSON, as printed by `session start`
        #[arg(short, long)]
        plan: PathBuf,

        /// Attempt number (1-99)
        #[arg(short, long)]
        retry: u32,
    },
}

/// Identity subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum IdSubcommand {
    /// Issue a fresh simulation id
    New,

    /// Issue the replay id for an original session
    Replay {
        /// Original simulation id
        original: String,

        /// Attempt number (1-99)
        retry: u32,
    },

    /// Parse a simulation id
    Parse {
        id: String,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compose_command() {
        let cli = Cli::parse_from([
            "rolesim", "compose", "--mood", "calm", "--style", "direct", "--archetype", "skeptic",
            "--age", "42", "--industry", "insurance", "--focus", "premiums", "--focus", "claims",
        ]);
        match cli.command {
            Commands::Compose { persona } => {
                assert_eq!(persona.mood, "calm");
                assert_eq!(persona.age, 42);
                assert!(persona.age_group.is_none());
                assert_eq!(persona.focus, vec!["premiums", "claims"]);
                assert!(persona.difficulty.is_none());
            }
            _ => panic!("Expected Compose command"),
        }
    }

    #[test]
    fn test_compose_requires_selection() {
        let result = Cli::try_parse_from(["rolesim", "compose", "--mood", "calm"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_catalog_list_dimension() {
        let cli = Cli::parse_from(["rolesim", "catalog", "list", "--dimension", "communication-style"]);
        match cli.command {
            Commands::Catalog {
                subcommand: CatalogSubcommand::List { dimension },
            } => assert_eq!(dimension, Some(TraitDimension::CommunicationStyle)),
            _ => panic!("Expected Catalog List command"),
        }
    }

    #[test]
    fn test_catalog_list_rejects_unknown_dimension() {
        assert!(Cli::try_parse_from(["rolesim", "catalog", "list", "-d", "hobby"]).is_err());
    }

    #[test]
    fn test_id_replay() {
        let cli = Cli::parse_from(["rolesim", "id", "replay", "SIM-00000042", "3"]);
        match cli.command {
            Commands::Id {
                subcommand: IdSubcommand::Replay { original, retry },
            } => {
                assert_eq!(original, "SIM-00000042");
                assert_eq!(retry, 3);
            }
            _ => panic!("Expected Id Replay command"),
        }
    }

    #[test]
    fn test_evaluate_with_options() {
        let cli = Cli::parse_from([
            "rolesim",
            "evaluate",
            "--scores",
            "scores.json",
            "--transcript",
            "turns.json",
            "--competency",
            "communication",
            "--difficulty",
            "hard",
        ]);
        match cli.command {
            Commands::Evaluate {
                scores,
                transcript,
                competencies,
                analysis,
                difficulty,
            } => {
                assert_eq!(scores, PathBuf::from("scores.json"));
                assert_eq!(transcript, Some(PathBuf::from("turns.json")));
                assert_eq!(competencies, vec!["communication"]);
                assert!(analysis.is_none());
                assert_eq!(difficulty.as_deref(), Some("hard"));
            }
            _ => panic!("Expected Evaluate command"),
        }
    }

    #[test]
    fn test_review_prompt() {
        let cli = Cli::parse_from(["rolesim", "review-prompt", "--difficulty", "expert", "-t", "turns.json"]);
        match cli.command {
            Commands::ReviewPrompt {
                difficulty,
                transcript,
                competencies,
            } => {
                assert_eq!(difficulty.as_deref(), Some("expert"));
                assert_eq!(transcript, Some(PathBuf::from("turns.json")));
                assert!(competencies.is_empty());
            }
            _ => panic!("Expected ReviewPrompt command"),
        }
    }

    #[test]
    fn test_session_replay() {
        let cli = Cli::parse_from(["rolesim", "session", "replay", "--plan", "plan.json", "--retry", "2"]);
        match cli.command {
            Commands::Session {
                subcommand: SessionSubcommand::Replay { plan, retry },
            } => {
                assert_eq!(plan, PathBuf::from("plan.json"));
                assert_eq!(retry, 2);
            }
            _ => panic!("Expected Session Replay command"),
        }
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["rolesim", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["rolesim", "config", "show", "--config", "/tmp/rolesim.toml"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/rolesim.toml"));
        assert!(matches!(
            cli.command,
            Commands::Config {
                subcommand: ConfigSubcommand::Show
            }
        ));
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["rolesim", "config", "init", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
