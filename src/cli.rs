//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for persona-sim.

use clap::{Args, Parser, Subcommand};

use crate::dialogue::CounterpartKind;
use crate::questionnaire::Scale;

/// persona-sim - Questionnaire-seeded persona conversations
///
/// Answers PHQ-9, GAD-7 and ASRM questionnaires in character, runs multi-turn
/// conversations with a therapist or friend counterpart, and scores free-text
/// answers on each scale.
#[derive(Parser, Debug)]
#[command(name = "persona-sim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that calls the model
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, env = "PERSONA_SIM_CONFIG")]
    pub config: Option<String>,

    /// Persona catalog (overrides paths.personas_file)
    #[arg(long)]
    pub personas_file: Option<String>,

    /// Only run these personas (comma separated names)
    #[arg(short, long, value_delimiter = ',')]
    pub personas: Vec<String>,

    /// Output root (overrides paths.output_dir)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Leave personas whose output already exists untouched
    #[arg(long)]
    pub skip_existing: bool,

    /// Use a canned offline generator instead of the API
    #[arg(long)]
    pub dry_run: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer one questionnaire in character for each persona
    Interview {
        /// Scale to administer (phq9, gad7, asrm)
        #[arg(short, long)]
        scale: Scale,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Run one single-scale conversation per persona
    Converse {
        /// Scale whose answers seed the conversation (phq9, gad7, asrm)
        #[arg(short, long)]
        scale: Scale,

        /// Who talks to the persona (therapist, friend)
        #[arg(long, default_value = "therapist")]
        counterpart: CounterpartKind,

        /// Rounds per conversation (overrides dialogue.rounds)
        #[arg(short, long)]
        rounds: Option<usize>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// All three questionnaires, then one combined friend conversation per persona
    Pipeline {
        /// Rounds per conversation (overrides dialogue.rounds and dialogue.combined_rounds)
        #[arg(short, long)]
        rounds: Option<usize>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Score one answer sheet and print the item scores
    Score {
        /// Answer sheet (JSON)
        file: String,

        /// Scale of the sheet when the file does not name it
        #[arg(short, long)]
        scale: Option<Scale>,

        /// Path to configuration file
        #[arg(short, long, env = "PERSONA_SIM_CONFIG")]
        config: Option<String>,

        /// Print the scored sheet as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score every answer sheet in a folder and export summary tables
    Summarize {
        /// Folder of answer sheets
        dir: String,

        /// Scale of the sheets (inferred from the folder path when omitted)
        #[arg(short, long)]
        scale: Option<Scale>,

        /// Where to write summary.csv, detail.csv and summary.json
        #[arg(long)]
        out: Option<String>,

        /// Path to configuration file
        #[arg(short, long, env = "PERSONA_SIM_CONFIG")]
        config: Option<String>,
    },

    /// Send one minimal request to check connectivity and credentials
    Ping {
        /// Path to configuration file
        #[arg(short, long, env = "PERSONA_SIM_CONFIG")]
        config: Option<String>,
    },

    /// Display version information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
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
    fn test_interview_command() {
        let cli = Cli::parse_from(["persona-sim", "interview", "--scale", "PHQ-9"]);
        match cli.command {
            Commands::Interview { scale, run } => {
                assert_eq!(scale, Scale::Phq9);
                assert!(run.personas.is_empty());
                assert!(!run.dry_run);
                assert!(!run.skip_existing);
            }
            _ => panic!("Expected Interview command"),
        }
    }

    #[test]
    fn test_interview_requires_scale() {
        assert!(Cli::try_parse_from(["persona-sim", "interview"]).is_err());
        assert!(Cli::try_parse_from(["persona-sim", "interview", "--scale", "bdi"]).is_err());
    }

    #[test]
    fn test_converse_defaults_to_therapist() {
        let cli = Cli::parse_from(["persona-sim", "converse", "-s", "gad7"]);
        match cli.command {
            Commands::Converse { scale, counterpart, rounds, .. } => {
                assert_eq!(scale, Scale::Gad7);
                assert_eq!(counterpart, CounterpartKind::Therapist);
                assert!(rounds.is_none());
            }
            _ => panic!("Expected Converse command"),
        }
    }

    #[test]
    fn test_converse_with_options() {
        let cli = Cli::parse_from([
            "persona-sim",
            "converse",
            "--scale",
            "asrm",
            "--counterpart",
            "friend",
            "--rounds",
            "5",
            "--personas",
            "Ava,Ben",
            "--skip-existing",
            "--dry-run",
        ]);
        match cli.command {
            Commands::Converse { scale, counterpart, rounds, run } => {
                assert_eq!(scale, Scale::Asrm);
                assert_eq!(counterpart, CounterpartKind::Friend);
                assert_eq!(rounds, Some(5));
                assert_eq!(run.personas, vec!["Ava".to_string(), "Ben".to_string()]);
                assert!(run.skip_existing);
                assert!(run.dry_run);
            }
            _ => panic!("Expected Converse command"),
        }
    }

    #[test]
    fn test_pipeline_with_output() {
        let cli = Cli::parse_from(["persona-sim", "pipeline", "--output", "/tmp/out", "-r", "3"]);
        match cli.command {
            Commands::Pipeline { rounds, run } => {
                assert_eq!(rounds, Some(3));
                assert_eq!(run.output, Some("/tmp/out".to_string()));
            }
            _ => panic!("Expected Pipeline command"),
        }
    }

    #[test]
    fn test_summarize_command() {
        let cli = Cli::parse_from(["persona-sim", "summarize", "output/PHQ9/answers", "--out", "reports"]);
        match cli.command {
            Commands::Summarize { dir, scale, out, .. } => {
                assert_eq!(dir, "output/PHQ9/answers");
                assert!(scale.is_none());
                assert_eq!(out, Some("reports".to_string()));
            }
            _ => panic!("Expected Summarize command"),
        }
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["persona-sim", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::parse_from(["persona-sim", "--quiet", "version"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["persona-sim", "config", "init", "--force"]);
        match cli.command {
            Commands::Config { subcommand: ConfigSubcommand::Init { path, force } } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
