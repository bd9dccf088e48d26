mod commands;
mod config;
mod experiment;
mod logging;
mod proposers;

use std::path::PathBuf;

use casegate_core::{SemanticRole, SituationHints};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::proposers::ProposerChoice;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Validated grammatical case assignment.
#[derive(Parser)]
#[command(
    name = "casegate",
    version,
    about = "Propose, validate and retry grammatical case assignments"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a TOML config file (default: ./casegate.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the rule data JSON file
    #[arg(long, global = true, default_value = "data/grammar.json")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the rule data, or show one case in full
    Rules {
        /// Case code to show
        #[arg(long = "case")]
        code: Option<String>,
    },

    /// Validate a single (case, role) proposal
    Validate {
        /// Case code, e.g. AFF
        #[arg(long = "case")]
        case: String,
        /// Semantic role, e.g. EXPERIENCER
        #[arg(long)]
        role: String,
        /// Function of the stem (STA, DYN or MNF)
        #[arg(long)]
        function: Option<String>,
        #[command(flatten)]
        hints: HintArgs,
    },

    /// List the cases most relevant to a description
    Retrieve {
        /// Situation description
        description: String,
        /// Number of cases to return
        #[arg(short, long, default_value_t = 3)]
        k: usize,
    },

    /// Run one propose/validate session for a description
    Suggest {
        /// Situation description
        description: String,
        #[command(flatten)]
        hints: HintArgs,
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Run a labelled test set with and without retrieval
    Experiment {
        /// Path to the test set JSON file
        #[arg(long, default_value = "data/experiment_cases.json")]
        cases: PathBuf,
        /// Run only the first N items
        #[arg(long)]
        limit: Option<usize>,
        /// Write full results JSON to this path
        #[arg(long)]
        save: Option<PathBuf>,
        #[command(flatten)]
        session: SessionArgs,
    },
}

/// Structured situation context shared by `validate` and `suggest`.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct HintArgs {
    /// Whether the participant acts intentionally (true or false)
    #[arg(long)]
    voluntary: Option<bool>,
    /// The role the participant is known to play
    #[arg(long, value_parser = parse_role)]
    expected_role: Option<SemanticRole>,
    /// Case already present in the situation (repeatable)
    #[arg(long = "companion")]
    companions: Vec<String>,
}

impl HintArgs {
    pub(crate) fn to_hints(&self) -> SituationHints {
        SituationHints {
            voluntary: self.voluntary,
            expected_role: self.expected_role,
            companion_cases: self
                .companions
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }
}

/// Proposer and coordinator overrides for session-running commands.
#[derive(Args, Debug, Clone)]
pub(crate) struct SessionArgs {
    /// llm, first-candidate, random or script:<file>
    #[arg(long, default_value = "llm")]
    proposer: ProposerChoice,
    /// Attempts per session, the first included
    #[arg(long)]
    max_attempts: Option<usize>,
    /// Number of candidate cases retrieved
    #[arg(long)]
    top_k: Option<usize>,
    /// Offer every case as a candidate
    #[arg(long)]
    no_retrieval: bool,
    /// LLM model name (overrides the config file)
    #[arg(long)]
    model: Option<String>,
}

fn parse_role(s: &str) -> Result<SemanticRole, String> {
    s.parse::<SemanticRole>().map_err(|e| e.to_string())
}

/// Shared settings every command receives.
pub(crate) struct Globals {
    pub output: OutputFormat,
    pub quiet: bool,
    pub config: Option<PathBuf>,
    pub data: PathBuf,
}

fn main() {
    logging::init_tracing();
    let cli = Cli::parse();
    let globals = Globals {
        output: cli.output,
        quiet: cli.quiet,
        config: cli.config,
        data: cli.data,
    };

    match cli.command {
        Commands::Rules { code } => {
            commands::rules::cmd_rules(&globals, code.as_deref());
        }
        Commands::Validate {
            case,
            role,
            function,
            hints,
        } => {
            commands::validate::cmd_validate(
                &globals,
                &case,
                &role,
                function.as_deref(),
                &hints.to_hints(),
            );
        }
        Commands::Retrieve { description, k } => {
            commands::retrieve::cmd_retrieve(&globals, &description, k);
        }
        Commands::Suggest {
            description,
            hints,
            session,
        } => {
            commands::suggest::cmd_suggest(&globals, &description, &hints.to_hints(), &session);
        }
        Commands::Experiment {
            cases,
            limit,
            save,
            session,
        } => {
            commands::experiment::cmd_experiment(
                &globals,
                &cases,
                limit,
                save.as_deref(),
                &session,
            );
        }
    }
}

/// Report an error to stderr in the requested format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
