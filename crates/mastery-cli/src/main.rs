//! mastery CLI: ingest attempts, inspect profiles, hand out hints and
//! assignments over local files.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "mastery", version, about = "Adaptive mastery tracking for practice questions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply scored attempts to the stored mastery state
    Ingest {
        /// JSON file with an array of attempts
        #[arg(long)]
        attempts: PathBuf,

        /// Question bank file or directory (XP rewards per question)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// State file (overrides config)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show a user's mastery profile
    Profile {
        /// User id
        #[arg(long)]
        user: Uuid,

        /// Question bank file or directory (untouched topics become recommendations)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// State file (overrides config)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Next hint for a step of a multi-step question
    Hint {
        /// Question bank file or directory
        #[arg(long)]
        bank: PathBuf,

        /// Question id
        #[arg(long)]
        question: Uuid,

        /// Step number (1-based)
        #[arg(long)]
        step: u32,

        /// Failed attempts at this step so far
        #[arg(long, default_value = "0")]
        previous_attempts: u32,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Reveal the solution of one step
    SolveStep {
        /// Question bank file or directory
        #[arg(long)]
        bank: PathBuf,

        /// Question id
        #[arg(long)]
        question: Uuid,

        /// Step number (1-based)
        #[arg(long)]
        step: u32,
    },

    /// Generate a personalized assignment
    Assign {
        /// User id
        #[arg(long)]
        user: Uuid,

        /// Question bank file or directory to draw questions from
        #[arg(long)]
        bank: PathBuf,

        /// State file (overrides config)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Max questions (default from config)
        #[arg(long)]
        max_questions: Option<usize>,

        /// Explicit topics (comma-separated)
        #[arg(long)]
        topics: Option<String>,

        /// Serve every topic at this difficulty
        #[arg(long)]
        target_difficulty: Option<String>,

        /// Also include strong topics
        #[arg(long)]
        include_strengths: bool,

        /// Seed for question shuffling (default from config, else random)
        #[arg(long)]
        seed: Option<u64>,

        /// Write the assignment JSON here
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Record a question result on a saved assignment
    Complete {
        /// Assignment JSON file (updated in place)
        #[arg(long)]
        assignment: PathBuf,

        /// Question id
        #[arg(long)]
        question: Uuid,

        /// The answer was correct
        #[arg(long)]
        correct: bool,

        /// Seconds spent on the question
        #[arg(long, default_value = "0")]
        time: u32,
    },

    /// Validate question banks and/or a state file
    Validate {
        /// Question bank file or directory
        #[arg(long)]
        bank: Option<PathBuf>,

        /// State file
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Create starter config and example question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mastery=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ingest {
            attempts,
            bank,
            state,
            format,
            config,
        } => commands::ingest::execute(attempts, bank, state, format, config).await,
        Commands::Profile {
            user,
            bank,
            state,
            format,
            config,
        } => commands::profile::execute(user, bank, state, format, config).await,
        Commands::Hint {
            bank,
            question,
            step,
            previous_attempts,
            format,
        } => commands::hint::execute(bank, question, step, previous_attempts, format),
        Commands::SolveStep {
            bank,
            question,
            step,
        } => commands::hint::execute_solve(bank, question, step),
        Commands::Assign {
            user,
            bank,
            state,
            max_questions,
            topics,
            target_difficulty,
            include_strengths,
            seed,
            output,
            format,
            config,
        } => {
            commands::assign::execute(commands::assign::AssignArgs {
                user,
                bank,
                state,
                max_questions,
                topics,
                target_difficulty,
                include_strengths,
                seed,
                output,
                format,
                config,
            })
            .await
        }
        Commands::Complete {
            assignment,
            question,
            correct,
            time,
        } => commands::complete::execute(assignment, question, correct, time),
        Commands::Validate { bank, state } => commands::validate::execute(bank, state).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
