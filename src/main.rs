use anyhow::Result;
use clap::{Parser, Subcommand};
use folio::contexts::DEFAULT_CACHE_FOLDER;
use folio::registries::{DEFAULT_PROMPTS_DIR, DEFAULT_REGISTRY_PATH};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Ask questions about a profile and get answers as UI trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable verbose debug output")]
    verbose: bool,

    #[arg(long, global = true, help = "Print the populated prompt instead of calling the model")]
    dry_run: bool,

    #[arg(long, global = true, default_value = DEFAULT_PROMPTS_DIR, help = "Directory of prompt templates")]
    prompts_dir: PathBuf,

    #[arg(long, global = true, default_value = DEFAULT_REGISTRY_PATH, help = "Prompt-to-model registry file")]
    model_registry: PathBuf,

    #[arg(long, global = true, help = "Profile YAML to use instead of the built-in one")]
    profile: Option<PathBuf>,

    #[arg(long, global = true, default_value = DEFAULT_CACHE_FOLDER, help = "Answer cache directory")]
    cache_dir: String,

    #[arg(long, global = true, help = "Disable the answer cache")]
    no_cache: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Ask one question and render the answer")]
    Ask {
        question: String,

        #[arg(long, help = "Print the tree as JSON")]
        json: bool,
    },

    #[command(about = "Ask questions interactively")]
    Chat {
        #[arg(long, help = "Write the conversation as JSON when the session ends")]
        transcript: Option<PathBuf>,
    },

    #[command(about = "Replay recorded model output through the streaming extractor")]
    Extract {
        #[arg(help = "File with the raw model output (stdin when omitted)")]
        file: Option<PathBuf>,

        #[arg(long, default_value_t = 16, help = "Characters per simulated chunk")]
        chunk_size: usize,

        #[arg(long, default_value = "", help = "Question used if the output falls back to prose")]
        question: String,
    },

    #[command(about = "Build a tree from a plain-text answer")]
    Fallback {
        #[arg(long)]
        question: String,

        #[arg(help = "File with the answer text (stdin when omitted)")]
        file: Option<PathBuf>,

        #[arg(long, help = "Print the tree as JSON")]
        json: bool,
    },

    #[command(about = "Answer from the profile alone, routed by keywords")]
    Topic {
        question: String,

        #[arg(long, help = "Print the tree as JSON")]
        json: bool,
    },

    #[command(about = "Show the greeting card")]
    Intro {
        #[arg(long, help = "Print the tree as JSON")]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "folio=debug" } else { "folio=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli::Config {
        verbose: cli.verbose,
        dry_run: cli.dry_run,
        prompts_dir: cli.prompts_dir,
        model_registry: cli.model_registry,
        profile: cli.profile,
        cache_dir: (!cli.no_cache).then_some(cli.cache_dir),
    };

    match cli.command {
        Commands::Ask { question, json } => {
            cli::ask(question, json, &config).await?;
        }
        Commands::Chat { transcript } => {
            cli::chat(transcript, &config).await?;
        }
        Commands::Extract {
            file,
            chunk_size,
            question,
        } => {
            cli::extract(file, chunk_size, question, &config).await?;
        }
        Commands::Fallback {
            question,
            file,
            json,
        } => {
            cli::fallback(question, file, json, &config).await?;
        }
        Commands::Topic { question, json } => {
            cli::topic(question, json, &config).await?;
        }
        Commands::Intro { json } => {
            cli::intro(json, &config).await?;
        }
    }

    Ok(())
}
