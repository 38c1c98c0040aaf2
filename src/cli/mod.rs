use anyhow::{Context, Result};
use folio::contexts::{
    build_answer_tree, build_intro_tree, build_tree_from_answer, follow_ups, render_message,
    AnswerSource, AskInput, AskRunner, Conversation, MessageStream, OpenAiClient, ResolvedAnswer,
};
use folio::data::{Profile, Spec};
use folio::registries::{FileModelRegistry, FilePromptRegistry};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

mod progress;

use progress::SessionTally;

const ANSWER_PROMPT: &str = "answer";

#[derive(Clone, Debug)]
pub struct Config {
    pub verbose: bool,
    pub dry_run: bool,
    pub prompts_dir: PathBuf,
    pub model_registry: PathBuf,
    pub profile: Option<PathBuf>,
    /// `None` disables the answer cache
    pub cache_dir: Option<String>,
}

fn load_profile(config: &Config) -> Result<Profile> {
    Profile::load(config.profile.as_deref()).context("Failed to load profile")
}

async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn print_spec(spec: &Spec, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(spec)?);
    } else {
        println!("{}", render_message(spec));
    }
    Ok(())
}

fn describe_source(source: AnswerSource) -> &'static str {
    match source {
        AnswerSource::Structured => "structured answer",
        AnswerSource::Fallback => "synthesized from prose",
        AnswerSource::Canned => "canned summary",
    }
}

/// Streams one answer from the model.
///
/// Returns `None` on a dry run, after printing the populated prompt.
async fn answer_question(
    question: &str,
    profile: &Profile,
    config: &Config,
) -> Result<Option<ResolvedAnswer>> {
    let runner = AskRunner::new(
        ANSWER_PROMPT.to_string(),
        AskInput {
            question: question.to_string(),
            profile: profile.clone(),
        },
        FilePromptRegistry::new(Some(config.prompts_dir.clone())),
        FileModelRegistry::new(Some(config.model_registry.clone()), None),
    )
    .with_cache(config.cache_dir.clone());

    if config.dry_run {
        let request = runner.prepare()?;
        println!("[DRY RUN] Would ask {}", request.model);
        println!("--- system ---\n{}", request.system_prompt);
        println!("--- user ---\n{}", request.user_prompt);
        return Ok(None);
    }

    let mut stream = MessageStream::new(question);
    let client = match OpenAiClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("✗ {}", e);
            return Ok(Some(stream.fail(profile, &e)));
        }
    };

    match runner.run(&client, &mut stream).await {
        Ok(outcome) => {
            if config.verbose && outcome.cached {
                eprintln!("⊚ Answer served from cache");
            }
            Ok(Some(stream.finish(profile)))
        }
        Err(e) => {
            eprintln!("✗ Failed to get an answer: {}", e);
            Ok(Some(stream.fail(profile, &e)))
        }
    }
}

fn print_follow_ups(question: &str) {
    println!("\nYou could also ask:");
    for follow_up in follow_ups(question) {
        println!("  • {}", follow_up);
    }
}

pub async fn ask(question: String, json: bool, config: &Config) -> Result<()> {
    let profile = load_profile(config)?;
    let Some(answer) = answer_question(&question, &profile, config).await? else {
        return Ok(());
    };

    if config.verbose {
        eprintln!("✓ {}", describe_source(answer.source));
    }
    print_spec(&answer.spec, json)?;
    if !json {
        print_follow_ups(&question);
    }
    Ok(())
}

/// Records a question and its answer; a dry run leaves only the question
fn record_exchange(
    conversation: &mut Conversation,
    question: &str,
    answer: Option<ResolvedAnswer>,
) {
    conversation.push_user(question);
    if let Some(answer) = answer {
        let id = conversation.push_assistant_pending();
        conversation.resolve(&id, answer);
    }
}

pub async fn chat(transcript: Option<PathBuf>, config: &Config) -> Result<()> {
    let profile = load_profile(config)?;
    let mut conversation = Conversation::new();
    let mut tally = SessionTally::new();

    let intro = build_intro_tree(&profile);
    println!("{}\n", render_message(&intro));
    conversation.push_assistant_tree(intro);
    println!("Type a question, or 'exit' to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        let answer = answer_question(question, &profile, config).await?;
        if let Some(answer) = &answer {
            tally.record(answer.source);
            if config.verbose {
                println!("✓ {}", describe_source(answer.source));
            }
            println!("{}", render_message(&answer.spec));
            print_follow_ups(question);
            println!();
        }
        record_exchange(&mut conversation, question, answer);
    }

    tally.finish();

    if let Some(path) = transcript {
        fs::write(&path, conversation.to_json()?)
            .with_context(|| format!("Failed to write transcript {}", path.display()))?;
        println!("✓ Transcript saved to {}", path.display());
    }
    Ok(())
}

/// Splits `text` into pieces of at most `size` characters
fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

pub async fn extract(
    file: Option<PathBuf>,
    chunk_size: usize,
    question: String,
    config: &Config,
) -> Result<()> {
    let profile = load_profile(config)?;
    let text = read_input(file.as_deref()).await?;
    let chunks = split_chunks(&text, chunk_size);

    let mut stream = MessageStream::new(question);
    let mut first_tree = None;
    for (index, chunk) in chunks.iter().enumerate() {
        if stream.push_chunk(chunk).is_some() && first_tree.is_none() {
            first_tree = Some(index + 1);
        }
    }

    match first_tree {
        Some(index) => eprintln!("✓ First tree after chunk {} of {}", index, chunks.len()),
        None => eprintln!("✗ No tree while streaming {} chunk(s)", chunks.len()),
    }

    let answer = stream.finish(&profile);
    if answer.source != AnswerSource::Structured {
        eprintln!("⊚ Resolved as {}", describe_source(answer.source));
    }
    print_spec(&answer.spec, true)
}

pub async fn fallback(
    question: String,
    file: Option<PathBuf>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let profile = load_profile(config)?;
    let answer = read_input(file.as_deref()).await?;
    print_spec(&build_tree_from_answer(&question, &answer, &profile), json)
}

pub async fn topic(question: String, json: bool, config: &Config) -> Result<()> {
    let profile = load_profile(config)?;
    print_spec(&build_answer_tree(&question, &profile), json)?;
    if !json {
        print_follow_ups(&question);
    }
    Ok(())
}

pub async fn intro(json: bool, config: &Config) -> Result<()> {
    let profile = load_profile(config)?;
    print_spec(&build_intro_tree(&profile), json)
}
