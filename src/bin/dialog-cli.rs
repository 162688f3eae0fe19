//! Dialog CLI - Console host for the dialog engine
//!
//! Runs a small profile-collection bot against state persisted under the
//! storage root, one turn per invocation (`say`) or per line (`chat`).

use anyhow::Context;
use clap::{Parser, Subcommand};
use dialog_stack::dialogs::prompts::{ConfirmPrompt, NumberPrompt, PromptOptions, TextPrompt, validator_fn};
use dialog_stack::dialogs::storage::{self, FileStorage};
use dialog_stack::dialogs::{
    Activity, CompositeControl, DialogBot, DialogSet, RecordingSender, TurnContext, step_fn,
};
use dialog_stack::EngineConfig;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(name = "dialog-cli")]
#[command(about = "Console host for the dialog stack engine", long_about = None)]
struct Cli {
    /// Root directory for persisted state
    #[arg(short, long, default_value = ".dialogs")]
    root: PathBuf,

    /// Log engine activity at debug level
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the storage root
    Init {
        /// Conversation used by this console
        #[arg(long, default_value = "console")]
        conversation: String,
    },

    /// Send one message and print the replies
    Say {
        /// Message text
        text: String,
    },

    /// Interactive session, one turn per line
    Chat,

    /// Print the persisted dialog stack
    Stack,

    /// Forget the persisted dialog stack
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli.root)?;

    // Initialize tracing
    let level = if cli.debug || config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { conversation } => {
            let config = EngineConfig {
                root: cli.root.clone(),
                conversation_id: conversation,
                debug: cli.debug,
                ..EngineConfig::default()
            };
            storage::init_storage(&config.root)?;
            storage::write_config(&config)?;
            println!("Initialized dialog storage at {:?}", config.root);
        }

        Commands::Say { text } => {
            let bot = profile_bot(&config)?;
            for reply in run_turn(&bot, &config, &text).await? {
                println!("{reply}");
            }
        }

        Commands::Chat => {
            let bot = profile_bot(&config)?;
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut stdout = tokio::io::stdout();

            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            while let Some(line) = lines.next_line().await? {
                let line = line.trim();
                if line == "/quit" {
                    break;
                }
                if !line.is_empty() {
                    for reply in run_turn(&bot, &config, line).await? {
                        stdout.write_all(format!("{reply}\n").as_bytes()).await?;
                    }
                }
                stdout.write_all(b"> ").await?;
                stdout.flush().await?;
            }
        }

        Commands::Stack => {
            let bot = profile_bot(&config)?;
            let state = bot.load(&config.conversation_id).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }

        Commands::Reset => {
            let bot = profile_bot(&config)?;
            bot.reset(&config.conversation_id).await?;
            println!("Conversation '{}' reset", config.conversation_id);
        }
    }

    Ok(())
}

/// Saved configuration if present, defaults otherwise; `root` always wins
fn resolve_config(root: &Path) -> anyhow::Result<EngineConfig> {
    let mut config = if root.join("config.json").exists() {
        storage::load_config(root)?
    } else {
        EngineConfig::default()
    };
    config.root = root.to_path_buf();
    Ok(config)
}

async fn run_turn(
    bot: &DialogBot<FileStorage>,
    config: &EngineConfig,
    text: &str,
) -> anyhow::Result<Vec<String>> {
    let sender = Arc::new(RecordingSender::new());
    let context = TurnContext::new(
        config.conversation_id.clone(),
        Activity::message(text).with_locale("en-US"),
        sender.clone(),
    );
    bot.on_turn(&context)
        .await
        .with_context(|| format!("Turn failed for conversation '{}'", config.conversation_id))?;
    Ok(sender.texts())
}

/// The demo bot: a root waterfall around a profile-collecting composite
fn profile_bot(config: &EngineConfig) -> anyhow::Result<DialogBot<FileStorage>> {
    let mut profile = DialogSet::new();
    profile.add("text", TextPrompt::default())?;
    profile.add(
        "age",
        NumberPrompt::default().with_validator(validator_fn(|value| {
            value
                .as_i64()
                .filter(|age| (0..=150).contains(age))
                .map(Value::from)
        })),
    )?;
    profile.add("confirm", ConfirmPrompt::default())?;
    profile.add_waterfall(
        "profile-steps",
        vec![
            step_fn(|step| Box::pin(async move { step.prompt("text", "What is your name?").await })),
            step_fn(|step| {
                Box::pin(async move {
                    let name = step.take_result();
                    step.set_value("name", &name)?;
                    step.prompt(
                        "age",
                        PromptOptions::new("How old are you?")
                            .with_retry_prompt("Please enter an age between 0 and 150."),
                    )
                    .await
                })
            }),
            step_fn(|step| {
                Box::pin(async move {
                    let age = step.take_result();
                    step.set_value("age", &age)?;
                    let name: String = step.value("name")?.unwrap_or_default();
                    let age: i64 = step.value("age")?.unwrap_or_default();
                    step.prompt(
                        "confirm",
                        PromptOptions::new(format!("So you are {name}, aged {age}. Is that right?"))
                            .with_retry_prompt("Please answer yes or no."),
                    )
                    .await
                })
            }),
            step_fn(|step| {
                Box::pin(async move {
                    if step.result() == Some(&Value::Bool(true)) {
                        let values = Value::Object(step.values());
                        step.end(Some(values)).await
                    } else {
                        step.send_text("Let's start over.").await?;
                        step.replace("profile-steps", None).await
                    }
                })
            }),
        ],
    )?;

    let mut dialogs = DialogSet::new();
    dialogs.add("profile", CompositeControl::new("profile-steps", profile))?;
    dialogs.add_waterfall(
        config.root_dialog.clone(),
        vec![
            step_fn(|step| Box::pin(async move { step.begin("profile", None).await })),
            step_fn(|step| {
                Box::pin(async move {
                    let profile = step.take_result().unwrap_or_else(|| json!({}));
                    let name = profile.get("name").and_then(Value::as_str).unwrap_or("stranger");
                    step.send_text(format!("Thanks, {name}. Your profile is saved."))
                        .await?;
                    step.end(Some(profile)).await
                })
            }),
        ],
    )?;

    let store = FileStorage::new(config.root.clone());
    Ok(DialogBot::new(dialogs, store, config.root_dialog.clone())?)
}
