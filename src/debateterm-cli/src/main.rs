//! DebateTerm CLI - AI Debate Terminal
//!
//! Watch four AI personas argue about a topic and jump in whenever you like.

use clap::Parser;
use colored::{ColoredString, Colorize};
use debateterm_core::completion::is_placeholder_key;
use debateterm_core::config::{Config, default_config};
use debateterm_core::{
    BackendKind, CompletionClient, DebateScheduler, Identity, LoopOutcome, Pacing,
    PromptComposer, RandomSource, SeededRandom, SessionId, SessionSnapshot, SessionStore, Speaker,
    ThreadRandom,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "debateterm",
    version,
    about = "AI Debate Terminal - Watch AIs debate and interrupt them",
    long_about = "Runs a round-robin debate between Claude, Grok, DeepSeek and ChatGPT. \
Type a line and press enter to speak; /status shows progress, /stop ends the debate."
)]
struct Cli {
    /// The topic to debate
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// Path to a TOML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the turn cap
    #[arg(long, value_name = "TURNS")]
    max_turns: Option<u32>,

    /// Skip all pacing delays
    #[arg(long)]
    fast: bool,

    /// Seed for reproducible addressing and pacing draws
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => default_config(),
    };

    for kind in BackendKind::ALL {
        let key_env = &config.backends.get(kind).api_key_env;
        let missing = env::var(key_env).map(|k| is_placeholder_key(&k)).unwrap_or(true);
        if missing {
            eprintln!(
                "{}",
                format!(
                    "Warning: {} not set. {} turns will show errors.",
                    key_env,
                    kind.display_name()
                )
                .yellow()
            );
        }
    }

    let random: Arc<dyn RandomSource> = match cli.seed {
        Some(seed) => Arc::new(SeededRandom::new(seed)),
        None => Arc::new(ThreadRandom),
    };
    let pacing = if cli.fast {
        Pacing::instant()
    } else {
        config.pacing.clone()
    };
    let max_turns = cli.max_turns.unwrap_or(config.limits.max_turns);

    let composer = PromptComposer::new(config.limits.context_window, random.clone());
    let client = CompletionClient::from_config(composer, &config.backends, |name| {
        env::var(name).ok()
    })?;

    let store = Arc::new(SessionStore::new(config.limits.retention()));
    let _sweeper = store.spawn_sweeper(config.limits.sweep_interval());

    let scheduler = DebateScheduler::new(store, Arc::new(client), random)
        .with_pacing(pacing)
        .with_max_turns(max_turns);

    let session_id = scheduler.create_session(&cli.topic)?;

    // Print header
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", "  DebateTerm - AI Debate Terminal".bright_blue().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{} {}", "Topic:".bold(), cli.topic.trim().bright_white());
    println!(
        "{} {}",
        "Speakers:".bold(),
        Identity::ROSTER
            .iter()
            .map(|i| speaker_label(Speaker::from(*i)).to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "{}",
        "Type to join the debate. /status for progress, /stop to end.".dimmed()
    );
    println!("{}", "─".repeat(70).dimmed());
    println!();

    let mut debate = scheduler.start(session_id).await?;
    info!(session = %session_id, max_turns, "Debate started");
    let mut printer = TranscriptPrinter::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ctrl_c_armed = true;

    loop {
        tokio::select! {
            outcome = &mut debate => {
                let outcome = outcome?;
                info!(session = %session_id, ?outcome, "Debate finished");
                if let Ok(state) = scheduler.session_state(session_id).await {
                    printer.render(&state);
                }
                print_footer(match outcome {
                    LoopOutcome::Completed => "  Debate concluded.",
                    LoopOutcome::Stopped => "  Debate stopped.",
                });
                break;
            }
            signal = &mut ctrl_c, if ctrl_c_armed => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    ctrl_c_armed = false;
                    continue;
                }
                info!(session = %session_id, "Interrupted, stopping debate");
                scheduler.stop(session_id)?;
                print_footer("  Debate stopped.");
                break;
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) => {
                        if handle_input(&scheduler, session_id, line.trim()).await? {
                            print_footer("  Debate stopped and session cleared.");
                            break;
                        }
                    }
                    // Input closed; keep watching until the debate ends.
                    None => {
                        info!("Input closed");
                        stdin_open = false;
                    }
                }
            }
            _ = ticker.tick() => {
                if let Ok(state) = scheduler.session_state(session_id).await {
                    printer.render(&state);
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Act on one line of input. Returns true when the user asked to stop.
async fn handle_input(
    scheduler: &DebateScheduler,
    session_id: SessionId,
    line: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    match line {
        "" => Ok(false),
        "/stop" => {
            info!(session = %session_id, "Stop requested");
            scheduler.stop(session_id)?;
            Ok(true)
        }
        "/status" => {
            let state = scheduler.session_state(session_id).await?;
            println!(
                "{}",
                format!(
                    "  [turn {}/{} | {:?} | {} messages]",
                    state.current_turn,
                    scheduler.max_turns(),
                    state.status,
                    state.messages.iter().filter(|m| !m.is_typing).count()
                )
                .dimmed()
            );
            Ok(false)
        }
        content => {
            // The reply, if any, shows up through the regular polling.
            let _reply = scheduler.post_user_message(session_id, content).await?;
            Ok(false)
        }
    }
}

/// Prints transcript entries the first time they appear.
///
/// Settled messages only ever get appended, so counting the non-typing
/// entries already printed is enough to find the new ones.
#[derive(Default)]
struct TranscriptPrinter {
    printed: usize,
    typing: Option<(Speaker, u32)>,
}

impl TranscriptPrinter {
    fn render(&mut self, state: &SessionSnapshot) {
        let settled: Vec<_> = state.messages.iter().filter(|m| !m.is_typing).collect();
        for message in settled.iter().skip(self.printed) {
            // Our own lines are already on screen.
            if message.speaker != Speaker::User {
                println!("{} {}", "▶".bright_cyan(), speaker_label(message.speaker));
                let wrapped = textwrap(&message.content, 66);
                for line in wrapped.lines() {
                    if message.is_error {
                        println!("  {}", line.red());
                    } else {
                        println!("  {}", line);
                    }
                }
                println!();
            }
        }
        self.printed = settled.len();

        let typing = state
            .messages
            .iter()
            .find(|m| m.is_typing)
            .map(|m| (m.speaker, m.turn));
        if let Some((speaker, _)) = typing.filter(|t| Some(*t) != self.typing) {
            println!("  {}", format!("{} is typing...", speaker).dimmed());
        }
        self.typing = typing;
    }
}

fn speaker_label(speaker: Speaker) -> ColoredString {
    let name = speaker.display_name();
    match speaker {
        Speaker::Claude => name.truecolor(212, 116, 60).bold(),
        Speaker::Grok => name.truecolor(255, 107, 53).bold(),
        Speaker::DeepSeek => name.truecolor(79, 70, 229).bold(),
        Speaker::ChatGpt => name.truecolor(16, 163, 127).bold(),
        Speaker::User => name.bright_white().bold(),
        Speaker::System => name.red().bold(),
    }
}

fn print_footer(text: &str) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", text.bright_green().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!();
}

/// Simple text wrapping function.
fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line_len = 0;

    for word in text.split_whitespace() {
        if current_line_len + word.len() + 1 > width && current_line_len > 0 {
            result.push('\n');
            current_line_len = 0;
        }
        if current_line_len > 0 {
            result.push(' ');
            current_line_len += 1;
        }
        result.push_str(word);
        current_line_len += word.len();
    }

    result
}
