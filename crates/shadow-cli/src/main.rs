//! Shadow Network CLI - the director's console.
//!
//! Single binary that provides:
//! - `shadownet init` - seed the data directory and prompt templates
//! - `shadownet play` - interactive turn loop
//! - `shadownet status` / `agents` / `agent` - read-only views
//! - `shadownet speak` - voice transmissions

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use shadow_core::adapters::{DirTemplates, InlineTemplates, Offline, TemplateSource};
use shadow_core::rng::SplitMix64;
use shadow_core::state::{scenario, GameOver, PublicAgent, PublicWorldState};
use shadow_core::turn::{OrderOutcome, TurnEnd, TurnStart};
use shadow_core::{
    FileStore, GameConfig, Generator, MistralClient, Storage, TurnManager, TurnResult, VoiceService,
};

#[derive(Parser)]
#[command(name = "shadownet")]
#[command(about = "Director console for the Shadow Network", version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new game directory
    Init,

    /// Restore the starting scenario
    NewGame,

    /// Show the world as the director sees it
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List field operatives
    Agents {
        #[arg(long)]
        json: bool,
    },

    /// Show one operative
    Agent { codename: String },

    /// Check whether the game has ended
    GameOver,

    /// Play turns interactively
    Play {
        /// Seed autonomous-event rolls for a reproducible session
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Synthesize an operative's voice
    Speak {
        codename: String,

        /// Text to speak; a channel check phrase when omitted
        text: Option<String>,

        /// Where to write the MP3
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Voice cache management
    Voice {
        #[command(subcommand)]
        command: VoiceCommands,
    },
}

#[derive(Subcommand)]
enum VoiceCommands {
    /// Delete cached transmissions
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let project_root = match cli.project {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        Some(Commands::Init) => init_project(&project_root),
        Some(Commands::NewGame) => {
            let mut session = open_session(&project_root)?;
            let world = session.new_game()?;
            println!("New game started.");
            println!();
            print_world(&world);
            Ok(())
        }
        Some(Commands::Status { json }) => {
            let session = open_session(&project_root)?;
            let world = session.world_state()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&world)?);
            } else {
                print_world(&world);
            }
            Ok(())
        }
        Some(Commands::Agents { json }) => {
            let mut session = open_session(&project_root)?;
            let agents = session.agents()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&agents)?);
            } else {
                print_agents(&agents);
            }
            Ok(())
        }
        Some(Commands::Agent { codename }) => {
            let mut session = open_session(&project_root)?;
            let agent = session.agent(&codename)?;
            println!("{}", serde_json::to_string_pretty(&agent)?);
            Ok(())
        }
        Some(Commands::GameOver) => {
            let mut session = open_session(&project_root)?;
            match session.check_game_over()? {
                Some(over) => print_game_over(&over),
                None => println!("The network is still operational."),
            }
            Ok(())
        }
        Some(Commands::Play { seed }) => {
            let mut session = open_session(&project_root)?;
            if let Some(seed) = seed {
                tracing::info!(seed, "Using seeded rolls");
                session = session.with_rng(Box::new(SplitMix64::new(seed)));
            }
            play(session).await
        }
        Some(Commands::Speak { codename, text, out }) => {
            speak(&project_root, &codename, text, out).await
        }
        Some(Commands::Voice { command }) => handle_voice(&project_root, command),
        None => {
            println!("Shadow Network - Director's Console");
            println!();
            println!("Usage: shadownet <COMMAND>");
            println!();
            println!("Commands:");
            println!("  init      Initialize a new game directory");
            println!("  play      Play turns interactively");
            println!("  status    Show the world state");
            println!("  agents    List field operatives");
            println!();
            println!("Run 'shadownet --help' for more information.");
            Ok(())
        }
    }
}

fn load_config(project_root: &Path) -> Result<GameConfig> {
    let mut config = GameConfig::load_from_project(project_root)?;
    config.resolve_paths(project_root);
    Ok(config)
}

fn open_session(project_root: &Path) -> Result<TurnManager> {
    let config = load_config(project_root)?;

    let store = FileStore::new(&config.data_dir);
    if !store.is_seeded() {
        anyhow::bail!(
            "No game found under {}. Run 'shadownet init' first.",
            config.data_dir.display()
        );
    }

    let generator: Arc<dyn Generator> = match MistralClient::from_config(&config.llm) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::warn!(error = %e, "Running offline; generated content will use fallbacks");
            Arc::new(Offline::new(e.to_string()))
        }
    };

    let templates: Box<dyn TemplateSource> = if config.prompts_dir.is_dir() {
        Box::new(DirTemplates::new(&config.prompts_dir))
    } else {
        tracing::debug!(
            dir = %config.prompts_dir.display(),
            "Prompt directory missing, using built-in templates"
        );
        Box::new(InlineTemplates::builtin())
    };

    Ok(TurnManager::new(config, Box::new(store), generator, templates))
}

const HELP: &str = "\
Commands:
  start                  Begin the turn and receive the world event
  order <text>           Issue an order (name the operative in the text)
  to <CODENAME> <text>   Issue an order to a named operative
  respond <text>         Answer the current world event
  end                    End the turn
  extract <CODENAME>     Pull an operative out of the field
  new-game               Restore the starting scenario
  status                 World state
  agents                 Operative roster
  briefing               Repeat the current briefing
  intel                  Repeat the last intelligence report
  transmissions          Transmission log for this session
  rogue                  Autonomous events from the last turn end
  help                   This list
  quit                   Leave the console";

async fn play(mut session: TurnManager) -> Result<()> {
    println!("SHADOW NETWORK - secure channel open.");
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_intel: Option<String> = None;
    loop {
        print!("\nDIRECTOR> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let outcome = match command.to_lowercase().as_str() {
            "" => Ok(()),
            "quit" | "exit" => break,
            "help" => {
                println!("{HELP}");
                Ok(())
            }
            "start" => session.start_turn().await.map(|r| show(r, print_turn_start)),
            "order" if !rest.is_empty() => session
                .issue_order(rest)
                .await
                .map(|r| show(remember_intel(r, &mut last_intel), print_outcome)),
            "to" => match rest.split_once(' ') {
                Some((codename, order)) => session
                    .issue_order_to(codename, order.trim())
                    .await
                    .map(|r| show(remember_intel(r, &mut last_intel), print_outcome)),
                None => {
                    println!("Usage: to <CODENAME> <order>");
                    Ok(())
                }
            },
            "respond" if !rest.is_empty() => session.respond_to_event(rest).map(|r| {
                show(r, |resp| {
                    println!(
                        "Response logged for \"{}\". Director trust +{}.",
                        resp.event_title, resp.trust_change
                    )
                })
            }),
            "end" => session.end_turn().await.map(|r| show(r, print_turn_end)),
            "extract" if !rest.is_empty() => session.extract(rest).map(|ex| {
                println!("{}", ex.message);
                println!("Agency exposure +{}.", ex.exposure_increase);
            }),
            "new-game" => session.new_game().map(|w| {
                last_intel = None;
                println!("New game started.");
                print_world(&w);
            }),
            "status" => session.world_state().map(|w| print_world(&w)),
            "agents" => session.agents().map(|a| print_agents(&a)),
            "briefing" => {
                match session.current_briefing() {
                    "" => println!("No briefing yet. Start the turn first."),
                    briefing => println!("{briefing}"),
                }
                Ok(())
            }
            "intel" => {
                let intel = last_intel.as_deref();
                println!("{}", intel.unwrap_or("No intelligence reports this session."));
                Ok(())
            }
            "log" | "transmissions" => {
                for t in session.transmissions() {
                    println!(
                        "[T{} {}] {} <- {}",
                        t.turn,
                        t.timestamp.format("%H:%M:%S"),
                        t.codename,
                        t.order
                    );
                    println!("  {}", t.response);
                }
                Ok(())
            }
            "rogue" => {
                if session.rogue_events().is_empty() {
                    println!("No autonomous events last turn.");
                }
                for event in session.rogue_events() {
                    println!("!! {}", event.title);
                    println!("{}", event.narration);
                }
                Ok(())
            }
            other => {
                println!("Unknown or incomplete command '{other}'. Type 'help'.");
                Ok(())
            }
        };

        // Engine errors are reported and the console keeps running.
        if let Err(e) = outcome {
            tracing::debug!(status = e.status_code(), "Command failed");
            println!("ERROR: {e}");
        }
    }

    println!("Channel closed.");
    Ok(())
}

fn remember_intel(
    result: TurnResult<OrderOutcome>,
    last: &mut Option<String>,
) -> TurnResult<OrderOutcome> {
    if let TurnResult::Proceed(outcome) = &result {
        *last = Some(outcome.intel_report.clone());
    }
    result
}

fn show<T>(result: TurnResult<T>, print: impl FnOnce(T)) {
    match result {
        TurnResult::Proceed(value) => print(value),
        TurnResult::GameOver { game_over } => print_game_over(&game_over),
    }
}

fn print_turn_start(start: TurnStart) {
    println!("=== TURN {} ===", start.turn);
    println!();
    println!(">> {}", start.event.event_title);
    println!("{}", start.event.event_description);
    if let Some(region) = &start.event.affected_region {
        println!("Region: {region} (tension {:+})", start.event.tension_impact);
    }
    for action in &start.event.suggested_actions {
        println!("  - {action}");
    }
    println!();
    println!("{}", start.briefing);
}

fn print_outcome(outcome: OrderOutcome) {
    let t = &outcome.transmission;
    println!(
        "[{} | {} | risk {}]",
        t.codename, outcome.routing.mission_type, outcome.routing.risk_level
    );
    println!("{}", t.response);
    println!();
    println!("--- INTEL ---");
    println!("{}", outcome.intel_report);
    if let Some(over) = &outcome.game_over {
        print_game_over(over);
    }
}

fn print_turn_end(end: TurnEnd) {
    for event in &end.rogue_events {
        println!("!! {}", event.title);
        println!("{}", event.narration);
        println!();
    }
    println!("Turn {} begins. Threat level: {}", end.new_turn, end.threat_level);
    if let Some(over) = &end.game_over {
        print_game_over(over);
    }
}

fn print_game_over(over: &GameOver) {
    println!();
    println!("*** GAME OVER ***");
    println!("{}", over.reason);
    println!("Use 'new-game' to start again.");
}

fn print_world(world: &PublicWorldState) {
    println!("Shadow Network Status");
    println!("=====================");
    println!();
    println!("Turn:     {}", world.turn);
    println!("Threat:   {}", world.threat_level);
    println!("Exposure: {}", world.agency_exposure_level);
    println!("Trust:    {}", world.director_trust_score);
    println!();
    println!("Regions:");
    for region in world.regions.values() {
        println!("  {:<16} {:>3}", region.name, region.tension);
    }
    if !world.compromised_assets.is_empty() {
        println!();
        println!("Compromised: {}", world.compromised_assets.join(", "));
    }
}

fn print_agents(agents: &[PublicAgent]) {
    println!(
        "{:<10} {:<12} {:<12} {:>6} {:>8}",
        "CODENAME", "LOCATION", "STATUS", "SIGNAL", "MISSIONS"
    );
    for agent in agents {
        println!(
            "{:<10} {:<12} {:<12} {:>5}% {:>8}",
            agent.codename,
            agent.location,
            agent.status.as_str(),
            agent.signal_quality,
            agent.mission_count
        );
    }
}

async fn speak(
    project_root: &Path,
    codename: &str,
    text: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(project_root)?;
    let voice = VoiceService::from_config(&config);
    if !voice.is_configured() {
        anyhow::bail!("Voice synthesis is not configured; set ${}", config.voice.api_key_env);
    }

    let codename = codename.to_uppercase();
    let audio = match text {
        Some(text) => voice.transmission(&codename, &text).await?,
        None => voice.test_transmission(&codename).await?,
    };

    let out = out.unwrap_or_else(|| PathBuf::from(format!("{codename}.mp3")));
    std::fs::write(&out, &audio).with_context(|| format!("Failed to write {}", out.display()))?;
    println!("Wrote {} bytes to {}", audio.len(), out.display());
    Ok(())
}

fn handle_voice(project_root: &Path, command: VoiceCommands) -> Result<()> {
    let config = load_config(project_root)?;
    match command {
        VoiceCommands::Clear => {
            let voice = VoiceService::from_config(&config);
            let removed = voice.cache().clear()?;
            println!(
                "Removed {removed} cached transmissions from {}",
                voice.cache().dir().display()
            );
        }
    }
    Ok(())
}

fn init_project(project_root: &Path) -> Result<()> {
    let shadow_dir = project_root.join(".shadownet");
    std::fs::create_dir_all(&shadow_dir)?;

    let config_path = shadow_dir.join("config.yaml");
    if !config_path.exists() {
        std::fs::write(&config_path, shadow_core::config::DEFAULT_CONFIG_YAML)?;
    }

    let config = load_config(project_root)?;

    let store = FileStore::new(&config.data_dir);
    let seeded = if store.is_seeded() {
        false
    } else {
        store.seed(&scenario::default_world(), &scenario::default_agents())?;
        true
    };

    let templates = DirTemplates::install_builtin(&config.prompts_dir)?;

    println!("Initialized Shadow Network at {}", project_root.display());
    println!();
    println!("Created:");
    println!("  .shadownet/config.yaml - game configuration");
    if seeded {
        println!("  {} - world and operative records", config.data_dir.display());
    }
    for name in &templates {
        println!("  {}/{name}.md - prompt template", config.prompts_dir.display());
    }
    println!();
    println!("Next steps:");
    println!("  1. export {}=...", config.llm.api_key_env);
    println!("  2. Run: shadownet play");

    Ok(())
}
