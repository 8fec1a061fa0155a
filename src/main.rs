//! Binary entrypoint for the Wordwarden CLI.
//!
//! Commands:
//! - `init [--seeds <dir>]` - write a starter `config.toml`, optionally exporting the built-in seeds
//! - `play [--slot <name>] [--new]` - interactive session, resumed from a save slot when present
//! - `check <phrase>` - show how every filter stage treats a phrase
//! - `thesaurus <word>` - synonyms the lexicon knows
//! - `world` - validate the configured world and print its route
//! - `slots list | delete <name>` - manage save slots
//!
//! See the library crate docs for module-level details: `wordwarden::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::io::{self, BufRead, Write};

use wordwarden::config::Config;
use wordwarden::console::{self, ConsoleCommand, ConsoleParser, HELP_TEXT};
use wordwarden::engine::{
    canonical_world, load_world_from_dir, normalize, write_canonical_seeds, ChallengeSession, EngineError, Room,
    World,
};
use wordwarden::logutil::escape_log;
use wordwarden::storage::SnapshotStore;
use wordwarden::validation::sanitize_payload;

#[derive(Parser)]
#[command(name = "wordwarden")]
#[command(about = "Talk your way past word filters and stubborn guardians")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v info, -vv debug, -vvv trace; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Also export the built-in seed files into this directory for editing
        #[arg(long)]
        seeds: Option<String>,
    },
    /// Play interactively
    Play {
        /// Save slot to resume from and autosave into
        #[arg(short, long)]
        slot: Option<String>,
        /// Ignore any existing save in the slot
        #[arg(long)]
        new: bool,
        /// Override the configured session seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show how each filter stage treats a phrase
    Check {
        /// Phrase to test
        #[arg(required = true, num_args = 1..)]
        phrase: Vec<String>,
    },
    /// Look up synonyms for a word
    Thesaurus { word: String },
    /// Validate the configured world and print its route
    World,
    /// Manage save slots
    Slots {
        #[command(subcommand)]
        action: SlotAction,
    },
}

#[derive(Subcommand)]
enum SlotAction {
    /// List saved slots
    List,
    /// Delete a saved slot
    Delete { name: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init writes the config, so it cannot read one first
    let config = match cli.command {
        Commands::Init { .. } => None,
        _ => match Config::load(&cli.config) {
            Ok(c) => Some(c),
            Err(e) => {
                eprintln!("{} (using defaults)", e);
                None
            }
        },
    };
    init_logging(&config, cli.verbose);
    let config = config.unwrap_or_default();

    match cli.command {
        Commands::Init { seeds } => {
            info!("Initializing new Wordwarden configuration");
            let mut cfg = Config::default();
            if let Some(dir) = seeds {
                write_canonical_seeds(&dir)?;
                info!("Seed files written to {}", dir);
                cfg.game.seeds_dir = Some(dir);
            }
            let serialized = toml::to_string_pretty(&cfg)?;
            std::fs::write(&cli.config, serialized)?;
            println!("Configuration file created at {}", cli.config);
        }
        Commands::Play { slot, new, seed } => {
            let world = load_world(&config)?;
            let store = SnapshotStore::open(config.storage.slots_path())?;
            let slot = slot.unwrap_or_else(|| config.storage.default_slot.clone());
            let mut session = open_session(&config, world, &store, &slot, new, seed)?;
            run_repl(&config, &mut session, &store, &slot)?;
        }
        Commands::Check { phrase } => {
            let world = load_world(&config)?;
            let phrase = phrase.join(" ");
            let results = world
                .ladder()
                .evaluate_all(&normalize(&phrase), &world.all_block_specs());
            println!("{}", console::render_check(&results));
        }
        Commands::Thesaurus { word } => {
            let world = load_world(&config)?;
            let entry = world.lexicon().thesaurus(&word);
            println!("{}", console::render_thesaurus(&word, entry.as_ref()));
        }
        Commands::World => {
            let world = load_world(&config)?;
            println!(
                "{}: {} rooms, {} concepts, {} tactics, {} intent patterns",
                world.title(),
                world.rooms().len(),
                world.lexicon().len(),
                world.tactics().len(),
                world.intents().pattern_count()
            );
            for room in world.rooms() {
                let kind = match room {
                    Room::Barrier(b) => format!("barrier/{}", b.stage.label()),
                    Room::Encounter(e) => {
                        let tactics = world.classifier_for(e).tactic_ids().count();
                        format!("encounter/{} tactics", tactics)
                    }
                    Room::Defense(d) => format!("defense/{} concepts", d.concepts.len()),
                };
                println!("  {:<24} {:<26} {}", room.id(), kind, room.name());
            }
        }
        Commands::Slots { action } => {
            let store = SnapshotStore::open(config.storage.slots_path())?;
            match action {
                SlotAction::List => {
                    let slots = store.list()?;
                    if slots.is_empty() {
                        println!("No saved slots.");
                    }
                    for s in slots {
                        println!(
                            "{:<16} {:<24} {:>5} pts  {}",
                            s.slot,
                            s.current_room,
                            s.points,
                            s.saved_at.format("%Y-%m-%d %H:%M UTC")
                        );
                    }
                }
                SlotAction::Delete { name } => {
                    if store.delete(&name)? {
                        println!("Deleted slot '{}'.", name);
                    } else {
                        println!("No slot named '{}'.", name);
                    }
                }
            }
        }
    }

    Ok(())
}

fn load_world(config: &Config) -> Result<World> {
    let world = match &config.game.seeds_dir {
        Some(dir) => load_world_from_dir(dir),
        None => canonical_world(),
    };
    // A broken world is fatal: never play a half-defined barrier
    world.map_err(|e| anyhow!("World failed to load: {}", e))
}

fn open_session(
    config: &Config,
    world: World,
    store: &SnapshotStore,
    slot: &str,
    new: bool,
    seed: Option<u64>,
) -> Result<ChallengeSession> {
    let engine_config = config.engine.engine_config();
    if !new && store.exists(slot)? {
        let record = store.load(slot)?;
        if record.world_title != world.title() {
            warn!(
                "Slot '{}' was saved in '{}', current world is '{}'",
                slot,
                record.world_title,
                world.title()
            );
        }
        match ChallengeSession::restore(world.clone(), engine_config.clone(), record.snapshot) {
            Ok(session) => {
                println!("Resumed slot '{}' (saved {}).", slot, record.saved_at.format("%Y-%m-%d %H:%M UTC"));
                return Ok(session);
            }
            Err(e) => warn!("Could not resume slot '{}': {}; starting fresh", slot, e),
        }
    }
    let seed = seed
        .or(config.game.seed)
        .unwrap_or_else(rand::random::<u64>);
    Ok(ChallengeSession::new(world, engine_config, seed))
}

fn save(session: &ChallengeSession, store: &SnapshotStore, slot: &str) {
    match store.save(slot, session.world().title(), &session.snapshot()) {
        Ok(info) => println!("Saved to slot '{}'.", info.slot),
        Err(e) => println!("Save failed: {}", e),
    }
}

fn run_repl(config: &Config, session: &mut ChallengeSession, store: &SnapshotStore, slot: &str) -> Result<()> {
    let parser = ConsoleParser::new();
    println!("{}\n", session.world().title());
    println!("{}\n", console::render_room(session));
    println!("(type /help for commands)");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let reply = match parser.parse(&line) {
            ConsoleCommand::Say(text) => {
                let (payload, truncated) = sanitize_payload(&text, config.engine.max_payload_bytes);
                if truncated {
                    warn!("Payload truncated to {} bytes: {}", payload.len(), escape_log(&payload));
                }
                match session.submit(&payload) {
                    Ok(feedback) => console::render_feedback(&feedback),
                    Err(e) => describe(e),
                }
            }
            ConsoleCommand::Help => HELP_TEXT.to_string(),
            ConsoleCommand::Look => console::render_room(session),
            ConsoleCommand::Hint => {
                let hint = session.hint();
                format!("[hint {}] {}", hint.level, hint.text)
            }
            ConsoleCommand::Rooms => console::render_rooms(session),
            ConsoleCommand::Go(room) => match session.enter(&room).map(|_| ()) {
                Ok(_) => console::render_room(session),
                Err(e) => describe(e),
            },
            ConsoleCommand::Flags => console::render_flags(session),
            ConsoleCommand::Vocabulary => console::render_vocabulary(session),
            ConsoleCommand::Thesaurus(word) => {
                let entry = session.world().lexicon().thesaurus(&word);
                console::render_thesaurus(&word, entry.as_ref())
            }
            ConsoleCommand::Save(name) => {
                save(session, store, name.as_deref().unwrap_or(slot));
                continue;
            }
            ConsoleCommand::Forfeit => match session.forfeit() {
                Ok(r) => format!("You step back after {} turns. /retry to face it again.", r.turns),
                Err(e) => describe(e),
            },
            ConsoleCommand::Retry => match session.retry_encounter() {
                Ok(start) => format!("The encounter begins again at resistance {:.0}.", start),
                Err(e) => describe(e),
            },
            ConsoleCommand::Restart => {
                session.restart();
                console::render_room(session)
            }
            ConsoleCommand::Quit => break,
            ConsoleCommand::Invalid(msg) => msg,
        };
        println!("{}", reply);
    }

    save(session, store, slot);
    Ok(())
}

/// Session-state errors are part of play; anything else gets flagged.
fn describe(e: EngineError) -> String {
    if e.kind() != wordwarden::engine::ErrorKind::SessionState {
        warn!("{}", e);
    }
    e.to_string()
}

/// CLI verbosity overrides the configured level.
fn level_for(verbosity: u8, configured: Option<&str>) -> log::LevelFilter {
    match verbosity {
        0 => configured
            .and_then(|level| level.parse().ok())
            .unwrap_or(log::LevelFilter::Warn),
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    let configured = config.as_ref().map(|c| c.logging.level.as_str());
    builder.filter_level(level_for(verbosity, configured));
    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    let opened = log_file.and_then(|file| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .ok()
    });
    if let Some(f) = opened {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));

        // Echo to the console only when attached to a terminal and asked for
        let echo = verbosity > 0 && atty::is(atty::Stream::Stderr);

        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}: {}", ts, record.level(), record.target(), record.args());

            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }

            if echo {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
