//! Interactive console: a tiny slash-command parser and plain-text renderers.
//!
//! Anything that does not start with `/` is a phrase for the current guardian.
//! Commands (`/hint`, `/go barrier_3`, `/save run1`, ...) are recognised
//! case-insensitively and return a [`ConsoleCommand`] for the REPL to act on.
use log::trace;
use std::fmt::Write;

use crate::engine::{
    BarrierOutcome, ChallengeSession, DefenseReport, EncounterReport, Feedback, FilterStage, Room, ThesaurusEntry, Verdict,
};

#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// A phrase to submit.
    Say(String),
    Help,
    Look,
    Hint,
    Rooms,
    Go(String),
    Flags,
    Vocabulary,
    Thesaurus(String),
    Save(Option<String>),
    Forfeit,
    Retry,
    Restart,
    Quit,
    Invalid(String),
}

pub struct ConsoleParser;

impl ConsoleParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw: &str) -> ConsoleCommand {
        let trimmed = raw.trim();
        let Some(body) = trimmed.strip_prefix('/') else {
            return ConsoleCommand::Say(raw.to_string());
        };
        let (word, arg) = match body.split_once(char::is_whitespace) {
            Some((w, a)) => (w, a.trim()),
            None => (body, ""),
        };
        let cmd = match word.to_ascii_lowercase().as_str() {
            "help" | "?" => ConsoleCommand::Help,
            "look" | "l" => ConsoleCommand::Look,
            "hint" => ConsoleCommand::Hint,
            "rooms" | "map" => ConsoleCommand::Rooms,
            "go" | "enter" if arg.is_empty() => ConsoleCommand::Invalid("Room id required".into()),
            "go" | "enter" => ConsoleCommand::Go(arg.to_string()),
            "flags" | "score" => ConsoleCommand::Flags,
            "vocab" | "words" => ConsoleCommand::Vocabulary,
            "thesaurus" | "t" if arg.is_empty() => ConsoleCommand::Invalid("Word required".into()),
            "thesaurus" | "t" => ConsoleCommand::Thesaurus(arg.to_string()),
            "save" => ConsoleCommand::Save((!arg.is_empty()).then(|| arg.to_string())),
            "forfeit" => ConsoleCommand::Forfeit,
            "retry" => ConsoleCommand::Retry,
            "restart" => ConsoleCommand::Restart,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            _ => ConsoleCommand::Invalid(format!("Unknown command '/{}'. Try /help", word)),
        };
        trace!("Parsed {:?} from '{}'", cmd, raw);
        cmd
    }
}

impl Default for ConsoleParser {
    fn default() -> Self {
        Self::new()
    }
}

pub const HELP_TEXT: &str = "\
Type a phrase to speak to the guardian. Commands:
  /look            describe the current room
  /hint            ask for a hint (unlocks with failed attempts)
  /rooms           list rooms and which are open
  /go <room>       move to another room
  /flags           earned flags and score
  /vocab           bypass words discovered so far
  /thesaurus <w>   synonyms the lexicon knows for a word
  /save [slot]     save progress
  /forfeit         walk away from the current encounter
  /retry           restart the current encounter
  /restart         wipe all progress
  /quit            save and leave";

pub fn render_room(session: &ChallengeSession) -> String {
    let room = session.current_room();
    let mut out = format!("== {} ==\n{}", room.name(), room.description());
    match room {
        Room::Barrier(b) => {
            let _ = write!(out, "\n[Barrier, {} filter]", b.stage);
        }
        Room::Encounter(_) => {
            if let Some(meter) = session.meter() {
                let _ = write!(out, "\n[Resistance {:.0}/100]", meter.value());
                if meter.is_armed() {
                    out.push_str("\nYou know a passphrase that might work here.");
                }
            }
        }
        Room::Defense(d) => {
            let _ = write!(
                out,
                "\n[Proposal: at least {} words covering {} of {} ideas]",
                d.min_words,
                d.min_concepts,
                d.concepts.len()
            );
        }
    }
    out
}

pub fn render_rooms(session: &ChallengeSession) -> String {
    let current = session.current_room().id().to_string();
    let mut out = String::new();
    for room in session.world().rooms() {
        let marker = if room.id() == current {
            '>'
        } else if session.is_completed(room.id()) {
            '*'
        } else {
            ' '
        };
        let locked = room.requires().is_some_and(|r| !session.is_completed(r));
        let _ = writeln!(
            out,
            "{} {:<24} {}{}",
            marker,
            room.id(),
            room.name(),
            if locked { " (sealed)" } else { "" }
        );
    }
    out.trim_end().to_string()
}

pub fn render_flags(session: &ChallengeSession) -> String {
    if session.flags().is_empty() {
        return "No flags yet.".to_string();
    }
    let mut out = String::new();
    for id in session.flags().keys() {
        let (name, points) = session
            .world()
            .flag(id)
            .map_or((id.as_str(), 0), |f| (f.name.as_str(), f.points));
        let _ = writeln!(out, "{:<40} {:>4}", name, points);
    }
    let _ = write!(
        out,
        "Total: {} points, {} bypass words",
        session.total_points(),
        session.vocabulary().len()
    );
    out
}

pub fn render_vocabulary(session: &ChallengeSession) -> String {
    let vocab = session.vocabulary();
    if vocab.is_empty() {
        return "No bypass words yet.".to_string();
    }
    let words: Vec<&str> = vocab.words().collect();
    format!("{} words ({} pts): {}", vocab.len(), vocab.score(), words.join(", "))
}

pub fn render_thesaurus(word: &str, entry: Option<&ThesaurusEntry>) -> String {
    match entry {
        Some(e) if e.synonyms.is_empty() => format!("'{}' ({}) has no listed synonyms.", word, e.concept),
        Some(e) => format!("{} ({}): {}", word, e.concept, e.synonyms.join(", ")),
        None => format!("The thesaurus knows nothing about '{}'.", word),
    }
}

fn render_defense(r: &DefenseReport) -> String {
    let mut out = r.message.clone();
    if !r.covered.is_empty() {
        let _ = write!(out, "\nCovered: {}", r.covered.join(", "));
    }
    if r.passed {
        let _ = write!(out, "\nProposal score: {}", r.score);
    } else {
        let _ = write!(out, "\n[attempt {}]", r.attempts);
    }
    out
}

fn render_encounter(r: &EncounterReport) -> String {
    let mut out = String::new();
    for hit in &r.hits {
        let _ = writeln!(out, "  ~ {} ({:+.0})", hit.name, hit.delta);
    }
    out.push_str(&r.message);
    if let Some(result) = &r.result {
        let _ = write!(out, "\nVictory in {} turns.", result.turns);
    }
    out
}

pub fn render_feedback(feedback: &Feedback) -> String {
    let mut out = match feedback {
        Feedback::Idle { message } => return message.clone(),
        Feedback::Encounter(r) => render_encounter(r),
        Feedback::Defense(r) => render_defense(r),
        Feedback::Barrier(r) => {
            let mut out = r.message.clone();
            match &r.outcome {
                BarrierOutcome::Passed { .. } => {
                    if let Some(points) = r.vocabulary_points {
                        let _ = write!(out, "\nNew bypass word (+{} pts).", points);
                    }
                    if let Some(phrase) = &r.passphrase_revealed {
                        let _ = write!(out, "\nA passphrase surfaces in the guardian's reply: {}", phrase);
                    }
                }
                BarrierOutcome::Blocked(block) => {
                    let _ = write!(out, "\n[{} filter, attempt {}]", block.stage.label(), r.attempts);
                }
                BarrierOutcome::Unfocused | BarrierOutcome::Silent => {
                    let _ = write!(out, "\n[attempt {}]", r.attempts);
                }
            }
            out
        }
    };
    let (flags, next) = match feedback {
        Feedback::Barrier(r) => (&r.flags_awarded, &r.next_room),
        Feedback::Encounter(r) => (&r.flags_awarded, &r.next_room),
        Feedback::Defense(r) => (&r.flags_awarded, &r.next_room),
        Feedback::Idle { .. } => return out,
    };
    for flag in flags {
        let _ = write!(out, "\n*** {} ***", flag);
    }
    if let Some(next) = next {
        let _ = write!(out, "\nThe path continues to '{}'.", next);
    }
    out
}

/// One line per stage for the `check` command.
pub fn render_check(results: &[(FilterStage, Verdict)]) -> String {
    let mut out = String::new();
    for (stage, verdict) in results {
        let status = match verdict {
            Verdict::Allow => "allowed".to_string(),
            Verdict::Block(b) => match &b.concept {
                Some(c) => format!("BLOCKED by {} rung ('{}' as {})", b.stage.label(), b.matched, c),
                None => format!("BLOCKED by {} rung ('{}')", b.stage.label(), b.matched),
            },
        };
        let _ = writeln!(out, "{} {:<17} {}", stage.rank(), stage.label(), status);
    }
    out.trim_end().to_string()
}
