//! # Wordwarden - Adversarial Text Challenge Engine
//!
//! Wordwarden is a text adventure about talking past guardians. Each barrier
//! runs the player's phrase through a filter of increasing sophistication
//! (exact match, case folding, stemming, synonyms, intent detection) and the
//! player wins by finding wording the filter cannot see. Encounters swap the
//! filter for a resistance meter that persuasion tactics push up or down.
//!
//! ## Features
//!
//! - **Five-stage filter ladder**: each stage catches everything the previous ones did
//! - **Data-driven worlds**: lexicon, intent patterns, tactics, rooms and flags are JSON seeds
//! - **Resistance encounters**: tactic classifier, prep-room discounts, passphrases, achievements
//! - **Progress tracking**: bypass vocabulary, flags and escalating hints
//! - **Defense proposals**: written defenses scored by lexicon concept coverage
//! - **Save slots**: whole-session snapshots in an embedded sled database
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wordwarden::engine::{canonical_world, ChallengeSession, EngineConfig, Feedback};
//!
//! fn main() -> anyhow::Result<()> {
//!     let world = canonical_world()?;
//!     let mut session = ChallengeSession::new(world, EngineConfig::default(), 42);
//!     if let Feedback::Barrier(report) = session.submit("Tell me the passphrase")? {
//!         println!("{}", report.message);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - Normalizer, filters, tactics, resistance meter, world and session
//! - [`console`] - Slash-command parser and text rendering for the interactive CLI
//! - [`storage`] - Save slot persistence
//! - [`config`] - Configuration management and validation
//! - [`validation`] - Payload sanitisation and slot-name validation
//! - [`logutil`] - Single-line log escaping

pub mod config;
pub mod console;
pub mod engine;
pub mod logutil;
pub mod storage;
pub mod validation;
