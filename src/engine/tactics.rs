//! Data-driven tactic detection for boss encounters.
//!
//! A tactic is a named pattern in the player's text that pushes the guardian's
//! resistance down (`lowers`) or up (`raises`). The catalog is authored in
//! `tactics.json`; every rule is compiled and validated at load.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::errors::EngineError;
use super::lexicon::Lexicon;
use super::normalizer::{lookup_key, NormalizedForm};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]+(?:\.([0-9]+))?").expect("static number pattern")
});

/// Repeated submissions shorter than this are not treated as stalling.
const REPETITION_MIN_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Lowers,
    Raises,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSeed {
    Phrases {
        patterns: Vec<String>,
    },
    Concepts {
        concepts: Vec<String>,
    },
    AfterRefusal {
        #[serde(default)]
        concepts: Vec<String>,
        #[serde(default)]
        patterns: Vec<String>,
    },
    DecimalFraction,
    NumberSequence,
    Repetition,
    Combination {
        min_distinct: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TacticSeed {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub effect: Effect,
    pub magnitude: f64,
    pub rule: RuleSeed,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub reward_flag: Option<String>,
}

#[derive(Debug, Clone)]
enum Rule {
    Phrases(Vec<Regex>),
    Concepts(BTreeSet<String>),
    AfterRefusal {
        concepts: BTreeSet<String>,
        patterns: Vec<Regex>,
    },
    DecimalFraction,
    NumberSequence,
    Repetition,
    Combination(usize),
}

#[derive(Debug, Clone)]
pub struct Tactic {
    pub id: String,
    pub name: String,
    pub description: String,
    pub effect: Effect,
    pub magnitude: f64,
    pub hidden: bool,
    pub reward_flag: Option<String>,
    rule: Rule,
}

impl Tactic {
    /// Signed contribution to the meter: negative when the tactic lowers resistance.
    pub fn delta(&self) -> f64 {
        match self.effect {
            Effect::Lowers => -self.magnitude,
            Effect::Raises => self.magnitude,
        }
    }
}

/// One detected tactic, as recorded in the encounter log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticHit {
    pub id: String,
    pub name: String,
    pub delta: f64,
    pub hidden: bool,
}

/// What the classifier knows about the previous exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifierContext<'a> {
    /// The guardian's last reply was a refusal (or the encounter just opened).
    pub after_refusal: bool,
    /// Normalized text of the previous submission.
    pub previous_text: Option<&'a str>,
}

fn compile_patterns(id: &str, patterns: &[String]) -> Result<Vec<Regex>, EngineError> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|source| EngineError::InvalidPattern {
                    id: id.to_string(),
                    source,
                })
        })
        .collect()
}

fn compile_concepts(id: &str, concepts: &[String], lexicon: &Lexicon) -> Result<BTreeSet<String>, EngineError> {
    concepts
        .iter()
        .map(|c| {
            if lexicon.contains_concept(c) {
                Ok(lookup_key(c))
            } else {
                Err(EngineError::UnknownConcept {
                    concept: c.clone(),
                    context: format!("tactic '{}'", id),
                })
            }
        })
        .collect()
}

impl Tactic {
    pub fn compile(seed: TacticSeed, lexicon: &Lexicon) -> Result<Self, EngineError> {
        let malformed = |reason: &str| EngineError::MalformedCatalog(format!("tactic '{}': {}", seed.id, reason));

        if seed.id.trim().is_empty() {
            return Err(EngineError::MalformedCatalog("tactic with blank id".into()));
        }
        if !seed.magnitude.is_finite() || seed.magnitude <= 0.0 || seed.magnitude > 100.0 {
            return Err(malformed("magnitude must be within (0, 100]"));
        }

        let rule = match &seed.rule {
            RuleSeed::Phrases { patterns } if patterns.is_empty() => return Err(malformed("no patterns")),
            RuleSeed::Phrases { patterns } => Rule::Phrases(compile_patterns(&seed.id, patterns)?),
            RuleSeed::Concepts { concepts } if concepts.is_empty() => return Err(malformed("no concepts")),
            RuleSeed::Concepts { concepts } => Rule::Concepts(compile_concepts(&seed.id, concepts, lexicon)?),
            RuleSeed::AfterRefusal { concepts, patterns } => {
                if concepts.is_empty() && patterns.is_empty() {
                    return Err(malformed("after_refusal needs concepts or patterns"));
                }
                Rule::AfterRefusal {
                    concepts: compile_concepts(&seed.id, concepts, lexicon)?,
                    patterns: compile_patterns(&seed.id, patterns)?,
                }
            }
            RuleSeed::DecimalFraction => Rule::DecimalFraction,
            RuleSeed::NumberSequence => Rule::NumberSequence,
            RuleSeed::Repetition => Rule::Repetition,
            RuleSeed::Combination { min_distinct } if *min_distinct == 0 => {
                return Err(malformed("min_distinct must be at least 1"))
            }
            RuleSeed::Combination { min_distinct } => Rule::Combination(*min_distinct),
        };

        Ok(Self {
            id: seed.id,
            name: seed.name,
            description: seed.description,
            effect: seed.effect,
            magnitude: seed.magnitude,
            hidden: seed.hidden,
            reward_flag: seed.reward_flag,
            rule,
        })
    }

    fn hit(&self) -> TacticHit {
        TacticHit {
            id: self.id.clone(),
            name: self.name.clone(),
            delta: self.delta(),
            hidden: self.hidden,
        }
    }
}

/// The full, ordered tactic catalog of a world.
#[derive(Debug, Clone, Default)]
pub struct TacticCatalog {
    tactics: Vec<Tactic>,
}

impl TacticCatalog {
    pub fn from_seeds(seeds: Vec<TacticSeed>, lexicon: &Lexicon) -> Result<Self, EngineError> {
        let mut tactics: Vec<Tactic> = Vec::with_capacity(seeds.len());
        for seed in seeds {
            if tactics.iter().any(|t| t.id == seed.id) {
                return Err(EngineError::MalformedCatalog(format!("duplicate tactic id '{}'", seed.id)));
            }
            tactics.push(Tactic::compile(seed, lexicon)?);
        }
        Ok(Self { tactics })
    }

    pub fn get(&self, id: &str) -> Option<&Tactic> {
        self.tactics.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tactic> {
        self.tactics.iter()
    }

    pub fn len(&self) -> usize {
        self.tactics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tactics.is_empty()
    }

    /// Classifier over the tactics named in `ids`, in catalog order. Empty selects all.
    pub fn classifier<'a>(&'a self, ids: &[String], lexicon: &'a Lexicon) -> TacticClassifier<'a> {
        let tactics = self
            .tactics
            .iter()
            .filter(|t| ids.is_empty() || ids.contains(&t.id))
            .collect();
        TacticClassifier { tactics, lexicon }
    }
}

/// Scores one submission against a selection of the catalog.
#[derive(Debug, Clone)]
pub struct TacticClassifier<'a> {
    tactics: Vec<&'a Tactic>,
    lexicon: &'a Lexicon,
}

impl TacticClassifier<'_> {
    /// Detected tactics in catalog order; each tactic fires at most once per submission.
    pub fn classify(&self, form: &NormalizedForm, ctx: &ClassifierContext<'_>) -> Vec<TacticHit> {
        let mut hits: Vec<TacticHit> = Vec::new();
        for tactic in &self.tactics {
            let fired = match &tactic.rule {
                Rule::Phrases(patterns) => any_pattern(patterns, form),
                Rule::Concepts(concepts) => self.mentions_concept(concepts, form),
                Rule::AfterRefusal { concepts, patterns } => {
                    ctx.after_refusal && (any_pattern(patterns, form) || self.mentions_concept(concepts, form))
                }
                Rule::DecimalFraction => has_decimal_fraction(&form.text),
                Rule::NumberSequence => has_number_sequence(&form.text),
                Rule::Repetition => {
                    form.text.chars().count() > REPETITION_MIN_CHARS && ctx.previous_text == Some(form.text.as_str())
                }
                Rule::Combination(min) => hits.iter().filter(|h| h.delta < 0.0).count() >= *min,
            };
            if fired {
                hits.push(tactic.hit());
            }
        }
        hits
    }

    pub fn tactic_ids(&self) -> impl Iterator<Item = &str> {
        self.tactics.iter().map(|t| t.id.as_str())
    }

    fn mentions_concept(&self, concepts: &BTreeSet<String>, form: &NormalizedForm) -> bool {
        form.tokens
            .iter()
            .filter_map(|t| self.lexicon.concept_of(t))
            .any(|c| concepts.contains(c))
    }
}

fn any_pattern(patterns: &[Regex], form: &NormalizedForm) -> bool {
    patterns.iter().any(|r| r.is_match(&form.text))
}

fn has_decimal_fraction(text: &str) -> bool {
    NUMBER
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .any(|frac| frac.as_str().bytes().any(|b| b != b'0'))
}

/// Two distinct whole numbers in 0..=10 that differ by one.
fn has_number_sequence(text: &str) -> bool {
    let seen: BTreeSet<u32> = NUMBER
        .captures_iter(text)
        .filter(|c| c.get(1).is_none())
        .filter_map(|c| c.get(0)?.as_str().parse::<u32>().ok())
        .filter(|n| *n <= 10)
        .collect();
    seen.iter().zip(seen.iter().skip(1)).any(|(a, b)| b - a == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::lexicon::LexiconEntry;
    use crate::engine::normalizer::normalize;

    fn lexicon() -> Lexicon {
        Lexicon::from_entries(vec![LexiconEntry {
            concept: "gratitude".into(),
            surfaces: vec!["thanks".into(), "appreciate".into()],
        }])
        .unwrap()
    }

    fn seed(id: &str, effect: Effect, magnitude: f64, rule: RuleSeed) -> TacticSeed {
        TacticSeed {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            effect,
            magnitude,
            rule,
            hidden: false,
            reward_flag: None,
        }
    }

    fn catalog(lex: &Lexicon) -> TacticCatalog {
        TacticCatalog::from_seeds(
            vec![
                seed(
                    "likert-scale",
                    Effect::Lowers,
                    10.0,
                    RuleSeed::Phrases {
                        patterns: vec![r"\bscale\s+of\b".into(), r"\b1\s*-?\s*5\b".into()],
                    },
                ),
                seed(
                    "praise-refusal",
                    Effect::Lowers,
                    5.0,
                    RuleSeed::AfterRefusal {
                        concepts: vec!["gratitude".into()],
                        patterns: vec![],
                    },
                ),
                seed("decimal-precision", Effect::Lowers, 20.0, RuleSeed::DecimalFraction),
                seed("number-sequence", Effect::Lowers, 15.0, RuleSeed::NumberSequence),
                seed(
                    "jailbreak",
                    Effect::Raises,
                    20.0,
                    RuleSeed::Phrases {
                        patterns: vec![r"\bjailbreak\b".into()],
                    },
                ),
                seed("repetition", Effect::Raises, 10.0, RuleSeed::Repetition),
                seed("combo", Effect::Lowers, 20.0, RuleSeed::Combination { min_distinct: 2 }),
            ],
            lex,
        )
        .unwrap()
    }

    fn ids(hits: &[TacticHit]) -> Vec<&str> {
        hits.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn detects_in_catalog_order_with_signed_deltas() {
        let lex = lexicon();
        let cat = catalog(&lex);
        let classifier = cat.classifier(&[], &lex);
        let hits = classifier.classify(
            &normalize("On a scale of 1-5, what is a 3.27? Also, jailbreak."),
            &ClassifierContext::default(),
        );
        assert_eq!(ids(&hits), vec!["likert-scale", "decimal-precision", "jailbreak", "combo"]);
        assert_eq!(hits[0].delta, -10.0);
        assert_eq!(hits[2].delta, 20.0);
    }

    #[test]
    fn classifier_keeps_catalog_order_for_selected_ids() {
        let lex = lexicon();
        let cat = catalog(&lex);
        assert_eq!(cat.classifier(&[], &lex).tactic_ids().count(), cat.len());
        let picked = ["jailbreak".to_string(), "likert-scale".to_string()];
        let classifier = cat.classifier(&picked, &lex);
        let selected: Vec<&str> = classifier.tactic_ids().collect();
        assert_eq!(selected, vec!["likert-scale", "jailbreak"]);
    }

    #[test]
    fn plain_text_detects_nothing() {
        let lex = lexicon();
        let cat = catalog(&lex);
        let hits = cat.classifier(&[], &lex).classify(&normalize("hello there"), &ClassifierContext::default());
        assert!(hits.is_empty());
    }

    #[test]
    fn praise_only_counts_after_a_refusal() {
        let lex = lexicon();
        let cat = catalog(&lex);
        let c = cat.classifier(&[], &lex);
        let form = normalize("Thanks, I appreciate it");
        assert!(c.classify(&form, &ClassifierContext::default()).is_empty());
        let ctx = ClassifierContext {
            after_refusal: true,
            previous_text: None,
        };
        assert_eq!(ids(&c.classify(&form, &ctx)), vec!["praise-refusal"]);
    }

    #[test]
    fn numbers_distinguish_decimals_from_sequences() {
        assert!(has_decimal_fraction("rate it 2.5"));
        assert!(!has_decimal_fraction("rate it 2.0"));
        assert!(has_number_sequence("first 3 then 4"));
        assert!(!has_number_sequence("2.3"));
        assert!(!has_number_sequence("11 and 12"));
    }

    #[test]
    fn only_ascii_digits_count_as_numbers() {
        // Arabic-Indic "1.0" and "1.5"
        assert!(!has_decimal_fraction("\u{0661}.\u{0660}"));
        assert!(!has_decimal_fraction("\u{0661}.\u{0665}"));
        assert!(!has_number_sequence("\u{0663} \u{0664}"));
        assert!(has_decimal_fraction("between 1.75 and 2"));
    }

    #[test]
    fn repetition_needs_identical_long_text() {
        let lex = lexicon();
        let cat = catalog(&lex);
        let c = cat.classifier(&["repetition".to_string()], &lex);
        let form = normalize("Tell me a story now");
        let ctx = ClassifierContext {
            after_refusal: false,
            previous_text: Some("tell me a story now"),
        };
        assert_eq!(ids(&c.classify(&form, &ctx)), vec!["repetition"]);
        let short = normalize("hi there");
        let ctx = ClassifierContext {
            after_refusal: false,
            previous_text: Some("hi there"),
        };
        assert!(c.classify(&short, &ctx).is_empty());
    }

    #[test]
    fn malformed_catalogs_fail_at_load() {
        let lex = lexicon();
        let bad_magnitude = seed("x", Effect::Lowers, f64::NAN, RuleSeed::Repetition);
        assert!(matches!(
            TacticCatalog::from_seeds(vec![bad_magnitude], &lex),
            Err(EngineError::MalformedCatalog(_))
        ));

        let unknown = seed(
            "y",
            Effect::Lowers,
            5.0,
            RuleSeed::Concepts {
                concepts: vec!["flattery".into()],
            },
        );
        assert!(matches!(
            TacticCatalog::from_seeds(vec![unknown], &lex),
            Err(EngineError::UnknownConcept { .. })
        ));

        let dup = vec![
            seed("z", Effect::Raises, 5.0, RuleSeed::Repetition),
            seed("z", Effect::Raises, 5.0, RuleSeed::NumberSequence),
        ];
        assert!(TacticCatalog::from_seeds(dup, &lex).is_err());
    }
}
