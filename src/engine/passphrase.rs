//! Seeded passphrase generation for encounters with a pacifist path.
//!
//! A passphrase is `PREFIX_SUFFIX` drawn from two fixed pools. The same session
//! seed and encounter id always produce the same phrase.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PREFIXES: &[&str] = &["SCALAR", "VECTOR", "MATRIX", "TENSOR", "BINARY", "QUANTUM"];
const SUFFIXES: &[&str] = &["OVERFLOW", "UNDERFLOW", "CASCADE", "COLLAPSE", "BREACH", "BYPASS"];

fn choose<'a>(rng: &mut StdRng, opts: &[&'a str]) -> &'a str {
    let i = rng.gen_range(0..opts.len());
    opts[i]
}

/// Stable per-encounter seed (FNV-1a over the id, mixed with the session seed).
fn encounter_seed(seed: u64, encounter: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in encounter.bytes() {
        h ^= u64::from(b);
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    h ^ seed
}

pub fn generate(seed: u64, encounter: &str) -> String {
    let mut rng = StdRng::seed_from_u64(encounter_seed(seed, encounter));
    format!("{}_{}", choose(&mut rng, PREFIXES), choose(&mut rng, SUFFIXES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_phrase() {
        assert_eq!(generate(42, "magistrate"), generate(42, "magistrate"));
    }

    #[test]
    fn phrase_comes_from_pools() {
        for seed in 0..20 {
            let p = generate(seed, "magistrate");
            let (prefix, suffix) = p.split_once('_').unwrap();
            assert!(PREFIXES.contains(&prefix), "{p}");
            assert!(SUFFIXES.contains(&suffix), "{p}");
        }
    }

    #[test]
    fn seeds_vary_the_phrase() {
        let distinct: std::collections::BTreeSet<String> =
            (0..50).map(|s| generate(s, "magistrate")).collect();
        assert!(distinct.len() > 1);
    }
}
