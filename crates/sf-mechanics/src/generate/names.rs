//! Random character names.

use rand::Rng;
use rand::rngs::StdRng;

const SYLLABLES: [&str; 20] = [
    "a", "bel", "dor", "e", "fen", "gal", "is", "ka", "lin", "mar", "nor", "o", "ra", "sel", "tha",
    "ul", "ven", "wyn", "ya", "zor",
];

/// Two or three syllables, capitalized.
pub fn random_name(rng: &mut StdRng) -> String {
    let count = rng.random_range(2..=3);
    let name: String = (0..count)
        .map(|_| SYLLABLES[rng.random_range(0..SYLLABLES.len())])
        .collect();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn names_are_capitalized_and_seeded() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let name = random_name(&mut a);
            assert_eq!(name, random_name(&mut b));
            assert!(name.chars().next().is_some_and(char::is_uppercase));
            assert!(name.len() >= 2);
        }
    }
}
