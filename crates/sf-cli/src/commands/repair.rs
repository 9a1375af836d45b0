use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

pub fn run(
    catalog: Option<&Path>,
    file: &Path,
    seed: u64,
    output: Option<&Path>,
) -> Result<(), String> {
    let rules = super::load_ruleset(catalog)?;
    let mut selection = super::load_selection(file)?;
    let before = rules.evaluate(&selection).violations().len();

    let mut rng = StdRng::seed_from_u64(seed);
    rules.make_valid(&mut selection, &mut rng);

    let after = rules.evaluate(&selection).violations().len();
    tracing::info!(before, after, seed, "character repaired");
    if after > 0 {
        eprintln!("  {after} unmet prerequisite(s) remain after repair ({before} before)");
    }
    super::write_selection(&selection, output)
}
