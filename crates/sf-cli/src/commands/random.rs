use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use sf_core::Selection;
use sf_mechanics::Category;

pub fn run(
    catalog: Option<&Path>,
    category: Option<&str>,
    input: Option<&Path>,
    seed: u64,
    output: Option<&Path>,
) -> Result<(), String> {
    let rules = super::load_ruleset(catalog)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let selection = match category {
        Some(name) => {
            let category = name.parse::<Category>().map_err(|e| e.to_string())?;
            let mut selection = match input {
                Some(path) => super::load_selection(path)?,
                None => Selection::new(),
            };
            rules.randomize_one_attribute(&mut selection, category, &mut rng);
            selection
        }
        None => {
            if input.is_some() {
                return Err("--input needs --category; a full character starts empty".into());
            }
            rules.random_character(&mut rng)
        }
    };

    super::write_selection(&selection, output)
}
