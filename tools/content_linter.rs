// Content Linter: checks persona and fallback content for gaps.
//
// Usage: content_linter [<scenario_dir>]
//
// The directory must contain personas.ron and fallbacks.ron. Defaults to
// scenario_data/blind_date.

use blind_date_engine::core::fallback::FallbackLibrary;
use blind_date_engine::schema::persona::PersonaRegistry;
use rustc_hash::FxHashSet;
use std::path::Path;
use std::process;

const MIN_BASE_LINES: usize = 4;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        println!("Usage: content_linter [<scenario_dir>]");
        process::exit(0);
    }

    let dir = args.get(1).map(String::as_str).unwrap_or("scenario_data/blind_date");
    let dir = Path::new(dir);
    if !dir.is_dir() {
        eprintln!("ERROR: Path '{}' is not a directory", dir.display());
        process::exit(1);
    }

    let personas = match PersonaRegistry::load_from_ron(&dir.join("personas.ron")) {
        Ok(personas) => personas,
        Err(e) => {
            eprintln!("ERROR: Failed to load personas: {}", e);
            process::exit(1);
        }
    };
    let fallbacks = match FallbackLibrary::load_from_ron(&dir.join("fallbacks.ron")) {
        Ok(fallbacks) => fallbacks,
        Err(e) => {
            eprintln!("ERROR: Failed to load fallbacks: {}", e);
            process::exit(1);
        }
    };

    println!(
        "Loaded {} personas, {} fallback pools",
        personas.len(),
        fallbacks.persona_ids().count()
    );

    let (errors, warnings) = lint_content(&personas, &fallbacks);

    println!("\n=== Content Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_content(personas: &PersonaRegistry, fallbacks: &FallbackLibrary) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for persona in personas.iter() {
        let id = &persona.id;

        match fallbacks.pools(id) {
            None => errors.push(format!("Persona '{}' has no fallback pools", id)),
            Some(pools) if pools.base.is_empty() => {
                errors.push(format!("Persona '{}' has an empty base pool", id))
            }
            Some(pools) => {
                if pools.base.len() < MIN_BASE_LINES {
                    warnings.push(format!(
                        "Persona '{}' has only {} base lines (minimum {} recommended)",
                        id,
                        pools.base.len(),
                        MIN_BASE_LINES
                    ));
                }
                if pools.mood_shift.is_empty() {
                    warnings.push(format!(
                        "Persona '{}' has no mood-shift lines, base pool is reused",
                        id
                    ));
                }

                // Rules that can never fire for this persona's early pool.
                for rule in fallbacks.overrides() {
                    if FallbackLibrary::preferred_line(rule, &pools.base).is_none() {
                        warnings.push(format!(
                            "Keyword rule '{}' has no matching base line for persona '{}'",
                            rule.name, id
                        ));
                    }
                }
            }
        }

        if !fallbacks.has_greeting(id) {
            warnings.push(format!(
                "Persona '{}' has no greeting, the default greeting is used",
                id
            ));
        }

        if persona.fun_fact.is_none() {
            warnings.push(format!("Persona '{}' has no fun fact", id));
        }
        if persona.personality.trim().is_empty() {
            errors.push(format!("Persona '{}' has an empty personality", id));
        }
    }

    let known: FxHashSet<&str> = personas.ids().map(|id| id.as_str()).collect();
    for id in fallbacks.persona_ids() {
        if !known.contains(id.as_str()) {
            warnings.push(format!("Fallback pool for unknown persona '{}'", id));
        }
    }
    for id in fallbacks.greeting_ids() {
        if !known.contains(id.as_str()) {
            warnings.push(format!("Greeting for unknown persona '{}'", id));
        }
    }

    for rule in fallbacks.overrides() {
        if rule.triggers.is_empty() {
            errors.push(format!("Keyword rule '{}' has no triggers", rule.name));
        }
        if rule.prefers.is_empty() {
            errors.push(format!("Keyword rule '{}' has no preferred words", rule.name));
        }
    }

    (errors, warnings)
}
