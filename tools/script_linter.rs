/// Script Linter — validates the knot graph of RON dialogue scripts.
///
/// Usage: script_linter <script_or_dir> [--capacity <n>]

use dialogue_engine::core::script::Script;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

const DEFAULT_CAPACITY: usize = 3;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: script_linter <script_or_dir> [--capacity <n>]");
        process::exit(0);
    }

    let target = &args[1];
    let mut capacity = DEFAULT_CAPACITY;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--capacity" && i + 1 < args.len() {
            i += 1;
            capacity = match args[i].parse() {
                Ok(n) => n,
                Err(_) => {
                    eprintln!("ERROR: --capacity expects a number, got '{}'", args[i]);
                    process::exit(1);
                }
            };
        }
        i += 1;
    }

    let path = Path::new(target);
    let mut scripts = Vec::new();
    let mut load_failures = 0;

    if path.is_file() {
        match Script::load_from_ron(path) {
            Ok(script) => scripts.push((path.display().to_string(), script)),
            Err(e) => {
                eprintln!("ERROR: Failed to load script: {}", e);
                process::exit(1);
            }
        }
    } else if path.is_dir() {
        load_scripts_recursive(path, &mut scripts, &mut load_failures);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", target);
        process::exit(1);
    }

    println!("Loaded {} script(s)", scripts.len());

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for (name, script) in &scripts {
        let (e, w) = lint_script(script, capacity);
        errors.extend(e.into_iter().map(|m| format!("{}: {}", name, m)));
        warnings.extend(w.into_iter().map(|m| format!("{}: {}", name, m)));
    }

    println!("\n=== Script Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() && load_failures == 0 {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings, {} unreadable",
        errors.len(),
        warnings.len(),
        load_failures
    );

    if errors.is_empty() && load_failures == 0 {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_scripts_recursive(dir: &Path, scripts: &mut Vec<(String, Script)>, failures: &mut usize) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_scripts_recursive(&path, scripts, failures);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                match Script::load_from_ron(&path) {
                    Ok(script) => {
                        println!("  Loaded: {}", path.display());
                        scripts.push((path.display().to_string(), script));
                    }
                    Err(e) => {
                        eprintln!("  ERROR loading {}: {}", path.display(), e);
                        *failures += 1;
                    }
                }
            }
        }
    }
}

/// Knot names a knot can flow into, through its choices or `next`.
fn targets(script: &Script, name: &str) -> Vec<String> {
    let Some(knot) = script.knot(name) else {
        return Vec::new();
    };
    knot.choices
        .iter()
        .filter_map(|c| c.divert.clone())
        .chain(knot.next.clone())
        .collect()
}

fn lint_script(script: &Script, capacity: usize) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut names: Vec<&String> = script.knots.keys().collect();
    names.sort();

    for name in &names {
        let knot = &script.knots[*name];

        for target in targets(script, name) {
            if script.knot(&target).is_none() {
                errors.push(format!(
                    "Knot '{}' diverts to undefined knot '{}'",
                    name, target
                ));
            }
        }

        if knot.choices.len() > capacity {
            warnings.push(format!(
                "Knot '{}' offers {} choices but only {} fit; '{}' onwards will be dropped",
                name,
                knot.choices.len(),
                capacity,
                knot.choices[capacity].text
            ));
        }

        if knot.lines.is_empty() && knot.choices.is_empty() && knot.next.is_none() {
            warnings.push(format!("Knot '{}' is empty and ends the story silently", name));
        }

        for (i, line) in knot.lines.iter().enumerate() {
            if line.text.is_empty() {
                warnings.push(format!("Knot '{}' line {} has no text", name, i + 1));
            }
        }
    }

    // Reachability from the start knot
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue = VecDeque::from([script.start.clone()]);
    while let Some(name) = queue.pop_front() {
        if !seen.insert(name.clone()) {
            continue;
        }
        for target in targets(script, &name) {
            if script.knot(&target).is_some() && !seen.contains(&target) {
                queue.push_back(target);
            }
        }
    }
    for name in &names {
        if !seen.contains(name.as_str()) {
            warnings.push(format!("Knot '{}' is unreachable from '{}'", name, script.start));
        }
    }

    // Knots that only hand off through `next` must not loop back on themselves
    for name in &names {
        let mut current = (*name).clone();
        let mut chain = HashSet::new();
        loop {
            let Some(knot) = script.knot(&current) else {
                break;
            };
            if !knot.lines.is_empty() || !knot.choices.is_empty() {
                break;
            }
            if !chain.insert(current.clone()) {
                errors.push(format!(
                    "Knot '{}' enters a cycle of empty knots and never shows a line",
                    name
                ));
                break;
            }
            match &knot.next {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
    }

    (errors, warnings)
}
