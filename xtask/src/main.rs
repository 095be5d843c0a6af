use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(author, version, about = "Workspace maintenance tasks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run layering guardrails.
    CheckArchitecture,
}

/// `(directory, forbidden text)` pairs; core stays free of delivery concerns.
const LAYER_RULES: &[(&str, &str)] = &[
    ("src/core", "crate::adapters"),
    ("src/core", "crate::application"),
    ("src/core", "axum::"),
    ("src/core", "handlebars::"),
    ("src/core", "rig::"),
    ("src/application", "crate::adapters"),
    ("src/application", "axum::"),
    ("src/adapters/outbound", "inbound::"),
    ("src/demos", "crate::adapters"),
];

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::CheckArchitecture => check_architecture(Path::new(".")),
    }
}

fn check_architecture(root: &Path) -> Result<()> {
    let failures: Vec<String> = LAYER_RULES
        .iter()
        .filter_map(|(dir, needle)| ensure_no_pattern(&root.join(dir), needle).err())
        .map(|err| err.to_string())
        .collect();
    if failures.is_empty() {
        println!("architecture ok ({} rules)", LAYER_RULES.len());
        Ok(())
    } else {
        Err(anyhow!(failures.join("\n")))
    }
}

fn ensure_no_pattern(dir: &Path, needle: &str) -> Result<()> {
    let mut offenders = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                offenders.push(format!("{} (walk error: {e})", dir.display()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|ext| ext.to_str()) != Some("rs") {
            continue;
        }
        let content = fs::read_to_string(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        if content.lines().any(|line| references(line, needle)) {
            offenders.push(entry.path().display().to_string());
        }
    }

    if offenders.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "Forbidden reference to '{needle}' found in: {}",
            offenders.join(", ")
        ))
    }
}

/// Comment lines do not count as references.
fn references(line: &str, needle: &str) -> bool {
    let code = line.trim_start();
    !code.starts_with("//") && code.contains(needle)
}
