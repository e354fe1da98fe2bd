use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use chemname::{init_logging, name_to_structure_detailed, Config, ParseTree};

/// Builds structures from the parse trees of chemical names and prints them
/// as SMILES, one per tree. Trees in a file are separated by blank lines.
#[derive(Parser)]
#[command(author, version, about = "Parse tree to structure")]
struct Cli {
    /// Tree files to read (stdin if none are given)
    files: Vec<PathBuf>,

    /// Accept names of radicals and substituents on their own
    #[arg(long)]
    allow_radicals: bool,

    /// Accept "acetic" for "acetic acid"
    #[arg(long)]
    allow_acids_without_acid: bool,

    /// Write unused attachment points as * atoms (implies --allow-radicals)
    #[arg(long)]
    wildcard_radicals: bool,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn trees(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n").map(str::trim).filter(|t| !t.is_empty())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = Config::new()
        .allow_radicals(cli.allow_radicals)
        .allow_acids_without_acid(cli.allow_acids_without_acid)
        .output_radicals_as_wildcard_atoms(cli.wildcard_radicals);

    let mut inputs = Vec::new();
    if cli.files.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read trees from stdin")?;
        inputs.push(("<stdin>".to_string(), text));
    } else {
        for path in &cli.files {
            let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            inputs.push((path.display().to_string(), text));
        }
    }

    let mut failures = 0;
    for (source, text) in &inputs {
        for (i, tree) in trees(text).enumerate() {
            let result = ParseTree::parse(tree)
                .and_then(|tree| name_to_structure_detailed(tree, &config))
                .with_context(|| format!("tree {} of {}", i + 1, source));
            match result {
                Ok((molecule, ambiguous)) => {
                    if ambiguous {
                        println!("{}\t(ambiguous)", molecule.to_smiles());
                    } else {
                        println!("{}", molecule.to_smiles());
                    }
                }
                Err(err) => {
                    eprintln!("{err:#}");
                    failures += 1;
                }
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} tree(s) could not be built");
    }
    Ok(())
}
