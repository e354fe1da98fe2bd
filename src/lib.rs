//! Turns the parse tree of a systematic chemical name into a molecule.
//!
//! The tree goes through three passes, each taking the tree by value and
//! handing it on: [`normalize`] tidies it, [`resolve`] builds a fragment for
//! every group and works out what each locant points at, and [`build`] bonds
//! the fragments into one structure and finishes it.
//!
//! ```no_run
//! use chemname::*;
//!
//! let tree = ParseTree::parse(r#"{molecule {wordRule wordRule=simple {word type=full {root
//!     {group type=chain subType=alkaneStem value=CC labels=numeric "eth"} {unsaturator value=0 "an"}
//!     {suffix type=root value=ol "ol"}}}}}"#)?;
//! let molecule = name_to_structure(tree, &Config::new())?;
//! assert_eq!(molecule.to_smiles(), "CCO");
//! # Ok::<(), ChemError>(())
//! ```

use tracing::*;

pub mod build;
pub mod config;
pub mod error;
pub mod fragment;
pub mod normalize;
pub mod resolve;
pub mod suffix;
pub mod tree;

pub use build::BuildState;
pub use config::Config;
pub use error::{ChemError, Result};
pub use fragment::{ChemEl, Molecule};
pub use tree::ParseTree;

/// Logs to stderr at `level` (`trace`, `debug`, `info`, `warn`, `error`).
/// Unknown levels fall back to `warn`. Calling it twice is harmless.
pub fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::WARN);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// The whole pipeline, returning the molecule and whether an unlocanted
/// choice between inequivalent atoms had to be made.
pub fn name_to_structure_detailed(tree: ParseTree, config: &Config) -> Result<(Molecule, bool)> {
    let tree = normalize::normalize(tree, config)?;
    let mut state = BuildState::new(config);
    let tree = resolve::resolve(&mut state, tree)?;
    let molecule = build::build(&mut state, tree)?;
    if state.ambiguous {
        info!("{} was built from an ambiguous name", molecule.formula());
    }
    Ok((molecule, state.ambiguous))
}

/// Builds the molecule a parse tree describes.
pub fn name_to_structure(tree: ParseTree, config: &Config) -> Result<Molecule> {
    name_to_structure_detailed(tree, config).map(|(molecule, _)| molecule)
}

/// Reads a tree from its text form and builds it, giving SMILES.
pub fn tree_to_smiles(text: &str, config: &Config) -> Result<String> {
    let tree = ParseTree::parse(text)?;
    Ok(name_to_structure(tree, config)?.to_smiles())
}
