use std::collections::HashMap;

use tracing::*;

use crate::config::Config;
use crate::error::{ChemError, Result};
use crate::fragment::{AtomId, FragId, FragmentManager};
use crate::tree::{NodeId, StereoType, WordRule};

/// A stereodescriptor waiting for the finished molecule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStereo {
    /// None when the descriptor was written without a locant.
    pub atom: Option<AtomId>,
    pub kind: StereoType,
    /// `R`, `S`, `E`, `Z`, `cis` or `trans`.
    pub value: String,
}

/// Everything built for one name. Created per name, threaded through every
/// resolver and builder function, dropped once the molecule is out.
#[derive(Debug)]
pub struct BuildState {
    pub mgr: FragmentManager,
    pub config: Config,
    /// The fragment each group node became.
    pub group_frags: HashMap<NodeId, FragId>,
    /// Fragments each suffix node added.
    pub suffix_frags: HashMap<NodeId, Vec<FragId>>,
    pub word_rule: Option<WordRule>,
    /// Set when an unlocanted choice was made between inequivalent atoms.
    pub ambiguous: bool,
    pub stereo: Vec<PendingStereo>,
    /// The name spelled out a ratio ("iron(3+) sulfate (2:3)"), so charges
    /// are not balanced automatically.
    pub explicit_stoichiometry: bool,
}

impl BuildState {
    pub fn new(config: &Config) -> Self {
        BuildState {
            mgr: FragmentManager::new(),
            config: *config,
            group_frags: HashMap::new(),
            suffix_frags: HashMap::new(),
            word_rule: None,
            ambiguous: false,
            stereo: Vec::new(),
            explicit_stoichiometry: false,
        }
    }

    pub fn frag_of(&self, group: NodeId) -> Result<FragId> {
        self.group_frags
            .get(&group)
            .copied()
            .ok_or_else(|| ChemError::internal(format!("group {group} has no fragment")))
    }

    pub fn flag_ambiguity(&mut self, reason: impl AsRef<str>) {
        warn!("ambiguous: {}", reason.as_ref());
        self.ambiguous = true;
    }
}
