//! Functional terms: the separate words of functional class names
//! ("ethyl *alcohol*", "acetone *oxime*", "copper sulfate penta*hydrate*").

use std::collections::HashMap;

use lazy_static::lazy_static;

use super::*;

/// A term's structure. `attach` lists the 1 based atoms that take the
/// bonds to the rest of the name, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermStructure {
    pub smiles: &'static str,
    pub attach: &'static [usize],
}

const fn term(smiles: &'static str, attach: &'static [usize]) -> TermStructure {
    TermStructure { smiles, attach }
}

lazy_static! {
    static ref TERMS: HashMap<&'static str, TermStructure> = HashMap::from([
        // monovalent
        ("alcohol", term("O", &[1])),
        ("hydroxide", term("O", &[1])),
        ("fluoride", term("F", &[1])),
        ("chloride", term("Cl", &[1])),
        ("bromide", term("Br", &[1])),
        ("iodide", term("I", &[1])),
        ("cyanide", term("C#N", &[1])),
        ("isocyanide", term("[N+]#[C-]", &[1])),
        ("cyanate", term("OC#N", &[1])),
        ("isocyanate", term("N=C=O", &[1])),
        ("thiocyanate", term("SC#N", &[1])),
        ("isothiocyanate", term("N=C=S", &[1])),
        ("azide", term("N=[N+]=[N-]", &[1])),
        ("hydroperoxide", term("OO", &[1])),
        ("mercaptan", term("S", &[1])),
        ("hydrosulfide", term("S", &[1])),
        // divalent
        ("ether", term("O", &[1, 1])),
        ("ketone", term("C=O", &[1, 1])),
        ("thioketone", term("C=S", &[1, 1])),
        ("sulfide", term("S", &[1, 1])),
        ("sulfoxide", term("S=O", &[1, 1])),
        ("sulfone", term("O=S=O", &[2, 2])),
        ("selenide", term("[Se]", &[1, 1])),
        ("telluride", term("[Te]", &[1, 1])),
        ("peroxide", term("OO", &[1, 2])),
        ("disulfide", term("SS", &[1, 2])),
        // carbonyl derivatives, bonded by a double bond
        ("oxime", term("NO", &[1])),
        ("hydrazone", term("NN", &[1])),
        ("phenylhydrazone", term("NNc1ccccc1", &[1])),
        ("semicarbazone", term("NNC(=O)N", &[1])),
        ("thiosemicarbazone", term("NNC(=S)N", &[1])),
        ("imine", term("N", &[1])),
        // addition compounds
        ("hydrate", term("O", &[])),
        ("hydrochloride", term("Cl", &[])),
        ("hydrobromide", term("Br", &[])),
        ("hydroiodide", term("I", &[])),
        ("hydrofluoride", term("F", &[])),
    ]);
}

/// What a functional term word says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub name: String,
    /// SMILES given on the node, overriding the table.
    pub smiles: Option<String>,
    pub multiplier: u32,
    pub locants: Vec<String>,
}

impl Term {
    /// Reads the term of a `functionalTerm` word.
    pub fn read(tree: &ParseTree, word: NodeId) -> Result<Term> {
        let node = tree
            .descendants_of_kind(word, |k| k == NodeKind::FunctionalGroup)
            .first()
            .copied()
            .ok_or_else(|| ChemError::internal(format!("functional term {} has no functionalGroup", tree.subtree_text(word))))?;
        let multiplier = tree
            .descendants(word)
            .into_iter()
            .find_map(|d| match tree.kind(d) {
                NodeKind::Multiplier(v, _) => Some(v),
                _ => None,
            })
            .unwrap_or(1);
        let locants = tree
            .descendants_of_kind(word, |k| matches!(k, NodeKind::Locant(_)))
            .into_iter()
            .flat_map(|l| tree.locants(l))
            .collect();
        Ok(Term {
            name: tree.text(node).trim().to_lowercase(),
            smiles: tree.attr(node, "value").map(str::to_string),
            multiplier,
            locants,
        })
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn structure(&self) -> Result<TermStructure> {
        TERMS
            .get(self.name.as_str())
            .copied()
            .ok_or_else(|| ChemError::component_at("Unknown functional term", self.name.clone()))
    }

    /// Builds one copy of the term. Returns the fragment and the atoms that
    /// take its bonds.
    pub fn instantiate(&self, state: &mut BuildState) -> Result<(FragId, Vec<AtomId>)> {
        let (smiles, attach): (String, Vec<usize>) = match &self.smiles {
            Some(s) => (s.clone(), vec![1]),
            None => {
                let structure = self.structure()?;
                (structure.smiles.to_string(), structure.attach.to_vec())
            }
        };
        let frag = state.mgr.build_from_smiles(&smiles, &Labels::None)?;
        state.mgr.frag_mut(frag)?.token = self.name.clone();
        let atoms = attach
            .into_iter()
            .map(|id| crate::resolve::atom_at(&state.mgr, frag, id))
            .collect::<Result<Vec<_>>>()?;
        Ok((frag, atoms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_read_term() {
        let tree = ParseTree::parse(
            r#"{molecule {wordRule wordRule=additionCompound {word type=functionalTerm
                {multiplier value=5 "penta"} {functionalGroup "hydrate"}}}}"#,
        )
        .unwrap();
        let term = Term::read(&tree, tree.words()[0]).unwrap();
        assert!(term.is("hydrate"));
        assert_eq!(term.multiplier, 5);
    }

    #[test]
    fn test_divalent_terms_have_two_attachments() {
        for name in ["ether", "ketone", "sulfide", "sulfone", "peroxide"] {
            assert_eq!(TERMS[name].attach.len(), 2, "{name}");
        }
    }

    #[test]
    fn test_instantiate_sulfone() {
        let mut state = BuildState::new(&Config::new());
        let term = Term {
            name: "sulfone".to_string(),
            smiles: None,
            multiplier: 1,
            locants: vec![],
        };
        let (_, atoms) = term.instantiate(&mut state).unwrap();
        assert_eq!(atoms.len(), 2);
        assert_eq!(state.mgr[atoms[0]].el, ChemEl::S);
    }

    #[test]
    fn test_unknown_term() {
        let term = Term {
            name: "frobnicate".to_string(),
            smiles: None,
            multiplier: 1,
            locants: vec![],
        };
        assert!(term.structure().is_err());
    }
}
