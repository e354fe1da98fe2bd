use std::collections::BTreeMap;
use thiserror::Error;

use super::element::ChemEl;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmilesError {
    #[error("Branch start '(' at position {0} (followed by {1}) without a current atom")]
    BranchNoCurrentAtom(usize, String),
    #[error("Branch end ')' at position {0} (followed by {1}) without a matching '('")]
    BranchEndNoStart(usize, String),
    #[error("Ring closure digit '{0}' at position {1} without a current atom")]
    RingClosureNoCurrentAtom(char, usize),
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Unknown element '{0}' at position {1}")]
    UnknownElement(String, usize),
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
    #[error("Ring closure {0} was never closed in '{1}'")]
    UnclosedRing(u32, String),
    #[error("Incomplete ring closure after '%' at position {0}")]
    IncompleteRingClosure(usize),
    #[error("Empty SMILES string")]
    Empty,
}

/// One atom as written in a fragment SMILES.
#[derive(Debug, Clone, PartialEq)]
pub struct SmilesAtom {
    pub el: ChemEl,
    pub aromatic: bool,
    pub charge: i32,
    /// Hydrogen count given inside brackets. `None` for organic-subset atoms.
    pub explicit_h: Option<u32>,
    /// Number of primes written after an `R` dummy (R, R', R'').
    pub primes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashMark {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmilesBond {
    pub from: usize,
    pub to: usize,
    pub order: u8,
    /// `/` or `\` written on this bond, relative to `from` → `to`.
    pub slash: Option<SlashMark>,
}

/// The atoms and bonds of a fragment SMILES, in writing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSmiles {
    pub atoms: Vec<SmilesAtom>,
    pub bonds: Vec<SmilesBond>,
    /// Atom index and chirality mark (`true` for `@@`) for atoms written with `@`.
    pub chirality: Vec<(usize, bool)>,
}

impl ParsedSmiles {
    pub fn neighbours(&self, atom: usize) -> Vec<usize> {
        self.bonds
            .iter()
            .filter_map(|b| {
                if b.from == atom {
                    Some(b.to)
                } else if b.to == atom {
                    Some(b.from)
                } else {
                    None
                }
            })
            .collect()
    }
}

fn organic_symbol(chars: &[char], i: usize) -> Option<(ChemEl, bool, usize)> {
    let c = chars[i];
    let next = chars.get(i + 1).copied();
    match (c, next) {
        ('C', Some('l')) => Some((ChemEl::Cl, false, 2)),
        ('B', Some('r')) => Some((ChemEl::Br, false, 2)),
        ('B', _) => Some((ChemEl::B, false, 1)),
        ('C', _) => Some((ChemEl::C, false, 1)),
        ('N', _) => Some((ChemEl::N, false, 1)),
        ('O', _) => Some((ChemEl::O, false, 1)),
        ('P', _) => Some((ChemEl::P, false, 1)),
        ('S', _) => Some((ChemEl::S, false, 1)),
        ('F', _) => Some((ChemEl::F, false, 1)),
        ('I', _) => Some((ChemEl::I, false, 1)),
        ('b', _) => Some((ChemEl::B, true, 1)),
        ('c', _) => Some((ChemEl::C, true, 1)),
        ('n', _) => Some((ChemEl::N, true, 1)),
        ('o', _) => Some((ChemEl::O, true, 1)),
        ('p', _) => Some((ChemEl::P, true, 1)),
        ('s', _) => Some((ChemEl::S, true, 1)),
        _ => None,
    }
}

/// Parses the inside of a bracket atom such as `NH4+`, `Fe+3`, `se`, `O-`.
fn parse_bracket_atom(content: &str, position: usize) -> Result<(SmilesAtom, Option<bool>), SmilesError> {
    let chars: Vec<char> = content.chars().collect();
    let mut i = 0;
    // isotope, ignored
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    let mut symbol = String::new();
    let mut aromatic = false;
    if i < chars.len() && chars[i].is_ascii_lowercase() {
        aromatic = true;
        symbol.push(chars[i].to_ascii_uppercase());
        i += 1;
        // aromatic two-letter symbols: se, as, te
        if i < chars.len() && chars[i].is_ascii_lowercase() && chars[i] != 'h' {
            symbol.push(chars[i]);
            i += 1;
        }
    } else if i < chars.len() && chars[i].is_ascii_uppercase() {
        symbol.push(chars[i]);
        i += 1;
        if i < chars.len() && chars[i].is_ascii_lowercase() {
            let candidate = format!("{}{}", symbol, chars[i]);
            if ChemEl::from_symbol(&candidate).is_some() {
                symbol = candidate;
                i += 1;
            }
        }
    }
    let el = ChemEl::from_symbol(&symbol)
        .ok_or_else(|| SmilesError::UnknownElement(content.to_string(), position))?;

    let mut chirality = None;
    if i < chars.len() && chars[i] == '@' {
        i += 1;
        if i < chars.len() && chars[i] == '@' {
            i += 1;
            chirality = Some(true);
        } else {
            chirality = Some(false);
        }
    }

    let mut explicit_h = Some(0);
    if i < chars.len() && chars[i] == 'H' {
        i += 1;
        let mut digits = String::new();
        while i < chars.len() && chars[i].is_ascii_digit() {
            digits.push(chars[i]);
            i += 1;
        }
        explicit_h = Some(digits.parse().unwrap_or(1));
    }

    let mut charge = 0;
    while i < chars.len() {
        let sign = match chars[i] {
            '+' => 1,
            '-' => -1,
            other => return Err(SmilesError::UnexpectedCharacter(other, position + i)),
        };
        i += 1;
        let mut digits = String::new();
        while i < chars.len() && chars[i].is_ascii_digit() {
            digits.push(chars[i]);
            i += 1;
        }
        charge += sign * digits.parse::<i32>().unwrap_or(1);
    }

    Ok((
        SmilesAtom {
            el,
            aromatic,
            charge,
            explicit_h,
            primes: 0,
        },
        chirality,
    ))
}

/// Parses a fragment SMILES string.
///
/// Supports the organic subset, bracket atoms with hydrogen counts and
/// charges, aromatic lowercase atoms, branches, ring closures (including
/// `%NN`), `.` disconnection, `/` `\` bond marks and `R` dummy atoms
/// written as `R`, `R'`, `R''`.
pub fn parse_smiles(smiles: &str) -> Result<ParsedSmiles, SmilesError> {
    if smiles.is_empty() {
        return Err(SmilesError::Empty);
    }
    let mut parsed = ParsedSmiles::default();
    let mut current_atom: Option<usize> = None;
    let mut bond_order: Option<u8> = None;
    let mut slash: Option<SlashMark> = None;
    let mut branch_stack: Vec<Option<usize>> = Vec::new();
    // ring number -> (atom, bond order written at the opening)
    let mut ring_map: BTreeMap<u32, (usize, Option<u8>)> = BTreeMap::new();

    let chars: Vec<char> = smiles.chars().collect();
    let mut i = 0;

    let add_atom = |parsed: &mut ParsedSmiles,
                        atom: SmilesAtom,
                        current_atom: &mut Option<usize>,
                        bond_order: &mut Option<u8>,
                        slash: &mut Option<SlashMark>| {
        let index = parsed.atoms.len();
        parsed.atoms.push(atom);
        if let Some(prev) = *current_atom {
            // aromatic-aromatic bonds stay single; the atoms carry spare valency
            let order = bond_order.take().unwrap_or(1);
            parsed.bonds.push(SmilesBond {
                from: prev,
                to: index,
                order,
                slash: slash.take(),
            });
        }
        *current_atom = Some(index);
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => {
                // Start of a branch: remember where to come back to
                if current_atom.is_none() {
                    return Err(SmilesError::BranchNoCurrentAtom(i, smiles[i..].to_string()));
                }
                branch_stack.push(current_atom);
                i += 1;
            }
            ')' => {
                current_atom = branch_stack
                    .pop()
                    .ok_or_else(|| SmilesError::BranchEndNoStart(i, smiles[i..].to_string()))?;
                i += 1;
            }
            '-' | '=' | '#' | ':' => {
                bond_order = Some(match c {
                    '=' => 2,
                    '#' => 3,
                    _ => 1,
                });
                i += 1;
            }
            '/' | '\\' => {
                slash = Some(if c == '/' { SlashMark::Up } else { SlashMark::Down });
                i += 1;
            }
            '.' => {
                current_atom = None;
                i += 1;
            }
            '%' | '0'..='9' => {
                let (ring_number, width) = if c == '%' {
                    if i + 2 >= chars.len() {
                        return Err(SmilesError::IncompleteRingClosure(i));
                    }
                    let digits: String = chars[i + 1..i + 3].iter().collect();
                    let n = digits
                        .parse::<u32>()
                        .map_err(|_| SmilesError::IncompleteRingClosure(i))?;
                    (n, 3)
                } else {
                    (c.to_digit(10).unwrap_or_default(), 1)
                };
                let atom = current_atom.ok_or(SmilesError::RingClosureNoCurrentAtom(c, i))?;
                if let Some((start_atom, opening_order)) = ring_map.remove(&ring_number) {
                    let order = bond_order.take().or(opening_order).unwrap_or(1);
                    parsed.bonds.push(SmilesBond {
                        from: start_atom,
                        to: atom,
                        order,
                        slash: slash.take(),
                    });
                } else {
                    ring_map.insert(ring_number, (atom, bond_order.take()));
                }
                i += width;
            }
            '[' => {
                let end = chars[i..]
                    .iter()
                    .position(|&x| x == ']')
                    .map(|rel| i + rel)
                    .ok_or(SmilesError::UnclosedBracket(i))?;
                let content: String = chars[i + 1..end].iter().collect();
                let (atom, chirality) = parse_bracket_atom(&content, i + 1)?;
                add_atom(&mut parsed, atom, &mut current_atom, &mut bond_order, &mut slash);
                if let (Some(mark), Some(index)) = (chirality, current_atom) {
                    parsed.chirality.push((index, mark));
                }
                i = end + 1;
            }
            'R' => {
                let mut primes = 0;
                i += 1;
                while i < chars.len() && chars[i] == '\'' {
                    primes += 1;
                    i += 1;
                }
                let atom = SmilesAtom {
                    el: ChemEl::R,
                    aromatic: false,
                    charge: 0,
                    explicit_h: Some(0),
                    primes,
                };
                add_atom(&mut parsed, atom, &mut current_atom, &mut bond_order, &mut slash);
            }
            _ => {
                let (el, aromatic, width) =
                    organic_symbol(&chars, i).ok_or(SmilesError::UnexpectedCharacter(c, i))?;
                let atom = SmilesAtom {
                    el,
                    aromatic,
                    charge: 0,
                    explicit_h: None,
                    primes: 0,
                };
                add_atom(&mut parsed, atom, &mut current_atom, &mut bond_order, &mut slash);
                i += width;
            }
        }
    }

    if let Some((&ring, _)) = ring_map.iter().next() {
        return Err(SmilesError::UnclosedRing(ring, smiles.to_string()));
    }
    if !branch_stack.is_empty() {
        return Err(SmilesError::BranchNoCurrentAtom(smiles.len(), String::new()));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ethanol() {
        let parsed = parse_smiles("CCO").unwrap();
        assert_eq!(parsed.atoms.len(), 3);
        assert_eq!(parsed.bonds.len(), 2);
        assert_eq!(parsed.atoms[2].el, ChemEl::O);
    }

    #[test]
    fn test_parse_benzene_ring_closure() {
        let parsed = parse_smiles("c1ccccc1").unwrap();
        assert_eq!(parsed.atoms.len(), 6);
        assert_eq!(parsed.bonds.len(), 6);
        assert!(parsed.atoms.iter().all(|a| a.aromatic));
        assert!(parsed.bonds.iter().all(|b| b.order == 1));
    }

    #[test]
    fn test_parse_two_digit_ring_closure() {
        let parsed = parse_smiles("C%10CCCCCCCCCCC%10").unwrap();
        assert_eq!(parsed.atoms.len(), 12);
        assert_eq!(parsed.bonds.len(), 12);
        assert!(parsed.bonds.iter().any(|b| b.from == 0 && b.to == 11));
    }

    #[test]
    fn test_parse_bracket_atoms() {
        let parsed = parse_smiles("[NH4+].[Fe+3].[O-]").unwrap();
        assert_eq!(parsed.atoms.len(), 3);
        assert!(parsed.bonds.is_empty());
        assert_eq!(parsed.atoms[0].explicit_h, Some(4));
        assert_eq!(parsed.atoms[0].charge, 1);
        assert_eq!(parsed.atoms[1].el, ChemEl::Fe);
        assert_eq!(parsed.atoms[1].charge, 3);
        assert_eq!(parsed.atoms[2].charge, -1);
    }

    #[test]
    fn test_parse_r_groups() {
        let parsed = parse_smiles("RC(=O)OR'").unwrap();
        assert_eq!(parsed.atoms[0].el, ChemEl::R);
        assert_eq!(parsed.atoms[4].el, ChemEl::R);
        assert_eq!(parsed.atoms[4].primes, 1);
        assert_eq!(parsed.bonds[1].order, 2);
    }

    #[test]
    fn test_ring_bond_order_at_opening() {
        let parsed = parse_smiles("C=1CCC1").unwrap();
        assert_eq!(parsed.bonds.len(), 4);
        assert!(parsed.bonds.iter().any(|b| b.from == 0 && b.to == 3 && b.order == 2));
    }

    #[test]
    fn test_dot_then_ring_closure_bonds() {
        let parsed = parse_smiles("C1.C1").unwrap();
        assert_eq!(parsed.atoms.len(), 2);
        assert_eq!(parsed.bonds.len(), 1);
    }

    #[test]
    fn test_unclosed_bracket() {
        assert_eq!(parse_smiles("C[Fe"), Err(SmilesError::UnclosedBracket(1)));
        assert!(matches!(parse_smiles("C1CC"), Err(SmilesError::UnclosedRing(1, _))));
        assert!(matches!(parse_smiles("C)"), Err(SmilesError::BranchEndNoStart(1, _))));
    }
}
