//! The suffix rule table, read once from the embedded `rules.csv`.

use std::collections::BTreeMap;

use csv::{ReaderBuilder, StringRecord};
use lazy_static::lazy_static;
use tracing::*;

use crate::error::{ChemError, Result};
use crate::tree::{GroupType, NodeKind};

/// Which family of rules a group takes its suffixes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Applicability {
    Standard,
    AcidStem,
    NonCarboxylicAcid,
}

impl Applicability {
    pub fn of(kind: NodeKind) -> Applicability {
        match kind {
            NodeKind::Group(GroupType::AcidStem, _) => Applicability::AcidStem,
            NodeKind::Group(GroupType::NonCarboxylicAcid, _) => Applicability::NonCarboxylicAcid,
            _ => Applicability::Standard,
        }
    }

    fn parse(text: &str) -> Option<Applicability> {
        match text {
            "standard" => Some(Applicability::Standard),
            "acidStem" => Some(Applicability::AcidStem),
            "nonCarboxylicAcid" => Some(Applicability::NonCarboxylicAcid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuffixRule {
    /// Bonds a small fragment to the group through its `R` dummies. Ids
    /// count the fragment's real atoms from 1.
    AddGroup {
        smiles: String,
        labels: String,
        functional_ids: Vec<usize>,
        out_ids: Vec<usize>,
        /// Targets the first atom of the chain rather than the written locant.
        at_first: bool,
        /// Targets the last of several written locants.
        at_last: bool,
    },
    ChangeCharge {
        charge: i32,
        protons: i32,
    },
    SetOutAtom {
        valency: u32,
    },
    AddFunctionalAtomsToHydroxyGroups,
    ChargeHydroxyGroups,
    RemoveTerminalOxygen {
        order: u8,
    },
    ConvertHydroxyGroupsToOutAtoms,
    ConvertHydroxyGroupsToPositiveCharge,
}

/// The ordered rules of one suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuffixRules {
    pub rules: Vec<SuffixRule>,
    /// Defaults to the ends of a chain when unlocanted.
    pub terminal: bool,
}

type RuleKey = (Applicability, String, String);
type RuleTable = BTreeMap<RuleKey, SuffixRules>;

fn field<'a>(record: &'a StringRecord, index: usize) -> &'a str {
    record.get(index).unwrap_or("").trim()
}

fn ids(text: &str) -> std::result::Result<Vec<usize>, String> {
    text.split_whitespace()
        .map(|id| id.parse().map_err(|_| format!("bad atom id '{id}'")))
        .collect()
}

fn number<T: std::str::FromStr>(text: &str, default: T) -> std::result::Result<T, String> {
    if text.is_empty() {
        return Ok(default);
    }
    text.parse().map_err(|_| format!("bad number '{text}'"))
}

fn read_rule(record: &StringRecord) -> std::result::Result<SuffixRule, String> {
    let rule = match field(record, 3) {
        "addGroup" => SuffixRule::AddGroup {
            smiles: field(record, 4).to_string(),
            labels: field(record, 5).to_string(),
            functional_ids: ids(field(record, 6))?,
            out_ids: ids(field(record, 7))?,
            at_first: field(record, 12) == "first",
            at_last: field(record, 12) == "last",
        },
        "changeCharge" => SuffixRule::ChangeCharge {
            charge: number(field(record, 8), 0)?,
            protons: number(field(record, 9), 0)?,
        },
        "setOutAtom" => SuffixRule::SetOutAtom {
            valency: number(field(record, 10), 1)?,
        },
        "addFunctionalAtomsToHydroxyGroups" => SuffixRule::AddFunctionalAtomsToHydroxyGroups,
        "chargeHydroxyGroups" => SuffixRule::ChargeHydroxyGroups,
        "removeTerminalOxygen" => SuffixRule::RemoveTerminalOxygen {
            order: number(field(record, 11), 2)?,
        },
        "convertHydroxyGroupsToOutAtoms" => SuffixRule::ConvertHydroxyGroupsToOutAtoms,
        "convertHydroxyGroupsToPositiveCharge" => SuffixRule::ConvertHydroxyGroupsToPositiveCharge,
        other => return Err(format!("unknown suffix rule '{other}'")),
    };
    Ok(rule)
}

fn read_rule_table(csv_data: &str) -> std::result::Result<RuleTable, String> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());
    let mut table = RuleTable::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| format!("suffix table line {}: {e}", line + 2))?;
        let applicability = Applicability::parse(field(&record, 0))
            .ok_or_else(|| format!("suffix table line {}: bad applicability", line + 2))?;
        let key = (applicability, field(&record, 1).to_string(), field(&record, 2).to_string());
        let rule = read_rule(&record).map_err(|e| format!("suffix table line {}: {e}", line + 2))?;
        let entry = table.entry(key).or_default();
        entry.terminal |= field(&record, 12) == "terminal";
        entry.rules.push(rule);
    }
    debug!("loaded {} suffix rule sets", table.len());
    Ok(table)
}

lazy_static! {
    static ref SUFFIX_RULES: std::result::Result<RuleTable, String> = read_rule_table(include_str!("rules.csv"));
}

fn table() -> Result<&'static RuleTable> {
    SUFFIX_RULES.as_ref().map_err(|e| ChemError::internal(e.clone()))
}

/// Rules for a suffix value on a group. A subgroup specific entry wins over
/// the generic one; acid stems fall back to the standard rules.
pub fn rules_for(applicability: Applicability, suffix: &str, subgroup: Option<&str>) -> Result<&'static SuffixRules> {
    let table = table()?;
    let lookup = |a: Applicability, sub: &str| table.get(&(a, suffix.to_string(), sub.to_string()));
    if let Some(rules) = subgroup.and_then(|s| lookup(applicability, s)) {
        return Ok(rules);
    }
    if let Some(rules) = lookup(applicability, "") {
        return Ok(rules);
    }
    if applicability != Applicability::Standard {
        if let Some(rules) = lookup(Applicability::Standard, "") {
            trace!("{suffix} on {:?} uses the standard rules", applicability);
            return Ok(rules);
        }
    }
    Err(ChemError::component(format!("Suffix {suffix} cannot be applied to this group")))
}

pub fn is_terminal(applicability: Applicability, suffix: &str) -> bool {
    rules_for(applicability, suffix, None).map(|r| r.terminal).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_table_loads() {
        let rules = rules_for(Applicability::Standard, "oic acid", None).unwrap();
        assert!(rules.terminal);
        assert_eq!(rules.rules.len(), 2);
        assert!(matches!(&rules.rules[1], SuffixRule::AddGroup { functional_ids, .. } if functional_ids == &vec![1]));
    }

    #[test]
    fn test_acid_stems_fall_back_to_standard() {
        let rules = rules_for(Applicability::AcidStem, "ium", None).unwrap();
        assert_eq!(rules.rules, vec![SuffixRule::ChangeCharge { charge: 1, protons: 1 }]);
        let ic = rules_for(Applicability::AcidStem, "ic", None).unwrap();
        assert_eq!(ic.rules.len(), 2);
    }

    #[test]
    fn test_imide_closes_a_ring_between_both_ends() {
        let rules = rules_for(Applicability::AcidStem, "imide", None).unwrap();
        assert_eq!(rules.rules.len(), 3);
        assert!(matches!(&rules.rules[0], SuffixRule::AddGroup { at_first: true, .. }));
        assert!(matches!(&rules.rules[1], SuffixRule::AddGroup { at_last: true, .. }));
        assert!(matches!(&rules.rules[2], SuffixRule::AddGroup { smiles, .. } if smiles == "RNR"));
    }

    #[test]
    fn test_chalcogen_acid_suffixes() {
        for value in ["thioic", "thioate", "dithioic", "dithioate", "selenoic", "selenoate", "telluroic", "telluroate"] {
            let rules = rules_for(Applicability::AcidStem, value, None).unwrap();
            assert_eq!(rules.rules.len(), 2, "{value}");
        }
        assert!(rules_for(Applicability::Standard, "thioic", None).is_err());
    }

    #[test]
    fn test_unknown_suffix() {
        assert!(rules_for(Applicability::Standard, "banana", None).is_err());
        assert!(!is_terminal(Applicability::Standard, "ol"));
        assert!(is_terminal(Applicability::Standard, "al"));
    }

    #[test]
    fn test_malformed_rows_are_reported() {
        let csv = "applicability,suffix,subgroup,rule,smiles,labels,functional_ids,out_ids,charge,protons,valency,order,position\nstandard,ol,,explode,,,,,,,,,\n";
        let err = read_rule_table(csv).unwrap_err();
        assert!(err.contains("line 2"));
    }
}
