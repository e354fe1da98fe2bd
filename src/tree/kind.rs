//! The closed vocabulary of parse tree nodes.
//!
//! Each node kind is written in the text format by its tag, e.g.
//! `{group type=chain subType=alkaneStem value=CC "eth"}`. Kinds that carry a
//! typed payload read it from a fixed attribute (`type`, `value` ...); every
//! other attribute stays in the node's `Attrs`.
//!
//! Attribute keys used across the passes:
//!
//! | key | on | meaning |
//! |-----|----|---------|
//! | `value` | group, suffix, functionalGroup | SMILES, or the suffix value |
//! | `labels` | group | `numeric`, `none`, or a slash separated locant list |
//! | `locant` | most | resolved locant list, comma separated |
//! | `multiplier` | substituent, bracket, root | resolved multiplier value |
//! | `outIDs` | group | atom ids (1 based) that carry out atoms |
//! | `functionalIDs` | group | atom ids of functional atoms |
//! | `defaultInID` | group | atom id attached to when unlocanted |
//! | `suffixAppliesTo` | group | atom ids suffixes are multiplied onto |
//! | `suffixAppliesToByDefault` | group | the same, only when unlocanted |
//! | `usableAsJoiner` | group | may take part in implicit bracketing |

use std::fmt;
use std::str::FromStr;

use crate::error::{ChemError, Result};
use crate::fragment::ChemEl;

macro_rules! tag_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $tag:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),*
        }

        impl $name {
            pub fn tag(&self) -> &'static str {
                match self {
                    $($name::$variant => $tag),*
                }
            }
        }

        impl FromStr for $name {
            type Err = ChemError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($tag => Ok($name::$variant),)*
                    _ => Err(ChemError::TreeFormat(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        s
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.tag())
            }
        }
    };
}

tag_enum! {
    /// How the words of a name are combined.
    WordRule {
        Simple => "simple",
        Substituent => "substituent",
        Ester => "ester",
        MultiEster => "multiEster",
        DivalentFunctionalGroup => "divalentFunctionalGroup",
        MonovalentFunctionalGroup => "monovalentFunctionalGroup",
        FunctionalClassEster => "functionalClassEster",
        Oxide => "oxide",
        CarbonylDerivative => "carbonylDerivative",
        Anhydride => "anhydride",
        AcidHalideOrPseudoHalide => "acidHalideOrPseudoHalide",
        AdditionCompound => "additionCompound",
        Glycol => "glycol",
        GlycolEther => "glycolEther",
        Acetal => "acetal",
        PotentialAlcoholEster => "potentialAlcoholEster",
        CyclicPeptide => "cyclicPeptide",
        AmineDiConjunctiveSuffix => "amineDiConjunctiveSuffix",
        Polymer => "polymer",
    }
}

tag_enum! {
    WordType {
        Full => "full",
        Substituent => "substituent",
        FunctionalTerm => "functionalTerm",
    }
}

tag_enum! {
    GroupType {
        Chain => "chain",
        Ring => "ring",
        AcidStem => "acidStem",
        NonCarboxylicAcid => "nonCarboxylicAcid",
        Substituent => "substituent",
        ElementaryAtom => "elementaryAtom",
        Simple => "simple",
    }
}

tag_enum! {
    GroupSubType {
        AlkaneStem => "alkaneStem",
        HeteroStem => "heteroStem",
        Cycloalkane => "cycloalkane",
        Annulen => "annulen",
        HydrocarbonFusedRingSystem => "hydrocarbonFusedRingSystem",
        HantzschWidman => "hantzschWidman",
        VonBaeyer => "vonBaeyer",
        Spiro => "spiro",
        PolyCyclicSpiro => "polyCyclicSpiro",
        FusedRing => "fusedRing",
        RingAssembly => "ringAssembly",
        Arene => "arene",
        Heteroarene => "heteroarene",
        SimpleSubstituent => "simpleSubstituent",
        PhosphorusOxoacid => "phosphorusOxoacid",
        Biochemical => "biochemical",
        Carbohydrate => "carbohydrate",
        Ion => "ion",
        Metal => "metal",
    }
}

tag_enum! {
    SuffixType {
        Root => "root",
        Inline => "inline",
        Charge => "charge",
    }
}

tag_enum! {
    MultiplierType {
        Basic => "basic",
        Group => "group",
        VonBaeyer => "VonBaeyer",
    }
}

tag_enum! {
    StereoType {
        RorS => "RorS",
        EorZ => "EorZ",
        CisOrTrans => "cisOrTrans",
    }
}

tag_enum! {
    HydroType {
        Hydro => "hydro",
        Perhydro => "perhydro",
        Dehydro => "dehydro",
    }
}

tag_enum! {
    StemModifier {
        Iso => "iso",
        Sec => "sec",
        Tert => "tert",
        Neo => "neo",
    }
}

tag_enum! {
    SpiroType {
        Bracketed => "bracketed",
        OldMethod => "oldMethod",
        Bi => "bi",
        Ter => "ter",
    }
}

tag_enum! {
    /// What a locant was found to point at.
    LocantRole {
        Unresolved => "unresolved",
        Substitution => "substitution",
        Multiplicative => "multiplicative",
        HwHeteroatom => "hwHeteroatom",
        OutAtom => "outAtom",
        RingAssembly => "ringAssembly",
    }
}

tag_enum! {
    BracketType {
        Structural => "structural",
        Implicit => "implicit",
    }
}

/// A parse tree node kind and its typed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Molecule,
    WordRule(WordRule),
    Word(WordType),
    Substituent,
    Root,
    Bracket(BracketType),
    Group(GroupType, Option<GroupSubType>),
    Locant(LocantRole),
    OrthoMetaPara,
    Multiplier(u32, MultiplierType),
    Suffix(SuffixType),
    Heteroatom(ChemEl),
    Unsaturator(u8),
    Hydro(HydroType),
    IndicatedHydrogen,
    AddedHydrogen,
    StereoChemistry(StereoType),
    Hyphen,
    OpenBracket,
    CloseBracket,
    VonBaeyer,
    Spiro,
    PolyCyclicSpiro(SpiroType),
    SpiroComponent,
    RingAssembly(u32),
    FusionPrefix,
    Fusion,
    ChargeSpecifier(i32),
    OxidationNumber(i32),
    Lambda(u32),
    StemModifier(StemModifier),
    Cyclo,
    FunctionalGroup,
}

impl NodeKind {
    pub fn tag(&self) -> &'static str {
        use NodeKind::*;
        match self {
            Molecule => "molecule",
            WordRule(_) => "wordRule",
            Word(_) => "word",
            Substituent => "substituent",
            Root => "root",
            Bracket(_) => "bracket",
            Group(..) => "group",
            Locant(_) => "locant",
            OrthoMetaPara => "orthoMetaPara",
            Multiplier(..) => "multiplier",
            Suffix(_) => "suffix",
            Heteroatom(_) => "heteroatom",
            Unsaturator(_) => "unsaturator",
            Hydro(_) => "hydro",
            IndicatedHydrogen => "indicatedHydrogen",
            AddedHydrogen => "addedHydrogen",
            StereoChemistry(_) => "stereoChemistry",
            Hyphen => "hyphen",
            OpenBracket => "openBracket",
            CloseBracket => "closeBracket",
            VonBaeyer => "vonBaeyer",
            Spiro => "spiro",
            PolyCyclicSpiro(_) => "polyCyclicSpiro",
            SpiroComponent => "spiroComponent",
            RingAssembly(_) => "ringAssembly",
            FusionPrefix => "fusionPrefix",
            Fusion => "fusion",
            ChargeSpecifier(_) => "chargeSpecifier",
            OxidationNumber(_) => "oxidationNumber",
            Lambda(_) => "lambda",
            StemModifier(_) => "stemModifier",
            Cyclo => "cyclo",
            FunctionalGroup => "functionalGroup",
        }
    }

    /// The attributes a kind's payload is written back as.
    pub fn payload_attrs(&self) -> Vec<(&'static str, String)> {
        use NodeKind::*;
        match self {
            WordRule(rule) => vec![("wordRule", rule.to_string())],
            Word(t) => vec![("type", t.to_string())],
            Bracket(BracketType::Implicit) => vec![("type", "implicit".to_string())],
            Group(t, sub) => {
                let mut out = vec![("type", t.to_string())];
                if let Some(sub) = sub {
                    out.push(("subType", sub.to_string()));
                }
                out
            }
            Locant(LocantRole::Unresolved) => vec![],
            Locant(role) => vec![("role", role.to_string())],
            Multiplier(v, MultiplierType::Basic) => vec![("value", v.to_string())],
            Multiplier(v, t) => vec![("value", v.to_string()), ("type", t.to_string())],
            Suffix(t) => vec![("type", t.to_string())],
            Heteroatom(el) => vec![("value", el.to_string())],
            Unsaturator(v) => vec![("value", v.to_string())],
            Hydro(t) => vec![("value", t.to_string())],
            StereoChemistry(t) => vec![("type", t.to_string())],
            PolyCyclicSpiro(t) => vec![("type", t.to_string())],
            RingAssembly(v) => vec![("value", v.to_string())],
            ChargeSpecifier(v) | OxidationNumber(v) => vec![("value", v.to_string())],
            Lambda(v) => vec![("value", v.to_string())],
            StemModifier(m) => vec![("value", m.to_string())],
            _ => vec![],
        }
    }

    /// Builds a kind from its tag, taking payload attributes out of `attrs`.
    pub fn from_tag(tag: &str, attrs: &mut super::Attrs) -> Result<NodeKind> {
        use NodeKind::*;
        fn required(attrs: &mut super::Attrs, tag: &str, key: &str) -> Result<String> {
            attrs
                .remove(key)
                .ok_or_else(|| ChemError::TreeFormat(format!("<{tag}> needs a {key} attribute")))
        }
        fn number<T: FromStr>(text: &str, tag: &str) -> Result<T> {
            text.parse()
                .map_err(|_| ChemError::TreeFormat(format!("<{tag}> has a non numeric value '{text}'")))
        }
        let kind = match tag {
            "molecule" => Molecule,
            "wordRule" => WordRule(required(attrs, tag, "wordRule")?.parse()?),
            "word" => Word(required(attrs, tag, "type")?.parse()?),
            "substituent" => Substituent,
            "root" => Root,
            "bracket" => Bracket(match attrs.remove("type") {
                Some(t) => t.parse()?,
                None => BracketType::Structural,
            }),
            "group" => {
                let group_type = required(attrs, tag, "type")?.parse()?;
                let sub_type = attrs.remove("subType").map(|s| s.parse()).transpose()?;
                Group(group_type, sub_type)
            }
            "locant" => Locant(match attrs.remove("role") {
                Some(r) => r.parse()?,
                None => LocantRole::Unresolved,
            }),
            "orthoMetaPara" => OrthoMetaPara,
            "multiplier" => {
                let value = number(&required(attrs, tag, "value")?, tag)?;
                let t = match attrs.remove("type") {
                    Some(t) => t.parse()?,
                    None => MultiplierType::Basic,
                };
                Multiplier(value, t)
            }
            "suffix" => Suffix(required(attrs, tag, "type")?.parse()?),
            "heteroatom" => {
                let symbol = required(attrs, tag, "value")?;
                Heteroatom(
                    ChemEl::from_symbol(&symbol)
                        .ok_or_else(|| ChemError::TreeFormat(format!("unknown element '{symbol}'")))?,
                )
            }
            "unsaturator" => Unsaturator(number(&required(attrs, tag, "value")?, tag)?),
            "hydro" => Hydro(match attrs.remove("value") {
                Some(v) => v.parse()?,
                None => HydroType::Hydro,
            }),
            "indicatedHydrogen" => IndicatedHydrogen,
            "addedHydrogen" => AddedHydrogen,
            "stereoChemistry" => StereoChemistry(required(attrs, tag, "type")?.parse()?),
            "hyphen" => Hyphen,
            "openBracket" => OpenBracket,
            "closeBracket" => CloseBracket,
            "vonBaeyer" => VonBaeyer,
            "spiro" => Spiro,
            "polyCyclicSpiro" => PolyCyclicSpiro(required(attrs, tag, "type")?.parse()?),
            "spiroComponent" => SpiroComponent,
            "ringAssembly" => RingAssembly(number(&required(attrs, tag, "value")?, tag)?),
            "fusionPrefix" => FusionPrefix,
            "fusion" => Fusion,
            "chargeSpecifier" => ChargeSpecifier(number(&required(attrs, tag, "value")?, tag)?),
            "oxidationNumber" => OxidationNumber(number(&required(attrs, tag, "value")?, tag)?),
            "lambda" => Lambda(number(&required(attrs, tag, "value")?, tag)?),
            "stemModifier" => StemModifier(required(attrs, tag, "value")?.parse()?),
            "cyclo" => Cyclo,
            "functionalGroup" => FunctionalGroup,
            other => return Err(ChemError::TreeFormat(format!("unknown node kind '{other}'"))),
        };
        Ok(kind)
    }

    pub fn is_scope(&self) -> bool {
        matches!(self, NodeKind::Substituent | NodeKind::Root | NodeKind::Bracket(_))
    }

    pub fn is_group(&self) -> bool {
        matches!(self, NodeKind::Group(..))
    }
}
