use std::fmt;

/// Chemical elements the name vocabulary can produce, plus the `R` dummy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChemEl {
    R,
    H,
    He,
    Li,
    Be,
    B,
    C,
    N,
    O,
    F,
    Ne,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    Ar,
    K,
    Ca,
    Ti,
    V,
    Cr,
    Mn,
    Fe,
    Co,
    Ni,
    Cu,
    Zn,
    Ga,
    Ge,
    As,
    Se,
    Br,
    Kr,
    Rb,
    Sr,
    Zr,
    Mo,
    Ru,
    Rh,
    Pd,
    Ag,
    Cd,
    In,
    Sn,
    Sb,
    Te,
    I,
    Xe,
    Cs,
    Ba,
    W,
    Os,
    Ir,
    Pt,
    Au,
    Hg,
    Tl,
    Pb,
    Bi,
    Po,
    At,
    U,
}

use ChemEl::*;

const ALL: &[ChemEl] = &[
    R, H, He, Li, Be, B, C, N, O, F, Ne, Na, Mg, Al, Si, P, S, Cl, Ar, K, Ca, Ti, V, Cr, Mn, Fe,
    Co, Ni, Cu, Zn, Ga, Ge, As, Se, Br, Kr, Rb, Sr, Zr, Mo, Ru, Rh, Pd, Ag, Cd, In, Sn, Sb, Te, I,
    Xe, Cs, Ba, W, Os, Ir, Pt, Au, Hg, Tl, Pb, Bi, Po, At, U,
];

impl ChemEl {
    pub fn symbol(&self) -> &'static str {
        match self {
            R => "R",
            H => "H",
            He => "He",
            Li => "Li",
            Be => "Be",
            B => "B",
            C => "C",
            N => "N",
            O => "O",
            F => "F",
            Ne => "Ne",
            Na => "Na",
            Mg => "Mg",
            Al => "Al",
            Si => "Si",
            P => "P",
            S => "S",
            Cl => "Cl",
            Ar => "Ar",
            K => "K",
            Ca => "Ca",
            Ti => "Ti",
            V => "V",
            Cr => "Cr",
            Mn => "Mn",
            Fe => "Fe",
            Co => "Co",
            Ni => "Ni",
            Cu => "Cu",
            Zn => "Zn",
            Ga => "Ga",
            Ge => "Ge",
            As => "As",
            Se => "Se",
            Br => "Br",
            Kr => "Kr",
            Rb => "Rb",
            Sr => "Sr",
            Zr => "Zr",
            Mo => "Mo",
            Ru => "Ru",
            Rh => "Rh",
            Pd => "Pd",
            Ag => "Ag",
            Cd => "Cd",
            In => "In",
            Sn => "Sn",
            Sb => "Sb",
            Te => "Te",
            I => "I",
            Xe => "Xe",
            Cs => "Cs",
            Ba => "Ba",
            W => "W",
            Os => "Os",
            Ir => "Ir",
            Pt => "Pt",
            Au => "Au",
            Hg => "Hg",
            Tl => "Tl",
            Pb => "Pb",
            Bi => "Bi",
            Po => "Po",
            At => "At",
            U => "U",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<ChemEl> {
        ALL.iter().copied().find(|el| el.symbol() == symbol)
    }

    pub fn atomic_number(&self) -> u32 {
        match self {
            R => 0,
            H => 1,
            He => 2,
            Li => 3,
            Be => 4,
            B => 5,
            C => 6,
            N => 7,
            O => 8,
            F => 9,
            Ne => 10,
            Na => 11,
            Mg => 12,
            Al => 13,
            Si => 14,
            P => 15,
            S => 16,
            Cl => 17,
            Ar => 18,
            K => 19,
            Ca => 20,
            Ti => 22,
            V => 23,
            Cr => 24,
            Mn => 25,
            Fe => 26,
            Co => 27,
            Ni => 28,
            Cu => 29,
            Zn => 30,
            Ga => 31,
            Ge => 32,
            As => 33,
            Se => 34,
            Br => 35,
            Kr => 36,
            Rb => 37,
            Sr => 38,
            Zr => 40,
            Mo => 42,
            Ru => 44,
            Rh => 45,
            Pd => 46,
            Ag => 47,
            Cd => 48,
            In => 49,
            Sn => 50,
            Sb => 51,
            Te => 52,
            I => 53,
            Xe => 54,
            Cs => 55,
            Ba => 56,
            W => 74,
            Os => 76,
            Ir => 77,
            Pt => 78,
            Au => 79,
            Hg => 80,
            Tl => 81,
            Pb => 82,
            Bi => 83,
            Po => 84,
            At => 85,
            U => 92,
        }
    }

    /// Seniority used when ordering Hantzsch-Widman prefixes. Higher is more senior.
    pub fn hw_priority(&self) -> Option<u32> {
        let p = match self {
            F => 23,
            Cl => 22,
            Br => 21,
            I => 20,
            O => 19,
            S => 18,
            Se => 17,
            Te => 16,
            N => 15,
            P => 14,
            As => 13,
            Sb => 12,
            Bi => 11,
            Si => 10,
            Ge => 9,
            Sn => 8,
            Pb => 7,
            B => 6,
            Al => 5,
            Ga => 4,
            In => 3,
            Tl => 2,
            Hg => 1,
            _ => return None,
        };
        Some(p)
    }

    /// Allowed neutral valencies in increasing order. Empty for elements whose
    /// bonding is not described by a valency (most metals).
    pub fn valencies(&self) -> &'static [u32] {
        match self {
            H | F | Li | Na | K | Rb | Cs => &[1],
            B | Al | Ga => &[3],
            In | Tl => &[3, 1],
            C | Si => &[4],
            Ge | Sn | Pb => &[4, 2],
            N => &[3],
            P | As | Sb => &[3, 5],
            Bi => &[3, 5],
            O => &[2],
            S | Se | Te | Po => &[2, 4, 6],
            Cl | Br | I | At => &[1, 3, 5, 7],
            Be | Mg | Ca | Sr | Ba | Zn | Cd | Hg => &[2],
            R => &[1],
            _ => &[],
        }
    }

    /// Largest valency accepted by the final hypervalency check.
    pub fn max_valency(&self, charge: i32) -> Option<u32> {
        let base = self.valencies().last().copied()?;
        let adjusted = match self {
            // isoelectronic shift: N+ behaves like C, O+ like N, B- like C
            N | P | As | Sb | O | S | Se | Te if charge > 0 => base as i32 + charge,
            B | Al if charge < 0 => base as i32 - charge,
            C | Si if charge != 0 => 3,
            _ if charge < 0 => base as i32 + charge,
            _ => base as i32,
        };
        Some(adjusted.max(0) as u32)
    }

    pub fn is_metal(&self) -> bool {
        matches!(
            self,
            Li | Be
                | Na
                | Mg
                | Al
                | K
                | Ca
                | Ti
                | V
                | Cr
                | Mn
                | Fe
                | Co
                | Ni
                | Cu
                | Zn
                | Ga
                | Rb
                | Sr
                | Zr
                | Mo
                | Ru
                | Rh
                | Pd
                | Ag
                | Cd
                | In
                | Sn
                | Cs
                | Ba
                | W
                | Os
                | Ir
                | Pt
                | Au
                | Hg
                | Tl
                | Pb
                | Bi
                | U
        )
    }

    pub fn is_halogen(&self) -> bool {
        matches!(self, F | Cl | Br | I | At)
    }

    pub fn is_chalcogen(&self) -> bool {
        matches!(self, O | S | Se | Te | Po)
    }

    /// Atoms written without brackets in SMILES when their valency is standard.
    pub fn in_organic_subset(&self) -> bool {
        matches!(self, B | C | N | O | P | S | F | Cl | Br | I)
    }

    pub fn is_heteroatom(&self) -> bool {
        !matches!(self, C | H | R)
    }
}

impl fmt::Display for ChemEl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_lookup() {
        assert_eq!(ChemEl::from_symbol("Cl"), Some(ChemEl::Cl));
        assert_eq!(ChemEl::from_symbol("Mg"), Some(ChemEl::Mg));
        assert_eq!(ChemEl::from_symbol("Xx"), None);
        for el in ALL {
            assert_eq!(ChemEl::from_symbol(el.symbol()), Some(*el));
        }
    }

    #[test]
    fn test_hw_priority_orders_oxygen_above_nitrogen() {
        assert!(ChemEl::O.hw_priority() > ChemEl::N.hw_priority());
        assert!(ChemEl::N.hw_priority() > ChemEl::Si.hw_priority());
        assert_eq!(ChemEl::C.hw_priority(), None);
    }

    #[test]
    fn test_max_valency_follows_charge() {
        assert_eq!(ChemEl::N.max_valency(0), Some(3));
        assert_eq!(ChemEl::N.max_valency(1), Some(4));
        assert_eq!(ChemEl::O.max_valency(-1), Some(1));
        assert_eq!(ChemEl::S.max_valency(0), Some(6));
        assert_eq!(ChemEl::Fe.max_valency(3), None);
    }
}
