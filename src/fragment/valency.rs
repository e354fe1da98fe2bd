use super::*;

/// How a formal charge shifts the valencies of an element: N+ and O+ gain a
/// bond, C+ and C- lose one, B- gains one.
pub fn charge_valency_shift(el: ChemEl, charge: i32) -> i32 {
    match el {
        ChemEl::B | ChemEl::Al | ChemEl::Ga => -charge,
        ChemEl::C | ChemEl::Si | ChemEl::Ge | ChemEl::Sn | ChemEl::Pb => -charge.abs(),
        _ => charge,
    }
}

impl FragmentManager {
    /// Sum of bond orders.
    pub fn incoming_valency(&self, atom: AtomId) -> u32 {
        self.bonded(atom).iter().map(|&(_, order)| order as u32).sum()
    }

    /// Bond orders plus pending out-atom valency plus one for spare valency.
    pub fn used_valency(&self, atom: AtomId) -> u32 {
        let a = &self[atom];
        let outs = self
            .frag(a.frag)
            .map(|f| f.out_valency_of(atom))
            .unwrap_or(0);
        self.incoming_valency(atom) + outs + u32::from(a.spare_valency)
    }

    /// The valency the atom currently adopts: its lambda value, or the
    /// smallest allowed (charge adjusted) valency that fits its bonds.
    pub fn target_valency(&self, atom: AtomId) -> Option<u32> {
        let a = &self[atom];
        let shift = charge_valency_shift(a.el, a.charge);
        if let Some(lambda) = a.lambda {
            return Some(lambda);
        }
        let used = self.used_valency(atom) as i32;
        let allowed: Vec<u32> = a
            .el
            .valencies()
            .iter()
            .map(|&v| v as i32 + shift)
            .filter(|&v| v >= 0)
            .map(|v| v as u32)
            .collect();
        allowed
            .iter()
            .copied()
            .find(|&v| v as i32 >= used)
            .or_else(|| allowed.last().copied())
    }

    /// Hydrogens the atom carries in the output.
    pub fn hydrogen_count(&self, atom: AtomId) -> u32 {
        let a = &self[atom];
        if a.el == ChemEl::R {
            return 0;
        }
        if let Some(h) = a.explicit_h {
            return (h as i32 + a.proton_delta).max(0) as u32;
        }
        let Some(valency) = self.target_valency(atom) else {
            return a.proton_delta.max(0) as u32;
        };
        (valency as i32 - self.used_valency(atom) as i32 + a.proton_delta).max(0) as u32
    }

    /// Hydrogens that may be replaced by a substituent without raising the
    /// atom above its default valency.
    pub fn substitutable_hydrogens(&self, atom: AtomId) -> u32 {
        let a = &self[atom];
        if a.el == ChemEl::R {
            return 0;
        }
        if a.explicit_h.is_some() {
            return self.hydrogen_count(atom);
        }
        let shift = charge_valency_shift(a.el, a.charge);
        let base = match a.lambda {
            Some(l) => l as i32,
            None => match a.el.valencies().first() {
                Some(&v) => v as i32 + shift,
                None => return 0,
            },
        };
        (base - self.used_valency(atom) as i32 + a.proton_delta).max(0) as u32
    }

    /// Fails when an atom is bonded beyond the largest valency its element
    /// allows (lambda values are honoured).
    pub fn check_valency(&self, atom: AtomId) -> Result<()> {
        let a = &self[atom];
        if a.el == ChemEl::R {
            return Ok(());
        }
        let max = match a.lambda {
            Some(l) => Some(l),
            None => a.el.max_valency(a.charge),
        };
        if let Some(max) = max {
            let used = self.incoming_valency(atom) + u32::from(a.spare_valency);
            let explicit = a.explicit_h.map(|h| h as i32 + a.proton_delta).unwrap_or(0).max(0) as u32;
            if used + explicit > max {
                return Err(ChemError::building(format!(
                    "Atom {} is hypervalent: valency {} exceeds {}",
                    self.describe(atom),
                    used + explicit,
                    max
                )));
            }
        }
        Ok(())
    }

    /// Applies a change of charge together with the protons the name says
    /// were gained or lost. Protons implied by the new charge are not counted twice.
    pub fn change_charge(&mut self, atom: AtomId, charge: i32, protons: i32) {
        let el = self[atom].el;
        let before = charge_valency_shift(el, self[atom].charge);
        let a = &mut self[atom];
        a.charge += charge;
        let after = charge_valency_shift(el, a.charge);
        if a.explicit_h.is_some() {
            a.proton_delta += protons;
        } else {
            a.proton_delta += protons - (after - before);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(mgr: &FragmentManager, frag: FragId, locant: &str) -> AtomId {
        mgr.atom_by_locant(frag, locant).unwrap()
    }

    #[test]
    fn test_hydrogen_counts() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("CC(=O)N", &Labels::Numeric).unwrap();
        assert_eq!(mgr.hydrogen_count(atom(&mgr, frag, "1")), 3);
        assert_eq!(mgr.hydrogen_count(atom(&mgr, frag, "2")), 0);
        assert_eq!(mgr.hydrogen_count(atom(&mgr, frag, "3")), 0);
        assert_eq!(mgr.hydrogen_count(atom(&mgr, frag, "4")), 2);
    }

    #[test]
    fn test_aromatic_atoms_reserve_one_valency() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("c1ccncc1", &Labels::Numeric).unwrap();
        assert_eq!(mgr.hydrogen_count(atom(&mgr, frag, "1")), 1);
        assert_eq!(mgr.hydrogen_count(atom(&mgr, frag, "4")), 0);
    }

    #[test]
    fn test_charge_change_does_not_double_count_protons() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("CN", &Labels::Numeric).unwrap();
        let n = atom(&mgr, frag, "2");
        mgr.change_charge(n, 1, 1);
        assert_eq!(mgr[n].charge, 1);
        assert_eq!(mgr.hydrogen_count(n), 3);

        let cl = mgr.build_from_smiles("Cl", &Labels::Numeric).unwrap();
        let cl = atom(&mgr, cl, "1");
        mgr.change_charge(cl, -1, -1);
        assert_eq!(mgr.hydrogen_count(cl), 0);
    }

    #[test]
    fn test_sulfur_expands_valency() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("CS(=O)(=O)C", &Labels::Numeric).unwrap();
        let s = atom(&mgr, frag, "2");
        assert_eq!(mgr.target_valency(s), Some(6));
        assert_eq!(mgr.hydrogen_count(s), 0);
        assert!(mgr.check_valency(s).is_ok());
    }

    #[test]
    fn test_hypervalent_carbon_is_rejected() {
        let mut mgr = FragmentManager::new();
        let frag = mgr.build_from_smiles("C(C)(C)(C)(C)C", &Labels::Numeric).unwrap();
        assert!(mgr.check_valency(atom(&mgr, frag, "1")).is_err());
    }
}
