//! Making salts neutral: "magnesium chloride" is MgCl2, "iron(3+) sulfate"
//! is Fe2(SO4)3.

use super::*;

fn component_charge(mgr: &FragmentManager, frag: FragId) -> Result<i32> {
    Ok(mgr.frag(frag)?.atoms.iter().map(|&a| mgr[a].charge).sum())
}

fn net_charge(mgr: &FragmentManager, components: &[FragId]) -> Result<i32> {
    let mut net = 0;
    for &frag in components {
        net += component_charge(mgr, frag)?;
    }
    Ok(net)
}

/// The charge a metal has in nearly all of its salts.
fn typical_charge(el: ChemEl) -> Option<i32> {
    use ChemEl::*;
    match el {
        Li | Na | K | Rb | Cs | Ag => Some(1),
        Be | Mg | Ca | Sr | Ba | Zn | Cd => Some(2),
        Al | Ga => Some(3),
        _ => None,
    }
}

fn gcd(a: i32, b: i32) -> i32 {
    if b == 0 {
        a.abs()
    } else {
        gcd(b, a % b)
    }
}

/// Lone uncharged metal atoms without a stated oxidation number take their
/// usual charge.
fn charge_lone_metals(mgr: &mut FragmentManager, components: &[FragId]) -> Result<()> {
    for &frag in components {
        let atoms = &mgr.frag(frag)?.atoms;
        let [atom] = atoms[..] else {
            continue;
        };
        let a = &mgr[atom];
        if a.charge != 0 || a.oxidation_number.is_some() {
            continue;
        }
        if let Some(charge) = typical_charge(a.el) {
            debug!("{} given its usual charge {:+}", mgr.describe(atom), charge);
            mgr[atom].charge = charge;
        }
    }
    Ok(())
}

/// When one side of the salt is a single ion, copies it and the other side
/// in the smallest ratio that is neutral.
fn multiply_ions(state: &mut BuildState, components: Vec<FragId>) -> Result<Vec<FragId>> {
    let mut cations = Vec::new();
    let mut anions = Vec::new();
    for &frag in &components {
        let charge = component_charge(&state.mgr, frag)?;
        if charge > 0 {
            cations.push(frag);
        } else if charge < 0 {
            anions.push(frag);
        }
    }
    if cations.is_empty() || anions.is_empty() || (cations.len() > 1 && anions.len() > 1) {
        return Ok(components);
    }
    let positive = net_charge(&state.mgr, &cations)?;
    let negative = -net_charge(&state.mgr, &anions)?;
    let divisor = gcd(positive, negative);
    let cation_copies = (negative / divisor) as usize;
    let anion_copies = (positive / divisor) as usize;
    debug!("salt ratio {}:{}", cation_copies, anion_copies);

    let mut out: Vec<FragId> = components
        .iter()
        .copied()
        .filter(|f| !cations.contains(f) && !anions.contains(f))
        .collect();
    for (ions, copies) in [(cations, cation_copies), (anions, anion_copies)] {
        out.extend(ions.iter().copied());
        for _ in 1..copies {
            for &ion in &ions {
                out.push(state.mgr.copy_fragment(ion)?.0);
            }
        }
    }
    Ok(out)
}

/// Negative acid oxygens pick up a proton each until the charge is gone.
fn protonate(mgr: &mut FragmentManager, components: &[FragId], mut net: i32) -> Result<i32> {
    for &frag in components {
        for atom in mgr.frag(frag)?.functional_atoms.clone() {
            if net >= 0 {
                return Ok(net);
            }
            if mgr[atom].charge == -1 {
                mgr.change_charge(atom, 1, 1);
                net += 1;
            }
        }
    }
    Ok(net)
}

/// Balances the charges of a multi component name, unless it stated its
/// own ratio. Returns the components, copies included.
pub fn balance_charges(state: &mut BuildState, components: Vec<FragId>) -> Result<Vec<FragId>> {
    if components.len() < 2 || state.explicit_stoichiometry {
        return Ok(components);
    }
    if net_charge(&state.mgr, &components)? == 0 {
        return Ok(components);
    }
    charge_lone_metals(&mut state.mgr, &components)?;
    if net_charge(&state.mgr, &components)? == 0 {
        return Ok(components);
    }
    let components = multiply_ions(state, components)?;
    let net = net_charge(&state.mgr, &components)?;
    if net == 0 {
        return Ok(components);
    }
    let net = if net < 0 { protonate(&mut state.mgr, &components, net)? } else { net };
    if net != 0 {
        warn!("could not balance the charges; net charge {:+} left", net);
    }
    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::tests::built;

    const CHLORIDE: &str = r#"{word type=full {root {group type=simple value=Cl labels=none "chlor"} {suffix type=charge value=ide "ide"}}}"#;
    const SULFATE: &str = r#"{word type=full {root {group type=nonCarboxylicAcid value=OS(=O)(=O)O labels=none "sulf"} {suffix type=root value=ate "ate"}}}"#;

    fn salt(cation: &str, anion: &str) -> String {
        format!("{{molecule {{wordRule wordRule=simple {cation}}} {{wordRule wordRule=simple {anion}}}}}")
    }

    #[test]
    fn test_magnesium_chloride() {
        let magnesium = r#"{word type=full {root {group type=elementaryAtom subType=metal value=[Mg] labels=none "magnesium"}}}"#;
        let molecule = built(&salt(magnesium, CHLORIDE));
        assert_eq!(molecule.net_charge(), 0);
        assert_eq!(molecule.count_element(ChemEl::Cl), 2);
        assert_eq!(molecule.component_count(), 3);
    }

    #[test]
    fn test_iron_three_sulfate() {
        let iron = r#"{word type=full {root {group type=elementaryAtom subType=metal value=[Fe] labels=none "iron"} {chargeSpecifier value=3 "(3+)"}}}"#;
        let molecule = built(&salt(iron, SULFATE));
        assert_eq!(molecule.net_charge(), 0);
        assert_eq!(molecule.count_element(ChemEl::Fe), 2);
        assert_eq!(molecule.count_element(ChemEl::S), 3);
    }

    #[test]
    fn test_sodium_sulfate_by_usual_charges() {
        let sodium = r#"{word type=full {root {group type=elementaryAtom subType=metal value=[Na] labels=none "sodium"}}}"#;
        let molecule = built(&salt(sodium, SULFATE));
        assert_eq!(molecule.net_charge(), 0);
        assert_eq!(molecule.count_element(ChemEl::Na), 2);
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(3, 2), 1);
        assert_eq!(gcd(2, 4), 2);
    }
}
