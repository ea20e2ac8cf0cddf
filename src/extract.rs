//! Aglycone/sugar extraction.
//!
//! [`SugarExtractor::copy_and_extract`] clones the input molecule twice,
//! lets the detector strip the sugar moieties from the first copy (the
//! aglycone) and derives the second copy (the sugars) as its complement.
//! The seam between the two is then repaired: bridging hetero atoms are
//! duplicated so both sides stay chemically valid, misassigned terminal
//! carbons and carboxy groups are moved over, spiro junction atoms appear
//! on both sides, and every open valence is closed with an R marker or
//! implicit hydrogens. The caller receives the fragments plus index maps
//! tying every surviving copy atom and bond back to the input.

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::copy::{copy_atom_into, copy_bond_between, deeper_copy};
use crate::detect::SugarDetector;
use crate::error::{Error, Warning};
use crate::graph_ops::{is_connected, partition_into_molecules};
use crate::mapping::{AtomMap, BondMap};
use crate::mol::Mol;

/// Switches of a single extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub extract_circular_sugars: bool,
    pub extract_linear_sugars: bool,
    /// Saturate open valences with pseudo R atoms instead of implicit
    /// hydrogens.
    pub mark_attach_points_by_r: bool,
    /// Run the bond-splitting postprocessing on the sugars container.
    pub post_process_sugars: bool,
    /// Gate every postprocessing split on the size of the resulting
    /// fragments.
    pub limit_post_processing_by_size: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            extract_circular_sugars: true,
            extract_linear_sugars: false,
            mark_attach_points_by_r: false,
            post_process_sugars: false,
            limit_post_processing_by_size: true,
        }
    }
}

/// Result of an extraction run.
///
/// `fragments[0]` is the aglycone; it may be empty (pure sugars) or
/// disconnected (non-terminal removal). The remaining elements are the
/// connected sugar components. Sugar fragments keep the atom and bond
/// handles of the sugars copy they were partitioned from, so the two
/// sugar maps apply to all of them.
#[derive(Debug)]
pub struct Extraction {
    pub fragments: Vec<Mol>,
    pub aglycone_atoms: AtomMap,
    pub aglycone_bonds: BondMap,
    pub sugar_atoms: AtomMap,
    pub sugar_bonds: BondMap,
    pub warnings: Vec<Warning>,
}

impl Extraction {
    pub fn aglycone(&self) -> &Mol {
        &self.fragments[0]
    }

    pub fn sugar_fragments(&self) -> &[Mol] {
        &self.fragments[1..]
    }
}

/// Separates glycosides into aglycone and sugar copies, using a
/// [`SugarDetector`] it owns by composition.
#[derive(Debug, Clone)]
pub struct SugarExtractor<D> {
    detector: D,
}

impl<D: SugarDetector> SugarExtractor<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Extracts copies of the aglycone and sugar parts of `mol`.
    ///
    /// The input is never mutated. An empty input comes back as a single
    /// empty fragment; an input without detectable sugars comes back as a
    /// single aglycone copy. Internal inconsistencies are reported through
    /// [`Extraction::warnings`] while the procedure carries on, so a
    /// syntactically valid input always yields a result.
    pub fn copy_and_extract(
        &self,
        mol: &Mol,
        options: &ExtractOptions,
    ) -> Result<Extraction, Error> {
        if mol.is_empty() {
            return Ok(Extraction {
                fragments: vec![mol.clone()],
                aglycone_atoms: AtomMap::new(),
                aglycone_bonds: BondMap::new(),
                sugar_atoms: AtomMap::new(),
                sugar_bonds: BondMap::new(),
                warnings: Vec::new(),
            });
        }
        let (mut aglycone, mut a_atoms, mut a_bonds) = deeper_copy(mol);
        let removed = if options.extract_circular_sugars && options.extract_linear_sugars {
            self.detector.remove_circular_and_linear_sugars(&mut aglycone)?
        } else if options.extract_circular_sugars {
            self.detector.remove_circular_sugars(&mut aglycone)?
        } else if options.extract_linear_sugars {
            self.detector.remove_linear_sugars(&mut aglycone)?
        } else {
            false
        };
        if !removed {
            return Ok(Extraction {
                fragments: vec![aglycone],
                aglycone_atoms: a_atoms,
                aglycone_bonds: a_bonds,
                sugar_atoms: AtomMap::new(),
                sugar_bonds: BondMap::new(),
                warnings: Vec::new(),
            });
        }
        // The detector only removes, so purging the maps now, before any
        // insertion can recycle a vacated slot, keeps entry presence
        // equivalent to containment for the rest of the procedure.
        for a in mol.atoms() {
            if a_atoms.get(a).is_some_and(|img| !aglycone.contains_atom(img)) {
                a_atoms.remove(a);
            }
        }
        for e in mol.bonds() {
            if a_bonds.get(e).is_some_and(|img| !aglycone.contains_bond(img)) {
                a_bonds.remove(e);
            }
        }

        let mut warnings: Vec<Warning> = Vec::new();
        let (mut sugars, mut s_atoms, mut s_bonds) = deeper_copy(mol);
        let spiro_enabled = self.detector.detects_spiro_rings_as_circular_sugars();
        let mut contains_spiro = false;
        // The sugars copy keeps exactly the atoms the detector removed,
        // plus spiro junction atoms, which belong to both sides.
        for orig in mol.atoms() {
            if spiro_enabled {
                if let Some(agl) = a_atoms.get(orig) {
                    if aglycone.atom(agl).is_spiro {
                        let sug = s_atoms.get(orig).expect("fresh copy maps every atom");
                        sugars.atom_mut(sug).is_spiro = true;
                        contains_spiro = true;
                        continue;
                    }
                }
            }
            if a_atoms.get(orig).is_some() {
                let sug = s_atoms.get(orig).expect("fresh copy maps every atom");
                remove_atom_purging(&mut sugars, sug, &mut s_atoms, &mut s_bonds);
            }
        }

        // Corrections for broken C-C bonds where the detector left sugar
        // carbons on the aglycone: terminal C6-like carbons bound only to
        // an oxygen, and carboxy groups.
        for e in mol.bonds() {
            if a_bonds.get(e).is_some() || s_bonds.get(e).is_some() {
                continue;
            }
            let (begin, end) = mol.bond_endpoints(e).expect("bond endpoints must exist");
            if !(mol.atom(begin).is_carbon() && mol.atom(end).is_carbon()) {
                continue;
            }
            let (orig_carbon, carbon_in_aglycone) = if let Some(img) = a_atoms.get(begin) {
                (begin, img)
            } else if let Some(img) = a_atoms.get(end) {
                (end, img)
            } else {
                continue;
            };
            let other = if orig_carbon == begin { end } else { begin };
            if aglycone.connected_bonds_count(carbon_in_aglycone) == 1 {
                let only_neighbor_is_oxygen = aglycone
                    .neighbors(carbon_in_aglycone)
                    .any(|n| aglycone.atom(n).is_oxygen());
                if !only_neighbor_is_oxygen {
                    continue;
                }
                let Some(other_in_sugars) = s_atoms.get(other) else {
                    warnings.push(Warning::BondAtomInNeitherCopy);
                    continue;
                };
                remove_atom_purging(&mut aglycone, carbon_in_aglycone, &mut a_atoms, &mut a_bonds);
                let new_carbon = copy_atom_into(mol.atom(orig_carbon), &mut sugars);
                let new_bond =
                    copy_bond_between(mol.bond(e), &mut sugars, new_carbon, other_in_sugars);
                s_atoms.insert(orig_carbon, new_carbon);
                s_bonds.insert(e, new_bond);
                rehome_stereo(mol, begin, end, &mut sugars, &s_atoms, &s_bonds);
            } else if aglycone.connected_bonds_count(carbon_in_aglycone) == 2 {
                let mut keto_in_aglycone: Option<NodeIndex> = None;
                let mut ether_in_aglycone: Option<NodeIndex> = None;
                let mut both_neighbors_oxygen = true;
                let neighbors: Vec<NodeIndex> =
                    aglycone.neighbors(carbon_in_aglycone).collect();
                for nbr in neighbors {
                    if !aglycone.atom(nbr).is_oxygen() {
                        both_neighbors_oxygen = false;
                        break;
                    }
                    let edge = aglycone
                        .bond_between(carbon_in_aglycone, nbr)
                        .expect("bond to neighbor must exist");
                    match aglycone.bond(edge).order {
                        BondOrder::Double if keto_in_aglycone.is_none() => {
                            keto_in_aglycone = Some(nbr)
                        }
                        BondOrder::Single if ether_in_aglycone.is_none() => {
                            ether_in_aglycone = Some(nbr)
                        }
                        _ => {
                            both_neighbors_oxygen = false;
                            break;
                        }
                    }
                }
                let (Some(keto_in_agl), Some(_ether_in_agl), true) =
                    (keto_in_aglycone, ether_in_aglycone, both_neighbors_oxygen)
                else {
                    continue;
                };
                let Some(keto_orig) = a_atoms.original_of(keto_in_agl) else {
                    warnings.push(Warning::CarboxyOriginalsNotFound);
                    continue;
                };
                let Some(orig_keto_bond) = mol.bond_between(orig_carbon, keto_orig) else {
                    warnings.push(Warning::CarboxyOriginalsNotFound);
                    continue;
                };
                let Some(other_in_sugars) = s_atoms.get(other) else {
                    warnings.push(Warning::BondAtomInNeitherCopy);
                    continue;
                };
                // move the carbon and its keto oxygen over to the sugars;
                // the ether oxygen stays behind on the aglycone
                let new_carbon = copy_atom_into(mol.atom(orig_carbon), &mut sugars);
                let new_bond =
                    copy_bond_between(mol.bond(e), &mut sugars, new_carbon, other_in_sugars);
                s_atoms.insert(orig_carbon, new_carbon);
                s_bonds.insert(e, new_bond);
                let new_keto = copy_atom_into(mol.atom(keto_orig), &mut sugars);
                let new_keto_bond = copy_bond_between(
                    mol.bond(orig_keto_bond),
                    &mut sugars,
                    new_carbon,
                    new_keto,
                );
                s_atoms.insert(keto_orig, new_keto);
                s_bonds.insert(orig_keto_bond, new_keto_bond);
                remove_atom_purging(&mut aglycone, keto_in_agl, &mut a_atoms, &mut a_bonds);
                remove_atom_purging(
                    &mut aglycone,
                    carbon_in_aglycone,
                    &mut a_atoms,
                    &mut a_bonds,
                );
                rehome_stereo(mol, begin, end, &mut sugars, &s_atoms, &s_bonds);
            }
        }

        // General boundary reconstruction: duplicate bridging hetero atoms
        // and saturate every atom left with an open valence.
        let mut has_broken_bond = false;
        for e in mol.bonds() {
            if a_bonds.get(e).is_some() || s_bonds.get(e).is_some() {
                continue;
            }
            has_broken_bond = true;
            let (begin, end) = mol.bond_endpoints(e).expect("bond endpoints must exist");
            let order = mol.bond(e).order;
            let carbon_hetero = if mol.atom(begin).is_carbon() && mol.atom(end).is_hetero() {
                Some((begin, end))
            } else if mol.atom(end).is_carbon() && mol.atom(begin).is_hetero() {
                Some((end, begin))
            } else {
                None
            };
            if let Some((orig_carbon, orig_hetero)) = carbon_hetero {
                let hetero_in_aglycone = a_atoms.get(orig_hetero).is_some();
                let hetero_in_sugars = s_atoms.get(orig_hetero).is_some();
                if !hetero_in_aglycone && !hetero_in_sugars {
                    warnings.push(Warning::HeteroAtomInNeitherCopy);
                    continue;
                }
                {
                    // duplicate the hetero atom into the side that lacks it
                    let (receiving, receiving_atoms, receiving_bonds) = if hetero_in_sugars {
                        (&mut aglycone, &mut a_atoms, &mut a_bonds)
                    } else {
                        (&mut sugars, &mut s_atoms, &mut s_bonds)
                    };
                    let Some(carbon_in_receiving) = receiving_atoms.get(orig_carbon) else {
                        // happens when the hetero atom bridges two broken
                        // bonds and already lives on both sides; fall back
                        // to plain saturation so no valence stays open
                        warnings.push(Warning::BondAtomInNeitherCopy);
                        for orig_atom in [begin, end] {
                            if let Some(img) = a_atoms.get(orig_atom) {
                                saturate_endpoint(
                                    &mut aglycone,
                                    img,
                                    order,
                                    options.mark_attach_points_by_r,
                                );
                            } else if let Some(img) = s_atoms.get(orig_atom) {
                                saturate_endpoint(
                                    &mut sugars,
                                    img,
                                    order,
                                    options.mark_attach_points_by_r,
                                );
                            }
                        }
                        continue;
                    };
                    let hetero_copy = copy_atom_into(mol.atom(orig_hetero), receiving);
                    let new_bond =
                        receiving.add_bond(carbon_in_receiving, hetero_copy, Bond::of(order));
                    receiving_atoms.insert(orig_hetero, hetero_copy);
                    receiving_bonds.insert(e, new_bond);
                    if options.mark_attach_points_by_r {
                        attach_r(receiving, hetero_copy, order);
                        let delta = mol.bond_order_sum(orig_hetero) as i64
                            - (1 + order.numeric() as i64);
                        bump_implicit_h(receiving.atom_mut(hetero_copy), delta);
                    } else {
                        let delta =
                            mol.bond_order_sum(orig_hetero) as i64 - order.numeric() as i64;
                        bump_implicit_h(receiving.atom_mut(hetero_copy), delta);
                    }
                    rehome_stereo(mol, begin, end, receiving, receiving_atoms, receiving_bonds);
                }
                // saturate the hetero atom on the side that kept it
                let (side, side_atoms) = if hetero_in_aglycone {
                    (&mut aglycone, &a_atoms)
                } else {
                    (&mut sugars, &s_atoms)
                };
                if let Some(kept_hetero) = side_atoms.get(orig_hetero) {
                    if options.mark_attach_points_by_r {
                        attach_r(side, kept_hetero, order);
                    } else {
                        bump_implicit_h(side.atom_mut(kept_hetero), order.numeric() as i64);
                    }
                }
            } else {
                // C-C or hetero-hetero: both endpoints are saturated where
                // they are, nothing is duplicated
                for orig_atom in [begin, end] {
                    if let Some(img) = a_atoms.get(orig_atom) {
                        saturate_endpoint(&mut aglycone, img, order, options.mark_attach_points_by_r);
                    } else if let Some(img) = s_atoms.get(orig_atom) {
                        saturate_endpoint(&mut sugars, img, order, options.mark_attach_points_by_r);
                    } else {
                        warnings.push(Warning::BondAtomInNeitherCopy);
                    }
                }
            }
        }
        if !has_broken_bond && !aglycone.is_empty() && is_connected(mol) && !contains_spiro {
            warnings.push(Warning::NoBrokenBonds);
        }

        if spiro_enabled && contains_spiro {
            for part in [&mut aglycone, &mut sugars] {
                let spiro_atoms: Vec<NodeIndex> = part
                    .atoms()
                    .filter(|&a| part.atom(a).is_spiro)
                    .collect();
                for atom in spiro_atoms {
                    if options.mark_attach_points_by_r {
                        attach_r(part, atom, BondOrder::Single);
                        attach_r(part, atom, BondOrder::Single);
                    } else {
                        bump_implicit_h(part.atom_mut(atom), 2);
                    }
                }
            }
        }

        if options.post_process_sugars {
            if options.extract_linear_sugars {
                let split_warnings = self.split_ether_ester_and_peroxide_postprocessing(
                    &mut sugars,
                    options.mark_attach_points_by_r,
                    options.limit_post_processing_by_size,
                );
                warnings.extend(split_warnings);
            }
            if options.extract_circular_sugars {
                match self.split_o_glycosidic_bonds(
                    &mut sugars,
                    options.mark_attach_points_by_r,
                    options.limit_post_processing_by_size,
                ) {
                    Ok(()) => {}
                    Err(Error::Pattern(source)) => warnings.push(Warning::PatternSkipped {
                        routine: "O-glycosidic bond",
                        source,
                    }),
                    Err(other) => return Err(other),
                }
            }
        }

        prune_maps(mol, &aglycone, &mut a_atoms, &mut a_bonds);
        prune_maps(mol, &sugars, &mut s_atoms, &mut s_bonds);

        let mut fragments = vec![aglycone];
        if is_connected(&sugars) {
            fragments.push(sugars);
        } else {
            for part in partition_into_molecules(&sugars) {
                if !part.is_empty() {
                    fragments.push(part);
                }
            }
        }
        Ok(Extraction {
            fragments,
            aglycone_atoms: a_atoms,
            aglycone_bonds: a_bonds,
            sugar_atoms: s_atoms,
            sugar_bonds: s_bonds,
            warnings,
        })
    }
}

/// Indices of atoms in `mol` whose mapped image lives in `group`. Atoms of
/// `group` without a preimage (R markers, duplicated oxygens) are ignored.
pub fn atom_indices_of_group(mol: &Mol, group: &Mol, map: &AtomMap) -> Vec<usize> {
    if group.is_empty() {
        return Vec::new();
    }
    mol.atoms()
        .filter(|&a| map.get(a).is_some_and(|img| group.contains_atom(img)))
        .map(|a| a.index())
        .collect()
}

/// Indices of bonds in `mol` whose mapped image lives in `group`.
pub fn bond_indices_of_group(mol: &Mol, group: &Mol, map: &BondMap) -> Vec<usize> {
    if group.is_empty() {
        return Vec::new();
    }
    mol.bonds()
        .filter(|&e| map.get(e).is_some_and(|img| group.contains_bond(img)))
        .map(|e| e.index())
        .collect()
}

/// One group label per atom slot of `mol`: 0 for the aglycone, `i >= 1`
/// for the i-th sugar fragment, -1 for unassigned slots. A bridging hetero
/// atom duplicated into both sides is labelled with the first group it
/// appears in, so the aglycone wins.
pub fn group_indices_for_all_atoms(
    mol: &Mol,
    fragments: &[Mol],
    aglycone_atoms: &AtomMap,
    sugar_atoms: &AtomMap,
) -> Vec<i32> {
    if mol.is_empty() || fragments.len() <= 1 {
        return Vec::new();
    }
    let mut labels = vec![-1; mol.atom_index_bound()];
    for (i, group) in fragments.iter().enumerate() {
        if group.is_empty() {
            continue;
        }
        let map = if i == 0 { aglycone_atoms } else { sugar_atoms };
        for idx in atom_indices_of_group(mol, group, map) {
            if labels[idx] == -1 {
                labels[idx] = i as i32;
            }
        }
    }
    labels
}

/// Attaches a pseudo R atom with the given bond order.
pub(crate) fn attach_r(mol: &mut Mol, to: NodeIndex, order: BondOrder) -> NodeIndex {
    let r = mol.add_atom(Atom::r());
    mol.add_bond(to, r, Bond::of(order));
    r
}

/// Adjusts an implicit hydrogen count, clamping at zero.
pub(crate) fn bump_implicit_h(atom: &mut Atom, delta: i64) {
    let new = atom.implicit_h_count as i64 + delta;
    atom.implicit_h_count = new.clamp(0, u8::MAX as i64) as u8;
}

fn saturate_endpoint(mol: &mut Mol, atom: NodeIndex, order: BondOrder, mark_r: bool) {
    if mark_r {
        attach_r(mol, atom, order);
        bump_implicit_h(mol.atom_mut(atom), order.numeric() as i64 - 1);
    } else {
        bump_implicit_h(mol.atom_mut(atom), order.numeric() as i64);
    }
}

/// Carries over every stereo element that involves both endpoints of a
/// broken bond and whose focus and carriers all survive on the receiving
/// side. With purged maps, a successful `map` is exactly that condition.
fn rehome_stereo(
    mol: &Mol,
    begin: NodeIndex,
    end: NodeIndex,
    receiving: &mut Mol,
    atoms: &AtomMap,
    bonds: &BondMap,
) {
    for elem in mol.stereo_elements() {
        if elem.contains_atom(begin) && elem.contains_atom(end) {
            if let Some(mapped) = elem.map(atoms, bonds) {
                receiving.add_stereo_element(mapped);
            }
        }
    }
}

/// Removes an atom from a copy and clears the map entries of the atom and
/// its incident bonds in the same step, before any slot can be recycled.
fn remove_atom_purging(mol: &mut Mol, idx: NodeIndex, atoms: &mut AtomMap, bonds: &mut BondMap) {
    let incident: Vec<EdgeIndex> = mol.bonds_of(idx).collect();
    for e in incident {
        bonds.remove_by_copy(e);
    }
    atoms.remove_by_copy(idx);
    mol.remove_atom(idx);
}

/// Final sweep: drops every map entry whose target no longer exists in the
/// copy. Bond entries additionally re-verify their endpoints, because the
/// splitter removes mapped bonds and a later insertion may have recycled
/// the vacated slot for an unrelated bond.
fn prune_maps(mol: &Mol, copy: &Mol, atoms: &mut AtomMap, bonds: &mut BondMap) {
    for a in mol.atoms() {
        if atoms.get(a).is_some_and(|img| !copy.contains_atom(img)) {
            atoms.remove(a);
        }
    }
    for e in mol.bonds() {
        let Some(img) = bonds.get(e) else { continue };
        let valid = copy.contains_bond(img)
            && match (copy.bond_endpoints(img), mol.bond_endpoints(e)) {
                (Some((ca, cb)), Some((oa, ob))) => {
                    let ia = atoms.get(oa);
                    let ib = atoms.get(ob);
                    (ia == Some(ca) && ib == Some(cb)) || (ia == Some(cb) && ib == Some(ca))
                }
                _ => false,
            };
        if !valid {
            bonds.remove(e);
        }
    }
}
