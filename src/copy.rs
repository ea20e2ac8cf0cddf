//! Deeper-than-clone copies of molecules, atoms, and bonds.
//!
//! A plain `Clone` of a [`Mol`] duplicates the structure but tells the
//! caller nothing about the correspondence between original and copied
//! handles. `deeper_copy` returns that correspondence alongside the copy,
//! which is what the whole extraction pipeline is built on.

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::Atom;
use crate::bond::Bond;
use crate::mapping::{AtomMap, BondMap};
use crate::mol::Mol;

/// Copies a molecule and reports which copied handle each original atom
/// and bond maps to.
///
/// Atom and bond fields are carried over wholesale, lone pairs and single
/// electrons are redirected to the copied atoms, and stereo elements are
/// re-homed through the fresh maps. Isotope- and atom-type-like data is
/// not modelled by [`Atom`] and therefore not copied; callers that need it
/// must re-perceive on the copy.
pub fn deeper_copy(mol: &Mol) -> (Mol, AtomMap, BondMap) {
    let mut copy = Mol::new();
    let mut atoms = AtomMap::with_capacity(mol.atom_index_bound());
    let mut bonds = BondMap::with_capacity(mol.bond_index_bound());
    for idx in mol.atoms() {
        let new_idx = copy_atom_into(mol.atom(idx), &mut copy);
        atoms.insert(idx, new_idx);
    }
    for edge in mol.bonds() {
        let (a, b) = mol
            .bond_endpoints(edge)
            .expect("bond endpoints must exist");
        let begin = atoms.get(a).expect("endpoint was copied");
        let end = atoms.get(b).expect("endpoint was copied");
        let new_edge = copy_bond_between(mol.bond(edge), &mut copy, begin, end);
        bonds.insert(edge, new_edge);
    }
    for &atom in mol.lone_pairs() {
        if let Some(mapped) = atoms.get(atom) {
            copy.add_lone_pair(mapped);
        }
    }
    for &atom in mol.single_electrons() {
        if let Some(mapped) = atoms.get(atom) {
            copy.add_single_electron(mapped);
        }
    }
    for elem in mol.stereo_elements() {
        if let Some(mapped) = elem.map(&atoms, &bonds) {
            copy.add_stereo_element(mapped);
        }
    }
    (copy, atoms, bonds)
}

/// Copies a single atom into the destination container and returns its
/// handle there.
pub fn copy_atom_into(atom: &Atom, dst: &mut Mol) -> NodeIndex {
    dst.add_atom(atom.clone())
}

/// Copies a single bond between two atoms that already live in the
/// destination container.
pub fn copy_bond_between(bond: &Bond, dst: &mut Mol, begin: NodeIndex, end: NodeIndex) -> EdgeIndex {
    dst.add_bond(begin, end, bond.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::BondOrder;
    use crate::stereo::{StereoConfig, StereoElement};

    fn propanol_with_stereo() -> Mol {
        let mut mol = Mol::new();
        let c1 = mol.add_atom(Atom {
            implicit_h_count: 3,
            ..Atom::of(6)
        });
        let c2 = mol.add_atom(Atom {
            implicit_h_count: 1,
            ..Atom::of(6)
        });
        let c3 = mol.add_atom(Atom {
            implicit_h_count: 3,
            ..Atom::of(6)
        });
        let o = mol.add_atom(Atom {
            implicit_h_count: 1,
            ..Atom::of(8)
        });
        let f = mol.add_atom(Atom::of(9));
        mol.add_bond(c1, c2, Bond::single());
        mol.add_bond(c2, c3, Bond::single());
        mol.add_bond(c2, o, Bond::single());
        mol.add_bond(c2, f, Bond::single());
        mol.add_stereo_element(StereoElement::tetrahedral(
            c2,
            [c1, c3, o, f],
            StereoConfig::Left,
        ));
        mol.add_lone_pair(o);
        mol
    }

    #[test]
    fn copy_preserves_structure() {
        let mol = propanol_with_stereo();
        let (copy, atoms, bonds) = deeper_copy(&mol);
        assert_eq!(copy.atom_count(), mol.atom_count());
        assert_eq!(copy.bond_count(), mol.bond_count());
        assert_eq!(copy.stereo_elements().len(), 1);
        assert_eq!(copy.lone_pairs().len(), 1);
        for idx in mol.atoms() {
            let mapped = atoms.get(idx).unwrap();
            assert_eq!(copy.atom(mapped), mol.atom(idx));
        }
        for edge in mol.bonds() {
            let mapped = bonds.get(edge).unwrap();
            assert_eq!(copy.bond(mapped).order, mol.bond(edge).order);
        }
    }

    #[test]
    fn copy_is_independent_of_original() {
        let mol = propanol_with_stereo();
        let (mut copy, atoms, _) = deeper_copy(&mol);
        let first = mol.atoms().next().unwrap();
        copy.atom_mut(atoms.get(first).unwrap()).implicit_h_count = 9;
        assert_ne!(
            mol.atom(first).implicit_h_count,
            copy.atom(atoms.get(first).unwrap()).implicit_h_count
        );
    }

    #[test]
    fn copy_maps_cover_everything() {
        let mol = propanol_with_stereo();
        let (copy, atoms, bonds) = deeper_copy(&mol);
        assert_eq!(atoms.len(), mol.atom_count());
        assert_eq!(bonds.len(), mol.bond_count());
        for idx in mol.atoms() {
            assert!(copy.contains_atom(atoms.get(idx).unwrap()));
            assert_eq!(atoms.original_of(atoms.get(idx).unwrap()), Some(idx));
        }
    }

    #[test]
    fn copy_bond_orders_and_flags() {
        let mut mol = Mol::new();
        let a = mol.add_atom(Atom::of(6));
        let b = mol.add_atom(Atom::of(8));
        let mut bond = Bond::of(BondOrder::Double);
        bond.is_in_ring = true;
        mol.add_bond(a, b, bond);
        let (copy, _, bonds) = deeper_copy(&mol);
        let e = copy.bonds().next().unwrap();
        assert_eq!(copy.bond(e).order, BondOrder::Double);
        assert!(copy.bond(e).is_in_ring);
        assert_eq!(bonds.len(), 1);
    }

    #[test]
    fn copy_of_empty_is_empty() {
        let (copy, atoms, bonds) = deeper_copy(&Mol::new());
        assert!(copy.is_empty());
        assert!(atoms.is_empty());
        assert!(bonds.is_empty());
    }
}
