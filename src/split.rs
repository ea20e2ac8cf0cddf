//! Postprocessing of the sugars container: splitting the bond patterns
//! that link sugar moieties to one another.
//!
//! Five SMARTS-defined patterns are handled. Three of them (O-glycosidic,
//! ester, ether) duplicate the connecting oxygen so both fragments keep a
//! chemically complete group; the cross-linking ether and peroxide splits
//! only break the bond. Every split can be gated on the size of the
//! fragments it would produce, previewed on a scratch copy.

use petgraph::graph::EdgeIndex;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::detect::SugarDetector;
use crate::element;
use crate::error::{Error, Warning};
use crate::extract::{attach_r, bump_implicit_h, SugarExtractor};
use crate::graph_ops::partition_into_molecules;
use crate::mol::Mol;
use crate::smarts;
use crate::stereo::StereoRef;

/// Glycosidic bond between circular sugar moieties: an in-ring carbon of
/// degree 3 or 4 bound out-of-ring to a two-connected oxygen, bound in
/// turn to any carbon. The far side is kept promiscuous for corner cases.
pub const O_GLYCOSIDIC_BOND_SMARTS: &str = "[C;R;D3,D4;+0:1]-!@[O;!R;D2;+0:2]-!@[C;+0:3]";

/// Ester bond between linear sugar moieties: an acyclic carbon carrying a
/// carbonyl oxygen, bound to a two-connected oxygen and onward to another
/// acyclic carbon.
pub const ESTER_BOND_SMARTS: &str = "[C;!R;+0;$(C=!@[O;!R;+0]):1]-!@[O;!R;D2;+0:2]-!@[C;!R;+0:3]";

/// Cross-linking ether: like a plain ether, but the far carbon also bears
/// a hydroxy group.
pub const CROSS_LINKING_ETHER_BOND_SMARTS: &str =
    "[C;!R;+0:1]-!@[O;!R;D2;+0:2]-!@[C;!R;+0;$(C-!@[OH1;!R;+0]):3]";

/// Plain ether between linear sugar moieties.
pub const ETHER_BOND_SMARTS: &str = "[C;!R;+0:1]-!@[O;!R;D2;+0:2]-!@[C;!R;+0:3]";

/// Peroxide between linear sugar moieties; split at the O-O bond.
pub const PEROXIDE_BOND_SMARTS: &str =
    "[C;!R;+0:1]-!@[O;!R;D2;+0:2]-!@[O;!R;D2;+0:3]-!@[C;!R;+0:4]";

/// Which threshold a split is gated on.
#[derive(Debug, Clone, Copy)]
enum SizeGate {
    /// Circular patterns: the detector's preservation threshold.
    Circular,
    /// Linear patterns: the minimum linear sugar candidate size.
    Linear,
}

struct SplitSpec {
    smarts: &'static str,
    /// Pattern positions of the bond to break.
    break_at: (usize, usize),
    /// Duplicate the connecting oxygen (`break_at.1`) onto the
    /// `break_at.0` side instead of just breaking the bond.
    duplicate_oxygen: bool,
    gate: SizeGate,
}

impl<D: SugarDetector> SugarExtractor<D> {
    /// Splits O-glycosidic bonds between circular sugar moieties,
    /// duplicating the connecting oxygen.
    pub fn split_o_glycosidic_bonds(
        &self,
        mol: &mut Mol,
        mark_attach_points_by_r: bool,
        limit_by_size: bool,
    ) -> Result<(), Error> {
        self.apply_splits(
            mol,
            &SplitSpec {
                smarts: O_GLYCOSIDIC_BOND_SMARTS,
                break_at: (0, 1),
                duplicate_oxygen: true,
                gate: SizeGate::Circular,
            },
            mark_attach_points_by_r,
            limit_by_size,
        )
    }

    /// Splits ester bonds on the acyl side, duplicating the connecting
    /// oxygen.
    pub fn split_esters(
        &self,
        mol: &mut Mol,
        mark_attach_points_by_r: bool,
        limit_by_size: bool,
    ) -> Result<(), Error> {
        self.apply_splits(
            mol,
            &SplitSpec {
                smarts: ESTER_BOND_SMARTS,
                break_at: (0, 1),
                duplicate_oxygen: true,
                gate: SizeGate::Linear,
            },
            mark_attach_points_by_r,
            limit_by_size,
        )
    }

    /// Splits cross-linking ether bonds on the hydroxylated-carbon side.
    /// The oxygen is not duplicated.
    pub fn split_ethers_crosslinking(
        &self,
        mol: &mut Mol,
        mark_attach_points_by_r: bool,
        limit_by_size: bool,
    ) -> Result<(), Error> {
        self.apply_splits(
            mol,
            &SplitSpec {
                smarts: CROSS_LINKING_ETHER_BOND_SMARTS,
                break_at: (1, 2),
                duplicate_oxygen: false,
                gate: SizeGate::Linear,
            },
            mark_attach_points_by_r,
            limit_by_size,
        )
    }

    /// Splits plain ether bonds, duplicating the connecting oxygen.
    pub fn split_ethers(
        &self,
        mol: &mut Mol,
        mark_attach_points_by_r: bool,
        limit_by_size: bool,
    ) -> Result<(), Error> {
        self.apply_splits(
            mol,
            &SplitSpec {
                smarts: ETHER_BOND_SMARTS,
                break_at: (0, 1),
                duplicate_oxygen: true,
                gate: SizeGate::Linear,
            },
            mark_attach_points_by_r,
            limit_by_size,
        )
    }

    /// Splits peroxide O-O bonds. Nothing is duplicated.
    pub fn split_peroxides(
        &self,
        mol: &mut Mol,
        mark_attach_points_by_r: bool,
        limit_by_size: bool,
    ) -> Result<(), Error> {
        self.apply_splits(
            mol,
            &SplitSpec {
                smarts: PEROXIDE_BOND_SMARTS,
                break_at: (1, 2),
                duplicate_oxygen: false,
                gate: SizeGate::Linear,
            },
            mark_attach_points_by_r,
            limit_by_size,
        )
    }

    /// Runs the linear-sugar splits in their required order: esters,
    /// cross-linking ethers, ethers, peroxides. The order matters; the
    /// plain-ether pattern is promiscuous and would otherwise pick up
    /// esters first. A routine whose pattern fails is skipped with a
    /// warning while the rest proceed.
    pub fn split_ether_ester_and_peroxide_postprocessing(
        &self,
        mol: &mut Mol,
        mark_attach_points_by_r: bool,
        limit_by_size: bool,
    ) -> Vec<Warning> {
        type Routine<D> = fn(&SugarExtractor<D>, &mut Mol, bool, bool) -> Result<(), Error>;
        let routines: [(&'static str, Routine<D>); 4] = [
            ("ester", SugarExtractor::split_esters),
            ("cross-linking ether", SugarExtractor::split_ethers_crosslinking),
            ("ether", SugarExtractor::split_ethers),
            ("peroxide", SugarExtractor::split_peroxides),
        ];
        let mut warnings = Vec::new();
        for (routine, run) in routines {
            match run(self, mol, mark_attach_points_by_r, limit_by_size) {
                Ok(()) => {}
                Err(Error::Pattern(source)) => {
                    warnings.push(Warning::PatternSkipped { routine, source })
                }
                Err(_) => {}
            }
        }
        warnings
    }

    fn apply_splits(
        &self,
        mol: &mut Mol,
        spec: &SplitSpec,
        mark_r: bool,
        limit_by_size: bool,
    ) -> Result<(), Error> {
        if mol.is_empty() {
            return Ok(());
        }
        let query = smarts::parse(spec.smarts)?;
        let matches = smarts::matches_unique(&query, mol);
        for matched in matches {
            let near = matched[spec.break_at.0];
            let far = matched[spec.break_at.1];
            // earlier splits of this pass may have consumed the bond
            let Some(bond_to_break) = mol.bond_between(near, far) else {
                continue;
            };
            if limit_by_size && self.split_produces_too_small_fragment(mol, bond_to_break, spec.gate)
            {
                continue;
            }
            if spec.duplicate_oxygen {
                let old_oxygen = far;
                let new_oxygen = mol.add_atom(Atom::of(element::OXYGEN));
                mol.add_bond(near, new_oxygen, Bond::single());
                // carry the stereo descriptor on the carbon over to the
                // duplicate, replacing the stale element
                let position = mol.stereo_elements().iter().position(|elem| {
                    elem.focus == StereoRef::Atom(near) && elem.contains_atom(old_oxygen)
                });
                if let Some(position) = position {
                    let updated =
                        mol.stereo_elements()[position].update_carriers(old_oxygen, new_oxygen);
                    mol.stereo_elements_mut()[position] = updated;
                }
                mol.remove_bond(bond_to_break);
                for oxygen in [old_oxygen, new_oxygen] {
                    if mark_r {
                        attach_r(mol, oxygen, BondOrder::Single);
                    } else {
                        mol.atom_mut(oxygen).implicit_h_count = 1;
                    }
                }
            } else {
                mol.remove_bond(bond_to_break);
                for atom in [near, far] {
                    if mark_r {
                        attach_r(mol, atom, BondOrder::Single);
                    } else {
                        bump_implicit_h(mol.atom_mut(atom), 1);
                    }
                }
            }
        }
        Ok(())
    }

    /// Previews the split on a scratch copy and reports whether any
    /// resulting fragment falls below the gate threshold.
    fn split_produces_too_small_fragment(
        &self,
        mol: &Mol,
        bond: EdgeIndex,
        gate: SizeGate,
    ) -> bool {
        let mut probe = mol.clone();
        probe.remove_bond(bond);
        partition_into_molecules(&probe).iter().any(|fragment| match gate {
            SizeGate::Circular => self.detector().is_too_small_to_preserve(fragment),
            SizeGate::Linear => {
                fragment.atom_count() < self.detector().linear_sugar_candidate_min_size()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_ops::{connected_components, num_components};
    use crate::mol::Mol;
    use crate::rings::mark_ring_flags;
    use petgraph::graph::NodeIndex;

    /// Inert detector: never removes anything, gates at five heavy atoms
    /// and a linear minimum of four.
    struct Inert;

    impl SugarDetector for Inert {
        fn remove_circular_sugars(&self, _mol: &mut Mol) -> Result<bool, Error> {
            Ok(false)
        }

        fn remove_linear_sugars(&self, _mol: &mut Mol) -> Result<bool, Error> {
            Ok(false)
        }

        fn is_too_small_to_preserve(&self, mol: &Mol) -> bool {
            mol.atom_count() < 5
        }

        fn linear_sugar_candidate_min_size(&self) -> usize {
            4
        }

        fn detects_spiro_rings_as_circular_sugars(&self) -> bool {
            false
        }
    }

    fn splitter() -> SugarExtractor<Inert> {
        SugarExtractor::new(Inert)
    }

    fn add_carbon(mol: &mut Mol, h: u8) -> NodeIndex {
        mol.add_atom(Atom {
            implicit_h_count: h,
            ..Atom::of(6)
        })
    }

    fn add_oxygen(mol: &mut Mol, h: u8) -> NodeIndex {
        mol.add_atom(Atom {
            implicit_h_count: h,
            ..Atom::of(8)
        })
    }

    /// Butyl acetate-like ester with four-carbon chains on both sides so
    /// the linear size gate passes.
    fn ester_bridge() -> (Mol, NodeIndex, NodeIndex) {
        let mut mol = Mol::new();
        let mut left = add_carbon(&mut mol, 3);
        for _ in 0..2 {
            let next = add_carbon(&mut mol, 2);
            mol.add_bond(left, next, Bond::single());
            left = next;
        }
        let acyl = add_carbon(&mut mol, 0);
        mol.add_bond(left, acyl, Bond::single());
        let keto = add_oxygen(&mut mol, 0);
        mol.add_bond(acyl, keto, Bond::of(BondOrder::Double));
        let ester_o = add_oxygen(&mut mol, 0);
        mol.add_bond(acyl, ester_o, Bond::single());
        let mut right = add_carbon(&mut mol, 2);
        mol.add_bond(ester_o, right, Bond::single());
        for _ in 0..3 {
            let next = add_carbon(&mut mol, 2);
            mol.add_bond(right, next, Bond::single());
            right = next;
        }
        (mol, acyl, ester_o)
    }

    #[test]
    fn ester_split_duplicates_the_oxygen_on_the_acyl_side() {
        let (mut mol, acyl, ester_o) = ester_bridge();
        let before = mol.atom_count();
        splitter().split_esters(&mut mol, false, false).unwrap();
        assert_eq!(mol.atom_count(), before + 1);
        assert_eq!(num_components(&mol), 2);
        // acyl side got a fresh hydroxy oxygen
        let new_o = mol
            .neighbors(acyl)
            .find(|&n| mol.atom(n).is_oxygen() && mol.bond_between(acyl, n).map(|e| mol.bond(e).order) == Some(BondOrder::Single))
            .unwrap();
        assert_eq!(mol.atom(new_o).implicit_h_count, 1);
        // old ester oxygen stays with the alcohol side
        assert_eq!(mol.atom(ester_o).implicit_h_count, 1);
        assert!(mol.bond_between(acyl, ester_o).is_none());
    }

    #[test]
    fn ester_split_with_r_markers() {
        let (mut mol, _, _) = ester_bridge();
        let before = mol.atom_count();
        splitter().split_esters(&mut mol, true, false).unwrap();
        // new oxygen plus two R markers
        assert_eq!(mol.atom_count(), before + 3);
        assert_eq!(
            mol.atoms().filter(|&a| mol.atom(a).is_pseudo()).count(),
            2
        );
    }

    #[test]
    fn size_gate_blocks_small_fragments() {
        // methyl acetate: the methanol side is below the linear minimum
        let mut mol = Mol::new();
        let me1 = add_carbon(&mut mol, 3);
        let acyl = add_carbon(&mut mol, 0);
        mol.add_bond(me1, acyl, Bond::single());
        let keto = add_oxygen(&mut mol, 0);
        mol.add_bond(acyl, keto, Bond::of(BondOrder::Double));
        let ester_o = add_oxygen(&mut mol, 0);
        mol.add_bond(acyl, ester_o, Bond::single());
        let me2 = add_carbon(&mut mol, 3);
        mol.add_bond(ester_o, me2, Bond::single());
        let mut gated = mol.clone();
        splitter().split_esters(&mut gated, false, true).unwrap();
        assert_eq!(num_components(&gated), 1);
        splitter().split_esters(&mut mol, false, false).unwrap();
        assert_eq!(num_components(&mol), 2);
    }

    #[test]
    fn crosslinking_ether_breaks_without_duplication() {
        // CH3CH2CH2CH2-O-CH(OH)CH2CH2CH3 roughly: far carbon carries a
        // hydroxy group
        let mut mol = Mol::new();
        let mut left = add_carbon(&mut mol, 3);
        for _ in 0..3 {
            let next = add_carbon(&mut mol, 2);
            mol.add_bond(left, next, Bond::single());
            left = next;
        }
        let o = add_oxygen(&mut mol, 0);
        mol.add_bond(left, o, Bond::single());
        let hydroxylated = add_carbon(&mut mol, 1);
        mol.add_bond(o, hydroxylated, Bond::single());
        let oh = add_oxygen(&mut mol, 1);
        mol.add_bond(hydroxylated, oh, Bond::single());
        let mut tail = hydroxylated;
        for _ in 0..3 {
            let next = add_carbon(&mut mol, 2);
            mol.add_bond(tail, next, Bond::single());
            tail = next;
        }
        let before = mol.atom_count();
        splitter()
            .split_ethers_crosslinking(&mut mol, false, false)
            .unwrap();
        // bond only; no atom added
        assert_eq!(mol.atom_count(), before);
        assert_eq!(num_components(&mol), 2);
        assert!(mol.bond_between(o, hydroxylated).is_none());
        assert_eq!(mol.atom(o).implicit_h_count, 1);
        assert_eq!(mol.atom(hydroxylated).implicit_h_count, 2);
    }

    #[test]
    fn peroxide_split_keeps_both_oxygens() {
        let mut mol = Mol::new();
        let mut left = add_carbon(&mut mol, 3);
        for _ in 0..2 {
            let next = add_carbon(&mut mol, 2);
            mol.add_bond(left, next, Bond::single());
            left = next;
        }
        let o1 = add_oxygen(&mut mol, 0);
        let o2 = add_oxygen(&mut mol, 0);
        mol.add_bond(left, o1, Bond::single());
        mol.add_bond(o1, o2, Bond::single());
        let mut right = add_carbon(&mut mol, 2);
        mol.add_bond(o2, right, Bond::single());
        for _ in 0..2 {
            let next = add_carbon(&mut mol, 2);
            mol.add_bond(right, next, Bond::single());
            right = next;
        }
        let before = mol.atom_count();
        splitter().split_peroxides(&mut mol, false, false).unwrap();
        assert_eq!(mol.atom_count(), before);
        assert_eq!(num_components(&mol), 2);
        assert!(mol.bond_between(o1, o2).is_none());
        assert_eq!(mol.atom(o1).implicit_h_count, 1);
        assert_eq!(mol.atom(o2).implicit_h_count, 1);
    }

    #[test]
    fn o_glycosidic_split_requires_ring_context() {
        // tetrahydropyran carbon - O - methyl: in-ring carbon of degree 3
        let mut mol = Mol::new();
        let ring_o = add_oxygen(&mut mol, 0);
        let mut ring = vec![ring_o];
        let mut prev = ring_o;
        for _ in 0..5 {
            let c = add_carbon(&mut mol, 2);
            mol.add_bond(prev, c, Bond::single());
            ring.push(c);
            prev = c;
        }
        mol.add_bond(prev, ring_o, Bond::single());
        let anomeric = ring[1];
        let glyc_o = add_oxygen(&mut mol, 0);
        mol.add_bond(anomeric, glyc_o, Bond::single());
        let methyl = add_carbon(&mut mol, 3);
        mol.add_bond(glyc_o, methyl, Bond::single());
        mark_ring_flags(&mut mol);

        // gated: the methanol fragment is below the preservation threshold
        let mut gated = mol.clone();
        splitter()
            .split_o_glycosidic_bonds(&mut gated, false, true)
            .unwrap();
        assert_eq!(num_components(&gated), 1);

        splitter()
            .split_o_glycosidic_bonds(&mut mol, false, false)
            .unwrap();
        assert_eq!(num_components(&mol), 2);
        // the ring kept a duplicated hydroxy oxygen
        let new_o = mol
            .neighbors(anomeric)
            .find(|&n| mol.atom(n).is_oxygen() && n != ring_o)
            .unwrap();
        assert_eq!(mol.atom(new_o).implicit_h_count, 1);
        let comps = connected_components(&mol);
        assert!(comps.iter().any(|c| c.contains(&glyc_o) && c.contains(&methyl)));
    }

    #[test]
    fn aggregate_postprocessing_is_idempotent() {
        let (mut mol, _, _) = ester_bridge();
        let warnings = splitter().split_ether_ester_and_peroxide_postprocessing(&mut mol, false, false);
        assert!(warnings.is_empty());
        let after_first = (mol.atom_count(), mol.bond_count(), num_components(&mol));
        let warnings = splitter().split_ether_ester_and_peroxide_postprocessing(&mut mol, false, false);
        assert!(warnings.is_empty());
        let after_second = (mol.atom_count(), mol.bond_count(), num_components(&mol));
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn no_matches_leave_the_molecule_untouched() {
        let mut mol = Mol::new();
        let a = add_carbon(&mut mol, 3);
        let b = add_carbon(&mut mol, 3);
        mol.add_bond(a, b, Bond::single());
        let before = mol.atom_count();
        let warnings =
            splitter().split_ether_ester_and_peroxide_postprocessing(&mut mol, false, true);
        assert!(warnings.is_empty());
        assert_eq!(mol.atom_count(), before);
        assert_eq!(mol.bond_count(), 1);
    }

    #[test]
    fn empty_molecule_is_a_no_op() {
        let mut mol = Mol::new();
        splitter().split_esters(&mut mol, false, true).unwrap();
        splitter()
            .split_o_glycosidic_bonds(&mut mol, true, true)
            .unwrap();
        assert!(mol.is_empty());
    }
}
