//! Stereo descriptors attached to a molecular graph.
//!
//! A stereo element names a focus (the stereocenter atom, or the central
//! bond of a double-bond geometry) and an ordered list of carriers whose
//! arrangement encodes the configuration. Elements reference graph handles;
//! re-homing an element into a graph copy is plain index substitution.

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::mapping::{AtomMap, BondMap};

/// A reference a stereo element holds: an atom or a bond of its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StereoRef {
    Atom(NodeIndex),
    Bond(EdgeIndex),
}

/// Configuration label.
///
/// `Left`/`Right` are the two tetrahedral arrangements, `Together`/
/// `Opposite` the two double-bond geometries (cis and trans).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StereoConfig {
    Left,
    Right,
    Together,
    Opposite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StereoElement {
    pub focus: StereoRef,
    pub carriers: Vec<StereoRef>,
    pub config: StereoConfig,
}

impl StereoElement {
    pub fn new(focus: StereoRef, carriers: Vec<StereoRef>, config: StereoConfig) -> Self {
        Self {
            focus,
            carriers,
            config,
        }
    }

    /// Tetrahedral center with four atom carriers.
    pub fn tetrahedral(focus: NodeIndex, carriers: [NodeIndex; 4], config: StereoConfig) -> Self {
        Self {
            focus: StereoRef::Atom(focus),
            carriers: carriers.iter().map(|&c| StereoRef::Atom(c)).collect(),
            config,
        }
    }

    /// Whether the focus or any carrier references the given atom.
    pub fn contains_atom(&self, atom: NodeIndex) -> bool {
        self.refs().any(|r| r == StereoRef::Atom(atom))
    }

    /// Whether the focus or any carrier references the given bond.
    pub fn references_bond(&self, bond: EdgeIndex) -> bool {
        self.refs().any(|r| r == StereoRef::Bond(bond))
    }

    fn refs(&self) -> impl Iterator<Item = StereoRef> + '_ {
        std::iter::once(self.focus).chain(self.carriers.iter().copied())
    }

    /// Re-homes this element through the given maps. Returns `None` when
    /// the focus or any carrier has no image, in which case the element
    /// cannot be carried over to the copy.
    pub fn map(&self, atoms: &AtomMap, bonds: &BondMap) -> Option<Self> {
        let map_ref = |r: StereoRef| -> Option<StereoRef> {
            match r {
                StereoRef::Atom(a) => atoms.get(a).map(StereoRef::Atom),
                StereoRef::Bond(b) => bonds.get(b).map(StereoRef::Bond),
            }
        };
        let focus = map_ref(self.focus)?;
        let carriers = self
            .carriers
            .iter()
            .map(|&c| map_ref(c))
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            focus,
            carriers,
            config: self.config,
        })
    }

    /// A copy of this element with the single atom carrier `old` replaced
    /// by `new`. The focus and other carriers are untouched.
    pub fn update_carriers(&self, old: NodeIndex, new: NodeIndex) -> Self {
        let carriers = self
            .carriers
            .iter()
            .map(|&c| {
                if c == StereoRef::Atom(old) {
                    StereoRef::Atom(new)
                } else {
                    c
                }
            })
            .collect();
        Self {
            focus: self.focus,
            carriers,
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    #[test]
    fn contains_checks_focus_and_carriers() {
        let elem = StereoElement::tetrahedral(n(0), [n(1), n(2), n(3), n(4)], StereoConfig::Left);
        assert!(elem.contains_atom(n(0)));
        assert!(elem.contains_atom(n(3)));
        assert!(!elem.contains_atom(n(9)));
        assert!(!elem.references_bond(EdgeIndex::new(0)));
    }

    #[test]
    fn map_substitutes_all_refs() {
        let elem = StereoElement::tetrahedral(n(0), [n(1), n(2), n(3), n(4)], StereoConfig::Right);
        let mut atoms = AtomMap::new();
        for i in 0..5 {
            atoms.insert(n(i), n(i + 10));
        }
        let mapped = elem.map(&atoms, &BondMap::new()).unwrap();
        assert_eq!(mapped.focus, StereoRef::Atom(n(10)));
        assert_eq!(mapped.carriers[2], StereoRef::Atom(n(13)));
        assert_eq!(mapped.config, StereoConfig::Right);
    }

    #[test]
    fn map_fails_on_missing_referent() {
        let elem = StereoElement::tetrahedral(n(0), [n(1), n(2), n(3), n(4)], StereoConfig::Left);
        let mut atoms = AtomMap::new();
        for i in 0..4 {
            atoms.insert(n(i), n(i));
        }
        // carrier 4 has no image
        assert_eq!(elem.map(&atoms, &BondMap::new()), None);
    }

    #[test]
    fn update_carriers_swaps_one_atom() {
        let elem = StereoElement::tetrahedral(n(0), [n(1), n(2), n(3), n(4)], StereoConfig::Left);
        let updated = elem.update_carriers(n(2), n(7));
        assert_eq!(updated.carriers[1], StereoRef::Atom(n(7)));
        assert_eq!(updated.carriers[0], StereoRef::Atom(n(1)));
        assert_eq!(updated.focus, StereoRef::Atom(n(0)));
    }

    #[test]
    fn bond_focus_maps_through_bond_map() {
        let elem = StereoElement::new(
            StereoRef::Bond(EdgeIndex::new(2)),
            vec![StereoRef::Bond(EdgeIndex::new(0)), StereoRef::Bond(EdgeIndex::new(1))],
            StereoConfig::Opposite,
        );
        let mut bonds = BondMap::new();
        for i in 0..3 {
            bonds.insert(EdgeIndex::new(i), EdgeIndex::new(i + 5));
        }
        let mapped = elem.map(&AtomMap::new(), &bonds).unwrap();
        assert_eq!(mapped.focus, StereoRef::Bond(EdgeIndex::new(7)));
    }
}
