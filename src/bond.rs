/// Bond order of a connection in the molecular graph.
///
/// `Unset` covers bonds read from sources that did not assign an order;
/// their numeric weight is zero, so they contribute nothing to valence
/// accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Quadruple,
    Unset,
}

impl BondOrder {
    /// Integer weight used for valence bookkeeping.
    pub fn numeric(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
            Self::Quadruple => 4,
            Self::Unset => 0,
        }
    }
}

/// Wedge/hash style stereo annotation on a bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondStereo {
    #[default]
    None,
    Up,
    Down,
    UpOrDown,
}

/// How a bond is drawn. `Crossed` marks double bonds of undefined geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondDisplay {
    #[default]
    Solid,
    Crossed,
}

/// Bond of a molecular graph. Endpoints live in the owning container; a
/// bond is identified by its unordered endpoint pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub order: BondOrder,
    pub is_aromatic: bool,
    pub stereo: BondStereo,
    pub display: BondDisplay,
    /// Ring membership flag. Perception input, consumed by the SMARTS
    /// ring primitives and the detector.
    pub is_in_ring: bool,
}

impl Bond {
    pub fn single() -> Self {
        Self::default()
    }

    pub fn of(order: BondOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }
}

impl Default for Bond {
    fn default() -> Self {
        Self {
            order: BondOrder::Single,
            is_aromatic: false,
            stereo: BondStereo::None,
            display: BondDisplay::Solid,
            is_in_ring: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_weights() {
        assert_eq!(BondOrder::Single.numeric(), 1);
        assert_eq!(BondOrder::Double.numeric(), 2);
        assert_eq!(BondOrder::Triple.numeric(), 3);
        assert_eq!(BondOrder::Quadruple.numeric(), 4);
        assert_eq!(BondOrder::Unset.numeric(), 0);
    }

    #[test]
    fn default_bond_is_plain_single() {
        let b = Bond::default();
        assert_eq!(b.order, BondOrder::Single);
        assert!(!b.is_aromatic);
        assert!(!b.is_in_ring);
        assert_eq!(b.stereo, BondStereo::None);
        assert_eq!(b.display, BondDisplay::Solid);
    }
}
