use crate::element;

/// Atom of a molecular graph.
///
/// `Atom` stores the intrinsic properties the extraction engine works with.
/// Computed chemistry (atom types, isotope data, partial charges) is
/// deliberately not modelled; callers that need it re-perceive after
/// copying, the same way they would after any other graph surgery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atom {
    /// Atomic number (1 = H, 6 = C, 8 = O, …). `0` marks a pseudo atom.
    pub atomic_num: u8,
    /// Formal charge in elementary charge units.
    pub formal_charge: i8,
    /// Number of suppressed hydrogens implied on this atom. These are not
    /// graph nodes; saturation after bond breaking adjusts this count.
    pub implicit_h_count: u8,
    /// Whether this atom is part of an aromatic system. Perception input,
    /// never recomputed here.
    pub is_aromatic: bool,
    /// Total valence if it has been perceived upstream.
    pub valence: Option<u8>,
    /// Marks a spiro junction between a sugar ring and another ring. The
    /// detector stamps this; the extractor duplicates flagged atoms into
    /// both output copies.
    pub is_spiro: bool,
    /// Attachment-point number of a pseudo "R" atom, `None` for real atoms.
    pub attach_point: Option<u8>,
    /// Optional 2D depiction coordinates.
    pub position_2d: Option<[f64; 2]>,
    /// Optional 3D coordinates.
    pub position_3d: Option<[f64; 3]>,
}

impl Atom {
    /// A neutral atom of the given element with no implicit hydrogens.
    pub fn of(atomic_num: u8) -> Self {
        Self {
            atomic_num,
            ..Self::default()
        }
    }

    /// A pseudo "R" attachment marker: wildcard element, attach point 1,
    /// zero implicit hydrogens.
    pub fn r() -> Self {
        Self {
            atomic_num: element::WILDCARD,
            attach_point: Some(1),
            ..Self::default()
        }
    }

    pub fn is_carbon(&self) -> bool {
        self.atomic_num == element::CARBON
    }

    pub fn is_oxygen(&self) -> bool {
        self.atomic_num == element::OXYGEN
    }

    /// Pseudo (R) atoms have the wildcard atomic number or an attachment
    /// point set.
    pub fn is_pseudo(&self) -> bool {
        self.atomic_num == element::WILDCARD || self.attach_point.is_some()
    }

    /// A hetero atom is neither hydrogen nor carbon nor a pseudo atom.
    pub fn is_hetero(&self) -> bool {
        !self.is_pseudo()
            && self.atomic_num != element::HYDROGEN
            && self.atomic_num != element::CARBON
    }

    pub fn symbol(&self) -> &'static str {
        if self.is_pseudo() {
            "R"
        } else {
            element::symbol(self.atomic_num)
        }
    }
}
