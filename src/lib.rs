//! Sugar detection and extraction for molecular graphs.
//!
//! Given a molecule, [`SugarExtractor`] partitions it into a non-sugar
//! aglycone and its sugar moieties: two independent copies are made, a
//! [`SugarDetector`] strips the sugars from one, the other is reduced to
//! the complement, and the seam between them is repaired so both sides
//! stay chemically valid. Callers get the fragments, index maps back to
//! the input for highlighting or atom-mapped output, and any diagnostics
//! the run produced.

pub mod atom;
pub mod bond;
pub mod copy;
pub mod detect;
pub mod element;
pub mod error;
pub mod extract;
pub mod graph_ops;
pub mod mapping;
pub mod mol;
pub mod rings;
pub mod smarts;
pub mod split;
pub mod stereo;

pub use atom::Atom;
pub use bond::{Bond, BondDisplay, BondOrder, BondStereo};
pub use copy::deeper_copy;
pub use detect::{DefaultDetector, DetectorSettings, PreservationMode, SugarDetector};
pub use error::{Error, Warning};
pub use extract::{
    atom_indices_of_group, bond_indices_of_group, group_indices_for_all_atoms, ExtractOptions,
    Extraction, SugarExtractor,
};
pub use mapping::{AtomMap, BondMap};
pub use mol::Mol;
pub use stereo::{StereoConfig, StereoElement, StereoRef};
