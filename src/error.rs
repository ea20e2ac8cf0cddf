use thiserror::Error;

use crate::smarts::SmartsError;

/// Failures that abort a call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed input: references crossing containers, empty input where
    /// disallowed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The sugar detector reported an unrecoverable internal error.
    #[error("sugar detector failed: {0}")]
    Detector(String),
    /// A SMARTS pattern could not be compiled or executed.
    #[error("pattern match failed: {0}")]
    Pattern(#[from] SmartsError),
}

/// Diagnostics collected during extraction and returned beside the
/// fragments. The procedure keeps going after any of these; callers decide
/// whether a partial result is acceptable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Warning {
    /// Sugar removal reported success but no bond between the two copies
    /// was actually broken; the detector output is inconsistent with the
    /// extractor's assumptions.
    #[error("no broken bonds found between aglycone and sugars, no saturation performed")]
    NoBrokenBonds,
    /// An endpoint of a broken bond is present in neither copy; it was not
    /// saturated.
    #[error("bond atom found in neither aglycone nor sugars")]
    BondAtomInNeitherCopy,
    /// The hetero atom of a broken carbon-hetero bond is present in
    /// neither copy; it was not duplicated.
    #[error("hetero atom found in neither aglycone nor sugars")]
    HeteroAtomInNeitherCopy,
    /// A broken carbon-hetero bond could not be oriented.
    #[error("broken carbon-hetero bond could not be assigned")]
    UnassignableBrokenBond,
    /// The reverse lookup for a carboxy transfer failed; the group was left
    /// on the aglycone.
    #[error("could not locate original atoms for carboxy transfer")]
    CarboxyOriginalsNotFound,
    /// A splitter routine was skipped because its pattern failed.
    #[error("skipped {routine} splitting: {source}")]
    PatternSkipped {
        routine: &'static str,
        source: SmartsError,
    },
}
