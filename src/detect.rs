//! Sugar pattern detection.
//!
//! The extractor talks to a [`SugarDetector`], a capability interface for
//! "remove the sugar moieties from this molecule in place and tell me
//! whether anything went". [`DefaultDetector`] implements the contract:
//! ring candidates are classified by composition and exocyclic oxygen
//! decoration, linear candidates by oxygen-bearing acyclic carbon chains,
//! and both respect the terminal-only policy and preservation thresholds.

use petgraph::graph::NodeIndex;

use crate::element;
use crate::error::Error;
use crate::graph_ops::connected_components;
use crate::mol::Mol;
use crate::rings::RingInfo;

/// How fragment size is measured against the preservation threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreservationMode {
    /// Count atoms that are neither hydrogen nor pseudo atoms.
    HeavyAtomCount,
    /// Sum average atomic weights, implicit hydrogens included.
    MolecularWeight,
}

/// Detector configuration. Intended to be set once at construction and
/// treated as read-only during extraction.
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// Only remove sugars whose removal keeps the remainder connected.
    pub remove_only_terminal_sugars: bool,
    pub preservation_mode: PreservationMode,
    /// Fragments measuring below this are not worth preserving. Heavy-atom
    /// count or weight units depending on the mode.
    pub preservation_threshold: u32,
    pub detect_spiro_rings_as_circular_sugars: bool,
    /// Minimum number of carbons in a linear sugar candidate.
    pub linear_sugar_candidate_min_size: usize,
    /// Maximum number of carbons in a linear sugar candidate.
    pub linear_sugar_candidate_max_size: usize,
    /// Minimum ratio of exocyclic oxygen neighbours to ring size for a ring
    /// to classify as a circular sugar.
    pub exocyclic_oxygen_ratio_threshold: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            remove_only_terminal_sugars: true,
            preservation_mode: PreservationMode::HeavyAtomCount,
            preservation_threshold: 5,
            detect_spiro_rings_as_circular_sugars: false,
            linear_sugar_candidate_min_size: 4,
            linear_sugar_candidate_max_size: 7,
            exocyclic_oxygen_ratio_threshold: 0.5,
        }
    }
}

/// Sugar detection and removal capability consumed by the extractor.
///
/// Implementations mutate the given molecule in place and report whether
/// any atom was removed. They must be deterministic; failures bubble as
/// [`Error`].
pub trait SugarDetector {
    fn remove_circular_sugars(&self, mol: &mut Mol) -> Result<bool, Error>;

    fn remove_linear_sugars(&self, mol: &mut Mol) -> Result<bool, Error>;

    fn remove_circular_and_linear_sugars(&self, mol: &mut Mol) -> Result<bool, Error> {
        let circular = self.remove_circular_sugars(mol)?;
        let linear = self.remove_linear_sugars(mol)?;
        Ok(circular || linear)
    }

    /// Size gate consulted for circular-sugar fragments.
    fn is_too_small_to_preserve(&self, mol: &Mol) -> bool;

    /// Size gate consulted for linear-sugar fragments.
    fn linear_sugar_candidate_min_size(&self) -> usize;

    /// Whether spiro junction atoms of sugar rings get the spiro marker
    /// and are kept on both sides by the extractor.
    fn detects_spiro_rings_as_circular_sugars(&self) -> bool;
}

/// A sugar moiety slated for removal.
struct Candidate {
    removal: Vec<NodeIndex>,
    spiro_atoms: Vec<NodeIndex>,
}

#[derive(Debug, Clone, Default)]
pub struct DefaultDetector {
    settings: DetectorSettings,
}

impl DefaultDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    fn is_fragment_too_small<I>(&self, mol: &Mol, atoms: I) -> bool
    where
        I: Iterator<Item = NodeIndex>,
    {
        match self.settings.preservation_mode {
            PreservationMode::HeavyAtomCount => {
                let heavy = atoms
                    .filter(|&a| {
                        let atom = mol.atom(a);
                        !atom.is_pseudo() && atom.atomic_num != element::HYDROGEN
                    })
                    .count();
                heavy < self.settings.preservation_threshold as usize
            }
            PreservationMode::MolecularWeight => {
                let weight: f64 = atoms
                    .map(|a| {
                        let atom = mol.atom(a);
                        element::average_weight(atom.atomic_num)
                            + atom.implicit_h_count as f64
                                * element::average_weight(element::HYDROGEN)
                    })
                    .sum();
                weight < self.settings.preservation_threshold as f64
            }
        }
    }

    /// Rings that classify as circular sugars, with their removal sets.
    fn circular_candidates(&self, mol: &Mol) -> Vec<Candidate> {
        let info = RingInfo::perceive(mol);
        let mut candidates = Vec::new();
        'rings: for (i, ring) in info.rings().iter().enumerate() {
            if !(5..=7).contains(&ring.len()) {
                continue;
            }
            let mut ring_oxygens = 0;
            for &a in ring {
                let atom = mol.atom(a);
                if atom.formal_charge != 0 {
                    continue 'rings;
                }
                if atom.is_oxygen() {
                    ring_oxygens += 1;
                } else if !atom.is_carbon() || atom.is_aromatic {
                    continue 'rings;
                }
            }
            if ring_oxygens != 1 {
                continue;
            }
            let mut spiro_atoms: Vec<NodeIndex> = Vec::new();
            for j in info.neighbors_of_ring(i) {
                let shared = info.shared_atoms(i, j);
                if shared.len() >= 2 {
                    // fused to another ring
                    continue 'rings;
                }
                if shared.len() == 1 {
                    if !self.settings.detect_spiro_rings_as_circular_sugars {
                        continue 'rings;
                    }
                    if !spiro_atoms.contains(&shared[0]) {
                        spiro_atoms.push(shared[0]);
                    }
                }
            }
            let exocyclic_oxygens = ring
                .iter()
                .flat_map(|&a| mol.neighbors(a))
                .filter(|n| !ring.contains(n) && mol.atom(*n).is_oxygen())
                .count();
            let required = self.settings.exocyclic_oxygen_ratio_threshold * ring.len() as f64;
            if (exocyclic_oxygens as f64) < required {
                continue;
            }
            let mut removal: Vec<NodeIndex> = ring
                .iter()
                .copied()
                .filter(|a| !spiro_atoms.contains(a))
                .collect();
            for &a in ring {
                for n in mol.neighbors(a) {
                    if !ring.contains(&n)
                        && mol.atom(n).is_oxygen()
                        && mol.connected_bonds_count(n) == 1
                        && !removal.contains(&n)
                    {
                        removal.push(n);
                    }
                }
            }
            candidates.push(Candidate {
                removal,
                spiro_atoms,
            });
        }
        candidates
    }

    /// Acyclic oxygen-decorated carbon chains, with their removal sets.
    fn linear_candidates(&self, mol: &Mol) -> Vec<Candidate> {
        let info = RingInfo::perceive(mol);
        let eligible = |idx: NodeIndex| {
            let atom = mol.atom(idx);
            atom.is_carbon()
                && !atom.is_aromatic
                && atom.formal_charge == 0
                && !info.is_ring_atom(idx)
        };
        let bound = mol.atom_index_bound();
        let mut visited = vec![false; bound];
        let mut candidates = Vec::new();
        for start in mol.atoms() {
            if visited[start.index()] || !eligible(start) {
                continue;
            }
            let mut chain = Vec::new();
            let mut stack = vec![start];
            visited[start.index()] = true;
            while let Some(current) = stack.pop() {
                chain.push(current);
                for n in mol.neighbors(current) {
                    if !visited[n.index()] && eligible(n) {
                        visited[n.index()] = true;
                        stack.push(n);
                    }
                }
            }
            let len = chain.len();
            if len < self.settings.linear_sugar_candidate_min_size
                || len > self.settings.linear_sugar_candidate_max_size
            {
                continue;
            }
            let oxygen_bearing = chain
                .iter()
                .filter(|&&c| mol.neighbors(c).any(|n| mol.atom(n).is_oxygen()))
                .count();
            if oxygen_bearing * 2 <= len {
                continue;
            }
            let mut removal = chain.clone();
            for &c in &chain {
                for n in mol.neighbors(c) {
                    if mol.atom(n).is_oxygen()
                        && mol.connected_bonds_count(n) == 1
                        && !removal.contains(&n)
                    {
                        removal.push(n);
                    }
                }
            }
            candidates.push(Candidate {
                removal,
                spiro_atoms: Vec::new(),
            });
        }
        candidates
    }

    /// A candidate is terminal when at most one worthwhile component
    /// remains after its removal set is deleted and too-small leftovers
    /// are discounted.
    fn is_terminal(&self, mol: &Mol, candidate: &Candidate) -> bool {
        let mut probe = mol.clone();
        for &a in &candidate.removal {
            if probe.contains_atom(a) {
                probe.remove_atom(a);
            }
        }
        let surviving = connected_components(&probe)
            .into_iter()
            .filter(|comp| !self.is_fragment_too_small(&probe, comp.iter().copied()))
            .count();
        surviving <= 1
    }

    fn apply_removal(&self, mol: &mut Mol, candidate: &Candidate) {
        for &s in &candidate.spiro_atoms {
            mol.atom_mut(s).is_spiro = true;
        }
        for &a in &candidate.removal {
            if mol.contains_atom(a) {
                mol.remove_atom(a);
            }
        }
    }

    /// Discards disconnected leftovers below the preservation threshold.
    /// They end up on the sugar side of an extraction.
    fn cleanup_too_small(&self, mol: &mut Mol) {
        let doomed: Vec<NodeIndex> = connected_components(mol)
            .into_iter()
            .filter(|comp| self.is_fragment_too_small(mol, comp.iter().copied()))
            .flatten()
            .collect();
        for a in doomed {
            mol.remove_atom(a);
        }
    }

    fn remove_candidates<F>(&self, mol: &mut Mol, compute: F) -> bool
    where
        F: Fn(&Self, &Mol) -> Vec<Candidate>,
    {
        let mut removed_any = false;
        if self.settings.remove_only_terminal_sugars {
            loop {
                let candidates = compute(self, mol);
                let Some(candidate) = candidates
                    .into_iter()
                    .find(|c| !c.removal.is_empty() && self.is_terminal(mol, c))
                else {
                    break;
                };
                self.apply_removal(mol, &candidate);
                self.cleanup_too_small(mol);
                removed_any = true;
            }
        } else {
            let candidates = compute(self, mol);
            for candidate in &candidates {
                if candidate.removal.is_empty() {
                    continue;
                }
                self.apply_removal(mol, candidate);
                removed_any = true;
            }
            if removed_any {
                self.cleanup_too_small(mol);
            }
        }
        removed_any
    }
}

impl SugarDetector for DefaultDetector {
    fn remove_circular_sugars(&self, mol: &mut Mol) -> Result<bool, Error> {
        Ok(self.remove_candidates(mol, Self::circular_candidates))
    }

    fn remove_linear_sugars(&self, mol: &mut Mol) -> Result<bool, Error> {
        Ok(self.remove_candidates(mol, Self::linear_candidates))
    }

    fn is_too_small_to_preserve(&self, mol: &Mol) -> bool {
        self.is_fragment_too_small(mol, mol.atoms())
    }

    fn linear_sugar_candidate_min_size(&self) -> usize {
        self.settings.linear_sugar_candidate_min_size
    }

    fn detects_spiro_rings_as_circular_sugars(&self) -> bool {
        self.settings.detect_spiro_rings_as_circular_sugars
    }
}
