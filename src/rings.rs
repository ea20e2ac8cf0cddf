//! Small-ring perception for sugar-ring classification.
//!
//! For every bond, the shortest cycle through that bond is computed by
//! dropping the bond and running a BFS between its endpoints. Deduplicated,
//! this yields every ring a furanose/pyranose classifier cares about
//! without the full relevant-cycles machinery.

use std::collections::VecDeque;

use petgraph::graph::NodeIndex;

use crate::mol::Mol;

#[derive(Debug, Clone, Default)]
pub struct RingInfo {
    rings: Vec<Vec<NodeIndex>>,
}

impl RingInfo {
    /// Perceives the smallest ring through each ring bond.
    pub fn perceive(mol: &Mol) -> Self {
        let mut rings: Vec<Vec<NodeIndex>> = Vec::new();
        for edge in mol.bonds() {
            let (u, v) = match mol.bond_endpoints(edge) {
                Some(pair) => pair,
                None => continue,
            };
            if let Some(path) = shortest_path_avoiding(mol, u, v, edge) {
                let ring = normalize_ring(&path);
                if !rings.contains(&ring) {
                    rings.push(ring);
                }
            }
        }
        rings.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        Self { rings }
    }

    pub fn rings(&self) -> &[Vec<NodeIndex>] {
        &self.rings
    }

    pub fn num_rings(&self) -> usize {
        self.rings.len()
    }

    pub fn is_ring_atom(&self, atom: NodeIndex) -> bool {
        self.rings.iter().any(|ring| ring.contains(&atom))
    }

    /// Rings other than `ring_idx` that share at least one atom with it.
    pub fn neighbors_of_ring(&self, ring_idx: usize) -> Vec<usize> {
        let ring = &self.rings[ring_idx];
        self.rings
            .iter()
            .enumerate()
            .filter(|&(i, other)| i != ring_idx && other.iter().any(|a| ring.contains(a)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Atoms shared between two perceived rings.
    pub fn shared_atoms(&self, a: usize, b: usize) -> Vec<NodeIndex> {
        self.rings[a]
            .iter()
            .filter(|atom| self.rings[b].contains(atom))
            .copied()
            .collect()
    }
}

/// Sets the in-ring flag on every bond that lies on a perceived ring.
/// Other bond flags are left alone.
pub fn mark_ring_flags(mol: &mut Mol) {
    let info = RingInfo::perceive(mol);
    let mut ring_bonds = Vec::new();
    for ring in info.rings() {
        let len = ring.len();
        for i in 0..len {
            let a = ring[i];
            let b = ring[(i + 1) % len];
            if let Some(edge) = mol.bond_between(a, b) {
                ring_bonds.push(edge);
            }
        }
    }
    for edge in ring_bonds {
        mol.bond_mut(edge).is_in_ring = true;
    }
}

fn shortest_path_avoiding(
    mol: &Mol,
    from: NodeIndex,
    to: NodeIndex,
    avoid: petgraph::graph::EdgeIndex,
) -> Option<Vec<NodeIndex>> {
    let bound = mol.atom_index_bound();
    let mut pred: Vec<Option<NodeIndex>> = vec![None; bound];
    let mut visited = vec![false; bound];
    visited[from.index()] = true;
    let mut queue = VecDeque::new();
    queue.push_back(from);
    while let Some(current) = queue.pop_front() {
        for edge in mol.bonds_of(current) {
            if edge == avoid {
                continue;
            }
            let neighbor = match mol.bond_other(edge, current) {
                Some(n) => n,
                None => continue,
            };
            if visited[neighbor.index()] {
                continue;
            }
            visited[neighbor.index()] = true;
            pred[neighbor.index()] = Some(current);
            if neighbor == to {
                let mut path = vec![to];
                let mut node = to;
                while let Some(p) = pred[node.index()] {
                    path.push(p);
                    node = p;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(neighbor);
        }
    }
    None
}

/// Rotates the ring so the smallest handle leads and picks the direction
/// with the smaller second element, giving each cycle one canonical form.
fn normalize_ring(ring: &[NodeIndex]) -> Vec<NodeIndex> {
    let len = ring.len();
    let min_pos = ring
        .iter()
        .enumerate()
        .min_by_key(|&(_, n)| n)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let forward: Vec<NodeIndex> = (0..len).map(|i| ring[(min_pos + i) % len]).collect();
    let backward: Vec<NodeIndex> = (0..len)
        .map(|i| ring[(min_pos + len - i) % len])
        .collect();
    if forward[1..] <= backward[1..] {
        forward
    } else {
        backward
    }
}
