use std::collections::VecDeque;

use petgraph::graph::NodeIndex;

use crate::mol::Mol;

/// Connected components as sorted atom-handle lists, in discovery order.
pub fn connected_components(mol: &Mol) -> Vec<Vec<NodeIndex>> {
    let bound = mol.atom_index_bound();
    let mut visited = vec![false; bound];
    let mut components = Vec::new();
    for node in mol.atoms() {
        if visited[node.index()] {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::new();
        visited[node.index()] = true;
        queue.push_back(node);
        while let Some(current) = queue.pop_front() {
            component.push(current);
            for neighbor in mol.neighbors(current) {
                if !visited[neighbor.index()] {
                    visited[neighbor.index()] = true;
                    queue.push_back(neighbor);
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components
}

pub fn num_components(mol: &Mol) -> usize {
    connected_components(mol).len()
}

/// An empty molecule counts as connected.
pub fn is_connected(mol: &Mol) -> bool {
    num_components(mol) <= 1
}

/// Splits a molecule into one container per connected component.
///
/// Each component is produced by cloning the input and deleting everything
/// outside the component, so surviving atoms and bonds keep the handles
/// they had in the input. Handle-based bookkeeping (the extraction maps)
/// therefore remains valid for every returned fragment.
pub fn partition_into_molecules(mol: &Mol) -> Vec<Mol> {
    let components = connected_components(mol);
    if components.len() <= 1 {
        return vec![mol.clone()];
    }
    let mut fragments = Vec::with_capacity(components.len());
    for component in &components {
        let mut fragment = mol.clone();
        let keep: Vec<bool> = {
            let mut flags = vec![false; mol.atom_index_bound()];
            for &idx in component {
                flags[idx.index()] = true;
            }
            flags
        };
        let to_remove: Vec<NodeIndex> = mol
            .atoms()
            .filter(|idx| !keep[idx.index()])
            .collect();
        for idx in to_remove {
            fragment.remove_atom(idx);
        }
        fragments.push(fragment);
    }
    fragments
}
