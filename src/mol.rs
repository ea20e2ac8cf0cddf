use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableUnGraph;
use petgraph::visit::EdgeRef;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::stereo::StereoElement;

/// Molecular graph container.
///
/// Atoms and bonds live in a stable undirected graph: handles of surviving
/// entities never change when others are removed. Extraction leans on this;
/// the original-to-copy maps index by handle and must stay valid across
/// heavy graph surgery. Stereo elements, lone pairs, and single electrons
/// ride along and are pruned automatically when a referenced atom or bond
/// goes away.
#[derive(Clone, Default)]
pub struct Mol {
    graph: StableUnGraph<Atom, Bond>,
    stereo: Vec<StereoElement>,
    lone_pairs: Vec<NodeIndex>,
    single_electrons: Vec<NodeIndex>,
}

impl Mol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn atom(&self, idx: NodeIndex) -> &Atom {
        &self.graph[idx]
    }

    pub fn atom_mut(&mut self, idx: NodeIndex) -> &mut Atom {
        &mut self.graph[idx]
    }

    pub fn bond(&self, idx: EdgeIndex) -> &Bond {
        &self.graph[idx]
    }

    pub fn bond_mut(&mut self, idx: EdgeIndex) -> &mut Bond {
        &mut self.graph[idx]
    }

    pub fn add_atom(&mut self, atom: Atom) -> NodeIndex {
        self.graph.add_node(atom)
    }

    /// Adds a bond between two existing atoms. A pair of atoms may carry at
    /// most one bond.
    pub fn add_bond(&mut self, a: NodeIndex, b: NodeIndex, bond: Bond) -> EdgeIndex {
        debug_assert!(
            self.graph.find_edge(a, b).is_none(),
            "duplicate bond between {a:?} and {b:?}"
        );
        self.graph.add_edge(a, b, bond)
    }

    /// Removes an atom together with its incident bonds, any stereo element
    /// referencing the atom or one of those bonds, and its lone-pair and
    /// single-electron entries.
    pub fn remove_atom(&mut self, idx: NodeIndex) -> Atom {
        let incident: Vec<EdgeIndex> = self.bonds_of(idx).collect();
        self.stereo.retain(|elem| {
            !elem.contains_atom(idx) && !incident.iter().any(|&e| elem.references_bond(e))
        });
        self.lone_pairs.retain(|&a| a != idx);
        self.single_electrons.retain(|&a| a != idx);
        self.graph
            .remove_node(idx)
            .expect("atom index out of bounds")
    }

    /// Removes a bond and any stereo element referencing it. The endpoint
    /// atoms stay.
    pub fn remove_bond(&mut self, idx: EdgeIndex) -> Bond {
        self.stereo.retain(|elem| !elem.references_bond(idx));
        self.graph
            .remove_edge(idx)
            .expect("bond index out of bounds")
    }

    pub fn contains_atom(&self, idx: NodeIndex) -> bool {
        self.graph.contains_node(idx)
    }

    pub fn contains_bond(&self, idx: EdgeIndex) -> bool {
        self.graph.edge_weight(idx).is_some()
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn bonds(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(idx)
    }

    pub fn bonds_of(&self, idx: NodeIndex) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edges(idx).map(|e| e.id())
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    pub fn bond_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(idx)
    }

    /// Given one endpoint of a bond, returns the other.
    pub fn bond_other(&self, idx: EdgeIndex, atom: NodeIndex) -> Option<NodeIndex> {
        let (a, b) = self.bond_endpoints(idx)?;
        if a == atom {
            Some(b)
        } else if b == atom {
            Some(a)
        } else {
            None
        }
    }

    pub fn connected_bonds_count(&self, idx: NodeIndex) -> usize {
        self.graph.edges(idx).count()
    }

    /// Sum of the numeric orders of the explicit bonds on an atom.
    /// Implicit hydrogens are not included.
    pub fn bond_order_sum(&self, idx: NodeIndex) -> u32 {
        self.graph
            .edges(idx)
            .map(|e| e.weight().order.numeric() as u32)
            .sum()
    }

    /// Exclusive upper bound on atom handle slots, for index-keyed scratch
    /// vectors. Larger than `atom_count` when slots have been vacated.
    pub fn atom_index_bound(&self) -> usize {
        self.graph
            .node_indices()
            .map(|n| n.index())
            .max()
            .map_or(0, |m| m + 1)
    }

    pub fn bond_index_bound(&self) -> usize {
        self.graph
            .edge_indices()
            .map(|e| e.index())
            .max()
            .map_or(0, |m| m + 1)
    }

    pub fn stereo_elements(&self) -> &[StereoElement] {
        &self.stereo
    }

    pub fn stereo_elements_mut(&mut self) -> &mut [StereoElement] {
        &mut self.stereo
    }

    pub fn add_stereo_element(&mut self, elem: StereoElement) {
        self.stereo.push(elem);
    }

    pub fn lone_pairs(&self) -> &[NodeIndex] {
        &self.lone_pairs
    }

    pub fn add_lone_pair(&mut self, atom: NodeIndex) {
        self.lone_pairs.push(atom);
    }

    pub fn single_electrons(&self) -> &[NodeIndex] {
        &self.single_electrons
    }

    pub fn add_single_electron(&mut self, atom: NodeIndex) {
        self.single_electrons.push(atom);
    }
}

impl std::fmt::Debug for Mol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mol")
            .field("atom_count", &self.atom_count())
            .field("bond_count", &self.bond_count())
            .field("stereo_elements", &self.stereo.len())
            .finish()
    }
}
