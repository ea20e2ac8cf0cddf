//! SMARTS-subset queries over [`Mol`].
//!
//! Covers the constructs the bond-splitting patterns use: bracket atoms
//! with `;`/`,`/`&` logic, negation, element and `#n` primitives, ring
//! membership (`R`, `!R`), degree (`Dn`), total hydrogen count (`Hn`),
//! charge (`+n`/`-n`), recursive environments (`$(...)`), atom-map classes
//! (`:n`, parsed and ignored; callers address atoms by pattern position),
//! and the bond expressions `-`, `=`, `#`, `~` with `@`/`!@` ring
//! qualifiers. Ring primitives read the in-ring flags on bonds; they are
//! perception input, not recomputed here.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use thiserror::Error;

use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmartsError {
    #[error("empty SMARTS string")]
    EmptyInput,
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },
    #[error("unclosed bracket starting at position {pos}")]
    UnclosedBracket { pos: usize },
    #[error("unclosed recursive SMARTS at position {pos}")]
    UnclosedRecursive { pos: usize },
    #[error("expected an atom at position {pos}")]
    ExpectedAtom { pos: usize },
}

/// Constraint on a single query atom.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomExpr {
    /// `*`, matches any atom.
    True,
    Element { atomic_num: u8, aromatic: Option<bool> },
    InRing,
    Degree(u8),
    TotalHCount(u8),
    Charge(i8),
    Recursive(Box<Query>),
    Not(Box<AtomExpr>),
    And(Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
}

/// Constraint on a single query bond.
#[derive(Debug, Clone, PartialEq)]
pub enum BondExpr {
    /// Unannotated bond: single or aromatic.
    SingleOrAromatic,
    Single,
    Double,
    Triple,
    Any,
    InRing,
    NotInRing,
    And(Vec<BondExpr>),
}

/// A parsed pattern: atoms in pattern order, bonds between pattern
/// positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    atoms: Vec<AtomExpr>,
    bonds: Vec<(usize, usize, BondExpr)>,
}

impl Query {
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn atom(&self, i: usize) -> &AtomExpr {
        &self.atoms[i]
    }

    fn neighbors(&self, i: usize) -> impl Iterator<Item = (usize, &BondExpr)> + '_ {
        self.bonds.iter().filter_map(move |(a, b, expr)| {
            if *a == i {
                Some((*b, expr))
            } else if *b == i {
                Some((*a, expr))
            } else {
                None
            }
        })
    }
}

pub fn parse(s: &str) -> Result<Query, SmartsError> {
    Parser::new(s).parse_pattern()
}

/// All matches of `query` against `mol`, filtered to unique atom sets and
/// reported in pattern order. Symmetric patterns yield one mapping per
/// matched atom set, picked deterministically by traversal order.
pub fn matches_unique(query: &Query, mol: &Mol) -> Vec<Vec<NodeIndex>> {
    let mut results = Vec::new();
    Matcher::new(query, mol, None).run(&mut results, false);
    let mut seen: HashSet<Vec<NodeIndex>> = HashSet::new();
    results
        .into_iter()
        .filter(|mapping| {
            let mut key = mapping.clone();
            key.sort();
            seen.insert(key)
        })
        .collect()
}

/// Whether `atom` can stand as the first pattern atom of a match.
fn matches_anchored(query: &Query, mol: &Mol, atom: NodeIndex) -> bool {
    let mut results = Vec::new();
    Matcher::new(query, mol, Some(atom)).run(&mut results, true);
    !results.is_empty()
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(s: &str) -> Self {
        Self {
            chars: s.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn parse_pattern(&mut self) -> Result<Query, SmartsError> {
        if self.chars.is_empty() {
            return Err(SmartsError::EmptyInput);
        }
        let mut atoms = Vec::new();
        let mut bonds = Vec::new();
        let first = self.parse_atom()?;
        atoms.push(first);
        while self.peek().is_some() {
            let bond = self.parse_bond()?;
            let pos = self.pos;
            if self.peek().is_none() {
                return Err(SmartsError::ExpectedAtom { pos });
            }
            let atom = self.parse_atom()?;
            atoms.push(atom);
            bonds.push((atoms.len() - 2, atoms.len() - 1, bond));
        }
        Ok(Query { atoms, bonds })
    }

    fn parse_bond(&mut self) -> Result<BondExpr, SmartsError> {
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                Some('-') => {
                    self.advance();
                    parts.push(BondExpr::Single);
                }
                Some('=') => {
                    self.advance();
                    parts.push(BondExpr::Double);
                }
                Some('#') => {
                    self.advance();
                    parts.push(BondExpr::Triple);
                }
                Some('~') => {
                    self.advance();
                    parts.push(BondExpr::Any);
                }
                Some('@') => {
                    self.advance();
                    parts.push(BondExpr::InRing);
                }
                Some('!') => {
                    let pos = self.pos;
                    self.advance();
                    match self.advance() {
                        Some('@') => parts.push(BondExpr::NotInRing),
                        other => {
                            return Err(SmartsError::UnexpectedChar {
                                pos,
                                ch: other.unwrap_or('!'),
                            })
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(match parts.len() {
            0 => BondExpr::SingleOrAromatic,
            1 => parts.pop().expect("one element"),
            _ => BondExpr::And(parts),
        })
    }

    fn parse_atom(&mut self) -> Result<AtomExpr, SmartsError> {
        match self.peek() {
            Some('[') => self.parse_bracket(),
            Some('*') => {
                self.advance();
                Ok(AtomExpr::True)
            }
            Some(c) if c.is_ascii_alphabetic() => self.parse_bare_element(),
            other => Err(SmartsError::UnexpectedChar {
                pos: self.pos,
                ch: other.unwrap_or(' '),
            }),
        }
    }

    fn parse_bare_element(&mut self) -> Result<AtomExpr, SmartsError> {
        let pos = self.pos;
        let first = self.advance().expect("caller checked alphabetic");
        // two-letter symbols that can appear outside brackets
        if let Some(second) = self.peek() {
            let two: String = [first, second].iter().collect();
            if let Some(num) = two_letter_element(&two) {
                self.advance();
                return Ok(AtomExpr::Element {
                    atomic_num: num,
                    aromatic: Some(false),
                });
            }
        }
        match single_letter_element(first) {
            Some((num, aromatic)) => Ok(AtomExpr::Element {
                atomic_num: num,
                aromatic: Some(aromatic),
            }),
            None => Err(SmartsError::UnexpectedChar { pos, ch: first }),
        }
    }

    fn parse_bracket(&mut self) -> Result<AtomExpr, SmartsError> {
        let open = self.pos;
        self.advance(); // '['
        let expr = self.parse_semi_expr()?;
        if self.peek() == Some(':') {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        match self.advance() {
            Some(']') => Ok(expr),
            _ => Err(SmartsError::UnclosedBracket { pos: open }),
        }
    }

    fn parse_semi_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut parts = vec![self.parse_or_expr()?];
        while self.peek() == Some(';') {
            self.advance();
            parts.push(self.parse_or_expr()?);
        }
        Ok(and_of(parts))
    }

    fn parse_or_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut parts = vec![self.parse_and_expr()?];
        while self.peek() == Some(',') {
            self.advance();
            parts.push(self.parse_and_expr()?);
        }
        Ok(if parts.len() == 1 {
            parts.pop().expect("one element")
        } else {
            AtomExpr::Or(parts)
        })
    }

    fn parse_and_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                Some('&') => {
                    self.advance();
                }
                Some(c) if is_primitive_start(c) => {
                    let first = parts.is_empty();
                    parts.push(self.parse_primitive(first)?);
                }
                _ => break,
            }
        }
        if parts.is_empty() {
            return Err(SmartsError::ExpectedAtom { pos: self.pos });
        }
        Ok(and_of(parts))
    }

    fn parse_primitive(&mut self, first_in_group: bool) -> Result<AtomExpr, SmartsError> {
        let pos = self.pos;
        match self.peek() {
            Some('!') => {
                self.advance();
                let inner = self.parse_primitive(first_in_group)?;
                Ok(AtomExpr::Not(Box::new(inner)))
            }
            Some('$') => {
                self.advance();
                if self.advance() != Some('(') {
                    return Err(SmartsError::UnclosedRecursive { pos });
                }
                let start = self.pos;
                let mut depth = 1usize;
                while depth > 0 {
                    match self.advance() {
                        Some('(') => depth += 1,
                        Some(')') => depth -= 1,
                        Some(_) => {}
                        None => return Err(SmartsError::UnclosedRecursive { pos }),
                    }
                }
                let inner: String = self.chars[start..self.pos - 1].iter().collect();
                let sub = parse(&inner)?;
                Ok(AtomExpr::Recursive(Box::new(sub)))
            }
            Some('*') => {
                self.advance();
                Ok(AtomExpr::True)
            }
            Some('#') => {
                self.advance();
                let num = self
                    .parse_number()
                    .ok_or(SmartsError::UnexpectedChar { pos, ch: '#' })?;
                Ok(AtomExpr::Element {
                    atomic_num: num as u8,
                    aromatic: None,
                })
            }
            Some('R') => {
                self.advance();
                match self.parse_number() {
                    Some(0) => Ok(AtomExpr::Not(Box::new(AtomExpr::InRing))),
                    _ => Ok(AtomExpr::InRing),
                }
            }
            Some('D') => {
                self.advance();
                let n = self.parse_number().unwrap_or(1);
                Ok(AtomExpr::Degree(n as u8))
            }
            Some('H') if !first_in_group || matches!(self.chars.get(self.pos + 1), Some(c) if c.is_ascii_digit()) =>
            {
                self.advance();
                let n = self.parse_number().unwrap_or(1);
                Ok(AtomExpr::TotalHCount(n as u8))
            }
            Some('+') => {
                self.advance();
                let n = self.parse_number().unwrap_or(1);
                Ok(AtomExpr::Charge(n as i8))
            }
            Some('-') => {
                self.advance();
                let n = self.parse_number().unwrap_or(1);
                Ok(AtomExpr::Charge(-(n as i8)))
            }
            Some(c) if c.is_ascii_alphabetic() => self.parse_bracket_element(),
            other => Err(SmartsError::UnexpectedChar {
                pos,
                ch: other.unwrap_or(' '),
            }),
        }
    }

    fn parse_bracket_element(&mut self) -> Result<AtomExpr, SmartsError> {
        let pos = self.pos;
        let first = self.advance().expect("caller checked alphabetic");
        if let Some(second) = self.peek() {
            let two: String = [first, second].iter().collect();
            if let Some(num) = two_letter_element(&two) {
                self.advance();
                return Ok(AtomExpr::Element {
                    atomic_num: num,
                    aromatic: Some(false),
                });
            }
        }
        if first == 'H' {
            // [H] alone is the hydrogen element
            return Ok(AtomExpr::Element {
                atomic_num: 1,
                aromatic: Some(false),
            });
        }
        match single_letter_element(first) {
            Some((num, aromatic)) => Ok(AtomExpr::Element {
                atomic_num: num,
                aromatic: Some(aromatic),
            }),
            None => Err(SmartsError::UnexpectedChar { pos, ch: first }),
        }
    }

    fn parse_number(&mut self) -> Option<u32> {
        let mut value: Option<u32> = None;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            self.advance();
            value = Some(value.unwrap_or(0) * 10 + digit);
        }
        value
    }
}

fn and_of(mut parts: Vec<AtomExpr>) -> AtomExpr {
    if parts.len() == 1 {
        parts.pop().expect("one element")
    } else {
        AtomExpr::And(parts)
    }
}

fn is_primitive_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '!' | '$' | '*' | '#' | '+' | '-') || c.is_ascii_digit()
}

fn two_letter_element(symbol: &str) -> Option<u8> {
    match symbol {
        "Cl" => Some(17),
        "Br" => Some(35),
        "Si" => Some(14),
        "Se" => Some(34),
        _ => None,
    }
}

fn single_letter_element(c: char) -> Option<(u8, bool)> {
    match c {
        'B' => Some((5, false)),
        'C' => Some((6, false)),
        'N' => Some((7, false)),
        'O' => Some((8, false)),
        'F' => Some((9, false)),
        'P' => Some((15, false)),
        'S' => Some((16, false)),
        'I' => Some((53, false)),
        'H' => Some((1, false)),
        'c' => Some((6, true)),
        'n' => Some((7, true)),
        'o' => Some((8, true)),
        's' => Some((16, true)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

fn atom_matches(expr: &AtomExpr, mol: &Mol, idx: NodeIndex) -> bool {
    let atom = mol.atom(idx);
    match expr {
        AtomExpr::True => true,
        AtomExpr::Element {
            atomic_num,
            aromatic,
        } => {
            atom.atomic_num == *atomic_num
                && aromatic.map_or(true, |a| atom.is_aromatic == a)
                && !atom.is_pseudo()
        }
        AtomExpr::InRing => mol.bonds_of(idx).any(|e| mol.bond(e).is_in_ring),
        AtomExpr::Degree(d) => mol.connected_bonds_count(idx) == *d as usize,
        AtomExpr::TotalHCount(h) => {
            let explicit = mol
                .neighbors(idx)
                .filter(|&n| mol.atom(n).atomic_num == 1)
                .count();
            atom.implicit_h_count as usize + explicit == *h as usize
        }
        AtomExpr::Charge(c) => atom.formal_charge == *c,
        AtomExpr::Recursive(query) => matches_anchored(query, mol, idx),
        AtomExpr::Not(inner) => !atom_matches(inner, mol, idx),
        AtomExpr::And(parts) => parts.iter().all(|p| atom_matches(p, mol, idx)),
        AtomExpr::Or(parts) => parts.iter().any(|p| atom_matches(p, mol, idx)),
    }
}

fn bond_matches(expr: &BondExpr, bond: &Bond) -> bool {
    match expr {
        BondExpr::SingleOrAromatic => {
            bond.is_aromatic || bond.order == BondOrder::Single
        }
        BondExpr::Single => bond.order == BondOrder::Single && !bond.is_aromatic,
        BondExpr::Double => bond.order == BondOrder::Double,
        BondExpr::Triple => bond.order == BondOrder::Triple,
        BondExpr::Any => true,
        BondExpr::InRing => bond.is_in_ring,
        BondExpr::NotInRing => !bond.is_in_ring,
        BondExpr::And(parts) => parts.iter().all(|p| bond_matches(p, bond)),
    }
}

struct Matcher<'a> {
    query: &'a Query,
    mol: &'a Mol,
    order: Vec<usize>,
    mapped: Vec<Option<NodeIndex>>,
    used: Vec<bool>,
    anchor: Option<NodeIndex>,
}

impl<'a> Matcher<'a> {
    fn new(query: &'a Query, mol: &'a Mol, anchor: Option<NodeIndex>) -> Self {
        let mut order: Vec<usize> = (0..query.atom_count()).collect();
        if anchor.is_none() {
            // most-constrained query atoms first
            order.sort_by(|&a, &b| {
                query
                    .neighbors(b)
                    .count()
                    .cmp(&query.neighbors(a).count())
            });
        }
        Self {
            query,
            mol,
            order,
            mapped: vec![None; query.atom_count()],
            used: vec![false; mol.atom_index_bound()],
            anchor,
        }
    }

    fn run(&mut self, results: &mut Vec<Vec<NodeIndex>>, first_only: bool) {
        if self.query.atom_count() == 0 || self.mol.is_empty() {
            return;
        }
        self.recurse(0, results, first_only);
    }

    fn recurse(&mut self, depth: usize, results: &mut Vec<Vec<NodeIndex>>, first_only: bool) {
        if depth == self.order.len() {
            let mapping = (0..self.query.atom_count())
                .map(|i| self.mapped[i].expect("complete mapping"))
                .collect();
            results.push(mapping);
            return;
        }
        if first_only && !results.is_empty() {
            return;
        }
        let query_atom = self.order[depth];
        let candidates: Vec<NodeIndex> = match (depth, self.anchor) {
            (0, Some(anchor)) => vec![anchor],
            _ => self.mol.atoms().collect(),
        };
        for target in candidates {
            if self.used[target.index()] || !self.is_feasible(query_atom, target) {
                continue;
            }
            self.mapped[query_atom] = Some(target);
            self.used[target.index()] = true;
            self.recurse(depth + 1, results, first_only);
            self.mapped[query_atom] = None;
            self.used[target.index()] = false;
            if first_only && !results.is_empty() {
                return;
            }
        }
    }

    fn is_feasible(&self, query_atom: usize, target: NodeIndex) -> bool {
        if !atom_matches(self.query.atom(query_atom), self.mol, target) {
            return false;
        }
        for (q_neighbor, bond_expr) in self.query.neighbors(query_atom) {
            if let Some(t_mapped) = self.mapped[q_neighbor] {
                match self.mol.bond_between(target, t_mapped) {
                    Some(edge) => {
                        if !bond_matches(bond_expr, self.mol.bond(edge)) {
                            return false;
                        }
                    }
                    None => return false,
                }
            }
        }
        true
    }
}
