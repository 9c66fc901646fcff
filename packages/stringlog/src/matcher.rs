/*! Enumeration of convex embeddings between diagrams.

Matching is a constraint search: each edge of the pattern must be assigned a
target edge with the same label and arity, consistently with the vertex
assignments forced by incidence. Assignments are extended one edge at a time
in a fixed topological order, with candidates tried in ascending handle
order, so for a given (pattern, target) pair the stream of matches is fully
deterministic. The search state is an explicit stack of partial matches and
the stream is lazy: dropping the iterator abandons the search with no
cleanup, and each call to [`match_graph`] or [`match_rule`] starts afresh.

A total assignment is only emitted if its image is *convex*: no directed
path may leave the image and come back into it. Convexity is what makes the
double-pushout rewrite of a match well-defined.

The same search doubles as an isomorphism test ([`find_iso`]): seed the
boundary pointwise, then look for a match that is injective and surjective.
*/

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::hypergraph::{E, Hypergraph, V};
use crate::rule::Rule;

/** An embedding of one diagram into another.

A match maps every vertex and every edge of the pattern to the target,
preserving values, arities, and incidence. Away from the pattern's boundary
the vertex map is injective and degree-preserving, so the matched region can
be cut out whole; on the boundary the map may be non-injective, which glues
wires of the pattern together in the target.

A match borrows both diagrams and owns only its assignment tables. Partial
matches arise during search; everything produced by the iterators here is
total.
 */
#[derive(Clone, Debug)]
pub struct Match<'a> {
    dom: &'a Hypergraph,
    cod: &'a Hypergraph,
    vertex_map: BTreeMap<V, V>,
    edge_map: BTreeMap<E, E>,
    vertex_image: BTreeSet<V>,
    edge_image: BTreeSet<E>,
}

impl<'a> Match<'a> {
    /// The empty partial match between two diagrams.
    pub fn new(dom: &'a Hypergraph, cod: &'a Hypergraph) -> Self {
        Match {
            dom,
            cod,
            vertex_map: BTreeMap::new(),
            edge_map: BTreeMap::new(),
            vertex_image: BTreeSet::new(),
            edge_image: BTreeSet::new(),
        }
    }

    pub(crate) fn from_maps(
        dom: &'a Hypergraph,
        cod: &'a Hypergraph,
        vertex_map: BTreeMap<V, V>,
        edge_map: BTreeMap<E, E>,
    ) -> Self {
        let vertex_image = vertex_map.values().copied().collect();
        let edge_image = edge_map.values().copied().collect();
        Match {
            dom,
            cod,
            vertex_map,
            edge_map,
            vertex_image,
            edge_image,
        }
    }

    /// The pattern diagram.
    pub fn dom(&self) -> &'a Hypergraph {
        self.dom
    }

    /// The target diagram.
    pub fn cod(&self) -> &'a Hypergraph {
        self.cod
    }

    /// Applies the match to a pattern vertex.
    pub fn apply_vertex(&self, v: V) -> Option<V> {
        self.vertex_map.get(&v).copied()
    }

    /// Applies the match to a pattern edge.
    pub fn apply_edge(&self, e: E) -> Option<E> {
        self.edge_map.get(&e).copied()
    }

    /// The vertex assignment table.
    pub fn vertex_map(&self) -> &BTreeMap<V, V> {
        &self.vertex_map
    }

    /// The edge assignment table.
    pub fn edge_map(&self) -> &BTreeMap<E, E> {
        &self.edge_map
    }

    /** Attempts to extend the match at a vertex, returning success.

    An assignment is refused when the values differ, when it would map an
    interior pattern vertex onto a boundary or degree-mismatched target
    vertex, or when it would glue anything but boundary wires. On refusal
    the match may be left partially extended; search works on clones and
    discards failures.
     */
    pub fn try_add_vertex(&mut self, v: V, cod_v: V) -> bool {
        if let Some(&w) = self.vertex_map.get(&v) {
            return w == cod_v;
        }
        if self.dom.vertex_data(v).value != self.cod.vertex_data(cod_v).value {
            return false;
        }
        if !self.dom.is_boundary(v) {
            // Cutting out the image must not strand edges outside it, so an
            // interior vertex needs an interior image with the exact same
            // incidence counts.
            if self.cod.is_boundary(cod_v)
                || self.dom.in_degree(v) != self.cod.in_degree(cod_v)
                || self.dom.out_degree(v) != self.cod.out_degree(cod_v)
            {
                return false;
            }
        }
        if self.vertex_image.contains(&cod_v) {
            let gluable = self.dom.is_boundary(v)
                && self
                    .vertex_map
                    .iter()
                    .filter(|&(_, w)| *w == cod_v)
                    .all(|(&u, _)| self.dom.is_boundary(u));
            if !gluable {
                return false;
            }
        }
        self.vertex_map.insert(v, cod_v);
        self.vertex_image.insert(cod_v);
        true
    }

    /** Attempts to extend the match at an edge, returning success.

    Requires equal values and arities, an unused target edge, and vertex
    assignments consistent with the pairing of source and target lists.
     */
    pub fn try_add_edge(&mut self, e: E, cod_e: E) -> bool {
        let ed = self.dom.edge_data(e);
        let cd = self.cod.edge_data(cod_e);
        if ed.value != cd.value || ed.arity() != cd.arity() {
            return false;
        }
        if self.edge_image.contains(&cod_e) {
            return false;
        }
        self.edge_map.insert(e, cod_e);
        self.edge_image.insert(cod_e);
        let pairs =
            ed.sources().iter().zip(cd.sources()).chain(ed.targets().iter().zip(cd.targets()));
        for (&v, &w) in pairs {
            if !self.try_add_vertex(v, w) {
                return false;
            }
        }
        true
    }

    /// Is every pattern vertex and edge assigned?
    pub fn is_total(&self) -> bool {
        self.vertex_map.len() == self.dom.vertex_count()
            && self.edge_map.len() == self.dom.edge_count()
    }

    /// Is the vertex map injective? (The edge map always is.)
    pub fn is_injective(&self) -> bool {
        self.vertex_image.len() == self.vertex_map.len()
    }

    /// Does the image cover the whole target?
    pub fn is_surjective(&self) -> bool {
        self.vertex_image.len() == self.cod.vertex_count()
            && self.edge_image.len() == self.cod.edge_count()
    }

    /** Is the image of the edge map convex in the target?

    A directed path can only leave the image at a vertex whose single
    outgoing edge occurrence is not in the image, so it suffices to walk
    forward from the targets of image edges along non-image edges; reaching
    a source of an image edge means some path leaves and re-enters.
     */
    pub fn is_convex(&self) -> bool {
        let image_sources: BTreeSet<V> = self
            .edge_image
            .iter()
            .flat_map(|&e| self.cod.edge_data(e).sources().iter().copied())
            .collect();
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<V> = self
            .edge_image
            .iter()
            .flat_map(|&e| self.cod.edge_data(e).targets().iter().copied())
            .collect();
        while let Some(v) = queue.pop_front() {
            for &e in self.cod.vertex_data(v).out_edges() {
                if self.edge_image.contains(&e) {
                    continue;
                }
                for &w in self.cod.edge_data(e).targets() {
                    if seen.insert(w) {
                        queue.push_back(w);
                    }
                }
            }
        }
        seen.is_disjoint(&image_sources)
    }
}

/** The lazy stream of matches of a pattern in a target.

Depth-first search over an explicit stack of partial matches. Candidates
are pushed in descending handle order so that the smallest extension is
explored first; together with the fixed topological edge order this makes
the emission order reproducible.
 */
pub struct Matches<'a> {
    dom: &'a Hypergraph,
    cod: &'a Hypergraph,
    edge_order: Vec<E>,
    stack: Vec<Match<'a>>,
}

impl<'a> Matches<'a> {
    fn from_initial(initial: Match<'a>) -> Self {
        let (dom, cod) = (initial.dom, initial.cod);
        let edge_order = dom.toposort_edges().expect("pattern should be acyclic");
        Matches {
            dom,
            cod,
            edge_order,
            stack: vec![initial],
        }
    }
}

impl<'a> Iterator for Matches<'a> {
    type Item = Match<'a>;

    fn next(&mut self) -> Option<Match<'a>> {
        while let Some(m) = self.stack.pop() {
            // Assign edges first, in topological order.
            if let Some(e) = self.edge_order.iter().copied().find(|e| !m.edge_map.contains_key(e))
            {
                let candidates: Vec<E> = self.cod.edges().collect();
                for &cod_e in candidates.iter().rev() {
                    let mut next = m.clone();
                    if next.try_add_edge(e, cod_e) {
                        self.stack.push(next);
                    }
                }
                continue;
            }
            // Then any vertices no edge touches: bare wires of the pattern.
            if let Some(v) = self.dom.vertices().find(|v| !m.vertex_map.contains_key(v)) {
                let candidates: Vec<V> = self.cod.vertices().collect();
                for &cod_v in candidates.iter().rev() {
                    let mut next = m.clone();
                    if next.try_add_vertex(v, cod_v) {
                        self.stack.push(next);
                    }
                }
                continue;
            }
            debug_assert!(m.is_total());
            if m.is_convex() {
                return Some(m);
            }
        }
        None
    }
}

/// Enumerates the convex embeddings of `dom` into `cod`.
pub fn match_graph<'a>(dom: &'a Hypergraph, cod: &'a Hypergraph) -> Matches<'a> {
    Matches::from_initial(Match::new(dom, cod))
}

/// Enumerates the convex embeddings of a rule's left-hand side into `cod`.
pub fn match_rule<'a>(rule: &'a Rule, cod: &'a Hypergraph) -> Matches<'a> {
    match_graph(rule.lhs(), cod)
}

/** Searches for an isomorphism of diagrams with ordered boundary.

An isomorphism is a bijective match that sends the `i`-th input of one
diagram to the `i`-th input of the other, and likewise for outputs. The
boundary is seeded accordingly and anchors the rest of the search.
 */
pub fn find_iso<'a>(g: &'a Hypergraph, h: &'a Hypergraph) -> Option<Match<'a>> {
    if g.arity() != h.arity()
        || g.vertex_count() != h.vertex_count()
        || g.edge_count() != h.edge_count()
    {
        return None;
    }
    let mut seed = Match::new(g, h);
    let boundary =
        g.inputs().iter().zip(h.inputs()).chain(g.outputs().iter().zip(h.outputs()));
    for (&v, &w) in boundary {
        if !seed.try_add_vertex(v, w) {
            return None;
        }
    }
    Matches::from_initial(seed).find(|m| m.is_injective() && m.is_surjective())
}

/// Are two diagrams isomorphic, respecting the boundary order?
pub fn iso(g: &Hypergraph, h: &Hypergraph) -> bool {
    find_iso(g, h).is_some()
}
