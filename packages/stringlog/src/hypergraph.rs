/*! String diagrams as hypergraphs with boundary.

A morphism in a symmetric monoidal category is represented by a directed,
labeled hypergraph together with two ordered lists of vertices, the *inputs*
and *outputs*. Vertices are the wires of the diagram and hyperedges are the
boxes; an edge consumes an ordered list of source vertices and produces an
ordered list of target vertices. The boundary lists form a cospan into the
hypergraph and may repeat vertices.

Diagrams are kept *monogamous* and *acyclic*: away from the boundary, every
wire is produced by exactly one box and consumed by exactly one box, and the
one-hop precedence relation between boxes has no directed cycle. These two
shape invariants are what make convex matching and double-pushout rewriting
well-defined, so they are validated on anything that enters the system from
outside (see [`Validate`]).

Vertices and edges are addressed by integer handles that stay stable across
deletion: removing an element simply drops it from the table, and fresh
elements always get fresh handles.
*/

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use derive_more::{Constructor, Display, From, Into};
use itertools::Itertools;
use thiserror::Error;
use ustr::Ustr;

use crate::validate::Validate;

/// A vertex handle, stable within its hypergraph.
#[derive(Clone, Copy, Debug, Display, From, Into, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("{_0}")]
pub struct V(pub usize);

/// An edge handle, stable within its hypergraph.
#[derive(Clone, Copy, Debug, Display, From, Into, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("{_0}")]
pub struct E(pub usize);

/** A display position.

Positions are purely cosmetic: they are preserved by I/O and ignored by
composition, matching, rewriting, and isomorphism testing. Host applications
are free to recompute them.
 */
#[derive(Clone, Copy, Debug, Default, PartialEq, Constructor)]
pub struct Pos {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// Data attached to a vertex of a hypergraph.
#[derive(Clone, Debug)]
pub struct VertexData {
    /// The value label, acting as the type of the wire.
    pub value: Ustr,

    /// Display position.
    pub pos: Pos,

    in_edges: Vec<E>,
    out_edges: Vec<E>,
}

impl VertexData {
    /// Edges having this vertex among their targets, once per occurrence.
    pub fn in_edges(&self) -> &[E] {
        &self.in_edges
    }

    /// Edges having this vertex among their sources, once per occurrence.
    pub fn out_edges(&self) -> &[E] {
        &self.out_edges
    }
}

/// Data attached to a hyperedge of a hypergraph.
#[derive(Clone, Debug)]
pub struct EdgeData {
    /// The value label, identifying a generator.
    pub value: Ustr,

    /// Display position.
    pub pos: Pos,

    /// Whether the edge is drawn as a box rather than a plain wire joint.
    pub hyper: bool,

    sources: Vec<V>,
    targets: Vec<V>,
}

impl EdgeData {
    /// The ordered source list of the edge.
    pub fn sources(&self) -> &[V] {
        &self.sources
    }

    /// The ordered target list of the edge.
    pub fn targets(&self) -> &[V] {
        &self.targets
    }

    /// The arity of the edge, as a pair (number of sources, number of targets).
    pub fn arity(&self) -> (usize, usize) {
        (self.sources.len(), self.targets.len())
    }
}

/** A directed labeled hypergraph with ordered boundary.

The graph owns its vertex and edge tables, keyed by handle. Tables are
ordered by handle, so all iteration in this module is in ascending handle
order; downstream enumeration (notably matching) inherits its determinism
from this.

Construction-style mutation (`add_*`, `set_inputs`, `compose`, …) upholds
referential integrity by contract: handles passed in must name elements of
the graph, and violations are programmer errors. The shape invariants,
monogamy and acyclicity, are *not* upheld automatically; use
[`validate`](Validate::validate) on data of unknown provenance.
 */
#[derive(Clone, Debug, Default)]
pub struct Hypergraph {
    vertices: BTreeMap<V, VertexData>,
    edges: BTreeMap<E, EdgeData>,
    inputs: Vec<V>,
    outputs: Vec<V>,
    next_vertex: usize,
    next_edge: usize,
}

impl Hypergraph {
    /// Creates an empty hypergraph with empty boundary.
    pub fn new() -> Self {
        Default::default()
    }

    /// Iterates over the vertex handles in ascending order.
    pub fn vertices(&self) -> impl Iterator<Item = V> + '_ {
        self.vertices.keys().copied()
    }

    /// Iterates over the edge handles in ascending order.
    pub fn edges(&self) -> impl Iterator<Item = E> + '_ {
        self.edges.keys().copied()
    }

    /// Number of vertices in the graph.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Does the graph contain this vertex?
    pub fn has_vertex(&self, v: V) -> bool {
        self.vertices.contains_key(&v)
    }

    /// Does the graph contain this edge?
    pub fn has_edge(&self, e: E) -> bool {
        self.edges.contains_key(&e)
    }

    /// Gets the data of a vertex, assumed to be contained in the graph.
    pub fn vertex_data(&self, v: V) -> &VertexData {
        self.vertices.get(&v).expect("vertex should be in the graph")
    }

    /// Gets the data of an edge, assumed to be contained in the graph.
    pub fn edge_data(&self, e: E) -> &EdgeData {
        self.edges.get(&e).expect("edge should be in the graph")
    }

    /// The ordered input boundary.
    pub fn inputs(&self) -> &[V] {
        &self.inputs
    }

    /// The ordered output boundary.
    pub fn outputs(&self) -> &[V] {
        &self.outputs
    }

    /// The arity of the diagram, as a pair (number of inputs, number of outputs).
    pub fn arity(&self) -> (usize, usize) {
        (self.inputs.len(), self.outputs.len())
    }

    /// Does this vertex occur in the input boundary?
    pub fn is_input(&self, v: V) -> bool {
        self.inputs.contains(&v)
    }

    /// Does this vertex occur in the output boundary?
    pub fn is_output(&self, v: V) -> bool {
        self.outputs.contains(&v)
    }

    /// Does this vertex occur in either boundary?
    pub fn is_boundary(&self, v: V) -> bool {
        self.is_input(v) || self.is_output(v)
    }

    /// Number of occurrences of the vertex as an edge target.
    pub fn in_degree(&self, v: V) -> usize {
        self.vertex_data(v).in_edges.len()
    }

    /// Number of occurrences of the vertex as an edge source.
    pub fn out_degree(&self, v: V) -> usize {
        self.vertex_data(v).out_edges.len()
    }

    /// Adds a vertex with a fresh handle.
    pub fn add_vertex(&mut self, value: Ustr, pos: Pos) -> V {
        let v = V(self.next_vertex);
        self.next_vertex += 1;
        self.vertices.insert(
            v,
            VertexData {
                value,
                pos,
                in_edges: Vec::new(),
                out_edges: Vec::new(),
            },
        );
        v
    }

    /** Adds a vertex with an explicitly chosen handle.

    Used by the I/O layer, where handles come from the document. The handle
    must be free; the allocation counter is bumped past it so later fresh
    handles never collide.
     */
    pub fn add_vertex_at(&mut self, v: V, value: Ustr, pos: Pos) {
        assert!(!self.has_vertex(v), "vertex handle should be free");
        self.next_vertex = self.next_vertex.max(v.0 + 1);
        self.vertices.insert(
            v,
            VertexData {
                value,
                pos,
                in_edges: Vec::new(),
                out_edges: Vec::new(),
            },
        );
    }

    /** Adds an edge with a fresh handle, recording both-sided incidence.

    All endpoints must be vertices of the graph.
     */
    pub fn add_edge(
        &mut self,
        sources: Vec<V>,
        targets: Vec<V>,
        value: Ustr,
        pos: Pos,
        hyper: bool,
    ) -> E {
        let e = E(self.next_edge);
        self.next_edge += 1;
        self.insert_edge(e, sources, targets, value, pos, hyper);
        e
    }

    /// Variant of [`add_edge`](Self::add_edge) with an explicitly chosen handle.
    pub fn add_edge_at(
        &mut self,
        e: E,
        sources: Vec<V>,
        targets: Vec<V>,
        value: Ustr,
        pos: Pos,
        hyper: bool,
    ) {
        assert!(!self.has_edge(e), "edge handle should be free");
        self.next_edge = self.next_edge.max(e.0 + 1);
        self.insert_edge(e, sources, targets, value, pos, hyper);
    }

    fn insert_edge(
        &mut self,
        e: E,
        sources: Vec<V>,
        targets: Vec<V>,
        value: Ustr,
        pos: Pos,
        hyper: bool,
    ) {
        for &v in &sources {
            let data = self.vertices.get_mut(&v).expect("edge source should be a vertex");
            data.out_edges.push(e);
        }
        for &v in &targets {
            let data = self.vertices.get_mut(&v).expect("edge target should be a vertex");
            data.in_edges.push(e);
        }
        self.edges.insert(
            e,
            EdgeData {
                value,
                pos,
                hyper,
                sources,
                targets,
            },
        );
    }

    /// Removes an edge, cleaning up the incidence lists of its endpoints.
    pub fn remove_edge(&mut self, e: E) {
        let data = self.edges.remove(&e).expect("removed edge should be in the graph");
        for v in data.sources {
            if let Some(vd) = self.vertices.get_mut(&v) {
                vd.out_edges.retain(|&x| x != e);
            }
        }
        for v in data.targets {
            if let Some(vd) = self.vertices.get_mut(&v) {
                vd.in_edges.retain(|&x| x != e);
            }
        }
    }

    /** Removes a vertex.

    The vertex must have no incident edges and no boundary occurrence; remove
    or redirect those first.
     */
    pub fn remove_vertex(&mut self, v: V) {
        let data = self.vertices.get(&v).expect("removed vertex should be in the graph");
        assert!(
            data.in_edges.is_empty() && data.out_edges.is_empty(),
            "removed vertex should have no incident edges"
        );
        assert!(!self.is_boundary(v), "removed vertex should not be on the boundary");
        self.vertices.remove(&v);
    }

    /// Replaces the input boundary. Handles must name vertices of the graph.
    pub fn set_inputs(&mut self, inputs: Vec<V>) {
        assert!(inputs.iter().all(|&v| self.has_vertex(v)), "inputs should be vertices");
        self.inputs = inputs;
    }

    /// Replaces the output boundary. Handles must name vertices of the graph.
    pub fn set_outputs(&mut self, outputs: Vec<V>) {
        assert!(outputs.iter().all(|&v| self.has_vertex(v)), "outputs should be vertices");
        self.outputs = outputs;
    }

    /** Identifies two vertices, keeping the first.

    All edge incidences and boundary occurrences of `dropped` are redirected
    to `kept`, then `dropped` is removed. This is the vertex quotient used
    when plugging diagrams together and when gluing a rewrite result.
     */
    pub fn merge_vertices(&mut self, kept: V, dropped: V) {
        if kept == dropped {
            return;
        }
        let data = self.vertices.remove(&dropped).expect("merged vertex should be in the graph");
        for e in data.in_edges {
            let ed = self.edges.get_mut(&e).expect("incident edge should be in the graph");
            for t in ed.targets.iter_mut() {
                if *t == dropped {
                    *t = kept;
                }
            }
            self.vertices.get_mut(&kept).expect("kept vertex should be in the graph").in_edges.push(e);
        }
        for e in data.out_edges {
            let ed = self.edges.get_mut(&e).expect("incident edge should be in the graph");
            for s in ed.sources.iter_mut() {
                if *s == dropped {
                    *s = kept;
                }
            }
            self.vertices.get_mut(&kept).expect("kept vertex should be in the graph").out_edges.push(e);
        }
        for v in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            if *v == dropped {
                *v = kept;
            }
        }
    }

    /// Edges one hop before `e`: those with a target among the sources of `e`.
    pub fn edge_preds(&self, e: E) -> impl Iterator<Item = E> + '_ {
        let sorted: BTreeSet<E> = self
            .edge_data(e)
            .sources
            .iter()
            .flat_map(|&v| self.vertex_data(v).in_edges.iter().copied())
            .collect();
        sorted.into_iter()
    }

    /// Edges one hop after `e`: those with a source among the targets of `e`.
    pub fn edge_succs(&self, e: E) -> impl Iterator<Item = E> + '_ {
        let sorted: BTreeSet<E> = self
            .edge_data(e)
            .targets
            .iter()
            .flat_map(|&v| self.vertex_data(v).out_edges.iter().copied())
            .collect();
        sorted.into_iter()
    }

    /** Vertices strictly reachable from the seed set by directed paths.

    The seeds themselves are included only if some directed path comes back
    to them, which cannot happen in an acyclic graph.
     */
    pub fn successors(&self, seeds: impl IntoIterator<Item = V>) -> BTreeSet<V> {
        let mut result = BTreeSet::new();
        let mut queue: VecDeque<V> = seeds.into_iter().collect();
        while let Some(v) = queue.pop_front() {
            for &e in self.vertex_data(v).out_edges() {
                for &w in self.edge_data(e).targets() {
                    if result.insert(w) {
                        queue.push_back(w);
                    }
                }
            }
        }
        result
    }

    /// Vertices strictly co-reachable from the seed set by directed paths.
    pub fn predecessors(&self, seeds: impl IntoIterator<Item = V>) -> BTreeSet<V> {
        let mut result = BTreeSet::new();
        let mut queue: VecDeque<V> = seeds.into_iter().collect();
        while let Some(v) = queue.pop_front() {
            for &e in self.vertex_data(v).in_edges() {
                for &w in self.edge_data(e).sources() {
                    if result.insert(w) {
                        queue.push_back(w);
                    }
                }
            }
        }
        result
    }

    /** Orders the edges topologically with respect to one-hop precedence.

    Kahn's algorithm, always dequeuing the smallest ready handle, so the
    order is canonical for a given graph. Returns `None` when the precedence
    relation has a directed cycle.
     */
    pub fn toposort_edges(&self) -> Option<Vec<E>> {
        self.toposort_impl().ok()
    }

    /// Is the one-hop precedence relation on edges acyclic?
    pub fn is_acyclic(&self) -> bool {
        self.toposort_impl().is_ok()
    }

    fn toposort_impl(&self) -> Result<Vec<E>, E> {
        let mut remaining: BTreeMap<E, usize> = self
            .edges
            .iter()
            .map(|(&e, data)| {
                let preds = data.sources.iter().map(|&v| self.in_degree(v)).sum();
                (e, preds)
            })
            .collect();
        let mut ready: BTreeSet<E> =
            remaining.iter().filter(|&(_, &n)| n == 0).map(|(&e, _)| e).collect();
        let mut order = Vec::with_capacity(self.edges.len());
        while let Some(e) = ready.pop_first() {
            remaining.remove(&e);
            order.push(e);
            for &v in &self.edge_data(e).targets {
                for &succ in self.vertex_data(v).out_edges() {
                    if let Some(n) = remaining.get_mut(&succ) {
                        *n -= 1;
                        if *n == 0 {
                            ready.insert(succ);
                        }
                    }
                }
            }
        }
        match remaining.keys().next() {
            Some(&e) => Err(e),
            None => Ok(order),
        }
    }

    /// Copies this graph into `target` with fresh handles, returning the handle maps.
    fn copy_into(&self, target: &mut Hypergraph) -> (BTreeMap<V, V>, BTreeMap<E, E>) {
        let vmap: BTreeMap<V, V> = self
            .vertices
            .iter()
            .map(|(&v, data)| (v, target.add_vertex(data.value, data.pos)))
            .collect();
        let emap: BTreeMap<E, E> = self
            .edges
            .iter()
            .map(|(&e, data)| {
                let sources = data.sources.iter().map(|v| vmap[v]).collect();
                let targets = data.targets.iter().map(|v| vmap[v]).collect();
                (e, target.add_edge(sources, targets, data.value, data.pos, data.hyper))
            })
            .collect();
        (vmap, emap)
    }

    /** Parallel composition: disjoint union with concatenated boundaries.

    Inputs and outputs of `self` come first.
     */
    pub fn tensor(&self, other: &Hypergraph) -> Hypergraph {
        let mut result = Hypergraph::new();
        let (vmap1, _) = self.copy_into(&mut result);
        let (vmap2, _) = other.copy_into(&mut result);
        result.inputs = self
            .inputs
            .iter()
            .map(|v| vmap1[v])
            .chain(other.inputs.iter().map(|v| vmap2[v]))
            .collect();
        result.outputs = self
            .outputs
            .iter()
            .map(|v| vmap1[v])
            .chain(other.outputs.iter().map(|v| vmap2[v]))
            .collect();
        result
    }

    /** Sequential composition: plug the outputs of `self` into the inputs of `other`.

    The boundaries are unified pointwise, quotienting each output vertex of
    `self` with the corresponding input vertex of `other`. Since either
    boundary may repeat vertices, the quotient is computed with a
    representative-chasing redirect map. Fails when the arities differ or
    when a unified pair carries different value labels.
     */
    pub fn compose(&self, other: &Hypergraph) -> Result<Hypergraph, ComposeError> {
        if self.outputs.len() != other.inputs.len() {
            return Err(ComposeError::Arity {
                outputs: self.outputs.len(),
                inputs: other.inputs.len(),
            });
        }
        let mut result = Hypergraph::new();
        let (vmap1, _) = self.copy_into(&mut result);
        let (vmap2, _) = other.copy_into(&mut result);

        fn find(repl: &BTreeMap<V, V>, mut v: V) -> V {
            while let Some(&w) = repl.get(&v) {
                v = w;
            }
            v
        }

        let mut repl: BTreeMap<V, V> = BTreeMap::new();
        for (index, (o, i)) in self.outputs.iter().zip_eq(other.inputs.iter()).enumerate() {
            let kept = find(&repl, vmap1[o]);
            let dropped = find(&repl, vmap2[i]);
            if kept == dropped {
                continue;
            }
            let (left, right) =
                (result.vertex_data(kept).value, result.vertex_data(dropped).value);
            if left != right {
                return Err(ComposeError::Value { index, left, right });
            }
            result.merge_vertices(kept, dropped);
            repl.insert(dropped, kept);
        }
        result.inputs = self.inputs.iter().map(|v| find(&repl, vmap1[v])).collect();
        result.outputs = other.outputs.iter().map(|v| find(&repl, vmap2[v])).collect();
        Ok(result)
    }

    /// The identity diagram on `n` wires.
    pub fn identity(n: usize) -> Hypergraph {
        let mut g = Hypergraph::new();
        let wires: Vec<V> = (0..n).map(|_| g.add_vertex(Ustr::default(), Pos::default())).collect();
        g.inputs = wires.clone();
        g.outputs = wires;
        g
    }

    /** The permutation diagram wiring input `i` to output `perm[i]`.

    Fails unless `perm` is a bijection on `0..perm.len()`.
     */
    pub fn permutation(perm: &[usize]) -> Result<Hypergraph, InvalidPermutation> {
        let n = perm.len();
        let mut seen = vec![false; n];
        for &i in perm {
            if i >= n || seen[i] {
                return Err(InvalidPermutation(perm.to_vec()));
            }
            seen[i] = true;
        }
        let mut g = Hypergraph::new();
        let wires: Vec<V> = (0..n).map(|_| g.add_vertex(Ustr::default(), Pos::default())).collect();
        let mut outputs = vec![V(0); n];
        for (i, &j) in perm.iter().enumerate() {
            outputs[j] = wires[i];
        }
        g.inputs = wires;
        g.outputs = outputs;
        Ok(g)
    }

    /// A diagram with a single generator box of the given arity.
    pub fn generator(value: Ustr, arity_in: usize, arity_out: usize) -> Hypergraph {
        let mut g = Hypergraph::new();
        let sources: Vec<V> =
            (0..arity_in).map(|_| g.add_vertex(Ustr::default(), Pos::default())).collect();
        let targets: Vec<V> =
            (0..arity_out).map(|_| g.add_vertex(Ustr::default(), Pos::default())).collect();
        g.add_edge(sources.clone(), targets.clone(), value, Pos::default(), true);
        g.inputs = sources;
        g.outputs = targets;
        g
    }
}

/// A failure to compose two diagrams end to end.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ComposeError {
    /// The plugged boundaries have different lengths.
    #[error("left side has {outputs} outputs but right side has {inputs} inputs")]
    Arity {
        /// Output arity of the left diagram.
        outputs: usize,
        /// Input arity of the right diagram.
        inputs: usize,
    },

    /// A unified pair of boundary vertices carries different value labels.
    #[error("output {index} has value `{left}` but the corresponding input has value `{right}`")]
    Value {
        /// Position in the plugged boundary.
        index: usize,
        /// Value label on the left side.
        left: Ustr,
        /// Value label on the right side.
        right: Ustr,
    },
}

/// A sequence that was expected to be a permutation but is not.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{0:?} is not a permutation")]
pub struct InvalidPermutation(pub Vec<usize>);

/// A violation of the shape invariants of a diagram.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InvalidHypergraph {
    /// A vertex with the wrong number of incoming wire endpoints.
    #[error("vertex {vertex} is the target of {degree} edge occurrences, expected {expected}")]
    InDegree {
        /// The offending vertex.
        vertex: V,
        /// Occurrences of the vertex as an edge target.
        degree: usize,
        /// 0 for input vertices, 1 otherwise.
        expected: usize,
    },

    /// A vertex with the wrong number of outgoing wire endpoints.
    #[error("vertex {vertex} is the source of {degree} edge occurrences, expected {expected}")]
    OutDegree {
        /// The offending vertex.
        vertex: V,
        /// Occurrences of the vertex as an edge source.
        degree: usize,
        /// 0 for output vertices, 1 otherwise.
        expected: usize,
    },

    /// An edge lying on a directed cycle of the precedence relation.
    #[error("edge {0} lies on a directed cycle")]
    Cycle(E),
}

impl Validate for Hypergraph {
    type ValidationError = InvalidHypergraph;

    fn iter_invalid(&self) -> impl Iterator<Item = InvalidHypergraph> {
        let mut errors = Vec::new();
        for (&v, data) in &self.vertices {
            let expected_in = if self.is_input(v) { 0 } else { 1 };
            if data.in_edges.len() != expected_in {
                errors.push(InvalidHypergraph::InDegree {
                    vertex: v,
                    degree: data.in_edges.len(),
                    expected: expected_in,
                });
            }
            let expected_out = if self.is_output(v) { 0 } else { 1 };
            if data.out_edges.len() != expected_out {
                errors.push(InvalidHypergraph::OutDegree {
                    vertex: v,
                    degree: data.out_edges.len(),
                    expected: expected_out,
                });
            }
        }
        if let Err(e) = self.toposort_impl() {
            errors.push(InvalidHypergraph::Cycle(e));
        }
        errors.into_iter()
    }
}

/** Canonical single-line text form of a diagram.

Vertices are listed with their value labels when nonempty, then edges with
their source and target lists, then the boundary. Used by tests and
diagnostics; not a serialization format.
 */
impl fmt::Display for Hypergraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vs = self
            .vertices
            .iter()
            .map(|(v, data)| {
                if data.value.is_empty() {
                    v.to_string()
                } else {
                    format!("{}:{}", v, data.value)
                }
            })
            .join(" ");
        let es = self
            .edges
            .iter()
            .map(|(e, data)| {
                format!(
                    "{}:{}({} -> {})",
                    e,
                    data.value,
                    data.sources.iter().join(" "),
                    data.targets.iter().join(" ")
                )
            })
            .join(", ");
        let ins = self.inputs.iter().join(" ");
        let outs = self.outputs.iter().join(" ");
        write!(f, "{vs} | {es} | in: {ins} | out: {outs}")
    }
}
