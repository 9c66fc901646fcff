/*! Double-pushout rewriting of diagrams.

Given a rule and a convex match of its left-hand side, a rewrite step cuts
the matched edges and interior vertices out of the target, then splices in a
fresh copy of the right-hand side, gluing its boundary to the vertices the
left-hand boundary was matched to. Convexity of the match is exactly what
guarantees the cut leaves no dangling path, so rewriting itself is
infallible: a malformed result indicates a bug, not bad input.

Everything retained from the target keeps its handle; everything spliced in
gets a fresh one.
*/

use std::collections::BTreeMap;

use crate::hypergraph::{E, Hypergraph, V};
use crate::matcher::Match;
use crate::rule::Rule;

/** The result of one rewrite step.

Owns the rewritten diagram together with the embedding of the rule's
right-hand side into it, recorded as handle maps. For a left-linear rule the
step is unique, so this is the whole double-pushout result.
 */
#[derive(Clone, Debug)]
pub struct Rewrite {
    graph: Hypergraph,
    vertex_map: BTreeMap<V, V>,
    edge_map: BTreeMap<E, E>,
}

impl Rewrite {
    /// The rewritten diagram.
    pub fn graph(&self) -> &Hypergraph {
        &self.graph
    }

    /// Consumes the step, returning the rewritten diagram.
    pub fn into_graph(self) -> Hypergraph {
        self.graph
    }

    /// Where each right-hand-side vertex landed.
    pub fn vertex_map(&self) -> &BTreeMap<V, V> {
        &self.vertex_map
    }

    /// Where each right-hand-side edge landed.
    pub fn edge_map(&self) -> &BTreeMap<E, E> {
        &self.edge_map
    }

    /** Views the embedding of the right-hand side as a [`Match`].

    The rule must be the one the step was produced from.
     */
    pub fn rhs_embedding<'a>(&'a self, rule: &'a Rule) -> Match<'a> {
        Match::from_maps(rule.rhs(), &self.graph, self.vertex_map.clone(), self.edge_map.clone())
    }
}

/** Performs a double-pushout rewrite step at a match.

The match must be total and its pattern must be the rule's left-hand side.
 */
pub fn dpo(rule: &Rule, m: &Match) -> Rewrite {
    assert!(std::ptr::eq(m.dom(), rule.lhs()), "match should embed the rule's left-hand side");
    assert!(m.is_total(), "match should be total");
    let (lhs, rhs) = (rule.lhs(), rule.rhs());

    let mut graph = m.cod().clone();

    // Cut out the image: matched edges, then the images of interior
    // vertices, which by now have no incidence left.
    for e in lhs.edges() {
        graph.remove_edge(m.apply_edge(e).expect("total match assigns every edge"));
    }
    for v in lhs.vertices() {
        if !lhs.is_boundary(v) {
            graph.remove_vertex(m.apply_vertex(v).expect("total match assigns every vertex"));
        }
    }

    // Fresh copies of the interior of the right-hand side.
    let mut vertex_map: BTreeMap<V, V> = BTreeMap::new();
    for v in rhs.vertices() {
        if !rhs.is_boundary(v) {
            let data = rhs.vertex_data(v);
            vertex_map.insert(v, graph.add_vertex(data.value, data.pos));
        }
    }

    // Glue the right-hand boundary to the gluing vertices, the images of the
    // left-hand boundary. A single right-hand vertex can be pinned to two
    // distinct gluing vertices (a bare wire from an input to an output, or a
    // repeated boundary on the right); those gluing vertices are then
    // identified in the result.
    fn find(repl: &BTreeMap<V, V>, mut v: V) -> V {
        while let Some(&w) = repl.get(&v) {
            v = w;
        }
        v
    }
    let mut repl: BTreeMap<V, V> = BTreeMap::new();
    let pins =
        lhs.inputs().iter().zip(rhs.inputs()).chain(lhs.outputs().iter().zip(rhs.outputs()));
    for (&lv, &rv) in pins {
        let image = find(&repl, m.apply_vertex(lv).expect("total match assigns every vertex"));
        match vertex_map.get(&rv).map(|&w| find(&repl, w)) {
            None => {
                vertex_map.insert(rv, image);
            }
            Some(existing) if existing == image => {}
            Some(existing) => {
                graph.merge_vertices(existing, image);
                repl.insert(image, existing);
            }
        }
    }
    for w in vertex_map.values_mut() {
        *w = find(&repl, *w);
    }

    // Splice in the right-hand edges.
    let mut edge_map: BTreeMap<E, E> = BTreeMap::new();
    for e in rhs.edges() {
        let data = rhs.edge_data(e);
        let sources = data.sources().iter().map(|v| vertex_map[v]).collect();
        let targets = data.targets().iter().map(|v| vertex_map[v]).collect();
        edge_map.insert(e, graph.add_edge(sources, targets, data.value, data.pos, data.hyper));
    }

    #[cfg(debug_assertions)]
    {
        use crate::validate::Validate;
        debug_assert!(graph.validate().is_ok(), "rewriting should preserve the shape invariants");
    }

    Rewrite {
        graph,
        vertex_map,
        edge_map,
    }
}

/// Rewrites at a match, returning just the new diagram.
pub fn rewrite(rule: &Rule, m: &Match) -> Hypergraph {
    dpo(rule, m).into_graph()
}

#[cfg(test)]
mod tests {
    use ustr::ustr;

    use super::*;
    use crate::matcher::{iso, match_rule};
    use crate::term::{Term, compile};
    use crate::validate::Validate;

    fn rule(name: &str, lhs: &Term, rhs: &Term) -> Rule {
        Rule::new(ustr(name), compile(lhs).unwrap(), compile(rhs).unwrap()).unwrap()
    }

    fn assoc() -> Rule {
        let m = Term::generator("m", 2, 1);
        rule(
            "assoc",
            &m.clone().par(Term::Id).seq(m.clone()),
            &Term::Id.par(m.clone()).seq(m),
        )
    }

    #[test]
    fn replace_one_edge() {
        let r = rule("fg", &Term::generator("f", 1, 1), &Term::generator("g", 1, 1));
        let target = compile(&Term::generator("f", 1, 1).seq(Term::generator("f", 1, 1))).unwrap();

        let results: Vec<_> =
            match_rule(&r, &target).map(|m| rewrite(&r, &m)).collect();
        assert_eq!(results.len(), 2);
        let gf = compile(&Term::generator("g", 1, 1).seq(Term::generator("f", 1, 1))).unwrap();
        let fg = compile(&Term::generator("f", 1, 1).seq(Term::generator("g", 1, 1))).unwrap();
        assert!(iso(&results[0], &gf));
        assert!(iso(&results[1], &fg));

        for h in &results {
            assert_eq!(h.arity(), target.arity());
            assert!(h.validate().is_ok());
        }
    }

    #[test]
    fn rhs_embedding_is_an_embedding() {
        let r = rule("fg", &Term::generator("f", 1, 1), &Term::generator("g", 1, 1));
        let target = compile(&Term::generator("f", 1, 1)).unwrap();
        let m = match_rule(&r, &target).next().unwrap();
        let step = dpo(&r, &m);
        let embed = step.rhs_embedding(&r);
        assert!(embed.is_total());
        for (&e, &cod_e) in embed.edge_map() {
            let (ed, cd) = (r.rhs().edge_data(e), step.graph().edge_data(cod_e));
            assert_eq!(ed.value, cd.value);
            for (&v, &w) in ed.sources().iter().zip(cd.sources()) {
                assert_eq!(embed.apply_vertex(v), Some(w));
            }
            for (&v, &w) in ed.targets().iter().zip(cd.targets()) {
                assert_eq!(embed.apply_vertex(v), Some(w));
            }
        }
    }

    #[test]
    fn collapse_to_identity_glues_the_boundary() {
        let r = rule(
            "inv",
            &Term::generator("f", 1, 1).seq(Term::generator("g", 1, 1)),
            &Term::Id,
        );

        let target = compile(
            &Term::generator("f", 1, 1).seq(Term::generator("g", 1, 1)).seq(Term::generator("h", 1, 1)),
        )
        .unwrap();
        let m = match_rule(&r, &target).next().unwrap();
        let h = rewrite(&r, &m);
        assert!(iso(&h, &compile(&Term::generator("h", 1, 1)).unwrap()));

        // Collapsing the whole diagram leaves a bare wire.
        let whole = compile(&Term::generator("f", 1, 1).seq(Term::generator("g", 1, 1))).unwrap();
        let m = match_rule(&r, &whole).next().unwrap();
        let h = rewrite(&r, &m);
        assert!(iso(&h, &compile(&Term::Id).unwrap()));
    }

    #[test]
    fn refl_rewrite_is_identity() {
        let refl = Rule::refl();
        let g = compile(&Term::generator("f", 2, 1).seq(Term::generator("g", 1, 2))).unwrap();
        let m = match_rule(&refl, &g).next().unwrap();
        assert!(iso(&rewrite(&refl, &m), &g));
    }

    #[test]
    fn rewrites_reverse() {
        let r = assoc();
        let m_gen = Term::generator("m", 2, 1);
        let t0 = compile(
            &m_gen
                .clone()
                .par(Term::Id)
                .par(Term::Id)
                .seq(m_gen.clone().par(Term::Id))
                .seq(m_gen.clone()),
        )
        .unwrap();

        let m = match_rule(&r, &t0).next().unwrap();
        let h = rewrite(&r, &m);

        let rev = r.reverse().unwrap();
        assert!(
            match_rule(&rev, &h).any(|m| iso(&rewrite(&rev, &m), &t0)),
            "reversed rule should undo the step"
        );
    }

    #[test]
    fn associativity_walk() {
        let r = assoc();
        let m = Term::generator("m", 2, 1);
        let t0 = m.clone().par(Term::Id).par(Term::Id).seq(m.clone().par(Term::Id)).seq(m.clone());
        let t1 = Term::Id.par(m.clone()).par(Term::Id).seq(m.clone().par(Term::Id)).seq(m.clone());
        let mid = Term::Id.par(m.clone()).par(Term::Id).seq(Term::Id.par(m.clone())).seq(m.clone());
        let t2 = Term::Id.par(Term::Id).par(m.clone()).seq(Term::Id.par(m.clone())).seq(m.clone());

        let mut g = compile(&t0).unwrap();
        for next in [&t1, &mid, &t2] {
            let mtch = match_rule(&r, &g).next().expect("a match should exist");
            g = rewrite(&r, &mtch);
            assert!(iso(&g, &compile(next).unwrap()));
        }
    }

    #[test]
    fn bialgebra_normal_form_walk() {
        let f = || Term::generator("f", 2, 1);
        let g = || Term::generator("g", 1, 2);
        let lhs = f().seq(g());
        let rhs = g()
            .par(g())
            .seq(Term::Id.par(Term::sw()).par(Term::Id))
            .seq(f().par(f()));
        let bialg = rule("bialg", &lhs, &rhs);

        let term = Term::Id.par(f()).seq(f()).seq(g()).seq(Term::Id.par(g()));
        let mut graph = compile(&term).unwrap();
        assert_eq!(graph.arity(), (3, 3));

        for step in 0..4 {
            let m = match_rule(&bialg, &graph)
                .next()
                .unwrap_or_else(|| panic!("step {step} should find a match"));
            graph = rewrite(&bialg, &m);
            assert!(graph.validate().is_ok());
            assert_eq!(graph.arity(), (3, 3));
            // Each step trades one f-g pair for two of each.
            assert_eq!(graph.edge_count(), 4 + 2 * (step + 1));
        }
        assert!(match_rule(&bialg, &graph).next().is_none());

        let f_count =
            graph.edges().filter(|&e| graph.edge_data(e).value == ustr("f")).count();
        let g_count =
            graph.edges().filter(|&e| graph.edge_data(e).value == ustr("g")).count();
        assert_eq!((f_count, g_count), (6, 6));
    }
}
