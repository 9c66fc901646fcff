/*! Terms of a symmetric monoidal category and their compilation to diagrams.

A term is built from generators, identities, permutations, parallel
composition `*`, and sequential composition `;`. Compilation folds the term
tree over the diagram primitives of [`hypergraph`](crate::hypergraph);
type errors surface with the offending composition site pretty-printed.

Terms that differ only by the monoidal axioms (associativity and unit laws
of `*` and `;`, interchange, naturality of the symmetry) compile to
isomorphic diagrams, which is the point of the representation.
*/

use std::fmt;

use itertools::Itertools;
use thiserror::Error;
use ustr::Ustr;

use crate::hypergraph::{ComposeError, Hypergraph, InvalidPermutation};

/** A term in the language of symmetric monoidal categories.

Generators carry their arities; resolving generator names against a theory
is the business of the surface language, not of this crate.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    /// The identity on a single wire.
    Id,

    /// The identity on the monoidal unit: the empty diagram.
    Id0,

    /// A generator box with input and output arities.
    Gen {
        /// The generator's name, which labels the resulting edge.
        name: Ustr,
        /// Input arity.
        dom: usize,
        /// Output arity.
        cod: usize,
    },

    /// A wire permutation; input `i` is sent to output `perm[i]`.
    Perm(Vec<usize>),

    /// Sequential composition, in diagram order: first the left term.
    Seq(Box<Term>, Box<Term>),

    /// Parallel composition.
    Par(Box<Term>, Box<Term>),
}

impl Term {
    /// A generator term.
    pub fn generator(name: &str, dom: usize, cod: usize) -> Term {
        Term::Gen {
            name: ustr::ustr(name),
            dom,
            cod,
        }
    }

    /// The symmetry on two wires.
    pub fn sw() -> Term {
        Term::Perm(vec![1, 0])
    }

    /// Sequential composition of two terms.
    pub fn seq(self, other: Term) -> Term {
        Term::Seq(Box::new(self), Box::new(other))
    }

    /// Parallel composition of two terms.
    pub fn par(self, other: Term) -> Term {
        Term::Par(Box::new(self), Box::new(other))
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, prec: u8) -> fmt::Result {
        match self {
            Term::Id => write!(f, "id"),
            Term::Id0 => write!(f, "id0"),
            Term::Gen { name, .. } => write!(f, "{name}"),
            Term::Perm(perm) if *perm == [1, 0] => write!(f, "sw"),
            Term::Perm(perm) => write!(f, "sw[{}]", perm.iter().join(" ")),
            Term::Seq(left, right) => {
                if prec > 0 {
                    write!(f, "(")?;
                }
                left.fmt_prec(f, 0)?;
                write!(f, " ; ")?;
                right.fmt_prec(f, 0)?;
                if prec > 0 {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Term::Par(left, right) => {
                if prec > 1 {
                    write!(f, "(")?;
                }
                left.fmt_prec(f, 1)?;
                write!(f, " * ")?;
                right.fmt_prec(f, 1)?;
                if prec > 1 {
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}

/** Compiles a term to a diagram.

Wires introduced by the term layer carry the empty value label; typed wires
enter the system only through loaded graphs.
 */
pub fn compile(term: &Term) -> Result<Hypergraph, CompileError> {
    match term {
        Term::Id => Ok(Hypergraph::identity(1)),
        Term::Id0 => Ok(Hypergraph::identity(0)),
        Term::Gen { name, dom, cod } => Ok(Hypergraph::generator(*name, *dom, *cod)),
        Term::Perm(perm) => Hypergraph::permutation(perm).map_err(|source| {
            CompileError::Permutation {
                term: term.to_string(),
                source,
            }
        }),
        Term::Par(left, right) => Ok(compile(left)?.tensor(&compile(right)?)),
        Term::Seq(left, right) => {
            let (g, h) = (compile(left)?, compile(right)?);
            g.compose(&h).map_err(|source| CompileError::Type {
                left: left.to_string(),
                right: right.to_string(),
                source,
            })
        }
    }
}

/// A failure to compile a term to a diagram.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CompileError {
    /// A sequential composition whose boundaries do not line up.
    #[error("cannot compose `{left}` with `{right}`: {source}")]
    Type {
        /// Pretty-printed left operand of the offending `;`.
        left: String,
        /// Pretty-printed right operand of the offending `;`.
        right: String,
        /// The underlying boundary mismatch.
        #[source]
        source: ComposeError,
    },

    /// A `sw[…]` whose index list is not a permutation.
    #[error("in `{term}`: {source}")]
    Permutation {
        /// Pretty-printed offending subterm.
        term: String,
        /// The underlying failure.
        #[source]
        source: InvalidPermutation,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypergraph::V;

    #[test]
    fn identity_compilation() {
        let g = compile(&Term::Id).unwrap();
        assert_eq!(g.vertex_count(), 1);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.inputs(), &[V(0)]);
        assert_eq!(g.outputs(), &[V(0)]);

        // Two independent wires.
        let g = compile(&Term::Id.par(Term::Id)).unwrap();
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.inputs(), g.outputs());
        assert_ne!(g.inputs()[0], g.inputs()[1]);

        let g = compile(&Term::Id0).unwrap();
        assert_eq!(g.vertex_count(), 0);
        assert_eq!(g.arity(), (0, 0));
    }

    #[test]
    fn generator_and_composition() {
        let m = Term::generator("m", 2, 1);
        let term = m.clone().par(Term::Id).par(Term::Id).seq(m.clone().par(Term::Id)).seq(m);
        let g = compile(&term).unwrap();
        assert_eq!(g.arity(), (4, 1));
        assert_eq!(g.vertex_count(), 7);
        assert_eq!(g.edge_count(), 3);
        use crate::validate::Validate;
        assert!(g.validate().is_ok());
    }

    #[test]
    fn type_errors_name_the_site() {
        let bad = Term::generator("f", 1, 2).seq(Term::generator("g", 1, 1));
        let err = compile(&bad).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot compose `f` with `g`: left side has 2 outputs but right side has 1 inputs"
        );

        // The failure is attributed to the innermost offending composition.
        let nested = Term::Id.par(bad);
        let err2 = compile(&nested).unwrap_err();
        assert_eq!(err, err2);

        let bad_perm = Term::generator("f", 1, 3).seq(Term::Perm(vec![0, 0, 1]));
        assert!(matches!(
            compile(&bad_perm).unwrap_err(),
            CompileError::Permutation { .. }
        ));
    }

    #[test]
    fn display_round_trip_shapes() {
        let t = Term::generator("m", 2, 1)
            .par(Term::Id)
            .seq(Term::sw().par(Term::Id))
            .seq(Term::generator("m", 2, 1).par(Term::Id));
        assert_eq!(t.to_string(), "m * id ; sw * id ; m * id");

        let u = Term::generator("f", 1, 1).seq(Term::generator("g", 1, 1)).par(Term::Id);
        assert_eq!(u.to_string(), "(f ; g) * id");

        assert_eq!(Term::Perm(vec![2, 0, 1]).to_string(), "sw[2 0 1]");
    }

    #[test]
    fn permutation_compilation() {
        let g = compile(&Term::sw()).unwrap();
        assert_eq!(g.arity(), (2, 2));
        assert_eq!(g.outputs()[0], g.inputs()[1]);
        assert_eq!(g.outputs()[1], g.inputs()[0]);
    }
}
