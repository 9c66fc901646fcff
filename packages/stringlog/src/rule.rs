/*! Rewrite rules: pairs of diagrams with a common boundary.

A rule asserts an equation between two morphisms, so its two sides must have
the same arity and pointwise-equal boundary value labels, and each side must
be a well-shaped diagram on its own. Only *left-linear* rules — those whose
left-hand side has no repeated boundary vertex — are accepted; repeated
boundaries on the left would call for rewriting modulo Frobenius structure,
which is out of scope.
*/

use itertools::Itertools;
use nonempty::NonEmpty;
use thiserror::Error;
use ustr::Ustr;

use crate::hypergraph::{Hypergraph, InvalidHypergraph, V};
use crate::validate::{self, Validate};

/** A named, validated rewrite rule.

Construction enforces the boundary agreement between the two sides, so a
`Rule` value can always be matched and applied without further checks.
 */
#[derive(Clone, Debug)]
pub struct Rule {
    name: Ustr,
    lhs: Hypergraph,
    rhs: Hypergraph,
}

impl Rule {
    /// Validates and constructs a rule.
    pub fn new(
        name: Ustr,
        lhs: Hypergraph,
        rhs: Hypergraph,
    ) -> Result<Rule, NonEmpty<InvalidRule>> {
        let rule = Rule { name, lhs, rhs };
        validate::wrap_errors(rule.iter_invalid())?;
        Ok(rule)
    }

    /// The rule's name, used in proofs and diagnostics.
    pub fn name(&self) -> Ustr {
        self.name
    }

    /// The left-hand side.
    pub fn lhs(&self) -> &Hypergraph {
        &self.lhs
    }

    /// The right-hand side.
    pub fn rhs(&self) -> &Hypergraph {
        &self.rhs
    }

    /// The common boundary arity of the two sides.
    pub fn arity(&self) -> (usize, usize) {
        self.lhs.arity()
    }

    /** The reversed rule, with the two sides swapped.

    Revalidates, since the right-hand side of a left-linear rule need not be
    left-linear itself.
     */
    pub fn reverse(&self) -> Result<Rule, NonEmpty<InvalidRule>> {
        Rule::new(self.name, self.rhs.clone(), self.lhs.clone())
    }

    /** The trivial rule: empty left- and right-hand sides.

    It matches any diagram exactly once and rewriting by it changes nothing;
    proofs use it for steps that only re-associate a term.
     */
    pub fn refl() -> Rule {
        Rule::new(ustr::ustr("refl"), Hypergraph::new(), Hypergraph::new())
            .expect("the empty rule is valid")
    }

    fn iter_invalid(&self) -> impl Iterator<Item = InvalidRule> + '_ {
        let mut errors: Vec<InvalidRule> = Vec::new();
        errors.extend(self.lhs.iter_invalid().map(InvalidRule::Lhs));
        errors.extend(self.rhs.iter_invalid().map(InvalidRule::Rhs));

        if self.lhs.inputs().len() != self.rhs.inputs().len() {
            errors.push(InvalidRule::InputArity {
                left: self.lhs.inputs().len(),
                right: self.rhs.inputs().len(),
            });
        } else {
            for (index, (l, r)) in
                self.lhs.inputs().iter().zip_eq(self.rhs.inputs()).enumerate()
            {
                let (left, right) =
                    (self.lhs.vertex_data(*l).value, self.rhs.vertex_data(*r).value);
                if left != right {
                    errors.push(InvalidRule::InputValue { index, left, right });
                }
            }
        }
        if self.lhs.outputs().len() != self.rhs.outputs().len() {
            errors.push(InvalidRule::OutputArity {
                left: self.lhs.outputs().len(),
                right: self.rhs.outputs().len(),
            });
        } else {
            for (index, (l, r)) in
                self.lhs.outputs().iter().zip_eq(self.rhs.outputs()).enumerate()
            {
                let (left, right) =
                    (self.lhs.vertex_data(*l).value, self.rhs.vertex_data(*r).value);
                if left != right {
                    errors.push(InvalidRule::OutputValue { index, left, right });
                }
            }
        }

        let boundary = self.lhs.inputs().iter().chain(self.lhs.outputs()).copied();
        errors.extend(boundary.duplicates().map(InvalidRule::NotLeftLinear));

        errors.into_iter()
    }
}

/// A failure to assemble two diagrams into a rule.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InvalidRule {
    /// The left-hand side is not a well-shaped diagram.
    #[error("left-hand side: {0}")]
    Lhs(InvalidHypergraph),

    /// The right-hand side is not a well-shaped diagram.
    #[error("right-hand side: {0}")]
    Rhs(InvalidHypergraph),

    /// The sides have different input arities.
    #[error("left-hand side has {left} inputs but right-hand side has {right}")]
    InputArity {
        /// Input arity on the left.
        left: usize,
        /// Input arity on the right.
        right: usize,
    },

    /// The sides have different output arities.
    #[error("left-hand side has {left} outputs but right-hand side has {right}")]
    OutputArity {
        /// Output arity on the left.
        left: usize,
        /// Output arity on the right.
        right: usize,
    },

    /// Corresponding input vertices carry different value labels.
    #[error("input {index} has value `{left}` on the left-hand side but `{right}` on the right")]
    InputValue {
        /// Boundary position.
        index: usize,
        /// Value label on the left.
        left: Ustr,
        /// Value label on the right.
        right: Ustr,
    },

    /// Corresponding output vertices carry different value labels.
    #[error("output {index} has value `{left}` on the left-hand side but `{right}` on the right")]
    OutputValue {
        /// Boundary position.
        index: usize,
        /// Value label on the left.
        left: Ustr,
        /// Value label on the right.
        right: Ustr,
    },

    /// The left-hand side repeats a boundary vertex.
    #[error("vertex {0} is repeated on the left-hand side boundary; only left-linear rules are supported")]
    NotLeftLinear(V),
}
