/*! Checking equational proofs step by step.

A proof is a chain of terms, each justified by a named rule applied forward
or in reverse. A step checks out when *some* convex match of the rule in the
previous diagram rewrites it to a diagram isomorphic to the claimed next
one; the search stops at the first witness. Failures carry the step index
and rule name so the host can point at the offending line.
*/

use indexmap::IndexMap;
use thiserror::Error;
use ustr::Ustr;

use crate::hypergraph::Hypergraph;
use crate::matcher::{iso, match_rule};
use crate::rewrite::rewrite;
use crate::rule::Rule;
use crate::term::{CompileError, Term, compile};
use crate::validate::errors_to_string;

/// One step of a proof: a claimed next term and its justification.
#[derive(Clone, Debug)]
pub struct ProofStep {
    /// The claimed next term.
    pub term: Term,

    /// The name of the justifying rule.
    pub rule: Ustr,

    /// Whether the rule is applied right-to-left.
    pub reverse: bool,
}

impl ProofStep {
    /// A step justified by a rule applied left-to-right.
    pub fn by(term: Term, rule: &str) -> ProofStep {
        ProofStep {
            term,
            rule: ustr::ustr(rule),
            reverse: false,
        }
    }

    /// A step justified by a rule applied right-to-left.
    pub fn by_reverse(term: Term, rule: &str) -> ProofStep {
        ProofStep {
            term,
            rule: ustr::ustr(rule),
            reverse: true,
        }
    }
}

/// A failure to verify a proof.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ProofError {
    /// A step names a rule that is not in scope.
    #[error("step {step}: unknown rule `{name}`")]
    UnknownRule {
        /// 1-based step index.
        step: usize,
        /// The missing rule name.
        name: Ustr,
    },

    /// A step applies a rule in reverse that only works forwards.
    #[error("step {step}: rule `{name}` cannot be reversed: {details}")]
    Irreversible {
        /// 1-based step index.
        step: usize,
        /// The rule name.
        name: Ustr,
        /// Why the swapped rule is invalid.
        details: String,
    },

    /// A term in the chain does not compile.
    #[error("step {step}: {source}")]
    Compile {
        /// 1-based step index; 0 is the starting term.
        step: usize,
        /// The underlying failure.
        #[source]
        source: CompileError,
    },

    /// No rewrite by the rule produces the claimed next diagram.
    #[error("step {step}: rewriting by `{name}` does not produce the claimed term")]
    NoMatch {
        /// 1-based step index.
        step: usize,
        /// The rule name.
        name: Ustr,
    },
}

/** Does some rewrite of `prev` by the rule equal `next` up to isomorphism?

This is the single-step kernel of proof checking; the match enumeration is
lazy, so the cost is paid only up to the first witness.
 */
pub fn check_step(prev: &Hypergraph, next: &Hypergraph, rule: &Rule) -> bool {
    match_rule(rule, prev).any(|m| iso(&rewrite(rule, &m), next))
}

/** Checks a chain of terms against a rule table.

The table maps rule names to validated rules, in declaration order. The
chain starts at `start` and proceeds through `steps`; the first failing
step is reported.
 */
pub fn check_proof(
    rules: &IndexMap<Ustr, Rule>,
    start: &Term,
    steps: &[ProofStep],
) -> Result<(), ProofError> {
    let mut prev = compile(start).map_err(|source| ProofError::Compile { step: 0, source })?;
    for (i, step) in steps.iter().enumerate() {
        let index = i + 1;
        let next = compile(&step.term)
            .map_err(|source| ProofError::Compile { step: index, source })?;
        let rule = rules.get(&step.rule).ok_or(ProofError::UnknownRule {
            step: index,
            name: step.rule,
        })?;
        let reversed;
        let applied = if step.reverse {
            reversed = rule.reverse().map_err(|errors| ProofError::Irreversible {
                step: index,
                name: step.rule,
                details: errors_to_string(&errors),
            })?;
            &reversed
        } else {
            rule
        };
        if !check_step(&prev, &next, applied) {
            return Err(ProofError::NoMatch {
                step: index,
                name: step.rule,
            });
        }
        prev = next;
    }
    Ok(())
}
