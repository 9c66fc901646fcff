/*! A proof kernel for symmetric monoidal categories based on string diagrams.

# Organization

Morphisms in a symmetric monoidal category are represented as string diagrams,
which are in turn represented combinatorially as directed, labeled hypergraphs
with an ordered boundary. Equations between morphisms are checked by rewriting:
a rule is a pair of such hypergraphs with a common boundary, a match is a
convex embedding of a rule's left-hand side into a target diagram, and a
rewrite replaces the matched region by the right-hand side via a double
pushout. The modules are layered accordingly:

1. [`hypergraph`]: the combinatorial core — diagrams as hypergraphs with
   boundary, together with the operations of the monoidal category.
2. [`term`]: a syntax tree for monoidal terms and its compilation to
   hypergraphs.
3. [`rule`]: validated rewrite rules.
4. [`matcher`]: enumeration of convex embeddings, and isomorphism testing.
5. [`rewrite`]: double-pushout rewriting.
6. [`proof`]: checking chains of terms justified by rules.
7. [`io`]: the on-disk JSON formats for diagrams and rules.

Surface syntax, namespacing, and diagram layout are left to host
applications; this crate owns only the semantics.
*/

#![warn(missing_docs)]
#![allow(
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod validate;

pub mod hypergraph;
pub mod io;
pub mod matcher;
pub mod proof;
pub mod rewrite;
pub mod rule;
pub mod term;
