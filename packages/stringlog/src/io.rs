/*! The on-disk JSON formats for diagrams and rules.

A diagram document (conventionally a `.chyp` file) names its vertices and
edges by string-encoded non-negative integers, which become the handles of
the loaded graph. A rule document (`.chyprule`) is a pair of diagram
documents under `lhs` and `rhs`. Parsing is strict: unknown fields,
non-integer names, dangling references, and diagrams violating the shape
invariants are all rejected. Printing round-trips handles and display
positions exactly.
*/

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ustr::ustr;

use crate::hypergraph::{E, Hypergraph, InvalidHypergraph, Pos, V};
use crate::rule::{InvalidRule, Rule};
use crate::validate::{Validate, errors_to_string};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct VertexDoc {
    x: f64,
    y: f64,
    value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EdgeDoc {
    s: Vec<String>,
    t: Vec<String>,
    x: f64,
    y: f64,
    hyper: bool,
    value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct GraphDoc {
    vertices: BTreeMap<String, VertexDoc>,
    edges: BTreeMap<String, EdgeDoc>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDoc {
    lhs: GraphDoc,
    rhs: GraphDoc,
}

/// A failure to load a diagram or rule document.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The document is not well-formed JSON of the expected shape.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The file could not be read or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A vertex or edge name that is not a non-negative integer.
    #[error("`{0}` is not a non-negative integer name")]
    BadName(String),

    /// Two vertex names decoding to the same handle.
    #[error("duplicate vertex name `{0}`")]
    DuplicateVertex(String),

    /// Two edge names decoding to the same handle.
    #[error("duplicate edge name `{0}`")]
    DuplicateEdge(String),

    /// A reference to a vertex name the document does not define.
    #[error("unknown vertex name `{0}`")]
    UnknownVertex(String),

    /// The document describes a diagram violating the shape invariants.
    #[error("invalid diagram: {}", errors_to_string(.0))]
    Invalid(NonEmpty<InvalidHypergraph>),

    /// The two sides of a rule document do not agree.
    #[error("invalid rule: {}", errors_to_string(.0))]
    Rule(NonEmpty<InvalidRule>),
}

fn parse_name(name: &str) -> Result<usize, LoadError> {
    // `usize::from_str` would also accept a leading `+`.
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LoadError::BadName(name.to_owned()));
    }
    name.parse().map_err(|_| LoadError::BadName(name.to_owned()))
}

fn graph_from_doc(doc: &GraphDoc) -> Result<Hypergraph, LoadError> {
    let mut g = Hypergraph::new();
    for (name, vdoc) in &doc.vertices {
        let v = V(parse_name(name)?);
        if g.has_vertex(v) {
            return Err(LoadError::DuplicateVertex(name.clone()));
        }
        g.add_vertex_at(v, ustr(&vdoc.value), Pos::new(vdoc.x, vdoc.y));
    }
    let resolve = |g: &Hypergraph, name: &String| -> Result<V, LoadError> {
        let v = V(parse_name(name)?);
        if !g.has_vertex(v) {
            return Err(LoadError::UnknownVertex(name.clone()));
        }
        Ok(v)
    };
    for (name, edoc) in &doc.edges {
        let e = E(parse_name(name)?);
        if g.has_edge(e) {
            return Err(LoadError::DuplicateEdge(name.clone()));
        }
        let sources = edoc.s.iter().map(|n| resolve(&g, n)).collect::<Result<Vec<_>, _>>()?;
        let targets = edoc.t.iter().map(|n| resolve(&g, n)).collect::<Result<Vec<_>, _>>()?;
        g.add_edge_at(e, sources, targets, ustr(&edoc.value), Pos::new(edoc.x, edoc.y), edoc.hyper);
    }
    let inputs = doc.inputs.iter().map(|n| resolve(&g, n)).collect::<Result<Vec<_>, _>>()?;
    let outputs = doc.outputs.iter().map(|n| resolve(&g, n)).collect::<Result<Vec<_>, _>>()?;
    g.set_inputs(inputs);
    g.set_outputs(outputs);
    g.validate().map_err(LoadError::Invalid)?;
    Ok(g)
}

fn graph_to_doc(g: &Hypergraph) -> GraphDoc {
    GraphDoc {
        vertices: g
            .vertices()
            .map(|v| {
                let data = g.vertex_data(v);
                let doc = VertexDoc {
                    x: data.pos.x,
                    y: data.pos.y,
                    value: data.value.to_string(),
                };
                (v.to_string(), doc)
            })
            .collect(),
        edges: g
            .edges()
            .map(|e| {
                let data = g.edge_data(e);
                let doc = EdgeDoc {
                    s: data.sources().iter().map(V::to_string).collect(),
                    t: data.targets().iter().map(V::to_string).collect(),
                    x: data.pos.x,
                    y: data.pos.y,
                    hyper: data.hyper,
                    value: data.value.to_string(),
                };
                (e.to_string(), doc)
            })
            .collect(),
        inputs: g.inputs().iter().map(V::to_string).collect(),
        outputs: g.outputs().iter().map(V::to_string).collect(),
    }
}

/// Parses a diagram document.
pub fn graph_from_str(s: &str) -> Result<Hypergraph, LoadError> {
    let doc: GraphDoc = serde_json::from_str(s)?;
    graph_from_doc(&doc)
}

/// Prints a diagram document.
pub fn graph_to_string(g: &Hypergraph) -> String {
    serde_json::to_string_pretty(&graph_to_doc(g)).expect("diagram documents serialize")
}

/// Parses a rule document, validating boundary agreement under the given name.
pub fn rule_from_str(name: &str, s: &str) -> Result<Rule, LoadError> {
    let doc: RuleDoc = serde_json::from_str(s)?;
    let lhs = graph_from_doc(&doc.lhs)?;
    let rhs = graph_from_doc(&doc.rhs)?;
    Rule::new(ustr(name), lhs, rhs).map_err(LoadError::Rule)
}

/// Prints a rule document.
pub fn rule_to_string(rule: &Rule) -> String {
    let doc = RuleDoc {
        lhs: graph_to_doc(rule.lhs()),
        rhs: graph_to_doc(rule.rhs()),
    };
    serde_json::to_string_pretty(&doc).expect("rule documents serialize")
}

/// Reads a `.chyp` diagram file.
pub fn read_graph_file(path: impl AsRef<Path>) -> Result<Hypergraph, LoadError> {
    graph_from_str(&fs::read_to_string(path)?)
}

/// Writes a `.chyp` diagram file.
pub fn write_graph_file(path: impl AsRef<Path>, g: &Hypergraph) -> std::io::Result<()> {
    fs::write(path, graph_to_string(g))
}

/// Reads a `.chyprule` rule file, naming the rule after the file stem.
pub fn read_rule_file(path: impl AsRef<Path>) -> Result<Rule, LoadError> {
    let path = path.as_ref();
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("rule").to_owned();
    rule_from_str(&name, &fs::read_to_string(path)?)
}

/// Writes a `.chyprule` rule file.
pub fn write_rule_file(path: impl AsRef<Path>, rule: &Rule) -> std::io::Result<()> {
    fs::write(path, rule_to_string(rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::iso;
    use crate::term::{Term, compile};

    const F_EDGE: &str = r#"{
        "vertices": {
            "0": {"x": 0, "y": 0, "value": ""},
            "3": {"x": 1.5, "y": -2, "value": "q"}
        },
        "edges": {
            "0": {"s": ["0"], "t": ["3"], "x": 1, "y": 0, "hyper": true, "value": "f"}
        },
        "inputs": ["0"],
        "outputs": ["3"]
    }"#;

    #[test]
    fn parse_a_diagram() {
        let g = graph_from_str(F_EDGE).unwrap();
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.inputs(), &[V(0)]);
        assert_eq!(g.outputs(), &[V(3)]);
        assert_eq!(g.vertex_data(V(3)).value, ustr("q"));
        assert_eq!(g.vertex_data(V(3)).pos, Pos::new(1.5, -2.0));
        assert_eq!(g.edge_data(E(0)).value, ustr("f"));

        // Fresh handles never collide with loaded ones.
        let mut g = g;
        let v = g.add_vertex(ustr(""), Pos::default());
        assert_eq!(v, V(4));
    }

    #[test]
    fn round_trip_preserves_handles_and_positions() {
        let g = graph_from_str(F_EDGE).unwrap();
        let h = graph_from_str(&graph_to_string(&g)).unwrap();
        assert_eq!(g.vertices().collect::<Vec<_>>(), h.vertices().collect::<Vec<_>>());
        assert_eq!(g.edges().collect::<Vec<_>>(), h.edges().collect::<Vec<_>>());
        assert_eq!(g.vertex_data(V(3)).pos, h.vertex_data(V(3)).pos);
        assert_eq!(g.inputs(), h.inputs());
        assert_eq!(g.outputs(), h.outputs());
        assert!(iso(&g, &h));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_names() {
        let extra = F_EDGE.replace(r#""inputs""#, r#""colour": 3, "inputs""#);
        assert!(matches!(graph_from_str(&extra), Err(LoadError::Json(_))));

        let missing = F_EDGE.replace(r#""hyper": true, "#, "");
        assert!(matches!(graph_from_str(&missing), Err(LoadError::Json(_))));

        let bad = F_EDGE.replace(r#""3""#, r#""x3""#);
        assert!(matches!(graph_from_str(&bad), Err(LoadError::BadName(_))));

        let signed = F_EDGE.replace(r#""3""#, r#""+3""#);
        assert!(matches!(graph_from_str(&signed), Err(LoadError::BadName(_))));

        // "03" and "3" are distinct names for the same handle.
        let dup = F_EDGE.replace(
            r#""3": {"x": 1.5, "y": -2, "value": "q"}"#,
            r#""3": {"x": 1.5, "y": -2, "value": "q"},
               "03": {"x": 0, "y": 0, "value": ""}"#,
        );
        assert!(matches!(graph_from_str(&dup), Err(LoadError::DuplicateVertex(_))));
    }

    #[test]
    fn rejects_dangling_references() {
        let dangling = F_EDGE.replace(r#""t": ["3"]"#, r#""t": ["7"]"#);
        assert!(matches!(graph_from_str(&dangling), Err(LoadError::UnknownVertex(_))));

        let dangling = F_EDGE.replace(r#""outputs": ["3"]"#, r#""outputs": ["7"]"#);
        assert!(matches!(graph_from_str(&dangling), Err(LoadError::UnknownVertex(_))));
    }

    #[test]
    fn rejects_malformed_diagrams() {
        // A second edge into the same target vertex breaks monogamy.
        let twice = F_EDGE.replace(
            r#""0": {"s": ["0"], "t": ["3"], "x": 1, "y": 0, "hyper": true, "value": "f"}"#,
            r#""0": {"s": ["0"], "t": ["3"], "x": 1, "y": 0, "hyper": true, "value": "f"},
               "1": {"s": ["0"], "t": ["3"], "x": 1, "y": 1, "hyper": true, "value": "g"}"#,
        );
        assert!(matches!(graph_from_str(&twice), Err(LoadError::Invalid(_))));

        // A directed cycle with an empty boundary.
        let cyclic = r#"{
            "vertices": {
                "0": {"x": 0, "y": 0, "value": ""},
                "1": {"x": 0, "y": 1, "value": ""}
            },
            "edges": {
                "0": {"s": ["0"], "t": ["1"], "x": 0, "y": 0, "hyper": true, "value": "f"},
                "1": {"s": ["1"], "t": ["0"], "x": 0, "y": 0, "hyper": true, "value": "g"}
            },
            "inputs": [],
            "outputs": []
        }"#;
        assert!(matches!(graph_from_str(cyclic), Err(LoadError::Invalid(_))));
    }

    #[test]
    fn rule_documents() {
        let m = Term::generator("m", 2, 1);
        let lhs = compile(&m.clone().par(Term::Id).seq(m.clone())).unwrap();
        let rhs = compile(&Term::Id.par(m.clone()).seq(m)).unwrap();
        let rule = Rule::new(ustr("assoc"), lhs, rhs).unwrap();

        let loaded = rule_from_str("assoc", &rule_to_string(&rule)).unwrap();
        assert_eq!(loaded.name(), ustr("assoc"));
        assert!(iso(loaded.lhs(), rule.lhs()));
        assert!(iso(loaded.rhs(), rule.rhs()));

        // Mismatched boundaries are rejected by the loader.
        let bad = RuleDoc {
            lhs: graph_to_doc(&compile(&Term::generator("f", 1, 1)).unwrap()),
            rhs: graph_to_doc(&compile(&Term::generator("g", 1, 2)).unwrap()),
        };
        let s = serde_json::to_string(&bad).unwrap();
        assert!(matches!(rule_from_str("bad", &s), Err(LoadError::Rule(_))));
    }

    #[test]
    fn file_round_trip() {
        let g = graph_from_str(F_EDGE).unwrap();
        let path = std::env::temp_dir().join("stringlog-io-test.chyp");
        write_graph_file(&path, &g).unwrap();
        let h = read_graph_file(&path).unwrap();
        assert!(iso(&g, &h));
        std::fs::remove_file(&path).ok();
    }
}
