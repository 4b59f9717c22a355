//! Boolean requirement trees.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::policy::error::CLAUSE_SHAPE_MARKER;

const CLAUSE_KINDS: &str = "'probe', 'and', 'or', or 'not'";

/// One node of a statement's requirement tree.
///
/// On the wire a clause is a mapping with exactly one of the keys `probe`,
/// `and`, `or` or `not`. Anything else is rejected while parsing, with the
/// line of the offending node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// Leaf: the outcome of every finding produced under this probe id.
    Probe(String),
    /// All children must pass; the worst child wins.
    And(Vec<Clause>),
    /// Any child may pass; the best child wins.
    Or(Vec<Clause>),
    /// Flips Positive and Negative; other outcomes pass through.
    Not(Box<Clause>),
}

impl Clause {
    pub fn probe(id: impl Into<String>) -> Self {
        Self::Probe(id.into())
    }

    pub fn and(children: Vec<Clause>) -> Self {
        Self::And(children)
    }

    pub fn or(children: Vec<Clause>) -> Self {
        Self::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Clause) -> Self {
        Self::Not(Box::new(child))
    }

    /// Every probe id referenced below this node, in tree order.
    pub fn probes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_probes(&mut out);
        out
    }

    fn collect_probes<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Probe(id) => out.push(id),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_probes(out);
                }
            }
            Self::Not(child) => child.collect_probes(out),
        }
    }
}

#[derive(Default)]
struct RawClause {
    probe: Option<String>,
    and: Option<Vec<Clause>>,
    or: Option<Vec<Clause>>,
    not: Option<Box<Clause>>,
}

fn shape_error<E: de::Error>(detail: String) -> E {
    E::custom(format!("{CLAUSE_SHAPE_MARKER}: {detail}"))
}

impl RawClause {
    fn into_clause<E: de::Error>(self) -> Result<Clause, E> {
        let probe = self.probe.filter(|p| !p.is_empty());
        let populated = usize::from(probe.is_some())
            + usize::from(self.and.is_some())
            + usize::from(self.or.is_some())
            + usize::from(self.not.is_some());

        if populated > 1 {
            return Err(shape_error(format!(
                "only one of {CLAUSE_KINDS} may be specified"
            )));
        }

        if let Some(id) = probe {
            return Ok(Clause::Probe(id));
        }
        if let Some(children) = self.and {
            if children.is_empty() {
                return Err(shape_error("'and' requires at least one clause".into()));
            }
            return Ok(Clause::And(children));
        }
        if let Some(children) = self.or {
            if children.is_empty() {
                return Err(shape_error("'or' requires at least one clause".into()));
            }
            return Ok(Clause::Or(children));
        }
        match self.not {
            Some(child) => Ok(Clause::Not(child)),
            None => Err(shape_error(format!(
                "one of {CLAUSE_KINDS} clauses must be specified"
            ))),
        }
    }
}

struct ClauseVisitor;

impl<'de> Visitor<'de> for ClauseVisitor {
    type Value = Clause;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a clause with one of {CLAUSE_KINDS}")
    }

    // Validation happens inside the visitor so the deserializer can attach
    // the position of this mapping to any shape error.
    fn visit_map<A>(self, mut map: A) -> Result<Clause, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut raw = RawClause::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "probe" => raw.probe = map.next_value()?,
                "and" => raw.and = map.next_value()?,
                "or" => raw.or = map.next_value()?,
                "not" => raw.not = map.next_value()?,
                _ => {
                    map.next_value::<de::IgnoredAny>()?;
                }
            }
        }
        raw.into_clause()
    }
}

impl<'de> Deserialize<'de> for Clause {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ClauseVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_leaf() {
        let c: Clause = serde_yaml::from_str("probe: fuzzedWithOSSFuzz").unwrap();
        assert_eq!(c, Clause::probe("fuzzedWithOSSFuzz"));
    }

    #[test]
    fn test_parse_nested_tree() {
        let yaml = "and:\n  - probe: A\n  - or:\n      - probe: B\n      - not:\n          probe: C\n";
        let c: Clause = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            c,
            Clause::and(vec![
                Clause::probe("A"),
                Clause::or(vec![Clause::probe("B"), Clause::not(Clause::probe("C"))]),
            ])
        );
        assert_eq!(c.probes(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_two_variants_rejected() {
        let err = serde_yaml::from_str::<Clause>("probe: A\nor:\n  - probe: B\n").unwrap_err();
        assert!(err.to_string().contains("only one of"));
    }

    #[test]
    fn test_zero_variants_rejected() {
        let err = serde_yaml::from_str::<Clause>("labels: [x]\n").unwrap_err();
        assert!(err.to_string().contains("must be specified"));
    }

    #[test]
    fn test_empty_probe_counts_as_unset() {
        let err = serde_yaml::from_str::<Clause>("probe: ''\n").unwrap_err();
        assert!(err.to_string().contains("must be specified"));
    }

    #[test]
    fn test_empty_and_rejected() {
        let err = serde_yaml::from_str::<Clause>("and: []\n").unwrap_err();
        assert!(err.to_string().contains("'and' requires at least one clause"));
    }

    #[test]
    fn test_serialize_matches_wire_shape() {
        let c = Clause::or(vec![Clause::probe("A"), Clause::probe("B")]);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json, serde_json::json!({"or": [{"probe": "A"}, {"probe": "B"}]}));
    }
}
