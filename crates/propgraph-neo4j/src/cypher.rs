//! Cypher statements for the property graph

use propgraph_config::ResetMode;
use propgraph_core::PropertyRecord;

pub(crate) const SCHEMA: [&str; 3] = [
    "CREATE CONSTRAINT property_zpid IF NOT EXISTS FOR (p:Property) REQUIRE p.zpid IS UNIQUE",
    "CREATE INDEX zip_code IF NOT EXISTS FOR (z:Zip) ON (z.code)",
    "CREATE INDEX neighborhood_name IF NOT EXISTS FOR (n:Neighborhood) ON (n.name)",
];

/// `SET p = $props` replaces every attribute, dropping ones now absent
pub(crate) const MERGE_PROPERTY: &str = "MERGE (p:Property {zpid: $zpid}) SET p = $props";

pub(crate) const MERGE_ZIP: &str = "MATCH (p:Property {zpid: $zpid}) \
     MERGE (z:Zip {code: $code}) \
     MERGE (p)-[:IN_ZIP]->(z)";

pub(crate) const MERGE_NEIGHBORHOOD: &str = "MATCH (p:Property {zpid: $zpid}) \
     MERGE (n:Neighborhood {name: $name}) \
     MERGE (p)-[:IN_NEIGHBORHOOD]->(n)";

pub(crate) const COUNTS: [(&str, &str); 5] = [
    ("properties", "MATCH (p:Property) RETURN count(p) AS c"),
    ("zips", "MATCH (z:Zip) RETURN count(z) AS c"),
    ("neighborhoods", "MATCH (n:Neighborhood) RETURN count(n) AS c"),
    ("in_zip", "MATCH (:Property)-[r:IN_ZIP]->(:Zip) RETURN count(r) AS c"),
    (
        "in_neighborhood",
        "MATCH (:Property)-[r:IN_NEIGHBORHOOD]->(:Neighborhood) RETURN count(r) AS c",
    ),
];

/// Statement deleting data for `mode`, if any
pub(crate) fn reset(mode: ResetMode) -> Option<&'static str> {
    match mode {
        ResetMode::None => None,
        ResetMode::Scoped => Some(
            "MATCH (n) WHERE n:Property OR n:Zip OR n:Neighborhood DETACH DELETE n",
        ),
        ResetMode::All => Some("MATCH (n) DETACH DELETE n"),
    }
}

/// A statement within a record's merge transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeStep {
    Property,
    Zip,
    Neighborhood,
}

impl MergeStep {
    pub(crate) fn cypher(&self) -> &'static str {
        match self {
            Self::Property => MERGE_PROPERTY,
            Self::Zip => MERGE_ZIP,
            Self::Neighborhood => MERGE_NEIGHBORHOOD,
        }
    }
}

/// Steps needed for `record`, in execution order
pub(crate) fn merge_steps(record: &PropertyRecord) -> Vec<MergeStep> {
    let mut steps = vec![MergeStep::Property];
    if record.zipcode.is_some() {
        steps.push(MergeStep::Zip);
    }
    if record.neighborhood.is_some() {
        steps.push(MergeStep::Neighborhood);
    }
    steps
}
