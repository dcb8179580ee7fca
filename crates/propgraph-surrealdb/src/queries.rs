//! SurrealQL statements for the property graph

use propgraph_core::PropertyRecord;

pub(crate) const PROPERTY_TABLE: &str = "property";
pub(crate) const ZIP_TABLE: &str = "zip";
pub(crate) const NEIGHBORHOOD_TABLE: &str = "neighborhood";
pub(crate) const IN_ZIP_TABLE: &str = "in_zip";
pub(crate) const IN_NEIGHBORHOOD_TABLE: &str = "in_neighborhood";
pub(crate) const CHECKPOINT_TABLE: &str = "checkpoint";

/// Every table the property model owns, edges first
pub(crate) const MODEL_TABLES: [&str; 5] = [
    IN_ZIP_TABLE,
    IN_NEIGHBORHOOD_TABLE,
    PROPERTY_TABLE,
    ZIP_TABLE,
    NEIGHBORHOOD_TABLE,
];

pub(crate) const ENSURE_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS property SCHEMALESS;
DEFINE TABLE IF NOT EXISTS zip SCHEMALESS;
DEFINE TABLE IF NOT EXISTS neighborhood SCHEMALESS;
DEFINE INDEX IF NOT EXISTS property_zpid ON TABLE property FIELDS zpid UNIQUE;
DEFINE INDEX IF NOT EXISTS zip_code ON TABLE zip FIELDS code;
DEFINE INDEX IF NOT EXISTS neighborhood_name ON TABLE neighborhood FIELDS name;
"#;

pub(crate) const RESET_SCOPED: &str = r#"
BEGIN TRANSACTION;
DELETE in_zip;
DELETE in_neighborhood;
DELETE property;
DELETE zip;
DELETE neighborhood;
COMMIT TRANSACTION;
"#;

pub(crate) const COUNTS: &str = r#"
SELECT count() AS count FROM property GROUP ALL;
SELECT count() AS count FROM zip GROUP ALL;
SELECT count() AS count FROM neighborhood GROUP ALL;
SELECT count() AS count FROM in_zip GROUP ALL;
SELECT count() AS count FROM in_neighborhood GROUP ALL;
"#;

/// Build the transaction that merges one record
///
/// Binds `$zpid` and `$props` always, `$zip` and `$neighborhood` only when
/// the record carries them. The existing edge between the same pair is
/// deleted before relating so repeated merges keep a single edge.
pub(crate) fn merge_property(record: &PropertyRecord) -> String {
    let mut sql = String::from(
        "BEGIN TRANSACTION;\n\
         LET $p = type::thing('property', $zpid);\n\
         UPSERT $p CONTENT $props;\n",
    );

    if record.zipcode.is_some() {
        sql.push_str(
            "LET $z = type::thing('zip', $zip);\n\
             UPSERT $z SET code = $zip;\n\
             DELETE in_zip WHERE in = $p AND out = $z;\n\
             RELATE $p->in_zip->$z;\n",
        );
    }

    if record.neighborhood.is_some() {
        sql.push_str(
            "LET $n = type::thing('neighborhood', $neighborhood);\n\
             UPSERT $n SET name = $neighborhood;\n\
             DELETE in_neighborhood WHERE in = $p AND out = $n;\n\
             RELATE $p->in_neighborhood->$n;\n",
        );
    }

    sql.push_str("COMMIT TRANSACTION;\n");
    sql
}
