//! Result shapes returned by the catalog and the ad-hoc executor.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// One result row: column name to JSON value, in the order the server
/// returned the columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowMap {
    columns: Vec<(String, Value)>,
}

impl RowMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. A repeated name (e.g. `SELECT 1 AS a, 2 AS a`)
    /// replaces the earlier value in place.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// The value of the first column, used for single-column listings such
    /// as `SHOW DATABASES`.
    pub fn first_value(&self) -> Option<&Value> {
        self.columns.first().map(|(_, value)| value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for RowMap {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut row = RowMap::new();
        for (name, value) in iter {
            row.push(name, value);
        }
        row
    }
}

impl Serialize for RowMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Summary of a statement that produced no result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationSummary {
    pub affected_rows: u64,
    pub insert_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

/// Outcome of an ad-hoc statement, decided from the server's response.
///
/// Serializes untagged: a row array or a summary object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    Rows(Vec<RowMap>),
    Mutation(MutationSummary),
}

impl QueryResult {
    pub fn is_rows(&self) -> bool {
        matches!(self, Self::Rows(_))
    }

    pub fn rows(&self) -> Option<&[RowMap]> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Mutation(_) => None,
        }
    }

    pub fn mutation(&self) -> Option<&MutationSummary> {
        match self {
            Self::Rows(_) => None,
            Self::Mutation(summary) => Some(summary),
        }
    }
}

/// Caller-authored SQL plus an optional target database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AdhocStatement {
    #[serde(default)]
    pub sql: String,
    #[serde(default, rename = "db")]
    pub database: Option<String>,
}

impl AdhocStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            database: None,
        }
    }

    pub fn in_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// The target database, with an empty string meaning none.
    pub fn target_database(&self) -> Option<&str> {
        self.database.as_deref().filter(|db| !db.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_map_keeps_column_order() {
        let row: RowMap = [("zeta", json!(1)), ("alpha", json!("a")), ("mid", Value::Null)]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"zeta":1,"alpha":"a","mid":null}"#
        );
        assert_eq!(row.first_value(), Some(&json!(1)));
        assert_eq!(row.column_names().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn duplicate_column_names_keep_last_value() {
        let mut row = RowMap::new();
        row.push("a", json!(1));
        row.push("a", json!(2));
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("a"), Some(&json!(2)));
    }

    #[test]
    fn query_result_serializes_untagged() {
        let rows = QueryResult::Rows(vec![[("x", json!(1))].into_iter().collect()]);
        assert_eq!(serde_json::to_value(&rows).unwrap(), json!([{ "x": 1 }]));

        let mutation = QueryResult::Mutation(MutationSummary {
            affected_rows: 1,
            insert_id: 7,
            info: None,
        });
        assert_eq!(
            serde_json::to_value(&mutation).unwrap(),
            json!({ "affectedRows": 1, "insertId": 7 })
        );
    }

    #[test]
    fn empty_db_means_no_target() {
        let stmt: AdhocStatement = serde_json::from_value(json!({ "sql": "SELECT 1", "db": "" })).unwrap();
        assert_eq!(stmt.target_database(), None);
        let stmt = AdhocStatement::new("SELECT 1").in_database("shop");
        assert_eq!(stmt.target_database(), Some("shop"));
    }

    #[test]
    fn missing_sql_deserializes_empty() {
        let stmt: AdhocStatement = serde_json::from_value(json!({})).unwrap();
        assert!(stmt.sql.is_empty());
        assert!(stmt.database.is_none());
    }
}
