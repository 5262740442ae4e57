//! Data sources and the datasets located within them.

use serde::{Deserialize, Serialize};

/// Kind of dataset registered with the lineage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetType {
    /// A table in a database or warehouse.
    DbTable,
    /// A topic or stream in a message broker.
    Stream,
}

impl std::fmt::Display for DatasetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetType::DbTable => write!(f, "DB_TABLE"),
            DatasetType::Stream => write!(f, "STREAM"),
        }
    }
}

/// A physical data system (database, warehouse, broker).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type")]
    source_type: String,
    name: String,
    connection_url: String,
}

impl Source {
    pub fn new(
        source_type: impl Into<String>,
        name: impl Into<String>,
        connection_url: impl Into<String>,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            name: name.into(),
            connection_url: connection_url.into(),
        }
    }

    /// Source kind, e.g. `POSTGRESQL`.
    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    /// Name of the source, unique within a namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection_url(&self) -> &str {
        &self.connection_url
    }
}

/// A named dataset inside a [`Source`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dataset {
    name: String,
    dataset_type: DatasetType,
    physical_name: String,
    source: Source,
}

impl Dataset {
    pub fn new(
        source: Source,
        name: impl Into<String>,
        physical_name: impl Into<String>,
        dataset_type: DatasetType,
    ) -> Self {
        Self {
            name: name.into(),
            dataset_type,
            physical_name: physical_name.into(),
            source,
        }
    }

    /// A table whose logical and physical names are the same.
    pub fn from_table(source: Source, table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        Self::new(source, table_name.clone(), table_name, DatasetType::DbTable)
    }

    /// A table whose physical name is qualified by a schema, e.g. `public.orders`.
    pub fn from_table_schema(
        source: Source,
        table_name: impl Into<String>,
        schema_name: Option<&str>,
    ) -> Self {
        let table_name = table_name.into();
        let physical_name = match schema_name {
            Some(schema) if !schema.is_empty() => format!("{schema}.{table_name}"),
            _ => table_name.clone(),
        };
        Self::new(source, table_name, physical_name, DatasetType::DbTable)
    }

    /// A topic in a message broker.
    pub fn from_stream(source: Source, topic: impl Into<String>) -> Self {
        let topic = topic.into();
        Self::new(source, topic.clone(), topic, DatasetType::Stream)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dataset_type(&self) -> DatasetType {
        self.dataset_type
    }

    pub fn physical_name(&self) -> &str {
        &self.physical_name
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Reference to this dataset as attached to a job in `namespace`.
    pub fn to_ref(&self, namespace: &str) -> DatasetRef {
        DatasetRef {
            namespace: namespace.to_string(),
            name: self.name.clone(),
        }
    }
}

/// A namespaced pointer to a dataset, used in job input/output lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef {
    pub namespace: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Source {
        Source::new("POSTGRESQL", "warehouse", "postgres://db:5432/warehouse")
    }

    #[test]
    fn test_from_table_uses_name_as_physical_name() {
        let ds = Dataset::from_table(source(), "orders");
        assert_eq!(ds.name(), "orders");
        assert_eq!(ds.physical_name(), "orders");
        assert_eq!(ds.dataset_type(), DatasetType::DbTable);
        assert_eq!(ds.source().name(), "warehouse");
    }

    #[test]
    fn test_from_table_schema_qualifies_physical_name() {
        let ds = Dataset::from_table_schema(source(), "orders", Some("public"));
        assert_eq!(ds.name(), "orders");
        assert_eq!(ds.physical_name(), "public.orders");

        let ds = Dataset::from_table_schema(source(), "orders", Some(""));
        assert_eq!(ds.physical_name(), "orders");
    }

    #[test]
    fn test_from_stream() {
        let ds = Dataset::from_stream(source(), "clicks");
        assert_eq!(ds.dataset_type(), DatasetType::Stream);
        assert_eq!(ds.physical_name(), "clicks");
    }

    #[test]
    fn test_to_ref() {
        let ds = Dataset::from_table(source(), "orders");
        assert_eq!(
            ds.to_ref("default"),
            DatasetRef {
                namespace: "default".into(),
                name: "orders".into()
            }
        );
    }

    #[test]
    fn test_dataset_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&DatasetType::DbTable).unwrap(),
            "\"DB_TABLE\""
        );
        assert_eq!(DatasetType::Stream.to_string(), "STREAM");
    }

    #[test]
    fn test_source_deserializes_type_field() {
        let src: Source = serde_json::from_str(
            r#"{"type": "MYSQL", "name": "shop", "connection_url": "mysql://shop"}"#,
        )
        .unwrap();
        assert_eq!(src.source_type(), "MYSQL");
        assert_eq!(src.connection_url(), "mysql://shop");
    }
}
