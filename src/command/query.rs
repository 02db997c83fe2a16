use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::reader::DataContainerReader;
use super::sql::{SqlParameter, SqlStatement};
use super::{RdbmsExecutionContext, StorageProviderCommand};
use crate::core::{PersistenceError, Result, Value};
use crate::data::{DataContainer, ObjectId};
use crate::model::RdbmsPersistenceModel;
use crate::result::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Rows are materialized into data containers.
    Collection,
    /// Rows are returned as they are.
    Custom,
    /// First column of the first row.
    Scalar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameter {
    pub name: String,
    pub value: Value,
}

/// A caller-written statement with named parameters.
///
/// ```
/// use relmap::command::{Query, QueryType};
///
/// let query = Query::new("OrdersByNumber", "main", QueryType::Collection,
///         "SELECT * FROM [OrderView] WHERE [Number] > @minimum")
///     .parameter("minimum", 10i64);
/// assert_eq!(query.parameters.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub id: String,
    pub storage_provider: String,
    pub query_type: QueryType,
    pub statement: String,
    pub parameters: Vec<QueryParameter>,
}

impl Query {
    pub fn new(
        id: impl Into<String>,
        storage_provider: impl Into<String>,
        query_type: QueryType,
        statement: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            storage_provider: storage_provider.into(),
            query_type,
            statement: statement.into(),
            parameters: Vec::new(),
        }
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push(QueryParameter {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Binds the identifier's value; the class ID is not part of the parameter.
    pub fn object_id_parameter(self, name: impl Into<String>, id: &ObjectId) -> Self {
        self.parameter(name, id.value().clone())
    }

    pub(crate) fn ensure_type(&self, expected: QueryType) -> Result<()> {
        if self.query_type != expected {
            return Err(PersistenceError::Query(format!(
                "Query '{}' is a {:?} query, expected {:?}",
                self.id, self.query_type, expected
            )));
        }
        Ok(())
    }

    fn to_statement(&self, context: &dyn RdbmsExecutionContext) -> SqlStatement {
        let dialect = context.dialect();
        SqlStatement {
            text: self.statement.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|p| SqlParameter {
                    name: dialect.parameter_name(&p.name),
                    value: p.value.clone(),
                })
                .collect(),
        }
    }
}

pub struct DataContainerQueryCommand {
    model: Arc<RdbmsPersistenceModel>,
    query: Query,
}

impl DataContainerQueryCommand {
    pub fn new(model: Arc<RdbmsPersistenceModel>, query: Query) -> Self {
        Self { model, query }
    }
}

impl StorageProviderCommand for DataContainerQueryCommand {
    type Output = Vec<Option<DataContainer>>;

    fn execute(&self, context: &mut dyn RdbmsExecutionContext) -> Result<Self::Output> {
        self.query.ensure_type(QueryType::Collection)?;
        let statement = self.query.to_statement(context);
        let result = context.execute_reader(&statement)?;
        DataContainerReader::new(&self.model).read_all(&result)
    }
}

pub struct CustomQueryCommand {
    query: Query,
}

impl CustomQueryCommand {
    pub fn new(query: Query) -> Self {
        Self { query }
    }
}

impl StorageProviderCommand for CustomQueryCommand {
    type Output = QueryResult;

    fn execute(&self, context: &mut dyn RdbmsExecutionContext) -> Result<Self::Output> {
        self.query.ensure_type(QueryType::Custom)?;
        let statement = self.query.to_statement(context);
        context.execute_reader(&statement)
    }
}

pub struct ScalarQueryCommand {
    query: Query,
}

impl ScalarQueryCommand {
    pub fn new(query: Query) -> Self {
        Self { query }
    }
}

impl StorageProviderCommand for ScalarQueryCommand {
    type Output = Value;

    fn execute(&self, context: &mut dyn RdbmsExecutionContext) -> Result<Self::Output> {
        self.query.ensure_type(QueryType::Scalar)?;
        let statement = self.query.to_statement(context);
        context.execute_scalar(&statement)
    }
}
