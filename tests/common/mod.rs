//! Shared fixtures: a scripted in-memory driver and a small mapping.
//!
//! The driver records every call made on its connections and answers
//! readers, scalars and non-queries from queues filled by the test.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use relmap::core::Value;
use relmap::data::ObjectId;
use relmap::mapping::{
    ClassDefinition, ClassKey, MappingConfiguration, PropertyDefinition, PropertyKey, PropertyType,
};
use relmap::model::{RdbmsPersistenceModel, load_persistence_model};
use relmap::provider::{
    ConnectionFactory, DbConnection, DriverError, DriverResult, IsolationLevel, RdbmsProvider,
    StorageProviderDefinition,
};
use relmap::result::QueryResult;
use relmap::command::SqlStatement;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open,
    Close,
    Begin(IsolationLevel),
    Commit,
    Rollback,
    Reader(String),
    Scalar(String),
    NonQuery(String),
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    parameters: Vec<Vec<Value>>,
    readers: VecDeque<DriverResult<QueryResult>>,
    scalars: VecDeque<DriverResult<Value>>,
    affected: VecDeque<DriverResult<u64>>,
}

/// Connection factory whose connections all share one script.
#[derive(Clone, Default)]
pub struct ScriptedDriver {
    script: Arc<Mutex<Script>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn push_rows(&self, result: QueryResult) {
        self.script().readers.push_back(Ok(result));
    }

    pub fn push_reader_error(&self, error: DriverError) {
        self.script().readers.push_back(Err(error));
    }

    pub fn push_scalar(&self, value: Value) {
        self.script().scalars.push_back(Ok(value));
    }

    /// Non-queries without a queued count report one affected row.
    pub fn push_affected(&self, count: u64) {
        self.script().affected.push_back(Ok(count));
    }

    pub fn push_non_query_error(&self, error: DriverError) {
        self.script().affected.push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script().calls.clone()
    }

    /// SQL text of every executed statement, in order.
    pub fn statements(&self) -> Vec<String> {
        self.script()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Reader(sql) | Call::Scalar(sql) | Call::NonQuery(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// Parameter values of every executed statement, in order.
    pub fn parameters(&self) -> Vec<Vec<Value>> {
        self.script().parameters.clone()
    }
}

impl ConnectionFactory for ScriptedDriver {
    fn create_connection(&self, _definition: &StorageProviderDefinition) -> DriverResult<Box<dyn DbConnection>> {
        Ok(Box::new(ScriptedConnection {
            script: self.script.clone(),
        }))
    }
}

struct ScriptedConnection {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnection {
    fn record(&self, call: Call) {
        self.script.lock().unwrap().calls.push(call);
    }

    fn record_statement(&self, call: Call, statement: &SqlStatement) -> MutexGuard<'_, Script> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(call);
        script
            .parameters
            .push(statement.parameters.iter().map(|p| p.value.clone()).collect());
        script
    }
}

impl DbConnection for ScriptedConnection {
    fn open(&mut self) -> DriverResult<()> {
        self.record(Call::Open);
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.record(Call::Close);
        Ok(())
    }

    fn begin_transaction(&mut self, isolation_level: IsolationLevel) -> DriverResult<()> {
        self.record(Call::Begin(isolation_level));
        Ok(())
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.record(Call::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.record(Call::Rollback);
        Ok(())
    }

    fn execute_reader(&mut self, statement: &SqlStatement) -> DriverResult<QueryResult> {
        let mut script = self.record_statement(Call::Reader(statement.text.clone()), statement);
        script.readers.pop_front().unwrap_or_else(|| Ok(QueryResult::empty()))
    }

    fn execute_scalar(&mut self, statement: &SqlStatement) -> DriverResult<Value> {
        let mut script = self.record_statement(Call::Scalar(statement.text.clone()), statement);
        script.scalars.pop_front().unwrap_or(Ok(Value::Null))
    }

    fn execute_non_query(&mut self, statement: &SqlStatement) -> DriverResult<u64> {
        let mut script = self.record_statement(Call::NonQuery(statement.text.clone()), statement);
        script.affected.pop_front().unwrap_or(Ok(1))
    }
}

/// Customer, and the Document hierarchy:
///
/// ```text
/// Document (abstract, union view)
/// ├── Order (table)
/// │   └── Invoice (filter view)
/// └── Receipt (table)
/// ```
pub struct Shop {
    pub model: Arc<RdbmsPersistenceModel>,
    pub customer: ClassKey,
    pub document: ClassKey,
    pub order: ClassKey,
    pub invoice: ClassKey,
    pub receipt: ClassKey,
    pub name: PropertyKey,
    pub title: PropertyKey,
    pub customer_ref: PropertyKey,
    pub number: PropertyKey,
    pub due: PropertyKey,
    pub amount: PropertyKey,
}

pub fn definition() -> StorageProviderDefinition {
    StorageProviderDefinition::new("main", "Server=.;Database=Shop")
}

pub fn shop() -> Shop {
    let mut mapping = MappingConfiguration::new();
    let customer = mapping.add_class(ClassDefinition::new("Customer", "main").with_table()).unwrap();
    let document = mapping
        .add_class(ClassDefinition::new("Document", "main").abstract_class())
        .unwrap();
    let order = mapping.add_class(ClassDefinition::new("Order", "main").with_table()).unwrap();
    let invoice = mapping.add_class(ClassDefinition::new("Invoice", "main")).unwrap();
    let receipt = mapping.add_class(ClassDefinition::new("Receipt", "main").with_table()).unwrap();
    mapping.set_base_class(order, document).unwrap();
    mapping.set_base_class(invoice, order).unwrap();
    mapping.set_base_class(receipt, document).unwrap();

    let name = mapping
        .add_property(customer, PropertyDefinition::value("Name", PropertyType::String).max_length(100))
        .unwrap();
    let title = mapping
        .add_property(document, PropertyDefinition::value("Title", PropertyType::String).max_length(100))
        .unwrap();
    let customer_ref = mapping
        .add_property(document, PropertyDefinition::relation("Customer", customer))
        .unwrap();
    let number = mapping
        .add_property(order, PropertyDefinition::value("Number", PropertyType::Int32))
        .unwrap();
    let due = mapping
        .add_property(invoice, PropertyDefinition::value("Due", PropertyType::DateTime).nullable())
        .unwrap();
    let amount = mapping
        .add_property(receipt, PropertyDefinition::value("Amount", PropertyType::Decimal))
        .unwrap();

    let model = load_persistence_model(&definition(), Arc::new(mapping)).unwrap();

    Shop {
        model: Arc::new(model),
        customer,
        document,
        order,
        invoice,
        receipt,
        name,
        title,
        customer_ref,
        number,
        due,
        amount,
    }
}

pub fn provider(shop: &Shop, driver: &ScriptedDriver) -> RdbmsProvider {
    RdbmsProvider::new(definition(), shop.model.clone(), Arc::new(driver.clone())).unwrap()
}

pub fn timestamp(version: u8) -> Value {
    Value::Binary(vec![0, 0, 0, 0, 0, 0, 0, version])
}

/// A result set with the given column names.
pub fn rows(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
    QueryResult::new(columns.iter().map(|c| c.to_string()).collect(), rows)
}

pub const ORDER_COLUMNS: [&str; 7] = ["ID", "ClassID", "Timestamp", "Title", "CustomerID", "Number", "Due"];

pub fn order_row(id: &ObjectId, title: &str, customer: Option<&ObjectId>, version: u8) -> Vec<Value> {
    vec![
        id.value().clone(),
        Value::Text(id.class_id().to_string()),
        timestamp(version),
        Value::Text(title.to_string()),
        customer.map(|c| c.value().clone()).unwrap_or(Value::Null),
        Value::Integer(1),
        Value::Null,
    ]
}

pub const RECEIPT_COLUMNS: [&str; 6] = ["ID", "ClassID", "Timestamp", "Title", "CustomerID", "Amount"];

pub fn receipt_row(id: &ObjectId, title: &str, customer: Option<&ObjectId>, version: u8) -> Vec<Value> {
    vec![
        id.value().clone(),
        Value::Text(id.class_id().to_string()),
        timestamp(version),
        Value::Text(title.to_string()),
        customer.map(|c| c.value().clone()).unwrap_or(Value::Null),
        Value::Float(12.5),
    ]
}

pub fn id_rows(ids: &[&ObjectId]) -> QueryResult {
    rows(
        &["ID", "ClassID"],
        ids.iter()
            .map(|id| vec![id.value().clone(), Value::Text(id.class_id().to_string())])
            .collect(),
    )
}

pub fn timestamp_rows(entries: &[(&ObjectId, u8)]) -> QueryResult {
    rows(
        &["ID", "ClassID", "Timestamp"],
        entries
            .iter()
            .map(|(id, version)| {
                vec![
                    id.value().clone(),
                    Value::Text(id.class_id().to_string()),
                    timestamp(*version),
                ]
            })
            .collect(),
    )
}
