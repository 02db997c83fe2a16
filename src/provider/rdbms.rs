use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Level, event, info_span};

use super::config::StorageProviderDefinition;
use super::driver::{ConnectionFactory, DbConnection};
use crate::command::{
    Query, RdbmsExecutionContext, SqlDialect, SqlServerDialect, SqlStatement, StorageProviderCommand,
    StorageProviderCommandFactory,
};
use crate::core::{PersistenceError, Result, Value};
use crate::data::{DataContainer, DataContainerState, ObjectId, ObjectLookupResult};
use crate::mapping::{PropertyKey, SortExpression};
use crate::model::RdbmsPersistenceModel;
use crate::result::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Disconnected,
    Connected,
    TransactionActive,
    /// Terminal.
    Disposed,
}

/// Execution context of one relational store.
///
/// Owns one connection and at most one transaction. Not meant to be shared
/// between threads; create one provider per unit of work instead.
pub struct RdbmsProvider {
    definition: StorageProviderDefinition,
    connection_factory: Arc<dyn ConnectionFactory>,
    dialect: Arc<dyn SqlDialect>,
    commands: StorageProviderCommandFactory,
    connection: Option<Box<dyn DbConnection>>,
    state: ProviderState,
}

impl RdbmsProvider {
    pub fn new(
        definition: StorageProviderDefinition,
        model: Arc<RdbmsPersistenceModel>,
        connection_factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Self> {
        if model.storage_provider() != definition.name {
            return Err(PersistenceError::InvalidConfiguration(format!(
                "Persistence model of '{}' cannot serve storage provider '{}'",
                model.storage_provider(),
                definition.name
            )));
        }

        Ok(Self {
            definition,
            connection_factory,
            dialect: Arc::new(SqlServerDialect::new()),
            commands: StorageProviderCommandFactory::new(model),
            connection: None,
            state: ProviderState::Disconnected,
        })
    }

    /// Replace the SQL dialect
    pub fn with_dialect(mut self, dialect: Arc<dyn SqlDialect>) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn definition(&self) -> &StorageProviderDefinition {
        &self.definition
    }

    pub fn model(&self) -> &Arc<RdbmsPersistenceModel> {
        self.commands.model()
    }

    pub fn state(&self) -> ProviderState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ProviderState::Connected | ProviderState::TransactionActive)
    }

    pub fn is_in_transaction(&self) -> bool {
        self.state == ProviderState::TransactionActive
    }

    fn check_not_disposed(&self) -> Result<()> {
        if self.state == ProviderState::Disposed {
            return Err(PersistenceError::InvalidState(format!(
                "Storage provider '{}' has been disposed",
                self.definition.name
            )));
        }
        Ok(())
    }

    fn connection(&mut self) -> Result<&mut Box<dyn DbConnection>> {
        self.connection.as_mut().ok_or_else(|| PersistenceError::InvalidState("No open connection".into()))
    }

    /// Opens the connection; a no-op when already connected.
    pub fn connect(&mut self) -> Result<()> {
        self.check_not_disposed()?;
        if self.is_connected() {
            return Ok(());
        }

        let mut connection = self
            .connection_factory
            .create_connection(&self.definition)
            .map_err(|err| PersistenceError::execution("connection setup", err))?;
        connection.open().map_err(|err| {
            event!(Level::ERROR, error = %err, provider = %self.definition.name, "connection open failed");
            PersistenceError::execution("connection setup", err)
        })?;

        self.connection = Some(connection);
        self.state = ProviderState::Connected;
        event!(Level::DEBUG, provider = %self.definition.name, "connected");
        Ok(())
    }

    /// Rolls back an open transaction and closes the connection.
    pub fn disconnect(&mut self) -> Result<()> {
        self.check_not_disposed()?;
        let rolled_back = if self.is_in_transaction() { self.rollback() } else { Ok(()) };

        self.state = ProviderState::Disconnected;
        if let Some(mut connection) = self.connection.take() {
            connection
                .close()
                .map_err(|err| PersistenceError::execution("connection close", err))?;
            event!(Level::DEBUG, provider = %self.definition.name, "disconnected");
        }
        rolled_back
    }

    /// Releases the connection; the provider cannot be used afterwards.
    pub fn dispose(&mut self) {
        if self.state == ProviderState::Disposed {
            return;
        }
        if let Err(err) = self.disconnect() {
            event!(Level::ERROR, error = %err, provider = %self.definition.name, "dispose failed to disconnect");
        }
        self.connection = None;
        self.state = ProviderState::Disposed;
    }

    pub fn begin_transaction(&mut self) -> Result<()> {
        self.check_not_disposed()?;
        if self.is_in_transaction() {
            return Err(PersistenceError::InvalidState("Transaction already active".into()));
        }
        self.connect()?;

        let isolation_level = self.definition.isolation_level;
        self.connection()?
            .begin_transaction(isolation_level)
            .map_err(|err| PersistenceError::execution("BEGIN TRANSACTION", err))?;
        self.state = ProviderState::TransactionActive;
        event!(Level::DEBUG, isolation_level = %isolation_level, "transaction started");
        Ok(())
    }

    /// The transaction is over afterwards, whether the commit succeeded or not.
    pub fn commit(&mut self) -> Result<()> {
        self.end_transaction("COMMIT", |connection| connection.commit())
    }

    /// The transaction is over afterwards, whether the rollback succeeded or not.
    pub fn rollback(&mut self) -> Result<()> {
        self.end_transaction("ROLLBACK", |connection| connection.rollback())
    }

    fn end_transaction(
        &mut self,
        operation: &str,
        end: impl FnOnce(&mut Box<dyn DbConnection>) -> super::driver::DriverResult<()>,
    ) -> Result<()> {
        self.check_not_disposed()?;
        if !self.is_in_transaction() {
            return Err(PersistenceError::InvalidState("No active transaction".into()));
        }

        let outcome = end(self.connection()?);
        self.state = ProviderState::Connected;
        match outcome {
            Ok(()) => {
                event!(Level::DEBUG, operation, "transaction finished");
                Ok(())
            }
            Err(err) => {
                event!(Level::ERROR, error = %err, operation, "transaction end failed");
                Err(PersistenceError::execution(operation, err))
            }
        }
    }

    fn check_provider_of(&self, id: &ObjectId) -> Result<()> {
        let mapping = self.model().mapping();
        let class = mapping.class(mapping.class_by_id(id.class_id())?);
        if class.storage_provider != self.definition.name {
            return Err(PersistenceError::InvalidConfiguration(format!(
                "Object '{}' belongs to storage provider '{}', not '{}'",
                id, class.storage_provider, self.definition.name
            )));
        }
        Ok(())
    }

    fn check_query(&self, query: &Query) -> Result<()> {
        if query.storage_provider != self.definition.name {
            return Err(PersistenceError::Query(format!(
                "Query '{}' targets storage provider '{}', not '{}'",
                query.id, query.storage_provider, self.definition.name
            )));
        }
        Ok(())
    }

    pub fn load_data_container(&mut self, id: &ObjectId) -> Result<ObjectLookupResult<DataContainer>> {
        let span = info_span!("rdbms.load", provider = %self.definition.name, object_id = %id);
        let _enter = span.enter();

        self.check_not_disposed()?;
        self.check_provider_of(id)?;
        let command = self.commands.create_for_single_id_lookup(id.clone());
        command.execute(self)
    }

    /// Results follow the order of `ids`.
    pub fn load_data_containers(&mut self, ids: &[ObjectId]) -> Result<Vec<ObjectLookupResult<DataContainer>>> {
        let span = info_span!("rdbms.load_many", provider = %self.definition.name, count = ids.len());
        let _enter = span.enter();

        self.check_not_disposed()?;
        for id in ids {
            self.check_provider_of(id)?;
        }
        let command = self.commands.create_for_sorted_multi_id_lookup(ids.to_vec());
        command.execute(self)
    }

    /// Objects whose relation `property` points at `related_id`.
    pub fn load_data_containers_by_relation(
        &mut self,
        property: PropertyKey,
        related_id: &ObjectId,
        sort_expression: Option<&SortExpression>,
    ) -> Result<Vec<DataContainer>> {
        let relation = self.model().mapping().property_identifier(property);
        let span = info_span!(
            "rdbms.load_by_relation",
            provider = %self.definition.name,
            relation = %relation,
            related_id = %related_id
        );
        let _enter = span.enter();

        self.check_not_disposed()?;
        let command = self
            .commands
            .create_for_relation_lookup(property, related_id.clone(), sort_expression.cloned());
        let candidates = command.execute(self)?;

        let mut containers = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match candidate {
                Some(container) => containers.push(container),
                None => {
                    let err = PersistenceError::NullResult { relation };
                    event!(Level::ERROR, error = %err, "relation lookup returned a NULL entry");
                    return Err(err);
                }
            }
        }
        ensure_unique(containers.iter())?;
        Ok(containers)
    }

    pub fn execute_collection_query(&mut self, query: &Query) -> Result<Vec<Option<DataContainer>>> {
        let span = info_span!("rdbms.collection_query", provider = %self.definition.name, query = %query.id);
        let _enter = span.enter();

        self.check_not_disposed()?;
        self.check_query(query)?;
        let command = self.commands.create_for_data_container_query(query.clone());
        let containers = command.execute(self)?;
        ensure_unique(containers.iter().flatten())?;
        Ok(containers)
    }

    pub fn execute_custom_query(&mut self, query: &Query) -> Result<QueryResult> {
        let span = info_span!("rdbms.custom_query", provider = %self.definition.name, query = %query.id);
        let _enter = span.enter();

        self.check_not_disposed()?;
        self.check_query(query)?;
        let command = self.commands.create_for_custom_query(query.clone());
        command.execute(self)
    }

    pub fn execute_scalar_query(&mut self, query: &Query) -> Result<Value> {
        let span = info_span!("rdbms.scalar_query", provider = %self.definition.name, query = %query.id);
        let _enter = span.enter();

        self.check_not_disposed()?;
        self.check_query(query)?;
        let command = self.commands.create_for_scalar_query(query.clone());
        command.execute(self)
    }

    pub fn load_timestamps(&mut self, ids: &[ObjectId]) -> Result<Vec<ObjectLookupResult<Value>>> {
        self.check_not_disposed()?;
        for id in ids {
            self.check_provider_of(id)?;
        }
        let command = self.commands.create_for_multi_timestamp_lookup(ids.to_vec());
        command.execute(self)
    }

    /// Writes the batch inside a transaction.
    ///
    /// Stale timestamps of changed and deleted objects are reported together
    /// as one [`PersistenceError::ConcurrencyViolation`] before anything is
    /// written. Without a caller-owned transaction the provider opens one and
    /// rolls it back on any failure.
    pub fn save(&mut self, containers: &[DataContainer]) -> Result<()> {
        let span = info_span!("rdbms.save", provider = %self.definition.name, count = containers.len());
        let _enter = span.enter();

        self.check_not_disposed()?;
        for container in containers {
            self.check_provider_of(container.id())?;
        }

        let owns_transaction = !self.is_in_transaction();
        if owns_transaction {
            self.begin_transaction()?;
        }

        match self.save_in_transaction(containers) {
            Ok(()) => {
                if owns_transaction {
                    self.commit()?;
                }
                event!(Level::DEBUG, "data containers saved");
                Ok(())
            }
            Err(err) => {
                event!(Level::ERROR, error = %err, "save failed");
                if owns_transaction && let Err(rollback_err) = self.rollback() {
                    event!(Level::ERROR, error = %rollback_err, "rollback after failed save failed");
                }
                Err(err)
            }
        }
    }

    fn save_in_transaction(&mut self, containers: &[DataContainer]) -> Result<()> {
        self.check_timestamps(containers)?;
        let command = self.commands.create_for_save(containers.to_vec());
        command.execute(self)
    }

    /// A changed object without a timestamp is a violation; a deleted one was
    /// never stored and is skipped.
    fn check_timestamps(&mut self, containers: &[DataContainer]) -> Result<()> {
        let checked: Vec<&DataContainer> = containers
            .iter()
            .filter(|c| match c.state() {
                DataContainerState::Changed => true,
                DataContainerState::Deleted => c.timestamp().is_some(),
                DataContainerState::New | DataContainerState::Unchanged => false,
            })
            .collect();
        if checked.is_empty() {
            return Ok(());
        }

        let ids: Vec<ObjectId> = checked
            .iter()
            .filter(|c| c.timestamp().is_some())
            .map(|c| c.id().clone())
            .collect();
        let mut stored = if ids.is_empty() {
            Vec::new().into_iter()
        } else {
            let command = self.commands.create_for_multi_timestamp_lookup(ids);
            command.execute(self)?.into_iter()
        };

        let violations: Vec<ObjectId> = checked
            .iter()
            .filter(|container| match container.timestamp() {
                None => true,
                Some(expected) => stored.next().and_then(|lookup| lookup.located).as_ref() != Some(expected),
            })
            .map(|container| container.id().clone())
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(PersistenceError::ConcurrencyViolation(violations))
        }
    }

    /// Reloads timestamps after a save; deleted containers are skipped.
    pub fn update_timestamps(&mut self, containers: &mut [DataContainer]) -> Result<()> {
        let ids: Vec<ObjectId> = containers
            .iter()
            .filter(|c| c.state() != DataContainerState::Deleted)
            .map(|c| c.id().clone())
            .collect();
        if ids.is_empty() {
            return Ok(());
        }

        let stored = self.load_timestamps(&ids)?;
        let mut missing = Vec::new();
        let live = containers.iter_mut().filter(|c| c.state() != DataContainerState::Deleted);
        for (container, lookup) in live.zip(stored) {
            match lookup.located {
                Some(timestamp) => container.set_timestamp(timestamp),
                None => missing.push(lookup.object_id),
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PersistenceError::ConcurrencyViolation(missing))
        }
    }

    fn run<T>(
        &mut self,
        statement: &SqlStatement,
        execute: impl FnOnce(&mut Box<dyn DbConnection>, &SqlStatement) -> super::driver::DriverResult<T>,
    ) -> Result<T> {
        self.connect()?;
        event!(Level::DEBUG, sql = %statement.text, parameters = statement.parameters.len(), "executing");
        execute(self.connection()?, statement).map_err(|err| {
            event!(Level::ERROR, error = %err, sql = %statement.text, "command failed");
            PersistenceError::execution("SQL command", err)
        })
    }
}

/// No object may appear twice in a result.
fn ensure_unique<'a>(containers: impl Iterator<Item = &'a DataContainer>) -> Result<()> {
    let mut seen: HashSet<&ObjectId> = HashSet::new();
    for container in containers {
        if !seen.insert(container.id()) {
            let err = PersistenceError::DuplicateResult {
                object_id: container.id().clone(),
            };
            event!(Level::ERROR, error = %err, "duplicate object in result");
            return Err(err);
        }
    }
    Ok(())
}

impl RdbmsExecutionContext for RdbmsProvider {
    fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    fn execute_reader(&mut self, statement: &SqlStatement) -> Result<QueryResult> {
        self.run(statement, |connection, statement| connection.execute_reader(statement))
    }

    fn execute_scalar(&mut self, statement: &SqlStatement) -> Result<Value> {
        self.run(statement, |connection, statement| connection.execute_scalar(statement))
    }

    fn execute_non_query(&mut self, statement: &SqlStatement) -> Result<u64> {
        self.run(statement, |connection, statement| connection.execute_non_query(statement))
    }
}

impl Drop for RdbmsProvider {
    fn drop(&mut self) {
        self.dispose();
    }
}
