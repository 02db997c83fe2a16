/// Save tests
///
/// Statement ordering, optimistic concurrency and transaction ownership of
/// RdbmsProvider::save.
/// Run with: cargo test --test save_tests

mod common;

use std::sync::Arc;

use common::{Call, ScriptedDriver, Shop, provider, shop, timestamp, timestamp_rows};
use relmap::core::{PersistenceError, Value};
use relmap::data::{DataContainer, DataContainerState, ObjectId, PropertyValue};
use relmap::mapping::{ClassDefinition, MappingConfiguration, PropertyDefinition, PropertyType};
use relmap::model::load_persistence_model;
use relmap::provider::{DriverError, IsolationLevel, RdbmsProvider, StorageProviderDefinition};

fn new_order(shop: &Shop, customer: Option<&ObjectId>) -> DataContainer {
    let mut container = DataContainer::new_for_insert(ObjectId::new_guid("Order"));
    container.set_value(shop.title, PropertyValue::Scalar(Value::Text("new".into())));
    container.set_value(shop.number, PropertyValue::Scalar(Value::Integer(5)));
    if let Some(customer) = customer {
        container.set_value(shop.customer_ref, PropertyValue::from(customer.clone()));
    }
    container
}

fn changed_order(shop: &Shop, version: u8) -> DataContainer {
    let mut container = DataContainer::new_loaded(ObjectId::new_guid("Order"), timestamp(version));
    container.set_loaded_value(shop.title, PropertyValue::Scalar(Value::Text("old".into())));
    container.set_value(shop.title, PropertyValue::Scalar(Value::Text("changed".into())));
    container
}

fn deleted_order(version: u8) -> DataContainer {
    let mut container = DataContainer::new_loaded(ObjectId::new_guid("Order"), timestamp(version));
    container.mark_deleted();
    container
}

#[test]
fn test_save_statement_order() {
    let shop = shop();
    let driver = ScriptedDriver::new();
    let customer = ObjectId::new_guid("Customer");
    let inserted = new_order(&shop, Some(&customer));
    let changed = changed_order(&shop, 3);
    let deleted = deleted_order(5);
    assert_eq!(changed.state(), DataContainerState::Changed);

    driver.push_rows(timestamp_rows(&[(changed.id(), 3), (deleted.id(), 5)]));

    let mut provider = provider(&shop, &driver);
    provider
        .save(&[inserted.clone(), changed.clone(), deleted.clone()])
        .unwrap();

    assert_eq!(
        driver.statements(),
        vec![
            "SELECT [ID], [ClassID], [Timestamp] FROM [OrderView] WHERE [ID] IN (@p0, @p1);".to_string(),
            "INSERT INTO [Order] ([ID], [ClassID], [Title], [Number]) VALUES (@p0, @p1, @p2, @p3);".to_string(),
            "UPDATE [Order] SET [CustomerID] = @p0 WHERE [ID] = @p1;".to_string(),
            "UPDATE [Order] SET [Title] = @p0 WHERE [ID] = @p1 AND [Timestamp] = @p2;".to_string(),
            "UPDATE [Order] SET [CustomerID] = @p0 WHERE [ID] = @p1 AND [Timestamp] = @p2;".to_string(),
            "DELETE FROM [Order] WHERE [ID] = @p0;".to_string(),
        ]
    );

    let parameters = driver.parameters();
    assert_eq!(parameters[2], vec![customer.value().clone(), inserted.id().value().clone()]);
    assert_eq!(parameters[4][0], Value::Null);

    let calls = driver.calls();
    assert_eq!(calls[0], Call::Open);
    assert_eq!(calls[1], Call::Begin(IsolationLevel::Serializable));
    assert_eq!(calls.last(), Some(&Call::Commit));
    assert!(!provider.is_in_transaction());
}

#[test]
fn test_stale_timestamps_are_reported_together_before_writing() {
    let shop = shop();
    let driver = ScriptedDriver::new();
    let changed = changed_order(&shop, 3);
    let deleted = deleted_order(5);
    let untouched = changed_order(&shop, 1);

    // changed was updated elsewhere, deleted is gone
    driver.push_rows(timestamp_rows(&[(changed.id(), 4), (untouched.id(), 1)]));

    let mut provider = provider(&shop, &driver);
    let err = provider
        .save(&[changed.clone(), deleted.clone(), untouched])
        .unwrap_err();

    match err {
        PersistenceError::ConcurrencyViolation(ids) => {
            assert_eq!(ids, vec![changed.id().clone(), deleted.id().clone()]);
        }
        other => panic!("expected a concurrency violation, got {:?}", other),
    }

    let calls = driver.calls();
    assert!(!calls.iter().any(|call| matches!(call, Call::NonQuery(_))));
    assert!(!calls.contains(&Call::Commit));
    assert_eq!(calls.last(), Some(&Call::Rollback));
}

#[test]
fn test_zero_affected_rows_is_a_concurrency_violation() {
    let shop = shop();
    let driver = ScriptedDriver::new();
    let changed = changed_order(&shop, 3);
    driver.push_rows(timestamp_rows(&[(changed.id(), 3)]));
    driver.push_affected(0);

    let mut provider = provider(&shop, &driver);
    let err = provider.save(std::slice::from_ref(&changed)).unwrap_err();

    assert!(err.is_concurrency_violation());
    assert!(err.to_string().contains(&changed.id().to_string()));
    assert_eq!(driver.calls().last(), Some(&Call::Rollback));
}

#[test]
fn test_driver_failure_during_save_rolls_back() {
    let shop = shop();
    let driver = ScriptedDriver::new();
    driver.push_non_query_error(DriverError::Command("deadlock victim".into()));

    let mut provider = provider(&shop, &driver);
    let err = provider.save(&[new_order(&shop, None)]).unwrap_err();

    assert_eq!(
        err.to_string(),
        "Error while executing SQL command: Command error: deadlock victim"
    );
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(driver.calls().last(), Some(&Call::Rollback));
    assert!(provider.is_connected());
    assert!(!provider.is_in_transaction());
}

#[test]
fn test_save_inside_caller_transaction() {
    let shop = shop();
    let driver = ScriptedDriver::new();

    let mut provider = provider(&shop, &driver);
    provider.begin_transaction().unwrap();
    provider.save(&[new_order(&shop, None)]).unwrap();

    assert!(provider.is_in_transaction());
    assert!(!driver.calls().contains(&Call::Commit));

    provider.commit().unwrap();
    assert_eq!(driver.calls().last(), Some(&Call::Commit));
}

#[test]
fn test_unchanged_containers_write_nothing() {
    let shop = shop();
    let driver = ScriptedDriver::new();
    let unchanged = DataContainer::new_loaded(ObjectId::new_guid("Order"), timestamp(1));

    let mut provider = provider(&shop, &driver);
    provider.save(&[unchanged]).unwrap();
    assert!(driver.statements().is_empty());
}

#[test]
fn test_update_timestamps_after_save() {
    let shop = shop();
    let driver = ScriptedDriver::new();
    let mut containers = vec![new_order(&shop, None), deleted_order(2)];
    driver.push_rows(timestamp_rows(&[(containers[0].id(), 9)]));

    let mut provider = provider(&shop, &driver);
    provider.update_timestamps(&mut containers).unwrap();

    assert_eq!(containers[0].timestamp(), Some(&timestamp(9)));
    assert_eq!(containers[1].timestamp(), Some(&timestamp(2)));
    // only the live container is looked up
    assert_eq!(driver.parameters()[0], vec![containers[0].id().value().clone()]);
}

#[test]
fn test_update_timestamps_of_vanished_object() {
    let shop = shop();
    let driver = ScriptedDriver::new();
    let mut containers = vec![changed_order(&shop, 1)];

    let mut provider = provider(&shop, &driver);
    let err = provider.update_timestamps(&mut containers).unwrap_err();
    assert!(err.is_concurrency_violation());
}

#[test]
fn test_cross_store_reference_is_serialized() {
    let mut mapping = MappingConfiguration::new();
    let order = mapping.add_class(ClassDefinition::new("Order", "main").with_table()).unwrap();
    let archived = mapping
        .add_class(ClassDefinition::new("ArchivedOrder", "archive").with_table())
        .unwrap();
    let archive = mapping
        .add_property(order, PropertyDefinition::relation("Archive", archived))
        .unwrap();
    mapping
        .add_property(order, PropertyDefinition::value("Title", PropertyType::String).max_length(50))
        .unwrap();

    let definition = StorageProviderDefinition::new("main", "");
    let model = Arc::new(load_persistence_model(&definition, Arc::new(mapping)).unwrap());

    let storage_property = model.storage_property(archive).unwrap();
    let columns = storage_property.columns();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].name, "ArchiveID");
    assert_eq!(columns[0].storage_type.storage_type_name, "varchar(255)");

    let driver = ScriptedDriver::new();
    let mut provider = RdbmsProvider::new(definition, model, Arc::new(driver.clone())).unwrap();

    let target = ObjectId::new_guid("ArchivedOrder");
    let mut container = DataContainer::new_for_insert(ObjectId::new_guid("Order"));
    container.set_value(archive, PropertyValue::from(target.clone()));
    provider.save(&[container]).unwrap();

    assert_eq!(
        driver.statements(),
        vec!["INSERT INTO [Order] ([ID], [ClassID], [ArchiveID]) VALUES (@p0, @p1, @p2);".to_string()]
    );
    assert_eq!(driver.parameters()[0][2], Value::Text(target.serialize().unwrap()));

    // encodings beyond the column width are rejected before anything is written
    let too_long = ObjectId::new("ArchivedOrder", Value::Text("x".repeat(300))).unwrap();
    let mut container = DataContainer::new_for_insert(ObjectId::new_guid("Order"));
    container.set_value(archive, PropertyValue::from(too_long));
    let err = provider.save(&[container]).unwrap_err();

    assert!(matches!(err, PersistenceError::InvalidObjectId(_)));
    assert_eq!(driver.statements().len(), 1);
    assert_eq!(driver.calls().last(), Some(&Call::Rollback));
}

#[test]
fn test_new_then_deleted_container_writes_nothing() {
    let shop = shop();
    let driver = ScriptedDriver::new();
    let customer = ObjectId::new_guid("Customer");
    let mut never_stored = new_order(&shop, Some(&customer));
    never_stored.mark_deleted();

    let mut provider = provider(&shop, &driver);
    provider.save(&[never_stored]).unwrap();

    assert!(driver.statements().is_empty());
    assert_eq!(driver.calls().last(), Some(&Call::Commit));
}

#[test]
fn test_changed_container_without_timestamp_is_a_violation() {
    let shop = shop();
    let driver = ScriptedDriver::new();

    // saved and accepted, but its timestamp was never reloaded
    let mut container = new_order(&shop, None);
    container.commit_state();
    container.set_value(shop.title, PropertyValue::Scalar(Value::Text("renamed".into())));
    assert_eq!(container.state(), DataContainerState::Changed);
    assert!(container.timestamp().is_none());

    let mut provider = provider(&shop, &driver);
    let err = provider.save(std::slice::from_ref(&container)).unwrap_err();

    match err {
        PersistenceError::ConcurrencyViolation(ids) => assert_eq!(ids, vec![container.id().clone()]),
        other => panic!("expected a concurrency violation, got {:?}", other),
    }
    assert!(driver.statements().is_empty());
    assert_eq!(driver.calls().last(), Some(&Call::Rollback));
}
