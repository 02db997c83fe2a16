/// Mapping document to schema script tests
///
/// Loads a JSON mapping and storage configuration, validates them, resolves
/// the persistence model and renders the setup and teardown scripts.
/// Run with: cargo test --test schema_tests

use std::sync::Arc;

use relmap::command::SqlServerDialect;
use relmap::mapping::{MappingDocument, validate_mapping};
use relmap::model::{PersistenceModelLoader, load_persistence_model};
use relmap::provider::StorageConfiguration;
use relmap::schema::ScriptGenerator;

const MAPPING: &str = r#"{
    "default_provider": "main",
    "classes": [
        { "id": "Customer", "table": true,
          "properties": [ { "name": "Name", "type": "string", "max_length": 100 } ],
          "collections": [ { "name": "Orders", "opposite": "Order.Customer", "sort": "Number desc" } ] },
        { "id": "Document", "abstract": true,
          "properties": [ { "name": "Title", "type": "string", "max_length": 200 } ] },
        { "id": "Order", "base": "Document", "table": true,
          "properties": [
            { "name": "Number", "type": "int32" },
            { "name": "Customer", "relation": "Customer" },
            { "name": "Archive", "relation": "ArchivedOrder" } ] },
        { "id": "Invoice", "base": "Order",
          "properties": [ { "name": "Due", "type": "date_time" } ] },
        { "id": "ArchivedOrder", "provider": "archive", "table": true }
    ]
}"#;

const STORAGE: &str = r#"{
    "default_provider": "main",
    "providers": [
        { "name": "main", "connection_string": "Server=.;Database=Shop", "schema": "dbo" },
        { "name": "archive", "connection_string": "Server=.;Database=Archive", "isolation_level": "snapshot" }
    ]
}"#;

#[test]
fn test_scripts_from_documents() {
    let mapping = MappingDocument::from_json(MAPPING).unwrap().into_configuration().unwrap();
    assert!(validate_mapping(&mapping).is_empty());

    let storage = StorageConfiguration::from_json(STORAGE).unwrap();
    let main = storage.provider("main").unwrap();

    let model = load_persistence_model(main, Arc::new(mapping)).unwrap();
    assert!(model.validate().is_empty());

    let dialect = SqlServerDialect::new();
    let scripts = ScriptGenerator::new(&dialect).generate(&model);

    assert!(scripts.setup.contains("CREATE TABLE [dbo].[Customer]"));
    assert!(scripts.setup.contains("CREATE TABLE [dbo].[Order]"));
    assert!(scripts.setup.contains("[ArchiveID] varchar(255) NULL"));
    assert!(scripts.setup.contains("CREATE VIEW [dbo].[InvoiceView]"));
    assert!(scripts.setup.contains("CREATE VIEW [dbo].[DocumentView]"));
    assert!(scripts.setup.contains("GO\n"));
    assert!(!scripts.setup.contains("GO\nGO\n"));
    // the cross-store table lives in the other store's script
    assert!(!scripts.setup.contains("ArchivedOrder]"));
    // cross-store references carry no constraint
    assert_eq!(scripts.setup.matches("ADD CONSTRAINT").count(), 1);

    assert!(scripts.teardown.contains("DROP TABLE [dbo].[Order]"));
    assert!(scripts.teardown.contains("DROP VIEW [dbo].[DocumentView]"));
}

#[test]
fn test_archive_store_is_resolved_separately() {
    let mapping = Arc::new(MappingDocument::from_json(MAPPING).unwrap().into_configuration().unwrap());
    let storage = StorageConfiguration::from_json(STORAGE).unwrap();
    let archive = storage.provider("archive").unwrap();

    let mut loader = PersistenceModelLoader::new(archive, mapping.clone());
    loader.load_all().unwrap();
    let model = loader.build();

    let dialect = SqlServerDialect::new();
    let scripts = ScriptGenerator::new(&dialect).generate(&model);
    assert!(scripts.setup.contains("CREATE TABLE [ArchivedOrder]"));
    assert!(!scripts.setup.contains("[Order]"));

    let order = mapping.class_by_id("Order").unwrap();
    assert!(!model.is_resolved(order));
}

#[test]
fn test_invalid_mapping_reports_every_violation() {
    let mapping = MappingDocument::from_json(
        r#"{
            "default_provider": "main",
            "classes": [
                { "id": "Loose" },
                { "id": "Base", "table": true },
                { "id": "Derived", "base": "Base", "table": true },
                { "id": "Remote", "base": "Base", "provider": "other" }
            ]
        }"#,
    )
    .unwrap()
    .into_configuration()
    .unwrap();

    let errors = validate_mapping(&mapping);
    let classes: Vec<&str> = errors.iter().map(|e| e.class.as_str()).collect();
    assert!(classes.contains(&"Loose"));
    assert!(classes.contains(&"Derived"));
    assert!(classes.contains(&"Remote"));
}

#[test]
fn test_unsupported_properties_are_reported_by_the_model() {
    let mapping = MappingDocument::from_json(
        r#"{
            "default_provider": "main",
            "classes": [
                { "id": "Drawing", "table": true,
                  "properties": [
                    { "name": "Outline", "type": { "custom": "Polygon" } },
                    { "name": "Fill", "type": { "custom": "Gradient" } },
                    { "name": "Name", "type": "string" } ] }
            ]
        }"#,
    )
    .unwrap()
    .into_configuration()
    .unwrap();

    let storage = StorageConfiguration::from_json(
        r#"{ "default_provider": "main", "providers": [ { "name": "main", "connection_string": "" } ] }"#,
    )
    .unwrap();
    let model = load_persistence_model(storage.default_provider_definition().unwrap(), Arc::new(mapping)).unwrap();

    let errors = model.validate();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.class == "Drawing"));
}
