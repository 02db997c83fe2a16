// ============================================================================
// Schema Scripts
// ============================================================================
//
// Setup and teardown DDL for every table, view and foreign key of a resolved
// persistence model.
//
// ============================================================================

pub mod script;

pub use script::{SchemaScripts, ScriptGenerator};
