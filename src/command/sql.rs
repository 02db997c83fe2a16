use crate::core::{ColumnDefinition, EntityNameDefinition, Value};
use crate::mapping::SortOrder;
use crate::storage::ColumnValue;

/// SQL syntax details that differ between database products.
pub trait SqlDialect: Send + Sync {
    fn delimit_identifier(&self, identifier: &str) -> String;

    /// Placeholder as it appears in statement text.
    fn parameter_name(&self, name: &str) -> String;

    fn statement_delimiter(&self) -> &str;

    /// Schema-qualified, delimited entity name.
    fn qualified_name(&self, name: &EntityNameDefinition) -> String {
        match &name.schema {
            Some(schema) => format!(
                "{}.{}",
                self.delimit_identifier(schema),
                self.delimit_identifier(&name.name)
            ),
            None => self.delimit_identifier(&name.name),
        }
    }

    /// Literal used when a value has to be inlined, e.g. in view definitions.
    fn literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Line separating batches in scripts, if the product needs one.
    fn batch_separator(&self) -> Option<&str> {
        None
    }
}

/// `[name]` identifiers, `@name` parameters, `;` delimiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    pub fn new() -> Self {
        Self
    }
}

impl SqlDialect for SqlServerDialect {
    fn delimit_identifier(&self, identifier: &str) -> String {
        format!("[{}]", identifier.replace(']', "]]"))
    }

    fn parameter_name(&self, name: &str) -> String {
        if name.starts_with('@') {
            name.to_string()
        } else {
            format!("@{}", name)
        }
    }

    fn statement_delimiter(&self) -> &str {
        ";"
    }

    fn batch_separator(&self) -> Option<&str> {
        Some("GO")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlParameter {
    /// Name including the dialect prefix.
    pub name: String,
    pub value: Value,
}

/// Statement text with its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub text: String,
    pub parameters: Vec<SqlParameter>,
}

impl SqlStatement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.iter().find(|p| p.name == name).map(|p| &p.value)
    }
}

/// Accumulates statement text and numbered parameters.
pub struct SqlStatementBuilder<'a> {
    dialect: &'a dyn SqlDialect,
    text: String,
    parameters: Vec<SqlParameter>,
}

impl<'a> SqlStatementBuilder<'a> {
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self {
            dialect,
            text: String::new(),
            parameters: Vec::new(),
        }
    }

    pub fn dialect(&self) -> &'a dyn SqlDialect {
        self.dialect
    }

    pub fn append(&mut self, text: &str) -> &mut Self {
        self.text.push_str(text);
        self
    }

    pub fn append_identifier(&mut self, identifier: &str) -> &mut Self {
        let delimited = self.dialect.delimit_identifier(identifier);
        self.text.push_str(&delimited);
        self
    }

    pub fn append_entity_name(&mut self, name: &EntityNameDefinition) -> &mut Self {
        let qualified = self.dialect.qualified_name(name);
        self.text.push_str(&qualified);
        self
    }

    /// Adds a parameter and appends its placeholder.
    pub fn append_parameter(&mut self, value: Value) -> &mut Self {
        let name = self.dialect.parameter_name(&format!("p{}", self.parameters.len()));
        self.text.push_str(&name);
        self.parameters.push(SqlParameter { name, value });
        self
    }

    pub fn append_column_list(&mut self, columns: &[&ColumnDefinition]) -> &mut Self {
        for (index, column) in columns.iter().enumerate() {
            if index > 0 {
                self.text.push_str(", ");
            }
            self.append_identifier(&column.name);
        }
        self
    }

    /// `[A] = @p0 AND [B] = @p1`; NULL values compare with `IS NULL`.
    pub fn append_comparisons(&mut self, comparisons: &[ColumnValue<'_>]) -> &mut Self {
        for (index, comparison) in comparisons.iter().enumerate() {
            if index > 0 {
                self.text.push_str(" AND ");
            }
            self.append_identifier(&comparison.column.name);
            if comparison.value.is_null() {
                self.text.push_str(" IS NULL");
            } else {
                self.text.push_str(" = ");
                self.append_parameter(comparison.value.clone());
            }
        }
        self
    }

    pub fn append_order_by(&mut self, order_by: &[(&ColumnDefinition, SortOrder)]) -> &mut Self {
        if order_by.is_empty() {
            return self;
        }
        self.text.push_str(" ORDER BY ");
        for (index, (column, order)) in order_by.iter().enumerate() {
            if index > 0 {
                self.text.push_str(", ");
            }
            self.append_identifier(&column.name);
            self.text.push_str(match order {
                SortOrder::Ascending => " ASC",
                SortOrder::Descending => " DESC",
            });
        }
        self
    }

    pub fn finish(mut self) -> SqlStatement {
        let delimiter = self.dialect.statement_delimiter();
        if !self.text.ends_with(delimiter) {
            self.text.push_str(delimiter);
        }
        SqlStatement {
            text: self.text,
            parameters: self.parameters,
        }
    }
}

/// `SELECT <columns> FROM <view> WHERE <id> = @p0` or `... IN (@p0, ...)`.
pub fn select_by_ids(
    dialect: &dyn SqlDialect,
    view: &EntityNameDefinition,
    columns: &[&ColumnDefinition],
    id_column: &ColumnDefinition,
    ids: &[Value],
) -> SqlStatement {
    let mut builder = SqlStatementBuilder::new(dialect);
    builder
        .append("SELECT ")
        .append_column_list(columns)
        .append(" FROM ")
        .append_entity_name(view)
        .append(" WHERE ")
        .append_identifier(&id_column.name);

    if let [single] = ids {
        builder.append(" = ").append_parameter(single.clone());
    } else {
        builder.append(" IN (");
        for (index, id) in ids.iter().enumerate() {
            if index > 0 {
                builder.append(", ");
            }
            builder.append_parameter(id.clone());
        }
        builder.append(")");
    }
    builder.finish()
}

/// `SELECT <columns> FROM <view> WHERE <comparisons> ORDER BY ...`.
pub fn select_by_column_values(
    dialect: &dyn SqlDialect,
    view: &EntityNameDefinition,
    columns: &[&ColumnDefinition],
    comparisons: &[ColumnValue<'_>],
    order_by: &[(&ColumnDefinition, SortOrder)],
) -> SqlStatement {
    let mut builder = SqlStatementBuilder::new(dialect);
    builder
        .append("SELECT ")
        .append_column_list(columns)
        .append(" FROM ")
        .append_entity_name(view);
    if !comparisons.is_empty() {
        builder.append(" WHERE ").append_comparisons(comparisons);
    }
    builder.append_order_by(order_by);
    builder.finish()
}

pub fn insert(dialect: &dyn SqlDialect, table: &EntityNameDefinition, values: &[ColumnValue<'_>]) -> SqlStatement {
    let mut builder = SqlStatementBuilder::new(dialect);
    let columns: Vec<&ColumnDefinition> = values.iter().map(|v| v.column).collect();
    builder
        .append("INSERT INTO ")
        .append_entity_name(table)
        .append(" (")
        .append_column_list(&columns)
        .append(") VALUES (");
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            builder.append(", ");
        }
        builder.append_parameter(value.value.clone());
    }
    builder.append(")");
    builder.finish()
}

/// `UPDATE <table> SET ... WHERE <comparisons>`; the WHERE clause carries the
/// ID and, for optimistic checks, the timestamp.
pub fn update(
    dialect: &dyn SqlDialect,
    table: &EntityNameDefinition,
    assignments: &[ColumnValue<'_>],
    comparisons: &[ColumnValue<'_>],
) -> SqlStatement {
    let mut builder = SqlStatementBuilder::new(dialect);
    builder.append("UPDATE ").append_entity_name(table).append(" SET ");
    for (index, assignment) in assignments.iter().enumerate() {
        if index > 0 {
            builder.append(", ");
        }
        builder
            .append_identifier(&assignment.column.name)
            .append(" = ")
            .append_parameter(assignment.value.clone());
    }
    builder.append(" WHERE ").append_comparisons(comparisons);
    builder.finish()
}

pub fn delete(
    dialect: &dyn SqlDialect,
    table: &EntityNameDefinition,
    comparisons: &[ColumnValue<'_>],
) -> SqlStatement {
    let mut builder = SqlStatementBuilder::new(dialect);
    builder
        .append("DELETE FROM ")
        .append_entity_name(table)
        .append(" WHERE ")
        .append_comparisons(comparisons);
    builder.finish()
}

/// Inline list `'A', 'B'` for discriminator filters in DDL.
pub fn literal_list(dialect: &dyn SqlDialect, values: &[String]) -> String {
    values
        .iter()
        .map(|value| dialect.literal(value))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DbType, StorageTypeInformation};

    fn column(name: &str) -> ColumnDefinition {
        ColumnDefinition::new(name, StorageTypeInformation::new("int", DbType::Int32, None))
    }

    #[test]
    fn test_sql_server_dialect() {
        let dialect = SqlServerDialect::new();
        assert_eq!(dialect.delimit_identifier("Order"), "[Order]");
        assert_eq!(dialect.delimit_identifier("a]b"), "[a]]b]");
        assert_eq!(dialect.parameter_name("p0"), "@p0");
        assert_eq!(dialect.parameter_name("@p0"), "@p0");
        assert_eq!(
            dialect.qualified_name(&EntityNameDefinition::new(Some("dbo".into()), "Order")),
            "[dbo].[Order]"
        );
        assert_eq!(dialect.literal("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_select_by_single_and_multiple_ids() {
        let dialect = SqlServerDialect::new();
        let (id, class_id) = (column("ID"), column("ClassID"));
        let view = EntityNameDefinition::new(None, "OrderView");

        let single = select_by_ids(&dialect, &view, &[&id, &class_id], &id, &[Value::Integer(1)]);
        assert_eq!(single.text, "SELECT [ID], [ClassID] FROM [OrderView] WHERE [ID] = @p0;");
        assert_eq!(single.parameter("@p0"), Some(&Value::Integer(1)));

        let multi = select_by_ids(&dialect, &view, &[&id], &id, &[Value::Integer(1), Value::Integer(2)]);
        assert_eq!(multi.text, "SELECT [ID] FROM [OrderView] WHERE [ID] IN (@p0, @p1);");
        assert_eq!(multi.parameters.len(), 2);
    }

    #[test]
    fn test_select_with_null_comparison_and_order() {
        let dialect = SqlServerDialect::new();
        let (id, customer, number) = (column("ID"), column("CustomerID"), column("Number"));
        let statement = select_by_column_values(
            &dialect,
            &EntityNameDefinition::new(None, "OrderView"),
            &[&id],
            &[ColumnValue {
                column: &customer,
                value: Value::Null,
            }],
            &[(&number, SortOrder::Descending)],
        );
        assert_eq!(
            statement.text,
            "SELECT [ID] FROM [OrderView] WHERE [CustomerID] IS NULL ORDER BY [Number] DESC;"
        );
        assert!(statement.parameters.is_empty());
    }

    #[test]
    fn test_update_and_delete_with_timestamp() {
        let dialect = SqlServerDialect::new();
        let (id, timestamp, number) = (column("ID"), column("Timestamp"), column("Number"));
        let table = EntityNameDefinition::new(None, "Order");
        let key = [
            ColumnValue {
                column: &id,
                value: Value::Integer(7),
            },
            ColumnValue {
                column: &timestamp,
                value: Value::Binary(vec![0, 1]),
            },
        ];

        let statement = update(
            &dialect,
            &table,
            &[ColumnValue {
                column: &number,
                value: Value::Integer(3),
            }],
            &key,
        );
        assert_eq!(
            statement.text,
            "UPDATE [Order] SET [Number] = @p0 WHERE [ID] = @p1 AND [Timestamp] = @p2;"
        );

        let statement = delete(&dialect, &table, &key);
        assert_eq!(statement.text, "DELETE FROM [Order] WHERE [ID] = @p0 AND [Timestamp] = @p1;");
    }

    #[test]
    fn test_insert() {
        let dialect = SqlServerDialect::new();
        let (id, class_id) = (column("ID"), column("ClassID"));
        let statement = insert(
            &dialect,
            &EntityNameDefinition::new(None, "Order"),
            &[
                ColumnValue {
                    column: &id,
                    value: Value::Integer(1),
                },
                ColumnValue {
                    column: &class_id,
                    value: Value::Text("Order".into()),
                },
            ],
        );
        assert_eq!(statement.text, "INSERT INTO [Order] ([ID], [ClassID]) VALUES (@p0, @p1);");
        assert_eq!(literal_list(&dialect, &["A".into(), "B".into()]), "'A', 'B'");
    }
}
