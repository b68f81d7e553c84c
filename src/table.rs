/// One row of a table: opaque string fields aligned with the [Schema].
pub type Row = Vec<String>;

/// Ordered column names of a table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    pub columns: Vec<String>,
}

impl Schema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of the first column called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

/// A table loaded in memory: its header and every row, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: String, schema: Schema) -> Self {
        Self {
            name,
            schema,
            rows: Vec::new(),
        }
    }

    /// insert a new row
    ///
    /// Returns the expected field count as the error when the row does not
    /// fit the schema.
    pub fn insert(&mut self, row: Row) -> Result<(), usize> {
        if row.len() != self.schema.len() {
            return Err(self.schema.len());
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new(
            "users".into(),
            Schema::new(vec!["id".into(), "name".into()]),
        )
    }

    #[test]
    fn test_table_creation() {
        let table = users();
        assert_eq!(table.schema.len(), 2);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_table_insert_keeps_order() {
        let mut table = users();

        table.insert(vec!["1".into(), "alice".into()]).unwrap();
        table.insert(vec!["2".into(), "".into()]).unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.rows,
            vec![
                vec!["1".to_string(), "alice".to_string()],
                vec!["2".to_string(), String::new()],
            ]
        );
    }

    #[test]
    fn test_column_count_mismatch() {
        let mut table = users();

        // Too many columns
        assert_eq!(table.insert(vec!["1".into(), "a".into(), "b".into()]), Err(2));

        // Not enough columns
        assert_eq!(table.insert(vec![]), Err(2));
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_index_of() {
        let schema = Schema::new(vec!["id".into(), "name".into(), "id".into()]);

        assert_eq!(schema.index_of("id"), Some(0));
        assert_eq!(schema.index_of("name"), Some(1));
        assert!(!schema.contains("age"));
    }
}
