use bitvec::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    ast::{ColumnsSelect, CreateTable, Describe, InsertInto, Join, Select, Statement, WhereClause},
    config::Config,
    error::{Error, ParseError, Result},
    parser::Parser,
    result::{Outcome, QueryResult, Response, SilentAbort},
    storage::Storage,
    table::{Row, Schema, Table},
    tokenizer::is_word_char,
};

/// The main entry point of the data store.
/// It owns the current database directory and runs statements against it.
#[derive(Debug, Clone)]
pub struct Database {
    storage: Storage,
}

impl Database {
    /// Opens the database described by `config`, creating its directory if
    /// needed.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = Storage::open(config.database_path(), config.extension.clone())?;
        Ok(Self { storage })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Returns the names of all tables of the database, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.storage.list_tables()?)
    }

    /// Parses and runs one statement.
    ///
    /// The leading keyword picks the handler: `CREATE`, `INSERT`, `SELECT`,
    /// `DESC`/`DESCRIBE`. Anything else, `SHOW DATABASES` included, runs
    /// nothing and yields [Outcome::NoOp]. The database directory is locked
    /// for the duration of the statement.
    ///
    /// # Errors
    /// Returns an error for malformed `CREATE`/`INSERT` statements, a
    /// `SELECT` without `FROM`, a missing or duplicate table, a column count
    /// mismatch, or an I/O failure. A `SELECT` that cannot be resolved is not
    /// an error: it yields [Outcome::Empty].
    ///
    /// # Example
    /// ```
    /// use flatdb::{Config, Database};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let db = Database::open(&Config::default().with_data_dir(dir.path())).unwrap();
    ///
    /// db.execute("CREATE TABLE users (id, name)").unwrap();
    /// db.execute("INSERT INTO users VALUES (1, 'alice')").unwrap();
    ///
    /// let response = db.execute("SELECT name FROM users WHERE id = 1").unwrap();
    /// assert_eq!(response.to_string(), "name\n'alice'\n");
    /// ```
    pub fn execute(&self, sql: &str) -> Result<Response> {
        let _lock = self.storage.lock()?;

        let Some(statement) = Parser::new(sql).parse()? else {
            debug!(statement = sql, "no statement to run");
            return Ok(Outcome::NoOp.into());
        };

        let warnings = match &statement {
            Statement::Select(select) => select.warnings.clone(),
            _ => Vec::new(),
        };
        for warning in &warnings {
            warn!(statement = sql, "{warning}");
        }

        let outcome = self.run(statement)?;
        Ok(Response { warnings, outcome })
    }

    /// Runs an already parsed statement.
    pub fn run(&self, statement: Statement) -> Result<Outcome> {
        match statement {
            Statement::CreateTable(create) => self.create_table(create),
            Statement::InsertInto(insert) => self.insert(insert),
            Statement::Select(select) => self.select(&select),
            Statement::Describe(describe) => self.describe(&describe),
            Statement::ShowDatabases => Ok(Outcome::NoOp),
        }
    }

    /// Creates a new table with an empty row store.
    ///
    /// # Errors
    /// Returns [Error::TableAlreadyExists] if a table with the same name
    /// already exists; the existing file is left untouched.
    pub fn create_table(&self, create: CreateTable) -> Result<Outcome> {
        if create.columns.is_empty() || !create.columns.iter().all(|c| is_storable(c)) {
            return Err(ParseError::InvalidCreateSyntax.into());
        }

        let schema = Schema::new(create.columns);
        if !self.storage.create_table(&create.name, &schema)? {
            return Err(Error::TableAlreadyExists(create.name));
        }

        info!(table = %create.name, columns = schema.len(), "created table");
        Ok(Outcome::TableCreated { table: create.name })
    }

    /// Appends one row to a table.
    ///
    /// # Errors
    /// Returns [Error::TableNotFound] if the table does not exist, or
    /// [Error::ColumnCountMismatch] if the number of values differs from the
    /// number of columns. A value that would not fit on one line of the
    /// table file is [ParseError::InvalidInsertSyntax]. Nothing is written in
    /// any of these cases.
    pub fn insert(&self, insert: InsertInto) -> Result<Outcome> {
        if !insert.values.iter().all(|v| is_storable(v)) {
            return Err(ParseError::InvalidInsertSyntax.into());
        }

        let schema = self
            .storage
            .read_schema(&insert.table)?
            .ok_or_else(|| Error::TableNotFound(insert.table.clone()))?;

        if insert.values.len() != schema.len() {
            return Err(Error::ColumnCountMismatch {
                expected: schema.len(),
                found: insert.values.len(),
            });
        }

        self.storage.append_row(&insert.table, &insert.values)?;
        info!(table = %insert.table, "inserted row");
        Ok(Outcome::RowInserted {
            table: insert.table,
        })
    }

    /// Lists the columns of a table.
    ///
    /// # Errors
    /// Returns [Error::TableNotFound] if the table does not exist, or if the
    /// name is not a plain word and so cannot name a table file.
    pub fn describe(&self, describe: &Describe) -> Result<Outcome> {
        if !is_table_name(&describe.table) {
            return Err(Error::TableNotFound(describe.table.clone()));
        }
        let schema = self
            .storage
            .read_schema(&describe.table)?
            .ok_or_else(|| Error::TableNotFound(describe.table.clone()))?;

        Ok(Outcome::Described {
            table: describe.table.clone(),
            columns: schema.columns,
        })
    }

    /// Executes a `SELECT` and returns the resulting data set.
    ///
    /// The stages always run in this order, each on the output of the previous one:
    /// 1. **Loads** the source table.
    /// 2. **Joins** the second table, if any, with a nested-loop equality join.
    /// 3. **Filters** rows on the `WHERE` equality, if any.
    /// 4. **Projects** the requested columns.
    ///
    /// A missing table file or a column that does not resolve stops the
    /// pipeline with [Outcome::Empty] instead of an error.
    ///
    /// # Errors
    /// Only I/O failures and malformed table files are reported.
    pub fn select(&self, select: &Select) -> Result<Outcome> {
        let Some(base) = self.storage.load_table(&select.table)? else {
            return Ok(silent(SilentAbort::TableMissing(select.table.clone())));
        };

        let right = match &select.join {
            Some(join) => match self.storage.load_table(&join.table)? {
                Some(right) => Some((right, join)),
                None => return Ok(silent(SilentAbort::TableMissing(join.table.clone()))),
            },
            None => None,
        };

        let pipeline = || -> std::result::Result<QueryResult, SilentAbort> {
            let mut set = ResultSet::from(base);
            if let Some((right, join)) = &right {
                set = set.join(right, join)?;
            }
            if let Some(clause) = &select.where_clause {
                set = set.filter(clause)?;
            }
            set.project(&select.columns)
        };

        match pipeline() {
            Ok(result) => {
                debug!(table = %select.table, rows = result.rows.len(), "select done");
                Ok(Outcome::Rows(result))
            }
            Err(abort) => Ok(silent(abort)),
        }
    }
}

/// A field or column name that encodes as exactly one field of one line.
fn is_storable(field: &str) -> bool {
    !field.contains([',', '\n', '\r'])
}

fn is_table_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_word_char)
}

fn silent(abort: SilentAbort) -> Outcome {
    debug!(reason = %abort, "select aborted without output");
    Outcome::Empty(abort)
}

/// Column name of a `table.column` selector: whatever follows the last `.`.
fn unqualified(selector: &str) -> &str {
    selector.rsplit_once('.').map_or(selector, |(_, column)| column)
}

/// Trims whitespace, then every surrounding quote character.
fn unquote(field: &str) -> &str {
    field.trim().trim_matches(|c| c == '\'' || c == '"')
}

/// The working header and rows of a `SELECT` between two stages.
#[derive(Debug)]
struct ResultSet {
    /// Source table, named in join diagnostics.
    source: String,
    header: Schema,
    rows: Vec<Row>,
}

impl From<Table> for ResultSet {
    fn from(table: Table) -> Self {
        Self {
            source: table.name,
            header: table.schema,
            rows: table.rows,
        }
    }
}

impl ResultSet {
    /// Inner join with `right` on the equality of the two key columns.
    ///
    /// Keys are resolved by their unqualified column name, the left one in
    /// the current header and the right one in `right`'s schema. The joined
    /// header is the current header followed by `right`'s columns minus its
    /// key; a right column whose name is already taken is renamed
    /// `<right table>.<column>`. Rows come out left-row-major.
    fn join(self, right: &Table, join: &Join) -> std::result::Result<Self, SilentAbort> {
        let left_col = unqualified(&join.left_key);
        let right_col = unqualified(&join.right_key);

        let left_idx = self
            .header
            .index_of(left_col)
            .ok_or_else(|| SilentAbort::JoinColumnNotFound {
                table: self.source.clone(),
                column: left_col.to_string(),
            })?;
        let right_idx =
            right
                .schema
                .index_of(right_col)
                .ok_or_else(|| SilentAbort::JoinColumnNotFound {
                    table: right.name.clone(),
                    column: right_col.to_string(),
                })?;

        let mut header = self.header.columns.clone();
        for (i, column) in right.schema.columns.iter().enumerate() {
            if i == right_idx {
                continue;
            }
            if self.header.contains(column) {
                header.push(format!("{}.{}", right.name, column));
            } else {
                header.push(column.clone());
            }
        }

        let mut rows = Vec::new();
        for left_row in &self.rows {
            let left_key = unquote(&left_row[left_idx]);
            for right_row in &right.rows {
                if unquote(&right_row[right_idx]) != left_key {
                    continue;
                }
                let mut row = left_row.clone();
                row.extend(
                    right_row
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != right_idx)
                        .map(|(_, field)| field.clone()),
                );
                rows.push(row);
            }
        }

        debug!(
            right = %right.name,
            left_key = left_col,
            right_key = right_col,
            rows = rows.len(),
            "joined"
        );
        Ok(Self {
            source: self.source,
            header: Schema::new(header),
            rows,
        })
    }

    /// Keeps the rows whose field equals the literal once unquoted.
    fn filter(self, clause: &WhereClause) -> std::result::Result<Self, SilentAbort> {
        let (column, value) = match clause {
            WhereClause::Equals { column, value } => (unqualified(column), value.as_str()),
            WhereClause::Malformed(text) => return Err(SilentAbort::InvalidWhere(text.clone())),
        };
        let idx = self
            .header
            .index_of(column)
            .ok_or_else(|| SilentAbort::FilterColumnNotFound(column.to_string()))?;

        let keep: BitVec = self
            .rows
            .iter()
            .map(|row| unquote(&row[idx]) == value)
            .collect();
        debug!(column, value, matched = keep.count_ones(), "filtered");

        let rows = self
            .rows
            .into_iter()
            .zip(keep.iter().by_vals())
            .filter_map(|(row, keep)| keep.then_some(row))
            .collect();
        Ok(Self {
            source: self.source,
            header: self.header,
            rows,
        })
    }

    /// Resolves each selector against the header, first as written, then by
    /// its unqualified name, and builds the final result.
    fn project(self, columns: &ColumnsSelect) -> std::result::Result<QueryResult, SilentAbort> {
        let indices: Vec<usize> = match columns {
            ColumnsSelect::Star => (0..self.header.len()).collect(),
            ColumnsSelect::ColumnsNames(names) => names
                .iter()
                .map(|name| {
                    self.header
                        .index_of(name)
                        .or_else(|| self.header.index_of(unqualified(name)))
                        .ok_or_else(|| SilentAbort::ProjectionColumnNotFound(name.clone()))
                })
                .collect::<std::result::Result<_, _>>()?,
        };

        let columns = indices
            .iter()
            .map(|&i| self.header.columns[i].clone())
            .collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(QueryResult { columns, rows })
    }
}
