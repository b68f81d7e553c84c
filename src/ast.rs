use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    InsertInto(InsertInto),
    Select(Select),
    Describe(Describe),
    /// Recognized but carries no behavior.
    ShowDatabases,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertInto {
    pub table: String,
    /// Raw values, trimmed but with any quotes left in place.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnsSelect {
    Star,
    /// Bare `column` or qualified `table.column` selectors.
    ColumnsNames(Vec<String>),
}

/// `JOIN <table> ON <left_key> = <right_key>`, keys in `table.column` form.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: String,
    pub left_key: String,
    pub right_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WhereClause {
    /// `<column> = <value>`, the value already stripped of its optional quotes.
    Equals { column: String, value: String },
    /// A `WHERE` tail that does not have the `<column> = <value>` shape.
    Malformed(String),
}

/// Non-fatal problems found while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseWarning {
    /// The column list could not be delimited; the select falls back to `*`.
    InvalidSelectSyntax,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::InvalidSelectSyntax => write!(f, "Invalid SELECT syntax."),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub columns: ColumnsSelect,
    pub table: String,
    pub join: Option<Join>,
    pub where_clause: Option<WhereClause>,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Describe {
    pub table: String,
}
