pub mod ast;
pub mod config;
pub mod database;
pub mod error;
pub mod parser;
pub mod result;
pub mod storage;
pub mod table;
pub mod tokenizer;

pub use config::Config;
pub use database::Database;
pub use error::{Error, ParseError, StorageError};
pub use result::{Outcome, QueryResult, Response, SilentAbort};
pub use table::{Row, Schema, Table};
