use crate::ast::*;
use crate::error::ParseError;
use crate::tokenizer::{Lexeme, Token, Tokenizer};

/// Recursive-descent parser over the lexemes of a single statement.
///
/// `CREATE` and `INSERT` follow one strict shape each. `SELECT` is read
/// differently: its column list, `FROM`, `JOIN`, `ON` and `WHERE` parts are
/// looked up independently across the whole statement, so clause order and
/// stray text between clauses do not make the statement fail.
pub struct Parser<'a> {
    source: &'a str,
    lexemes: Vec<Lexeme>,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            lexemes: Tokenizer::new(source).tokenize(),
            position: 0,
        }
    }

    /// Parses the statement according to its leading keyword.
    ///
    /// Returns `Ok(None)` when the leading keyword is not a statement verb
    /// (including an empty input): such input is not an error, it simply
    /// has nothing to run.
    pub fn parse(&mut self) -> Result<Option<Statement>, ParseError> {
        let statement = match self.current_token() {
            Token::Create => self.parse_create_table()?,
            Token::Insert => self.parse_insert()?,
            Token::Select => Statement::Select(self.parse_select()?),
            Token::Desc | Token::Describe => self.parse_describe(),
            Token::Show => match self.parse_show() {
                Some(statement) => statement,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(statement))
    }

    //helpers
    fn current(&self) -> &Lexeme {
        &self.lexemes[self.position]
    }

    fn current_token(&self) -> &Token {
        &self.current().token
    }

    fn advance(&mut self) {
        if self.position < self.lexemes.len() - 1 {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    fn consume(&mut self, expected: Token) -> Option<()> {
        if *self.current_token() == expected {
            self.advance();
            Some(())
        } else {
            None
        }
    }

    /// Consumes a word (identifier or keyword) and returns its source text.
    fn consume_word(&mut self) -> Option<String> {
        if !self.current_token().is_word() {
            return None;
        }
        let word = self.current().text(self.source).to_string();
        self.advance();
        Some(word)
    }

    /// Consumes `( ... )` and returns the raw text between the parentheses.
    ///
    /// The list ends at the first `)`, and must not be empty.
    fn consume_parenthesized(&mut self) -> Option<&'a str> {
        let open = self.current().clone();
        if open.token != Token::LeftParen {
            return None;
        }
        let close_idx = self.lexemes[self.position..]
            .iter()
            .position(|lexeme| lexeme.token == Token::RightParen)?
            + self.position;
        let close = &self.lexemes[close_idx];

        let raw = &self.source[open.end..close.start];
        if raw.is_empty() {
            return None;
        }

        self.position = close_idx;
        self.advance();
        Some(raw)
    }

    fn parse_create_table(&mut self) -> Result<Statement, ParseError> {
        self.create_table().ok_or(ParseError::InvalidCreateSyntax)
    }

    fn create_table(&mut self) -> Option<Statement> {
        self.consume(Token::Create)?;
        self.consume(Token::Table)?;
        let name = self.consume_word()?;
        let columns = split_list(self.consume_parenthesized()?);
        if !self.is_at_end() {
            return None;
        }

        if columns
            .iter()
            .any(|column| column.is_empty() || has_line_break(column))
        {
            return None;
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return None;
            }
        }

        Some(Statement::CreateTable(CreateTable { name, columns }))
    }

    fn parse_insert(&mut self) -> Result<Statement, ParseError> {
        self.insert().ok_or(ParseError::InvalidInsertSyntax)
    }

    fn insert(&mut self) -> Option<Statement> {
        self.consume(Token::Insert)?;
        self.consume(Token::Into)?;
        let table = self.consume_word()?;
        self.consume(Token::Values)?;
        let values = split_list(self.consume_parenthesized()?);
        if !self.is_at_end() || values.iter().any(|value| has_line_break(value)) {
            return None;
        }

        Some(Statement::InsertInto(InsertInto { table, values }))
    }

    fn parse_describe(&mut self) -> Statement {
        let verb_end = self.current().end;
        Statement::Describe(Describe {
            table: self.source[verb_end..].trim().to_string(),
        })
    }

    fn parse_show(&mut self) -> Option<Statement> {
        self.consume(Token::Show)?;
        self.consume(Token::Databases)?;
        Some(Statement::ShowDatabases)
    }

    fn parse_select(&mut self) -> Result<Select, ParseError> {
        let table = self
            .word_after(Token::From)
            .ok_or(ParseError::InvalidFromSyntax)?;

        let mut warnings = Vec::new();
        let columns = match self.select_list() {
            Some(raw) if raw == "*" => ColumnsSelect::Star,
            Some(raw) => ColumnsSelect::ColumnsNames(split_list(raw)),
            None => {
                warnings.push(ParseWarning::InvalidSelectSyntax);
                ColumnsSelect::Star
            }
        };

        // A join needs both halves; either one alone is ignored.
        let join = match (self.word_after(Token::Join), self.on_pair()) {
            (Some(table), Some((left_key, right_key))) => Some(Join {
                table,
                left_key,
                right_key,
            }),
            _ => None,
        };

        let where_clause = self.where_tail().map(parse_where_clause);

        Ok(Select {
            columns,
            table,
            join,
            where_clause,
            warnings,
        })
    }

    // --- SELECT extractions ---
    // These scan the whole lexeme list and never move `position`.

    /// Whitespace separates `a` from `b` in the source.
    fn spaced(&self, a: usize, b: usize) -> bool {
        self.lexemes[a].end < self.lexemes[b].start
    }

    /// Adjacent in the source, with nothing in between.
    fn touching(&self, a: usize, b: usize) -> bool {
        self.lexemes[a].end == self.lexemes[b].start
    }

    fn indices_of(&self, keyword: Token) -> Vec<usize> {
        self.lexemes
            .iter()
            .enumerate()
            .filter(|(_, lexeme)| lexeme.token == keyword)
            .map(|(i, _)| i)
            .collect()
    }

    /// First `<keyword> <word>` pair with whitespace between them.
    fn word_after(&self, keyword: Token) -> Option<String> {
        self.indices_of(keyword).into_iter().find_map(|i| {
            let next = &self.lexemes[i + 1];
            (next.token.is_word() && self.spaced(i, i + 1))
                .then(|| next.text(self.source).to_string())
        })
    }

    /// Reads `word.word` starting at lexeme `i`, without whitespace inside.
    fn qualified_at(&self, i: usize) -> Option<String> {
        let parts = self.lexemes.get(i..i + 3)?;
        let shape = parts[0].token.is_word()
            && parts[1].token == Token::Dot
            && parts[2].token.is_word()
            && self.touching(i, i + 1)
            && self.touching(i + 1, i + 2);
        shape.then(|| self.source[parts[0].start..parts[2].end].to_string())
    }

    /// First `ON <table>.<column> = <table>.<column>`.
    fn on_pair(&self) -> Option<(String, String)> {
        self.indices_of(Token::On).into_iter().find_map(|i| {
            if !self.spaced(i, i + 1) {
                return None;
            }
            let left = self.qualified_at(i + 1)?;
            if self.lexemes.get(i + 4)?.token != Token::Equal {
                return None;
            }
            let right = self.qualified_at(i + 5)?;
            Some((left, right))
        })
    }

    /// Text after the first `WHERE` followed by whitespace, up to the end of
    /// that line. An empty tail means there is no filter.
    fn where_tail(&self) -> Option<String> {
        let i = self
            .indices_of(Token::Where)
            .into_iter()
            .find(|&i| self.spaced(i, i + 1))?;
        let rest = self.source[self.lexemes[i].end..].trim_start();
        let line = rest.lines().next().unwrap_or_default().trim();
        (!line.is_empty()).then(|| line.to_string())
    }

    /// Raw column list between the leading `SELECT` and the first `FROM`
    /// preceded by whitespace. `None` when it cannot be delimited.
    fn select_list(&self) -> Option<&'a str> {
        if !self.spaced(0, 1) {
            return None;
        }
        let from = self
            .indices_of(Token::From)
            .into_iter()
            .find(|&i| i > 1 && self.spaced(i - 1, i))?;
        let raw = self.source[self.lexemes[0].end..self.lexemes[from].start].trim();
        (!raw.contains('\n')).then_some(raw)
    }
}

/// Splits a raw comma-separated list and trims every item.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(|item| item.trim().to_string()).collect()
}

/// A table file holds one row per line.
fn has_line_break(item: &str) -> bool {
    item.contains(['\n', '\r'])
}

fn is_quote(c: char) -> bool {
    c == '\'' || c == '"'
}

/// Reads `<column> = <value>` where the value may be wrapped in one pair of
/// single or double quotes.
fn parse_where_clause(text: String) -> WhereClause {
    let equals = || -> Option<WhereClause> {
        let (column, rest) = text.split_once('=')?;
        if column.is_empty() {
            return None;
        }

        let rest = rest.trim_start();
        let rest = rest.strip_prefix(is_quote).unwrap_or(rest);
        let literal = rest.strip_suffix(is_quote).unwrap_or(rest);
        if literal.is_empty() || literal.contains(is_quote) {
            return None;
        }

        Some(WhereClause::Equals {
            column: column.trim().to_string(),
            value: literal.trim().to_string(),
        })
    };
    equals().unwrap_or_else(|| WhereClause::Malformed(text.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Result<Option<Statement>, ParseError> {
        Parser::new(sql).parse()
    }

    fn select(sql: &str) -> Select {
        match parse(sql) {
            Ok(Some(Statement::Select(select))) => select,
            other => panic!("Expected Select, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_create_table() {
        let statement = parse("  create table users ( id ,name,  email )  ").unwrap();

        assert_eq!(
            statement,
            Some(Statement::CreateTable(CreateTable {
                name: "users".into(),
                columns: vec!["id".into(), "name".into(), "email".into()],
            }))
        );
    }

    #[test]
    fn test_create_rejects_malformed_input() {
        for sql in [
            "CREATE TABLE users",
            "CREATE TABLE users ()",
            "CREATE TABLE (id)",
            "CREATE users (id)",
            "CREATE TABLE users (id, name) extra",
            "CREATE TABLE users (id, name);",
            "CREATE TABLE users (id,, name)",
            "CREATE TABLE users (id, id)",
            "CREATE TABLE my-table (id)",
            "CREATE TABLE users (id, na\nme)",
        ] {
            assert_eq!(
                parse(sql),
                Err(ParseError::InvalidCreateSyntax),
                "accepted {sql:?}"
            );
        }
    }

    #[test]
    fn test_parse_insert_keeps_quotes() {
        let statement = parse("INSERT INTO users VALUES (1, 'Alice Smith' , \"x\")").unwrap();

        assert_eq!(
            statement,
            Some(Statement::InsertInto(InsertInto {
                table: "users".into(),
                values: vec!["1".into(), "'Alice Smith'".into(), "\"x\"".into()],
            }))
        );
    }

    #[test]
    fn test_insert_rejects_malformed_input() {
        for sql in [
            "INSERT users VALUES (1)",
            "INSERT INTO users (1)",
            "INSERT INTO users VALUES ()",
            "INSERT INTO users VALUES (1) (2)",
            "INSERT INTO users VALUES 1, 2",
            "INSERT INTO users VALUES (2, bo\nb)",
            "INSERT INTO users VALUES (2, b\rob)",
        ] {
            assert_eq!(
                parse(sql),
                Err(ParseError::InvalidInsertSyntax),
                "accepted {sql:?}"
            );
        }
    }

    #[test]
    fn test_parse_select_star() {
        let select = select("SELECT * FROM users");

        assert_eq!(select.columns, ColumnsSelect::Star);
        assert_eq!(select.table, "users");
        assert_eq!(select.join, None);
        assert_eq!(select.where_clause, None);
        assert!(select.warnings.is_empty());
    }

    #[test]
    fn test_parse_select_full() {
        let select = select(
            "select users.name, orders.id from users join orders on users.id=orders.user_id where name = 'alice'",
        );

        assert_eq!(
            select.columns,
            ColumnsSelect::ColumnsNames(vec!["users.name".into(), "orders.id".into()])
        );
        assert_eq!(select.table, "users");
        assert_eq!(
            select.join,
            Some(Join {
                table: "orders".into(),
                left_key: "users.id".into(),
                right_key: "orders.user_id".into(),
            })
        );
        assert_eq!(
            select.where_clause,
            Some(WhereClause::Equals {
                column: "name".into(),
                value: "alice".into(),
            })
        );
    }

    #[test]
    fn test_select_clauses_are_order_independent() {
        let select = select("SELECT id FROM users WHERE id = 1 JOIN orders ON a.x = b.y");

        assert_eq!(select.table, "users");
        assert!(select.join.is_some());
        // The WHERE tail runs to the end of the line.
        assert_eq!(
            select.where_clause,
            Some(WhereClause::Equals {
                column: "id".into(),
                value: "1 JOIN orders ON a.x = b.y".into(),
            })
        );
    }

    #[test]
    fn test_join_needs_both_halves() {
        assert_eq!(select("SELECT * FROM a JOIN b").join, None);
        assert_eq!(select("SELECT * FROM a ON a.id = b.id").join, None);
        assert_eq!(select("SELECT * FROM a JOIN b ON a.id = id").join, None);
    }

    #[test]
    fn test_missing_from_is_an_error() {
        assert_eq!(
            parse("SELECT * users"),
            Err(ParseError::InvalidFromSyntax)
        );
        assert_eq!(
            parse("SELECT * FROM(users)"),
            Err(ParseError::InvalidFromSyntax)
        );
    }

    #[test]
    fn test_undelimited_columns_fall_back_to_star_with_warning() {
        let select = select("SELECT FROM users");

        assert_eq!(select.columns, ColumnsSelect::Star);
        assert_eq!(select.table, "users");
        assert_eq!(select.warnings, vec![ParseWarning::InvalidSelectSyntax]);
    }

    #[test]
    fn test_blank_column_list_falls_back_to_star_with_warning() {
        let select = select("SELECT  FROM users");

        assert_eq!(select.columns, ColumnsSelect::Star);
        assert_eq!(select.table, "users");
        assert_eq!(select.warnings, vec![ParseWarning::InvalidSelectSyntax]);
    }

    #[test]
    fn test_where_clause_shapes() {
        let clause = |sql: &str| select(sql).where_clause;

        assert_eq!(
            clause("SELECT * FROM t WHERE t.name = \"Bob Dylan\""),
            Some(WhereClause::Equals {
                column: "t.name".into(),
                value: "Bob Dylan".into(),
            })
        );
        assert_eq!(
            clause("SELECT * FROM t WHERE name=bob"),
            Some(WhereClause::Equals {
                column: "name".into(),
                value: "bob".into(),
            })
        );
        assert_eq!(
            clause("SELECT * FROM t WHERE name > 3"),
            Some(WhereClause::Malformed("name > 3".into()))
        );
        assert_eq!(
            clause("SELECT * FROM t WHERE name = ''"),
            Some(WhereClause::Malformed("name = ''".into()))
        );
        assert_eq!(clause("SELECT * FROM t WHERE   "), None);
    }

    #[test]
    fn test_parse_describe() {
        assert_eq!(
            parse("DESC  users ").unwrap(),
            Some(Statement::Describe(Describe {
                table: "users".into()
            }))
        );
        assert_eq!(
            parse("describe orders").unwrap(),
            Some(Statement::Describe(Describe {
                table: "orders".into()
            }))
        );
    }

    #[test]
    fn test_show_databases_and_unknown_verbs() {
        assert_eq!(
            parse("SHOW DATABASES").unwrap(),
            Some(Statement::ShowDatabases)
        );
        assert_eq!(parse("SHOW TABLES").unwrap(), None);
        assert_eq!(parse("DROP TABLE users").unwrap(), None);
        assert_eq!(parse("").unwrap(), None);
    }
}
