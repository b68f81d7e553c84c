/// Represents the smallest meaningful units (atoms) of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // --- Keywords ---
    Create,
    Table,
    Insert,
    Into,
    Values,
    Select,
    From,
    Join,
    On,
    Where,
    Desc,
    Describe,
    Show,
    Databases,

    // --- Words ---
    /// A run of word characters that is not a keyword (e.g., `users`, `42`, `user_id`).
    Ident(String),

    // --- Symbols ---
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Comma `,`
    Comma,
    /// Dot `.`, separating a table from a column in `table.column`
    Dot,
    /// Wildcard `*`
    Star,
    /// Equal to
    Equal,
    /// Any other non-whitespace character (quotes, `;`, `@`, ...).
    Symbol(char),

    // --- Special ---
    /// Represents the end of the input.
    Eof,
}

impl Token {
    /// Returns `true` for reserved words. Keywords are still words, so they
    /// can be used wherever the grammar expects a name.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Create
                | Token::Table
                | Token::Insert
                | Token::Into
                | Token::Values
                | Token::Select
                | Token::From
                | Token::Join
                | Token::On
                | Token::Where
                | Token::Desc
                | Token::Describe
                | Token::Show
                | Token::Databases
        )
    }

    /// Returns `true` if the token was made of word characters.
    pub fn is_word(&self) -> bool {
        self.is_keyword() || matches!(self, Token::Ident(_))
    }
}

/// A [Token] together with the byte range it covers in the source text.
///
/// Spans let the parser slice the original text back out, which is how raw
/// value lists and the `WHERE` tail keep their exact spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

impl Lexeme {
    /// Text covered by this lexeme in `source`.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Returns `true` for characters allowed in identifiers: letters, digits and `_`.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A lexical scanner (lexer) that converts a raw statement into a sequence of [Lexeme]s.
pub struct Tokenizer<'a> {
    source: &'a str,
    /// The input as `(byte offset, char)` pairs for easy iteration.
    input: Vec<(usize, char)>,
    /// The current position in the character vector.
    position: usize,
}

impl<'a> Tokenizer<'a> {
    /// Creates a new Tokenizer for the given input string.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            input: source.char_indices().collect(),
            position: 0,
        }
    }

    /// Processes the entire input and returns the lexemes, always terminated
    /// by a [Token::Eof] lexeme positioned at the end of the source.
    ///
    /// Scanning never fails: characters outside the grammar become
    /// [Token::Symbol] and are rejected (or ignored) by the parser.
    ///
    /// # Example
    /// ```
    /// # use flatdb::tokenizer::{Tokenizer, Token};
    /// let lexemes = Tokenizer::new("SELECT *").tokenize();
    /// assert_eq!(lexemes[0].token, Token::Select);
    /// assert_eq!(lexemes[1].token, Token::Star);
    /// ```
    pub fn tokenize(&mut self) -> Vec<Lexeme> {
        let mut lexemes = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                break;
            }

            lexemes.push(self.next_lexeme());
        }

        lexemes.push(Lexeme {
            token: Token::Eof,
            start: self.source.len(),
            end: self.source.len(),
        });
        lexemes
    }

    /// Identifies the next lexeme based on the character at the current position.
    fn next_lexeme(&mut self) -> Lexeme {
        let start = self.offset();
        let ch = self.current_char();

        let token = match ch {
            c if is_word_char(c) => self.read_word(),
            _ => {
                self.advance();
                match ch {
                    '(' => Token::LeftParen,
                    ')' => Token::RightParen,
                    ',' => Token::Comma,
                    '.' => Token::Dot,
                    '*' => Token::Star,
                    '=' => Token::Equal,
                    other => Token::Symbol(other),
                }
            }
        };

        Lexeme {
            token,
            start,
            end: self.offset(),
        }
    }

    // --- Navigation Helpers ---

    fn current_char(&self) -> char {
        self.input[self.position].1
    }

    /// Byte offset of the current position, or the source length at the end.
    fn offset(&self) -> usize {
        self.input
            .get(self.position)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.source.len())
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    // --- Extraction Logic ---

    /// Reads a run of word characters and determines if it's a reserved
    /// keyword or a user-defined identifier.
    ///
    /// Keywords are matched case-insensitively.
    fn read_word(&mut self) -> Token {
        let mut word = String::new();

        while !self.is_at_end() && is_word_char(self.current_char()) {
            word.push(self.current_char());
            self.advance();
        }

        match word.to_uppercase().as_str() {
            "CREATE" => Token::Create,
            "TABLE" => Token::Table,
            "INSERT" => Token::Insert,
            "INTO" => Token::Into,
            "VALUES" => Token::Values,
            "SELECT" => Token::Select,
            "FROM" => Token::From,
            "JOIN" => Token::Join,
            "ON" => Token::On,
            "WHERE" => Token::Where,
            "DESC" => Token::Desc,
            "DESCRIBE" => Token::Describe,
            "SHOW" => Token::Show,
            "DATABASES" => Token::Databases,
            _ => Token::Ident(word),
        }
    }
}
