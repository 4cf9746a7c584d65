use std::{
    borrow::Cow,
    collections::HashSet,
    fmt::{self, Display},
};

use chumsky::prelude::*;
use derive_into_owned::IntoOwned;

use crate::compile::ast::SourcePos;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Integer,
    Real,
    String,
    Boolean,
    Operator,
    Symbol,
    Comment,
    Whitespace,
    EndOfInput,
    Invalid,
}

impl TokenKind {
    /// Whitespace and comments never reach the parser.
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment)
    }
}

#[derive(Clone, Debug, PartialEq, IntoOwned)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: Cow<'src, str>,
    pub line: usize,
    pub column: usize,
    /// Length in characters.
    pub length: usize,
    /// Character offset of the first character, used for diagnostics.
    pub offset: usize,
}

impl Token<'_> {
    pub fn pos(&self) -> SourcePos {
        SourcePos {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    pub fn is(&self, kind: TokenKind, lexeme: &str) -> bool {
        self.kind == kind && self.lexeme == lexeme
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::EndOfInput => write!(f, "end of input"),
            _ => write!(f, "{}", self.lexeme),
        }
    }
}

pub const KEYWORDS: [&str; 16] = [
    "algoritmo",
    "fim_algoritmo",
    "se",
    "senao",
    "enquanto",
    "para",
    "faca",
    "escreva",
    "leia_numero",
    "leia_texto",
    "verdadeiro",
    "falso",
    "inteiro",
    "real",
    "texto",
    "logico",
];

pub const BOOLEANS: [&str; 2] = ["verdadeiro", "falso"];

pub const OPERATORS: [&str; 13] = [
    "==", "!=", "<=", ">=", "&&", "||", "<", ">", "=", "+", "-", "*", "/",
];

pub const SYMBOLS: [&str; 10] = ["(", ")", "{", "}", "[", "]", ":", ",", ";", "."];

/// Immutable lexical configuration. Built once and shared by reference.
#[derive(Clone, Debug)]
pub struct LexicalTables {
    keywords: HashSet<&'static str>,
    booleans: HashSet<&'static str>,
    operators: Vec<&'static str>,
    symbols: Vec<&'static str>,
}

impl LexicalTables {
    pub fn apollo() -> Self {
        Self {
            keywords: KEYWORDS.into_iter().collect(),
            booleans: BOOLEANS.into_iter().collect(),
            operators: OPERATORS.to_vec(),
            symbols: SYMBOLS.to_vec(),
        }
    }

    fn classify(&self, word: &str) -> TokenKind {
        if self.booleans.contains(word) {
            TokenKind::Boolean
        } else if self.keywords.contains(word) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        }
    }
}

impl Default for LexicalTables {
    fn default() -> Self {
        Self::apollo()
    }
}

///
/// Recognizers compete for the longest match at each position.
/// Declaration order is the tie-break priority.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recognizer {
    Word,
    Integer,
    Real,
    String,
    Comment,
    Whitespace,
}

impl Recognizer {
    pub const ALL: [Recognizer; 6] = [
        Self::Word,
        Self::Integer,
        Self::Real,
        Self::String,
        Self::Comment,
        Self::Whitespace,
    ];

    /// Byte length of the longest prefix of `input` this recognizer accepts.
    pub fn longest_match(self, input: &str) -> Option<usize> {
        let matched = match self {
            Self::Word => word().lazy().parse(input).into_output(),
            Self::Integer => integer().lazy().parse(input).into_output(),
            Self::Real => real().lazy().parse(input).into_output(),
            Self::String => string().lazy().parse(input).into_output(),
            Self::Comment => comment().lazy().parse(input).into_output(),
            Self::Whitespace => whitespace().lazy().parse(input).into_output(),
        };

        matched.map(str::len).filter(|len| *len > 0)
    }

    fn kind(self) -> TokenKind {
        match self {
            Self::Word => TokenKind::Identifier,
            Self::Integer => TokenKind::Integer,
            Self::Real => TokenKind::Real,
            Self::String => TokenKind::String,
            Self::Comment => TokenKind::Comment,
            Self::Whitespace => TokenKind::Whitespace,
        }
    }
}

fn word<'src>() -> impl Parser<'src, &'src str, &'src str> {
    text::ascii::ident()
}

fn sign<'src>() -> impl Parser<'src, &'src str, Option<char>> {
    one_of("+-").or_not()
}

fn integer<'src>() -> impl Parser<'src, &'src str, &'src str> {
    sign().then(text::digits(10)).to_slice()
}

fn real<'src>() -> impl Parser<'src, &'src str, &'src str> {
    sign()
        .then(text::digits(10))
        .then(just('.'))
        .then(text::digits(10))
        .to_slice()
}

// Unterminated strings do not match at all.
fn string<'src>() -> impl Parser<'src, &'src str, &'src str> {
    just('"')
        .then(none_of("\"").repeated())
        .then(just('"'))
        .to_slice()
}

fn comment<'src>() -> impl Parser<'src, &'src str, &'src str> {
    just('#').then(none_of("\n").repeated()).to_slice()
}

fn whitespace<'src>() -> impl Parser<'src, &'src str, &'src str> {
    any()
        .filter(|c: &char| c.is_whitespace())
        .repeated()
        .at_least(1)
        .to_slice()
}

#[derive(Clone, Copy, Debug)]
struct Cursor {
    byte: usize,
    offset: usize,
    line: usize,
    column: usize,
}

impl Cursor {
    fn start() -> Self {
        Self {
            byte: 0,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn advance(&mut self, lexeme: &str) {
        for c in lexeme.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.offset += 1;
        }
        self.byte += lexeme.len();
    }
}

pub struct Tokenizer<'t> {
    tables: &'t LexicalTables,
    recognizers: &'t [Recognizer],
}

impl<'t> Tokenizer<'t> {
    pub fn new(tables: &'t LexicalTables) -> Self {
        Self {
            tables,
            recognizers: &Recognizer::ALL,
        }
    }

    ///
    /// Splits `source` into tokens, trivia included, ending with a single
    /// end-of-input token. Unrecognized characters become `Invalid` tokens
    /// one character at a time, so this never fails.
    ///
    pub fn tokenize<'src>(&self, source: &'src str) -> Vec<Token<'src>> {
        let mut tokens = vec![];
        let mut cursor = Cursor::start();

        while cursor.byte < source.len() {
            let rest = &source[cursor.byte..];

            let Some((kind, len)) = self.longest_match(rest).or_else(|| {
                rest.chars()
                    .next()
                    .map(|c| (TokenKind::Invalid, c.len_utf8()))
            }) else {
                break;
            };

            let lexeme = &rest[..len];
            tokens.push(Token {
                kind,
                lexeme: Cow::Borrowed(lexeme),
                line: cursor.line,
                column: cursor.column,
                length: lexeme.chars().count(),
                offset: cursor.offset,
            });

            cursor.advance(lexeme);
        }

        tokens.push(Token {
            kind: TokenKind::EndOfInput,
            lexeme: Cow::Borrowed(""),
            line: cursor.line,
            column: cursor.column,
            length: 0,
            offset: cursor.offset,
        });

        tokens
    }

    fn longest_match(&self, input: &str) -> Option<(TokenKind, usize)> {
        let mut best: Option<(TokenKind, usize)> = None;
        let best_len = |best: &Option<(TokenKind, usize)>| best.map_or(0, |(_, len)| len);

        for recognizer in self.recognizers.iter() {
            let Some(len) = recognizer.longest_match(input) else {
                continue;
            };

            if len > best_len(&best) {
                let kind = match recognizer {
                    Recognizer::Word => self.tables.classify(&input[..len]),
                    _ => recognizer.kind(),
                };
                best = Some((kind, len));
            }
        }

        let exact = [
            (TokenKind::Operator, &self.tables.operators),
            (TokenKind::Symbol, &self.tables.symbols),
        ];

        for (kind, table) in exact {
            for candidate in table.iter() {
                if input.starts_with(candidate) && candidate.len() > best_len(&best) {
                    best = Some((kind, candidate.len()));
                }
            }
        }

        best
    }
}

pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    Tokenizer::new(&LexicalTables::apollo()).tokenize(source)
}

/// Drops whitespace and comments, keeping the end-of-input token.
pub fn significant<'src>(tokens: Vec<Token<'src>>) -> Vec<Token<'src>> {
    tokens
        .into_iter()
        .filter(|token| !token.kind.is_trivia())
        .collect()
}
