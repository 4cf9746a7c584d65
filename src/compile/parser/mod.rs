pub mod lex;
pub mod parse;

use std::{borrow::Cow, panic, thread};

use chumsky::{
    Parser,
    error::{Rich, RichReason},
};
use thiserror::Error;

use crate::compile::ast::Program;
use crate::compile::parser::lex::{LexicalTables, Token, TokenKind, Tokenizer, significant};
use crate::compile::parser::parse::{Nesting, program_parser};

/// Levels of `(`, `{`, `faca` and `senao` a program may nest.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Stack of the parser thread. The combinators descend through several
/// frames per nesting level, so the parser does not rely on the stack of
/// whatever thread calls it.
const PARSER_STACK_SIZE: usize = 64 << 20;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("{message} at line {}, column {}", token.line, token.column)]
    Unexpected {
        token: Token<'static>,
        message: String,
    },
    #[error(
        "nesting deeper than {limit} levels at line {}, column {}",
        token.line,
        token.column
    )]
    NestingTooDeep { token: Token<'static>, limit: usize },
}

impl ParseError {
    /// The token the parser stopped at.
    pub fn token(&self) -> &Token<'static> {
        match self {
            Self::Unexpected { token, .. } | Self::NestingTooDeep { token, .. } => token,
        }
    }

    fn from_rich(tokens: &[Token<'_>], errors: Vec<Rich<'_, Token<'_>>>) -> Self {
        let Some(err) = errors.into_iter().next() else {
            return Self::Unexpected {
                token: end_token(tokens),
                message: "unexpected input".to_string(),
            };
        };

        let token = err
            .found()
            .or_else(|| tokens.get(err.span().start))
            .map(|t| t.clone().into_owned())
            .unwrap_or_else(|| end_token(tokens));

        let message = match err.reason() {
            RichReason::Custom(message) => message.clone(),
            _ => {
                let mut expected: Vec<String> = err.expected().map(ToString::to_string).collect();
                expected.sort();
                expected.dedup();

                let found = format!("'{token}'");

                if expected.is_empty() {
                    format!("unexpected {found}")
                } else {
                    format!("expected {}, found {found}", expected.join(" or "))
                }
            }
        };

        Self::Unexpected { token, message }
    }
}

/// The end-of-input marker of `tokens`, synthesized at offset zero when absent.
fn end_token(tokens: &[Token<'_>]) -> Token<'static> {
    tokens
        .iter()
        .rev()
        .find(|t| t.kind == TokenKind::EndOfInput)
        .map(|t| t.clone().into_owned())
        .unwrap_or(Token {
            kind: TokenKind::EndOfInput,
            lexeme: Cow::Borrowed(""),
            line: 1,
            column: 1,
            length: 0,
            offset: 0,
        })
}

fn run_parser(tokens: &[Token<'_>]) -> Result<Program, ParseError> {
    let mut nesting = Nesting::default();
    let result = program_parser()
        .parse_with_state(tokens, &mut nesting)
        .into_result();

    result.map_err(|errors| {
        match nesting.exceeded().and_then(|index| tokens.get(index)) {
            Some(token) => ParseError::NestingTooDeep {
                token: token.clone().into_owned(),
                limit: MAX_NESTING_DEPTH,
            },
            None => ParseError::from_rich(tokens, errors),
        }
    })
}

/// Parses already tokenized input. Trivia must be filtered out and the
/// sequence should end with the end-of-input token.
pub fn parse_tokens(tokens: &[Token<'_>]) -> Result<Program, ParseError> {
    let run = move || run_parser(tokens);

    thread::scope(|scope| {
        let spawned = thread::Builder::new()
            .name("apollo-parser".to_string())
            .stack_size(PARSER_STACK_SIZE)
            .spawn_scoped(scope, run);

        match spawned {
            Ok(handle) => handle
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload)),
            Err(_) => run(),
        }
    })
}

pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tables = LexicalTables::apollo();
    let tokens = significant(Tokenizer::new(&tables).tokenize(source));

    parse_tokens(&tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_nesting_is_rejected() {
        let depth = MAX_NESTING_DEPTH + 1;
        let source = format!(
            "algoritmo t x = {}1{} fim_algoritmo",
            "(".repeat(depth),
            ")".repeat(depth)
        );

        let err = parse(&source).unwrap_err();

        assert!(matches!(err, ParseError::NestingTooDeep { limit, .. } if limit == MAX_NESTING_DEPTH));
        assert_eq!(err.token().lexeme, "(");
        assert_eq!(err.token().column, 17 + MAX_NESTING_DEPTH);
    }

    fn if_chain(depth: usize) -> String {
        format!(
            "algoritmo t {}x = 1 fim_algoritmo",
            "se verdadeiro faca ".repeat(depth)
        )
    }

    #[test]
    fn deep_if_chains_are_rejected() {
        let err = parse(&if_chain(MAX_NESTING_DEPTH + 1)).unwrap_err();

        assert!(matches!(err, ParseError::NestingTooDeep { .. }));
        assert_eq!(err.token().lexeme, "faca");
        assert_eq!(err.token().column, 12 + 19 * MAX_NESTING_DEPTH + 15);
    }

    #[test]
    fn very_long_if_chains_fail_at_the_limit() {
        let err = parse(&if_chain(5000)).unwrap_err();

        assert!(matches!(err, ParseError::NestingTooDeep { limit, .. } if limit == MAX_NESTING_DEPTH));
    }

    #[test]
    fn else_chains_count_as_nesting() {
        let chain = "se falso faca x = 1 senao ".repeat(MAX_NESTING_DEPTH + 1);
        let err = parse(&format!("algoritmo t {chain}x = 2 fim_algoritmo")).unwrap_err();

        assert!(matches!(err, ParseError::NestingTooDeep { .. }));
    }

    #[test]
    fn limit_is_reached_on_a_small_stack() {
        let parens = format!(
            "algoritmo t x = {}1{} fim_algoritmo",
            "(".repeat(MAX_NESTING_DEPTH),
            ")".repeat(MAX_NESTING_DEPTH)
        );
        let blocks = format!(
            "algoritmo t {}x = 1{} fim_algoritmo",
            "{ ".repeat(MAX_NESTING_DEPTH),
            " }".repeat(MAX_NESTING_DEPTH)
        );
        let chain = if_chain(MAX_NESTING_DEPTH);

        let handle = std::thread::Builder::new()
            .stack_size(2 << 20)
            .spawn(move || [parens, blocks, chain].map(|source| parse(&source).is_ok()))
            .expect("spawn parser caller");

        assert_eq!(handle.join().expect("parse panicked"), [true, true, true]);
    }

    #[test]
    fn sequential_nesting_does_not_accumulate() {
        let statements = "x = (1) { y = 2 } se a faca ; ".repeat(MAX_NESTING_DEPTH * 2);

        assert!(parse(&format!("algoritmo t {statements}fim_algoritmo")).is_ok());
    }

    #[test]
    fn errors_render_line_and_column() {
        let err = parse("algoritmo t\n  x = \nfim_algoritmo").unwrap_err();

        assert_eq!(err.token().lexeme, "fim_algoritmo");
        assert!(err.to_string().ends_with("at line 3, column 1"));
    }

    #[test]
    fn empty_source_is_rejected_at_end_of_input() {
        let err = parse("").unwrap_err();

        assert_eq!(err.token().kind, TokenKind::EndOfInput);
        assert_eq!(
            err.to_string(),
            "expected 'algoritmo', found 'end of input' at line 1, column 1"
        );
    }

    #[test]
    fn errors_name_the_expected_tokens() {
        let err = parse("algoritmo t se x faca fim_algoritmo").unwrap_err();

        let ParseError::Unexpected { message, .. } = &err else {
            panic!("expected an unexpected token error, got {err:?}");
        };
        assert!(message.contains("'{'"), "{message}");
        assert!(message.contains("identifier"), "{message}");
        assert!(message.ends_with("found 'fim_algoritmo'"), "{message}");
        assert!(!message.contains("something else"), "{message}");
    }

    #[test]
    fn parse_tokens_tolerates_missing_end_marker() {
        let tokens = significant(crate::compile::parser::lex::tokenize("algoritmo"))
            .into_iter()
            .filter(|t| t.kind != TokenKind::EndOfInput)
            .collect::<Vec<_>>();

        let err = parse_tokens(&tokens).unwrap_err();
        assert_eq!(err.token().kind, TokenKind::EndOfInput);
    }
}
