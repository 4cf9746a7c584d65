pub mod report;

use std::process::Termination;

use thiserror::Error;

use crate::{
    compile::{parser::ParseError, semantic::SemanticError},
    datastructures::scope_stack::ScopeError,
};

pub struct ExitCode(u8);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAIL_PARSING: ExitCode = ExitCode(42);
    pub const FAIL_SEMANTIC: ExitCode = ExitCode(7);
    pub const FAIL_OTHER: ExitCode = ExitCode(255);
}

impl Termination for ExitCode {
    fn report(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self.0)
    }
}

impl From<&ApolloError> for ExitCode {
    fn from(value: &ApolloError) -> Self {
        match value {
            ApolloError::ParsingError(_) => ExitCode::FAIL_PARSING,
            ApolloError::SemanticErrors(_) => ExitCode::FAIL_SEMANTIC,
            _ => ExitCode::FAIL_OTHER,
        }
    }
}

impl From<ApolloError> for ExitCode {
    fn from(value: ApolloError) -> Self {
        ExitCode::from(&value)
    }
}

#[derive(Error, Debug)]
pub enum ApolloError {
    #[error("Syntactic Analysis failed: {0}")]
    ParsingError(#[from] ParseError),

    #[error("Semantic Analysis failed with {} error(s).", .0.len())]
    SemanticErrors(Vec<SemanticError>),

    #[error("Scope bookkeeping failed: {0}")]
    ScopeError(#[from] ScopeError),

    #[error("There was an I/O error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("There was a Formatting error: {0}")]
    FmtError(#[from] std::fmt::Error),
}

impl From<Vec<SemanticError>> for ApolloError {
    fn from(errors: Vec<SemanticError>) -> Self {
        ApolloError::SemanticErrors(errors)
    }
}
