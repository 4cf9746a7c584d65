use std::{
    fmt::Write,
    fs::{self},
    path::PathBuf,
};

use crate::{
    compile::{
        ast::Program,
        parser::lex::{LexicalTables, Token, Tokenizer},
    },
    infra::{
        ApolloError,
        report::{self, Diagnostic},
    },
};

pub mod ast;
pub mod ir;
pub mod parser;
pub mod semantic;

// Custom macro for compiler pipeline errors
macro_rules! pipeline_error {
    ($msg:expr) => {
        panic!("Compiler Pipeline encountered an error: {}", $msg)
    };
}

/// What the compiler writes to its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Emit {
    #[default]
    Ir,
    Tokens,
    Ast,
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    src_path: Option<PathBuf>,
    out_path: Option<PathBuf>,
    emit: Emit,
    source: Option<String>,
}

impl Compiler {
    pub fn new() -> Compiler {
        Compiler::default()
    }

    pub fn src(&mut self, src: PathBuf) -> &mut Self {
        self.src_path = Some(src);

        self
    }

    pub fn out(&mut self, out: PathBuf) -> &mut Self {
        self.out_path = Some(out);

        self
    }

    pub fn emit(&mut self, emit: Emit) -> &mut Self {
        self.emit = emit;

        self
    }

    /// Source text of the last compilation, kept for error reporting.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn compile(&mut self) -> Result<&mut Self, ApolloError> {
        let Some(ref src_path) = self.src_path else {
            pipeline_error!("No src path provided")
        };

        let src = fs::read_to_string(src_path)?;
        let source = self.source.insert(src);

        let output = match self.emit {
            Emit::Ir => compile_source(source)?,
            Emit::Tokens => dump_tokens(source)?,
            Emit::Ast => dump_ast(source)?,
        };

        let Some(ref out_path) = self.out_path else {
            pipeline_error!("No output path provided.")
        };

        fs::write(out_path, output)?;

        Ok(self)
    }

    /// Prints diagnostics for `err` against the source of the last compilation.
    pub fn report(&self, err: &ApolloError) -> Result<(), ApolloError> {
        let diagnostics: Vec<Diagnostic> = match err {
            ApolloError::ParsingError(err) => vec![Diagnostic::from(err)],
            ApolloError::SemanticErrors(errors) => errors.iter().map(Diagnostic::from).collect(),
            _ => vec![],
        };

        match self.source() {
            Some(source) if !diagnostics.is_empty() => report::eprint(source, &diagnostics)?,
            _ => eprintln!("{err}"),
        }

        Ok(())
    }
}

pub fn parse(source: &str) -> Result<Program, ApolloError> {
    Ok(parser::parse(source)?)
}

/// Runs every stage on `source` and returns the LLVM IR text.
pub fn compile_source(source: &str) -> Result<String, ApolloError> {
    let program = parse(source)?;
    let symbols = semantic::analyze(&program).into_result()?;

    ir::generate(&program, &symbols)
}

/// One line per token, trivia included.
pub fn dump_tokens(source: &str) -> Result<String, ApolloError> {
    let tables = LexicalTables::apollo();
    let tokens: Vec<Token<'_>> = Tokenizer::new(&tables).tokenize(source);

    let mut out = String::new();
    for token in tokens {
        writeln!(
            &mut out,
            "{}:{}\t{:?}\t{:?}",
            token.line, token.column, token.kind, token.lexeme
        )?;
    }

    Ok(out)
}

pub fn dump_ast(source: &str) -> Result<String, ApolloError> {
    let program = parse(source)?;

    let mut out = String::new();
    writeln!(&mut out, "{program:#?}")?;

    Ok(out)
}
