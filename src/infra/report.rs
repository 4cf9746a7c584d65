use std::{io, ops::Range};

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::compile::{ast::SourcePos, parser::ParseError, semantic::SemanticError};

/// One message anchored to a character range of the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub title: String,
    pub label: String,
    pub span: Range<usize>,
}

fn span_at(pos: SourcePos, length: usize) -> Range<usize> {
    pos.offset..pos.offset + length.max(1)
}

impl From<&ParseError> for Diagnostic {
    fn from(err: &ParseError) -> Self {
        let token = err.token();
        let label = match err {
            ParseError::Unexpected { message, .. } => message.clone(),
            ParseError::NestingTooDeep { limit, .. } => {
                format!("this opens level {}", limit + 1)
            }
        };

        Diagnostic {
            title: "syntax error".to_string(),
            label,
            span: token.offset..token.offset + token.length,
        }
    }
}

impl From<&SemanticError> for Diagnostic {
    fn from(err: &SemanticError) -> Self {
        let length = match err {
            SemanticError::Redeclared { name, .. }
            | SemanticError::Undeclared { name, .. }
            | SemanticError::ReadNumberTarget { name, .. }
            | SemanticError::ReadTextTarget { name, .. } => name.chars().count(),
            _ => 1,
        };

        Diagnostic {
            title: "semantic error".to_string(),
            label: err.to_string(),
            span: span_at(err.pos(), length),
        }
    }
}

pub fn write(
    source: &str,
    diagnostic: &Diagnostic,
    color: bool,
    out: &mut impl io::Write,
) -> io::Result<()> {
    Report::build(ReportKind::Error, diagnostic.span.clone())
        .with_config(Config::default().with_color(color))
        .with_message(&diagnostic.title)
        .with_label(
            Label::new(diagnostic.span.clone())
                .with_message(&diagnostic.label)
                .with_color(Color::Red),
        )
        .finish()
        .write(Source::from(source), out)
}

/// Plain text rendering, used by tests and when stderr is not a terminal.
pub fn render(source: &str, diagnostics: &[Diagnostic]) -> io::Result<String> {
    let mut out = Vec::new();

    for diagnostic in diagnostics {
        write(source, diagnostic, false, &mut out)?;
    }

    Ok(String::from_utf8_lossy(&out).into_owned())
}

pub fn eprint(source: &str, diagnostics: &[Diagnostic]) -> io::Result<()> {
    let mut stderr = io::stderr().lock();

    for diagnostic in diagnostics {
        write(source, diagnostic, true, &mut stderr)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{parser::parse, semantic::analyze};

    #[test]
    fn parse_errors_span_the_offending_token() {
        let source = "algoritmo t x = = fim_algoritmo";
        let err = parse(source).unwrap_err();

        let diagnostic = Diagnostic::from(&err);
        assert_eq!(diagnostic.span, 16..17);

        let text = render(source, &[diagnostic]).unwrap();
        assert!(text.contains("syntax error"));
        assert!(text.contains("found '='"));
    }

    #[test]
    fn semantic_errors_span_the_name() {
        let source = "algoritmo t\nescreva(valor)\nfim_algoritmo";
        let program = parse(source).unwrap();
        let errors = analyze(&program).errors;

        let diagnostics: Vec<_> = errors.iter().map(Diagnostic::from).collect();
        assert_eq!(diagnostics[0].span, 20..25);

        let text = render(source, &diagnostics).unwrap();
        assert!(text.contains("variable valor is not declared"));
    }
}
