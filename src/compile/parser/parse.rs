use chumsky::input::{Checkpoint, Cursor, Input, ValueInput};
use chumsky::inspector::Inspector;
use chumsky::prelude::*;

use crate::compile::ast::{
    BinaryOp, Block, Builtin, Expr, Program, SourcePos, Stmt, Type, UnaryOp, VarDeclaration,
};
use crate::compile::parser::MAX_NESTING_DEPTH;
use crate::compile::parser::lex::{Token, TokenKind};

pub type ErrorParserExtra<'src> = extra::Full<Rich<'src, Token<'src>>, Nesting, ()>;

/// Any input yielding owned tokens with index spans, e.g. `&[Token]`.
pub trait TokenInput<'src>: ValueInput<'src, Token = Token<'src>, Span = SimpleSpan> {}

impl<'src, I> TokenInput<'src> for I where I: ValueInput<'src, Token = Token<'src>, Span = SimpleSpan> {}

/// How many constructs the parser is currently inside. Every `(`, `{`,
/// `faca` and `senao` opens one level until its construct is complete.
#[derive(Clone, Debug, Default)]
pub struct Nesting {
    depth: usize,
    exceeded: Option<usize>,
}

impl Nesting {
    /// Index of the first token that opened a level beyond the limit.
    pub fn exceeded(&self) -> Option<usize> {
        self.exceeded
    }
}

// Backtracking restores the depth of the checkpoint it returns to.
impl<'src, I: Input<'src>> Inspector<'src, I> for Nesting {
    type Checkpoint = usize;

    fn on_token(&mut self, _: &I::Token) {}

    fn on_save<'parse>(&self, _: &Cursor<'src, 'parse, I>) -> usize {
        self.depth
    }

    fn on_rewind<'parse>(&mut self, marker: &Checkpoint<'src, 'parse, I, usize>) {
        self.depth = *marker.inspector();
    }
}

fn token<'src, I>(
    kind: TokenKind,
    word: &'static str,
) -> impl Parser<'src, I, SourcePos, ErrorParserExtra<'src>> + Clone
where
    I: TokenInput<'src>,
{
    select! {
        Token { kind: k, lexeme, line, column, offset, .. } if k == kind && lexeme == word => {
            SourcePos { line, column, offset }
        }
    }
    .labelled(format!("'{word}'"))
}

fn keyword<'src, I: TokenInput<'src>>(
    word: &'static str,
) -> impl Parser<'src, I, SourcePos, ErrorParserExtra<'src>> + Clone {
    token(TokenKind::Keyword, word)
}

fn operator<'src, I: TokenInput<'src>>(
    op: &'static str,
) -> impl Parser<'src, I, SourcePos, ErrorParserExtra<'src>> + Clone {
    token(TokenKind::Operator, op)
}

fn symbol<'src, I: TokenInput<'src>>(
    sym: &'static str,
) -> impl Parser<'src, I, SourcePos, ErrorParserExtra<'src>> + Clone {
    token(TokenKind::Symbol, sym)
}

fn of_kind<'src, I: TokenInput<'src>>(
    kind: TokenKind,
    label: &'static str,
) -> impl Parser<'src, I, Token<'src>, ErrorParserExtra<'src>> + Clone {
    select! { t @ Token { kind: k, .. } if k == kind => t }.labelled(label)
}

fn identifier<'src, I: TokenInput<'src>>()
-> impl Parser<'src, I, (String, SourcePos), ErrorParserExtra<'src>> + Clone {
    select! {
        Token { kind: TokenKind::Identifier, lexeme, line, column, offset, .. } => {
            (lexeme.into_owned(), SourcePos { line, column, offset })
        }
    }
    .labelled("identifier")
}

fn end_of_input<'src, I: TokenInput<'src>>()
-> impl Parser<'src, I, (), ErrorParserExtra<'src>> + Clone {
    of_kind(TokenKind::EndOfInput, "end of input").ignored()
}

/// Consumes `opener` and enters one more level of nesting.
fn opening<'src, I, P>(opener: P) -> impl Parser<'src, I, SourcePos, ErrorParserExtra<'src>> + Clone
where
    I: TokenInput<'src>,
    P: Parser<'src, I, SourcePos, ErrorParserExtra<'src>> + Clone,
{
    opener.try_map_with(|pos, extra| {
        let span = extra.span();
        let nesting: &mut Nesting = extra.state();
        nesting.depth += 1;

        if nesting.depth > MAX_NESTING_DEPTH {
            nesting.exceeded.get_or_insert(span.start);
            return Err(Rich::custom(
                span,
                format!("nesting deeper than {MAX_NESTING_DEPTH} levels"),
            ));
        }

        Ok(pos)
    })
}

fn closing<'src, I: TokenInput<'src>>()
-> impl Parser<'src, I, (), ErrorParserExtra<'src>> + Clone {
    empty().try_map_with(|(), extra| {
        let nesting: &mut Nesting = extra.state();
        nesting.depth = nesting.depth.saturating_sub(1);

        Ok(())
    })
}

/// `inner` parsed one level deeper than the construct `opener` starts.
fn nested<'src, I, O, P, Q>(
    opener: P,
    inner: Q,
) -> impl Parser<'src, I, (SourcePos, O), ErrorParserExtra<'src>> + Clone
where
    I: TokenInput<'src>,
    P: Parser<'src, I, SourcePos, ErrorParserExtra<'src>> + Clone,
    Q: Parser<'src, I, O, ErrorParserExtra<'src>> + Clone,
{
    opening(opener).then(inner).then_ignore(closing())
}

fn literal<'src, I: TokenInput<'src>>()
-> impl Parser<'src, I, Expr, ErrorParserExtra<'src>> + Clone {
    let integer = of_kind(TokenKind::Integer, "integer").try_map(|t, span| {
        t.lexeme
            .parse::<i32>()
            .map(|value| Expr::Integer(value, t.pos()))
            .map_err(|_| Rich::custom(span, format!("integer literal {} is out of range", t.lexeme)))
    });

    let real = of_kind(TokenKind::Real, "real").try_map(|t, span| {
        t.lexeme
            .parse::<f64>()
            .map(|value| Expr::Real(value, t.pos()))
            .map_err(|_| Rich::custom(span, format!("malformed real literal {}", t.lexeme)))
    });

    let text = of_kind(TokenKind::String, "string").map(|t| {
        let content = t
            .lexeme
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(&t.lexeme)
            .to_string();

        Expr::Text(content, t.pos())
    });

    let boolean = of_kind(TokenKind::Boolean, "boolean")
        .map(|t| Expr::Boolean(t.lexeme == "verdadeiro", t.pos()));

    choice((integer, real, text, boolean))
}

fn read_call<'src, I: TokenInput<'src>>()
-> impl Parser<'src, I, Expr, ErrorParserExtra<'src>> + Clone {
    choice((
        keyword("leia_numero").map(|pos| (Builtin::ReadNumber, pos)),
        keyword("leia_texto").map(|pos| (Builtin::ReadText, pos)),
    ))
    .then_ignore(symbol("("))
    .then_ignore(symbol(")"))
    .map(|(builtin, pos)| Expr::Call(builtin, pos))
}

fn binary(lhs: Expr, (op, rhs): (BinaryOp, Expr)) -> Expr {
    let pos = lhs.pos();
    Expr::Binary(op, lhs.boxed(), rhs.boxed(), pos)
}

///
/// Or := And ('||' And)*, And := Rel ('&&' Rel)*, Rel := Add (relop Add)?,
/// Add := Mul (('+'|'-') Mul)*, Mul := Unary (('*'|'/') Unary)*,
/// Unary := '-' Primary | Primary.
///
pub fn expression<'src, I: TokenInput<'src>>()
-> impl Parser<'src, I, Expr, ErrorParserExtra<'src>> + Clone {
    recursive(|expr| {
        let variable = identifier().map(|(name, pos)| Expr::Variable(name, pos));

        let primary = choice((
            literal(),
            read_call(),
            variable,
            nested(symbol("("), expr.then_ignore(symbol(")"))).map(|(_, inner)| inner),
        ))
        .boxed();

        let unary = operator("-")
            .then(primary.clone())
            .map(|(pos, operand)| Expr::Unary(UnaryOp::Neg, operand.boxed(), pos))
            .or(primary)
            .boxed();

        let mul_op = choice((
            operator("*").to(BinaryOp::Mul),
            operator("/").to(BinaryOp::Div),
        ));

        let product = unary
            .clone()
            .foldl(mul_op.then(unary).repeated(), binary)
            .boxed();

        let sum_op = choice((
            operator("+").to(BinaryOp::Add),
            operator("-").to(BinaryOp::Sub),
        ));

        let sum = product
            .clone()
            .foldl(sum_op.then(product).repeated(), binary)
            .boxed();

        let rel_op = choice((
            operator("==").to(BinaryOp::Eq),
            operator("!=").to(BinaryOp::NotEq),
            operator("<=").to(BinaryOp::LessEq),
            operator(">=").to(BinaryOp::GreaterEq),
            operator("<").to(BinaryOp::Less),
            operator(">").to(BinaryOp::Greater),
        ));

        // Non-associative: at most one comparison per level.
        let comparison = sum
            .clone()
            .then(rel_op.then(sum).or_not())
            .map(|(lhs, rhs)| match rhs {
                Some(rhs) => binary(lhs, rhs),
                None => lhs,
            })
            .boxed();

        let conjunction = comparison
            .clone()
            .foldl(
                operator("&&").to(BinaryOp::And).then(comparison).repeated(),
                binary,
            )
            .boxed();

        conjunction.clone().foldl(
            operator("||").to(BinaryOp::Or).then(conjunction).repeated(),
            binary,
        )
    })
}

fn type_keyword<'src, I: TokenInput<'src>>()
-> impl Parser<'src, I, Type, ErrorParserExtra<'src>> + Clone {
    choice((
        keyword("inteiro").to(Type::Integer),
        keyword("real").to(Type::Real),
        keyword("texto").to(Type::Text),
        keyword("logico").to(Type::Boolean),
    ))
}

/// Declaration := TypeKeyword IDENT (',' IDENT)*
pub fn declaration<'src, I: TokenInput<'src>>()
-> impl Parser<'src, I, Vec<VarDeclaration>, ErrorParserExtra<'src>> + Clone {
    type_keyword()
        .then(
            identifier()
                .separated_by(symbol(","))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .map(|(ty, names)| {
            names
                .into_iter()
                .map(|(name, pos)| VarDeclaration { ty, name, pos })
                .collect()
        })
}

#[derive(Clone, Debug)]
enum Item {
    Declarations(Vec<VarDeclaration>),
    Statement(Stmt),
    Empty,
}

fn item<'src, I, P>(statement: P) -> impl Parser<'src, I, Item, ErrorParserExtra<'src>> + Clone
where
    I: TokenInput<'src>,
    P: Parser<'src, I, Stmt, ErrorParserExtra<'src>> + Clone,
{
    choice((
        declaration().map(Item::Declarations),
        statement.map(Item::Statement),
        symbol(";").to(Item::Empty),
    ))
}

fn block_statements(items: Vec<Item>) -> Vec<Stmt> {
    items
        .into_iter()
        .flat_map(|item| match item {
            Item::Declarations(decls) => decls.into_iter().map(Stmt::Declaration).collect(),
            Item::Statement(stmt) => vec![stmt],
            Item::Empty => vec![],
        })
        .collect()
}

pub fn statement<'src, I: TokenInput<'src>>()
-> impl Parser<'src, I, Stmt, ErrorParserExtra<'src>> + Clone {
    recursive(|stmt| {
        let expr = expression().boxed();

        // A lone ';' as a body is an empty block.
        let body = choice((
            symbol(";").map(|pos| Stmt::Block(Block::empty(pos))),
            stmt.clone(),
        ))
        .boxed();

        let assignment = identifier()
            .then_ignore(operator("="))
            .then(expr.clone())
            .map(|((target, pos), value)| Stmt::Assignment { target, value, pos });

        let if_stmt = keyword("se")
            .then(expr.clone())
            .then(nested(keyword("faca"), body.clone()))
            .then(nested(keyword("senao"), body.clone()).or_not())
            .map(|(((pos, condition), (_, then)), otherwise)| Stmt::If {
                condition,
                then: then.boxed(),
                otherwise: otherwise.map(|(_, otherwise)| otherwise.boxed()),
                pos,
            });

        let while_stmt = keyword("enquanto")
            .then(expr.clone())
            .then(nested(keyword("faca"), body))
            .map(|((pos, condition), (_, body))| Stmt::While {
                condition,
                body: body.boxed(),
                pos,
            });

        let write = keyword("escreva")
            .then(
                expr.separated_by(symbol(","))
                    .at_least(1)
                    .collect::<Vec<_>>()
                    .delimited_by(symbol("("), symbol(")")),
            )
            .map(|(pos, arguments)| Stmt::Write { arguments, pos });

        let read_number = keyword("leia_numero")
            .then(identifier().delimited_by(symbol("("), symbol(")")))
            .map(|(pos, (target, _))| Stmt::ReadNumber { target, pos });

        let read_text = keyword("leia_texto")
            .then(identifier().delimited_by(symbol("("), symbol(")")))
            .map(|(pos, (target, _))| Stmt::ReadText { target, pos });

        let block = nested(
            symbol("{"),
            item(stmt)
                .repeated()
                .collect::<Vec<_>>()
                .then_ignore(symbol("}")),
        )
        .map(|(pos, items)| {
            Stmt::Block(Block {
                statements: block_statements(items),
                pos,
            })
        });

        choice((
            assignment,
            if_stmt,
            while_stmt,
            write,
            read_number,
            read_text,
            block,
        ))
        .boxed()
    })
}

/// Program := 'algoritmo' IDENT? (Declaration | Statement)* 'fim_algoritmo'
pub fn program_parser<'src, I: TokenInput<'src>>()
-> impl Parser<'src, I, Program, ErrorParserExtra<'src>> {
    keyword("algoritmo")
        .then(identifier().or_not())
        .then(item(statement()).repeated().collect::<Vec<_>>())
        .then_ignore(keyword("fim_algoritmo"))
        .then_ignore(end_of_input())
        .map(|((pos, name), items)| {
            let mut declarations = vec![];
            let mut statements = vec![];

            for item in items {
                match item {
                    Item::Declarations(mut decls) => declarations.append(&mut decls),
                    Item::Statement(stmt) => statements.push(stmt),
                    Item::Empty => {}
                }
            }

            Program {
                name: name.map(|(name, _)| name),
                declarations,
                statements,
                pos,
            }
        })
}
