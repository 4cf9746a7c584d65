use std::fmt::{self, Display};

/// Position of a construct in the source text. Lines and columns start at 1,
/// `offset` counts characters from the start of the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourcePos {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Integer,
    Real,
    Text,
    Boolean,
    Void,
}

impl Type {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }

    /// Integer widens to Real, nothing else converts implicitly.
    pub fn accepts(self, actual: Type) -> bool {
        self == actual || (self == Self::Real && actual == Self::Integer)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "inteiro"),
            Self::Real => write!(f, "real"),
            Self::Text => write!(f, "texto"),
            Self::Boolean => write!(f, "logico"),
            Self::Void => write!(f, "void"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub name: Option<String>,
    pub declarations: Vec<VarDeclaration>,
    pub statements: Vec<Stmt>,
    pub pos: SourcePos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDeclaration {
    pub ty: Type,
    pub name: String,
    pub pos: SourcePos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub pos: SourcePos,
}

impl Block {
    pub fn empty(pos: SourcePos) -> Self {
        Self {
            statements: vec![],
            pos,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Declaration(VarDeclaration),
    Block(Block),
    Assignment {
        target: String,
        value: Expr,
        pos: SourcePos,
    },
    If {
        condition: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
        pos: SourcePos,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        pos: SourcePos,
    },
    Write {
        arguments: Vec<Expr>,
        pos: SourcePos,
    },
    ReadNumber {
        target: String,
        pos: SourcePos,
    },
    ReadText {
        target: String,
        pos: SourcePos,
    },
}

impl Stmt {
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn pos(&self) -> SourcePos {
        match self {
            Self::Declaration(VarDeclaration { pos, .. })
            | Self::Block(Block { pos, .. })
            | Self::Assignment { pos, .. }
            | Self::If { pos, .. }
            | Self::While { pos, .. }
            | Self::Write { pos, .. }
            | Self::ReadNumber { pos, .. }
            | Self::ReadText { pos, .. } => *pos,
        }
    }
}

/// Input primitives that can appear as expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    ReadNumber,
    ReadText,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Self::ReadNumber => "leia_numero",
            Self::ReadText => "leia_texto",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Integer(i32, SourcePos),
    Real(f64, SourcePos),
    Text(String, SourcePos),
    Boolean(bool, SourcePos),
    Variable(String, SourcePos),
    Call(Builtin, SourcePos),
    Unary(UnaryOp, Box<Expr>, SourcePos),
    Binary(BinaryOp, Box<Expr>, Box<Expr>, SourcePos),
}

impl Expr {
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn pos(&self) -> SourcePos {
        match self {
            Self::Integer(_, pos)
            | Self::Real(_, pos)
            | Self::Text(_, pos)
            | Self::Boolean(_, pos)
            | Self::Variable(_, pos)
            | Self::Call(_, pos)
            | Self::Unary(_, _, pos)
            | Self::Binary(_, _, _, pos) => *pos,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    //
    Eq,
    NotEq,
    //
    Less,
    LessEq,
    Greater,
    GreaterEq,
    //
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::NotEq)
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            Self::Less | Self::LessEq | Self::Greater | Self::GreaterEq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::And => "&&",
            Self::Or => "||",
        };

        write!(f, "{symbol}")
    }
}
