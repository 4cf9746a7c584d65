pub mod symbols;
pub mod typecheck;

use thiserror::Error;

use crate::compile::ast::{
    BinaryOp, Block, Builtin, Expr, Program, SourcePos, Stmt, Type, VarDeclaration,
};
use crate::compile::semantic::symbols::{ScopeId, SymbolTable};
use crate::compile::semantic::typecheck::{Mistyped, TypeCheckableOperation, Violation};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    #[error("variable {name} is already declared in this scope")]
    Redeclared {
        name: String,
        pos: SourcePos,
        previous: SourcePos,
    },

    #[error("variable {name} is not declared")]
    Undeclared { name: String, pos: SourcePos },

    #[error("incompatible types: expected {expected}, found {found}")]
    TypeMismatch {
        expected: Type,
        found: Type,
        pos: SourcePos,
    },

    #[error("condition of '{construct}' must be of type logico, found {found}")]
    ConditionNotBoolean {
        construct: &'static str,
        found: Type,
        pos: SourcePos,
    },

    #[error("operator '{op}' requires numeric operands, found {left} and {right}")]
    NonNumericOperands {
        op: BinaryOp,
        left: Type,
        right: Type,
        pos: SourcePos,
    },

    #[error("operator '{op}' requires operands of the same type, found {left} and {right}")]
    EqualityMismatch {
        op: BinaryOp,
        left: Type,
        right: Type,
        pos: SourcePos,
    },

    #[error("operator '{op}' requires operands of type logico, found {left} and {right}")]
    NonBooleanOperands {
        op: BinaryOp,
        left: Type,
        right: Type,
        pos: SourcePos,
    },

    #[error("unary '-' requires a numeric operand, found {found}")]
    NonNumericNegation { found: Type, pos: SourcePos },

    #[error("variable {name} must be of type inteiro or real for leia_numero, found {found}")]
    ReadNumberTarget {
        name: String,
        found: Type,
        pos: SourcePos,
    },

    #[error("variable {name} must be of type texto for leia_texto, found {found}")]
    ReadTextTarget {
        name: String,
        found: Type,
        pos: SourcePos,
    },
}

impl SemanticError {
    pub fn pos(&self) -> SourcePos {
        match self {
            Self::Redeclared { pos, .. }
            | Self::Undeclared { pos, .. }
            | Self::TypeMismatch { pos, .. }
            | Self::ConditionNotBoolean { pos, .. }
            | Self::NonNumericOperands { pos, .. }
            | Self::EqualityMismatch { pos, .. }
            | Self::NonBooleanOperands { pos, .. }
            | Self::NonNumericNegation { pos, .. }
            | Self::ReadNumberTarget { pos, .. }
            | Self::ReadTextTarget { pos, .. } => *pos,
        }
    }
}

/// Outcome of analyzing one program. The symbol table is complete even when
/// errors were found.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub symbols: SymbolTable,
    pub errors: Vec<SemanticError>,
}

impl Analysis {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<SymbolTable, Vec<SemanticError>> {
        if self.errors.is_empty() {
            Ok(self.symbols)
        } else {
            Err(self.errors)
        }
    }
}

pub struct SemanticAnalysis {
    symbols: SymbolTable,
    scope: ScopeId,
    errors: Vec<SemanticError>,
}

impl SemanticAnalysis {
    fn new() -> SemanticAnalysis {
        SemanticAnalysis {
            symbols: SymbolTable::new(),
            scope: SymbolTable::ROOT,
            errors: vec![],
        }
    }

    /// Checks the whole program, collecting every error instead of stopping
    /// at the first one.
    pub fn analyze(program: &Program) -> Analysis {
        let mut analysis = Self::new();

        for decl in &program.declarations {
            analysis.declare(decl);
        }

        for stmt in &program.statements {
            analysis.analyze_stmt(stmt);
        }

        Analysis {
            symbols: analysis.symbols,
            errors: analysis.errors,
        }
    }

    fn declare(&mut self, decl: &VarDeclaration) {
        if let Err(err) = self.symbols.declare(self.scope, &decl.name, decl.ty, decl.pos) {
            self.errors.push(SemanticError::Redeclared {
                name: err.name,
                pos: decl.pos,
                previous: err.previous,
            });
        }
    }

    fn analyze_block(&mut self, block: &Block) {
        let outer = self.scope;
        self.scope = self.symbols.open(outer);

        for stmt in &block.statements {
            self.analyze_stmt(stmt);
        }

        self.scope = outer;
    }

    fn analyze_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Declaration(decl) => self.declare(decl),
            Stmt::Block(block) => self.analyze_block(block),
            Stmt::Assignment { target, value, pos } => {
                // The value is checked even when the target is unknown.
                let found = self.analyze_expr(value);

                let Some(symbol) = self.symbols.lookup_mut(self.scope, target) else {
                    self.undeclared(target, *pos);
                    return;
                };

                symbol.initialized = true;

                if !symbol.ty.accepts(found) {
                    let expected = symbol.ty;
                    self.errors.push(SemanticError::TypeMismatch {
                        expected,
                        found,
                        pos: *pos,
                    });
                }
            }
            Stmt::If {
                condition,
                then,
                otherwise,
                ..
            } => {
                self.analyze_condition("se", condition);
                self.analyze_stmt(then);

                if let Some(otherwise) = otherwise {
                    self.analyze_stmt(otherwise);
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                self.analyze_condition("enquanto", condition);
                self.analyze_stmt(body);
            }
            Stmt::Write { arguments, .. } => {
                for argument in arguments {
                    self.analyze_expr(argument);
                }
            }
            Stmt::ReadNumber { target, pos } => {
                self.analyze_read(target, *pos, Builtin::ReadNumber);
            }
            Stmt::ReadText { target, pos } => {
                self.analyze_read(target, *pos, Builtin::ReadText);
            }
        }
    }

    fn analyze_condition(&mut self, construct: &'static str, condition: &Expr) {
        let found = self.analyze_expr(condition);

        if found != Type::Boolean {
            self.errors.push(SemanticError::ConditionNotBoolean {
                construct,
                found,
                pos: condition.pos(),
            });
        }
    }

    fn analyze_read(&mut self, target: &str, pos: SourcePos, builtin: Builtin) {
        let Some(symbol) = self.symbols.lookup_mut(self.scope, target) else {
            self.undeclared(target, pos);
            return;
        };

        symbol.initialized = true;
        let found = symbol.ty;

        let err = match builtin {
            Builtin::ReadNumber if !found.is_numeric() => SemanticError::ReadNumberTarget {
                name: target.to_string(),
                found,
                pos,
            },
            Builtin::ReadText if found != Type::Text => SemanticError::ReadTextTarget {
                name: target.to_string(),
                found,
                pos,
            },
            _ => return,
        };

        self.errors.push(err);
    }

    fn undeclared(&mut self, name: &str, pos: SourcePos) {
        self.errors.push(SemanticError::Undeclared {
            name: name.to_string(),
            pos,
        });
    }

    fn analyze_expr(&mut self, expr: &Expr) -> Type {
        match expr {
            Expr::Integer(..) => Type::Integer,
            Expr::Real(..) => Type::Real,
            Expr::Text(..) => Type::Text,
            Expr::Boolean(..) => Type::Boolean,
            Expr::Call(Builtin::ReadNumber, _) => Type::Integer,
            Expr::Call(Builtin::ReadText, _) => Type::Text,
            Expr::Variable(name, pos) => match self.symbols.lookup(self.scope, name) {
                Some(symbol) => symbol.ty,
                None => {
                    self.undeclared(name, *pos);
                    Type::Integer
                }
            },
            Expr::Unary(op, operand, pos) => {
                let found = self.analyze_expr(operand);

                op.synthesize([found]).unwrap_or_else(|Mistyped { fallback, .. }| {
                    self.errors
                        .push(SemanticError::NonNumericNegation { found, pos: *pos });
                    fallback
                })
            }
            Expr::Binary(op, lhs, rhs, pos) => {
                let left = self.analyze_expr(lhs);
                let right = self.analyze_expr(rhs);

                op.synthesize([left, right])
                    .unwrap_or_else(|Mistyped { fallback, violation }| {
                        let (op, pos) = (*op, *pos);

                        self.errors.push(match violation {
                            Violation::MismatchedOperands => SemanticError::EqualityMismatch {
                                op,
                                left,
                                right,
                                pos,
                            },
                            Violation::NonBooleanOperands => SemanticError::NonBooleanOperands {
                                op,
                                left,
                                right,
                                pos,
                            },
                            Violation::NonNumericOperands | Violation::NonNumericOperand => {
                                SemanticError::NonNumericOperands {
                                    op,
                                    left,
                                    right,
                                    pos,
                                }
                            }
                        });

                        fallback
                    })
            }
        }
    }
}

pub fn analyze(program: &Program) -> Analysis {
    SemanticAnalysis::analyze(program)
}
