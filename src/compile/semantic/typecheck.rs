use crate::compile::ast::{BinaryOp, Type, UnaryOp};

/// Which operand rule an operator application broke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Violation {
    NonNumericOperands,
    MismatchedOperands,
    NonBooleanOperands,
    NonNumericOperand,
}

/// A failed application still has a type so that checking can continue
/// with the enclosing expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mistyped {
    pub fallback: Type,
    pub violation: Violation,
}

impl Mistyped {
    fn new(fallback: Type, violation: Violation) -> Self {
        Mistyped {
            fallback,
            violation,
        }
    }
}

pub trait TypeCheckableOperation<const N: usize> {
    /// Type of the operator applied to operands of the given types.
    fn synthesize(&self, operands: [Type; N]) -> Result<Type, Mistyped>;
}

impl TypeCheckableOperation<1> for UnaryOp {
    fn synthesize(&self, [operand]: [Type; 1]) -> Result<Type, Mistyped> {
        match self {
            UnaryOp::Neg if operand.is_numeric() => Ok(operand),
            UnaryOp::Neg => Err(Mistyped::new(Type::Integer, Violation::NonNumericOperand)),
        }
    }
}

impl TypeCheckableOperation<2> for BinaryOp {
    fn synthesize(&self, [lhs, rhs]: [Type; 2]) -> Result<Type, Mistyped> {
        let numeric = lhs.is_numeric() && rhs.is_numeric();

        if self.is_arithmetic() {
            if !numeric {
                return Err(Mistyped::new(Type::Integer, Violation::NonNumericOperands));
            }

            return Ok(promote(lhs, rhs));
        }

        let holds = if self.is_relational() {
            numeric
        } else if self.is_equality() {
            lhs == rhs
        } else {
            lhs == Type::Boolean && rhs == Type::Boolean
        };

        if holds {
            return Ok(Type::Boolean);
        }

        let violation = if self.is_relational() {
            Violation::NonNumericOperands
        } else if self.is_equality() {
            Violation::MismatchedOperands
        } else {
            Violation::NonBooleanOperands
        };

        Err(Mistyped::new(Type::Boolean, violation))
    }
}

/// Result type of arithmetic on two numeric operands.
pub fn promote(lhs: Type, rhs: Type) -> Type {
    if lhs == Type::Real || rhs == Type::Real {
        Type::Real
    } else {
        Type::Integer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::ast::{BinaryOp, Type};

    macro_rules! test_binary {
        ($name:ident, $op:expr, $lhs:expr, $rhs:expr, Ok($ty:expr)) => {
            #[test]
            fn $name() {
                assert_eq!($op.synthesize([$lhs, $rhs]), Ok($ty));
            }
        };
        ($name:ident, $op:expr, $lhs:expr, $rhs:expr, Err($fallback:expr, $violation:expr)) => {
            #[test]
            fn $name() {
                assert_eq!(
                    $op.synthesize([$lhs, $rhs]),
                    Err(Mistyped::new($fallback, $violation))
                );
            }
        };
    }

    test_binary!(int_plus_int, BinaryOp::Add, Type::Integer, Type::Integer, Ok(Type::Integer));
    test_binary!(int_times_real, BinaryOp::Mul, Type::Integer, Type::Real, Ok(Type::Real));
    test_binary!(real_div_int, BinaryOp::Div, Type::Real, Type::Integer, Ok(Type::Real));
    test_binary!(
        text_plus_int,
        BinaryOp::Add,
        Type::Text,
        Type::Integer,
        Err(Type::Integer, Violation::NonNumericOperands)
    );
    test_binary!(mixed_comparison, BinaryOp::Less, Type::Integer, Type::Real, Ok(Type::Boolean));
    test_binary!(
        boolean_comparison,
        BinaryOp::GreaterEq,
        Type::Boolean,
        Type::Integer,
        Err(Type::Boolean, Violation::NonNumericOperands)
    );
    test_binary!(text_equality, BinaryOp::Eq, Type::Text, Type::Text, Ok(Type::Boolean));
    test_binary!(
        text_equals_int,
        BinaryOp::Eq,
        Type::Text,
        Type::Integer,
        Err(Type::Boolean, Violation::MismatchedOperands)
    );
    test_binary!(
        equality_does_not_promote,
        BinaryOp::NotEq,
        Type::Integer,
        Type::Real,
        Err(Type::Boolean, Violation::MismatchedOperands)
    );
    test_binary!(logical_and, BinaryOp::And, Type::Boolean, Type::Boolean, Ok(Type::Boolean));
    test_binary!(
        logical_or_on_ints,
        BinaryOp::Or,
        Type::Integer,
        Type::Boolean,
        Err(Type::Boolean, Violation::NonBooleanOperands)
    );

    #[test]
    fn negation_keeps_numeric_type() {
        assert_eq!(UnaryOp::Neg.synthesize([Type::Real]), Ok(Type::Real));
        assert_eq!(UnaryOp::Neg.synthesize([Type::Integer]), Ok(Type::Integer));
        assert_eq!(
            UnaryOp::Neg.synthesize([Type::Text]),
            Err(Mistyped::new(Type::Integer, Violation::NonNumericOperand))
        );
    }
}
