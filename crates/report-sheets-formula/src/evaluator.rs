//! Residual expression evaluator

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};

/// Value of an evaluated expression or function argument
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    List(Vec<f64>),
}

impl Value {
    /// The value as one number: a number, or a list of exactly one element
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::List(items) if items.len() == 1 => Some(items[0]),
            Value::List(_) => None,
        }
    }
}

/// Evaluate an expression
///
/// Lists of one element behave as numbers inside arithmetic; longer lists
/// are only valid as the whole expression or as list items.
pub fn evaluate(expr: &FormulaExpr) -> FormulaResult<Value> {
    match expr {
        FormulaExpr::Number(n) => Ok(Value::Number(*n)),

        FormulaExpr::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(scalar(evaluate(item)?, "a list item")?);
            }
            Ok(Value::List(values))
        }

        FormulaExpr::UnaryOp { op, operand } => {
            let value = scalar(evaluate(operand)?, "a unary operand")?;
            Ok(Value::Number(match op {
                UnaryOperator::Negate => -value,
                UnaryOperator::Plus => value,
            }))
        }

        FormulaExpr::BinaryOp { op, left, right } => {
            let context = match op {
                BinaryOperator::Add => "an addition",
                BinaryOperator::Subtract => "a subtraction",
                BinaryOperator::Multiply => "a multiplication",
                BinaryOperator::Divide => "a division",
            };
            let l = scalar(evaluate(left)?, context)?;
            let r = scalar(evaluate(right)?, context)?;
            evaluate_binary(*op, l, r).map(Value::Number)
        }
    }
}

fn scalar(value: Value, context: &str) -> FormulaResult<f64> {
    match value.as_scalar() {
        Some(n) => Ok(n),
        None => {
            let len = match &value {
                Value::List(items) => items.len(),
                Value::Number(_) => 1,
            };
            Err(FormulaError::Arithmetic(format!(
                "Type mismatch: a list of {} values cannot be used in {}",
                len, context
            )))
        }
    }
}

fn evaluate_binary(op: BinaryOperator, left: f64, right: f64) -> FormulaResult<f64> {
    match op {
        BinaryOperator::Add => Ok(left + right),
        BinaryOperator::Subtract => Ok(left - right),
        BinaryOperator::Multiply => Ok(left * right),
        BinaryOperator::Divide => {
            if right == 0.0 {
                Err(FormulaError::Arithmetic("Division by zero".into()))
            } else {
                Ok(left / right)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn eval(input: &str) -> FormulaResult<Value> {
        evaluate(&parse_expression(input)?)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("2+2").unwrap(), Value::Number(4.0));
        assert_eq!(eval("2+3*4").unwrap(), Value::Number(14.0));
        assert_eq!(eval("(2+3)*4").unwrap(), Value::Number(20.0));
        assert_eq!(eval("12/4/3").unwrap(), Value::Number(1.0));
        assert_eq!(eval("-3 - -3").unwrap(), Value::Number(0.0));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            eval("5/0"),
            Err(FormulaError::Arithmetic("Division by zero".into()))
        );
        assert!(eval("1/(2-2)").is_err());
    }

    #[test]
    fn test_lists() {
        assert_eq!(eval("[1, 2+3]").unwrap(), Value::List(vec![1.0, 5.0]));
        // A one-element list is a number inside arithmetic
        assert_eq!(eval("[7] * 2").unwrap(), Value::Number(14.0));
        assert!(matches!(
            eval("[1, 2] * 2"),
            Err(FormulaError::Arithmetic(msg)) if msg.starts_with("Type mismatch")
        ));
        assert!(eval("[[1, 2]]").is_err());
    }
}
