//! Expression evaluator.
//!
//! Evaluates constant expressions against session state. Used by `DO`,
//! which evaluates for side effects and discards the results.

use quarry_common::error::QuarryError;
use thiserror::Error;

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::context::SessionVars;
use crate::value::Datum;

/// Errors raised while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Operand has the wrong type for the operator.
    #[error("type mismatch: cannot apply {op} to {kind}")]
    TypeMismatch {
        /// Operator or function name.
        op: &'static str,
        /// Kind of the offending value.
        kind: &'static str,
    },
    /// Integer arithmetic overflowed.
    #[error("BIGINT value is out of range in {0}")]
    Overflow(&'static str),
    /// Unknown function.
    #[error("FUNCTION {0} does not exist")]
    UnknownFunction(String),
    /// Unknown system variable.
    #[error("Unknown system variable '{0}'")]
    UnknownVariable(String),
    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<EvalError> for QuarryError {
    fn from(err: EvalError) -> Self {
        QuarryError::eval(err.to_string())
    }
}

/// Numeric view of an operand.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn to_num(value: &Datum, op: &'static str) -> Result<Num, EvalError> {
    match value {
        Datum::Int(i) => Ok(Num::Int(*i)),
        Datum::Double(f) => Ok(Num::Float(*f)),
        Datum::Boolean(b) => Ok(Num::Int(i64::from(*b))),
        Datum::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Ok(Num::Int(i))
            } else if let Ok(f) = s.parse::<f64>() {
                Ok(Num::Float(f))
            } else {
                Err(EvalError::TypeMismatch {
                    op,
                    kind: value.kind_name(),
                })
            }
        }
        other => Err(EvalError::TypeMismatch {
            op,
            kind: other.kind_name(),
        }),
    }
}

/// Evaluates an expression.
pub fn evaluate(expr: &Expr, vars: &SessionVars) -> Result<Datum, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::SystemVariable(name) => vars
            .system_var(name)
            .map(Datum::string)
            .ok_or_else(|| EvalError::UnknownVariable(name.clone())),

        Expr::Unary { op, expr } => {
            let val = evaluate(expr, vars)?;
            evaluate_unary_op(*op, &val)
        }

        Expr::Binary { left, op, right } => {
            let left_val = evaluate(left, vars)?;
            let right_val = evaluate(right, vars)?;
            evaluate_binary_op(*op, &left_val, &right_val)
        }

        Expr::Function { name, args } => {
            let arg_vals: Result<Vec<_>, _> = args.iter().map(|a| evaluate(a, vars)).collect();
            evaluate_scalar_function(name, &arg_vals?)
        }
    }
}

fn evaluate_binary_op(op: BinaryOperator, left: &Datum, right: &Datum) -> Result<Datum, EvalError> {
    match op {
        // Three-valued logic
        BinaryOperator::And => {
            return Ok(match (left.to_bool(), right.to_bool()) {
                (Some(false), _) | (_, Some(false)) => Datum::Boolean(false),
                (Some(true), Some(true)) => Datum::Boolean(true),
                _ => Datum::Null,
            });
        }
        BinaryOperator::Or => {
            return Ok(match (left.to_bool(), right.to_bool()) {
                (Some(true), _) | (_, Some(true)) => Datum::Boolean(true),
                (Some(false), Some(false)) => Datum::Boolean(false),
                _ => Datum::Null,
            });
        }
        _ => {}
    }

    if left.is_null() || right.is_null() {
        return Ok(Datum::Null);
    }

    match op {
        BinaryOperator::Eq => Ok(Datum::Boolean(left == right)),
        BinaryOperator::NotEq => Ok(Datum::Boolean(left != right)),
        BinaryOperator::Lt => Ok(Datum::Boolean(left < right)),
        BinaryOperator::LtEq => Ok(Datum::Boolean(left <= right)),
        BinaryOperator::Gt => Ok(Datum::Boolean(left > right)),
        BinaryOperator::GtEq => Ok(Datum::Boolean(left >= right)),

        BinaryOperator::Plus => {
            evaluate_arithmetic(left, right, "+", i64::checked_add, |a, b| a + b)
        }
        BinaryOperator::Minus => {
            evaluate_arithmetic(left, right, "-", i64::checked_sub, |a, b| a - b)
        }
        BinaryOperator::Multiply => {
            evaluate_arithmetic(left, right, "*", i64::checked_mul, |a, b| a * b)
        }
        BinaryOperator::Divide => {
            let l = to_num(left, "/")?.as_f64();
            let r = to_num(right, "/")?.as_f64();
            // Division by zero yields NULL
            if r == 0.0 {
                return Ok(Datum::Null);
            }
            Ok(Datum::Double(l / r))
        }
        BinaryOperator::Modulo => match (to_num(left, "%")?, to_num(right, "%")?) {
            (_, Num::Int(0)) => Ok(Datum::Null),
            (Num::Int(l), Num::Int(r)) => Ok(Datum::Int(l.wrapping_rem(r))),
            (l, r) => {
                let r = r.as_f64();
                if r == 0.0 {
                    return Ok(Datum::Null);
                }
                Ok(Datum::Double(l.as_f64() % r))
            }
        },

        BinaryOperator::And | BinaryOperator::Or => Ok(Datum::Null),
    }
}

/// Evaluates arithmetic, staying in integers unless either side is fractional.
fn evaluate_arithmetic<F, G>(
    left: &Datum,
    right: &Datum,
    op: &'static str,
    int_op: F,
    float_op: G,
) -> Result<Datum, EvalError>
where
    F: Fn(i64, i64) -> Option<i64>,
    G: Fn(f64, f64) -> f64,
{
    match (to_num(left, op)?, to_num(right, op)?) {
        (Num::Int(l), Num::Int(r)) => int_op(l, r)
            .map(Datum::Int)
            .ok_or(EvalError::Overflow(op)),
        (l, r) => Ok(Datum::Double(float_op(l.as_f64(), r.as_f64()))),
    }
}

fn evaluate_unary_op(op: UnaryOperator, val: &Datum) -> Result<Datum, EvalError> {
    if val.is_null() {
        return Ok(Datum::Null);
    }

    match op {
        UnaryOperator::Not => Ok(Datum::Boolean(!val.is_truthy())),
        UnaryOperator::Minus => match to_num(val, "-")? {
            Num::Int(i) => i
                .checked_neg()
                .map(Datum::Int)
                .ok_or(EvalError::Overflow("-")),
            Num::Float(f) => Ok(Datum::Double(-f)),
        },
    }
}

fn expect_args(name: &str, args: &[Datum], count: usize) -> Result<(), EvalError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(EvalError::InvalidArgument(format!(
            "incorrect parameter count in the call to native function '{}'",
            name
        )))
    }
}

fn evaluate_scalar_function(name: &str, args: &[Datum]) -> Result<Datum, EvalError> {
    let lowered = name.to_lowercase();
    match lowered.as_str() {
        "upper" | "lower" => {
            expect_args(name, args, 1)?;
            Ok(match args[0].to_string_value() {
                None => Datum::Null,
                Some(s) if lowered == "upper" => Datum::String(s.to_uppercase()),
                Some(s) => Datum::String(s.to_lowercase()),
            })
        }
        "length" => {
            expect_args(name, args, 1)?;
            Ok(match &args[0] {
                Datum::Null => Datum::Null,
                Datum::Bytes(b) => Datum::Int(b.len() as i64),
                other => Datum::Int(other.to_string_value().map_or(0, |s| s.len()) as i64),
            })
        }
        "concat" => {
            if args.is_empty() {
                return expect_args(name, args, 1).map(|_| Datum::Null);
            }
            // Any NULL argument makes the result NULL
            let mut result = String::new();
            for arg in args {
                match arg.to_string_value() {
                    Some(s) => result.push_str(&s),
                    None => return Ok(Datum::Null),
                }
            }
            Ok(Datum::String(result))
        }
        "abs" => {
            expect_args(name, args, 1)?;
            if args[0].is_null() {
                return Ok(Datum::Null);
            }
            match to_num(&args[0], "ABS")? {
                Num::Int(i) => i
                    .checked_abs()
                    .map(Datum::Int)
                    .ok_or(EvalError::Overflow("ABS")),
                Num::Float(f) => Ok(Datum::Double(f.abs())),
            }
        }
        "coalesce" => {
            if args.is_empty() {
                return expect_args(name, args, 1).map(|_| Datum::Null);
            }
            Ok(args
                .iter()
                .find(|arg| !arg.is_null())
                .cloned()
                .unwrap_or(Datum::Null))
        }
        "ifnull" => {
            expect_args(name, args, 2)?;
            Ok(if args[0].is_null() {
                args[1].clone()
            } else {
                args[0].clone()
            })
        }
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_common::types::ConnectionId;

    fn vars() -> SessionVars {
        let mut vars = SessionVars::new(ConnectionId::new(1));
        vars.set_system_var("character_set_database", "utf8");
        vars
    }

    fn eval(expr: Expr) -> Result<Datum, EvalError> {
        evaluate(&expr, &vars())
    }

    #[test]
    fn test_evaluate_literal() {
        assert_eq!(eval(Expr::lit(42)).unwrap(), Datum::Int(42));
    }

    #[test]
    fn test_evaluate_arithmetic() {
        let expr = Expr::binary(Expr::lit(1), BinaryOperator::Plus, Expr::lit(2));
        assert_eq!(eval(expr).unwrap(), Datum::Int(3));

        let expr = Expr::binary(Expr::lit(7), BinaryOperator::Divide, Expr::lit(2));
        assert_eq!(eval(expr).unwrap(), Datum::Double(3.5));

        let expr = Expr::binary(Expr::lit(7), BinaryOperator::Modulo, Expr::lit(0));
        assert_eq!(eval(expr).unwrap(), Datum::Null);

        let expr = Expr::binary(Expr::lit("3"), BinaryOperator::Multiply, Expr::lit(1.5));
        assert_eq!(eval(expr).unwrap(), Datum::Double(4.5));
    }

    #[test]
    fn test_division_by_zero_is_null() {
        let expr = Expr::binary(Expr::lit(1), BinaryOperator::Divide, Expr::lit(0));
        assert_eq!(eval(expr).unwrap(), Datum::Null);
    }

    #[test]
    fn test_overflow() {
        let expr = Expr::binary(Expr::lit(i64::MAX), BinaryOperator::Plus, Expr::lit(1));
        assert_eq!(eval(expr), Err(EvalError::Overflow("+")));
    }

    #[test]
    fn test_null_propagation() {
        let expr = Expr::binary(Expr::lit(Datum::Null), BinaryOperator::Plus, Expr::lit(1));
        assert_eq!(eval(expr).unwrap(), Datum::Null);

        let expr = Expr::binary(Expr::lit(Datum::Null), BinaryOperator::Lt, Expr::lit(1));
        assert_eq!(eval(expr).unwrap(), Datum::Null);
    }

    #[test]
    fn test_three_valued_logic() {
        let null = || Expr::lit(Datum::Null);
        let expr = Expr::binary(null(), BinaryOperator::And, Expr::lit(false));
        assert_eq!(eval(expr).unwrap(), Datum::Boolean(false));

        let expr = Expr::binary(null(), BinaryOperator::Or, Expr::lit(true));
        assert_eq!(eval(expr).unwrap(), Datum::Boolean(true));

        let expr = Expr::binary(null(), BinaryOperator::And, Expr::lit(true));
        assert_eq!(eval(expr).unwrap(), Datum::Null);
    }

    #[test]
    fn test_type_mismatch() {
        let expr = Expr::binary(Expr::lit("abc"), BinaryOperator::Minus, Expr::lit(1));
        assert!(matches!(eval(expr), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn test_unary() {
        let expr = Expr::Unary {
            op: UnaryOperator::Minus,
            expr: Box::new(Expr::lit(5)),
        };
        assert_eq!(eval(expr).unwrap(), Datum::Int(-5));

        let expr = Expr::Unary {
            op: UnaryOperator::Not,
            expr: Box::new(Expr::lit(0)),
        };
        assert_eq!(eval(expr).unwrap(), Datum::Boolean(true));
    }

    #[test]
    fn test_scalar_functions() {
        let expr = Expr::call("UPPER", vec![Expr::lit("abc")]);
        assert_eq!(eval(expr).unwrap(), Datum::string("ABC"));

        let expr = Expr::call("concat", vec![Expr::lit("a"), Expr::lit(1)]);
        assert_eq!(eval(expr).unwrap(), Datum::string("a1"));

        let expr = Expr::call("concat", vec![Expr::lit("a"), Expr::lit(Datum::Null)]);
        assert_eq!(eval(expr).unwrap(), Datum::Null);

        let expr = Expr::call("length", vec![Expr::lit("héllo")]);
        assert_eq!(eval(expr).unwrap(), Datum::Int(6));

        let expr = Expr::call("abs", vec![Expr::lit(-3)]);
        assert_eq!(eval(expr).unwrap(), Datum::Int(3));

        let expr = Expr::call(
            "coalesce",
            vec![Expr::lit(Datum::Null), Expr::lit(2), Expr::lit(3)],
        );
        assert_eq!(eval(expr).unwrap(), Datum::Int(2));

        let expr = Expr::call("ifnull", vec![Expr::lit(Datum::Null), Expr::lit("x")]);
        assert_eq!(eval(expr).unwrap(), Datum::string("x"));

        let expr = Expr::call("ifnull", vec![Expr::lit(1)]);
        assert!(matches!(eval(expr), Err(EvalError::InvalidArgument(_))));

        let expr = Expr::call("sleep", vec![Expr::lit(1)]);
        assert_eq!(
            eval(expr),
            Err(EvalError::UnknownFunction("sleep".to_string()))
        );
    }

    #[test]
    fn test_system_variables() {
        let expr = Expr::SystemVariable("CHARACTER_SET_DATABASE".to_string());
        assert_eq!(eval(expr).unwrap(), Datum::string("utf8"));

        let expr = Expr::SystemVariable("no_such_var".to_string());
        assert!(matches!(eval(expr), Err(EvalError::UnknownVariable(_))));
    }

    #[test]
    fn test_error_conversion() {
        let err: QuarryError = EvalError::UnknownFunction("f".into()).into();
        assert_eq!(err.to_string(), "evaluation error: FUNCTION f does not exist");
    }
}
