use rust_decimal::Decimal;

use crate::types::{ArithOp, Bindings, CompareOp, EvalError, Expr, Lookup, Value};

/// Evaluate one expression against a set of bindings.
///
/// Missing variables fall back to the `var` default, or [`Value::Null`].
/// Reading a variable whose producer failed is an error, as are non-numeric
/// operands, division by zero and overflow.
pub fn evaluate(expr: &Expr, bindings: &Bindings) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Var { path, default } => match bindings.lookup(path) {
            Lookup::Found(Value::Null) | Lookup::Missing => {
                Ok(default.clone().unwrap_or_default())
            }
            Lookup::Found(v) => Ok(v.clone()),
            Lookup::Unavailable => Err(EvalError::Unavailable { path: path.clone() }),
        },
        Expr::Arith { op, args } => eval_arith(*op, args, bindings).map(Value::Number),
        Expr::Compare { op, lhs, rhs } => {
            let l = evaluate(lhs, bindings)?;
            let r = evaluate(rhs, bindings)?;
            Ok(Value::Bool(l.compare(*op, &r).unwrap_or(false)))
        }
        Expr::And(args) => {
            let mut last = Value::Bool(true);
            for arg in args {
                last = evaluate(arg, bindings)?;
                if !last.is_truthy() {
                    break;
                }
            }
            Ok(last)
        }
        Expr::Or(args) => {
            let mut last = Value::Bool(false);
            for arg in args {
                last = evaluate(arg, bindings)?;
                if last.is_truthy() {
                    break;
                }
            }
            Ok(last)
        }
        Expr::Not(inner) => Ok(Value::Bool(!evaluate(inner, bindings)?.is_truthy())),
        Expr::Truthy(inner) => Ok(Value::Bool(evaluate(inner, bindings)?.is_truthy())),
        Expr::If {
            branches,
            otherwise,
        } => {
            for (cond, then) in branches {
                if evaluate(cond, bindings)?.is_truthy() {
                    return evaluate(then, bindings);
                }
            }
            match otherwise {
                Some(other) => evaluate(other, bindings),
                None => Ok(Value::Null),
            }
        }
        Expr::In { needle, list } => {
            let needle = evaluate(needle, bindings)?;
            for item in list {
                let candidate = evaluate(item, bindings)?;
                if needle.compare(CompareOp::Eq, &candidate) == Some(true) {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Expr::Contains { haystack, needle } => {
            let haystack = evaluate(haystack, bindings)?;
            let needle = evaluate(needle, bindings)?;
            Ok(Value::Bool(match (&haystack, &needle) {
                (Value::String(h), Value::String(n)) => h.contains(n.as_str()),
                _ => false,
            }))
        }
    }
}

fn number(expr: &Expr, bindings: &Bindings) -> Result<Decimal, EvalError> {
    let v = evaluate(expr, bindings)?;
    v.as_number().ok_or_else(|| EvalError::NotNumeric {
        value: v.to_string(),
    })
}

fn eval_arith(op: ArithOp, args: &[Expr], bindings: &Bindings) -> Result<Decimal, EvalError> {
    let overflow = EvalError::Overflow { op };
    match (op, args) {
        (_, []) if matches!(op, ArithOp::Min | ArithOp::Max) => Err(EvalError::NoArguments { op }),
        (ArithOp::Add, _) => args.iter().try_fold(Decimal::ZERO, |acc, arg| {
            acc.checked_add(number(arg, bindings)?)
                .ok_or_else(|| overflow.clone())
        }),
        (ArithOp::Mul, _) => args.iter().try_fold(Decimal::ONE, |acc, arg| {
            acc.checked_mul(number(arg, bindings)?)
                .ok_or_else(|| overflow.clone())
        }),
        (ArithOp::Sub, [only]) => Ok(-number(only, bindings)?),
        (ArithOp::Sub, [a, b]) => number(a, bindings)?
            .checked_sub(number(b, bindings)?)
            .ok_or(overflow),
        (ArithOp::Div, [a, b]) => {
            let (a, b) = (number(a, bindings)?, number(b, bindings)?);
            if b.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_div(b).ok_or(overflow)
        }
        (ArithOp::Mod, [a, b]) => {
            let (a, b) = (number(a, bindings)?, number(b, bindings)?);
            if b.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_rem(b).ok_or(overflow)
        }
        (ArithOp::Min, _) => fold_extreme(op, args, bindings, Decimal::min),
        (ArithOp::Max, _) => fold_extreme(op, args, bindings, Decimal::max),
        // Binary operators built with the wrong operand count: the decoders
        // reject these, so only hand-built trees reach here.
        (ArithOp::Sub | ArithOp::Div | ArithOp::Mod, _) => Err(EvalError::NoArguments { op }),
    }
}

fn fold_extreme(
    op: ArithOp,
    args: &[Expr],
    bindings: &Bindings,
    pick: fn(Decimal, Decimal) -> Decimal,
) -> Result<Decimal, EvalError> {
    let mut best: Option<Decimal> = None;
    for arg in args {
        let n = number(arg, bindings)?;
        best = Some(best.map_or(n, |b| pick(b, n)));
    }
    best.ok_or(EvalError::NoArguments { op })
}

#[cfg(test)]
mod tests {
    use rust_decimal::dec;

    use super::*;
    use crate::types::{if_else, lit, max, min, sum, var, var_or};

    fn eval(expr: &Expr, b: &Bindings) -> Result<Value, EvalError> {
        evaluate(expr, b)
    }

    fn num(d: Decimal) -> Value {
        Value::Number(d)
    }

    #[test]
    fn literal_and_var() {
        let b = Bindings::new().set("camper.age", 12_i64);
        assert_eq!(eval(&lit(3_i64), &b), Ok(num(dec!(3))));
        assert_eq!(eval(&var("camper.age"), &b), Ok(num(dec!(12))));
    }

    #[test]
    fn missing_var_uses_default_or_null() {
        let b = Bindings::new();
        assert_eq!(eval(&var("camper.age"), &b), Ok(Value::Null));
        assert_eq!(eval(&var_or("camper.age", 0_i64), &b), Ok(num(dec!(0))));
    }

    #[test]
    fn null_var_uses_default() {
        let b = Bindings::new().set("camper.age", Value::Null);
        assert_eq!(eval(&var_or("camper.age", 7_i64), &b), Ok(num(dec!(7))));
    }

    #[test]
    fn null_is_zero_in_arithmetic() {
        let b = Bindings::new();
        assert_eq!(eval(&(var("camper.nights") * 40_i64), &b), Ok(num(dec!(0))));
        assert_eq!(eval(&(var("x") + 5_i64), &b), Ok(num(dec!(5))));
    }

    #[test]
    fn unavailable_var_is_an_error() {
        let mut b = Bindings::new();
        b.insert_unavailable("campers.meals");
        assert_eq!(
            eval(&(sum("meals") + 1_i64), &b),
            Err(EvalError::Unavailable {
                path: "campers.meals".into()
            })
        );
    }

    #[test]
    fn arithmetic_operators() {
        let b = Bindings::new().set("a", 10_i64).set("b", "4");
        assert_eq!(eval(&(var("a") + var("b")), &b), Ok(num(dec!(14))));
        assert_eq!(eval(&(var("a") - var("b")), &b), Ok(num(dec!(6))));
        assert_eq!(eval(&(var("a") * var("b")), &b), Ok(num(dec!(40))));
        assert_eq!(eval(&(var("a") / var("b")), &b), Ok(num(dec!(2.5))));
        let rem = Expr::Arith {
            op: ArithOp::Mod,
            args: vec![var("a"), var("b")],
        };
        assert_eq!(eval(&rem, &b), Ok(num(dec!(2))));
        assert_eq!(eval(&-var("a"), &b), Ok(num(dec!(-10))));
    }

    #[test]
    fn decimal_arithmetic_is_exact() {
        let b = Bindings::new();
        let expr = lit(dec!(0.1)) + lit(dec!(0.2));
        assert_eq!(eval(&expr, &b), Ok(num(dec!(0.3))));
    }

    #[test]
    fn unary_plus_casts() {
        let b = Bindings::new().set("s", "3.5");
        let expr = Expr::Arith {
            op: ArithOp::Add,
            args: vec![var("s")],
        };
        assert_eq!(eval(&expr, &b), Ok(num(dec!(3.5))));
    }

    #[test]
    fn min_max() {
        let b = Bindings::new().set("a", 3_i64);
        assert_eq!(
            eval(&min([var("a"), lit(1_i64), lit(2_i64)]), &b),
            Ok(num(dec!(1)))
        );
        assert_eq!(eval(&max([var("a"), lit(1_i64)]), &b), Ok(num(dec!(3))));
        assert_eq!(
            eval(&min(Vec::new()), &b),
            Err(EvalError::NoArguments { op: ArithOp::Min })
        );
    }

    #[test]
    fn division_by_zero() {
        let b = Bindings::new();
        assert_eq!(
            eval(&(lit(1_i64) / 0_i64), &b),
            Err(EvalError::DivisionByZero)
        );
        // a missing divisor is null, which is zero
        assert_eq!(
            eval(&(lit(1_i64) / var("missing")), &b),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn non_numeric_operand() {
        let b = Bindings::new().set("name", "Ada");
        assert_eq!(
            eval(&(var("name") + 1_i64), &b),
            Err(EvalError::NotNumeric {
                value: "\"Ada\"".into()
            })
        );
    }

    #[test]
    fn overflow_is_reported() {
        let b = Bindings::new();
        let expr = lit(Decimal::MAX) * 2_i64;
        assert_eq!(
            eval(&expr, &b),
            Err(EvalError::Overflow { op: ArithOp::Mul })
        );
    }

    #[test]
    fn comparisons() {
        let b = Bindings::new().set("age", 12_i64).set("code", "12");
        assert_eq!(eval(&var("age").lt(13_i64), &b), Ok(Value::Bool(true)));
        assert_eq!(eval(&var("age").equals(var("code")), &b), Ok(Value::Bool(true)));
        let strict = var("age").compare(CompareOp::StrictEq, var("code"));
        assert_eq!(eval(&strict, &b), Ok(Value::Bool(false)));
        // incomparable ordering is false
        assert_eq!(eval(&var("age").lt("abc"), &b), Ok(Value::Bool(false)));
    }

    #[test]
    fn and_or_return_operands() {
        let b = Bindings::new().set("a", 0_i64).set("b", "x");
        assert_eq!(eval(&var("a").and(var("b")), &b), Ok(num(dec!(0))));
        assert_eq!(eval(&var("b").and(lit(5_i64)), &b), Ok(num(dec!(5))));
        assert_eq!(eval(&var("a").or(var("b")), &b), Ok(Value::from("x")));
        assert_eq!(eval(&var("a").or(lit(false)), &b), Ok(Value::Bool(false)));
    }

    #[test]
    fn and_short_circuits_errors() {
        let b = Bindings::new();
        let expr = lit(false).and(lit(1_i64) / 0_i64);
        assert_eq!(eval(&expr, &b), Ok(Value::Bool(false)));
    }

    #[test]
    fn not_and_truthy() {
        let b = Bindings::new().set("s", "");
        assert_eq!(eval(&!var("s"), &b), Ok(Value::Bool(true)));
        assert_eq!(
            eval(&Expr::Truthy(Box::new(lit("0"))), &b),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn conditional_chain() {
        let expr = Expr::If {
            branches: vec![
                (var("age").lt(6_i64), lit(0_i64)),
                (var("age").lt(12_i64), lit(300_i64)),
            ],
            otherwise: None,
        };
        let young = Bindings::new().set("age", 4_i64);
        let child = Bindings::new().set("age", 8_i64);
        let adult = Bindings::new().set("age", 30_i64);
        assert_eq!(eval(&expr, &young), Ok(num(dec!(0))));
        assert_eq!(eval(&expr, &child), Ok(num(dec!(300))));
        assert_eq!(eval(&expr, &adult), Ok(Value::Null));
    }

    #[test]
    fn conditional_only_evaluates_taken_branch() {
        let b = Bindings::new();
        let expr = if_else(lit(true), lit(1_i64), lit(1_i64) / 0_i64);
        assert_eq!(eval(&expr, &b), Ok(num(dec!(1))));
    }

    #[test]
    fn membership_and_substring() {
        let b = Bindings::new()
            .set("state", "CA")
            .set("notes", "plays fiddle");
        assert_eq!(
            eval(&var("state").is_in(["CA", "OR"]), &b),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            eval(&var("state").is_in(["WA"]), &b),
            Ok(Value::Bool(false))
        );
        let contains = Expr::Contains {
            haystack: Box::new(var("notes")),
            needle: Box::new(lit("fiddle")),
        };
        assert_eq!(eval(&contains, &b), Ok(Value::Bool(true)));
        let on_number = Expr::Contains {
            haystack: Box::new(lit(12_i64)),
            needle: Box::new(lit("1")),
        };
        assert_eq!(eval(&on_number, &b), Ok(Value::Bool(false)));
    }
}
