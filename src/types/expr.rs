use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Not, Sub};

use rust_decimal::Decimal;

use super::Value;

/// Comparison operators supported in pricing expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Loose equality: numbers and numeric strings compare by value.
    Eq,
    Neq,
    /// Strict equality: same kind and same value.
    StrictEq,
    StrictNeq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Arithmetic operators. `Add`, `Mul`, `Min` and `Max` are n-ary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
}

/// Pricing expression tree. Built by the JSON decoder, the DSL parser or the
/// helper functions in this module; immutable once part of a
/// [`RuleSet`](crate::RuleSet).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Dot-path lookup. `default` replaces a missing value.
    Var {
        path: String,
        default: Option<Value>,
    },
    Arith {
        op: ArithOp,
        args: Vec<Expr>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// Cast to boolean.
    Truthy(Box<Expr>),
    If {
        branches: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    /// Membership in a list of candidates (loose equality).
    In {
        needle: Box<Expr>,
        list: Vec<Expr>,
    },
    /// Substring test. `false` unless both sides are strings.
    Contains {
        haystack: Box<Expr>,
        needle: Box<Expr>,
    },
}

/// Root under which registration-scope rules see per-camper aggregates.
pub(crate) const AGGREGATE_ROOT: &str = "campers";

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::StrictEq => write!(f, "==="),
            CompareOp::StrictNeq => write!(f, "!=="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "+"),
            ArithOp::Sub => write!(f, "-"),
            ArithOp::Mul => write!(f, "*"),
            ArithOp::Div => write!(f, "/"),
            ArithOp::Mod => write!(f, "%"),
            ArithOp::Min => write!(f, "min"),
            ArithOp::Max => write!(f, "max"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Var {
                path,
                default: None,
            } => write!(f, "{path}"),
            Expr::Var {
                path,
                default: Some(d),
            } => write!(f, "({path} ?? {d})"),
            Expr::Arith {
                op: op @ (ArithOp::Min | ArithOp::Max),
                args,
            } => {
                write!(f, "{op}(")?;
                write_joined(f, args, ", ")?;
                write!(f, ")")
            }
            Expr::Arith { op, args } if args.len() == 1 => write!(f, "({op}{})", args[0]),
            Expr::Arith { op, args } => {
                write!(f, "(")?;
                write_joined(f, args, &format!(" {op} "))?;
                write!(f, ")")
            }
            Expr::Compare { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Expr::And(args) => {
                write!(f, "(")?;
                write_joined(f, args, " AND ")?;
                write!(f, ")")
            }
            Expr::Or(args) => {
                write!(f, "(")?;
                write_joined(f, args, " OR ")?;
                write!(f, ")")
            }
            Expr::Not(inner) => write!(f, "(NOT {inner})"),
            Expr::Truthy(inner) => write!(f, "bool({inner})"),
            Expr::If {
                branches,
                otherwise,
            } => {
                for (i, (cond, then)) in branches.iter().enumerate() {
                    let kw = if i == 0 { "(if" } else { " elif" };
                    write!(f, "{kw} {cond} then {then}")?;
                }
                if let Some(other) = otherwise {
                    write!(f, " else {other}")?;
                }
                write!(f, ")")
            }
            Expr::In { needle, list } => {
                write!(f, "({needle} in [")?;
                write_joined(f, list, ", ")?;
                write!(f, "])")
            }
            Expr::Contains { haystack, needle } => write!(f, "({needle} in {haystack})"),
        }
    }
}

impl Expr {
    #[must_use]
    pub fn and(self, other: impl Into<Expr>) -> Expr {
        match self {
            Expr::And(mut args) => {
                args.push(other.into());
                Expr::And(args)
            }
            first => Expr::And(vec![first, other.into()]),
        }
    }

    #[must_use]
    pub fn or(self, other: impl Into<Expr>) -> Expr {
        match self {
            Expr::Or(mut args) => {
                args.push(other.into());
                Expr::Or(args)
            }
            first => Expr::Or(vec![first, other.into()]),
        }
    }

    #[must_use]
    pub fn equals(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Eq, other)
    }

    #[must_use]
    pub fn not_equals(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Neq, other)
    }

    #[must_use]
    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Gt, other)
    }

    #[must_use]
    pub fn gte(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Gte, other)
    }

    #[must_use]
    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Lt, other)
    }

    #[must_use]
    pub fn lte(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Lte, other)
    }

    #[must_use]
    pub fn compare(self, op: CompareOp, other: impl Into<Expr>) -> Expr {
        Expr::Compare {
            op,
            lhs: Box::new(self),
            rhs: Box::new(other.into()),
        }
    }

    /// Membership test against a list of candidates.
    #[must_use]
    pub fn is_in<I, E>(self, candidates: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Expr::In {
            needle: Box::new(self),
            list: candidates.into_iter().map(Into::into).collect(),
        }
    }

    fn arith(op: ArithOp, lhs: Expr, rhs: Expr) -> Expr {
        let flattens = matches!(op, ArithOp::Add | ArithOp::Mul);
        match lhs {
            Expr::Arith { op: inner, mut args } if flattens && inner == op => {
                args.push(rhs);
                Expr::Arith { op, args }
            }
            lhs => Expr::Arith {
                op,
                args: vec![lhs, rhs],
            },
        }
    }

    /// Visit every variable path referenced by this expression.
    pub fn for_each_var<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Literal(_) => {}
            Expr::Var { path, .. } => f(path),
            Expr::Arith { args, .. } | Expr::And(args) | Expr::Or(args) => {
                for arg in args {
                    arg.for_each_var(f);
                }
            }
            Expr::Compare { lhs, rhs, .. } => {
                lhs.for_each_var(f);
                rhs.for_each_var(f);
            }
            Expr::Not(inner) | Expr::Truthy(inner) => inner.for_each_var(f),
            Expr::If {
                branches,
                otherwise,
            } => {
                for (cond, then) in branches {
                    cond.for_each_var(f);
                    then.for_each_var(f);
                }
                if let Some(other) = otherwise {
                    other.for_each_var(f);
                }
            }
            Expr::In { needle, list } => {
                needle.for_each_var(f);
                for item in list {
                    item.for_each_var(f);
                }
            }
            Expr::Contains { haystack, needle } => {
                haystack.for_each_var(f);
                needle.for_each_var(f);
            }
        }
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Arith {
            op: ArithOp::Sub,
            args: vec![self],
        }
    }
}

impl<T: Into<Expr>> Add<T> for Expr {
    type Output = Expr;

    fn add(self, rhs: T) -> Expr {
        Expr::arith(ArithOp::Add, self, rhs.into())
    }
}

impl<T: Into<Expr>> Sub<T> for Expr {
    type Output = Expr;

    fn sub(self, rhs: T) -> Expr {
        Expr::arith(ArithOp::Sub, self, rhs.into())
    }
}

impl<T: Into<Expr>> Mul<T> for Expr {
    type Output = Expr;

    fn mul(self, rhs: T) -> Expr {
        Expr::arith(ArithOp::Mul, self, rhs.into())
    }
}

impl<T: Into<Expr>> Div<T> for Expr {
    type Output = Expr;

    fn div(self, rhs: T) -> Expr {
        Expr::arith(ArithOp::Div, self, rhs.into())
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::Literal(v.into())
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::Literal(v.into())
    }
}

impl From<Decimal> for Expr {
    fn from(v: Decimal) -> Self {
        Expr::Literal(v.into())
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        Expr::Literal(v.into())
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        Expr::Literal(v.into())
    }
}

/// Reference a field by dot path, e.g. `var("camper.age")`.
#[must_use]
pub fn var(path: &str) -> Expr {
    Expr::Var {
        path: path.to_owned(),
        default: None,
    }
}

/// Reference a field, falling back to `default` when it is missing.
#[must_use]
pub fn var_or(path: &str, default: impl Into<Value>) -> Expr {
    Expr::Var {
        path: path.to_owned(),
        default: Some(default.into()),
    }
}

#[must_use]
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// Sum of a camper rule over all campers. Only meaningful in registration
/// scope.
#[must_use]
pub fn sum(camper_rule: &str) -> Expr {
    var(&format!("{AGGREGATE_ROOT}.{camper_rule}"))
}

/// Two-way conditional.
#[must_use]
pub fn if_else(cond: Expr, then: impl Into<Expr>, otherwise: impl Into<Expr>) -> Expr {
    Expr::If {
        branches: vec![(cond, then.into())],
        otherwise: Some(Box::new(otherwise.into())),
    }
}

#[must_use]
pub fn min<I: IntoIterator<Item = Expr>>(args: I) -> Expr {
    Expr::Arith {
        op: ArithOp::Min,
        args: args.into_iter().collect(),
    }
}

#[must_use]
pub fn max<I: IntoIterator<Item = Expr>>(args: I) -> Expr {
    Expr::Arith {
        op: ArithOp::Max,
        args: args.into_iter().collect(),
    }
}
