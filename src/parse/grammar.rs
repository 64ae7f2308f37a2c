use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value as Json;
use winnow::ascii::till_line_ending;
use winnow::combinator::{
    alt, cut_err, delimited, not, opt, preceded, repeat, separated, terminated,
};
use winnow::error::{ContextError, ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use crate::json::encode_value;
use crate::types::{ArithOp, CompareOp, Expr, Rule, Scope, Value, sum, var};

use super::parser::ParsedRuleSet;

/// Words that cannot be used as a variable path.
const RESERVED: [&str; 11] = [
    "and", "or", "not", "in", "if", "then", "elif", "else", "true", "false", "null",
];

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A literal word not followed by an identifier character.
fn keyword<'i>(word: &'static str) -> impl Parser<&'i str, &'i str, ErrMode<ContextError>> {
    terminated(word, not(one_of(is_ident_char)))
}

fn expected(what: &'static str) -> StrContext {
    StrContext::Expected(StrContextValue::Description(what))
}

// -- Identifiers ------------------------------------------------------------

/// Rule names and constant keys.
fn name<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., is_ident_char),
    )
        .take()
        .parse_next(input)
}

/// Dotted variable path such as `camper.sessions.0`.
fn path<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    let path = (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| is_ident_char(c) || c == '.'),
    )
        .take()
        .parse_next(input)?;
    if RESERVED.contains(&path.to_ascii_lowercase().as_str()) {
        return Err(ErrMode::from_input(input));
    }
    Ok(path)
}

// -- Values -----------------------------------------------------------------

fn string_literal(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        match any.parse_next(input)? {
            '"' => return Ok(s),
            '\\' => match any.parse_next(input)? {
                '"' => s.push('"'),
                '\\' => s.push('\\'),
                'n' => s.push('\n'),
                't' => s.push('\t'),
                other => {
                    s.push('\\');
                    s.push(other);
                }
            },
            c => s.push(c),
        }
    }
}

fn number(input: &mut &str) -> ModalResult<Decimal> {
    (
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt(('.', take_while(1.., |c: char| c.is_ascii_digit()))),
    )
        .take()
        .try_map(Decimal::from_str)
        .parse_next(input)
}

fn literal(input: &mut &str) -> ModalResult<Value> {
    alt((
        string_literal.map(Value::String),
        keyword("true").value(Value::Bool(true)),
        keyword("false").value(Value::Bool(false)),
        keyword("null").value(Value::Null),
        number.map(Value::Number),
    ))
    .parse_next(input)
}

/// A literal, allowing a leading minus on numbers.
fn signed_literal(input: &mut &str) -> ModalResult<Value> {
    ws.parse_next(input)?;
    if opt('-').parse_next(input)?.is_some() {
        ws.parse_next(input)?;
        let n = cut_err(number).parse_next(input)?;
        return Ok(Value::Number(-n));
    }
    literal
        .context(expected("literal value"))
        .parse_next(input)
}

// -- Operators --------------------------------------------------------------

fn compare_op(input: &mut &str) -> ModalResult<CompareOp> {
    alt((
        "===".value(CompareOp::StrictEq),
        "!==".value(CompareOp::StrictNeq),
        "==".value(CompareOp::Eq),
        "!=".value(CompareOp::Neq),
        ">=".value(CompareOp::Gte),
        ">".value(CompareOp::Gt),
        "<=".value(CompareOp::Lte),
        "<".value(CompareOp::Lt),
    ))
    .parse_next(input)
}

// -- Expressions ------------------------------------------------------------
// precedence: or < and < not < comparison/in < + - < * / % < unary < postfix

fn primary(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    alt((
        delimited('(', expr, (ws, cut_err(')'))),
        if_expr,
        call,
        literal.map(Expr::Literal),
        path.map(var),
    ))
    .context(expected("expression"))
    .parse_next(input)
}

fn if_expr(input: &mut &str) -> ModalResult<Expr> {
    keyword("if").parse_next(input)?;
    let mut branches = vec![branch(input)?];
    let elifs: Vec<(Expr, Expr)> =
        repeat(0.., preceded((ws, keyword("elif")), cut_err(branch))).parse_next(input)?;
    branches.extend(elifs);
    let otherwise = opt(preceded((ws, keyword("else")), cut_err(expr))).parse_next(input)?;
    Ok(Expr::If {
        branches,
        otherwise: otherwise.map(Box::new),
    })
}

fn branch(input: &mut &str) -> ModalResult<(Expr, Expr)> {
    let cond = cut_err(expr).parse_next(input)?;
    ws.parse_next(input)?;
    cut_err(keyword("then"))
        .context(expected("then"))
        .parse_next(input)?;
    let then = cut_err(expr).parse_next(input)?;
    Ok((cond, then))
}

fn call(input: &mut &str) -> ModalResult<Expr> {
    let func = terminated(
        alt((
            keyword("min"),
            keyword("max"),
            keyword("sum"),
            keyword("bool"),
        )),
        (ws, '('),
    )
    .parse_next(input)?;
    let mut close = (ws, cut_err(')'));
    match func {
        "sum" => {
            let rule = cut_err(preceded(ws, name))
                .context(expected("camper rule name"))
                .parse_next(input)?;
            close.parse_next(input)?;
            Ok(sum(rule))
        }
        "bool" => {
            let inner = cut_err(expr).parse_next(input)?;
            close.parse_next(input)?;
            Ok(Expr::Truthy(Box::new(inner)))
        }
        _ => {
            let args: Vec<Expr> = cut_err(separated(1.., expr, (ws, ','))).parse_next(input)?;
            close.parse_next(input)?;
            let op = if func == "min" { ArithOp::Min } else { ArithOp::Max };
            Ok(Expr::Arith { op, args })
        }
    }
}

/// `path ?? default`
fn postfix(input: &mut &str) -> ModalResult<Expr> {
    let expr = primary(input)?;
    if opt((ws, "??")).parse_next(input)?.is_none() {
        return Ok(expr);
    }
    let default = cut_err(signed_literal).parse_next(input)?;
    match expr {
        Expr::Var {
            path,
            default: None,
        } => Ok(Expr::Var {
            path,
            default: Some(default),
        }),
        _ => Err(ErrMode::from_input(input).cut()),
    }
}

fn unary(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    match opt(one_of(['-', '+'])).parse_next(input)? {
        Some('-') => Ok(match cut_err(unary).parse_next(input)? {
            Expr::Literal(Value::Number(n)) => Expr::Literal(Value::Number(-n)),
            other => -other,
        }),
        Some(_) => {
            let inner = cut_err(unary).parse_next(input)?;
            Ok(Expr::Arith {
                op: ArithOp::Add,
                args: vec![inner],
            })
        }
        None => postfix(input),
    }
}

fn term(input: &mut &str) -> ModalResult<Expr> {
    let first = unary(input)?;
    let rest: Vec<(char, Expr)> = repeat(
        0..,
        (preceded(ws, one_of(['*', '/', '%'])), cut_err(unary)),
    )
    .parse_next(input)?;
    Ok(rest.into_iter().fold(first, |acc, (op, rhs)| match op {
        '*' => acc * rhs,
        '/' => acc / rhs,
        _ => Expr::Arith {
            op: ArithOp::Mod,
            args: vec![acc, rhs],
        },
    }))
}

fn additive(input: &mut &str) -> ModalResult<Expr> {
    let first = term(input)?;
    let rest: Vec<(char, Expr)> =
        repeat(0.., (preceded(ws, one_of(['+', '-'])), cut_err(term))).parse_next(input)?;
    Ok(rest.into_iter().fold(first, |acc, (op, rhs)| {
        if op == '+' { acc + rhs } else { acc - rhs }
    }))
}

fn comparison(input: &mut &str) -> ModalResult<Expr> {
    let lhs = additive(input)?;
    if let Some(op) = opt(preceded(ws, compare_op)).parse_next(input)? {
        let rhs = cut_err(additive).parse_next(input)?;
        return Ok(lhs.compare(op, rhs));
    }
    if opt(preceded(ws, keyword("in"))).parse_next(input)?.is_some() {
        ws.parse_next(input)?;
        return cut_err(alt((
            delimited('[', separated(0.., expr, (ws, ',')), (ws, ']')).map(|list: Vec<Expr>| {
                Expr::In {
                    needle: Box::new(lhs.clone()),
                    list,
                }
            }),
            additive.map(|haystack| Expr::Contains {
                haystack: Box::new(haystack),
                needle: Box::new(lhs.clone()),
            }),
        )))
        .parse_next(input);
    }
    Ok(lhs)
}

fn not_expr(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    if opt(alt((keyword("not"), keyword("NOT"))))
        .parse_next(input)?
        .is_some()
    {
        let inner = cut_err(not_expr).parse_next(input)?;
        Ok(Expr::Not(Box::new(inner)))
    } else {
        comparison(input)
    }
}

fn and_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = not_expr(input)?;
    let rest: Vec<Expr> = repeat(
        0..,
        preceded((ws, alt((keyword("and"), keyword("AND")))), cut_err(not_expr)),
    )
    .parse_next(input)?;
    Ok(if rest.is_empty() {
        first
    } else {
        Expr::And(std::iter::once(first).chain(rest).collect())
    })
}

fn or_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = and_expr(input)?;
    let rest: Vec<Expr> = repeat(
        0..,
        preceded((ws, alt((keyword("or"), keyword("OR")))), cut_err(and_expr)),
    )
    .parse_next(input)?;
    Ok(if rest.is_empty() {
        first
    } else {
        Expr::Or(std::iter::once(first).chain(rest).collect())
    })
}

fn expr(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    or_expr(input)
}

// -- Statements -------------------------------------------------------------

enum Statement {
    Constant(String, Json),
    Rule { rule: Rule, is_total: bool },
}

fn constant_def(input: &mut &str) -> ModalResult<Statement> {
    keyword("pricing").parse_next(input)?;
    ws.parse_next(input)?;
    let key = cut_err(name)
        .context(expected("constant name"))
        .parse_next(input)?;
    ws.parse_next(input)?;
    cut_err('=').context(expected("=")).parse_next(input)?;
    let value = cut_err(signed_literal).parse_next(input)?;
    Ok(Statement::Constant(key.to_owned(), encode_value(&value)))
}

fn total_marker(input: &mut &str) -> ModalResult<()> {
    (ws, '(', ws, keyword("total"), ws, cut_err(')'))
        .void()
        .parse_next(input)
}

fn rule_def(input: &mut &str) -> ModalResult<Statement> {
    let scope = alt((
        keyword("camper").value(Scope::Camper),
        keyword("registration").value(Scope::Registration),
    ))
    .parse_next(input)?;
    ws.parse_next(input)?;

    let rule_name = cut_err(name)
        .context(expected("rule name"))
        .parse_next(input)?;
    let label = opt(preceded(ws, string_literal)).parse_next(input)?;
    let is_total = opt(total_marker).parse_next(input)?.is_some();
    if is_total && scope == Scope::Camper {
        return Err(ErrMode::from_input(input).cut());
    }

    ws.parse_next(input)?;
    cut_err(':').context(expected(":")).parse_next(input)?;

    let expression = cut_err(expr)
        .context(expected("rule body"))
        .parse_next(input)?;

    Ok(Statement::Rule {
        rule: Rule {
            name: rule_name.to_owned(),
            scope,
            label,
            expression: Some(Ok(expression)),
        },
        is_total,
    })
}

// -- Top-level parser -------------------------------------------------------

pub fn parse_ruleset(input: &mut &str) -> ModalResult<ParsedRuleSet> {
    let statements: Vec<Statement> =
        repeat(0.., preceded(ws, alt((constant_def, rule_def)))).parse_next(input)?;
    ws.parse_next(input)?;

    let mut parsed = ParsedRuleSet::default();
    for statement in statements {
        match statement {
            Statement::Constant(key, value) => {
                parsed.constants.insert(key, value);
            }
            Statement::Rule { rule, is_total } => {
                if is_total {
                    parsed.total_rule = Some(rule.name.clone());
                }
                parsed.rules.push(rule);
            }
        }
    }
    Ok(parsed)
}
