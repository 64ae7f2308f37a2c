use std::collections::HashSet;

use tracing::warn;

use crate::types::{
    AGGREGATE_ROOT, Bindings, CompileError, CompiledRule, DEFAULT_TOTAL_RULE, Expr, Rule, RuleSet,
    RuleSetBuilder, Scope,
};

/// Roots readable from every rule.
const SHARED_ROOTS: [&str; 2] = ["registration", "pricing"];
const CAMPER_ROOT: &str = "camper";
const CAMPER_COUNT: &str = "camper_count";

pub(crate) fn compile(builder: RuleSetBuilder, strict: bool) -> Result<RuleSet, CompileError> {
    let RuleSetBuilder {
        camper,
        registration,
        constants,
        total_rule,
    } = builder;

    check_names(Scope::Camper, &camper)?;
    check_names(Scope::Registration, &registration)?;

    let camper_names: HashSet<&str> = camper.iter().map(|r| r.name.as_str()).collect();

    let camper_rules = compile_rules(&camper, &camper_names, strict)?;
    let registration_rules = compile_rules(&registration, &camper_names, strict)?;

    let mut pricing = Bindings::new();
    pricing.insert_json("pricing", &constants);

    Ok(RuleSet {
        camper_rules,
        registration_rules,
        constants,
        pricing,
        total_rule: total_rule.unwrap_or_else(|| DEFAULT_TOTAL_RULE.to_owned()),
    })
}

fn check_names(scope: Scope, rules: &[Rule]) -> Result<(), CompileError> {
    let mut seen = HashSet::new();
    for rule in rules {
        if rule.name.trim().is_empty() {
            return Err(CompileError::EmptyName { scope });
        }
        // `campers.<name>` is a binding path, so a dot would nest it.
        if rule.name.contains('.') {
            return Err(CompileError::DottedName {
                scope,
                name: rule.name.clone(),
            });
        }
        if !seen.insert(&rule.name) {
            return Err(CompileError::DuplicateRule {
                scope,
                name: rule.name.clone(),
            });
        }
    }
    Ok(())
}

fn compile_rules(
    rules: &[Rule],
    camper_names: &HashSet<&str>,
    strict: bool,
) -> Result<Vec<CompiledRule>, CompileError> {
    let mut compiled = Vec::with_capacity(rules.len());
    for rule in rules {
        let body = match compile_body(rule, camper_names) {
            Err(e) if strict => return Err(e),
            Err(e) => {
                warn!(scope = %rule.scope, rule = %rule.name, error = %e, "defective pricing rule");
                Err(e)
            }
            ok => ok,
        };
        compiled.push(CompiledRule {
            name: rule.name.clone(),
            label: rule.label.clone(),
            body,
        });
    }
    Ok(compiled)
}

fn compile_body(rule: &Rule, camper_names: &HashSet<&str>) -> Result<Expr, CompileError> {
    let expr = match &rule.expression {
        None => {
            return Err(CompileError::MissingExpression {
                rule: rule.name.clone(),
            });
        }
        Some(Err(source)) => {
            return Err(CompileError::MalformedExpression {
                rule: rule.name.clone(),
                source: source.clone(),
            });
        }
        Some(Ok(expr)) => expr,
    };

    let mut defect = None;
    expr.for_each_var(&mut |path| {
        if defect.is_none() {
            defect = check_reachable(rule, path, camper_names).err();
        }
    });
    match defect {
        Some(e) => Err(e),
        None => Ok(expr.clone()),
    }
}

/// Check that `path` is bound in the scope of `rule`.
fn check_reachable(rule: &Rule, path: &str, camper_names: &HashSet<&str>) -> Result<(), CompileError> {
    let (root, rest) = match path.split_once('.') {
        Some((root, rest)) => (root, Some(rest)),
        None => (path, None),
    };
    let reachable = match (rule.scope, root) {
        (_, root) if SHARED_ROOTS.contains(&root) => rest.is_some(),
        (Scope::Camper, CAMPER_ROOT) => rest.is_some(),
        (Scope::Registration, CAMPER_COUNT) => rest.is_none(),
        (Scope::Registration, AGGREGATE_ROOT) => {
            let reference = rest.unwrap_or_default();
            if !camper_names.contains(reference) {
                return Err(CompileError::UnknownAggregate {
                    rule: rule.name.clone(),
                    reference: reference.to_owned(),
                });
            }
            true
        }
        _ => false,
    };
    if reachable {
        Ok(())
    } else {
        Err(CompileError::UnreachableField {
            rule: rule.name.clone(),
            scope: rule.scope,
            field: path.to_owned(),
        })
    }
}
