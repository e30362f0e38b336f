//! Rule normalisation.
//!
//! Rewrites the rule list so that no constructor pattern's direct argument
//! is itself a constructor pattern. Each nested constructor is lifted into
//! a zero-cost auxiliary rule and replaced by a fresh variable typed with
//! the auxiliary nonterminal:
//!
//! e : ADD(x:e, ADD(CONST(0), z:e)) [1] {: x + z :}
//!
//! becomes
//!
//! e      : ADD(x:e, _v1:_ADD2) [1] {: let z = _v1; x + z :}
//! _ADD2  : ADD(_v2:_CONST1, z:e) [0] {: z :}
//! _CONST1: CONST(0) [0] {: () :}
//!
//! The auxiliary's action is the tuple of the lifted pattern's free
//! variables, and the enclosing rule destructures that tuple in a `let`
//! prefix, so the root action runs unchanged and total cover costs are
//! preserved (auxiliaries cost zero).
//!
//! A given (constructor, arity) pair maps to the same auxiliary name
//! everywhere in the specification, so lifts from different sites feed the
//! same auxiliary nonterminal. Both the name registry and the fresh
//! variable counter live for a single normalisation run.

use std::collections::HashMap;

use log::debug;
use smol_str::SmolStr;

use crate::error::BurgError;
use crate::spec::{Cost, Pattern, Rule, VarType};

pub fn normalize(rules: &[Rule]) -> Result<Vec<Rule>, BurgError> {
    let mut norm = Normalizer::new();
    let mut out: Vec<Rule> = Vec::new();
    for rule in rules {
        norm.check_top_pattern(rule)?;
        let mut extras = Vec::new();
        let rewritten = norm.flatten(rule.clone(), &mut extras)?;
        out.push(rewritten);
        out.append(&mut extras);
    }
    Ok(dedupe_synthesized(out))
}

struct Normalizer {
    /// auxiliary name -> the (constructor, arity) it stands for
    registry: HashMap<SmolStr, (SmolStr, usize)>,
    next_var: u32,
}

impl Normalizer {
    fn new() -> Self {
        Self {
            registry: HashMap::new(),
            next_var: 0,
        }
    }

    /// A rule's top-level pattern must be a constructor or a nonterminal
    /// variable; bare literals and bare terminal variables only make sense
    /// nested.
    fn check_top_pattern(&self, rule: &Rule) -> Result<(), BurgError> {
        let what = match &rule.pattern {
            Pattern::Literal(lit) => format!("bare literal {lit}"),
            Pattern::Var(name, VarType::Terminal(t)) => {
                format!("bare terminal variable {name}:{t}")
            }
            _ => return Ok(()),
        };
        Err(BurgError::IllFormedTopPattern {
            line: rule.line,
            lhs: rule.lhs.clone(),
            what,
        })
    }

    fn flatten(&mut self, mut rule: Rule, extras: &mut Vec<Rule>) -> Result<Rule, BurgError> {
        let Pattern::Con(con, args) = rule.pattern else {
            return Ok(rule);
        };

        // (free variables of the lifted sub-pattern, fresh variable name)
        let mut lifted: Vec<(Vec<SmolStr>, SmolStr)> = Vec::new();
        let mut new_args = Vec::with_capacity(args.len());

        for arg in args {
            match arg {
                Pattern::Con(cname, cargs) => {
                    let aux = self.aux_name(&cname, cargs.len())?;
                    let fresh = self.fresh_var();
                    let nested = Pattern::Con(cname, cargs);
                    let vars = nested.free_vars();
                    debug!("lifting {nested} out of {con} into {aux} (via {fresh})");

                    let sub = Rule {
                        lhs: aux.clone(),
                        pattern: nested,
                        cost: Cost::Int(0),
                        action: tuple_of(&vars),
                        line: rule.line,
                    };
                    let mut sub_extras = Vec::new();
                    let sub = self.flatten(sub, &mut sub_extras)?;
                    extras.push(sub);
                    extras.append(&mut sub_extras);

                    new_args.push(Pattern::Var(fresh.clone(), VarType::Nonterm(aux)));
                    lifted.push((vars, fresh));
                }
                other => new_args.push(other),
            }
        }

        rule.pattern = Pattern::Con(con, new_args);
        rule.action = wrap_lets(&lifted, &rule.action);
        Ok(rule)
    }

    fn aux_name(&mut self, con: &SmolStr, arity: usize) -> Result<SmolStr, BurgError> {
        let name = SmolStr::new(format!("_{con}{arity}"));
        match self.registry.get(&name) {
            None => {
                self.registry.insert(name.clone(), (con.clone(), arity));
                Ok(name)
            }
            Some((c, a)) if c == con && *a == arity => Ok(name),
            Some((c, a)) => Err(BurgError::AuxiliaryClash {
                aux: name,
                first: format!("{c}/{a}"),
                second: format!("{con}/{arity}"),
            }),
        }
    }

    fn fresh_var(&mut self) -> SmolStr {
        self.next_var += 1;
        SmolStr::new(format!("_v{}", self.next_var))
    }
}

/// `()`, `v`, or `(a, b)` -- what an auxiliary rule's match evaluates to
fn tuple_of(vars: &[SmolStr]) -> String {
    match vars {
        [] => "()".to_string(),
        [v] => v.to_string(),
        _ => format!(
            "({})",
            vars.iter().map(SmolStr::as_str).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Prefix the action with one `let` per lifted sub-pattern that had any
/// variables, rebinding them from the fresh variable's tuple.
fn wrap_lets(lifted: &[(Vec<SmolStr>, SmolStr)], action: &str) -> String {
    let mut prefix = String::new();
    for (vars, fresh) in lifted {
        if vars.is_empty() {
            continue;
        }
        prefix.push_str(&format!("let {} = {fresh}; ", tuple_of(vars)));
    }
    format!("{prefix}{action}")
}

/// Lifts of shape-equal sub-patterns from different sites synthesize the
/// same rule (modulo variable names); keep the first of each. User rules
/// are never deduplicated -- equal shapes may carry different costs or
/// actions on purpose.
fn dedupe_synthesized(rules: Vec<Rule>) -> Vec<Rule> {
    let mut seen: Vec<(SmolStr, Pattern)> = Vec::new();
    let mut out = Vec::with_capacity(rules.len());
    for rule in rules {
        if rule.lhs.starts_with('_') {
            let dup = seen
                .iter()
                .any(|(lhs, pat)| *lhs == rule.lhs && pat.shape_eq(&rule.pattern));
            if dup {
                debug!("dropping duplicate synthesized rule {rule}");
                continue;
            }
            seen.push((rule.lhs.clone(), rule.pattern.clone()));
        }
        out.push(rule);
    }
    out
}
