//! Code generation.
//!
//! From the grouped, normalised rules this emits a closed dynamic
//! programming engine as Rust source:
//!
//! - a record type with one `rt::Nt` field per nonterminal (fresh type
//!   parameter unless the user gave a `%type` annotation),
//! - an `infinity()` value, every field maximally expensive,
//! - one `update_<n>` routine per nonterminal, propagating chain rules in
//!   ascending cost order behind a `cost >=` guard,
//! - one `con_<C>` routine per constructor, offering every candidate rule
//!   to `rt::choice` and threading the winners through the updates.
//!
//! A client builds its subject tree bottom-up by calling the `con_`
//! routines; the record that comes back holds the cheapest cover per
//! nonterminal, with the user actions captured as thunks.
//!
//! Emission order is fixed (heads, prelude, record, infinity, updates,
//! constructors, tails) and every collection is walked in sorted order, so
//! equal specifications emit byte-identical text.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::debug;
use smol_str::SmolStr;

use crate::code::{Expr, Item, Stmt};
use crate::group::Grouped;
use crate::mangle::mangle;
use crate::spec::{Cost, Literal, Pattern, Rule, Spec, VarType};
use crate::typer::{ArgKind, Signature};

/// fixed prelude: the runtime alias and the thunk constructor
const PRELUDE: &str = "use rustburg::runtime as rt;\nuse std::rc::Rc;";

pub fn generate(
    spec: &Spec,
    grouped: &Grouped,
    sigs: &BTreeMap<SmolStr, Signature>,
) -> Vec<Item> {
    let mut items: Vec<Item> = spec.heads.iter().cloned().map(Item::Raw).collect();
    if grouped.nonterminals.is_empty() {
        // nothing to match: heads only
        return items;
    }

    let ctx = Ctx::new(spec, grouped);
    items.push(Item::Raw(PRELUDE.to_string()));
    items.push(ctx.record_type());
    items.push(ctx.clone_impl());
    items.push(ctx.infinity_fn());
    for nonterm in &grouped.nonterminals {
        items.push(ctx.update_fn(nonterm));
    }
    for con in grouped.constructors() {
        items.push(ctx.con_fn(&con, &sigs[&con]));
    }
    items.extend(spec.tails.iter().cloned().map(Item::Raw));
    items
}

struct Ctx<'a> {
    spec: &'a Spec,
    grouped: &'a Grouped,
    /// fresh type parameters, one per un-annotated nonterminal
    params: Vec<String>,
}

impl<'a> Ctx<'a> {
    fn new(spec: &'a Spec, grouped: &'a Grouped) -> Self {
        let params = grouped
            .nonterminals
            .iter()
            .filter(|n| !spec.types.contains_key(n.as_str()))
            .map(|n| format!("T{}", mangle(n)))
            .collect();
        Self {
            spec,
            grouped,
            params,
        }
    }

    /// the type a nonterminal's actions produce: %type annotation or the
    /// field's fresh parameter
    fn value_ty(&self, nonterm: &str) -> String {
        match self.spec.types.get(nonterm) {
            Some(annotation) => annotation.clone(),
            None => format!("T{}", mangle(nonterm)),
        }
    }

    fn record_ty(&self) -> String {
        if self.params.is_empty() {
            "Nonterm".to_string()
        } else {
            format!("Nonterm<{}>", self.params.join(", "))
        }
    }

    /// `'static`-bounded generics for routines that build thunks
    fn bounded_generics(&self) -> Vec<String> {
        self.params.iter().map(|p| format!("{p}: 'static")).collect()
    }

    fn record_type(&self) -> Item {
        Item::Struct {
            name: "Nonterm".into(),
            params: self.params.clone(),
            fields: self
                .grouped
                .nonterminals
                .iter()
                .map(|n| {
                    (
                        mangle(n).to_string(),
                        format!("rt::Nt<{}>", self.value_ty(n)),
                    )
                })
                .collect(),
        }
    }

    fn clone_impl(&self) -> Item {
        Item::CloneImpl {
            name: "Nonterm".into(),
            params: self.params.clone(),
            fields: self
                .grouped
                .nonterminals
                .iter()
                .map(|n| mangle(n).to_string())
                .collect(),
        }
    }

    fn infinity_fn(&self) -> Item {
        Item::Fn {
            name: "infinity".into(),
            generics: self.params.clone(),
            params: vec![],
            ret: self.record_ty(),
            body: vec![Stmt::Value(Expr::Record(
                "Nonterm".into(),
                self.grouped
                    .nonterminals
                    .iter()
                    .map(|n| (mangle(n).to_string(), Expr::raw("rt::infinity()")))
                    .collect(),
            ))],
        }
    }

    /// `update_<n>`: install a cheaper candidate at field `n`, then offer
    /// the improvement to every chain rule consuming `n`, cheapest first.
    /// The guard makes redundant visits no-ops, which is what terminates
    /// chain recursion.
    fn update_fn(&self, nonterm: &str) -> Item {
        let field = mangle(nonterm);
        debug!("emitting update_{field}");
        let mut body = vec![
            Stmt::GuardReturn(
                Expr::Ge(
                    Box::new(Expr::field(Expr::raw("nt"), "cost")),
                    Box::new(Expr::field(
                        Expr::field(Expr::raw("x"), field.as_str()),
                        "cost",
                    )),
                ),
                Expr::raw("x"),
            ),
            Stmt::Raw("let mut x = x;".into()),
            Stmt::Raw(format!("x.{field} = nt.clone();")),
        ];

        let chain_rules: Vec<&Rule> = self
            .grouped
            .chain_rules(nonterm)
            .iter()
            .sorted_by(|a, b| a.cost.cmp(&b.cost))
            .collect();
        for rule in chain_rules {
            let var = match &rule.pattern {
                Pattern::Var(name, _) => name.clone(),
                _ => unreachable!("chain rules have variable patterns"),
            };
            let candidate = Expr::Record(
                "rt::Nt".into(),
                vec![
                    (
                        "cost".into(),
                        Expr::Sum(vec![
                            Expr::field(Expr::raw("nt"), "cost"),
                            chain_cost(&rule.cost),
                        ]),
                    ),
                    (
                        "action".into(),
                        Expr::Thunk {
                            captures: vec![("a".into(), Expr::raw("nt.action.clone()"))],
                            binds: vec![(var.to_string(), Expr::raw("a()"))],
                            body: rule.action.clone(),
                        },
                    ),
                ],
            );
            body.push(Stmt::Let(
                "x".into(),
                Expr::Call(
                    format!("update_{}", mangle(&rule.lhs)),
                    vec![candidate, Expr::raw("x")],
                ),
            ));
        }
        body.push(Stmt::Value(Expr::raw("x")));

        Item::Fn {
            name: format!("update_{field}"),
            generics: self.bounded_generics(),
            params: vec![
                ("nt".into(), format!("rt::Nt<{}>", self.value_ty(nonterm))),
                ("x".into(), self.record_ty()),
            ],
            ret: self.record_ty(),
            body,
        }
    }

    /// `con_<C>`: one candidate per rule with `C` at the top, grouped by
    /// produced nonterminal, seeded from `infinity()`.
    fn con_fn(&self, con: &str, sig: &Signature) -> Item {
        debug!("emitting con_{} ({} rules)", con, self.grouped.con_rules(con).len());
        let params: Vec<(String, String)> = sig
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let ty = match kind {
                    ArgKind::Poly => self.record_ty(),
                    ArgKind::Mono(t) => term_ty(t),
                };
                (format!("arg{}", i + 1), ty)
            })
            .collect();

        let mut body = vec![Stmt::Let("x".into(), Expr::raw("infinity()"))];
        for nonterm in &self.grouped.nonterminals {
            let candidates: Vec<Expr> = self
                .grouped
                .con_rules(con)
                .iter()
                .filter(|r| r.lhs == *nonterm)
                .map(|r| self.candidate(r))
                .collect();
            if candidates.is_empty() {
                continue;
            }
            body.push(Stmt::Let(
                "x".into(),
                Expr::Call(
                    format!("update_{}", mangle(nonterm)),
                    vec![
                        Expr::Call("rt::choice".into(), vec![Expr::VecOf(candidates)]),
                        Expr::raw("x"),
                    ],
                ),
            ));
        }
        body.push(Stmt::Value(Expr::raw("x")));

        Item::Fn {
            name: format!("con_{}", mangle(con)),
            generics: self.bounded_generics(),
            params,
            ret: self.record_ty(),
            body,
        }
    }

    /// one `rt::Nt` candidate for a constructor rule
    fn candidate(&self, rule: &Rule) -> Expr {
        let args = match &rule.pattern {
            Pattern::Con(_, args) => args,
            _ => unreachable!("constructor rules have constructor patterns"),
        };

        let mut cost_terms = vec![self.rule_cost(rule, args)];
        let mut captures: Vec<(String, Expr)> = Vec::new();
        let mut binds: Vec<(String, Expr)> = Vec::new();
        for (i, arg) in args.iter().enumerate() {
            let argname = format!("arg{}", i + 1);
            match arg {
                Pattern::Var(var, VarType::Nonterm(m)) => {
                    cost_terms.push(Expr::field(
                        Expr::field(Expr::raw(argname.clone()), mangle(m).as_str()),
                        "cost",
                    ));
                    captures.push((argname.clone(), Expr::raw(format!("{argname}.clone()"))));
                    binds.push((
                        var.to_string(),
                        Expr::raw(format!("({argname}.{}.action)()", mangle(m))),
                    ));
                }
                Pattern::Var(var, VarType::Terminal(_)) => {
                    captures.push((argname.clone(), Expr::raw(format!("{argname}.clone()"))));
                    binds.push((var.to_string(), Expr::raw(format!("{argname}.clone()"))));
                }
                Pattern::Literal(lit) => {
                    cost_terms.push(Expr::field(
                        Expr::Call(
                            "rt::matches".into(),
                            vec![
                                Expr::raw(format!("&{}", literal_text(lit))),
                                Expr::raw(format!("&{argname}")),
                            ],
                        ),
                        "cost",
                    ));
                }
                Pattern::Con(..) => {
                    unreachable!("nested constructors are gone after normalisation")
                }
            }
        }

        Expr::Record(
            "rt::Nt".into(),
            vec![
                ("cost".into(), Expr::Sum(cost_terms)),
                (
                    "action".into(),
                    Expr::Thunk {
                        captures,
                        binds,
                        body: rule.action.clone(),
                    },
                ),
            ],
        )
    }

    /// The rule's own cost. A dynamic cost fragment sees the rule's
    /// top-level terminal variables and nothing else.
    fn rule_cost(&self, rule: &Rule, args: &[Pattern]) -> Expr {
        match &rule.cost {
            Cost::Int(n) => Expr::raw(format!("rt::Cost::from({n})")),
            Cost::Code(code) => {
                let mut bindings = String::new();
                for (i, arg) in args.iter().enumerate() {
                    if let Pattern::Var(var, VarType::Terminal(_)) = arg {
                        bindings.push_str(&format!("let {var} = arg{}.clone(); ", i + 1));
                    }
                }
                Expr::raw(format!("rt::Cost::from({{ {bindings}{code} }})"))
            }
        }
    }
}

/// chain-rule cost term added onto the candidate's cost
fn chain_cost(cost: &Cost) -> Expr {
    match cost {
        Cost::Int(n) => Expr::raw(n.to_string()),
        Cost::Code(code) => Expr::raw(format!("({code})")),
    }
}

/// predeclared terminal types map to their Rust counterparts; user
/// terminal types are opaque and pass through verbatim
fn term_ty(name: &str) -> String {
    match name {
        "int" => "i64".to_string(),
        "string" => "String".to_string(),
        "char" => "char".to_string(),
        other => other.to_string(),
    }
}

fn literal_text(lit: &Literal) -> String {
    match lit {
        Literal::Int(n) => n.to_string(),
        Literal::Str(s) => format!("String::from({s:?})"),
        Literal::Char(c) => format!("{c:?}"),
    }
}
