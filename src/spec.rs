//! The abstract tree-rewriting specification.
//!
//! A specification is a set of rules, each mapping a pattern over a subject
//! tree to a user-supplied action, tagged with a cost:
//!
//! e : ADD(x:e, y:e) [1] {: x + y :}
//!
//! The left-hand side names a nonterminal. The pattern is a tree of
//! constructor nodes whose leaves are literals or typed variables. Cost and
//! action are transported verbatim to the generator; the core never
//! interprets them.
//!
//! Names are SmolStr (an O(1)-to-clone immutable string type) throughout.
//!
//! This module also carries the three pattern operations shared by the
//! pipeline stages: shape equivalence/ordering, the constructor fold, and
//! free-variable extraction.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use smol_str::SmolStr;

/// Terminal type names known without any declaration.
pub const PREDECLARED_TERMS: [&str; 3] = ["int", "string", "char"];

/// A literal leaf of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Literal {
    Int(i64),
    Str(String),
    Char(char),
}

impl Literal {
    /// the monomorphic argument-kind name this literal pins its position to
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "int",
            Literal::Str(_) => "string",
            Literal::Char(_) => "char",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::Char(c) => write!(f, "{c:?}"),
        }
    }
}

/// The type tag a rule variable carries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum VarType {
    /// a bare type name, treated opaquely (predeclared or %term-declared)
    Terminal(SmolStr),
    /// a name defined as the left-hand side of some rule
    Nonterm(SmolStr),
}

impl VarType {
    pub fn name(&self) -> &SmolStr {
        match self {
            VarType::Terminal(n) | VarType::Nonterm(n) => n,
        }
    }
}

/// A pattern over subject trees.
///
/// A constructor with zero arguments, `NIL()`, is distinct from the bare
/// variable `NIL` (which is sugar for `NIL:NIL`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Literal(Literal),
    Var(SmolStr, VarType),
    Con(SmolStr, Vec<Pattern>),
}

impl Pattern {
    /// Total order on patterns that ignores variable *names*: variable
    /// types must match, literal values must match, constructor names and
    /// argument lists compare structurally (argument lists
    /// lexicographically). Shape equality is what makes two rules "the
    /// same rule" for deduplication.
    pub fn shape_cmp(&self, other: &Pattern) -> Ordering {
        use Pattern::*;
        match (self, other) {
            (Literal(a), Literal(b)) => a.cmp(b),
            (Var(_, a), Var(_, b)) => a.cmp(b),
            (Con(a, xs), Con(b, ys)) => a.cmp(b).then_with(|| {
                for (x, y) in xs.iter().zip(ys.iter()) {
                    match x.shape_cmp(y) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                xs.len().cmp(&ys.len())
            }),
            (Literal(_), _) => Ordering::Less,
            (_, Literal(_)) => Ordering::Greater,
            (Var(..), _) => Ordering::Less,
            (_, Var(..)) => Ordering::Greater,
        }
    }

    pub fn shape_eq(&self, other: &Pattern) -> bool {
        self.shape_cmp(other) == Ordering::Equal
    }

    /// Fold over every constructor occurrence, depth-first, visiting a node
    /// before its arguments and arguments in list order.
    pub fn fold_cons<A>(&self, acc: A, f: &mut impl FnMut(A, &SmolStr, &[Pattern]) -> A) -> A {
        match self {
            Pattern::Literal(_) | Pattern::Var(..) => acc,
            Pattern::Con(name, args) => {
                let mut acc = f(acc, name, args);
                for arg in args {
                    acc = arg.fold_cons(acc, f);
                }
                acc
            }
        }
    }

    /// Variable names in left-to-right pattern order, duplicates preserved.
    pub fn free_vars(&self) -> Vec<SmolStr> {
        fn walk(p: &Pattern, out: &mut Vec<SmolStr>) {
            match p {
                Pattern::Literal(_) => {}
                Pattern::Var(name, _) => out.push(name.clone()),
                Pattern::Con(_, args) => {
                    for arg in args {
                        walk(arg, out);
                    }
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    /// number of variable leaves
    pub fn count_vars(&self) -> usize {
        match self {
            Pattern::Literal(_) => 0,
            Pattern::Var(..) => 1,
            Pattern::Con(_, args) => args.iter().map(Pattern::count_vars).sum(),
        }
    }

    /// true if any direct argument of a constructor node, anywhere in the
    /// pattern, is itself a constructor node
    pub fn has_nested_con(&self) -> bool {
        match self {
            Pattern::Literal(_) | Pattern::Var(..) => false,
            Pattern::Con(_, args) => args
                .iter()
                .any(|a| matches!(a, Pattern::Con(..)) || a.has_nested_con()),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(lit) => write!(f, "{lit}"),
            Pattern::Var(name, ty) => write!(f, "{name}:{}", ty.name()),
            Pattern::Con(name, args) => {
                let inner: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{name}({})", inner.join(", "))
            }
        }
    }
}

/// A rule's cost: either a literal non-negative integer or an opaque code
/// fragment evaluated at match time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cost {
    Int(u32),
    Code(String),
}

impl Cost {
    pub fn is_zero(&self) -> bool {
        matches!(self, Cost::Int(0))
    }

    /// a cost that is known, statically, to be strictly positive
    pub fn is_positive_literal(&self) -> bool {
        matches!(self, Cost::Int(n) if *n > 0)
    }
}

/// Chain-rule propagation order: literal integers compare by value, any
/// dynamic cost sorts below any integer, and dynamic costs compare by
/// their text.
impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Cost::Int(a), Cost::Int(b)) => a.cmp(b),
            (Cost::Code(a), Cost::Code(b)) => a.cmp(b),
            (Cost::Code(_), Cost::Int(_)) => Ordering::Less,
            (Cost::Int(_), Cost::Code(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cost::Int(n) => write!(f, "{n}"),
            Cost::Code(c) => write!(f, "{{: {c} :}}"),
        }
    }
}

/// One rewriting rule. Cost and action are opaque; `line` is where the
/// rule started in the source, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub lhs: SmolStr,
    pub pattern: Pattern,
    pub cost: Cost,
    pub action: String,
    pub line: u32,
}

impl Rule {
    pub fn new(lhs: &str, pattern: Pattern, cost: Cost, action: &str, line: u32) -> Self {
        Self {
            lhs: SmolStr::new(lhs),
            pattern,
            cost,
            action: action.to_string(),
            line,
        }
    }

    /// chain rules are the nonterminal-to-nonterminal cost edges
    pub fn is_chain(&self) -> bool {
        matches!(self.pattern, Pattern::Var(_, VarType::Nonterm(_)))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {{: {} :}}",
            self.lhs, self.pattern, self.cost, self.action
        )
    }
}

/// The whole parsed specification, threaded read-only through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Spec {
    /// %term-declared terminal type names (predeclared ones not included)
    pub terms: Vec<SmolStr>,
    /// %head fragments, in declaration order
    pub heads: Vec<String>,
    /// %tail fragments, in declaration order
    pub tails: Vec<String>,
    /// %type annotations: nonterminal -> opaque target-type text
    pub types: HashMap<SmolStr, String>,
    pub rules: Vec<Rule>,
}

impl Spec {
    pub fn new() -> Self {
        Self::default()
    }

    /// is `name` a terminal type (predeclared or %term-declared)?
    pub fn is_terminal(&self, name: &str) -> bool {
        PREDECLARED_TERMS.contains(&name) || self.terms.iter().any(|t| t == name)
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = string_builder::Builder::default();
        for rule in &self.rules {
            builder.append(rule.to_string());
            builder.append("\n");
        }
        write!(f, "{}", builder.string().map_err(|_| fmt::Error)?)
    }
}
