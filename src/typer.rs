//! Constructor signature inference.
//!
//! Every constructor occurrence anywhere in the rule set pins each of its
//! argument positions to an argument kind: monomorphic of a terminal type
//! (literals and terminal-typed variables) or polymorphic (nonterminal
//! variables and nested constructors). All occurrences of one constructor
//! must agree; the first disagreement is fatal.
//!
//! The result only depends on the multiset of constructor occurrences, so
//! re-running on the same rules (or on their normalised form) returns an
//! equal mapping.

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use smol_str::SmolStr;

use crate::error::BurgError;
use crate::spec::{Pattern, Rule, VarType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    /// accepts any nonterminal value or nested constructor
    Poly,
    /// pinned to a named terminal type
    Mono(SmolStr),
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKind::Poly => write!(f, "poly"),
            ArgKind::Mono(t) => write!(f, "{t}"),
        }
    }
}

pub type Signature = Vec<ArgKind>;

pub fn show_signature(sig: &Signature) -> String {
    format!("({})", sig.iter().join(", "))
}

/// Derive the signature map for every constructor in `rules`, or fail on
/// the first inconsistent use.
pub fn infer(rules: &[Rule]) -> Result<BTreeMap<SmolStr, Signature>, BurgError> {
    let mut sigs: BTreeMap<SmolStr, Signature> = BTreeMap::new();
    for rule in rules {
        rule.pattern.fold_cons(Ok(()), &mut |acc, con, args| {
            acc?;
            let found: Signature = args.iter().map(arg_kind).collect();
            match sigs.get(con) {
                None => {
                    sigs.insert(con.clone(), found);
                    Ok(())
                }
                Some(expected) if *expected == found => Ok(()),
                Some(expected) => Err(BurgError::InconsistentConstructor {
                    line: rule.line,
                    con: con.clone(),
                    expected: show_signature(expected),
                    found: show_signature(&found),
                }),
            }
        })?;
    }
    Ok(sigs)
}

fn arg_kind(arg: &Pattern) -> ArgKind {
    match arg {
        Pattern::Literal(lit) => ArgKind::Mono(SmolStr::new(lit.type_name())),
        Pattern::Var(_, VarType::Terminal(t)) => ArgKind::Mono(t.clone()),
        Pattern::Var(_, VarType::Nonterm(_)) => ArgKind::Poly,
        // cannot arise after normalisation, but the typer is total over
        // arbitrary patterns
        Pattern::Con(..) => ArgKind::Poly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use indoc::indoc;

    fn sigs_of(src: &str) -> BTreeMap<SmolStr, Signature> {
        infer(&parse(src).unwrap().rules).unwrap()
    }

    #[test]
    fn infers_poly_and_mono_positions() {
        let sigs = sigs_of(indoc! {"
            %%
            e : ADD(x:e, y:e)      [1] {: x + y :}
            e : ADD(x:e, CONST(0)) [1] {: x :}
            e : CONST(x:int)       [1] {: x :}
        "});
        assert_eq!(sigs["ADD"], vec![ArgKind::Poly, ArgKind::Poly]);
        assert_eq!(sigs["CONST"], vec![ArgKind::Mono("int".into())]);
    }

    #[test]
    fn literal_kinds_follow_the_literal() {
        let sigs = sigs_of("%%\ne : TAG(\"name\", 'c', 0) [1] {: t :}");
        assert_eq!(
            sigs["TAG"],
            vec![
                ArgKind::Mono("string".into()),
                ArgKind::Mono("char".into()),
                ArgKind::Mono("int".into()),
            ]
        );
    }

    #[test]
    fn declared_terminal_types_are_monomorphic() {
        let sigs = sigs_of("%term addr\n%%\ne : LOAD(a:addr) [1] {: a :}");
        assert_eq!(sigs["LOAD"], vec![ArgKind::Mono("addr".into())]);
    }

    #[test]
    fn arity_mismatch_is_inconsistent() {
        let err = infer(
            &parse(indoc! {"
                %%
                e : FOO(x:e)      [1] {: x :}
                e : FOO(x:e, y:e) [1] {: x :}
            "})
            .unwrap()
            .rules,
        )
        .unwrap_err();
        match err {
            BurgError::InconsistentConstructor {
                con,
                expected,
                found,
                ..
            } => {
                assert_eq!(con, "FOO");
                assert_eq!(expected, "(poly)");
                assert_eq!(found, "(poly, poly)");
            }
            other => panic!("wrong error: {other}"),
        }
    }

    #[test]
    fn kind_mismatch_is_inconsistent() {
        let err = infer(
            &parse(indoc! {"
                %%
                e : FOO(x:int) [1] {: x :}
                e : FOO(x:e)   [1] {: x :}
            "})
            .unwrap()
            .rules,
        )
        .unwrap_err();
        assert!(matches!(err, BurgError::InconsistentConstructor { ref con, .. } if con == "FOO"));
    }

    #[test]
    fn typing_survives_normalisation_and_is_idempotent() {
        let spec = parse("%%\ne : ADD(x:e, ADD(CONST(0), z:e)) [1] {: x + z :}").unwrap();
        let before = infer(&spec.rules).unwrap();
        let normed = crate::norm::normalize(&spec.rules).unwrap();
        let after = infer(&normed).unwrap();
        // ADD and CONST keep their signatures; the lifted sites add nothing new
        assert_eq!(before["ADD"], after["ADD"]);
        assert_eq!(before["CONST"], after["CONST"]);
        assert_eq!(after, infer(&normed).unwrap());
    }

    #[test]
    fn nested_constructor_argument_is_polymorphic() {
        // pre-normalisation patterns still type
        let sigs = sigs_of("%%\ne : ADD(x:e, CONST(0)) [1] {: x :}");
        assert_eq!(sigs["ADD"], vec![ArgKind::Poly, ArgKind::Poly]);
    }
}
