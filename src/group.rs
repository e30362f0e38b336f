//! Grouping of normalised rules for the generator.
//!
//! Constructor rules are indexed by their top constructor; chain rules
//! (pattern = a single nonterminal variable) are indexed by the
//! nonterminal they consume, which is the direction update routines follow
//! them in. Also the home of the structural checks that need the whole
//! rule set at once: terminal/nonterminal disjointness, defined-ness of
//! every referenced nonterminal, and the chain-cycle cost check.

use std::collections::HashSet;

use itertools::Itertools;
use log::debug;
use multimap::MultiMap;
use smol_str::SmolStr;

use crate::error::BurgError;
use crate::spec::{Pattern, Rule, Spec, VarType};

#[derive(Debug)]
pub struct Grouped {
    /// constructor name -> rules whose top-level pattern is that constructor
    pub cons: MultiMap<SmolStr, Rule>,
    /// nonterminal n -> chain rules of the form `m : n`
    pub chains: MultiMap<SmolStr, Rule>,
    /// every left-hand side, `_`-auxiliaries sorted after ordinary names
    pub nonterminals: Vec<SmolStr>,
}

impl Grouped {
    pub fn con_rules(&self, con: &str) -> &[Rule] {
        self.cons.get_vec(con).map_or(&[], Vec::as_slice)
    }

    pub fn chain_rules(&self, nonterm: &str) -> &[Rule] {
        self.chains.get_vec(nonterm).map_or(&[], Vec::as_slice)
    }

    /// constructor names in deterministic (sorted) order
    pub fn constructors(&self) -> Vec<SmolStr> {
        self.cons.keys().cloned().sorted().collect()
    }
}

pub fn group(spec: &Spec, rules: &[Rule]) -> Result<Grouped, BurgError> {
    let defined: HashSet<&SmolStr> = rules.iter().map(|r| &r.lhs).collect();

    for rule in rules {
        if spec.is_terminal(&rule.lhs) {
            return Err(BurgError::TerminalClash {
                name: rule.lhs.clone(),
            });
        }
        check_defined(rule, &rule.pattern, &defined)?;
    }

    let mut cons = MultiMap::new();
    let mut chains = MultiMap::new();
    for rule in rules {
        match &rule.pattern {
            Pattern::Con(name, _) => cons.insert(name.clone(), rule.clone()),
            Pattern::Var(_, VarType::Nonterm(n)) => chains.insert(n.clone(), rule.clone()),
            other => {
                return Err(BurgError::IllFormedTopPattern {
                    line: rule.line,
                    lhs: rule.lhs.clone(),
                    what: other.to_string(),
                })
            }
        }
    }

    let nonterminals: Vec<SmolStr> = rules
        .iter()
        .map(|r| r.lhs.clone())
        .unique()
        .sorted_by_key(|n| (n.starts_with('_'), n.clone()))
        .collect();
    debug!(
        "grouped {} rules: {} constructors, {} chain edges, {} nonterminals",
        rules.len(),
        cons.keys().count(),
        chains.iter_all().map(|(_, v)| v.len()).sum::<usize>(),
        nonterminals.len()
    );

    let grouped = Grouped {
        cons,
        chains,
        nonterminals,
    };
    check_chain_cycles(&grouped)?;
    Ok(grouped)
}

/// every nonterminal-typed variable must name some rule's left-hand side,
/// otherwise the emitted record has no field for it
fn check_defined(
    rule: &Rule,
    pattern: &Pattern,
    defined: &HashSet<&SmolStr>,
) -> Result<(), BurgError> {
    match pattern {
        Pattern::Literal(_) => Ok(()),
        Pattern::Var(_, VarType::Terminal(_)) => Ok(()),
        Pattern::Var(_, VarType::Nonterm(n)) => {
            if defined.contains(n) {
                Ok(())
            } else {
                Err(BurgError::UndefinedNonterminal {
                    line: rule.line,
                    name: n.clone(),
                })
            }
        }
        Pattern::Con(_, args) => {
            for arg in args {
                check_defined(rule, arg, defined)?;
            }
            Ok(())
        }
    }
}

/// The emitted update routines recurse along chain rules and terminate via
/// the cost guard, which needs every chain cycle to gain at least one
/// positive literal cost per lap. A cycle of only zero or dynamic costs
/// cannot be shown terminating, so it is rejected here.
fn check_chain_cycles(grouped: &Grouped) -> Result<(), BurgError> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        OnStack,
        Done,
    }

    fn visit(
        node: &SmolStr,
        grouped: &Grouped,
        states: &mut Vec<(SmolStr, State)>,
        stack: &mut Vec<SmolStr>,
    ) -> Result<(), BurgError> {
        set_state(states, node, State::OnStack);
        stack.push(node.clone());
        for rule in grouped.chain_rules(node) {
            if rule.cost.is_positive_literal() {
                continue;
            }
            let next = &rule.lhs;
            match get_state(states, next) {
                State::OnStack => {
                    let start = stack.iter().position(|n| n == next).unwrap_or(0);
                    let mut cycle: Vec<&str> =
                        stack[start..].iter().map(SmolStr::as_str).collect();
                    cycle.push(next.as_str());
                    return Err(BurgError::ZeroCostChainCycle {
                        cycle: cycle.join(" -> "),
                    });
                }
                State::Unvisited => visit(next, grouped, states, stack)?,
                State::Done => {}
            }
        }
        stack.pop();
        set_state(states, node, State::Done);
        Ok(())
    }

    fn get_state(states: &[(SmolStr, State)], node: &SmolStr) -> State {
        states
            .iter()
            .find(|(n, _)| n == node)
            .map_or(State::Unvisited, |(_, s)| *s)
    }

    fn set_state(states: &mut Vec<(SmolStr, State)>, node: &SmolStr, state: State) {
        if let Some(entry) = states.iter_mut().find(|(n, _)| n == node) {
            entry.1 = state;
        } else {
            states.push((node.clone(), state));
        }
    }

    let mut states = Vec::new();
    let mut stack = Vec::new();
    for node in &grouped.nonterminals {
        if get_state(&states, node) == State::Unvisited {
            visit(node, grouped, &mut states, &mut stack)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::norm::normalize;
    use crate::parser::parse;
    use indoc::indoc;

    fn grouped_of(src: &str) -> Grouped {
        let spec = parse(src).unwrap();
        let rules = normalize(&spec.rules).unwrap();
        group(&spec, &rules).unwrap()
    }

    #[test]
    fn partitions_constructor_and_chain_rules() {
        let g = grouped_of(indoc! {"
            %%
            e : ADD(x:e, y:e) [2] {: x + y :}
            e : CONST(x:int)  [1] {: x :}
            s : e             [1] {: fmt(e) :}
        "});
        assert_eq!(g.con_rules("ADD").len(), 1);
        assert_eq!(g.con_rules("CONST").len(), 1);
        assert_eq!(g.chain_rules("e").len(), 1);
        assert_eq!(g.chain_rules("e")[0].lhs, "s");
        assert_eq!(g.chain_rules("s").len(), 0);
        assert_eq!(g.constructors(), vec!["ADD", "CONST"]);
    }

    #[test]
    fn auxiliaries_sort_after_ordinary_names() {
        let g = grouped_of("%%\nz : ADD(x:z, CONST(0)) [1] {: x :}\na : z [1] {: z :}");
        assert_eq!(g.nonterminals, vec!["a", "z", "_CONST1"]);
    }

    #[test]
    fn terminal_clash_is_rejected() {
        let spec = parse("%term e\n%%\nq : FOO(x:int) [1] {: x :}").unwrap();
        let mut rules = normalize(&spec.rules).unwrap();
        rules[0].lhs = "e".into();
        let err = group(&spec, &rules).unwrap_err();
        assert!(matches!(err, BurgError::TerminalClash { ref name } if name == "e"));
    }

    #[test]
    fn undefined_nonterminal_is_rejected() {
        let spec = parse("%%\ne : FOO(x:q) [1] {: x :}").unwrap();
        let rules = normalize(&spec.rules).unwrap();
        let err = group(&spec, &rules).unwrap_err();
        assert!(matches!(err, BurgError::UndefinedNonterminal { ref name, .. } if name == "q"));
    }

    #[test]
    fn zero_cost_chain_cycle_is_rejected() {
        let spec = parse(indoc! {"
            %%
            e : CONST(x:int) [1] {: x :}
            s : e [0] {: f(e) :}
            e : s [0] {: g(s) :}
        "})
        .unwrap();
        let rules = normalize(&spec.rules).unwrap();
        let err = group(&spec, &rules).unwrap_err();
        assert!(matches!(err, BurgError::ZeroCostChainCycle { .. }));
    }

    #[test]
    fn dynamic_cost_cycle_is_rejected_too() {
        let spec = parse(indoc! {"
            %%
            e : CONST(x:int) [1] {: x :}
            s : e [{: c1() :}] {: f(e) :}
            e : s [{: c2() :}] {: g(s) :}
        "})
        .unwrap();
        let rules = normalize(&spec.rules).unwrap();
        assert!(group(&spec, &rules).is_err());
    }

    #[test]
    fn cycle_with_a_positive_edge_is_fine() {
        let g = grouped_of(indoc! {"
            %%
            e : CONST(x:int) [1] {: x :}
            s : e [1] {: f(e) :}
            e : s [0] {: g(s) :}
        "});
        assert_eq!(g.chain_rules("e").len(), 1);
        assert_eq!(g.chain_rules("s").len(), 1);
    }
}
