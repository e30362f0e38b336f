//! Match-time runtime for generated engines.
//!
//! Emitted code (and nothing else in this crate) leans on these types: a
//! saturating cost algebra with an absorbing `INFINITY`, thunked
//! candidates, minimum-cost `choice`, and the `matches` guard for literal
//! pattern positions. Clients link the generated module against this one
//! and never construct these values by hand except when seeding leaves.

use std::fmt;
use std::ops::Add;
use std::rc::Rc;

/// Non-negative additive cost. Addition saturates, so `INFINITY` absorbs
/// and stays maximal under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost(u32);

pub const INFINITY: Cost = Cost(u32::MAX);

impl Cost {
    pub const ZERO: Cost = Cost(0);

    pub fn is_finite(self) -> bool {
        self != INFINITY
    }
}

impl From<u32> for Cost {
    fn from(n: u32) -> Self {
        Cost(n)
    }
}

impl Add for Cost {
    type Output = Cost;
    fn add(self, rhs: Cost) -> Cost {
        Cost(self.0.saturating_add(rhs.0))
    }
}

impl Add<u32> for Cost {
    type Output = Cost;
    fn add(self, rhs: u32) -> Cost {
        Cost(self.0.saturating_add(rhs))
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_finite() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "inf")
        }
    }
}

/// A candidate cover for one nonterminal: its cost and the deferred user
/// action producing the value.
pub struct Nt<T> {
    pub cost: Cost,
    pub action: Rc<dyn Fn() -> T>,
}

impl<T> Clone for Nt<T> {
    fn clone(&self) -> Self {
        Nt {
            cost: self.cost,
            action: Rc::clone(&self.action),
        }
    }
}

impl<T> Nt<T> {
    pub fn new(cost: Cost, action: impl Fn() -> T + 'static) -> Self {
        Nt {
            cost,
            action: Rc::new(action),
        }
    }
}

impl<T> fmt::Debug for Nt<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nt(cost: {})", self.cost)
    }
}

/// The maximally expensive candidate. Its action is unreachable unless a
/// client runs an action off a field no rule covered.
pub fn infinity<T>() -> Nt<T> {
    Nt {
        cost: INFINITY,
        action: Rc::new(|| panic!("no cover for this nonterminal")),
    }
}

/// The candidate of minimum cost; ties go to the earliest, so rule order
/// in the specification is the tie-break.
pub fn choice<T>(candidates: Vec<Nt<T>>) -> Nt<T> {
    let mut best: Option<Nt<T>> = None;
    for candidate in candidates {
        match &best {
            Some(b) if b.cost <= candidate.cost => {}
            _ => best = Some(candidate),
        }
    }
    best.unwrap_or_else(infinity)
}

/// Cost-zero on equality, infinity on mismatch: the guard for literal
/// pattern positions.
pub fn matches<T: PartialEq>(literal: &T, value: &T) -> Nt<()> {
    if literal == value {
        Nt::new(Cost::ZERO, || ())
    } else {
        infinity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_saturates_at_infinity() {
        assert_eq!(INFINITY + 1, INFINITY);
        assert_eq!(INFINITY + Cost::from(7), INFINITY);
        assert_eq!(Cost::from(2) + 3, Cost::from(5));
    }

    #[test]
    fn infinity_is_maximal() {
        assert!(Cost::from(u32::MAX - 1) < INFINITY);
        assert!(!INFINITY.is_finite());
        assert!(Cost::ZERO.is_finite());
    }

    #[test]
    fn choice_takes_the_cheapest() {
        let picked = choice(vec![
            Nt::new(Cost::from(3), || "three"),
            Nt::new(Cost::from(1), || "one"),
            Nt::new(Cost::from(2), || "two"),
        ]);
        assert_eq!(picked.cost, Cost::from(1));
        assert_eq!((picked.action)(), "one");
    }

    #[test]
    fn choice_ties_go_to_the_first() {
        let picked = choice(vec![
            Nt::new(Cost::from(1), || "first"),
            Nt::new(Cost::from(1), || "second"),
        ]);
        assert_eq!((picked.action)(), "first");
    }

    #[test]
    fn choice_of_nothing_is_infinite() {
        let picked: Nt<()> = choice(vec![]);
        assert_eq!(picked.cost, INFINITY);
    }

    #[test]
    fn matches_guards_literals() {
        assert_eq!(matches(&0, &0).cost, Cost::ZERO);
        assert_eq!(matches(&0, &1).cost, INFINITY);
        assert_eq!(matches(&'a', &'a').cost, Cost::ZERO);
        assert_eq!(
            matches(&String::from("x"), &String::from("y")).cost,
            INFINITY
        );
    }

    #[test]
    #[should_panic(expected = "no cover")]
    fn running_an_uncovered_action_panics() {
        let nt: Nt<i64> = infinity();
        (nt.action)();
    }
}
