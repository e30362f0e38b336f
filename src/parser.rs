//! Recursive-descent parser for the specification language.
//!
//! Declarations come in any order before `%%`; rules follow. The parser
//! resolves every variable's type tag on the spot: a type name is terminal
//! iff it is predeclared or `%term`-declared, nonterminal otherwise. It
//! also enforces the per-pattern variable-uniqueness invariant, so the
//! later stages can assume it.

use std::collections::HashSet;

use log::debug;
use smol_str::SmolStr;

use crate::error::BurgError;
use crate::lexer::{tokenize, Tok, Token};
use crate::spec::{Cost, Literal, Pattern, Rule, Spec, VarType};

/// identifiers that may not name a rule's left-hand side
const RESERVED: [&str; 5] = ["start", "term", "type", "head", "tail"];

pub fn parse(src: &str) -> Result<Spec, BurgError> {
    let tokens = tokenize(src)?;
    Parser::new(tokens).run()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    spec: Spec,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            spec: Spec::new(),
        }
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn line(&self) -> u32 {
        // at end of input, blame the last token's line
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|t| t.tok.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, want: &Tok) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn err(&self, msg: impl Into<String>) -> BurgError {
        BurgError::Syntax {
            line: self.line(),
            msg: msg.into(),
        }
    }

    fn expect(&mut self, want: &Tok, what: &str) -> Result<(), BurgError> {
        if self.eat(want) {
            Ok(())
        } else {
            Err(self.err(format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<SmolStr, BurgError> {
        match self.peek() {
            Some(Tok::Ident(_)) => {
                let Some(Tok::Ident(name)) = self.bump() else {
                    unreachable!()
                };
                Ok(name)
            }
            _ => Err(self.err(format!("expected {what}"))),
        }
    }

    fn expect_code(&mut self, what: &str) -> Result<String, BurgError> {
        match self.peek() {
            Some(Tok::Code(_)) => {
                let Some(Tok::Code(body)) = self.bump() else {
                    unreachable!()
                };
                Ok(body)
            }
            _ => Err(self.err(format!("expected {{: ... :}} {what}"))),
        }
    }

    fn run(mut self) -> Result<Spec, BurgError> {
        self.declarations()?;
        while self.peek().is_some() {
            let rule = self.rule()?;
            self.spec.rules.push(rule);
        }
        Ok(self.spec)
    }

    fn declarations(&mut self) -> Result<(), BurgError> {
        loop {
            match self.peek() {
                Some(Tok::Separator) => {
                    self.bump();
                    return Ok(());
                }
                Some(Tok::KwTerm) => {
                    self.bump();
                    let first = self.expect_ident("a terminal type name after %term")?;
                    debug!("%term {first}");
                    self.spec.terms.push(first);
                    while let Some(Tok::Ident(_)) = self.peek() {
                        let name = self.expect_ident("terminal type name")?;
                        debug!("%term {name}");
                        self.spec.terms.push(name);
                    }
                }
                Some(Tok::KwHead) => {
                    self.bump();
                    let body = self.expect_code("after %head")?;
                    self.spec.heads.push(body);
                }
                Some(Tok::KwTail) => {
                    self.bump();
                    let body = self.expect_code("after %tail")?;
                    self.spec.tails.push(body);
                }
                Some(Tok::KwType) => {
                    self.bump();
                    let name = self.expect_ident("a nonterminal name after %type")?;
                    let ty = self.expect_code("after %type name")?;
                    debug!("%type {name} = {ty}");
                    self.spec.types.insert(name, ty);
                }
                Some(_) => return Err(self.err("expected a declaration or %%")),
                None => return Err(self.err("missing %% separator")),
            }
        }
    }

    fn rule(&mut self) -> Result<Rule, BurgError> {
        let line = self.line();
        let lhs = self.expect_ident("a nonterminal to start a rule")?;
        if RESERVED.contains(&lhs.as_str()) {
            return Err(self.err(format!("'{lhs}' is reserved and cannot name a nonterminal")));
        }
        self.expect(&Tok::Colon, "':' after rule left-hand side")?;
        let pattern = self.pattern()?;
        let cost = if self.eat(&Tok::LBracket) {
            let cost = match self.bump() {
                Some(Tok::Int(n)) if u32::try_from(n).is_ok() => Cost::Int(n as u32),
                Some(Tok::Int(_)) => {
                    return Err(self.err("rule cost must be a non-negative 32-bit integer"))
                }
                Some(Tok::Code(body)) => Cost::Code(body),
                _ => return Err(self.err("expected an integer or code cost inside [ ]")),
            };
            self.expect(&Tok::RBracket, "']' after cost")?;
            cost
        } else {
            Cost::Int(0)
        };
        let action = self.expect_code("action to end the rule")?;

        let rule = Rule {
            lhs,
            pattern,
            cost,
            action,
            line,
        };
        self.check_distinct_vars(&rule)?;
        Ok(rule)
    }

    /// pattern ::= number | "string" | 'c' | id '(' pattern,... ')' | id ':' id | id
    fn pattern(&mut self) -> Result<Pattern, BurgError> {
        match self.bump() {
            Some(Tok::Int(n)) => Ok(Pattern::Literal(Literal::Int(n))),
            Some(Tok::Str(s)) => Ok(Pattern::Literal(Literal::Str(s))),
            Some(Tok::Char(c)) => Ok(Pattern::Literal(Literal::Char(c))),
            Some(Tok::Ident(name)) => {
                if self.eat(&Tok::LParen) {
                    let mut args = Vec::new();
                    if !self.eat(&Tok::RParen) {
                        loop {
                            args.push(self.pattern()?);
                            if self.eat(&Tok::Comma) {
                                continue;
                            }
                            self.expect(&Tok::RParen, "')' after constructor arguments")?;
                            break;
                        }
                    }
                    Ok(Pattern::Con(name, args))
                } else if self.eat(&Tok::Colon) {
                    let ty = self.expect_ident("a type name after ':'")?;
                    Ok(Pattern::Var(name, self.var_type(ty)))
                } else {
                    // bare id is sugar for id:id
                    let ty = self.var_type(name.clone());
                    Ok(Pattern::Var(name, ty))
                }
            }
            _ => Err(self.err("expected a pattern")),
        }
    }

    fn var_type(&self, name: SmolStr) -> VarType {
        if self.spec.is_terminal(&name) {
            VarType::Terminal(name)
        } else {
            VarType::Nonterm(name)
        }
    }

    fn check_distinct_vars(&self, rule: &Rule) -> Result<(), BurgError> {
        let mut seen = HashSet::new();
        for var in rule.pattern.free_vars() {
            if !seen.insert(var.clone()) {
                return Err(BurgError::DuplicateVariable {
                    line: rule.line,
                    lhs: rule.lhs.clone(),
                    var,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn parses_declarations_and_rules() {
        let spec = parse(indoc! {r#"
            %term addr
            %head {: use crate::ir::*; :}
            %type e {: i64 :}
            %tail {: // done :}
            %%
            e : ADD(x:e, y:e) [1] {: x + y :}
            e : CONST(x:int)  [1] {: x :}
        "#})
        .unwrap();
        assert_eq!(spec.terms, vec![SmolStr::new("addr")]);
        assert_eq!(spec.heads, vec!["use crate::ir::*;".to_string()]);
        assert_eq!(spec.tails, vec!["// done".to_string()]);
        assert_eq!(spec.types.get("e").map(String::as_str), Some("i64"));
        assert_eq!(spec.rules.len(), 2);
        assert_eq!(
            spec.rules[0].to_string(),
            "e: ADD(x:e, y:e) [1] {: x + y :}"
        );
    }

    #[test]
    fn bare_id_sugars_to_typed_var() {
        let spec = parse("%%\ns : e [1] {: e :}").unwrap();
        assert_eq!(
            spec.rules[0].pattern,
            Pattern::Var("e".into(), VarType::Nonterm("e".into()))
        );
        assert!(spec.rules[0].is_chain());
    }

    #[test]
    fn terminal_declaration_drives_type_tags() {
        let spec = parse("%term addr\n%%\ne : LOAD(a:addr) [1] {: a :}").unwrap();
        let Pattern::Con(_, args) = &spec.rules[0].pattern else {
            panic!("expected constructor pattern");
        };
        assert_eq!(
            args[0],
            Pattern::Var("a".into(), VarType::Terminal("addr".into()))
        );
    }

    #[test]
    fn predeclared_terminals_need_no_declaration() {
        let spec = parse("%%\ne : CONST(x:int) [1] {: x :}").unwrap();
        let Pattern::Con(_, args) = &spec.rules[0].pattern else {
            panic!("expected constructor pattern");
        };
        assert!(matches!(&args[0], Pattern::Var(_, VarType::Terminal(t)) if t == "int"));
    }

    #[test]
    fn nullary_constructor_is_not_a_variable() {
        let spec = parse("%%\ne : NIL() [1] {: 0 :}").unwrap();
        assert_eq!(spec.rules[0].pattern, Pattern::Con("NIL".into(), vec![]));
        assert_eq!(spec.to_string(), "e: NIL() [1] {: 0 :}\n");
    }

    #[test]
    fn cost_defaults_to_zero() {
        let spec = parse("%%\ne : NIL() {: 0 :}").unwrap();
        assert!(spec.rules[0].cost.is_zero());
    }

    #[test]
    fn dynamic_cost_is_kept_verbatim() {
        let spec = parse("%%\ne : CONST(x:int) [{: width(x) :}] {: x :}").unwrap();
        assert_eq!(spec.rules[0].cost, Cost::Code("width(x)".into()));
    }

    #[test]
    fn duplicate_variable_is_rejected() {
        let err = parse("%%\ne : ADD(x:e, x:e) [1] {: x :}").unwrap_err();
        assert!(matches!(err, BurgError::DuplicateVariable { ref var, .. } if var == "x"));
    }

    #[test]
    fn reserved_lhs_is_rejected() {
        assert!(parse("%%\ntype : NIL() [1] {: 0 :}").is_err());
    }

    #[test]
    fn missing_separator_is_rejected() {
        assert!(parse("%term t").is_err());
    }
}
