use smol_str::SmolStr;
use thiserror::Error;

/// Every way a specification can be rejected, as one tagged enum.
/// A failure aborts the current pipeline run; nothing is recovered locally.
#[derive(Debug, Error)]
pub enum BurgError {
    /// lexer or parser rejected the specification text
    #[error("line {line}: syntax error: {msg}")]
    Syntax { line: u32, msg: String },

    #[error("line {line}: variable '{var}' occurs twice in the pattern of rule '{lhs}'")]
    DuplicateVariable { line: u32, lhs: SmolStr, var: SmolStr },

    /// a rule's top-level pattern is a bare literal or bare terminal variable
    #[error("line {line}: rule '{lhs}' has no matchable top-level pattern: {what}")]
    IllFormedTopPattern { line: u32, lhs: SmolStr, what: String },

    #[error(
        "line {line}: constructor '{con}' used with signature {found}, \
         but earlier uses have signature {expected}"
    )]
    InconsistentConstructor {
        line: u32,
        con: SmolStr,
        expected: String,
        found: String,
    },

    /// two distinct (constructor, arity) pairs map to the same auxiliary name
    #[error(
        "auxiliary nonterminal '{aux}' would stand for both {first} and {second}; \
         rename one of the constructors"
    )]
    AuxiliaryClash {
        aux: SmolStr,
        first: String,
        second: String,
    },

    #[error("'{name}' is declared as a terminal type but also defined by a rule")]
    TerminalClash { name: SmolStr },

    #[error("line {line}: variable type '{name}' is neither a declared terminal nor any rule's left-hand side")]
    UndefinedNonterminal { line: u32, name: SmolStr },

    /// a chain-rule cycle with no positive literal cost would not terminate
    #[error("chain rules form a cycle with no positive cost: {cycle}")]
    ZeroCostChainCycle { cycle: String },

    #[error("write to output failed: {0}")]
    Io(#[from] std::io::Error),
}
