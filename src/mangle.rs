//! Identifier mangling for the emitted target.
//!
//! Specification names are freer than Rust identifiers: `e'` is a fine
//! nonterminal, and nothing stops a user calling one `match`. Emitted
//! field and routine names go through `mangle` so the generated module
//! compiles regardless. Names beginning with `_` are auxiliary
//! nonterminals minted by the normaliser and pass through untouched --
//! sorting and field naming must agree with the core's view of them.

use smol_str::SmolStr;

/// Rust keywords, current and reserved.
const KEYWORDS: [&str; 51] = [
    "as", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern", "false", "fn",
    "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe",
    "use", "where", "while", "async", "await", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

pub fn mangle(name: &str) -> SmolStr {
    if name.starts_with('_') {
        return SmolStr::new(name);
    }
    let cleaned: String = name
        .chars()
        .map(|c| if c == '\'' { '_' } else { c })
        .collect();
    if KEYWORDS.contains(&cleaned.as_str()) {
        SmolStr::new(format!("{cleaned}_"))
    } else {
        SmolStr::new(cleaned)
    }
}
