//! rustburg: a code-generator generator in the BURG tradition.
//!
//! A specification maps tree patterns to costed, user-supplied actions:
//!
//! %%
//! e : ADD(x:e, y:e) [1] {: x + y :}
//! e : CONST(x:int)  [1] {: x :}
//!
//! From it, rustburg emits a Rust module implementing a bottom-up
//! dynamic-programming matcher: one constructor routine per pattern
//! constructor, one update routine per nonterminal, and a record holding
//! the cheapest cover found for each nonterminal. A client builds its
//! subject tree by calling the constructor routines bottom-up and reads
//! the winning actions out of the record; the emitted module runs against
//! [`runtime`].
//!
//! The pipeline is pure and single-threaded:
//!
//! parse -> normalise -> type -> group -> generate -> render

pub mod code;
pub mod error;
pub mod gen;
pub mod group;
pub mod lexer;
pub mod mangle;
pub mod norm;
pub mod parser;
pub mod runtime;
pub mod spec;
pub mod typer;

use error::BurgError;
use spec::Rule;

/// Compile a specification source to emitted Rust text.
pub fn compile(src: &str) -> Result<String, BurgError> {
    let spec = parser::parse(src)?;
    let rules = norm::normalize(&spec.rules)?;
    let sigs = typer::infer(&rules)?;
    let grouped = group::group(&spec, &rules)?;
    Ok(code::render(&gen::generate(&spec, &grouped, &sigs)))
}

/// Parse and normalise only; what `rburg --norm` prints.
pub fn normalised(src: &str) -> Result<Vec<Rule>, BurgError> {
    let spec = parser::parse(src)?;
    let rules = norm::normalize(&spec.rules)?;
    // surface the same rejections compilation would
    typer::infer(&rules)?;
    group::group(&spec, &rules)?;
    Ok(rules)
}
