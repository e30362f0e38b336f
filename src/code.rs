//! The abstract tree of emitted code, and its renderer.
//!
//! The generator builds `Item`s instead of pushing strings, so emission
//! order and layout are decided in exactly one place. Rendering is purely
//! syntax-directed: equal trees render to byte-identical text, which is
//! what makes whole-program emission reproducible.
//!
//! The tree is deliberately no richer than the generator needs. User code
//! fragments (heads, tails, actions, dynamic costs) travel through it as
//! raw text and are never parsed.

use string_builder::Builder;

const INDENT: &str = "    ";

fn pad(n: usize) -> String {
    INDENT.repeat(n)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// verbatim fragment: a variable, a literal, user code
    Raw(String),
    Field(Box<Expr>, String),
    Call(String, Vec<Expr>),
    /// operands joined with ` + `
    Sum(Vec<Expr>),
    /// `a >= b`
    Ge(Box<Expr>, Box<Expr>),
    /// `Name { field: expr, ... }`
    Record(String, Vec<(String, Expr)>),
    /// `vec![...]`
    VecOf(Vec<Expr>),
    /// `{ let cap = ...; Rc::new(move || { let bind = ...; body }) }`
    Thunk {
        captures: Vec<(String, Expr)>,
        binds: Vec<(String, Expr)>,
        body: String,
    },
}

impl Expr {
    pub fn raw(s: impl Into<String>) -> Expr {
        Expr::Raw(s.into())
    }

    pub fn field(base: Expr, name: impl Into<String>) -> Expr {
        Expr::Field(Box::new(base), name.into())
    }

    fn render(&self, ind: usize) -> String {
        match self {
            Expr::Raw(s) => s.clone(),
            Expr::Field(base, name) => format!("{}.{name}", base.render(ind)),
            Expr::Ge(a, b) => format!("{} >= {}", a.render(ind), b.render(ind)),
            Expr::Sum(xs) => xs
                .iter()
                .map(|x| x.render(ind))
                .collect::<Vec<_>>()
                .join(" + "),
            Expr::Call(callee, args) => {
                let rendered: Vec<String> = args.iter().map(|a| a.render(ind + 1)).collect();
                let oneline = rendered.iter().all(|r| !r.contains('\n'))
                    && rendered.iter().map(String::len).sum::<usize>() < 60;
                if oneline {
                    format!("{callee}({})", rendered.join(", "))
                } else {
                    let mut s = format!("{callee}(\n");
                    for r in rendered {
                        s.push_str(&format!("{}{r},\n", pad(ind + 1)));
                    }
                    s.push_str(&format!("{})", pad(ind)));
                    s
                }
            }
            Expr::Record(name, fields) => {
                let mut s = format!("{name} {{\n");
                for (field, value) in fields {
                    s.push_str(&format!(
                        "{}{field}: {},\n",
                        pad(ind + 1),
                        value.render(ind + 1)
                    ));
                }
                s.push_str(&format!("{}}}", pad(ind)));
                s
            }
            Expr::VecOf(items) => {
                let mut s = String::from("vec![\n");
                for item in items {
                    s.push_str(&format!("{}{},\n", pad(ind + 1), item.render(ind + 1)));
                }
                s.push_str(&format!("{}]", pad(ind)));
                s
            }
            Expr::Thunk {
                captures,
                binds,
                body,
            } => {
                let closure = if binds.is_empty() && !body.contains('\n') {
                    format!("Rc::new(move || {body})")
                } else {
                    let inner_ind = if captures.is_empty() { ind } else { ind + 1 };
                    let mut s = String::from("Rc::new(move || {\n");
                    for (name, value) in binds {
                        s.push_str(&format!(
                            "{}let {name} = {};\n",
                            pad(inner_ind + 1),
                            value.render(inner_ind + 1)
                        ));
                    }
                    s.push_str(&format!("{}{body}\n", pad(inner_ind + 1)));
                    s.push_str(&format!("{}}})", pad(inner_ind)));
                    s
                };
                if captures.is_empty() {
                    closure
                } else {
                    let mut s = String::from("{\n");
                    for (name, value) in captures {
                        s.push_str(&format!(
                            "{}let {name} = {};\n",
                            pad(ind + 1),
                            value.render(ind + 1)
                        ));
                    }
                    s.push_str(&format!("{}{closure}\n", pad(ind + 1)));
                    s.push_str(&format!("{}}}", pad(ind)));
                    s
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let <pat> = <expr>;`
    Let(String, Expr),
    /// `if <cond> { return <expr>; }`
    GuardReturn(Expr, Expr),
    /// trailing expression of the function
    Value(Expr),
    /// verbatim line
    Raw(String),
}

impl Stmt {
    fn render(&self, ind: usize) -> String {
        match self {
            Stmt::Let(pat, expr) => {
                format!("{}let {pat} = {};\n", pad(ind), expr.render(ind))
            }
            Stmt::GuardReturn(cond, value) => {
                let mut s = format!("{}if {} {{\n", pad(ind), cond.render(ind));
                s.push_str(&format!("{}return {};\n", pad(ind + 1), value.render(ind + 1)));
                s.push_str(&format!("{}}}\n", pad(ind)));
                s
            }
            Stmt::Value(expr) => format!("{}{}\n", pad(ind), expr.render(ind)),
            Stmt::Raw(line) => format!("{}{line}\n", pad(ind)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// verbatim text: head and tail fragments, fixed preludes
    Raw(String),
    Struct {
        name: String,
        params: Vec<String>,
        fields: Vec<(String, String)>,
    },
    /// a hand-rolled Clone impl, so type parameters need not be Clone
    CloneImpl {
        name: String,
        params: Vec<String>,
        fields: Vec<String>,
    },
    Fn {
        name: String,
        generics: Vec<String>,
        params: Vec<(String, String)>,
        ret: String,
        body: Vec<Stmt>,
    },
}

fn angle(params: &[String]) -> String {
    if params.is_empty() {
        String::new()
    } else {
        format!("<{}>", params.join(", "))
    }
}

impl Item {
    fn render(&self) -> String {
        match self {
            Item::Raw(text) => {
                let mut s = text.clone();
                if !s.ends_with('\n') {
                    s.push('\n');
                }
                s
            }
            Item::Struct {
                name,
                params,
                fields,
            } => {
                let mut s = format!("pub struct {name}{} {{\n", angle(params));
                for (field, ty) in fields {
                    s.push_str(&format!("{INDENT}pub {field}: {ty},\n"));
                }
                s.push_str("}\n");
                s
            }
            Item::CloneImpl {
                name,
                params,
                fields,
            } => {
                let generics = angle(params);
                let mut s = format!("impl{generics} Clone for {name}{generics} {{\n");
                s.push_str(&format!("{INDENT}fn clone(&self) -> Self {{\n"));
                s.push_str(&format!("{}{name} {{\n", pad(2)));
                for field in fields {
                    s.push_str(&format!("{}{field}: self.{field}.clone(),\n", pad(3)));
                }
                s.push_str(&format!("{}}}\n", pad(2)));
                s.push_str(&format!("{INDENT}}}\n"));
                s.push_str("}\n");
                s
            }
            Item::Fn {
                name,
                generics,
                params,
                ret,
                body,
            } => {
                let args: Vec<String> = params
                    .iter()
                    .map(|(p, ty)| format!("{p}: {ty}"))
                    .collect();
                let mut s = format!(
                    "pub fn {name}{}({}) -> {ret} {{\n",
                    angle(generics),
                    args.join(", ")
                );
                for stmt in body {
                    s.push_str(&stmt.render(1));
                }
                s.push_str("}\n");
                s
            }
        }
    }
}

/// Render the whole emitted program, items separated by a blank line.
pub fn render(items: &[Item]) -> String {
    let mut builder = Builder::default();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            builder.append("\n");
        }
        builder.append(item.render());
    }
    builder.string().unwrap_or_default()
}
