// File: src/ast.rs
//
// Abstract syntax tree produced by the parser and consumed by the
// compiler. `Expr::canonical_text` is the "operator-preserving
// pretty-print" spec.md's cross-run memoization hashes (§4.2.4); it must
// be stable across otherwise-irrelevant whitespace/formatting changes
// but change whenever anything semantically meaningful in the function
// body changes.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(i64),
    Boolean(bool),
    String(String),
    Identifier(String),
    Array(Vec<Expr>),
    Index { left: Box<Expr>, index: Box<Expr> },
    Unary { op: String, right: Box<Expr> },
    Infix { op: String, left: Box<Expr>, right: Box<Expr> },
    Ternary { condition: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Function(Box<FunctionLiteral>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    pub params: Vec<String>,
    pub param_types: Vec<Option<String>>,
    pub body: Block,
    pub hope: Option<HopeBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HopeBlock {
    pub cases: Vec<HopeCase>,
    pub n_fuzz: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HopeCase {
    pub args: Vec<Expr>,
    pub expected: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Define { name: String, value: Expr },
    Assign { name: String, value: Expr },
    Expr(Expr),
    If { arms: Vec<(Expr, Block)>, else_block: Option<Block> },
    While { condition: Expr, body: Block },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Integer(n) => write!(f, "{n}"),
            Expr::Boolean(b) => write!(f, "{b}"),
            Expr::String(s) => write!(f, "{s:?}"),
            Expr::Identifier(name) => write!(f, "{name}"),
            Expr::Array(elements) => {
                write!(f, "[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
            Expr::Index { left, index } => write!(f, "{left}[{index}]"),
            Expr::Unary { op, right } => write!(f, "{op}{right}"),
            Expr::Infix { op, left, right } => write!(f, "{left}{op}{right}"),
            Expr::Ternary { condition, then_expr, else_expr } => {
                write!(f, "{condition} ? {then_expr} : {else_expr}")
            }
            Expr::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i != 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expr::Function(func) => write!(f, "{func}"),
        }
    }
}

impl fmt::Display for FunctionLiteral {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "func({}){}", self.params.join(","), self.body)?;
        if let Some(hope) = &self.hope {
            write!(f, " {hope}")?;
        }
        Ok(())
    }
}

impl fmt::Display for HopeBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "hope {{")?;
        for case in &self.cases {
            writeln!(f, "{case}")?;
        }
        if let Some(n) = self.n_fuzz {
            writeln!(f, "fuzzing {n}")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for HopeCase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        write!(f, "{} -> {}", args.join(","), self.expected)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{{")?;
        for stmt in &self.statements {
            writeln!(f, "{stmt}")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stmt::Define { name, value } => write!(f, "{name}:={value}"),
            Stmt::Assign { name, value } => write!(f, "{name}={value}"),
            Stmt::Expr(e) => write!(f, "{e}"),
            Stmt::If { arms, else_block } => {
                for (i, (cond, block)) in arms.iter().enumerate() {
                    if i == 0 {
                        write!(f, "if {cond}{block}")?;
                    } else {
                        write!(f, "else if {cond}{block}")?;
                    }
                }
                if let Some(block) = else_block {
                    write!(f, "else{block}")?;
                }
                Ok(())
            }
            Stmt::While { condition, body } => write!(f, "while {condition}{body}"),
        }
    }
}

impl Expr {
    /// Canonical textual form used as the hash-log digest input (§4.2.4).
    /// This is simply `Display`, preserved as a named entry point so the
    /// compiler's call site reads as an intentional contract rather than
    /// an incidental reuse of `Display`.
    pub fn canonical_text(&self) -> String {
        self.to_string()
    }
}

impl FunctionLiteral {
    /// Canonical textual form hashed for cross-run memoization
    /// (§4.2.4). Includes the hope block itself: a hope case changing
    /// while the body stays put should still re-trigger verification.
    pub fn canonical_text(&self) -> String {
        self.to_string()
    }
}
