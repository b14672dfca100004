#![forbid(unsafe_code)]

use std::fmt;

/// A declared name (parameter or definition id).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sym {
    pub id: String,
}

impl Sym {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    SymRef(String),
    Literal { value: String, ty: String },
    OffsetLiteral(String),
    AxisLiteral(String),
    FunCall { fun: Box<Expr>, args: Vec<Expr> },
    Lambda { params: Vec<Sym>, expr: Box<Expr> },
}

impl Expr {
    pub fn sym_ref(id: impl Into<String>) -> Self {
        Expr::SymRef(id.into())
    }

    pub fn call(fun: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::FunCall {
            fun: Box::new(Expr::SymRef(fun.into())),
            args,
        }
    }

    pub fn lambda(params: Vec<Sym>, expr: Expr) -> Self {
        Expr::Lambda {
            params,
            expr: Box::new(expr),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDefinition {
    pub id: String,
    pub params: Vec<Sym>,
    pub expr: Expr,
}

/// One stencil application: `output <- stencil(inputs)` over `domain`.
#[derive(Clone, Debug, PartialEq)]
pub struct StencilClosure {
    pub domain: Expr,
    pub stencil: Expr,
    pub output: Expr,
    pub inputs: Vec<Expr>,
}

/// Closure-free program: every function it references is listed in
/// `function_definitions`.
#[derive(Clone, Debug, PartialEq)]
pub struct FencilDefinition {
    pub id: String,
    pub function_definitions: Vec<FunctionDefinition>,
    pub params: Vec<Sym>,
    pub closures: Vec<StencilClosure>,
}

impl FencilDefinition {
    /// Last definition with the given id; later duplicates shadow earlier ones.
    pub fn function(&self, id: &str) -> Option<&FunctionDefinition> {
        self.function_definitions.iter().rev().find(|f| f.id == id)
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::SymRef(id) => f.write_str(id),
            Expr::Literal { value, ty } => write!(f, "{value}:{ty}"),
            Expr::OffsetLiteral(v) => write!(f, "{v}ₒ"),
            Expr::AxisLiteral(v) => write!(f, "{v}ₐ"),
            Expr::FunCall { fun, args } => {
                write!(f, "{fun}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Lambda { params, expr } => {
                f.write_str("λ(")?;
                write_list(f, params)?;
                write!(f, ") → {expr}")
            }
        }
    }
}

impl fmt::Display for FunctionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = λ(", self.id)?;
        write_list(f, &self.params)?;
        write!(f, ") → {};", self.expr)
    }
}

impl fmt::Display for StencilClosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ← ({})(", self.output, self.stencil)?;
        write_list(f, &self.inputs)?;
        write!(f, ") @ {};", self.domain)
    }
}

impl fmt::Display for FencilDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for def in &self.function_definitions {
            writeln!(f, "{def}")?;
        }
        write!(f, "{}(", self.id)?;
        write_list(f, &self.params)?;
        writeln!(f, ") {{")?;
        for closure in &self.closures {
            writeln!(f, "  {closure}")?;
        }
        f.write_str("}")
    }
}
