#![forbid(unsafe_code)]

//! Iterator IR: the closure-free form programs are lowered to before
//! execution.

mod ir;

pub use ir::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str) -> FunctionDefinition {
        FunctionDefinition {
            id: id.to_string(),
            params: vec![Sym::new("a")],
            expr: Expr::call("deref", vec![Expr::sym_ref("a")]),
        }
    }

    #[test]
    fn function_definition_display() {
        assert_eq!(identity("copy").to_string(), "copy = λ(a) → deref(a);");
    }

    #[test]
    fn fencil_display_lists_definitions_then_closures() {
        let fencil = FencilDefinition {
            id: "prog".to_string(),
            function_definitions: vec![identity("copy")],
            params: vec![Sym::new("inp"), Sym::new("out")],
            closures: vec![StencilClosure {
                domain: Expr::call("cartesian_domain", vec![Expr::AxisLiteral("I".into())]),
                stencil: Expr::sym_ref("copy"),
                output: Expr::sym_ref("out"),
                inputs: vec![Expr::sym_ref("inp")],
            }],
        };
        let text = fencil.to_string();
        assert!(text.starts_with("copy = λ(a) → deref(a);\nprog(inp, out) {\n"));
        assert!(text.contains("out ← (copy)(inp) @ cartesian_domain(Iₐ);"));
        assert!(text.ends_with('}'));
    }

    #[test]
    fn later_duplicate_definition_shadows_earlier() {
        let mut second = identity("copy");
        second.params.push(Sym::new("b"));
        let fencil = FencilDefinition {
            id: "prog".to_string(),
            function_definitions: vec![identity("copy"), second.clone()],
            params: vec![],
            closures: vec![],
        };
        assert_eq!(fencil.function("copy"), Some(&second));
        assert_eq!(fencil.function("missing"), None);
    }
}
