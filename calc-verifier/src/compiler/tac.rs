//! Abstract syntax of the Tac (three-address code) language.
//!
//! ```text
//! S ::= x=y | x=y+z | x=y-z | x=y*z | x=y/z
//! F ::= f(x1, ..., xn){S;* return x;}
//! ```
//!
//! Operands of a binary operation are names, so nested expressions cannot be
//! built.

use std::fmt;

use super::ir::Operator;

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Exp {
    Var(String),
    BinOp {
        left: String,
        right: String,
        op: Operator,
    },
}

impl Exp {
    pub fn var(name: impl Into<String>) -> Self {
        Exp::Var(name.into())
    }

    pub fn binop(left: impl Into<String>, right: impl Into<String>, op: Operator) -> Self {
        Exp::BinOp {
            left: left.into(),
            right: right.into(),
            op,
        }
    }

    pub fn reads(&self) -> Vec<&str> {
        match self {
            Exp::Var(name) => vec![name],
            Exp::BinOp { left, right, .. } => vec![left, right],
        }
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exp::Var(name) => f.write_str(name),
            Exp::BinOp { left, right, op } => write!(f, "{} {} {}", left, op, right),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stm {
    Assign { target: String, value: Exp },
}

impl Stm {
    pub fn assign(target: impl Into<String>, value: Exp) -> Self {
        Stm::Assign {
            target: target.into(),
            value,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Stm::Assign { target, .. } => target,
        }
    }

    pub fn value(&self) -> &Exp {
        match self {
            Stm::Assign { value, .. } => value,
        }
    }
}

impl fmt::Display for Stm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stm::Assign { target, value } => write!(f, "{} = {}", target, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stm>,
    pub ret: String,
}

impl Function {
    pub fn new(name: impl Into<String>, params: &[&str], body: Vec<Stm>, ret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body,
            ret: ret.into(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}({}){{", self.name, self.params.join(", "))?;
        for stm in &self.body {
            writeln!(f, "{}{};", INDENT, stm)?;
        }
        writeln!(f, "{}return {};", INDENT, self.ret)?;
        f.write_str("}")
    }
}

/// The hand-written three-address version of the Calc sample.
pub fn sample_function() -> Function {
    Function::new(
        "f",
        &["s1", "s2", "t1", "t2"],
        vec![
            Stm::assign("a", Exp::binop("s1", "t1", Operator::Add)),
            Stm::assign("b", Exp::binop("s2", "t2", Operator::Add)),
            Stm::assign("c", Exp::binop("a", "b", Operator::Mul)),
            Stm::assign("b", Exp::binop("c", "s1", Operator::Mul)),
            Stm::assign("z", Exp::var("b")),
        ],
        "z",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_sample() {
        assert_eq!(
            sample_function().to_string(),
            "f(s1, s2, t1, t2){
    a = s1 + t1;
    b = s2 + t2;
    c = a * b;
    b = c * s1;
    z = b;
    return z;
}"
        );
    }

    #[test]
    fn prints_empty_body() {
        let f = Function::new("id", &["x"], vec![], "x");
        assert_eq!(f.to_string(), "id(x){\n    return x;\n}");
    }
}
