//! Abstract syntax of the Calc language.
//!
//! ```text
//! bop ::= + | - | * | /
//! E   ::= x | E bop E
//! S   ::= x=E
//! F   ::= f(x1, ..., xn){S;* return E;}
//! ```

use std::fmt;

use super::ir::Operator;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Exp {
    Var(String),
    BinOp {
        left: Box<Exp>,
        right: Box<Exp>,
        op: Operator,
    },
}

impl Exp {
    pub fn var(name: impl Into<String>) -> Self {
        Exp::Var(name.into())
    }

    pub fn binop(left: Exp, right: Exp, op: Operator) -> Self {
        Exp::BinOp {
            left: Box::new(left),
            right: Box::new(right),
            op,
        }
    }

    /// Number of operator applications in this expression.
    pub fn op_count(&self) -> usize {
        match self {
            Exp::Var(_) => 0,
            Exp::BinOp { left, right, .. } => 1 + left.op_count() + right.op_count(),
        }
    }

    /// Height of the operator tree; a lone variable has depth 0.
    ///
    /// Walks with an explicit stack so arbitrarily deep trees can be
    /// measured before any recursive pass touches them.
    pub fn depth(&self) -> usize {
        let mut deepest = 0usize;
        let mut pending: Vec<(&Exp, usize)> = vec![(self, 0)];
        while let Some((exp, depth)) = pending.pop() {
            match exp {
                Exp::Var(_) => deepest = deepest.max(depth),
                Exp::BinOp { left, right, .. } => {
                    pending.push((left.as_ref(), depth + 1));
                    pending.push((right.as_ref(), depth + 1));
                }
            }
        }
        deepest
    }

    /// Variables read by this expression, left to right, with repeats.
    pub fn reads(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_reads(&mut out);
        out
    }

    fn collect_reads<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Exp::Var(name) => out.push(name),
            Exp::BinOp { left, right, .. } => {
                left.collect_reads(out);
                right.collect_reads(out);
            }
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent: Operator, right: bool) -> fmt::Result {
        match self {
            Exp::BinOp { op, .. }
                if op.precedence() < parent.precedence()
                    || (right && op.precedence() == parent.precedence()) =>
            {
                write!(f, "({})", self)
            }
            _ => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exp::Var(name) => f.write_str(name),
            Exp::BinOp { left, right, op } => {
                left.fmt_operand(f, *op, false)?;
                write!(f, "{}", op)?;
                right.fmt_operand(f, *op, true)
            }
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
            Stm::Assign { target, value } => write!(f, "{}={}", target, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stm>,
    pub ret: Exp,
}

impl Function {
    pub fn new(name: impl Into<String>, params: &[&str], body: Vec<Stm>, ret: Exp) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body,
            ret,
        }
    }

    /// The returned variable, when the return expression is a bare name.
    pub fn return_var(&self) -> Option<&str> {
        match &self.ret {
            Exp::Var(name) => Some(name),
            Exp::BinOp { .. } => None,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}){{", self.name, self.params.join(", "))?;
        for stm in &self.body {
            write!(f, "{}; ", stm)?;
        }
        write!(f, "return {};}}", self.ret)
    }
}

/// `f(s1, s2, t1, t2){z=(s1+t1)*(s2+t2); z=z*s1; return z;}`
pub fn sample_function() -> Function {
    Function::new(
        "f",
        &["s1", "s2", "t1", "t2"],
        vec![
            Stm::assign(
                "z",
                Exp::binop(
                    Exp::binop(Exp::var("s1"), Exp::var("t1"), Operator::Add),
                    Exp::binop(Exp::var("s2"), Exp::var("t2"), Operator::Add),
                    Operator::Mul,
                ),
            ),
            Stm::assign("z", Exp::binop(Exp::var("z"), Exp::var("s1"), Operator::Mul)),
        ],
        Exp::var("z"),
    )
}
