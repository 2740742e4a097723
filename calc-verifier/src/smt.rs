//! Terms and formulas handed to the oracle.
//!
//! Only what the encoder needs: uninterpreted sorts, constants, function
//! applications, equality and the boolean connectives of the validity goal.
//! `Display` gives a compact infix form for diagnostics; SMT-LIB2 text is
//! produced by the `write_smtlib` methods.

use std::fmt::{self, Write};

/// Writes `name` as a quoted SMT-LIB symbol, so program identifiers such as
/// `let` or `true` never read as reserved words or theory symbols.
pub(crate) fn write_symbol(out: &mut String, name: &str) {
    out.push('|');
    out.push_str(name);
    out.push('|');
}

pub(crate) fn quoted(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    write_symbol(&mut out, name);
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sort {
    name: String,
}

impl Sort {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSymbol {
    name: String,
    domain: Vec<Sort>,
    range: Sort,
}

impl FunctionSymbol {
    pub(crate) fn new(name: impl Into<String>, domain: Vec<Sort>, range: Sort) -> Self {
        Self {
            name: name.into(),
            domain,
            range,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &[Sort] {
        &self.domain
    }

    pub fn range(&self) -> &Sort {
        &self.range
    }

    pub fn apply(&self, args: Vec<Term>) -> Term {
        debug_assert_eq!(args.len(), self.domain.len(), "arity of {}", self.name);
        Term::App {
            func: self.clone(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Const { name: String, sort: Sort },
    App { func: FunctionSymbol, args: Vec<Term> },
}

impl Term {
    pub fn sort(&self) -> &Sort {
        match self {
            Term::Const { sort, .. } => sort,
            Term::App { func, .. } => func.range(),
        }
    }

    pub fn eq(&self, other: &Term) -> Formula {
        Formula::Eq(self.clone(), other.clone())
    }

    pub fn write_smtlib(&self, out: &mut String) {
        match self {
            Term::Const { name, .. } => write_symbol(out, name),
            Term::App { func, args } => {
                out.push('(');
                write_symbol(out, func.name());
                for arg in args {
                    out.push(' ');
                    arg.write_smtlib(out);
                }
                out.push(')');
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Const { name, .. } => f.write_str(name),
            Term::App { func, args } => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    Eq(Term, Term),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn not(f: Formula) -> Self {
        Formula::Not(Box::new(f))
    }

    pub fn and(fs: impl IntoIterator<Item = Formula>) -> Self {
        Formula::And(fs.into_iter().collect())
    }

    pub fn implies(antecedent: Formula, consequent: Formula) -> Self {
        Formula::Implies(Box::new(antecedent), Box::new(consequent))
    }

    pub fn write_smtlib(&self, out: &mut String) {
        match self {
            Formula::Eq(a, b) => {
                out.push_str("(= ");
                a.write_smtlib(out);
                out.push(' ');
                b.write_smtlib(out);
                out.push(')');
            }
            Formula::Not(inner) => {
                out.push_str("(not ");
                inner.write_smtlib(out);
                out.push(')');
            }
            // `and` needs two arguments in strict SMT-LIB
            Formula::And(fs) => match fs.as_slice() {
                [] => out.push_str("true"),
                [single] => single.write_smtlib(out),
                _ => {
                    out.push_str("(and");
                    for f in fs {
                        out.push(' ');
                        f.write_smtlib(out);
                    }
                    out.push(')');
                }
            },
            Formula::Implies(a, b) => {
                out.push_str("(=> ");
                a.write_smtlib(out);
                out.push(' ');
                b.write_smtlib(out);
                out.push(')');
            }
        }
    }

    pub fn to_smtlib(&self) -> String {
        let mut out = String::new();
        self.write_smtlib(&mut out);
        out
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Eq(a, b) => write!(f, "{} == {}", a, b),
            Formula::Not(inner) => write!(f, "Not({})", inner),
            Formula::And(fs) => {
                f.write_str("And(")?;
                for (i, conj) in fs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", conj)?;
                }
                f.write_char(')')
            }
            Formula::Implies(a, b) => write!(f, "Implies({}, {})", a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(name: &str) -> Term {
        Term::Const {
            name: name.to_string(),
            sort: Sort::new("S"),
        }
    }

    #[test]
    fn renders_infix_and_smtlib() {
        let s = Sort::new("S");
        let add = FunctionSymbol::new("f_add", vec![s.clone(), s.clone()], s);
        let x = constant("x");
        let sum = add.apply(vec![constant("a"), constant("b")]);
        let goal = Formula::not(Formula::implies(
            Formula::and([x.eq(&sum)]),
            x.eq(&constant("y")),
        ));

        assert_eq!(goal.to_string(), "Not(Implies(And(x == f_add(a, b)), x == y))");
        assert_eq!(goal.to_smtlib(), "(not (=> (= |x| (|f_add| |a| |b|)) (= |x| |y|)))");
    }

    #[test]
    fn empty_conjunction_is_true() {
        assert_eq!(Formula::and(Vec::new()).to_smtlib(), "true");
        let two = Formula::and([constant("a").eq(&constant("b")), constant("b").eq(&constant("c"))]);
        assert_eq!(two.to_smtlib(), "(and (= |a| |b|) (= |b| |c|))");
    }
}
