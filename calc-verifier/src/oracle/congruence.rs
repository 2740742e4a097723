//! In-process EUF decision procedure by congruence closure.
//!
//! Handles conjunctions of equality and disequality literals, after pushing
//! negations through `Not`, `And` and `Implies` where the result stays
//! conjunctive. Translation validation queries always have that shape:
//! `Not(Implies(And(defs), r1 == r2))` is `defs ∧ r1 ≠ r2`. Anything that
//! would need case splitting is answered `Unknown`.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::{CheckResult, Model, Oracle, Script};
use crate::error::OracleError;
use crate::smt::{Formula, Term};

#[derive(Debug, Default, Clone, Copy)]
pub struct CongruenceOracle;

impl CongruenceOracle {
    pub fn new() -> Self {
        Self
    }

    /// Decides the conjunction of `assertions` synchronously.
    pub fn decide(assertions: &[Formula]) -> CheckResult {
        let mut literals = Literals::default();
        for assertion in assertions {
            if let Err(shape) = literals.collect(assertion, true) {
                return CheckResult::Unknown(format!("not a conjunction of literals: {}", shape));
            }
        }
        if literals.contradiction {
            return CheckResult::Unsat;
        }

        let mut graph = TermGraph::default();
        let equalities: Vec<(usize, usize)> = literals
            .equalities
            .iter()
            .map(|(a, b)| (graph.intern(a), graph.intern(b)))
            .collect();
        let disequalities: Vec<(usize, usize)> = literals
            .disequalities
            .iter()
            .map(|(a, b)| (graph.intern(a), graph.intern(b)))
            .collect();

        for (a, b) in equalities {
            graph.classes.union(a, b);
        }
        graph.close();

        for (a, b) in disequalities {
            if graph.classes.find(a) == graph.classes.find(b) {
                return CheckResult::Unsat;
            }
        }

        CheckResult::Sat(graph.model())
    }
}

#[async_trait]
impl Oracle for CongruenceOracle {
    fn name(&self) -> &str {
        "congruence"
    }

    /// Runs [`CongruenceOracle::decide`] on the blocking pool, so a caller's
    /// timeout can give up on a large query. The abandoned closure still runs
    /// to completion in the background.
    async fn check(&self, script: &Script) -> Result<CheckResult, OracleError> {
        let assertions = script.assertions().to_vec();
        let result = tokio::task::spawn_blocking(move || Self::decide(&assertions)).await?;
        debug!(oracle = self.name(), ?result, "congruence closure finished");
        Ok(result)
    }
}

#[derive(Default)]
struct Literals<'a> {
    equalities: Vec<(&'a Term, &'a Term)>,
    disequalities: Vec<(&'a Term, &'a Term)>,
    // an empty conjunction was asserted false
    contradiction: bool,
}

impl<'a> Literals<'a> {
    fn collect(&mut self, formula: &'a Formula, positive: bool) -> Result<(), String> {
        match (formula, positive) {
            (Formula::Eq(a, b), true) => self.equalities.push((a, b)),
            (Formula::Eq(a, b), false) => self.disequalities.push((a, b)),
            (Formula::Not(inner), _) => self.collect(inner, !positive)?,
            (Formula::And(conjuncts), true) => {
                for conjunct in conjuncts {
                    self.collect(conjunct, true)?;
                }
            }
            (Formula::And(conjuncts), false) => match conjuncts.as_slice() {
                [] => self.contradiction = true,
                [single] => self.collect(single, false)?,
                _ => return Err(format!("Not({})", formula)),
            },
            (Formula::Implies(antecedent, consequent), false) => {
                self.collect(antecedent, true)?;
                self.collect(consequent, false)?;
            }
            (Formula::Implies(..), true) => return Err(formula.to_string()),
        }
        Ok(())
    }
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn push(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        self.rank.push(0);
        id
    }

    fn find(&mut self, x: usize) -> usize {
        let p = self.parent[x];
        if p == x {
            return x;
        }
        let root = self.find(p);
        self.parent[x] = root;
        root
    }

    /// Returns `true` when two distinct classes were merged.
    fn union(&mut self, x: usize, y: usize) -> bool {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return false;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => self.parent[rx] = ry,
            std::cmp::Ordering::Greater => self.parent[ry] = rx,
            std::cmp::Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Node {
    Const { name: String, sort: String },
    App { func: String, args: Vec<usize> },
}

struct TermGraph {
    nodes: Vec<Node>,
    ids: HashMap<Node, usize>,
    classes: UnionFind,
}

impl Default for TermGraph {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            ids: HashMap::new(),
            classes: UnionFind {
                parent: Vec::new(),
                rank: Vec::new(),
            },
        }
    }
}

impl TermGraph {
    fn intern(&mut self, term: &Term) -> usize {
        let node = match term {
            Term::Const { name, sort } => Node::Const {
                name: name.clone(),
                sort: sort.name().to_string(),
            },
            Term::App { func, args } => Node::App {
                func: func.name().to_string(),
                args: args.iter().map(|a| self.intern(a)).collect(),
            },
        };
        if let Some(&id) = self.ids.get(&node) {
            return id;
        }
        let id = self.classes.push();
        self.nodes.push(node.clone());
        self.ids.insert(node, id);
        id
    }

    fn signature(&mut self, id: usize) -> Option<(String, Vec<usize>)> {
        let Node::App { func, args } = &self.nodes[id] else {
            return None;
        };
        let func = func.clone();
        let args = args.clone();
        let roots = args.iter().map(|&a| self.classes.find(a)).collect();
        Some((func, roots))
    }

    // merge applications whose arguments are pairwise equal; only the users
    // of an absorbed class need a second look
    fn close(&mut self) {
        let apps: Vec<usize> = (0..self.nodes.len())
            .filter(|&id| matches!(self.nodes[id], Node::App { .. }))
            .collect();

        let mut uses: HashMap<usize, Vec<usize>> = HashMap::new();
        for &id in &apps {
            if let Node::App { args, .. } = &self.nodes[id] {
                for &arg in args {
                    let root = self.classes.find(arg);
                    uses.entry(root).or_default().push(id);
                }
            }
        }

        let mut signatures: HashMap<(String, Vec<usize>), usize> = HashMap::new();
        let mut pending = apps;
        while let Some(id) = pending.pop() {
            let Some(signature) = self.signature(id) else {
                continue;
            };
            match signatures.get(&signature) {
                Some(&other) => {
                    let a = self.classes.find(other);
                    let b = self.classes.find(id);
                    if self.classes.union(a, b) {
                        let root = self.classes.find(a);
                        let absorbed = if root == a { b } else { a };
                        let moved = uses.remove(&absorbed).unwrap_or_default();
                        pending.extend(moved.iter().copied());
                        uses.entry(root).or_default().extend(moved);
                    }
                }
                None => {
                    signatures.insert(signature, id);
                }
            }
        }
    }

    // one element per class, numbered in order of first appearance
    fn model(&mut self) -> Model {
        let mut model = Model::new();
        let mut numbering: HashMap<usize, usize> = HashMap::new();

        for id in 0..self.nodes.len() {
            let root = self.classes.find(id);
            let next = numbering.len();
            let index = *numbering.entry(root).or_insert(next);
            if let Node::Const { name, sort } = &self.nodes[id] {
                model.insert(name.clone(), format!("{}!val!{}", sort, index));
            }
        }

        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smt::{FunctionSymbol, Sort};

    struct Vocabulary {
        sort: Sort,
        f: FunctionSymbol,
    }

    impl Vocabulary {
        fn new() -> Self {
            let mut script = Script::new();
            let sort = script.declare_sort("S");
            let f = script.declare_function("f", &[sort.clone(), sort.clone()], &sort);
            Self { sort, f }
        }

        fn c(&self, name: &str) -> Term {
            Term::Const {
                name: name.to_string(),
                sort: self.sort.clone(),
            }
        }

        fn app(&self, a: Term, b: Term) -> Term {
            self.f.apply(vec![a, b])
        }
    }

    #[test]
    fn congruence_proves_equal_applications() {
        let v = Vocabulary::new();
        // a = b, x = f(a, c), y = f(b, c) |= x = y
        let query = Formula::not(Formula::implies(
            Formula::and([
                v.c("a").eq(&v.c("b")),
                v.c("x").eq(&v.app(v.c("a"), v.c("c"))),
                v.c("y").eq(&v.app(v.c("b"), v.c("c"))),
            ]),
            v.c("x").eq(&v.c("y")),
        ));
        assert_eq!(CongruenceOracle::decide(&[query]), CheckResult::Unsat);
    }

    #[test]
    fn commutativity_is_not_assumed() {
        let v = Vocabulary::new();
        let query = Formula::not(Formula::implies(
            Formula::and([
                v.c("x").eq(&v.app(v.c("a"), v.c("b"))),
                v.c("y").eq(&v.app(v.c("b"), v.c("a"))),
            ]),
            v.c("x").eq(&v.c("y")),
        ));

        let CheckResult::Sat(model) = CongruenceOracle::decide(&[query]) else {
            panic!("expected a model");
        };
        assert_ne!(model.get("x"), model.get("y"));
        assert!(model.get("a").is_some_and(|v| v.starts_with("S!val!")));
    }

    #[test]
    fn chained_congruence() {
        let v = Vocabulary::new();
        // a = b gives f(f(a,a),a) = f(f(b,b),b)
        let lhs = v.app(v.app(v.c("a"), v.c("a")), v.c("a"));
        let rhs = v.app(v.app(v.c("b"), v.c("b")), v.c("b"));
        let assertions = [v.c("a").eq(&v.c("b")), Formula::not(lhs.eq(&rhs))];
        assert_eq!(CongruenceOracle::decide(&assertions), CheckResult::Unsat);
    }

    #[test]
    fn long_definition_chains_close() {
        let v = Vocabulary::new();
        let mut assertions = vec![v.c("x0").eq(&v.c("y0"))];
        for i in 0..2_000 {
            let (x, y) = (format!("x{}", i), format!("y{}", i));
            assertions.push(v.c(&format!("x{}", i + 1)).eq(&v.app(v.c(&x), v.c("c"))));
            assertions.push(v.c(&format!("y{}", i + 1)).eq(&v.app(v.c(&y), v.c("c"))));
        }
        assertions.push(Formula::not(v.c("x2000").eq(&v.c("y2000"))));
        assert_eq!(CongruenceOracle::decide(&assertions), CheckResult::Unsat);
    }

    #[test]
    fn disjunctions_are_unknown() {
        let v = Vocabulary::new();
        let disjunction = Formula::not(Formula::and([
            v.c("a").eq(&v.c("b")),
            v.c("b").eq(&v.c("c")),
        ]));
        assert!(matches!(
            CongruenceOracle::decide(&[disjunction]),
            CheckResult::Unknown(_)
        ));
    }

    #[test]
    fn empty_conjunction_under_negation_is_false() {
        assert_eq!(
            CongruenceOracle::decide(&[Formula::not(Formula::and(Vec::new()))]),
            CheckResult::Unsat
        );
        assert_eq!(CongruenceOracle::decide(&[]), CheckResult::Sat(Model::new()));
    }

    #[tokio::test]
    async fn checks_scripts() {
        let v = Vocabulary::new();
        let mut script = Script::new();
        script.assert(Formula::not(v.c("a").eq(&v.c("a"))));
        let result = CongruenceOracle::new().check(&script).await.unwrap();
        assert_eq!(result, CheckResult::Unsat);
    }
}
