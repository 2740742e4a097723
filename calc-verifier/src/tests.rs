#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::compiler::ir::Operator;
    use crate::compiler::ssa::tac_to_ssa;
    use crate::compiler::{calc, interp, tac, CalcCompiler};
    use crate::{
        parse_calc, CheckResult, CongruenceOracle, Oracle, OracleError, Script,
        TranslationValidator, ValidationError, ValidatorConfig, Verdict,
    };

    struct FixedOracle(CheckResult);

    #[async_trait]
    impl Oracle for FixedOracle {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn check(&self, _script: &Script) -> Result<CheckResult, OracleError> {
            Ok(self.0.clone())
        }
    }

    struct SlowOracle;

    #[async_trait]
    impl Oracle for SlowOracle {
        fn name(&self) -> &str {
            "slow"
        }

        async fn check(&self, _script: &Script) -> Result<CheckResult, OracleError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(CheckResult::Unsat)
        }
    }

    struct BrokenOracle;

    #[async_trait]
    impl Oracle for BrokenOracle {
        fn name(&self) -> &str {
            "broken"
        }

        async fn check(&self, _script: &Script) -> Result<CheckResult, OracleError> {
            Err(OracleError::Protocol("garbled".to_string()))
        }
    }

    // replaces the first `old` operator in the body with `new`
    fn mutate(f: &tac::Function, old: Operator, new: Operator) -> tac::Function {
        let mut mutated = f.clone();
        for stm in &mut mutated.body {
            let tac::Stm::Assign { value, .. } = stm;
            if let tac::Exp::BinOp { op, .. } = value {
                if *op == old {
                    *op = new;
                    break;
                }
            }
        }
        mutated
    }

    #[tokio::test]
    async fn test_golden_case_passes() {
        let mut validator = TranslationValidator::new(CongruenceOracle::new());
        let (lowered, report) = validator
            .compile_and_validate(&calc::sample_function())
            .await
            .unwrap();

        // two additions, two multiplications and the return copy
        assert_eq!(lowered.body.len(), 5);
        assert_eq!(tac_to_ssa(&lowered).unwrap().body.len(), 5);
        assert_eq!(report.verdict, Verdict::Pass);
        assert_eq!(report.oracle, "congruence");
        report.ensure_pass().unwrap();
    }

    #[tokio::test]
    async fn test_hand_written_tac_passes() {
        let mut validator = TranslationValidator::new(CongruenceOracle::new());
        let report = validator
            .validate(&calc::sample_function(), &tac::sample_function())
            .await
            .unwrap();

        assert!(report.is_pass());
        assert_eq!(report.source_return, "_calc_f_2");
        assert_eq!(report.target_return, "_tac_f_4");
    }

    #[tokio::test]
    async fn test_mutated_lowering_fails_with_model() {
        let source = calc::sample_function();
        let lowered = CalcCompiler::new().compile(&source).unwrap();
        let broken = mutate(&lowered, Operator::Add, Operator::Mul);
        assert_ne!(broken, lowered);

        let mut validator = TranslationValidator::new(CongruenceOracle::new());
        let report = validator.validate(&source, &broken).await.unwrap();

        let Verdict::Fail { model } = &report.verdict else {
            panic!("expected a counter-model, got {:?}", report.verdict);
        };
        assert_ne!(
            model.get(&report.source_return),
            model.get(&report.target_return)
        );
        assert!(matches!(
            report.ensure_pass(),
            Err(ValidationError::NotEquivalent { .. })
        ));
    }

    #[tokio::test]
    async fn test_power3_equivalence() {
        // the loop `for i in 0..2 { out = out * x }` unrolled, against (x*x)*x
        let power3 = parse_calc("p(x){ a = x; a = a * x; a = a * x; return a; }").unwrap();
        let power3_new = parse_calc("p(x){ b = (x * x) * x; return b; }").unwrap();
        let lowered = CalcCompiler::new().compile(&power3_new).unwrap();

        let mut validator = TranslationValidator::new(CongruenceOracle::new());
        let report = validator.validate(&power3, &lowered).await.unwrap();
        assert_eq!(report.verdict, Verdict::Pass);
    }

    #[tokio::test]
    async fn test_associativity_is_outside_euf() {
        let left = parse_calc("p(x){ b = (x * x) * x; return b; }").unwrap();
        let right = parse_calc("p(x){ b = x * (x * x); return b; }").unwrap();
        let lowered = CalcCompiler::new().compile(&right).unwrap();

        // both compute x^3, but only structure is visible to the oracle
        assert_eq!(interp::eval_calc(&left, &[5]), interp::eval_tac(&lowered, &[5]));

        let mut validator = TranslationValidator::new(CongruenceOracle::new());
        let report = validator.validate(&left, &lowered).await.unwrap();
        assert!(matches!(report.verdict, Verdict::Fail { .. }));
    }

    #[tokio::test]
    async fn test_unknown_is_inconclusive() {
        let mut validator =
            TranslationValidator::new(FixedOracle(CheckResult::Unknown("incomplete".to_string())));
        let report = validator
            .validate(&calc::sample_function(), &tac::sample_function())
            .await
            .unwrap();

        assert_eq!(
            report.verdict,
            Verdict::Inconclusive {
                reason: "incomplete".to_string()
            }
        );
        assert!(matches!(
            report.ensure_pass(),
            Err(ValidationError::OracleUnknown { .. })
        ));
        // inconclusive answers are asked again next time
        assert_eq!(validator.cached_verdicts(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_inconclusive() {
        let config = ValidatorConfig {
            oracle_timeout_ms: 50,
            ..ValidatorConfig::default()
        };
        let mut validator = TranslationValidator::with_config(SlowOracle, &config);
        let report = validator
            .validate(&calc::sample_function(), &tac::sample_function())
            .await
            .unwrap();

        let Verdict::Inconclusive { reason } = report.verdict else {
            panic!("expected a timeout");
        };
        assert!(reason.contains("50 ms"));
    }

    #[tokio::test]
    async fn test_congruence_oracle_respects_timeout() {
        let mut source = String::from("f(a, b){ x = a;");
        for _ in 0..6_000 {
            source.push_str(" x = x * b + a;");
        }
        source.push_str(" return x; }");
        let source = parse_calc(&source).unwrap();
        let lowered = CalcCompiler::new().compile(&source).unwrap();

        let config = ValidatorConfig {
            oracle_timeout_ms: 0,
            ..ValidatorConfig::default()
        };
        let mut validator = TranslationValidator::with_config(CongruenceOracle::new(), &config);
        let report = validator.validate(&source, &lowered).await.unwrap();
        let Verdict::Inconclusive { reason } = report.verdict else {
            panic!("expected a timeout, got {:?}", report.verdict);
        };
        assert!(reason.starts_with("congruence did not answer"));

        let mut validator = TranslationValidator::new(CongruenceOracle::new());
        assert!(validator.validate(&source, &lowered).await.unwrap().is_pass());
    }

    #[tokio::test]
    async fn test_deep_source_is_rejected_before_encoding() {
        let mut exp = calc::Exp::var("a");
        for _ in 0..=crate::validation::MAX_EXPRESSION_DEPTH {
            exp = calc::Exp::binop(exp, calc::Exp::var("a"), Operator::Sub);
        }
        let source = calc::Function::new(
            "f",
            &["a"],
            vec![calc::Stm::assign("x", exp)],
            calc::Exp::var("x"),
        );
        let target = crate::parse_tac("f(a){ return a; }").unwrap();

        let mut validator = TranslationValidator::new(CongruenceOracle::new());
        let err = validator.validate(&source, &target).await.unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Compile(crate::CompileError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_reserved_solver_words_are_quoted() {
        let source = parse_calc("f(true, let){ not = true + let; return not; }").unwrap();
        let lowered = CalcCompiler::new().compile(&source).unwrap();

        let script = crate::verifier::Query::build(&source, &lowered).unwrap().script.to_smtlib();
        assert!(script.contains("(declare-const |true| |S|)"));
        assert!(script.contains("(declare-const |let| |S|)"));
        assert!(script.contains("(|f_add| |true| |let|)"));
        assert!(!script.contains("(declare-const true "));

        let mut validator = TranslationValidator::new(CongruenceOracle::new());
        assert!(validator.validate(&source, &lowered).await.unwrap().is_pass());
    }

    #[tokio::test]
    async fn test_oracle_errors_propagate() {
        let mut validator = TranslationValidator::new(BrokenOracle);
        let err = validator
            .validate(&calc::sample_function(), &tac::sample_function())
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::Oracle(OracleError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_boxed_oracle_from_config() {
        let mut validator = TranslationValidator::from_config(&ValidatorConfig::default());
        let report = validator
            .validate(&calc::sample_function(), &tac::sample_function())
            .await
            .unwrap();
        assert!(report.is_pass());
        assert_eq!(validator.oracle().name(), "congruence");
    }

    #[tokio::test]
    async fn test_compile_errors_surface() {
        let bad = calc::Function::new(
            "f",
            &["a", "b"],
            vec![],
            calc::Exp::binop(calc::Exp::var("a"), calc::Exp::var("b"), Operator::Add),
        );
        let mut validator = TranslationValidator::new(CongruenceOracle::new());
        let err = validator.compile_and_validate(&bad).await.unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Compile(crate::CompileError::InvalidReturnShape(_))
        ));
    }
}
