use flux_engine::{
    bits_eq, CompileError, Compiler, EvalError, EvaluationMode, Evaluator, NodeDefinition,
    OperationRegistry,
};

fn standard() -> OperationRegistry {
    OperationRegistry::standard()
}

#[test]
fn scenario_1_trivial_sum() {
    let defs = vec![
        NodeDefinition::input("a", 10.0),
        NodeDefinition::input("b", 20.0),
        NodeDefinition::compute("sum", "ADD", vec!["a", "b"]),
    ];
    let graph = Compiler::compile(&defs, &standard()).unwrap();
    let mut evaluator = Evaluator::new(graph, EvaluationMode::Full).unwrap();
    evaluator.evaluate();
    assert_eq!(evaluator.get_value_by_name("sum").unwrap(), 30.0);

    evaluator.set_input_by_name("a", 5.0).unwrap();
    evaluator.evaluate();
    assert_eq!(evaluator.get_value_by_name("sum").unwrap(), 25.0);
}

#[test]
fn scenario_2_cycle_is_rejected() {
    let defs = vec![
        NodeDefinition::compute("x", "ADD", vec!["y", "y"]),
        NodeDefinition::compute("y", "ADD", vec!["x", "x"]),
    ];
    let err = Compiler::compile(&defs, &standard()).unwrap_err();
    assert!(matches!(err, CompileError::Cycle { .. }));
}

#[test]
fn scenario_3_arity_mismatch() {
    let defs = vec![
        NodeDefinition::input("a", 1.0),
        NodeDefinition::compute("z", "SUB", vec!["a"]),
    ];
    let err = Compiler::compile(&defs, &standard()).unwrap_err();
    match err {
        CompileError::ArityMismatch { expected, got, .. } => {
            assert_eq!(expected, 2);
            assert_eq!(got, 1);
        }
        other => panic!("expected ArityMismatch, got {:?}", other),
    }
}

#[test]
fn scenario_4_sma_warmup() {
    let defs = vec![
        NodeDefinition::input("price", 0.0),
        NodeDefinition::sma("avg", "price", 3),
    ];
    let graph = Compiler::compile(&defs, &standard()).unwrap();
    let mut evaluator = Evaluator::new_with_unconditional_stateful_dirtying(graph, EvaluationMode::Full);

    let samples = [100.0, 102.0, 105.0, 103.0, 107.0];
    let expected = [100.0, 101.0, 102.333333333333, 103.333333333333, 105.0];
    for (step, (&sample, &want)) in samples.iter().zip(expected.iter()).enumerate() {
        evaluator.set_input_by_name("price", sample).unwrap();
        evaluator.evaluate();
        let got = evaluator.get_value_by_name("avg").unwrap();
        assert!((got - want).abs() < 1e-9, "step {}: got {}, want {}", step, got, want);
    }
}

fn branch_chain(branch: usize, length: usize) -> (Vec<NodeDefinition>, String, String) {
    let input_name = format!("b{}_in", branch);
    let mut defs = vec![NodeDefinition::input(input_name.clone(), 1.0)];
    let mut previous = input_name.clone();
    for i in 0..length {
        let name = format!("b{}_n{}", branch, i);
        defs.push(NodeDefinition::compute(name.clone(), "ADD", vec![previous.clone(), previous.clone()]));
        previous = name;
    }
    (defs, input_name, previous)
}

#[test]
fn scenario_5_incremental_localization() {
    let mut defs = Vec::new();
    let mut leaves = Vec::new();
    let mut input_names = Vec::new();
    for branch in 0..3 {
        let (branch_defs, input_name, leaf) = branch_chain(branch, 20);
        defs.extend(branch_defs);
        leaves.push(leaf);
        input_names.push(input_name);
    }
    defs.push(NodeDefinition::compute("total", "SUM", leaves.clone()));

    assert_eq!(defs.iter().filter(|d| d.operation != "").count(), 61);

    let registry = standard();
    let incremental_graph = Compiler::compile(&defs, &registry).unwrap();
    let mut incremental = Evaluator::new(incremental_graph, EvaluationMode::Incremental).unwrap();
    incremental.evaluate();

    let full_graph = Compiler::compile(&defs, &registry).unwrap();
    let mut full = Evaluator::new(full_graph, EvaluationMode::Full).unwrap();
    full.evaluate();

    incremental.set_input_by_name(&input_names[0], 9.0).unwrap();
    full.set_input_by_name(&input_names[0], 9.0).unwrap();

    let incremental_computed = incremental.evaluate();
    let full_computed = full.evaluate();

    assert_eq!(incremental_computed, 21);
    assert_eq!(full_computed, 61);
    assert!(bits_eq(
        incremental.get_value_by_name("total").unwrap(),
        full.get_value_by_name("total").unwrap(),
    ));
}

#[test]
fn scenario_6_crossover_sign_flip_is_deterministic() {
    let defs = vec![
        NodeDefinition::input("price", 0.0),
        NodeDefinition::sma("fast", "price", 3),
        NodeDefinition::sma("slow", "price", 10),
        NodeDefinition::compute("spread", "SUB", vec!["fast", "slow"]),
    ];
    let graph = Compiler::compile(&defs, &standard()).unwrap();
    let mut evaluator = Evaluator::new_with_unconditional_stateful_dirtying(graph, EvaluationMode::Full);

    let mut prices = Vec::new();
    for i in 0..15 {
        prices.push(100.0 - i as f64);
    }
    for i in 0..15 {
        prices.push(86.0 + i as f64);
    }

    let mut flip_tick: Option<usize> = None;
    let mut previous_sign: Option<bool> = None;
    for (tick, &price) in prices.iter().enumerate() {
        evaluator.set_input_by_name("price", price).unwrap();
        evaluator.evaluate();
        let spread = evaluator.get_value_by_name("spread").unwrap();
        let sign = spread >= 0.0;
        if let Some(prev) = previous_sign {
            if prev != sign && flip_tick.is_none() {
                flip_tick = Some(tick);
            }
        }
        previous_sign = Some(sign);
    }

    assert!(flip_tick.is_some(), "spread never crossed zero");

    // Rerunning the identical sequence reproduces the same tick.
    let defs2 = vec![
        NodeDefinition::input("price", 0.0),
        NodeDefinition::sma("fast", "price", 3),
        NodeDefinition::sma("slow", "price", 10),
        NodeDefinition::compute("spread", "SUB", vec!["fast", "slow"]),
    ];
    let graph2 = Compiler::compile(&defs2, &standard()).unwrap();
    let mut evaluator2 = Evaluator::new_with_unconditional_stateful_dirtying(graph2, EvaluationMode::Full);
    let mut flip_tick2: Option<usize> = None;
    let mut previous_sign2: Option<bool> = None;
    for (tick, &price) in prices.iter().enumerate() {
        evaluator2.set_input_by_name("price", price).unwrap();
        evaluator2.evaluate();
        let spread = evaluator2.get_value_by_name("spread").unwrap();
        let sign = spread >= 0.0;
        if let Some(prev) = previous_sign2 {
            if prev != sign && flip_tick2.is_none() {
                flip_tick2 = Some(tick);
            }
        }
        previous_sign2 = Some(sign);
    }
    assert_eq!(flip_tick, flip_tick2);
}

#[test]
fn idempotent_evaluate_without_intervening_input_recomputes_nothing_incremental() {
    let defs = vec![
        NodeDefinition::input("a", 1.0),
        NodeDefinition::input("b", 2.0),
        NodeDefinition::compute("sum", "ADD", vec!["a", "b"]),
    ];
    let graph = Compiler::compile(&defs, &standard()).unwrap();
    let mut evaluator = Evaluator::new(graph, EvaluationMode::Incremental).unwrap();
    evaluator.evaluate();
    let second = evaluator.evaluate();
    assert_eq!(second, 0);
}

#[test]
fn idempotent_evaluate_full_mode_always_recomputes_compute_count() {
    let defs = vec![
        NodeDefinition::input("a", 1.0),
        NodeDefinition::input("b", 2.0),
        NodeDefinition::compute("sum", "ADD", vec!["a", "b"]),
    ];
    let graph = Compiler::compile(&defs, &standard()).unwrap();
    let mut evaluator = Evaluator::new(graph, EvaluationMode::Full).unwrap();
    let first = evaluator.evaluate();
    let second = evaluator.evaluate();
    assert_eq!(first, 1);
    assert_eq!(second, 1);
}

#[test]
fn unknown_input_by_name_is_an_eval_error() {
    let defs = vec![NodeDefinition::input("a", 1.0)];
    let graph = Compiler::compile(&defs, &standard()).unwrap();
    let mut evaluator = Evaluator::new(graph, EvaluationMode::Full).unwrap();
    let err = evaluator.set_input_by_name("missing", 1.0).unwrap_err();
    assert_eq!(err, EvalError::UnknownInput("missing".to_string()));
}
