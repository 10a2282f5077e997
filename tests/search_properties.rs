//! End-to-end properties of the search engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use u_metadesign::benchmarks::onemax;
use u_metadesign::encoding::{Bounds, BoundedVectorEncoding, IdentityEncoding};
use u_metadesign::initializer::{BinaryInitializer, PermutationInitializer, UniformVectorInitializer};
use u_metadesign::objective::{Direction, Objective, ObjectiveFn};
use u_metadesign::operator::permutation::is_permutation;
use u_metadesign::operator::{
    BitFlipMutation, BlxAlphaCrossover, GaussianMutation, Identity, OnePointCrossover, Operator,
    PermutationOperator, Pipeline, WithProbability,
};
use u_metadesign::replacement::{CoolingSchedule, Replacement};
use u_metadesign::search::{
    Budget, Convergence, SearchConfig, SearchEngine, SearchStatus, TerminationReason,
};
use u_metadesign::selection::Selection;
use u_metadesign::termination::Termination;
use u_metadesign::Error;

fn shifted(x: &Vec<f64>) -> anyhow::Result<f64> {
    Ok(x.iter().map(|v| (v - 1.0).powi(2)).sum())
}

fn bounds(dim: usize) -> Bounds {
    Bounds::uniform(dim, -5.0, 5.0).unwrap()
}

fn objective(dim: usize) -> Objective<BoundedVectorEncoding, impl ObjectiveFn<Vec<f64>>> {
    Objective::from_fn(BoundedVectorEncoding::new(bounds(dim)), Direction::Minimize, shifted)
}

fn gaussian(sigma: f64) -> Pipeline<Vec<f64>> {
    Pipeline::from_operator(GaussianMutation::new(sigma).unwrap())
}

fn engine(
    dim: usize,
    pipeline: Pipeline<Vec<f64>>,
    config: SearchConfig<Vec<f64>>,
) -> SearchEngine<BoundedVectorEncoding, impl ObjectiveFn<Vec<f64>>> {
    SearchEngine::new(
        objective(dim),
        UniformVectorInitializer::new(bounds(dim)),
        pipeline,
        config,
    )
    .unwrap()
}

fn ga_pipeline() -> Pipeline<Vec<f64>> {
    let stages: Vec<Box<dyn Operator<Vec<f64>>>> = vec![
        Box::new(BlxAlphaCrossover::new(0.3)),
        Box::new(GaussianMutation::new(0.2).unwrap()),
    ];
    Pipeline::new(stages).unwrap()
}

#[test]
fn same_seed_same_trajectory() {
    let config = || {
        SearchConfig::default()
            .with_population_size(16)
            .with_termination(Termination::MaxGenerations(40))
            .with_seed(7)
    };
    let a = engine(3, ga_pipeline(), config()).run().unwrap();
    let b = engine(3, ga_pipeline(), config()).run().unwrap();

    let bits = |h: &[f64]| h.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&a.history), bits(&b.history));
    assert_eq!(a.best.genotype(), b.best.genotype());
    assert_eq!(a.summary.evaluations, b.summary.evaluations);
}

#[test]
fn different_seeds_differ() {
    let config = |seed| {
        SearchConfig::default()
            .with_population_size(8)
            .with_termination(Termination::MaxGenerations(5))
            .with_seed(seed)
    };
    let a = engine(3, ga_pipeline(), config(1)).run().unwrap();
    let b = engine(3, ga_pipeline(), config(2)).run().unwrap();
    assert_ne!(a.best.genotype(), b.best.genotype());
}

#[test]
fn population_size_is_invariant_for_every_replacement() {
    let cases = [
        (Replacement::Generational { elitism: 2 }, Selection::Tournament(2), None),
        (Replacement::SteadyState, Selection::Tournament(2), None),
        (Replacement::MuPlusLambda, Selection::Random, Some(25)),
        (Replacement::MuCommaLambda, Selection::Random, Some(15)),
        (Replacement::OneToOne, Selection::Sequential, None),
        (
            Replacement::Annealing {
                initial_temperature: 2.0,
                cooling: CoolingSchedule::Geometric { alpha: 0.9 },
            },
            Selection::Sequential,
            None,
        ),
    ];
    for (replacement, selection, offspring) in cases {
        let mut config = SearchConfig::default()
            .with_population_size(12)
            .with_selection(selection)
            .with_replacement(replacement)
            .with_termination(Termination::MaxGenerations(15))
            .with_seed(3);
        if let Some(n) = offspring {
            config = config.with_offspring_count(n);
        }
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sizes);
        let mut e = engine(2, gaussian(0.3), config);
        e.on_generation(move |s| sink.lock().unwrap().push(s.population_size));
        e.run().unwrap();

        let sizes = sizes.lock().unwrap();
        assert_eq!(sizes.len(), 16, "{replacement:?}");
        assert!(sizes.iter().all(|&n| n == 12), "{replacement:?}: {sizes:?}");
        assert_eq!(e.population().size(), 12);
    }
}

#[test]
fn best_ever_never_worsens_without_elitism() {
    let mut e = engine(
        4,
        gaussian(1.0),
        SearchConfig::default()
            .with_population_size(10)
            .with_replacement(Replacement::Generational { elitism: 0 })
            .with_termination(Termination::MaxGenerations(60))
            .with_seed(11),
    );
    let result = e.run().unwrap();
    for w in result.history.windows(2) {
        assert!(w[1] <= w[0], "best-ever got worse: {} -> {}", w[0], w[1]);
    }
}

#[test]
fn arity_mismatch_is_reported_before_any_evaluation() {
    let objective = objective(2);
    let stages: Vec<Box<dyn Operator<Vec<f64>>>> = vec![
        Box::new(GaussianMutation::new(0.1).unwrap()),
        Box::new(BlxAlphaCrossover::new(0.5)),
    ];
    let err = Pipeline::new(stages).unwrap_err();
    assert!(matches!(err, Error::ArityMismatch { .. }), "{err}");
    assert!(WithProbability::<Vec<f64>>::new(BlxAlphaCrossover::new(0.5), 0.5).is_err());
    assert_eq!(objective.evaluations(), 0);
}

#[test]
fn invalid_configuration_is_rejected_before_any_evaluation() {
    let result = SearchEngine::new(
        objective(2),
        UniformVectorInitializer::new(bounds(2)),
        gaussian(0.1),
        SearchConfig::default()
            .with_population_size(10)
            .with_replacement(Replacement::Generational { elitism: 10 }),
    );
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn generation_limit_runs_exactly_that_many_generations() {
    let mut e = engine(
        2,
        Pipeline::from_operator(Identity),
        SearchConfig::default()
            .with_population_size(9)
            .with_termination(Termination::MaxGenerations(7))
            .with_seed(5),
    );
    let result = e.run().unwrap();
    assert_eq!(result.summary.generations, 7);
    assert_eq!(
        result.reason,
        TerminationReason::BudgetExceeded(Budget::Generations)
    );
    assert_eq!(result.summary.evaluations, 9);
    assert_eq!(result.history.len(), 8);
}

#[test]
fn small_budget_scenario() {
    let mut e = engine(
        1,
        gaussian(1.0),
        SearchConfig::default()
            .with_population_size(10)
            .with_selection(Selection::Tournament(2))
            .with_replacement(Replacement::Generational { elitism: 1 })
            .with_termination(Termination::MaxEvaluations(50))
            .with_seed(42),
    );
    let result = e.run().unwrap();
    assert_eq!(result.summary.evaluations, 50);
    assert_eq!(e.objective().evaluations(), 50);
    assert_eq!(
        result.reason,
        TerminationReason::BudgetExceeded(Budget::Evaluations)
    );
    assert!(
        (result.phenotype[0] - 1.0).abs() < 1.0,
        "best x = {} is not near the optimum 1.0",
        result.phenotype[0]
    );
}

#[test]
fn failing_objective_during_initialization() {
    let wide = Bounds::uniform(1, 0.0, 20.0).unwrap();
    let objective = Objective::from_fn(
        BoundedVectorEncoding::new(wide.clone()),
        Direction::Minimize,
        |x: &Vec<f64>| {
            if x[0] == 13.0 {
                anyhow::bail!("unlucky input")
            }
            Ok(x[0])
        },
    );
    let mut e = SearchEngine::new(
        objective,
        UniformVectorInitializer::new(wide),
        gaussian(0.5),
        SearchConfig::default()
            .with_population_size(5)
            .with_initial_population(vec![vec![13.0]])
            .with_termination(Termination::MaxGenerations(3))
            .with_seed(1),
    )
    .unwrap();

    match e.initialize() {
        Err(Error::ObjectiveEvaluation {
            genotype,
            generation,
            ..
        }) => {
            assert!(genotype.contains("13"), "{genotype}");
            assert_eq!(generation, 0);
        }
        other => panic!("expected an evaluation failure, got {other:?}"),
    }
    assert_eq!(e.status(), SearchStatus::Finished(TerminationReason::Failed));
    assert!(e.result().is_none());
    assert!(e.run().is_err());
}

#[test]
fn failing_objective_mid_run_leaves_population_untouched() {
    let calls = AtomicUsize::new(0);
    let objective = Objective::from_fn(
        BoundedVectorEncoding::new(bounds(2)),
        Direction::Minimize,
        move |x: &Vec<f64>| {
            if calls.fetch_add(1, Ordering::SeqCst) == 24 {
                anyhow::bail!("solver crashed")
            }
            shifted(x)
        },
    );
    let mut e = SearchEngine::new(
        objective,
        UniformVectorInitializer::new(bounds(2)),
        gaussian(0.5),
        SearchConfig::default()
            .with_population_size(10)
            .with_termination(Termination::MaxGenerations(10))
            .with_seed(8),
    )
    .unwrap();

    e.initialize().unwrap();
    e.step().unwrap();
    let before = e.population().clone();

    let err = e.step().unwrap_err();
    assert!(err.is_evaluation_failure());
    assert!(matches!(err, Error::ObjectiveEvaluation { generation: 2, .. }));
    assert_eq!(e.population(), &before);
    assert_eq!(e.objective().evaluations(), 24);
    assert_eq!(e.status(), SearchStatus::Finished(TerminationReason::Failed));
    assert!(e.result().is_none());
    assert!(matches!(e.step(), Err(Error::State(_))));
}

#[test]
fn preset_cancellation_stops_after_initialization() {
    let mut e = engine(
        2,
        gaussian(0.3),
        SearchConfig::default()
            .with_population_size(6)
            .with_termination(Termination::MaxGenerations(100))
            .with_seed(4),
    );
    e.cancel_token().store(true, Ordering::Relaxed);
    let result = e.run().unwrap();
    assert_eq!(result.reason, TerminationReason::StoppedExternally);
    assert_eq!(result.summary.generations, 0);
    assert_eq!(result.summary.evaluations, 6);
}

#[test]
fn target_fitness_respects_maximization() {
    let objective = Objective::from_fn(
        BoundedVectorEncoding::new(bounds(2)),
        Direction::Maximize,
        |x: &Vec<f64>| Ok(-x.iter().map(|v| v * v).sum::<f64>()),
    );
    let mut e = SearchEngine::new(
        objective,
        UniformVectorInitializer::new(bounds(2)),
        gaussian(0.3),
        SearchConfig::default()
            .with_population_size(20)
            .with_termination(
                Termination::TargetFitness(-0.5).or(Termination::MaxGenerations(500)),
            )
            .with_seed(21),
    )
    .unwrap();
    let result = e.run().unwrap();
    assert_eq!(
        result.reason,
        TerminationReason::Converged(Convergence::TargetReached)
    );
    assert!(result.objective >= -0.5);
    for w in result.history.windows(2) {
        assert!(w[1] >= w[0]);
    }
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_evaluation_matches_sequential() {
    let config = |workers| {
        SearchConfig::default()
            .with_population_size(24)
            .with_termination(Termination::MaxEvaluations(600))
            .with_workers(workers)
            .with_seed(99)
    };
    let seq = engine(3, ga_pipeline(), config(1)).run().unwrap();
    let par = engine(3, ga_pipeline(), config(4)).run().unwrap();
    assert_eq!(seq.history, par.history);
    assert_eq!(seq.best.genotype(), par.best.genotype());
    assert_eq!(par.summary.evaluations, 600);
}

#[test]
fn resumed_run_follows_the_same_trajectory() {
    let config = || {
        SearchConfig::default()
            .with_population_size(12)
            .with_termination(Termination::MaxGenerations(20))
            .with_seed(31)
    };
    let full = engine(2, ga_pipeline(), config()).run().unwrap();

    let mut first = engine(2, ga_pipeline(), config());
    first.initialize().unwrap();
    for _ in 0..8 {
        first.step().unwrap();
    }
    let checkpoint = first.checkpoint().unwrap();
    assert_eq!(checkpoint.generation(), 8);
    drop(first);

    let mut resumed = SearchEngine::resume(
        objective(2),
        UniformVectorInitializer::new(bounds(2)),
        ga_pipeline(),
        config(),
        checkpoint,
    )
    .unwrap();
    let result = resumed.run().unwrap();
    assert_eq!(result.history, full.history);
    assert_eq!(result.summary.evaluations, full.summary.evaluations);
    assert_eq!(result.best.genotype(), full.best.genotype());
}

#[test]
fn permutation_search_keeps_permutations() {
    let n = 8;
    let objective = Objective::from_fn(
        IdentityEncoding::<Vec<usize>>::new(),
        Direction::Minimize,
        |p: &Vec<usize>| {
            Ok(p.iter()
                .enumerate()
                .map(|(i, &v)| (i as f64 - v as f64).abs())
                .sum())
        },
    );
    let stages: Vec<Box<dyn Operator<Vec<usize>>>> = vec![
        Box::new(PermutationOperator::OrderCrossover),
        Box::new(PermutationOperator::Swap),
    ];
    let mut e = SearchEngine::new(
        objective,
        PermutationInitializer::new(n),
        Pipeline::new(stages).unwrap(),
        SearchConfig::default()
            .with_population_size(20)
            .with_termination(Termination::MaxGenerations(50))
            .with_seed(17),
    )
    .unwrap();
    let result = e.run().unwrap();
    assert!(is_permutation(&result.phenotype));
    assert!(e.population().iter().all(|i| is_permutation(i.genotype())));
    assert!(result.objective <= result.history[0]);
}

#[test]
fn onemax_with_crossover_and_bit_flips() {
    let objective = Objective::from_fn(
        IdentityEncoding::<Vec<bool>>::new(),
        Direction::Maximize,
        |bits: &Vec<bool>| Ok(onemax(bits)),
    );
    let stages: Vec<Box<dyn Operator<Vec<bool>>>> = vec![
        Box::new(WithProbability::<Vec<bool>>::new(OnePointCrossover::new(), 0.9).unwrap()),
        Box::new(BitFlipMutation::new()),
    ];
    let mut e = SearchEngine::new(
        objective,
        BinaryInitializer::new(24),
        Pipeline::new(stages).unwrap(),
        SearchConfig::default()
            .with_population_size(30)
            .with_selection(Selection::Tournament(3))
            .with_termination(Termination::MaxGenerations(80))
            .with_seed(5),
    )
    .unwrap();
    let result = e.run().unwrap();
    assert!(result.objective >= 20.0, "onemax reached {}", result.objective);
    assert_eq!(result.phenotype.iter().filter(|&&b| b).count() as f64, result.objective);
}

#[test]
fn stagnation_fires_when_every_value_is_nan() {
    let objective = Objective::from_fn(
        BoundedVectorEncoding::new(bounds(2)),
        Direction::Minimize,
        |_: &Vec<f64>| Ok(f64::NAN),
    );
    let mut e = SearchEngine::new(
        objective,
        UniformVectorInitializer::new(bounds(2)),
        gaussian(0.5),
        SearchConfig::default()
            .with_population_size(6)
            .with_termination(
                Termination::Stagnation {
                    window: 3,
                    tolerance: 0.0,
                }
                .or(Termination::MaxGenerations(50)),
            )
            .with_seed(12),
    )
    .unwrap();
    let result = e.run().unwrap();
    assert_eq!(
        result.reason,
        TerminationReason::Converged(Convergence::Stagnation)
    );
    assert_eq!(result.summary.generations, 3);
}

#[test]
fn infinite_values_never_reach_a_maximization_target() {
    let objective = Objective::from_fn(
        BoundedVectorEncoding::new(bounds(2)),
        Direction::Maximize,
        |x: &Vec<f64>| Ok(if x[0] > 0.0 { f64::INFINITY } else { x[0] }),
    );
    let mut e = SearchEngine::new(
        objective,
        UniformVectorInitializer::new(bounds(2)),
        gaussian(0.5),
        SearchConfig::default()
            .with_population_size(20)
            .with_termination(Termination::TargetFitness(1e9).or(Termination::MaxGenerations(10)))
            .with_seed(3),
    )
    .unwrap();
    let result = e.run().unwrap();
    assert_eq!(
        result.reason,
        TerminationReason::BudgetExceeded(Budget::Generations)
    );
    assert!(result.objective.is_finite() && result.objective <= 0.0);
}
