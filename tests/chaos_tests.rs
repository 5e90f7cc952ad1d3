//! Fault-injection tests for the lifecycle rollback
//!
//! Every injected failure must leave the store ledger empty and release
//! matrices in reverse acquisition order.

use proptest::prelude::*;
use tormenta::chaos::ChaosConfig;
use tormenta::{Engine, EngineConfig, MatrixSource, Stage, TormentaError};

fn sources(m: usize, n: usize, p: usize) -> (MatrixSource, MatrixSource) {
    let text = |rows: usize, cols: usize| {
        let values: Vec<String> = (0..rows * cols).map(|i| (i % 7).to_string()).collect();
        format!("{rows} {cols}\n{}\n", values.join(" "))
    };
    (
        MatrixSource::inline("A", text(m, n)),
        MatrixSource::inline("B", text(n, p)),
    )
}

fn engine(threads: usize, chaos: ChaosConfig) -> Engine {
    Engine::new(EngineConfig::new(threads).unwrap().with_chaos(chaos))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Allocation failure at any ordinal (A, B or C) leaks nothing
    #[test]
    fn chaos_allocation_failure_rolls_back(
        ordinal in 0usize..3,
        m in 1usize..8,
        n in 1usize..8,
        p in 1usize..8,
        threads in 1usize..=32
    ) {
        let (a, b) = sources(m, n, p);
        let mut engine = engine(threads, ChaosConfig::new().with_allocation_failure(ordinal));

        let err = engine.run(&a, &b).unwrap_err();
        let is_allocation = matches!(err, TormentaError::Allocation { .. });
        prop_assert!(is_allocation);
        prop_assert_eq!(engine.stage(), Stage::Failed);
        prop_assert_eq!(engine.store().outstanding(), 0);
        prop_assert_eq!(engine.store().bytes_in_use(), 0);

        let expected: Vec<&str> = match ordinal {
            0 => vec![],
            1 => vec!["A"],
            _ => vec!["B", "A"],
        };
        prop_assert_eq!(engine.store().release_log(), expected);
    }

    /// Spawn failure at any worker stops and joins the started ones
    #[test]
    fn chaos_spawn_failure_rolls_back(
        m in 2usize..10,
        p in 2usize..10,
        threads in 2usize..=32,
        victim_seed in any::<usize>()
    ) {
        let (a, b) = sources(m, 3, p);
        let workers = threads.min(m * p);
        let victim = victim_seed % workers;
        let mut engine = engine(threads, ChaosConfig::new().with_spawn_failure(victim));

        let err = engine.run(&a, &b).unwrap_err();
        prop_assert_eq!(
            err,
            TormentaError::ThreadCreate {
                worker: victim,
                reason: format!("injected spawn failure for worker {victim}"),
            }
        );
        prop_assert_eq!(engine.store().outstanding(), 0);
        prop_assert_eq!(engine.store().release_log(), vec!["C", "B", "A"]);
    }
}

#[test]
fn chaos_memory_limit_fails_output_allocation() {
    // A and B need 4 * 8 bytes each; C would push past the limit
    let (a, b) = sources(2, 2, 2);
    let mut engine = engine(2, ChaosConfig::new().with_memory_limit(80));

    let err = engine.run(&a, &b).unwrap_err();
    assert!(err.to_string().contains("memory limit of 80 bytes exceeded"));
    assert_eq!(err.exit_code(), 6);
    assert_eq!(engine.store().outstanding(), 0);
    assert_eq!(engine.store().release_log(), vec!["B", "A"]);
}

#[test]
fn chaos_config_error_before_any_allocation() {
    let err = EngineConfig::new(33).unwrap_err();
    assert!(matches!(err, TormentaError::Config(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn chaos_join_failure_policy_is_non_fatal() {
    let (a, b) = sources(4, 3, 4);
    let mut clean = engine(4, ChaosConfig::default());
    let (_, full) = clean.run(&a, &b).unwrap();

    for victim in 0..4 {
        let mut engine = engine(4, ChaosConfig::new().with_worker_panic(victim));
        let (_operands, partial) = engine.run(&a, &b).unwrap();

        assert_eq!(engine.stage(), Stage::Done);
        assert_eq!(partial.warnings.len(), 1);
        assert_eq!(partial.warnings[0].worker, victim);
        assert_eq!(partial.statistics.contributions, 3);

        // the missing contribution is exactly the victim's range
        let range = partial.warnings[0].range;
        let lost: f64 = full.matrix.as_slice()[range.start..range.end].iter().sum();
        assert_eq!(partial.statistics.sum, full.statistics.sum - lost);

        drop(partial);
        assert_eq!(engine.store().outstanding(), 2);
    }
}
