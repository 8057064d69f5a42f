use efficient_frontier::datastructures::FrontierConfig;
use efficient_frontier::frontier::compute_frontier;
use efficient_frontier::scripted::ScriptedFactory;

// An infeasible solve is not retried and does not yield a partial table: the
// batch fails, attributed to the step that hit the error. With the range
// calibrated to [1.0, 4.0] and K = 3, step 3 targets a return of 2.0.
#[test]
fn test_failure_is_attributed_to_its_step() {
    let config = FrontierConfig {
        model_dir: "X".into(),
        num_workers: 2,
        num_steps: 3,
    };
    let factory =
        ScriptedFactory::new(&[("bond", 2.0), ("tech", 4.0)], 1.0).fail_for_target(2.0);
    let err = compute_frontier(&config, factory).unwrap_err();
    let chain = format!("{err:#}");
    assert!(
        chain.contains("frontier step 3 failed"),
        "unexpected error chain: {chain}"
    );
    assert!(chain.contains("infeasible"), "unexpected error chain: {chain}");
}
