//! End-to-end worker-loop flows, written against the backend-agnostic
//! handle traits only.

use optimizer_client::gateway::InMemoryService;
use optimizer_client::{
    CompleteOutcome, Direction, Measurement, MetricSpec, ParameterDomain, ParameterSpec, Study,
    StudyConfig, StudyHandle, TrialHandle,
};

fn quadratic_study(service: &InMemoryService, uid: &str) {
    let config = StudyConfig::new(
        vec![ParameterSpec::new(
            "x",
            ParameterDomain::Float {
                low: -5.0,
                high: 5.0,
            },
        )],
        vec![MetricSpec::new("loss", Direction::Minimize)],
    );
    service.create_study(uid, config).unwrap();
}

/// A worker loop that only knows the capability interfaces.
fn run_worker<S: StudyHandle>(study: &S, rounds: usize) {
    for _ in 0..rounds {
        for mut trial in study.suggest(1).unwrap() {
            let x = trial.parameters().unwrap()["x"].as_f64().unwrap();
            let mut loss = f64::INFINITY;
            for step in 1..=3u32 {
                loss = (x - 2.0).powi(2) / f64::from(step);
                trial
                    .add_measurement(Measurement::new(u64::from(step), [("loss", loss)]))
                    .unwrap();
                if trial.should_stop().unwrap() {
                    break;
                }
            }
            if loss.is_finite() {
                trial
                    .complete(CompleteOutcome::from_intermediates())
                    .unwrap();
            } else {
                trial
                    .complete(CompleteOutcome::infeasible("loss diverged"))
                    .unwrap();
            }
        }
    }
}

#[test]
fn worker_loop_through_the_trait_surface() {
    let service = InMemoryService::new();
    quadratic_study(&service, "quadratic");
    service.seed_rng("quadratic", 42).unwrap();

    let study = Study::connect(&service, "quadratic", "worker-1").unwrap();
    run_worker(&study, 5);

    assert_eq!(study.trials(None).unwrap().len(), 5);
    let optimal = study.optimal_trials().unwrap();
    assert_eq!(optimal.len(), 1);
}

#[test]
fn two_workers_share_one_study() {
    let service = InMemoryService::new();
    quadratic_study(&service, "shared");

    let worker_a = Study::connect(&service, "shared", "a").unwrap();
    let worker_b = Study::connect(&service, "shared", "b").unwrap();

    run_worker(&worker_a, 3);
    run_worker(&worker_b, 2);

    // Both workers' trials land in the same study on the service.
    let reconnected = Study::from_uid(&service, "shared").unwrap();
    assert_eq!(reconnected.trials(None).unwrap().len(), 5);
}
