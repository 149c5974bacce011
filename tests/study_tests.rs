use optimizer_client::gateway::InMemoryService;
use optimizer_client::{
    CompleteOutcome, Direction, Error, Measurement, MetricSpec, ParameterDomain, ParameterSpec,
    Study, StudyConfig, TrialStatus,
};

fn single_objective() -> StudyConfig {
    StudyConfig::new(
        vec![
            ParameterSpec::new(
                "x",
                ParameterDomain::Float {
                    low: -1.0,
                    high: 1.0,
                },
            ),
            ParameterSpec::new(
                "arch",
                ParameterDomain::Categorical {
                    choices: vec!["cnn".into(), "mlp".into()],
                },
            ),
        ],
        vec![MetricSpec::new("loss", Direction::Minimize)],
    )
}

fn service_with_study(uid: &str) -> InMemoryService {
    let service = InMemoryService::new();
    service.create_study(uid, single_objective()).unwrap();
    service
}

#[test]
fn suggest_returns_requested_count_with_unique_uids() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();

    let trials = study.suggest(3).unwrap();
    assert_eq!(trials.len(), 3);
    let mut uids: Vec<u64> = trials.iter().map(|t| t.uid()).collect();
    uids.sort_unstable();
    uids.dedup();
    assert_eq!(uids.len(), 3);
}

#[test]
fn suggest_reuses_still_active_assigned_trials() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();

    let first: Vec<u64> = study.suggest(3).unwrap().iter().map(|t| t.uid()).collect();
    let second: Vec<u64> = study.suggest(3).unwrap().iter().map(|t| t.uid()).collect();

    // No intervening completion: the same still-active trials come back.
    assert_eq!(first, second);
    assert_eq!(study.trials(None).unwrap().len(), 3);
}

#[test]
fn suggest_mints_only_the_deficit() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();

    let first = study.suggest(2).unwrap();
    let completed_uid = first[0].uid();
    let surviving_uid = first[1].uid();
    let mut to_complete = study.get_trial(completed_uid).unwrap();
    to_complete
        .complete(CompleteOutcome::final_measurement(Measurement::new(
            1,
            [("loss", 0.5)],
        )))
        .unwrap();

    let second: Vec<u64> = study.suggest(3).unwrap().iter().map(|t| t.uid()).collect();
    assert_eq!(second.len(), 3);
    assert!(second.contains(&surviving_uid));
    assert!(!second.contains(&completed_uid));
    // 2 originally + 2 freshly minted for the deficit.
    assert_eq!(study.trials(None).unwrap().len(), 4);
}

#[test]
fn suggest_for_isolates_workers() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();

    let w1: Vec<u64> = study.suggest(2).unwrap().iter().map(|t| t.uid()).collect();
    let w2: Vec<u64> = study
        .suggest_for(2, "w2")
        .unwrap()
        .iter()
        .map(|t| t.uid())
        .collect();

    assert!(w1.iter().all(|uid| !w2.contains(uid)));
}

#[test]
fn suggest_without_affinity_always_mints() {
    let service = service_with_study("s");
    let study = Study::from_uid(&service, "s").unwrap();

    let first: Vec<u64> = study.suggest(2).unwrap().iter().map(|t| t.uid()).collect();
    let second: Vec<u64> = study.suggest(2).unwrap().iter().map(|t| t.uid()).collect();

    assert!(first.iter().all(|uid| !second.contains(uid)));
    assert_eq!(study.trials(None).unwrap().len(), 4);
}

#[test]
fn exhausted_search_space_returns_fewer_suggestions() {
    let service = service_with_study("s");
    service.set_max_trials("s", 2).unwrap();
    let study = Study::connect(&service, "s", "w1").unwrap();

    assert_eq!(study.suggest(5).unwrap().len(), 2);
    // The still-active assigned trials are re-delivered, nothing new minted.
    assert_eq!(study.suggest(5).unwrap().len(), 2);
    assert_eq!(study.trials(None).unwrap().len(), 2);

    // A worker with no assigned trials gets nothing at all.
    assert!(study.suggest_for(5, "w2").unwrap().is_empty());
}

#[test]
fn trials_lists_all_and_applies_filter() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();

    let suggested = study.suggest(3).unwrap();
    let mut first = study.get_trial(suggested[0].uid()).unwrap();
    first
        .complete(CompleteOutcome::infeasible("bad config"))
        .unwrap();

    assert_eq!(study.trials(None).unwrap().len(), 3);

    let active_only = study
        .trials(Some(&|record| record.status == TrialStatus::Active))
        .unwrap();
    assert_eq!(active_only.len(), 2);

    let none = study.trials(Some(&|_| false)).unwrap();
    assert!(none.is_empty());
}

#[test]
fn get_trial_unknown_uid_is_not_found() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();

    let err = study.get_trial(999).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn from_uid_unknown_study_is_not_found() {
    let service = InMemoryService::new();
    let err = Study::from_uid(&service, "missing").unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn create_study_loads_existing_without_replacing_config() {
    let service = service_with_study("s");
    // Racing creator with a different config: first writer wins.
    let other = StudyConfig::new(vec![], vec![MetricSpec::new("acc", Direction::Maximize)]);
    service.create_study("s", other).unwrap();

    let study = Study::from_uid(&service, "s").unwrap();
    let config = study.materialize_study_config().unwrap();
    assert_eq!(config.metrics[0].name, "loss");
}

#[test]
fn optimal_trials_empty_before_any_completion() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();
    let _ = study.suggest(2).unwrap();

    assert!(study.optimal_trials().unwrap().is_empty());
}

#[test]
fn optimal_trials_single_objective_best() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();

    let mut best_uid = 0;
    for (i, loss) in [3.0, 1.0, 2.0].into_iter().enumerate() {
        let mut trial = study.suggest_for(1, &format!("w{i}")).unwrap().pop().unwrap();
        if loss == 1.0 {
            best_uid = trial.uid();
        }
        trial
            .complete(CompleteOutcome::final_measurement(Measurement::new(
                1,
                [("loss", loss)],
            )))
            .unwrap();
    }

    let optimal = study.optimal_trials().unwrap();
    assert_eq!(optimal.len(), 1);
    assert_eq!(optimal[0].uid(), best_uid);
}

#[test]
fn optimal_trials_multi_objective_pareto_front() {
    let service = InMemoryService::new();
    let config = StudyConfig::new(
        vec![ParameterSpec::new(
            "x",
            ParameterDomain::Int { low: 0, high: 10 },
        )],
        vec![
            MetricSpec::new("latency", Direction::Minimize),
            MetricSpec::new("accuracy", Direction::Maximize),
        ],
    );
    service.create_study("mo", config).unwrap();
    let study = Study::connect(&service, "mo", "w1").unwrap();

    // (latency, accuracy): the first two are non-dominated, the third is
    // dominated by both.
    let points = [(1.0, 0.7), (5.0, 0.9), (6.0, 0.6)];
    let mut front_uids = Vec::new();
    for (i, (latency, accuracy)) in points.into_iter().enumerate() {
        let mut trial = study.suggest_for(1, &format!("w{i}")).unwrap().pop().unwrap();
        if i < 2 {
            front_uids.push(trial.uid());
        }
        trial
            .complete(CompleteOutcome::final_measurement(Measurement::new(
                1,
                [("latency", latency), ("accuracy", accuracy)],
            )))
            .unwrap();
    }

    let mut optimal: Vec<u64> = study
        .optimal_trials()
        .unwrap()
        .iter()
        .map(|t| t.uid())
        .collect();
    optimal.sort_unstable();
    assert_eq!(optimal, front_uids);
}

#[test]
fn delete_trial_surfaces_not_found_afterwards() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();

    let trial = study.suggest(1).unwrap().pop().unwrap();
    let uid = trial.uid();
    let mut other_handle = study.get_trial(uid).unwrap();

    trial.delete().unwrap();

    assert!(matches!(
        study.get_trial(uid).unwrap_err(),
        Error::NotFound { .. }
    ));
    // A handle created before the deletion dangles predictably.
    assert!(matches!(
        other_handle.materialize(true).unwrap_err(),
        Error::NotFound { .. }
    ));
}

#[test]
fn delete_study_invalidates_outstanding_handles() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();
    let mut trial = study.suggest(1).unwrap().pop().unwrap();
    let second_handle = Study::from_uid(&service, "s").unwrap();

    study.delete().unwrap();

    assert!(matches!(
        trial.refresh().unwrap_err(),
        Error::NotFound { .. }
    ));
    assert!(matches!(
        second_handle.suggest(1).unwrap_err(),
        Error::NotFound { .. }
    ));
    assert!(matches!(
        Study::from_uid(&service, "s").unwrap_err(),
        Error::NotFound { .. }
    ));
}
