use optimizer_client::gateway::{Connector, Gateway, InMemoryService};
use optimizer_client::{
    CompleteOutcome, Direction, Error, Measurement, MetricSpec, ParameterDomain, ParameterSpec,
    Study, StudyConfig, TrialStatus,
};

fn service_with_study(uid: &str) -> InMemoryService {
    let service = InMemoryService::new();
    let config = StudyConfig::new(
        vec![ParameterSpec::new(
            "x",
            ParameterDomain::Float {
                low: -1.0,
                high: 1.0,
            },
        )],
        vec![MetricSpec::new("loss", Direction::Minimize)],
    );
    service.create_study(uid, config).unwrap();
    service
}

#[test]
fn trial_starts_active() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();

    let mut trial = study.suggest(1).unwrap().pop().unwrap();
    assert_eq!(trial.status().unwrap(), TrialStatus::Active);
}

#[test]
fn complete_with_measurement_sets_final_and_status() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();
    let mut trial = study.suggest(1).unwrap().pop().unwrap();

    let m = Measurement::new(100, [("loss", 0.5)]).with_elapsed_secs(3.0);
    let result = trial
        .complete(CompleteOutcome::final_measurement(m.clone()))
        .unwrap();

    assert_eq!(result, Some(m.clone()));
    assert_eq!(trial.status().unwrap(), TrialStatus::Completed);
    assert_eq!(trial.materialize(true).unwrap().final_measurement, Some(m));
}

#[test]
fn complete_infeasible_returns_none() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();
    let mut trial = study.suggest(1).unwrap().pop().unwrap();

    let result = trial
        .complete(CompleteOutcome::infeasible("out of memory"))
        .unwrap();

    assert_eq!(result, None);
    assert_eq!(trial.status().unwrap(), TrialStatus::Infeasible);
    let record = trial.materialize(true).unwrap();
    assert_eq!(record.infeasible_reason.as_deref(), Some("out of memory"));
    assert_eq!(record.final_measurement, None);
}

#[test]
fn complete_infeasible_can_carry_diagnostic_measurement() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();
    let mut trial = study.suggest(1).unwrap().pop().unwrap();

    let diag = Measurement::new(5, [("loss", f64::NAN)]);
    let result = trial
        .complete(CompleteOutcome::infeasible("loss diverged").with_measurement(diag))
        .unwrap();

    // Infeasible trials return None even when a diagnostic is attached.
    assert_eq!(result, None);
    let record = trial.materialize(true).unwrap();
    assert_eq!(record.status, TrialStatus::Infeasible);
    assert!(record.final_measurement.is_some());
}

#[test]
fn complete_from_intermediates_promotes_most_recent() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();
    let mut trial = study.suggest(1).unwrap().pop().unwrap();

    let m1 = Measurement::new(1, [("loss", 0.9)]);
    let m2 = Measurement::new(2, [("loss", 0.4)]);
    trial.add_measurement(m1).unwrap();
    trial.add_measurement(m2.clone()).unwrap();

    let result = trial.complete(CompleteOutcome::from_intermediates()).unwrap();
    assert_eq!(result, Some(m2));
    assert_eq!(trial.status().unwrap(), TrialStatus::Completed);
}

#[test]
fn complete_from_intermediates_without_history_fails() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();
    let mut trial = study.suggest(1).unwrap().pop().unwrap();

    let err = trial
        .complete(CompleteOutcome::from_intermediates())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    // The failed completion did not transition the trial.
    assert_eq!(trial.status().unwrap(), TrialStatus::Active);
}

#[test]
fn terminal_trials_reject_recompletion() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();
    let mut trial = study.suggest(1).unwrap().pop().unwrap();
    let uid = trial.uid();

    trial
        .complete(CompleteOutcome::final_measurement(Measurement::new(
            1,
            [("loss", 0.1)],
        )))
        .unwrap();

    // Client-side guard: the mirror already shows a terminal status.
    let err = trial
        .complete(CompleteOutcome::infeasible("too late"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    // Service-side guard: a fresh handle with no mirror hits the service.
    let mut fresh = study.get_trial(uid).unwrap();
    let err = fresh
        .complete(CompleteOutcome::final_measurement(Measurement::new(
            2,
            [("loss", 0.2)],
        )))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(fresh.status().unwrap(), TrialStatus::Completed);
}

#[test]
fn terminal_trials_reject_measurements() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();
    let mut trial = study.suggest(1).unwrap().pop().unwrap();

    trial
        .complete(CompleteOutcome::infeasible("infeasible"))
        .unwrap();
    let err = trial
        .add_measurement(Measurement::new(1, [("loss", 1.0)]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[test]
fn add_measurement_preserves_report_order() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();
    let mut trial = study.suggest(1).unwrap().pop().unwrap();

    let m1 = Measurement::new(1, [("loss", 0.8)]);
    let m2 = Measurement::new(2, [("loss", 0.6)]);
    let m3 = Measurement::new(3, [("loss", 0.5)]);
    trial.add_measurement(m1.clone()).unwrap();
    trial.add_measurement(m2.clone()).unwrap();
    trial.add_measurement(m3.clone()).unwrap();

    let record = trial.materialize(true).unwrap();
    assert_eq!(record.measurements, vec![m1, m2, m3]);
}

#[test]
fn should_stop_follows_study_stop_rule() {
    let service = service_with_study("s");
    service
        .set_stop_rule("s", |record| record.measurements.len() >= 2)
        .unwrap();
    let study = Study::connect(&service, "s", "w1").unwrap();
    let mut trial = study.suggest(1).unwrap().pop().unwrap();

    assert!(!trial.should_stop().unwrap());
    trial
        .add_measurement(Measurement::new(1, [("loss", 0.9)]))
        .unwrap();
    trial
        .add_measurement(Measurement::new(2, [("loss", 0.8)]))
        .unwrap();
    assert!(trial.should_stop().unwrap());

    // Advisory only: the poll did not transition the trial.
    assert_eq!(trial.materialize(false).unwrap().status, TrialStatus::Active);
}

#[test]
fn stop_request_is_advisory_not_terminal() {
    let service = service_with_study("s");
    let study = Study::connect(&service, "s", "w1").unwrap();
    let mut trial = study.suggest(1).unwrap().pop().unwrap();
    let uid = trial.uid();

    let gateway = service.connect("s", "scheduler").unwrap();
    gateway.stop_trial(uid).unwrap();

    assert!(trial.should_stop().unwrap());
    trial.refresh().unwrap();
    assert_eq!(trial.status().unwrap(), TrialStatus::RequestedToStop);

    // A requested-to-stop trial can still be completed normally.
    let result = trial
        .complete(CompleteOutcome::final_measurement(Measurement::new(
            3,
            [("loss", 0.3)],
        )))
        .unwrap();
    assert!(result.is_some());
    assert_eq!(trial.status().unwrap(), TrialStatus::Completed);
}
