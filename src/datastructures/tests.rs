use super::*;

#[test]
fn test_claims_run_from_k_down_to_one() {
    let state = FrontierState::new(5);
    let claims: Vec<usize> = std::iter::from_fn(|| state.claim_step()).collect();
    assert_eq!(claims, vec![5, 4, 3, 2, 1]);
}

#[test]
fn test_claim_stays_exhausted() {
    let state = FrontierState::new(2);
    assert_eq!(state.claim_step(), Some(2));
    assert_eq!(state.claim_step(), Some(1));
    assert_eq!(state.claim_step(), None);
    assert_eq!(state.claim_step(), None);
}

#[test]
fn test_step_size_scales_with_point_count() {
    let coarse = Calibration::new(1.0, 4.0, 3);
    assert_eq!(coarse.step_size, 1.0);
    assert_eq!(coarse.max_return, 4.0);
    let fine = Calibration::new(1.0, 4.0, 6);
    assert_eq!(fine.step_size, 0.5);
    assert_eq!(fine.max_return, 4.0);
}

#[test]
fn test_target_return_formula() {
    let calibration = Calibration::new(1.0, 4.0, 3);
    assert_eq!(calibration.target_return(1), 4.0);
    assert_eq!(calibration.target_return(2), 3.0);
    // Step K lands one step short of the minimum return.
    assert_eq!(calibration.target_return(3), 2.0);
}

#[test]
fn test_points_are_recorded_exactly_once() {
    let state = FrontierState::new(3);
    let point = FrontierPoint {
        ret: 2.0,
        variance: 0.5,
    };
    assert!(state.record(2, point).is_ok());
    assert!(state.record(2, point).is_err());
    assert_eq!(state.points()[1], point);
}

#[test]
fn test_record_rejects_out_of_range_steps() {
    let state = FrontierState::new(3);
    let point = FrontierPoint::default();
    assert!(state.record(0, point).is_err());
    assert!(state.record(4, point).is_err());
}

#[test]
fn test_unwritten_points_stay_at_default() {
    let state = FrontierState::new(4);
    state
        .record(
            1,
            FrontierPoint {
                ret: 4.0,
                variance: 1.0,
            },
        )
        .unwrap();
    let points = state.points();
    assert_eq!(points.len(), 4);
    assert_eq!(points[1], FrontierPoint::default());
    assert_eq!(points[3], FrontierPoint::default());
}

#[test]
fn test_calibration_is_published_once() {
    let state = FrontierState::new(2);
    assert!(state.calibration().is_err());
    let calibration = Calibration::new(1.0, 4.0, 2);
    assert!(state.publish_calibration(calibration).is_ok());
    assert_eq!(state.calibration().unwrap(), calibration);
    assert!(state.publish_calibration(calibration).is_err());
}
