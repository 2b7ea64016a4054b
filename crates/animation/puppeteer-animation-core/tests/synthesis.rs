use std::cell::Cell;

use approx::assert_abs_diff_eq;
use puppeteer_animation_core::{
    AnimationSynthesizer, NeverCancel, SynthesisConfig, SynthesisError,
};
use puppeteer_fitting_core::{FitConfig, FitStatus, FitStrategy, FittingEngine};
use puppeteer_markers_core::{CaptureData, MarkerError, MarkerStore, MarkerStoreConfig, MarkerTrajectory};
use puppeteer_model_core::{nalgebra::Point3, KinematicModel, ModelDefinition};

const FAILING_FRAME: i32 = 5;

fn chain() -> KinematicModel {
    let def: ModelDefinition =
        puppeteer_test_fixtures::models::load("two-frame-chain").expect("load model fixture");
    KinematicModel::from_definition(&def).expect("build model")
}

/// TIP swings about y on the unit sphere around the origin, sampled in mm at
/// 100 Hz over frames 1..=10. At `FAILING_FRAME` it jumps out of reach.
fn swing_capture(occluded: Option<i32>) -> MarkerStore {
    let points: Vec<[f64; 3]> = (1..=10)
        .map(|frame| {
            if Some(frame) == occluded {
                [f64::NAN; 3]
            } else if frame == FAILING_FRAME {
                [0.0, 0.0, 5000.0]
            } else {
                let a = 0.1 * frame as f64;
                [1000.0 * a.sin(), 0.0, 1000.0 * a.cos()]
            }
        })
        .collect();
    let capture = CaptureData {
        first_frame: 1,
        last_frame: 10,
        sample_rate: 100.0,
        trajectories: vec![MarkerTrajectory::from_points("TIP", &points)],
    };
    MarkerStore::new(capture, MarkerStoreConfig::default()).unwrap()
}

fn engine(strategy: FitStrategy) -> FittingEngine {
    FittingEngine::new(FitConfig::default().with_strategy(strategy)).unwrap()
}

#[test]
fn one_failed_frame_does_not_stop_the_batch() {
    let mut model = chain();
    let mut markers = swing_capture(None);
    let mut fitter = engine(FitStrategy::Analytic);

    let report = AnimationSynthesizer::default()
        .synthesize(&mut model, &mut markers, &mut fitter, 1..=10, &NeverCancel)
        .unwrap();

    assert_eq!(report.animation.len(), 10);
    assert_eq!(report.frames.len(), 10);
    assert!(!report.cancelled);
    assert!(!report.success);
    assert_eq!(report.failed_frames().collect::<Vec<_>>(), vec![FAILING_FRAME]);
    for frame in &report.frames {
        if frame.frame == FAILING_FRAME {
            assert!(!frame.success);
            assert!(frame.status.is_some());
        } else {
            assert!(frame.success, "frame {} failed: {:?}", frame.frame, frame.status);
            assert_eq!(frame.status, Some(FitStatus::Converged));
        }
    }

    let times: Vec<f64> = report.animation.keyframes().iter().map(|k| k.time).collect();
    assert_abs_diff_eq!(times[0], 0.0);
    assert_abs_diff_eq!(times[9], 0.09, epsilon = 1e-12);

    // The last fitted pose stays committed to the model.
    let last = report.animation.keyframes().last().unwrap();
    assert_eq!(model.state(), last.state.as_slice());
    let child = model.frame_by_name("child").unwrap();
    let tip = model.marker_world_position(child, "TIP").unwrap();
    assert_abs_diff_eq!(tip, Point3::new(1.0_f64.sin(), 0.0, 1.0_f64.cos()), epsilon = 1e-5);
    // Only child markers exist, so the root never moves under the per-joint strategy.
    assert_eq!(&last.state[..3], &[0.0, 0.0, 0.0]);
}

#[test]
fn global_strategy_reaches_the_outlier_by_translating_the_root() {
    let mut model = chain();
    let mut markers = swing_capture(None);
    let mut fitter = engine(FitStrategy::LevenbergMarquardt);

    let report = AnimationSynthesizer::default()
        .synthesize(&mut model, &mut markers, &mut fitter, 1..=10, &NeverCancel)
        .unwrap();
    assert!(report.success, "{:?}", report.failed_frames().collect::<Vec<_>>());
    assert_eq!(report.animation.len(), 10);
}

#[test]
fn cancellation_keeps_partial_results() {
    let mut model = chain();
    let mut markers = swing_capture(None);
    let mut fitter = engine(FitStrategy::Analytic);
    let polls = Cell::new(0);
    let cancel = || {
        polls.set(polls.get() + 1);
        polls.get() > 3
    };

    let report = AnimationSynthesizer::default()
        .synthesize(&mut model, &mut markers, &mut fitter, 1..=10, &cancel)
        .unwrap();
    assert!(report.cancelled);
    assert!(!report.success);
    assert_eq!(report.animation.len(), 3);
    assert!(report.frames.iter().all(|f| f.success));
    assert_eq!(markers.current_frame(), 3);
}

#[test]
fn frames_without_visible_markers_hold_the_previous_pose() {
    let mut model = chain();
    let mut markers = swing_capture(Some(3));
    let mut fitter = engine(FitStrategy::Analytic);

    let report = AnimationSynthesizer::default()
        .synthesize(&mut model, &mut markers, &mut fitter, 1..=4, &NeverCancel)
        .unwrap();
    let frame3 = &report.frames[2];
    assert_eq!(frame3.status, None);
    assert_eq!(frame3.occluded, vec!["TIP".to_string()]);
    assert!(!frame3.success);
    let keys = report.animation.keyframes();
    assert_eq!(keys[2].state, keys[1].state);
    assert!(report.frames[3].success);
}

#[test]
fn batch_configuration_errors_leave_the_model_alone() {
    let mut model = chain();
    let mut markers = swing_capture(None);
    let mut fitter = engine(FitStrategy::Analytic);
    let synth = AnimationSynthesizer::new(SynthesisConfig::default());
    let before = model.state().to_vec();

    let err = synth
        .synthesize(&mut model, &mut markers, &mut fitter, 0..=10, &NeverCancel)
        .unwrap_err();
    assert!(matches!(
        err,
        SynthesisError::Markers(MarkerError::FrameOutOfRange { frame: 0, .. })
    ));
    assert_eq!(err.category(), "range");

    let err = synth
        .synthesize(&mut model, &mut markers, &mut fitter, 6..=4, &NeverCancel)
        .unwrap_err();
    assert_eq!(err, SynthesisError::EmptyRange { start: 6, end: 4 });

    let child = model.frame_by_name("child").unwrap();
    model
        .set_marker_offset(child, "GHOST", puppeteer_model_core::nalgebra::Vector3::x())
        .unwrap();
    let err = synth
        .synthesize(&mut model, &mut markers, &mut fitter, 1..=10, &NeverCancel)
        .unwrap_err();
    assert_eq!(
        err,
        SynthesisError::MissingMarker {
            name: "GHOST".into()
        }
    );

    assert_eq!(model.state(), before.as_slice());
    assert_eq!(markers.current_frame(), 1);
}
