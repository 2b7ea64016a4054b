use approx::assert_abs_diff_eq;
use puppeteer_animation_core::{Animation, AnimationError, InterpolationPolicy, Keyframe};
use puppeteer_model_core::{nalgebra::Point3, KinematicModel, ModelDefinition};

fn arm() -> KinematicModel {
    let def: ModelDefinition =
        puppeteer_test_fixtures::models::load("planar-arm").expect("load model fixture");
    KinematicModel::from_definition(&def).expect("build model")
}

fn clip() -> Animation {
    Animation::from_keyframes(
        3,
        InterpolationPolicy::Linear,
        vec![
            Keyframe::new(0.0, vec![0.0, 0.0, 0.0]),
            Keyframe::new(0.1, vec![0.4, -0.2, 0.6]),
            Keyframe::new(0.3, vec![0.2, 0.5, 0.6]),
        ],
    )
    .unwrap()
}

#[test]
fn exact_times_return_stored_states() {
    let anim = clip();
    for key in anim.keyframes() {
        assert_eq!(anim.pose_at(key.time).unwrap(), key.state);
    }
    assert_eq!(anim.first_time(), Some(0.0));
    assert_eq!(anim.last_time(), Some(0.3));
}

#[test]
fn in_between_times_lie_strictly_between_neighbours() {
    let anim = clip();
    let keys = anim.keyframes();
    for pair in keys.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        for step in 1..10 {
            let t = a.time + (b.time - a.time) * step as f64 / 10.0;
            let pose = anim.pose_at(t).unwrap();
            for ((q, lo), hi) in pose.iter().zip(&a.state).zip(&b.state) {
                if lo == hi {
                    assert_eq!(q, lo);
                } else {
                    assert!(q > &lo.min(*hi) && q < &lo.max(*hi), "{q} not inside ({lo}, {hi})");
                }
            }
        }
    }
    assert_abs_diff_eq!(anim.pose_at(0.05).unwrap()[0], 0.2, epsilon = 1e-12);
}

#[test]
fn applying_a_pose_updates_the_model() {
    let mut model = arm();
    let anim = clip();
    anim.apply_to(&mut model, 0.1).unwrap();
    assert_eq!(model.state(), &[0.4, -0.2, 0.6]);
    assert!(!model.is_stale());

    let shoulder = model.frame_by_name("shoulder").unwrap();
    let rsho = model.marker_world_position(shoulder, "RSHO").unwrap();
    assert_abs_diff_eq!(
        rsho,
        Point3::new(0.1 * 0.4_f64.cos(), 0.1 * 0.4_f64.sin(), 0.05),
        epsilon = 1e-12
    );

    let before = model.state().to_vec();
    assert!(matches!(
        anim.apply_to(&mut model, 0.5),
        Err(AnimationError::TimeOutOfRange { .. })
    ));
    assert_eq!(model.state(), before.as_slice());
}

#[test]
fn short_states_are_a_hard_failure() {
    let err = Animation::from_keyframes(
        3,
        InterpolationPolicy::Linear,
        vec![
            Keyframe::new(0.0, vec![0.0, 0.0, 0.0]),
            Keyframe::new(0.1, vec![0.4, -0.2]),
        ],
    )
    .unwrap_err();
    assert_eq!(
        err,
        AnimationError::DofMismatch {
            index: 1,
            expected: 3,
            actual: 2
        }
    );
    assert_eq!(err.category(), "data");

    let mut six_dof = Animation::new(6, InterpolationPolicy::Linear);
    six_dof
        .push(Keyframe::new(0.0, vec![0.0; 6]))
        .unwrap();
    let mut model = arm();
    assert!(matches!(
        six_dof.apply_to(&mut model, 0.0),
        Err(AnimationError::DofMismatch { .. })
    ));
}
