use fretline_domain_view::{edge_offset_beats, GeometryCalibrator, CALIBRATION_EPSILON_BEATS};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn offset_follows_half_width_ratio() {
    // span 80%, half width 8% -> ratio 0.1 -> 0.1 * 6 / 1.1
    let offset = edge_offset_beats(16.0, 80.0, 6.0);
    assert!(approx(offset, 0.6 / 1.1));
}

#[test]
fn degenerate_span_forces_zero() {
    assert_eq!(edge_offset_beats(16.0, 0.0, 6.0), 0.0);
    assert_eq!(edge_offset_beats(16.0, -5.0, 6.0), 0.0);
}

#[test]
fn zero_width_yields_zero() {
    assert_eq!(edge_offset_beats(0.0, 80.0, 6.0), 0.0);
}

#[test]
fn repeated_measurement_is_idempotent() {
    let mut calibrator = GeometryCalibrator::new(20.0, 6.0);

    assert!(calibrator.on_measured_width(16.0));
    let first = calibrator.offset_beats();
    for _ in 0..5 {
        assert!(!calibrator.on_measured_width(16.0));
    }
    assert_eq!(calibrator.offset_beats(), first);
}

#[test]
fn sub_epsilon_jitter_is_ignored() {
    let mut calibrator = GeometryCalibrator::new(20.0, 6.0);
    calibrator.on_measured_width(16.0);
    let before = calibrator.offset_beats();

    // d(offset)/d(width) is below 0.04 beats per percent here
    assert!(!calibrator.on_measured_width(16.0 + CALIBRATION_EPSILON_BEATS));
    assert_eq!(calibrator.offset_beats(), before);
}

#[test]
fn degenerate_layout_resets_offset() {
    let mut calibrator = GeometryCalibrator::new(100.0, 6.0);
    assert!(!calibrator.on_measured_width(16.0));
    assert_eq!(calibrator.offset_beats(), 0.0);
}

#[test]
fn non_finite_width_is_ignored() {
    let mut calibrator = GeometryCalibrator::new(20.0, 6.0);
    calibrator.on_measured_width(16.0);
    let before = calibrator.offset_beats();
    assert!(!calibrator.on_measured_width(f64::NAN));
    assert_eq!(calibrator.offset_beats(), before);
}
