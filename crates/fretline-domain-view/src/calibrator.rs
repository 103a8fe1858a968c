/// Changes smaller than this are layout jitter and are ignored.
pub const CALIBRATION_EPSILON_BEATS: f64 = 1e-3;

/// Beat offset that moves a token of the given width so its leading edge,
/// rather than its centre, lands on the hit line.
///
/// Widths are percentages of the full track; `track_span_percent` is the part
/// of the track beyond the hit line. A non-positive span is a degenerate
/// layout and yields 0.
pub fn edge_offset_beats(
    note_width_percent: f64,
    track_span_percent: f64,
    view_lead_in_beats: f64,
) -> f64 {
    if track_span_percent <= 0.0 {
        return 0.0;
    }
    let ratio = (note_width_percent / 2.0) / track_span_percent;
    if ratio <= 0.0 {
        return 0.0;
    }
    ratio * view_lead_in_beats / (1.0 + ratio)
}

#[derive(Clone, Debug)]
pub struct GeometryCalibrator {
    hit_line_percent: f64,
    view_lead_in_beats: f64,
    offset_beats: f64,
}

impl GeometryCalibrator {
    pub fn new(hit_line_percent: f64, view_lead_in_beats: f64) -> Self {
        Self {
            hit_line_percent,
            view_lead_in_beats,
            offset_beats: 0.0,
        }
    }

    pub fn offset_beats(&self) -> f64 {
        self.offset_beats
    }

    pub fn track_span_percent(&self) -> f64 {
        100.0 - self.hit_line_percent
    }

    /// Returns true when the stored offset moved.
    pub fn on_measured_width(&mut self, note_width_percent: f64) -> bool {
        if !note_width_percent.is_finite() {
            return false;
        }
        let next = edge_offset_beats(
            note_width_percent,
            self.track_span_percent(),
            self.view_lead_in_beats,
        );
        if (next - self.offset_beats).abs() < CALIBRATION_EPSILON_BEATS {
            return false;
        }
        self.offset_beats = next;
        true
    }
}
