use super::types::EdgeCurve;

const MIN_EDGE_LENGTH: f32 = 1e-3;

/// Quadratic curve from the source center toward the target, with the end
/// pulled back by `trim` along the center line so it stops at the target's
/// outline. The control point bows perpendicular to the line by
/// `curvature * length`.
pub fn edge_curve(source: (f32, f32), target: (f32, f32), trim: f32, curvature: f32) -> EdgeCurve {
    let dx = target.0 - source.0;
    let dy = target.1 - source.1;
    let len = (dx * dx + dy * dy).sqrt();
    if len < MIN_EDGE_LENGTH {
        return self_loop(source, trim);
    }
    let (ux, uy) = (dx / len, dy / len);
    let cut = trim.clamp(0.0, len);
    let end = (target.0 - ux * cut, target.1 - uy * cut);
    let bow = len * curvature;
    let mid = ((source.0 + end.0) / 2.0, (source.1 + end.1) / 2.0);
    let control = (mid.0 - uy * bow, mid.1 + ux * bow);
    EdgeCurve {
        start: source,
        control,
        end,
    }
}

fn self_loop(center: (f32, f32), trim: f32) -> EdgeCurve {
    let reach = trim.max(MIN_EDGE_LENGTH);
    EdgeCurve {
        start: (center.0 - reach * 0.5, center.1 - reach),
        control: (center.0, center.1 - reach * 3.0),
        end: (center.0 + reach * 0.5, center.1 - reach),
    }
}

pub fn curve_to_path(curve: &EdgeCurve) -> String {
    format!(
        "M {:.2} {:.2} Q {:.2} {:.2} {:.2} {:.2}",
        curve.start.0, curve.start.1, curve.control.0, curve.control.1, curve.end.0, curve.end.1
    )
}
