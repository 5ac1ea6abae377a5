use crate::foundation::core::Point;
use crate::model::BorderGeometry;

/// Maps a cyclic percentage to a pixel anchor on the border stroke
/// centerline.
///
/// The outline is traversed clockwise from the top-left corner, inset by
/// `stroke_width / 2` on every side. Corners are traversed square: the
/// radius shapes the drawn border, not the path length, so a constant
/// angular speed along the path never jumps at a corner. The returned point
/// is offset by `-element_size / 2` in both axes so the element is centered
/// on the path.
///
/// Degenerate dimensions (zero or negative) return the origin.
pub fn position_on_perimeter(
    percent: f64,
    width: f64,
    height: f64,
    stroke_width: f64,
    _radius: f64,
    element_size: f64,
) -> Point {
    if width <= 0.0 || height <= 0.0 {
        return Point::ZERO;
    }

    let stroke = stroke_width.max(0.0);
    let inner_w = (width - stroke).max(0.0);
    let inner_h = (height - stroke).max(0.0);
    let perimeter = 2.0 * (inner_w + inner_h);
    if perimeter <= 0.0 {
        return Point::ZERO;
    }

    // True modulo so negative percents wrap instead of clamping.
    let percent = percent.rem_euclid(100.0);
    let mut distance = percent / 100.0 * perimeter;
    let inset = stroke * 0.5;

    // Walk top -> right -> bottom -> left along the centerline.
    let (x, y) = if distance < inner_w {
        (inset + distance, inset)
    } else {
        distance -= inner_w;
        if distance < inner_h {
            (inset + inner_w, inset + distance)
        } else {
            distance -= inner_h;
            if distance < inner_w {
                (inset + inner_w - distance, inset + inner_h)
            } else {
                distance -= inner_w;
                (inset, inset + inner_h - distance)
            }
        }
    };

    Point::new(x - element_size * 0.5, y - element_size * 0.5)
}

/// Convenience wrapper taking the host-supplied border geometry.
pub fn position_on_border(percent: f64, geometry: &BorderGeometry, element_size: f64) -> Point {
    position_on_perimeter(
        percent,
        geometry.container_width_px,
        geometry.container_height_px,
        geometry.width_px,
        geometry.radius_px,
        element_size,
    )
}
