//! Aspect-preserving fitting of image dimensions into a bounding box.

/// Scale `(width, height)` down so it fits within `max_width x max_height`.
///
/// The width bound is applied first; the height is then re-checked against the
/// already-scaled width and shrunk again if still over. Images that already fit
/// are returned unchanged (never upscaled). Both outputs are at least 1.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }

    let aspect = width as f64 / height as f64;
    let (mut w, mut h) = (width, height);

    if w > max_width {
        w = max_width;
        h = ((w as f64 / aspect).round() as u32).max(1);
    }

    if h > max_height {
        h = max_height;
        w = ((h as f64 * aspect).round() as u32).max(1);
    }

    (w, h)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Output never exceeds either bound.
        #[test]
        fn prop_output_within_bounds(
            width in 1u32..=6000,
            height in 1u32..=6000,
            max_width in 1u32..=2048,
            max_height in 1u32..=2048,
        ) {
            let (w, h) = fit_within(width, height, max_width, max_height);
            prop_assert!(w >= 1 && h >= 1);
            prop_assert!(w <= max_width, "{}x{} -> {}x{} over width", width, height, w, h);
            prop_assert!(h <= max_height, "{}x{} -> {}x{} over height", width, height, w, h);
        }

        /// Aspect ratio is preserved to within one pixel of rounding.
        #[test]
        fn prop_aspect_preserved(
            width in 1u32..=6000,
            height in 1u32..=6000,
            max_width in 1u32..=2048,
            max_height in 1u32..=2048,
        ) {
            let (w, h) = fit_within(width, height, max_width, max_height);
            let ideal_h = w as f64 * height as f64 / width as f64;
            let ideal_w = h as f64 * width as f64 / height as f64;
            prop_assert!(
                (ideal_h - h as f64).abs() <= 1.0 || (ideal_w - w as f64).abs() <= 1.0,
                "{}x{} -> {}x{} drifts from aspect", width, height, w, h
            );
        }

        /// Same input, same output.
        #[test]
        fn prop_deterministic(
            width in 1u32..=6000,
            height in 1u32..=6000,
            max_width in 1u32..=2048,
            max_height in 1u32..=2048,
        ) {
            prop_assert_eq!(
                fit_within(width, height, max_width, max_height),
                fit_within(width, height, max_width, max_height)
            );
        }
    }
}
