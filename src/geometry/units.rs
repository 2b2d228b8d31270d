/// Millimeters in one inch.
pub const MILLIMETERS_IN_INCH: f64 = 25.4;

/// Inches in one millimeter.
pub const INCHES_IN_MILLIMETER: f64 = 1.0 / MILLIMETERS_IN_INCH;

pub fn px_to_mm(pixels: f64, dpi: f64) -> f64 {
    (pixels / dpi) * MILLIMETERS_IN_INCH
}

pub fn mm_to_px(millimeters: f64, dpi: f64) -> f64 {
    millimeters * INCHES_IN_MILLIMETER * dpi
}
