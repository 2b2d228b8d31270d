//! Empirically tuned layout constants (millimeters unless noted).

// ── Noteheads ───────────────────────────────────────────────────────
/// Kicked-off noteheads move by the average notehead width times this,
/// leaving room for the stem between the two notehead columns.
pub(super) const KICK_OFF_DISTANCE_FACTOR: f64 = 1.2;

// ── Ledger lines ────────────────────────────────────────────────────
/// Outermost staff line; ledger lines start beyond it.
pub(super) const STAFF_EDGE_PITCH_POSITION: i32 = 4;
/// Ledger line width relative to the notehead or rest width.
pub(super) const LEDGER_WIDTH_MIN_FACTOR: f64 = 1.2;
pub(super) const LEDGER_WIDTH_MAX_FACTOR: f64 = 2.5;

// ── Rests ───────────────────────────────────────────────────────────
/// A whole rest hangs from the line above its nominal position.
pub(super) const WHOLE_REST_PITCH_OFFSET: i32 = 2;

// ── Pages ───────────────────────────────────────────────────────────
/// Horizontal gap between pages laid side by side in the root space.
pub const PAGE_SPACING: f64 = 10.0;
