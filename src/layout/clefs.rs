//! System header: the clefs active at the first measure of a system.

use super::column::{Column, ColumnContent};
use crate::error::{Result, SynthError};
use crate::scene::{Field, GlyphType, ObjectId, Scene};
use crate::synth::{glyph_class as gc, GlyphSynthesizer};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeSet;

/// One clef per staff, taken from the attributes of the first event of
/// `measure_index` in every part. Every staff must end up with exactly one.
pub(super) fn synthesize_header_clefs(
    scene: &mut Scene,
    staves: &[ObjectId],
    rng: &mut StdRng,
    glyphs: &mut dyn GlyphSynthesizer,
    score: ObjectId,
    measure_index: usize,
) -> Result<Column> {
    let mut column = Column::new(scene, staves, rng.random(), ColumnContent::Clefs(Vec::new()))?;
    let mut placed = Vec::new();
    let mut handled: BTreeSet<usize> = BTreeSet::new();

    for part in scene.parts_of(score) {
        let measure = scene
            .linked(part, Field::Measures)
            .get(measure_index)
            .copied()
            .ok_or_else(|| SynthError::Layout(format!("part {part} has no measure {measure_index}")))?;
        let event = scene
            .linked(measure, Field::Events)
            .first()
            .copied()
            .ok_or_else(|| SynthError::Layout(format!("measure {measure} has no events")))?;
        let clefs = scene.event(event)?.attributes.clefs.clone();
        let first_staff = scene.first_staff_index_of_part(part)?;

        for (staff_number, clef) in clefs {
            let staff_index = first_staff + usize::from(staff_number) - 1;
            let stafflines = staves.get(staff_index).copied().ok_or_else(|| {
                SynthError::Layout(format!("clef for staff {staff_index} but the system has {} staves", staves.len()))
            })?;
            if !handled.insert(staff_index) {
                return Err(SynthError::Layout(format!("staff {staff_index} got a clef twice")));
            }

            let class = gc::clef_from_clef_sign(clef.sign, false)?;
            let glyph = glyphs.synthesize_glyph(scene, class, GlyphType::Glyph)?;
            let staff_space = scene.require_linked(stafflines, Field::Space)?;
            scene.set_parent_space(scene.glyph_space(glyph)?, Some(staff_space))?;
            column.add_glyph(scene, glyph)?;
            placed.push((glyph, clef));
        }
    }

    if handled.len() != staves.len() {
        return Err(SynthError::Layout(format!(
            "only {} of {} staves got a header clef",
            handled.len(),
            staves.len()
        )));
    }
    column.content = ColumnContent::Clefs(placed);
    Ok(column)
}
