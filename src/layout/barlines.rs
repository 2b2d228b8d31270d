use super::column::{Column, ColumnContent};
use crate::error::Result;
use crate::scene::{Field, GlyphType, ObjectId, Scene};
use crate::synth::{glyph_class as gc, GlyphSynthesizer};
use rand::rngs::StdRng;
use rand::Rng;

/// One single barline per stafflines, centered on the staff.
pub(super) fn synthesize_barlines_column(
    scene: &mut Scene,
    staves: &[ObjectId],
    rng: &mut StdRng,
    glyphs: &mut dyn GlyphSynthesizer,
) -> Result<Column> {
    let mut column = Column::new(scene, staves, rng.random(), ColumnContent::Barlines)?;
    for &stafflines in staves {
        let barline = glyphs.synthesize_glyph(scene, gc::BARLINE_SINGLE, GlyphType::Glyph)?;
        let staff_space = scene.require_linked(stafflines, Field::Space)?;
        scene.set_parent_space(scene.glyph_space(barline)?, Some(staff_space))?;
        column.add_glyph(scene, barline)?;
    }
    Ok(column)
}
