//! Glyph synthesis by sampling templates from an in-memory library.

use super::glyph_class as gc;
use super::style::{Styler, WriterStyleDomain};
use super::{verify_glyph, GlyphSynthesizer};
use crate::error::{Result, SynthError};
use crate::geometry::{mm_to_px, Point};
use crate::scene::{Bitmap, GlyphKind, GlyphType, ObjectId, Scene, Sprite};
use log::trace;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// One sampled glyph image.
#[derive(Debug, Clone)]
pub struct GlyphTemplate {
    pub writer: String,
    pub glyph_type: GlyphType,
    pub bitmap: Rc<Bitmap>,
    /// Glyph origin relative to the bitmap size.
    pub origin: Point,
    pub dpi: f64,
}

/// Templates keyed by glyph class.
#[derive(Debug, Clone, Default)]
pub struct GlyphLibrary {
    templates: BTreeMap<String, Vec<GlyphTemplate>>,
}

/// Rectangle stand-ins: class, glyph type, width and height in mm, origin.
const SYNTHETIC_SHAPES: &[(&str, GlyphType, f64, f64, (f64, f64))] = &[
    (gc::BARLINE_SINGLE, GlyphType::Glyph, 0.4, 9.8, (0.5, 0.5)),
    (gc::G_CLEF, GlyphType::Glyph, 6.5, 17.0, (0.5, 0.62)),
    (gc::F_CLEF, GlyphType::Glyph, 6.5, 7.5, (0.5, 0.3)),
    (gc::C_CLEF, GlyphType::Glyph, 6.0, 9.8, (0.5, 0.5)),
    (gc::G_CLEF_SMALL, GlyphType::Glyph, 4.9, 12.8, (0.5, 0.62)),
    (gc::F_CLEF_SMALL, GlyphType::Glyph, 4.9, 5.6, (0.5, 0.3)),
    (gc::C_CLEF_SMALL, GlyphType::Glyph, 4.5, 7.4, (0.5, 0.5)),
    (gc::NOTEHEAD_BLACK, GlyphType::Notehead, 2.0, 1.6, (0.5, 0.5)),
    (gc::NOTEHEAD_HALF, GlyphType::Notehead, 2.0, 1.6, (0.5, 0.5)),
    (gc::NOTEHEAD_WHOLE, GlyphType::Notehead, 2.6, 1.7, (0.5, 0.5)),
    (gc::NOTEHEAD_DOUBLE_WHOLE, GlyphType::Notehead, 3.6, 1.8, (0.5, 0.5)),
    (gc::NOTEHEAD_DOUBLE_WHOLE_SQUARE, GlyphType::Notehead, 3.2, 1.8, (0.5, 0.5)),
    // whole rests hang from their line, half rests sit on theirs
    (gc::REST_WHOLE, GlyphType::Rest, 2.4, 1.0, (0.5, 0.0)),
    (gc::REST_HALF, GlyphType::Rest, 2.4, 1.0, (0.5, 1.0)),
    (gc::REST_DOUBLE_WHOLE, GlyphType::Rest, 1.2, 2.4, (0.5, 0.0)),
    (gc::REST_LONGA, GlyphType::Rest, 1.2, 4.8, (0.5, 0.25)),
    (gc::REST_MAXIMA, GlyphType::Rest, 2.4, 4.8, (0.5, 0.25)),
    (gc::REST_QUARTER, GlyphType::Rest, 2.0, 6.5, (0.5, 0.5)),
    (gc::REST_8TH, GlyphType::Rest, 2.0, 4.5, (0.5, 0.5)),
    (gc::REST_16TH, GlyphType::Rest, 2.4, 6.5, (0.5, 0.5)),
    (gc::REST_32ND, GlyphType::Rest, 2.6, 8.5, (0.5, 0.5)),
    (gc::REST_64TH, GlyphType::Rest, 2.8, 10.5, (0.5, 0.5)),
    (gc::REST_128TH, GlyphType::Rest, 3.0, 12.5, (0.5, 0.5)),
    (gc::REST_256TH, GlyphType::Rest, 3.2, 14.5, (0.5, 0.5)),
    (gc::REST_512TH, GlyphType::Rest, 3.4, 16.5, (0.5, 0.5)),
    (gc::REST_1024TH, GlyphType::Rest, 3.6, 18.5, (0.5, 0.5)),
];

/// Size variants generated per writer.
const SYNTHETIC_VARIANTS: [f64; 2] = [1.0, 1.08];

impl GlyphLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, glyph_class: impl Into<String>, template: GlyphTemplate) {
        self.templates.entry(glyph_class.into()).or_default().push(template);
    }

    /// Solid rectangle templates for every supported class. Each writer
    /// draws slightly larger than the previous one.
    pub fn synthetic(writers: &[String], dpi: f64) -> Self {
        let mut library = Self::new();
        for (w, writer) in writers.iter().enumerate() {
            let writer_scale = 1.0 + 0.15 * (w % 5) as f64;
            for &(class, glyph_type, width, height, (ox, oy)) in SYNTHETIC_SHAPES {
                for variant in SYNTHETIC_VARIANTS {
                    let scale = writer_scale * variant;
                    let px = |mm: f64| mm_to_px(mm * scale, dpi).round().max(1.0) as usize;
                    library.add(
                        class,
                        GlyphTemplate {
                            writer: writer.clone(),
                            glyph_type,
                            bitmap: Rc::new(Bitmap::filled(px(width), px(height), [0, 0, 0, 255])),
                            origin: Point::new(ox, oy),
                            dpi,
                        },
                    );
                }
            }
        }
        library
    }

    pub fn classes(&self) -> BTreeSet<String> {
        self.templates.keys().cloned().collect()
    }

    pub fn writers(&self) -> BTreeSet<String> {
        self.templates
            .values()
            .flatten()
            .map(|t| t.writer.clone())
            .collect()
    }

    /// Templates of one class, preferring the given writer and falling
    /// back to every writer when that one lacks the class.
    fn candidates(&self, glyph_class: &str, writer: Option<&str>) -> Vec<&GlyphTemplate> {
        let all = self.templates.get(glyph_class).map(Vec::as_slice).unwrap_or_default();
        let own: Vec<&GlyphTemplate> = match writer {
            Some(writer) => all.iter().filter(|t| t.writer == writer).collect(),
            None => Vec::new(),
        };
        if own.is_empty() {
            all.iter().collect()
        } else {
            own
        }
    }
}

/// Samples a random template of the requested class.
pub struct LibraryGlyphSynthesizer {
    library: Rc<GlyphLibrary>,
    writer: Option<String>,
    rng: StdRng,
}

impl LibraryGlyphSynthesizer {
    pub fn new(library: Rc<GlyphLibrary>, rng: StdRng) -> Self {
        Self {
            library,
            writer: None,
            rng,
        }
    }
}

impl GlyphSynthesizer for LibraryGlyphSynthesizer {
    fn supported_glyphs(&self) -> BTreeSet<String> {
        self.library.classes()
    }

    fn synthesize_glyph(
        &mut self,
        scene: &mut Scene,
        glyph_class: &str,
        expected: GlyphType,
    ) -> Result<ObjectId> {
        let candidates = self.library.candidates(glyph_class, self.writer.as_deref());
        if candidates.is_empty() {
            return Err(SynthError::UnsupportedGlyphClass(glyph_class.to_string()));
        }
        let template = candidates[self.rng.random_range(0..candidates.len())];

        let mismatch = || SynthError::GlyphTypeMismatch {
            glyph_class: glyph_class.to_string(),
            expected,
            actual: template.glyph_type,
        };
        if expected != GlyphType::Glyph && expected != template.glyph_type {
            return Err(mismatch());
        }
        let kind = match template.glyph_type {
            GlyphType::Notehead => GlyphKind::notehead(),
            GlyphType::Rest => GlyphKind::Rest,
            GlyphType::Glyph => GlyphKind::Plain,
            GlyphType::Line => return Err(mismatch()),
        };
        let glyph = scene.create_glyph(glyph_class, kind)?;
        let sprite = Sprite {
            bitmap_origin: template.origin,
            ..Sprite::new(template.bitmap.clone(), template.dpi)
        };
        scene.add_glyph_sprite(glyph, sprite)?;
        trace!("Sampled {glyph_class} from writer {}", template.writer);

        verify_glyph(scene, glyph, glyph_class, expected)?;
        Ok(glyph)
    }

    fn apply_style(&mut self, styler: &Styler) -> Result<()> {
        self.writer = Some(styler.resolve(WriterStyleDomain::NAME)?.current().to_string());
        Ok(())
    }
}
