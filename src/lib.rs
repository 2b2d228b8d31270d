//! Synthesizes pages of handwritten-looking music notation.
//!
//! A score document is imported into a [`scene::Scene`], handwritten glyphs
//! are sampled and arranged column by column into systems and pages, and
//! the finished scene is handed to a bitmap renderer as a render plan.
//!
//! # Example
//! ```no_run
//! use scoresynth::{synthesize_sample, Score, SynthConfig};
//!
//! let json = std::fs::read_to_string("score.json").unwrap();
//! let doc = Score::from_json(&json).unwrap();
//! let sample = synthesize_sample(&doc, &SynthConfig::default(), 42).unwrap();
//! println!("Pages: {}", sample.pages.len());
//! for plan in sample.render_plans(300.0).unwrap() {
//!     println!("{}", plan.to_json().unwrap());
//! }
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod render;
pub mod scene;
pub mod semantic;
pub mod synth;

pub use config::{BeamConfig, LayoutConfig, PageSetup, SynthConfig};
pub use error::{Result, SynthError};
pub use layout::{BeamStemSynthesizer, ColumnExtent, ColumnLayoutSynthesizer, SystemLayout};
pub use model::Score;
pub use render::{RenderPlan, RenderPlanner, Renderer};
pub use scene::{ObjectId, Scene};
pub use semantic::import_score;

use geometry::Point;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;
use synth::{
    GlyphLibrary, LibraryGlyphSynthesizer, NaiveLineSynthesizer, NaiveStafflinesSynthesizer, PageLayout,
    SimplePageSynthesizer, Styler, WriterStyleDomain,
};

// ═══════════════════════════════════════════════════════════════════════
// Sample pipeline
// ═══════════════════════════════════════════════════════════════════════

/// Everything synthesized for one score.
pub struct Sample {
    pub scene: Scene,
    /// The semantic score entity.
    pub score: ObjectId,
    /// Pages left to right.
    pub pages: Vec<PageLayout>,
    /// Systems in reading order across all pages.
    pub systems: Vec<SystemLayout>,
}

impl Sample {
    /// One render plan per page, framed by the page's view box.
    pub fn render_plans(&self, dpi: f64) -> Result<Vec<RenderPlan>> {
        let mut planner = RenderPlanner::new(dpi);
        self.pages
            .iter()
            .map(|page| {
                let view_box = self.scene.page(page.page)?.view_box;
                planner.render(&self.scene, &view_box)
            })
            .collect()
    }
}

/// Imports `doc` and lays it out on as many pages as it takes. Pages sit
/// side by side in the scene, [`layout::PAGE_SPACING`] apart. The same
/// seed always produces the same scene.
pub fn synthesize_sample(doc: &Score, config: &SynthConfig, seed: u64) -> Result<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = Scene::new();
    let score = import_score(&mut scene, doc)?;

    let mut styler = Styler::new();
    styler.register_domain(Box::new(WriterStyleDomain::new(config.writers.clone())?))?;
    styler.pick_style(&mut rng);

    let library = Rc::new(GlyphLibrary::synthetic(&config.writers, config.render_dpi));
    let glyphs = LibraryGlyphSynthesizer::new(library, StdRng::seed_from_u64(rng.random()));
    let beam_stem = BeamStemSynthesizer::new(config.beams.clone(), StdRng::seed_from_u64(rng.random()));
    let mut layout = ColumnLayoutSynthesizer::new(
        Box::new(glyphs),
        Box::new(NaiveLineSynthesizer::default()),
        beam_stem,
        StdRng::seed_from_u64(rng.random()),
        config.layout.clone(),
    );
    layout.apply_style(&styler)?;
    let mut page_synthesizer =
        SimplePageSynthesizer::new(config.page.clone(), Box::new(NaiveStafflinesSynthesizer::default()));

    let measure_count = scene.measure_count(score);
    let mut pages: Vec<PageLayout> = Vec::new();
    let mut systems: Vec<SystemLayout> = Vec::new();
    let mut next = 0;
    while next < measure_count {
        let origin = Point::new(pages.len() as f64 * (config.page.width + layout::PAGE_SPACING), 0.0);
        let page = page_synthesizer.synthesize_page(&mut scene, origin)?;
        let filled = layout.fill_page(&mut scene, page.page, score, next)?;
        let Some(last) = filled.last() else {
            return Err(SynthError::Layout(format!(
                "page {} cannot hold a system starting at measure {next}",
                pages.len()
            )));
        };
        let end = last.first_measure_index + last.measure_count;
        if end <= next {
            return Err(SynthError::Layout(format!(
                "page {} made no progress past measure {next}",
                pages.len()
            )));
        }
        next = end;
        pages.push(page);
        systems.extend(filled);
    }

    info!(
        "Synthesized {measure_count} measures into {} systems on {} pages (seed {seed})",
        systems.len(),
        pages.len()
    );
    Ok(Sample {
        scene,
        score,
        pages,
        systems,
    })
}
