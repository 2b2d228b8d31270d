//! Stems and beams.
//!
//! Stems are first drawn per chord with a fixed length. Then a line is
//! fitted through the stem tips of every beamed group, beams and hooks are
//! drawn along it, and the stems of the group are drawn again so that
//! their tips land on the beam.

use super::stem_inference_error;
use crate::config::BeamConfig;
use crate::error::{Result, SynthError};
use crate::geometry::{Point, Vector2};
use crate::scene::{BeamCoordinateSystem, EntityKind, Field, LineKind, ObjectId, Scene};
use crate::semantic::{BeamValue, ScoreMeasure, StemValue};
use crate::synth::{glyph_class as gc, LineSynthesizer};
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;

pub struct BeamStemSynthesizer {
    pub config: BeamConfig,
    rng: StdRng,
}

impl BeamStemSynthesizer {
    pub fn new(config: BeamConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    /// Draws stems for every chord of the measure and beams for every
    /// beamed group, all parented to `paper_space`.
    pub fn synthesize_for_measure(
        &mut self,
        scene: &mut Scene,
        lines: &mut dyn LineSynthesizer,
        paper_space: ObjectId,
        score_measure: &ScoreMeasure,
    ) -> Result<()> {
        let mut chords: Vec<ObjectId> = Vec::new();
        let mut groups: Vec<ObjectId> = Vec::new();
        for score_event in &score_measure.events {
            for &event in &score_event.events {
                for durable in scene.linked(event, Field::Durables) {
                    if scene.kind_of(durable)? != EntityKind::Note {
                        continue;
                    }
                    let chord = scene.chord_of_note(durable)?;
                    if !chords.contains(&chord) {
                        chords.push(chord);
                    }
                    if let Some(group) = scene.beamed_group_of_chord(chord)? {
                        if !groups.contains(&group) {
                            groups.push(group);
                        }
                    }
                }
            }
        }

        for &chord in &chords {
            self.synthesize_stem(scene, lines, paper_space, chord)?;
        }
        for &group in &groups {
            self.synthesize_beams(scene, lines, paper_space, group)?;
        }
        for &group in &groups {
            self.adjust_stems_for_beamed_group(scene, lines, paper_space, group)?;
        }
        debug!("Drew {} stems and {} beamed groups", chords.len(), groups.len());
        Ok(())
    }

    /// The unconstrained stem of a chord: from the notehead farthest from
    /// the tip, through the notehead nearest to it, one stem length beyond.
    /// Chords without a stem get `None`.
    pub fn synthesize_stem(
        &mut self,
        scene: &mut Scene,
        lines: &mut dyn LineSynthesizer,
        paper_space: ObjectId,
        chord: ObjectId,
    ) -> Result<Option<ObjectId>> {
        let notes = scene.linked(chord, Field::Notes);
        let (Some(&lowest), Some(&highest)) = (notes.first(), notes.last()) else {
            return Err(SynthError::InvalidScore(format!("chord {chord} has no notes")));
        };
        let stem_value = match scene.chord(chord)?.stem_value {
            Some(StemValue::NoStem) => return Ok(None),
            Some(value) => value,
            None => return Err(stem_inference_error(scene, lowest)?),
        };

        let up = stem_value == StemValue::Up;
        let (base_note, center_note) = if up { (lowest, highest) } else { (highest, lowest) };
        let base = self.stem_base_point(scene, paper_space, base_note, stem_value)?;
        let center = self.stem_base_point(scene, paper_space, center_note, stem_value)?;
        let direction = if up { -1.0 } else { 1.0 };
        let tip = center + Vector2::new(0.0, direction * self.config.stem_length);

        let stem = lines.synthesize_line(scene, LineKind::Stem, gc::STEM, base, tip)?;
        scene.set_parent_space(scene.glyph_space(stem)?, Some(paper_space))?;
        scene.set_link(stem, Field::Chord, Some(chord))?;
        Ok(Some(stem))
    }

    /// Where a stem leaves the notehead of `note`, in paper space.
    fn stem_base_point(
        &self,
        scene: &Scene,
        paper_space: ObjectId,
        note: ObjectId,
        stem_value: StemValue,
    ) -> Result<Point> {
        let notehead = scene.notehead_of_note(note)?;
        let offset = match stem_value {
            StemValue::Down => -self.config.stem_base_offset,
            _ => self.config.stem_base_offset,
        };
        let to_paper = scene.transform_from(paper_space, scene.glyph_space(notehead)?)?;
        Ok(to_paper.apply_to(Point::new(offset, 0.0)))
    }

    /// Stems of the group's chords with their tips and directions.
    fn group_stems(
        &self,
        scene: &Scene,
        paper_space: ObjectId,
        group: ObjectId,
    ) -> Result<Vec<(ObjectId, Point, StemValue)>> {
        let chords = scene.linked(group, Field::Chords);
        if chords.len() < 2 {
            return Err(SynthError::Layout(format!("beamed group {group} has fewer than two chords")));
        }
        let mut stems = Vec::with_capacity(chords.len());
        for chord in chords {
            let stem = scene
                .stem_of_chord(chord)?
                .ok_or_else(|| SynthError::Layout(format!("beamed chord {chord} has no stem")))?;
            let stem_value = match scene.chord(chord)?.stem_value {
                Some(value @ (StemValue::Up | StemValue::Down)) => value,
                other => {
                    return Err(SynthError::Layout(format!(
                        "beamed chord {chord} must have an up or down stem, got {other:?}"
                    )));
                }
            };
            let (_, tip) = scene.line_endpoints(stem, paper_space)?;
            stems.push((chord, tip, stem_value));
        }
        Ok(stems)
    }

    pub fn synthesize_beams(
        &mut self,
        scene: &mut Scene,
        lines: &mut dyn LineSynthesizer,
        paper_space: ObjectId,
        group: ObjectId,
    ) -> Result<ObjectId> {
        let stems = self.group_stems(scene, paper_space, group)?;
        let tips: Vec<(Point, StemValue)> = stems.iter().map(|&(_, tip, value)| (tip, value)).collect();
        let f = fit_beam(&tips, &self.config, &mut self.rng);

        let coordinates = scene.insert(f);
        scene.set_link(coordinates, Field::BeamedGroup, Some(group))?;
        scene.set_link(coordinates, Field::Space, Some(paper_space))?;

        let beamed_group = scene.beamed_group(group)?.clone();
        if beamed_group.beam_values.len() != stems.len() {
            return Err(SynthError::InvalidScore(format!(
                "beamed group {group} has beam values for {} of {} chords",
                beamed_group.beam_values.len(),
                stems.len()
            )));
        }
        for (beam_number, indices) in beamed_group.beams()? {
            let (Some(&first), Some(&last)) = (indices.first(), indices.last()) else {
                continue;
            };
            let values: Vec<StemValue> = indices.iter().map(|&i| stems[i].2).collect();
            let stem_value = majority(&values);
            let start = f.point(stems[first].1.x, beam_number, stem_value);
            let end = f.point(stems[last].1.x, beam_number, stem_value);
            let beam = lines.synthesize_line(scene, LineKind::Beam { beam_number }, gc::BEAM, start, end)?;
            scene.set_parent_space(scene.glyph_space(beam)?, Some(paper_space))?;
            let chords: Vec<ObjectId> = indices.iter().map(|&i| stems[i].0).collect();
            scene.set_links(beam, Field::Chords, &chords)?;
        }

        for (beam_number, index, hook) in beamed_group.hooks() {
            let (chord, tip, stem_value) = stems[index];
            let length = if hook == BeamValue::ForwardHook {
                self.config.hook_length
            } else {
                -self.config.hook_length
            };
            let start = f.point(tip.x, beam_number, stem_value);
            let end = f.point(tip.x + length, beam_number, stem_value);
            let line = lines.synthesize_line(
                scene,
                LineKind::BeamHook { beam_number, hook },
                gc::BEAM_HOOK,
                start,
                end,
            )?;
            scene.set_parent_space(scene.glyph_space(line)?, Some(paper_space))?;
            scene.set_link(line, Field::BeamedGroup, Some(group))?;
            scene.set_link(line, Field::Chord, Some(chord))?;
        }
        Ok(coordinates)
    }

    /// Replaces every stem of the group with one ending on the beam.
    pub fn adjust_stems_for_beamed_group(
        &mut self,
        scene: &mut Scene,
        lines: &mut dyn LineSynthesizer,
        paper_space: ObjectId,
        group: ObjectId,
    ) -> Result<()> {
        let coordinates = scene
            .beam_coordinate_system_of_group(group)?
            .ok_or_else(|| SynthError::Layout(format!("beamed group {group} has no beam yet")))?;
        let f = *scene.beam_coordinates(coordinates)?;

        for (chord, _, stem_value) in self.group_stems(scene, paper_space, group)? {
            let Some(old) = scene.stem_of_chord(chord)? else {
                continue;
            };
            let (base, tip) = scene.line_endpoints(old, paper_space)?;
            let end = f.point(tip.x, 1, stem_value);
            let class = scene.glyph(old)?.glyph_class.clone();
            scene.remove_glyph(old)?;

            let stem = lines.synthesize_line(scene, LineKind::Stem, &class, base, end)?;
            scene.set_parent_space(scene.glyph_space(stem)?, Some(paper_space))?;
            scene.set_link(stem, Field::Chord, Some(chord))?;
        }
        Ok(())
    }
}

/// Symmetric clamp into `[-limit, limit]` that flattens out smoothly.
pub fn softclamp(x: f64, limit: f64) -> f64 {
    (x / limit).tanh() * limit
}

/// Most common stem direction; ties go to the one seen first.
fn majority(values: &[StemValue]) -> StemValue {
    let mut best: Option<(StemValue, usize)> = None;
    for &value in values {
        let count = values.iter().filter(|&&v| v == value).count();
        if best.map_or(true, |(_, most)| count > most) {
            best = Some((value, count));
        }
    }
    best.map_or(StemValue::Up, |(value, _)| value)
}

/// Fits the beam line through the stem tips.
///
/// The slope comes from an orthogonal least-squares fit, is replaced by a
/// small random tilt when nearly flat and is soft-clamped. The beam is then
/// shifted so it never shortens a stem: above every up-stem tip and below
/// every down-stem tip. Mixed groups average the two placements weighted by
/// the number of stems in each direction.
pub(super) fn fit_beam(tips: &[(Point, StemValue)], config: &BeamConfig, rng: &mut StdRng) -> BeamCoordinateSystem {
    let n = tips.len().max(1) as f64;
    let mean_x = tips.iter().map(|(p, _)| p.x).sum::<f64>() / n;
    let mean_y = tips.iter().map(|(p, _)| p.y).sum::<f64>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (p, _) in tips {
        let (dx, dy) = (p.x - mean_x, p.y - mean_y);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let mut slope = (0.5 * (2.0 * sxy).atan2(sxx - syy)).tan();
    if slope.abs() < config.flat_slope_threshold {
        slope = if config.beam_slope_jitter > 0.0 {
            rng.random_range(-config.beam_slope_jitter..config.beam_slope_jitter)
        } else {
            0.0
        };
    }
    let k = softclamp(slope, config.max_beam_slope);

    let Some(&(origin, _)) = tips.first() else {
        return BeamCoordinateSystem {
            k,
            q: 0.0,
            beam_spacing: config.beam_spacing,
        };
    };
    let touching_q = |stem_value: StemValue| -> Option<f64> {
        let f = |x: f64| origin.y + (x - origin.x) * k;
        let gaps = tips
            .iter()
            .filter(|(_, v)| *v == stem_value)
            .map(|(p, _)| f(p.x) - p.y);
        let offset = match stem_value {
            StemValue::Up => -gaps.fold(None, |m: Option<f64>, g| Some(m.map_or(g, |m| m.max(g))))?,
            _ => -gaps.fold(None, |m: Option<f64>, g| Some(m.map_or(g, |m| m.min(g))))?,
        };
        Some(f(0.0) + offset)
    };

    let up_count = tips.iter().filter(|(_, v)| *v == StemValue::Up).count() as f64;
    let down_count = tips.iter().filter(|(_, v)| *v == StemValue::Down).count() as f64;
    let q = match (touching_q(StemValue::Up), touching_q(StemValue::Down)) {
        (Some(up), Some(down)) => (up * up_count + down * down_count) / (up_count + down_count),
        (Some(up), None) => up,
        (None, Some(down)) => down,
        (None, None) => origin.y - origin.x * k,
    };

    BeamCoordinateSystem {
        k,
        q,
        beam_spacing: config.beam_spacing,
    }
}
