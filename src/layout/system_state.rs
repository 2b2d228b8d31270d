//! Column accumulation and horizontal placement for one system.

use super::column::Column;
use crate::error::{Result, SynthError};
use crate::scene::Scene;
use crate::synth::LineSynthesizer;
use log::trace;

/// Columns of a system being built, with their tight total width.
pub(super) struct SystemState {
    spacing: f64,
    pub(super) columns: Vec<Column>,
    /// Width of all columns stacked tightly with minimal spacing.
    pub(super) total_width: f64,
    current_measure: Option<usize>,
    pub(super) measure_indices: Vec<usize>,
}

impl SystemState {
    pub(super) fn new(minimal_column_spacing: f64) -> Self {
        Self {
            spacing: minimal_column_spacing,
            columns: Vec::new(),
            total_width: 0.0,
            current_measure: None,
            measure_indices: Vec::new(),
        }
    }

    pub(super) fn enter_measure(&mut self, measure_index: usize) -> Result<()> {
        if self.measure_indices.contains(&measure_index) {
            return Err(SynthError::Layout(format!("measure {measure_index} entered twice")));
        }
        self.current_measure = Some(measure_index);
        self.measure_indices.push(measure_index);
        Ok(())
    }

    pub(super) fn exit_measure(&mut self) {
        self.current_measure = None;
    }

    pub(super) fn measure_count(&self) -> usize {
        self.measure_indices.len()
    }

    /// Positions the column at its default time to measure it, then adds
    /// it to the running width.
    pub(super) fn append_column(
        &mut self,
        scene: &mut Scene,
        lines: &mut dyn LineSynthesizer,
        mut column: Column,
    ) -> Result<()> {
        column.position_glyphs(scene, lines)?;
        if !self.columns.is_empty() {
            self.total_width += self.spacing;
        }
        self.total_width += column.width;
        column.measure_index = self.current_measure;
        self.columns.push(column);
        Ok(())
    }

    /// Drops every column of a measure and removes its glyphs from the scene.
    pub(super) fn delete_measure(&mut self, scene: &mut Scene, measure_index: usize) -> Result<()> {
        let Some(position) = self.measure_indices.iter().position(|&m| m == measure_index) else {
            return Err(SynthError::Layout(format!("measure {measure_index} is not in the system")));
        };
        self.measure_indices.remove(position);

        let (doomed, kept): (Vec<Column>, Vec<Column>) = std::mem::take(&mut self.columns)
            .into_iter()
            .partition(|c| c.measure_index == Some(measure_index));
        self.columns = kept;
        for column in doomed {
            self.total_width -= column.width + self.spacing;
            column.detach(scene)?;
        }
        Ok(())
    }

    fn flex_slots(&self) -> Vec<FlexSlot> {
        self.columns
            .iter()
            .map(|c| FlexSlot {
                left_width: c.left_width,
                width: c.width,
                flex_grow: c.flex_grow,
                flex_shrink: c.flex_shrink,
            })
            .collect()
    }

    /// Places columns left to right with minimal spacing.
    pub(super) fn place_tightly(&mut self, scene: &mut Scene, lines: &mut dyn LineSynthesizer) -> Result<()> {
        let positions = tight_time_positions(&self.flex_slots(), self.spacing);
        self.reposition(scene, lines, &positions)
    }

    /// Stretches or squeezes the columns to fill `available_width`.
    pub(super) fn place_flexbox(
        &mut self,
        scene: &mut Scene,
        lines: &mut dyn LineSynthesizer,
        available_width: f64,
    ) -> Result<()> {
        let positions = flexbox_time_positions(&self.flex_slots(), self.spacing, available_width);
        self.reposition(scene, lines, &positions)
    }

    fn reposition(&mut self, scene: &mut Scene, lines: &mut dyn LineSynthesizer, positions: &[f64]) -> Result<()> {
        for (column, &time_position) in self.columns.iter_mut().zip(positions) {
            column.time_position = time_position;
            column.position_glyphs(scene, lines)?;
            trace!("Placed {:?} column at {time_position:.2}", column.kind());
        }
        Ok(())
    }
}

/// Horizontal metrics of one column, as placement sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct FlexSlot {
    pub(super) left_width: f64,
    pub(super) width: f64,
    pub(super) flex_grow: f64,
    pub(super) flex_shrink: f64,
}

pub(super) fn tight_time_positions(slots: &[FlexSlot], spacing: f64) -> Vec<f64> {
    let mut running = 0.0;
    slots
        .iter()
        .map(|slot| {
            let time_position = running + slot.left_width;
            running += slot.width + spacing;
            time_position
        })
        .collect()
}

/// Like CSS flexbox: the surplus (or deficit) is split by `flex_grow`
/// (or `flex_shrink`) and each column gets half its share before and half
/// after itself.
pub(super) fn flexbox_time_positions(slots: &[FlexSlot], spacing: f64, available_width: f64) -> Vec<f64> {
    let total_width = slots.iter().map(|s| s.width).sum::<f64>()
        + spacing * slots.len().saturating_sub(1) as f64;
    let to_distribute = available_width - total_width;
    let shrinking = to_distribute < 0.0;
    let weight = |slot: &FlexSlot| if shrinking { slot.flex_shrink } else { slot.flex_grow };
    let total_flex: f64 = slots.iter().map(weight).sum();
    let unit = if total_flex > 0.0 { to_distribute / total_flex } else { 0.0 };

    let mut running = 0.0;
    slots
        .iter()
        .map(|slot| {
            let portion = unit * weight(slot);
            running += portion / 2.0;
            let time_position = running + slot.left_width;
            running += slot.width + spacing + portion / 2.0;
            time_position
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn slot(width: f64) -> FlexSlot {
        FlexSlot {
            left_width: width / 2.0,
            width,
            flex_grow: 1.0,
            flex_shrink: 1.0,
        }
    }

    #[test]
    fn tight_placement_packs_with_spacing() {
        let slots = [slot(2.0), slot(3.0), slot(2.0)];
        assert_eq!(tight_time_positions(&slots, 1.0), vec![1.0, 4.5, 8.0]);
    }

    #[test]
    fn flexbox_surplus_goes_around_each_column() {
        // tight width 9, surplus 6, 2 mm per column: 1 mm before, 1 mm after
        let slots = [slot(2.0), slot(3.0), slot(2.0)];
        let positions = flexbox_time_positions(&slots, 1.0, 15.0);
        assert_eq!(positions, vec![2.0, 7.5, 13.0]);

        // the last column ends 1 mm short of the edge, plus trailing spacing
        let last = slots[2];
        let right_edge = positions[2] - last.left_width + last.width;
        assert_eq!(right_edge, 14.0);
    }

    #[test]
    fn flexbox_deficit_uses_shrink_weights() {
        let mut slots = [slot(4.0), slot(4.0)];
        slots[0].flex_shrink = 0.0;
        // tight width 9, deficit 1 taken entirely from the second column
        let positions = flexbox_time_positions(&slots, 1.0, 8.0);
        assert_eq!(positions, vec![2.0, 6.5]);
    }

    #[test]
    fn flexbox_without_weights_falls_back_to_tight() {
        let mut slots = [slot(2.0), slot(2.0)];
        for s in &mut slots {
            s.flex_grow = 0.0;
        }
        assert_eq!(
            flexbox_time_positions(&slots, 1.0, 20.0),
            tight_time_positions(&slots, 1.0)
        );
    }
}
