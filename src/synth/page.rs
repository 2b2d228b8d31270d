use super::StafflinesSynthesizer;
use crate::config::PageSetup;
use crate::error::Result;
use crate::geometry::{Point, Rectangle, Transform};
use crate::scene::{Field, ObjectId, Page, Scene, ViewBox};
use log::debug;

/// A freshly synthesized, empty page.
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub page: ObjectId,
    pub space: ObjectId,
    /// Stafflines from top to bottom.
    pub staves: Vec<ObjectId>,
}

/// Spreads a fixed number of staves evenly over the page content box.
pub struct SimplePageSynthesizer {
    pub setup: PageSetup,
    stafflines: Box<dyn StafflinesSynthesizer>,
}

impl SimplePageSynthesizer {
    pub fn new(setup: PageSetup, stafflines: Box<dyn StafflinesSynthesizer>) -> Self {
        Self { setup, stafflines }
    }

    /// Places a page with its top-left corner at `origin` in the root space.
    pub fn synthesize_page(&mut self, scene: &mut Scene, origin: Point) -> Result<PageLayout> {
        let root = scene.root_space();
        let space = scene.create_space(Some(root), Transform::translate(origin.vector()))?;
        let page = scene.insert(Page {
            view_box: ViewBox {
                rectangle: Rectangle::new(origin.x, origin.y, self.setup.width, self.setup.height),
            },
        });
        scene.set_link(page, Field::Space, Some(space))?;

        let staff_height = self.stafflines.stafflines_height();
        let first = self.setup.padding_top + staff_height / 2.0;
        let step = (self.setup.content_height() - staff_height) / self.setup.staff_count.max(1) as f64;

        let mut staves = Vec::with_capacity(self.setup.staff_count);
        for i in 0..self.setup.staff_count {
            let position = Point::new(self.setup.padding_left, first + i as f64 * step);
            staves.push(self.stafflines.synthesize_stafflines(
                scene,
                space,
                position,
                self.setup.content_width(),
            )?);
        }
        scene.set_links(page, Field::Staves, &staves)?;

        debug!("Synthesized page at ({}, {}) with {} staves", origin.x, origin.y, staves.len());
        Ok(PageLayout { page, space, staves })
    }
}
