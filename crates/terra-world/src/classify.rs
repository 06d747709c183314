//! Height classification into terrain regions.

use serde::{Deserialize, Serialize};

use crate::noise_field::HeightField;

/// Linear RGBA colour with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Rgba {
    /// Fully transparent black. Colour of unclassified cells.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Creates a colour.
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour from 8-bit channels.
    #[must_use]
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            1.0,
        )
    }

    /// Opaque grey between black (`t = 0`) and white (`t = 1`).
    #[must_use]
    pub fn grey(t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(t, t, t, 1.0)
    }
}

/// A named height band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Display name
    pub name: String,
    /// Inclusive upper bound of the band
    pub height: f32,
    /// Colour written for cells in this band
    pub colour: Rgba,
}

impl Region {
    /// Creates a region.
    #[must_use]
    pub fn new(name: impl Into<String>, height: f32, colour: Rgba) -> Self {
        Self {
            name: name.into(),
            height,
            colour,
        }
    }
}

/// Default regions, lowest first.
#[must_use]
pub fn default_regions() -> Vec<Region> {
    vec![
        Region::new("Deep Water", 0.3, Rgba::from_rgb8(50, 99, 195)),
        Region::new("Shallow Water", 0.4, Rgba::from_rgb8(54, 103, 199)),
        Region::new("Sand", 0.45, Rgba::from_rgb8(210, 208, 125)),
        Region::new("Grass", 0.55, Rgba::from_rgb8(86, 152, 23)),
        Region::new("Grass 2", 0.6, Rgba::from_rgb8(62, 107, 18)),
        Region::new("Rock", 0.7, Rgba::from_rgb8(90, 69, 60)),
        Region::new("Rock 2", 0.9, Rgba::from_rgb8(75, 60, 53)),
        Region::new("Snow", 1.0, Rgba::WHITE),
    ]
}

/// Category assigned to a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Index into the region table
    Region(usize),
    /// Height exceeded every region threshold
    Unclassified,
}

/// Per-cell categories and colours of a height field, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    width: usize,
    height: usize,
    categories: Vec<Category>,
    colours: Vec<Rgba>,
}

impl Classification {
    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Category of every cell, indexed `y * width + x`.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Colour buffer, indexed `y * width + x`.
    #[must_use]
    pub fn colours(&self) -> &[Rgba] {
        &self.colours
    }

    /// Category at column `x`, row `y`.
    #[must_use]
    pub fn category(&self, x: usize, y: usize) -> Option<Category> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.categories.get(y * self.width + x).copied()
    }

    /// Number of cells with the given category.
    #[must_use]
    pub fn count(&self, category: Category) -> usize {
        self.categories.iter().filter(|&&c| c == category).count()
    }
}

/// Assigns each cell the first region whose threshold is at or above its
/// height. Regions must be sorted ascending by threshold.
#[must_use]
pub fn classify(field: &HeightField, regions: &[Region]) -> Classification {
    let mut categories = Vec::with_capacity(field.values().len());
    let mut colours = Vec::with_capacity(field.values().len());

    for &value in field.values() {
        match regions.iter().position(|region| value <= region.height) {
            Some(index) => {
                categories.push(Category::Region(index));
                colours.push(regions[index].colour);
            },
            None => {
                categories.push(Category::Unclassified);
                colours.push(Rgba::TRANSPARENT);
            },
        }
    }

    Classification {
        width: field.width(),
        height: field.height(),
        categories,
        colours,
    }
}
