use image::DynamicImage;
use serde::Serialize;

/// Axis-aligned box in pixel coordinates of the image it was measured on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0 && self.height > 0 && self.right() <= width && self.bottom() <= height
    }
}

/// One maximal horizontal run of dark pixels on a single row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stripe {
    pub row: u32,
    pub left: u32,
    /// Inclusive
    pub right: u32,
}

/// Cluster of stripes approximating a bordered rectangle.
/// All edges are inclusive row/column coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
    pub dark_stripes: u32,
}

impl CandidateBox {
    /// True when `other` lies inside (or on) every edge of `self`
    pub fn contains(&self, other: &CandidateBox) -> bool {
        self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
            && self.left <= other.left
    }

    pub fn to_bounds(&self) -> BoundingBox {
        BoundingBox {
            x: self.left,
            y: self.top,
            width: self.right - self.left + 1,
            height: self.bottom - self.top + 1,
        }
    }
}

/// The detected inventory region and its crop
#[derive(Debug, Clone, Serialize)]
pub struct StockpileBox {
    #[serde(flatten)]
    pub bounds: BoundingBox,
    #[serde(skip)]
    pub image: DynamicImage,
}

/// Grey label holding an item's quantity, with its recognition-ready crop
#[derive(Debug, Clone, Serialize)]
pub struct QuantityBox {
    #[serde(flatten)]
    pub bounds: BoundingBox,
    #[serde(skip)]
    pub image: DynamicImage,
}

/// Square icon left of a quantity label
#[derive(Debug, Clone, Serialize)]
pub struct IconBox {
    #[serde(flatten)]
    pub bounds: BoundingBox,
    #[serde(skip)]
    pub image: DynamicImage,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub quantity_box: QuantityBox,
    pub icon_box: IconBox,
    pub quantity: Option<u32>,
    pub code_name: String,
    pub is_crated: bool,
}

impl Item {
    /// Move both boxes down, used after the stockpile box grows upwards
    pub fn shift_down(&mut self, offset: u32) {
        self.quantity_box.bounds.y += offset;
        self.icon_box.bounds.y += offset;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Stockpile {
    #[serde(rename = "box")]
    pub stockpile_box: StockpileBox,
    /// Scan order: top to bottom, then left to right
    pub contents: Vec<Item>,
}
