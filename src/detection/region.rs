use image::RgbaImage;
use std::collections::BTreeMap;
use tracing::debug;

use super::pixels::{Histogram, is_dark};
use crate::config::RegionParams;
use crate::models::{BoundingBox, CandidateBox, Stripe};

/// Locates the dark-bordered inventory box in a screenshot
#[derive(Debug, Clone, Default)]
pub struct RegionDetector {
    pub params: RegionParams,
}

impl RegionDetector {
    pub fn new(params: RegionParams) -> Self {
        Self { params }
    }

    /// Returns `None` when no candidate survives filtering
    pub fn detect(&self, image: &RgbaImage) -> Option<BoundingBox> {
        let stripes = find_dark_stripes(image, &self.params);
        let candidates = cluster_stripes(&stripes, self.params.merge_variance);
        let merged = merge_contained(candidates);
        let survivors = filter_candidates(image, merged, &self.params);

        debug!(
            "Region scan: {} stripes in {} buckets, {} candidates survive",
            stripes.values().map(Vec::len).sum::<usize>(),
            stripes.len(),
            survivors.len()
        );

        select_nearest_center(&survivors, image.width()).map(|b| b.to_bounds())
    }
}

/// Dark runs of at least `min_width`, bucketed by left edge in ascending order.
/// A run is only recorded when a non-dark pixel ends it.
pub fn find_dark_stripes(image: &RgbaImage, params: &RegionParams) -> BTreeMap<u32, Vec<Stripe>> {
    let mut buckets: BTreeMap<u32, Vec<Stripe>> = BTreeMap::new();
    let (width, height) = image.dimensions();

    for row in 0..height {
        let mut dark_count = 0u32;
        for col in 0..width {
            let pixel = image.get_pixel(col, row);
            if is_dark(pixel, params.max_dark_saturation, params.max_dark_lightness) {
                dark_count += 1;
                continue;
            }
            // Run ended; keep it if wide enough
            if dark_count >= params.min_width {
                let left = col - dark_count;
                buckets.entry(left).or_default().push(Stripe {
                    row,
                    left,
                    right: col - 1,
                });
            }
            dark_count = 0;
        }
    }

    buckets
}

/// One candidate per bucket, spanning the rows of stripes whose right edge
/// lies within `variance` of the bucket's most common right edge.
pub fn cluster_stripes(buckets: &BTreeMap<u32, Vec<Stripe>>, variance: u32) -> Vec<CandidateBox> {
    let mut boxes = Vec::with_capacity(buckets.len());

    for (&left, stripes) in buckets {
        let mut rights = Histogram::new();
        for stripe in stripes {
            rights.add(stripe.right);
        }
        // Most common right edge in this bucket
        let Some(most_right) = rights.mode() else {
            continue;
        };

        let mut top = u32::MAX;
        let mut bottom = 0;
        let mut dark_stripes = 0;
        // Span the rows of stripes ending near it
        for stripe in stripes {
            if stripe.right.abs_diff(most_right) < variance {
                top = top.min(stripe.row);
                bottom = bottom.max(stripe.row);
                dark_stripes += 1;
            }
        }

        // The mode itself always matches unless variance is zero
        if dark_stripes == 0 {
            continue;
        }

        boxes.push(CandidateBox {
            top,
            right: most_right,
            bottom,
            left,
            dark_stripes,
        });
    }

    boxes
}

/// Absorb every box contained by an earlier one.
/// Candidates arrive sorted by left edge, so a container always precedes what it contains.
pub fn merge_contained(mut boxes: Vec<CandidateBox>) -> Vec<CandidateBox> {
    let mut primary = 0;
    while primary + 1 < boxes.len() {
        let mut inner = primary + 1;
        while inner < boxes.len() {
            if boxes[primary].contains(&boxes[inner]) {
                let absorbed = boxes.remove(inner);
                boxes[primary].dark_stripes += absorbed.dark_stripes;
            } else {
                inner += 1;
            }
        }
        primary += 1;
    }
    boxes
}

/// Drop boxes that are too short or whose vertical edges are not mostly dark
pub fn filter_candidates(
    image: &RgbaImage,
    boxes: Vec<CandidateBox>,
    params: &RegionParams,
) -> Vec<CandidateBox> {
    let dark_at = |x: u32, y: u32| {
        is_dark(
            image.get_pixel(x, y),
            params.max_dark_saturation,
            params.max_dark_lightness,
        )
    };
    boxes
        .into_iter()
        .filter(|b| b.bottom - b.top >= params.min_height)
        .filter(|b| {
            let mut dark_left = 0u32;
            let mut dark_right = 0u32;
            for row in b.top..=b.bottom {
                if dark_at(b.left, row) {
                    dark_left += 1;
                }
                if dark_at(b.right, row) {
                    dark_right += 1;
                }
            }
            let height = (b.bottom - b.top + 1) as f32;
            dark_left as f32 / height >= params.min_dark_edge_ratio
                && dark_right as f32 / height >= params.min_dark_edge_ratio
        })
        .collect()
}

/// Candidate whose left edge is closest to the horizontal middle; first wins ties
pub fn select_nearest_center(boxes: &[CandidateBox], image_width: u32) -> Option<CandidateBox> {
    let middle = image_width.div_ceil(2);
    boxes
        .iter()
        .copied()
        .reduce(|best, b| {
            if b.left.abs_diff(middle) < best.left.abs_diff(middle) {
                b
            } else {
                best
            }
        })
}
