/// Squarified treemap layout (Bruls, Huizing, van Wijk).
///
/// [`layout`] is a pure function from one level's weighted items and a
/// viewport rectangle to a list of placed rectangles that tile the viewport.
/// Rows are grown greedily while the worst aspect ratio in the row does not
/// get worse, then laid along the longer side of the remaining free space.
///
/// Weights are the square root of each item's byte size so tiny items stay
/// visible next to huge ones. The true size is carried through untouched for
/// labels.
use crate::model::format_size;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An axis-aligned rectangle in viewport units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Half-open containment: the right and bottom edges belong to the
    /// neighbouring rectangle.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// One input item: a direct child of the level being displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    #[serde(with = "crate::model::lossy_path")]
    pub path: PathBuf,
    pub name: String,
    pub is_directory: bool,
    /// Byte size; directories use their rollup total.
    pub size: u64,
}

/// One output rectangle. Produced fresh by every layout call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedRectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(with = "crate::model::lossy_path")]
    pub path: PathBuf,
    pub name: String,
    pub is_directory: bool,
    /// Untransformed byte size of the source item.
    pub size: u64,
}

impl PlacedRectangle {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.rect().contains(x, y)
    }

    /// Human-readable true size for the label.
    pub fn size_label(&self) -> String {
        format_size(self.size)
    }
}

/// Lay out `items` inside `bounds`.
///
/// Items with size 0 are dropped. Empty input, an all-zero list, or a
/// zero-area viewport yields an empty layout. Output order is descending
/// layout weight.
pub fn layout(items: &[LayoutItem], bounds: Rect) -> Vec<PlacedRectangle> {
    if !(bounds.width > 0.0 && bounds.height > 0.0) {
        return Vec::new();
    }

    let mut weighted: Vec<(&LayoutItem, f64)> = items
        .iter()
        .filter(|item| item.size > 0)
        .map(|item| (item, (item.size as f64).sqrt()))
        .collect();
    if weighted.is_empty() {
        return Vec::new();
    }
    weighted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let total_weight: f64 = weighted.iter().map(|(_, w)| w).sum();
    let scale = bounds.area() / total_weight;
    // (item, area in viewport units)
    let areas: Vec<(&LayoutItem, f64)> = weighted
        .into_iter()
        .map(|(item, w)| (item, w * scale))
        .collect();

    let mut placed = Vec::with_capacity(areas.len());
    let mut free = bounds;
    let mut idx = 0;

    while idx < areas.len() {
        let horizontal = free.width >= free.height;
        let side = if horizontal { free.width } else { free.height };

        // Greedy row building.
        let start = idx;
        let mut row_area = areas[idx].1;
        let mut best_worst = worst_ratio(&areas[start..=idx], side, row_area);
        idx += 1;
        while idx < areas.len() {
            let new_area = row_area + areas[idx].1;
            let new_worst = worst_ratio(&areas[start..=idx], side, new_area);
            if new_worst <= best_worst {
                row_area = new_area;
                best_worst = new_worst;
                idx += 1;
            } else {
                break;
            }
        }

        let row = &areas[start..idx];
        let last_row = idx == areas.len();
        // The final row absorbs any floating-point remainder.
        let thickness = if last_row {
            if horizontal {
                free.height
            } else {
                free.width
            }
        } else {
            row_area / side
        };

        let mut offset = 0.0;
        for (i, (item, area)) in row.iter().enumerate() {
            let extent = if i + 1 == row.len() {
                side - offset
            } else {
                area / thickness
            };
            let rect = if horizontal {
                Rect::new(free.x + offset, free.y, extent, thickness)
            } else {
                Rect::new(free.x, free.y + offset, thickness, extent)
            };
            offset += extent;
            placed.push(place(item, rect));
        }

        if horizontal {
            free.y += thickness;
            free.height = (free.height - thickness).max(0.0);
        } else {
            free.x += thickness;
            free.width = (free.width - thickness).max(0.0);
        }
    }

    placed
}

fn place(item: &LayoutItem, rect: Rect) -> PlacedRectangle {
    PlacedRectangle {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        path: item.path.clone(),
        name: item.name.clone(),
        is_directory: item.is_directory,
        size: item.size,
    }
}

/// Worst (largest, always ≥ 1) aspect ratio of a row of `areas` laid along
/// a side of length `side`.
fn worst_ratio(row: &[(&LayoutItem, f64)], side: f64, total: f64) -> f64 {
    if side <= 0.0 || total <= 0.0 {
        return f64::MAX;
    }

    let thickness = total / side;
    let mut worst = 0.0_f64;
    for (_, area) in row {
        let extent = area / thickness;
        let ratio = if extent > thickness {
            extent / thickness
        } else if extent > 0.0 {
            thickness / extent
        } else {
            f64::MAX
        };
        worst = worst.max(ratio);
    }
    worst
}

/// Keeps the most recent layout around for pointer hit-testing.
#[derive(Debug, Default)]
pub struct Treemap {
    last: Vec<PlacedRectangle>,
}

impl Treemap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the layout and remember it.
    pub fn layout(&mut self, items: &[LayoutItem], bounds: Rect) -> &[PlacedRectangle] {
        self.last = layout(items, bounds);
        &self.last
    }

    pub fn rectangles(&self) -> &[PlacedRectangle] {
        &self.last
    }

    /// The rectangle under `(x, y)`, if any. Linear scan over one level.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&PlacedRectangle> {
        self.last.iter().find(|r| r.contains(x, y))
    }

    pub fn find(&self, path: &Path) -> Option<&PlacedRectangle> {
        self.last.iter().find(|r| r.path == path)
    }

    pub fn clear(&mut self) {
        self.last.clear();
    }
}
