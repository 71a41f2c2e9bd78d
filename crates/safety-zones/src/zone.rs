//! Criticality zone polygons

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::raster::{bresenham_line, polyline, BorderPoint};

/// How the near ends of the two borders are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BottomShape {
    /// Left border leaves through the left side, right one through the bottom
    LeftSideToBottom,
    /// Left border leaves through the bottom, right one through the right side
    BottomToRightSide,
    /// Borders leave through opposite sides
    BothSides,
    /// Straight line between the near ends
    Direct,
}

/// Closed region at one real-world distance from the rails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub target_mm: f64,

    /// Left border, near end first
    pub left: Vec<BorderPoint>,

    /// Right border, near end first
    pub right: Vec<BorderPoint>,

    /// Path from the left near end to the right near end
    pub bottom: Vec<BorderPoint>,

    /// Line from the left far end to the right far end
    pub top: Vec<BorderPoint>,

    pub bottom_shape: BottomShape,
}

impl Zone {
    /// Closed vertex ring: left, top, right reversed, bottom reversed.
    /// The first and last vertex coincide.
    pub fn polygon(&self) -> Vec<BorderPoint> {
        let mut ring =
            Vec::with_capacity(self.left.len() + self.top.len() + self.right.len() + self.bottom.len());
        ring.extend_from_slice(&self.left);
        ring.extend_from_slice(&self.top);
        ring.extend(self.right.iter().rev());
        ring.extend(self.bottom.iter().rev());
        ring
    }

    /// Even-odd containment test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        point_in_polygon(x, y, &self.polygon())
    }
}

/// Ray-casting (even-odd) point-in-polygon test over pixel vertices
pub fn point_in_polygon(x: f64, y: f64, polygon: &[BorderPoint]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].col as f64, polygon[i].row as f64);
        let (xj, yj) = (polygon[j].col as f64, polygon[j].row as f64);

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

fn placeholder_if_empty(border: Vec<BorderPoint>, side: &str) -> Vec<BorderPoint> {
    if border.is_empty() {
        warn!("Empty {} border, substituting placeholder at origin", side);
        vec![BorderPoint::new(0, 0), BorderPoint::new(0, 0)]
    } else {
        border
    }
}

fn bottom_shape(left_near: BorderPoint, right_near: BorderPoint, last_row: i64, last_col: i64) -> BottomShape {
    let at_bottom = |p: BorderPoint| p.row == last_row || p.row == last_row - 1;

    if left_near.col == 0 && at_bottom(right_near) {
        BottomShape::LeftSideToBottom
    } else if at_bottom(left_near) && right_near.col == last_col {
        BottomShape::BottomToRightSide
    } else if left_near.col == 0 && right_near.col == last_col {
        BottomShape::BothSides
    } else {
        BottomShape::Direct
    }
}

/// Assemble the zone for one pair of borders.
///
/// Borders are ordered near end first. The bottom edge follows the image
/// frame when the borders leave through its sides, so the ring stays a
/// single closed loop.
pub fn build_zone(
    target_mm: f64,
    left: Vec<BorderPoint>,
    right: Vec<BorderPoint>,
    rows: usize,
    cols: usize,
) -> Zone {
    let left = placeholder_if_empty(left, "left");
    let right = placeholder_if_empty(right, "right");

    let last_row = rows.saturating_sub(1) as i64;
    let last_col = cols.saturating_sub(1) as i64;

    // Non-empty after placeholder substitution
    let (l_near, l_far) = (left[0], left[left.len() - 1]);
    let (r_near, r_far) = (right[0], right[right.len() - 1]);

    let top = bresenham_line(l_far, r_far);

    let shape = bottom_shape(l_near, r_near, last_row, last_col);
    let bottom = match shape {
        BottomShape::LeftSideToBottom => polyline(&[
            l_near,
            BorderPoint::new(0, last_row),
            BorderPoint::new(r_near.col, last_row),
            r_near,
        ]),
        BottomShape::BottomToRightSide => polyline(&[
            l_near,
            BorderPoint::new(l_near.col, last_row),
            BorderPoint::new(last_col, last_row),
            r_near,
        ]),
        BottomShape::BothSides => polyline(&[
            l_near,
            BorderPoint::new(0, last_row),
            BorderPoint::new(last_col, last_row),
            r_near,
        ]),
        BottomShape::Direct => bresenham_line(l_near, r_near),
    };

    debug!("Zone {}mm closed with {:?} bottom edge", target_mm, shape);

    Zone {
        target_mm,
        left,
        right,
        bottom,
        top,
        bottom_shape: shape,
    }
}
