use serde::{Deserialize, Serialize};

use crate::LaneIndex;

/// Position in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point2 {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(&self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Path a note follows from its spawn point to the hit line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneGeometry {
    /// Where notes appear.
    pub spawn: Point2,
    /// Where notes should be hit.
    pub hit: Point2,
}

impl LaneGeometry {
    /// Length of the path in world units.
    #[must_use]
    pub fn travel_distance(&self) -> f64 {
        self.spawn.distance(self.hit)
    }

    /// Point reached after covering `progress` of the path.
    ///
    /// Progress above one continues past the hit line along the same line.
    #[must_use]
    pub fn point_at(&self, progress: f64) -> Point2 {
        Point2::new(
            self.spawn.x + (self.hit.x - self.spawn.x) * progress,
            self.spawn.y + (self.hit.y - self.spawn.y) * progress,
        )
    }
}

/// Geometry of every lane in the arena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneLayout {
    lanes: Vec<LaneGeometry>,
}

impl LaneLayout {
    /// Number of lanes in the default layout.
    pub const DEFAULT_LANES: u8 = 4;
    /// Horizontal distance between default lanes.
    pub const DEFAULT_LANE_SPACING: f64 = 100.0;
    /// Distance a note travels in the default layout.
    pub const DEFAULT_TRAVEL_DISTANCE: f64 = 600.0;

    /// Creates a layout from explicit lane geometry.
    #[must_use]
    pub fn new(lanes: Vec<LaneGeometry>) -> Self {
        Self { lanes }
    }

    /// Parallel vertical lanes sharing a common travel distance.
    #[must_use]
    pub fn parallel(count: u8, spacing: f64, travel_distance: f64) -> Self {
        let lanes = (0..count)
            .map(|index| {
                let x = f64::from(index) * spacing;
                LaneGeometry {
                    spawn: Point2::new(x, 0.0),
                    hit: Point2::new(x, travel_distance),
                }
            })
            .collect();
        Self { lanes }
    }

    /// Number of lanes.
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Geometry of a lane, or `None` when the index is out of range.
    #[must_use]
    pub fn lane(&self, lane: LaneIndex) -> Option<&LaneGeometry> {
        self.lanes.get(lane.index())
    }

    /// Iterates lanes in index order.
    pub fn iter(&self) -> impl Iterator<Item = &LaneGeometry> {
        self.lanes.iter()
    }
}

impl Default for LaneLayout {
    fn default() -> Self {
        Self::parallel(
            Self::DEFAULT_LANES,
            Self::DEFAULT_LANE_SPACING,
            Self::DEFAULT_TRAVEL_DISTANCE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{LaneLayout, Point2};
    use crate::LaneIndex;

    #[test]
    fn default_layout_has_four_equal_lanes() {
        let layout = LaneLayout::default();
        assert_eq!(layout.lane_count(), 4);
        assert!(layout
            .iter()
            .all(|lane| (lane.travel_distance() - 600.0).abs() < 1e-9));
        assert!(layout.lane(LaneIndex::new(4)).is_none());
    }

    #[test]
    fn progress_interpolates_and_overshoots() {
        let layout = LaneLayout::default();
        let lane = layout.lane(LaneIndex::new(1));
        let halfway = lane.map(|lane| lane.point_at(0.5));
        assert_eq!(halfway, Some(Point2::new(100.0, 300.0)));
        let beyond = lane.map(|lane| lane.point_at(1.5));
        assert_eq!(beyond, Some(Point2::new(100.0, 900.0)));
    }
}
