//! Occupancy costmap interface and a dense grid implementation.
//!
//! The planner only reads cell costs and converts between world and cell
//! coordinates; inflation and map maintenance belong to the embedder.

/// Named cost values shared with the embedder's costmap.
pub mod costs {
    /// Safe to traverse, no penalty
    pub const FREE: u8 = 0;
    /// Within the inscribed radius of an obstacle
    pub const INSCRIBED_INFLATED: u8 = 253;
    /// Obstacle cell
    pub const LETHAL: u8 = 254;
    /// Never observed
    pub const NO_INFORMATION: u8 = 255;
}

/// Read-only view of a 2-D occupancy costmap.
///
/// Cell coordinates are `(cx, cy)` with `(0, 0)` at the grid origin;
/// world coordinates are meters.
pub trait Costmap {
    /// Grid width in cells.
    fn size_x(&self) -> u32;

    /// Grid height in cells.
    fn size_y(&self) -> u32;

    /// Resolution in meters per cell.
    fn resolution(&self) -> f64;

    /// Cost of a cell. Out-of-range coordinates are the caller's error.
    fn get_cost(&self, cx: u32, cy: u32) -> u8;

    /// Convert world coordinates to cell coordinates.
    ///
    /// Returns `None` when the point lies outside the grid.
    fn world_to_map(&self, wx: f64, wy: f64) -> Option<(u32, u32)>;

    /// Convert cell coordinates to the world coordinates of the cell center.
    fn map_to_world(&self, cx: u32, cy: u32) -> (f64, f64);
}

/// Dense row-major costmap used by tests and by embedders without their
/// own grid type.
#[derive(Clone, Debug)]
pub struct GridCostmap {
    size_x: u32,
    size_y: u32,
    resolution: f64,
    origin_x: f64,
    origin_y: f64,
    data: Vec<u8>,
}

impl GridCostmap {
    /// Create a costmap with every cell set to `costs::FREE`.
    pub fn new(size_x: u32, size_y: u32, resolution: f64, origin_x: f64, origin_y: f64) -> Self {
        Self {
            size_x,
            size_y,
            resolution,
            origin_x,
            origin_y,
            data: vec![costs::FREE; (size_x * size_y) as usize],
        }
    }

    /// Set the cost of a single cell.
    pub fn set_cost(&mut self, cx: u32, cy: u32, cost: u8) {
        let idx = (cy * self.size_x + cx) as usize;
        self.data[idx] = cost;
    }
}

impl Costmap for GridCostmap {
    fn size_x(&self) -> u32 {
        self.size_x
    }

    fn size_y(&self) -> u32 {
        self.size_y
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn get_cost(&self, cx: u32, cy: u32) -> u8 {
        self.data[(cy * self.size_x + cx) as usize]
    }

    fn world_to_map(&self, wx: f64, wy: f64) -> Option<(u32, u32)> {
        if wx < self.origin_x || wy < self.origin_y {
            return None;
        }
        let cx = ((wx - self.origin_x) / self.resolution) as u32;
        let cy = ((wy - self.origin_y) / self.resolution) as u32;
        if cx < self.size_x && cy < self.size_y {
            Some((cx, cy))
        } else {
            None
        }
    }

    fn map_to_world(&self, cx: u32, cy: u32) -> (f64, f64) {
        (
            self.origin_x + (cx as f64 + 0.5) * self.resolution,
            self.origin_y + (cy as f64 + 0.5) * self.resolution,
        )
    }
}
