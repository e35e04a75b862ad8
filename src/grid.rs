//! Uniform-grid spatial index.
//!
//! Live agents are bucketed into fixed-size square cells keyed by
//! `(floor(x / cell), floor(y / cell))`. The index is rebuilt from scratch
//! once per tick after all positions settle; it is never updated
//! incrementally, so readers between the position phase and the rebuild get
//! stale data and must not look. `neighbors_of` returns the 3x3 cell
//! neighborhood, which over-approximates any radius up to the cell edge;
//! callers apply their own exact distance filter.

use serde::{Deserialize, Serialize};

use crate::agent::Agent;

/// Default cell edge, sized to the largest common interaction radius band.
pub const CELL_SIZE: f32 = 50.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialIndex {
    cells: Vec<Vec<usize>>,
    cols: i32,
    rows: i32,
    cell_size: f32,
}

impl SpatialIndex {
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let cols = (width / cell_size).ceil().max(1.0) as i32;
        let rows = (height / cell_size).ceil().max(1.0) as i32;
        Self {
            cells: vec![Vec::new(); (cols * rows) as usize],
            cols,
            rows,
            cell_size,
        }
    }

    fn slot(&self, cx: i32, cy: i32) -> usize {
        // Cell coordinates wrap, matching the toroidal world.
        let cx = cx.rem_euclid(self.cols);
        let cy = cy.rem_euclid(self.rows);
        (cy * self.cols + cx) as usize
    }

    fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Repartition all live agents. O(n); call exactly once per tick, after
    /// every position update and before any neighbor query.
    pub fn rebuild(&mut self, agents: &[Agent]) {
        for cell in &mut self.cells {
            cell.clear();
        }
        for (idx, agent) in agents.iter().enumerate() {
            if agent.alive {
                let (cx, cy) = self.cell_of(agent.x, agent.y);
                let slot = self.slot(cx, cy);
                self.cells[slot].push(idx);
            }
        }
    }

    /// Agent indices in the 3x3 cell neighborhood around a point, in stable
    /// cell-then-insertion order. Includes the querying agent itself.
    pub fn neighbors_of(&self, x: f32, y: f32) -> Vec<usize> {
        let (cx, cy) = self.cell_of(x, y);
        let mut result = Vec::new();
        for dy in -1..=1 {
            for dx in -1..=1 {
                let slot = self.slot(cx + dx, cy + dy);
                result.extend_from_slice(&self.cells[slot]);
            }
        }
        // Small worlds can alias the same cell through wrapping.
        if self.cols < 3 || self.rows < 3 {
            result.sort_unstable();
            result.dedup();
        }
        result
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }
}

/// Shortest-path displacement from a to b on the wrapping world.
pub fn toroidal_delta(ax: f32, ay: f32, bx: f32, by: f32, width: f32, height: f32) -> (f32, f32) {
    let mut dx = bx - ax;
    let mut dy = by - ay;
    if dx > width / 2.0 {
        dx -= width;
    } else if dx < -width / 2.0 {
        dx += width;
    }
    if dy > height / 2.0 {
        dy -= height;
    } else if dy < -height / 2.0 {
        dy += height;
    }
    (dx, dy)
}

/// Shortest-path distance on the wrapping world.
pub fn toroidal_distance(ax: f32, ay: f32, bx: f32, by: f32, width: f32, height: f32) -> f32 {
    let (dx, dy) = toroidal_delta(ax, ay, bx, by, width, height);
    (dx * dx + dy * dy).sqrt()
}
