//! The in-memory placement model: cells, rows, and the site grids the two
//! passes operate on.

use std::collections::HashMap;

use log::warn;
use rbl_common::bookshelf::{Node, Position, RowDef};

use crate::geom;
use crate::occupancy::SubRow;

/// Handle into [Placement::cells]. Subrows refer to their residents through
/// these indices; cells never point back at rows.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellId(pub usize);

#[derive(Clone, Debug)]
pub struct Cell {
    pub name: String,
    pub width: f64,
    pub height: f64,
    /// Current coordinates; updated only by the placement passes.
    pub x: f64,
    pub y: f64,
    /// Coordinates from the input `.pl` file.
    pub orig_x: f64,
    pub orig_y: f64,
    pub fixed: bool,
}

impl Cell {
    /// Manhattan distance from the input coordinates.
    pub fn displacement(&self) -> f64 {
        geom::manhattan(self.x, self.y, self.orig_x, self.orig_y)
    }
}

#[derive(Clone, Debug)]
pub struct Row {
    pub y_start: f64,
    pub height: f64,
    pub site_width: f64,
    pub site_spacing: f64,
    pub subrows: Vec<SubRow>,
}

pub struct Placement {
    pub cells: Vec<Cell>,
    pub rows: Vec<Row>,
    /// Occupied design extent, from the row geometry.
    pub max_x: f64,
    pub max_y: f64,
}

impl Placement {
    /// Build the model from parsed Bookshelf records. Cell order follows
    /// the `.nodes` file; a cell with no `.pl` entry starts at the origin.
    pub fn from_bookshelf(
        nodes: &[Node],
        positions: &HashMap<String, Position>,
        row_defs: &[RowDef],
    ) -> Self {
        let cells = nodes
            .iter()
            .map(|node| {
                let pos = match positions.get(&node.name) {
                    Some(pos) => *pos,
                    None => {
                        warn!("Cell {:?} has no placement record, assuming origin", node.name);
                        Position { x: 0.0, y: 0.0 }
                    }
                };
                Cell {
                    name: node.name.clone(),
                    width: node.width,
                    height: node.height,
                    x: pos.x,
                    y: pos.y,
                    orig_x: pos.x,
                    orig_y: pos.y,
                    fixed: node.terminal,
                }
            })
            .collect();

        let rows: Vec<Row> = row_defs
            .iter()
            .map(|def| Row {
                y_start: def.y_start,
                height: def.height,
                site_width: def.site_width,
                site_spacing: def.site_spacing,
                subrows: def
                    .subrows
                    .iter()
                    .map(|s| SubRow::new(s.x_start, s.num_sites, def.site_width))
                    .collect(),
            })
            .collect();

        let mut max_x: f64 = 0.0;
        let mut max_y: f64 = 0.0;
        for row in &rows {
            for subrow in &row.subrows {
                max_x = max_x.max(subrow.x_end);
            }
            max_y = max_y.max(row.y_start + row.height);
        }

        Self {
            cells,
            rows,
            max_x,
            max_y,
        }
    }

    /// Indices of the cells the legalizer is allowed to move.
    pub fn movable(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.fixed)
            .map(|(idx, _)| idx)
    }
}

#[cfg(test)]
pub(crate) mod checks {
    //! Shared invariant checker for pass tests: site alignment,
    //! containment, bitmap/list agreement, and fixed-cell immutability.

    use super::*;
    use crate::geom::EPSILON;

    pub fn assert_legal(placement: &Placement) {
        let mut seen = vec![0usize; placement.cells.len()];

        for row in &placement.rows {
            for subrow in &row.subrows {
                let mut expected = vec![false; subrow.num_sites];
                let mut last_x = f64::NEG_INFINITY;

                for placed in subrow.placed() {
                    let cell = &placement.cells[placed.cell.0];
                    assert!(!cell.fixed, "fixed cell {} in occupancy", cell.name);
                    seen[placed.cell.0] += 1;

                    assert!(placed.x >= last_x, "resident list out of order");
                    last_x = placed.x;

                    // Site alignment and agreement with the cell store.
                    let site = (cell.x - subrow.x_start) / subrow.site_width;
                    assert!(
                        (site - site.round()).abs() < EPSILON,
                        "cell {} off the site grid",
                        cell.name
                    );
                    let site = site.round() as usize;
                    assert!((placed.x - cell.x).abs() < EPSILON);
                    assert!((cell.y - row.y_start).abs() < EPSILON);

                    // Containment.
                    assert!(cell.x + cell.width <= subrow.x_end + EPSILON);
                    assert!(cell.height <= row.height + EPSILON);

                    let sites = geom::sites_needed(cell.width, subrow.site_width);
                    for s in site..site + sites {
                        assert!(!expected[s], "overlapping residents at site {}", s);
                        expected[s] = true;
                    }
                }

                for site in 0..subrow.num_sites {
                    assert_eq!(
                        subrow.is_occupied(site),
                        expected[site],
                        "bitmap disagrees with resident list at site {}",
                        site
                    );
                }
            }
        }

        for (idx, cell) in placement.cells.iter().enumerate() {
            assert!(seen[idx] <= 1, "cell {} placed more than once", cell.name);
            if cell.fixed {
                assert_eq!((cell.x, cell.y), (cell.orig_x, cell.orig_y));
            }
        }
    }
}
