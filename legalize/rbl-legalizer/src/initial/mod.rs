//! First-pass legalization: assign every movable cell to a free site.
//!
//! Cells are swept bottom-to-top, left-to-right by their input coordinates
//! so the placement front advances with the row-major layout. Each cell
//! takes the first free site scanning nearest row, then nearest subrow,
//! then leftmost site.

use itertools::Itertools;
use log::warn;

use crate::geom::{self, EPSILON};
use crate::model::{CellId, Placement};


/// Place all movable cells. Returns the number of cells no row could
/// accept; those keep their input coordinates and stay out of the
/// occupancy maps.
pub fn place(placement: &mut Placement) -> usize {
    let mut order = placement.movable().collect_vec();
    order.sort_by(|&a, &b| {
        let a = &placement.cells[a];
        let b = &placement.cells[b];
        if (a.orig_y - b.orig_y).abs() > EPSILON {
            a.orig_y.total_cmp(&b.orig_y)
        } else {
            a.orig_x.total_cmp(&b.orig_x)
        }
    });

    let mut unplaced = 0;
    for idx in order {
        let cell = &placement.cells[idx];
        let (width, height, orig_x, orig_y) = (cell.width, cell.height, cell.orig_x, cell.orig_y);

        let mut row_order = (0..placement.rows.len()).collect_vec();
        row_order.sort_by(|&a, &b| {
            let a = &placement.rows[a];
            let b = &placement.rows[b];
            let da = (a.y_start - orig_y).abs();
            let db = (b.y_start - orig_y).abs();
            da.total_cmp(&db).then(a.y_start.total_cmp(&b.y_start))
        });

        let mut target = None;
        'search: for row_idx in row_order {
            let row = &placement.rows[row_idx];
            if height > row.height + EPSILON {
                continue;
            }
            let sites = geom::sites_needed(width, row.site_width);

            let mut subrow_order = (0..row.subrows.len()).collect_vec();
            subrow_order.sort_by(|&a, &b| {
                let da = (row.subrows[a].center_x() - orig_x).abs();
                let db = (row.subrows[b].center_x() - orig_x).abs();
                da.total_cmp(&db)
            });

            for subrow_idx in subrow_order {
                let subrow = &row.subrows[subrow_idx];
                if sites == 0 || sites > subrow.num_sites {
                    continue;
                }
                for start in 0..=subrow.num_sites - sites {
                    if subrow.can_place_at(start, sites)
                        && subrow.site_x(start) + width <= subrow.x_end + EPSILON
                    {
                        target = Some((row_idx, subrow_idx, start, sites));
                        break 'search;
                    }
                }
            }
        }

        match target {
            Some((row_idx, subrow_idx, start, sites)) => {
                let row = &mut placement.rows[row_idx];
                let x = row.subrows[subrow_idx].site_x(start);
                let y = row.y_start;
                row.subrows[subrow_idx].insert(CellId(idx), x, start, sites);
                placement.cells[idx].x = x;
                placement.cells[idx].y = y;
            }
            None => {
                warn!(
                    "No feasible site for cell {:?}, leaving it at ({}, {})",
                    placement.cells[idx].name, orig_x, orig_y
                );
                unplaced += 1;
            }
        }
    }

    unplaced
}
