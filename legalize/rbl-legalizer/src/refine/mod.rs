//! Displacement-reduction pass.
//!
//! Repeatedly offers every movable cell a strictly better site within a
//! bounded Manhattan radius of its input coordinates, worst-displaced
//! cells first. The loop stops when an iteration moves nothing or the
//! configured iteration cap is hit.

use itertools::Itertools;
use log::warn;

use crate::config::RefineConfig;
use crate::geom::{self, EPSILON};
use crate::model::{CellId, Placement};


struct Candidate {
    row: usize,
    subrow: usize,
    site: usize,
    sites: usize,
    x: f64,
    disp: f64,
}

/// Run improvement iterations until quiescence or the iteration cap.
/// Returns the number of iterations executed.
pub fn refine(placement: &mut Placement, config: &RefineConfig) -> usize {
    let mut iterations = 0;
    let mut improvement = true;

    while improvement && iterations < config.max_iterations {
        improvement = false;
        iterations += 1;

        let mut order = placement.movable().collect_vec();
        order.sort_by(|&a, &b| {
            placement.cells[b]
                .displacement()
                .total_cmp(&placement.cells[a].displacement())
        });

        for idx in order {
            if try_relocate(placement, idx, config.search_slack) {
                improvement = true;
            }
        }
    }

    iterations
}

/// Search the radius around `idx`'s input coordinates for a site with
/// strictly smaller displacement and move the cell there. Returns whether
/// the cell moved.
fn try_relocate(placement: &mut Placement, idx: usize, search_slack: f64) -> bool {
    let cell = &placement.cells[idx];
    let (width, height, orig_x, orig_y) = (cell.width, cell.height, cell.orig_x, cell.orig_y);
    let current_disp = cell.displacement();
    let radius = current_disp + search_slack;

    let mut best: Option<Candidate> = None;
    let mut best_disp = current_disp;

    for (row_idx, row) in placement.rows.iter().enumerate() {
        let vertical = (row.y_start - orig_y).abs();
        if vertical > radius {
            continue;
        }
        if height > row.height + EPSILON {
            continue;
        }
        let sites = geom::sites_needed(width, row.site_width);
        let horizontal = radius - vertical;

        for (subrow_idx, subrow) in row.subrows.iter().enumerate() {
            if sites == 0 || sites > subrow.num_sites {
                continue;
            }
            // Candidate bounds are computed in f64: the lower bound can
            // round to -1 when the interval starts within epsilon of
            // x_start, so clamp before converting.
            let lo = ((orig_x - horizontal - subrow.x_start) / subrow.site_width + EPSILON).floor();
            let hi = ((orig_x + horizontal - subrow.x_start - width) / subrow.site_width + EPSILON)
                .floor();
            if hi < 0.0 {
                continue;
            }
            let min_site = if lo > 0.0 { lo as usize } else { 0 };
            let max_site = (hi as usize).min(subrow.num_sites - sites);

            for site in min_site..=max_site {
                if !subrow.can_place_at(site, sites) {
                    continue;
                }
                let x = subrow.site_x(site);
                if x + width > subrow.x_end + EPSILON {
                    continue;
                }
                let disp = (x - orig_x).abs() + (row.y_start - orig_y).abs();
                if disp < best_disp - EPSILON {
                    best_disp = disp;
                    best = Some(Candidate {
                        row: row_idx,
                        subrow: subrow_idx,
                        site,
                        sites,
                        x,
                        disp,
                    });
                }
            }
        }
    }

    let best = match best {
        Some(best) if best.disp < current_disp - EPSILON => best,
        _ => return false,
    };

    let (cur_row, cur_subrow, cur_start, cur_sites) = match locate(placement, idx) {
        Some(found) => found,
        None => {
            // Should not happen while the occupancy invariants hold.
            debug_assert!(false, "cell {} not found in occupancy", idx);
            warn!(
                "Could not locate cell {:?} in its subrow, skipping relocation",
                placement.cells[idx].name
            );
            return false;
        }
    };

    let old_x = placement.cells[idx].x;
    placement.rows[cur_row].subrows[cur_subrow].remove(CellId(idx), cur_start, cur_sites);

    if !placement.rows[best.row].subrows[best.subrow].can_place_at(best.site, best.sites) {
        // Unreachable single-threaded: the removal above only frees sites.
        warn!(
            "Relocation target for cell {:?} no longer free, restoring",
            placement.cells[idx].name
        );
        placement.rows[cur_row].subrows[cur_subrow].insert(
            CellId(idx),
            old_x,
            cur_start,
            cur_sites,
        );
        return false;
    }
    placement.rows[best.row].subrows[best.subrow].insert(CellId(idx), best.x, best.site, best.sites);
    placement.cells[idx].x = best.x;
    placement.cells[idx].y = placement.rows[best.row].y_start;

    true
}

/// Find the row, subrow, start site and site count currently held by
/// `idx`, from its coordinates.
fn locate(placement: &Placement, idx: usize) -> Option<(usize, usize, usize, usize)> {
    let cell = &placement.cells[idx];

    for (row_idx, row) in placement.rows.iter().enumerate() {
        if (row.y_start - cell.y).abs() >= EPSILON {
            continue;
        }
        for (subrow_idx, subrow) in row.subrows.iter().enumerate() {
            if cell.x < subrow.x_start - EPSILON
                || cell.x + cell.width > subrow.x_end + EPSILON
            {
                continue;
            }
            let start = ((cell.x - subrow.x_start) / subrow.site_width + EPSILON).floor();
            if start < 0.0 {
                continue;
            }
            let start = start as usize;
            if start < subrow.num_sites && subrow.is_occupied(start) {
                let sites = geom::sites_needed(cell.width, subrow.site_width);
                return Some((row_idx, subrow_idx, start, sites));
            }
        }
    }

    None
}
