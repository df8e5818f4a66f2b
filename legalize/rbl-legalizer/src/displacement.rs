//! Displacement accounting over the finished placement.

use crate::model::Placement;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplacementStats {
    pub total: f64,
    pub max: f64,
}

/// Total and maximum Manhattan displacement over movable cells. Fixed
/// cells never move, so they contribute nothing.
pub fn measure(placement: &Placement) -> DisplacementStats {
    let mut stats = DisplacementStats::default();
    for idx in placement.movable() {
        let disp = placement.cells[idx].displacement();
        stats.total += disp;
        stats.max = stats.max.max(disp);
    }
    stats
}
