//! Legalization driver for Bookshelf row-based placements: load a design,
//! snap every movable cell to a site, shrink the displacement, emit the
//! result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use log::{info, warn};
use rbl_common::bookshelf;

use crate::config::Config;
use crate::model::Placement;

mod config;
mod displacement;
mod geom;
mod initial;
mod model;
mod occupancy;
mod refine;

fn artifact(prefix: &str, ext: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", prefix, ext))
}

fn run_legalization(config: &Config) -> Result<()> {
    let aux = bookshelf::parse_aux(&artifact(&config.input_prefix, "aux"))?;
    let nodes = bookshelf::parse_nodes(&aux.nodes)?;
    let positions = bookshelf::parse_pl(&aux.pl)?;
    let row_defs = bookshelf::parse_scl(&aux.scl)?;

    let mut placement = Placement::from_bookshelf(&nodes, &positions, &row_defs);
    info!(
        "Loaded {} cells across {} rows, extent {:.1} x {:.1}",
        placement.cells.len(),
        placement.rows.len(),
        placement.max_x,
        placement.max_y
    );

    let unplaced = initial::place(&mut placement);
    if unplaced > 0 {
        warn!("{} cells could not be placed", unplaced);
    }
    let iterations = refine::refine(&mut placement, &config.refine);
    info!("Refinement finished after {} iterations", iterations);

    let stats = displacement::measure(&placement);
    println!("Total displacement: {:.4}", stats.total);
    println!("Maximum displacement: {:.4}", stats.max);

    let out = &config.output_prefix;
    bookshelf::write_aux(&artifact(out, "aux"), out)?;
    bookshelf::write_nodes(&artifact(out, "nodes"), &nodes)?;
    bookshelf::write_pl(
        &artifact(out, "pl"),
        placement.cells.iter().map(|c| (c.name.as_str(), c.x, c.y)),
    )?;
    bookshelf::write_scl(&artifact(out, "scl"), &row_defs)?;
    bookshelf::copy_file(&aux.nets, &artifact(out, "nets"))?;
    bookshelf::copy_file(&aux.wts, &artifact(out, "wts"))?;

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("rbl-legalizer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Row-based legalization for Bookshelf placements")
        .arg(
            Arg::new("INPUT")
                .help("Input file prefix; <prefix>.aux names the design")
                .index(1)
                .required(true),
        )
        .arg(
            Arg::new("OUTPUT")
                .help("Output file prefix")
                .index(2)
                .required(true),
        )
        .get_matches();

    let config = Config::from_args(&matches);
    let argv0 = std::env::args()
        .next()
        .unwrap_or_else(|| "rbl-legalizer".to_owned());
    println!("%> {} {} {}", argv0, config.input_prefix, config.output_prefix);

    run_legalization(&config).context("Legalization failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RefineConfig;
    use approx::assert_abs_diff_eq;
    use std::fs;
    use std::path::Path;

    fn scratch(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rbl-e2e-{}-{}", tag, std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).unwrap();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_design(dir: &Path, nodes: &str, pl: &str, scl: &str) -> Config {
        fs::write(
            dir.join("in.aux"),
            "RowBasedPlacement : in.nodes in.nets in.wts in.pl in.scl\n",
        )
        .unwrap();
        fs::write(dir.join("in.nodes"), nodes).unwrap();
        fs::write(dir.join("in.pl"), pl).unwrap();
        fs::write(dir.join("in.scl"), scl).unwrap();
        fs::write(
            dir.join("in.nets"),
            "UCLA nets 1.0\nNumNets : 0\nNumPins : 0\n",
        )
        .unwrap();
        fs::write(dir.join("in.wts"), "UCLA wts 1.0\n").unwrap();

        Config {
            input_prefix: dir.join("in").to_str().unwrap().to_owned(),
            output_prefix: dir.join("out").to_str().unwrap().to_owned(),
            refine: RefineConfig::default(),
        }
    }

    const SCL_ONE_ROW: &str = "UCLA scl 1.0\n\
        NumRows : 1\n\
        \n\
        CoreRow Horizontal\n\
        \x20 Coordinate     : 0.0\n\
        \x20 Height         : 10.0\n\
        \x20 Sitewidth      : 1.0\n\
        \x20 Sitespacing    : 1.0\n\
        \x20 Siteorient     : 1\n\
        \x20 Sitesymmetry   : 1\n\
        \x20 SubrowOrigin   : 0.0 NumSites : 100\n\
        End\n";

    #[test]
    fn legalizes_and_reports_a_simple_design() -> Result<()> {
        let dir = scratch("simple");
        let config = write_design(
            &dir,
            "UCLA nodes 1.0\nNumNodes : 2\nNumTerminals : 1\n\n\
             a1 3.0 10.0\n\
             p0 2.0 2.0 terminal\n",
            "UCLA pl 1.0\n\na1 5.4 0.0 : N\np0 50.0 20.0 : N\n",
            SCL_ONE_ROW,
        );
        run_legalization(&config)?;

        let out_pl = bookshelf::parse_pl(&dir.join("out.pl"))?;
        assert_abs_diff_eq!(out_pl["a1"].x, 5.0);
        assert_abs_diff_eq!(out_pl["a1"].y, 0.0);
        // The fixed terminal never moves.
        assert_abs_diff_eq!(out_pl["p0"].x, 50.0);
        assert_abs_diff_eq!(out_pl["p0"].y, 20.0);

        // Connectivity passes through untouched.
        assert_eq!(fs::read(dir.join("in.nets"))?, fs::read(dir.join("out.nets"))?);
        assert_eq!(fs::read(dir.join("in.wts"))?, fs::read(dir.join("out.wts"))?);

        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn already_legal_design_round_trips() -> Result<()> {
        // Two cells packed against the left edge are already on sites, so
        // legalization and refinement leave them in place.
        let dir = scratch("roundtrip");
        let config = write_design(
            &dir,
            "UCLA nodes 1.0\nNumNodes : 2\nNumTerminals : 0\n\n\
             a 3.0 10.0\n\
             b 2.0 10.0\n",
            "UCLA pl 1.0\n\na 0.0 0.0\nb 3.0 0.0\n",
            SCL_ONE_ROW,
        );
        run_legalization(&config)?;

        let in_pl = bookshelf::parse_pl(&dir.join("in.pl"))?;
        let out_pl = bookshelf::parse_pl(&dir.join("out.pl"))?;
        for (name, pos) in &in_pl {
            assert_abs_diff_eq!(out_pl[name].x, pos.x, epsilon = 1e-6);
            assert_abs_diff_eq!(out_pl[name].y, pos.y, epsilon = 1e-6);
        }

        let in_rows = bookshelf::parse_scl(&dir.join("in.scl"))?;
        let out_rows = bookshelf::parse_scl(&dir.join("out.scl"))?;
        assert_eq!(in_rows, out_rows);

        let in_nodes = bookshelf::parse_nodes(&dir.join("in.nodes"))?;
        let out_nodes = bookshelf::parse_nodes(&dir.join("out.nodes"))?;
        assert_eq!(in_nodes, out_nodes);

        // The emitted aux names the emitted artifacts.
        let out_aux = bookshelf::parse_aux(&dir.join("out.aux"))?;
        assert_eq!(out_aux.pl, dir.join("out.pl"));

        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn missing_aux_entry_fails_the_run() {
        let dir = scratch("badaux");
        fs::write(
            dir.join("in.aux"),
            "RowBasedPlacement : in.nodes in.nets in.wts in.pl\n",
        )
        .unwrap();
        let config = Config {
            input_prefix: dir.join("in").to_str().unwrap().to_owned(),
            output_prefix: dir.join("out").to_str().unwrap().to_owned(),
            refine: RefineConfig::default(),
        };

        let err = run_legalization(&config).expect_err("Run unexpectedly succeeded");
        assert!(err
            .chain()
            .any(|e| matches!(
                e.downcast_ref::<rbl_common::ParseError>(),
                Some(rbl_common::ParseError::MissingAuxEntry("scl"))
            )));

        fs::remove_dir_all(&dir).unwrap();
    }
}
