use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use super::{Node, RowDef};

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| anyhow!("Failed to create output file {:?}", path))?;
    Ok(BufWriter::new(file))
}

/// Write an `.aux` listing for an emitted design. The artifacts are named
/// by the basename of `prefix` so the listing stays valid relative to its
/// own directory.
pub fn write_aux(path: &Path, prefix: &str) -> Result<()> {
    let stem = Path::new(prefix)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(prefix);
    let mut out = create(path)?;
    writeln!(
        out,
        "RowBasedPlacement : {p}.nodes {p}.nets {p}.wts {p}.pl {p}.scl",
        p = stem
    )
    .with_context(|| anyhow!("Failed to write aux file {:?}", path))?;
    Ok(())
}

pub fn write_nodes(path: &Path, nodes: &[Node]) -> Result<()> {
    let mut out = create(path)?;
    write_nodes_to(&mut out, nodes)
        .with_context(|| anyhow!("Failed to write nodes file {:?}", path))
}

fn write_nodes_to(out: &mut impl Write, nodes: &[Node]) -> Result<()> {
    let terminals = nodes.iter().filter(|n| n.terminal).count();
    writeln!(out, "UCLA nodes 1.0")?;
    writeln!(out, "NumNodes : {}", nodes.len())?;
    writeln!(out, "NumTerminals : {}", terminals)?;
    writeln!(out)?;
    for node in nodes {
        write!(out, "{} {:.4} {:.4}", node.name, node.width, node.height)?;
        if node.terminal {
            write!(out, " terminal")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_pl<'a>(
    path: &Path,
    cells: impl IntoIterator<Item = (&'a str, f64, f64)>,
) -> Result<()> {
    let mut out = create(path)?;
    write_pl_to(&mut out, cells).with_context(|| anyhow!("Failed to write pl file {:?}", path))
}

fn write_pl_to<'a>(
    out: &mut impl Write,
    cells: impl IntoIterator<Item = (&'a str, f64, f64)>,
) -> Result<()> {
    writeln!(out, "UCLA pl 1.0")?;
    writeln!(out)?;
    for (name, x, y) in cells {
        writeln!(out, "{} {:.6} {:.6}", name, x, y)?;
    }
    Ok(())
}

pub fn write_scl(path: &Path, rows: &[RowDef]) -> Result<()> {
    let mut out = create(path)?;
    write_scl_to(&mut out, rows).with_context(|| anyhow!("Failed to write scl file {:?}", path))
}

fn write_scl_to(out: &mut impl Write, rows: &[RowDef]) -> Result<()> {
    writeln!(out, "UCLA scl 1.0")?;
    writeln!(out)?;
    writeln!(out, "NumRows : {}", rows.len())?;
    writeln!(out)?;
    for row in rows {
        writeln!(out, "CoreRow Horizontal")?;
        writeln!(out, "  Coordinate     : {:.4}", row.y_start)?;
        writeln!(out, "  Height         : {:.4}", row.height)?;
        writeln!(out, "  Sitewidth      : {:.4}", row.site_width)?;
        writeln!(out, "  Sitespacing    : {:.4}", row.site_spacing)?;
        writeln!(out, "  Siteorient     : 1")?;
        writeln!(out, "  Sitesymmetry   : 1")?;
        for subrow in &row.subrows {
            writeln!(
                out,
                "  SubrowOrigin   : {:.4}    NumSites : {}",
                subrow.x_start, subrow.num_sites
            )?;
        }
        writeln!(out, "End")?;
        writeln!(out)?;
    }
    Ok(())
}

/// Byte-for-byte pass-through for the `.nets` / `.wts` artifacts.
pub fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    std::fs::copy(src, dest)
        .with_context(|| anyhow!("Failed to copy {:?} to {:?}", src, dest))?;
    Ok(())
}
