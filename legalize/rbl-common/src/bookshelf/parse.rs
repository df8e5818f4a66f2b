use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::warn;

use super::{AuxFiles, Node, Position, RowDef, SubrowDef};
use crate::ParseError;

/// Strip a trailing `#` comment and surrounding whitespace. Only the
/// `.scl` format allows mid-line comments; the other parsers just skip
/// lines that start with `#`.
fn strip_scl(line: &str) -> &str {
    let line = match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    };
    line.trim()
}

pub fn parse_aux(path: &Path) -> Result<AuxFiles> {
    let file =
        File::open(path).with_context(|| anyhow!("Failed to open aux file {:?}", path))?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    parse_aux_from(BufReader::new(file), dir)
        .with_context(|| anyhow!("Failed to parse aux file {:?}", path))
}

/// Parse an `.aux` listing. File entries are recognized by extension and
/// resolved relative to `dir`; all five kinds must be present.
pub fn parse_aux_from(reader: impl BufRead, dir: &Path) -> Result<AuxFiles> {
    let mut nodes = None;
    let mut nets = None;
    let mut wts = None;
    let mut pl = None;
    let mut scl = None;

    for line in reader.lines() {
        let line = line.context("Read aux line")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let list = match line.split_once(':') {
            Some((_, list)) => list,
            None => continue,
        };
        for token in list.split_whitespace() {
            let target = match token.rsplit_once('.') {
                Some((_, "nodes")) => &mut nodes,
                Some((_, "nets")) => &mut nets,
                Some((_, "wts")) => &mut wts,
                Some((_, "pl")) => &mut pl,
                Some((_, "scl")) => &mut scl,
                _ => continue,
            };
            *target = Some(dir.join(token));
        }
    }

    Ok(AuxFiles {
        nodes: nodes.ok_or(ParseError::MissingAuxEntry("nodes"))?,
        nets: nets.ok_or(ParseError::MissingAuxEntry("nets"))?,
        wts: wts.ok_or(ParseError::MissingAuxEntry("wts"))?,
        pl: pl.ok_or(ParseError::MissingAuxEntry("pl"))?,
        scl: scl.ok_or(ParseError::MissingAuxEntry("scl"))?,
    })
}

pub fn parse_nodes(path: &Path) -> Result<Vec<Node>> {
    let file =
        File::open(path).with_context(|| anyhow!("Failed to open nodes file {:?}", path))?;
    parse_nodes_from(BufReader::new(file))
        .with_context(|| anyhow!("Failed to parse nodes file {:?}", path))
}

/// Parse a `.nodes` file. Unparseable records are skipped with a warning;
/// a repeated name warns and the later definition wins while keeping the
/// first occurrence's position in the returned order.
pub fn parse_nodes_from(reader: impl BufRead) -> Result<Vec<Node>> {
    let mut nodes: Vec<Node> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut header_done = false;

    for line in reader.lines() {
        let line = line.context("Read nodes line")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Header keywords only count before the first record; a cell may
        // legitimately carry one of these names.
        if !header_done {
            if line.starts_with("UCLA nodes")
                || line.starts_with("NumNodes")
                || line.starts_with("NumTerminals")
            {
                continue;
            }
            header_done = true;
        }

        let mut tokens = line.split_whitespace();
        let name = match tokens.next() {
            Some(name) => name,
            None => continue,
        };
        let dims = tokens
            .next()
            .and_then(|w| w.parse::<f64>().ok())
            .zip(tokens.next().and_then(|h| h.parse::<f64>().ok()));
        let (width, height) = match dims {
            Some(dims) => dims,
            None => {
                warn!("Skipping malformed node record: {:?}", line);
                continue;
            }
        };
        let terminal = matches!(tokens.next(), Some("terminal") | Some("fixed"));

        let node = Node {
            name: name.to_owned(),
            width,
            height,
            terminal,
        };
        match index.entry(node.name.clone()) {
            Entry::Occupied(slot) => {
                warn!("Duplicate node name {:?}, later definition wins", name);
                nodes[*slot.get()] = node;
            }
            Entry::Vacant(slot) => {
                slot.insert(nodes.len());
                nodes.push(node);
            }
        }
    }

    Ok(nodes)
}

pub fn parse_pl(path: &Path) -> Result<HashMap<String, Position>> {
    let file = File::open(path).with_context(|| anyhow!("Failed to open pl file {:?}", path))?;
    parse_pl_from(BufReader::new(file))
        .with_context(|| anyhow!("Failed to parse pl file {:?}", path))
}

/// Parse a `.pl` file into a name -> position map. The optional trailing
/// `: <orientation>` field is accepted and ignored.
pub fn parse_pl_from(reader: impl BufRead) -> Result<HashMap<String, Position>> {
    let mut positions = HashMap::new();
    let mut header_done = false;

    for line in reader.lines() {
        let line = line.context("Read pl line")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !header_done {
            if line.starts_with("UCLA pl") {
                continue;
            }
            header_done = true;
        }

        let mut tokens = line.split_whitespace();
        let name = match tokens.next() {
            Some(name) => name,
            None => continue,
        };
        let coords = tokens
            .next()
            .and_then(|x| x.parse::<f64>().ok())
            .zip(tokens.next().and_then(|y| y.parse::<f64>().ok()));
        match coords {
            Some((x, y)) => {
                positions.insert(name.to_owned(), Position { x, y });
            }
            None => warn!("Skipping malformed placement record: {:?}", line),
        }
    }

    Ok(positions)
}

pub fn parse_scl(path: &Path) -> Result<Vec<RowDef>> {
    let file =
        File::open(path).with_context(|| anyhow!("Failed to open scl file {:?}", path))?;
    parse_scl_from(BufReader::new(file))
        .with_context(|| anyhow!("Failed to parse scl file {:?}", path))
}

/// Parse the `CoreRow Horizontal` blocks of a `.scl` file.
pub fn parse_scl_from(reader: impl BufRead) -> Result<Vec<RowDef>> {
    let mut rows = Vec::new();
    let mut current: Option<RowDef> = None;

    for line in reader.lines() {
        let line = line.context("Read scl line")?;
        let line = strip_scl(&line);
        if line.is_empty() {
            continue;
        }

        let keyword = match line.split_whitespace().next() {
            Some(keyword) => keyword,
            None => continue,
        };
        match keyword {
            "CoreRow" => current = Some(RowDef::default()),
            "End" => {
                if let Some(row) = current.take() {
                    rows.push(row);
                }
            }
            _ => {
                let row = match current.as_mut() {
                    Some(row) => row,
                    None => continue,
                };
                match keyword {
                    "Coordinate" => row.y_start = numeric_field(line, "Coordinate")?,
                    "Height" => row.height = numeric_field(line, "Height")?,
                    "Sitewidth" => row.site_width = numeric_field(line, "Sitewidth")?,
                    "Sitespacing" => row.site_spacing = numeric_field(line, "Sitespacing")?,
                    "SubrowOrigin" => row.subrows.push(subrow_origin(line)?),
                    // Siteorient / Sitesymmetry are accepted and ignored.
                    _ => {}
                }
            }
        }
    }

    Ok(rows)
}

fn numeric_field(line: &str, field: &'static str) -> Result<f64, ParseError> {
    line.split_once(':')
        .and_then(|(_, value)| value.trim().parse().ok())
        .ok_or_else(|| ParseError::MalformedField {
            field,
            line: line.to_owned(),
        })
}

/// Decode `SubrowOrigin : <xStart> NumSites : <n>`. The sites label is
/// accepted in both spellings seen in the wild.
fn subrow_origin(line: &str) -> Result<SubrowDef, ParseError> {
    let malformed = || ParseError::MalformedSubrowOrigin(line.to_owned());

    let (_, rest) = line.split_once(':').ok_or_else(malformed)?;
    let mut tokens = rest.split_whitespace();
    let x_start = tokens
        .next()
        .and_then(|t| t.parse::<f64>().ok())
        .ok_or_else(malformed)?;
    match tokens.next() {
        Some("NumSites") | Some("Numsites") => {}
        _ => return Err(malformed()),
    }
    if tokens.next() != Some(":") {
        return Err(malformed());
    }
    let num_sites = tokens
        .next()
        .and_then(|t| t.parse::<usize>().ok())
        .ok_or_else(malformed)?;

    Ok(SubrowDef { x_start, num_sites })
}
