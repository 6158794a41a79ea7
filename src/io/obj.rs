//! Wavefront OBJ output, one `f` record per interface polygon.

use super::IoError;
use crate::polygon::Polygon;
use std::fmt::Write as _;
use std::io::Write;

/// Write `polygons` as an OBJ document named `name`.
///
/// Vertices are not shared between polygons. Polygons with fewer than three
/// vertices are rejected since a face record needs at least three indices.
pub fn write_obj<W: Write>(mut writer: W, name: &str, polygons: &[Polygon]) -> Result<(), IoError> {
    let text = to_obj_string(name, polygons)?;
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Same as [`write_obj`] but returns the document as a `String`.
pub fn to_obj_string(name: &str, polygons: &[Polygon]) -> Result<String, IoError> {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = writeln!(out, "o {name}");

    for (i, poly) in polygons.iter().enumerate() {
        if poly.vertices.len() < 3 {
            return Err(IoError::MalformedInput(format!(
                "polygon {i} has {} vertices",
                poly.vertices.len()
            )));
        }
        for p in &poly.vertices {
            let _ = writeln!(out, "v {:.9} {:.9} {:.9}", p.x, p.y, p.z);
        }
    }

    let mut next = 1usize;
    for poly in polygons {
        out.push('f');
        for k in 0..poly.vertices.len() {
            let _ = write!(out, " {}", next + k);
        }
        out.push('\n');
        next += poly.vertices.len();
    }
    Ok(out)
}
