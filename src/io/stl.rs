use super::IoError;
use crate::polygon::Polygon;
use nalgebra::Vector3;
use std::io::Cursor;

/// Fan triangles of every polygon with their facet normal.
fn facets(polygons: &[Polygon]) -> Vec<(Vector3<f32>, [[f32; 3]; 3])> {
    let mut out = Vec::new();
    for poly in polygons {
        let apex = poly.point_average();
        let n = poly.area_vector();
        let n = if n.norm() > 0.0 { n.normalize() } else { n };
        #[allow(clippy::unnecessary_cast)]
        let normal = Vector3::new(n.x as f32, n.y as f32, n.z as f32);
        for tri in poly.fan(apex) {
            #[allow(clippy::unnecessary_cast)]
            out.push((normal, tri.map(|p| [p.x as f32, p.y as f32, p.z as f32])));
        }
    }
    out
}

/// Export interface polygons to an **ASCII STL** string named `name`.
///
/// Each polygon is fanned about its point average.
pub fn to_stl_ascii(polygons: &[Polygon], name: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("solid {name}\n"));

    for (n, tri) in facets(polygons) {
        out.push_str(&format!(
            "  facet normal {:.6} {:.6} {:.6}\n",
            n.x, n.y, n.z
        ));
        out.push_str("    outer loop\n");
        for p in &tri {
            out.push_str(&format!(
                "      vertex {:.6} {:.6} {:.6}\n",
                p[0], p[1], p[2]
            ));
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }

    out.push_str(&format!("endsolid {name}\n"));
    out
}

/// Export interface polygons to a **binary STL** byte vector.
pub fn to_stl_binary(polygons: &[Polygon]) -> Result<Vec<u8>, IoError> {
    use stl_io::{Normal, Triangle, Vertex, write_stl};

    let triangles: Vec<Triangle> = facets(polygons)
        .into_iter()
        .map(|(n, tri)| Triangle {
            normal: Normal::new([n.x, n.y, n.z]),
            vertices: tri.map(Vertex::new),
        })
        .collect();

    let mut cursor = Cursor::new(Vec::new());
    write_stl(&mut cursor, triangles.iter())?;
    Ok(cursor.into_inner())
}
