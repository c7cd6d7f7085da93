//! OBJ file loader producing collision triangle soups
//!
//! Only positions and faces matter for collision; normals, texture
//! coordinates, groups and materials are skipped. Polygonal faces are
//! ear-clipped, falling back to a fan when the polygon will not clip.

use crate::foundation::math::Vec3;
use crate::physics::collision::Triangle;
use super::tessellator::tessellate;
use log::{debug, warn};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObjError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file as a triangle soup
    pub fn load_triangles<P: AsRef<Path>>(path: P) -> Result<Vec<Triangle>, ObjError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let triangles = Self::parse_triangles(&source)?;
        debug!("Loaded {} triangles from {}", triangles.len(), path.display());
        Ok(triangles)
    }

    /// Parse OBJ source text as a triangle soup
    pub fn parse_triangles(source: &str) -> Result<Vec<Triangle>, ObjError> {
        let mut positions: Vec<Vec3> = Vec::new();
        let mut triangles = Vec::new();

        for (number, line) in source.lines().enumerate() {
            let line_number = number + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[0] {
                "v" => {
                    if parts.len() < 4 {
                        return Err(parse_error(line_number, "Vertex needs three coordinates"));
                    }
                    let mut coordinates = [0.0f32; 3];
                    for (slot, text) in coordinates.iter_mut().zip(&parts[1..4]) {
                        *slot = text
                            .parse()
                            .map_err(|_| parse_error(line_number, &format!("Invalid vertex coordinate '{text}'")))?;
                    }
                    positions.push(Vec3::from(coordinates));
                }
                "f" => {
                    if parts.len() < 4 {
                        return Err(parse_error(line_number, "Face needs at least three vertices"));
                    }
                    let face = parts[1..]
                        .iter()
                        .map(|vertex| resolve_position(vertex, &positions, line_number))
                        .collect::<Result<Vec<Vec3>, ObjError>>()?;
                    append_face(&face, line_number, &mut triangles);
                }
                _ => {
                    // Normals, texture coordinates, groups, materials
                }
            }
        }

        if triangles.is_empty() {
            return Err(ObjError::InvalidFormat("No faces found in OBJ source".to_string()));
        }

        Ok(triangles)
    }
}

fn parse_error(line: usize, message: &str) -> ObjError {
    ObjError::ParseError { line, message: message.to_string() }
}

/// Position for one `v/vt/vn` face entry; negative indices count back from the end
fn resolve_position(vertex: &str, positions: &[Vec3], line: usize) -> Result<Vec3, ObjError> {
    let index_text = vertex.split('/').next().unwrap_or_default();
    let index: i64 = index_text
        .parse()
        .map_err(|_| parse_error(line, &format!("Invalid position index '{index_text}'")))?;

    let resolved = match index {
        0 => None,
        i if i > 0 => usize::try_from(i - 1).ok(),
        i => usize::try_from(i.unsigned_abs()).ok().and_then(|back| positions.len().checked_sub(back)),
    };

    resolved
        .and_then(|i| positions.get(i).copied())
        .ok_or_else(|| ObjError::InvalidFormat(format!("Position index {index} out of bounds on line {line}")))
}

fn append_face(face: &[Vec3], line: usize, triangles: &mut Vec<Triangle>) {
    if let [a, b, c] = face {
        triangles.push(Triangle::new(*a, *b, *c));
        return;
    }

    match tessellate(face) {
        Ok(indices) => {
            triangles.extend(indices.into_iter().map(|[a, b, c]| Triangle::new(face[a], face[b], face[c])));
        }
        Err(error) => {
            warn!("Face on line {line} falls back to fan triangulation: {error}");
            for i in 1..(face.len() - 1) {
                triangles.push(Triangle::new(face[0], face[i], face[i + 1]));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_triangles_and_quads() {
        let source = "\
# floor and a wall
v 0 0 0
v 1 0 0
v 1 0 1
v 0 0 1
v 0 1 0
vn 0 1 0
f 1 2 5
f 1//1 2//1 3//1 4//1
";
        let triangles = ObjLoader::parse_triangles(source).unwrap();
        assert_eq!(triangles.len(), 3);
        assert_eq!(triangles[0].p2, Vec3::new(0.0, 1.0, 0.0));

        let quad_area: f32 = triangles[1..].iter().map(Triangle::area).sum();
        assert_relative_eq!(quad_area, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_concave_face_is_ear_clipped() {
        let source = "\
v 0 0 0
v 2 0 0
v 2 1 0
v 1 1 0
v 1 2 0
v 0 2 0
f 1/1 2/2 3/3 4/4 5/5 6/6
";
        let triangles = ObjLoader::parse_triangles(source).unwrap();
        assert_eq!(triangles.len(), 4);
        let area: f32 = triangles.iter().map(Triangle::area).sum();
        assert_relative_eq!(area, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_negative_indices() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let triangles = ObjLoader::parse_triangles(source).unwrap();
        assert_eq!(triangles[0].p0, Vec3::zeros());
        assert_eq!(triangles[0].p2, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_degenerate_polygon_falls_back_to_fan() {
        let source = "v 0 0 0\nv 1 0 0\nv 2 0 0\nv 3 0 0\nf 1 2 3 4\n";
        let triangles = ObjLoader::parse_triangles(source).unwrap();
        assert_eq!(triangles.len(), 2);
    }

    #[test]
    fn test_bad_input() {
        assert!(matches!(
            ObjLoader::parse_triangles("v 0 0 zero\n"),
            Err(ObjError::ParseError { line: 1, .. })
        ));
        assert!(matches!(
            ObjLoader::parse_triangles("v 0 0 0\nf 1 2 3\n"),
            Err(ObjError::InvalidFormat(_))
        ));
        assert!(matches!(ObjLoader::parse_triangles("v 0 0 0\n"), Err(ObjError::InvalidFormat(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ObjLoader::load_triangles("does/not/exist.obj"),
            Err(ObjError::Io(_))
        ));
    }
}
