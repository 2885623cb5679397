/// STL model decoding (binary and ASCII)
use glam::Vec3;
use nom::{
    bytes::complete::{tag, take, take_till},
    character::complete::{multispace0, multispace1},
    multi::{count, many0},
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{preceded, tuple},
    IResult,
};

use crate::model::Mesh;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StlError {
    #[error("file too small to be a valid STL ({0} bytes)")]
    TooShort(usize),
    #[error("truncated binary STL: header announces {expected} facets, data holds {found}")]
    Truncated { expected: usize, found: usize },
    #[error("ASCII STL syntax error near `{0}`")]
    Syntax(String),
    #[error("model contains no triangles")]
    Empty,
}

/// Detect the flavor and decode. Binary files may also start with `solid`, so an
/// ASCII parse failure falls back to binary.
pub fn parse_stl(data: &[u8]) -> Result<Mesh, StlError> {
    let mesh = if data.starts_with(b"solid") {
        match std::str::from_utf8(data).map(parse_ascii_stl) {
            Ok(Ok(mesh)) => mesh,
            Ok(Err(ascii_err)) if data.len() < HEADER_LEN + 4 => return Err(ascii_err),
            _ => parse_binary_stl(data)?,
        }
    } else {
        parse_binary_stl(data)?
    };
    if mesh.is_empty() {
        return Err(StlError::Empty);
    }
    Ok(mesh)
}

pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, StlError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(StlError::TooShort(data.len()));
    }
    let (body, facets) = binary_header(data).map_err(|_| StlError::TooShort(data.len()))?;
    let expected = facets as usize;
    let found = body.len() / FACET_LEN;
    if found < expected {
        return Err(StlError::Truncated { expected, found });
    }

    let (_, triangles) = count(binary_facet, expected)(body)
        .map_err(|_| StlError::Truncated { expected, found })?;

    let mut mesh = Mesh::with_capacity(expected);
    for (normal, corners) in triangles {
        mesh.push_triangle(corners, normal);
    }
    Ok(mesh)
}

fn binary_header(input: &[u8]) -> IResult<&[u8], u32> {
    preceded(take(HEADER_LEN), le_u32)(input)
}

fn le_vec3(input: &[u8]) -> IResult<&[u8], Vec3> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, Vec3::new(x, y, z)))
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], (Vec3, [Vec3; 3])> {
    let (input, normal) = le_vec3(input)?;
    let (input, a) = le_vec3(input)?;
    let (input, b) = le_vec3(input)?;
    let (input, c) = le_vec3(input)?;
    // Attribute byte count, unused
    let (input, _) = le_u16(input)?;
    Ok((input, (normal, [a, b, c])))
}

pub fn parse_ascii_stl(input: &str) -> Result<Mesh, StlError> {
    match ascii_solid(input) {
        Ok((_, triangles)) => {
            let mut mesh = Mesh::with_capacity(triangles.len());
            for (normal, corners) in triangles {
                mesh.push_triangle(corners, normal);
            }
            Ok(mesh)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(StlError::Syntax(e.input.chars().take(24).collect()))
        }
        Err(nom::Err::Incomplete(_)) => Err(StlError::Syntax(String::new())),
    }
}

fn ascii_solid(input: &str) -> IResult<&str, Vec<(Vec3, [Vec3; 3])>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    // Optional name up to end of line
    let (input, _) = take_till(|c| c == '\n')(input)?;
    let (input, facets) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = take_till(|c| c == '\n')(input)?;
    Ok((input, facets))
}

fn ascii_facet(input: &str) -> IResult<&str, (Vec3, [Vec3; 3])> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = ascii_vec3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, a) = ascii_vertex(input)?;
    let (input, b) = ascii_vertex(input)?;
    let (input, c) = ascii_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;
    Ok((input, (normal, [a, b, c])))
}

fn ascii_vertex(input: &str) -> IResult<&str, Vec3> {
    preceded(preceded(multispace0, tag("vertex")), ascii_vec3)(input)
}

fn ascii_vec3(input: &str) -> IResult<&str, Vec3> {
    let (input, x) = preceded(multispace1, float)(input)?;
    let (input, y) = preceded(multispace1, float)(input)?;
    let (input, z) = preceded(multispace1, float)(input)?;
    Ok((input, Vec3::new(x, y, z)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "solid tri
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid tri
";

    fn binary(facets: &[([f32; 3], [[f32; 3]; 3])]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data.extend_from_slice(&(facets.len() as u32).to_le_bytes());
        for (normal, corners) in facets {
            for v in std::iter::once(normal).chain(corners.iter()) {
                for c in v {
                    data.extend_from_slice(&c.to_le_bytes());
                }
            }
            data.extend_from_slice(&0u16.to_le_bytes());
        }
        data
    }

    #[test]
    fn ascii_triangle() {
        let mesh = parse_stl(TRIANGLE.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertices[1].pos, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn ascii_scientific_notation() {
        let text = TRIANGLE.replace("vertex 1 0 0", "vertex 1.5e+01 -2.5E-1 0");
        let mesh = parse_ascii_stl(&text).unwrap();
        assert_eq!(mesh.vertices[1].pos, [15.0, -0.25, 0.0]);
    }

    #[test]
    fn binary_triangles_with_zero_normal() {
        let data = binary(&[
            ([0.0; 3], [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]),
            ([0.0, 0.0, 2.0], [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]),
        ]);
        let mesh = parse_stl(&data).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertices[0].normal, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[3].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn binary_file_starting_with_solid() {
        let mut data = binary(&[([0.0, 0.0, 1.0], [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])]);
        data[..5].copy_from_slice(b"solid");
        assert_eq!(parse_stl(&data).unwrap().triangle_count(), 1);
    }

    #[test]
    fn truncated_binary() {
        let mut data = binary(&[([0.0; 3], [[0.0; 3]; 3])]);
        data[80..84].copy_from_slice(&3u32.to_le_bytes());
        assert_eq!(
            parse_binary_stl(&data),
            Err(StlError::Truncated { expected: 3, found: 1 })
        );
    }

    #[test]
    fn empty_and_short_inputs() {
        assert_eq!(parse_stl(&[0u8; 10]), Err(StlError::TooShort(10)));
        assert_eq!(parse_stl(&binary(&[])), Err(StlError::Empty));
        assert!(matches!(parse_stl(b"solid x\n facet oops"), Err(StlError::Syntax(_))));
    }
}
