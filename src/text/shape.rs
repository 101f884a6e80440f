//! Planar shapes built from glyph contours.

use cgmath::Vector2;

use crate::error::TextError;

pub type Contour = Vec<Vector2<f32>>;

/// An outer contour with the holes cut out of it.
///
/// After [`Shape::normalized`] the outer contour runs counter-clockwise and
/// every hole clockwise, so the right-hand normal of each edge points away
/// from the filled region.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
    pub outer: Contour,
    pub holes: Vec<Contour>,
}

/// Signed area of the polygon, positive when counter-clockwise.
pub fn signed_area(contour: &[Vector2<f32>]) -> f32 {
    let n = contour.len();
    (0..n)
        .map(|i| {
            let p = contour[i];
            let q = contour[(i + 1) % n];
            p.x * q.y - q.x * p.y
        })
        .sum::<f32>()
        * 0.5
}

pub fn is_clockwise(contour: &[Vector2<f32>]) -> bool {
    signed_area(contour) < 0.0
}

/// Even-odd point in polygon test.
pub fn contains_point(contour: &[Vector2<f32>], point: Vector2<f32>) -> bool {
    let mut inside = false;
    let n = contour.len();
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let a = contour[i];
        let b = contour[j];
        if (a.y > point.y) != (b.y > point.y)
            && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Drops repeated consecutive points and a closing point equal to the first.
pub fn clean_contour(contour: &[Vector2<f32>]) -> Contour {
    const EPS: f32 = 1e-6;
    let same = |a: Vector2<f32>, b: Vector2<f32>| (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS;

    let mut cleaned: Contour = Vec::with_capacity(contour.len());
    for &p in contour {
        if cleaned.last().is_none_or(|&last| !same(last, p)) {
            cleaned.push(p);
        }
    }
    while cleaned.len() > 1 && same(cleaned[0], cleaned[cleaned.len() - 1]) {
        cleaned.pop();
    }
    cleaned
}

/// Groups the contours of a single glyph into shapes.
///
/// Clockwise contours are solids, the rest are holes. A hole belongs to the
/// first solid containing its first point, or to the solid read before it
/// when none does. A glyph with a single contour is always solid. Contours
/// with fewer than three distinct points are dropped.
pub fn shapes_from_contours(contours: &[Contour]) -> Vec<Shape> {
    let contours: Vec<Contour> = contours
        .iter()
        .map(|c| clean_contour(c))
        .filter(|c| c.len() >= 3)
        .collect();

    if contours.len() == 1 {
        return vec![Shape {
            outer: contours[0].clone(),
            holes: Vec::new(),
        }];
    }

    let mut shapes: Vec<Shape> = Vec::new();
    let mut pending: Vec<(Option<usize>, Contour)> = Vec::new();
    for contour in contours {
        if is_clockwise(&contour) {
            shapes.push(Shape {
                outer: contour,
                holes: Vec::new(),
            });
        } else {
            pending.push((shapes.len().checked_sub(1), contour));
        }
    }

    for (previous, hole) in pending {
        let owner = shapes
            .iter()
            .position(|shape| contains_point(&shape.outer, hole[0]))
            .or(previous)
            .or_else(|| shapes.len().checked_sub(1));
        match owner {
            Some(i) => shapes[i].holes.push(hole),
            None => {
                // no solid at all: the font winds the other way round
                shapes.push(Shape {
                    outer: hole,
                    holes: Vec::new(),
                });
            }
        }
    }
    shapes
}

impl Shape {
    pub fn normalized(mut self) -> Self {
        if is_clockwise(&self.outer) {
            self.outer.reverse();
        }
        for hole in &mut self.holes {
            if !is_clockwise(hole) {
                hole.reverse();
            }
        }
        self
    }

    /// Every ring of the shape, outer first.
    pub fn rings(&self) -> impl Iterator<Item = &Contour> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    pub fn point_count(&self) -> usize {
        self.rings().map(Vec::len).sum()
    }

    /// Triangulates the face of the shape.
    ///
    /// Indices address the points of [`Shape::rings`] in order. Triangles are
    /// wound counter-clockwise.
    pub fn triangulate(&self) -> Result<Vec<[usize; 3]>, TextError> {
        let mut flat: Vec<f64> = Vec::with_capacity(self.point_count() * 2);
        let mut hole_starts = Vec::with_capacity(self.holes.len());
        for (i, ring) in self.rings().enumerate() {
            if i > 0 {
                hole_starts.push(flat.len() / 2);
            }
            for p in ring {
                flat.push(p.x as f64);
                flat.push(p.y as f64);
            }
        }

        let indices = earcutr::earcut(&flat, &hole_starts, 2)
            .map_err(|e| TextError::Triangulation(format!("{e:?}")))?;

        let points: Vec<Vector2<f32>> = self.rings().flatten().copied().collect();
        Ok(indices
            .chunks_exact(3)
            .map(|t| {
                let tri = [t[0], t[1], t[2]];
                if signed_area(&[points[tri[0]], points[tri[1]], points[tri[2]]]) < 0.0 {
                    [tri[0], tri[2], tri[1]]
                } else {
                    tri
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x: f32, y: f32, side: f32, clockwise: bool) -> Contour {
        let mut c = vec![
            Vector2::new(x, y),
            Vector2::new(x + side, y),
            Vector2::new(x + side, y + side),
            Vector2::new(x, y + side),
        ];
        if clockwise {
            c.reverse();
        }
        c
    }

    #[test]
    fn area_sign_follows_winding() {
        assert_relative_eq!(signed_area(&square(0.0, 0.0, 2.0, false)), 4.0);
        assert!(is_clockwise(&square(0.0, 0.0, 2.0, true)));
    }

    #[test]
    fn cleaning_removes_closing_duplicate() {
        let mut c = square(0.0, 0.0, 1.0, false);
        c.push(c[0]);
        c.insert(1, c[0]);
        assert_eq!(clean_contour(&c).len(), 4);
    }

    #[test]
    fn holes_attach_to_enclosing_solid() {
        // an "o" next to an "l", outer contours clockwise
        let contours = vec![
            square(10.0, 0.0, 1.0, true),
            square(0.0, 0.0, 4.0, true),
            square(1.0, 1.0, 2.0, false),
        ];
        let shapes = shapes_from_contours(&contours);
        assert_eq!(shapes.len(), 2);
        assert!(shapes[0].holes.is_empty());
        assert_eq!(shapes[1].holes.len(), 1);
    }

    #[test]
    fn single_contour_is_solid_whatever_its_winding() {
        let shapes = shapes_from_contours(&[square(0.0, 0.0, 1.0, false)]);
        assert_eq!(shapes.len(), 1);
        assert!(shapes[0].holes.is_empty());
    }

    #[test]
    fn normalizing_flips_outer_to_ccw_and_holes_to_cw() {
        let shape = Shape {
            outer: square(0.0, 0.0, 4.0, true),
            holes: vec![square(1.0, 1.0, 2.0, false)],
        }
        .normalized();
        assert!(!is_clockwise(&shape.outer));
        assert!(is_clockwise(&shape.holes[0]));
    }

    #[test]
    fn triangulated_area_excludes_holes() {
        let shape = Shape {
            outer: square(0.0, 0.0, 4.0, false),
            holes: vec![square(1.0, 1.0, 2.0, true)],
        };
        let points: Vec<_> = shape.rings().flatten().copied().collect();
        let triangles = shape.triangulate().unwrap();
        let area: f32 = triangles
            .iter()
            .map(|t| signed_area(&[points[t[0]], points[t[1]], points[t[2]]]))
            .sum();
        assert_relative_eq!(area, 12.0, epsilon = 1e-4);
        assert!(triangles
            .iter()
            .all(|t| signed_area(&[points[t[0]], points[t[1]], points[t[2]]]) >= 0.0));
    }
}
