//! 2D Profiles
//!
//! Closed polylines used as extrusion and revolve profiles, plus the small
//! amount of planar geometry needed to prepare them:
//! - orientation (signed area, CCW normalization)
//! - smallest enclosing circle
//! - SVG outline loading (see [`svg`])

pub mod svg;

use glam::{DVec2, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Profile-related errors
#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    #[error("Profile must have at least 3 points, got {0}")]
    TooFewPoints(usize),

    #[error("Profile has zero area")]
    Degenerate,

    #[error("IO error: {0}")]
    Io(String),

    #[error("SVG error: {0}")]
    Svg(String),
}

/// A closed 2D polyline
///
/// The closing segment from the last point back to the first is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire2D {
    /// Points defining the wire (in order)
    pub points: Vec<Vec2>,
}

impl Wire2D {
    /// Create a new wire from points
    ///
    /// A trailing point equal to the first one is dropped, so both explicitly
    /// and implicitly closed outlines are accepted.
    pub fn new(mut points: Vec<Vec2>) -> Self {
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    /// Create a rectangle wire
    pub fn rectangle(center: Vec2, width: f32, height: f32) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Self::new(vec![
            center + Vec2::new(-hw, -hh),
            center + Vec2::new(hw, -hh),
            center + Vec2::new(hw, hh),
            center + Vec2::new(-hw, hh),
        ])
    }

    /// Create a circle wire (approximated with segments)
    pub fn circle(center: Vec2, radius: f32, segments: u32) -> Self {
        let points: Vec<Vec2> = (0..segments)
            .map(|i| {
                let angle = (i as f32 / segments as f32) * std::f32::consts::TAU;
                center + Vec2::new(angle.cos() * radius, angle.sin() * radius)
            })
            .collect();
        Self::new(points)
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the wire has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Signed area (positive for counter-clockwise winding)
    pub fn signed_area(&self) -> f32 {
        let n = self.points.len();
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.points[i].as_dvec2();
                let b = self.points[(i + 1) % n].as_dvec2();
                a.perp_dot(b)
            })
            .sum();
        (twice / 2.0) as f32
    }

    /// Check that the wire can bound a face
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.points.len() < 3 {
            return Err(ProfileError::TooFewPoints(self.points.len()));
        }
        if self.signed_area().abs() <= f32::EPSILON {
            return Err(ProfileError::Degenerate);
        }
        Ok(())
    }

    /// Return the same outline wound counter-clockwise
    pub fn to_ccw(mut self) -> Self {
        if self.signed_area() < 0.0 {
            self.points.reverse();
        }
        self
    }

    /// Scale every point about the origin
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            points: self.points.iter().map(|p| *p * factor).collect(),
        }
    }

    /// Translate every point
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            points: self.points.iter().map(|p| *p + offset).collect(),
        }
    }

    /// Swap the two coordinates of every point
    pub fn transposed(&self) -> Self {
        Self {
            points: self.points.iter().map(|p| Vec2::new(p.y, p.x)).collect(),
        }
    }

    /// Smallest circle containing every point of the wire
    pub fn bounding_circle(&self) -> Circle {
        minimum_enclosing_circle(&self.points)
    }
}

/// A circle in the plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

#[derive(Clone, Copy)]
struct DCircle {
    center: DVec2,
    radius: f64,
}

impl DCircle {
    fn contains(&self, p: DVec2) -> bool {
        p.distance(self.center) <= self.radius * (1.0 + 1e-9) + 1e-12
    }

    fn from_two(a: DVec2, b: DVec2) -> Self {
        let center = (a + b) / 2.0;
        Self {
            center,
            radius: a.distance(center),
        }
    }

    fn from_three(a: DVec2, b: DVec2, c: DVec2) -> Self {
        let ab = b - a;
        let ac = c - a;
        let d = 2.0 * ab.perp_dot(ac);
        if d.abs() < 1e-18 {
            // Collinear: the farthest pair spans the circle
            return [Self::from_two(a, c), Self::from_two(b, c)]
                .into_iter()
                .fold(Self::from_two(a, b), |best, candidate| {
                    if candidate.radius > best.radius {
                        candidate
                    } else {
                        best
                    }
                });
        }
        let ux = (ac.y * ab.length_squared() - ab.y * ac.length_squared()) / d;
        let uy = (ab.x * ac.length_squared() - ac.x * ab.length_squared()) / d;
        let offset = DVec2::new(ux, uy);
        Self {
            center: a + offset,
            radius: offset.length(),
        }
    }
}

/// Smallest enclosing circle of a point set (incremental Welzl)
pub fn minimum_enclosing_circle(points: &[Vec2]) -> Circle {
    let pts: Vec<DVec2> = points.iter().map(|p| p.as_dvec2()).collect();
    let Some(&first) = pts.first() else {
        return Circle {
            center: Vec2::ZERO,
            radius: 0.0,
        };
    };

    let mut circle = DCircle {
        center: first,
        radius: 0.0,
    };
    for i in 1..pts.len() {
        if circle.contains(pts[i]) {
            continue;
        }
        circle = DCircle {
            center: pts[i],
            radius: 0.0,
        };
        for j in 0..i {
            if circle.contains(pts[j]) {
                continue;
            }
            circle = DCircle::from_two(pts[i], pts[j]);
            for k in 0..j {
                if !circle.contains(pts[k]) {
                    circle = DCircle::from_three(pts[i], pts[j], pts[k]);
                }
            }
        }
    }

    Circle {
        center: circle.center.as_vec2(),
        radius: circle.radius as f32,
    }
}
