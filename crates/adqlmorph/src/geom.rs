//! Spherical geometry values
//!
//! Concrete values produced when STC-S literals are ingested. Angles are stored
//! in radians; the STC-S grammar converts from degrees on the way in.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Radians per degree
pub const DEG: f64 = std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SPoint {
    pub lon: f64,
    pub lat: f64,
}

impl SPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn from_degrees(lon: f64, lat: f64) -> Self {
        Self::new(lon * DEG, lat * DEG)
    }

    /// Longitude and latitude back in degrees
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon / DEG, self.lat / DEG)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SCircle {
    pub center: SPoint,
    pub radius: f64,
}

/// Spherical polygon; the edge from the last vertex back to the first is implied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SPoly {
    pub vertices: Vec<SPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(SPoint),
    Circle(SCircle),
    Polygon(SPoly),
}

impl Geometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "point",
            Geometry::Circle(_) => "circle",
            Geometry::Polygon(_) => "polygon",
        }
    }
}

// ============ pgSphere literals ============

impl Display for SPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lon, self.lat)
    }
}

impl Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Point(p) => write!(f, "'{}'::spoint", p),
            Geometry::Circle(c) => write!(f, "'<{}, {}>'::scircle", c.center, c.radius),
            Geometry::Polygon(poly) => {
                write!(f, "'{{")?;
                for (i, vertex) in poly.vertices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", vertex)?;
                }
                write!(f, "}}'::spoly")
            }
        }
    }
}
