//! STC-S region literals
//!
//! Used when geometry values are ingested (table uploads). Two levels:
//!
//! - literal: `<shape> [frame] [refpos] [flavor] <coords...>`, matched by a
//!   single regular expression
//! - algebra: `NOT(region)`, `UNION [frame] (region region...)`,
//!   `INTERSECTION [frame] (region region...)`, parsed recursively
//!
//! Literals become concrete [`Geometry`] values. Algebra becomes an
//! [`StcsRegion`] placeholder that a later pass has to resolve; rendering it
//! as SQL is an error.
//!
//! Literal frames are dropped: ingestion never needs frame-aware SQL.

use std::fmt::{self, Display};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use winnow::ascii::{Caseless, multispace0, multispace1};
use winnow::combinator::{alt, delimited, opt, preceded, repeat};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::ast::{Expr, Fragment};
use crate::geom::{Geometry, SCircle, SPoint, SPoly};

type PResult<T> = winnow::ModalResult<T>;

/// Any failure while reading an STC-S literal
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid STC-S '{literal}': {message}")]
pub struct StcsError {
    /// The offending text
    pub literal: String,
    pub message: String,
}

impl StcsError {
    fn new(literal: &str, message: impl Into<String>) -> Self {
        Self {
            literal: literal.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionOp {
    Not,
    Union,
    Intersection,
}

/// Region algebra left for a later pass to resolve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StcsRegion {
    pub op: RegionOp,
    /// Frame declared on `UNION`/`INTERSECTION`
    pub frame: Option<String>,
    pub operands: Vec<StcsValue>,
}

/// Result of parsing an STC-S literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StcsValue {
    Concrete(Geometry),
    UnresolvedRegion(StcsRegion),
}

impl From<StcsValue> for Expr {
    fn from(value: StcsValue) -> Self {
        match value {
            StcsValue::Concrete(geometry) => Expr::Sql(Fragment {
                text: geometry.to_string(),
                coord_system: None,
                predicate: false,
            }),
            StcsValue::UnresolvedRegion(region) => Expr::Region(region),
        }
    }
}

// ============ Frames, reference positions, flavors ============

const FRAMES: &[&str] = &[
    "ICRS",
    "FK4",
    "FK5",
    "J2000",
    "B1950",
    "ECLIPTIC",
    "GALACTIC",
    "GALACTIC_I",
    "GALACTIC_II",
    "SUPER_GALACTIC",
    "GEO_C",
    "GEO_D",
    "MAG",
    "GSE",
    "GSM",
    "SM",
    "HGC",
    "HGS",
    "HEEQ",
    "HRTN",
    "HPC",
    "HPR",
    "MERCURY_C",
    "VENUS_C",
    "LUNA_C",
    "MARS_C",
    "JUPITER_C_III",
    "SATURN_C_III",
    "URANUS_C_III",
    "NEPTUNE_C_III",
    "PLUTO_C",
    "UNKNOWNFrame",
];

const REFPOSES: &[&str] = &[
    "GEOCENTER",
    "BARYCENTER",
    "HELIOCENTER",
    "TOPOCENTER",
    "GALACTIC_CENTER",
    "EMBARYCENTER",
    "MOON",
    "MERCURY",
    "VENUS",
    "MARS",
    "JUPITER",
    "SATURN",
    "URANUS",
    "NEPTUNE",
    "PLUTO",
    "LSR",
    "LSRK",
    "LSRD",
    "RELOCATABLE",
    "UNKNOWNRefPos",
];

const FLAVORS: &[&str] = &[
    "SPHERICAL2",
    "SPHERICAL3",
    "CARTESIAN1",
    "CARTESIAN2",
    "CARTESIAN3",
    "UNITSPHERE",
];

const SUPPORTED_FLAVOR: &str = "SPHERICAL2";

/// Alternation of `words`, longest first so no name shadows a longer one
fn alternation(words: &[&str]) -> String {
    let mut sorted = words.to_vec();
    sorted.sort_by_key(|w| std::cmp::Reverse(w.len()));
    sorted
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

fn literal_regex() -> &'static Regex {
    static LITERAL: OnceLock<Regex> = OnceLock::new();
    LITERAL.get_or_init(|| {
        let float = r"[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?";
        let pattern = format!(
            r"(?i)^\s*(?P<shape>position|circle|box|polygon)(?:\s+(?P<frame>{}))?(?:\s+(?P<refpos>{}))?(?:\s+(?P<flavor>{}))?(?P<coos>(?:\s+{})+)",
            alternation(FRAMES),
            alternation(REFPOSES),
            alternation(FLAVORS),
            float,
        );
        Regex::new(&pattern).expect("STC-S literal pattern is valid")
    })
}

// ============ Parsing ============

/// Syntax tree before values are built
#[derive(Debug)]
enum RawRegion<'a> {
    Literal(&'a str),
    Not(Box<RawRegion<'a>>),
    Op {
        op: RegionOp,
        frame: Option<&'a str>,
        flavor: Option<&'a str>,
        operands: Vec<RawRegion<'a>>,
    },
}

/// Deepest `(` nesting accepted; the grammar recurses once per level
const MAX_NESTING: usize = 64;

fn nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

/// Parse an STC-S region literal
pub fn parse_stcs(text: &str) -> Result<StcsValue, StcsError> {
    let input = text.trim();
    if nesting_depth(input) > MAX_NESTING {
        return Err(StcsError::new(
            text,
            format!("regions nest deeper than {} levels", MAX_NESTING),
        ));
    }
    let mut stream = input;
    let raw = match region.parse_next(&mut stream) {
        Ok(raw) => raw,
        Err(_) => {
            return Err(StcsError::new(
                text,
                format!("expected an STC-S region at '{}'", stream.trim()),
            ));
        }
    };
    if !stream.trim().is_empty() {
        return Err(StcsError::new(
            text,
            format!("unexpected trailing input '{}'", stream.trim()),
        ));
    }
    build(raw, text)
}

fn region<'a>(input: &mut &'a str) -> PResult<RawRegion<'a>> {
    preceded(multispace0, alt((not_region, algebra_region, literal))).parse_next(input)
}

fn not_region<'a>(input: &mut &'a str) -> PResult<RawRegion<'a>> {
    preceded(
        (Caseless("NOT"), multispace0),
        delimited('(', region, (multispace0, ')')),
    )
    .map(|inner| RawRegion::Not(Box::new(inner)))
    .parse_next(input)
}

fn algebra_region<'a>(input: &mut &'a str) -> PResult<RawRegion<'a>> {
    let op = alt((
        Caseless("UNION").value(RegionOp::Union),
        Caseless("INTERSECTION").value(RegionOp::Intersection),
    ))
    .parse_next(input)?;
    let frame = opt(preceded(multispace1, |i: &mut &'a str| word_from(FRAMES, i)))
        .parse_next(input)?;
    let _refpos = opt(preceded(multispace1, |i: &mut &'a str| word_from(REFPOSES, i)))
        .parse_next(input)?;
    let flavor = opt(preceded(multispace1, |i: &mut &'a str| word_from(FLAVORS, i)))
        .parse_next(input)?;
    let _ = multispace0.parse_next(input)?;
    let (first, rest): (RawRegion<'a>, Vec<RawRegion<'a>>) =
        delimited('(', (region, repeat(1.., region)), (multispace0, ')')).parse_next(input)?;

    let mut operands = vec![first];
    operands.extend(rest);
    Ok(RawRegion::Op {
        op,
        frame,
        flavor,
        operands,
    })
}

/// One word out of `words`, case-insensitive
fn word_from<'a>(words: &[&str], input: &mut &'a str) -> PResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_')
        .verify(|word: &str| words.iter().any(|w| w.eq_ignore_ascii_case(word)))
        .parse_next(input)
}

fn literal<'a>(input: &mut &'a str) -> PResult<RawRegion<'a>> {
    let source: &'a str = *input;
    let Some(found) = literal_regex().find(source) else {
        return Err(ErrMode::Backtrack(ContextError::new()));
    };
    let (text, rest) = source.split_at(found.end());
    *input = rest;
    Ok(RawRegion::Literal(text.trim()))
}

// ============ Building values ============

fn check_flavor(flavor: Option<&str>, text: &str) -> Result<(), StcsError> {
    match flavor {
        Some(flavor) if !flavor.eq_ignore_ascii_case(SUPPORTED_FLAVOR) => Err(StcsError::new(
            text,
            format!(
                "only {} coordinates are supported, not {}",
                SUPPORTED_FLAVOR, flavor
            ),
        )),
        _ => Ok(()),
    }
}

/// `source` is the whole input, reported for algebra-level errors
fn build(raw: RawRegion<'_>, source: &str) -> Result<StcsValue, StcsError> {
    match raw {
        RawRegion::Literal(text) => build_literal(text).map(StcsValue::Concrete),
        RawRegion::Not(inner) => Ok(StcsValue::UnresolvedRegion(StcsRegion {
            op: RegionOp::Not,
            frame: None,
            operands: vec![build(*inner, source)?],
        })),
        RawRegion::Op {
            op,
            frame,
            flavor,
            operands,
        } => {
            check_flavor(flavor, source)?;
            Ok(StcsValue::UnresolvedRegion(StcsRegion {
                op,
                frame: frame.map(str::to_owned),
                operands: operands
                    .into_iter()
                    .map(|operand| build(operand, source))
                    .collect::<Result<Vec<_>, _>>()?,
            }))
        }
    }
}

fn build_literal(text: &str) -> Result<Geometry, StcsError> {
    let caps = literal_regex()
        .captures(text)
        .ok_or_else(|| StcsError::new(text, "not an STC-S shape literal"))?;

    check_flavor(caps.name("flavor").map(|m| m.as_str()), text)?;

    let coos = caps
        .name("coos")
        .map(|m| m.as_str())
        .unwrap_or_default()
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| StcsError::new(text, format!("bad coordinate '{}'", token)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let shape = caps
        .name("shape")
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_default();
    let arity = |expected: &str| {
        StcsError::new(
            text,
            format!(
                "{} expects {} coordinates, got {}",
                shape,
                expected,
                coos.len()
            ),
        )
    };

    match shape.as_str() {
        "position" => match coos[..] {
            [x, y] => Ok(Geometry::Point(SPoint::from_degrees(x, y))),
            _ => Err(arity("2")),
        },
        "circle" => match coos[..] {
            [x, y, r] => Ok(Geometry::Circle(SCircle {
                center: SPoint::from_degrees(x, y),
                radius: r.to_radians(),
            })),
            _ => Err(arity("3")),
        },
        "box" => match coos[..] {
            [x, y, w, h] => {
                let (x0, x1) = (x - w / 2.0, x + w / 2.0);
                let (y0, y1) = (y - h / 2.0, y + h / 2.0);
                Ok(Geometry::Polygon(SPoly {
                    vertices: vec![
                        SPoint::from_degrees(x0, y0),
                        SPoint::from_degrees(x0, y1),
                        SPoint::from_degrees(x1, y1),
                        SPoint::from_degrees(x1, y0),
                    ],
                }))
            }
            _ => Err(arity("4")),
        },
        _ => {
            if coos.len() < 6 || coos.len() % 2 != 0 {
                return Err(arity("an even number (at least 6) of"));
            }
            Ok(Geometry::Polygon(SPoly {
                vertices: coos
                    .chunks(2)
                    .map(|pair| SPoint::from_degrees(pair[0], pair[1]))
                    .collect(),
            }))
        }
    }
}

// ============ Display ============

fn degrees(rad: f64) -> f64 {
    (rad.to_degrees() * 1e9).round() / 1e9
}

impl Display for StcsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StcsValue::Concrete(Geometry::Point(p)) => {
                write!(f, "Position {} {}", degrees(p.lon), degrees(p.lat))
            }
            StcsValue::Concrete(Geometry::Circle(c)) => write!(
                f,
                "Circle {} {} {}",
                degrees(c.center.lon),
                degrees(c.center.lat),
                degrees(c.radius)
            ),
            StcsValue::Concrete(Geometry::Polygon(poly)) => {
                write!(f, "Polygon")?;
                for v in &poly.vertices {
                    write!(f, " {} {}", degrees(v.lon), degrees(v.lat))?;
                }
                Ok(())
            }
            StcsValue::UnresolvedRegion(region) => write!(f, "{}", region),
        }
    }
}

impl Display for StcsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.op {
            RegionOp::Not => "NOT",
            RegionOp::Union => "UNION",
            RegionOp::Intersection => "INTERSECTION",
        };
        write!(f, "{}", name)?;
        if let Some(frame) = &self.frame {
            write!(f, " {}", frame)?;
        }
        write!(f, "(")?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", operand)?;
        }
        write!(f, ")")
    }
}
