//! Reference frame names
//!
//! Maps the frame spellings found in ADQL geometry literals, STC-S and TAP
//! service metadata onto a closed set of frames.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::{DialectError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frame {
    Icrs,
    Fk4,
    Fk5,
    Galactic,
    Ecliptic,
    /// Positions that can be moved to any frame (e.g. planetary surfaces)
    Relocatable,
    /// No frame declared
    Unknown,
    /// A frame was declared but could not be understood
    Broken,
}

/// Frames a TAP service may declare
const TAP_SYSTEMS: &[(&str, Frame)] = &[
    ("ICRS", Frame::Icrs),
    ("FK4", Frame::Fk4),
    ("FK5", Frame::Fk5),
    ("GALACTIC", Frame::Galactic),
    ("ECLIPTIC", Frame::Ecliptic),
    ("RELOCATABLE", Frame::Relocatable),
];

impl Frame {
    /// Parse a frame name
    ///
    /// Only the first word counts, so `ICRS GEOCENTER` is ICRS. An empty name
    /// is `Unknown`; anything unrecognized is an error.
    pub fn from_name(name: &str) -> Result<Frame> {
        let word = name.split_whitespace().next().unwrap_or("");
        let frame = match word.to_ascii_uppercase().as_str() {
            "ICRS" => Frame::Icrs,
            "FK4" | "B1950" => Frame::Fk4,
            "FK5" | "J2000" => Frame::Fk5,
            "GALACTIC" | "GALACTIC_II" => Frame::Galactic,
            "ECLIPTIC" => Frame::Ecliptic,
            "RELOCATABLE" => Frame::Relocatable,
            "" | "UNKNOWN" | "UNKNOWNFRAME" => Frame::Unknown,
            "BROKEN" => Frame::Broken,
            _ => {
                return Err(DialectError::UnknownFrame {
                    frame: name.to_string(),
                });
            }
        };
        Ok(frame)
    }

    pub fn name(self) -> &'static str {
        match self {
            Frame::Icrs => "ICRS",
            Frame::Fk4 => "FK4",
            Frame::Fk5 => "FK5",
            Frame::Galactic => "GALACTIC",
            Frame::Ecliptic => "ECLIPTIC",
            Frame::Relocatable => "RELOCATABLE",
            Frame::Unknown => "UNKNOWNFrame",
            Frame::Broken => "BROKEN",
        }
    }

    /// Frames that never need a rotation against anything
    pub fn is_universal(self) -> bool {
        matches!(self, Frame::Relocatable | Frame::Unknown | Frame::Broken)
    }

    /// The name to declare in TAP metadata; empty for an undeclared frame
    pub fn tap_name(self) -> &'static str {
        match self {
            Frame::Unknown => "",
            Frame::Broken => "BROKEN",
            other => other.name(),
        }
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Validate a TAP coordinate system name against the allow-list
///
/// Empty and unknown markers normalize to [`Frame::Unknown`], everything not on
/// the list to [`Frame::Broken`].
pub fn tap_system_to_frame(name: &str) -> Frame {
    let name = name.trim();
    if name.is_empty()
        || name.eq_ignore_ascii_case("UNKNOWN")
        || name.eq_ignore_ascii_case("UNKNOWNFrame")
    {
        return Frame::Unknown;
    }
    TAP_SYSTEMS
        .iter()
        .find(|(tap_name, _)| tap_name.eq_ignore_ascii_case(name))
        .map(|(_, frame)| *frame)
        .unwrap_or_else(|| {
            log::debug!("unrecognized TAP system '{}'", name);
            Frame::Broken
        })
}
