//! Reference frame rotations as SQL fragments
//!
//! Rotations are pgSphere `strans` Euler transforms appended to a geometry
//! expression. Every frame is related to ICRS; rotations between two
//! non-canonical frames go through ICRS.

use std::sync::LazyLock;

use indexmap::IndexMap;

use crate::error::{DialectError, Result};
use crate::frames::Frame;

/// The frame all rotations are expressed against
pub const CANONICAL: Frame = Frame::Icrs;

/// ZXZ Euler angles in radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    pub phi: f64,
    pub theta: f64,
    pub psi: f64,
}

impl EulerAngles {
    fn degrees(phi: f64, theta: f64, psi: f64) -> Self {
        Self {
            phi: phi.to_radians(),
            theta: theta.to_radians(),
            psi: psi.to_radians(),
        }
    }
}

/// Euler angles of each frame against ICRS; `None` means no rotation
///
/// FK4 is absent: B1950 positions need E-term removal, not just a rotation.
static TRANSFORMS: LazyLock<IndexMap<Frame, Option<EulerAngles>>> = LazyLock::new(|| {
    IndexMap::from([
        (Frame::Icrs, None),
        (Frame::Fk5, None),
        (
            Frame::Galactic,
            Some(EulerAngles::degrees(282.85948, 62.87175, 32.93192)),
        ),
        (
            Frame::Ecliptic,
            Some(EulerAngles::degrees(0.0, 23.4392911, 0.0)),
        ),
    ])
});

/// Euler angles of `frame` against ICRS
pub fn frame_angles(frame: Frame) -> Result<Option<EulerAngles>> {
    TRANSFORMS
        .get(&frame)
        .copied()
        .ok_or_else(|| DialectError::UnknownFrame {
            frame: frame.name().to_string(),
        })
}

/// SQL fragment rotating a geometry from `from` into `to`
///
/// `None` when no rotation applies: equal frames, a universal frame on either
/// side, or frames without angles.
pub fn rotation(from: &str, to: &str) -> Result<Option<String>> {
    rotate(Frame::from_name(from)?, Frame::from_name(to)?)
}

fn rotate(from: Frame, to: Frame) -> Result<Option<String>> {
    if from.is_universal() || to.is_universal() || from == to {
        return Ok(None);
    }

    if from == CANONICAL {
        // NOTE: looks up the origin frame, which is ICRS here and has no
        // angles, so rotations out of ICRS come back empty. Open question in
        // DESIGN.md.
        return Ok(frame_angles(from)?.map(|angles| strans('+', angles)));
    }
    if to == CANONICAL {
        return Ok(frame_angles(from)?.map(|angles| strans('-', angles)));
    }

    let first = rotate(from, CANONICAL)?;
    let second = rotate(CANONICAL, to)?;
    Ok(match (first, second) {
        (None, None) => None,
        (first, second) => Some(first.unwrap_or_default() + &second.unwrap_or_default()),
    })
}

fn strans(sign: char, angles: EulerAngles) -> String {
    format!(
        " {} strans({}, {}, {})",
        sign, angles.phi, angles.theta, angles.psi
    )
}

/// Rotate `sql` from one frame into another, if needed
pub fn conform(sql: &str, from: &str, to: &str) -> Result<String> {
    Ok(match rotation(from, to)? {
        Some(fragment) => format!("({}{})", sql, fragment),
        None => sql.to_string(),
    })
}
