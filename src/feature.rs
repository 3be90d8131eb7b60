// Corner layout, viewed from above. Edges are named by the two corners
// they connect.
//
//   D |-----| C
//     |  Z  |
//   A |-----| B

use serde::{Serialize, Deserialize};
use std::str::FromStr;

use crate::position::Axis;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Feature {
    #[default]
    None,
    CornerA,
    CornerB,
    CornerC,
    CornerD,
    Top,
    EdgeAD,
    EdgeAB,
    EdgeCB,
    EdgeCD,
}

// How a feature is approached. `negative` means the probe travels toward
// the negative end of the axis, which makes that axis' direction sign -1.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Approach {
    Corner { neg_x: bool, neg_y: bool },
    Edge { axis: Axis, negative: bool },
    Top,
}

impl Feature {
    pub fn approach(self) -> Option<Approach> {
        let approach = match self {
            Feature::None => return None,
            Feature::CornerA => Approach::Corner { neg_x: true, neg_y: true },
            Feature::CornerB => Approach::Corner { neg_x: false, neg_y: true },
            Feature::CornerC => Approach::Corner { neg_x: false, neg_y: false },
            Feature::CornerD => Approach::Corner { neg_x: true, neg_y: false },
            Feature::Top => Approach::Top,
            Feature::EdgeAD => Approach::Edge { axis: Axis::X, negative: true },
            Feature::EdgeAB => Approach::Edge { axis: Axis::Y, negative: true },
            Feature::EdgeCB => Approach::Edge { axis: Axis::X, negative: false },
            Feature::EdgeCD => Approach::Edge { axis: Axis::Y, negative: false },
        };
        Some(approach)
    }

    pub fn is_z_only(self) -> bool {
        self == Feature::Top
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feature '{0}'")]
pub struct UnknownFeature(pub String);

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let feature = match s.trim().to_ascii_uppercase().as_str() {
            "" | "NONE" => Feature::None,
            "A" => Feature::CornerA,
            "B" => Feature::CornerB,
            "C" => Feature::CornerC,
            "D" => Feature::CornerD,
            "Z" | "TOP" => Feature::Top,
            "AD" | "DA" => Feature::EdgeAD,
            "AB" | "BA" => Feature::EdgeAB,
            "CB" | "BC" => Feature::EdgeCB,
            "CD" | "DC" => Feature::EdgeCD,
            _ => return Err(UnknownFeature(s.to_string())),
        };
        Ok(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_face_opposite_quadrants() {
        assert_eq!(Feature::CornerA.approach(), Some(Approach::Corner { neg_x: true, neg_y: true }));
        assert_eq!(Feature::CornerC.approach(), Some(Approach::Corner { neg_x: false, neg_y: false }));
        assert_eq!(Feature::None.approach(), None);
    }

    #[test]
    fn parses_corner_and_edge_names() {
        assert_eq!("a".parse::<Feature>(), Ok(Feature::CornerA));
        assert_eq!("bc".parse::<Feature>(), Ok(Feature::EdgeCB));
        assert_eq!("Top".parse::<Feature>(), Ok(Feature::Top));
        assert!("Q".parse::<Feature>().is_err());
    }
}
