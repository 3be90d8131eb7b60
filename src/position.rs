use serde::{Serialize, Deserialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

pub const X_AXIS: usize = 0;
pub const Y_AXIS: usize = 1;
pub const Z_AXIS: usize = 2;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Axis { X, Y, Z }

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => X_AXIS,
            Axis::Y => Y_AXIS,
            Axis::Z => Z_AXIS,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct AxisMask(u8);

impl AxisMask {
    pub const NONE: AxisMask = AxisMask(0);
    pub const X: AxisMask = AxisMask(1);
    pub const Y: AxisMask = AxisMask(1 << 1);
    pub const Z: AxisMask = AxisMask(1 << 2);
    pub const XY: AxisMask = AxisMask(0b011);
    pub const XYZ: AxisMask = AxisMask(0b111);

    pub fn of(axis: Axis) -> Self {
        AxisMask(1 << axis.index())
    }

    pub fn contains(self, axis: Axis) -> bool {
        self.0 & (1 << axis.index()) != 0
    }

    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn axes(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |a| self.contains(*a))
    }

    pub fn indices(self) -> impl Iterator<Item = usize> {
        self.axes().map(Axis::index)
    }
}

impl BitOr for AxisMask {
    type Output = AxisMask;
    fn bitor(self, rhs: AxisMask) -> AxisMask {
        AxisMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for AxisMask {
    fn bitor_assign(&mut self, rhs: AxisMask) {
        self.0 |= rhs.0;
    }
}

impl From<Axis> for AxisMask {
    fn from(axis: Axis) -> Self {
        AxisMask::of(axis)
    }
}

// Machine coordinates. NaN on an axis means the controller never reported it
// (e.g. a probe move that ended without contact).
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug, Default)]
pub struct Position {
    pub values: [f64; 3],
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { values: [x, y, z] }
    }

    pub fn unknown() -> Self {
        Self { values: [f64::NAN; 3] }
    }

    pub fn x(&self) -> f64 { self.values[X_AXIS] }
    pub fn y(&self) -> f64 { self.values[Y_AXIS] }
    pub fn z(&self) -> f64 { self.values[Z_AXIS] }

    pub fn get(&self, axis: Axis) -> f64 {
        self.values[axis.index()]
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        self.values[axis.index()] = value;
    }

    pub fn with_masked(&self, other: &Position, mask: AxisMask) -> Position {
        let mut out = *self;
        for i in mask.indices() {
            out.values[i] = other.values[i];
        }
        out
    }

    pub fn is_unknown_in(&self, mask: AxisMask) -> bool {
        mask.indices().any(|i| self.values[i].is_nan())
    }

    pub fn to_gcode(&self, mask: AxisMask) -> String {
        let mut out = String::new();
        for axis in mask.axes() {
            out.push(axis.letter());
            out.push_str(&format_coord(self.get(axis)));
        }
        out
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_gcode(AxisMask::XYZ))
    }
}

pub fn format_coord(value: f64) -> String {
    format!("{:.3}", value)
}
