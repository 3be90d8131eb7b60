use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::feature::{Approach, Feature};
use crate::position::{Axis, AxisMask};

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// Per-run context. Axis mask and direction signs are fixed by the feature
// before the first waypoint is emitted and never change afterwards.
#[derive(Debug)]
pub struct SessionState {
    cancel: CancelToken,
    feature: Feature,
    axes: AxisMask,
    direction: [f64; 3],
}

impl SessionState {
    pub fn new(feature: Feature, cancel: CancelToken) -> Option<Self> {
        let approach = feature.approach()?;
        let mut direction = [0.0; 3];
        let axes = match approach {
            Approach::Corner { neg_x, neg_y } => {
                direction[Axis::X.index()] = sign(neg_x);
                direction[Axis::Y.index()] = sign(neg_y);
                AxisMask::XY
            }
            Approach::Edge { axis, negative } => {
                direction[axis.index()] = sign(negative);
                AxisMask::of(axis)
            }
            Approach::Top => {
                direction[Axis::Z.index()] = 1.0;
                AxisMask::Z
            }
        };
        cancel.reset();
        Some(Self { cancel, feature, axes, direction })
    }

    pub fn feature(&self) -> Feature {
        self.feature
    }

    pub fn axes(&self) -> AxisMask {
        self.axes
    }

    pub fn direction(&self, axis: Axis) -> f64 {
        self.direction[axis.index()]
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

fn sign(negative: bool) -> f64 {
    if negative { -1.0 } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_signs_and_mask() {
        let s = SessionState::new(Feature::CornerB, CancelToken::new()).expect("corner");
        assert_eq!(s.axes(), AxisMask::XY);
        assert_eq!(s.direction(Axis::X), 1.0);
        assert_eq!(s.direction(Axis::Y), -1.0);
        assert_eq!(s.direction(Axis::Z), 0.0);
    }

    #[test]
    fn edge_only_signs_its_axis() {
        let s = SessionState::new(Feature::EdgeCD, CancelToken::new()).expect("edge");
        assert_eq!(s.axes(), AxisMask::Y);
        assert_eq!(s.direction(Axis::X), 0.0);
        assert_eq!(s.direction(Axis::Y), 1.0);
    }

    #[test]
    fn new_session_rearms_token_and_rejects_none() {
        let token = CancelToken::new();
        token.cancel();
        let s = SessionState::new(Feature::Top, token.clone()).expect("top");
        assert!(!s.is_cancelled());
        token.cancel();
        assert!(s.is_cancelled());
        assert!(SessionState::new(Feature::None, token).is_none());
    }
}
