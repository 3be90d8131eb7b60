use crate::error::ProbeError;
use crate::feature::Approach;
use crate::host::{Confirm, ProgramExecutor};
use crate::params::ProbeParams;
use crate::position::{Axis, AxisMask, Position};
use crate::session::SessionState;

#[derive(Clone, PartialEq, Debug)]
pub enum ProgramStep {
    Directive(String),
    RapidTo { position: Position, axes: AxisMask },
    Probe { axes: AxisMask, negative: bool },
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct ProbeProgram {
    pub steps: Vec<ProgramStep>,
}

impl ProbeProgram {
    fn directive(&mut self, text: String) {
        self.steps.push(ProgramStep::Directive(text));
    }

    fn rapid_to(&mut self, position: &Position, axes: AxisMask) {
        self.steps.push(ProgramStep::RapidTo { position: *position, axes });
    }

    fn probe(&mut self, axes: AxisMask, negative: bool) {
        self.steps.push(ProgramStep::Probe { axes, negative });
    }

    pub fn probe_count(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s, ProgramStep::Probe { .. })).count()
    }

    pub fn load_into<E: ProgramExecutor + ?Sized>(&self, executor: &mut E) {
        for step in &self.steps {
            match step {
                ProgramStep::Directive(text) => executor.add_directive(text),
                ProgramStep::RapidTo { position, axes } => executor.add_rapid_to_machine_position(position, *axes),
                ProgramStep::Probe { axes, negative } => executor.add_probing_action(*axes, *negative),
            }
        }
    }
}

pub fn plan(
    session: &SessionState,
    params: &ProbeParams,
    preview: bool,
    confirm: &mut dyn Confirm,
) -> Result<ProbeProgram, ProbeError> {
    let approach = session.feature().approach().ok_or(ProbeError::NoFeature)?;
    let start = if preview { Position::default() } else { params.start_position };

    let mut program = ProbeProgram::default();
    program.directive(format!("G91F{}", params.probe_feed_rate));

    match approach {
        Approach::Corner { .. } => plan_corner(&mut program, session, &start, params, confirm)?,
        Approach::Edge { axis, .. } => plan_edge(&mut program, session, &start, params, axis),
        Approach::Top => program.probe(AxisMask::Z, true),
    }
    Ok(program)
}

// X is probed first while parked at the Y offset, so the Y probe starts from
// an X position already known to be clear of the corner.
fn plan_corner(
    program: &mut ProbeProgram,
    session: &SessionState,
    start: &Position,
    params: &ProbeParams,
    confirm: &mut dyn Confirm,
) -> Result<(), ProbeError> {
    let sx = session.direction(Axis::X);
    let sy = session.direction(Axis::Y);

    let clearance = params.xy_clearance.min(params.offset);
    if clearance < params.xy_clearance {
        console_log!("XY clearance {} clamped to offset {}", params.xy_clearance, params.offset);
        if !confirm.confirm_clamped_clearance(params.xy_clearance, params.offset) {
            return Err(ProbeError::ClearanceDeclined {
                clearance: params.xy_clearance,
                offset: params.offset,
            });
        }
    }

    let mut rapid_to = *start;
    rapid_to.values[Axis::X.index()] -= clearance * sx;
    rapid_to.values[Axis::Y.index()] -= params.offset * sy;
    rapid_to.values[Axis::Z.index()] -= params.depth;

    program.rapid_to(&rapid_to, AxisMask::XY);
    program.rapid_to(&rapid_to, AxisMask::Z);
    program.probe(AxisMask::X, sx < 0.0);
    program.rapid_to(&rapid_to, AxisMask::X);

    rapid_to.set(Axis::X, start.x() - params.offset * sx);
    rapid_to.set(Axis::Y, start.y() - clearance * sy);
    program.rapid_to(&rapid_to, AxisMask::XY);
    program.probe(AxisMask::Y, sy < 0.0);
    program.rapid_to(&rapid_to, AxisMask::Y);
    program.rapid_to(start, AxisMask::Z);

    Ok(())
}

// Edges use the configured clearance as-is; only corners clamp it to the offset.
fn plan_edge(program: &mut ProbeProgram, session: &SessionState, start: &Position, params: &ProbeParams, axis: Axis) {
    let s = session.direction(axis);
    let mask = AxisMask::of(axis);

    let mut rapid_to = *start;
    rapid_to.set(axis, start.get(axis) - params.xy_clearance * s);
    rapid_to.values[Axis::Z.index()] -= params.depth;

    program.rapid_to(&rapid_to, mask);
    program.rapid_to(&rapid_to, AxisMask::Z);
    program.probe(mask, s < 0.0);
    program.rapid_to(&rapid_to, mask);
    program.rapid_to(start, AxisMask::Z);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;
    use crate::host::ClearancePolicy;
    use crate::session::CancelToken;

    fn session(feature: Feature) -> SessionState {
        SessionState::new(feature, CancelToken::new()).expect("feature")
    }

    fn params_at(start: Position) -> ProbeParams {
        ProbeParams {
            start_position: start,
            xy_clearance: 5.0,
            offset: 3.0,
            depth: 10.0,
            probe_diameter: 6.0,
            ..ProbeParams::default()
        }
    }

    fn rapids(program: &ProbeProgram) -> Vec<(Position, AxisMask)> {
        program
            .steps
            .iter()
            .filter_map(|s| match s {
                ProgramStep::RapidTo { position, axes } => Some((*position, *axes)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn every_feature_starts_with_feed_directive_and_ends_at_start_z() {
        let start = Position::new(100.0, 100.0, 50.0);
        for feature in [
            Feature::CornerA, Feature::CornerB, Feature::CornerC, Feature::CornerD,
            Feature::EdgeAD, Feature::EdgeAB, Feature::EdgeCB, Feature::EdgeCD,
        ] {
            let program = plan(&session(feature), &params_at(start), false, &mut ClearancePolicy::Accept)
                .expect("plan");
            assert_eq!(program.steps[0], ProgramStep::Directive("G91F100".to_string()));
            assert!(matches!(program.steps[1], ProgramStep::RapidTo { .. }), "{:?}", feature);
            let last = program.steps.last().cloned();
            assert_eq!(last, Some(ProgramStep::RapidTo { position: start, axes: AxisMask::Z }), "{:?}", feature);
        }
    }

    #[test]
    fn top_is_a_single_downward_probe() {
        let program = plan(&session(Feature::Top), &params_at(Position::default()), false, &mut ClearancePolicy::Accept)
            .expect("plan");
        assert_eq!(program.steps.len(), 2);
        assert_eq!(program.steps[1], ProgramStep::Probe { axes: AxisMask::Z, negative: true });
    }

    #[test]
    fn corner_c_clamps_clearance_to_offset() {
        let program = plan(
            &session(Feature::CornerC),
            &params_at(Position::new(100.0, 100.0, 50.0)),
            false,
            &mut ClearancePolicy::Accept,
        )
        .expect("plan");

        let r = rapids(&program);
        assert_eq!(r[0], (Position::new(97.0, 97.0, 40.0), AxisMask::XY));
        assert_eq!(r[1].1, AxisMask::Z);
        assert_eq!(r[2], (Position::new(97.0, 97.0, 40.0), AxisMask::X));
        assert_eq!(r[3], (Position::new(97.0, 97.0, 40.0), AxisMask::XY));
        assert_eq!(program.steps[3], ProgramStep::Probe { axes: AxisMask::X, negative: false });
        assert_eq!(program.probe_count(), 2);
    }

    #[test]
    fn declined_clamp_rejects_without_program() {
        let mut asked = 0;
        let mut confirm = |clearance: f64, offset: f64| {
            asked += 1;
            assert_eq!((clearance, offset), (5.0, 3.0));
            false
        };
        let result = plan(&session(Feature::CornerA), &params_at(Position::default()), false, &mut confirm);
        assert_eq!(result, Err(ProbeError::ClearanceDeclined { clearance: 5.0, offset: 3.0 }));
        assert_eq!(asked, 1);
    }

    #[test]
    fn no_prompt_when_clearance_fits() {
        let params = ProbeParams { xy_clearance: 2.0, ..params_at(Position::default()) };
        let result = plan(&session(Feature::CornerB), &params, false, &mut ClearancePolicy::Decline);
        assert!(result.is_ok());
    }

    #[test]
    fn edges_do_not_clamp_clearance() {
        let params = params_at(Position::new(10.0, 20.0, 30.0));
        let program = plan(&session(Feature::EdgeAD), &params, false, &mut ClearancePolicy::Decline).expect("plan");
        let r = rapids(&program);
        assert_eq!(r[0], (Position::new(15.0, 20.0, 20.0), AxisMask::X));
        assert_eq!(r[2], (Position::new(15.0, 20.0, 20.0), AxisMask::X));
        assert_eq!(program.steps[3], ProgramStep::Probe { axes: AxisMask::X, negative: true });
    }

    #[test]
    fn corner_a_mirrors_corner_c() {
        let start = Position::new(12.0, -7.0, 50.0);
        let mirrored = Position::new(-12.0, 7.0, 50.0);
        let a = plan(&session(Feature::CornerA), &params_at(start), false, &mut ClearancePolicy::Accept).expect("a");
        let c = plan(&session(Feature::CornerC), &params_at(mirrored), false, &mut ClearancePolicy::Accept).expect("c");

        assert_eq!(a.steps.len(), c.steps.len());
        for (sa, sc) in a.steps.iter().zip(&c.steps) {
            match (sa, sc) {
                (ProgramStep::RapidTo { position: pa, axes: ma }, ProgramStep::RapidTo { position: pc, axes: mc }) => {
                    assert_eq!(ma, mc);
                    assert_eq!(pa.x(), -pc.x());
                    assert_eq!(pa.y(), -pc.y());
                    assert_eq!(pa.z(), pc.z());
                }
                (ProgramStep::Probe { axes: ma, negative: na }, ProgramStep::Probe { axes: mc, negative: nc }) => {
                    assert_eq!(ma, mc);
                    assert_eq!(*na, !*nc);
                }
                (da, dc) => assert_eq!(da, dc),
            }
        }
    }

    #[test]
    fn preview_plans_around_origin() {
        let params = params_at(Position::new(100.0, 100.0, 50.0));
        let program = plan(&session(Feature::EdgeCB), &params, true, &mut ClearancePolicy::Accept).expect("plan");
        let r = rapids(&program);
        assert_eq!(r[0], (Position::new(-5.0, 0.0, -10.0), AxisMask::X));
        assert_eq!(r.last(), Some(&(Position::default(), AxisMask::Z)));
    }
}
