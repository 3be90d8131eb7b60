use crate::error::{RunFailure, COMPLETED_MESSAGE};
use crate::commit::RELOAD_PARSER_STATE;
use crate::host::{Controller, ProgramExecutor};
use crate::params::ProbeParams;
use crate::position::{Axis, AxisMask, Position};
use crate::session::SessionState;

pub fn complete<H>(
    host: &mut H,
    session: &SessionState,
    params: &ProbeParams,
    executed: bool,
) -> Result<Position, RunFailure>
where
    H: ProgramExecutor + Controller,
{
    let result = run_stages(host, session, params, executed);

    if result == Err(RunFailure::PositionLost) {
        host.set_job_running(false);
        host.end(&RunFailure::PositionLost.to_string());
        return result;
    }

    if !host.is_parser_state_live() && params.coordinate_mode.strategy().needs_parser_reload() {
        host.execute_command(RELOAD_PARSER_STATE);
    }
    host.set_job_running(false);

    let message = match &result {
        Ok(_) => COMPLETED_MESSAGE.to_string(),
        Err(failure) => failure.to_string(),
    };
    console_log!("{}", message);
    host.end(&message);
    result
}

fn run_stages<H>(host: &mut H, session: &SessionState, params: &ProbeParams, executed: bool) -> Result<Position, RunFailure>
where
    H: ProgramExecutor + Controller,
{
    validate(host.samples(), session, executed)?;

    let mut position = compose_position(session, params, host.samples())?;
    let mut axes = session.axes();

    if params.probe_z && !session.feature().is_z_only() {
        refine_z(host, session, params, &mut position)?;
    }

    checkpoint(session)?;
    require(host.goto_machine_position(&position, axes), session, "reposition")?;

    if params.probe_z {
        axes |= AxisMask::Z;
    }

    checkpoint(session)?;
    let strategy = params.coordinate_mode.strategy();
    console_log!("Committing {:?} on {:?}", strategy.mode(), axes);
    strategy.commit(host, session, params, &mut position, axes)?;
    Ok(position)
}

fn validate(samples: &[Position], session: &SessionState, executed: bool) -> Result<(), RunFailure> {
    if executed && !samples.is_empty() {
        return Ok(());
    }
    console_log!("Probe program failed: executed={}, samples={}", executed, samples.len());
    if session.is_cancelled() {
        Err(RunFailure::Cancelled)
    } else {
        Err(RunFailure::Failed)
    }
}

// Start position with each probed axis replaced by its sample, shifted by
// the tip radius toward the feature on X/Y. Samples are consumed in X, Y, Z
// order, one per probed axis.
pub fn compose_position(session: &SessionState, params: &ProbeParams, samples: &[Position]) -> Result<Position, RunFailure> {
    let axes = session.axes();
    if samples.len() < axes.count() {
        console_log!("Expected {} samples, got {}", axes.count(), samples.len());
        return Err(RunFailure::Failed);
    }

    let mut position = params.start_position;
    for (axis, sample) in axes.axes().zip(samples) {
        let compensation = match axis {
            Axis::Z => 0.0,
            _ => params.tip_radius() * session.direction(axis),
        };
        position.set(axis, sample.get(axis) + compensation);
    }

    if position.is_unknown_in(axes | AxisMask::Z) {
        console_log!("Probe reported no contact: {}", position);
        return Err(RunFailure::PositionLost);
    }
    Ok(position)
}

// Fast touch, back off by the latch distance, drop the fast sample and
// take the slow touch as the Z reading.
fn refine_z<H>(host: &mut H, session: &SessionState, params: &ProbeParams, position: &mut Position) -> Result<(), RunFailure>
where
    H: ProgramExecutor + Controller,
{
    let radius = params.tip_radius();
    let mut target = *position;
    target.values[Axis::X.index()] += radius * session.direction(Axis::X);
    target.values[Axis::Y.index()] += radius * session.direction(Axis::Y);

    checkpoint(session)?;
    require(host.goto_machine_position(&target, session.axes()), session, "refine: move over surface")?;

    checkpoint(session)?;
    let fast = format!("{}Z-{}", params.fast_probe, params.depth);
    require(host.wait_for_response(&fast), session, "refine: fast probe")?;

    checkpoint(session)?;
    let latch = format!("{}Z{}", params.rapid_command, params.latch_distance);
    require(host.wait_for_response(&latch), session, "refine: latch back")?;

    checkpoint(session)?;
    require(host.remove_last_position(), session, "refine: discard fast sample")?;

    checkpoint(session)?;
    let slow = format!("{}Z-{}", params.slow_probe, params.depth);
    require(host.wait_for_response(&slow), session, "refine: slow probe")?;

    let z = host.probe_position().z();
    if z.is_nan() {
        return Err(RunFailure::PositionLost);
    }
    position.set(Axis::Z, z);

    checkpoint(session)?;
    require(
        host.goto_machine_position(&params.start_position, AxisMask::Z),
        session,
        "refine: retract",
    )
}

fn checkpoint(session: &SessionState) -> Result<(), RunFailure> {
    if session.is_cancelled() {
        Err(RunFailure::Cancelled)
    } else {
        Ok(())
    }
}

fn require(ok: bool, session: &SessionState, stage: &str) -> Result<(), RunFailure> {
    if ok {
        return Ok(());
    }
    console_log!("Stage failed: {}", stage);
    checkpoint(session)?;
    Err(RunFailure::Failed)
}
