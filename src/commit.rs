use crate::error::RunFailure;
use crate::host::Controller;
use crate::params::{CoordinateMode, ProbeParams};
use crate::position::{Axis, AxisMask, Position};
use crate::session::SessionState;

pub const RELOAD_PARSER_STATE: &str = "$G";

pub trait CommitStrategy {
    fn mode(&self) -> CoordinateMode;

    fn commit(
        &self,
        controller: &mut dyn Controller,
        session: &SessionState,
        params: &ProbeParams,
        position: &mut Position,
        axes: AxisMask,
    ) -> Result<(), RunFailure>;

    fn needs_parser_reload(&self) -> bool {
        false
    }
}

impl CoordinateMode {
    pub fn strategy(self) -> &'static dyn CommitStrategy {
        match self {
            CoordinateMode::ZeroOffset => &ZeroOffset,
            CoordinateMode::OffsetTable => &OffsetTable,
        }
    }
}

pub struct ZeroOffset;

impl CommitStrategy for ZeroOffset {
    fn mode(&self) -> CoordinateMode {
        CoordinateMode::ZeroOffset
    }

    fn commit(
        &self,
        controller: &mut dyn Controller,
        session: &SessionState,
        params: &ProbeParams,
        position: &mut Position,
        axes: AxisMask,
    ) -> Result<(), RunFailure> {
        if session.is_cancelled() {
            return Err(RunFailure::Cancelled);
        }
        if !controller.goto_machine_position(position, AxisMask::Z) {
            return Err(RunFailure::Failed);
        }

        position.set(Axis::X, 0.0);
        position.set(Axis::Y, 0.0);
        position.set(Axis::Z, params.workpiece_height + params.touch_plate_height);

        let command = format!("G92{}", position.to_gcode(axes));
        console_log!("Commit: {}", command);
        controller.execute_command(&command);

        if !session.is_cancelled() && axes.contains(Axis::Z) {
            // Retreat is best effort, the origin is already set.
            controller.goto_machine_position(&params.start_position, AxisMask::Z);
        }
        Ok(())
    }

    fn needs_parser_reload(&self) -> bool {
        true
    }
}

pub struct OffsetTable;

impl CommitStrategy for OffsetTable {
    fn mode(&self) -> CoordinateMode {
        CoordinateMode::OffsetTable
    }

    fn commit(
        &self,
        controller: &mut dyn Controller,
        session: &SessionState,
        params: &ProbeParams,
        position: &mut Position,
        axes: AxisMask,
    ) -> Result<(), RunFailure> {
        if session.is_cancelled() {
            return Err(RunFailure::Cancelled);
        }

        let z = position.z() - (params.workpiece_height + params.touch_plate_height + controller.tool_offset_z());
        position.set(Axis::Z, z);

        let command = format!("G10L2P{}{}", params.coordinate_system, position.to_gcode(axes));
        console_log!("Commit: {}", command);
        controller.execute_command(&command);
        Ok(())
    }
}
