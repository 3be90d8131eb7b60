use std::sync::Arc;

use crate::position::{AxisMask, Position};

// Aborts the in-flight program from any thread, including while `execute` blocks.
pub type CancelHook = Arc<dyn Fn() + Send + Sync>;

pub trait ProgramExecutor {
    fn init(&mut self) -> bool;

    fn add_directive(&mut self, text: &str);

    fn add_rapid_to_machine_position(&mut self, position: &Position, axes: AxisMask);

    fn add_probing_action(&mut self, axes: AxisMask, negative: bool);

    fn execute(&mut self, synchronous: bool) -> bool;

    fn cancel(&mut self);

    fn cancel_hook(&self) -> CancelHook;

    fn to_program_text(&self) -> String;

    fn end(&mut self, message: &str);
}

pub trait Controller {
    fn goto_machine_position(&mut self, position: &Position, axes: AxisMask) -> bool;

    fn wait_for_response(&mut self, command: &str) -> bool;

    fn remove_last_position(&mut self) -> bool;

    fn execute_command(&mut self, command: &str);

    fn samples(&self) -> &[Position];

    fn probe_position(&self) -> Position;

    fn tool_offset_z(&self) -> f64;

    fn is_parser_state_live(&self) -> bool;

    fn is_job_running(&self) -> bool;

    fn set_job_running(&mut self, running: bool);
}

pub trait Confirm {
    fn confirm_clamped_clearance(&mut self, clearance: f64, offset: f64) -> bool;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClearancePolicy {
    Accept,
    Decline,
}

impl Confirm for ClearancePolicy {
    fn confirm_clamped_clearance(&mut self, _clearance: f64, _offset: f64) -> bool {
        *self == ClearancePolicy::Accept
    }
}

impl<F: FnMut(f64, f64) -> bool> Confirm for F {
    fn confirm_clamped_clearance(&mut self, clearance: f64, offset: f64) -> bool {
        self(clearance, offset)
    }
}
