use crate::error::{ProbeError, RunFailure};
use crate::feature::Feature;
use crate::host::{CancelHook, Confirm, Controller, ProgramExecutor};
use crate::params::ProbeParams;
use crate::planner;
use crate::position::Position;
use crate::processor;
use crate::session::{CancelToken, SessionState};

pub const INSTRUCTIONS: &str = "Click edge, corner or center in image above to select probing action.\n\
Move the probe to above the position indicated by green dot before start.";

#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    Preview(String),
    Completed(Position),
    Failed(RunFailure),
}

#[derive(Clone)]
pub struct StopHandle {
    cancel: CancelToken,
    abort: CancelHook,
}

impl StopHandle {
    pub fn stop(&self) {
        self.cancel.cancel();
        (self.abort)();
    }
}

pub struct ProbeCycle<H> {
    host: H,
    params: ProbeParams,
    cancel: CancelToken,
}

impl<H> ProbeCycle<H>
where
    H: ProgramExecutor + Controller,
{
    pub fn new(host: H, params: ProbeParams) -> Self {
        Self::with_cancel(host, params, CancelToken::new())
    }

    pub fn with_cancel(host: H, params: ProbeParams, cancel: CancelToken) -> Self {
        Self { host, params, cancel }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            cancel: self.cancel.clone(),
            abort: self.host.cancel_hook(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.host.cancel();
    }

    pub fn start(&mut self, feature: Feature, preview: bool, confirm: &mut dyn Confirm) -> Result<CycleOutcome, ProbeError> {
        self.params.validate()?;

        let Some(session) = SessionState::new(feature, self.cancel.clone()) else {
            console_log!("No feature selected");
            return Err(ProbeError::NoFeature);
        };
        if !preview && self.host.is_job_running() {
            return Err(ProbeError::Busy);
        }
        if !self.host.init() {
            return Err(ProbeError::InitFailed);
        }

        console_log!(
            "Probe {:?}: mode={:?}, probe_z={}, preview={}",
            feature,
            self.params.coordinate_mode,
            self.params.probe_z,
            preview
        );

        let program = match planner::plan(&session, &self.params, preview, confirm) {
            Ok(program) => program,
            Err(err) => {
                console_log!("Probe program rejected: {}", err);
                return Err(err);
            }
        };
        program.load_into(&mut self.host);

        if preview {
            let text = self.host.to_program_text().replace("G53", "");
            return Ok(CycleOutcome::Preview(text));
        }

        self.host.set_job_running(true);
        let executed = self.host.execute(true);

        let outcome = match processor::complete(&mut self.host, &session, &self.params, executed) {
            Ok(position) => CycleOutcome::Completed(position),
            Err(failure) => CycleOutcome::Failed(failure),
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ClearancePolicy;
    use crate::position::AxisMask;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    // Executor whose program runs until aborted or until `runtime` elapses.
    struct BlockingHost {
        aborted: Arc<AtomicBool>,
        runtime: Duration,
        aborted_in_flight: bool,
        samples: Vec<Position>,
        job_running: bool,
        ended: Option<String>,
    }

    impl BlockingHost {
        fn new(runtime: Duration) -> Self {
            Self {
                aborted: Arc::new(AtomicBool::new(false)),
                runtime,
                aborted_in_flight: false,
                samples: Vec::new(),
                job_running: false,
                ended: None,
            }
        }
    }

    impl ProgramExecutor for BlockingHost {
        fn init(&mut self) -> bool {
            self.aborted.store(false, Ordering::SeqCst);
            true
        }
        fn add_directive(&mut self, _text: &str) {}
        fn add_rapid_to_machine_position(&mut self, _position: &Position, _axes: AxisMask) {}
        fn add_probing_action(&mut self, _axes: AxisMask, _negative: bool) {}

        fn execute(&mut self, _synchronous: bool) -> bool {
            let began = Instant::now();
            while began.elapsed() < self.runtime {
                if self.aborted.load(Ordering::SeqCst) {
                    self.aborted_in_flight = true;
                    return false;
                }
                thread::sleep(Duration::from_millis(1));
            }
            self.samples.push(Position::new(0.0, 0.0, -1.0));
            true
        }

        fn cancel(&mut self) {
            self.aborted.store(true, Ordering::SeqCst);
        }

        fn cancel_hook(&self) -> CancelHook {
            let aborted = self.aborted.clone();
            Arc::new(move || aborted.store(true, Ordering::SeqCst))
        }

        fn to_program_text(&self) -> String {
            String::new()
        }

        fn end(&mut self, message: &str) {
            self.ended = Some(message.to_string());
        }
    }

    impl Controller for BlockingHost {
        fn goto_machine_position(&mut self, _position: &Position, _axes: AxisMask) -> bool { true }
        fn wait_for_response(&mut self, _command: &str) -> bool { true }
        fn remove_last_position(&mut self) -> bool { self.samples.pop().is_some() }
        fn execute_command(&mut self, _command: &str) {}
        fn samples(&self) -> &[Position] { &self.samples }
        fn probe_position(&self) -> Position { Position::unknown() }
        fn tool_offset_z(&self) -> f64 { 0.0 }
        fn is_parser_state_live(&self) -> bool { true }
        fn is_job_running(&self) -> bool { self.job_running }
        fn set_job_running(&mut self, running: bool) { self.job_running = running; }
    }

    #[test]
    fn stop_handle_aborts_program_while_it_runs() {
        let mut cycle = ProbeCycle::new(BlockingHost::new(Duration::from_secs(5)), ProbeParams::default());
        let handle = cycle.stop_handle();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.stop();
        });

        let began = Instant::now();
        let outcome = cycle.start(Feature::Top, false, &mut ClearancePolicy::Accept).expect("start");
        stopper.join().expect("join");

        assert!(began.elapsed() < Duration::from_secs(2), "run took {:?}", began.elapsed());
        assert_eq!(outcome, CycleOutcome::Failed(RunFailure::Cancelled));
        let host = cycle.host();
        assert!(host.aborted_in_flight);
        assert_eq!(host.ended.as_deref(), Some("Probing failed"));
        assert!(!host.job_running);
    }

    #[test]
    fn unstopped_program_runs_to_completion() {
        let mut cycle = ProbeCycle::new(BlockingHost::new(Duration::from_millis(5)), ProbeParams::default());
        let outcome = cycle.start(Feature::Top, false, &mut ClearancePolicy::Accept).expect("start");
        assert!(matches!(outcome, CycleOutcome::Completed(_)));
        assert!(!cycle.host().aborted_in_flight);
    }
}
