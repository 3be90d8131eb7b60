use serde::{Serialize, Deserialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::gcode::{parse_words, GcodeProgram};
use crate::host::{CancelHook, Controller, ProgramExecutor};
use crate::position::{Axis, AxisMask, Position};
use crate::session::CancelToken;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WorkOffset {
    pub label: String,
    pub offset: Position,
}

fn default_work_offsets() -> Vec<WorkOffset> {
    ["G54", "G55", "G56", "G57", "G58", "G59", "G59.1", "G59.2", "G59.3"]
        .iter()
        .map(|label| WorkOffset { label: label.to_string(), offset: Position::default() })
        .collect()
}

pub struct SimulatedMachine {
    position: Position,
    // Machine coordinate where the probe trips on each axis, if anything is there.
    surfaces: [Option<f64>; 3],
    // Overtravel past the surface per unit of feed (mm per mm/min).
    trip_lag: f64,
    abs_mode: bool,
    feed_rate: f64,
    work_offsets: Vec<WorkOffset>,
    active_wcs: usize,
    zero_offset: Position,
    tool_offset_z: f64,
    parser_state_live: bool,
    job_running: bool,

    program: GcodeProgram,
    program_cancelled: Arc<AtomicBool>,
    samples: Vec<Position>,
    probe_position: Position,
    end_message: Option<String>,
    log: Vec<String>,

    cancel: Option<CancelToken>,
    cancel_on: Option<String>,
    fail_on: Option<String>,
}

impl Default for SimulatedMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedMachine {
    pub fn new() -> Self {
        Self {
            position: Position::default(),
            surfaces: [None; 3],
            trip_lag: 0.0,
            abs_mode: true,
            feed_rate: 100.0,
            work_offsets: default_work_offsets(),
            active_wcs: 0,
            zero_offset: Position::default(),
            tool_offset_z: 0.0,
            parser_state_live: false,
            job_running: false,
            program: GcodeProgram::new(10.0),
            program_cancelled: Arc::new(AtomicBool::new(false)),
            samples: Vec::new(),
            probe_position: Position::unknown(),
            end_message: None,
            log: Vec::new(),
            cancel: None,
            cancel_on: None,
            fail_on: None,
        }
    }

    // ── Setup ─────────────────────────────────────────────────────────────

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_surface(mut self, axis: Axis, machine_pos: f64) -> Self {
        self.surfaces[axis.index()] = Some(machine_pos);
        self
    }

    pub fn with_trip_lag(mut self, lag: f64) -> Self {
        self.trip_lag = lag.max(0.0);
        self
    }

    pub fn with_probe_distance(mut self, distance: f64) -> Self {
        self.program.set_probe_distance(distance);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    // Stop the run right after a command containing `needle` completes.
    pub fn cancel_on(mut self, needle: &str) -> Self {
        self.cancel_on = Some(needle.to_string());
        self
    }

    pub fn fail_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn set_parser_state_live(&mut self, live: bool) {
        self.parser_state_live = live;
    }

    pub fn set_tool_offset_z(&mut self, z: f64) {
        self.tool_offset_z = z;
    }

    // ── Inspection ────────────────────────────────────────────────────────

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn work_position(&self) -> Position {
        let wcs = self.active_offset();
        let mut out = self.position;
        for i in 0..3 {
            out.values[i] -= wcs.values[i] + self.zero_offset.values[i];
        }
        out
    }

    pub fn work_offset(&self, p: usize) -> Option<&WorkOffset> {
        p.checked_sub(1).and_then(|i| self.work_offsets.get(i))
    }

    pub fn zero_offset(&self) -> Position {
        self.zero_offset
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn end_message(&self) -> Option<&str> {
        self.end_message.as_deref()
    }

    pub fn program_cancelled(&self) -> bool {
        self.program_cancelled.load(Ordering::SeqCst)
    }

    fn active_offset(&self) -> Position {
        self.work_offsets.get(self.active_wcs).map(|w| w.offset).unwrap_or_default()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    // ── Line interpreter ──────────────────────────────────────────────────

    fn send(&mut self, line: &str) -> bool {
        self.log.push(line.to_string());
        if self.is_cancelled() {
            console_log!("Rejected after stop: {}", line);
            return false;
        }
        if self.fail_on.as_deref().is_some_and(|needle| line.contains(needle)) {
            console_log!("error: {}", line);
            return false;
        }

        let ok = self.interpret(line.trim());

        if let (Some(needle), Some(token)) = (&self.cancel_on, &self.cancel) {
            if line.contains(needle.as_str()) {
                token.cancel();
                self.program_cancelled.store(true, Ordering::SeqCst);
            }
        }
        ok
    }

    fn interpret(&mut self, line: &str) -> bool {
        if let Some(system) = line.strip_prefix('$') {
            // Parser state report; nothing else is supported.
            return system.eq_ignore_ascii_case("G");
        }

        let mut motion = 0;
        let mut machine_coords = false;
        let mut set_table = false;
        let mut set_zero = false;
        let mut l_word: Option<i32> = None;
        let mut p_word: Option<i32> = None;
        let mut targets: [Option<f64>; 3] = [None; 3];

        for word in parse_words(line) {
            match word.letter {
                b'G' => match word.code() {
                    0 | 10 | 382 | 383 => motion = word.code(),
                    100 => set_table = true,
                    530 => machine_coords = true,
                    540 | 550 | 560 | 570 | 580 | 590 => self.active_wcs = ((word.code() - 540) / 10) as usize,
                    591..=593 => self.active_wcs = (word.code() - 585) as usize,
                    900 => self.abs_mode = true,
                    910 => self.abs_mode = false,
                    920 => set_zero = true,
                    _ => {}
                },
                b'F' => self.feed_rate = word.value,
                b'L' => l_word = Some(word.value.round() as i32),
                b'P' => p_word = Some(word.value.round() as i32),
                b'X' => targets[Axis::X.index()] = Some(word.value),
                b'Y' => targets[Axis::Y.index()] = Some(word.value),
                b'Z' => targets[Axis::Z.index()] = Some(word.value),
                _ => {}
            }
        }

        if set_table {
            return self.set_offset_table(l_word, p_word, &targets);
        }
        if set_zero {
            self.set_zero_offset(&targets);
            return true;
        }
        if targets.iter().all(Option::is_none) {
            return true;
        }

        let target = self.resolve_target(&targets, machine_coords);
        match motion {
            382 | 383 => self.probe_toward(target, motion == 382),
            _ => {
                self.position = target;
                true
            }
        }
    }

    fn resolve_target(&self, targets: &[Option<f64>; 3], machine_coords: bool) -> Position {
        let wcs = self.active_offset();
        let mut out = self.position;
        for (i, t) in targets.iter().enumerate() {
            let Some(v) = *t else { continue; };
            out.values[i] = if machine_coords {
                v
            } else if self.abs_mode {
                v + wcs.values[i] + self.zero_offset.values[i]
            } else {
                self.position.values[i] + v
            };
        }
        out
    }

    // G38.2 alarms when nothing is touched; G38.3 reports the miss as an unknown sample.
    fn probe_toward(&mut self, target: Position, alarm_on_miss: bool) -> bool {
        let from = self.position;
        let mut moved = AxisMask::NONE;

        for axis in Axis::ALL {
            let (a, b) = (from.get(axis), target.get(axis));
            if a == b {
                continue;
            }
            moved |= AxisMask::of(axis);
            let Some(surface) = self.surfaces[axis.index()] else { continue; };
            if surface < a.min(b) || surface > a.max(b) {
                continue;
            }

            let dir = (b - a).signum();
            let mut sample = from;
            sample.set(axis, surface + dir * self.trip_lag * self.feed_rate);
            self.position = sample;
            self.probe_position = sample;
            self.samples.push(sample);
            return true;
        }

        self.position = target;
        if alarm_on_miss {
            console_log!("ALARM: probe fail, no contact toward {}", target);
            self.probe_position = Position::unknown();
            return false;
        }

        let mut sample = target;
        for i in moved.indices() {
            sample.values[i] = f64::NAN;
        }
        self.probe_position = sample;
        self.samples.push(sample);
        true
    }

    fn set_offset_table(&mut self, l_word: Option<i32>, p_word: Option<i32>, targets: &[Option<f64>; 3]) -> bool {
        if l_word != Some(2) {
            return false;
        }
        let index = match p_word {
            None | Some(0) => self.active_wcs,
            Some(p) if p > 0 => (p - 1) as usize,
            Some(_) => return false,
        };
        let Some(wcs) = self.work_offsets.get_mut(index) else {
            return false;
        };
        for (i, t) in targets.iter().enumerate() {
            if let Some(v) = *t {
                wcs.offset.values[i] = v;
            }
        }
        console_log!("WCS {} offset = {}", wcs.label, wcs.offset);
        true
    }

    fn set_zero_offset(&mut self, targets: &[Option<f64>; 3]) {
        let wcs = self.active_offset();
        for (i, t) in targets.iter().enumerate() {
            if let Some(v) = *t {
                self.zero_offset.values[i] = self.position.values[i] - wcs.values[i] - v;
            }
        }
    }
}

impl ProgramExecutor for SimulatedMachine {
    fn init(&mut self) -> bool {
        self.program.clear();
        self.program_cancelled.store(false, Ordering::SeqCst);
        self.samples.clear();
        self.end_message = None;
        true
    }

    fn add_directive(&mut self, text: &str) {
        self.program.push_directive(text);
    }

    fn add_rapid_to_machine_position(&mut self, position: &Position, axes: AxisMask) {
        self.program.push_rapid(position, axes);
    }

    fn add_probing_action(&mut self, axes: AxisMask, negative: bool) {
        self.program.push_probe(axes, negative);
    }

    fn execute(&mut self, _synchronous: bool) -> bool {
        let lines = self.program.lines().to_vec();
        for line in lines {
            if self.program_cancelled() {
                return false;
            }
            if !self.send(&line) {
                console_log!("Program stopped at: {}", line);
                return false;
            }
        }
        true
    }

    fn cancel(&mut self) {
        self.program_cancelled.store(true, Ordering::SeqCst);
    }

    fn cancel_hook(&self) -> CancelHook {
        let flag = self.program_cancelled.clone();
        Arc::new(move || flag.store(true, Ordering::SeqCst))
    }

    fn to_program_text(&self) -> String {
        self.program.to_text()
    }

    fn end(&mut self, message: &str) {
        console_log!("{}", message);
        self.end_message = Some(message.to_string());
    }
}

impl Controller for SimulatedMachine {
    fn goto_machine_position(&mut self, position: &Position, axes: AxisMask) -> bool {
        if position.is_unknown_in(axes) {
            return false;
        }
        self.send(&format!("G53G0{}", position.to_gcode(axes)))
    }

    fn wait_for_response(&mut self, command: &str) -> bool {
        self.send(command)
    }

    fn remove_last_position(&mut self) -> bool {
        self.samples.pop().is_some()
    }

    fn execute_command(&mut self, command: &str) {
        self.send(command);
    }

    fn samples(&self) -> &[Position] {
        &self.samples
    }

    fn probe_position(&self) -> Position {
        self.probe_position
    }

    fn tool_offset_z(&self) -> f64 {
        self.tool_offset_z
    }

    fn is_parser_state_live(&self) -> bool {
        self.parser_state_live
    }

    fn is_job_running(&self) -> bool {
        self.job_running
    }

    fn set_job_running(&mut self, running: bool) {
        self.job_running = running;
    }
}
