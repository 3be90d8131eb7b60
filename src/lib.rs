use wasm_bindgen::prelude::*;
use serde::{Serialize, Deserialize};

// --- LOGGING ---
#[cfg(target_arch = "wasm32")]
fn console_write(s: &str) {
    web_sys::console::log_1(&JsValue::from_str(s));
}

#[cfg(not(target_arch = "wasm32"))]
fn console_write(s: &str) {
    ::log::info!(target: "probe_core", "{}", s);
}

macro_rules! console_log {
    ($($t:tt)*) => ($crate::console_write(&format!($($t)*)))
}

pub mod commit;
pub mod cycle;
pub mod error;
pub mod feature;
pub mod gcode;
pub mod host;
pub mod params;
pub mod planner;
pub mod position;
pub mod processor;
pub mod session;
pub mod sim;

pub use cycle::{CycleOutcome, ProbeCycle, StopHandle, INSTRUCTIONS};
pub use error::{ProbeError, RunFailure};
pub use feature::Feature;
pub use host::{CancelHook, ClearancePolicy, Confirm, Controller, ProgramExecutor};
pub use params::{CoordinateMode, ProbeParams};
pub use position::{Axis, AxisMask, Position};
pub use session::{CancelToken, SessionState};
pub use sim::SimulatedMachine;

// ── Browser facade ─────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct SimulationSetup {
    pub surfaces: [Option<f64>; 3],
    pub trip_lag: f64,
    pub tool_offset_z: f64,
    pub parser_state_live: bool,
    pub accept_clamp: bool,
}

#[derive(Serialize, Debug)]
pub struct SimulationReport {
    pub message: String,
    pub completed: bool,
    pub committed: Option<Position>,
    pub commands: Vec<String>,
    pub samples: Vec<Position>,
    pub machine_position: Position,
    pub work_position: Position,
}

fn policy(accept: bool) -> ClearancePolicy {
    if accept { ClearancePolicy::Accept } else { ClearancePolicy::Decline }
}

pub fn preview(feature: Feature, params: ProbeParams, accept_clamp: bool) -> Result<String, ProbeError> {
    let machine = SimulatedMachine::new().with_probe_distance(params.probe_distance);
    let mut cycle = ProbeCycle::new(machine, params);
    match cycle.start(feature, true, &mut policy(accept_clamp))? {
        CycleOutcome::Preview(text) => Ok(text),
        _ => Ok(String::new()),
    }
}

pub fn simulate(feature: Feature, params: ProbeParams, setup: &SimulationSetup) -> Result<SimulationReport, ProbeError> {
    let mut machine = SimulatedMachine::new()
        .at(params.start_position)
        .with_probe_distance(params.probe_distance)
        .with_trip_lag(setup.trip_lag);
    for axis in Axis::ALL {
        if let Some(surface) = setup.surfaces[axis.index()] {
            machine = machine.with_surface(axis, surface);
        }
    }
    machine.set_tool_offset_z(setup.tool_offset_z);
    machine.set_parser_state_live(setup.parser_state_live);

    let mut cycle = ProbeCycle::new(machine, params);
    let outcome = cycle.start(feature, false, &mut policy(setup.accept_clamp))?;
    let machine = cycle.into_host();

    let committed = match outcome {
        CycleOutcome::Completed(position) => Some(position),
        _ => None,
    };
    Ok(SimulationReport {
        message: machine.end_message().unwrap_or_default().to_string(),
        completed: committed.is_some(),
        committed,
        commands: machine.log().to_vec(),
        samples: machine.samples().to_vec(),
        machine_position: machine.position(),
        work_position: machine.work_position(),
    })
}

fn decode_request(feature: &str, params: JsValue) -> Result<(Feature, ProbeParams), JsValue> {
    let feature: Feature = feature.parse().map_err(|e: feature::UnknownFeature| JsValue::from_str(&e.to_string()))?;
    let params: ProbeParams = serde_wasm_bindgen::from_value(params)?;
    Ok((feature, params))
}

#[wasm_bindgen]
pub fn probe_instructions() -> String {
    INSTRUCTIONS.to_string()
}

#[wasm_bindgen]
pub fn preview_probe(feature: &str, params: JsValue, accept_clamp: bool) -> Result<String, JsValue> {
    let (feature, params) = decode_request(feature, params)?;
    preview(feature, params, accept_clamp).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn simulate_probe(feature: &str, params: JsValue, setup: JsValue) -> Result<JsValue, JsValue> {
    let (feature, params) = decode_request(feature, params)?;
    let setup: SimulationSetup = if setup.is_undefined() || setup.is_null() {
        SimulationSetup::default()
    } else {
        serde_wasm_bindgen::from_value(setup)?
    };
    let report = simulate(feature, params, &setup).map_err(|e| JsValue::from_str(&e.to_string()))?;
    console_log!("Simulated {:?}: {}", feature, report.message);
    Ok(serde_wasm_bindgen::to_value(&report)?)
}
