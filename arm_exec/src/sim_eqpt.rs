//! # Simulated Equipment
//!
//! Software stand-ins for the welding power source, the process sensor bus and the arm
//! mechanisms. They let the cell run without hardware and record every command they receive, so
//! they are also used to drive the weld controller in tests.
//!
//! Faults can be injected at any time:
//!
//! - [`SimWeld::set_ready`] and [`SimWeld::set_fail_connect`]
//! - [`SimSensors::set_connected`] and [`SimSensors::set_temperature_override`]
//! - [`SimMotion::set_calibrated`] and [`SimMotion::set_fail_at_move`]

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use crate::weld_ctrl::Eqpt;
use eqpt_if::{EqptError, MechDems, MotionInterface, SensorData, SensorInterface, WeldEqpt};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Torch temperature with the arc off.
const AMBIENT_TEMP_DEGC: f64 = 25.0;

/// Torch temperature with the arc on.
const ARC_ON_TEMP_DEGC: f64 = 45.0;

/// Arc length while welding.
const ARC_LENGTH_MM: f64 = 3.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Setpoints held by the simulated welding power source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeldSetpoints {
    pub voltage_v: f64,
    pub current_a: f64,
    pub wire_feed_rate_mms: f64,
    pub gas_flow_rate_lpm: f64,
}

/// Simulated welding power source.
pub struct SimWeld {
    setpoints: Mutex<WeldSetpoints>,

    connected: AtomicBool,
    ready: AtomicBool,
    fail_connect: AtomicBool,
    arc_on: AtomicBool,
    estopped: AtomicBool,

    connect_count: AtomicUsize,
    start_count: AtomicUsize,
    stop_count: AtomicUsize,
    reduce_count: AtomicUsize,
    estop_count: AtomicUsize,
}

/// Simulated sensor bus, reading back the state of a [`SimWeld`].
pub struct SimSensors {
    weld: Arc<SimWeld>,

    connected: AtomicBool,

    /// Temperature reported instead of the simulated one
    temperature_override: Mutex<Option<f64>>,

    /// Offset added to the measured voltage
    voltage_offset_v: Mutex<f64>,
}

/// Simulated arm mechanisms which move instantly to any accepted demand.
pub struct SimMotion {
    joints: Mutex<Vec<f64>>,

    commanded: Mutex<Vec<MechDems>>,

    calibrated: AtomicBool,
    estopped: AtomicBool,

    /// Index of the move (counting from zero) which will be rejected
    fail_at_move: Mutex<Option<usize>>,

    move_count: AtomicUsize,
    stop_count: AtomicUsize,
    estop_count: AtomicUsize,
}

/// A complete simulated cell.
pub struct SimCell {
    pub weld: Arc<SimWeld>,
    pub sensors: Arc<SimSensors>,
    pub motion: Arc<SimMotion>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimCell {
    /// Create a healthy cell with the arm resting at the given joint positions.
    pub fn new(home_joints_rad: &[f64]) -> Self {
        let weld = Arc::new(SimWeld::new());
        Self {
            sensors: Arc::new(SimSensors::new(weld.clone())),
            motion: Arc::new(SimMotion::new(home_joints_rad)),
            weld,
        }
    }

    /// Get the equipment handles to pass to the weld controller.
    pub fn eqpt(&self) -> Eqpt {
        Eqpt {
            weld: self.weld.clone(),
            sensors: self.sensors.clone(),
            motion: self.motion.clone(),
        }
    }
}

impl Default for SimWeld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWeld {
    pub fn new() -> Self {
        Self {
            setpoints: Mutex::new(WeldSetpoints::default()),
            connected: AtomicBool::new(false),
            ready: AtomicBool::new(true),
            fail_connect: AtomicBool::new(false),
            arc_on: AtomicBool::new(false),
            estopped: AtomicBool::new(false),
            connect_count: AtomicUsize::new(0),
            start_count: AtomicUsize::new(0),
            stop_count: AtomicUsize::new(0),
            reduce_count: AtomicUsize::new(0),
            estop_count: AtomicUsize::new(0),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// If set the next connection attempt fails.
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn setpoints(&self) -> WeldSetpoints {
        match self.setpoints.lock() {
            Ok(s) => *s,
            Err(p) => *p.into_inner(),
        }
    }

    pub fn is_arc_on(&self) -> bool {
        self.arc_on.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    pub fn start_count(&self) -> usize {
        self.start_count.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    pub fn reduce_count(&self) -> usize {
        self.reduce_count.load(Ordering::SeqCst)
    }

    pub fn estop_count(&self) -> usize {
        self.estop_count.load(Ordering::SeqCst)
    }

    fn check_usable(&self) -> Result<(), EqptError> {
        if self.estopped.load(Ordering::SeqCst) {
            Err(EqptError::EmergencyStopped)
        } else if !self.connected.load(Ordering::SeqCst) {
            Err(EqptError::NotConnected)
        } else {
            Ok(())
        }
    }

    fn update<F: FnOnce(&mut WeldSetpoints)>(&self, f: F) -> Result<(), EqptError> {
        self.check_usable()?;
        let mut sp = self
            .setpoints
            .lock()
            .map_err(|_| EqptError::CommandRejected("setpoint lock poisoned".into()))?;
        f(&mut sp);
        trace!("SimWeld setpoints: {:?}", *sp);
        Ok(())
    }
}

impl WeldEqpt for SimWeld {
    fn connect(&self) -> Result<(), EqptError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(EqptError::ConnectionFailed("simulated connection failure".into()));
        }

        self.connected.store(true, Ordering::SeqCst);
        debug!("SimWeld connected");
        Ok(())
    }

    fn start(&self) -> Result<(), EqptError> {
        self.check_usable()?;
        if !self.ready.load(Ordering::SeqCst) {
            return Err(EqptError::NotReady);
        }

        self.start_count.fetch_add(1, Ordering::SeqCst);
        self.arc_on.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), EqptError> {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        self.arc_on.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn set_voltage(&self, voltage_v: f64) -> Result<(), EqptError> {
        self.update(|sp| sp.voltage_v = voltage_v)
    }

    fn set_current(&self, current_a: f64) -> Result<(), EqptError> {
        self.update(|sp| sp.current_a = current_a)
    }

    fn set_wire_feed_rate(&self, rate_mms: f64) -> Result<(), EqptError> {
        self.update(|sp| sp.wire_feed_rate_mms = rate_mms)
    }

    fn set_gas_flow_rate(&self, rate_lpm: f64) -> Result<(), EqptError> {
        self.update(|sp| sp.gas_flow_rate_lpm = rate_lpm)
    }

    fn reduce_current(&self, factor: f64) -> Result<(), EqptError> {
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(EqptError::CommandRejected(format!(
                "reduction factor {} not in (0, 1]",
                factor
            )));
        }

        self.reduce_count.fetch_add(1, Ordering::SeqCst);
        self.update(|sp| sp.current_a *= factor)
    }

    fn emergency_stop(&self) -> Result<(), EqptError> {
        self.estop_count.fetch_add(1, Ordering::SeqCst);
        self.estopped.store(true, Ordering::SeqCst);
        self.arc_on.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
            && self.connected.load(Ordering::SeqCst)
            && !self.estopped.load(Ordering::SeqCst)
    }
}

impl SimSensors {
    pub fn new(weld: Arc<SimWeld>) -> Self {
        Self {
            weld,
            connected: AtomicBool::new(true),
            temperature_override: Mutex::new(None),
            voltage_offset_v: Mutex::new(0.0),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_temperature_override(&self, temp_degc: Option<f64>) {
        if let Ok(mut t) = self.temperature_override.lock() {
            *t = temp_degc;
        }
    }

    pub fn set_voltage_offset(&self, offset_v: f64) {
        if let Ok(mut v) = self.voltage_offset_v.lock() {
            *v = offset_v;
        }
    }
}

impl SensorInterface for SimSensors {
    fn read_sensors(&self) -> Result<SensorData, EqptError> {
        if !self.is_connected() {
            return Err(EqptError::NotConnected);
        }

        let temp_override = *self
            .temperature_override
            .lock()
            .map_err(|_| EqptError::CommandRejected("sensor lock poisoned".into()))?;
        let voltage_offset_v = *self
            .voltage_offset_v
            .lock()
            .map_err(|_| EqptError::CommandRejected("sensor lock poisoned".into()))?;

        let arc_on = self.weld.is_arc_on();
        let sp = self.weld.setpoints();

        let mut data = if arc_on {
            SensorData {
                voltage_v: sp.voltage_v + voltage_offset_v,
                current_a: sp.current_a,
                arc_length_mm: ARC_LENGTH_MM,
                temperature_degc: ARC_ON_TEMP_DEGC,
            }
        } else {
            SensorData {
                temperature_degc: AMBIENT_TEMP_DEGC,
                ..Default::default()
            }
        };

        if let Some(t) = temp_override {
            data.temperature_degc = t;
        }

        Ok(data)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl SimMotion {
    pub fn new(joints_rad: &[f64]) -> Self {
        Self {
            joints: Mutex::new(joints_rad.to_vec()),
            commanded: Mutex::new(Vec::new()),
            calibrated: AtomicBool::new(true),
            estopped: AtomicBool::new(false),
            fail_at_move: Mutex::new(None),
            move_count: AtomicUsize::new(0),
            stop_count: AtomicUsize::new(0),
            estop_count: AtomicUsize::new(0),
        }
    }

    pub fn set_calibrated(&self, calibrated: bool) {
        self.calibrated.store(calibrated, Ordering::SeqCst);
    }

    /// Reject the move with the given index, counted over the life of the simulation.
    pub fn set_fail_at_move(&self, index: Option<usize>) {
        if let Ok(mut f) = self.fail_at_move.lock() {
            *f = index;
        }
    }

    /// All accepted demands in the order they were received.
    pub fn commanded(&self) -> Vec<MechDems> {
        match self.commanded.lock() {
            Ok(c) => c.clone(),
            Err(p) => p.into_inner().clone(),
        }
    }

    /// Number of moves requested, including rejected ones.
    pub fn move_count(&self) -> usize {
        self.move_count.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    pub fn estop_count(&self) -> usize {
        self.estop_count.load(Ordering::SeqCst)
    }
}

impl MotionInterface for SimMotion {
    fn move_to_joints(&self, dems: &MechDems) -> Result<(), EqptError> {
        let index = self.move_count.fetch_add(1, Ordering::SeqCst);

        if self.estopped.load(Ordering::SeqCst) {
            return Err(EqptError::EmergencyStopped);
        }

        if !dems.is_consistent() {
            return Err(EqptError::DemsInvalid(
                "position, rate and torque lengths differ".into(),
            ));
        }

        let fail_at = *self
            .fail_at_move
            .lock()
            .map_err(|_| EqptError::CommandRejected("fault lock poisoned".into()))?;
        if fail_at == Some(index) {
            return Err(EqptError::CommandRejected(format!(
                "simulated failure of move {}",
                index
            )));
        }

        let mut joints = self
            .joints
            .lock()
            .map_err(|_| EqptError::CommandRejected("joint lock poisoned".into()))?;
        if dems.num_joints() != joints.len() {
            return Err(EqptError::DemsInvalid(format!(
                "expected {} joints, found {}",
                joints.len(),
                dems.num_joints()
            )));
        }
        joints.copy_from_slice(&dems.pos_rad);

        self.commanded
            .lock()
            .map_err(|_| EqptError::CommandRejected("command lock poisoned".into()))?
            .push(dems.clone());

        Ok(())
    }

    fn stop(&self) -> Result<(), EqptError> {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn emergency_stop(&self) -> Result<(), EqptError> {
        self.estop_count.fetch_add(1, Ordering::SeqCst);
        self.estopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_calibrated(&self) -> bool {
        self.calibrated.load(Ordering::SeqCst)
    }

    fn current_joints(&self) -> Vec<f64> {
        match self.joints.lock() {
            Ok(j) => j.clone(),
            Err(p) => p.into_inner().clone(),
        }
    }
}
