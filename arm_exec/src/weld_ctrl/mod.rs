//! # Weld control module
//!
//! The weld controller owns the arm models and the equipment and executes [`WeldTask`]s. Each task
//! is checked for safety, preprocessed according to the workpiece, planned into a [`Trajectory`]
//! and then executed on two threads:
//!
//! - `weld_ctrl::exec` walks the trajectory, solving inverse kinematics for each waypoint and
//!   commanding the mechanisms.
//! - `weld_ctrl::monitor` polls the process sensors, updating the live status and reducing the
//!   current if the torch overheats.
//!
//! Both threads observe a single run flag, which is cleared by [`WeldCtrl::stop_welding`] and
//! [`WeldCtrl::emergency_stop`]. `execute_task` blocks until both threads have exited, so these
//! stop functions are intended to be called from another thread holding a shared reference to the
//! controller.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod exec;
mod monitor;
mod params;
mod safety;
mod state;
mod status;
mod task;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, error, info, warn};
use nalgebra::DVector;
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
    thread,
};

use crate::{
    ctrl::{self, CtrlError},
    dynamics::{DynError, DynamicsSolver, NewtonEuler},
    kin::{KinError, KinematicsSolver, SerialChain},
    traj::{TrajError, TrajPlanner, Trajectory},
};
use eqpt_if::{EqptError, MotionInterface, SensorInterface, WeldEqpt};
use util::{params as util_params, session};

pub use params::Params;
pub use safety::SafetyError;
pub use state::*;
pub use status::*;
pub use task::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Message recorded in the status by an emergency stop.
pub const EMERGENCY_STOP_MSG: &str = "Emergency stop activated";

/// Session directory trajectories are archived to.
const TRAJ_ARCHIVE_DIR: &str = "trajectories";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The equipment driven by the weld controller.
#[derive(Clone)]
pub struct Eqpt {
    pub weld: Arc<dyn WeldEqpt>,
    pub sensors: Arc<dyn SensorInterface>,
    pub motion: Arc<dyn MotionInterface>,
}

/// The weld controller.
///
/// Must be initialised with [`WeldCtrl::init`] before a task can be executed.
#[derive(Default)]
pub struct WeldCtrl {
    shared: Option<Arc<Shared>>,
}

/// State shared between the caller and the execution and monitor threads.
pub(crate) struct Shared {
    pub(crate) params: Params,

    pub(crate) kin: Box<dyn KinematicsSolver>,

    pub(crate) dynamics: Box<dyn DynamicsSolver>,

    pub(crate) planner: TrajPlanner,

    pub(crate) eqpt: Eqpt,

    /// Process parameters last pushed to the equipment
    pub(crate) weld_params: RwLock<WeldParams>,

    pub(crate) status: RwLock<WeldStatus>,

    /// Cleared to stop both task threads
    pub(crate) run: AtomicBool,

    /// Held while a task is being executed
    task_slot: AtomicBool,

    /// Number of tasks which have been prepared
    task_count: AtomicUsize,

    /// Set by a stop, cleared when a task takes the slot. Only changed with the status lock held.
    stop_requested: AtomicBool,

    /// True while the arc is on. The lock orders process start against stop.
    process_active: Mutex<bool>,
}

/// Releases the task slot when dropped.
struct TaskSlotGuard<'a>(&'a AtomicBool);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur in the weld controller.
#[derive(Debug, thiserror::Error)]
pub enum WeldCtrlError {
    #[error("The weld controller has not been initialised")]
    NotInitialised,

    #[error("A task is already running")]
    TaskAlreadyRunning,

    #[error("Invalid weld controller parameters: {0}")]
    InvalidParams(String),

    #[error("Could not load the parameters: {0}")]
    ParamLoad(#[from] util_params::LoadError),

    #[error("Safety check failed: {0}")]
    SafetyCheckFailed(#[from] SafetyError),

    #[error("Kinematics error: {0}")]
    Kin(#[from] KinError),

    #[error("Dynamics error: {0}")]
    Dyn(#[from] DynError),

    #[error("Controller error: {0}")]
    Ctrl(#[from] CtrlError),

    #[error("Trajectory error: {0}")]
    Traj(#[from] TrajError),

    #[error("Equipment error: {0}")]
    Eqpt(#[from] EqptError),

    #[error("No inverse kinematics solution for waypoint {0}: {1}")]
    WaypointUnreachable(usize, KinError),

    #[error("Inverse kinematics solution for waypoint {0} is outside the joint limits")]
    InvalidJointSolution(usize),

    #[error("Failed to execute trajectory point {0}: {1}")]
    WaypointFailed(usize, EqptError),

    #[error("A lock was poisoned by a panicking thread")]
    PoisonError,

    #[error("Could not spawn the {0} thread: {1}")]
    ThreadSpawn(&'static str, std::io::Error),

    #[error("The execution thread panicked")]
    ThreadPanicked,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

/// Archive path of the trajectory planned for the given task number.
fn traj_archive_path(task_num: usize) -> PathBuf {
    Path::new(TRAJ_ARCHIVE_DIR).join(format!("traj_{:04}.json", task_num))
}

impl<T> From<PoisonError<T>> for WeldCtrlError {
    fn from(_: PoisonError<T>) -> Self {
        WeldCtrlError::PoisonError
    }
}

impl Drop for TaskSlotGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl WeldCtrl {
    /// Create a new uninitialised weld controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise the controller from parameters in the params directory.
    pub fn init_from_file(&mut self, params_path: &str, eqpt: Eqpt) -> Result<(), WeldCtrlError> {
        let params: Params = util_params::load(params_path)?;
        self.init(params, eqpt)
    }

    /// Initialise the controller.
    ///
    /// The models, controller and planner are built and validated in that order, then the welding
    /// equipment is connected. If any step fails the controller is left uninitialised.
    pub fn init(&mut self, params: Params, eqpt: Eqpt) -> Result<(), WeldCtrlError> {
        self.shared = None;

        params.validate().map_err(WeldCtrlError::InvalidParams)?;

        let kin = SerialChain::new(params.kin.clone())?;
        debug!("Kinematics built for {} joints", kin.num_joints());

        let dynamics = NewtonEuler::new(&params.kin, &params.dynamics)?;
        debug!("Dynamics built");

        // Controllers are built per task, this only validates the parameters
        ctrl::build(&params.ctrl, kin.num_joints())?;

        let planner = TrajPlanner::new(params.traj.clone())?;
        debug!("Trajectory planner built");

        if eqpt.sensors.is_connected() {
            info!("Process sensors connected");
        } else {
            warn!("Process sensors are not connected, tasks will be rejected until they are");
        }

        eqpt.weld.connect()?;
        info!("Welding equipment connected");

        let status = WeldStatus {
            state: WeldCtrlState::Initialised,
            current_pose: kin.forward_kinematics(&DVector::from_column_slice(
                &params.home_joints_rad,
            )),
            ..Default::default()
        };

        self.shared = Some(Arc::new(Shared {
            params,
            kin: Box::new(kin),
            dynamics: Box::new(dynamics),
            planner,
            eqpt,
            weld_params: RwLock::new(WeldParams::default()),
            status: RwLock::new(status),
            run: AtomicBool::new(false),
            task_slot: AtomicBool::new(false),
            task_count: AtomicUsize::new(0),
            stop_requested: AtomicBool::new(false),
            process_active: Mutex::new(false),
        }));

        info!("WeldCtrl initialised");

        Ok(())
    }

    /// Execute a weld task, blocking until it has finished.
    ///
    /// Returns an error if the task was rejected, in which case the state is unchanged. Once the
    /// task has started the outcome of the execution is returned, and recorded in the status.
    ///
    /// A stop received while the task is being prepared aborts it before anything moves.
    pub fn execute_task(&self, task: &WeldTask) -> Result<TaskOutcome, WeldCtrlError> {
        let shared = self.shared()?;

        {
            let status = shared.status.write()?;

            if !status.state.accepts_task()
                || shared
                    .task_slot
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
            {
                warn!("Task rejected, a task is already running");
                return Err(WeldCtrlError::TaskAlreadyRunning);
            }

            shared.stop_requested.store(false, Ordering::Release);
        }
        let _slot = TaskSlotGuard(&shared.task_slot);

        let (traj, controller) = match Self::prepare(shared, task) {
            Ok(p) => p,
            Err(e) if shared.stop_requested.load(Ordering::Acquire) => {
                warn!("Task stopped while being prepared ({})", e);
                return Ok(TaskOutcome::Stopped);
            }
            Err(e) => return Err(e),
        };

        // Arming happens under the status lock so it can't interleave with a stop
        {
            let mut status = shared.status.write()?;

            if shared.stop_requested.load(Ordering::Acquire) {
                warn!("Task stopped before execution started");
                return Ok(TaskOutcome::Stopped);
            }

            status.start_task(traj.len());
            shared.run.store(true, Ordering::Release);
        }

        info!("Task started");

        let outcome = Self::run_threads(shared, traj, controller);

        match &outcome {
            Ok(TaskOutcome::Completed) => info!("Task completed"),
            Ok(TaskOutcome::Stopped) => warn!("Task stopped"),
            Ok(TaskOutcome::Failed(msg)) => error!("Task failed: {}", msg),
            Err(e) => error!("Task ended with an error: {}", e),
        }

        outcome
    }

    /// Push new process parameters to the welding equipment.
    pub fn set_weld_params(&self, params: &WeldParams) -> Result<(), WeldCtrlError> {
        self.shared()?.set_weld_params(params)
    }

    /// Stop the current task, turning off the arc and halting the arm.
    ///
    /// Does nothing if the controller is not initialised.
    pub fn stop_welding(&self) -> Result<(), WeldCtrlError> {
        let shared = match &self.shared {
            Some(s) => s,
            None => return Ok(()),
        };

        info!("Stopping welding");

        {
            let mut status = shared.status.write()?;
            status.state = WeldCtrlState::Stopped;
            status.is_running = false;
            shared.stop_requested.store(true, Ordering::Release);
            shared.run.store(false, Ordering::Release);
        }

        shared.stop_process()?;
        shared.eqpt.motion.stop()?;

        Ok(())
    }

    /// Immediately stop the welding equipment and the arm.
    ///
    /// The equipment is emergency stopped before any other action is taken. The first equipment
    /// error, if any, is returned after the controller has been put into the stopped state.
    ///
    /// Does nothing if the controller is not initialised.
    pub fn emergency_stop(&self) -> Result<(), WeldCtrlError> {
        let shared = match &self.shared {
            Some(s) => s,
            None => return Ok(()),
        };

        // The process lock is held so the execution thread can't issue a normal stop afterwards
        let mut process_active = shared.process_active.lock()?;

        let weld_result = shared.eqpt.weld.emergency_stop();
        let motion_result = shared.eqpt.motion.emergency_stop();
        *process_active = false;

        error!("{}", EMERGENCY_STOP_MSG);

        {
            let mut status = shared.status.write()?;
            status.state = WeldCtrlState::Stopped;
            status.is_running = false;
            status.error_message = Some(EMERGENCY_STOP_MSG.into());
            shared.stop_requested.store(true, Ordering::Release);
            shared.run.store(false, Ordering::Release);
        }
        drop(process_active);

        weld_result?;
        motion_result?;

        Ok(())
    }

    /// Get a snapshot of the live status.
    pub fn current_status(&self) -> Result<WeldStatus, WeldCtrlError> {
        Ok(self.shared()?.status.read()?.clone())
    }

    /// Returns true if a task is being executed.
    pub fn is_running(&self) -> bool {
        match &self.shared {
            Some(s) => s.task_slot.load(Ordering::Acquire),
            None => false,
        }
    }

    pub fn is_init(&self) -> bool {
        self.shared.is_some()
    }

    fn shared(&self) -> Result<&Arc<Shared>, WeldCtrlError> {
        self.shared.as_ref().ok_or(WeldCtrlError::NotInitialised)
    }

    /// Check, preprocess and plan a task, and build its controller.
    fn prepare(
        shared: &Shared,
        task: &WeldTask,
    ) -> Result<(Trajectory, Box<dyn ctrl::Controller + Send>), WeldCtrlError> {
        safety::check(
            shared.kin.as_ref(),
            &shared.eqpt,
            task,
            shared.params.workspace_radius_m,
        )?;

        let task = task.preprocess();
        shared.set_weld_params(&task.params)?;

        let traj = shared.planner.plan(
            &task.start,
            &task.end,
            task.params.speed_mms / 1000.0,
            &task.params,
        )?;
        info!(
            "Planned weld trajectory of {} waypoints lasting {:.2} s",
            traj.len(),
            traj.duration_s()
        );

        let task_num = shared.task_count.fetch_add(1, Ordering::AcqRel);
        if shared.params.archive_trajectories {
            session::save_with_timestamp(traj_archive_path(task_num), traj.clone());
        }

        let controller = ctrl::build(&shared.params.ctrl, shared.kin.num_joints())?;

        Ok((traj, controller))
    }

    /// Run the execution and monitor threads until execution ends.
    fn run_threads(
        shared: &Arc<Shared>,
        traj: Trajectory,
        controller: Box<dyn ctrl::Controller + Send>,
    ) -> Result<TaskOutcome, WeldCtrlError> {
        let monitor_shared = shared.clone();
        let monitor = match thread::Builder::new()
            .name("weld_ctrl::monitor".into())
            .spawn(move || monitor::run(&monitor_shared))
        {
            Ok(h) => h,
            Err(e) => {
                shared.run.store(false, Ordering::Release);
                shared.finish(TaskOutcome::Failed(e.to_string()))?;
                return Err(WeldCtrlError::ThreadSpawn("monitor", e));
            }
        };

        let exec_shared = shared.clone();
        let exec_result = thread::Builder::new()
            .name("weld_ctrl::exec".into())
            .spawn(move || exec::run(&exec_shared, &traj, controller))
            .map_err(|e| WeldCtrlError::ThreadSpawn("exec", e))
            .and_then(|h| h.join().map_err(|_| WeldCtrlError::ThreadPanicked));

        shared.run.store(false, Ordering::Release);
        if monitor.join().is_err() {
            warn!("The monitor thread panicked");
        }

        // Makes sure the arc is off even if the execution thread didn't get to turn it off
        shared.stop_process()?;

        let outcome = match exec_result {
            Ok(Ok(())) => TaskOutcome::Completed,
            Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
            Err(e) => TaskOutcome::Failed(e.to_string()),
        };

        shared.finish(outcome)
    }
}

impl Shared {
    /// Push process parameters to the welding equipment.
    pub(crate) fn set_weld_params(&self, params: &WeldParams) -> Result<(), WeldCtrlError> {
        let weld = &self.eqpt.weld;

        weld.set_voltage(params.voltage_v)?;
        weld.set_current(params.current_a)?;
        weld.set_wire_feed_rate(params.wire_feed_rate_mms)?;
        weld.set_gas_flow_rate(params.gas_flow_rate_lpm)?;

        *self.weld_params.write()? = params.clone();

        debug!(
            "Weld parameters set: {:.1} V, {:.1} A, wire {:.1} mm/s, gas {:.1} L/min",
            params.voltage_v, params.current_a, params.wire_feed_rate_mms, params.gas_flow_rate_lpm
        );

        Ok(())
    }

    /// Turn the arc on, unless the task has been stopped.
    ///
    /// Returns true if the arc was turned on.
    pub(crate) fn start_process(&self) -> Result<bool, WeldCtrlError> {
        let mut active = self.process_active.lock()?;

        if !self.run.load(Ordering::Acquire) {
            return Ok(false);
        }

        self.eqpt.weld.start()?;
        *active = true;
        info!("Arc on");

        Ok(true)
    }

    /// Turn the arc off if it is on. The equipment only receives one stop per start.
    pub(crate) fn stop_process(&self) -> Result<(), WeldCtrlError> {
        let mut active = self.process_active.lock()?;

        if *active {
            *active = false;
            self.eqpt.weld.stop()?;
            info!("Arc off");
        }

        Ok(())
    }

    pub(crate) fn is_process_active(&self) -> bool {
        self.process_active.lock().map(|a| *a).unwrap_or(false)
    }

    /// Record the outcome of execution.
    ///
    /// If the task was stopped while executing the stop takes precedence over the outcome.
    fn finish(&self, outcome: TaskOutcome) -> Result<TaskOutcome, WeldCtrlError> {
        let mut status = self.status.write()?;
        status.is_running = false;

        if status.state != WeldCtrlState::TaskRunning {
            return Ok(TaskOutcome::Stopped);
        }

        match &outcome {
            TaskOutcome::Completed => status.state = WeldCtrlState::Completed,
            TaskOutcome::Failed(msg) => {
                status.state = WeldCtrlState::Failed;
                status.error_message = Some(msg.clone());
            }
            TaskOutcome::Stopped => status.state = WeldCtrlState::Stopped,
        }

        Ok(outcome)
    }
}
