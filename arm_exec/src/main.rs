//! Main arm-side executable entry point.
//!
//! # Architecture
//!
//! The executable runs a single demonstration weld on a simulated cell:
//!
//!     - Initialise the session and logger
//!     - Load the executable and weld controller parameters
//!     - Initialise the weld controller with the simulated equipment
//!     - Execute the demo task on a worker thread, logging the live status
//!       periodically until it finishes
//!     - Log the final status and shut down

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{error, info, warn};
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

// Internal
use arm_lib::{
    params::ArmExecParams,
    sim_eqpt::SimCell,
    weld_ctrl::{TaskOutcome, WeldCtrl, WeldStatus},
};
use util::{
    logger::{logger_init, logger_shutdown},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("arm_exec", "sessions").wrap_err("Failed to create the session")?;

    // ---- LOAD PARAMETERS ----

    let exec_params =
        ArmExecParams::load("arm_exec.toml").wrap_err("Could not load exec params")?;

    // Initialise logger
    logger_init(exec_params.log_level, &session).wrap_err("Failed to initialise logging")?;

    info!("Welding Cell Arm Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    info!("Exec parameters loaded");

    // ---- INITIALISE WELD CONTROLLER ----

    info!("Initialising simulated cell...");

    let cell = SimCell::new(&exec_params.sim_start_joints_rad);

    let mut weld_ctrl = WeldCtrl::new();
    weld_ctrl
        .init_from_file(&exec_params.weld_ctrl_params, cell.eqpt())
        .wrap_err("Failed to initialise WeldCtrl")?;
    let weld_ctrl = Arc::new(weld_ctrl);

    info!("Initialisation complete\n");

    // ---- EXECUTE DEMO TASK ----

    let task = exec_params.demo_task.to_task();
    session::save("demo_task.json", task.clone());

    info!("Executing demo task:");
    info!("    Material: {:?}", task.material);
    info!("    Thickness: {:.1} mm", task.thickness_mm);
    info!("    Voltage: {:.1} V", task.params.voltage_v);
    info!("    Current: {:.1} A", task.params.current_a);
    info!("    Speed: {:.1} mm/s\n", task.params.speed_mms);

    let task_ctrl = weld_ctrl.clone();
    let task_handle = thread::Builder::new()
        .name("demo_task".into())
        .spawn(move || task_ctrl.execute_task(&task))
        .wrap_err("Failed to spawn the task thread")?;

    let status_period = Duration::from_secs_f64(exec_params.status_period_s);
    let start = Instant::now();

    while !task_handle.is_finished() {
        match weld_ctrl.current_status() {
            Ok(s) => log_status(&s),
            Err(e) => warn!("Could not get the status: {}", e),
        }
        thread::sleep(status_period);
    }

    let outcome = task_handle
        .join()
        .map_err(|_| eyre!("The task thread panicked"))?;

    info!(
        "Demo task finished after {:.2} s",
        start.elapsed().as_secs_f64()
    );

    match outcome {
        Ok(TaskOutcome::Completed) => info!("Outcome: completed"),
        Ok(TaskOutcome::Stopped) => warn!("Outcome: stopped"),
        Ok(TaskOutcome::Failed(msg)) => error!("Outcome: failed - {}", msg),
        Err(e) => error!("Task rejected: {}", e),
    }

    // ---- SHUTDOWN ----

    let final_status = weld_ctrl
        .current_status()
        .wrap_err("Could not get the final status")?;
    info!("Final status:");
    log_status(&final_status);
    session::save("final_status.json", final_status);

    info!("End of execution");

    logger_shutdown();
    session.exit();

    Ok(())
}

/// Log a one line summary of the status.
fn log_status(status: &WeldStatus) {
    let p = status.current_pose.translation.vector;

    info!(
        "{:?} - waypoint {}/{}, torch at ({:.4}, {:.4}, {:.4}) m, {:.1} V, {:.1} A, {:.1} degC",
        status.state,
        status.waypoint_index,
        status.num_waypoints,
        p.x,
        p.y,
        p.z,
        status.sensors.voltage_v,
        status.sensors.current_a,
        status.sensors.temperature_degc
    );

    if let Some(msg) = &status.error_message {
        warn!("    Error: {}", msg);
    }
}
