//! Process monitor thread

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{error, info, warn};
use std::{sync::atomic::Ordering, thread, time::Duration};

use super::Shared;
use eqpt_if::SensorData;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Poll the process sensors until the run flag is cleared.
///
/// The monitor only acts on the equipment, it never changes the controller's state.
pub(super) fn run(shared: &Shared) {
    info!("Process monitor started");

    let period = Duration::from_secs_f64(shared.params.monitor_period_s);

    while shared.run.load(Ordering::Acquire) {
        match shared.eqpt.sensors.read_sensors() {
            Ok(data) => {
                if !record(shared, data) {
                    break;
                }
                check(shared, &data);
            }
            Err(e) => warn!("Could not read the process sensors: {}", e),
        }

        thread::sleep(period);
    }

    info!("Process monitor stopped");
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Write the readings into the status, returning false if the status is unusable.
fn record(shared: &Shared, data: SensorData) -> bool {
    match shared.status.write() {
        Ok(mut status) => {
            status.sensors = data;
            true
        }
        Err(_) => {
            error!("Status lock poisoned, stopping the monitor");
            false
        }
    }
}

fn check(shared: &Shared, data: &SensorData) {
    let params = &shared.params;

    // Voltage is only meaningful with the arc on
    if shared.is_process_active() {
        if let Ok(weld_params) = shared.weld_params.read() {
            let deviation_v = data.voltage_v - weld_params.voltage_v;
            if deviation_v.abs() > params.voltage_deviation_limit_v {
                warn!(
                    "Voltage deviation detected: measured {:.2} V, commanded {:.2} V",
                    data.voltage_v, weld_params.voltage_v
                );
            }
        }
    }

    if data.temperature_degc > params.temp_limit_degc {
        warn!(
            "High temperature detected: {:.1} degC, reducing current",
            data.temperature_degc
        );
        if let Err(e) = shared
            .eqpt
            .weld
            .reduce_current(params.current_reduction_factor)
        {
            error!("Could not reduce the current: {}", e);
        }
    }
}
