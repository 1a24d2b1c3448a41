//! Missions shipped with the crate.

use std::time::Duration;

use async_trait::async_trait;

use super::{GuardedVehicle, Mission};
use crate::error::Result;
use crate::link::VehicleControl;

/// Drive straight ahead for a number of fixed-length steps, then stop.
#[derive(Debug, Clone)]
pub struct ForwardSweep {
    pub steps: u32,
    pub speed: f32,
    pub step_interval: Duration,
}

impl Default for ForwardSweep {
    fn default() -> Self {
        Self {
            steps: 50,
            speed: 10.0,
            step_interval: Duration::from_secs(1),
        }
    }
}

#[async_trait]
impl Mission for ForwardSweep {
    fn name(&self) -> &str {
        "forward-sweep"
    }

    async fn run(&self, vehicle: &GuardedVehicle) -> Result<()> {
        for step in 1..=self.steps {
            vehicle.set_movement(self.speed, 0.0, 0.0)?;
            vehicle.log(format!("step {step}: moving forward"));
            vehicle.sleep(self.step_interval).await?;
        }

        vehicle.set_movement(0.0, 0.0, 0.0)?;
        vehicle.log("sweep finished");
        Ok(())
    }
}
