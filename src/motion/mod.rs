// Motion control for the 3-wheel base (host-facing controller side)
//
// Provides:
// - Omniwheel inverse kinematics (x, y, theta -> wheel velocities)
// - Slew-rate limiting of wheel setpoints
// - Packets and transport trait for the motor/power controller bus
// - The per-tick motion engine with command watchdog

pub mod bus;
mod engine;
pub mod kinematics;
pub mod slew;

pub use bus::{BusDevice, ControllerBus, DriveMode};
pub use engine::MotionEngine;
pub use kinematics::xytheta_to_wheels;
pub use slew::Slew;

#[cfg(test)]
pub(crate) use engine::tests::FakeBus;
