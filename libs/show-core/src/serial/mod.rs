//! MCU link: FIFO command dispatcher plus physical port handling.

mod dispatcher;
mod port;

pub use dispatcher::{
    Command, Level, PinStateMap, PulseCommand, SerialDispatcher, SerialLink, SetCommand, boot_pins, run_worker,
};
pub use port::{likely_ports, open};
