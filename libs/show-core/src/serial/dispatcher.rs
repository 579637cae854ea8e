//! The serial dispatcher: owns the MCU link, serializes pin-level and pulse
//! commands through a FIFO drained by a single worker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::Result;
use crate::events;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    fn wire_prefix(self) -> char {
        match self {
            Level::High => 'H',
            Level::Low => 'L',
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PulseCommand {
    pub pin: u8,
    pub pre_delay_ms: u64,
    pub high_ms: u64,
    pub post_delay_ms: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct SetCommand {
    pub pin: u8,
    pub level: Level,
    pub pre_delay_ms: u64,
}

#[derive(Debug, Clone, Copy)]
pub enum Command {
    Pulse(PulseCommand),
    Set(SetCommand),
}

/// What the dispatcher writes bytes to. Real implementations wrap
/// `serialport::SerialPort`; tests use an in-memory recorder.
pub trait SerialLink: Send {
    fn write_line(&mut self, line: &str) -> Result<()>;
}

pub type PinStateMap = Arc<Mutex<HashMap<u8, Level>>>;

/// Every pin the engine will ever drive: the weapon pulses plus the two SSR
/// channels. Fed to [`run_worker`] so the boot handshake covers exactly the
/// pins in use, not a fixed range.
pub fn boot_pins(weapon: &crate::config::WeaponConfig, ssr: &crate::config::SsrConfig) -> Vec<u8> {
    let mut pins: Vec<u8> = weapon.pins().collect();
    pins.push(ssr.ssr1.pin);
    pins.push(ssr.ssr2.pin);
    pins.sort_unstable();
    pins.dedup();
    pins
}

/// The producer-facing handle. Cheap to clone; every clone enqueues onto the
/// same FIFO — every other thread mutates the MCU link only by posting
/// commands.
#[derive(Clone)]
pub struct SerialDispatcher {
    sender: crossbeam_channel::Sender<Command>,
    pin_state: PinStateMap,
    closed: Arc<std::sync::atomic::AtomicBool>,
}

impl SerialDispatcher {
    /// Creates the dispatcher handle plus the receiver and pin-state map the
    /// worker thread needs. Queue capacity is generous; `enqueue` drops (and
    /// logs) on overflow rather than blocking its caller, which must never
    /// block.
    pub fn new(capacity: usize) -> (Self, crossbeam_channel::Receiver<Command>, PinStateMap) {
        let (sender, receiver) = events::channel(capacity);
        let pin_state = Arc::new(Mutex::new(HashMap::new()));
        (
            Self { sender, pin_state: pin_state.clone(), closed: Arc::new(std::sync::atomic::AtomicBool::new(false)) },
            receiver,
            pin_state,
        )
    }

    pub fn enqueue(&self, command: Command) {
        if self.closed.load(std::sync::atomic::Ordering::Acquire) {
            tracing::warn!("serial dispatcher: port closed, dropping command");
            return;
        }
        events::try_post(&self.sender, command, "serial");
    }

    pub fn enqueue_pulse(&self, pin: u8, pre_delay_ms: u64, high_ms: u64, post_delay_ms: u64) {
        self.enqueue(Command::Pulse(PulseCommand { pin, pre_delay_ms, high_ms, post_delay_ms }));
    }

    pub fn enqueue_set(&self, pin: u8, level: Level, pre_delay_ms: u64) {
        self.enqueue(Command::Set(SetCommand { pin, level, pre_delay_ms }));
    }

    pub fn last_known_level(&self, pin: u8) -> Option<Level> {
        self.pin_state.lock().get(&pin).copied()
    }

    /// Surfaced after a write error: the dispatcher stops accepting further
    /// commands.
    pub fn mark_closed(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(std::sync::atomic::Ordering::Acquire)
    }

    /// A handle `run_worker` can use to signal closure without keeping the
    /// producer-facing `Sender` alive (which would prevent the worker's
    /// receive loop from ever observing channel disconnection).
    pub fn closed_flag(&self) -> Arc<std::sync::atomic::AtomicBool> {
        self.closed.clone()
    }
}

/// Drains `receiver` on the current thread, applying the MCU boot handshake
/// first. Never returns until the channel disconnects or a write fails.
/// `sleep` is injected so tests can replace real delays with a no-op.
/// `boot_pins` is every pin the dispatcher will ever be asked to drive — the
/// union of the weapon and SSR pin assignments, derived from config rather
/// than hardcoded — so a newly wired pin always starts from a known LOW
/// state.
pub fn run_worker(
    receiver: &crossbeam_channel::Receiver<Command>,
    link: &mut impl SerialLink,
    pin_state: &PinStateMap,
    closed: &std::sync::atomic::AtomicBool,
    boot_pins: &[u8],
    sleep: impl Fn(Duration),
) {
    sleep(Duration::from_secs(2));
    let mut pins: Vec<u8> = boot_pins.to_vec();
    pins.sort_unstable();
    pins.dedup();
    for pin in pins {
        if let Err(e) = link.write_line(&format!("L{pin}")) {
            tracing::error!("serial dispatcher: boot handshake write failed: {e}");
            closed.store(true, std::sync::atomic::Ordering::Release);
            return;
        }
        pin_state.lock().insert(pin, Level::Low);
    }

    for command in receiver.iter() {
        if let Err(e) = execute(command, link, pin_state, &sleep) {
            tracing::error!("serial dispatcher: write failed, closing: {e}");
            closed.store(true, std::sync::atomic::Ordering::Release);
            return;
        }
    }
}

fn execute(
    command: Command,
    link: &mut impl SerialLink,
    pin_state: &PinStateMap,
    sleep: &impl Fn(Duration),
) -> Result<()> {
    match command {
        Command::Pulse(p) => {
            sleep(Duration::from_millis(p.pre_delay_ms));
            write_level(link, pin_state, p.pin, Level::High)?;
            sleep(Duration::from_millis(p.high_ms));
            write_level(link, pin_state, p.pin, Level::Low)?;
            sleep(Duration::from_millis(p.post_delay_ms));
        }
        Command::Set(s) => {
            sleep(Duration::from_millis(s.pre_delay_ms));
            write_level(link, pin_state, s.pin, s.level)?;
        }
    }
    Ok(())
}

fn write_level(link: &mut impl SerialLink, pin_state: &PinStateMap, pin: u8, level: Level) -> Result<()> {
    link.write_line(&format!("{}{pin}", level.wire_prefix()))?;
    pin_state.lock().insert(pin, level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingLink {
        lines: Arc<StdMutex<Vec<String>>>,
    }

    impl SerialLink for RecordingLink {
        fn write_line(&mut self, line: &str) -> Result<()> {
            self.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }
    }

    fn no_sleep(_: Duration) {}

    const TEST_BOOT_PINS: [u8; 4] = [2, 4, 6, 7];

    #[test]
    fn pulse_writes_high_then_low() {
        let (dispatcher, receiver, pin_state) = SerialDispatcher::new(16);
        dispatcher.enqueue_pulse(4, 0, 0, 0);
        let closed = dispatcher.closed_flag();
        drop(dispatcher);

        let lines = Arc::new(StdMutex::new(Vec::new()));
        let mut link = RecordingLink { lines: lines.clone() };
        run_worker(&receiver, &mut link, &pin_state, &closed, &TEST_BOOT_PINS, no_sleep);

        let captured = lines.lock().unwrap();
        // boot handshake followed by H4, L4
        assert_eq!(captured[captured.len() - 2], "H4");
        assert_eq!(captured[captured.len() - 1], "L4");
    }

    #[test]
    fn boot_handshake_covers_exactly_the_configured_pins() {
        let (dispatcher, receiver, pin_state) = SerialDispatcher::new(16);
        let closed = dispatcher.closed_flag();
        drop(dispatcher);

        let lines = Arc::new(StdMutex::new(Vec::new()));
        let mut link = RecordingLink { lines: lines.clone() };
        run_worker(&receiver, &mut link, &pin_state, &closed, &TEST_BOOT_PINS, no_sleep);

        let captured = lines.lock().unwrap();
        assert_eq!(*captured, vec!["L2", "L4", "L6", "L7"]);
    }

    #[test]
    fn fifo_preserves_enqueue_order_across_producers() {
        let (dispatcher, receiver, pin_state) = SerialDispatcher::new(1024);
        let mut handles = Vec::new();
        for producer in 0..4u8 {
            let d = dispatcher.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..100u8 {
                    d.enqueue_set(producer, if i % 2 == 0 { Level::High } else { Level::Low }, 0);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let closed = dispatcher.closed_flag();
        drop(dispatcher);

        let lines = Arc::new(StdMutex::new(Vec::new()));
        let mut link = RecordingLink { lines: lines.clone() };
        run_worker(&receiver, &mut link, &pin_state, &closed, &TEST_BOOT_PINS, no_sleep);

        let captured = lines.lock().unwrap();
        // boot handshake writes 4 lines, then 400 command lines
        assert_eq!(captured.len(), 4 + 400);
    }

    #[test]
    fn closed_dispatcher_drops_new_commands() {
        let (dispatcher, _receiver, _pin_state) = SerialDispatcher::new(4);
        dispatcher.mark_closed();
        dispatcher.enqueue_set(2, Level::High, 0);
        assert!(dispatcher.is_closed());
    }
}
