//! SSR (solid-state relay) lighting controller: two channels tied to show
//! states.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{SsrChannelConfig, SsrConfig};
use crate::events::SsrEvent;
use crate::serial::{Level, SerialDispatcher};

#[derive(Debug, Default)]
struct ChannelState {
    requested: bool,
    asserted: bool,
    /// Bumped by `release_all`; a worker compares its captured value after
    /// waking from `pre_delay_ms` and drops the assert if it no longer matches.
    generation: u64,
}

/// Drives SSR1 ("caption lighting") and SSR2 ("spotlight"). Each activation
/// runs its pre-delay on its own short-lived worker thread, reusing the
/// serial dispatcher for the actual pin write so I3/I6 still hold end to end.
pub struct SsrController {
    config: SsrConfig,
    dispatcher: SerialDispatcher,
    ssr1: Arc<Mutex<ChannelState>>,
    ssr2: Arc<Mutex<ChannelState>>,
}

impl SsrController {
    pub fn new(config: SsrConfig, dispatcher: SerialDispatcher) -> Self {
        Self {
            config,
            dispatcher,
            ssr1: Arc::new(Mutex::new(ChannelState::default())),
            ssr2: Arc::new(Mutex::new(ChannelState::default())),
        }
    }

    /// Entering `Caption`.
    pub fn request_caption_lighting(&self, on_event: impl Fn(SsrEvent) + Send + 'static) {
        self.request(self.ssr1.clone(), self.config.ssr1, SsrEvent::CaptionLightingReady, on_event);
    }

    /// Entering `Spotlight`.
    pub fn request_spotlight(&self, on_event: impl Fn(SsrEvent) + Send + 'static) {
        self.request(self.ssr2.clone(), self.config.ssr2, SsrEvent::SpotlightReady, on_event);
    }

    /// Idempotent: a channel already requested or asserted ignores a repeat
    /// request.
    fn request(
        &self,
        state: Arc<Mutex<ChannelState>>,
        channel: SsrChannelConfig,
        ready_event: SsrEvent,
        on_event: impl Fn(SsrEvent) + Send + 'static,
    ) {
        let generation = {
            let mut s = state.lock();
            if s.requested || s.asserted {
                return;
            }
            s.requested = true;
            s.generation
        };
        let dispatcher = self.dispatcher.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(channel.pre_delay_ms));
            let mut s = state.lock();
            if s.generation != generation {
                // a reset raced this activation; the pin was already released
                // (or is about to be), don't assert it back HIGH.
                return;
            }
            dispatcher.enqueue_set(channel.pin, Level::High, 0);
            s.asserted = true;
            drop(s);
            on_event(ready_event);
        });
    }

    /// Entering `Reset`, or an explicit `stop_all_lighting`: release every
    /// asserted (or in-flight) pin concurrently, no per-channel delay (I3:
    /// driven LOW again before the conductor re-enters Detecting).
    pub fn release_all(&self) {
        for (state, channel) in [(&self.ssr1, self.config.ssr1), (&self.ssr2, self.config.ssr2)] {
            let mut s = state.lock();
            s.generation += 1;
            if s.asserted || s.requested {
                self.dispatcher.enqueue_set(channel.pin, Level::Low, 0);
                s.asserted = false;
                s.requested = false;
            }
        }
    }

    pub fn is_caption_lighting_asserted(&self) -> bool {
        self.ssr1.lock().asserted
    }

    pub fn is_spotlight_asserted(&self) -> bool {
        self.ssr2.lock().asserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SsrChannelConfig;
    use std::time::Duration;

    fn harness() -> (SsrController, crossbeam_channel::Receiver<super::super::serial::Command>) {
        let (dispatcher, receiver, _pin_state) = SerialDispatcher::new(16);
        let config = SsrConfig {
            ssr1: SsrChannelConfig { pin: 6, pre_delay_ms: 0, post_delay_ms: 0 },
            ssr2: SsrChannelConfig { pin: 7, pre_delay_ms: 0, post_delay_ms: 0 },
        };
        (SsrController::new(config, dispatcher), receiver)
    }

    #[test]
    fn request_caption_lighting_asserts_ssr1_pin() {
        let (controller, receiver) = harness();
        let (tx, rx) = crossbeam_channel::bounded(1);
        controller.request_caption_lighting(move |e| {
            let _ = tx.send(e);
        });
        rx.recv_timeout(Duration::from_secs(1)).expect("ready event");
        assert!(controller.is_caption_lighting_asserted());
        let cmd = receiver.recv_timeout(Duration::from_secs(1)).expect("set command");
        match cmd {
            super::super::serial::Command::Set(s) => {
                assert_eq!(s.pin, 6);
                assert_eq!(s.level, Level::High);
            }
            _ => panic!("expected Set command"),
        }
    }

    #[test]
    fn repeated_request_is_idempotent() {
        let (controller, receiver) = harness();
        let (tx, rx) = crossbeam_channel::bounded(2);
        let tx2 = tx.clone();
        controller.request_caption_lighting(move |e| {
            let _ = tx.send(e);
        });
        rx.recv_timeout(Duration::from_secs(1)).unwrap();
        controller.request_caption_lighting(move |e| {
            let _ = tx2.send(e);
        });
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err(), "second request should be a no-op");
        // only one Set command reached the dispatcher
        receiver.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(receiver.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn release_all_drives_every_asserted_pin_low() {
        let (controller, receiver) = harness();
        let (tx, rx) = crossbeam_channel::bounded(2);
        let tx2 = tx.clone();
        controller.request_caption_lighting(move |e| {
            let _ = tx.send(e);
        });
        controller.request_spotlight(move |e| {
            let _ = tx2.send(e);
        });
        rx.recv_timeout(Duration::from_secs(1)).unwrap();
        rx.recv_timeout(Duration::from_secs(1)).unwrap();
        // drain the two HIGH Set commands
        receiver.recv_timeout(Duration::from_secs(1)).unwrap();
        receiver.recv_timeout(Duration::from_secs(1)).unwrap();

        controller.release_all();
        assert!(!controller.is_caption_lighting_asserted());
        assert!(!controller.is_spotlight_asserted());

        let mut lows = Vec::new();
        for _ in 0..2 {
            lows.push(receiver.recv_timeout(Duration::from_secs(1)).unwrap());
        }
        for cmd in lows {
            match cmd {
                super::super::serial::Command::Set(s) => assert_eq!(s.level, Level::Low),
                _ => panic!("expected Set command"),
            }
        }
    }
}
