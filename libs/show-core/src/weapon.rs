//! Weapon sequencer: times per-tool fade-in/display/fade-out and emits
//! actuator pulses.

use std::time::Duration;

use crate::config::WeaponConfig;
use crate::serial::SerialDispatcher;

/// Visual/lifecycle events the sequencer emits as it walks a tool-id list.
#[derive(Debug, Clone)]
pub enum WeaponEvent {
    ShowImage {
        id: String,
        image_path: String,
        fade_in_s: f32,
        display_s: f32,
        fade_out_s: f32,
    },
    SequenceComplete,
}

pub struct WeaponSequencer {
    config: WeaponConfig,
    dispatcher: SerialDispatcher,
}

impl WeaponSequencer {
    pub fn new(config: WeaponConfig, dispatcher: SerialDispatcher) -> Self {
        Self { config, dispatcher }
    }

    /// Runs the full image+pulse sequence for `ids` (already validated
    /// against config by the caller — see `WeaponConfig::validate_tool_ids`)
    /// to completion. Blocking; callers run this on its own thread, since the
    /// per-tool `sleep` below would otherwise stall the main/UI thread.
    /// `sleep` is injected so tests can skip real waits.
    pub fn run_sequence(
        &self,
        ids: &[String],
        weapon_switch_delay: f32,
        sleep: impl Fn(Duration),
        mut on_event: impl FnMut(WeaponEvent),
    ) {
        for id in ids {
            let Some(tool) = self.config.get(id) else {
                tracing::warn!(id, "weapon sequencer: unknown tool id, skipping");
                continue;
            };

            on_event(WeaponEvent::ShowImage {
                id: tool.id.clone(),
                image_path: tool.image_path.clone(),
                fade_in_s: tool.fade_in_s,
                display_s: tool.display_s,
                fade_out_s: tool.fade_out_s,
            });

            match tool.pin {
                Some(pin) => {
                    self.dispatcher.enqueue_pulse(pin, tool.pre_delay_ms, tool.pulse_high_ms, tool.post_delay_ms);
                }
                None => tracing::debug!(id = tool.id.as_str(), "weapon sequencer: no pin configured, visual only"),
            }

            let total = tool.sequence_duration(weapon_switch_delay);
            sleep(Duration::from_secs_f32(total.max(0.0)));
        }
        on_event(WeaponEvent::SequenceComplete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn config_with(rows: &str) -> WeaponConfig {
        let dir = crate::test_support::scratch_dir("weapon-sequencer");
        let path = dir.join("weapon_config.csv");
        std::fs::write(
            &path,
            format!("id,display_name,pin,image_path,pre_delay_ms,pulse_high_ms,post_delay_ms,fade_in_s,display_s,fade_out_s\n{rows}"),
        )
        .unwrap();
        let cfg = WeaponConfig::load(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();
        cfg
    }

    fn no_sleep(_: Duration) {}

    #[test]
    fn pulses_are_enqueued_in_display_order() {
        let config = config_with(
            "01,Shield,4,shield.png,0,100,0,0.1,0.1,0.1\n02,Net,5,net.png,0,100,0,0.1,0.1,0.1\n",
        );
        let (dispatcher, receiver, _pin_state) = SerialDispatcher::new(16);
        let sequencer = WeaponSequencer::new(config, dispatcher);

        sequencer.run_sequence(
            &["01".to_string(), "02".to_string()],
            0.0,
            no_sleep,
            |_| {},
        );

        let first = receiver.recv_timeout(Duration::from_secs(1)).unwrap();
        let second = receiver.recv_timeout(Duration::from_secs(1)).unwrap();
        match (first, second) {
            (crate::serial::Command::Pulse(a), crate::serial::Command::Pulse(b)) => {
                assert_eq!(a.pin, 4);
                assert_eq!(b.pin, 5);
            }
            _ => panic!("expected two pulse commands"),
        }
    }

    #[test]
    fn unknown_id_is_skipped_without_pulse() {
        let config = config_with("01,Shield,4,shield.png,0,100,0,0.1,0.1,0.1\n");
        let (dispatcher, receiver, _pin_state) = SerialDispatcher::new(16);
        let sequencer = WeaponSequencer::new(config, dispatcher);

        let events = Arc::new(Mutex::new(Vec::new()));
        let events2 = events.clone();
        sequencer.run_sequence(
            &["99".to_string(), "01".to_string()],
            0.0,
            no_sleep,
            move |e| events2.lock().unwrap().push(e),
        );

        assert!(receiver.try_recv().is_ok(), "the known tool's pulse should still fire");
        assert!(receiver.try_recv().is_err(), "the unknown tool contributes no pulse");
        let seen = events.lock().unwrap();
        assert!(matches!(seen.last(), Some(WeaponEvent::SequenceComplete)));
    }

    #[test]
    fn tool_with_no_pin_still_shows_visual() {
        let config = config_with("02,Net,,net.png,0,0,0,0.1,0.1,0.1\n");
        let (dispatcher, receiver, _pin_state) = SerialDispatcher::new(16);
        let sequencer = WeaponSequencer::new(config, dispatcher);

        let events = Arc::new(Mutex::new(Vec::new()));
        let events2 = events.clone();
        sequencer.run_sequence(&["02".to_string()], 0.0, no_sleep, move |e| events2.lock().unwrap().push(e));

        assert!(receiver.try_recv().is_err(), "no pin means no pulse");
        let seen = events.lock().unwrap();
        assert!(matches!(seen.first(), Some(WeaponEvent::ShowImage { id, .. }) if id == "02"));
    }
}
