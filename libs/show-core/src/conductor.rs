//! The show conductor: the top-level state machine driving
//! `Detecting → ScreenshotTrigger → LlmLoading → Caption → Spotlight →
//! ImgShow → Reset → Detecting`.

use std::path::PathBuf;
use std::time::{Duration, Instant};

pub use crate::events::{ConductorCommand, ConductorEvent};
use crate::llm::LlmResponse;

/// Exhaustive, ordered show states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowState {
    Detecting,
    ScreenshotTrigger,
    LlmLoading,
    Caption,
    Spotlight,
    ImgShow,
    Reset,
}

#[derive(Debug, Clone, Copy)]
pub struct ConductorConfig {
    pub detect_duration: Duration,
    pub llm_response_timeout: Duration,
    pub cooldown_time: Duration,
    /// `--no-llm-mode`: skip `LlmLoading` and go straight to `Caption` with
    /// the default response.
    pub no_llm_mode: bool,
}

impl ConductorConfig {
    pub fn from_period(period: &crate::config::PeriodConfig, no_llm_mode: bool) -> Self {
        Self {
            detect_duration: Duration::from_secs_f32(period.detect_duration.max(0.0)),
            llm_response_timeout: Duration::from_secs_f32(period.llm_response_timeout.max(0.0)),
            cooldown_time: Duration::from_secs_f32(period.cooldown_time.max(0.0)),
            no_llm_mode,
        }
    }
}

pub struct ShowConductor {
    config: ConductorConfig,
    state: ShowState,
    face_present_since: Option<Instant>,
    llm_deadline: Option<Instant>,
    cooldown_deadline: Option<Instant>,
    /// Tool ids carried from `Caption` through `Spotlight`, handed back out
    /// in `RequestWeaponDisplay` once `ImgShow` is entered.
    pending_tool_ids: Option<Vec<String>>,
}

impl ShowConductor {
    pub fn new(config: ConductorConfig) -> Self {
        Self {
            config,
            state: ShowState::Detecting,
            face_present_since: None,
            llm_deadline: None,
            cooldown_deadline: None,
            pending_tool_ids: None,
        }
    }

    pub fn state(&self) -> ShowState {
        self.state
    }

    /// Handle one event, returning the command (if any) it produces.
    /// Events outside the current state's accepting set are dropped and
    /// logged.
    pub fn on_event(&mut self, event: ConductorEvent, now: Instant) -> Option<ConductorCommand> {
        use ConductorEvent::*;
        use ShowState::*;

        match (self.state, event) {
            (Detecting, FrameFaceUpdate(true)) => {
                self.face_present_since.get_or_insert(now);
                None
            }
            (Detecting, FrameFaceUpdate(false)) => {
                self.face_present_since = None;
                None
            }
            (ScreenshotTrigger, ScreenshotSaved(path)) => {
                if self.config.no_llm_mode {
                    self.enter_caption(LlmResponse::default_response())
                } else {
                    self.state = LlmLoading;
                    self.llm_deadline = Some(now + self.config.llm_response_timeout);
                    Some(ConductorCommand::RequestLlm(path))
                }
            }
            (LlmLoading, LlmReady(response)) => {
                self.llm_deadline = None;
                self.enter_caption(response)
            }
            // A slow LLM call can still resolve after its own timeout has
            // already pushed the conductor into `Caption` with the default
            // response; route it through `enter_caption` so the I5 guard —
            // not just the transition table's shape — is what drops it.
            (Caption, LlmReady(response)) => self.enter_caption(response),
            (Caption, CaptionComplete) => {
                self.state = Spotlight;
                Some(ConductorCommand::RequestSpotlight)
            }
            (Spotlight, SpotlightReady) => {
                self.state = ImgShow;
                let ids = self.pending_tool_ids.take().unwrap_or_default();
                Some(ConductorCommand::RequestWeaponDisplay(ids))
            }
            (ImgShow, WeaponSequenceComplete) => {
                self.state = Reset;
                self.cooldown_deadline = Some(now + self.config.cooldown_time);
                Some(ConductorCommand::RequestReset)
            }
            (Reset, CooldownElapsed) => {
                self.enter_detecting();
                None
            }
            (state, event) => {
                tracing::debug!(?state, ?event, "show conductor: event rejected in current state");
                None
            }
        }
    }

    /// Drive timer-based transitions: sustained face presence, the
    /// `LlmLoading` hard timeout, and the `Reset` cooldown. Call at the
    /// main/UI thread's render cadence.
    pub fn tick(&mut self, now: Instant) -> Option<ConductorCommand> {
        match self.state {
            ShowState::Detecting => {
                let since = self.face_present_since?;
                if now.saturating_duration_since(since) >= self.config.detect_duration {
                    self.state = ShowState::ScreenshotTrigger;
                    self.face_present_since = None;
                    Some(ConductorCommand::RequestScreenshot)
                } else {
                    None
                }
            }
            ShowState::LlmLoading => {
                let deadline = self.llm_deadline?;
                if now >= deadline {
                    self.llm_deadline = None;
                    self.enter_caption(LlmResponse::default_response())
                } else {
                    None
                }
            }
            ShowState::Reset => {
                let deadline = self.cooldown_deadline?;
                if now >= deadline {
                    self.enter_detecting();
                }
                None
            }
            _ => None,
        }
    }

    /// I5: re-entering `Caption` while a session is already active is a
    /// no-op. Stores the response's tool ids for the eventual
    /// `RequestWeaponDisplay` once `Spotlight` clears.
    fn enter_caption(&mut self, response: LlmResponse) -> Option<ConductorCommand> {
        if self.state == ShowState::Caption {
            tracing::debug!("show conductor: ignoring re-entrant Caption (I5)");
            return None;
        }
        self.state = ShowState::Caption;
        self.pending_tool_ids = Some(response.tool_ids.clone());
        Some(ConductorCommand::RequestCaptionDisplay(response))
    }

    fn enter_detecting(&mut self) {
        self.state = ShowState::Detecting;
        self.cooldown_deadline = None;
        self.face_present_since = None;
        self.pending_tool_ids = None;
    }
}
