//! The caption engine: typed-out bilingual subtitles driven by TTS progress,
//! with the "mid-sentence unstick" forced-completion rules.

use std::time::{Duration, Instant};

use crate::events::CaptionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Fixed-timer typing, advancing whichever language lags. The
    /// lagging-only rule was chosen over "advance both every tick".
    NonTts,
    /// Driven by `on_tts_progress`.
    TtsSync,
}

#[derive(Debug, Clone)]
pub struct CaptionEngineConfig {
    /// ms/char for the non-TTS fallback; clamped to a 30 ms floor.
    pub typing_speed_ms: f32,
    /// Grace period after both languages and TTS finish before `all_done`.
    pub caption_wait_after: Duration,
}

struct Session {
    full_en: Vec<char>,
    full_tc: Vec<char>,
    display_en_len: usize,
    display_tc_len: usize,
    /// Monotonic target from the TTS adapter (TTS-sync mode only).
    tts_position: usize,
    last_received_pos: Option<usize>,
    last_progress_at: Instant,
    tts_done: bool,
    grace_deadline: Option<Instant>,
    en_done_fired: bool,
    tc_done_fired: bool,
    all_done_fired: bool,
    mode: DisplayMode,
    last_nontts_step_at: Instant,
}

/// Owns at most one active session (I5).
pub struct CaptionEngine {
    config: CaptionEngineConfig,
    session: Option<Session>,
}

impl CaptionEngine {
    pub fn new(config: CaptionEngineConfig) -> Self {
        Self { config, session: None }
    }

    /// Begin a session for a freshly-entered `Caption` state. A no-op if a
    /// session is already active (I5: re-entering `Caption` for the same
    /// screenshot must not start a second session).
    pub fn start(&mut self, caption_en: &str, caption_tc: &str, mode: DisplayMode, now: Instant) {
        if self.session.is_some() {
            tracing::warn!("caption engine: start() called with a session already active, ignoring");
            return;
        }
        self.session = Some(Session {
            full_en: caption_en.chars().collect(),
            full_tc: caption_tc.chars().collect(),
            display_en_len: 0,
            display_tc_len: 0,
            tts_position: 0,
            last_received_pos: None,
            last_progress_at: now,
            tts_done: mode == DisplayMode::NonTts,
            grace_deadline: None,
            en_done_fired: false,
            tc_done_fired: false,
            all_done_fired: false,
            mode,
            last_nontts_step_at: now,
        });
    }

    /// Destroys the active session, on entering `Reset`.
    pub fn reset(&mut self) {
        self.session = None;
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn display_en_len(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.display_en_len)
    }

    pub fn display_tc_len(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.display_tc_len)
    }

    pub fn visible_en(&self) -> String {
        self.session
            .as_ref()
            .map(|s| s.full_en[..s.display_en_len].iter().collect())
            .unwrap_or_default()
    }

    pub fn visible_tc(&self) -> String {
        self.session
            .as_ref()
            .map(|s| s.full_tc[..s.display_tc_len].iter().collect())
            .unwrap_or_default()
    }

    pub fn len_en(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.full_en.len())
    }

    pub fn len_tc(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.full_tc.len())
    }

    pub fn all_done(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.all_done_fired)
    }

    /// The adapter's progress report: `current_pos` out of `total_len`.
    /// `total_len` is expected to equal the English caption's length; a
    /// mismatch is logged but does not block the update, since `en_target`
    /// is always clamped against the session's own text. Out-of-order events
    /// (a decrease versus the last accepted position) are dropped.
    pub fn on_tts_progress(&mut self, current_pos: usize, total_len: usize, now: Instant) -> Vec<CaptionEvent> {
        let Some(session) = self.session.as_mut() else { return Vec::new() };
        if session.mode != DisplayMode::TtsSync {
            return Vec::new();
        }
        if total_len != session.full_en.len() {
            tracing::debug!(
                total_len,
                expected = session.full_en.len(),
                "caption engine: tts progress total_len does not match caption length"
            );
        }
        if current_pos < session.tts_position {
            tracing::warn!(
                current_pos,
                tts_position = session.tts_position,
                "caption engine: dropping out-of-order tts progress event"
            );
            return Vec::new();
        }

        let repeated = session.last_received_pos == Some(current_pos);
        let delta = current_pos - session.tts_position;
        session.last_received_pos = Some(current_pos);
        session.tts_position = current_pos;
        session.last_progress_at = now;

        if delta > 5 || repeated {
            let reason = if repeated { "repeated progress" } else { "progress jump" };
            tracing::debug!(reason, current_pos, "caption engine: force-complete");
            force_complete_to(session, current_pos);
        }

        advance_targets(session);
        self.maybe_arm_grace(now);
        self.collect_events(now)
    }

    pub fn on_tts_done(&mut self, now: Instant) -> Vec<CaptionEvent> {
        let Some(session) = self.session.as_mut() else { return Vec::new() };
        session.tts_done = true;
        self.maybe_arm_grace(now);
        self.collect_events(now)
    }

    /// Runs at ~60 Hz. Drives both the TTS-sync stall detectors and the
    /// non-TTS fixed-timer typing.
    pub fn tick(&mut self, now: Instant) -> Vec<CaptionEvent> {
        let Some(session) = self.session.as_mut() else { return Vec::new() };
        match session.mode {
            DisplayMode::TtsSync => check_stalls(session, now),
            DisplayMode::NonTts => step_non_tts(session, now, self.config.typing_speed_ms),
        }
        self.maybe_arm_grace(now);
        self.collect_events(now)
    }

    fn maybe_arm_grace(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else { return };
        if session.grace_deadline.is_none()
            && session.tts_done
            && session.display_en_len == session.full_en.len()
            && session.display_tc_len == session.full_tc.len()
        {
            session.grace_deadline = Some(now + self.config.caption_wait_after);
        }
    }

    fn collect_events(&mut self, now: Instant) -> Vec<CaptionEvent> {
        let Some(session) = self.session.as_mut() else { return Vec::new() };
        let mut events = Vec::new();
        if !session.en_done_fired && session.display_en_len == session.full_en.len() {
            session.en_done_fired = true;
            events.push(CaptionEvent::EnglishDone);
        }
        if !session.tc_done_fired && session.display_tc_len == session.full_tc.len() {
            session.tc_done_fired = true;
            events.push(CaptionEvent::TraditionalChineseDone);
        }
        if !session.all_done_fired {
            if let Some(deadline) = session.grace_deadline {
                if now >= deadline {
                    session.all_done_fired = true;
                    events.push(CaptionEvent::AllDone);
                }
            }
        }
        events
    }
}

fn en_target(session: &Session) -> usize {
    session.tts_position.min(session.full_en.len())
}

fn tc_target_for(session: &Session, en_t: usize) -> usize {
    let len_en = session.full_en.len();
    if len_en == 0 {
        return session.full_tc.len();
    }
    (((en_t as f64 / len_en as f64) * session.full_tc.len() as f64).floor() as usize).min(session.full_tc.len())
}

fn advance_targets(session: &mut Session) {
    let en_t = en_target(session);
    if en_t > session.display_en_len {
        session.display_en_len = en_t;
    }
    let tc_t = tc_target_for(session, en_t);
    if tc_t > session.display_tc_len {
        session.display_tc_len = tc_t;
    }
}

fn force_complete_to(session: &mut Session, pos: usize) {
    let en_t = pos.min(session.full_en.len());
    if en_t > session.display_en_len {
        session.display_en_len = en_t;
    }
    let tc_t = tc_target_for(session, en_t);
    if tc_t > session.display_tc_len {
        session.display_tc_len = tc_t;
    }
}

fn check_stalls(session: &mut Session, now: Instant) {
    let len_en = session.full_en.len();
    if len_en == 0 {
        return;
    }
    let en_t = en_target(session);
    let elapsed = now.saturating_duration_since(session.last_progress_at);

    if en_t as f64 >= 0.9 * len_en as f64 && elapsed > Duration::from_millis(300) {
        force_complete_to(session, len_en);
    } else if en_t as f64 > 0.7 * len_en as f64
        && elapsed > Duration::from_millis(200)
        && en_t == session.display_en_len
    {
        let push_en = (session.display_en_len + 3).min(len_en);
        let push_tc = (session.display_tc_len + 2).min(session.full_tc.len());
        if push_en > session.display_en_len {
            session.display_en_len = push_en;
        }
        if push_tc > session.display_tc_len {
            session.display_tc_len = push_tc;
        }
    }
}

fn step_non_tts(session: &mut Session, now: Instant, typing_speed_ms: f32) {
    let step = Duration::from_millis(typing_speed_ms.max(30.0) as u64);
    let len_en = session.full_en.len();
    let len_tc = session.full_tc.len();
    while now.saturating_duration_since(session.last_nontts_step_at) >= step
        && (session.display_en_len < len_en || session.display_tc_len < len_tc)
    {
        let en_frac = frac(session.display_en_len, len_en);
        let tc_frac = frac(session.display_tc_len, len_tc);
        if en_frac <= tc_frac && session.display_en_len < len_en {
            session.display_en_len += 1;
        } else if session.display_tc_len < len_tc {
            session.display_tc_len += 1;
        } else if session.display_en_len < len_en {
            session.display_en_len += 1;
        }
        session.last_nontts_step_at += step;
    }
}

fn frac(len: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        len as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CaptionEngineConfig {
        CaptionEngineConfig { typing_speed_ms: 30.0, caption_wait_after: Duration::from_millis(100) }
    }

    #[test]
    fn monotonic_under_fuzzed_progress() {
        let mut engine = CaptionEngine::new(cfg());
        let t0 = Instant::now();
        engine.start("First sentence. Second sentence.", "第一句。第二句。", DisplayMode::TtsSync, t0);

        let sequence = [5usize, 3, 5, 5, 40, 12, 31, 31, 2, 31];
        let mut last_en = 0;
        let mut last_tc = 0;
        for pos in sequence {
            engine.on_tts_progress(pos, engine.len_en(), t0);
            assert!(engine.display_en_len() >= last_en);
            assert!(engine.display_tc_len() >= last_tc);
            assert!(engine.display_en_len() <= 32);
            last_en = engine.display_en_len();
            last_tc = engine.display_tc_len();
        }
    }

    #[test]
    fn progress_jump_force_completes() {
        let mut engine = CaptionEngine::new(cfg());
        let t0 = Instant::now();
        engine.start("0123456789", "零一二三四五六七八九", DisplayMode::TtsSync, t0);
        engine.on_tts_progress(2, engine.len_en(), t0);
        assert_eq!(engine.display_en_len(), 2);
        // jump of 6 > 5 chars
        engine.on_tts_progress(8, engine.len_en(), t0);
        assert_eq!(engine.display_en_len(), 8);
    }

    #[test]
    fn repeated_identical_progress_force_completes() {
        let mut engine = CaptionEngine::new(cfg());
        let t0 = Instant::now();
        engine.start("First sentence. Second sentence.", "第一句。第二句。", DisplayMode::TtsSync, t0);
        engine.on_tts_progress(7, engine.len_en(), t0);
        let after_first = engine.display_en_len();
        engine.on_tts_progress(7, engine.len_en(), t0);
        assert_eq!(engine.display_en_len(), 7);
        assert!(engine.display_en_len() >= after_first);
    }

    #[test]
    fn near_end_stall_forces_completion() {
        let mut engine = CaptionEngine::new(cfg());
        let t0 = Instant::now();
        let text = "0123456789"; // len 10, 0.9*10 = 9
        engine.start(text, "零一二三四五六七八九", DisplayMode::TtsSync, t0);
        engine.on_tts_progress(9, engine.len_en(), t0);
        assert_eq!(engine.display_en_len(), 9);
        let t1 = t0 + Duration::from_millis(301);
        engine.tick(t1);
        assert_eq!(engine.display_en_len(), 10);
    }

    #[test]
    fn mid_clause_stall_nudges_forward() {
        let mut engine = CaptionEngine::new(cfg());
        let t0 = Instant::now();
        let text = "0123456789"; // 0.7*10 = 7
        engine.start(text, "零一二三四五六七八九", DisplayMode::TtsSync, t0);
        engine.on_tts_progress(8, engine.len_en(), t0);
        assert_eq!(engine.display_en_len(), 8);
        let t1 = t0 + Duration::from_millis(201);
        engine.tick(t1);
        assert_eq!(engine.display_en_len(), 10.min(8 + 3));
    }

    #[test]
    fn scenario_s2_subtitle_unstick() {
        // subtitle unstick scenario
        let mut engine = CaptionEngine::new(CaptionEngineConfig {
            typing_speed_ms: 30.0,
            caption_wait_after: Duration::from_millis(100),
        });
        let t0 = Instant::now();
        let full_en = "First sentence. Second sentence.";
        engine.start(full_en, "第一句。第二句。", DisplayMode::TtsSync, t0);

        engine.on_tts_progress(7, engine.len_en(), t0 + Duration::from_millis(100));
        engine.on_tts_progress(7, engine.len_en(), t0 + Duration::from_millis(200));
        assert_eq!(engine.display_en_len(), 7, "repeat at 200ms forces completion to 7");

        engine.on_tts_progress(15, engine.len_en(), t0 + Duration::from_millis(1200));
        engine.on_tts_progress(15, engine.len_en(), t0 + Duration::from_millis(1300));
        assert!(engine.display_en_len() >= 15);

        engine.on_tts_progress(full_en.chars().count(), engine.len_en(), t0 + Duration::from_millis(2600));
        assert_eq!(engine.display_en_len(), full_en.chars().count());
    }

    #[test]
    fn non_tts_mode_advances_lagging_language() {
        let mut engine = CaptionEngine::new(CaptionEngineConfig {
            typing_speed_ms: 30.0,
            caption_wait_after: Duration::from_millis(50),
        });
        let t0 = Instant::now();
        engine.start("abcd", "一二三四五六", DisplayMode::NonTts, t0);

        let mut now = t0;
        for _ in 0..40 {
            now += Duration::from_millis(30);
            engine.tick(now);
        }
        assert_eq!(engine.display_en_len(), 4);
        assert_eq!(engine.display_tc_len(), 6);
    }

    #[test]
    fn all_done_requires_tts_done_and_grace() {
        let mut engine = CaptionEngine::new(cfg());
        let t0 = Instant::now();
        engine.start("hi", "你好", DisplayMode::TtsSync, t0);
        engine.on_tts_progress(2, engine.len_en(), t0);
        assert!(!engine.all_done());
        let events = engine.on_tts_done(t0 + Duration::from_millis(10));
        assert!(!events.contains(&CaptionEvent::AllDone));
        engine.tick(t0 + Duration::from_millis(200));
        assert!(engine.all_done());
    }

    proptest::proptest! {
        // I2: display lengths are monotonic non-decreasing regardless of how
        // adversarial (out-of-order, repeated, jumpy) the progress reports
        // are, and never overrun the caption's own length.
        #[test]
        fn display_lengths_are_monotonic_under_any_progress_sequence(
            positions in proptest::collection::vec(0usize..60, 0..60)
        ) {
            let text_en = "First sentence. Second sentence. A third one follows.";
            let text_tc = "第一句。第二句。第三句在此。";
            let mut engine = CaptionEngine::new(cfg());
            let t0 = Instant::now();
            engine.start(text_en, text_tc, DisplayMode::TtsSync, t0);

            let mut last_en = 0;
            let mut last_tc = 0;
            for (i, pos) in positions.into_iter().enumerate() {
                let now = t0 + Duration::from_millis(i as u64 * 10);
                engine.on_tts_progress(pos, engine.len_en(), now);
                proptest::prop_assert!(engine.display_en_len() >= last_en);
                proptest::prop_assert!(engine.display_tc_len() >= last_tc);
                proptest::prop_assert!(engine.display_en_len() <= engine.len_en());
                proptest::prop_assert!(engine.display_tc_len() <= engine.len_tc());
                last_en = engine.display_en_len();
                last_tc = engine.display_tc_len();
            }
        }
    }
}
