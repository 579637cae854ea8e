//! `show`: the standalone runtime binary for the installation choreography
//! engine. Wires show-core's state machine, tracker, caption/TTS
//! co-scheduler, serial dispatcher, and SSR controller onto a seven-thread
//! model, with Null adapters standing in for the camera, detector and LLM so
//! the binary runs end to end without hardware.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{bounded, select, tick, Sender};

use show_core::caption::{CaptionEngine, CaptionEngineConfig, DisplayMode};
use show_core::conductor::{ConductorCommand, ConductorConfig, ConductorEvent, ShowConductor};
use show_core::config::{ConfigBundle, WeaponConfig};
use show_core::contracts::{FaceDetector, FrameSource, LlmClient, ScreenshotWriter};
use show_core::events::{DetectionFrame, SsrEvent, TtsEvent};
use show_core::face_tracker::{FaceTracker, FaceTrackerConfig};
use show_core::llm::LlmResponse;
use show_core::overlay::{OverlayAnimator, ReticleId};
use show_core::serial::{self, SerialDispatcher};
use show_core::ssr::SsrController;
use show_core::telemetry::{ConnectionState, TelemetrySnapshot};
use show_core::tts::{TtsAdapter, TtsAdapterConfig};
use show_core::weapon::{WeaponEvent, WeaponSequencer};

mod adapters;
mod commands;

use adapters::{CpalSink, NullCamera, NullDetector, NullLlmClient, NullScreenshotWriter, SilentSynthesizer};

#[derive(Parser)]
#[command(name = "show")]
#[command(author, version, about = "Installation choreography engine runtime", long_about = None)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Camera device index to open
    #[arg(long, default_value_t = 0)]
    camera_index: u32,

    /// Serial device path. Auto-enumerated from the likeliest candidates if omitted.
    #[arg(long)]
    serial_port: Option<String>,

    /// Run the overlay/caption display fullscreen (inert until a windowing
    /// backend is wired in; carried through for that layer)
    #[arg(long)]
    fullscreen: bool,

    /// Print a telemetry snapshot once per second
    #[arg(long)]
    debug_mode: bool,

    /// Skip the LLM round trip and use the compiled-in default response
    #[arg(long)]
    no_llm_mode: bool,

    /// Reduced-footprint layout (inert until a windowing backend is wired in)
    #[arg(long)]
    mini_mode: bool,

    /// Directory holding the six config files
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a WAV file through the voice-mod DSP chain and save the result
    VoicePreview(commands::voice_preview::VoicePreviewArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".parse().unwrap()))
        .init();

    match cli.command {
        Some(Commands::VoicePreview(args)) => commands::voice_preview::run(args),
        None => run_show(cli.run),
    }
}

/// Resources [`dispatch_command`] needs to act on a [`ConductorCommand`].
/// Bundled so the main loop doesn't pass a dozen arguments at every call site.
struct RuntimeCtx<'a> {
    screenshots_dir: &'a Path,
    screenshot_writer: &'a mut NullScreenshotWriter,
    last_screenshot: &'a mut Option<PathBuf>,
    tool_catalog: &'a [String],
    weapon_config: &'a WeaponConfig,
    llm_request_tx: &'a Sender<(PathBuf, Vec<String>)>,
    tts_command_tx: &'a Sender<String>,
    tts_enabled: bool,
    caption_engine: &'a mut CaptionEngine,
    caption_mode: DisplayMode,
    ssr: &'a SsrController,
    ssr_event_tx: &'a Sender<SsrEvent>,
    weapon_sequencer: &'a Arc<WeaponSequencer>,
    weapon_event_tx: &'a Sender<WeaponEvent>,
    weapon_switch_delay: f32,
    current_tool_ids: &'a mut Vec<String>,
}

fn run_show(args: RunArgs) -> Result<()> {
    let config = ConfigBundle::load(&args.config_dir);
    tracing::info!(config_dir = %args.config_dir.display(), "configuration loaded");
    if args.fullscreen || args.mini_mode {
        // No windowing backend is wired up yet; these only affect the render
        // layer's own layout decisions once one exists.
        tracing::info!(fullscreen = args.fullscreen, mini_mode = args.mini_mode, "display layout flags recorded");
    }

    let screenshots_dir = PathBuf::from("webcam-shots");
    std::fs::create_dir_all(&screenshots_dir).context("creating webcam-shots directory")?;

    // --- Serial: boot handshake covers every pin the weapon/ssr config names.
    let boot_pins = serial::boot_pins(&config.weapon, &config.ssr);
    let (dispatcher, serial_rx, pin_state) = SerialDispatcher::new(256);
    let serial_port_path = args.serial_port.clone().or_else(|| serial::likely_ports().into_iter().next());
    match &serial_port_path {
        Some(path) => {
            let link = serial::open(path).with_context(|| format!("opening serial port {path}"))?;
            let closed = dispatcher.closed_flag();
            let boot_pins_thread = boot_pins.clone();
            std::thread::Builder::new()
                .name("serial".into())
                .spawn(move || {
                    let mut link = link;
                    serial::run_worker(&serial_rx, link.as_mut(), &pin_state, closed.as_ref(), &boot_pins_thread, std::thread::sleep);
                })
                .context("spawning serial thread")?;
        }
        None => {
            tracing::warn!("no serial port found; actuator and SSR pulses will be dropped");
            dispatcher.mark_closed();
        }
    }

    let ssr = SsrController::new(config.ssr, dispatcher.clone());
    let weapon_sequencer = Arc::new(WeaponSequencer::new(config.weapon.clone(), dispatcher.clone()));
    let tool_catalog: Vec<String> = config.weapon.ids().map(str::to_string).collect();

    // --- Engine state, owned exclusively by this thread (I1).
    let mut face_tracker = FaceTracker::new(FaceTrackerConfig {
        max_lost_frames: FaceTrackerConfig::default().max_lost_frames,
        detection_sensitivity: config.period.detection_sensitivity,
    });
    let mut overlay = OverlayAnimator::new(config.anim);
    let mut caption_engine = CaptionEngine::new(CaptionEngineConfig {
        typing_speed_ms: config.period.caption_typing_speed,
        caption_wait_after: Duration::from_secs_f32(config.period.caption_wait_after.max(0.0)),
    });
    let caption_mode = if config.tts.enabled { DisplayMode::TtsSync } else { DisplayMode::NonTts };
    let mut conductor = ShowConductor::new(ConductorConfig::from_period(&config.period, args.no_llm_mode));

    // --- Cross-thread channels.
    let (frame_tx, frame_rx) = bounded(2);
    let (detection_tx, detection_rx) = bounded::<DetectionFrame>(4);
    let (llm_request_tx, llm_request_rx) = bounded::<(PathBuf, Vec<String>)>(4);
    let (llm_ready_tx, llm_ready_rx) = bounded::<LlmResponse>(4);
    let (tts_command_tx, tts_command_rx) = bounded::<String>(16);
    let (tts_event_tx, tts_event_rx) = bounded::<TtsEvent>(64);
    let (ssr_event_tx, ssr_event_rx) = bounded::<SsrEvent>(8);
    let (weapon_event_tx, weapon_event_rx) = bounded::<WeaponEvent>(16);

    let running = Arc::new(AtomicBool::new(true));

    // Thread #1: camera acquisition.
    {
        let running = running.clone();
        let camera_index = args.camera_index;
        std::thread::Builder::new()
            .name("camera".into())
            .spawn(move || {
                tracing::info!(camera_index, "camera thread starting (null backend)");
                let mut camera = NullCamera::new(30.0);
                while running.load(Ordering::Relaxed) {
                    match camera.next_frame() {
                        Ok(frame) => {
                            let _ = frame_tx.try_send(frame);
                        }
                        Err(e) => {
                            tracing::error!("camera: {e}");
                            break;
                        }
                    }
                }
            })
            .context("spawning camera thread")?;
    }

    // Thread #2: face detection, downstream of the camera.
    {
        let running = running.clone();
        let start = Instant::now();
        std::thread::Builder::new()
            .name("face-detection".into())
            .spawn(move || {
                let mut detector = NullDetector;
                while running.load(Ordering::Relaxed) {
                    match frame_rx.recv_timeout(Duration::from_millis(200)) {
                        Ok(frame) => match detector.detect(&frame) {
                            Ok(bbox) => {
                                let _ = detection_tx
                                    .try_send(DetectionFrame { bbox, elapsed_since_start: start.elapsed() });
                            }
                            Err(e) => tracing::warn!("face detector: {e}"),
                        },
                        Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                        Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .context("spawning face-detection thread")?;
    }

    // Thread #: LLM worker.
    {
        std::thread::Builder::new()
            .name("llm".into())
            .spawn(move || {
                let mut client = NullLlmClient;
                for (screenshot, tool_list) in llm_request_rx.iter() {
                    match client.describe_and_select(&screenshot, &tool_list) {
                        Ok(response) => {
                            let _ = llm_ready_tx.send(response);
                        }
                        Err(e) => {
                            tracing::warn!("llm client error: {e}, falling back to default response");
                            let _ = llm_ready_tx.send(LlmResponse::default_response());
                        }
                    }
                }
            })
            .context("spawning llm thread")?;
    }

    // Thread #: TTS worker, sole owner of the audio device.
    {
        let voice_mod = config.voice_mod.clone();
        let mode = config.tts.mode;
        let event_tx = tts_event_tx.clone();
        std::thread::Builder::new()
            .name("tts".into())
            .spawn(move || {
                let mut adapter = TtsAdapter::new(TtsAdapterConfig::default(), voice_mod, mode);
                let mut synth = SilentSynthesizer;
                let mut sink = CpalSink::open();
                for text in tts_command_rx.iter() {
                    adapter.enqueue(&text);
                    let tx = event_tx.clone();
                    adapter.run_to_completion(&mut synth, &mut sink, move |event| {
                        let _ = tx.send(event);
                    });
                }
            })
            .context("spawning tts thread")?;
    }

    tracing::info!("show entering Detecting");

    let frame_pace = tick(Duration::from_millis(16));
    let debug_pace = tick(Duration::from_secs(1));
    let mut screenshot_writer = NullScreenshotWriter;
    let mut last_screenshot: Option<PathBuf> = None;
    let mut current_tool_ids: Vec<String> = Vec::new();
    let mut active_reticle: Option<ReticleId> = None;
    let mut next_reticle_id: ReticleId = 0;
    let mut last_tick_at = Instant::now();
    let mut last_fps = 0.0f32;

    loop {
        select! {
            recv(frame_pace) -> _ => {
                let now = Instant::now();
                last_fps = 1.0 / now.saturating_duration_since(last_tick_at).as_secs_f32().max(1.0 / 240.0);
                last_tick_at = now;

                let mut ctx = RuntimeCtx {
                    screenshots_dir: &screenshots_dir,
                    screenshot_writer: &mut screenshot_writer,
                    last_screenshot: &mut last_screenshot,
                    tool_catalog: &tool_catalog,
                    weapon_config: &config.weapon,
                    llm_request_tx: &llm_request_tx,
                    tts_command_tx: &tts_command_tx,
                    tts_enabled: config.tts.enabled,
                    caption_engine: &mut caption_engine,
                    caption_mode,
                    ssr: &ssr,
                    ssr_event_tx: &ssr_event_tx,
                    weapon_sequencer: &weapon_sequencer,
                    weapon_event_tx: &weapon_event_tx,
                    weapon_switch_delay: config.period.weapon_switch_delay,
                    current_tool_ids: &mut current_tool_ids,
                };

                while let Ok(update) = detection_rx.try_recv() {
                    let result = face_tracker.on_frame(update.bbox, now);
                    let face_present = match &result.episode {
                        Some(episode) => {
                            let id = *active_reticle.get_or_insert_with(|| {
                                let id = next_reticle_id;
                                next_reticle_id += 1;
                                id
                            });
                            overlay.tick(id, &episode.smoothed_bbox);
                            true
                        }
                        None => {
                            if let Some(id) = active_reticle.take() {
                                overlay.remove(id);
                            }
                            false
                        }
                    };
                    drive(conductor.on_event(ConductorEvent::FrameFaceUpdate(face_present), now), &mut conductor, &mut ctx, now);
                }

                while let Ok(response) = llm_ready_rx.try_recv() {
                    drive(conductor.on_event(ConductorEvent::LlmReady(response), now), &mut conductor, &mut ctx, now);
                }

                while let Ok(event) = tts_event_rx.try_recv() {
                    match event {
                        TtsEvent::Progress { char_pos, total_chars } => {
                            ctx.caption_engine.on_tts_progress(char_pos, total_chars, now);
                        }
                        TtsEvent::Finished => {
                            ctx.caption_engine.on_tts_done(now);
                        }
                        TtsEvent::Error(e) => tracing::warn!("tts adapter: {e}"),
                        TtsEvent::Started | TtsEvent::Chunk(_) => {}
                    }
                }
                let caption_events = ctx.caption_engine.tick(now);
                if caption_events.contains(&show_core::events::CaptionEvent::AllDone) {
                    drive(conductor.on_event(ConductorEvent::CaptionComplete, now), &mut conductor, &mut ctx, now);
                }

                while let Ok(event) = ssr_event_rx.try_recv() {
                    if let SsrEvent::SpotlightReady = event {
                        drive(conductor.on_event(ConductorEvent::SpotlightReady, now), &mut conductor, &mut ctx, now);
                    }
                }

                while let Ok(event) = weapon_event_rx.try_recv() {
                    if let WeaponEvent::SequenceComplete = event {
                        drive(conductor.on_event(ConductorEvent::WeaponSequenceComplete, now), &mut conductor, &mut ctx, now);
                    }
                }

                drive(conductor.tick(now), &mut conductor, &mut ctx, now);
            }
            recv(debug_pace) -> _ => {
                if args.debug_mode {
                    let pin_levels: std::collections::BTreeMap<u8, show_core::serial::Level> = boot_pins
                        .iter()
                        .filter_map(|&pin| dispatcher.last_known_level(pin).map(|level| (pin, level)))
                        .collect();
                    let connection =
                        if dispatcher.is_closed() { ConnectionState::Disconnected } else { ConnectionState::Connected };
                    let snapshot = TelemetrySnapshot {
                        state: conductor.state(),
                        fps: last_fps,
                        episode_duration_s: face_tracker.episode().map(|e| e.duration(Instant::now()).as_secs_f32()),
                        serial_connection: connection,
                        ssr_connection: connection,
                        pin_levels,
                        tool_ids: current_tool_ids.clone(),
                        canvas_w: 0,
                        canvas_h: 0,
                    };
                    println!("{}\n", snapshot.render());
                }
            }
        }
    }
}

/// Drain the synchronous follow-up chain a [`ConductorCommand`] can produce
/// (today only `RequestScreenshot` → `ScreenshotSaved`; everything else
/// resolves asynchronously on another thread).
fn drive(mut cmd: Option<ConductorCommand>, conductor: &mut ShowConductor, ctx: &mut RuntimeCtx<'_>, now: Instant) {
    while let Some(command) = cmd {
        let follow_up = dispatch_command(command, ctx, now);
        cmd = follow_up.and_then(|event| conductor.on_event(event, now));
    }
}

fn dispatch_command(cmd: ConductorCommand, ctx: &mut RuntimeCtx<'_>, now: Instant) -> Option<ConductorEvent> {
    match cmd {
        ConductorCommand::RequestScreenshot => {
            let path = ctx.screenshots_dir.join(screenshot_filename());
            let frame = adapters::NullFrame(0);
            if let Err(e) = ctx.screenshot_writer.write(&frame, &path) {
                tracing::error!("screenshot write failed: {e}");
                return None;
            }
            *ctx.last_screenshot = Some(path.clone());
            Some(ConductorEvent::ScreenshotSaved(path))
        }
        ConductorCommand::RequestLlm(path) => {
            if ctx.llm_request_tx.send((path, ctx.tool_catalog.to_vec())).is_err() {
                tracing::error!("llm worker thread is gone");
            }
            None
        }
        ConductorCommand::RequestCaptionDisplay(response) => {
            ctx.caption_engine.start(&response.caption_en, &response.caption_tc, ctx.caption_mode, now);
            *ctx.current_tool_ids = response.tool_ids.clone();
            if ctx.tts_enabled {
                let _ = ctx.tts_command_tx.send(response.caption_en.clone());
            }
            let tx = ctx.ssr_event_tx.clone();
            ctx.ssr.request_caption_lighting(move |event| {
                let _ = tx.send(event);
            });
            None
        }
        ConductorCommand::RequestSpotlight => {
            let tx = ctx.ssr_event_tx.clone();
            ctx.ssr.request_spotlight(move |event| {
                let _ = tx.send(event);
            });
            None
        }
        ConductorCommand::RequestWeaponDisplay(ids) => {
            let ids = ctx.weapon_config.validate_tool_ids(&ids);
            let sequencer = ctx.weapon_sequencer.clone();
            let tx = ctx.weapon_event_tx.clone();
            let switch_delay = ctx.weapon_switch_delay;
            std::thread::spawn(move || {
                sequencer.run_sequence(&ids, switch_delay, std::thread::sleep, |event| {
                    if let WeaponEvent::ShowImage { id, .. } = &event {
                        tracing::debug!(id = %id, "weapon sequencer: showing image");
                    }
                    let _ = tx.send(event);
                });
            });
            None
        }
        ConductorCommand::RequestReset => {
            ctx.ssr.release_all();
            if let Some(path) = ctx.last_screenshot.take() {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!("could not remove {}: {e}", path.display());
                }
            }
            ctx.caption_engine.reset();
            None
        }
    }
}

fn screenshot_filename() -> String {
    format!("screenshot_{}.jpg", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}
