//! `show voice-preview`: run a WAV file through the voice-mod DSP chain and
//! write the processed result back out, so an operator can audition a
//! profile before wiring it into a live show.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use show_core::config::VoiceModConfig;
use show_core::tts::dsp::{apply_chain, SAMPLE_RATE};

#[derive(Args, Debug)]
pub struct VoicePreviewArgs {
    /// Input WAV file, mono
    input: PathBuf,

    /// Output WAV file (default: input filename suffixed `_preview`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Voice-mod config file to read effect parameters from
    #[arg(long, default_value = "voice_mod_config.txt")]
    voice_mod_config: PathBuf,
}

pub fn run(args: VoicePreviewArgs) -> Result<()> {
    let cfg = VoiceModConfig::load(&args.voice_mod_config).unwrap_or_else(|e| {
        tracing::warn!("{}: {e}, using default voice-mod profile", args.voice_mod_config.display());
        VoiceModConfig::default()
    });

    let mut reader =
        hound::WavReader::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            reader.samples::<i32>().map(|s| s.map(|v| v as f32 / i32::MAX as f32)).collect::<Result<_, _>>()?
        }
    };

    println!("{}: {} samples at {} Hz", args.input.display(), samples.len(), spec.sample_rate);
    let processed = apply_chain(&samples, &cfg);

    let output = args.output.clone().unwrap_or_else(|| {
        let mut stem = args.input.file_stem().unwrap_or_default().to_os_string();
        stem.push("_preview.wav");
        args.input.with_file_name(stem)
    });
    let out_spec =
        hound::WavSpec { channels: 1, sample_rate: SAMPLE_RATE, bits_per_sample: 32, sample_format: hound::SampleFormat::Float };
    let mut writer =
        hound::WavWriter::create(&output, out_spec).with_context(|| format!("creating {}", output.display()))?;
    for sample in processed {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    println!("wrote {}", output.display());
    Ok(())
}
