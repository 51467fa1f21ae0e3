use anyhow::Result;
use clap::{Parser, Subcommand};
use morse_keyer_core::{
    alphabet::encode,
    audio::{list_output_devices, CpalToneGenerator, SilentToneGenerator, ToneGenerator},
    config::TimingConfig,
    keyer::Keyer,
    schedule::Schedule,
    synth::OfflineRenderer,
    Waveform, SAMPLE_RATE,
};
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "morse-keyer")]
#[command(about = "Keyboard keyer: text to standard-timing Morse audio", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Key text through the default audio output
    Send {
        /// Speed in words per minute (PARIS calibration)
        #[arg(long, default_value = "20")]
        wpm: f64,

        /// Tone frequency in Hz
        #[arg(long, short, default_value = "600")]
        frequency: f32,

        /// Volume level (0.0 - 1.0)
        #[arg(long, default_value = "0.5")]
        volume: f32,

        /// Oscillator waveform: sine, square, sawtooth or triangle
        #[arg(long, default_value = "sine")]
        waveform: String,

        /// Rehearse with true timing but no sound
        #[arg(long)]
        mute: bool,

        /// Text to send (if not provided, reads from stdin)
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Render text to a WAV file instead of playing it
    Render {
        #[arg(long, default_value = "20")]
        wpm: f64,

        #[arg(long, short, default_value = "600")]
        frequency: f32,

        #[arg(long, default_value = "0.5")]
        volume: f32,

        #[arg(long, default_value = "sine")]
        waveform: String,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Text to render (if not provided, reads from stdin)
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Print the keying timeline for a piece of text
    Timing {
        #[arg(long, default_value = "20")]
        wpm: f64,

        text: String,
    },

    /// List available audio output devices
    Devices,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Send {
            wpm,
            frequency,
            volume,
            waveform,
            mute,
            text,
        } => {
            let text = read_text(text)?;
            let config =
                TimingConfig::from_wpm(wpm, frequency, volume, waveform.parse::<Waveform>()?)?;
            send_text(&text, config, mute)?;
        }

        Commands::Render {
            wpm,
            frequency,
            volume,
            waveform,
            output,
            text,
        } => {
            let text = read_text(text)?;
            let config =
                TimingConfig::from_wpm(wpm, frequency, volume, waveform.parse::<Waveform>()?)?;
            render_text(&text, &config, &output)?;
        }

        Commands::Timing { wpm, text } => {
            let config = TimingConfig::from_wpm(
                wpm,
                morse_keyer_core::DEFAULT_FREQUENCY_HZ,
                morse_keyer_core::DEFAULT_AMPLITUDE,
                Waveform::Sine,
            )?;
            print_timing(&text, &config)?;
        }

        Commands::Devices => {
            println!("Available audio output devices:");
            for device in list_output_devices() {
                println!("  {}", device);
            }
        }
    }

    Ok(())
}

fn read_text(text: Option<String>) -> Result<String> {
    let text = match text {
        Some(t) => t,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    if text.trim().is_empty() {
        eprintln!("Error: No text to send");
        std::process::exit(1);
    }

    Ok(text)
}

fn send_text(text: &str, config: TimingConfig, mute: bool) -> Result<()> {
    let preview = Schedule::build(&encode(text), &config, 0.0);
    eprintln!(
        "Sending {} characters at {:.0} WPM ({:.1}s)...",
        text.trim().len(),
        config.wpm(),
        preview.duration()
    );

    let generator: Box<dyn ToneGenerator> = if mute {
        Box::new(SilentToneGenerator::new())
    } else {
        Box::new(CpalToneGenerator::new()?)
    };

    let mut keyer = Keyer::builder().config(config).generator(generator).build()?;

    let (tx, rx) = mpsc::channel();
    keyer.on_playback_ended(move || {
        let _ = tx.send(());
    });

    keyer.play(text)?;
    rx.recv()?;

    std::thread::sleep(std::time::Duration::from_millis(100));
    eprintln!("Done.");

    Ok(())
}

fn render_text(text: &str, config: &TimingConfig, output: &PathBuf) -> Result<()> {
    let symbols = encode(text);
    if symbols.is_empty() {
        eprintln!("Error: No encodable characters in input");
        std::process::exit(1);
    }

    let schedule = Schedule::build(&symbols, config, 0.0);
    let samples = OfflineRenderer::new(SAMPLE_RATE).render(&schedule, config);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(output, spec)?;
    for &sample in &samples {
        writer.write_sample((sample * f32::from(i16::MAX)) as i16)?;
    }
    writer.finalize()?;

    eprintln!(
        "Wrote {} samples ({:.1}s) to {}",
        samples.len(),
        schedule.duration(),
        output.display()
    );

    Ok(())
}

fn print_timing(text: &str, config: &TimingConfig) -> Result<()> {
    let symbols = encode(text);
    if symbols.is_empty() {
        eprintln!("Error: No encodable characters in input");
        std::process::exit(1);
    }

    let schedule = Schedule::build(&symbols, config, 0.0);

    println!("{} symbols at {:.0} WPM:", symbols.len(), config.wpm());
    for event in schedule.events() {
        let state = if event.gain > 0.0 { "key down" } else { "key up" };
        println!("  {:>8.3}s  {}  (gain {:.2})", event.at, state, event.gain);
    }
    println!("  {:>8.3}s  end of transmission", schedule.end_time());

    Ok(())
}
