// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use capsule::{audio, midi, render, samples};
use clap::{crate_version, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How often the play loop reports the voice count.
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A polyphonic sample player."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Renders a MIDI file through the sampler into a WAV file.
    Render {
        /// The path to the sampler config.
        config_path: PathBuf,
        /// The MIDI file to render.
        midi_file: PathBuf,
        /// The WAV file to write.
        output: PathBuf,
        /// How long to keep rendering after the last event, in seconds.
        #[arg[short, long, default_value_t = 5.0]]
        tail: f64,
    },
    /// Plays the sampler live from a MIDI input.
    Play {
        /// The path to the sampler config.
        config_path: PathBuf,
        /// The MIDI input to listen to.
        #[arg[short, long]]
        midi_device: Option<String>,
        /// The audio output device. Uses the default device when omitted.
        #[arg[short, long]]
        audio_device: Option<String>,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input devices.
    MidiDevices {},
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            config_path,
            midi_file,
            output,
            tail,
        } => {
            let (config, sampler) = samples::load_sampler(&config_path)?;
            let sample_rate = config.sample_rate();
            let events = midi::smf::load(&midi_file, sample_rate)?;
            let tail_frames = (tail.max(0.0) * sample_rate as f64) as u64;

            let rendered = render::render(&sampler, &events, tail_frames);
            render::write_wav(&output, &rendered, sample_rate)?;
            println!(
                "Rendered {:.2}s to {}.",
                rendered.len() as f64 / sample_rate as f64,
                output.display()
            );
        }
        Commands::Play {
            config_path,
            midi_device,
            audio_device,
        } => {
            let (config, sampler) = samples::load_sampler(&config_path)?;
            let sampler = Arc::new(sampler);

            let _stream =
                audio::cpal::start(sampler.clone(), audio_device.as_deref(), config.sample_rate())?;
            let _connection = match midi_device {
                Some(name) => Some(midi::midir::connect(&name, sampler.clone())?),
                None => {
                    info!("No MIDI input given, the sampler will stay silent.");
                    None
                }
            };

            loop {
                thread::sleep(STATUS_INTERVAL);
                info!(active_voices = sampler.active_voices(), "Playing");
            }
        }
        Commands::Devices {} => {
            let devices = audio::cpal::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!(
                    "- {} (Channels={}) ({}Hz) ({})",
                    device.name, device.channels, device.sample_rate, device.host
                );
            }
        }
        Commands::MidiDevices {} => {
            let devices = midi::midir::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
    }

    Ok(())
}
