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
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use tracing::{error, info, warn};

use crate::sampler::{Sampler, SAMPLE_BUFFER_SIZE};

/// An output device as reported by its host.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub host: String,
    pub channels: u16,
    pub sample_rate: u32,
}

/// Lists output devices across every available host.
pub fn list_devices() -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
    let mut devices = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            let Ok(config) = device.default_output_config() else {
                continue;
            };
            devices.push(DeviceInfo {
                name: device.name()?,
                host: host_id.name().to_string(),
                channels: config.channels(),
                sample_rate: config.sample_rate(),
            });
        }
    }

    devices.sort_by_key(|device| device.name.to_string());
    Ok(devices)
}

/// Opens an output stream that pulls blocks from the sampler and starts it.
///
/// The mono output of the sampler is copied to every device channel. The
/// stream stops when the returned handle is dropped.
pub fn start(
    sampler: Arc<Sampler>,
    device_name: Option<&str>,
    sample_rate: u32,
) -> Result<cpal::Stream, Box<dyn Error>> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .output_devices()?
            .find(|device| device.name().is_ok_and(|found| found.trim() == name))
            .ok_or_else(|| format!("no device found with name {}", name))?,
        None => host
            .default_output_device()
            .ok_or("no default output device")?,
    };

    let supported = device.default_output_config()?;
    if supported.sample_rate() != sample_rate {
        warn!(
            device_rate = supported.sample_rate(),
            sample_rate, "Device default sample rate differs from the configured rate"
        );
    }

    let config = cpal::StreamConfig {
        channels: supported.channels().max(1),
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, sampler)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, sampler)?,
        cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config, sampler)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, sampler)?,
        other => return Err(format!("unsupported sample format {}", other).into()),
    };
    stream.play()?;

    info!(
        device = device.name()?,
        channels = config.channels,
        sample_rate,
        "Output stream started"
    );
    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sampler: Arc<Sampler>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<i16>,
{
    let channels = config.channels as usize;
    let mut block = [0i16; SAMPLE_BUFFER_SIZE];
    let mut cursor = SAMPLE_BUFFER_SIZE;

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels) {
                if cursor == SAMPLE_BUFFER_SIZE {
                    sampler.process(&mut block);
                    cursor = 0;
                }
                frame.fill(T::from_sample(block[cursor]));
                cursor += 1;
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )
}
