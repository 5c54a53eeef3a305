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
use std::collections::HashMap;
use std::path::Path;

use config::{Config, File};
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::timbre::TimbreDefinition;
use crate::audio::reverb::{Bypass, FeedbackReverb, Reverb, DEFAULT_DECAY, DEFAULT_MIX};
use crate::sampler::{VelocityTable, CH_COUNT, DEFAULT_VELOCITY_CURVE};

/// Default output sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default master volume.
pub const DEFAULT_MASTER_VOLUME: f32 = 0.8;

/// The top level sampler configuration.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct SamplerConfig {
    /// Output sample rate. Every sample is converted to this rate on load.
    sample_rate: Option<u32>,

    /// Master volume, 0.0 to 1.0.
    master_volume: Option<f32>,

    /// Exponent of the velocity to volume curve.
    velocity_curve: Option<f32>,

    #[serde(default)]
    reverb: ReverbConfig,

    /// Timbres by name.
    #[serde(default)]
    timbres: HashMap<String, TimbreDefinition>,

    /// Timbre assignments.
    #[serde(default)]
    channels: Vec<ChannelAssignment>,
}

impl SamplerConfig {
    /// Parse a sampler configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<SamplerConfig, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<SamplerConfig>()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks channel numbers, timbre references and ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for assignment in &self.channels {
            if assignment.channel as usize >= CH_COUNT {
                return Err(ConfigError::InvalidChannel {
                    channel: assignment.channel,
                    max: CH_COUNT - 1,
                });
            }
            if !self.timbres.contains_key(&assignment.timbre) {
                return Err(ConfigError::UnknownTimbre {
                    channel: assignment.channel,
                    timbre: assignment.timbre.clone(),
                });
            }
        }

        for (name, timbre) in &self.timbres {
            for sample in timbre.samples() {
                for (field, range) in [("note", sample.notes()), ("velocity", sample.velocities())] {
                    if range.is_empty() {
                        return Err(ConfigError::EmptyRange {
                            timbre: name.clone(),
                            field,
                            lo: *range.start(),
                            hi: *range.end(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume.unwrap_or(DEFAULT_MASTER_VOLUME)
    }

    pub fn velocity_curve(&self) -> f32 {
        self.velocity_curve.unwrap_or(DEFAULT_VELOCITY_CURVE)
    }

    pub fn velocity_table(&self) -> VelocityTable {
        VelocityTable::with_curve(self.velocity_curve())
    }

    pub fn reverb(&self) -> &ReverbConfig {
        &self.reverb
    }

    pub fn timbres(&self) -> &HashMap<String, TimbreDefinition> {
        &self.timbres
    }

    pub fn channels(&self) -> &[ChannelAssignment] {
        &self.channels
    }
}

/// Reverb settings.
#[derive(Deserialize, Clone, Serialize, Debug, Default)]
pub struct ReverbConfig {
    #[serde(default)]
    enabled: bool,
    mix: Option<f32>,
    decay: Option<f32>,
}

impl ReverbConfig {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Builds the reverb stage described by this config.
    pub fn to_reverb(&self) -> Box<dyn Reverb> {
        if !self.enabled {
            return Box::new(Bypass);
        }
        Box::new(FeedbackReverb::new(
            self.mix.unwrap_or(DEFAULT_MIX),
            self.decay.unwrap_or(DEFAULT_DECAY),
        ))
    }
}

/// Assigns a timbre to a channel.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct ChannelAssignment {
    /// Zero based channel number.
    channel: u8,
    /// Name of a timbre in this config.
    timbre: String,
}

impl ChannelAssignment {
    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn timbre(&self) -> &str {
        &self.timbre
    }
}
