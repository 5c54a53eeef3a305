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

//! Sample loading and caching.
//!
//! Samples are loaded entirely into memory before playback, downmixed to mono,
//! converted to the output sample rate and stored as 16-bit PCM.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{ConfigError, SampleDefinition, SamplerConfig, TimbreDefinition};
use crate::sampler::{Sample, SampleError, SampleMapping, Sampler, Timbre};

/// Errors raised while loading sample assets.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read sample {path}: {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Unsupported sample {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },

    #[error("Sample {path} contains no audio")]
    Empty { path: PathBuf },

    #[error("Invalid sample {path}: {source}")]
    Sample {
        path: PathBuf,
        #[source]
        source: SampleError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A decoded waveform at the target sample rate.
#[derive(Clone)]
struct LoadedWave {
    data: Arc<[i16]>,
    /// Target rate divided by the file's rate, used to move loop points.
    ratio: f64,
}

impl LoadedWave {
    fn memory_size(&self) -> usize {
        std::mem::size_of_val(&*self.data)
    }
}

/// Manages loading and caching of sample data.
pub struct SampleLoader {
    /// Cache of loaded waveforms by file path.
    cache: HashMap<PathBuf, LoadedWave>,
    /// Target sample rate for transcoding (matches audio output).
    target_sample_rate: u32,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(target_sample_rate: u32) -> Self {
        Self {
            cache: HashMap::new(),
            target_sample_rate,
        }
    }

    /// Loads a WAV file as mono 16-bit PCM at the target rate.
    /// Returns a cached version if already loaded.
    pub fn load(&mut self, path: &Path) -> Result<Arc<[i16]>, LoadError> {
        Ok(self.load_wave(path)?.data)
    }

    fn load_wave(&mut self, path: &Path) -> Result<LoadedWave, LoadError> {
        if let Some(wave) = self.cache.get(path) {
            debug!(path = ?path, "Using cached sample");
            return Ok(wave.clone());
        }

        info!(path = ?path, "Loading sample into memory");

        let wav_error = |source| LoadError::Wav {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = hound::WavReader::open(path).map_err(wav_error)?;
        let spec = reader.spec();
        if spec.channels == 0 || spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
            return Err(LoadError::Unsupported {
                path: path.to_path_buf(),
                reason: format!(
                    "{} channels at {} bits",
                    spec.channels, spec.bits_per_sample
                ),
            });
        }

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(wav_error)?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|sample| sample as f32 * scale))
                    .collect::<Result<_, _>>()
                    .map_err(wav_error)?
            }
        };

        let mono = downmix(&samples, spec.channels);
        if mono.is_empty() {
            return Err(LoadError::Empty {
                path: path.to_path_buf(),
            });
        }

        let mono = if spec.sample_rate != self.target_sample_rate {
            info!(
                source_rate = spec.sample_rate,
                target_rate = self.target_sample_rate,
                "Transcoding sample"
            );
            transcode_samples(&mono, spec.sample_rate, self.target_sample_rate)
        } else {
            mono
        };

        let data: Arc<[i16]> = mono.iter().map(|sample| to_i16(*sample)).collect();
        let wave = LoadedWave {
            data,
            ratio: self.target_sample_rate as f64 / spec.sample_rate as f64,
        };

        info!(
            path = ?path,
            channels = spec.channels,
            sample_rate = self.target_sample_rate,
            duration_ms = Duration::from_secs_f64(
                wave.data.len() as f64 / self.target_sample_rate as f64
            )
            .as_millis(),
            memory_kb = wave.memory_size() / 1024,
            "Sample loaded"
        );

        self.cache.insert(path.to_path_buf(), wave.clone());
        Ok(wave)
    }

    /// Loads the file of a sample definition and applies its root, loop
    /// points and envelope. Loop points are given in frames of the file and
    /// are moved to the target rate.
    pub fn load_sample(
        &mut self,
        definition: &SampleDefinition,
        base_path: &Path,
    ) -> Result<Sample, LoadError> {
        let path = resolve(base_path, definition.file());
        let wave = self.load_wave(&path)?;
        let length = wave.data.len();

        let mut sample = Sample::new(wave.data, definition.root());
        if let Some((start, end)) = definition.loop_points() {
            let scale = |point: usize| ((point as f64 * wave.ratio).round() as usize).min(length);
            sample = sample
                .with_loop(scale(start), scale(end))
                .map_err(|source| LoadError::Sample { path, source })?;
        }
        if let Some(envelope) = definition.envelope() {
            sample = sample.with_envelope(envelope);
        }
        Ok(sample)
    }

    /// Loads every sample of a timbre, keeping the declaration order.
    pub fn load_timbre(
        &mut self,
        definition: &TimbreDefinition,
        base_path: &Path,
    ) -> Result<Timbre, LoadError> {
        let mut timbre = Timbre::default();
        for sample in definition.samples() {
            let loaded = self.load_sample(sample, base_path)?;
            timbre.push(SampleMapping::new(
                sample.notes(),
                sample.velocities(),
                Arc::new(loaded),
            ));
        }
        Ok(timbre)
    }

    /// Loads every timbre of a configuration.
    pub fn load_timbres(
        &mut self,
        config: &SamplerConfig,
        base_path: &Path,
    ) -> Result<HashMap<String, Arc<Timbre>>, LoadError> {
        config
            .timbres()
            .iter()
            .map(|(name, definition)| {
                let timbre = self.load_timbre(definition, base_path)?;
                debug!(timbre = name, mappings = timbre.len(), "Timbre loaded");
                Ok((name.clone(), Arc::new(timbre)))
            })
            .collect()
    }

    /// Builds a sampler from a configuration, with every asset resident.
    pub fn build_sampler(
        &mut self,
        config: &SamplerConfig,
        base_path: &Path,
    ) -> Result<Sampler, LoadError> {
        config.validate()?;
        let timbres = self.load_timbres(config, base_path)?;

        let sampler = Sampler::new(config.reverb().to_reverb(), config.velocity_table());
        sampler.set_master_volume(config.master_volume());
        for assignment in config.channels() {
            let timbre = timbres.get(assignment.timbre()).cloned().ok_or_else(|| {
                ConfigError::UnknownTimbre {
                    channel: assignment.channel(),
                    timbre: assignment.timbre().to_string(),
                }
            })?;
            sampler.set_timbre(assignment.channel(), Some(timbre));
        }

        info!(
            timbres = timbres.len(),
            channels = config.channels().len(),
            memory_kb = self.total_memory_usage() / 1024,
            "Sampler ready"
        );
        Ok(sampler)
    }

    /// Returns the total memory used by cached samples.
    pub fn total_memory_usage(&self) -> usize {
        self.cache.values().map(LoadedWave::memory_size).sum()
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("cached_samples", &self.cache.len())
            .field("target_sample_rate", &self.target_sample_rate)
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Reads a sampler configuration and loads everything it references. Sample
/// paths are relative to the configuration file.
pub fn load_sampler(config_path: &Path) -> Result<(SamplerConfig, Sampler), LoadError> {
    let config = SamplerConfig::deserialize(config_path)?;
    let base_path = config_path.parent().unwrap_or_else(|| Path::new("."));
    let mut loader = SampleLoader::new(config.sample_rate());
    let sampler = loader.build_sampler(&config, base_path)?;
    Ok((config, sampler))
}

fn resolve(base_path: &Path, file: &str) -> PathBuf {
    if Path::new(file).is_absolute() {
        PathBuf::from(file)
    } else {
        base_path.join(file)
    }
}

/// Averages interleaved frames down to one channel.
fn downmix(samples: &[f32], channel_count: u16) -> Vec<f32> {
    let channels = channel_count as usize;
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Transcodes mono samples from one sample rate to another using linear
/// interpolation.
fn transcode_samples(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    let ratio = target_rate as f64 / source_rate as f64;
    let target_frames = (samples.len() as f64 * ratio).ceil() as usize;

    (0..target_frames)
        .map(|target_frame| {
            let source_pos = target_frame as f64 / ratio;
            let source_frame = source_pos.floor() as usize;
            let frac = source_pos.fract() as f32;

            let s0 = samples.get(source_frame).copied().unwrap_or(0.0);
            let s1 = samples.get(source_frame + 1).copied().unwrap_or(s0);
            s0 + (s1 - s0) * frac
        })
        .collect()
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::sampler::SAMPLE_BUFFER_SIZE;
    use crate::testutil::{write_constant_wav, write_wav};

    #[test]
    fn test_transcode_samples() {
        // Simple mono sine wave at 44100Hz
        let source_rate = 44100;
        let target_rate = 48000;
        let source_samples: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / source_rate as f32).sin())
            .collect();

        let result = transcode_samples(&source_samples, source_rate, target_rate);

        // Should have more samples at higher rate
        let expected_len = (4410.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(result.len(), expected_len);
    }

    #[test]
    fn test_downmix() {
        let stereo = [1.0f32, -1.0, 0.5, 0.25];
        assert_eq!(downmix(&stereo, 2), vec![0.0, 0.375]);
        assert_eq!(downmix(&stereo, 1), stereo.to_vec());
    }

    #[test]
    fn test_load_int_and_float() {
        let dir = tempfile::tempdir().unwrap();
        let int_path = dir.path().join("int.wav");
        let float_path = dir.path().join("float.wav");
        write_wav(&int_path, vec![vec![16384i16, -16384, 0]], 48000, 16).unwrap();
        write_wav(&float_path, vec![vec![0.5f32, -0.5, 0.0]], 48000, 32).unwrap();

        let mut loader = SampleLoader::new(48000);
        assert_eq!(&*loader.load(&int_path).unwrap(), &[16384, -16384, 0]);
        assert_eq!(&*loader.load(&float_path).unwrap(), &[16384, -16384, 0]);
        assert_eq!(loader.total_memory_usage(), 12);
    }

    #[test]
    fn test_load_stereo_is_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(
            &path,
            vec![vec![1000i16, 2000], vec![3000i16, -2000]],
            48000,
            16,
        )
        .unwrap();

        let mut loader = SampleLoader::new(48000);
        let data = loader.load(&path).unwrap();
        assert_eq!(data.len(), 2);
        // 2000/32768 scaled back to 16 bits.
        assert!((data[0] as i32 - 2000).abs() <= 1);
        assert_eq!(data[1], 0);
    }

    #[test]
    fn test_load_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cached.wav");
        write_constant_wav(&path, 100, 64, 48000).unwrap();

        let mut loader = SampleLoader::new(48000);
        let first = loader.load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let second = loader.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = SampleLoader::new(48000);
        assert!(matches!(
            loader.load(&dir.path().join("missing.wav")),
            Err(LoadError::Wav { .. })
        ));

        let empty = dir.path().join("empty.wav");
        write_wav::<i16>(&empty, vec![vec![]], 48000, 16).unwrap();
        assert!(matches!(loader.load(&empty), Err(LoadError::Empty { .. })));
    }

    #[test]
    fn test_loop_points_follow_sample_rate() {
        let dir = tempfile::tempdir().unwrap();
        write_constant_wav(&dir.path().join("pad.wav"), 1000, 24000, 24000).unwrap();

        let definition = pad_definition().with_loop(1000, 2000);

        let mut loader = SampleLoader::new(48000);
        let sample = loader.load_sample(&definition, dir.path()).unwrap();
        assert_eq!(sample.len(), 48000);
        assert_eq!(sample.loop_region(), Some((2000, 4000)));
        assert_eq!(sample.root(), 60);
    }

    #[test]
    fn test_invalid_loop_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_constant_wav(&dir.path().join("pad.wav"), 1000, 100, 48000).unwrap();

        let definition = pad_definition().with_loop(50, 20);
        let mut loader = SampleLoader::new(48000);
        assert!(matches!(
            loader.load_sample(&definition, dir.path()),
            Err(LoadError::Sample { .. })
        ));
    }

    fn pad_definition() -> SampleDefinition {
        SampleDefinition::new("pad.wav", 60, [0, 127], [0, 127])
    }

    #[test]
    fn test_load_sampler_from_config() {
        let dir = tempfile::tempdir().unwrap();
        write_constant_wav(&dir.path().join("low.wav"), 8192, 4096, 48000).unwrap();
        write_constant_wav(&dir.path().join("high.wav"), 16384, 4096, 48000).unwrap();

        let config_path = dir.path().join("sampler.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        write!(
            file,
            r#"
master_volume: 1.0
velocity_curve: 1.0
timbres:
  keys:
    samples:
      - file: low.wav
        root: 60
        notes: [0, 59]
      - file: high.wav
        root: 72
        notes: [60, 127]
channels:
  - channel: 2
    timbre: keys
"#
        )
        .unwrap();
        drop(file);

        let (config, sampler) = load_sampler(&config_path).unwrap();
        assert_eq!(config.channels().len(), 1);
        assert_eq!(sampler.master_volume(), 1.0);

        sampler.note_on(72, 127, 2);
        let mut output = [0i16; SAMPLE_BUFFER_SIZE];
        sampler.process(&mut output);
        assert!(output.iter().all(|x| *x == 16384));
    }
}
