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
use std::ops::RangeInclusive;
use std::sync::Arc;

use super::sample::Sample;

/// Maps an inclusive note range and velocity range to a sample.
#[derive(Debug, Clone)]
pub struct SampleMapping {
    notes: RangeInclusive<u8>,
    velocities: RangeInclusive<u8>,
    sample: Arc<Sample>,
}

impl SampleMapping {
    pub fn new(
        notes: RangeInclusive<u8>,
        velocities: RangeInclusive<u8>,
        sample: Arc<Sample>,
    ) -> Self {
        Self {
            notes,
            velocities,
            sample,
        }
    }

    /// Checks whether the note and velocity fall inside both ranges.
    pub fn contains(&self, note: u8, velocity: u8) -> bool {
        self.notes.contains(&note) && self.velocities.contains(&velocity)
    }

    pub fn sample(&self) -> &Arc<Sample> {
        &self.sample
    }
}

/// A multi-sample instrument.
#[derive(Debug, Clone, Default)]
pub struct Timbre {
    mappings: Vec<SampleMapping>,
}

impl Timbre {
    pub fn new(mappings: Vec<SampleMapping>) -> Self {
        Self { mappings }
    }

    /// Appends a mapping after the existing ones.
    pub fn push(&mut self, mapping: SampleMapping) {
        self.mappings.push(mapping);
    }

    /// Returns the sample of the first mapping, in declaration order, that
    /// contains the note and velocity.
    pub fn get_appropriate_sample(&self, note: u8, velocity: u8) -> Option<&Arc<Sample>> {
        self.mappings
            .iter()
            .find(|mapping| mapping.contains(note, velocity))
            .map(SampleMapping::sample)
    }

    pub fn mappings(&self) -> &[SampleMapping] {
        &self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
