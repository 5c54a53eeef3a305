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

/// Default exponent of the velocity curve.
pub const DEFAULT_VELOCITY_CURVE: f32 = 2.0;

/// Precomputed velocity to volume lookup.
#[derive(Debug, Clone)]
pub struct VelocityTable([f32; 128]);

impl VelocityTable {
    /// Builds `volume = (velocity / 127) ^ exponent`.
    pub fn with_curve(exponent: f32) -> Self {
        let exponent = if exponent.is_finite() && exponent > 0.0 {
            exponent
        } else {
            DEFAULT_VELOCITY_CURVE
        };
        Self(std::array::from_fn(|velocity| {
            (velocity as f32 / 127.0).powf(exponent)
        }))
    }

    /// Wraps an existing table.
    pub fn from_values(values: [f32; 128]) -> Self {
        Self(values)
    }

    /// Volume for a 7-bit velocity.
    #[inline]
    pub fn volume(&self, velocity: u8) -> f32 {
        self.0[(velocity & 0x7f) as usize]
    }
}

impl Default for VelocityTable {
    fn default() -> Self {
        Self::with_curve(DEFAULT_VELOCITY_CURVE)
    }
}
