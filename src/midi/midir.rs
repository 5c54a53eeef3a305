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

use midir::{MidiInput, MidiInputConnection};
use tracing::{debug, info, span, Level};

use crate::sampler::Sampler;

/// Lists the names of the available MIDI input ports.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    let input = MidiInput::new("capsule input listing")?;
    let mut names = input
        .ports()
        .iter()
        .map(|port| input.port_name(port))
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();
    Ok(names)
}

/// Connects to the named input port and forwards note and pitch bend
/// messages to the sampler. Input stops when the connection is dropped.
pub fn connect(
    name: &str,
    sampler: Arc<Sampler>,
) -> Result<MidiInputConnection<()>, Box<dyn Error>> {
    let span = span!(Level::INFO, "midi input (midir)");
    let _enter = span.enter();

    let input = MidiInput::new("capsule input")?;
    let port = input
        .ports()
        .into_iter()
        .find(|port| input.port_name(port).is_ok_and(|found| found.trim() == name))
        .ok_or_else(|| format!("no MIDI input found with name {}", name))?;

    info!(device = name, "Watching MIDI events.");
    let connection = input.connect(
        &port,
        "capsule input watcher",
        move |_, raw_event, _| {
            if let Some(event) = super::parse_live(raw_event) {
                debug!(event = ?event, "Received MIDI event.");
                sampler.send(event);
            }
        },
        (),
    )?;

    Ok(connection)
}
