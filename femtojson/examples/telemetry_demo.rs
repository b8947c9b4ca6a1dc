// SPDX-License-Identifier: Apache-2.0

//! Example demonstrating StreamWriter with a tiny staging buffer.
//!
//! The sink prints each flushed chunk as it arrives, so the output shows how
//! tokens straddle flush boundaries while the concatenated stream stays
//! valid JSON.

use femtojson::{StreamWriter, WriteError};

fn main() -> Result<(), WriteError> {
    println!("StreamWriter demo: 16-byte buffer, stdout sink");
    println!("==============================================");

    let mut chunk_count = 0usize;
    let sink = |chunk: &[u8]| {
        chunk_count += 1;
        println!("chunk {:>2}: {:?}", chunk_count, String::from_utf8_lossy(chunk));
        true
    };

    // A buffer much smaller than the document forces mid-token flushes
    let mut buffer = [0u8; 16];
    let mut writer = StreamWriter::new_object(&mut buffer, sink)?;

    writer.add_string("device", "ESP32")?;
    writer.add_string("status", "online")?;
    writer.add_int("uptime_sec", 3600)?;
    writer.add_float("temperature", 23.45)?;
    writer.add_int_array("samples", &[10, 20, 30, 40])?;

    writer.begin_object("network")?;
    writer.add_string("ssid", "factory-floor")?;
    writer.add_int("rssi", -61)?;
    writer.close()?;

    writer.begin_array("events")?;
    writer.append_string("boot")?;
    writer.append_object()?;
    writer.add_int("code", 4)?;
    writer.close()?;
    writer.close()?;

    // end() closes whatever is still open and flushes the tail
    writer.end()?;

    println!("done: document streamed through a 16-byte buffer");
    Ok(())
}
