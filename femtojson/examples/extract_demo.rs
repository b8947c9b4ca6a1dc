// SPDX-License-Identifier: Apache-2.0

//! Example demonstrating PairParser over a chunked transport.
//!
//! The response arrives in 7-byte pieces, the way a UART or socket would
//! deliver it; pairs pop out as soon as their bytes are complete.

use femtojson::{PairParser, Scan};

fn main() {
    let response = br#"{"device":"ESP32","readings":[23.4,23.9],"meta":{"seq":17},"ok":true}"#;

    println!("PairParser demo: 7-byte transport chunks");
    println!("========================================");
    println!("input: {}", String::from_utf8_lossy(response));
    println!();

    let mut buffer = [0u8; 96];
    let mut parser = PairParser::new(&mut buffer);

    for piece in response.chunks(7) {
        parser.extend(piece).expect("buffer is large enough");

        loop {
            match parser.scan() {
                Ok(Scan::Pair) => {
                    let (key, value) = parser.pair().expect("pair pending");
                    println!(
                        "pair: {:<10} = {}",
                        key,
                        String::from_utf8_lossy(value)
                    );
                    parser.consume_pair();
                }
                Ok(Scan::NeedMore) => break,
                Ok(Scan::ObjectEnd) => {
                    println!("object end");
                    break;
                }
                Err(e) => {
                    eprintln!("parse error: {:?}", e);
                    return;
                }
            }
        }
    }

    println!();
    println!("done: {} bytes left in the buffer", parser.buffered_len());
}
