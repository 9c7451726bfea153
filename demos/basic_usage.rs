//! Basic usage example for tagframe
//!
//! Run with: cargo run --example basic_usage

use std::io::Cursor;
use std::time::{Duration, SystemTime};

use tagframe::*;

fn main() -> std::result::Result<(), Error> {
    println!("tagframe Basic Usage Example");
    println!("============================");

    // Example 1: Scalars in, values out
    println!("\n1. Scalar Fields:");
    {
        let mut frame = Frame::new(5);
        frame.add(42i32)?;
        frame.add(7u16)?;

        let bytes = frame.to_bytes()?.to_vec();
        println!("  Encoded {} bytes: {:02X?}", bytes.len(), bytes);

        let mut decoded = Frame::from_bytes(&bytes)?;
        println!(
            "  Decoded: type={}, values={:?}",
            decoded.type_id(),
            decoded.values()?
        );
    }

    // Example 2: Every kind of field
    println!("\n2. Mixed Field Kinds:");
    {
        let mut frame = Frame::new(10);
        frame.add(Decimal::new(-1_234_567, 3).unwrap_or(Decimal::ZERO))?; // -1234.567
        frame.add(TimeSpan::from_duration(Duration::from_millis(1500)).unwrap_or(TimeSpan(0)))?;
        frame.add(Timestamp::from_system_time(SystemTime::now()).unwrap_or(Timestamp(0)))?;
        frame.add(Guid([0x11; 16]))?;
        frame.add_str("hello, frames")?;
        frame.add_bytes(&[0xDE, 0xAD, 0xBE, 0xEF])?;
        frame.add_list(&[1.5f64, -2.25, 0.0])?;

        for value in frame.values()? {
            println!("  {:?} -> {:?}", value.tag(), value);
        }
        println!("  Serialized size: {} bytes", frame.len()?);
    }

    // Example 3: Compressed payloads
    println!("\n3. Compressed Bytes:");
    {
        let payload = b"repeat ".repeat(200);
        let mut frame = Frame::new(20);
        frame.add_compressed(&payload)?;

        println!(
            "  Payload {} bytes, frame {} bytes with codec {}",
            payload.len(),
            frame.len()?,
            frame.config().codec().name()
        );

        let values = Frame::from_bytes(frame.to_bytes()?)?.into_values()?;
        println!("  Restored {} bytes", values[0].as_bytes().map_or(0, |b| b.len()));
    }

    // Example 4: Nested frames
    println!("\n4. Nested Frames:");
    {
        let mut order = Frame::new(101);
        order.add(12345u32)?;
        order.add_str("AAPL")?;

        let mut envelope = Frame::new(100);
        envelope.add(1u64)?;
        envelope.add_frame(order)?;

        let bytes = envelope.to_bytes()?.to_vec();
        let mut decoded = Frame::from_bytes(&bytes)?;
        if let Some(inner) = decoded.values()?.get(1).and_then(Value::as_frame) {
            let mut inner = inner.deep_copy()?;
            println!(
                "  Inner frame: type={}, values={:?}",
                inner.type_id(),
                inner.values()?
            );
        }
    }

    // Example 5: Stream of frames
    println!("\n5. Frame Stream:");
    {
        let mut wire = Vec::new();
        for seq in 0..3u16 {
            let mut frame = Frame::new(seq);
            frame.add(u64::from(seq) * 1000)?;
            write_frame(&mut wire, &mut frame)?;
        }
        println!("  Wrote {} bytes", wire.len());

        for frame in FrameReader::new(Cursor::new(wire)) {
            let mut frame = frame?;
            println!("  type={} values={:?}", frame.type_id(), frame.values()?);
        }
    }

    // Example 6: Error handling
    println!("\n6. Error Handling:");
    {
        let mut frame = Frame::new(1);
        match frame.add_list::<i32>(&[]) {
            Ok(_) => println!("  Unexpected success"),
            Err(e) => println!("  Empty list: {}", e),
        }

        match Frame::from_bytes(&[0u8; 12]) {
            Ok(_) => println!("  Unexpected success"),
            Err(e) => println!("  Zeroed header: {}", e),
        }

        frame.release();
        match frame.add(1i32) {
            Ok(_) => println!("  Unexpected success"),
            Err(e) => println!("  After release: {}", e),
        }
    }

    println!("\nAll examples completed successfully!");
    Ok(())
}
