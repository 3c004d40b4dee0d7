use msrd_rs::{FileRangeReader, MsrdIndex, MsrdReader, Result};

fn main() -> Result<()> {
    // 1) Parse headers and walk the block chain
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "recording.msrd".to_string());
    let reader = MsrdReader::from_file(&path)?;
    println!();

    // 2) Recording metadata
    println!("Recording ID : {}", reader.recording_id());
    for (key, value) in reader.header().iter() {
        println!("  {key} = {value}");
    }
    println!(
        "Segment      : {:.6} s .. {:.6} s ({} samples)",
        reader.segment_t_start(),
        reader.segment_t_stop(),
        reader.signal_size()
    );
    println!("Data blocks  : {}", reader.blocks().len());
    println!();

    for stream in reader.streams() {
        println!("Stream {} ({:?}): {} entities", stream.id, stream.kind, stream.channels.len());
    }
    println!();

    // 3) Channels, decoded on demand
    println!("Channels:");
    for (i, channel) in reader.signal_channels().iter().enumerate() {
        println!();
        println!(
            "    [{i}] {} (id {}) {} Hz [{}]",
            channel.label, channel.id, channel.sampling_rate, channel.unit
        );
        let entity = reader.channel_entity(i)?;
        if let Some(index) = reader.entity_index(entity) {
            println!("    Entity {entity}: {} blocks", index.len());
        } else {
            println!("    Entity {entity}: <no data>");
            continue;
        }

        let stop = reader.signal_size().min(5);
        match reader.read_channel_physical(i, Some(0), Some(stop)) {
            Ok(values) => println!("    Values: first {stop} = {values:?}"),
            Err(e) => println!("    Values: {e}"),
        }
    }
    println!();

    // 4) Ranged reads through a portable index
    if !reader.signal_channels().is_empty() {
        let index = MsrdIndex::from_reader(&reader);
        let mut ranges = FileRangeReader::new(&path)?;
        let stop = index.signal_size.min(1_000);
        let ranges_needed = index.get_byte_ranges(0, 0, stop, 0)?;
        let chunk = index.read_chunk(&[0], Some(0), Some(stop), &mut ranges)?;
        let valid = chunk.validity().iter().filter(|v| **v).count();
        println!(
            "Index read of channel 0: {valid}/{} samples from {} byte ranges",
            chunk.n_samples(),
            ranges_needed.len()
        );
    }

    Ok(())
}
