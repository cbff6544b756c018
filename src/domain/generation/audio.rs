use std::io::Cursor;

/// Gemini returns raw signed 16-bit little-endian PCM at 24 kHz, mono.
const SAMPLE_RATE: u32 = 24_000;
const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// Wrap raw PCM from the provider in a WAV container, in memory.
pub fn pcm_to_wav(pcm: &[u8]) -> Result<Vec<u8>, String> {
    let spec = hound::WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| format!("failed to start WAV writer: {}", e))?;

    for sample in pcm.chunks_exact(2) {
        let value = i16::from_le_bytes([sample[0], sample[1]]);
        writer
            .write_sample(value)
            .map_err(|e| format!("failed to write WAV sample: {}", e))?;
    }

    writer
        .finalize()
        .map_err(|e| format!("failed to finalize WAV container: {}", e))?;

    Ok(cursor.into_inner())
}
