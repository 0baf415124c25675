//! 8-bit mono PCM WAV writing.

use std::io::{self, Write};

const BITS_PER_SAMPLE: u16 = 8;
const NUM_CHANNELS: u16 = 1;

/// Write signed mixer output as an unsigned 8-bit mono WAV.
pub fn write_wav(w: &mut impl Write, samples: &[i8], sample_rate: u32) -> io::Result<()> {
    let data_size = u32::try_from(samples.len())
        .ok()
        .filter(|&n| n <= u32::MAX - 37)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "too many samples for WAV"))?;
    let pad = data_size % 2;

    write_riff_header(w, data_size + pad)?;
    write_fmt_chunk(w, sample_rate)?;
    write_data_chunk(w, samples, data_size)?;
    if pad == 1 {
        w.write_all(&[0])?;
    }
    Ok(())
}

/// Encode into an in-memory WAV file.
pub fn samples_to_wav(samples: &[i8], sample_rate: u32) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(44 + samples.len() + 1);
    write_wav(&mut buf, samples, sample_rate)?;
    Ok(buf)
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(w: &mut impl Write, sample_rate: u32) -> io::Result<()> {
    let block_align = NUM_CHANNELS * (BITS_PER_SAMPLE / 8);
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&NUM_CHANNELS.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&BITS_PER_SAMPLE.to_le_bytes())
}

fn write_data_chunk(w: &mut impl Write, samples: &[i8], data_size: u32) -> io::Result<()> {
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    let bytes: Vec<u8> = samples.iter().map(|&s| to_unsigned(s)).collect();
    w.write_all(&bytes)
}

/// WAV 8-bit is unsigned with silence at 128.
fn to_unsigned(sample: i8) -> u8 {
    (sample as i16 + 128) as u8
}
