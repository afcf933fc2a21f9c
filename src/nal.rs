//! NAL unit extraction from AVCC-formatted samples.
//!
//! Inside the container a sample is a run of NAL units, each prefixed with a
//! 4-byte big-endian length instead of an Annex-B start code. A bitstream
//! decoder wants the raw payloads, so the prefixes are stripped here.

use crate::error::{DemuxError, Result};
use crate::track::Track;

/// Slice one sample of `data` into its NAL unit payloads, in order and
/// without the length prefixes. The sample's declared size must be consumed
/// exactly; a prefix that would run past it is a structural error.
pub fn sample_nal_units<'a>(
    data: &'a [u8],
    track: &Track,
    sample: usize,
) -> Result<Vec<&'a [u8]>> {
    let offset = track.sample_to_offset(sample)?;
    let size = track.sample_to_size(sample, 1)?;
    let end = offset + size;
    if end > data.len() as u64 {
        return Err(DemuxError::structural(
            offset,
            format!(
                "sample {} spans {}..{} but the buffer holds {} bytes",
                sample,
                offset,
                end,
                data.len()
            ),
        ));
    }

    let mut pos = offset as usize;
    let end = end as usize;
    let mut units = Vec::new();
    while pos < end {
        if pos + 4 > end {
            return Err(DemuxError::structural(
                pos as u64,
                format!("sample {}: truncated NAL length prefix", sample),
            ));
        }
        let len = u32::from_be_bytes(data[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        if len > end - pos {
            return Err(DemuxError::structural(
                pos as u64,
                format!(
                    "sample {}: NAL length {} runs past the sample end",
                    sample, len
                ),
            ));
        }
        units.push(&data[pos..pos + len]);
        pos += len;
    }
    Ok(units)
}
