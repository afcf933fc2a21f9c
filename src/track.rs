//! Per-track sample index: chunk/offset/time arithmetic over the immutable
//! sample tables of one `trak` box.
//!
//! Every query walks the run-length tables again from the top. That is fine
//! for a sequential player asking for samples in order; a seek-heavy caller
//! should memoize offsets (or prefix sums) on its side.

use crate::atoms::{AvcCBox, MdhdBox, StcoBox, StscBox, StssBox, StszBox, SttsBox, TkhdBox};
use crate::boxes::{BoxData, FourCC, Mp4Box};
use crate::error::{DemuxError, Result};
use log::warn;

/// Immutable handle for one media track, registered under its `tkhd`
/// track id when the containing file is parsed.
#[derive(Debug, Clone)]
pub struct Track {
    track_id: u32,
    handler: FourCC,
    width: u32,
    height: u32,
    timescale: u32,
    duration: u32,
    language: String,
    codec: Option<FourCC>,
    avcc: Option<AvcCBox>,
    stts: SttsBox,
    stsc: StscBox,
    stsz: StszBox,
    stco: StcoBox,
    stss: Option<StssBox>,
}

fn missing(trak: &Mp4Box, what: &str) -> DemuxError {
    DemuxError::structural(trak.header.start, format!("'trak' is missing '{}'", what))
}

impl Track {
    /// Build a track from a parsed `trak` subtree.
    pub fn from_trak(trak: &Mp4Box) -> Result<Self> {
        let tkhd = match trak.child(FourCC(*b"tkhd")).map(|b| &b.data) {
            Some(BoxData::Tkhd(t)) => t,
            _ => return Err(missing(trak, "tkhd")),
        };
        let mdhd = match trak.find("mdia.mdhd").map(|b| &b.data) {
            Some(BoxData::Mdhd(m)) => m,
            _ => return Err(missing(trak, "mdia.mdhd")),
        };
        let hdlr = match trak.find("mdia.hdlr").map(|b| &b.data) {
            Some(BoxData::Hdlr(h)) => h,
            _ => return Err(missing(trak, "mdia.hdlr")),
        };
        let stbl = trak
            .find("mdia.minf.stbl")
            .ok_or_else(|| missing(trak, "mdia.minf.stbl"))?;

        let stts = match stbl.child(FourCC(*b"stts")).map(|b| &b.data) {
            Some(BoxData::Stts(t)) => t.clone(),
            _ => return Err(missing(trak, "stbl.stts")),
        };
        let stsc = match stbl.child(FourCC(*b"stsc")).map(|b| &b.data) {
            Some(BoxData::Stsc(t)) => t.clone(),
            _ => return Err(missing(trak, "stbl.stsc")),
        };
        let stsz = match stbl.child(FourCC(*b"stsz")).map(|b| &b.data) {
            Some(BoxData::Stsz(t)) => t.clone(),
            _ => return Err(missing(trak, "stbl.stsz")),
        };
        let stco = match stbl.child(FourCC(*b"stco")).map(|b| &b.data) {
            Some(BoxData::Stco(t)) => t.clone(),
            _ => return Err(missing(trak, "stbl.stco")),
        };
        let stss = match stbl.child(FourCC(*b"stss")).map(|b| &b.data) {
            Some(BoxData::Stss(t)) => Some(t.clone()),
            _ => None,
        };

        // First sample entry decides the codec; avc1 carries the decoder
        // configuration in its nested avcC.
        let mut codec = None;
        let mut avcc = None;
        if let Some(BoxData::Stsd(stsd)) = stbl.child(FourCC(*b"stsd")).map(|b| &b.data)
            && let Some(entry) = stsd.entries.first()
        {
            codec = Some(entry.header.typ);
            if let Some(BoxData::AvcC(c)) = entry.child(FourCC(*b"avcC")).map(|b| &b.data) {
                avcc = Some(c.clone());
            }
        }

        let track = Track {
            track_id: tkhd.track_id,
            handler: hdlr.handler_type,
            width: tkhd.width as u32,
            height: tkhd.height as u32,
            timescale: mdhd.timescale,
            duration: mdhd.duration,
            language: mdhd.language.clone(),
            codec,
            avcc,
            stts,
            stsc,
            stsz,
            stco,
            stss,
        };
        track.validate(trak, tkhd, mdhd)?;
        Ok(track)
    }

    /// Reject tables the index arithmetic cannot walk; the declared-duration
    /// mismatch is only an inconsistency worth flagging, not a failure.
    fn validate(&self, trak: &Mp4Box, tkhd: &TkhdBox, mdhd: &MdhdBox) -> Result<()> {
        let at = trak.header.start;
        if self.sample_count() > 0 {
            if self.stsc.entries.is_empty() {
                return Err(DemuxError::structural(at, "empty stsc for a non-empty track"));
            }
            if self.stco.offsets.is_empty() {
                return Err(DemuxError::structural(at, "empty stco for a non-empty track"));
            }
        }
        let mut prev_first = 0u32;
        for row in &self.stsc.entries {
            if row.samples_per_chunk == 0 {
                return Err(DemuxError::structural(at, "stsc row with zero samples per chunk"));
            }
            if row.first_chunk <= prev_first {
                return Err(DemuxError::structural(
                    at,
                    format!("stsc first-chunk {} does not increase", row.first_chunk),
                ));
            }
            prev_first = row.first_chunk;
        }
        if let Some(first) = self.stsc.entries.first()
            && first.first_chunk != 1
        {
            return Err(DemuxError::structural(at, "stsc does not start at chunk 1"));
        }

        let total = self.total_time();
        if total != mdhd.duration as u64 {
            warn!(
                "track {}: time-to-sample total {} disagrees with declared duration {}",
                tkhd.track_id, total, mdhd.duration
            );
        }
        Ok(())
    }

    // ---------- Identity and display properties ----------

    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    /// Handler type from `hdlr` ("vide", "soun", ...); the supported way to
    /// tell video from audio, instead of relying on declaration order.
    pub fn handler_type(&self) -> FourCC {
        self.handler
    }

    /// Declared display size from `tkhd` (integer part of 16.16).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn timescale(&self) -> u32 {
        self.timescale
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Type code of the first sample entry (e.g. "avc1", "mp4a").
    pub fn codec(&self) -> Option<FourCC> {
        self.codec
    }

    pub fn avcc(&self) -> Option<&AvcCBox> {
        self.avcc.as_ref()
    }

    /// SPS and PPS byte slices from the decoder configuration; these must
    /// reach the decoder before any picture NAL unit.
    pub fn parameter_sets(&self) -> Option<(&[u8], &[u8])> {
        let avcc = self.avcc.as_ref()?;
        Some((avcc.sps.first()?.as_slice(), avcc.pps.first()?.as_slice()))
    }

    // ---------- Sample arithmetic ----------

    pub fn sample_count(&self) -> usize {
        self.stsz.sample_count as usize
    }

    /// Sum of the sizes of `len` consecutive samples starting at `start`.
    /// `len == 0` is a valid empty sum.
    pub fn sample_to_size(&self, start: usize, len: usize) -> Result<u64> {
        if len == 0 {
            return Ok(0);
        }
        let count = self.sample_count();
        if start >= count || len > count - start {
            return Err(DemuxError::out_of_range(format!(
                "samples {}..{} of {}",
                start,
                start + len,
                count
            )));
        }
        if self.stsz.sample_size != 0 {
            return Ok(self.stsz.sample_size as u64 * len as u64);
        }
        Ok(self.stsz.sizes[start..start + len]
            .iter()
            .map(|&s| s as u64)
            .sum())
    }

    /// Which chunk holds a sample, and the sample's position within that
    /// chunk. Both 0-based. The last table row extends over all remaining
    /// chunks, so no terminating sentinel row is needed.
    pub fn sample_to_chunk(&self, sample: usize) -> Result<(usize, usize)> {
        let count = self.sample_count();
        if sample >= count {
            return Err(DemuxError::out_of_range(format!(
                "sample {} of {}",
                sample, count
            )));
        }
        let rows = &self.stsc.entries;

        if rows.len() == 1 {
            let spc = rows[0].samples_per_chunk as usize;
            return Ok((sample / spc, sample % spc));
        }

        let mut consumed = 0usize;
        for (i, row) in rows.iter().enumerate() {
            let first = (row.first_chunk - 1) as usize;
            let spc = row.samples_per_chunk as usize;
            let in_row = if let Some(next) = rows.get(i + 1) {
                (next.first_chunk - row.first_chunk) as usize * spc
            } else {
                // open-ended final row
                count - consumed
            };
            if sample < consumed + in_row {
                let rel = sample - consumed;
                return Ok((first + rel / spc, rel % spc));
            }
            consumed += in_row;
        }

        // validate() guarantees the rows cover every sample below count
        Err(DemuxError::out_of_range(format!(
            "sample {} beyond chunk table coverage",
            sample
        )))
    }

    /// Absolute file offset of a chunk (0-based index into `stco`).
    pub fn chunk_to_offset(&self, chunk: usize) -> Result<u64> {
        self.stco
            .offsets
            .get(chunk)
            .map(|&o| o as u64)
            .ok_or_else(|| {
                DemuxError::out_of_range(format!(
                    "chunk {} of {}",
                    chunk,
                    self.stco.offsets.len()
                ))
            })
    }

    pub fn chunk_count(&self) -> usize {
        self.stco.offsets.len()
    }

    /// Absolute file offset of a sample: its chunk's base offset plus the
    /// sizes of the samples before it in the same chunk.
    pub fn sample_to_offset(&self, sample: usize) -> Result<u64> {
        let (chunk, within) = self.sample_to_chunk(sample)?;
        let base = self.chunk_to_offset(chunk)?;
        Ok(base + self.sample_to_size(sample - within, within)?)
    }

    /// Which sample is playing at a given media-time tick.
    pub fn time_to_sample(&self, time: u64) -> Result<usize> {
        let mut remaining = time;
        let mut consumed = 0usize;
        for row in &self.stts.entries {
            let row_total = row.sample_count as u64 * row.sample_delta as u64;
            if remaining < row_total {
                return Ok(consumed + (remaining / row.sample_delta as u64) as usize);
            }
            remaining -= row_total;
            consumed += row.sample_count as usize;
        }
        Err(DemuxError::out_of_range(format!(
            "time {} at or past track end {}",
            time,
            self.total_time()
        )))
    }

    /// Total media time covered by the time-to-sample table.
    pub fn total_time(&self) -> u64 {
        self.stts
            .entries
            .iter()
            .map(|row| row.sample_count as u64 * row.sample_delta as u64)
            .sum()
    }

    pub fn time_to_seconds(&self, time: u64) -> f64 {
        time as f64 / self.timescale as f64
    }

    pub fn seconds_to_time(&self, seconds: f64) -> u64 {
        (seconds * self.timescale as f64) as u64
    }

    pub fn duration_seconds(&self) -> f64 {
        self.time_to_seconds(self.duration as u64)
    }

    /// Whether a sample (0-based) is a sync sample. Without an `stss` table
    /// every sample is a sync sample.
    pub fn is_sync_sample(&self, sample: usize) -> bool {
        match &self.stss {
            Some(stss) => stss.sample_numbers.binary_search(&(sample as u32 + 1)).is_ok(),
            None => true,
        }
    }
}
