//! Typed payloads for the box types this demuxer decodes, one fixed-layout
//! struct per type. Parsing follows the declared schema exactly; any field
//! whose value would change the layout of later fields (full-box versions,
//! the avcC length size, the avc1 color-table sentinel) fails fast instead
//! of mis-reading the remainder of the stream.

use crate::boxes::{BoxHeader, FourCC, Mp4Box};
use crate::error::{DemuxError, Result};
use crate::parser::read_children;
use crate::reader::ReadBmffExt;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Read, Seek};

/// Bytes left between the stream position and the end of the box.
fn remaining<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<u64> {
    Ok(hdr.end().saturating_sub(r.stream_position()?))
}

/// Fail with a structural error unless `want` bytes fit into `have`.
fn need(hdr: &BoxHeader, have: u64, want: u64, what: &str) -> Result<()> {
    if want > have {
        return Err(DemuxError::structural(
            hdr.start,
            format!(
                "'{}' {}: needs {} bytes, {} available",
                hdr.typ, what, want, have
            ),
        ));
    }
    Ok(())
}

// ---------- File type ----------

#[derive(Debug, Clone, serde::Serialize)]
pub struct FtypBox {
    pub major_brand: FourCC,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCC>,
}

impl FtypBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 8, "brand header")?;
        let major_brand = r.read_fourcc()?;
        let minor_version = r.read_u32::<BigEndian>()?;
        // Compatible brands fill whatever is left, 4 bytes each.
        let count = ((have - 8) / 4) as usize;
        let mut compatible_brands = Vec::with_capacity(count);
        for _ in 0..count {
            compatible_brands.push(r.read_fourcc()?);
        }
        Ok(FtypBox {
            major_brand,
            minor_version,
            compatible_brands,
        })
    }
}

// ---------- Movie / track / media headers ----------

#[derive(Debug, Clone, serde::Serialize)]
pub struct MvhdBox {
    pub creation_time: u32,
    pub modification_time: u32,
    pub timescale: u32,
    pub duration: u32,
    pub rate: f64,
    pub volume: f64,
    pub matrix: [u32; 9],
    pub next_track_id: u32,
}

impl MvhdBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 96, "movie header fields")?;
        let creation_time = r.read_u32::<BigEndian>()?;
        let modification_time = r.read_u32::<BigEndian>()?;
        let timescale = r.read_u32::<BigEndian>()?;
        let duration = r.read_u32::<BigEndian>()?;
        let rate = r.read_fixed16()?;
        let volume = r.read_fixed8()?;
        r.skip_bytes(10)?;
        let matrix = read_matrix(r)?;
        r.skip_bytes(24)?;
        let next_track_id = r.read_u32::<BigEndian>()?;
        Ok(MvhdBox {
            creation_time,
            modification_time,
            timescale,
            duration,
            rate,
            volume,
            matrix,
            next_track_id,
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TkhdBox {
    pub creation_time: u32,
    pub modification_time: u32,
    pub track_id: u32,
    pub duration: u32,
    pub layer: u16,
    pub alternate_group: u16,
    pub volume: f64,
    pub matrix: [u32; 9],
    pub width: f64,
    pub height: f64,
}

impl TkhdBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 80, "track header fields")?;
        let creation_time = r.read_u32::<BigEndian>()?;
        let modification_time = r.read_u32::<BigEndian>()?;
        let track_id = r.read_u32::<BigEndian>()?;
        r.skip_bytes(4)?;
        let duration = r.read_u32::<BigEndian>()?;
        r.skip_bytes(8)?;
        let layer = r.read_u16::<BigEndian>()?;
        let alternate_group = r.read_u16::<BigEndian>()?;
        let volume = r.read_fixed8()?;
        r.skip_bytes(2)?;
        let matrix = read_matrix(r)?;
        let width = r.read_fixed16()?;
        let height = r.read_fixed16()?;
        Ok(TkhdBox {
            creation_time,
            modification_time,
            track_id,
            duration,
            layer,
            alternate_group,
            volume,
            matrix,
            width,
            height,
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MdhdBox {
    pub creation_time: u32,
    pub modification_time: u32,
    pub timescale: u32,
    pub duration: u32,
    pub language: String,
}

impl MdhdBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 20, "media header fields")?;
        let creation_time = r.read_u32::<BigEndian>()?;
        let modification_time = r.read_u32::<BigEndian>()?;
        let timescale = r.read_u32::<BigEndian>()?;
        let duration = r.read_u32::<BigEndian>()?;
        let language = r.read_language()?;
        r.skip_bytes(2)?;
        Ok(MdhdBox {
            creation_time,
            modification_time,
            timescale,
            duration,
            language,
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HdlrBox {
    pub handler_type: FourCC,
    /// Trailing UTF-8 handler name; empty when absent.
    pub name: String,
}

impl HdlrBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 20, "handler fields")?;
        r.skip_bytes(4)?;
        let handler_type = r.read_fourcc()?;
        r.skip_bytes(12)?;
        let mut name_bytes = vec![0u8; (have - 20) as usize];
        r.read_exact(&mut name_bytes)?;
        // strip trailing nulls
        while name_bytes.last() == Some(&0) {
            name_bytes.pop();
        }
        Ok(HdlrBox {
            handler_type,
            name: String::from_utf8_lossy(&name_bytes).into_owned(),
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SmhdBox {
    pub balance: f64,
}

impl SmhdBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 4, "sound header fields")?;
        let balance = r.read_fixed8()?;
        r.skip_bytes(2)?;
        Ok(SmhdBox { balance })
    }
}

// ---------- Sample description ----------

#[derive(Debug, serde::Serialize)]
pub struct StsdBox {
    pub entry_count: u32,
    /// Sample entries (avc1, mp4a, ...) parsed as child boxes.
    pub entries: Vec<Mp4Box>,
}

impl StsdBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 4, "entry count")?;
        let entry_count = r.read_u32::<BigEndian>()?;
        let entries = read_children(r, hdr.end())?;
        Ok(StsdBox {
            entry_count,
            entries,
        })
    }
}

/// Visual sample entry for H.264 (`avc1`), carrying the codec configuration
/// in its nested `avcC` box.
#[derive(Debug, serde::Serialize)]
pub struct Avc1Box {
    pub data_reference_index: u16,
    pub width: u16,
    pub height: u16,
    pub horiz_resolution: f64,
    pub vert_resolution: f64,
    pub frame_count: u16,
    pub compressor_name: String,
    pub depth: u16,
    pub children: Vec<Mp4Box>,
}

impl Avc1Box {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 78, "visual sample entry fields")?;
        r.skip_bytes(6)?;
        let data_reference_index = r.read_u16::<BigEndian>()?;
        // version, revision, vendor, temporal/spatial quality: not used
        r.skip_bytes(16)?;
        let width = r.read_u16::<BigEndian>()?;
        let height = r.read_u16::<BigEndian>()?;
        let horiz_resolution = r.read_fixed16()?;
        let vert_resolution = r.read_fixed16()?;
        r.skip_bytes(4)?;
        let frame_count = r.read_u16::<BigEndian>()?;
        let compressor_name = r.read_pstring(32)?;
        let depth = r.read_u16::<BigEndian>()?;
        let color_table_id = r.read_u16::<BigEndian>()?;
        if color_table_id != 0xFFFF {
            return Err(DemuxError::unsupported(
                hdr.typ,
                hdr.start,
                format!("color table id {:#x} (expected the 0xffff sentinel)", color_table_id),
            ));
        }
        let children = read_children(r, hdr.end())?;
        Ok(Avc1Box {
            data_reference_index,
            width,
            height,
            horiz_resolution,
            vert_resolution,
            frame_count,
            compressor_name,
            depth,
            children,
        })
    }
}

/// Audio sample entry (`mp4a`), version 0 layout only.
#[derive(Debug, serde::Serialize)]
pub struct Mp4aBox {
    pub data_reference_index: u16,
    pub channel_count: u16,
    pub sample_size: u16,
    pub compression_id: u16,
    pub packet_size: u16,
    /// Integer part of the 16.16 sample rate field.
    pub sample_rate: u32,
    pub children: Vec<Mp4Box>,
}

impl Mp4aBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 28, "audio sample entry fields")?;
        r.skip_bytes(6)?;
        let data_reference_index = r.read_u16::<BigEndian>()?;
        let version = r.read_u16::<BigEndian>()?;
        if version != 0 {
            return Err(DemuxError::unsupported(
                hdr.typ,
                hdr.start,
                format!("audio sample entry version {}", version),
            ));
        }
        r.skip_bytes(6)?;
        let channel_count = r.read_u16::<BigEndian>()?;
        let sample_size = r.read_u16::<BigEndian>()?;
        let compression_id = r.read_u16::<BigEndian>()?;
        let packet_size = r.read_u16::<BigEndian>()?;
        let sample_rate = r.read_u32::<BigEndian>()? >> 16;
        let children = read_children(r, hdr.end())?;
        Ok(Mp4aBox {
            data_reference_index,
            channel_count,
            sample_size,
            compression_id,
            packet_size,
            sample_rate,
            children,
        })
    }
}

/// AVC decoder configuration record (`avcC`): SPS/PPS parameter sets and the
/// NAL length-prefix size. Only 4-byte prefixes are implemented, so any
/// other declared length size is rejected outright.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AvcCBox {
    pub configuration_version: u8,
    pub profile_indication: u8,
    pub profile_compatibility: u8,
    pub level_indication: u8,
    /// NAL length prefix size in bytes; always 4.
    pub nal_length_size: u8,
    pub sps: Vec<Vec<u8>>,
    pub pps: Vec<Vec<u8>>,
}

impl AvcCBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 7, "configuration record")?;
        let configuration_version = r.read_u8()?;
        let profile_indication = r.read_u8()?;
        let profile_compatibility = r.read_u8()?;
        let level_indication = r.read_u8()?;
        let length_size_minus_one = r.read_u8()? & 0x03;
        if length_size_minus_one != 3 {
            return Err(DemuxError::unsupported(
                hdr.typ,
                hdr.start,
                format!("NAL length size {} (only 4 is implemented)", length_size_minus_one + 1),
            ));
        }
        let sps = Self::read_parameter_sets(r, hdr, "SPS")?;
        let pps = Self::read_parameter_sets(r, hdr, "PPS")?;
        Ok(AvcCBox {
            configuration_version,
            profile_indication,
            profile_compatibility,
            level_indication,
            nal_length_size: 4,
            sps,
            pps,
        })
    }

    fn read_parameter_sets<R: Read + Seek>(
        r: &mut R,
        hdr: &BoxHeader,
        what: &str,
    ) -> Result<Vec<Vec<u8>>> {
        need(hdr, remaining(r, hdr)?, 1, what)?;
        let count = (r.read_u8()? & 0x1F) as usize;
        let mut sets = Vec::with_capacity(count);
        for _ in 0..count {
            need(hdr, remaining(r, hdr)?, 2, what)?;
            let len = r.read_u16::<BigEndian>()? as u64;
            need(hdr, remaining(r, hdr)?, len, what)?;
            let mut set = vec![0u8; len as usize];
            r.read_exact(&mut set)?;
            sets.push(set);
        }
        Ok(sets)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BtrtBox {
    pub buffer_size_db: u32,
    pub max_bitrate: u32,
    pub avg_bitrate: u32,
}

impl BtrtBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 12, "bitrate fields")?;
        Ok(BtrtBox {
            buffer_size_db: r.read_u32::<BigEndian>()?,
            max_bitrate: r.read_u32::<BigEndian>()?,
            avg_bitrate: r.read_u32::<BigEndian>()?,
        })
    }
}

// ---------- Sample tables ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

/// Decoding time-to-sample table: run-length (count, delta) rows.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SttsBox {
    pub entries: Vec<SttsEntry>,
}

impl SttsBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 4, "entry count")?;
        let count = r.read_u32::<BigEndian>()? as u64;
        need(hdr, have - 4, count * 8, "time-to-sample rows")?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(SttsEntry {
                sample_count: r.read_u32::<BigEndian>()?,
                sample_delta: r.read_u32::<BigEndian>()?,
            });
        }
        Ok(SttsBox { entries })
    }
}

/// Sync sample table: 1-based sample numbers of keyframes.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StssBox {
    pub sample_numbers: Vec<u32>,
}

impl StssBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 4, "entry count")?;
        let count = r.read_u32::<BigEndian>()? as u64;
        need(hdr, have - 4, count * 4, "sync sample numbers")?;
        let mut sample_numbers = Vec::with_capacity(count as usize);
        for _ in 0..count {
            sample_numbers.push(r.read_u32::<BigEndian>()?);
        }
        Ok(StssBox { sample_numbers })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StscEntry {
    /// 1-based index of the first chunk this row applies to.
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_id: u32,
}

/// Sample-to-chunk table: run-length rows, the last of which is open-ended.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StscBox {
    pub entries: Vec<StscEntry>,
}

impl StscBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 4, "entry count")?;
        let count = r.read_u32::<BigEndian>()? as u64;
        need(hdr, have - 4, count * 12, "sample-to-chunk rows")?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(StscEntry {
                first_chunk: r.read_u32::<BigEndian>()?,
                samples_per_chunk: r.read_u32::<BigEndian>()?,
                sample_description_id: r.read_u32::<BigEndian>()?,
            });
        }
        Ok(StscBox { entries })
    }
}

/// Sample size table: either one uniform size for every sample, or a
/// per-sample table when the uniform size is zero.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StszBox {
    pub sample_size: u32,
    pub sample_count: u32,
    /// Empty when `sample_size` is non-zero.
    pub sizes: Vec<u32>,
}

impl StszBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 8, "size header")?;
        let sample_size = r.read_u32::<BigEndian>()?;
        let sample_count = r.read_u32::<BigEndian>()?;
        let mut sizes = Vec::new();
        if sample_size == 0 {
            need(hdr, have - 8, sample_count as u64 * 4, "per-sample sizes")?;
            sizes.reserve(sample_count as usize);
            for _ in 0..sample_count {
                sizes.push(r.read_u32::<BigEndian>()?);
            }
        }
        Ok(StszBox {
            sample_size,
            sample_count,
            sizes,
        })
    }
}

/// Chunk offset table: absolute file offsets, one per chunk.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StcoBox {
    pub offsets: Vec<u32>,
}

impl StcoBox {
    pub(crate) fn parse<R: Read + Seek>(r: &mut R, hdr: &BoxHeader) -> Result<Self> {
        let have = remaining(r, hdr)?;
        need(hdr, have, 4, "entry count")?;
        let count = r.read_u32::<BigEndian>()? as u64;
        need(hdr, have - 4, count * 4, "chunk offsets")?;
        let mut offsets = Vec::with_capacity(count as usize);
        for _ in 0..count {
            offsets.push(r.read_u32::<BigEndian>()?);
        }
        Ok(StcoBox { offsets })
    }
}

// ---------- Media data ----------

/// The encoded media payload. Only the byte range is retained; the content
/// may be large and is sliced on demand by the NAL extractor.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MdatBox {
    pub data_offset: u64,
    pub data_len: u64,
}

fn read_matrix<R: Read>(r: &mut R) -> Result<[u32; 9]> {
    let mut m = [0u32; 9];
    for v in &mut m {
        *v = r.read_u32::<BigEndian>()?;
    }
    Ok(m)
}
