use crate::atoms::{
    Avc1Box, AvcCBox, BtrtBox, FtypBox, HdlrBox, MdatBox, MdhdBox, Mp4aBox, MvhdBox, SmhdBox,
    StcoBox, StscBox, StsdBox, StssBox, StszBox, SttsBox, TkhdBox,
};
use crate::boxes::{BoxData, BoxHeader, FourCC, Mp4Box, find_all};
use crate::error::{DemuxError, Result};
use crate::known_boxes::KnownBox;
use crate::track::Track;
use byteorder::{BigEndian, ReadBytesExt};
use log::debug;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Read one box header (size + type) at the current position.
///
/// The 64-bit ("size==1") and to-end ("size==0") size markers are not
/// implemented; both are reported as unsupported rather than mis-read.
pub fn read_box_header<R: Read + Seek>(r: &mut R) -> Result<BoxHeader> {
    let start = r.stream_position()?;
    let size32 = r.read_u32::<BigEndian>()?;
    let mut typ = [0u8; 4];
    r.read_exact(&mut typ)?;
    let typ = FourCC(typ);

    match size32 as u64 {
        0 => Err(DemuxError::unsupported(typ, start, "to-end (size 0) box")),
        1 => Err(DemuxError::unsupported(typ, start, "64-bit (size 1) box")),
        size if size < 8 => Err(DemuxError::structural(
            start,
            format!("'{}' declares size {} below the 8-byte header", typ, size),
        )),
        size => Ok(BoxHeader {
            size,
            typ,
            header_size: 8,
            start,
        }),
    }
}

/// Read child boxes until `end`: while at least 4 bytes remain and the next
/// declared size is non-zero, read one box. Whatever the loop does not
/// consume (trailing slack, zero padding) is skipped, so the caller's own
/// bookkeeping always lands exactly on `end`.
pub fn read_children<R: Read + Seek>(r: &mut R, end: u64) -> Result<Vec<Mp4Box>> {
    let mut kids = Vec::new();
    loop {
        let pos = r.stream_position()?;
        if pos + 4 > end {
            break;
        }
        let next_size = r.read_u32::<BigEndian>()?;
        r.seek(SeekFrom::Start(pos))?;
        if next_size == 0 {
            break;
        }
        kids.push(read_box(r, end)?);
    }
    r.seek(SeekFrom::Start(end))?;
    Ok(kids)
}

/// Read a single box, dispatching on its type code. Unknown types are kept
/// as `Skipped` nodes and never fail the parse; the cursor always ends up
/// exactly one declared size past the box's start.
pub fn read_box<R: Read + Seek>(r: &mut R, parent_end: u64) -> Result<Mp4Box> {
    let hdr = read_box_header(r)?;
    let box_end = hdr.end();
    if box_end > parent_end {
        return Err(DemuxError::structural(
            hdr.start,
            format!(
                "'{}' declares {} bytes but only {} remain in its parent",
                hdr.typ,
                hdr.size,
                parent_end - hdr.start
            ),
        ));
    }

    let kb = KnownBox::from(hdr.typ);

    // Full boxes carry a version byte and 24-bit flags before their payload.
    let (version, flags) = if kb.is_full_box() {
        if hdr.size < hdr.header_size + 4 {
            return Err(DemuxError::structural(
                hdr.start,
                format!("'{}' too small for a full-box header", hdr.typ),
            ));
        }
        let version = r.read_u8()?;
        let mut f = [0u8; 3];
        r.read_exact(&mut f)?;
        let flags = ((f[0] as u32) << 16) | ((f[1] as u32) << 8) | (f[2] as u32);
        if version != 0 && kb.requires_version_zero() {
            return Err(DemuxError::unsupported(
                hdr.typ,
                hdr.start,
                format!("version {} (only version 0 is implemented)", version),
            ));
        }
        (Some(version), Some(flags))
    } else {
        (None, None)
    };

    let data = if kb.is_container() {
        BoxData::Container(read_children(r, box_end)?)
    } else {
        match kb {
            KnownBox::Ftyp => BoxData::Ftyp(FtypBox::parse(r, &hdr)?),
            KnownBox::Mvhd => BoxData::Mvhd(MvhdBox::parse(r, &hdr)?),
            KnownBox::Tkhd => BoxData::Tkhd(TkhdBox::parse(r, &hdr)?),
            KnownBox::Mdhd => BoxData::Mdhd(MdhdBox::parse(r, &hdr)?),
            KnownBox::Hdlr => BoxData::Hdlr(HdlrBox::parse(r, &hdr)?),
            KnownBox::Smhd => BoxData::Smhd(SmhdBox::parse(r, &hdr)?),
            KnownBox::Stsd => BoxData::Stsd(StsdBox::parse(r, &hdr)?),
            KnownBox::Avc1 => BoxData::Avc1(Avc1Box::parse(r, &hdr)?),
            KnownBox::Mp4a => BoxData::Mp4a(Mp4aBox::parse(r, &hdr)?),
            KnownBox::Avcc => BoxData::AvcC(AvcCBox::parse(r, &hdr)?),
            KnownBox::Btrt => BoxData::Btrt(BtrtBox::parse(r, &hdr)?),
            KnownBox::Stts => BoxData::Stts(SttsBox::parse(r, &hdr)?),
            KnownBox::Stss => BoxData::Stss(StssBox::parse(r, &hdr)?),
            KnownBox::Stsc => BoxData::Stsc(StscBox::parse(r, &hdr)?),
            KnownBox::Stsz => BoxData::Stsz(StszBox::parse(r, &hdr)?),
            KnownBox::Stco => BoxData::Stco(StcoBox::parse(r, &hdr)?),
            KnownBox::Mdat => BoxData::Mdat(MdatBox {
                data_offset: hdr.start + hdr.header_size,
                data_len: hdr.size - hdr.header_size,
            }),
            // esds contents are descriptor soup this demuxer has no use
            // for; unknown types are forward compatibility by definition.
            _ => BoxData::Skipped,
        }
    };

    // Skip any payload bytes the typed parse did not consume.
    r.seek(SeekFrom::Start(box_end))?;

    Ok(Mp4Box {
        header: hdr,
        version,
        flags,
        data,
    })
}

/// A fully parsed container: the box tree plus one `Track` per `trak`,
/// keyed by track id. Immutable once built.
#[derive(Debug)]
pub struct Mp4File {
    pub boxes: Vec<Mp4Box>,
    pub tracks: BTreeMap<u32, Track>,
}

impl Mp4File {
    /// Parse a complete file, starting from offset 0 of the reader. `len`
    /// is the total number of bytes to consume; the whole buffer must
    /// already be resident (there is no incremental mode).
    pub fn parse<R: Read + Seek>(r: &mut R, len: u64) -> Result<Self> {
        r.seek(SeekFrom::Start(0))?;
        let boxes = read_children(r, len)?;

        let mut tracks = BTreeMap::new();
        for moov in boxes.iter().filter(|b| b.header.typ == FourCC(*b"moov")) {
            for trak in moov.children_of(FourCC(*b"trak")) {
                let track = Track::from_trak(trak)?;
                tracks.insert(track.track_id(), track);
            }
        }
        debug!(
            "parsed {} top-level boxes, {} track(s)",
            boxes.len(),
            tracks.len()
        );

        Ok(Mp4File { boxes, tracks })
    }

    /// Parse a complete file from an in-memory buffer.
    pub fn parse_bytes(data: &[u8]) -> Result<Self> {
        Self::parse(&mut Cursor::new(data), data.len() as u64)
    }

    /// First box matching a dotted/indexed path such as
    /// `"moov.trak[0].mdia.minf.stbl.stsd"`.
    pub fn find(&self, path: &str) -> Option<&Mp4Box> {
        self.find_all(path).into_iter().next()
    }

    /// All boxes matching a dotted/indexed path.
    pub fn find_all(&self, path: &str) -> Vec<&Mp4Box> {
        find_all(&self.boxes, path)
    }

    /// Track with the given id.
    pub fn track(&self, track_id: u32) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// Tracks whose `hdlr` handler type matches, in track-id order. Callers
    /// pick video/audio by handler type rather than by declaration order.
    pub fn tracks_with_handler(&self, handler: FourCC) -> impl Iterator<Item = &Track> {
        self.tracks
            .values()
            .filter(move |t| t.handler_type() == handler)
    }
}
