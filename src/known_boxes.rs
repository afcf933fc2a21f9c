use crate::boxes::FourCC;

/// Typed view over the box types this demuxer understands.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)` and is
/// skipped by its declared size during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // File-level
    Ftyp,
    Mdat,

    // Containers
    Moov,
    Trak,
    Mdia,
    Minf,
    Stbl,

    // Headers
    Mvhd,
    Tkhd,
    Mdhd,
    Hdlr,
    Smhd,

    // Sample description and codec configuration
    Stsd,
    Avc1,
    Mp4a,
    Avcc,
    Btrt,
    Esds,

    // Sample tables
    Stts,
    Stss,
    Stsc,
    Stsz,
    Stco,

    // Anything else
    Unknown(FourCC),
}

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"ftyp" => KnownBox::Ftyp,
            b"mdat" => KnownBox::Mdat,

            b"moov" => KnownBox::Moov,
            b"trak" => KnownBox::Trak,
            b"mdia" => KnownBox::Mdia,
            b"minf" => KnownBox::Minf,
            b"stbl" => KnownBox::Stbl,

            b"mvhd" => KnownBox::Mvhd,
            b"tkhd" => KnownBox::Tkhd,
            b"mdhd" => KnownBox::Mdhd,
            b"hdlr" => KnownBox::Hdlr,
            b"smhd" => KnownBox::Smhd,

            b"stsd" => KnownBox::Stsd,
            b"avc1" => KnownBox::Avc1,
            b"mp4a" => KnownBox::Mp4a,
            b"avcC" => KnownBox::Avcc,
            b"btrt" => KnownBox::Btrt,
            b"esds" => KnownBox::Esds,

            b"stts" => KnownBox::Stts,
            b"stss" => KnownBox::Stss,
            b"stsc" => KnownBox::Stsc,
            b"stsz" => KnownBox::Stsz,
            b"stco" => KnownBox::Stco,

            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    /// Does this box *contain* child boxes (container semantics)?
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            KnownBox::Moov | KnownBox::Trak | KnownBox::Mdia | KnownBox::Minf | KnownBox::Stbl
        )
    }

    /// Is this a FullBox (version + flags before type-specific content)?
    pub fn is_full_box(&self) -> bool {
        matches!(
            self,
            KnownBox::Mvhd
                | KnownBox::Tkhd
                | KnownBox::Mdhd
                | KnownBox::Hdlr
                | KnownBox::Smhd
                | KnownBox::Stsd
                | KnownBox::Esds
                | KnownBox::Stts
                | KnownBox::Stss
                | KnownBox::Stsc
                | KnownBox::Stsz
                | KnownBox::Stco
        )
    }

    /// Does the payload layout depend on the version byte being zero?
    /// These types fail fast on any other version instead of mis-reading
    /// every following field.
    pub fn requires_version_zero(&self) -> bool {
        matches!(
            self,
            KnownBox::Mvhd
                | KnownBox::Tkhd
                | KnownBox::Mdhd
                | KnownBox::Smhd
                | KnownBox::Stts
                | KnownBox::Stss
                | KnownBox::Stsc
                | KnownBox::Stsz
                | KnownBox::Stco
        )
    }

    /// Human-readable box type name.
    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Ftyp => "File Type Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Moov => "Movie Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Mvhd => "Movie Header Box",
            KnownBox::Tkhd => "Track Header Box",
            KnownBox::Mdhd => "Media Header Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Smhd => "Sound Media Header Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Avc1 => "AVC Sample Entry",
            KnownBox::Mp4a => "MP4 Audio Sample Entry",
            KnownBox::Avcc => "AVC Configuration Box",
            KnownBox::Btrt => "Bit Rate Box",
            KnownBox::Esds => "Elementary Stream Descriptor Box",
            KnownBox::Stts => "Decoding Time to Sample Box",
            KnownBox::Stss => "Sync Sample Box",
            KnownBox::Stsc => "Sample to Chunk Box",
            KnownBox::Stsz => "Sample Size Box",
            KnownBox::Stco => "Chunk Offset Box",
            KnownBox::Unknown(_) => "Unknown Box",
        }
    }
}
