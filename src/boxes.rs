use crate::atoms::{
    Avc1Box, AvcCBox, BtrtBox, FtypBox, HdlrBox, MdatBox, MdhdBox, Mp4aBox, MvhdBox, SmhdBox,
    StcoBox, StscBox, StsdBox, StssBox, StszBox, SttsBox, TkhdBox,
};
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else {
            None
        }
    }

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl serde::Serialize for FourCC {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

/// Box header as declared in the stream: 4-byte size + 4-byte type.
///
/// `size` is the total encoded length including the header and any children.
/// 64-bit ("size==1") and to-end ("size==0") markers are rejected during
/// parsing, so `header_size` is always 8 here.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BoxHeader {
    pub size: u64,
    pub typ: FourCC,
    pub header_size: u64,
    pub start: u64,
}

impl BoxHeader {
    /// Absolute offset one past the last byte of this box.
    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

/// Typed payload of a box: a closed set of variants, one per supported type.
///
/// Container types hold their children in first-seen order; a type occurring
/// twice under the same parent simply occurs twice in the sequence, so there
/// is no scalar/list ambiguity to resolve.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxData {
    Ftyp(FtypBox),
    Mvhd(MvhdBox),
    Tkhd(TkhdBox),
    Mdhd(MdhdBox),
    Hdlr(HdlrBox),
    Stsd(StsdBox),
    Avc1(Avc1Box),
    Mp4a(Mp4aBox),
    AvcC(AvcCBox),
    Btrt(BtrtBox),
    Stts(SttsBox),
    Stss(StssBox),
    Stsc(StscBox),
    Stsz(StszBox),
    Stco(StcoBox),
    Smhd(SmhdBox),
    /// Media payload; retained as a byte range into the source, never copied.
    Mdat(MdatBox),
    /// Pure container (moov, trak, mdia, minf, stbl).
    Container(Vec<Mp4Box>),
    /// Recognized by header only; payload skipped by declared size.
    Skipped,
}

/// One node of the box tree.
#[derive(Debug, serde::Serialize)]
pub struct Mp4Box {
    pub header: BoxHeader,
    /// Present only for full boxes (version + 24-bit flags).
    pub version: Option<u8>,
    pub flags: Option<u32>,
    pub data: BoxData,
}

impl Mp4Box {
    /// Child boxes of this node, in first-seen order. Empty for leaves.
    pub fn children(&self) -> &[Mp4Box] {
        match &self.data {
            BoxData::Container(kids) => kids,
            BoxData::Stsd(stsd) => &stsd.entries,
            BoxData::Avc1(avc1) => &avc1.children,
            BoxData::Mp4a(mp4a) => &mp4a.children,
            _ => &[],
        }
    }

    /// First child with the given type code.
    pub fn child(&self, typ: FourCC) -> Option<&Mp4Box> {
        self.children().iter().find(|c| c.header.typ == typ)
    }

    /// All children with the given type code, in order of appearance.
    pub fn children_of(&self, typ: FourCC) -> impl Iterator<Item = &Mp4Box> {
        self.children().iter().filter(move |c| c.header.typ == typ)
    }

    /// Resolve a dotted/indexed path below this box, e.g.
    /// `"mdia.minf.stbl.stsd"`. Returns the first match.
    pub fn find(&self, path: &str) -> Option<&Mp4Box> {
        find_all(self.children(), path).into_iter().next()
    }
}

// ---------- Path queries: moov.trak[1].mdia.minf.stbl ----------

/// Resolve a dotted/indexed box-type path against a list of sibling roots.
/// Each segment is a 4CC with an optional `[i]` index into the matches at
/// that level; without an index, all matches are followed.
pub fn find_all<'a>(roots: &'a [Mp4Box], path: &str) -> Vec<&'a Mp4Box> {
    let mut current: Vec<&'a Mp4Box> = roots.iter().collect();

    for (depth, seg) in path.split('.').enumerate() {
        let (name, idx) = parse_segment(seg);
        let Some(fourcc) = FourCC::from_str(name) else {
            return Vec::new();
        };

        let mut next = Vec::new();
        if depth == 0 {
            select(current.into_iter(), fourcc, idx, &mut next);
        } else {
            for b in &current {
                select(b.children().iter(), fourcc, idx, &mut next);
            }
        }

        current = next;
        if current.is_empty() {
            break;
        }
    }

    current
}

fn select<'a>(
    candidates: impl Iterator<Item = &'a Mp4Box>,
    typ: FourCC,
    idx: Option<usize>,
    out: &mut Vec<&'a Mp4Box>,
) {
    let mut matches: Vec<&Mp4Box> = candidates.filter(|b| b.header.typ == typ).collect();
    match idx {
        Some(i) if i < matches.len() => out.push(matches[i]),
        Some(_) => {}
        None => out.append(&mut matches),
    }
}

fn parse_segment(seg: &str) -> (&str, Option<usize>) {
    if let Some(l) = seg.find('[') {
        let name = &seg[..l];
        if let Some(r) = seg[l + 1..].find(']') {
            let idx = seg[l + 1..l + 1 + r].parse::<usize>().ok();
            return (name, idx);
        }
        (name, None)
    } else {
        (seg, None)
    }
}
