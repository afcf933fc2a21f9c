//! Synthetic ISO BMFF encoder used as a test fixture: builds byte-exact
//! boxes so decoded fields can be compared against what was declared.
#![allow(dead_code)]

/// Absolute offset of the first mdat payload byte in files built by
/// `build_movie` (24-byte ftyp + 8-byte mdat header).
pub const MDAT_DATA_OFFSET: u32 = 32;

pub fn plain_box(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(8 + payload.len());
    v.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

pub fn full_box(typ: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut inner = Vec::with_capacity(4 + payload.len());
    inner.push(version);
    inner.extend_from_slice(&flags.to_be_bytes()[1..]);
    inner.extend_from_slice(payload);
    plain_box(typ, &inner)
}

pub fn container(typ: &[u8; 4], kids: &[Vec<u8>]) -> Vec<u8> {
    plain_box(typ, &kids.concat())
}

pub fn u32s(vals: &[u32]) -> Vec<u8> {
    vals.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn ftyp() -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(b"isom");
    p.extend_from_slice(&512u32.to_be_bytes());
    p.extend_from_slice(b"isom");
    p.extend_from_slice(b"avc1");
    plain_box(b"ftyp", &p)
}

pub fn mvhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&u32s(&[0, 0, timescale, duration]));
    p.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // rate 1.0
    p.extend_from_slice(&0x0100u16.to_be_bytes()); // volume 1.0
    p.extend_from_slice(&[0u8; 10]);
    p.extend_from_slice(&u32s(&unity_matrix()));
    p.extend_from_slice(&[0u8; 24]);
    p.extend_from_slice(&2u32.to_be_bytes()); // next track id
    full_box(b"mvhd", 0, 0, &p)
}

pub fn tkhd(track_id: u32, duration: u32, width: u32, height: u32) -> Vec<u8> {
    tkhd_versioned(0, track_id, duration, width, height)
}

pub fn tkhd_versioned(version: u8, track_id: u32, duration: u32, width: u32, height: u32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&u32s(&[0, 0, track_id, 0, duration]));
    p.extend_from_slice(&[0u8; 8]);
    p.extend_from_slice(&0u16.to_be_bytes()); // layer
    p.extend_from_slice(&0u16.to_be_bytes()); // alternate group
    p.extend_from_slice(&0u16.to_be_bytes()); // volume
    p.extend_from_slice(&[0u8; 2]);
    p.extend_from_slice(&u32s(&unity_matrix()));
    p.extend_from_slice(&(width << 16).to_be_bytes());
    p.extend_from_slice(&(height << 16).to_be_bytes());
    full_box(b"tkhd", version, 0, &p)
}

pub fn mdhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&u32s(&[0, 0, timescale, duration]));
    // "eng" packed as three 5-bit characters
    p.extend_from_slice(&0x15C7u16.to_be_bytes());
    p.extend_from_slice(&[0u8; 2]);
    full_box(b"mdhd", 0, 0, &p)
}

pub fn hdlr(handler: &[u8; 4], name: &str) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&[0u8; 4]);
    p.extend_from_slice(handler);
    p.extend_from_slice(&[0u8; 12]);
    p.extend_from_slice(name.as_bytes());
    p.push(0);
    full_box(b"hdlr", 0, 0, &p)
}

pub fn smhd() -> Vec<u8> {
    full_box(b"smhd", 0, 0, &[0, 0, 0, 0])
}

pub fn stts(rows: &[(u32, u32)]) -> Vec<u8> {
    let mut p = (rows.len() as u32).to_be_bytes().to_vec();
    for &(count, delta) in rows {
        p.extend_from_slice(&u32s(&[count, delta]));
    }
    full_box(b"stts", 0, 0, &p)
}

pub fn stsc(rows: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut p = (rows.len() as u32).to_be_bytes().to_vec();
    for &(first, spc, id) in rows {
        p.extend_from_slice(&u32s(&[first, spc, id]));
    }
    full_box(b"stsc", 0, 0, &p)
}

pub fn stsz(sizes: &[u32]) -> Vec<u8> {
    let mut p = 0u32.to_be_bytes().to_vec();
    p.extend_from_slice(&(sizes.len() as u32).to_be_bytes());
    p.extend_from_slice(&u32s(sizes));
    full_box(b"stsz", 0, 0, &p)
}

pub fn stsz_uniform(size: u32, count: u32) -> Vec<u8> {
    full_box(b"stsz", 0, 0, &u32s(&[size, count]))
}

pub fn stco(offsets: &[u32]) -> Vec<u8> {
    let mut p = (offsets.len() as u32).to_be_bytes().to_vec();
    p.extend_from_slice(&u32s(offsets));
    full_box(b"stco", 0, 0, &p)
}

pub fn stss(sample_numbers: &[u32]) -> Vec<u8> {
    let mut p = (sample_numbers.len() as u32).to_be_bytes().to_vec();
    p.extend_from_slice(&u32s(sample_numbers));
    full_box(b"stss", 0, 0, &p)
}

pub fn avcc(sps: &[u8], pps: &[u8]) -> Vec<u8> {
    avcc_with_length_size(3, sps, pps)
}

pub fn avcc_with_length_size(length_size_minus_one: u8, sps: &[u8], pps: &[u8]) -> Vec<u8> {
    let mut p = vec![1, 0x42, 0xC0, 0x1E, 0xFC | length_size_minus_one];
    p.push(0xE0 | 1); // one SPS
    p.extend_from_slice(&(sps.len() as u16).to_be_bytes());
    p.extend_from_slice(sps);
    p.push(1); // one PPS
    p.extend_from_slice(&(pps.len() as u16).to_be_bytes());
    p.extend_from_slice(pps);
    plain_box(b"avcC", &p)
}

pub fn btrt(buffer_size_db: u32, max_bitrate: u32, avg_bitrate: u32) -> Vec<u8> {
    plain_box(b"btrt", &u32s(&[buffer_size_db, max_bitrate, avg_bitrate]))
}

pub fn avc1(width: u16, height: u16, nested: &[Vec<u8>]) -> Vec<u8> {
    avc1_with_color_table(0xFFFF, width, height, nested)
}

pub fn avc1_with_color_table(
    color_table_id: u16,
    width: u16,
    height: u16,
    nested: &[Vec<u8>],
) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&[0u8; 6]);
    p.extend_from_slice(&1u16.to_be_bytes()); // data reference index
    p.extend_from_slice(&[0u8; 16]); // version..spatial quality
    p.extend_from_slice(&width.to_be_bytes());
    p.extend_from_slice(&height.to_be_bytes());
    p.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // 72 dpi
    p.extend_from_slice(&0x0048_0000u32.to_be_bytes());
    p.extend_from_slice(&[0u8; 4]);
    p.extend_from_slice(&1u16.to_be_bytes()); // frame count
    let mut compressor = vec![4u8];
    compressor.extend_from_slice(b"H264");
    compressor.resize(32, 0);
    p.extend_from_slice(&compressor);
    p.extend_from_slice(&24u16.to_be_bytes()); // depth
    p.extend_from_slice(&color_table_id.to_be_bytes());
    p.extend_from_slice(&nested.concat());
    plain_box(b"avc1", &p)
}

pub fn mp4a(channel_count: u16, sample_rate: u32) -> Vec<u8> {
    mp4a_versioned(0, channel_count, sample_rate)
}

pub fn mp4a_versioned(version: u16, channel_count: u16, sample_rate: u32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&[0u8; 6]);
    p.extend_from_slice(&1u16.to_be_bytes()); // data reference index
    p.extend_from_slice(&version.to_be_bytes());
    p.extend_from_slice(&[0u8; 6]); // revision + vendor
    p.extend_from_slice(&channel_count.to_be_bytes());
    p.extend_from_slice(&16u16.to_be_bytes()); // sample size
    p.extend_from_slice(&0u16.to_be_bytes()); // compression id
    p.extend_from_slice(&0u16.to_be_bytes()); // packet size
    p.extend_from_slice(&(sample_rate << 16).to_be_bytes());
    plain_box(b"mp4a", &p)
}

pub fn stsd(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut p = (entries.len() as u32).to_be_bytes().to_vec();
    p.extend_from_slice(&entries.concat());
    full_box(b"stsd", 0, 0, &p)
}

fn unity_matrix() -> [u32; 9] {
    [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000]
}

/// Track description consumed by `build_movie`.
pub struct TrackSpec {
    pub track_id: u32,
    pub handler: [u8; 4],
    pub width: u32,
    pub height: u32,
    pub timescale: u32,
    pub duration: u32,
    pub stts: Vec<(u32, u32)>,
    pub stsc: Vec<(u32, u32, u32)>,
    pub sizes: Vec<u32>,
    pub stco: Vec<u32>,
    pub stss: Option<Vec<u32>>,
    pub sample_entry: Option<Vec<u8>>,
}

impl TrackSpec {
    /// Video track whose chunks are laid out back to back at the start of
    /// the mdat payload; `stco` is derived from the chunk layout.
    pub fn video(track_id: u32, stsc: Vec<(u32, u32, u32)>, sizes: Vec<u32>) -> Self {
        let duration = sizes.len() as u32; // one tick per sample
        let mut spec = TrackSpec {
            track_id,
            handler: *b"vide",
            width: 640,
            height: 480,
            timescale: 30,
            duration,
            stts: vec![(sizes.len() as u32, 1)],
            stsc,
            sizes,
            stco: Vec::new(),
            stss: None,
            sample_entry: Some(avc1(
                640,
                480,
                &[avcc(&[0x67, 0x42, 0xC0, 0x1E], &[0x68, 0xCE, 0x38, 0x80])],
            )),
        };
        spec.stco = spec.chunk_layout(MDAT_DATA_OFFSET);
        spec
    }

    /// Chunk offsets for samples stored contiguously starting at `base`.
    pub fn chunk_layout(&self, base: u32) -> Vec<u32> {
        let mut offsets = Vec::new();
        let mut sample = 0usize;
        let mut pos = base;
        let mut chunk = 1u32;
        while sample < self.sizes.len() {
            offsets.push(pos);
            let spc = samples_per_chunk(&self.stsc, chunk) as usize;
            for _ in 0..spc.min(self.sizes.len() - sample) {
                pos += self.sizes[sample];
                sample += 1;
            }
            chunk += 1;
        }
        offsets
    }

    pub fn into_trak(self) -> Vec<u8> {
        let mut stbl_kids = Vec::new();
        if let Some(entry) = &self.sample_entry {
            stbl_kids.push(stsd(std::slice::from_ref(entry)));
        }
        stbl_kids.push(stts(&self.stts));
        stbl_kids.push(stsc(&self.stsc));
        stbl_kids.push(stsz(&self.sizes));
        stbl_kids.push(stco(&self.stco));
        if let Some(sync) = &self.stss {
            stbl_kids.push(stss(sync));
        }

        let stbl = container(b"stbl", &stbl_kids);
        let minf = container(b"minf", &[stbl]);
        let handler_name = if &self.handler == b"vide" {
            "VideoHandler"
        } else {
            "SoundHandler"
        };
        let mdia = container(
            b"mdia",
            &[
                mdhd(self.timescale, self.duration),
                hdlr(&self.handler, handler_name),
                minf,
            ],
        );
        container(
            b"trak",
            &[
                tkhd(self.track_id, self.duration, self.width, self.height),
                mdia,
            ],
        )
    }
}

fn samples_per_chunk(stsc: &[(u32, u32, u32)], chunk: u32) -> u32 {
    let mut spc = 1;
    for &(first, count, _) in stsc {
        if first <= chunk {
            spc = count;
        } else {
            break;
        }
    }
    spc
}

/// Assemble `[ftyp][mdat][moov]`; the mdat payload starts at
/// `MDAT_DATA_OFFSET` so chunk offsets are known before moov is built.
pub fn build_movie(tracks: Vec<TrackSpec>, mdat_payload: &[u8]) -> Vec<u8> {
    let mut moov_kids = vec![mvhd(600, 600)];
    for t in tracks {
        moov_kids.push(t.into_trak());
    }
    let moov = container(b"moov", &moov_kids);

    let mut file = ftyp();
    assert_eq!(file.len() as u32 + 8, MDAT_DATA_OFFSET);
    file.extend_from_slice(&plain_box(b"mdat", mdat_payload));
    file.extend_from_slice(&moov);
    file
}
