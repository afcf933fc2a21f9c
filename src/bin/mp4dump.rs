use clap::{ArgAction, Parser};
use mp4demux::{
    boxes::{BoxData, FourCC, Mp4Box},
    known_boxes::KnownBox,
    parser::Mp4File,
    util::{hex_dump, read_slice},
};
use std::fs::File;

#[derive(Parser, Debug)]
#[command(version, about = "MP4/ISOBMFF box tree explorer")]
struct Args {
    /// MP4/ISOBMFF file path
    path: String,

    /// Only print subtree(s) matching a dotted path (e.g. moov.trak[0].mdia.minf.stbl)
    #[arg(long = "filter")]
    filter: Option<String>,

    /// Dump raw payload of this 4CC (e.g. --raw stsd)
    #[arg(long = "raw")]
    raw: Option<String>,

    /// Limit recursion depth (for tree output)
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Show bytes count when dumping raw (0 means entire box payload)
    #[arg(long, default_value_t = 0)]
    bytes: usize,

    /// Emit JSON instead of human-readable tree
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut f = File::open(&args.path)?;
    let file_len = f.metadata()?.len();

    let file = Mp4File::parse(&mut f, file_len)?;

    let targets: Vec<&Mp4Box> = if let Some(path) = &args.filter {
        file.find_all(path)
    } else {
        file.boxes.iter().collect()
    };

    // JSON mode: output JSON and exit (no tree or raw to keep output clean)
    if args.json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
        return Ok(());
    }

    for b in &targets {
        print_box(b, 0, args.max_depth);
    }

    // Optional raw dump (unfiltered: still walks the whole tree)
    if let Some(sel) = args.raw.as_ref() {
        dump_raw(&mut f, &file.boxes, sel, args.bytes)?;
    }

    Ok(())
}

// ---------- Human-readable tree ----------

fn print_box(b: &Mp4Box, depth: usize, max_depth: usize) {
    let indent = "  ".repeat(depth);
    let hdr = &b.header;

    match (b.version, b.flags) {
        (Some(version), Some(flags)) => println!(
            "{indent}{:>6} {:>10} {} (ver={}, flags=0x{:06x})",
            format!("{:#x}", hdr.start),
            hdr.size,
            hdr.typ,
            version,
            flags
        ),
        _ => println!(
            "{indent}{:>6} {:>10} {}{}",
            format!("{:#x}", hdr.start),
            hdr.size,
            hdr.typ,
            if matches!(b.data, BoxData::Container(_)) {
                " (container)"
            } else {
                ""
            }
        ),
    }

    if let Some(s) = summary(b) {
        println!("{indent}        -> {}", s);
    }

    if depth + 1 <= max_depth {
        for c in b.children() {
            print_box(c, depth + 1, max_depth);
        }
    }
}

fn summary(b: &Mp4Box) -> Option<String> {
    let s = match &b.data {
        BoxData::Ftyp(f) => format!(
            "major={} minor={} compatible={:?}",
            f.major_brand, f.minor_version, f.compatible_brands
        ),
        BoxData::Mvhd(m) => format!(
            "timescale={} duration={} rate={} next_track_id={}",
            m.timescale, m.duration, m.rate, m.next_track_id
        ),
        BoxData::Tkhd(t) => format!(
            "track_id={} duration={} width={} height={}",
            t.track_id, t.duration, t.width, t.height
        ),
        BoxData::Mdhd(m) => format!(
            "timescale={} duration={} language={}",
            m.timescale, m.duration, m.language
        ),
        BoxData::Hdlr(h) => format!("handler={} name={:?}", h.handler_type, h.name),
        BoxData::Stsd(s) => format!("entries={}", s.entry_count),
        BoxData::Avc1(a) => format!(
            "{}x{} depth={} compressor={:?}",
            a.width, a.height, a.depth, a.compressor_name
        ),
        BoxData::Mp4a(a) => format!(
            "channels={} sample_size={} sample_rate={}",
            a.channel_count, a.sample_size, a.sample_rate
        ),
        BoxData::AvcC(c) => format!(
            "profile={:#04x} level={} sps={} pps={}",
            c.profile_indication,
            c.level_indication,
            c.sps.len(),
            c.pps.len()
        ),
        BoxData::Btrt(bt) => format!("avg={} max={}", bt.avg_bitrate, bt.max_bitrate),
        BoxData::Stts(t) => format!("rows={}", t.entries.len()),
        BoxData::Stss(s) => format!("sync_samples={}", s.sample_numbers.len()),
        BoxData::Stsc(s) => format!("rows={}", s.entries.len()),
        BoxData::Stsz(s) => {
            if s.sample_size != 0 {
                format!("uniform_size={} samples={}", s.sample_size, s.sample_count)
            } else {
                format!("samples={}", s.sample_count)
            }
        }
        BoxData::Stco(s) => format!("chunks={}", s.offsets.len()),
        BoxData::Smhd(s) => format!("balance={}", s.balance),
        BoxData::Mdat(m) => format!("payload offset={:#x} len={}", m.data_offset, m.data_len),
        BoxData::Skipped => match KnownBox::from(b.header.typ) {
            KnownBox::Unknown(_) => return None,
            kb => kb.full_name().to_string(),
        },
        BoxData::Container(_) => return None,
    };
    Some(s)
}

// ---------- Raw dump ----------

fn dump_raw(f: &mut File, boxes: &[Mp4Box], sel: &str, limit: usize) -> anyhow::Result<()> {
    let Some(fourcc) = FourCC::from_str(sel) else {
        anyhow::bail!("--raw wants a 4-character box type, got {:?}", sel);
    };

    let mut matches = Vec::new();
    select_boxes(boxes, fourcc, &mut matches);

    for (i, (off, len, typ)) in matches.into_iter().enumerate() {
        let to_read = if limit == 0 || limit as u64 > len {
            len
        } else {
            limit as u64
        };
        let data = read_slice(f, off, to_read)?;
        println!(
            "\n== Dump {} ({}) payload: offset={:#x}, len={} ==",
            i, typ, off, to_read
        );
        print!("{}", hex_dump(&data, off));
    }
    Ok(())
}

fn select_boxes(list: &[Mp4Box], typ: FourCC, out: &mut Vec<(u64, u64, FourCC)>) {
    for b in list {
        if b.header.typ == typ && b.header.size > b.header.header_size {
            out.push((
                b.header.start + b.header.header_size,
                b.header.size - b.header.header_size,
                b.header.typ,
            ));
        }
        select_boxes(b.children(), typ, out);
    }
}
