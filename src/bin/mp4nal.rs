use anyhow::Context;
use clap::{ArgAction, Parser};
use mp4demux::{boxes::FourCC, nal::sample_nal_units, parser::Mp4File, track::Track};

#[derive(Parser, Debug)]
#[command(version, about = "Extract AVCC NAL units from MP4 samples")]
struct Args {
    /// MP4/ISOBMFF file path
    path: String,

    /// Track id (defaults to the first video track, by handler type)
    #[arg(long)]
    track: Option<u32>,

    /// First sample index to extract
    #[arg(long, default_value_t = 0)]
    sample: usize,

    /// Number of samples to extract
    #[arg(long, default_value_t = 1)]
    count: usize,

    /// Also print the SPS/PPS parameter sets
    #[arg(long, action = ArgAction::SetTrue)]
    params: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let data = std::fs::read(&args.path).context("reading input file")?;
    let file = Mp4File::parse_bytes(&data).context("parsing box tree")?;

    let track: &Track = match args.track {
        Some(id) => file
            .track(id)
            .with_context(|| format!("no track with id {}", id))?,
        None => file
            .tracks_with_handler(FourCC(*b"vide"))
            .next()
            .context("no video track in file")?,
    };

    println!(
        "track {} ({}), {} samples",
        track.track_id(),
        track.codec().map(|c| c.to_string()).unwrap_or_default(),
        track.sample_count()
    );

    if args.params {
        let (sps, pps) = track
            .parameter_sets()
            .context("track has no avcC parameter sets")?;
        println!("sps: {}", hex::encode(sps));
        println!("pps: {}", hex::encode(pps));
    }

    for sample in args.sample..args.sample + args.count {
        let offset = track.sample_to_offset(sample)?;
        let size = track.sample_to_size(sample, 1)?;
        let units = sample_nal_units(&data, track, sample)
            .with_context(|| format!("extracting sample {}", sample))?;
        println!(
            "sample {}: offset={:#x} size={} sync={} nal_units={}",
            sample,
            offset,
            size,
            track.is_sync_sample(sample),
            units.len()
        );
        for (i, unit) in units.iter().enumerate() {
            let preview = &unit[..unit.len().min(16)];
            println!(
                "  [{}] type={} len={} {}{}",
                i,
                nal_type_name(unit.first().copied().unwrap_or(0)),
                unit.len(),
                hex::encode(preview),
                if unit.len() > 16 { "..." } else { "" }
            );
        }
    }

    Ok(())
}

fn nal_type_name(first_byte: u8) -> &'static str {
    match first_byte & 0x1F {
        1 => "slice",
        5 => "idr",
        6 => "sei",
        7 => "sps",
        8 => "pps",
        9 => "aud",
        _ => "other",
    }
}
