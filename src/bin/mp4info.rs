use clap::Parser;
use mp4demux::{boxes::BoxData, parser::Mp4File};
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Simple MP4 media info (like mp4info)")]
struct Args {
    /// MP4/ISOBMFF file path
    path: String,

    /// Output as JSON instead of human-readable text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct TrackInfo {
    track_id: u32,

    track_type: String, // "video" / "audio" / "other"

    #[serde(skip_serializing_if = "Option::is_none")]
    codec: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,

    timescale: u32,
    duration_ticks: u64,
    duration_seconds: f64,
    sample_count: usize,
    chunk_count: usize,
    language: String,
}

#[derive(Debug, Serialize)]
struct MediaInfo {
    file: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    major_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minor_version: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    compatible_brands: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    movie_timescale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    movie_duration_ticks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    movie_duration_seconds: Option<f64>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    tracks: Vec<TrackInfo>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let path = PathBuf::from(&args.path);

    let mut f = File::open(&path)?;
    let file_len = f.metadata()?.len();
    let file = Mp4File::parse(&mut f, file_len)?;

    let mut info = MediaInfo {
        file: path.display().to_string(),
        major_brand: None,
        minor_version: None,
        compatible_brands: Vec::new(),
        movie_timescale: None,
        movie_duration_ticks: None,
        movie_duration_seconds: None,
        tracks: Vec::new(),
    };

    if let Some(b) = file.find("ftyp")
        && let BoxData::Ftyp(ftyp) = &b.data
    {
        info.major_brand = Some(ftyp.major_brand.to_string());
        info.minor_version = Some(ftyp.minor_version);
        info.compatible_brands = ftyp
            .compatible_brands
            .iter()
            .map(|b| b.to_string())
            .collect();
    }

    if let Some(b) = file.find("moov.mvhd")
        && let BoxData::Mvhd(mvhd) = &b.data
    {
        info.movie_timescale = Some(mvhd.timescale);
        info.movie_duration_ticks = Some(mvhd.duration);
        if mvhd.timescale > 0 {
            info.movie_duration_seconds = Some(mvhd.duration as f64 / mvhd.timescale as f64);
        }
    }

    for track in file.tracks.values() {
        let (width, height) = track.dimensions();
        let track_type = match &track.handler_type().0 {
            b"vide" => "video",
            b"soun" => "audio",
            _ => "other",
        };
        info.tracks.push(TrackInfo {
            track_id: track.track_id(),
            track_type: track_type.to_string(),
            codec: track.codec().map(|c| c.to_string()),
            width: (width > 0).then_some(width),
            height: (height > 0).then_some(height),
            timescale: track.timescale(),
            duration_ticks: track.total_time(),
            duration_seconds: track.time_to_seconds(track.total_time()),
            sample_count: track.sample_count(),
            chunk_count: track.chunk_count(),
            language: track.language().to_string(),
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("File: {}", info.file);
    if let Some(brand) = &info.major_brand {
        println!(
            "Brand: {} (minor {}), compatible: {}",
            brand,
            info.minor_version.unwrap_or(0),
            info.compatible_brands.join(", ")
        );
    }
    if let (Some(ts), Some(secs)) = (info.movie_timescale, info.movie_duration_seconds) {
        println!("Movie: {:.3}s @ timescale {}", secs, ts);
    }
    for t in &info.tracks {
        let dims = match (t.width, t.height) {
            (Some(w), Some(h)) => format!(", {}x{}", w, h),
            _ => String::new(),
        };
        println!(
            "Track {}: {} ({}){}, {:.3}s, {} samples in {} chunks, lang={}",
            t.track_id,
            t.track_type,
            t.codec.as_deref().unwrap_or("?"),
            dims,
            t.duration_seconds,
            t.sample_count,
            t.chunk_count,
            t.language
        );
    }

    Ok(())
}
