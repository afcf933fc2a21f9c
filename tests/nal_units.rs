mod common;

use common::*;
use mp4demux::error::DemuxError;
use mp4demux::nal::sample_nal_units;
use mp4demux::parser::Mp4File;

#[test]
fn splits_a_sample_into_length_prefixed_units() {
    // one sample holding two NAL units of lengths 2 and 1
    let payload = [0, 0, 0, 2, 0xAA, 0xBB, 0, 0, 0, 1, 0xCC];
    let spec = TrackSpec::video(1, vec![(1, 1, 1)], vec![payload.len() as u32]);
    let data = build_movie(vec![spec], &payload);

    let file = Mp4File::parse_bytes(&data).expect("parse failed");
    let track = file.track(1).unwrap();

    let units = sample_nal_units(&data, track, 0).expect("extraction failed");
    assert_eq!(units, vec![&[0xAA, 0xBB][..], &[0xCC][..]]);
    // the declared sample size was consumed exactly
    assert_eq!(
        units.iter().map(|u| u.len() + 4).sum::<usize>(),
        payload.len()
    );
}

#[test]
fn second_sample_starts_after_the_first() {
    let s0 = [0, 0, 0, 1, 0x11];
    let s1 = [0, 0, 0, 2, 0x22, 0x33];
    let mut payload = s0.to_vec();
    payload.extend_from_slice(&s1);
    let spec = TrackSpec::video(
        1,
        vec![(1, 2, 1)],
        vec![s0.len() as u32, s1.len() as u32],
    );
    let data = build_movie(vec![spec], &payload);

    let file = Mp4File::parse_bytes(&data).expect("parse failed");
    let track = file.track(1).unwrap();

    assert_eq!(
        sample_nal_units(&data, track, 0).unwrap(),
        vec![&[0x11][..]]
    );
    assert_eq!(
        sample_nal_units(&data, track, 1).unwrap(),
        vec![&[0x22, 0x33][..]]
    );
}

#[test]
fn length_prefix_past_sample_end_is_structural() {
    // prefix claims 6 bytes but only 5 remain in the sample
    let payload = [0, 0, 0, 6, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE];
    let spec = TrackSpec::video(1, vec![(1, 1, 1)], vec![payload.len() as u32]);
    let data = build_movie(vec![spec], &payload);

    let file = Mp4File::parse_bytes(&data).expect("parse failed");
    let track = file.track(1).unwrap();

    assert!(matches!(
        sample_nal_units(&data, track, 0),
        Err(DemuxError::Structural { .. })
    ));
}

#[test]
fn truncated_length_prefix_is_structural() {
    // 2 trailing bytes cannot hold a 4-byte prefix
    let payload = [0, 0, 0, 2, 0xAA, 0xBB, 0x01, 0x02];
    let spec = TrackSpec::video(1, vec![(1, 1, 1)], vec![payload.len() as u32]);
    let data = build_movie(vec![spec], &payload);

    let file = Mp4File::parse_bytes(&data).expect("parse failed");
    let track = file.track(1).unwrap();

    assert!(matches!(
        sample_nal_units(&data, track, 0),
        Err(DemuxError::Structural { .. })
    ));
}

#[test]
fn sample_range_outside_the_buffer_is_structural() {
    let mut spec = TrackSpec::video(1, vec![(1, 1, 1)], vec![8]);
    spec.stco = vec![1 << 24]; // far past the end of the file
    let data = build_movie(vec![spec], &[0u8; 8]);

    let file = Mp4File::parse_bytes(&data).expect("parse failed");
    let track = file.track(1).unwrap();

    assert!(matches!(
        sample_nal_units(&data, track, 0),
        Err(DemuxError::Structural { .. })
    ));
}

#[test]
fn out_of_range_sample_is_reported_not_clamped() {
    let payload = [0, 0, 0, 1, 0x42];
    let spec = TrackSpec::video(1, vec![(1, 1, 1)], vec![payload.len() as u32]);
    let data = build_movie(vec![spec], &payload);

    let file = Mp4File::parse_bytes(&data).expect("parse failed");
    let track = file.track(1).unwrap();

    assert!(matches!(
        sample_nal_units(&data, track, 5),
        Err(DemuxError::SampleOutOfRange { .. })
    ));
    // the failed query leaves the track usable
    assert!(sample_nal_units(&data, track, 0).is_ok());
}

#[test]
fn parameter_sets_come_from_the_avcc_record() {
    let spec = TrackSpec::video(1, vec![(1, 1, 1)], vec![8]);
    let data = build_movie(vec![spec], &[0, 0, 0, 4, 1, 2, 3, 4]);

    let file = Mp4File::parse_bytes(&data).expect("parse failed");
    let track = file.track(1).unwrap();

    let (sps, pps) = track.parameter_sets().expect("no parameter sets");
    assert_eq!(sps, &[0x67, 0x42, 0xC0, 0x1E]);
    assert_eq!(pps, &[0x68, 0xCE, 0x38, 0x80]);
}
