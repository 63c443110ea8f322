//! End to end: synthetic VKX and GPX inputs through decode, wind and assembly

use std::collections::HashMap;

use cracctracc_core::protocol::vkx::{
    encode_record, PageHeader, PageTerminator, PositionRecord, RaceTimerRecord, RecordTag,
    WindRecord,
};
use cracctracc_core::{
    decode, AssemblerConfig, Manoeuvre, PointOfSail, SourceFormat, Tack, TrackAssembler,
    TrackError, VkxOptions, WindField,
};

const T0: u64 = 1_635_557_400_000;

fn position(utc_ms: u64, heading_deg: f64) -> PositionRecord {
    let half = heading_deg.to_radians() / 2.0;
    PositionRecord {
        utc_ms,
        lat_e7: -338_000_000,
        lon_e7: 1_512_800_000,
        cog_rad: heading_deg.to_radians() as f32,
        sog_ms: 3.0,
        altitude_m: 0.5,
        qw: half.cos() as f32,
        qx: 0.0,
        qy: 0.0,
        qz: half.sin() as f32,
    }
}

fn timer(utc_ms: u64, code: u8) -> Vec<u8> {
    encode_record(
        RecordTag::RaceTimer,
        &RaceTimerRecord {
            utc_ms,
            code,
            timer_sec: 0,
        },
    )
    .unwrap()
}

/// Pre-start drift, a general recall, then the canonical manoeuvre sequence
fn vkx_stream() -> Vec<u8> {
    let mut bytes = encode_record(
        RecordTag::PageHeader,
        &PageHeader {
            version: 2,
            reserved: [0; 6],
        },
    )
    .unwrap();

    bytes.extend(encode_record(RecordTag::Position, &position(T0, 0.0)).unwrap());
    bytes.extend(timer(T0 + 500, 3));
    bytes.extend(timer(T0 + 600, 0));
    bytes.extend(timer(T0 + 1000, 3));

    let headings = [-150.0, -80.0, 80.0, 150.0, -150.0];
    for (i, heading) in headings.iter().enumerate() {
        let t = T0 + 1000 * (i as u64 + 1);
        bytes.extend(encode_record(RecordTag::Position, &position(t, *heading)).unwrap());
        bytes.extend(
            encode_record(
                RecordTag::WindData,
                &WindRecord {
                    utc_ms: t,
                    speed_ms: 5.0,
                    direction: 0.0,
                },
            )
            .unwrap(),
        );
    }
    bytes.extend(timer(T0 + 5000, 4));
    bytes.extend(encode_record(RecordTag::Position, &position(T0 + 6000, 0.0)).unwrap());

    bytes.extend(
        encode_record(
            RecordTag::PageTerminator,
            &PageTerminator {
                page_length: bytes.len() as u16,
            },
        )
        .unwrap(),
    );
    bytes
}

#[test]
fn vkx_track_end_to_end() {
    let decoded = decode(SourceFormat::Vkx, &vkx_stream()[..], &VkxOptions::default()).unwrap();
    assert_eq!(decoded.samples.len(), 7);
    assert_eq!(decoded.wind.len(), 5);

    let wind = WindField::or_fixed(WindField::from_samples(decoded.wind.clone()), 0.0).unwrap();
    let mut assembler = TrackAssembler::new(AssemblerConfig::default()).unwrap();
    let track = assembler.assemble(decoded, &wind).unwrap();

    assert_eq!(track.source, SourceFormat::Vkx);
    assert_eq!(track.race_window.start_ms, Some(T0 as i64 + 1000));
    assert_eq!(track.race_window.end_ms, Some(T0 as i64 + 5000));
    assert_eq!(track.rows.len(), 5);

    let twa: Vec<f64> = track.rows.iter().map(|r| r.twa).collect();
    assert_eq!(twa, vec![-150.0, -80.0, 80.0, 150.0, -150.0]);
    for row in &track.rows {
        assert_eq!(row.twd, 0.0);
        assert_eq!(row.tws, Some(9.7192));
        assert_eq!(row.altitude, Some(0.5));
    }

    let labels: Vec<Manoeuvre> = track.rows.iter().map(|r| r.manoeuvre).collect();
    assert_eq!(
        labels,
        vec![
            Manoeuvre::None,
            Manoeuvre::RoundUp,
            Manoeuvre::Tack,
            Manoeuvre::BearAway,
            Manoeuvre::Gybe
        ]
    );
    let kinds: Vec<Manoeuvre> = track.manoeuvres.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            Manoeuvre::RoundUp,
            Manoeuvre::Tack,
            Manoeuvre::BearAway,
            Manoeuvre::Gybe
        ]
    );
}

#[test]
fn vkx_user_window_overrides_device() {
    let decoded = decode(SourceFormat::Vkx, &vkx_stream()[..], &VkxOptions::default()).unwrap();
    let config = AssemblerConfig {
        race_start: Some(T0 as i64),
        race_end: None,
    };
    let mut assembler = TrackAssembler::new(config).unwrap();
    let track = assembler.assemble(decoded, &WindField::fixed(0.0)).unwrap();
    assert_eq!(track.rows.len(), 6);
    assert_eq!(track.rows[0].utc_ms, T0 as i64);
}

#[test]
fn vkx_unknown_tag_needs_fallback_length() {
    let mut bytes = vkx_stream();
    let insert_at = 8; // after the page header
    let unknown = [0x42u8, 1, 2, 3];
    bytes.splice(insert_at..insert_at, unknown);

    assert!(matches!(
        decode(SourceFormat::Vkx, &bytes[..], &VkxOptions::default()),
        Err(TrackError::MalformedRecord { tag: 0x42, offset: 8 })
    ));

    let options = VkxOptions {
        fallback_lengths: HashMap::from([(0x42, 3)]),
    };
    let decoded = decode(SourceFormat::Vkx, &bytes[..], &options).unwrap();
    assert_eq!(decoded.samples.len(), 7);
}

fn gpx_document() -> String {
    // Three legs due north then three legs due east
    let coords = [
        (-33.8000, 151.2800),
        (-33.7999, 151.2800),
        (-33.7998, 151.2800),
        (-33.7997, 151.2800),
        (-33.7997, 151.2801),
        (-33.7997, 151.2802),
        (-33.7997, 151.2803),
    ];
    let points: String = coords
        .iter()
        .enumerate()
        .map(|(i, (lat, lon))| {
            format!(
                "<trkpt lat=\"{}\" lon=\"{}\"><ele>2.0</ele><time>2021-10-30T01:30:0{}Z</time></trkpt>\n",
                lat, lon, i
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx version=\"1.1\" xmlns=\"http://www.topografix.com/GPX/1/1\"><trk><trkseg>\n{}</trkseg></trk></gpx>",
        points
    )
}

#[test]
fn gpx_track_end_to_end() {
    let xml = gpx_document();
    let decoded = decode(SourceFormat::Gpx, xml.as_bytes(), &VkxOptions::default()).unwrap();
    assert_eq!(decoded.samples.len(), 6);
    assert!(decoded.wind.is_empty());

    let wind = WindField::or_fixed(WindField::from_samples(decoded.wind.clone()), 45.0).unwrap();
    assert_eq!(wind, WindField::Fixed { twd: 45.0 });

    let mut assembler = TrackAssembler::new(AssemblerConfig::default()).unwrap();
    let track = assembler.assemble(decoded, &wind).unwrap();

    assert_eq!(track.rows.len(), 6);
    for row in &track.rows[..3] {
        assert!(row.cog.abs() < 0.01, "north leg cog {}", row.cog);
        assert_eq!(row.tack, Tack::Port);
        assert_eq!(row.point_of_sail, PointOfSail::Upwind);
        // 0.0001 degrees of latitude in one second is about 21.6 knots
        assert!((row.sog - 21.6).abs() < 0.1, "sog {}", row.sog);
        assert_eq!(row.tws, None);
    }
    for row in &track.rows[3..] {
        assert!((row.cog - 90.0).abs() < 0.01, "east leg cog {}", row.cog);
        assert_eq!(row.tack, Tack::Starboard);
    }

    assert_eq!(track.manoeuvres.len(), 1);
    assert_eq!(track.manoeuvres[0].kind, Manoeuvre::Tack);
    assert_eq!(track.manoeuvres[0].index, 3);
}

#[test]
fn gpx_invalid_race_window_is_rejected() {
    let config = AssemblerConfig {
        race_start: Some(1_635_557_400),
        race_end: None,
    };
    assert!(matches!(
        TrackAssembler::new(config),
        Err(TrackError::InvalidRaceWindow { .. })
    ));
}
