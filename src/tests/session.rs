use crate::{
    prelude::{
        correct, Config, Constellation, Duration, Ephemeris, EphemerisTable, Epoch, Message,
        MsmBlock, Report, Session, Workspace, SV,
    },
    tests::{
        base_position, base_set, init_logger, msm_blocks, reference_station, rover_set, t0,
        test_orbits, TestCodec, E02, G01, R03, STATION_ID,
    },
    Error,
};

/// Rover receiver's own station ID, never forwarded.
const ROVER_ID: u16 = 77;

fn at(seconds: f64) -> Epoch {
    t0() + Duration::from_seconds(seconds)
}

fn ephemeris(sv: SV, iode: u16, toe: Epoch) -> Message {
    Message::Ephemeris(Ephemeris {
        sv,
        iode,
        toe,
        toc: toe,
        ..Default::default()
    })
}

fn rover_epoch(t: Epoch) -> Vec<Message> {
    msm_blocks(&rover_set(t), ROVER_ID)
}

fn base_epoch(t: Epoch) -> Vec<Message> {
    msm_blocks(&base_set(t), STATION_ID)
}

fn station() -> Message {
    Message::StationPosition(reference_station())
}

/// Runs one session, returns its [Report] and the decoded output stream
fn run(cfg: Config, rover: Vec<u8>, base: Vec<u8>, codec: &TestCodec) -> (Report, Vec<Message>) {
    let factory = codec.clone();

    let mut session = Session::new(
        cfg,
        test_orbits(),
        rover.as_slice(),
        base.as_slice(),
        Vec::<u8>::new(),
        || factory.clone(),
    )
    .unwrap();

    let report = session.run().unwrap();
    let output = session.into_output();

    (report, codec.clone().decode_all(&output))
}

fn blocks(messages: &[Message]) -> Vec<&MsmBlock> {
    messages
        .iter()
        .filter_map(|msg| match msg {
            Message::Msm(block) => Some(block),
            _ => None,
        })
        .collect()
}

/// Satellites of the output stream, at this [Epoch]
fn satellites(messages: &[Message], t: Epoch) -> Vec<SV> {
    blocks(messages)
        .iter()
        .filter(|block| block.epoch == t)
        .flat_map(|block| block.observations.iter().map(|obs| obs.sv))
        .collect()
}

#[test]
fn nominal_session() {
    init_logger();

    let mut codec = TestCodec::default();

    let rover = [
        vec![ephemeris(G01, 1, at(0.0))],
        rover_epoch(at(0.0)),
        rover_epoch(at(1.0)),
    ]
    .concat();

    let base = [vec![station()], base_epoch(at(0.0)), base_epoch(at(1.0))].concat();

    let rover = codec.stream(&rover);
    let base = codec.stream(&base);

    let (report, output) = run(Config::default(), rover, base, &codec);

    assert_eq!(report.rover_epochs, 2);
    assert_eq!(report.corrected_epochs, 2);
    assert_eq!(report.dropped_epochs, 0);
    assert_eq!(report.ephemerides_forwarded, 1);
    assert_eq!(report.messages_written, 7);
    assert_eq!(output.len(), 7);

    assert!(matches!(&output[0], Message::Ephemeris(eph) if eph.sv == G01));

    let msm = blocks(&output);
    assert_eq!(msm.len(), 6);

    for (epoch, group) in msm.chunks(3).enumerate() {
        let constellations = group
            .iter()
            .map(|block| block.constellation)
            .collect::<Vec<_>>();

        assert_eq!(
            constellations,
            vec![
                Constellation::GPS,
                Constellation::Galileo,
                Constellation::BeiDou
            ]
        );

        assert!(group.iter().all(|block| block.epoch == at(epoch as f64)));
        assert!(group.iter().all(|block| block.station_id == STATION_ID));
        assert!(group[0].sync && group[1].sync && !group[2].sync);
        assert_eq!(group[2].num_satellites(), 0);
    }

    assert_eq!(satellites(&output, at(0.0)), vec![G01, E02]);
    assert_eq!(satellites(&output, at(1.0)), vec![G01, E02]);

    // what went out is exactly what the correction produces
    let mut expected = rover_set(at(0.0));
    expected.sort();
    correct(
        &mut expected,
        &base_set(at(0.0)),
        &base_position(),
        &test_orbits(),
        &EphemerisTable::default(),
        &Config::default(),
        &mut Workspace::default(),
    )
    .unwrap();

    for block in msm.iter().filter(|block| block.epoch == at(0.0)) {
        for obs in block.observations.iter() {
            let expected = expected.iter().find(|e| e.sv == obs.sv).unwrap();
            assert_eq!(obs.slots, expected.slots);
        }
    }
}

#[test]
fn determinism() {
    let outputs = (0..2)
        .map(|_| {
            let mut codec = TestCodec::default();
            let rover = codec.stream(&[rover_epoch(at(0.0)), rover_epoch(at(1.0))].concat());
            let base = codec.stream(
                &[vec![station()], base_epoch(at(0.0)), base_epoch(at(1.0))].concat(),
            );
            run(Config::default(), rover, base, &codec)
        })
        .collect::<Vec<_>>();

    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn decode_errors_are_not_fatal() {
    init_logger();

    let mut codec = TestCodec::default();

    let mut rover = codec.stream(&rover_epoch(at(0.0)));
    rover.push(0x00);
    rover.extend(codec.stream(&rover_epoch(at(1.0))));

    let mut base = codec.stream(&[vec![station()], base_epoch(at(0.0))].concat());
    base.push(0x55);
    base.extend(codec.stream(&base_epoch(at(1.0))));

    let (report, output) = run(Config::default(), rover, base, &codec);

    assert_eq!(report.rover_decode_errors, 1);
    assert_eq!(report.base_decode_errors, 1);
    assert_eq!(report.corrected_epochs, 2);
    assert_eq!(blocks(&output).len(), 6);
}

#[test]
fn base_ahead_is_kept() {
    init_logger();

    let mut codec = TestCodec::default();

    let rover = codec.stream(&[rover_epoch(at(0.0)), rover_epoch(at(5.0))].concat());

    // earlier base epoch is discarded, later one is kept for the next rover epoch
    let base = codec.stream(
        &[
            vec![station()],
            base_epoch(at(-5.0)),
            base_epoch(at(5.0)),
        ]
        .concat(),
    );

    let (report, output) = run(Config::default(), rover, base, &codec);

    assert_eq!(report.rover_epochs, 2);
    assert_eq!(report.sync_misses, 1);
    assert_eq!(report.corrected_epochs, 1);
    assert_eq!(report.dropped_epochs, 1);

    assert!(satellites(&output, at(0.0)).is_empty());
    assert_eq!(satellites(&output, at(5.0)), vec![G01, E02]);
}

#[test]
fn synchronization_tolerance() {
    let mut codec = TestCodec::default();

    let rover = codec.stream(&rover_epoch(at(0.0)));
    let base = codec.stream(&[vec![station()], base_epoch(at(0.010))].concat());

    let (report, _) = run(Config::default(), rover.clone(), base.clone(), &codec);
    assert_eq!(report.corrected_epochs, 1, "within default tolerance");

    let cfg = Config {
        sync_tolerance: Duration::from_seconds(0.005),
        ..Default::default()
    };

    let (report, _) = run(cfg, rover, base, &codec);
    assert_eq!(report.corrected_epochs, 0);
    assert_eq!(report.sync_misses, 1);
}

#[test]
fn end_of_base_stream() {
    init_logger();

    let mut codec = TestCodec::default();
    let factory = codec.clone();

    let rover = codec.stream(
        &[
            rover_epoch(at(0.0)),
            rover_epoch(at(1.0)),
            rover_epoch(at(2.0)),
        ]
        .concat(),
    );

    let base = codec.stream(&[vec![station()], base_epoch(at(0.0))].concat());

    let mut session = Session::new(
        Config::default(),
        test_orbits(),
        rover.as_slice(),
        base.as_slice(),
        Vec::<u8>::new(),
        || factory.clone(),
    )
    .unwrap();

    let report = session.run().unwrap();

    assert!(session.state().base_exhausted);
    assert_eq!(session.state().rover_epoch, Some(at(2.0)));
    assert_eq!(session.base_cursor(), base.len() as u64);

    assert_eq!(report.rover_epochs, 3);
    assert_eq!(report.corrected_epochs, 1);
    assert_eq!(report.sync_misses, 2);

    let output = codec.decode_all(&session.into_output());
    assert_eq!(blocks(&output).len(), 3);
}

#[test]
fn missing_base_position() {
    let mut codec = TestCodec::default();

    let rover = codec.stream(&[rover_epoch(at(0.0)), rover_epoch(at(1.0))].concat());
    let base = codec.stream(&[base_epoch(at(0.0)), base_epoch(at(1.0))].concat());

    let (report, output) = run(Config::default(), rover, base, &codec);

    assert_eq!(report.missing_base_positions, 2);
    assert_eq!(report.dropped_epochs, 2);
    assert_eq!(report.corrected_epochs, 0);
    assert!(output.is_empty());
}

#[test]
fn ephemeris_forwarding() {
    init_logger();

    let mut codec = TestCodec::default();
    let factory = codec.clone();

    let rover = codec.stream(
        &[
            vec![
                ephemeris(G01, 1, at(0.0)),
                ephemeris(G01, 1, at(0.0)),
                // not enabled
                ephemeris(R03, 1, at(0.0)),
                ephemeris(G01, 2, at(7200.0)),
            ],
            rover_epoch(at(0.0)),
        ]
        .concat(),
    );

    let base = codec.stream(
        &[
            vec![station(), ephemeris(E02, 3, at(0.0))],
            base_epoch(at(0.0)),
        ]
        .concat(),
    );

    let mut session = Session::new(
        Config::default(),
        test_orbits(),
        rover.as_slice(),
        base.as_slice(),
        Vec::<u8>::new(),
        || factory.clone(),
    )
    .unwrap();

    let report = session.run().unwrap();

    assert_eq!(report.ephemerides_forwarded, 2);
    assert_eq!(report.corrected_epochs, 1);

    let state = session.state();
    assert_eq!(state.rover_ephemerides.len(), 2);
    assert_eq!(state.base_ephemerides.len(), 1);
    assert_eq!(state.base_station, Some(reference_station()));

    let output = codec.decode_all(&session.into_output());

    let forwarded = output
        .iter()
        .filter_map(|msg| match msg {
            Message::Ephemeris(eph) => Some((eph.sv, eph.iode)),
            _ => None,
        })
        .collect::<Vec<_>>();

    // base ephemerides are never forwarded
    assert_eq!(forwarded, vec![(G01, 1), (G01, 2)]);
}

#[test]
fn invalid_configuration() {
    let codec = TestCodec::default();
    let cfg = Config {
        frequencies: 0,
        ..Default::default()
    };

    let session = Session::new(
        cfg,
        test_orbits(),
        std::io::empty(),
        std::io::empty(),
        Vec::<u8>::new(),
        || codec.clone(),
    );

    assert!(matches!(session, Err(Error::Config(_))));
}

#[test]
fn empty_rover_epoch() {
    let mut codec = TestCodec::default();

    let mut rover = vec![Message::Msm(MsmBlock {
        station_id: ROVER_ID,
        epoch: at(0.0),
        constellation: Constellation::GPS,
        sync: false,
        observations: Vec::new(),
    })];
    rover.extend(rover_epoch(at(1.0)));

    let rover = codec.stream(&rover);
    let base = codec.stream(&[vec![station()], base_epoch(at(0.0)), base_epoch(at(1.0))].concat());

    let (report, output) = run(Config::default(), rover, base, &codec);

    assert_eq!(report.rover_epochs, 2);
    assert_eq!(report.dropped_epochs, 1);
    assert_eq!(report.corrected_epochs, 1);
    assert_eq!(satellites(&output, at(1.0)), vec![G01, E02]);
}
