use approx::assert_relative_eq;
use gazetally::tracker::TrackState;
use gazetally::{AttentionEngine, EngineConfig, Observation};
use ndarray::{Array1, array};

const DT: f64 = 0.033;

#[test]
fn test_person_leaves_and_is_evicted() {
    let mut engine = AttentionEngine::new(EngineConfig::default()).unwrap();

    // Frame 1: one frontal face
    let out1 = engine.update(&[Observation::at(100.0, 150.0).with_frontal(true)], 0.0, DT);
    assert_eq!(out1.created, vec![1]);
    let snap = engine.snapshot_summary()[&1];
    assert_relative_eq!(snap.total_s, 0.033, epsilon = 1e-9);
    assert_relative_eq!(snap.attention_s, 0.033, epsilon = 1e-9);

    // Frame 2: same person moved ~2.83 px
    let out2 = engine.update(&[Observation::at(102.0, 152.0).with_frontal(true)], DT, DT);
    assert_eq!(out2.assignments, vec![(0, 1)]);
    assert!(out2.created.is_empty());
    let snap = engine.snapshot_summary()[&1];
    assert_relative_eq!(snap.total_s, 0.066, epsilon = 1e-9);
    assert_relative_eq!(snap.attention_s, 0.066, epsilon = 1e-9);

    // Frames 3..: nobody in view
    let mut evicted_at = None;
    for k in 3..=100 {
        let t = (k - 1) as f64 * DT;
        let out = engine.update(&[], t, DT);
        if !out.evicted.is_empty() {
            assert_eq!(out.evicted, vec![1]);
            evicted_at = Some(t);
            break;
        }
        assert_eq!(out.tracked_count, 1, "evicted too early at t={t}");
    }
    let evicted_at = evicted_at.expect("track was never evicted");
    assert!(evicted_at - DT > 3.0);
    assert!(evicted_at - DT <= 3.0 + DT);
    assert!(engine.snapshot_summary().is_empty());

    let report = engine.shutdown_report();
    assert_eq!(report.summary.total_people_watched, 1);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].face_id, 1);
    assert_relative_eq!(report.rows[0].total_time_s, 0.066, epsilon = 1e-9);
    assert_relative_eq!(report.rows[0].attention_time_s, 0.066, epsilon = 1e-9);
    assert_relative_eq!(report.rows[0].end_time, DT, epsilon = 1e-9);
    assert_relative_eq!(report.summary.campaign_duration_s, evicted_at, epsilon = 1e-9);
}

#[test]
fn test_two_distant_faces_are_two_people() {
    let mut engine = AttentionEngine::new(EngineConfig::default()).unwrap();
    let out = engine.update(
        &[Observation::at(100.0, 150.0), Observation::at(400.0, 200.0)],
        0.0,
        DT,
    );
    assert_eq!(out.created, vec![1, 2]);
    assert_eq!(out.tracked_count, 2);
}

#[test]
fn test_faces_swap_nearest_positions() {
    let mut engine = AttentionEngine::new(EngineConfig::default()).unwrap();
    engine.update(
        &[Observation::at(100.0, 100.0), Observation::at(300.0, 100.0)],
        0.0,
        DT,
    );
    // Reported in the opposite order: matching follows position, not index.
    let out = engine.update(
        &[Observation::at(305.0, 100.0), Observation::at(95.0, 100.0)],
        DT,
        DT,
    );
    assert_eq!(out.assignments, vec![(0, 2), (1, 1)]);
    assert!(out.created.is_empty());
}

#[test]
fn test_spatial_return_after_eviction_gets_new_id() {
    let mut engine = AttentionEngine::new(EngineConfig::default()).unwrap();
    engine.update(&[Observation::at(100.0, 150.0)], 0.0, DT);
    engine.update(&[], 3.5, DT);
    let out = engine.update(&[Observation::at(100.0, 150.0)], 4.0, DT);
    assert_eq!(out.created, vec![2]);

    let report = engine.shutdown_report();
    let ids: Vec<u64> = report.rows.iter().map(|r| r.face_id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(
        engine.registry().get(1).map(|t| t.state),
        Some(TrackState::Evicted)
    );
}

fn face(embedding: Array1<f32>) -> Observation {
    Observation::at(320.0, 240.0)
        .with_embedding(embedding)
        .with_frontal(true)
}

#[test]
fn test_embedding_reidentifies_after_eviction() {
    let mut engine = AttentionEngine::new(EngineConfig::embedding()).unwrap();
    let alice = array![1.0f32, 0.0, 0.0];
    let bob = array![0.0f32, 1.0, 0.0];

    engine.update(&[face(alice.clone())], 0.0, 0.5);
    engine.update(&[face(alice.clone()), face(bob.clone())], 0.5, 0.5);
    assert_eq!(engine.registry().total_created(), 2);

    // Alice leaves long enough to be evicted while Bob stays.
    let out = engine.update(&[face(bob.clone())], 4.0, 0.5);
    assert_eq!(out.evicted, vec![1]);
    assert!(engine.registry().gallery().contains(1));

    // Alice comes back looking slightly different.
    let out = engine.update(&[face(array![0.95, 0.1, 0.05]), face(bob)], 4.5, 0.5);
    assert_eq!(out.reidentified, vec![1]);
    assert!(out.created.is_empty());
    assert_eq!(out.tracked_count, 2);

    let report = engine.shutdown_report();
    assert_eq!(report.summary.total_people_watched, 2);
    let alice_row = &report.rows[0];
    assert_eq!(alice_row.face_id, 1);
    assert_relative_eq!(alice_row.total_time_s, 1.5);
    assert_relative_eq!(alice_row.start_time, 0.0);
    assert_relative_eq!(alice_row.end_time, 4.5);
}

#[test]
fn test_embedding_stranger_gets_new_identity() {
    let mut engine = AttentionEngine::new(EngineConfig::embedding()).unwrap();
    engine.update(&[face(array![1.0, 0.0, 0.0])], 0.0, 0.1);
    let out = engine.update(&[face(array![0.0, 0.0, 1.0])], 0.1, 0.1);
    assert_eq!(out.created, vec![2]);
}

#[test]
fn test_empty_session_report() {
    let engine = AttentionEngine::new(EngineConfig::default()).unwrap();
    let report = engine.shutdown_report();
    assert_eq!(report.summary.total_people_watched, 0);
    assert_eq!(report.summary.average_attention_time_s, 0.0);
    assert_eq!(report.summary.campaign_duration_s, 0.0);
    assert!(report.timeline.is_empty());

    let mut csv = Vec::new();
    report.write_csv(&mut csv).unwrap();
    assert!(String::from_utf8(csv).unwrap().contains("Total_People_Watched,0"));
}

#[test]
fn test_empty_frames_still_evict() {
    let mut engine = AttentionEngine::new(EngineConfig::default()).unwrap();
    engine.update(&[Observation::at(10.0, 10.0)], 0.0, DT);
    let out = engine.update(&[], 10.0, DT);
    assert_eq!(out.detected_count, 0);
    assert_eq!(out.evicted, vec![1]);
    assert_eq!(engine.timeline().last().map(|s| s.people_count), Some(0));
}
