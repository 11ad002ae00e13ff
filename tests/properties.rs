use std::collections::HashSet;

use gazetally::{AttentionEngine, EngineConfig, Observation, SessionReport};
use ndarray::Array1;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Face {
    x: f32,
    y: f32,
    frontal: bool,
    person: usize,
    noise: f32,
}

#[derive(Debug, Clone)]
struct Frame {
    dt: f64,
    faces: Vec<Face>,
}

fn face() -> impl Strategy<Value = Face> {
    (0.0f32..640.0, 0.0f32..480.0, any::<bool>(), 0usize..4, -0.1f32..0.1).prop_map(
        |(x, y, frontal, person, noise)| Face {
            x,
            y,
            frontal,
            person,
            noise,
        },
    )
}

fn session() -> impl Strategy<Value = Vec<Frame>> {
    prop::collection::vec(
        (0.01f64..1.5, prop::collection::vec(face(), 0..5))
            .prop_map(|(dt, faces)| Frame { dt, faces }),
        1..40,
    )
}

/// Each simulated person has a prototype embedding along one axis.
fn embedding(face: &Face) -> Array1<f32> {
    let mut v = Array1::from_elem(4, 0.05f32);
    v[face.person] = 1.0;
    v[(face.person + 1) % 4] += face.noise;
    v
}

fn observations(frame: &Frame, with_embeddings: bool) -> Vec<Observation> {
    frame
        .faces
        .iter()
        .map(|f| {
            let obs = Observation::at(f.x, f.y).with_frontal(f.frontal);
            if with_embeddings {
                obs.with_embedding(embedding(f))
            } else {
                obs
            }
        })
        .collect()
}

fn run(
    config: EngineConfig,
    frames: &[Frame],
    with_embeddings: bool,
) -> (AttentionEngine, Vec<Vec<(usize, u64)>>) {
    let mut engine = AttentionEngine::new(config).unwrap();
    let mut time = 0.0;
    let mut assignments = Vec::new();
    for frame in frames {
        time += frame.dt;
        let out = engine.update(&observations(frame, with_embeddings), time, frame.dt);
        assignments.push(out.assignments);
    }
    (engine, assignments)
}

fn check_invariants(
    config: EngineConfig,
    frames: &[Frame],
    with_embeddings: bool,
) -> Result<(), TestCaseError> {
    let mut engine = AttentionEngine::new(config.clone()).unwrap();
    let mut time = 0.0;
    let mut previous = std::collections::BTreeMap::new();
    let mut max_id = 0;

    for frame in frames {
        time += frame.dt;
        let obs = observations(frame, with_embeddings);
        let out = engine.update(&obs, time, frame.dt);

        // One-to-one: no observation or identity appears twice.
        let obs_idx: HashSet<usize> = out.assignments.iter().map(|a| a.0).collect();
        let ids: HashSet<u64> = out.assignments.iter().map(|a| a.1).collect();
        prop_assert_eq!(obs_idx.len(), out.assignments.len());
        prop_assert_eq!(ids.len(), out.assignments.len());
        prop_assert!(out.assignments.len() <= obs.len());

        // Ids are minted in strictly increasing order.
        for &id in &out.created {
            prop_assert!(id > max_id);
            max_id = id;
        }

        // Active tracks were all seen within the timeout.
        for track in engine.registry().active() {
            prop_assert!(time - track.last_seen_time <= config.stale_timeout);
        }

        // Times never shrink and attention never exceeds total.
        for track in engine.registry().history() {
            prop_assert!(track.attention_time <= track.total_time);
            if let Some(&(attention, total)) = previous.get(&track.id) {
                prop_assert!(track.attention_time >= attention);
                prop_assert!(track.total_time >= total);
            }
            previous.insert(track.id, (track.attention_time, track.total_time));
        }
    }

    let report: SessionReport = engine.shutdown_report();
    let ids: Vec<u64> = report.rows.iter().map(|r| r.face_id).collect();
    let expected: Vec<u64> = (1..=max_id).collect();
    prop_assert_eq!(ids, expected);
    prop_assert_eq!(report.timeline.len(), frames.len());
    Ok(())
}

proptest! {
    #[test]
    fn spatial_invariants(frames in session()) {
        check_invariants(EngineConfig::spatial(), &frames, false)?;
    }

    #[test]
    fn embedding_invariants(frames in session()) {
        check_invariants(EngineConfig::embedding(), &frames, true)?;
    }

    #[test]
    fn runs_are_deterministic(frames in session(), use_embeddings in any::<bool>()) {
        let config = if use_embeddings { EngineConfig::embedding() } else { EngineConfig::spatial() };
        let (a, assign_a) = run(config.clone(), &frames, use_embeddings);
        let (b, assign_b) = run(config, &frames, use_embeddings);
        prop_assert_eq!(assign_a, assign_b);
        prop_assert_eq!(a.shutdown_report(), b.shutdown_report());
    }
}
