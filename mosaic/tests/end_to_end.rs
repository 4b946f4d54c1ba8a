use mosaic::source::MemorySource;
use mosaic::tensor::Tensor;
use mosaic::trajectory::{RawEpisode, RawStep};
use mosaic::{Batch, Pipeline, PipelineConfig};

const CONFIG: &str = r#"{
    "canonical": {
        "control_frequency": 10.0,
        "action_dim": 3,
        "observations": { "state": { "shape": [4], "dtype": "f32" } }
    },
    "datasets": {
        "a": {
            "source": "memory",
            "control_frequency": 10.0,
            "observations": [
                { "source": "proprio", "target": "state", "kind": { "type": "state" } }
            ],
            "action": { "type": "select", "dims": [
                { "key": "action", "index": 0 },
                { "key": "action", "index": 1 },
                null
            ] }
        },
        "b": {
            "source": "memory",
            "control_frequency": 20.0,
            "observations": [
                { "source": "joints", "target": "state",
                  "kind": { "type": "state", "truncate": true } }
            ],
            "action": { "type": "select", "dims": [
                { "key": "action", "index": 0 },
                { "key": "action", "index": 1 },
                { "key": "action", "index": 2 }
            ] }
        }
    },
    "window": { "length": 16, "stride": 8 },
    "assembler": { "batch_size": 4, "shard_count": 2, "shuffle_buffer_size": 8, "seed": 3 },
    "weights": { "a": 1.0, "b": 1.0 }
}"#;

/// Action `[i; dims]` and a state vector of `state_width` copies of `i` at
/// step `i`.
fn episode(id: &str, len: usize, dims: usize, state_key: &str, state_width: usize) -> RawEpisode {
    let steps = (0..len)
        .map(|i| {
            RawStep::new()
                .with_action("action", vec![i as f32; dims])
                .with_observation(state_key, Tensor::vector(vec![i as f32; state_width]))
        })
        .collect();
    RawEpisode::new(id, steps)
}

fn batches(count: usize) -> Vec<Batch> {
    let pipeline = Pipeline::new(PipelineConfig::from_json_str(CONFIG).unwrap()).unwrap();
    let sources = vec![
        ("a".to_string(), MemorySource::new(vec![episode("a0", 50, 2, "proprio", 3)])),
        ("b".to_string(), MemorySource::new(vec![episode("b0", 16, 3, "joints", 5)])),
    ];
    let mut assembler = pipeline.assembler_with_sources(sources).unwrap();
    (0..count).map(|_| assembler.next_batch().unwrap()).collect()
}

#[test]
fn mixed_batches_share_one_layout() {
    let batches = batches(20);
    let mut seen = (false, false);

    for batch in &batches {
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.shard_count(), 2);
        assert!(batch.shards().all(|shard| shard.len() == 2));

        let (actions, shape) = batch.actions();
        assert_eq!(shape, [4, 16, 3]);
        assert_eq!(actions.len(), 4 * 16 * 3);

        let state = batch.observation("state").unwrap();
        assert_eq!(state.shape, vec![4, 16, 4]);

        for window in batch.windows() {
            assert_eq!(window.len(), 16);
            for step in window.steps() {
                assert_eq!(step.action.len(), 3);
                assert_eq!(step.observation["state"].shape, vec![4]);
                assert!(step.observation_mask["state"]);
            }
            match window.dataset_id().as_ref() {
                "a" => seen.0 = true,
                "b" => seen.1 = true,
                other => panic!("unexpected dataset {other}"),
            }
        }
    }
    assert!(seen.0 && seen.1, "both datasets should be sampled");
}

#[test]
fn short_dataset_windows_are_padded_after_alignment() {
    for batch in batches(20) {
        for window in batch.windows().iter().filter(|w| w.dataset_id().as_ref() == "b") {
            assert_eq!(window.valid_len(), 8);
            assert_eq!(window.mask()[..8], [true; 8]);
            assert_eq!(window.mask()[8..], [false; 8]);

            // 20Hz aligned to 10Hz keeps every second raw step.
            let firsts: Vec<f32> = window.steps().take(8).map(|s| s.action[0]).collect();
            assert_eq!(firsts, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0]);
            for i in 8..16 {
                assert_eq!(window.step(i), window.step(7));
            }

            // Five joints truncated to the canonical width.
            let state = &window.step(1).observation["state"];
            assert_eq!(state.as_f32().unwrap(), &[2.0; 4]);
        }
    }
}

#[test]
fn narrow_dataset_is_zero_filled_and_masked() {
    for batch in batches(20) {
        for window in batch.windows().iter().filter(|w| w.dataset_id().as_ref() == "a") {
            assert_eq!(window.valid_len(), 16);
            assert_eq!(window.start() % 8, 0);
            for step in window.steps() {
                assert_eq!(step.action[2], 0.0);
                assert_eq!(step.action_mask, vec![true, true, false]);
                let state = step.observation["state"].as_f32().unwrap();
                assert_eq!(state[3], 0.0);
                assert_eq!(state[0], step.action[0]);
            }
        }
    }
}

#[test]
fn fixed_seed_reproduces_batches() {
    let ids = |batches: Vec<Batch>| -> Vec<Vec<(String, usize)>> {
        batches
            .iter()
            .map(|b| {
                b.windows()
                    .iter()
                    .map(|w| (w.dataset_id().to_string(), w.start()))
                    .collect()
            })
            .collect()
    };
    assert_eq!(ids(batches(10)), ids(batches(10)));
}
