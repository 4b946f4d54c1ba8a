use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use mosaic::trajectory::{RawEpisode, RawStep};
use mosaic::{BatchSource, Error, Pipeline, PipelineConfig};

/// A fresh directory under the system temp dir.
fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mosaic-it-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_episodes(path: &Path, episodes: &[RawEpisode]) {
    let lines: Vec<String> = episodes
        .iter()
        .map(|e| serde_json::to_string(e).unwrap())
        .collect();
    fs::write(path, lines.join("\n")).unwrap();
}

fn episode(id: &str, len: usize) -> RawEpisode {
    let steps = (0..len)
        .map(|i| RawStep::new().with_action("pose", vec![i as f32, 1.0]))
        .collect();
    RawEpisode::new(id, steps)
}

fn config_json(extra: &str) -> String {
    format!(
        r#"{{
        "canonical": {{ "control_frequency": 10.0, "action_dim": 2 }},
        "datasets": {{
            "pick": {{
                "source": "pick.jsonl",
                "control_frequency": 10.0,
                "action": {{ "type": "select", "dims": [
                    {{ "key": "pose", "index": 0 }},
                    {{ "key": "pose", "index": 1 }}
                ] }}
            }},
            "place": {{
                "source": "place.jsonl",
                "control_frequency": 10.0,
                "action": {{ "type": "linear", "key": "pose",
                             "matrix": [[0.0, 1.0], [1.0, 0.0]], "bias": [0.0, 0.0] }}
            }}
        }},
        "window": {{ "length": 4, "stride": 4 }},
        "assembler": {{ "batch_size": 2, "shard_count": 1, "shuffle_buffer_size": 2 }}
        {extra}
    }}"#
    )
}

/// Writes both datasets (`pick` with `n` episodes, `place` with 2) and a
/// config file next to them.
fn setup(n: usize, extra: &str) -> PathBuf {
    let dir = scratch_dir();
    let pick: Vec<_> = (0..n).map(|i| episode(&format!("pick{i}"), 4)).collect();
    write_episodes(&dir.join("pick.jsonl"), &pick);
    write_episodes(&dir.join("place.jsonl"), &[episode("place0", 4), episode("place1", 6)]);
    let path = dir.join("mix.json");
    fs::write(&path, config_json(extra)).unwrap();
    path
}

#[test]
fn pipeline_reads_jsonl_sources_next_to_the_config() {
    let path = setup(3, "");
    let pipeline = Pipeline::from_path(&path).unwrap();
    assert_eq!(pipeline.active_datasets(), vec!["pick", "place"]);
    assert_eq!(pipeline.weights().get("pick"), Some(1.0));

    let mut assembler = pipeline.assembler().unwrap();
    for _ in 0..10 {
        let batch = assembler.next_batch().unwrap();
        for window in batch.windows() {
            let actions = window.actions();
            match window.dataset_id().as_ref() {
                // Linear remap swaps the two pose components.
                "place" => assert_eq!(&actions[..2], &[1.0, 0.0]),
                _ => assert_eq!(&actions[..2], &[0.0, 1.0]),
            }
        }
    }
    fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn unlisted_datasets_are_not_opened() {
    let path = setup(2, r#", "weights": { "pick": 1.0 }"#);
    fs::remove_file(path.parent().unwrap().join("place.jsonl")).unwrap();

    let pipeline = Pipeline::from_path(&path).unwrap();
    assert_eq!(pipeline.active_datasets(), vec!["pick"]);
    let mut assembler = pipeline.assembler().unwrap();
    let batch = assembler.next_batch().unwrap();
    assert!(batch.dataset_ids().iter().all(|id| *id == "pick"));
    fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn host_shards_read_disjoint_episodes() {
    let mut per_host = Vec::new();
    for index in 0..2 {
        let extra = format!(r#", "weights": {{ "pick": 1.0 }}, "host_shard": {{ "index": {index}, "count": 2 }}"#);
        let path = setup(4, &extra);
        let pipeline = Pipeline::from_path(&path).unwrap();
        let mut assembler = pipeline.assembler().unwrap();
        let mut seen = BTreeSet::new();
        for _ in 0..10 {
            for window in assembler.next_batch().unwrap().windows() {
                seen.insert(window.episode_id().to_string());
            }
        }
        per_host.push(seen);
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
    assert_eq!(per_host[0], BTreeSet::from(["pick0".to_string(), "pick2".to_string()]));
    assert_eq!(per_host[1], BTreeSet::from(["pick1".to_string(), "pick3".to_string()]));
}

#[test]
fn configuration_errors_surface_before_reading() {
    let unknown = PipelineConfig::from_json_str(&config_json(r#", "weights": { "ghost": 1.0 }"#)).unwrap();
    assert!(matches!(Pipeline::new(unknown), Err(Error::Config(_))));

    let bad_window = PipelineConfig::from_json_str(&config_json("")).map(|mut c| {
        c.window.stride = 0;
        c
    });
    assert!(matches!(Pipeline::new(bad_window.unwrap()), Err(Error::Window(_))));

    let indivisible = PipelineConfig::from_json_str(&config_json("")).map(|mut c| {
        c.assembler.shard_count = 3;
        c
    });
    assert!(matches!(Pipeline::new(indivisible.unwrap()), Err(Error::Assemble(_))));
}

#[test]
fn missing_action_field_halts_the_pipeline() {
    let path = setup(2, "");
    let broken = RawEpisode::new("broken", vec![RawStep::new().with_action("other", vec![0.0])]);
    write_episodes(&path.parent().unwrap().join("place.jsonl"), &[broken]);

    let pipeline = Pipeline::from_path(&path).unwrap();
    let mut assembler = pipeline.assembler().unwrap();
    let err = (0..100)
        .find_map(|_| assembler.next_batch().err())
        .expect("a pull from 'place' should fail");
    assert!(err.is_schema_mismatch());
    assert!(assembler.is_halted());
    fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[tokio::test]
async fn spawned_pipeline_streams_from_files() {
    let path = setup(3, r#", "runtime": { "window_queue_capacity": 2, "batch_prefetch": 1 }"#);
    let pipeline = Pipeline::from_path(&path).unwrap();
    let mut running = pipeline.spawn().unwrap();

    let first = running.batches().next().await.unwrap().unwrap();
    assert_eq!(first.sequence(), 0);
    let second = running.next_batch().await.unwrap();
    assert_eq!(second.sequence(), 1);
    assert_eq!(second.len(), 2);

    let stats = running.shutdown().await.unwrap();
    assert!(stats.batches >= 2);
    assert_eq!(stats.drawn.len(), 2);
    fs::remove_dir_all(path.parent().unwrap()).unwrap();
}
