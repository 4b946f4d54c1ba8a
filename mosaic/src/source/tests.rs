use std::io::Write;
use std::path::PathBuf;

use super::*;
use crate::testing::raw_episode;

fn drain<S: EpisodeSource>(source: &mut S) -> Vec<String> {
    let mut ids = Vec::new();
    while let Some(episode) = source.next_episode().unwrap() {
        ids.push(episode.episode_id);
    }
    ids
}

fn write_jsonl(lines: &[String]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("mosaic-{}.jsonl", uuid::Uuid::new_v4()));
    let mut file = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    path
}

#[test]
fn memory_source_rewinds() {
    let mut source = MemorySource::new((0..3).map(|i| raw_episode(i, 2)).collect());
    assert_eq!(drain(&mut source), vec!["ep0", "ep1", "ep2"]);
    assert!(source.next_episode().unwrap().is_none());
    source.rewind().unwrap();
    assert_eq!(drain(&mut source), vec!["ep0", "ep1", "ep2"]);
}

#[test]
fn host_shards_are_disjoint_and_cover_everything() {
    let episodes: Vec<_> = (0..7).map(|i| raw_episode(i, 1)).collect();
    let mut seen = Vec::new();
    for index in 0..3 {
        let shard = HostShard::new(index, 3).unwrap();
        let mut source = ShardedSource::new(MemorySource::new(episodes.clone()), shard);
        let ids = drain(&mut source);
        source.rewind().unwrap();
        assert_eq!(drain(&mut source), ids);
        seen.extend(ids);
    }
    seen.sort();
    assert_eq!(seen, vec!["ep0", "ep1", "ep2", "ep3", "ep4", "ep5", "ep6"]);
}

#[test]
fn invalid_host_shard_is_rejected() {
    assert!(HostShard::new(2, 2).is_err());
    assert!(HostShard::new(0, 0).is_err());
    assert!(HostShard::default().is_whole());
}

#[test]
fn jsonl_source_reads_and_rewinds() {
    let lines: Vec<String> = (0..2)
        .map(|i| serde_json::to_string(&raw_episode(i, 3)).unwrap())
        .collect();
    let path = write_jsonl(&[lines[0].clone(), String::new(), lines[1].clone()]);

    let mut source = open(&format!("jsonl://{}", path.display())).unwrap();
    let first = source.next_episode().unwrap().unwrap();
    assert_eq!(first, raw_episode(0, 3));
    assert_eq!(source.next_episode().unwrap().unwrap().episode_id, "ep1");
    assert!(source.next_episode().unwrap().is_none());

    source.rewind().unwrap();
    assert_eq!(drain(&mut source), vec!["ep0", "ep1"]);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn jsonl_decode_errors_carry_the_line_number() {
    let good = serde_json::to_string(&raw_episode(0, 1)).unwrap();
    let path = write_jsonl(&[good, "{not json".to_string()]);
    let mut source = JsonlSource::open(&path).unwrap();
    source.next_episode().unwrap();
    match source.next_episode() {
        Err(SourceError::Decode { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected decode error, got {other:?}"),
    }
    std::fs::remove_file(path).unwrap();
}

#[test]
fn open_rejects_unknown_schemes() {
    assert!(matches!(open("gs://bucket/data"), Err(SourceError::Unsupported(_))));
    assert!(matches!(open("/definitely/not/here.jsonl"), Err(SourceError::Io { .. })));
}
