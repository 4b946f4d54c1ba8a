use futures::StreamExt;
use mosaic::schema::{ActionRemap, ActionSource, CanonicalSchema, DatasetSpec, EpisodeBounds};
use mosaic::source::MemorySource;
use mosaic::trajectory::{RawEpisode, RawStep};
use mosaic::{AssemblerConfig, Pipeline, PipelineConfig, SamplingWeights};
use tracing_subscriber::EnvFilter;

/// A synthetic episode whose action field holds `dims` copies of the step
/// index.
fn episode(id: &str, len: usize, dims: usize) -> RawEpisode {
    let steps = (0..len)
        .map(|i| {
            let step = RawStep::new().with_action("action", vec![i as f32; dims]);
            if i + 1 == len { step.terminal() } else { step }
        })
        .collect();
    RawEpisode::new(id, steps)
}

fn spec(hz: f64, remap: ActionRemap) -> DatasetSpec {
    DatasetSpec {
        id: String::new(),
        source: "memory".to_string(),
        control_frequency: hz,
        observations: vec![],
        action: remap,
        episode_length: EpisodeBounds::default(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // A: 10Hz, 2-D actions. B: 20Hz, 3-D actions.
    let a_remap = ActionRemap::Select {
        dims: vec![
            Some(ActionSource::new("action", 0)),
            Some(ActionSource::new("action", 1)),
            None,
        ],
    };
    let mut config = PipelineConfig::new(CanonicalSchema::new(10.0, 3))
        .with_dataset("a", spec(10.0, a_remap))
        .with_dataset("b", spec(20.0, ActionRemap::prefix("action", 3)));
    config.assembler = AssemblerConfig::new(4, 2, 8).with_seed(7);
    config.weights = SamplingWeights::new().with("a", 1.0).with("b", 1.0);

    let pipeline = Pipeline::new(config)?;
    let sources = vec![
        ("a".to_string(), MemorySource::new(vec![episode("a0", 50, 2)])),
        ("b".to_string(), MemorySource::new(vec![episode("b0", 16, 3)])),
    ];
    let mut running = pipeline.spawn_with_sources(sources)?;

    for _ in 0..3 {
        let Some(batch) = running.batches().next().await else {
            break;
        };
        let batch = batch?;
        let (_, shape) = batch.actions();
        println!("batch {} actions {:?}", batch.sequence(), shape);
        for (i, shard) in batch.shards().enumerate() {
            let datasets: Vec<_> = shard.iter().map(|w| w.dataset_id().to_string()).collect();
            let valid: Vec<_> = shard.iter().map(|w| w.valid_len()).collect();
            println!("  shard {i}: datasets {datasets:?} valid steps {valid:?}");
        }
    }

    let stats = running.shutdown().await?;
    println!("drawn per dataset: {:?}", stats.drawn);
    Ok(())
}
