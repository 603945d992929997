use std::{convert::Infallible, env};

use anyhow::Context;
use ddp_orchestra::{
    DispatchConfig, Dispatcher, LocalCluster, LocalRuntime, RendezvousConfig, gather, run,
    worker::MemoryEnv,
};
use log::info;

const DEFAULT_WORKERS: usize = 4;
const SAMPLES: usize = 1_000;

/// Toy training step: every rank sums its strided shard of the dataset.
fn partial_sum(config: &RendezvousConfig, data: Vec<f32>) -> Result<f32, Infallible> {
    let sum = data
        .iter()
        .skip(config.rank)
        .step_by(config.world_size)
        .sum();

    Ok(sum)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let workers = match env::var("WORKERS") {
        Ok(n) => n.parse().context("WORKERS must be a positive integer")?,
        Err(_) => DEFAULT_WORKERS,
    };
    let config = DispatchConfig::from_env()?;

    let cluster = LocalCluster::new(workers);
    let dispatcher = Dispatcher::with_env(LocalRuntime::new(), MemoryEnv::new());
    let data: Vec<f32> = (0..SAMPLES).map(|i| i as f32).collect();

    let handles = run(&cluster, dispatcher, partial_sum, data, &config).await?;
    info!("submitted {} tasks", handles.len());

    let sums = gather(handles).await?;
    for (rank, sum) in sums.iter().enumerate() {
        println!("rank {rank}: partial sum {sum}");
    }
    println!("total: {}", sums.iter().sum::<f32>());

    Ok(())
}
