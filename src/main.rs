mod cli;

use anyhow::Result;
use std::time::Duration;
use throttle_queue::{Limiter, TimerHandle};
use tokio::time::Instant;

use crate::cli::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::from_env_and_args()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("throttle_queue={}", config.log_level).parse()?)
                .add_directive(format!("throttle_demo={}", config.log_level).parse()?),
        )
        .init();

    let start = Instant::now();
    let throttle = config.throttle.build(move |n: usize| {
        tracing::info!("call {} executed at +{}ms", n, start.elapsed().as_millis());
    })?;

    tracing::info!(
        "Firing {} calls through a {} throttle: {:?}",
        config.calls,
        config.throttle.kind(),
        config.throttle
    );

    let mut timer: Option<TimerHandle> = None;
    for n in 0..config.calls {
        timer = throttle.call(n);
    }
    tracing::info!(
        "{} calls queued, drain timer: {:?}",
        throttle.queued(),
        timer
    );

    // Wait out the trailing drain as well, not just the last dequeue
    while !throttle.is_idle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    tracing::info!("All calls executed after {}ms", start.elapsed().as_millis());
    Ok(())
}
