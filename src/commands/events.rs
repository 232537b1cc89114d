// ABOUTME: Events command implementation.
// ABOUTME: Tails one service's lifecycle events until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ecsroll::config::Config;
use ecsroll::deploy::{Deployment, StatusTailer};
use ecsroll::error::{Error, Result};
use ecsroll::output::Output;
use ecsroll::types::ServiceName;
use tokio_util::sync::CancellationToken;

pub async fn events(
    config: Config,
    service: ServiceName,
    since: Option<Duration>,
    output: Output,
) -> Result<()> {
    config.validate()?;
    let cluster = config.cluster()?.to_string();
    let control_plane = Arc::new(config.aws_cli());

    // Fail fast on an unknown service instead of polling nothing forever.
    let _live = Deployment::new(&cluster, service.clone())
        .describe(&*control_plane)
        .await?;

    let mut tailer = StatusTailer::new(
        control_plane,
        &cluster,
        service.clone(),
        config.poll_interval,
        output.clone(),
    );
    if let Some(since) = since {
        let since = chrono::Duration::from_std(since)
            .map_err(|e| Error::InvalidConfig(format!("--since is out of range: {e}")))?;
        tailer = tailer.since(Utc::now() - since);
    }

    output.progress(&format!("Tailing events for {service} in {cluster} (Ctrl-C to stop)"));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(tailer.run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    cancel.cancel();

    let summary = handle.await.map_err(|e| Error::Io(std::io::Error::other(e)))?;
    if let Some(last_error) = summary.last_error {
        output.warning(&format!(
            "{} event poll(s) failed, last: {last_error}",
            summary.failed_polls
        ));
    }

    Ok(())
}
