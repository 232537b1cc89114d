// ABOUTME: Deploy command implementation.
// ABOUTME: Builds the request, runs the orchestrator, and reports the group result.

use std::sync::Arc;

use ecsroll::config::Config;
use ecsroll::deploy::{Decision, Orchestrator};
use ecsroll::error::Result;
use ecsroll::output::Output;

/// Deploy every configured service and roll all of them back if any fails.
pub async fn deploy(config: Config, mut output: Output) -> Result<()> {
    let control_plane = Arc::new(config.aws_cli());
    let request = config.into_request()?;

    output.start_timer();
    output.progress(&format!(
        "Deploying {} service(s) to {}",
        request.services().len(),
        request.cluster()
    ));

    let summary = Orchestrator::new(control_plane, output.clone())
        .deploy(request)
        .await;

    for outcome in summary.outcomes() {
        if let Some(err) = &outcome.error {
            tracing::debug!(service = %outcome.service, code = outcome.code, error = %err, "service failed");
        }
    }

    for warning in summary.warnings() {
        output.warning(&warning.message);
    }

    if let Some(err) = summary.error() {
        if summary.decision() == Some(Decision::Rollback) {
            output.progress("All services were rolled back to their previous revisions");
        }
        return Err(err.into());
    }

    output.success("Deployment complete!");
    Ok(())
}
