// ABOUTME: Run command implementation.
// ABOUTME: Starts one task from a copied task definition and exits with the task's status.

use std::sync::Arc;

use ecsroll::config::Config;
use ecsroll::error::Result;
use ecsroll::output::Output;
use ecsroll::task::TaskRunner;

/// Run `args` in a one-off task. Without a configured container, the first
/// argument names it.
pub async fn run(mut config: Config, mut args: Vec<String>, mut output: Output) -> Result<()> {
    if config.run.container.is_none() && !args.is_empty() {
        config.run.container = Some(args.remove(0));
    }

    let control_plane = Arc::new(config.aws_cli());
    let request = config.into_run_request(args)?;

    output.start_timer();
    output.progress(&format!(
        "Running {} from {} in {}",
        request.container(),
        request.task_definition().short_name(),
        request.cluster()
    ));

    let outcome = TaskRunner::new(control_plane, output.clone())
        .run(&request)
        .await;

    for warning in &outcome.warnings {
        output.warning(&warning.message);
    }

    if let Some(err) = outcome.error {
        return Err(err.into());
    }

    output.success("Task finished");
    Ok(())
}
