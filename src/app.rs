use anyhow::Result;
use tokio::runtime::{Builder, Runtime};

use crate::{
    backend,
    cli::{Cli, Command},
    domain,
    infra::{self, error::AppError},
    ui,
    usecases::{self, bootstrap, guided_auth::StdTerminal},
};

pub fn run(cli: Cli) -> Result<()> {
    let context = bootstrap::bootstrap(cli.config.as_deref())?;

    tracing::debug!(
        ui = ui::module_name(),
        domain = domain::module_name(),
        backend = backend::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    let runtime = build_runtime()?;
    let mut terminal = StdTerminal;

    match cli.command_or_default() {
        Command::Run => ui::console::run_console(
            &mut terminal,
            &context.config,
            runtime.handle().clone(),
            &context.auth,
            context.store.clone(),
        )?,
        Command::Demo => ui::demo::run_demo(&mut terminal, runtime.handle(), &context.config)?,
    }

    tracing::info!("pairchat exiting");
    Ok(())
}

/// Small multi-threaded runtime for timers and the exit presence flush. The
/// console itself stays on the main thread.
fn build_runtime() -> Result<Runtime, AppError> {
    Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("pairchat-worker")
        .enable_time()
        .build()
        .map_err(AppError::RuntimeInit)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn runtime_drives_timers() {
        let runtime = build_runtime().expect("runtime");

        let elapsed = runtime.block_on(async {
            let start = tokio::time::Instant::now();
            tokio::time::sleep(Duration::from_millis(5)).await;
            start.elapsed()
        });

        assert!(elapsed >= Duration::from_millis(5));
    }
}
