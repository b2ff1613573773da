//! `dev` and `build` commands

use std::process::ExitCode;
use std::sync::Arc;

use super::{console_progress, BuildArgs, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::progress::{JsonProgress, ProgressReporter};
use crate::build::{create_build_plan, BuildContext, BuildPipeline};
use crate::config::LoadedConfig;
use crate::env::BuildEnvironment;
use crate::tools::Toolchain;

/// Run one build. `default_mode` applies when neither mode variable is set.
pub fn run_build(
    loaded: LoadedConfig,
    default_mode: &str,
    args: &BuildArgs,
    verbose: bool,
) -> ExitCode {
    let LoadedConfig { config, project_root, .. } = loaded;

    let mut env = BuildEnvironment::from_env_or(default_mode, &config);
    if let Some(out) = &args.out {
        env = env.with_output_dir(out.clone());
    }
    let plan = create_build_plan(&config).filter(&args.only);
    let tools = Toolchain::from_config(&config.tools);
    let context = BuildContext::new(config, env, project_root, tools).with_verbose(verbose);

    let reporter: Arc<dyn ProgressReporter> = if args.json {
        Arc::new(JsonProgress::new())
    } else {
        Arc::new(console_progress(verbose))
    };
    let pipeline = BuildPipeline::new(Arc::new(context)).with_reporter(reporter);

    match pipeline.run(&plan) {
        Ok(result) if result.is_success() => ExitCode::from(EXIT_SUCCESS),
        Ok(result) => {
            tracing::debug!("{}", result.summary());
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => {
            eprintln!("Build error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
