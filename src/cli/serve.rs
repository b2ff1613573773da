//! `serve` and `relay` commands

use std::future::Future;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use super::{console_progress, ServeArgs, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{create_build_plan, BuildContext, BuildPipeline};
use crate::config::loader::{merge_cli_overrides, CliOverrides};
use crate::config::LoadedConfig;
use crate::env::BuildEnvironment;
use crate::reload::BroadcastReload;
use crate::server::{
    bind, dev_router, listen_addr, relay_router, serve, DevServer, RelayState, SendmailMailer,
    ServerError,
};
use crate::tools::Toolchain;
use crate::watch::{watch_and_rebuild, WatchOptions};

/// Build once, then watch and serve until the process is stopped.
pub fn run_serve(loaded: LoadedConfig, args: &ServeArgs, verbose: bool) -> ExitCode {
    let LoadedConfig { mut config, project_root, .. } = loaded;
    merge_cli_overrides(&mut config, &CliOverrides { port: args.port, host: args.host.clone() });

    let addr = match listen_addr(&config.server.host, config.server.port) {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let mut env = BuildEnvironment::from_env_or("development", &config);
    if let Some(out) = &args.out {
        env = env.with_output_dir(out.clone());
    }
    let reload = BroadcastReload::default();
    let tools = Toolchain::from_config(&config.tools);
    let context = Arc::new(
        BuildContext::new(config.clone(), env, project_root.clone(), tools)
            .with_reload(Arc::new(reload.clone()))
            .with_verbose(verbose),
    );
    let pipeline =
        BuildPipeline::new(Arc::clone(&context)).with_reporter(Arc::new(console_progress(verbose)));
    let plan = create_build_plan(&config);

    match pipeline.run(&plan) {
        Ok(result) if !result.is_success() => {
            tracing::warn!("initial build had failures, serving anyway");
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("Build error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let relay = match RelayState::from_config(&config, Arc::new(SendmailMailer::new())) {
        Ok(relay) => relay,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if context.is_production() {
        tracing::info!("production mode, sources are not watched");
    } else {
        let options = WatchOptions { root: project_root, config: config.watch.clone() };
        let spawned = std::thread::Builder::new().name("sitepipe-watch".into()).spawn(move || {
            if let Err(e) = watch_and_rebuild(&pipeline, &plan, &options) {
                tracing::error!(error = %e, "watcher stopped");
            }
        });
        if let Err(e) = spawned {
            tracing::error!(error = %e, "could not start watcher");
        }
    }

    let server = DevServer {
        root: context.out_dir(),
        index: config.server.index.clone(),
        error_stem: file_stem(&config.views.error_page),
        reload,
        relay: Some(relay),
    };
    block_on(async move {
        let listener = bind(addr).await?;
        serve(listener, dev_router(server)).await
    })
}

/// Serve the relay endpoint alone.
pub fn run_relay(loaded: LoadedConfig, port: Option<u16>, host: Option<String>) -> ExitCode {
    let config = loaded.config;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let addr = match listen_addr(&host, port.unwrap_or(config.relay.port)) {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if config.relay.recipients.is_empty() {
        tracing::warn!("[relay] recipients is empty, no mail will be sent");
    }

    block_on(async move {
        let state = RelayState::from_config(&config, Arc::new(SendmailMailer::new()))?;
        tracing::info!(path = %state.settings().path, "relay endpoint");
        let listener = bind(addr).await?;
        serve(listener, relay_router(state)).await
    })
}

fn block_on(future: impl Future<Output = Result<(), ServerError>>) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    match runtime.block_on(future) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn file_stem(path: &str) -> String {
    Path::new(path).file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}
