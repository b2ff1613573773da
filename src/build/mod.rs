//! Build pipeline module for sitepipe
//!
//! Turns the asset tree of a site project into its output directory.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Planning**: the fixed set of tasks as a small dependency graph
//! - **Discovery**: find each task's sources using glob patterns from config
//! - **Execution**: run tasks in dependency order and collect their results
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sitepipe::build::{create_build_plan, BuildContext, BuildPipeline};
//!
//! let context = Arc::new(BuildContext::new(config, env, project_root, tools));
//! let plan = create_build_plan(context.config());
//! let result = BuildPipeline::new(context).run(&plan)?;
//! println!("{}", result.summary());
//! ```

pub mod context;
pub mod discovery;
pub mod incremental;
pub mod pipeline;
pub mod progress;
pub mod result;
pub mod task;

pub use context::*;
pub use discovery::*;
pub use incremental::*;
pub use pipeline::*;
pub use result::*;
pub use task::*;
