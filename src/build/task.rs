//! Build task definitions.
//!
//! A task is one source-to-output unit of the pipeline: the fonts copy, the
//! stylesheet compile, and so on. Tasks are declared in a [`BuildPlan`]
//! together with the tasks they depend on, and run in dependency order.

use std::path::PathBuf;

use crate::config::SiteConfig;
use crate::tasks::{FONTS_DIR, IMAGES_DIR, SCRIPTS_DIR, STYLES_DIR};

/// Which task this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Empty the output directory
    Clean,
    /// Copy font files
    Fonts,
    /// Compile, prefix and minify stylesheets
    Styles,
    /// Bundle the script entry
    Scripts,
    /// Copy raster images, optimize SVGs, place the favicon
    Images,
    /// Render page templates
    Views,
    /// Render `.htaccess` and `robots.txt`, copy the mail script
    Files,
}

impl TaskKind {
    /// Every task, in default plan order.
    pub const ALL: [TaskKind; 7] = [
        TaskKind::Clean,
        TaskKind::Fonts,
        TaskKind::Styles,
        TaskKind::Scripts,
        TaskKind::Images,
        TaskKind::Views,
        TaskKind::Files,
    ];

    /// Stable name used as task id and in filters.
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Clean => "clean",
            TaskKind::Fonts => "fonts",
            TaskKind::Styles => "styles",
            TaskKind::Scripts => "scripts",
            TaskKind::Images => "images",
            TaskKind::Views => "views",
            TaskKind::Files => "files",
        }
    }

    /// Look a task up by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A task in the plan.
#[derive(Debug, Clone)]
pub struct AssetTask {
    /// Unique identifier (the task name)
    pub id: String,
    /// What the task does
    pub kind: TaskKind,
    /// Glob of the files the task reads
    pub source_glob: Option<String>,
    /// Glob whose changes re-run the task in watch mode
    pub watch_glob: Option<String>,
    /// Output location relative to the output directory
    pub output_subpath: PathBuf,
    /// Tasks that must finish first
    pub dependencies: Vec<String>,
}

impl AssetTask {
    /// Create a task with no globs and no dependencies.
    pub fn new(kind: TaskKind, output_subpath: impl Into<PathBuf>) -> Self {
        Self {
            id: kind.name().to_string(),
            kind,
            source_glob: None,
            watch_glob: None,
            output_subpath: output_subpath.into(),
            dependencies: vec![],
        }
    }

    /// Set the source glob.
    pub fn with_source(mut self, glob: &str) -> Self {
        self.source_glob = Some(glob.to_string());
        self
    }

    /// Set the watch glob.
    pub fn with_watch(mut self, glob: &str) -> Self {
        self.watch_glob = Some(glob.to_string());
        self
    }

    /// Add a dependency.
    pub fn with_dependency(mut self, dep: &str) -> Self {
        self.dependencies.push(dep.to_string());
        self
    }

    /// Whether the task matches a filter: its id, or `*`.
    pub fn matches_filter(&self, filter: &str) -> bool {
        filter == "*" || self.id == filter
    }
}

/// The tasks of one run, with their dependency edges.
#[derive(Debug, Default, Clone)]
pub struct BuildPlan {
    tasks: Vec<AssetTask>,
}

impl BuildPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self { tasks: vec![] }
    }

    /// Add a task.
    pub fn add_task(&mut self, task: AssetTask) {
        self.tasks.push(task);
    }

    /// All tasks, in insertion order.
    pub fn tasks(&self) -> &[AssetTask] {
        &self.tasks
    }

    /// Find a task by kind.
    pub fn get(&self, kind: TaskKind) -> Option<&AssetTask> {
        self.tasks.iter().find(|t| t.kind == kind)
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the plan has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Keep only tasks matching one of `patterns`.
    ///
    /// Dependencies that are filtered out are not pulled back in, so
    /// `--only styles` rebuilds stylesheets without cleaning first.
    pub fn filter(mut self, patterns: &[String]) -> Self {
        if patterns.is_empty() {
            return self;
        }
        self.tasks.retain(|t| patterns.iter().any(|p| t.matches_filter(p)));
        self
    }

    /// Tasks sorted so every dependency precedes its dependents.
    ///
    /// Independent tasks keep their insertion order.
    pub fn build_order(&self) -> Result<Vec<&AssetTask>, BuildOrderError> {
        let mut result = Vec::new();
        let mut visited = std::collections::HashSet::new();
        let mut visiting = std::collections::HashSet::new();

        for task in &self.tasks {
            self.visit_task(task, &mut visited, &mut visiting, &mut result)?;
        }

        Ok(result)
    }

    fn visit_task<'a>(
        &'a self,
        task: &'a AssetTask,
        visited: &mut std::collections::HashSet<String>,
        visiting: &mut std::collections::HashSet<String>,
        result: &mut Vec<&'a AssetTask>,
    ) -> Result<(), BuildOrderError> {
        if visited.contains(&task.id) {
            return Ok(());
        }

        if visiting.contains(&task.id) {
            return Err(BuildOrderError::CyclicDependency(task.id.clone()));
        }

        visiting.insert(task.id.clone());

        for dep_id in &task.dependencies {
            if let Some(dep) = self.tasks.iter().find(|t| &t.id == dep_id) {
                self.visit_task(dep, visited, visiting, result)?;
            }
        }

        visiting.remove(&task.id);
        visited.insert(task.id.clone());
        result.push(task);

        Ok(())
    }
}

/// Error during build order calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOrderError {
    /// Circular dependency detected
    CyclicDependency(String),
}

impl std::fmt::Display for BuildOrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildOrderError::CyclicDependency(id) => {
                write!(f, "Circular dependency detected involving task '{}'", id)
            }
        }
    }
}

impl std::error::Error for BuildOrderError {}

/// The standard plan: `clean`, then every asset task.
///
/// Asset tasks depend only on `clean`; none reads another's output.
pub fn create_build_plan(config: &SiteConfig) -> BuildPlan {
    let clean = TaskKind::Clean.name();
    let mut plan = BuildPlan::new();

    plan.add_task(AssetTask::new(TaskKind::Clean, ""));
    plan.add_task(
        AssetTask::new(TaskKind::Fonts, FONTS_DIR)
            .with_source(&config.fonts.source)
            .with_dependency(clean),
    );
    plan.add_task(
        AssetTask::new(TaskKind::Styles, STYLES_DIR)
            .with_source(&config.styles.source)
            .with_watch(&config.styles.watch)
            .with_dependency(clean),
    );
    plan.add_task(
        AssetTask::new(TaskKind::Scripts, SCRIPTS_DIR)
            .with_source(&config.scripts.entry)
            .with_watch(&config.scripts.watch)
            .with_dependency(clean),
    );
    plan.add_task(
        AssetTask::new(TaskKind::Images, IMAGES_DIR)
            .with_source(&config.images.raster)
            .with_watch(&config.images.watch)
            .with_dependency(clean),
    );
    plan.add_task(
        AssetTask::new(TaskKind::Views, "")
            .with_source(&config.views.pages)
            .with_watch(&config.views.watch)
            .with_dependency(clean),
    );
    plan.add_task(AssetTask::new(TaskKind::Files, "").with_dependency(clean));

    plan
}
