//! Business logic services.
//!
//! Services sit on top of the stores: resolution, dependency collection and
//! the workspace that routes watch events.

mod dependency;
mod resolver;
mod workspace;

pub use dependency::{Dependencies, DependencyCollector};
pub use resolver::{PartialSource, Resolver, missing_sentinel, render, static_references};
pub use workspace::{
    PARTIALS_DIR, PROMPTS_DIR, WatchOutcome, WatchTarget, Workspace, WorkspaceReport,
};
