//! Named pipeline steps.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use provision_core::{Argument, Arguments};

use crate::context::JobContext;
use crate::error::Result;

/// The work a job performs.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run with the job's resolved arguments.
    async fn run(&self, ctx: &mut JobContext, args: &Arguments) -> Result<()>;
}

/// A titled step with declared arguments and dependencies.
#[derive(Clone)]
pub struct Job {
    pub title: String,
    pub description: String,
    pub depends_on: Vec<String>,
    pub args: Arguments,
    handler: Arc<dyn JobHandler>,
}

impl Job {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        handler: impl JobHandler + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            depends_on: Vec::new(),
            args: Arguments::new(),
            handler: Arc::new(handler),
        }
    }

    #[must_use]
    pub fn depends_on(mut self, title: impl Into<String>) -> Self {
        self.depends_on.push(title.into());
        self
    }

    #[must_use]
    pub fn with_arg(mut self, argument: Argument) -> Self {
        self.args.set(argument);
        self
    }

    /// Declared arguments with matching keys taken from `overrides`.
    pub fn resolve_args(&self, overrides: &Arguments) -> Arguments {
        self.args.with_overrides(overrides)
    }

    /// Run the handler.
    ///
    /// # Errors
    ///
    /// Whatever the handler returns.
    pub async fn run(&self, ctx: &mut JobContext, overrides: &Arguments) -> Result<()> {
        let args = self.resolve_args(overrides);
        self.handler.run(ctx, &args).await
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("title", &self.title)
            .field("depends_on", &self.depends_on)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
