//! FnExecutor - クロージャを TaskExecutor として使うためのアダプタ

use crate::domain::TaskData;
use crate::error::ExecutionError;
use crate::ports::TaskExecutor;

pub struct FnExecutor<F> {
    f: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&TaskData) -> Result<(), ExecutionError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> TaskExecutor for FnExecutor<F>
where
    F: Fn(&TaskData) -> Result<(), ExecutionError> + Send + Sync,
{
    fn execute(&self, task: &TaskData) -> Result<(), ExecutionError> {
        (self.f)(task)
    }
}
