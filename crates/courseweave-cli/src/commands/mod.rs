use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use courseweave_core::loader::DataPaths;

pub mod init;
pub mod run;
pub mod validate;

/// Where the course and prerequisite tables come from.
#[derive(Debug, Args)]
pub struct DataArgs {
    /// Directory holding courses.json, prerequisites.json and optionally completions.json
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Course records JSON (overrides --data)
    #[arg(long)]
    pub courses: Option<PathBuf>,

    /// Prerequisite records JSON (overrides --data)
    #[arg(long)]
    pub prerequisites: Option<PathBuf>,
}

impl DataArgs {
    pub fn resolve(self) -> Result<DataPaths> {
        let base = match &self.data {
            Some(dir) => {
                anyhow::ensure!(dir.is_dir(), "not a directory: {}", dir.display());
                Some(DataPaths::in_dir(dir))
            }
            None => None,
        };

        let courses = self
            .courses
            .or_else(|| base.as_ref().map(|b| b.courses.clone()));
        let prerequisites = self
            .prerequisites
            .or_else(|| base.as_ref().map(|b| b.prerequisites.clone()));
        let (Some(courses), Some(prerequisites)) = (courses, prerequisites) else {
            anyhow::bail!("pass --data <dir>, or both --courses and --prerequisites");
        };

        Ok(DataPaths {
            courses,
            prerequisites,
            completions: base.and_then(|b| b.completions),
        })
    }
}
