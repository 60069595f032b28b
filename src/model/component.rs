use regex::Regex;
use std::path::{Path, PathBuf};

/// Where one component writes its logs and how its file names look.
///
/// The regex matches the whole file family: the active file and every rotated
/// variant of it.
#[derive(Debug, Clone)]
pub struct ComponentLogConfiguration {
    component_name: String,
    directory_path: PathBuf,
    file_name_regex: Regex,
}

impl ComponentLogConfiguration {
    pub fn new(
        component_name: impl Into<String>,
        directory_path: impl Into<PathBuf>,
        file_name_regex: Regex,
    ) -> Self {
        Self {
            component_name: component_name.into(),
            directory_path: directory_path.into(),
            file_name_regex,
        }
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    pub fn directory_path(&self) -> &Path {
        &self.directory_path
    }

    pub fn file_name_regex(&self) -> &Regex {
        &self.file_name_regex
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.file_name_regex.is_match(file_name)
    }
}
