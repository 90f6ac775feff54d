//! Index file discovery

use regex::Regex;
use std::ffi::OsString;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::logger;

/// One rule of the index search order
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact file name
    Exact(String),
    /// Regular expression searched anywhere in the file name
    Pattern(Regex),
}

impl Matcher {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == name,
            Self::Pattern(re) => re.is_match(name),
        }
    }
}

/// Find the index file of `dir`.
///
/// Matchers are tried in order and the first one with a matching regular
/// file wins; within a matcher, candidates come in directory order. Every
/// candidate is checked with a fresh `metadata` call, so entries that are
/// directories or vanished since the listing are skipped.
pub async fn find_index(dir: &Path, matchers: &[Matcher]) -> Option<(PathBuf, Metadata)> {
    if matchers.is_empty() {
        return None;
    }

    let names = match read_names(dir).await {
        Ok(names) => names,
        Err(e) => {
            logger::log_warning(&format!(
                "Cannot scan '{}' for index files: {e}",
                dir.display()
            ));
            return None;
        }
    };

    for matcher in matchers {
        let candidates = names
            .iter()
            .filter(|name| name.to_str().is_some_and(|n| matcher.matches(n)));
        for name in candidates {
            let path = dir.join(name);
            if let Ok(meta) = fs::metadata(&path).await {
                if meta.is_file() {
                    return Some((path, meta));
                }
            }
        }
    }
    None
}

async fn read_names(dir: &Path) -> io::Result<Vec<OsString>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name());
    }
    Ok(names)
}
