//! Validated static handler configuration
//!
//! `StaticOptions` is whatever the user wrote; `StaticConfig` is what the
//! handler runs with. The conversion happens exactly once, at construction,
//! and is the only place where defaults are filled in, legacy option forms
//! are normalised and deprecation notices are emitted.

use hyper::Method;
use regex::RegexBuilder;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::types::{IndexEntry, IndexOption, StaticOptions};
use crate::error::StaticConfigError;
use crate::handler::index::Matcher;
use crate::handler::template::TemplateRenderer;
use crate::http::CachePolicy;
use crate::logger;

pub const DEFAULT_CACHE_MAX_AGE: u64 = 3600;

/// Template routing: extensions handed to an external renderer
#[derive(Clone)]
pub struct TemplateConfig {
    pub ext: Vec<String>,
    pub renderer: Arc<dyn TemplateRenderer>,
}

impl fmt::Debug for TemplateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateConfig")
            .field("ext", &self.ext)
            .finish_non_exhaustive()
    }
}

impl TemplateConfig {
    /// Whether a file extension is routed to the renderer
    pub fn handles(&self, ext: &str) -> bool {
        !ext.is_empty() && self.ext.iter().any(|e| e == ext)
    }
}

/// Immutable per-handler configuration
#[derive(Debug, Clone)]
pub struct StaticConfig {
    /// Absolute, lexically normalised root directory
    pub root: PathBuf,
    pub methods: Vec<Method>,
    pub show_dir_contents: bool,
    pub index: Vec<Matcher>,
    /// Empty, or `/seg[/seg...]` without trailing slash
    pub url_prefix: String,
    /// Reserved top-level segment names, without the leading slash
    pub urls_reserved: Vec<String>,
    pub template: Option<TemplateConfig>,
    pub cache: CachePolicy,
    pub use_original_url: bool,
    deprecations: Vec<String>,
}

impl StaticConfig {
    /// Validate options against a root directory.
    ///
    /// Deprecation notices are logged here, once per call.
    pub fn from_options(
        root: impl AsRef<Path>,
        options: StaticOptions,
        renderer: Option<Arc<dyn TemplateRenderer>>,
    ) -> Result<Self, StaticConfigError> {
        let root = validate_root(root.as_ref())?;
        let mut deprecations = Vec::new();

        let methods = options
            .method
            .unwrap_or_else(|| vec!["GET".to_string()])
            .into_iter()
            .map(|m| {
                Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                    .map_err(|_| StaticConfigError::InvalidMethod(m))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let index = build_matchers(options.index, &mut deprecations)?;
        let url_prefix = validate_url_prefix(options.url_prefix.unwrap_or_default())?;
        let urls_reserved = options
            .urls_reserved
            .unwrap_or_default()
            .into_iter()
            .map(validate_reserved)
            .collect::<Result<Vec<_>, _>>()?;

        let template = match renderer {
            Some(renderer) if !options.template.ext.is_empty() => Some(TemplateConfig {
                ext: options.template.ext,
                renderer,
            }),
            None if !options.template.ext.is_empty() => {
                logger::log_warning(
                    "Template extensions configured without a renderer; template routing disabled",
                );
                None
            }
            _ => None,
        };

        if options.enable_caching.is_some() {
            deprecations.push(
                "option 'enable_caching' is deprecated, use 'browser_cache_enabled'".to_string(),
            );
        }
        if options.cache_max_age.is_some() {
            deprecations.push(
                "option 'cache_max_age' is deprecated, use 'browser_cache_max_age'".to_string(),
            );
        }
        let cache_enabled = options
            .browser_cache_enabled
            .or(options.enable_caching)
            .unwrap_or(false);
        let max_age = options
            .browser_cache_max_age
            .or(options.cache_max_age)
            .unwrap_or(DEFAULT_CACHE_MAX_AGE);
        let cache = if cache_enabled {
            CachePolicy::Revalidate(max_age)
        } else {
            CachePolicy::Disabled
        };

        for notice in &deprecations {
            logger::log_deprecation(notice);
        }

        Ok(Self {
            root,
            methods,
            show_dir_contents: options.show_dir_contents.unwrap_or(true),
            index,
            url_prefix,
            urls_reserved,
            template,
            cache,
            use_original_url: options.use_original_url.unwrap_or(true),
            deprecations,
        })
    }

    /// Deprecation notices raised while validating the options
    pub fn deprecations(&self) -> &[String] {
        &self.deprecations
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    pub fn is_reserved(&self, segment: &str) -> bool {
        self.urls_reserved.iter().any(|r| r == segment)
    }
}

fn validate_root(root: &Path) -> Result<PathBuf, StaticConfigError> {
    if root.as_os_str().is_empty() {
        return Err(StaticConfigError::EmptyRoot);
    }
    if !root.is_absolute() {
        return Err(StaticConfigError::RelativeRoot(root.to_path_buf()));
    }
    Ok(normalize_absolute(root))
}

/// Collapse `.` and `..` without touching the filesystem
fn normalize_absolute(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn build_matchers(
    index: Option<IndexOption>,
    deprecations: &mut Vec<String>,
) -> Result<Vec<Matcher>, StaticConfigError> {
    let entries = match index {
        None => return Ok(Vec::new()),
        Some(IndexOption::Legacy(name)) => {
            deprecations.push(format!(
                "a single string 'index' is deprecated, use a list: index = [\"{name}\"]"
            ));
            if name.is_empty() {
                return Ok(Vec::new());
            }
            vec![IndexEntry::Name(name)]
        }
        Some(IndexOption::List(entries)) => entries,
    };

    entries
        .into_iter()
        .filter_map(|entry| match entry {
            IndexEntry::Name(name) => Some(Ok(Matcher::Exact(name))),
            IndexEntry::Pattern {
                pattern,
                case_insensitive,
            } => Some(
                RegexBuilder::new(&pattern)
                    .case_insensitive(case_insensitive)
                    .build()
                    .map(Matcher::Pattern)
                    .map_err(|source| StaticConfigError::InvalidIndexPattern { pattern, source }),
            ),
            IndexEntry::Other(_) => None,
        })
        .collect()
}

fn validate_url_prefix(prefix: String) -> Result<String, StaticConfigError> {
    if prefix.is_empty() {
        return Ok(prefix);
    }
    if !prefix.starts_with('/') {
        return Err(StaticConfigError::InvalidUrlPrefix(prefix));
    }
    Ok(prefix.trim_end_matches('/').to_string())
}

fn validate_reserved(reserved: String) -> Result<String, StaticConfigError> {
    match reserved.strip_prefix('/') {
        Some(segment) if !segment.is_empty() && !segment.contains('/') => Ok(segment.to_string()),
        _ => Err(StaticConfigError::InvalidReservedUrl(reserved)),
    }
}
