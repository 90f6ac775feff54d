//! Directory listing pages
//!
//! Renders an HTML index of a directory with sortable name, type and size
//! columns. Sorting is driven by the `sort` (`name`, `type`, `size`) and
//! `order` (`asc`, `desc`) query parameters; unknown values fall back to
//! name ascending. Directories stay on top for type and size sorts whatever
//! the order.

use futures_util::future::join_all;
use hyper::Response;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::cmp::Ordering;
use std::fs::FileType;
use std::io;
use std::path::Path;
use tokio::fs;

use super::resolve::RequestContext;
use crate::config::StaticConfig;
use crate::http::response::DIRECTORY_ERROR_PAGE;
use crate::http::{self, mime, Body};
use crate::logger;

/// Characters left alone by `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Type,
    Size,
}

impl SortKey {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Type => "type",
            Self::Size => "size",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Sort settings read from the query string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListingQuery {
    pub sort: SortKey,
    pub order: SortOrder,
}

impl ListingQuery {
    pub fn parse(query: Option<&str>) -> Self {
        let mut parsed = Self::default();
        for pair in query.unwrap_or_default().split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = percent_decode_str(value).decode_utf8_lossy();
            match (key, value.as_ref()) {
                ("sort", "name") => parsed.sort = SortKey::Name,
                ("sort", "type") => parsed.sort = SortKey::Type,
                ("sort", "size") => parsed.sort = SortKey::Size,
                ("order", "asc") => parsed.order = SortOrder::Asc,
                ("order", "desc") => parsed.order = SortOrder::Desc,
                _ => {}
            }
        }
        parsed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

/// One row of the listing
#[derive(Debug, Clone)]
pub struct ListingItem {
    pub name: String,
    pub kind: EntryKind,
    /// Entry is, or points to, a directory
    pub is_dir: bool,
    /// Mime type, or `DIR`
    pub label: String,
    /// Byte size, `None` for directories and unresolvable entries
    pub size: Option<u64>,
    pub href: String,
    pub reserved: bool,
}

/// Render the listing of the directory `ctx.candidate`
pub async fn render_listing(config: &StaticConfig, ctx: &RequestContext) -> Response<Body> {
    let entries = match read_entries(&ctx.candidate).await {
        Ok(entries) => entries,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read directory '{}': {e}",
                ctx.candidate.display()
            ));
            return http::build_html_response(DIRECTORY_ERROR_PAGE.to_string());
        }
    };

    let query = ListingQuery::parse(ctx.query.as_deref());
    let lookups = entries
        .into_iter()
        .map(|(name, file_type)| describe(config, ctx, name, file_type));
    let mut items: Vec<ListingItem> = join_all(lookups).await.into_iter().flatten().collect();
    sort_items(&mut items, query);

    http::build_html_response(render_page(ctx, query, &items))
}

async fn read_entries(dir: &Path) -> io::Result<Vec<(String, FileType)>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        match entry.file_type().await {
            Ok(file_type) => entries.push((name, file_type)),
            Err(e) => logger::log_warning(&format!(
                "Listing skips '{name}' in '{}': {e}",
                dir.display()
            )),
        }
    }
    Ok(entries)
}

async fn describe(
    config: &StaticConfig,
    ctx: &RequestContext,
    name: String,
    file_type: FileType,
) -> Option<ListingItem> {
    let kind = if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Dir
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        logger::log_info(&format!(
            "Listing skips '{name}' in '{}': not a file, directory or symlink",
            ctx.candidate.display()
        ));
        return None;
    };

    let path = ctx.candidate.join(&name);
    let target = match kind {
        EntryKind::Dir => None,
        EntryKind::File | EntryKind::Symlink => fs::metadata(&path).await.ok(),
    };
    let is_dir = kind == EntryKind::Dir || target.as_ref().is_some_and(std::fs::Metadata::is_dir);

    let (label, size) = if is_dir {
        ("DIR".to_string(), None)
    } else {
        let label = mime::lookup(&path).unwrap_or_else(|| "unknown".to_string());
        (label, target.as_ref().map(std::fs::Metadata::len))
    };

    let reserved = ctx.at_prefix_root()
        && matches!(kind, EntryKind::Dir | EntryKind::Symlink)
        && config.is_reserved(&name);

    let encoded = utf8_percent_encode(&name, URI_COMPONENT);
    let href = if ctx.page_path == "/" {
        format!("/{encoded}")
    } else {
        format!("{}/{encoded}", ctx.page_path)
    };

    Some(ListingItem {
        name,
        kind,
        is_dir,
        label,
        size,
        href,
        reserved,
    })
}

/// Stable sort; descending only reverses the order inside each group
pub fn sort_items(items: &mut [ListingItem], query: ListingQuery) {
    items.sort_by(|a, b| {
        let group = match query.sort {
            SortKey::Name => Ordering::Equal,
            SortKey::Type | SortKey::Size => b.is_dir.cmp(&a.is_dir),
        };
        group.then_with(|| {
            let within = match query.sort {
                SortKey::Name => compare_names(&a.name, &b.name),
                SortKey::Type => a.label.cmp(&b.label),
                SortKey::Size => a.size.unwrap_or(0).cmp(&b.size.unwrap_or(0)),
            };
            match query.order {
                SortOrder::Asc => within,
                SortOrder::Desc => within.reverse(),
            }
        })
    });
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Human readable size, base 1024 with two decimals
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", SIZE_UNITS[unit])
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn parent_href(page_path: &str) -> String {
    let mut segments: Vec<&str> = page_path.split('/').collect();
    segments.pop();
    let parent = segments.join("/");
    if parent.is_empty() {
        "/".to_string()
    } else {
        parent
    }
}

fn header_cell(title: &str, key: SortKey, query: ListingQuery) -> String {
    let (order, arrow) = if query.sort == key {
        let arrow = match query.order {
            SortOrder::Asc => " \u{2191}",
            SortOrder::Desc => " \u{2193}",
        };
        (query.order.toggled(), arrow)
    } else {
        (SortOrder::Asc, "")
    };
    format!(
        "<th><a href=\"?sort={}&amp;order={}\">{title}{arrow}</a></th>",
        key.as_str(),
        order.as_str()
    )
}

fn render_page(ctx: &RequestContext, query: ListingQuery, items: &[ListingItem]) -> String {
    let title = format!("Index of {}", escape_html(&ctx.relative_path));
    let mut rows = String::new();

    if !ctx.at_prefix_root() {
        rows.push_str(&format!(
            "<tr><td><a href=\"{}\"><b>.. Parent Directory</b></a></td><td>DIR</td><td>-</td></tr>\n",
            escape_html(&parent_href(&ctx.page_path))
        ));
    }

    if items.is_empty() {
        rows.push_str("<tr><td colspan=\"3\">empty folder</td></tr>\n");
    }

    for item in items {
        let name = escape_html(&item.name);
        if item.reserved {
            rows.push_str(&format!(
                "<tr><td>{name}</td><td>DIR BUT RESERVED</td><td>-</td></tr>\n"
            ));
            continue;
        }
        let size = item.size.map_or_else(|| "-".to_string(), format_size);
        rows.push_str(&format!(
            "<tr><td><a href=\"{}\">{name}</a></td><td>{}</td><td>{size}</td></tr>\n",
            escape_html(&item.href),
            escape_html(&item.label)
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{ font-family: monospace; margin: 2em; }}
        table {{ border-collapse: collapse; }}
        th, td {{ text-align: left; padding: 0.2em 1.5em 0.2em 0; }}
    </style>
</head>
<body>
<h1>{title}</h1>
<table>
<tr>{}{}{}</tr>
{rows}</table>
</body>
</html>
"#,
        header_cell("Name", SortKey::Name, query),
        header_cell("Type", SortKey::Type, query),
        header_cell("Size", SortKey::Size, query),
    )
}
