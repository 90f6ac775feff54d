//! Template rendering capability
//!
//! The handler does not know any template engine. Files whose extension is
//! listed in `template.ext` are handed to a `TemplateRenderer` supplied by the
//! embedding application, and whatever it returns is sent as is.

use async_trait::async_trait;
use hyper::Response;
use std::error::Error;
use std::path::Path;

use crate::http::Body;
use crate::pipeline::{Next, ServerRequest};

pub type RenderError = Box<dyn Error + Send + Sync>;

#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    /// Render the template at `path` (absolute, inside the served root).
    ///
    /// `next` lets a renderer decline and pass the request down the pipeline.
    async fn render(
        &self,
        req: ServerRequest,
        next: Next<'_>,
        path: &Path,
    ) -> Result<Response<Body>, RenderError>;
}

/// Extension used for template routing: text after the last `.` of the file
/// name. Dot-files and names ending in `.` have none.
pub fn template_extension(path: &Path) -> Option<&str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_extension() {
        assert_eq!(template_extension(Path::new("/srv/page.ejs")), Some("ejs"));
        assert_eq!(template_extension(Path::new("/srv/a.b.EJS")), Some("EJS"));
        assert_eq!(template_extension(Path::new("/srv/.gitignore")), None);
        assert_eq!(template_extension(Path::new("/srv/Makefile")), None);
        assert_eq!(template_extension(Path::new("/srv/trailing.")), None);
    }
}
