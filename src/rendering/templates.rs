use serde::Serialize;
use tera::{Context, Tera};

use crate::error::AppError;

/// Templates compiled into the binary, keyed by name.
const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("macros.html", include_str!("../../templates/macros.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("blog_list.html", include_str!("../../templates/blog_list.html")),
    ("blog_post.html", include_str!("../../templates/blog_post.html")),
    ("not_found.html", include_str!("../../templates/not_found.html")),
];

/// Renders the public pages.
pub struct PageRenderer {
    tera: Tera,
}

impl PageRenderer {
    pub fn new() -> Result<Self, AppError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.to_vec())?;

        tracing::debug!(count = TEMPLATES.len(), "loaded page templates");
        Ok(Self { tera })
    }

    /// Render `template` with every field of `data` as a top-level variable.
    pub fn render<T: Serialize>(&self, template: &str, data: &T) -> Result<String, AppError> {
        let context = Context::from_serialize(data)?;
        Ok(self.tera.render(template, &context)?)
    }
}
