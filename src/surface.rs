use std::ops::Range;

use anyhow::{bail, Error};
use regex::Regex;

/// Somewhere rendered markup is shown. Each update replaces the whole content.
pub trait Surface {
    fn replace(&mut self, html: &str) -> Result<(), Error>;
}

/// Keeps every state it was put in, for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    pub history: Vec<String>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current content, if any was ever set.
    pub fn content(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }
}

impl Surface for MemorySurface {
    fn replace(&mut self, html: &str) -> Result<(), Error> {
        self.history.push(html.to_string());
        Ok(())
    }
}

/// An HTML page whose container element, found by its `id`, is the surface.
#[derive(Debug, Clone)]
pub struct TemplateSurface {
    page: String,
    content: Range<usize>,
}

impl TemplateSurface {
    /// Locate the element with `id="<container_id>"` in `page`.
    ///
    /// Fails if there is no such element or it is never closed.
    pub fn new(page: String, container_id: &str) -> Result<Self, Error> {
        let open = Regex::new(&format!(
            r#"<([A-Za-z][A-Za-z0-9-]*)(?:\s[^>]*)?\sid\s*=\s*["']{}["'][^>]*>"#,
            regex::escape(container_id)
        ))?;

        let captures = match open.captures(&page) {
            Some(captures) => captures,
            None => bail!("Container with id {:?} not found", container_id),
        };

        let (start, tag) = match (captures.get(0), captures.get(1)) {
            (Some(whole), Some(tag)) => (whole.end(), tag.as_str().to_string()),
            _ => bail!("Container with id {:?} not found", container_id),
        };

        let end = match find_closing_tag(&page[start..], &tag)? {
            Some(offset) => start + offset,
            None => bail!("Container with id {:?} is never closed", container_id),
        };

        Ok(TemplateSurface {
            page,
            content: start..end,
        })
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn into_page(self) -> String {
        self.page
    }
}

impl Surface for TemplateSurface {
    fn replace(&mut self, html: &str) -> Result<(), Error> {
        self.page.replace_range(self.content.clone(), html);
        self.content = self.content.start..self.content.start + html.len();
        Ok(())
    }
}

/// Offset of the `</tag>` that closes an element whose content starts `html`.
fn find_closing_tag(html: &str, tag: &str) -> Result<Option<usize>, Error> {
    let tags = Regex::new(&format!(r"(?i)<(/?){}(?:\s[^>]*)?>", regex::escape(tag)))?;

    let mut depth = 0usize;
    for captures in tags.captures_iter(html) {
        let (whole, closing) = match (captures.get(0), captures.get(1)) {
            (Some(whole), Some(closing)) => (whole, !closing.as_str().is_empty()),
            _ => continue,
        };

        if !closing {
            if !whole.as_str().ends_with("/>") {
                depth += 1;
            }
        } else if depth == 0 {
            return Ok(Some(whole.start()));
        } else {
            depth -= 1;
        }
    }

    Ok(None)
}
