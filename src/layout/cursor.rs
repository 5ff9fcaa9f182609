use tracing::debug;

use crate::pdf::PageGeometry;

/// Where to draw the next line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub page: usize,
    pub y: f32,
    /// Set when the line starts a page that the document does not have yet.
    pub new_page: Option<PageGeometry>,
}

/// Tracks the current page and the top of the next free line slot.
///
/// Pages the document already has are reused in order; past the last one,
/// new pages take the geometry of the first page.
#[derive(Debug, Clone)]
pub struct PageCursor {
    pages: Vec<PageGeometry>,
    template: PageGeometry,
    margin: f32,
    index: usize,
    y: f32,
    lines_on_page: usize,
}

impl PageCursor {
    /// `pages` are the pages the document starts with; when empty, `fallback`
    /// becomes the first page.
    pub fn new(pages: Vec<PageGeometry>, fallback: PageGeometry, margin: f32) -> Self {
        let pages = if pages.is_empty() {
            vec![fallback]
        } else {
            pages
        };
        let template = pages[0];
        Self {
            y: template.height - margin,
            pages,
            template,
            margin,
            index: 0,
            lines_on_page: 0,
        }
    }

    pub fn page_index(&self) -> usize {
        self.index
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Reserves a slot of `line_height` and returns its baseline. Moves to the
    /// next page first when the slot would cross the bottom margin, unless
    /// the current page is still empty.
    ///
    /// The first line on a page is always placed, even when the page is
    /// shorter than `2 * margin + line_height`; its baseline then falls below
    /// the bottom margin, and every further line goes to a page of its own.
    pub fn request_line(&mut self, line_height: f32) -> Baseline {
        let mut new_page = None;
        if self.y - line_height < self.margin && self.lines_on_page > 0 {
            new_page = self.advance();
        }
        self.y -= line_height;
        self.lines_on_page += 1;
        Baseline {
            page: self.index,
            y: self.y,
            new_page,
        }
    }

    fn advance(&mut self) -> Option<PageGeometry> {
        self.index += 1;
        self.lines_on_page = 0;
        let created = if self.index < self.pages.len() {
            None
        } else {
            self.pages.push(self.template);
            Some(self.template)
        };
        let geometry = self.pages[self.index];
        self.y = geometry.height - self.margin;
        debug!(
            "page break: page {} ({})",
            self.index,
            if created.is_some() { "new" } else { "reused" }
        );
        created
    }
}
