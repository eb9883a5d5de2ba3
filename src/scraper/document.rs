//! Parsed page handle.
//!
//! Some auxiliary tables are shipped inside HTML comments so that they only
//! render after client-side script runs. `find_in_comments` digs them out.

use scraper::{ElementRef, Html, Selector};

pub struct Document {
    html: Html,
}

/// Result of looking a table up by id.
pub enum TableLookup<'a> {
    Found(ElementRef<'a>),
    NotFound,
}

impl Document {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    pub fn parse_fragment(markup: &str) -> Self {
        Self {
            html: Html::parse_fragment(markup),
        }
    }

    /// Re-parse the first comment whose text contains `marker`.
    pub fn find_in_comments(&self, marker: &str) -> Option<Document> {
        self.html
            .tree
            .root()
            .descendants()
            .filter_map(|node| node.value().as_comment())
            .find(|comment| comment.contains(marker))
            .map(|comment| Document::parse_fragment(comment))
    }

    /// Element with the given `id` attribute.
    pub fn table(&self, id: &str) -> TableLookup<'_> {
        // Attribute form sidesteps CSS escaping of ids.
        let Ok(sel) = Selector::parse(&format!(r#"[id="{id}"]"#)) else {
            return TableLookup::NotFound;
        };
        match self.html.select(&sel).next() {
            Some(el) => TableLookup::Found(el),
            None => TableLookup::NotFound,
        }
    }
}
