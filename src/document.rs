//! Structured-document access over a rendered page snapshot.

use scraper::{ElementRef, Html, Selector};
use log::warn;

pub fn find_section<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    let selector = match Selector::parse(&format!(r#"section[id="{}"]"#, id)) {
        Ok(s) => s,
        Err(e) => {
            warn!("Unusable section id {:?}: {}", id, e);
            return None;
        }
    };
    document.select(&selector).next()
}

/// All descendants of `section` with the given tag, in document order.
pub fn find_all_elements<'a>(section: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(tag) {
        Ok(selector) => section.select(&selector).collect(),
        Err(e) => {
            warn!("Unusable element tag {:?}: {}", tag, e);
            Vec::new()
        }
    }
}

pub struct PageSnapshot<'a> {
    pub element_groups: Vec<ElementRef<'a>>,
}

impl<'a> PageSnapshot<'a> {
    /// `None` when the section is absent; an empty snapshot when it has no groups.
    pub fn capture(document: &'a Html, section_id: &str, tag: &str) -> Option<Self> {
        let section = find_section(document, section_id)?;
        Some(PageSnapshot {
            element_groups: find_all_elements(section, tag),
        })
    }

    pub fn count(&self) -> usize {
        self.element_groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.element_groups.is_empty()
    }
}
