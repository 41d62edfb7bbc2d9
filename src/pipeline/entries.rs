//! Style-number detection and grouping of page content into entries.
//!
//! Line sheets are laid out one of three ways: one product per page, several
//! products per page, or a product spread over consecutive pages with the
//! style number printed only on the first. The grouping rules cover all three:
//!
//! * entries appear in the order their style number is first seen;
//! * a style number seen again later merges into its first entry;
//! * a page without any style number donates its images to the most recent
//!   entry (a continuation page);
//! * images before the first style number belong to no product and are dropped.

use crate::output::ExtractedEntry;
use edgequake_llm::ImageData;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Matches "Style", "Style No.", "Style #", "Style Number" followed by a code
/// that contains at least one digit.
pub const DEFAULT_STYLE_PATTERN: &str =
    r"(?i)\bstyle\s*(?:no\.?|number|num\.?|#)?\s*[:#.]?\s*([A-Z0-9][A-Z0-9\-_/]*\d[A-Z0-9\-_/]*|\d)\b";

static DEFAULT_STYLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(DEFAULT_STYLE_PATTERN).unwrap());

/// The built-in style-number regex.
pub fn default_style_regex() -> &'static Regex {
    &DEFAULT_STYLE_RE
}

/// Text and images read from one PDF page.
#[derive(Clone, Default)]
pub struct PageContent {
    /// 1-indexed page number.
    pub page_num: usize,
    pub text: String,
    pub images: Vec<ImageData>,
}

/// Style numbers on a page, in reading order, without repeats.
pub fn find_style_numbers(text: &str, re: &Regex) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in re.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            let style = m.as_str().trim_end_matches(['-', '_', '/']).to_string();
            if !style.is_empty() && !found.contains(&style) {
                found.push(style);
            }
        }
    }
    found
}

/// Fold pages into one entry per style number. `max_images` caps the images
/// kept per entry.
pub fn group_entries(pages: Vec<PageContent>, re: &Regex, max_images: usize) -> Vec<ExtractedEntry> {
    let mut entries: Vec<ExtractedEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut last: Option<usize> = None;

    for page in pages {
        let styles = find_style_numbers(&page.text, re);

        if styles.is_empty() {
            match last {
                Some(i) => {
                    debug!(
                        "Page {}: no style number, {} image(s) continue '{}'",
                        page.page_num,
                        page.images.len(),
                        entries[i].style_number
                    );
                    push_images(&mut entries[i], &page.images, max_images);
                }
                None => debug!(
                    "Page {}: no style number before first product, skipping {} image(s)",
                    page.page_num,
                    page.images.len()
                ),
            }
            continue;
        }

        debug!("Page {}: style numbers {:?}", page.page_num, styles);
        for style in styles {
            let i = *index.entry(style.clone()).or_insert_with(|| {
                entries.push(ExtractedEntry {
                    style_number: style.clone(),
                    images: Vec::new(),
                });
                entries.len() - 1
            });
            push_images(&mut entries[i], &page.images, max_images);
            last = Some(i);
        }
    }

    entries
}

fn push_images(entry: &mut ExtractedEntry, images: &[ImageData], max_images: usize) {
    let room = max_images.saturating_sub(entry.images.len());
    entry.images.extend(images.iter().take(room).cloned());
}
