//! Paged list of goal topics offered in settings.

use serde::{Deserialize, Serialize};

pub const TOPICS_PER_PAGE: usize = 5;

/// Topics fetched for one picker session plus the page on screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicSelection {
    pub topics: Vec<String>,
    #[serde(default)]
    pub page: usize,
}

impl TopicSelection {
    pub fn new(topics: Vec<String>) -> Self {
        Self { topics, page: 0 }
    }

    pub fn page_count(&self) -> usize {
        self.topics.len().div_ceil(TOPICS_PER_PAGE)
    }

    pub fn has_page(&self, page: usize) -> bool {
        page < self.page_count()
    }

    /// Offset of the first entry on the current page and the entries themselves.
    pub fn current_page(&self) -> (usize, &[String]) {
        let start = (self.page * TOPICS_PER_PAGE).min(self.topics.len());
        let end = (start + TOPICS_PER_PAGE).min(self.topics.len());
        (start, &self.topics[start..end])
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.topics.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(n: usize) -> TopicSelection {
        TopicSelection::new((0..n).map(|i| format!("topic{}", i)).collect())
    }

    #[test]
    fn pages_round_up() {
        assert_eq!(selection(0).page_count(), 0);
        assert_eq!(selection(5).page_count(), 1);
        assert_eq!(selection(6).page_count(), 2);
        assert!(selection(6).has_page(1));
        assert!(!selection(6).has_page(2));
    }

    #[test]
    fn last_page_holds_the_remainder() {
        let mut topics = selection(7);
        topics.page = 1;
        let (offset, page) = topics.current_page();
        assert_eq!(offset, 5);
        assert_eq!(page.to_vec(), vec!["topic5".to_string(), "topic6".to_string()]);
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let mut topics = selection(3);
        topics.page = 4;
        assert!(topics.current_page().1.is_empty());
        assert_eq!(topics.get(2), Some("topic2"));
        assert_eq!(topics.get(3), None);
    }
}
