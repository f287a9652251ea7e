//! Raw line stream handed over by the text-extraction collaborator.

use memchr::memchr_iter;

/// Form feed, the page separator emitted by `pdftotext`.
const PAGE_BREAK: char = '\x0c';

/// Ordered source lines plus page-boundary markers.
///
/// `page_starts` holds the index of the first line of every page after the
/// first, in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineStream {
    pub lines: Vec<String>,
    pub page_starts: Vec<usize>,
}

impl LineStream {
    /// Build a stream from plain lines without page information.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            page_starts: Vec::new(),
        }
    }

    /// Split extracted text into lines, treating form feeds as page breaks.
    ///
    /// A form feed opens a new page without producing a line of its own, so
    /// the `\n\x0c` sequence pdftotext writes between pages adds no blank line.
    pub fn from_text(text: &str) -> Self {
        let mut stream = LineStream::default();
        let mut pending_page = false;
        let mut start = 0;

        for pos in memchr_iter(b'\n', text.as_bytes()) {
            stream.push_raw(&text[start..pos], &mut pending_page);
            start = pos + 1;
        }
        if start < text.len() {
            stream.push_raw(&text[start..], &mut pending_page);
        }

        stream
    }

    fn push_raw(&mut self, raw: &str, pending_page: &mut bool) {
        let raw = raw.trim_end_matches('\r');
        if !raw.contains(PAGE_BREAK) {
            self.push_line(raw, pending_page);
            return;
        }

        for (i, segment) in raw.split(PAGE_BREAK).enumerate() {
            if i > 0 {
                *pending_page = true;
            }
            if !segment.is_empty() {
                self.push_line(segment, pending_page);
            }
        }
    }

    fn push_line(&mut self, line: &str, pending_page: &mut bool) {
        if *pending_page {
            if !self.lines.is_empty() {
                self.page_starts.push(self.lines.len());
            }
            *pending_page = false;
        }
        self.lines.push(line.to_string());
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of pages (at least one for a non-empty stream).
    pub fn page_count(&self) -> usize {
        if self.lines.is_empty() {
            0
        } else {
            self.page_starts.len() + 1
        }
    }

    /// 1-based page number of a line.
    pub fn page_of(&self, line: usize) -> usize {
        self.page_starts.partition_point(|&start| start <= line) + 1
    }

    /// Total number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.lines.iter().map(|l| l.split_whitespace().count()).sum()
    }

    /// Number of characters that are not whitespace.
    pub fn text_len(&self) -> usize {
        self.lines
            .iter()
            .map(|l| l.chars().filter(|c| !c.is_whitespace()).count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_and_pages() {
        let stream = LineStream::from_text("a\nb\n\x0cc\nd\n\x0c");
        assert_eq!(stream.lines, vec!["a", "b", "c", "d"]);
        assert_eq!(stream.page_starts, vec![2]);
        assert_eq!(stream.page_count(), 2);
    }

    #[test]
    fn form_feed_inside_line() {
        let stream = LineStream::from_text("page one\x0cpage two\n");
        assert_eq!(stream.lines, vec!["page one", "page two"]);
        assert_eq!(stream.page_starts, vec![1]);
        assert_eq!(stream.page_count(), 2);
        assert_eq!(stream.page_of(0), 1);
        assert_eq!(stream.page_of(1), 2);
    }

    #[test]
    fn trailing_text_without_newline() {
        let stream = LineStream::from_text("one\r\ntwo");
        assert_eq!(stream.lines, vec!["one", "two"]);
        assert!(stream.page_starts.is_empty());
    }

    #[test]
    fn counts() {
        let stream = LineStream::from_lines(["two words", "", " three  more words "]);
        assert_eq!(stream.word_count(), 5);
        assert_eq!(stream.text_len(), 22);
    }
}
