//! Join per-page markdown into one document.
//!
//! Every page gets a `## Page N` heading (1-based) and is followed by a
//! horizontal rule. The layout is a wire format for downstream consumers, so
//! it is produced byte-for-byte and never depends on page content.

use std::fmt::Write as _;

/// Concatenate pages as `\n## Page {n}\n\n{page}\n\n---\n`, in order.
///
/// An empty slice yields an empty string.
pub fn assemble<S: AsRef<str>>(pages: &[S]) -> String {
    let body: usize = pages.iter().map(|p| p.as_ref().len() + 24).sum();
    let mut out = String::with_capacity(body);
    for (i, page) in pages.iter().enumerate() {
        // Writing into a String cannot fail.
        let _ = write!(out, "\n## Page {}\n\n{}\n\n---\n", i + 1, page.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_pages() {
        assert_eq!(
            assemble(&["A", "B"]),
            "\n## Page 1\n\nA\n\n---\n\n## Page 2\n\nB\n\n---\n"
        );
    }

    #[test]
    fn no_pages() {
        let pages: [&str; 0] = [];
        assert_eq!(assemble(&pages), "");
    }

    #[test]
    fn empty_page_keeps_its_frame() {
        assert_eq!(assemble(&[String::new()]), "\n## Page 1\n\n\n\n---\n");
    }

    #[test]
    fn page_content_is_verbatim() {
        let page = "# Title\n\n| a | b |\n|---|---|\n";
        let out = assemble(&[page]);
        assert_eq!(out, format!("\n## Page 1\n\n{page}\n\n---\n"));
    }

    #[test]
    fn numbering_is_one_based_and_ordered() {
        let pages: Vec<String> = (0..12).map(|i| format!("p{i}")).collect();
        let out = assemble(&pages);
        let headings: Vec<&str> = out.lines().filter(|l| l.starts_with("## Page")).collect();
        assert_eq!(headings.len(), 12);
        assert_eq!(headings[0], "## Page 1");
        assert_eq!(headings[11], "## Page 12");
        assert!(out.find("p9").unwrap() < out.find("p10").unwrap());
    }
}
