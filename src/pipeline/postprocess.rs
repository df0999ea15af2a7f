//! Post-processing: deterministic cleanup of VLM-generated Markdown.
//!
//! Even well-prompted VLMs occasionally wrap their answer in a
//! ` ```markdown ` fence, emit `\r\n` line endings, or leak zero-width
//! characters copied from the source PDF. The passes here fix those quirks
//! without touching content: no heading, table or link is rewritten.
//!
//! The result never begins or ends with blank lines, because the assembler
//! adds its own spacing around every page.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup passes to the raw VLM output of one page.
///
/// Passes (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF / CR → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens …)
/// 6. Drop leading and trailing blank lines
pub fn clean_markdown(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    trim_blank_edges(&s).to_string()
}

// ── Pass 1: Strip outer markdown fences ─────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\r?\n(.*?)\r?\n```$")
        .expect("valid fence regex")
});

fn strip_markdown_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        // A fence inside the captured body means the "outer" fence is really
        // the first of several code blocks.
        Some(caps) if !caps[1].contains("\n```") => caps[1].to_string(),
        _ => input.to_string(),
    }
}

// ── Pass 2: Normalise line endings ──────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Pass 3: Trim trailing whitespace per line ───────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Pass 4: Collapse excessive blank lines ──────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{4,}").expect("valid blank-line regex"));

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").into_owned()
}

// ── Pass 5: Remove invisible Unicode characters ─────────────────────────────

const INVISIBLE_CHARS: [char; 6] = [
    '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
];

fn remove_invisible_chars(input: &str) -> String {
    input.replace(INVISIBLE_CHARS, "")
}

// ── Pass 6: Drop blank lines at either end ──────────────────────────────────

fn trim_blank_edges(input: &str) -> &str {
    input.trim_start_matches('\n').trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fence() {
        let input = "```markdown\n# Hello\nWorld\n```";
        assert_eq!(strip_markdown_fences(input), "# Hello\nWorld");
    }

    #[test]
    fn strips_bare_fence() {
        let input = "```\n# Hello\nWorld\n```\n";
        assert_eq!(strip_markdown_fences(input), "# Hello\nWorld");
    }

    #[test]
    fn keeps_separate_code_blocks() {
        let input = "```\nfn a() {}\n```\n\ntext\n\n```\nfn b() {}\n```";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn unfenced_passthrough() {
        assert_eq!(strip_markdown_fences("# Hello\nWorld"), "# Hello\nWorld");
    }

    #[test]
    fn line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn trailing_whitespace_keeps_indentation() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  \n"),
            "  hello\nworld\n"
        );
    }

    #[test]
    fn blank_runs_collapse_to_two() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn invisible_chars_removed() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn empty_page_stays_empty() {
        assert_eq!(clean_markdown(""), "");
        assert_eq!(clean_markdown("\n\n  \n"), "");
    }

    #[test]
    fn full_pipeline() {
        let input = "```markdown\r\n# Title\r\n\r\nSome text   \n\n\n\n\n\n| A | B |\n| 1 | 2 |\r\n```";
        let result = clean_markdown(input);
        assert_eq!(result, "# Title\n\nSome text\n\n\n| A | B |\n| 1 | 2 |");
    }
}
