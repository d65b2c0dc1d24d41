//! Normalization of raw extracted text before chunking.
//!
//! Upstream extraction (PDF or otherwise) hands over text full of layout
//! artifacts: mixed line endings, soft hyphens, words broken across lines,
//! and runs of blank lines. [`normalize`] flattens all of that into
//! paragraphs separated by exactly one blank line, with sentences rejoined
//! onto single lines so the chunker sees prose rather than layout.

use std::sync::LazyLock;

use regex::Regex;

static HYPHEN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z])-\n([A-Za-z])").expect("valid hyphen-break pattern"));
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank-run pattern"));
static TAB_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\x0C\x0B]+").expect("valid tab-run pattern"));
static SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid space-run pattern"));

/// Normalizes raw document text. Total: any input, including the empty
/// string, yields a (possibly empty) string.
///
/// Steps, in order:
///
/// 1. strip a leading byte-order mark;
/// 2. normalize `\r\n` / `\r` to `\n`;
/// 3. remove soft hyphens (U+00AD);
/// 4. rejoin words hyphen-broken across a line break (`word-\nword`);
/// 5. collapse runs of three or more newlines to a single blank line;
/// 6. turn single line breaks (layout wrapping, not paragraph separators)
///    into plain spaces;
/// 7. collapse tab/form-feed/vertical-tab runs, then space runs, to one
///    space;
/// 8. trim leading and trailing whitespace.
pub fn normalize(raw: &str) -> String {
    let text = raw.strip_prefix('\u{FEFF}').unwrap_or(raw);
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = text.replace('\u{00AD}', "");
    let text = HYPHEN_BREAK.replace_all(&text, "$1$2");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    let text = rejoin_wrapped_lines(&text);
    let text = TAB_RUNS.replace_all(&text, " ");
    let text = SPACE_RUNS.replace_all(&text, " ");
    text.trim().to_string()
}

/// Replaces a `\n` with a space when it is neither preceded nor followed by
/// another `\n`, so text wrapped only for layout reads as one line while
/// blank-line paragraph separators survive.
fn rejoin_wrapped_lines(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        if c == '\n' {
            let prev_is_newline = i == 0 || bytes[i - 1] == b'\n';
            let next_is_newline = bytes.get(i + 1) == Some(&b'\n');
            if !prev_is_newline && !next_is_newline {
                out.push(' ');
                continue;
            }
        }
        out.push(c);
    }
    out
}
