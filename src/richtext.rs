//! Plain-text extraction from stored note content.
//!
//! Note bodies are stored as RTF by the desktop editor, but older files and
//! hand-edited ones may carry XAML flow-document markup or bare text. The
//! extractor recognises all three and is only used for list previews and
//! search, so it never has to be lossless.

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RichTextError {
    #[error("unbalanced group braces in rtf content")]
    UnbalancedGroups,
    #[error("malformed escape in rtf content")]
    BadEscape,
    #[error("unterminated markup tag")]
    UnterminatedTag,
}

/// Returns the visible text of `content`, paragraphs separated by `\n`.
pub fn plain_text(content: &str) -> Result<String, RichTextError> {
    let trimmed = content.trim_start();
    if trimmed.starts_with("{\\rtf") {
        rtf_text(trimmed)
    } else if trimmed.starts_with('<') {
        markup_text(trimmed)
    } else {
        Ok(content.to_string())
    }
}

/// Single-line preview: whitespace runs collapsed, empty on any failure.
pub fn preview(content: &str) -> String {
    match plain_text(content) {
        Ok(text) => text.split_whitespace().collect::<Vec<_>>().join(" "),
        Err(err) => {
            tracing::debug!(error = %err, "preview extraction failed");
            String::new()
        }
    }
}

// Destinations whose contents are metadata, not document text.
const SKIPPED_DESTINATIONS: [&str; 8] = [
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "generator",
];

fn rtf_text(src: &str) -> Result<String, RichTextError> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len() / 2);
    // Depth at which skipping started, if inside an ignored destination.
    let mut skip_from: Option<usize> = None;
    let mut depth = 0usize;
    let mut pending_skip = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '{' => {
                depth += 1;
                i += 1;
            }
            '}' => {
                if depth == 0 {
                    return Err(RichTextError::UnbalancedGroups);
                }
                if skip_from == Some(depth) {
                    skip_from = None;
                }
                depth -= 1;
                i += 1;
            }
            '\\' => {
                let next = *chars.get(i + 1).ok_or(RichTextError::BadEscape)?;
                if next.is_ascii_alphabetic() {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && chars[end].is_ascii_alphabetic() {
                        end += 1;
                    }
                    let word: String = chars[start..end].iter().collect();
                    let num_start = end;
                    if end < chars.len() && chars[end] == '-' {
                        end += 1;
                    }
                    while end < chars.len() && chars[end].is_ascii_digit() {
                        end += 1;
                    }
                    let param: Option<i32> = chars[num_start..end]
                        .iter()
                        .collect::<String>()
                        .parse()
                        .ok();
                    if end < chars.len() && chars[end] == ' ' {
                        end += 1;
                    }
                    i = end;

                    if skip_from.is_some() {
                        continue;
                    }
                    if SKIPPED_DESTINATIONS.contains(&word.as_str()) {
                        skip_from = Some(depth);
                        continue;
                    }
                    match word.as_str() {
                        "par" | "line" => out.push('\n'),
                        "tab" => out.push('\t'),
                        "u" => {
                            if let Some(code) = param {
                                let code = if code < 0 { code + 65536 } else { code };
                                if let Some(c) = char::from_u32(code as u32) {
                                    out.push(c);
                                }
                                // \uN is followed by a one-character ANSI fallback.
                                pending_skip = 1;
                            }
                        }
                        _ => {}
                    }
                } else if next == '\'' {
                    let hex: String = chars
                        .get(i + 2..i + 4)
                        .ok_or(RichTextError::BadEscape)?
                        .iter()
                        .collect();
                    let byte = u8::from_str_radix(&hex, 16).map_err(|_| RichTextError::BadEscape)?;
                    i += 4;
                    if pending_skip > 0 {
                        pending_skip -= 1;
                    } else if skip_from.is_none() {
                        // Windows-1252 and Latin-1 agree on the printable range.
                        out.push(byte as char);
                    }
                } else if next == '*' {
                    if skip_from.is_none() {
                        skip_from = Some(depth);
                    }
                    i += 2;
                } else {
                    if skip_from.is_none() && matches!(next, '\\' | '{' | '}') {
                        out.push(next);
                    } else if skip_from.is_none() && next == '~' {
                        out.push(' ');
                    }
                    i += 2;
                }
            }
            '\r' | '\n' => i += 1,
            _ => {
                if pending_skip > 0 {
                    pending_skip -= 1;
                } else if skip_from.is_none() && depth > 0 {
                    out.push(ch);
                }
                i += 1;
            }
        }
    }

    if depth != 0 {
        return Err(RichTextError::UnbalancedGroups);
    }
    Ok(out.trim_end_matches('\n').to_string())
}

fn markup_text(src: &str) -> Result<String, RichTextError> {
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(open) = rest.find('<') {
        out.push_str(&decode_entities(&rest[..open]));
        let close = rest[open..]
            .find('>')
            .ok_or(RichTextError::UnterminatedTag)?;
        let tag = &rest[open + 1..open + close];
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        if tag.starts_with('/') && matches!(name, "Paragraph" | "p" | "div") {
            out.push('\n');
        } else if matches!(name, "LineBreak" | "br") {
            out.push('\n');
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(&decode_entities(rest));
    Ok(out.trim_end_matches('\n').to_string())
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_content_passes_through() {
        assert_eq!(plain_text("buy milk").unwrap(), "buy milk");
    }

    #[test]
    fn rtf_drops_control_words_and_tables() {
        let rtf = r"{\rtf1\ansi\deff0{\fonttbl{\f0 Segoe UI;}}{\colortbl;\red0\green0\blue0;}\f0\fs24 Hello \b world\b0\par Second line\par}";
        assert_eq!(plain_text(rtf).unwrap(), "Hello world\nSecond line");
    }

    #[test]
    fn rtf_decodes_escapes() {
        let rtf = r"{\rtf1 caf\'e9 \u8364? \{x\}}";
        assert_eq!(plain_text(rtf).unwrap(), "café € {x}");
    }

    #[test]
    fn rtf_skips_starred_destinations() {
        let rtf = r"{\rtf1{\*\generator Riched20;}kept}";
        assert_eq!(plain_text(rtf).unwrap(), "kept");
    }

    #[test]
    fn unbalanced_rtf_is_an_error() {
        assert_eq!(
            plain_text(r"{\rtf1 open"),
            Err(RichTextError::UnbalancedGroups)
        );
        assert_eq!(preview(r"{\rtf1 open"), "");
    }

    #[test]
    fn markup_paragraphs_become_lines() {
        let xaml = r#"<FlowDocument><Paragraph>Tom &amp; Jerry</Paragraph><Paragraph>Second<LineBreak/>third</Paragraph></FlowDocument>"#;
        assert_eq!(plain_text(xaml).unwrap(), "Tom & Jerry\nSecond\nthird");
    }

    #[test]
    fn unterminated_markup_yields_empty_preview() {
        assert_eq!(preview("<Paragraph>oops<Run"), "");
    }

    #[test]
    fn preview_collapses_whitespace() {
        let rtf = r"{\rtf1 one\par   two\tab three}";
        assert_eq!(preview(rtf), "one two three");
    }
}
