//! Raw-text safety net.
//!
//! When tree-based folding finds nothing in a scope, or the front-end failed,
//! quoted strings and heredoc bodies are pulled out of the raw source with
//! regular expressions. Interpolated variables become holes.

use crate::eval::{Template, unescape_double, unescape_single};
use regex::Regex;

/// Compiled patterns shared by every file of a run.
#[derive(Debug)]
pub struct Patterns {
    /// Single-quoted string, double-quoted string, or a heredoc/nowdoc opening line.
    literal: Regex,
    /// Variable interpolation inside a double-quoted string or heredoc.
    interpolation: Regex,
    /// Hole sentinel in rendered SQL.
    pub hole: Regex,
}

/// A string literal recovered from raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawString {
    pub template: Template,
    /// Byte offset of the literal within the scanned text.
    pub offset: usize,
}

impl Patterns {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            literal: Regex::new(
                r#"(?s)'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|<<<[ \t]*(['"]?)([A-Za-z_][A-Za-z0-9_]*)['"]?\r?\n"#,
            )?,
            interpolation: Regex::new(
                r"\{\$[^}]*\}|\$[A-Za-z_][A-Za-z0-9_]*(?:->[A-Za-z_][A-Za-z0-9_]*|\[[^\]]*\])?",
            )?,
            hole: Regex::new(r"__crudmap_hole_(\d+)__")?,
        })
    }

    /// Every string literal in `text`, in order.
    pub fn scan(&self, text: &str) -> Vec<RawString> {
        let mut found = Vec::new();
        let mut pos = 0;
        while pos < text.len() {
            let Some(caps) = self.literal.captures_at(text, pos) else {
                break;
            };
            let Some(whole) = caps.get(0) else {
                break;
            };
            let matched = whole.as_str();

            if let Some(marker) = caps.get(2) {
                let nowdoc = caps.get(1).is_some_and(|q| q.as_str() == "'");
                let body_start = whole.end();
                match closing_marker(text, body_start, marker.as_str()) {
                    Some((body_end, after)) => {
                        let body = text[body_start..body_end].trim_end_matches(['\r', '\n']);
                        let template = if nowdoc {
                            Template::text(body)
                        } else {
                            self.interpolate(body)
                        };
                        found.push(RawString {
                            template,
                            offset: whole.start(),
                        });
                        pos = after;
                    }
                    None => pos = whole.end(),
                }
                continue;
            }

            let inner = &matched[1..matched.len() - 1];
            let template = if matched.starts_with('\'') {
                Template::text(unescape_single(inner))
            } else {
                self.interpolate(inner)
            };
            found.push(RawString {
                template,
                offset: whole.start(),
            });
            pos = whole.end();
        }
        found
    }

    /// Split a double-quoted body into literal text and interpolation holes.
    fn interpolate(&self, body: &str) -> Template {
        let mut template = Template::new();
        let mut pos = 0;
        for m in self.interpolation.find_iter(body) {
            // `\$name` is a literal dollar sign.
            if m.start() > 0 && body.as_bytes()[m.start() - 1] == b'\\' {
                continue;
            }
            template.push_text(&unescape_double(&body[pos..m.start()]));
            template.push_hole(m.as_str());
            pos = m.end();
        }
        template.push_text(&unescape_double(&body[pos..]));
        template
    }
}

/// Find the line that closes a heredoc: optional indentation, the marker, then a non-word byte.
/// Returns (end of body, position after the marker).
fn closing_marker(text: &str, from: usize, marker: &str) -> Option<(usize, usize)> {
    let mut line_start = from;
    loop {
        let line_end = text[line_start..]
            .find('\n')
            .map_or(text.len(), |n| line_start + n);
        let line = &text[line_start..line_end];
        let trimmed = line.trim_start_matches([' ', '\t']);
        if let Some(rest) = trimmed.strip_prefix(marker)
            && !rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
        {
            let after = line_start + (line.len() - trimmed.len()) + marker.len();
            return Some((line_start, after));
        }
        if line_end >= text.len() {
            return None;
        }
        line_start = line_end + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folded(raw: &[RawString]) -> Vec<Option<String>> {
        raw.iter().map(|r| r.template.fold()).collect()
    }

    #[test]
    fn test_scan_quoted_strings() {
        let p = Patterns::new().unwrap();
        let raw = p.scan(r#"$a = 'SELECT * FROM it\'s'; $b = "DELETE FROM t";"#);
        assert_eq!(
            folded(&raw),
            vec![
                Some("SELECT * FROM it's".to_string()),
                Some("DELETE FROM t".to_string())
            ]
        );
        assert_eq!(raw[0].offset, 5);
    }

    #[test]
    fn test_interpolation_becomes_hole() {
        let p = Patterns::new().unwrap();
        let raw = p.scan(r#"query("SELECT * FROM {$table} WHERE id = $id AND p = \$x");"#);
        assert_eq!(raw.len(), 1);
        let t = &raw[0].template;
        assert_eq!(t.leading_text(), "SELECT * FROM ");
        assert_eq!(t.holes(), vec!["{$table}", "$id"]);
        assert_eq!(t.trailing_text(), " AND p = $x");
    }

    #[test]
    fn test_heredoc_and_nowdoc_bodies() {
        let p = Patterns::new().unwrap();
        let text = "$q = <<<SQL\nUPDATE $t SET a = 1\n  SQL;\n$r = <<<'EOT'\nSELECT $x FROM y\nEOT;\n";
        let raw = p.scan(text);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].template.leading_text(), "UPDATE ");
        assert_eq!(raw[1].template.fold().as_deref(), Some("SELECT $x FROM y"));
    }

    #[test]
    fn test_unterminated_heredoc_is_skipped() {
        let p = Patterns::new().unwrap();
        let raw = p.scan("<<<SQL\nSELECT 1\n");
        assert!(raw.is_empty());
    }
}
