//! Reader and writer for the `.properties` key-value text format.
//!
//! This covers the subset of `java.util.Properties` syntax that Gradle build
//! scripts see in practice: `#`/`!` comments, `=`, `:` or whitespace
//! separators, backslash line continuations and backslash escapes
//! (including `\uXXXX`). Later duplicate keys override earlier ones.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{KeypropError, Result};

/// A parse failure, positioned at the line where the offending entry starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// A flat, ordered string-to-string map read from properties text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses properties text.
    pub fn parse(content: &str) -> std::result::Result<Self, ParseError> {
        let mut entries = BTreeMap::new();

        for logical in logical_lines(content) {
            let (raw_key, raw_value) = split_entry(&logical.text);
            let key = unescape(raw_key).map_err(|message| ParseError {
                line: logical.line,
                message,
            })?;
            let value = unescape(raw_value).map_err(|message| ParseError {
                line: logical.line,
                message,
            })?;
            entries.insert(key, value);
        }

        Ok(Self { entries })
    }

    /// Loads a properties file.
    ///
    /// Returns `Ok(None)` if nothing exists at `path`. Any other failure to
    /// read or decode the file is an error: a file that exists but cannot be
    /// used points at a broken environment, not at absent configuration.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(KeypropError::ConfigFileUnreadable {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let content =
            String::from_utf8(bytes).map_err(|e| KeypropError::ConfigFileUnreadable {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })?;

        let properties =
            Self::parse(&content).map_err(|e| KeypropError::MalformedProperties {
                path: path.to_path_buf(),
                line: e.line,
                message: e.message,
            })?;

        tracing::debug!(
            "Loaded {} properties from {}",
            properties.len(),
            path.display()
        );

        Ok(Some(properties))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get), but treats an empty value as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the entries as properties text, one `key=value` per line.
    ///
    /// Non-ASCII characters are written as `\uXXXX` so the output also loads
    /// correctly through readers that assume ISO-8859-1.
    pub fn to_properties_string(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(&escape(key, true));
            out.push('=');
            out.push_str(&escape(value, false));
            out.push('\n');
        }
        out
    }
}

impl FromIterator<(String, String)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

struct LogicalLine {
    line: usize,
    text: String,
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// Splits text on `\n`, `\r\n` and `\r`.
fn physical_lines(content: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        match rest.find(['\n', '\r']) {
            Some(idx) => {
                lines.push(&rest[..idx]);
                let skip = if rest[idx..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[idx + skip..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

fn ends_with_continuation(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|&c| c == '\\').count();
    trailing % 2 == 1
}

/// Joins continuation lines and drops blanks and comments.
fn logical_lines(content: &str) -> Vec<LogicalLine> {
    let mut result = Vec::new();
    let mut current: Option<LogicalLine> = None;

    for (idx, raw) in physical_lines(content).into_iter().enumerate() {
        let trimmed = raw.trim_start_matches(is_blank);

        let mut entry = match current.take() {
            Some(entry) => entry,
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                LogicalLine {
                    line: idx + 1,
                    text: String::new(),
                }
            }
        };

        if ends_with_continuation(trimmed) {
            entry.text.push_str(&trimmed[..trimmed.len() - 1]);
            current = Some(entry);
        } else {
            entry.text.push_str(trimmed);
            result.push(entry);
        }
    }

    // A continuation on the last line simply ends the entry.
    if let Some(entry) = current {
        result.push(entry);
    }

    result
}

/// Splits a logical line into its raw (still escaped) key and value.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    let mut separator = None;

    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = idx;
                separator = Some(c);
                break;
            }
            c if is_blank(c) => {
                key_end = idx;
                separator = Some(c);
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = match separator {
        Some(sep) => &line[key_end + sep.len_utf8()..],
        None => "",
    };

    rest = rest.trim_start_matches(is_blank);
    if separator.is_some_and(is_blank) {
        if let Some(stripped) = rest.strip_prefix(['=', ':']) {
            rest = stripped.trim_start_matches(is_blank);
        }
    }

    (key, rest)
}

fn unescape(raw: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let unit = read_code_unit(&mut chars)?;
                if (0xD800..0xDC00).contains(&unit) {
                    let low = match (chars.next(), chars.next()) {
                        (Some('\\'), Some('u')) => read_code_unit(&mut chars)?,
                        _ => return Err(format!("unpaired surrogate \\u{:04X}", unit)),
                    };
                    let decoded = char::decode_utf16([unit, low])
                        .next()
                        .and_then(|r| r.ok())
                        .ok_or_else(|| format!("unpaired surrogate \\u{:04X}", unit))?;
                    out.push(decoded);
                } else {
                    let decoded = char::from_u32(u32::from(unit))
                        .ok_or_else(|| format!("unpaired surrogate \\u{:04X}", unit))?;
                    out.push(decoded);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

fn read_code_unit(chars: &mut std::str::Chars<'_>) -> std::result::Result<u16, String> {
    let digits: String = chars.by_ref().take(4).collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("malformed \\uxxxx encoding: \\u{}", digits));
    }
    u16::from_str_radix(&digits, 16).map_err(|e| e.to_string())
}

fn escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());

    for (idx, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            ' ' if is_key || idx == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            c if (' '..='~').contains(&c) => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04X}", unit));
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value_pairs() {
        let props = Properties::parse("keyAlias=upload\nstorePassword=secret\n").unwrap();
        assert_eq!(props.get("keyAlias"), Some("upload"));
        assert_eq!(props.get("storePassword"), Some("secret"));
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let content = "# signing\n! legacy comment\n\n   \nkeyAlias=upload\n";
        let props = Properties::parse(content).unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("keyAlias"), Some("upload"));
    }

    #[test]
    fn test_parse_alternate_separators() {
        let content = "a:1\nb 2\nc = 3\nd\t:\t4\ne\n";
        let props = Properties::parse(content).unwrap();
        assert_eq!(props.get("a"), Some("1"));
        assert_eq!(props.get("b"), Some("2"));
        assert_eq!(props.get("c"), Some("3"));
        assert_eq!(props.get("d"), Some("4"));
        assert_eq!(props.get("e"), Some(""));
    }

    #[test]
    fn test_parse_value_keeps_inner_separators() {
        let props = Properties::parse("url=https://example.com/a=b\n").unwrap();
        assert_eq!(props.get("url"), Some("https://example.com/a=b"));
    }

    #[test]
    fn test_parse_line_continuation() {
        let content = "storeFile=/very/long/\\\n    path/release.jks\nnext=1\n";
        let props = Properties::parse(content).unwrap();
        assert_eq!(props.get("storeFile"), Some("/very/long/path/release.jks"));
        assert_eq!(props.get("next"), Some("1"));
    }

    #[test]
    fn test_parse_even_backslashes_do_not_continue() {
        let props = Properties::parse("dir=C:\\\\\nnext=1\n").unwrap();
        assert_eq!(props.get("dir"), Some("C:\\"));
        assert_eq!(props.get("next"), Some("1"));
    }

    #[test]
    fn test_parse_crlf_and_cr_line_endings() {
        let props = Properties::parse("a=1\r\nb=2\rc=3").unwrap();
        assert_eq!(props.get("a"), Some("1"));
        assert_eq!(props.get("b"), Some("2"));
        assert_eq!(props.get("c"), Some("3"));
    }

    #[test]
    fn test_parse_escapes() {
        let content = "tab=a\\tb\nkey\\ with\\ spaces=v\nunicode=caf\\u00e9\nplain=\\q\n";
        let props = Properties::parse(content).unwrap();
        assert_eq!(props.get("tab"), Some("a\tb"));
        assert_eq!(props.get("key with spaces"), Some("v"));
        assert_eq!(props.get("unicode"), Some("café"));
        assert_eq!(props.get("plain"), Some("q"));
    }

    #[test]
    fn test_parse_surrogate_pair() {
        let props = Properties::parse("emoji=\\uD83D\\uDE00\n").unwrap();
        assert_eq!(props.get("emoji"), Some("😀"));
    }

    #[test]
    fn test_parse_malformed_unicode_escape() {
        let err = Properties::parse("ok=1\nbad=\\u12G4\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("malformed"));
    }

    #[test]
    fn test_parse_duplicate_key_last_wins() {
        let props = Properties::parse("keyAlias=first\nkeyAlias=second\n").unwrap();
        assert_eq!(props.get("keyAlias"), Some("second"));
    }

    #[test]
    fn test_get_non_empty() {
        let props = Properties::parse("empty=\nfull=x\n").unwrap();
        assert_eq!(props.get("empty"), Some(""));
        assert_eq!(props.get_non_empty("empty"), None);
        assert_eq!(props.get_non_empty("full"), Some("x"));
        assert_eq!(props.get_non_empty("missing"), None);
    }

    #[test]
    fn test_written_text_parses_back() {
        let mut props = Properties::new();
        props.insert("storeFile", "C:\\keys\\release.jks");
        props.insert("storePassword", " p@ss=word:#1");
        props.insert("key alias", "名前");

        let text = props.to_properties_string();
        assert!(text.contains("storeFile=C\\:\\\\keys\\\\release.jks"));
        assert!(text.contains("key\\ alias=\\u540D\\u524D"));
        assert_eq!(Properties::parse(&text).unwrap(), props);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Properties::load(&dir.path().join("key.properties")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_invalid_utf8_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.properties");
        std::fs::write(&path, [b'k', b'=', 0xFF, 0xFE]).unwrap();

        let err = Properties::load(&path).unwrap_err();
        assert!(matches!(err, KeypropError::ConfigFileUnreadable { .. }));
    }

    #[test]
    fn test_load_directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = Properties::load(dir.path()).unwrap_err();
        assert!(matches!(err, KeypropError::ConfigFileUnreadable { .. }));
    }

    #[test]
    fn test_load_malformed_reports_path_and_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.properties");
        std::fs::write(&path, "a=1\n\nb=\\uZZZZ\n").unwrap();

        match Properties::load(&path).unwrap_err() {
            KeypropError::MalformedProperties { path: p, line, .. } => {
                assert_eq!(p, path);
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
