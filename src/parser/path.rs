//! Path handling shared by all three patch dialects: quoted/octal-escaped
//! path decoding, strip-count application, and header path extraction.

/// Decode a patch-internal path. Git (and some unified diffs) quote paths
/// containing unusual bytes as a C string with octal escapes, e.g.
/// `"\327\251\327\234"`. Unquoted paths are returned unchanged.
pub fn decode_path(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() < 2 || !raw.starts_with('"') || !raw.ends_with('"') {
        return raw.to_string();
    }
    let inner = &raw[1..raw.len() - 1];
    let bytes = inner.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let octal = std::str::from_utf8(&bytes[i + 1..i + 4]).unwrap();
            let value = u8::from_str_radix(octal, 8).unwrap_or(b'?');
            out.push(value);
            i += 4;
        } else if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let escaped = match bytes[i + 1] {
                b'"' => b'"',
                b'\\' => b'\\',
                b'n' => b'\n',
                b't' => b'\t',
                other => other,
            };
            out.push(escaped);
            i += 2;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Strip a leading `a/` or `b/` component, as git diffs always prefix paths
/// this way regardless of the `--strip` setting used for traditional diffs.
pub fn strip_git_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

/// Strip `count` leading path components. `count = None` means "strip all
/// but the basename", the traditional-diff default.
pub fn strip_components(path: &str, count: Option<usize>) -> String {
    if path == crate::models::DEV_NULL {
        return path.to_string();
    }
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match count {
        None => parts.last().copied().unwrap_or(path).to_string(),
        Some(n) => {
            if n >= parts.len() {
                parts.last().copied().unwrap_or(path).to_string()
            } else {
                parts[n..].join("/")
            }
        }
    }
}

/// Split a traditional `--- path<TAB>timestamp` (or bare `--- path`) header
/// line into just the path, stripping the dialect's marker and decoding any
/// quoting. Accepts the full header line, e.g. `"--- a/foo\t2022-..."`.
pub fn header_path(line: &str) -> String {
    let without_marker = line
        .strip_prefix("--- ")
        .or_else(|| line.strip_prefix("+++ "))
        .or_else(|| line.strip_prefix("*** "))
        .unwrap_or(line);
    let path_part = without_marker.split('\t').next().unwrap_or(without_marker).trim();
    decode_path(path_part)
}

/// Strip only the dialect marker (`--- `/`+++ `/`*** `) from a header line, leaving everything
/// else — path, tab, timestamp — untouched. [`header_timestamp_suffix`] later pulls just the
/// timestamp back out of this for reject-file reproduction.
pub fn header_raw(line: &str) -> String {
    line.strip_prefix("--- ")
        .or_else(|| line.strip_prefix("+++ "))
        .or_else(|| line.strip_prefix("*** "))
        .unwrap_or(line)
        .to_string()
}

/// The tab-separated timestamp field of a raw header (including the leading tab), or an empty
/// string if the header carried no timestamp. A `.rej` file reproduces this verbatim alongside
/// the *resolved* (stripped) path — the path portion of a raw header is never reproduced as-is,
/// since it may still carry a git-style `a/`/`b/` prefix the target resolution already stripped.
pub fn header_timestamp_suffix(raw_header: &str) -> &str {
    match raw_header.find('\t') {
        Some(idx) => &raw_header[idx..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_plain_path() {
        assert_eq!(decode_path("src/main.rs"), "src/main.rs");
    }

    #[test]
    fn decode_octal_escaped_path() {
        // "\150\151" -> "hi"
        assert_eq!(decode_path("\"\\150\\151\""), "hi");
    }

    #[test]
    fn strip_git_prefixes() {
        assert_eq!(strip_git_prefix("a/src/main.rs"), "src/main.rs");
        assert_eq!(strip_git_prefix("b/src/main.rs"), "src/main.rs");
        assert_eq!(strip_git_prefix("src/main.rs"), "src/main.rs");
    }

    #[test]
    fn strip_components_basename_default() {
        assert_eq!(strip_components("a/b/c.txt", None), "c.txt");
    }

    #[test]
    fn strip_components_explicit_count() {
        assert_eq!(strip_components("a/b/c.txt", Some(1)), "b/c.txt");
        assert_eq!(strip_components("a/b/c.txt", Some(0)), "a/b/c.txt");
    }

    #[test]
    fn header_path_strips_timestamp() {
        assert_eq!(
            header_path("to_patch\t2022-07-30 11:40:37.280248088 +1200"),
            "to_patch"
        );
    }

    #[test]
    fn dev_null_never_stripped() {
        assert_eq!(strip_components("/dev/null", None), "/dev/null");
    }

    #[test]
    fn header_raw_keeps_timestamp() {
        assert_eq!(
            header_raw("--- to_patch\t2022-07-30 11:40:37.280248088 +1200"),
            "to_patch\t2022-07-30 11:40:37.280248088 +1200"
        );
    }

    #[test]
    fn header_timestamp_suffix_extracts_tab_and_beyond() {
        assert_eq!(
            header_timestamp_suffix("a/reject\t2022-07-30 11:40:37.280248088 +1200"),
            "\t2022-07-30 11:40:37.280248088 +1200"
        );
    }

    #[test]
    fn header_timestamp_suffix_empty_when_no_timestamp() {
        assert_eq!(header_timestamp_suffix("a/reject"), "");
    }
}
