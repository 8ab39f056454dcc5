// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// A base name used when the active document has no title.
pub const DEFAULT_BASE_NAME: &str = "diagram";

const HASH_LEN: usize = 8;

/// Returns a deterministic 8 characters long base-36 hash of a string.
///
/// A 32-bit rolling hash over UTF-16 code units: `hash = hash * 31 + unit`
/// with a two's complement wraparound.
pub fn content_hash(content: &str) -> String {
    let mut hash: i32 = 0;
    for unit in content.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(unit as i32);
    }

    // `i32::MIN` has no positive counterpart in `i32`.
    let n = (hash as i64).unsigned_abs();

    let mut digits = to_base36(n);
    digits.truncate(HASH_LEN);
    format!("{:0>width$}", digits, width = HASH_LEN)
}

fn to_base36(mut n: u64) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if n == 0 {
        return "0".to_string();
    }

    let mut buf = Vec::new();
    while n > 0 {
        buf.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();

    // Only ASCII digits and letters.
    String::from_utf8(buf).unwrap_or_default()
}

/// Returns a document title without a Markdown extension.
///
/// An absent or empty title becomes [`DEFAULT_BASE_NAME`].
pub fn base_name(title: Option<&str>) -> &str {
    let title = match title {
        Some(title) if !title.is_empty() => title,
        _ => return DEFAULT_BASE_NAME,
    };

    for ext in [".md", ".markdown"] {
        let split = match title.len().checked_sub(ext.len()) {
            Some(n) => n,
            None => continue,
        };

        if let Some(suffix) = title.get(split..) {
            if suffix.eq_ignore_ascii_case(ext) {
                return &title[..split];
            }
        }
    }

    title
}

/// Returns `mermaid-<base name>-<content hash>.png`.
///
/// The same title and content always produce the same name.
pub fn derive_filename(title: Option<&str>, content: &str) -> String {
    format!("mermaid-{}-{}.png", base_name(title), content_hash(content))
}
