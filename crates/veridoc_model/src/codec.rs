//! Line-oriented text codec for serialized items.
//!
//! The format is block-structured: an item header block, then one
//! `----field----` block per shared field, then one `----version----`
//! block per version, each followed by its own field blocks. Every field
//! value is length-prefixed (`content-length`, in bytes), so values may
//! contain newlines and even marker-lookalike text.
//!
//! ```text
//! ----item----
//! version: 1
//! id: {…}
//! database: master
//! path: /content/home
//! parent: {…}
//! name: Home
//! branch: {…}
//! template: {…}
//! templatekey: page
//!
//! ----field----
//! field: {…}
//! name: Title
//! key: title
//! content-length: 4
//!
//! Home
//!
//! ----version----
//! language: en
//! version: 1
//! revision: 7f3a…
//! ```
//!
//! Encoding emits versions in ascending (language, number) order, so
//! encoding is deterministic and round-trips with [`decode`].

use crate::error::{CodecError, CodecResult};
use crate::id::ItemId;
use crate::item::{SerializedItem, SyncField, SyncVersion};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

const ITEM_MARKER: &str = "----item----";
const FIELD_MARKER: &str = "----field----";
const VERSION_MARKER: &str = "----version----";
const FORMAT_VERSION: &str = "1";

/// Line width for Base64 blob transport.
const BLOB_LINE_WIDTH: usize = 76;

/// Encodes raw blob bytes as Base64 with inserted line breaks.
#[must_use]
pub fn encode_blob(bytes: &[u8]) -> String {
    let raw = STANDARD.encode(bytes);
    let mut out = String::with_capacity(raw.len() + raw.len() / BLOB_LINE_WIDTH + 1);
    let mut start = 0;
    while start < raw.len() {
        let end = usize::min(start + BLOB_LINE_WIDTH, raw.len());
        if start > 0 {
            out.push('\n');
        }
        out.push_str(&raw[start..end]);
        start = end;
    }
    out
}

/// Decodes a Base64 blob value back to raw bytes.
///
/// Whitespace (including the line breaks inserted on encode) is ignored.
pub fn decode_blob(text: &str) -> CodecResult<Vec<u8>> {
    let compact: String = text.split_whitespace().collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CodecError::InvalidBase64 {
            message: e.to_string(),
        })
}

/// Encodes a serialized item to its textual form.
#[must_use]
pub fn encode(item: &SerializedItem) -> String {
    let mut out = String::new();
    out.push_str(ITEM_MARKER);
    out.push('\n');
    push_kv(&mut out, "version", FORMAT_VERSION);
    push_kv(&mut out, "id", &item.id.to_string());
    push_kv(&mut out, "database", &item.database);
    push_kv(&mut out, "path", &item.item_path);
    push_kv(&mut out, "parent", &item.parent_id.to_string());
    push_kv(&mut out, "name", &item.name);
    push_kv(&mut out, "branch", &item.branch_id.to_string());
    push_kv(&mut out, "template", &item.template_id.to_string());
    push_kv(&mut out, "templatekey", &item.template_name);
    out.push('\n');

    for field in &item.shared_fields {
        encode_field(&mut out, field);
    }

    let mut versions: Vec<&SyncVersion> = item.versions.iter().collect();
    versions.sort_by(|a, b| {
        a.language
            .cmp(&b.language)
            .then_with(|| a.version.cmp(&b.version))
    });
    for version in versions {
        out.push_str(VERSION_MARKER);
        out.push('\n');
        push_kv(&mut out, "language", &version.language);
        push_kv(&mut out, "version", &version.version.to_string());
        push_kv(&mut out, "revision", &version.revision);
        out.push('\n');
        for field in &version.fields {
            encode_field(&mut out, field);
        }
    }
    out
}

/// Decodes a serialized item from its textual form.
///
/// Fails on the first malformed block; no partial item is returned.
pub fn decode(text: &str) -> CodecResult<SerializedItem> {
    let mut r = Reader::new(text);
    r.skip_blank_lines();
    expect_marker(&mut r, ITEM_MARKER)?;

    let block_line = r.line;
    let pairs = read_kv_block(&mut r)?;
    match get(&pairs, "version") {
        Some(found) if found.trim() == FORMAT_VERSION => {}
        Some(found) => {
            return Err(CodecError::UnsupportedFormatVersion {
                found: found.to_string(),
            })
        }
        None => {
            return Err(CodecError::MissingKey {
                key: "version",
                line: block_line,
            })
        }
    }

    let id = require_id(&pairs, "id", block_line)?;
    let parent_id = require_id(&pairs, "parent", block_line)?;
    let template_id = require_id(&pairs, "template", block_line)?;
    let database = require(&pairs, "database", block_line)?;
    let name = require(&pairs, "name", block_line)?;
    let branch_id = optional_id(&pairs, "branch")?;

    let mut item = SerializedItem::new(id, parent_id, database, name, template_id)
        .with_branch(branch_id)
        .with_template_name(get(&pairs, "templatekey").unwrap_or(""))
        .with_path(get(&pairs, "path").unwrap_or(""));

    // Field blocks before the first version block are shared fields.
    let mut current_version: Option<usize> = None;
    loop {
        r.skip_blank_lines();
        let Some(line) = r.peek_line() else { break };
        let line_no = r.line;
        match line.trim() {
            FIELD_MARKER => {
                r.read_line();
                let field = read_field(&mut r)?;
                match current_version {
                    Some(index) => item.versions[index].fields.push(field),
                    None => item.shared_fields.push(field),
                }
            }
            VERSION_MARKER => {
                r.read_line();
                let version_line = r.line;
                let pairs = read_kv_block(&mut r)?;
                let language = require(&pairs, "language", version_line)?;
                let number_text = require(&pairs, "version", version_line)?;
                let number: u32 =
                    number_text
                        .trim()
                        .parse()
                        .map_err(|_| CodecError::InvalidNumber {
                            value: number_text.to_string(),
                        })?;
                let revision = get(&pairs, "revision").unwrap_or("");
                item.versions
                    .push(SyncVersion::new(language, number, revision));
                current_version = Some(item.versions.len() - 1);
            }
            other => {
                return Err(CodecError::UnexpectedContent {
                    line: line_no,
                    content: other.to_string(),
                })
            }
        }
    }
    Ok(item)
}

fn push_kv(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push_str(": ");
    out.push_str(value);
    out.push('\n');
}

fn encode_field(out: &mut String, field: &SyncField) {
    out.push_str(FIELD_MARKER);
    out.push('\n');
    push_kv(out, "field", &field.field_id.to_string());
    push_kv(out, "name", &field.name);
    push_kv(out, "key", &field.key);
    push_kv(out, "content-length", &field.value.len().to_string());
    out.push('\n');
    out.push_str(&field.value);
    out.push('\n');
    out.push('\n');
}

/// Cursor over the input text, tracking byte position and line number.
struct Reader<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0, line: 1 }
    }

    fn eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek_line(&self) -> Option<&'a str> {
        if self.eof() {
            return None;
        }
        let rest = &self.text[self.pos..];
        Some(rest.split_once('\n').map_or(rest, |(line, _)| line))
    }

    fn read_line(&mut self) -> Option<&'a str> {
        if self.eof() {
            return None;
        }
        let rest = &self.text[self.pos..];
        self.line += 1;
        match rest.split_once('\n') {
            Some((line, _)) => {
                self.pos += line.len() + 1;
                Some(line)
            }
            None => {
                self.pos = self.text.len();
                Some(rest)
            }
        }
    }

    /// Takes exactly `n` bytes as a value slice.
    fn take_bytes(&mut self, n: usize, start_line: usize) -> CodecResult<&'a str> {
        let end = self.pos + n;
        if end > self.text.len() || !self.text.is_char_boundary(end) {
            return Err(CodecError::TruncatedValue {
                expected: n,
                line: start_line,
            });
        }
        let slice = &self.text[self.pos..end];
        self.line += slice.matches('\n').count();
        self.pos = end;
        Ok(slice)
    }

    fn skip_blank_lines(&mut self) {
        while matches!(self.peek_line(), Some(line) if line.trim().is_empty()) {
            self.read_line();
        }
    }
}

fn expect_marker(r: &mut Reader<'_>, marker: &'static str) -> CodecResult<()> {
    let line_no = r.line;
    match r.read_line() {
        Some(line) if line.trim() == marker => Ok(()),
        _ => Err(CodecError::MissingMarker {
            expected: marker,
            line: line_no,
        }),
    }
}

/// Reads `key: value` lines until a blank line, a marker, or end of input.
fn read_kv_block<'a>(r: &mut Reader<'a>) -> CodecResult<Vec<(&'a str, &'a str)>> {
    let mut pairs = Vec::new();
    loop {
        match r.peek_line() {
            None => break,
            Some(line) if line.trim().is_empty() => {
                r.read_line();
                break;
            }
            Some(line) if line.starts_with("----") => break,
            Some(line) => {
                let line_no = r.line;
                r.read_line();
                let Some((key, rest)) = line.split_once(':') else {
                    return Err(CodecError::InvalidLine {
                        line: line_no,
                        content: line.to_string(),
                    });
                };
                pairs.push((key.trim(), rest.strip_prefix(' ').unwrap_or(rest)));
            }
        }
    }
    Ok(pairs)
}

fn read_field(r: &mut Reader<'_>) -> CodecResult<SyncField> {
    let block_line = r.line;
    let pairs = read_kv_block(r)?;
    let field_id = require_id(&pairs, "field", block_line)?;
    let name = get(&pairs, "name").unwrap_or("").to_string();
    let key = get(&pairs, "key").unwrap_or("").to_string();
    let length_text = require(&pairs, "content-length", block_line)?;
    let length: usize = length_text
        .trim()
        .parse()
        .map_err(|_| CodecError::InvalidNumber {
            value: length_text.to_string(),
        })?;

    let value_line = r.line;
    let value = r.take_bytes(length, value_line)?.to_string();
    match r.read_line() {
        // The value must end exactly at a line boundary.
        Some(line) if !line.is_empty() => Err(CodecError::MissingTerminator { line: value_line }),
        _ => Ok(SyncField {
            field_id,
            name,
            key,
            value,
        }),
    }
}

fn get<'a>(pairs: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn require<'a>(
    pairs: &[(&'a str, &'a str)],
    key: &'static str,
    line: usize,
) -> CodecResult<&'a str> {
    get(pairs, key).ok_or(CodecError::MissingKey { key, line })
}

fn require_id(
    pairs: &[(&str, &str)],
    key: &'static str,
    line: usize,
) -> CodecResult<ItemId> {
    let value = require(pairs, key, line)?;
    ItemId::parse(value).ok_or_else(|| CodecError::InvalidId {
        key,
        value: value.to_string(),
    })
}

fn optional_id(pairs: &[(&str, &str)], key: &'static str) -> CodecResult<ItemId> {
    match get(pairs, key) {
        None => Ok(ItemId::nil()),
        Some(value) if value.trim().is_empty() => Ok(ItemId::nil()),
        Some(value) => ItemId::parse(value).ok_or_else(|| CodecError::InvalidId {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_item() -> SerializedItem {
        let mut item = SerializedItem::new(
            ItemId::from_bytes([1u8; 16]),
            ItemId::from_bytes([2u8; 16]),
            "master",
            "Home",
            ItemId::from_bytes([3u8; 16]),
        )
        .with_branch(ItemId::from_bytes([4u8; 16]))
        .with_template_name("page")
        .with_path("/content/home");
        item.add_shared_field(ItemId::from_bytes([5u8; 16]), "Title", "title", "Home");
        item.add_shared_field(ItemId::from_bytes([6u8; 16]), "Empty", "empty", "");
        let version = item.add_version("en", 1, "rev-1").unwrap();
        version.add_field(ItemId::from_bytes([7u8; 16]), "Body", "body", "hello\nworld");
        item
    }

    #[test]
    fn round_trip_basic() {
        let item = sample_item();
        let text = encode(&item);
        let decoded = decode(&text).unwrap();
        assert_eq!(decoded, item);
    }

    #[test]
    fn round_trip_marker_lookalike_value() {
        let mut item = sample_item();
        item.add_shared_field(
            ItemId::from_bytes([8u8; 16]),
            "Tricky",
            "tricky",
            "before\n----field----\nfield: fake\nafter",
        );
        let text = encode(&item);
        assert_eq!(decode(&text).unwrap(), item);
    }

    #[test]
    fn versions_encoded_in_ascending_order() {
        let mut item = sample_item();
        item.versions.clear();
        item.add_version("en", 2, "b");
        item.add_version("da", 1, "c");
        item.add_version("en", 1, "a");

        let decoded = decode(&encode(&item)).unwrap();
        let order: Vec<(String, u32)> = decoded
            .versions
            .iter()
            .map(|v| (v.language.clone(), v.version))
            .collect();
        assert_eq!(
            order,
            vec![
                ("da".to_string(), 1),
                ("en".to_string(), 1),
                ("en".to_string(), 2)
            ]
        );
    }

    #[test]
    fn missing_item_marker() {
        let err = decode("id: {00000000-0000-0000-0000-000000000000}\n").unwrap_err();
        assert!(matches!(err, CodecError::MissingMarker { .. }));
    }

    #[test]
    fn missing_required_key() {
        let text = format!(
            "{ITEM_MARKER}\nversion: 1\nid: {}\ndatabase: master\nname: Home\ntemplate: {}\n",
            ItemId::from_bytes([1u8; 16]),
            ItemId::from_bytes([2u8; 16]),
        );
        let err = decode(&text).unwrap_err();
        assert!(matches!(err, CodecError::MissingKey { key: "parent", .. }));
    }

    #[test]
    fn unsupported_format_version() {
        let text = format!("{ITEM_MARKER}\nversion: 9\n");
        let err = decode(&text).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnsupportedFormatVersion { .. }
        ));
    }

    #[test]
    fn truncated_value_fails() {
        let item = sample_item();
        let mut text = encode(&item);
        // Chop the tail off the last field value.
        text.truncate(text.len() - 10);
        let err = decode(&text).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TruncatedValue { .. } | CodecError::MissingTerminator { .. }
        ));
    }

    #[test]
    fn understated_length_fails() {
        let mut item = sample_item();
        item.shared_fields.truncate(1);
        item.versions.clear();
        let text = encode(&item).replace("content-length: 4", "content-length: 2");
        let err = decode(&text).unwrap_err();
        assert!(matches!(err, CodecError::MissingTerminator { .. }));
    }

    #[test]
    fn invalid_id_fails() {
        let text = format!("{ITEM_MARKER}\nversion: 1\nid: not-an-id\n");
        let err = decode(&text).unwrap_err();
        assert!(matches!(err, CodecError::InvalidId { key: "id", .. }));
    }

    #[test]
    fn unexpected_content_fails() {
        let mut text = encode(&sample_item());
        text.push_str("garbage line\n");
        let err = decode(&text).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedContent { .. }));
    }

    #[test]
    fn missing_branch_decodes_as_nil() {
        let item = sample_item();
        let text: String = encode(&item)
            .lines()
            .filter(|line| !line.starts_with("branch:"))
            .map(|line| format!("{line}\n"))
            .collect();
        let decoded = decode(&text).unwrap();
        assert!(decoded.branch_id.is_nil());
    }

    #[test]
    fn blob_line_breaks_every_76_chars() {
        let encoded = encode_blob(&[0xABu8; 120]);
        let lines: Vec<&str> = encoded.lines().collect();
        assert!(lines.len() > 1);
        assert!(lines[..lines.len() - 1].iter().all(|l| l.len() == 76));
        assert_eq!(decode_blob(&encoded).unwrap(), vec![0xABu8; 120]);
    }

    #[test]
    fn blob_empty_round_trip() {
        assert_eq!(encode_blob(&[]), "");
        assert_eq!(decode_blob("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn blob_rejects_invalid_base64() {
        assert!(matches!(
            decode_blob("!!! not base64 !!!"),
            Err(CodecError::InvalidBase64 { .. })
        ));
    }

    fn field_strategy() -> impl Strategy<Value = SyncField> {
        (
            any::<[u8; 16]>(),
            "[A-Za-z][A-Za-z0-9 ]{0,11}",
            "[ -~\n]{0,64}",
        )
            .prop_map(|(id, name, value)| {
                let key = name.to_lowercase();
                SyncField::new(ItemId::from_bytes(id), name, key, value)
            })
    }

    fn item_strategy() -> impl Strategy<Value = SerializedItem> {
        (
            any::<[u8; 16]>(),
            any::<[u8; 16]>(),
            any::<[u8; 16]>(),
            "[A-Za-z][A-Za-z0-9 ]{0,11}",
            proptest::collection::vec(field_strategy(), 0..4),
            proptest::collection::btree_set(("(da|de|en|ja)", 1u32..4), 0..4),
        )
            .prop_flat_map(|(id, parent, template, name, shared, keys)| {
                let count = keys.len();
                (
                    Just((id, parent, template, name, shared, keys)),
                    proptest::collection::vec(
                        proptest::collection::vec(field_strategy(), 0..3),
                        count,
                    ),
                )
            })
            .prop_map(
                |((id, parent, template, name, shared, keys), version_fields)| {
                    let mut item = SerializedItem::new(
                        ItemId::from_bytes(id),
                        ItemId::from_bytes(parent),
                        "master",
                        name,
                        ItemId::from_bytes(template),
                    );
                    item.shared_fields = shared;
                    for ((language, number), fields) in keys.into_iter().zip(version_fields) {
                        let mut version = SyncVersion::new(language, number, "rev");
                        version.fields = fields;
                        item.versions.push(version);
                    }
                    item
                },
            )
    }

    proptest! {
        #[test]
        fn round_trip_any_item(item in item_strategy()) {
            let text = encode(&item);
            let decoded = decode(&text).unwrap();
            prop_assert_eq!(decoded, item);
        }

        #[test]
        fn blob_round_trip_any_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let encoded = encode_blob(&bytes);
            prop_assert_eq!(decode_blob(&encoded).unwrap(), bytes);
        }
    }
}
