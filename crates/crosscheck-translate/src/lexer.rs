//! Minimal SQL segmentation: separates code from comments, string literals
//! and quoted identifiers so rewrites and checks only touch code.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    LineComment,
    BlockComment,
    StringLiteral,
    QuotedIdent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
}

pub fn segments<'a>(sql: &'a str) -> Vec<Segment<'a>> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut index = 0;

    let push = |out: &mut Vec<Segment<'a>>, kind: SegmentKind, from: usize, to: usize| {
        if to > from {
            out.push(Segment {
                kind,
                text: &sql[from..to],
            });
        }
    };

    while index < bytes.len() {
        let (kind, end) = match bytes[index] {
            b'-' if bytes.get(index + 1) == Some(&b'-') => {
                let end = sql[index..].find('\n').map_or(bytes.len(), |offset| index + offset);
                (SegmentKind::LineComment, end)
            }
            b'/' if bytes.get(index + 1) == Some(&b'*') => {
                let end = sql[index + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |offset| index + 2 + offset + 2);
                (SegmentKind::BlockComment, end)
            }
            b'\'' => (SegmentKind::StringLiteral, closing_quote(bytes, index, b'\'')),
            b'"' => (SegmentKind::QuotedIdent, closing_quote(bytes, index, b'"')),
            _ => {
                index += 1;
                continue;
            }
        };
        push(&mut out, SegmentKind::Code, start, index);
        push(&mut out, kind, index, end);
        index = end;
        start = end;
    }
    push(&mut out, SegmentKind::Code, start, bytes.len());
    out
}

/// End offset (exclusive) of a quoted run starting at `open`; doubled
/// quotes are escapes.
fn closing_quote(bytes: &[u8], open: usize, quote: u8) -> usize {
    let mut index = open + 1;
    while index < bytes.len() {
        if bytes[index] == quote {
            if bytes.get(index + 1) == Some(&quote) {
                index += 2;
                continue;
            }
            return index + 1;
        }
        index += 1;
    }
    bytes.len()
}

/// Code with comments removed and literals blanked to `''`.
pub fn code_only(sql: &str) -> String {
    segments(sql)
        .into_iter()
        .map(|segment| match segment.kind {
            SegmentKind::Code => segment.text.to_string(),
            SegmentKind::QuotedIdent => segment.text.to_string(),
            SegmentKind::StringLiteral => "''".to_string(),
            SegmentKind::LineComment | SegmentKind::BlockComment => " ".to_string(),
        })
        .collect()
}

/// Text of all comments, concatenated.
pub fn comments_only(sql: &str) -> String {
    segments(sql)
        .into_iter()
        .filter(|s| matches!(s.kind, SegmentKind::LineComment | SegmentKind::BlockComment))
        .map(|s| s.text)
        .collect::<Vec<_>>()
        .join("\n")
}
