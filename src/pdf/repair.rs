//! Cross-reference recovery for structurally damaged files
//!
//! Many producers write PDFs whose `xref` table or `startxref` pointer is
//! wrong or missing while the objects themselves are intact. Recovery scans
//! the raw bytes for `N G obj` headers, picks the catalog, and appends a
//! fresh cross-reference section so a regular parser can load the file.
//!
//! A catalog stored inside a compressed object stream is invisible to the
//! scan. The rebuilt trailer then has no `/Root` and the reader locates the
//! catalog among the parsed objects instead.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use log::{debug, warn};
use regex::bytes::Regex;

/// Bytes of a file with a rebuilt cross-reference section
#[derive(Debug, Clone)]
pub struct RebuiltSource {
    /// Original bytes followed by the new xref, trailer and startxref
    pub bytes: Vec<u8>,
    /// Number of distinct objects located by the scan
    pub objects: usize,
    /// Catalog object chosen as the trailer's Root, if the scan saw one
    pub root: Option<(u32, u16)>,
    /// Info dictionary carried over from the last trailer seen
    pub info: Option<(u32, u16)>,
}

fn object_header() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"(?-u)(\d{1,10})[ \t\r\n\f\x00]+(\d{1,5})[ \t\r\n\f\x00]+obj\b")
            .expect("object header pattern is valid")
    })
}

fn catalog_marker() -> &'static Regex {
    static CATALOG: OnceLock<Regex> = OnceLock::new();
    CATALOG.get_or_init(|| {
        Regex::new(r"(?-u)/Type\s*/Catalog\b").expect("catalog pattern is valid")
    })
}

fn info_entry() -> &'static Regex {
    static INFO: OnceLock<Regex> = OnceLock::new();
    INFO.get_or_init(|| {
        Regex::new(r"(?-u)/Info\s*(\d{1,10})\s+(\d{1,5})\s+R\b").expect("info pattern is valid")
    })
}

fn xref_stream_marker() -> &'static Regex {
    static XREF: OnceLock<Regex> = OnceLock::new();
    XREF.get_or_init(|| Regex::new(r"(?-u)/Type\s*/XRef\b").expect("xref pattern is valid"))
}

fn parse_number<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Last `/Info N G R` entry in `dict`
fn info_reference(dict: &[u8]) -> Option<(u32, u16)> {
    info_entry().captures_iter(dict).last().and_then(|caps| {
        Some((
            parse_number(caps.get(1)?.as_bytes())?,
            parse_number(caps.get(2)?.as_bytes())?,
        ))
    })
}

/// Info reference of the last trailer or xref stream dictionary in `bytes`
fn find_info(bytes: &[u8], xref_streams: &[(usize, usize)]) -> Option<(u32, u16)> {
    let mut candidates: Vec<(usize, (u32, u16))> = Vec::new();

    let mut from = 0;
    while let Some(pos) = find(&bytes[from..], b"trailer").map(|at| from + at) {
        let end = find(&bytes[pos..], b"startxref")
            .map(|len| pos + len)
            .unwrap_or(bytes.len());
        if let Some(info) = info_reference(&bytes[pos..end]) {
            candidates.push((pos, info));
        }
        from = pos + b"trailer".len();
    }

    for &(start, end) in xref_streams {
        let dict_end = find(&bytes[start..end], b"stream")
            .map(|len| start + len)
            .unwrap_or(end);
        if let Some(info) = info_reference(&bytes[start..dict_end]) {
            candidates.push((start, info));
        }
    }

    candidates.into_iter().max_by_key(|(pos, _)| *pos).map(|(_, info)| info)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Rebuild the cross-reference table of `bytes`
///
/// Later definitions of an object number win, matching incremental-update
/// semantics. Fails only when no object headers can be found.
pub fn rebuild_xref(bytes: &[u8]) -> Result<RebuiltSource, &'static str> {
    let mut offsets: BTreeMap<u32, (u16, usize)> = BTreeMap::new();
    let mut root = None;
    let mut xref_streams = Vec::new();

    for caps in object_header().captures_iter(bytes) {
        let (Some(whole), Some(number), Some(generation)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let (Some(number), Some(generation)) = (
            parse_number::<u32>(number.as_bytes()),
            parse_number::<u16>(generation.as_bytes()),
        ) else {
            continue;
        };
        if number == 0 {
            continue;
        }

        offsets.insert(number, (generation, whole.start()));

        let body_start = whole.end();
        let body_end = find(&bytes[body_start..], b"endobj")
            .map(|len| body_start + len)
            .unwrap_or(bytes.len());
        let body = &bytes[body_start..body_end];
        if catalog_marker().is_match(body) {
            root = Some((number, generation));
        } else if xref_stream_marker().is_match(body) {
            xref_streams.push((body_start, body_end));
        }
    }

    let size = match offsets.keys().next_back() {
        Some(&max) => max + 1,
        None => return Err("no object headers found"),
    };
    let info = find_info(bytes, &xref_streams);
    match root {
        Some((number, generation)) => debug!(
            "Rebuilding xref: {} objects, catalog {} {} R",
            offsets.len(),
            number,
            generation
        ),
        None => warn!(
            "Rebuilding xref: {} objects, no uncompressed catalog found",
            offsets.len()
        ),
    }

    let mut out = Vec::with_capacity(bytes.len() + size as usize * 20 + 128);
    out.extend_from_slice(bytes);
    if !out.ends_with(b"\n") {
        out.push(b'\n');
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f\r\n");
    for number in 1..size {
        match offsets.get(&number) {
            Some(&(generation, offset)) => {
                out.extend_from_slice(format!("{:010} {:05} n\r\n", offset, generation).as_bytes())
            }
            None => out.extend_from_slice(b"0000000000 00000 f\r\n"),
        }
    }
    let mut trailer = format!("trailer\n<< /Size {}", size);
    if let Some((number, generation)) = root {
        trailer.push_str(&format!(" /Root {} {} R", number, generation));
    }
    if let Some((number, generation)) = info {
        trailer.push_str(&format!(" /Info {} {} R", number, generation));
    }
    trailer.push_str(&format!(" >>\nstartxref\n{}\n%%EOF\n", xref_offset));
    out.extend_from_slice(trailer.as_bytes());

    Ok(RebuiltSource {
        bytes: out,
        objects: offsets.len(),
        root,
        info,
    })
}
