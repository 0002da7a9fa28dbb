//! Deterministic map ordering.
//!
//! Entries are written in iteration order while their byte positions are
//! recorded. Once the map's last entry is written, the entries are
//! reordered in place by the text of their keys.

/// Position of one encoded entry in the output buffer.
#[derive(Clone, Copy, Debug)]
struct EntrySpan {
    /// Start of the entry, including its leading line break.
    start: usize,
    /// Opening quote of the key.
    key_start: usize,
    /// Closing quote of the key, plus one.
    key_end: usize,
}

#[derive(Default, Debug)]
pub(crate) struct MapPositions {
    entries: Vec<EntrySpan>,
}

impl MapPositions {
    pub(crate) fn begin_entry(&mut self, start: usize, key_start: usize) {
        self.entries.push(EntrySpan {
            start,
            key_start,
            key_end: key_start,
        });
    }

    pub(crate) fn end_key(&mut self, key_end: usize) {
        if let Some(entry) = self.entries.last_mut() {
            entry.key_end = key_end;
        }
    }
}

/// Reorders the recorded entries, which run to the end of `buf`, by key.
pub(crate) fn sort_entries(buf: &mut Vec<u8>, positions: &MapPositions) {
    let entries = &positions.entries;
    let Some(first) = entries.first() else {
        return;
    };
    let region_start = first.start;

    let mut spans: Vec<(core::ops::Range<usize>, core::ops::Range<usize>)> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let end = entries.get(i + 1).map_or(buf.len(), |next| next.start);
            let key = (entry.key_start + 1)..entry.key_end.saturating_sub(1).max(entry.key_start + 1);
            (key, entry.start..end)
        })
        .collect();

    if spans.windows(2).all(|w| buf[w[0].0.clone()] <= buf[w[1].0.clone()]) {
        return;
    }
    spans.sort_by(|a, b| buf[a.0.clone()].cmp(&buf[b.0.clone()]));

    let mut sorted = Vec::with_capacity(buf.len() - region_start);
    for (_, span) in &spans {
        sorted.extend_from_slice(&buf[span.clone()]);
    }
    buf.truncate(region_start);
    buf.extend_from_slice(&sorted);
}

#[cfg(test)]
mod tests {
    use super::*;
    use opjson_testhelpers::test;

    fn record(buf: &mut Vec<u8>, positions: &mut MapPositions, newline: &str, key: &str, value: &str) {
        let start = buf.len();
        buf.extend_from_slice(newline.as_bytes());
        let key_start = buf.len();
        positions.begin_entry(start, key_start);
        buf.extend_from_slice(format!("\"{key}\"").as_bytes());
        positions.end_key(buf.len());
        buf.extend_from_slice(format!(":{value},").as_bytes());
    }

    #[test]
    fn compact_entries_sort_by_key() {
        let mut buf = b"{".to_vec();
        let mut positions = MapPositions::default();
        record(&mut buf, &mut positions, "", "b", "2");
        record(&mut buf, &mut positions, "", "a", "[1,2]");
        record(&mut buf, &mut positions, "", "c", "3");
        sort_entries(&mut buf, &positions);
        assert_eq!(buf, br#"{"a":[1,2],"b":2,"c":3,"#);
    }

    #[test]
    fn indented_entries_keep_their_line_breaks() {
        let mut buf = b"{".to_vec();
        let mut positions = MapPositions::default();
        record(&mut buf, &mut positions, "\n  ", "z", "1");
        record(&mut buf, &mut positions, "\n  ", "y", "2");
        sort_entries(&mut buf, &positions);
        assert_eq!(buf, b"{\n  \"y\":2,\n  \"z\":1,");
    }

    #[test]
    fn keys_compare_bytewise() {
        let mut buf = b"{".to_vec();
        let mut positions = MapPositions::default();
        record(&mut buf, &mut positions, "", "ab", "1");
        record(&mut buf, &mut positions, "", "a", "2");
        record(&mut buf, &mut positions, "", "B", "3");
        sort_entries(&mut buf, &positions);
        assert_eq!(buf, br#"{"B":3,"a":2,"ab":1,"#);
    }
}
