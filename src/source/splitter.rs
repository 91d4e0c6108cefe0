use super::timestamp::TIMESTAMP_REGEX;

/// One log entry carved out of a larger blob.
///
/// `raw_text` is everything between this entry's timestamp and the next one,
/// so `timestamp` followed by `raw_text` is exactly the slice of the source it
/// came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogEntry<'a> {
    pub raw_text: &'a str,
    pub timestamp: &'a str,
}

/// Split a blob into entries on every embedded timestamp.
///
/// Text before the first timestamp is a header and is dropped. A blob with no
/// timestamps yields `(0, [])`.
pub fn split(blob: &str) -> (usize, Vec<LogEntry<'_>>) {
    let matches: Vec<_> = TIMESTAMP_REGEX.find_iter(blob).collect();

    let entries: Vec<LogEntry<'_>> = matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let end = matches.get(i + 1).map_or(blob.len(), |next| next.start());
            LogEntry {
                raw_text: &blob[m.end()..end],
                timestamp: m.as_str(),
            }
        })
        .collect();

    (entries.len(), entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RALLY: &str = "2022-06-15 18:38:06.437 8844 INFO rally.common.plugin.discover [-] Loading plugins\n\
                         2022-06-15 18:38:07.000 8845 WARN rally.x [-] msg2\n";

    #[test]
    fn test_split_two_entries() {
        let (count, entries) = split(RALLY);

        assert_eq!(count, 2);
        assert_eq!(entries[0].timestamp, "2022-06-15 18:38:06.437");
        assert_eq!(
            entries[0].raw_text,
            " 8844 INFO rally.common.plugin.discover [-] Loading plugins\n"
        );
        assert_eq!(entries[1].timestamp, "2022-06-15 18:38:07.000");
        assert_eq!(entries[1].raw_text, " 8845 WARN rally.x [-] msg2\n");
    }

    #[test]
    fn test_split_is_lossless_after_header() {
        let header = "Rally task output\nsome preamble ";
        let blob = format!("{header}{RALLY}");

        let (count, entries) = split(&blob);
        let rebuilt: String = entries
            .iter()
            .map(|e| format!("{}{}", e.timestamp, e.raw_text))
            .collect();

        assert_eq!(count, 2);
        assert_eq!(rebuilt, RALLY);
    }

    #[test]
    fn test_no_timestamps_is_empty() {
        let (count, entries) = split("no structured entries here\n");

        assert_eq!(count, 0);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_empty_blob() {
        let (count, entries) = split("");

        assert_eq!(count, 0);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_continuation_lines_stay_with_entry() {
        let blob = "2022-06-15 18:38:06.437 1 ERROR a.b Traceback:\n  File \"x.py\"\n    boom\n\
                    2022-06-15 18:38:06.500 1 INFO a.b next\n";

        let (count, entries) = split(blob);

        assert_eq!(count, 2);
        assert_eq!(
            entries[0].raw_text,
            " 1 ERROR a.b Traceback:\n  File \"x.py\"\n    boom\n"
        );
    }

    #[test]
    fn test_adjacent_timestamps_yield_empty_entry() {
        let (count, entries) = split("2022-06-15 18:38:06.4372022-06-15 18:38:06.438 1 INFO m x");

        assert_eq!(count, 2);
        assert_eq!(entries[0].raw_text, "");
        assert_eq!(entries[1].raw_text, " 1 INFO m x");
    }
}
