use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Read, Write};

use tracing::debug;

use mitmcheck_fp::{RequestFingerprint, UaFingerprint};
use mitmcheck_types::Match;

use crate::{DbError, Record};

/// An insertion-ordered collection of signature records.
///
/// Records are identified by stable integer handles assigned from a
/// monotone counter; iteration, lookups, and dumps run in insertion order.
/// Duplicates are permitted. A database is built during load and read-only
/// while serving.
#[derive(Debug, Clone, Default)]
pub struct Database {
    records: BTreeMap<u64, Record>,
    next_id: u64,
}

impl Database {
    /// Load a database from a reader, one record per line.
    pub fn load(input: impl Read) -> Result<Database, DbError> {
        let mut db = Database::default();
        db.extend(input)?;
        debug!(records = db.len(), "loaded record database");
        Ok(db)
    }

    /// Append records parsed from a reader. Each line may carry a leading
    /// tab-separated label and a trailing `#` comment, and is trimmed of
    /// whitespace and surrounding double-quotes; blank lines are skipped.
    /// A malformed record aborts the load.
    pub fn extend(&mut self, input: impl Read) -> Result<(), DbError> {
        let reader = BufReader::new(input);
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let mut record_str = line.as_str();
            if let Some(pos) = record_str.find('\t') {
                record_str = &record_str[pos + 1..];
            }
            if let Some(pos) = record_str.find('#') {
                record_str = &record_str[..pos];
            }
            let record_str = record_str.trim().trim_matches('"');
            if record_str.is_empty() {
                continue;
            }
            let record = Record::parse(record_str).map_err(|source| DbError::Parse {
                line: idx + 1,
                record: record_str.to_string(),
                source,
            })?;
            self.add(record);
        }
        Ok(())
    }

    /// Append a record and return its handle.
    pub fn add(&mut self, record: Record) -> u64 {
        let id = self.next_id;
        self.records.insert(id, record);
        self.next_id += 1;
        id
    }

    /// Remove all records. Handles are not reused.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, id: u64) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &Record)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    /// Write records to output in stored order, one per line.
    pub fn dump(&self, output: &mut impl Write) -> io::Result<()> {
        for record in self.records.values() {
            writeln!(output, "{record}")?;
        }
        Ok(())
    }

    /// Handles of all records whose UA signature does not rule out the
    /// fingerprint.
    pub fn get_by_ua_fingerprint(&self, fingerprint: &UaFingerprint) -> Vec<u64> {
        self.get_by(|record| record.ua_signature.matches(fingerprint) != Match::Impossible)
    }

    /// Handles of all records whose request signature does not rule out the
    /// fingerprint.
    pub fn get_by_request_fingerprint(&self, fingerprint: &RequestFingerprint) -> Vec<u64> {
        self.get_by(|record| {
            record.request_signature.matches(fingerprint).0 != Match::Impossible
        })
    }

    /// Handles of all records the predicate selects, in stored order.
    pub fn get_by(&self, select: impl Fn(&Record) -> bool) -> Vec<u64> {
        self.records
            .iter()
            .filter(|(_, record)| select(record))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Delete all records the predicate selects.
    pub fn delete_by(&mut self, select: impl Fn(&Record) -> bool) {
        self.records.retain(|_, record| !select(record));
    }

    /// Merge record pairs the predicate selects, folding the second of each
    /// merged pair into the first and removing it. Returns the record count
    /// before and after.
    pub fn merge_by(&mut self, select: impl Fn(&Record, &Record) -> bool) -> (usize, usize) {
        let before = self.records.len();
        let ids: Vec<u64> = self.records.keys().copied().collect();
        for &id1 in &ids {
            for &id2 in &ids {
                if id1 == id2 {
                    continue;
                }
                // re-fetch record1 each round in case it already merged
                let (Some(record1), Some(record2)) =
                    (self.records.get(&id1), self.records.get(&id2))
                else {
                    continue;
                };
                if select(record1, record2) {
                    let merged = record1.merge(record2);
                    self.records.insert(id1, merged);
                    self.records.remove(&id2);
                }
            }
        }
        (before, self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mitmcheck_types::TlsVersion;

    #[test]
    fn load_empty_input() {
        let db = Database::load(io::empty()).unwrap();
        assert!(db.is_empty());
    }

    #[test]
    fn add_assigns_sequential_handles() {
        let mut db = Database::default();
        assert_eq!(db.len(), 0);
        assert_eq!(db.add(Record::default()), 0);
        assert_eq!(db.add(Record::default()), 1);
        assert_eq!(db.len(), 2);
    }

    #[test]
    fn clear_does_not_reuse_handles() {
        let mut db = Database::default();
        db.add(Record::default());
        db.clear();
        assert_eq!(db.len(), 0);
        assert_eq!(db.add(Record::default()), 1);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn load_strips_labels_comments_and_quotes() {
        let input = "\
chrome-70\t\"1:70:0:0::1:|::::::|:0:0\" # canonical chrome\n\
\n\
   2:11:0:0::1:|::::::|:0:0   \n\
# just a comment\n";
        let db = Database::load(input.as_bytes()).unwrap();
        assert_eq!(db.len(), 2);
        assert_eq!(db.record(0).unwrap().ua_signature.browser_name, 1);
        assert_eq!(db.record(1).unwrap().ua_signature.browser_name, 2);
    }

    #[test]
    fn load_rejects_malformed_record() {
        let err = Database::load("not a record\n".as_bytes()).unwrap_err();
        match err {
            DbError::Parse { line, record, .. } => {
                assert_eq!(line, 1);
                assert_eq!(record, "not a record");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn get_by_ua_fingerprint() {
        let mut db = Database::default();
        db.add(Record::parse("1:0:0:0:0:0:|::::::|:0:0").unwrap());

        let mut fp = UaFingerprint::default();
        assert_eq!(db.get_by_ua_fingerprint(&fp), Vec::<u64>::new());
        fp.browser_name = 1;
        assert_eq!(db.get_by_ua_fingerprint(&fp), vec![0]);
        fp.browser_name = 2;
        assert_eq!(db.get_by_ua_fingerprint(&fp), Vec::<u64>::new());
    }

    #[test]
    fn get_by_request_fingerprint() {
        let mut db = Database::default();
        db.add(Record::parse("1:0:0:0:0:0:|303::::::|:0:0").unwrap());

        let mut fp = RequestFingerprint::default();
        assert_eq!(db.get_by_request_fingerprint(&fp), Vec::<u64>::new());
        fp.version = TlsVersion::TLS1_2;
        assert_eq!(db.get_by_request_fingerprint(&fp), vec![0]);
        fp.version = TlsVersion(2);
        assert_eq!(db.get_by_request_fingerprint(&fp), Vec::<u64>::new());
    }

    #[test]
    fn dump_preserves_insertion_order() {
        let mut db = Database::default();
        db.add(Record::parse("1:70:0:0::1:|::::::|:0:0").unwrap());
        db.add(Record::parse("4:63:0:0::1:|::::::|:0:0").unwrap());
        let mut out = Vec::new();
        db.dump(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1:70:0:0::1:|::::::|:0:0\n4:63:0:0::1:|::::::|:0:0\n"
        );
    }

    #[test]
    fn delete_by_predicate() {
        let mut db = Database::default();
        db.add(Record::parse("1:70:0:0::1:|::::::|:0:0").unwrap());
        db.add(Record::parse("4:63:0:0::1:|::::::|:0:0").unwrap());
        db.delete_by(|record| record.ua_signature.browser_name == 1);
        assert_eq!(db.len(), 1);
        assert!(db.record(0).is_none());
        assert!(db.record(1).is_some());
    }

    #[test]
    fn merge_by_collapses_matching_pairs() {
        let mut db = Database::default();
        db.add(Record::parse("1:70:0:0::1:|303:1,2:*:*:*:*:*|:0:0").unwrap());
        db.add(Record::parse("1:71:0:0::1:|303:1,2,3:*:*:*:*:*|:0:0").unwrap());
        db.add(Record::parse("4:63:0:0::1:|::::::|:0:0").unwrap());

        let (before, after) = db.merge_by(|a, b| {
            a.ua_signature.browser_name == b.ua_signature.browser_name
        });
        assert_eq!((before, after), (3, 2));

        let merged = db.record(0).unwrap();
        assert_eq!(merged.ua_signature.to_string(), "1:70-71:0:0::1:");
        assert_eq!(merged.request_signature.cipher.to_string(), "1,2,?3");
        assert!(db.record(1).is_none());
    }
}
