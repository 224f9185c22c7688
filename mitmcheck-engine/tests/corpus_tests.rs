//! Integration tests over the checked-in signature corpus: the corpus must
//! survive a dump/reload cycle, and offline compaction via `merge_by` must
//! never reject a fingerprint an unmerged record accepted.

use std::fs::File;

use regex::Regex;

use mitmcheck_db::Database;
use mitmcheck_fp::{RequestFingerprint, UaFingerprint, VersionSignature};
use mitmcheck_types::Match;

fn testdata(name: &str) -> String {
    format!("{}/testdata/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn load(name: &str) -> Database {
    Database::load(File::open(testdata(name)).unwrap()).unwrap()
}

/// Rewrite a record's signatures into fingerprints they should accept.
fn derived_fingerprints(record: &mitmcheck_db::Record) -> (UaFingerprint, RequestFingerprint) {
    let range = Regex::new(r"-[0-9.]*").unwrap();
    let ua = UaFingerprint::parse(&range.replace_all(&record.ua_signature.to_string(), ""))
        .unwrap();

    let flags = Regex::new(r"[*~!?^]").unwrap();
    let mut request_signature = record.request_signature.clone();
    let max = request_signature.version.max;
    request_signature.version = VersionSignature {
        min: max,
        exp: max,
        max,
    };
    let request =
        RequestFingerprint::parse(&flags.replace_all(&request_signature.to_string(), ""))
            .unwrap();
    (ua, request)
}

#[test]
fn corpus_survives_dump_and_reload() {
    for name in ["browser.txt", "mitm.txt"] {
        let db = load(name);
        assert!(!db.is_empty(), "{name} is empty");

        let mut dumped = Vec::new();
        db.dump(&mut dumped).unwrap();
        let reloaded = Database::load(dumped.as_slice()).unwrap();
        assert_eq!(reloaded.len(), db.len(), "{name} changed size on reload");

        let mut redumped = Vec::new();
        reloaded.dump(&mut redumped).unwrap();
        assert_eq!(dumped, redumped, "{name} is not stable under dump/reload");
    }
}

#[test]
fn merged_browser_corpus_stays_monotone() {
    let mut db = load("browser.txt");
    let fingerprints: Vec<(UaFingerprint, RequestFingerprint)> =
        db.iter().map(|(_, record)| derived_fingerprints(record)).collect();

    let (before, after) = db.merge_by(|a, b| {
        a.ua_signature.browser_name == b.ua_signature.browser_name
    });
    assert!(after < before, "expected same-browser records to collapse");

    // every fingerprint an original record accepted must still be accepted
    for (ua, request) in &fingerprints {
        let candidate_ids = db.get_by_ua_fingerprint(ua);
        assert!(!candidate_ids.is_empty(), "no UA match for {ua}");
        let accepted = candidate_ids.iter().any(|id| {
            db.record(*id).is_some_and(|record| {
                record.request_signature.matches(request).0 != Match::Impossible
            })
        });
        assert!(accepted, "merged corpus rejects {request}");
    }
}

#[test]
fn delete_by_then_lookup_misses() {
    let mut db = load("browser.txt");
    let (ua, _) = derived_fingerprints(db.record(0).unwrap());
    assert!(!db.get_by_ua_fingerprint(&ua).is_empty());

    let browser_name = db.record(0).unwrap().ua_signature.browser_name;
    db.delete_by(|record| record.ua_signature.browser_name == browser_name);
    assert!(db.get_by_ua_fingerprint(&ua).is_empty());
}
