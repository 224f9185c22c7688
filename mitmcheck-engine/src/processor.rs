use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::{Arc, RwLock};

use tracing::warn;

use mitmcheck_db::{Database, DbError, Loader, Record};
use mitmcheck_fp::{RequestFingerprint, UaFingerprint};
use mitmcheck_types::{CipherCheck, IntList, Match, StringSet};

use crate::{CheckError, Config, Report};

/// Substrings of the raw User-Agent that mark quirky clients, with the tag
/// appended to the UA fingerprint.
const UA_QUIRKS: &[(&str, &str)] = &[
    ("Dragon/", "dragon"),
    ("GSA/", "gsa"),
    ("Silk-Accelerated=true", "silk_accelerated"),
    ("PlayStation Vita", "playstation"),
];

/// Errors from building or reloading a processor. A missing corpus file is
/// only a warning; a malformed record is fatal.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// The loaded corpus: immutable once built, swapped wholesale on reload.
struct EngineState {
    browser_database: Database,
    mitm_database: Database,
    bad_header_set: StringSet,
}

impl EngineState {
    fn load(config: &Config) -> Result<EngineState, LoadError> {
        Ok(EngineState {
            browser_database: load_database(&config.browser_file_name, &config.loader)?,
            mitm_database: load_database(&config.mitm_file_name, &config.loader)?,
            bad_header_set: load_bad_headers(&config.bad_header_file_name, &config.loader)?,
        })
    }
}

/// Generates heuristic MITM detection reports for a TLS ClientHello and the
/// corresponding HTTP user agent. Shared across request handlers; `check`
/// runs lock-free on an immutable corpus snapshot.
pub struct Processor {
    state: RwLock<Arc<EngineState>>,
}

impl Processor {
    /// Build a processor from the configured corpus files.
    pub fn new(config: &Config) -> Result<Processor, LoadError> {
        Ok(Processor {
            state: RwLock::new(Arc::new(EngineState::load(config)?)),
        })
    }

    /// Rebuild the corpus and swap it in. Concurrent `check` calls observe
    /// either the old or the new snapshot, never a torn view.
    pub fn reload(&self, config: &Config) -> Result<(), LoadError> {
        let state = Arc::new(EngineState::load(config)?);
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
        Ok(())
    }

    fn snapshot(&self) -> Arc<EngineState> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Check whether the observed ClientHello fields are consistent with the
    /// browser the user agent claims, and report the MITM detection result,
    /// security details, and any identified interceptor.
    pub fn check(
        &self,
        mut ua_fingerprint: UaFingerprint,
        raw_ua: &str,
        mut request_fingerprint: RequestFingerprint,
    ) -> Report {
        let state = self.snapshot();

        // User-agent string quirks.
        for &(needle, tag) in UA_QUIRKS {
            if raw_ua.contains(needle) {
                ua_fingerprint.quirk.push(tag.to_string());
            }
        }

        // Strip GREASE values from the hello lists and record them as a
        // quirk instead.
        let mut has_grease = strip_grease(&mut request_fingerprint.cipher);
        has_grease |= strip_grease(&mut request_fingerprint.extension);
        has_grease |= strip_grease(&mut request_fingerprint.curve);
        if has_grease {
            request_fingerprint.quirk.push("grease".to_string());
        }

        // Headers that browsers never send.
        let has_bad_header = request_fingerprint
            .header
            .iter()
            .any(|header| state.bad_header_set.contains(header.as_str()));
        if has_bad_header {
            request_fingerprint.quirk.push("badhdr".to_string());
        }

        let mut report = Report::default();

        // Find the browser records matching the user agent fingerprint.
        let candidate_ids = state.browser_database.get_by_ua_fingerprint(&ua_fingerprint);
        let mut browser_record: Option<&Record> = None;
        let mut max_similarity = 0;
        let mut matched = false;
        for id in candidate_ids {
            let Some(record) = state.browser_database.record(id) else {
                continue;
            };
            let (verdict, similarity) = record.request_signature.matches(&request_fingerprint);
            if verdict == Match::Possible {
                browser_record = Some(record);
                matched = true;
                break;
            }
            // keep the closest mismatch; later records win ties
            if browser_record.is_none() || similarity >= max_similarity {
                browser_record = Some(record);
                max_similarity = similarity;
            }
        }
        let Some(browser_record) = browser_record else {
            report.error = Some(CheckError::UnknownUserAgent);
            return report;
        };
        let browser_sig = &browser_record.request_signature;

        let cipher_check = CipherCheck::global();
        report.matched_ua_signature = browser_record.ua_signature.to_string();
        report.browser_signature = browser_sig.to_string();
        report.browser_grade = browser_sig.grade();
        report.actual_grade = request_fingerprint
            .version
            .grade()
            .merge(cipher_check.grade(&request_fingerprint.cipher));
        report.weak_ciphers = cipher_check.any_known_attack(&request_fingerprint.cipher);

        if matched {
            report.browser_signature_match = Match::Possible;
            return report;
        }

        // Find the heuristic that flagged the connection, impossible fields
        // before unlikely ones, in a fixed field order.
        let (map, _) = browser_sig.match_map(&request_fingerprint);
        let fields = [
            (map.version, "version", format!("{} vs {}", browser_sig.version, request_fingerprint.version)),
            (map.cipher, "cipher", format!("{} vs {}", browser_sig.cipher, request_fingerprint.cipher)),
            (map.extension, "extension", format!("{} vs {}", browser_sig.extension, request_fingerprint.extension)),
            (map.curve, "curve", format!("{} vs {}", browser_sig.curve, request_fingerprint.curve)),
            (map.ec_point_fmt, "ecpointfmt", format!("{} vs {}", browser_sig.ec_point_fmt, request_fingerprint.ec_point_fmt)),
            (map.header, "header", format!("{} vs {}", browser_sig.header, request_fingerprint.header)),
            (map.quirk, "quirk", format!("{} vs {}", browser_sig.quirk, request_fingerprint.quirk)),
        ];
        let flagged = fields
            .iter()
            .find(|(verdict, _, _)| *verdict == Match::Impossible)
            .or_else(|| fields.iter().find(|(verdict, _, _)| *verdict == Match::Unlikely));
        match flagged {
            Some((verdict, field, details)) => {
                report.browser_signature_match = *verdict;
                report.reason = match verdict {
                    Match::Impossible => format!("impossible_{field}"),
                    _ => format!("unlikely_{field}"),
                };
                report.reason_details.clone_from(details);
            }
            None => {
                report.browser_signature_match = Match::Possible;
                return report;
            }
        }

        // Check whether a MITM affects the connection security level.
        if browser_sig.is_pfs() && cipher_check.is_first_pfs(&request_fingerprint.cipher) {
            report.loses_pfs = true;
        }
        let mitm_ids = state
            .mitm_database
            .get_by_request_fingerprint(&request_fingerprint);
        if let Some(&first) = mitm_ids.first()
            && let Some(mitm_record) = state.mitm_database.record(first)
        {
            report.actual_grade = report.actual_grade.merge(mitm_record.mitm_info.grade);
            report.matched_mitm_name = mitm_record.mitm_info.name_list.to_string();
            report.matched_mitm_type = mitm_record.mitm_info.mitm_type;
            report.matched_mitm_signature = mitm_record.request_signature.to_string();
        }

        report
    }
}

/// Remove GREASE placeholders (RFC 8701: `v & 0x0f0f == 0x0a0a`) in place;
/// true if any were present.
fn strip_grease(list: &mut IntList) -> bool {
    let before = list.len();
    list.0.retain(|value| value & 0x0f0f != 0x0a0a);
    before != list.len()
}

fn open_file(name: &str, loader: &Option<Arc<dyn Loader>>) -> io::Result<Box<dyn Read>> {
    match loader {
        Some(loader) => loader.load_file(name),
        None => Ok(Box::new(File::open(name)?)),
    }
}

fn load_database(name: &str, loader: &Option<Arc<dyn Loader>>) -> Result<Database, LoadError> {
    match open_file(name, loader) {
        Ok(input) => Ok(Database::load(input)?),
        Err(err) => {
            warn!(file = name, error = %err, "corpus file unavailable, using empty database");
            Ok(Database::default())
        }
    }
}

/// Bad-header lines are taken verbatim: no comment stripping, no trimming.
fn load_bad_headers(name: &str, loader: &Option<Arc<dyn Loader>>) -> Result<StringSet, LoadError> {
    match open_file(name, loader) {
        Ok(input) => {
            let mut set = StringSet::new();
            for line in BufReader::new(input).lines() {
                set.insert(line?);
            }
            Ok(set)
        }
        Err(err) => {
            warn!(file = name, error = %err, "bad-header file unavailable, using empty set");
            Ok(StringSet::new())
        }
    }
}
