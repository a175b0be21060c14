use crate::database::Database;
use crate::download::Fetcher;
use crate::events::{EventSink, UpdateEvent};
use crate::parser::{self, Diagnostic, DiagnosticKind, OrbitalRecord};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

/// One location from the source list with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub line: usize,
    pub location: String,
}

impl SourceEntry {
    pub fn is_remote(&self) -> bool {
        self.location.contains("://")
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub sources: usize,
    pub failed_sources: usize,
    pub parsed: usize,
    pub stored: usize,
    pub diagnostics: usize,
}

/// Entries of a source list plus the lines that could not be read.
#[derive(Debug, Default)]
pub struct SourceList {
    pub entries: Vec<SourceEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Read a source list: trims, drops blank and `#` comment lines, strips trailing comments.
/// A line that is not valid UTF-8 is reported and skipped.
pub fn parse_source_list<R: BufRead>(list_name: &str, mut reader: R) -> SourceList {
    let mut list = SourceList::default();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => line_no += 1,
            Err(err) => {
                list.diagnostics.push(Diagnostic {
                    source: list_name.to_string(),
                    line: line_no + 1,
                    kind: DiagnosticKind::Read(err.to_string()),
                });
                break;
            }
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(err) => {
                list.diagnostics.push(Diagnostic {
                    source: list_name.to_string(),
                    line: line_no,
                    kind: DiagnosticKind::Read(format!("location is not valid UTF-8: {}", err)),
                });
                continue;
            }
        };
        let without_comment = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let location = without_comment.trim();
        if location.is_empty() {
            continue;
        }
        list.entries.push(SourceEntry {
            line: line_no,
            location: location.to_string(),
        });
    }
    list
}

/// Everything loaded from a source list, merged by catalog number.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub records: BTreeMap<u32, OrbitalRecord>,
    pub parsed: usize,
    pub failed_sources: usize,
    pub diagnostics: usize,
}

/// Load every entry, skipping the ones that cannot be reached.
pub fn load_sources(
    entries: &[SourceEntry],
    list_name: &str,
    fetcher: &dyn Fetcher,
    sink: &dyn EventSink,
) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    for entry in entries {
        sink.send(UpdateEvent::SourceStarted {
            location: entry.location.clone(),
        });

        let parsed = match open_local(entry) {
            Some(file) => parser::parse(&entry.location, BufReader::new(file)),
            None => match fetcher.fetch(&entry.location) {
                Ok(bytes) => parser::parse(&entry.location, Cursor::new(bytes)),
                Err(err) => {
                    outcome.failed_sources += 1;
                    outcome.diagnostics += 1;
                    sink.send(UpdateEvent::Diagnostic(Diagnostic {
                        source: list_name.to_string(),
                        line: entry.line,
                        kind: DiagnosticKind::Unreachable(format!(
                            "'{}': {:#}",
                            entry.location, err
                        )),
                    }));
                    continue;
                }
            },
        };

        sink.send(UpdateEvent::SourceParsed {
            location: entry.location.clone(),
            records: parsed.records.len(),
        });
        outcome.diagnostics += parsed.diagnostics.len();
        for diag in parsed.diagnostics {
            sink.send(UpdateEvent::Diagnostic(diag));
        }
        outcome.parsed += parsed.records.len();
        for record in parsed.records {
            outcome.records.insert(record.catalog_id(), record);
        }
    }

    outcome
}

/// Only regular files count; directories and the like fall through to the fetcher.
fn open_local(entry: &SourceEntry) -> Option<File> {
    if entry.is_remote() {
        return None;
    }
    let file = File::open(&entry.location).ok()?;
    file.metadata().ok()?.is_file().then_some(file)
}

/// Refresh the store from every source named in `source_list`.
pub fn run_update(
    source_list: &Path,
    db: &mut Database,
    fetcher: &dyn Fetcher,
    sink: &dyn EventSink,
) -> Result<UpdateSummary> {
    let list_name = source_list.display().to_string();
    let list = match File::open(source_list) {
        Ok(file) => parse_source_list(&list_name, BufReader::new(file)),
        Err(err) => {
            sink.send(UpdateEvent::Diagnostic(Diagnostic {
                source: list_name,
                line: 0,
                kind: DiagnosticKind::Read(err.to_string()),
            }));
            return Ok(UpdateSummary {
                diagnostics: 1,
                ..Default::default()
            });
        }
    };
    let list_diagnostics = list.diagnostics.len();
    for diag in list.diagnostics {
        sink.send(UpdateEvent::Diagnostic(diag));
    }
    let entries = list.entries;

    let loaded = load_sources(&entries, &list_name, fetcher, sink);

    let total = loaded.records.len();
    sink.send(UpdateEvent::StoreStarted { total });
    let stored = db.upsert_records(loaded.records.values(), |index, record| {
        sink.send(UpdateEvent::RecordStored {
            index,
            total,
            catalog_id: record.catalog_id(),
            name: record.name().to_string(),
        });
    })?;
    sink.send(UpdateEvent::StoreComplete { stored });

    Ok(UpdateSummary {
        sources: entries.len(),
        failed_sources: loaded.failed_sources,
        parsed: loaded.parsed,
        stored,
        diagnostics: list_diagnostics + loaded.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::parser::tests::{HST_L1, HST_L2, ISS_L1, ISS_L2, ISS_NAME};
    use anyhow::bail;
    use std::collections::HashMap;
    use std::fs;

    /// Serves canned bodies; anything else fails like an unreachable host.
    #[derive(Default)]
    struct FakeFetcher {
        bodies: HashMap<String, String>,
    }

    impl Fetcher for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            match self.bodies.get(url) {
                Some(body) => Ok(body.clone().into_bytes()),
                None => bail!("cannot reach {}", url),
            }
        }
    }

    #[test]
    fn test_parse_source_list() {
        let text = "# celestrak feeds\n\n  https://example.com/a.txt  \nlocal.txt # stations\n   # indented comment\n\t\nb.tle#x\n";
        let list = parse_source_list("sources.txt", Cursor::new(text));
        assert!(list.diagnostics.is_empty());
        let entries = list.entries;
        assert_eq!(
            entries,
            vec![
                SourceEntry { line: 3, location: "https://example.com/a.txt".into() },
                SourceEntry { line: 4, location: "local.txt".into() },
                SourceEntry { line: 7, location: "b.tle".into() },
            ]
        );
        assert!(entries[0].is_remote());
        assert!(!entries[1].is_remote());
    }

    #[test]
    fn test_update_with_local_file_and_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let iss_path = dir.path().join("iss.txt");
        fs::write(&iss_path, format!("{}\n{}\n{}\n", ISS_NAME, ISS_L1, ISS_L2)).unwrap();
        let missing = dir.path().join("missing.txt");

        let list = dir.path().join("sources.txt");
        fs::write(
            &list,
            format!("{}\n{}\n", iss_path.display(), missing.display()),
        )
        .unwrap();

        let mut db = Database::open_in_memory().unwrap();
        let sink = RecordingSink::new();
        let summary = run_update(&list, &mut db, &FakeFetcher::default(), &sink).unwrap();

        assert_eq!(summary.sources, 2);
        assert_eq!(summary.failed_sources, 1);
        assert_eq!(summary.stored, 1);

        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 2);
        assert!(matches!(diags[0].kind, DiagnosticKind::Unreachable(_)));

        let iss = db.get(25544).unwrap().unwrap();
        assert_eq!(iss.name(), ISS_NAME);
        assert_eq!(iss.line1(), ISS_L1);
    }

    #[test]
    fn test_remote_sources_use_fetcher_and_last_write_wins() {
        let mut fetcher = FakeFetcher::default();
        fetcher.bodies.insert(
            "https://example.com/one.txt".into(),
            format!("OLD NAME\n{}\n{}\n{}\n{}\n", ISS_L1, ISS_L2, HST_L1, HST_L2),
        );
        fetcher.bodies.insert(
            "https://example.com/two.txt".into(),
            format!("{}\n{}\n{}\n", ISS_NAME, ISS_L1, ISS_L2),
        );
        let entries = vec![
            SourceEntry { line: 1, location: "https://example.com/one.txt".into() },
            SourceEntry { line: 2, location: "https://example.com/two.txt".into() },
        ];

        let sink = RecordingSink::new();
        let loaded = load_sources(&entries, "list", &fetcher, &sink);
        assert_eq!(loaded.parsed, 3);
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[&25544].name(), ISS_NAME);
        assert_eq!(loaded.failed_sources, 0);
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn test_local_miss_falls_through_to_fetcher() {
        let mut fetcher = FakeFetcher::default();
        fetcher.bodies.insert(
            "no-such-file.txt".into(),
            format!("{}\n{}\n", ISS_L1, ISS_L2),
        );
        let entries = vec![SourceEntry { line: 5, location: "no-such-file.txt".into() }];
        let sink = RecordingSink::new();
        let loaded = load_sources(&entries, "list", &fetcher, &sink);
        assert_eq!(loaded.records.len(), 1);
    }

    #[test]
    fn test_parser_diagnostics_are_forwarded() {
        let mut fetcher = FakeFetcher::default();
        fetcher.bodies.insert(
            "https://example.com/cut.txt".into(),
            format!("{}\n{}\n{}\nTRUNCATED\n{}\n", ISS_NAME, ISS_L1, ISS_L2, HST_L1),
        );
        let entries = vec![SourceEntry { line: 1, location: "https://example.com/cut.txt".into() }];
        let sink = RecordingSink::new();
        let loaded = load_sources(&entries, "list", &fetcher, &sink);

        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.diagnostics, 1);
        let diags = sink.diagnostics();
        assert_eq!(diags[0].source, "https://example.com/cut.txt");
        assert_eq!(diags[0].line, 6);
    }

    #[test]
    fn test_missing_source_list_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open_in_memory().unwrap();
        let sink = RecordingSink::new();
        let summary = run_update(
            &dir.path().join("nope.txt"),
            &mut db,
            &FakeFetcher::default(),
            &sink,
        )
        .unwrap();
        assert_eq!(summary.stored, 0);
        assert_eq!(summary.diagnostics, 1);
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_unreadable_list_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let iss_path = dir.path().join("iss.txt");
        fs::write(&iss_path, format!("{}\n{}\n{}\n", ISS_NAME, ISS_L1, ISS_L2)).unwrap();

        let list = dir.path().join("sources.txt");
        let mut contents = b"bad\xff\xfe.txt\n".to_vec();
        contents.extend_from_slice(format!("{}\n", iss_path.display()).as_bytes());
        fs::write(&list, contents).unwrap();

        let mut db = Database::open_in_memory().unwrap();
        let sink = RecordingSink::new();
        let summary = run_update(&list, &mut db, &FakeFetcher::default(), &sink).unwrap();

        assert_eq!(summary.sources, 1);
        assert_eq!(summary.stored, 1);
        assert_eq!(summary.diagnostics, 1);
        assert_eq!(db.count().unwrap(), 1);

        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].source, list.display().to_string());
        assert_eq!(diags[0].line, 1);
        assert!(matches!(diags[0].kind, DiagnosticKind::Read(_)));
    }

    #[test]
    fn test_invalid_utf8_line_keeps_later_line_numbers() {
        let list = parse_source_list("list", Cursor::new(b"# feeds\n\xff\nlocal.txt\n".to_vec()));
        assert_eq!(list.diagnostics.len(), 1);
        assert_eq!(list.diagnostics[0].line, 2);
        assert_eq!(
            list.entries,
            vec![SourceEntry { line: 3, location: "local.txt".into() }]
        );
    }

    #[test]
    fn test_directory_source_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![SourceEntry {
            line: 4,
            location: dir.path().display().to_string(),
        }];
        let sink = RecordingSink::new();
        let loaded = load_sources(&entries, "sources.txt", &FakeFetcher::default(), &sink);

        assert!(loaded.records.is_empty());
        assert_eq!(loaded.failed_sources, 1);
        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].source, "sources.txt");
        assert_eq!(diags[0].line, 4);
        assert!(matches!(diags[0].kind, DiagnosticKind::Unreachable(_)));
    }

    #[test]
    fn test_directory_source_falls_through_to_fetcher() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().display().to_string();
        let mut fetcher = FakeFetcher::default();
        fetcher.bodies.insert(location.clone(), format!("{}\n{}\n", ISS_L1, ISS_L2));
        let entries = vec![SourceEntry { line: 1, location }];
        let sink = RecordingSink::new();
        let loaded = load_sources(&entries, "sources.txt", &fetcher, &sink);
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.failed_sources, 0);
    }
}
