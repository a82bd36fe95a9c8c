//! Backup ledger: the durable record that makes a migration reversible
//!
//! One ledger file per apply session. Records are tab separated,
//! `workload<TAB>bindingPath<TAB>originalRuntime`, one per line, written in
//! apply order and never rewritten. Lines starting with `#` and blank lines
//! are ignored on read. The first line is a comment carrying the namespace so
//! a rollback can find it without being told.
//!
//! Opening a ledger also writes an executable `<stem>.rollback.sh` next to it
//! that replays this exact file.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use runway_common::Error;
use tracing::{debug, info};

use crate::binding::BindingPath;

const LEDGER_PREFIX: &str = "runway-backup";
const LEDGER_EXTENSION: &str = "tsv";
const ROLLBACK_SCRIPT_SUFFIX: &str = ".rollback.sh";
const HEADER_NAMESPACE_KEY: &str = "namespace=";
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// One applied migration, as recorded for rollback
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    /// InferenceService name
    pub workload: String,
    /// Binding path that was patched
    pub path: BindingPath,
    /// Runtime name before the patch
    pub original_runtime: String,
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.workload, self.path, self.original_runtime)
    }
}

impl FromStr for LedgerEntry {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split('\t').collect();
        let [workload, path, original] = fields.as_slice() else {
            return Err(format!("expected 3 tab-separated fields, found {}", fields.len()));
        };
        if workload.is_empty() || original.is_empty() {
            return Err("workload and original runtime must not be empty".to_string());
        }
        let path = path.parse::<BindingPath>().map_err(|e| e.to_string())?;
        Ok(Self {
            workload: workload.to_string(),
            path,
            original_runtime: original.to_string(),
        })
    }
}

/// A record line from a ledger file, parsed or not
#[derive(Debug)]
pub struct LedgerRecord {
    /// 1-based line number
    pub line: usize,
    /// The parsed entry, or why the line could not be parsed
    pub parsed: Result<LedgerEntry, Error>,
}

/// Everything read back from a ledger file
#[derive(Debug, Default)]
pub struct LedgerContents {
    /// Namespace recorded in the header comment, if present
    pub namespace: Option<String>,
    /// Record lines in file order
    pub records: Vec<LedgerRecord>,
}

/// Parse ledger text. Never fails; malformed lines become error records.
pub fn parse_ledger(text: &str) -> LedgerContents {
    let mut contents = LedgerContents::default();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            if contents.namespace.is_none() {
                contents.namespace = comment
                    .split_whitespace()
                    .find_map(|token| token.strip_prefix(HEADER_NAMESPACE_KEY))
                    .filter(|ns| !ns.is_empty())
                    .map(str::to_string);
            }
            continue;
        }

        let line_no = idx + 1;
        contents.records.push(LedgerRecord {
            line: line_no,
            parsed: line.parse().map_err(|message| Error::LedgerRecord {
                line: line_no,
                message,
            }),
        });
    }

    contents
}

/// Read and parse a ledger file
pub fn read_ledger(path: &Path) -> Result<LedgerContents, Error> {
    let text = fs::read_to_string(path).map_err(|e| Error::ledger(path, e.to_string()))?;
    Ok(parse_ledger(&text))
}

/// Append-only ledger handle for one apply session
#[derive(Debug)]
pub struct BackupLedger {
    path: PathBuf,
    rollback_script: PathBuf,
    file: File,
    entries: usize,
}

impl BackupLedger {
    /// Create a new ledger in `dir` for `namespace`.
    ///
    /// The directory is created if needed. The file name embeds the namespace
    /// and `now`; an existing file is never reused.
    pub fn open(dir: &Path, namespace: &str, now: DateTime<Utc>) -> Result<Self, Error> {
        fs::create_dir_all(dir)
            .map_err(|e| Error::ledger(dir, format!("cannot create backup directory: {}", e)))?;
        let dir = fs::canonicalize(dir).map_err(|e| Error::ledger(dir, e.to_string()))?;

        let stamp = now.format("%Y%m%d-%H%M%S");
        let (path, mut file) =
            create_unique(&dir, &format!("{}-{}-{}", LEDGER_PREFIX, namespace, stamp))?;

        writeln!(
            file,
            "# runway backup {}{} created={}",
            HEADER_NAMESPACE_KEY,
            namespace,
            now.to_rfc3339()
        )
        .and_then(|_| file.sync_all())
        .map_err(|e| Error::ledger(&path, e.to_string()))?;

        let rollback_script = write_rollback_script(&path, namespace)?;

        info!(
            ledger = %path.display(),
            rollback = %rollback_script.display(),
            "opened backup ledger"
        );

        Ok(Self {
            path,
            rollback_script,
            file,
            entries: 0,
        })
    }

    /// Append one record; returns once it is on disk.
    pub fn append(&mut self, entry: &LedgerEntry) -> Result<(), Error> {
        let fields = [entry.workload.as_str(), entry.original_runtime.as_str()];
        if fields
            .iter()
            .any(|f| f.is_empty() || f.contains(['\t', '\n', '\r']))
        {
            return Err(Error::validation(format!(
                "ledger record for {} contains an empty field or a separator",
                entry.workload
            )));
        }

        writeln!(self.file, "{}", entry)
            .and_then(|_| self.file.flush())
            .and_then(|_| self.file.sync_data())
            .map_err(|e| Error::ledger(&self.path, e.to_string()))?;

        self.entries += 1;
        debug!(ledger = %self.path.display(), record = %entry, "recorded backup entry");
        Ok(())
    }

    /// Path of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the companion rollback script
    pub fn rollback_script(&self) -> &Path {
        &self.rollback_script
    }

    /// Number of records appended in this session
    pub fn len(&self) -> usize {
        self.entries
    }

    /// True when nothing has been appended yet
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

fn create_unique(dir: &Path, stem: &str) -> Result<(PathBuf, File), Error> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{}.{}", stem, LEDGER_EXTENSION)
        } else {
            format!("{}-{}.{}", stem, attempt, LEDGER_EXTENSION)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(Error::ledger(&path, e.to_string())),
        }
    }
    Err(Error::ledger(dir, format!("no free ledger name for {}", stem)))
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn write_rollback_script(ledger: &Path, namespace: &str) -> Result<PathBuf, Error> {
    let stem = ledger
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| LEDGER_PREFIX.to_string());
    let script = ledger.with_file_name(format!("{}{}", stem, ROLLBACK_SCRIPT_SUFFIX));

    let body = format!(
        "#!/bin/sh\n\
         # Restores the InferenceService runtime bindings recorded in {ledger}\n\
         exec \"${{RUNWAY_BIN:-runway}}\" rollback --file {file} --namespace {ns} \"$@\"\n",
        ledger = ledger.display(),
        file = shell_quote(&ledger.to_string_lossy()),
        ns = shell_quote(namespace),
    );
    fs::write(&script, body).map_err(|e| Error::ledger(&script, e.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
            .map_err(|e| Error::ledger(&script, e.to_string()))?;
    }

    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(workload: &str, path: BindingPath, original: &str) -> LedgerEntry {
        LedgerEntry {
            workload: workload.to_string(),
            path,
            original_runtime: original.to_string(),
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
    }

    #[test]
    fn entry_serializes_as_tab_separated_line() {
        let e = entry("vllm-cuda-raw", BindingPath::ModelScoped, "vllm-cuda-raw");
        assert_eq!(
            e.to_string(),
            "vllm-cuda-raw\t/spec/predictor/model/runtime\tvllm-cuda-raw"
        );
    }

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let text = "# runway backup namespace=demo created=x\n\
                    \n\
                    a\t/spec/predictor/model/runtime\told-a\n\
                    # trailing note\n\
                    b\t/spec/predictor/runtime\told-b\n";
        let contents = parse_ledger(text);

        assert_eq!(contents.namespace.as_deref(), Some("demo"));
        assert_eq!(contents.records.len(), 2);
        assert_eq!(contents.records[0].line, 3);
        assert_eq!(
            contents.records[1].parsed.as_ref().unwrap(),
            &entry("b", BindingPath::PredictorScoped, "old-b")
        );
    }

    #[test]
    fn parse_keeps_malformed_lines_as_errors() {
        let text = "a\t/spec/predictor/model/runtime\n\
                    b\t/spec/wrong\tx\n\
                    c\t/spec/predictor/runtime\tok\n";
        let contents = parse_ledger(text);

        assert_eq!(contents.namespace, None);
        assert!(contents.records[0].parsed.is_err());
        assert!(contents.records[1].parsed.is_err());
        assert!(contents.records[2].parsed.is_ok());
    }

    #[test]
    fn empty_ledger_has_no_records() {
        assert!(parse_ledger("").records.is_empty());
        assert!(parse_ledger("# only a header\n").records.is_empty());
    }

    #[test]
    fn open_creates_ledger_with_header_and_script() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = BackupLedger::open(&dir.path().join("backups"), "demo", fixed_time()).unwrap();

        let name = ledger
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert_eq!(name, "runway-backup-demo-20261016-093000.tsv");
        assert!(ledger.is_empty());

        let text = fs::read_to_string(ledger.path()).unwrap();
        assert!(text.starts_with("# runway backup namespace=demo created=2026-10-16T09:30:00"));

        let script = fs::read_to_string(ledger.rollback_script()).unwrap();
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("rollback --file '"));
        assert!(script.contains("--namespace 'demo'"));
        assert!(ledger
            .rollback_script()
            .to_string_lossy()
            .ends_with("runway-backup-demo-20261016-093000.rollback.sh"));
    }

    #[test]
    fn open_never_reuses_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = BackupLedger::open(dir.path(), "demo", fixed_time()).unwrap();
        let second = BackupLedger::open(dir.path(), "demo", fixed_time()).unwrap();

        assert_ne!(first.path(), second.path());
        assert!(second
            .path()
            .to_string_lossy()
            .ends_with("runway-backup-demo-20261016-093000-1.tsv"));
        assert_ne!(first.rollback_script(), second.rollback_script());
    }

    #[test]
    fn appended_records_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = BackupLedger::open(dir.path(), "demo", fixed_time()).unwrap();

        ledger
            .append(&entry("a", BindingPath::ModelScoped, "old-a"))
            .unwrap();
        ledger
            .append(&entry("b", BindingPath::PredictorScoped, "old-b"))
            .unwrap();
        assert_eq!(ledger.len(), 2);

        let contents = read_ledger(ledger.path()).unwrap();
        assert_eq!(contents.namespace.as_deref(), Some("demo"));
        let entries: Vec<_> = contents
            .records
            .into_iter()
            .map(|r| r.parsed.unwrap())
            .collect();
        assert_eq!(
            entries,
            vec![
                entry("a", BindingPath::ModelScoped, "old-a"),
                entry("b", BindingPath::PredictorScoped, "old-b"),
            ]
        );
    }

    #[test]
    fn append_rejects_separator_in_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = BackupLedger::open(dir.path(), "demo", fixed_time()).unwrap();
        assert!(ledger
            .append(&entry("a\tb", BindingPath::ModelScoped, "x"))
            .is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn uncreatable_directory_is_a_ledger_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let err = BackupLedger::open(&blocker.join("backups"), "demo", fixed_time()).unwrap_err();
        assert!(matches!(err, Error::Ledger { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn missing_ledger_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_ledger(&dir.path().join("absent.tsv")).is_err());
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
