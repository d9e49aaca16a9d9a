//! CSV-backed implementation of the append-only record store.

use crate::{BlockRecord, FIELD_NAMES, StoreError};
use csv::StringRecord;
use std::{
    fmt, fs,
    fs::{File, OpenOptions},
    io::{self, BufReader, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, trace, warn};

/// Writer-side interface to the record store.
///
/// Implementations must guarantee that a record accepted by
/// [`RecordStorage::append`] is durable before the call returns, and that
/// heights are only ever accepted in contiguous order.
pub trait RecordStorage {
    /// The highest committed height, or 0 if the store is empty.
    fn last_height(&self) -> u64;

    /// The most recently committed record, if any.
    ///
    /// Used by the ingestion loop as the predecessor cache when deriving
    /// `time_since_prev_block`, so the derived field always reflects what was
    /// actually persisted.
    fn last_record(&self) -> Option<BlockRecord>;

    /// Appends `record` to the store.
    ///
    /// Fails with [`StoreError::Ordering`] unless
    /// `record.height == last_height() + 1`, leaving the store unchanged.
    fn append(&mut self, record: BlockRecord) -> Result<(), StoreError>;
}

/// An append-only store persisting one CSV row per committed height.
///
/// Exactly one writer is expected; readers open their own handle via
/// [`CsvStore::read_all`]. Each accepted row is written with a single
/// `write_all` and fsynced before `append` returns, so readers never observe
/// a torn record and a crash after a successful append cannot lose it.
#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    file: File,
    last: Option<BlockRecord>,
}

impl CsvStore {
    /// Opens the store at `path`, creating and initializing it if absent.
    ///
    /// An existing file has its header validated against [`FIELD_NAMES`]
    /// (failing with [`StoreError::Schema`] on mismatch) and is scanned to
    /// recover the resume state. A partial trailing row left by a crash
    /// mid-append is truncated away during the scan.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let needs_init = match fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(err) if err.kind() == io::ErrorKind::NotFound => true,
            Err(err) => return Err(err.into()),
        };

        if needs_init {
            let mut file =
                OpenOptions::new().create(true).write(true).truncate(true).open(&path)?;
            file.write_all(header_line().as_bytes())?;
            file.sync_data()?;
            debug!(target: "store", path = %path.display(), "initialized empty record store");
        }

        let last = if needs_init { None } else { recover(&path)? };
        let file = OpenOptions::new().append(true).open(&path)?;
        Ok(Self { path, file, last })
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazily reads every committed record in height order.
    ///
    /// Opens an independent read handle, so it is safe while a writer is
    /// live; the snapshot covers whatever was committed at open time.
    pub fn read_all(&self) -> Result<Records, StoreError> {
        Self::open_read_only(&self.path)
    }

    /// Opens a read-only view of the store at `path`.
    ///
    /// Takes no write handle and never repairs the file, so read-side
    /// consumers cannot mutate the store. A torn trailing row left by a
    /// crashed writer is skipped by the iterator; truncating it is the
    /// writer's job at [`CsvStore::open`].
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Records, StoreError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        check_header(rdr.headers()?)?;
        Ok(Records { inner: rdr.into_deserialize() })
    }
}

impl RecordStorage for CsvStore {
    fn last_height(&self) -> u64 {
        self.last.as_ref().map_or(0, |record| record.height)
    }

    fn last_record(&self) -> Option<BlockRecord> {
        self.last.clone()
    }

    fn append(&mut self, record: BlockRecord) -> Result<(), StoreError> {
        let expected = self.last_height() + 1;
        if record.height != expected {
            return Err(StoreError::Ordering { expected, got: record.height });
        }

        let mut buf = Vec::new();
        {
            let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(&mut buf);
            wtr.serialize(&record)?;
            wtr.flush()?;
        }
        // A single write keeps concurrent readers from observing a torn row.
        self.file.write_all(&buf)?;
        self.file.sync_data()?;

        trace!(target: "store", height = record.height, "appended record");
        self.last = Some(record);
        Ok(())
    }
}

/// Lazy iterator over the committed records, ordered by height.
pub struct Records {
    inner: csv::DeserializeRecordsIntoIter<BufReader<File>, BlockRecord>,
}

impl Iterator for Records {
    type Item = Result<BlockRecord, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next()? {
            Ok(record) => Some(Ok(record)),
            Err(err) if err.is_io_error() => Some(Err(err.into())),
            // With a single append-only writer, a row that fails to parse
            // can only be a torn tail; everything committed precedes it.
            Err(err) => {
                warn!(target: "store", %err, "stopping at partial trailing row");
                None
            }
        }
    }
}

impl fmt::Debug for Records {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Records").finish_non_exhaustive()
    }
}

fn header_line() -> String {
    let mut line = FIELD_NAMES.join(",");
    line.push('\n');
    line
}

fn check_header(found: &StringRecord) -> Result<(), StoreError> {
    let expected = StringRecord::from(FIELD_NAMES.to_vec());
    if *found == expected {
        Ok(())
    } else {
        Err(StoreError::Schema {
            expected: FIELD_NAMES.join(","),
            found: found.iter().collect::<Vec<_>>().join(","),
        })
    }
}

/// Scans an existing file, returning the last fully committed record.
///
/// Trailing bytes that do not parse as a complete row are truncated so a
/// restart never resumes on top of a half-written record. Parsing alone
/// cannot vouch for the final row: a tear at a field boundary still parses,
/// with the optional last column reading back as empty. The last row is
/// therefore held back until either a successor row or its on-disk `\n`
/// terminator proves the append completed.
fn recover(path: &Path) -> Result<Option<BlockRecord>, StoreError> {
    let file_len = fs::metadata(path)?.len();
    let reader = BufReader::new(File::open(path)?);
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    check_header(&headers)?;

    let mut last = None;
    let mut valid_end = rdr.position().byte();
    let mut pending: Option<(BlockRecord, u64)> = None;
    let mut raw = StringRecord::new();
    loop {
        match rdr.read_record(&mut raw) {
            Ok(false) => break,
            Ok(true) => match raw.deserialize::<BlockRecord>(Some(&headers)) {
                Ok(record) => {
                    if let Some((committed, end)) = pending.take() {
                        last = Some(committed);
                        valid_end = end;
                    }
                    pending = Some((record, rdr.position().byte()));
                }
                Err(_) => break,
            },
            Err(_) => break,
        }
    }
    if let Some((record, end)) = pending {
        if row_terminated(path, end)? {
            last = Some(record);
            valid_end = end;
        }
    }

    if valid_end < file_len {
        warn!(
            target: "store",
            path = %path.display(),
            dropped = file_len - valid_end,
            "truncating partial trailing row left by an interrupted append"
        );
        OpenOptions::new().write(true).open(path)?.set_len(valid_end)?;
    }

    Ok(last)
}

/// Whether the row ending at byte offset `end` carries its `\n` terminator.
fn row_terminated(path: &Path, end: u64) -> Result<bool, StoreError> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(end - 1))?;
    let mut byte = [0u8; 1];
    file.read_exact(&mut byte)?;
    Ok(byte[0] == b'\n')
}
