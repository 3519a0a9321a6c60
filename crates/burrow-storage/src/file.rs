use async_trait::async_trait;
use burrow_core::error::{Result, StorageError};
use burrow_core::{KeyedUrl, OwnerId, Repository, Resolution, ShortCode, Stats};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// One line of the append-only log.
///
/// `user_id` was added after the three-field format; lines without it
/// load with owner `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LogRecord {
    uuid: String,
    short_url: String,
    original_url: String,
    #[serde(default)]
    user_id: OwnerId,
}

impl LogRecord {
    fn new(code: &ShortCode, original_url: &str, owner: OwnerId) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            short_url: code.as_str().to_owned(),
            original_url: original_url.to_owned(),
            user_id: owner,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    original_url: String,
    owner: OwnerId,
}

/// Forward and reverse maps, kept in step with each other.
#[derive(Debug, Default)]
struct Index {
    by_code: HashMap<String, Entry>,
    by_url: HashMap<String, String>,
}

impl Index {
    /// Last write for a key wins.
    fn apply(&mut self, record: LogRecord) {
        let entry = Entry {
            original_url: record.original_url.clone(),
            owner: record.user_id,
        };

        if let Some(previous) = self.by_code.insert(record.short_url.clone(), entry) {
            if self.by_url.get(&previous.original_url) == Some(&record.short_url) {
                self.by_url.remove(&previous.original_url);
            }
        }
        self.by_url.insert(record.original_url, record.short_url);
    }

    fn check(&self, code: &str, original_url: &str) -> Result<()> {
        if self.by_url.contains_key(original_url) {
            return Err(StorageError::DuplicateUrl(original_url.to_owned()));
        }
        if self.by_code.contains_key(code) {
            return Err(StorageError::KeyConflict(code.to_owned()));
        }
        Ok(())
    }
}

struct State {
    index: Index,
    log: Log<File>,
}

/// Cutting a log back to a known length.
#[async_trait]
trait Truncate {
    async fn truncate(&mut self, len: u64) -> std::io::Result<()>;
}

#[async_trait]
impl Truncate for File {
    async fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len).await
    }
}

/// Write side of the log.
///
/// `len` is the length of the committed records. A failed append is cut
/// back to it so the next record starts on a fresh line; if that cut fails
/// too the log refuses every later write.
struct Log<W> {
    file: W,
    len: u64,
    poisoned: bool,
}

impl<W> Log<W>
where
    W: AsyncWrite + Truncate + Unpin + Send,
{
    fn new(file: W, len: u64) -> Self {
        Self {
            file,
            len,
            poisoned: false,
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.poisoned {
            return Err(StorageError::Unavailable(
                "storage log was left in an unknown state by a failed write".into(),
            ));
        }
        Ok(())
    }

    async fn append(&mut self, records: &[LogRecord]) -> Result<()> {
        self.check_writable()?;

        let mut bytes = Vec::new();
        for record in records {
            serde_json::to_writer(&mut bytes, record)
                .map_err(|e| StorageError::InvalidData(e.to_string()))?;
            bytes.push(b'\n');
        }

        let written: std::io::Result<()> = async {
            self.file.write_all(&bytes).await?;
            self.file.flush().await
        }
        .await;

        if let Err(err) = written {
            warn!(error = %err, len = self.len, "append failed, cutting the log back");
            if let Err(cut) = self.file.truncate(self.len).await {
                error!(error = %cut, "failed to cut the log back, refusing further writes");
                self.poisoned = true;
            }
            return Err(err.into());
        }

        self.len += bytes.len() as u64;
        Ok(())
    }
}

/// In-memory repository persisted to an append-only JSON-lines file.
///
/// A single reader/writer lock guards both the map and the log handle:
/// lookups run in parallel, a write excludes everything else. Every write
/// reaches the log before the map is touched, so a crash in between is
/// repaired by the replay on the next start.
///
/// Soft deletion is not supported; [`Repository::delete_batch`] returns
/// [`StorageError::Unsupported`].
pub struct FileRepository {
    path: PathBuf,
    state: RwLock<State>,
}

impl std::fmt::Debug for FileRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRepository")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileRepository {
    /// Opens (creating if needed) the log at `path` and replays it.
    ///
    /// A malformed line aborts the open with [`StorageError::InvalidData`],
    /// except for a torn final line left by an interrupted append, which
    /// is cut off.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        info!(path = %path.display(), "opening file storage");

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let mut index = Index::default();
        let replay = replay(&path, &mut index).await?;

        match replay.tail {
            Tail::Clean => {}
            Tail::MissingNewline => log.write_all(b"\n").await?,
            Tail::Torn => {
                warn!(
                    path = %path.display(),
                    valid_bytes = replay.valid_len,
                    "dropping torn record at the end of the storage file"
                );
                log.set_len(replay.valid_len).await?;
            }
        }
        log.flush().await?;
        let len = log.metadata().await?.len();

        info!(
            path = %path.display(),
            records = replay.records,
            entries = index.by_code.len(),
            "replayed file storage"
        );

        Ok(Self {
            path,
            state: RwLock::new(State {
                index,
                log: Log::new(log, len),
            }),
        })
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live entries in the map.
    pub async fn len(&self) -> usize {
        self.state.read().await.index.by_code.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

enum Tail {
    Clean,
    MissingNewline,
    Torn,
}

struct Replay {
    records: usize,
    valid_len: u64,
    tail: Tail,
}

async fn replay(path: &Path, index: &mut Index) -> Result<Replay> {
    let mut reader = BufReader::new(File::open(path).await?);
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    let mut offset = 0u64;
    let mut replay = Replay {
        records: 0,
        valid_len: 0,
        tail: Tail::Clean,
    };

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            break;
        }
        line_no += 1;
        offset += read as u64;
        let complete = buf.last() == Some(&b'\n');

        let line = buf.trim_ascii();
        if !line.is_empty() {
            match serde_json::from_slice::<LogRecord>(line) {
                Ok(record) => {
                    trace!(short_url = %record.short_url, line = line_no, "replaying record");
                    index.apply(record);
                    replay.records += 1;
                }
                // only the final line can be torn, and it has no newline
                Err(err) if !complete => {
                    debug!(line = line_no, error = %err, "unparsable final line");
                    replay.tail = Tail::Torn;
                    break;
                }
                Err(err) => {
                    return Err(StorageError::InvalidData(format!(
                        "{}:{}: {}",
                        path.display(),
                        line_no,
                        err
                    )));
                }
            }
        }

        replay.valid_len = offset;
        if !complete {
            replay.tail = Tail::MissingNewline;
        }
    }

    Ok(replay)
}

#[async_trait]
impl Repository for FileRepository {
    async fn add_url(&self, code: &ShortCode, original_url: &str, owner: OwnerId) -> Result<()> {
        let mut state = self.state.write().await;
        let State { index, log } = &mut *state;

        index.check(code.as_str(), original_url)?;

        let record = LogRecord::new(code, original_url, owner);
        log.append(std::slice::from_ref(&record)).await?;
        index.apply(record);

        debug!(code = %code, owner, "stored short url");
        Ok(())
    }

    async fn add_batch(&self, entries: &[KeyedUrl], owner: OwnerId) -> Result<()> {
        let mut state = self.state.write().await;
        let State { index, log } = &mut *state;

        let mut codes = HashSet::with_capacity(entries.len());
        let mut urls = HashSet::with_capacity(entries.len());
        for entry in entries {
            index.check(entry.code.as_str(), &entry.original_url)?;
            if !urls.insert(entry.original_url.as_str()) {
                return Err(StorageError::DuplicateUrl(entry.original_url.clone()));
            }
            if !codes.insert(entry.code.as_str()) {
                return Err(StorageError::KeyConflict(entry.code.to_string()));
            }
        }

        let records: Vec<LogRecord> = entries
            .iter()
            .map(|entry| LogRecord::new(&entry.code, &entry.original_url, owner))
            .collect();
        log.append(&records).await?;
        for record in records {
            index.apply(record);
        }

        debug!(count = entries.len(), owner, "stored short url batch");
        Ok(())
    }

    async fn get_url(&self, code: &ShortCode) -> Result<Resolution> {
        let state = self.state.read().await;
        Ok(match state.index.by_code.get(code.as_str()) {
            Some(entry) => Resolution::Active(entry.original_url.clone()),
            None => Resolution::NotFound,
        })
    }

    async fn get_short_url(&self, original_url: &str) -> Result<Option<ShortCode>> {
        let state = self.state.read().await;
        Ok(state
            .index
            .by_url
            .get(original_url)
            .map(ShortCode::new_unchecked))
    }

    async fn get_all_urls(&self, owner: OwnerId) -> Result<Vec<KeyedUrl>> {
        let state = self.state.read().await;
        Ok(state
            .index
            .by_code
            .iter()
            .filter(|(_, entry)| entry.owner == owner)
            .map(|(code, entry)| {
                KeyedUrl::new(ShortCode::new_unchecked(code), entry.original_url.clone())
            })
            .collect())
    }

    async fn delete_batch(&self, _codes: &[ShortCode], _owner: OwnerId) -> Result<u64> {
        Err(StorageError::Unsupported("delete_batch"))
    }

    async fn stats(&self) -> Result<Stats> {
        let state = self.state.read().await;
        let users: HashSet<OwnerId> = state.index.by_code.values().map(|e| e.owner).collect();
        Ok(Stats {
            urls: state.index.by_code.len() as u64,
            users: users.len() as u64,
        })
    }

    async fn ping(&self) -> Result<()> {
        self.state.read().await.log.check_writable()?;
        tokio::fs::metadata(&self.path)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Unavailable(format!("{}: {e}", self.path.display())))
    }
}
