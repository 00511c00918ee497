use chrono::{
    NaiveDate,
    Utc,
};
use std::{
    fs::{
        self,
        File,
        OpenOptions,
    },
    io::{
        self,
        Write as _,
    },
    path::{
        Path,
        PathBuf,
    },
    sync::{
        Mutex,
        PoisonError,
    },
};
use tracing_subscriber::fmt::MakeWriter;

/// Append-only log stream with one file per UTC calendar day
/// (`<dir>/<prefix>_YYYYMMDD.log`).
///
/// The current date is re-resolved on every append; the date check and the
/// handle swap happen under the same lock so a write can never land in the
/// previous day's file once the date has moved on.
#[derive(Debug)]
pub struct DailyLogSink {
    dir: PathBuf,
    prefix: String,
    current: Mutex<Option<OpenLog>>,
}

#[derive(Debug)]
struct OpenLog {
    date: NaiveDate,
    file: File,
}

impl DailyLogSink {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl ToString) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.to_string(),
            current: Default::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}_{}.log", self.prefix, date.format("%Y%m%d")))
    }

    pub fn append(&self, bytes: &[u8]) -> io::Result<()> {
        self.append_at(Utc::now().date_naive(), bytes)
    }

    pub fn append_at(&self, date: NaiveDate, bytes: &[u8]) -> io::Result<()> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        if !matches!(current.as_ref(), Some(log) if log.date == date) {
            // Drop the stale handle before opening the next day's file.
            *current = None;
            fs::create_dir_all(&self.dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path_for(date))?;
            *current = Some(OpenLog { date, file });
        }

        if let Some(log) = current.as_mut() {
            log.file.write_all(bytes)?;
            log.file.flush()?;
        }
        Ok(())
    }
}

/// Writer handed out to `tracing_subscriber::fmt` layers.
pub struct DailyLogWriter<'a>(&'a DailyLogSink);

impl io::Write for DailyLogWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for DailyLogSink {
    type Writer = DailyLogWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        DailyLogWriter(self)
    }
}
