use std::collections::VecDeque;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncSeekExt;
use tokio::time::sleep;
use tokio::time::Instant;

use super::EventMatch;
use super::EventWatch;
use super::WatchFactory;
use crate::config::WatchConfig;
use crate::Result;
use crate::VerifyError;

/// Tails a log file from the armed offset and regex-matches complete lines.
///
/// Only whole lines are examined; a trailing fragment without a newline stays
/// in the file until its newline arrives. If the file shrinks below the
/// watched offset the watcher assumes rotation and restarts from the top.
pub struct LogTailWatcher {
    path: PathBuf,
    poll_interval: Duration,
    state: Mutex<TailState>,
}

struct TailState {
    offset: u64,
    patterns: Vec<(String, Regex)>,
    pending: VecDeque<String>,
}

impl LogTailWatcher {
    pub fn new(
        path: PathBuf,
        poll_interval: Duration,
    ) -> Self {
        Self {
            path,
            poll_interval,
            state: Mutex::new(TailState {
                offset: 0,
                patterns: Vec::new(),
                pending: VecDeque::new(),
            }),
        }
    }

    fn compile(patterns: &[String]) -> Result<Vec<(String, Regex)>> {
        patterns
            .iter()
            .map(|p| Ok((p.clone(), Regex::new(p).map_err(VerifyError::Pattern)?)))
            .collect()
    }

    /// Reads every complete line that appeared since the watched offset and
    /// advances the offset past them.
    async fn drain_new_lines(&self) -> Result<Vec<String>> {
        let offset = self.state.lock().offset;
        let mut file = File::open(&self.path).await.map_err(VerifyError::StreamIo)?;
        let len = file.metadata().await.map_err(VerifyError::StreamIo)?.len();

        // File shrank below the watch position: rotated, start over.
        let offset = if len < offset { 0 } else { offset };
        if len == offset {
            self.state.lock().offset = offset;
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(VerifyError::StreamIo)?;
        let mut buf = Vec::with_capacity((len - offset) as usize);
        file.read_to_end(&mut buf).await.map_err(VerifyError::StreamIo)?;

        let mut lines = Vec::new();
        let mut consumed = 0u64;
        for chunk in buf.split_inclusive(|b| *b == b'\n') {
            if chunk.ends_with(b"\n") {
                consumed += chunk.len() as u64;
                let line = String::from_utf8_lossy(&chunk[..chunk.len() - 1]);
                lines.push(line.trim_end_matches('\r').to_string());
            }
        }
        self.state.lock().offset = offset + consumed;
        Ok(lines)
    }

    /// Next unexamined line, buffering a freshly drained batch if needed.
    async fn next_line(&self) -> Result<Option<String>> {
        if let Some(line) = self.state.lock().pending.pop_front() {
            return Ok(Some(line));
        }
        let lines = self.drain_new_lines().await?;
        if lines.is_empty() {
            return Ok(None);
        }
        let mut state = self.state.lock();
        state.pending.extend(lines);
        Ok(state.pending.pop_front())
    }

    fn match_line(
        &self,
        line: &str,
    ) -> Option<EventMatch> {
        let state = self.state.lock();
        state.patterns.iter().find_map(|(pattern, regex)| {
            regex.is_match(line).then(|| EventMatch {
                pattern: pattern.clone(),
                line: line.to_string(),
            })
        })
    }
}

#[async_trait]
impl EventWatch for LogTailWatcher {
    async fn arm(&self) -> Result<()> {
        let len = tokio::fs::metadata(&self.path)
            .await
            .map_err(VerifyError::StreamIo)?
            .len();
        let mut state = self.state.lock();
        state.offset = len;
        state.pending.clear();
        Ok(())
    }

    fn set_patterns(
        &self,
        patterns: &[String],
    ) -> Result<()> {
        let compiled = Self::compile(patterns)?;
        self.state.lock().patterns = compiled;
        Ok(())
    }

    fn add_patterns(
        &self,
        patterns: &[String],
    ) -> Result<()> {
        let mut compiled = Self::compile(patterns)?;
        self.state.lock().patterns.append(&mut compiled);
        Ok(())
    }

    async fn look_one(
        &self,
        timeout: Duration,
    ) -> Result<Option<EventMatch>> {
        let deadline = Instant::now() + timeout;
        loop {
            while let Some(line) = self.next_line().await? {
                if let Some(matched) = self.match_line(&line) {
                    return Ok(Some(matched));
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            sleep(self.poll_interval.min(deadline.saturating_duration_since(now))).await;
        }
    }

    async fn look_all(
        &self,
        timeout: Duration,
    ) -> Result<Vec<EventMatch>> {
        // Snapshot so each pattern is required to match exactly once within
        // this call; the configured set itself is left intact.
        let mut remaining = self.state.lock().patterns.clone();
        if remaining.is_empty() {
            return Ok(Vec::new());
        }
        let mut matches = Vec::new();
        let deadline = Instant::now() + timeout;
        loop {
            while let Some(line) = self.next_line().await? {
                if let Some(idx) = remaining.iter().position(|(_, regex)| regex.is_match(&line)) {
                    let (pattern, _) = remaining.remove(idx);
                    matches.push(EventMatch { pattern, line });
                    if remaining.is_empty() {
                        return Ok(matches);
                    }
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(VerifyError::WatchTimeout {
                    waited: timeout,
                    unmatched: remaining.into_iter().map(|(pattern, _)| pattern).collect(),
                }
                .into());
            }
            sleep(self.poll_interval.min(deadline.saturating_duration_since(now))).await;
        }
    }
}

/// Hands out [`LogTailWatcher`]s over the configured log file.
pub struct LogTailFactory {
    path: PathBuf,
    poll_interval: Duration,
}

impl LogTailFactory {
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            path: PathBuf::from(&config.log_file),
            poll_interval: config.poll_interval(),
        }
    }
}

impl WatchFactory for LogTailFactory {
    fn new_watch(&self) -> Arc<dyn EventWatch> {
        Arc::new(LogTailWatcher::new(self.path.clone(), self.poll_interval))
    }
}
