//! Prompt detection on a child's output stream.

use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Prompt text that triggers sending the password. Matched case-insensitively.
pub const PASSWORD_PROMPT: &str = "password:";

const READ_BUF_SIZE: usize = 4096;

/// What ended a wait on the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMatch {
    /// The password prompt appeared.
    Prompt,
    /// The stream reached end of output.
    Eof,
    /// Neither happened before the deadline.
    Timeout,
}

/// Scans an output stream for the password prompt.
///
/// The scan is incremental: a prompt split across two reads is still
/// found. When `echo` is set, every byte read is copied to stdout.
#[derive(Debug)]
pub struct PromptWatcher {
    needle: Vec<u8>,
    window: Vec<u8>,
    echo: bool,
}

impl PromptWatcher {
    pub fn new(echo: bool) -> Self {
        Self::with_prompt(PASSWORD_PROMPT, echo)
    }

    /// Watches for a custom prompt instead of [`PASSWORD_PROMPT`].
    pub fn with_prompt(prompt: &str, echo: bool) -> Self {
        Self {
            needle: prompt.to_ascii_lowercase().into_bytes(),
            window: Vec::new(),
            echo,
        }
    }

    /// Reads until the prompt appears, the stream ends, or `timeout` elapses.
    pub async fn expect_prompt<R>(
        &mut self,
        reader: &mut R,
        timeout: Duration,
    ) -> std::io::Result<PromptMatch>
    where
        R: AsyncRead + Unpin,
    {
        match tokio::time::timeout(timeout, self.scan(reader, true)).await {
            Ok(result) => result,
            Err(_) => Ok(PromptMatch::Timeout),
        }
    }

    /// Reads until the stream ends or `timeout` elapses. Prompts are ignored.
    pub async fn drain<R>(&mut self, reader: &mut R, timeout: Duration) -> std::io::Result<PromptMatch>
    where
        R: AsyncRead + Unpin,
    {
        match tokio::time::timeout(timeout, self.scan(reader, false)).await {
            Ok(result) => result,
            Err(_) => Ok(PromptMatch::Timeout),
        }
    }

    async fn scan<R>(&mut self, reader: &mut R, stop_on_prompt: bool) -> std::io::Result<PromptMatch>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = [0u8; READ_BUF_SIZE];
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => return Ok(PromptMatch::Eof),
                Ok(n) => n,
                // The pty master reports EIO once every slave fd is closed.
                Err(e) if e.raw_os_error() == Some(nix::errno::Errno::EIO as i32) => {
                    return Ok(PromptMatch::Eof);
                }
                Err(e) => return Err(e),
            };

            let chunk = &buf[..n];
            if self.echo {
                let mut stdout = std::io::stdout().lock();
                let _ = stdout.write_all(chunk);
                let _ = stdout.flush();
            }

            if stop_on_prompt && self.feed(chunk) {
                return Ok(PromptMatch::Prompt);
            }
        }
    }

    /// Appends `chunk` to the match window. Returns `true` on a prompt.
    fn feed(&mut self, chunk: &[u8]) -> bool {
        self.window
            .extend(chunk.iter().map(u8::to_ascii_lowercase));

        if self
            .window
            .windows(self.needle.len())
            .any(|w| w == self.needle.as_slice())
        {
            self.window.clear();
            return true;
        }

        let keep = self.needle.len().saturating_sub(1);
        if self.window.len() > keep {
            let cut = self.window.len() - keep;
            self.window.drain(..cut);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    const SHORT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn detects_prompt() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"user@host's password: ").await.unwrap();

        let mut watcher = PromptWatcher::new(false);
        let m = watcher.expect_prompt(&mut rx, SHORT).await.unwrap();
        assert_eq!(m, PromptMatch::Prompt);
    }

    #[tokio::test]
    async fn detects_prompt_case_insensitive() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"Password:").await.unwrap();

        let mut watcher = PromptWatcher::new(false);
        let m = watcher.expect_prompt(&mut rx, SHORT).await.unwrap();
        assert_eq!(m, PromptMatch::Prompt);
    }

    #[tokio::test]
    async fn detects_prompt_split_across_reads() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            tx.write_all(b"Pass").await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.write_all(b"WORD: ").await.unwrap();
            tx
        });

        let mut watcher = PromptWatcher::new(false);
        let m = watcher.expect_prompt(&mut rx, Duration::from_secs(2)).await.unwrap();
        assert_eq!(m, PromptMatch::Prompt);
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn eof_without_prompt() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"sending incremental file list\n").await.unwrap();
        drop(tx);

        let mut watcher = PromptWatcher::new(false);
        let m = watcher.expect_prompt(&mut rx, SHORT).await.unwrap();
        assert_eq!(m, PromptMatch::Eof);
    }

    #[tokio::test]
    async fn timeout_when_silent() {
        let (_tx, mut rx) = tokio::io::duplex(64);

        let mut watcher = PromptWatcher::new(false);
        let m = watcher.expect_prompt(&mut rx, SHORT).await.unwrap();
        assert_eq!(m, PromptMatch::Timeout);
    }

    #[tokio::test]
    async fn drain_ignores_prompts() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"password: again\n").await.unwrap();
        drop(tx);

        let mut watcher = PromptWatcher::new(false);
        let m = watcher.drain(&mut rx, SHORT).await.unwrap();
        assert_eq!(m, PromptMatch::Eof);
    }

    #[test]
    fn window_stays_bounded() {
        let mut watcher = PromptWatcher::new(false);
        for _ in 0..100 {
            assert!(!watcher.feed(b"lots of unrelated output "));
        }
        assert!(watcher.window.len() < PASSWORD_PROMPT.len());
    }

    #[test]
    fn custom_prompt() {
        let mut watcher = PromptWatcher::with_prompt("Passphrase", false);
        assert!(watcher.feed(b"Enter passphrase for key"));
    }
}
