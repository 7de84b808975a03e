//! 입력 어댑터
//!
//! - [`ChannelInput`]: 임베딩용. 외부에서 보낸 원시 메시지를 그대로 전달합니다.
//! - [`FileInput`]: 파일을 한 줄씩 읽고 끝에 도달하면 종료합니다.
//! - [`StdinInput`]: 표준 입력을 한 줄씩 읽습니다.

pub mod file;

pub use file::{FileInput, StdinInput};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio::sync::mpsc;

use shoal_core::error::AdapterError;
use shoal_core::{BoxFuture, Input, RawMessage};

/// 기본 최대 라인 길이 (바이트)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024; // 64KB

/// 채널 기반 입력 어댑터
///
/// 송신측이 모두 drop되면 입력이 끝난 것으로 봅니다.
pub struct ChannelInput {
    name: String,
    rx: mpsc::Receiver<RawMessage>,
}

impl ChannelInput {
    /// 수신 채널로 입력 어댑터를 생성합니다.
    pub fn new(rx: mpsc::Receiver<RawMessage>) -> Self {
        Self {
            name: "channel".to_owned(),
            rx,
        }
    }

    /// 미리 준비된 메시지 목록을 순서대로 내보내는 입력을 생성합니다.
    pub fn preloaded<I, T>(messages: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<bytes::Bytes>,
    {
        let messages: Vec<RawMessage> = messages
            .into_iter()
            .map(|data| RawMessage::new(data, "preloaded"))
            .collect();
        let (tx, rx) = mpsc::channel(messages.len().max(1));
        for message in messages {
            // 용량이 메시지 수 이상이므로 실패하지 않음
            let _ = tx.try_send(message);
        }
        Self::new(rx)
    }

    /// 어댑터 이름을 지정합니다.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Input for ChannelInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) -> BoxFuture<'_, Result<(), AdapterError>> {
        Box::pin(async { Ok(()) })
    }

    fn retrieve(
        self: Box<Self>,
        tx: mpsc::Sender<RawMessage>,
    ) -> BoxFuture<'static, Result<(), AdapterError>> {
        let mut rx = self.rx;
        Box::pin(async move {
            while let Some(message) = rx.recv().await {
                if tx.send(message).await.is_err() {
                    break;
                }
            }
            Ok(())
        })
    }
}

/// 줄 단위로 읽어 원시 메시지로 보냅니다.
///
/// 줄 끝의 `\n`, `\r\n`은 제거하고 빈 줄과 `max_line_length`를 넘는 줄은 건너뜁니다.
/// 한 줄에 대해 버퍼링하는 양은 `max_line_length`에 줄 끝 2바이트를 더한 만큼으로
/// 제한되며, 넘치는 나머지는 버퍼에 담지 않고 버립니다.
/// 수신측이 닫히면 읽기를 멈춥니다. 보낸 메시지 수를 반환합니다.
pub(crate) async fn forward_lines<R>(
    mut reader: R,
    adapter: &str,
    source: &str,
    max_line_length: usize,
    tx: &mpsc::Sender<RawMessage>,
) -> Result<u64, AdapterError>
where
    R: AsyncBufRead + Unpin,
{
    let io_error = |e: std::io::Error| AdapterError::Io {
        adapter: adapter.to_owned(),
        source: e,
    };
    let limit = (max_line_length as u64).saturating_add(2);
    let mut buf = Vec::with_capacity(1024);
    let mut sent = 0u64;

    loop {
        buf.clear();
        let n = (&mut reader)
            .take(limit)
            .read_until(b'\n', &mut buf)
            .await
            .map_err(io_error)?;
        if n == 0 {
            break;
        }

        if buf.last() != Some(&b'\n') && n as u64 == limit {
            let discarded = discard_line(&mut reader).await.map_err(io_error)?;
            tracing::warn!(
                adapter,
                len = n as u64 + discarded,
                max = max_line_length,
                "skipping oversized line"
            );
            continue;
        }

        let line = trim_line_ending(&buf);
        if line.is_empty() {
            continue;
        }
        if line.len() > max_line_length {
            tracing::warn!(
                adapter,
                len = line.len(),
                max = max_line_length,
                "skipping oversized line"
            );
            continue;
        }

        let message = RawMessage::new(bytes::Bytes::copy_from_slice(line), source);
        if tx.send(message).await.is_err() {
            tracing::debug!(adapter, "raw message queue closed, stopping input");
            break;
        }
        sent += 1;
    }

    Ok(sent)
}

/// 다음 `\n`까지 (포함) 버퍼링 없이 건너뜁니다. 버린 바이트 수를 반환합니다.
async fn discard_line<R>(reader: &mut R) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut discarded = 0u64;
    loop {
        let (used, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(discarded);
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(used);
        discarded += used as u64;
        if done {
            return Ok(discarded);
        }
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
