//! 출력 어댑터
//!
//! 모든 출력은 출력 큐가 닫히고 비워질 때까지 읽습니다. 기록에 실패해도
//! 큐는 끝까지 소비하여 생산자가 막히지 않게 합니다.
//!
//! - [`ChannelOutput`]: 임베딩용. 결과를 다른 채널로 전달합니다.
//! - [`FileOutput`]: JSON Lines 파일에 기록합니다.
//! - [`StdoutOutput`]: 표준 출력에 JSON Lines로 기록합니다.

pub mod file;

pub use file::{FileOutput, StdoutOutput};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use shoal_core::error::AdapterError;
use shoal_core::metrics as m;
use shoal_core::{BoxFuture, Output, RuleOutput};

/// 채널 기반 출력 어댑터
pub struct ChannelOutput {
    tx: mpsc::Sender<RuleOutput>,
}

impl ChannelOutput {
    /// 결과를 전달할 송신측으로 어댑터를 생성합니다.
    pub fn new(tx: mpsc::Sender<RuleOutput>) -> Self {
        Self { tx }
    }

    /// 어댑터와 결과 수신측을 함께 생성합니다.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RuleOutput>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl Output for ChannelOutput {
    fn name(&self) -> &str {
        "channel"
    }

    fn sink(
        self: Box<Self>,
        mut rx: mpsc::Receiver<RuleOutput>,
    ) -> BoxFuture<'static, Result<u64, AdapterError>> {
        let tx = self.tx;
        Box::pin(async move {
            let mut forwarded = 0u64;
            let mut discarded = 0u64;
            while let Some(output) = rx.recv().await {
                if tx.is_closed() || tx.send(output).await.is_err() {
                    discarded += 1;
                    continue;
                }
                forwarded += 1;
                metrics::counter!(m::OUTPUT_RECORDS_WRITTEN_TOTAL).increment(1);
            }
            if discarded > 0 {
                tracing::warn!(discarded, "output receiver dropped, results discarded");
            }
            Ok(forwarded)
        })
    }
}

/// 결과를 JSON Lines로 기록합니다.
///
/// 직렬화에 실패한 레코드는 건너뜁니다. 쓰기에 실패하면 나머지 결과를 버리며
/// 큐를 끝까지 비운 뒤 에러를 반환합니다.
pub(crate) async fn write_json_lines<W>(
    mut writer: W,
    adapter: &str,
    mut rx: mpsc::Receiver<RuleOutput>,
    flush_each: bool,
) -> Result<u64, AdapterError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    let mut failure: Option<std::io::Error> = None;

    while let Some(output) = rx.recv().await {
        if failure.is_some() {
            continue;
        }

        let mut line = match serde_json::to_vec(&output) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(adapter, error = %e, "failed to encode output record");
                continue;
            }
        };
        line.push(b'\n');

        let result = async {
            writer.write_all(&line).await?;
            if flush_each {
                writer.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                written += 1;
                metrics::counter!(m::OUTPUT_RECORDS_WRITTEN_TOTAL).increment(1);
            }
            Err(e) => {
                tracing::error!(adapter, error = %e, "output write failed, discarding remaining results");
                failure = Some(e);
            }
        }
    }

    if failure.is_none() {
        failure = writer.flush().await.err();
    }

    match failure {
        Some(source) => Err(AdapterError::Io {
            adapter: adapter.to_owned(),
            source,
        }),
        None => Ok(written),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_core::OutputEvent;

    #[tokio::test]
    async fn channel_output_forwards_in_order() {
        let (output, mut results) = ChannelOutput::channel(8);
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(Box::new(output).sink(rx));

        for i in 0..3 {
            tx.send(OutputEvent::new("test", "n").with_event_id(i.to_string()).into())
                .await
                .unwrap();
        }
        drop(tx);

        assert_eq!(task.await.unwrap().unwrap(), 3);
        let mut ids = Vec::new();
        while let Some(r) = results.recv().await {
            ids.push(r.as_output().unwrap().event_id.clone());
        }
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn channel_output_keeps_draining_after_receiver_drop() {
        let (output, results) = ChannelOutput::channel(1);
        drop(results);
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(Box::new(output).sink(rx));

        for _ in 0..5 {
            tx.send(OutputEvent::new("test", "n").into()).await.unwrap();
        }
        drop(tx);
        assert_eq!(task.await.unwrap().unwrap(), 0);
    }

    #[tokio::test]
    async fn writes_one_json_object_per_line() {
        let mut buf = Vec::new();
        let (tx, rx) = mpsc::channel(4);
        tx.send(OutputEvent::new("a", "first").into()).await.unwrap();
        tx.send(OutputEvent::new("b", "second").into()).await.unwrap();
        drop(tx);

        let written = write_json_lines(&mut buf, "test", rx, false).await.unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(buf).unwrap();
        let names: Vec<String> = text
            .lines()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l).unwrap();
                v["Name"].as_str().unwrap().to_owned()
            })
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
