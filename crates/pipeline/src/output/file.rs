//! 파일/표준 출력 어댑터

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::BufWriter;
use tokio::sync::mpsc;

use shoal_core::error::AdapterError;
use shoal_core::{BoxFuture, Output, RuleOutput};

use super::write_json_lines;

/// JSON Lines 파일 출력
///
/// 파일은 생성 시점에 열리며 (없으면 생성, 있으면 이어쓰기) 열기 실패는
/// 시작 단계의 치명적 에러입니다.
pub struct FileOutput {
    path: PathBuf,
    file: File,
}

impl FileOutput {
    /// 출력 파일을 열어 어댑터를 생성합니다.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AdapterError::Init {
                adapter: "file".to_owned(),
                reason: format!("cannot open {}: {e}", path.display()),
            })?;
        Ok(Self { path, file })
    }

    /// 출력 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Output for FileOutput {
    fn name(&self) -> &str {
        "file"
    }

    fn sink(
        self: Box<Self>,
        rx: mpsc::Receiver<RuleOutput>,
    ) -> BoxFuture<'static, Result<u64, AdapterError>> {
        Box::pin(async move {
            let path = self.path.display().to_string();
            let written = write_json_lines(BufWriter::new(self.file), "file", rx, false).await?;
            tracing::info!(path = %path, records = written, "output file closed");
            Ok(written)
        })
    }
}

/// 표준 출력 어댑터. 레코드마다 flush합니다.
#[derive(Debug, Default)]
pub struct StdoutOutput;

impl StdoutOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Output for StdoutOutput {
    fn name(&self) -> &str {
        "stdout"
    }

    fn sink(
        self: Box<Self>,
        rx: mpsc::Receiver<RuleOutput>,
    ) -> BoxFuture<'static, Result<u64, AdapterError>> {
        Box::pin(write_json_lines(tokio::io::stdout(), "stdout", rx, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_core::OutputEvent;

    #[tokio::test]
    async fn appends_json_lines_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        std::fs::write(&path, "{\"existing\":true}\n").unwrap();

        let output = Box::new(FileOutput::create(&path).await.unwrap());
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(output.sink(rx));
        tx.send(OutputEvent::new("test", "Written").into())
            .await
            .unwrap();
        drop(tx);
        assert_eq!(task.await.unwrap().unwrap(), 1);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let record: OutputEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(record.name, "Written");
    }

    #[tokio::test]
    async fn unopenable_path_fails_create() {
        let result = FileOutput::create("/nonexistent/shoal/out.jsonl").await;
        assert!(matches!(result, Err(AdapterError::Init { .. })));
    }
}
