//! 파일/표준 입력 어댑터

use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use shoal_core::error::AdapterError;
use shoal_core::{BoxFuture, Input, RawMessage};

use super::{DEFAULT_MAX_LINE_LENGTH, forward_lines};

/// 파일 입력 어댑터
///
/// 파일을 처음부터 끝까지 한 줄씩 읽고 끝에 도달하면 입력을 종료합니다.
/// 파일은 `initialize`에서 열리므로 열기 실패는 시작 단계의 치명적 에러입니다.
pub struct FileInput {
    path: PathBuf,
    max_line_length: usize,
    file: Option<File>,
}

impl FileInput {
    /// 읽을 파일 경로로 어댑터를 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            file: None,
        }
    }

    /// 최대 라인 길이를 지정합니다.
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }
}

impl Input for FileInput {
    fn name(&self) -> &str {
        "file"
    }

    fn initialize(&mut self) -> BoxFuture<'_, Result<(), AdapterError>> {
        Box::pin(async move {
            let file = File::open(&self.path)
                .await
                .map_err(|e| AdapterError::Init {
                    adapter: "file".to_owned(),
                    reason: format!("cannot open {}: {e}", self.path.display()),
                })?;
            tracing::info!(path = %self.path.display(), "opened input file");
            self.file = Some(file);
            Ok(())
        })
    }

    fn retrieve(
        self: Box<Self>,
        tx: mpsc::Sender<RawMessage>,
    ) -> BoxFuture<'static, Result<(), AdapterError>> {
        Box::pin(async move {
            let file = match self.file {
                Some(file) => file,
                None => {
                    return Err(AdapterError::Init {
                        adapter: "file".to_owned(),
                        reason: "retrieve called before initialize".to_owned(),
                    });
                }
            };

            let source = self.path.display().to_string();
            let sent = forward_lines(
                BufReader::new(file),
                "file",
                &source,
                self.max_line_length,
                &tx,
            )
            .await?;
            tracing::info!(path = %source, messages = sent, "input file exhausted");
            Ok(())
        })
    }
}

/// 표준 입력 어댑터
pub struct StdinInput {
    max_line_length: usize,
}

impl StdinInput {
    pub fn new() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Input for StdinInput {
    fn name(&self) -> &str {
        "stdin"
    }

    fn initialize(&mut self) -> BoxFuture<'_, Result<(), AdapterError>> {
        Box::pin(async { Ok(()) })
    }

    fn retrieve(
        self: Box<Self>,
        tx: mpsc::Sender<RawMessage>,
    ) -> BoxFuture<'static, Result<(), AdapterError>> {
        Box::pin(async move {
            let reader = BufReader::new(tokio::io::stdin());
            let sent = forward_lines(reader, "stdin", "stdin", self.max_line_length, &tx).await?;
            tracing::info!(messages = sent, "stdin closed");
            Ok(())
        })
    }
}
