//! Where command lines and confirmation answers come from.

use std::io::{self, Write};

use async_trait::async_trait;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::completion::{Completions, ShellHelper};

/// A prompt-driven source of input lines.
#[async_trait(?Send)]
pub trait LineSource {
    /// Show `prompt` and read one line. `None` means end of input.
    ///
    /// Sources that do not draw their own prompt write it to `echo`.
    async fn read_line(&mut self, prompt: &str, echo: &mut dyn Write)
        -> io::Result<Option<String>>;

    /// Remember a command line for recall.
    fn add_history(&mut self, _line: &str) {}
}

#[async_trait(?Send)]
impl<R> LineSource for R
where
    R: AsyncBufRead + Unpin,
{
    async fn read_line(
        &mut self,
        prompt: &str,
        echo: &mut dyn Write,
    ) -> io::Result<Option<String>> {
        write!(echo, "{prompt}")?;
        echo.flush()?;

        let mut line = String::new();
        if AsyncBufReadExt::read_line(self, &mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Terminal line editor with history and tab completion.
pub struct EditorSource {
    editor: Editor<ShellHelper, DefaultHistory>,
}

impl EditorSource {
    /// Editor completing from `completions`.
    pub fn new(completions: Completions) -> io::Result<Self> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();
        let mut editor = Editor::with_config(config).map_err(into_io)?;
        editor.set_helper(Some(ShellHelper::new(completions)));
        Ok(Self { editor })
    }
}

#[async_trait(?Send)]
impl LineSource for EditorSource {
    async fn read_line(
        &mut self,
        prompt: &str,
        _echo: &mut dyn Write,
    ) -> io::Result<Option<String>> {
        // The editor owns the terminal while it waits for a key.
        let read = tokio::task::block_in_place(|| self.editor.readline(prompt));
        match read {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(into_io(e)),
        }
    }

    fn add_history(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            tracing::debug!(error = %e, "history entry dropped");
        }
    }
}

fn into_io(e: ReadlineError) -> io::Error {
    match e {
        ReadlineError::Io(e) => e,
        ReadlineError::Interrupted => io::Error::from(io::ErrorKind::Interrupted),
        other => io::Error::other(other),
    }
}

/// Whether a read was cut short by Ctrl-C at the prompt.
pub fn is_interrupt(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::Interrupted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buffered_input_echoes_prompt() {
        let mut input = "funds\n".as_bytes();
        let mut echo = Vec::new();

        let line = LineSource::read_line(&mut input, "$ ", &mut echo).await.unwrap();
        assert_eq!(line.as_deref(), Some("funds\n"));
        assert_eq!(echo, b"$ ");

        let end = LineSource::read_line(&mut input, "$ ", &mut echo).await.unwrap();
        assert_eq!(end, None);
        assert_eq!(echo, b"$ $ ");
    }

    #[test]
    fn ctrl_c_maps_to_interrupted() {
        assert!(is_interrupt(&into_io(ReadlineError::Interrupted)));
        assert!(!is_interrupt(&into_io(ReadlineError::Eof)));
    }
}
