// src/prompt.rs
// Interactive line input. Each line is read on demand by a blocking task, so stdin is
// never being read while a child process owns the terminal. Any read-ahead buffered
// by `R` is invisible to those children, so main hands in an unbuffered reader.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::os::fd::AsFd;

use crate::errors::{SetupError, SetupResult};

/// Reads one byte per syscall so nothing past the current line is taken off the fd.
pub fn unbuffered(file: File) -> BufReader<File> {
    BufReader::with_capacity(1, file)
}

/// A private duplicate of fd 0. Whatever follows the current answer stays in the
/// pipe for interactive children (ssh-copy-id, ssh) to read.
pub fn unbuffered_stdin() -> io::Result<BufReader<File>> {
    let fd = io::stdin().as_fd().try_clone_to_owned()?;
    Ok(unbuffered(File::from(fd)))
}

pub struct Prompter<R, W> {
    reader: Option<R>,
    out: W,
}

impl<R, W> Prompter<R, W>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    pub fn new(reader: R, out: W) -> Self {
        Prompter {
            reader: Some(reader),
            out,
        }
    }

    pub fn say(&mut self, text: &str) -> SetupResult<()> {
        writeln!(self.out, "{}", text)?;
        self.out.flush()?;
        Ok(())
    }

    /// Prints `question` without a newline and returns the trimmed answer.
    pub async fn ask(&mut self, question: &str) -> SetupResult<String> {
        write!(self.out, "{}", question)?;
        self.out.flush()?;
        Ok(self.read_line().await?.trim().to_string())
    }

    /// Collects lines until one is blank after trimming. The blank line is not kept.
    pub async fn read_until_blank(&mut self) -> SetupResult<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line.trim().is_empty() {
                return Ok(lines);
            }
            lines.push(line);
        }
    }

    /// One line without its terminator. End of input is `SetupError::InputClosed`.
    pub async fn read_line(&mut self) -> SetupResult<String> {
        let mut reader = self.reader.take().ok_or(SetupError::InputClosed)?;
        let (reader, result) = tokio::task::spawn_blocking(move || {
            let mut line = String::new();
            let result = reader.read_line(&mut line).map(|n| (n, line));
            (reader, result)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        self.reader = Some(reader);

        let (n, mut line) = result?;
        if n == 0 {
            return Err(SetupError::InputClosed);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Seek, SeekFrom};

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[tokio::test]
    async fn test_ask_trims_and_echoes_question() {
        let mut p = prompter("  web-1 \n");
        assert_eq!(p.ask("Host alias: ").await.unwrap(), "web-1");
        assert_eq!(String::from_utf8(p.into_output()).unwrap(), "Host alias: ");
    }

    #[tokio::test]
    async fn test_ask_accepts_empty_answer() {
        let mut p = prompter("\n");
        assert_eq!(p.ask("Port: ").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_eof_is_input_closed() {
        let mut p = prompter("only\n");
        p.read_line().await.unwrap();
        assert!(matches!(
            p.read_line().await.unwrap_err(),
            SetupError::InputClosed
        ));
    }

    #[tokio::test]
    async fn test_read_until_blank_keeps_lines_verbatim() {
        let mut p = prompter("-----BEGIN KEY-----\r\n  abc  \n-----END KEY-----\n   \nafter\n");
        let lines = p.read_until_blank().await.unwrap();
        assert_eq!(lines, vec!["-----BEGIN KEY-----", "  abc  ", "-----END KEY-----"]);
        assert_eq!(p.read_line().await.unwrap(), "after");
    }

    #[tokio::test]
    async fn test_unbuffered_reader_leaves_rest_for_children() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"web\npassword-for-child\n").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        // Shares the file offset, like a child inheriting fd 0
        let mut child_view = file.try_clone().unwrap();

        let mut p = Prompter::new(unbuffered(file), Vec::new());
        assert_eq!(p.ask("Host alias: ").await.unwrap(), "web");

        let mut rest = String::new();
        child_view.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "password-for-child\n");
    }

    #[tokio::test]
    async fn test_read_until_blank_without_terminator_fails() {
        let mut p = prompter("-----BEGIN KEY-----\nabc\n");
        assert!(matches!(
            p.read_until_blank().await.unwrap_err(),
            SetupError::InputClosed
        ));
    }
}
