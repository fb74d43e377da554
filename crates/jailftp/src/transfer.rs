//! Byte movement between a data connection and a file.
//!
//! Binary transfers are a verbatim copy. ASCII transfers go through a 7-bit text boundary:
//! the network side always uses CRLF line endings, the file side LF. Text is read as UTF-8
//! and every character outside 7-bit ASCII is replaced with one `?`.

use crate::{
    code::{FtpResponse, SimpleReturnCode},
    datachan::{DataChanError, DataChannel, DataStream},
    listing,
};
use futures::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use std::path::PathBuf;
use thiserror::Error;
use tokio_util::compat::TokioAsyncReadCompatExt;

pub const BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferType {
    #[default]
    Ascii,
    Binary,
}

/// Which way bytes flow relative to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// File to client (RETR).
    Outbound,
    /// Client to file (STOR).
    Inbound,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to read transfer source: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write transfer sink: {0}")]
    Write(#[source] std::io::Error),
}

/// Copies `reader` into `writer` until end of stream and flushes the writer.
///
/// Returns the number of bytes written. Both streams stay owned by the caller, which closes
/// them whatever the outcome.
pub async fn copy<R, W>(
    reader: &mut R,
    writer: &mut W,
    transfer_type: TransferType,
    direction: Direction,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut translated = Vec::with_capacity(BUFFER_SIZE * 2);
    let mut ascii = AsciiTranslator::new(direction);
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf).await.map_err(TransferError::Read)?;
        if n == 0 {
            break;
        }

        let chunk = match transfer_type {
            TransferType::Binary => &buf[..n],
            TransferType::Ascii => {
                translated.clear();
                ascii.translate(&buf[..n], &mut translated);
                &translated[..]
            }
        };

        writer.write_all(chunk).await.map_err(TransferError::Write)?;
        total += chunk.len() as u64;
    }

    if transfer_type == TransferType::Ascii {
        translated.clear();
        ascii.finish(&mut translated);
        writer
            .write_all(&translated)
            .await
            .map_err(TransferError::Write)?;
        total += translated.len() as u64;
    }

    writer.flush().await.map_err(TransferError::Write)?;
    Ok(total)
}

/// A transfer accepted on the control channel and waiting for its data connection.
#[derive(Debug)]
pub enum PendingTransfer {
    List(PathBuf),
    /// The file is opened up front so a missing or unreadable file is answered before 150.
    Retrieve { path: PathBuf, file: tokio::fs::File },
    /// The file is created only once the data connection is up.
    Store(PathBuf),
}

#[derive(Debug, Error)]
pub enum PendingTransferError {
    #[error(transparent)]
    DataChannel(#[from] DataChanError),
    #[error(transparent)]
    Copy(#[from] TransferError),
    #[error("failed to list {}: {source}", path.display())]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What a [`PendingTransfer`] does, kept after the transfer itself has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    List,
    Retrieve,
    Store,
}

impl TransferKind {
    /// Reply sent instead of 226. Problems with the data connection are transient (450);
    /// only RETR failing to read its file is permanent (550). Host paths never reach the
    /// client.
    pub fn failure_reply(self, error: &PendingTransferError) -> FtpResponse {
        match (self, error) {
            (TransferKind::Retrieve, PendingTransferError::Copy(TransferError::Read(_))) => {
                FtpResponse::simple_msg(SimpleReturnCode::FileUnavailable, "Error reading file.")
            }
            (_, PendingTransferError::DataChannel(_)) => FtpResponse::simple_msg(
                SimpleReturnCode::FileActionNotTaken,
                "Can't open data connection.",
            ),
            (_, PendingTransferError::Copy(_)) => FtpResponse::simple_msg(
                SimpleReturnCode::FileActionNotTaken,
                "Connection closed; transfer aborted.",
            ),
            (_, PendingTransferError::List { .. }) => FtpResponse::simple_msg(
                SimpleReturnCode::FileActionNotTaken,
                "Cannot read directory.",
            ),
            (_, PendingTransferError::Create { .. }) => FtpResponse::simple_msg(
                SimpleReturnCode::FileActionNotTaken,
                "Cannot create file.",
            ),
        }
    }
}

impl PendingTransfer {
    pub fn kind(&self) -> TransferKind {
        match self {
            PendingTransfer::List(_) => TransferKind::List,
            PendingTransfer::Retrieve { .. } => TransferKind::Retrieve,
            PendingTransfer::Store(_) => TransferKind::Store,
        }
    }

    /// Opens the data connection, moves the bytes and closes the connection, whether or not
    /// the copy succeeded.
    pub async fn run(
        self,
        channel: DataChannel,
        transfer_type: TransferType,
    ) -> Result<u64, PendingTransferError> {
        let mut data = channel.open().await?;
        let result = self.execute(&mut data, transfer_type).await;

        if let Err(e) = data.close().await {
            tracing::debug!(err = %e, "error closing data connection");
        }

        result
    }

    async fn execute(
        self,
        data: &mut DataStream,
        transfer_type: TransferType,
    ) -> Result<u64, PendingTransferError> {
        match self {
            PendingTransfer::List(path) => {
                let entries = listing::read_listing(&path)
                    .await
                    .map_err(|source| PendingTransferError::List { path, source })?;
                let bytes = listing::write_listing(&entries, data)
                    .await
                    .map_err(TransferError::Write)?;
                Ok(bytes)
            }

            PendingTransfer::Retrieve { path, file } => {
                let mut file = file.compat();
                let bytes = copy(&mut file, data, transfer_type, Direction::Outbound).await?;
                tracing::info!(path = %path.display(), bytes, "sent file");
                Ok(bytes)
            }

            PendingTransfer::Store(path) => {
                let file = match tokio::fs::File::create(&path).await {
                    Ok(file) => file,
                    Err(source) => return Err(PendingTransferError::Create { path, source }),
                };
                let mut file = file.compat();
                let bytes = copy(data, &mut file, transfer_type, Direction::Inbound).await?;
                tracing::info!(path = %path.display(), bytes, "received file");
                Ok(bytes)
            }
        }
    }
}

/// Streaming line-ending translation. State carries across chunk boundaries so a CRLF
/// split between two reads is still seen as one line ending.
#[derive(Debug)]
struct AsciiTranslator {
    direction: Direction,
    /// Outbound: the previous byte was CR. Inbound: a CR is held back awaiting its LF.
    saw_cr: bool,
    /// UTF-8 continuation bytes still expected for the character already written as `?`.
    continuations: u8,
}

impl AsciiTranslator {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            saw_cr: false,
            continuations: 0,
        }
    }

    /// Maps a byte to its ASCII output, or `None` when it continues a character that has
    /// already been replaced. Bytes that are not valid UTF-8 each become `?`.
    fn decode(&mut self, byte: u8) -> Option<u8> {
        if self.continuations > 0 {
            if (0x80..=0xBF).contains(&byte) {
                self.continuations -= 1;
                return None;
            }
            // truncated sequence
            self.continuations = 0;
        }

        match byte {
            0x00..=0x7F => Some(byte),
            0xC2..=0xDF => {
                self.continuations = 1;
                Some(b'?')
            }
            0xE0..=0xEF => {
                self.continuations = 2;
                Some(b'?')
            }
            0xF0..=0xF4 => {
                self.continuations = 3;
                Some(b'?')
            }
            _ => Some(b'?'),
        }
    }

    fn translate(&mut self, input: &[u8], out: &mut Vec<u8>) {
        for &byte in input {
            let Some(byte) = self.decode(byte) else {
                continue;
            };

            match self.direction {
                Direction::Outbound => {
                    if byte == b'\n' && !self.saw_cr {
                        out.push(b'\r');
                    }
                    out.push(byte);
                    self.saw_cr = byte == b'\r';
                }
                Direction::Inbound => {
                    if self.saw_cr {
                        self.saw_cr = false;
                        if byte != b'\n' {
                            out.push(b'\r');
                        }
                    }
                    if byte == b'\r' {
                        self.saw_cr = true;
                    } else {
                        out.push(byte);
                    }
                }
            }
        }
    }

    fn finish(&mut self, out: &mut Vec<u8>) {
        if self.direction == Direction::Inbound && self.saw_cr {
            out.push(b'\r');
        }
        self.saw_cr = false;
        self.continuations = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;

    fn translate_chunks(direction: Direction, chunks: &[&[u8]]) -> Vec<u8> {
        let mut t = AsciiTranslator::new(direction);
        let mut out = Vec::new();
        for chunk in chunks {
            t.translate(chunk, &mut out);
        }
        t.finish(&mut out);
        out
    }

    #[test]
    fn outbound_adds_carriage_returns_once() {
        assert_eq!(
            translate_chunks(Direction::Outbound, &[b"a\nb\r\nc\n"]),
            b"a\r\nb\r\nc\r\n"
        );
    }

    #[test]
    fn inbound_strips_carriage_returns_before_line_feeds() {
        assert_eq!(
            translate_chunks(Direction::Inbound, &[b"a\r\nb\rc\r"]),
            b"a\nb\rc\r"
        );
    }

    #[test]
    fn crlf_split_across_chunks_is_one_line_ending() {
        assert_eq!(
            translate_chunks(Direction::Inbound, &[b"line\r", b"\nnext"]),
            b"line\nnext"
        );
        assert_eq!(
            translate_chunks(Direction::Outbound, &[b"line\r", b"\nnext"]),
            b"line\r\nnext"
        );
    }

    #[test]
    fn each_non_ascii_character_becomes_one_question_mark() {
        assert_eq!(
            translate_chunks(Direction::Outbound, &["héllo".as_bytes()]),
            b"h?llo"
        );
        assert_eq!(
            translate_chunks(Direction::Inbound, &["日本\r\n🦀".as_bytes()]),
            b"??\n?"
        );
    }

    #[test]
    fn character_split_across_chunks_is_replaced_once() {
        let bytes = "é".as_bytes();
        assert_eq!(
            translate_chunks(Direction::Outbound, &[b"caf", &bytes[..1], &bytes[1..], b"!"]),
            b"caf?!"
        );
    }

    #[test]
    fn invalid_utf8_bytes_are_replaced_one_by_one() {
        // latin-1 e-acute, then a lone continuation byte
        assert_eq!(
            translate_chunks(Direction::Outbound, &[b"caf\xe9 \x80x"]),
            b"caf? ?x"
        );
        // a lead byte cut short by an ASCII byte
        assert_eq!(
            translate_chunks(Direction::Outbound, &[b"\xe6\x97a"]),
            b"?a"
        );
    }

    #[tokio::test]
    async fn binary_copy_is_identity() {
        let data = (0..=255u8).cycle().take(BUFFER_SIZE * 3 + 17).collect::<Vec<_>>();
        let mut reader = Cursor::new(data.clone());
        let mut writer = Cursor::new(Vec::new());

        let n = copy(&mut reader, &mut writer, TransferType::Binary, Direction::Outbound)
            .await
            .unwrap();

        assert_eq!(n, data.len() as u64);
        assert_eq!(writer.into_inner(), data);
    }

    #[tokio::test]
    async fn ascii_copy_reports_bytes_written() {
        let mut reader = Cursor::new(b"one\ntwo\n".to_vec());
        let mut writer = Cursor::new(Vec::new());

        let n = copy(&mut reader, &mut writer, TransferType::Ascii, Direction::Outbound)
            .await
            .unwrap();

        assert_eq!(writer.into_inner(), b"one\r\ntwo\r\n");
        assert_eq!(n, 10);
    }

    #[test]
    fn data_connection_failures_are_transient_for_every_kind() {
        let err = PendingTransferError::DataChannel(DataChanError::Accept(
            std::io::Error::other("reset"),
        ));
        for kind in [TransferKind::List, TransferKind::Retrieve, TransferKind::Store] {
            assert_eq!(kind.failure_reply(&err).code(), 450);
        }
    }

    #[test]
    fn retrieve_file_read_failure_is_permanent() {
        let read = PendingTransferError::Copy(TransferError::Read(std::io::Error::other("eio")));
        let write = PendingTransferError::Copy(TransferError::Write(std::io::Error::other("eio")));
        assert_eq!(TransferKind::Retrieve.failure_reply(&read).code(), 550);
        assert_eq!(TransferKind::Retrieve.failure_reply(&write).code(), 450);
        assert_eq!(TransferKind::Store.failure_reply(&read).code(), 450);
    }

    #[test]
    fn failure_replies_do_not_reveal_host_paths() {
        let err = PendingTransferError::Create {
            path: PathBuf::from("/srv/ftp/alice/upload.bin"),
            source: std::io::Error::other("denied"),
        };
        let reply = String::from_utf8(TransferKind::Store.failure_reply(&err).to_bytes()).unwrap();
        assert_eq!(reply, "450 Cannot create file.\r\n");
        assert!(err.to_string().contains("/srv/ftp/alice"));
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut [u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::Error::other("connection reset")))
        }
    }

    #[tokio::test]
    async fn read_failure_aborts_the_copy() {
        let mut writer = Cursor::new(Vec::new());
        let result = copy(
            &mut FailingReader,
            &mut writer,
            TransferType::Binary,
            Direction::Inbound,
        )
        .await;
        assert!(matches!(result, Err(TransferError::Read(_))));
    }
}
