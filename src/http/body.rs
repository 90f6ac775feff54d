//! Response body type shared by the pipeline and the handler
//!
//! Small payloads (pages, error texts) are sent as a single frame, files are
//! streamed chunk by chunk straight from disk.

use futures_util::{stream, StreamExt, TryStreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::logger;

pub type Body = UnsyncBoxBody<Bytes, io::Error>;

/// Single-frame body
pub fn full(data: impl Into<Bytes>) -> Body {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty() -> Body {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Stream an already opened file.
///
/// The first chunk is read before the body is handed out, so a file that
/// cannot be read at all surfaces here as an error while the response head
/// can still be changed. Failures after that point end the stream with an
/// error and the host aborts the transfer.
pub async fn file_stream(file: File, path: &Path) -> io::Result<Body> {
    let mut chunks = ReaderStream::new(file);
    let first = chunks.next().await.transpose()?;

    let display = path.display().to_string();
    let frames = stream::iter(first.map(Ok))
        .chain(chunks)
        .inspect_err(move |e| {
            logger::log_error(&format!("Stream error while sending '{display}': {e}"));
        })
        .map_ok(Frame::data);

    Ok(StreamBody::new(frames).boxed_unsync())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_full_body_roundtrip() {
        let collected = full("hello").collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"hello");
    }

    #[tokio::test]
    async fn test_empty_body() {
        let collected = empty().collect().await.unwrap().to_bytes();
        assert!(collected.is_empty());
    }

    #[tokio::test]
    async fn test_file_stream_yields_whole_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let payload = vec![b'x'; 200_000];
        tmp.write_all(&payload).unwrap();

        let file = File::open(tmp.path()).await.unwrap();
        let body = file_stream(file, tmp.path()).await.unwrap();
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected.len(), payload.len());
    }

    #[tokio::test]
    async fn test_file_stream_empty_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = File::open(tmp.path()).await.unwrap();
        let body = file_stream(file, tmp.path()).await.unwrap();
        let collected = body.collect().await.unwrap().to_bytes();
        assert!(collected.is_empty());
    }

    #[tokio::test]
    async fn test_file_stream_reports_first_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::open(dir.path()).await.unwrap();
        let err = file_stream(file, dir.path()).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::IsADirectory);
    }
}
