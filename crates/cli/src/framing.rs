//! DAP base protocol framing: `Content-Length` headers, a blank line, a JSON body.

use std::io;

use cdap::protocol::ProtocolMessage;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const CONTENT_LENGTH: &str = "Content-Length";

/// Largest body `read_message` accepts.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
	#[error("Frame has no Content-Length header")]
	MissingLength,

	#[error("Invalid header line: {0:?}")]
	InvalidHeader(String),

	#[error("Frame of {0} bytes exceeds the size limit")]
	TooLarge(usize),

	/// The frame was read completely but its body is not a DAP message.
	#[error("Malformed message body: {0}")]
	Body(#[source] serde_json::Error),

	#[error(transparent)]
	Io(#[from] io::Error),
}

/// Reads one framed message. `Ok(None)` on a clean end of input between frames.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<ProtocolMessage>, FrameError>
where
	R: AsyncBufRead + Unpin,
{
	let mut content_length: Option<usize> = None;
	let mut saw_header = false;
	let mut line = String::new();

	loop {
		line.clear();
		if reader.read_line(&mut line).await? == 0 {
			if saw_header {
				return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
			}
			return Ok(None);
		}

		let header = line.trim_end_matches(['\r', '\n']);
		if header.is_empty() {
			if saw_header {
				break;
			}
			continue;
		}
		saw_header = true;

		let (name, value) = header.split_once(':').ok_or_else(|| FrameError::InvalidHeader(header.to_string()))?;
		if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
			let length = value.trim().parse().map_err(|_| FrameError::InvalidHeader(header.to_string()))?;
			content_length = Some(length);
		}
	}

	let length = content_length.ok_or(FrameError::MissingLength)?;
	if length > MAX_FRAME_LEN {
		return Err(FrameError::TooLarge(length));
	}
	let mut body = vec![0; length];
	reader.read_exact(&mut body).await?;
	serde_json::from_slice(&body).map(Some).map_err(FrameError::Body)
}

/// Writes one framed message and flushes.
pub async fn write_message<W>(writer: &mut W, message: &ProtocolMessage) -> Result<(), FrameError>
where
	W: AsyncWrite + Unpin,
{
	let body = serde_json::to_vec(message).map_err(FrameError::Body)?;
	let header = format!("{CONTENT_LENGTH}: {}\r\n\r\n", body.len());
	writer.write_all(header.as_bytes()).await?;
	writer.write_all(&body).await?;
	writer.flush().await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use cdap::protocol::{Event, Request};
	use serde_json::json;

	use super::*;

	fn frame(body: &str) -> String {
		format!("Content-Length: {}\r\n\r\n{body}", body.len())
	}

	#[tokio::test]
	async fn reads_consecutive_frames_then_end_of_input() {
		let input = format!(
			"{}{}",
			frame(r#"{"seq":1,"type":"request","command":"initialize","arguments":{"adapterID":"node"}}"#),
			frame(r#"{"seq":2,"type":"request","command":"threads"}"#),
		);
		let mut reader = input.as_bytes();

		let Some(ProtocolMessage::Request(first)) = read_message(&mut reader).await.unwrap() else {
			panic!("expected a request");
		};
		assert_eq!(first.command, "initialize");
		assert_eq!(first.arguments["adapterID"], "node");

		let Some(ProtocolMessage::Request(second)) = read_message(&mut reader).await.unwrap() else {
			panic!("expected a request");
		};
		assert_eq!(second.seq, 2);

		assert!(read_message(&mut reader).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn written_frame_reads_back() {
		let message = ProtocolMessage::Event(Event::new("output", Some(json!({ "output": "héllo\n" }))));
		let mut buffer = Vec::new();
		write_message(&mut buffer, &message).await.unwrap();

		let text = String::from_utf8(buffer.clone()).unwrap();
		let body_len = serde_json::to_vec(&message).unwrap().len();
		assert!(text.starts_with(&format!("Content-Length: {body_len}\r\n\r\n")));

		let mut reader = buffer.as_slice();
		assert_eq!(read_message(&mut reader).await.unwrap(), Some(message));
	}

	#[tokio::test]
	async fn malformed_body_consumes_the_frame() {
		let good = r#"{"seq":5,"type":"request","command":"next","arguments":{"threadId":1}}"#;
		let input = format!("{}{}", frame(r#"{"seq":"#), frame(good));
		let mut reader = input.as_bytes();

		assert!(matches!(read_message(&mut reader).await, Err(FrameError::Body(_))));
		let next = read_message(&mut reader).await.unwrap();
		assert_eq!(
			next,
			Some(ProtocolMessage::Request(Request {
				seq: 5,
				command: "next".into(),
				arguments: json!({ "threadId": 1 }),
			}))
		);
	}

	#[tokio::test]
	async fn header_errors_are_reported() {
		let mut missing = "Content-Type: application/json\r\n\r\n{}".as_bytes();
		assert!(matches!(read_message(&mut missing).await, Err(FrameError::MissingLength)));

		let mut garbage = "Content-Length: lots\r\n\r\n".as_bytes();
		assert!(matches!(read_message(&mut garbage).await, Err(FrameError::InvalidHeader(_))));

		let mut truncated = "Content-Length: 40\r\n\r\n{\"seq\":1".as_bytes();
		assert!(matches!(read_message(&mut truncated).await, Err(FrameError::Io(_))));
	}

	#[tokio::test]
	async fn oversized_length_is_rejected_before_reading_the_body() {
		let mut huge = "Content-Length: 35184372088832\r\n\r\n{}".as_bytes();
		assert!(matches!(read_message(&mut huge).await, Err(FrameError::TooLarge(35184372088832))));

		let limit = MAX_FRAME_LEN + 1;
		let header = format!("Content-Length: {limit}\r\n\r\n");
		let mut reader = header.as_bytes();
		assert!(matches!(read_message(&mut reader).await, Err(FrameError::TooLarge(length)) if length == limit));
	}
}
