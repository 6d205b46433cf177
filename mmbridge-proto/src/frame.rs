//! Length-prefixed framing over byte streams.
//!
//! Each frame is: `[u32 big-endian length][payload]`. The payload is opaque
//! here; in practice it is a JSON wire document produced by
//! [`codec::to_vec`](crate::codec::to_vec).

use std::io::{self, Read, Write};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum allowed frame payload (16 MiB).
pub const MAX_FRAME: u32 = 16 * 1024 * 1024;

/// Returns the length prefix for `payload`, enforcing [`MAX_FRAME`].
fn frame_len(payload: &[u8]) -> io::Result<u32> {
    u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "frame exceeds 16 MiB limit"))
}

/// Validates a received length prefix.
fn check_len(len: u32) -> io::Result<usize> {
    if len > MAX_FRAME {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "frame exceeds 16 MiB limit",
        ));
    }
    Ok(len as usize)
}

/// EOF part-way through a frame. Only a stream that ends between frames
/// reports [`io::ErrorKind::UnexpectedEof`].
fn truncated(e: io::Error) -> io::Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        io::Error::new(io::ErrorKind::InvalidData, "stream ended inside a frame")
    } else {
        e
    }
}

/// Writes `payload` as one frame to `w`.
pub fn write_frame<W: Write>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = frame_len(payload)?;
    w.write_all(&len.to_be_bytes())?;
    w.write_all(payload)?;
    w.flush()
}

/// Reads one frame from `r`.
///
/// A stream that ends before the first prefix byte yields
/// [`io::ErrorKind::UnexpectedEof`]; one that ends later yields
/// [`io::ErrorKind::InvalidData`].
pub fn read_frame(r: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut prefix = [0u8; 4];
    let first = loop {
        match r.read(&mut prefix[..1]) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            other => break other?,
        }
    };
    if first == 0 {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    r.read_exact(&mut prefix[1..]).map_err(truncated)?;
    let len = check_len(u32::from_be_bytes(prefix))?;
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload).map_err(truncated)?;
    Ok(payload)
}

/// Writes `payload` as one frame to an async writer. Does not flush.
pub async fn send<W: AsyncWrite + Unpin>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = frame_len(payload)?;
    w.write_all(&len.to_be_bytes()).await?;
    w.write_all(payload).await
}

/// Reads one frame from an async reader.
///
/// EOF is reported as in [`read_frame`].
pub async fn recv<R: AsyncRead + Unpin>(r: &mut R) -> io::Result<Vec<u8>> {
    let mut prefix = [0u8; 4];
    if r.read(&mut prefix[..1]).await? == 0 {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    r.read_exact(&mut prefix[1..]).await.map_err(truncated)?;
    let len = check_len(u32::from_be_bytes(prefix))?;
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload).await.map_err(truncated)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::payload::{Command, Payload};

    #[test]
    fn roundtrip_blocking() {
        let env = Command::new("snap").into_envelope();
        let mut buf = Vec::new();
        write_frame(&mut buf, &codec::to_vec(&env)).unwrap();
        assert_eq!(&buf[..4], &38u32.to_be_bytes());

        let mut cursor = io::Cursor::new(&buf);
        let payload = read_frame(&mut cursor).unwrap();
        assert_eq!(codec::from_slice(&payload).unwrap(), env);
    }

    #[test]
    fn consecutive_frames() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"{}").unwrap();
        write_frame(&mut buf, b"[]").unwrap();

        let mut cursor = io::Cursor::new(&buf);
        assert_eq!(read_frame(&mut cursor).unwrap(), b"{}");
        assert_eq!(read_frame(&mut cursor).unwrap(), b"[]");
        let eof = read_frame(&mut cursor).unwrap_err();
        assert_eq!(eof.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn length_limit_is_inclusive() {
        let over = (MAX_FRAME + 1).to_be_bytes();
        let err = read_frame(&mut &over[..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(err.to_string(), "frame exceeds 16 MiB limit");

        // MAX_FRAME itself passes the check; only the missing body fails.
        let at = MAX_FRAME.to_be_bytes();
        let err = read_frame(&mut &at[..]).unwrap_err();
        assert_eq!(err.to_string(), "stream ended inside a frame");
    }

    #[test]
    fn blocking_eof_inside_prefix() {
        let err = read_frame(&mut &[0u8, 0, 1][..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn refuses_to_write_oversized_frame() {
        let payload = vec![b' '; MAX_FRAME as usize + 1];
        let mut buf = Vec::new();
        assert!(write_frame(&mut buf, &payload).is_err());
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn roundtrip_async() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let env = Command::new("live").into_envelope();
        let bytes = codec::to_vec(&env);

        let writer = async {
            send(&mut a, &bytes).await.unwrap();
            a.flush().await.unwrap();
        };
        let (_, payload) = tokio::join!(writer, recv(&mut b));
        assert_eq!(codec::from_slice(&payload.unwrap()).unwrap(), env);
    }

    #[tokio::test]
    async fn eof_inside_a_frame_is_not_a_clean_close() {
        for partial in [&[0u8, 0][..], &[0, 0, 0, 9, b'{'][..]] {
            let (mut a, mut b) = tokio::io::duplex(64);
            a.write_all(partial).await.unwrap();
            drop(a);
            let err = recv(&mut b).await.unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData, "{partial:?}");
            assert_eq!(err.to_string(), "stream ended inside a frame");
        }
    }

    #[tokio::test]
    async fn eof_before_prefix() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        let err = recv(&mut b).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
