use crate::error::{DVRIPError, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The 20-byte frame header shared by every synchronous RPC, alarm push,
/// file-download chunk and media fragment on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub head: u8,
    pub version: u8,
    pub session: u32,
    /// Monotonic request counter for RPCs; for live-monitor fragments the
    /// low two bytes instead carry `(total_fragments, current_fragment)`.
    pub packet_count: u32,
    pub msg_id: u16,
    pub data_len: u32,
}

impl PacketHeader {
    pub const SIZE: usize = 20;
    pub const MAGIC: u8 = 0xFF;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::SIZE];
        buf[0] = self.head;
        buf[1] = self.version;
        LittleEndian::write_u32(&mut buf[4..8], self.session);
        LittleEndian::write_u32(&mut buf[8..12], self.packet_count);
        LittleEndian::write_u16(&mut buf[14..16], self.msg_id);
        LittleEndian::write_u32(&mut buf[16..20], self.data_len);
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(DVRIPError::ProtocolError("Header too small".to_string()));
        }
        Ok(Self {
            head: data[0],
            version: data[1],
            session: LittleEndian::read_u32(&data[4..8]),
            packet_count: LittleEndian::read_u32(&data[8..12]),
            msg_id: LittleEndian::read_u16(&data[14..16]),
            data_len: LittleEndian::read_u32(&data[16..20]),
        })
    }

    /// Splits `packet_count` into the `(total_fragments, current_fragment)`
    /// pair a live-monitor fragment header carries at offsets 8 and 9.
    pub fn fragment_index(&self) -> (u8, u8) {
        let bytes = self.packet_count.to_le_bytes();
        (bytes[0], bytes[1])
    }
}

/// A decoded response body. JSON that fails to parse after the trailer is
/// stripped is handed back to the caller as raw bytes rather than dropped.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    Parsed(Value),
    Raw(Vec<u8>),
}

impl ResponseBody {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ResponseBody::Parsed(v) => Some(v),
            ResponseBody::Raw(_) => None,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            ResponseBody::Parsed(v) => serde_json::to_vec(&v).unwrap_or_default(),
            ResponseBody::Raw(b) => b,
        }
    }
}

pub async fn send_packet<W: AsyncWrite + Unpin>(
    writer: &mut W,
    session: u32,
    packet_count: u32,
    msg_id: u16,
    data: &[u8],
    version: u8,
) -> Result<()> {
    let tail: &[u8] = if version == 0 { b"\x0a\x00" } else { b"\x00" };
    let data_len = (data.len() + tail.len()) as u32;

    let header = PacketHeader {
        head: PacketHeader::MAGIC,
        version,
        session,
        packet_count,
        msg_id,
        data_len,
    };

    let mut packet = header.encode();
    packet.extend_from_slice(data);
    packet.extend_from_slice(tail);

    writer.write_all(&packet).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads and decodes one 20-byte header with no payload timeout of its own;
/// callers bound the overall operation with their own deadline.
pub async fn receive_packet_header<R: AsyncRead + Unpin>(reader: &mut R) -> Result<PacketHeader> {
    let mut buf = vec![0u8; PacketHeader::SIZE];
    let mut received = 0;

    while received < PacketHeader::SIZE {
        match reader.read(&mut buf[received..]).await {
            Ok(0) => {
                return Err(DVRIPError::ConnectionError(
                    "Connection closed by peer".to_string(),
                ));
            }
            Ok(n) => {
                received += n;
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(DVRIPError::ConnectionError(
                    "Connection closed unexpectedly".to_string(),
                ));
            }
            Err(e) => {
                return Err(DVRIPError::IoError(e));
            }
        }
    }

    PacketHeader::decode(&buf)
}

/// Exact-length receive loop: accumulates until `length` bytes arrive or the
/// wall-clock deadline elapses. A short read is treated as disconnection.
pub async fn receive_data<R: AsyncRead + Unpin>(
    reader: &mut R,
    length: usize,
    timeout: tokio::time::Duration,
) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; length];
    let mut received = 0;

    while received < length {
        let remaining = length - received;
        let result = tokio::time::timeout(
            timeout,
            reader.read(&mut buf[received..received + remaining]),
        )
        .await;

        let chunk = match result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(DVRIPError::ConnectionError(
                    "Connection closed unexpectedly during read".to_string(),
                ));
            }
            Ok(Err(e)) => {
                return Err(DVRIPError::IoError(e));
            }
            Err(_) => {
                return Err(DVRIPError::ConnectionError(
                    "Timeout receiving data".to_string(),
                ));
            }
        };

        if chunk == 0 {
            return Err(DVRIPError::ConnectionError(
                "Connection closed by peer".to_string(),
            ));
        }
        received += chunk;
    }

    Ok(buf)
}

/// Strips the JSON trailer (`\x0a\x00`, or a bare `\x00` for version 1
/// framing) from a raw payload.
pub fn strip_json_trailer(data: &[u8]) -> &[u8] {
    if data.len() >= 2 && data[data.len() - 2] == 0x0a && data[data.len() - 1] == 0x00 {
        &data[..data.len() - 2]
    } else if !data.is_empty() && data[data.len() - 1] == 0x00 {
        &data[..data.len() - 1]
    } else {
        data
    }
}

/// Decodes a raw payload into a [`ResponseBody`]: parsed JSON when the
/// trailer-stripped bytes are valid JSON, the raw bytes otherwise.
pub fn decode_response(data: &[u8]) -> ResponseBody {
    let json_data = strip_json_trailer(data);
    match serde_json::from_slice(json_data) {
        Ok(value) => ResponseBody::Parsed(value),
        Err(_) => ResponseBody::Raw(data.to_vec()),
    }
}

pub async fn receive_json<R: AsyncRead + Unpin>(
    reader: &mut R,
    length: usize,
    timeout: tokio::time::Duration,
) -> Result<Value> {
    let data = receive_data(reader, length, timeout).await?;
    let json_data = strip_json_trailer(&data);
    serde_json::from_slice(json_data)
        .map_err(|e| DVRIPError::SerializationError(format!("Error parsing JSON: {}", e)))
}

/// The "sofia hash": MD5(password), paired big-endian bytes summed mod 62
/// and mapped into `[0-9A-Za-z]`. Used in place of the cleartext password.
pub fn sofia_hash(password: &str) -> String {
    let digest = md5::compute(password.as_bytes());

    let chars: Vec<char> = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz"
        .chars()
        .collect();

    let mut result = String::new();
    for i in (0..digest.len()).step_by(2) {
        if i + 1 < digest.len() {
            let sum = digest[i] as usize + digest[i + 1] as usize;
            result.push(chars[sum % 62]);
        }
    }
    result
}

/// Decodes the bit-packed 32-bit timestamp embedded in video frame headers.
pub fn unpack_datetime(value: u32) -> (i32, u32, u32, u32, u32, u32) {
    let second = value & 0x3F;
    let minute = (value >> 6) & 0x3F;
    let hour = (value >> 12) & 0x1F;
    let day = (value >> 17) & 0x1F;
    let month = (value >> 22) & 0x0F;
    let year = 2000 + ((value >> 26) as i32);
    (year, month, day, hour, minute, second)
}

/// Inverse of [`unpack_datetime`]; exists mainly so the round trip is testable.
pub fn pack_datetime(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> u32 {
    let y = (year - 2000) as u32;
    (second & 0x3F)
        | ((minute & 0x3F) << 6)
        | ((hour & 0x1F) << 12)
        | ((day & 0x1F) << 17)
        | ((month & 0x0F) << 22)
        | ((y & 0x3F) << 26)
}

/// Reads the big-endian u32 magic out of an inline frame-header prefix.
pub fn read_magic(data: &[u8]) -> Option<u32> {
    if data.len() < 4 {
        return None;
    }
    Some(BigEndian::read_u32(&data[0..4]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = PacketHeader {
            head: 0xFF,
            version: 1,
            session: 0xDEADBEEF,
            packet_count: 42,
            msg_id: 1000,
            data_len: 128,
        };
        let encoded = header.encode();
        let decoded = PacketHeader::decode(&encoded).unwrap();
        assert_eq!(decoded.session, header.session);
        assert_eq!(decoded.packet_count, header.packet_count);
        assert_eq!(decoded.msg_id, header.msg_id);
        assert_eq!(decoded.data_len, header.data_len);
    }

    #[test]
    fn sofia_hash_known_vectors() {
        assert_eq!(sofia_hash(""), "tlJwpbo6");
        let admin = sofia_hash("admin");
        assert_eq!(admin.len(), 8);
        assert!(admin.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn datetime_round_trip() {
        for (y, mo, d, h, mi, s) in [
            (2024, 1, 2, 3, 4, 5),
            (2000, 1, 1, 0, 0, 0),
            (2063, 12, 31, 23, 59, 59),
        ] {
            let packed = pack_datetime(y, mo, d, h, mi, s);
            let (py, pmo, pd, ph, pmi, ps) = unpack_datetime(packed);
            assert_eq!((py, pmo, pd, ph, pmi, ps), (y, mo, d, h, mi, s));
        }
    }

    #[test]
    fn strips_two_byte_trailer() {
        let data = b"{\"a\":1}\x0a\x00";
        assert_eq!(strip_json_trailer(data), b"{\"a\":1}");
    }

    #[test]
    fn decode_response_falls_back_to_raw() {
        let garbage = vec![1u8, 2, 3, 4, 0];
        match decode_response(&garbage) {
            ResponseBody::Raw(bytes) => assert_eq!(bytes, garbage),
            ResponseBody::Parsed(_) => panic!("expected raw fallback"),
        }
    }
}
