use crate::constants::{OK_CODES, QCODES};
use crate::dvrip::DVRIPCam;
use crate::error::{DVRIPError, Result};
use crate::protocol::unpack_datetime;
use async_trait::async_trait;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde_json::json;
use std::sync::atomic::Ordering;

#[derive(Debug, Default, Clone)]
pub struct FrameMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u8>,
    pub frame_type: Option<String>,
    pub media_type: Option<String>,
    pub datetime: Option<chrono::DateTime<chrono::Local>>,
}

pub type FrameCallback = Box<dyn Fn(Vec<u8>, FrameMetadata) + Send + Sync>;

/// The closed set of inline frame-header magics a media packet can start
/// with. Dispatch on this instead of comparing raw `u32`s at each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineFrameKind {
    IFrame,
    PFrame,
    JpegStream,
    Audio,
    Info,
    JpegSnapshot,
}

impl InlineFrameKind {
    pub fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            0x1FC => Some(Self::IFrame),
            0x1FD => Some(Self::PFrame),
            0x1FE => Some(Self::JpegStream),
            0x1FA => Some(Self::Audio),
            0x1F9 => Some(Self::Info),
            0xFFD8FFE0 => Some(Self::JpegSnapshot),
            _ => None,
        }
    }
}

/// Reassembles a media frame split across multiple dispatcher-delivered
/// chunks. The first chunk of a frame carries an inline header (its shape
/// depends on `InlineFrameKind`); every chunk after that is pure payload
/// until `remaining` bytes have all arrived.
pub struct FrameAssembler {
    remaining: i64,
    buf: Vec<u8>,
    metadata: FrameMetadata,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            remaining: 0,
            buf: Vec::new(),
            metadata: FrameMetadata::default(),
        }
    }

    /// Feeds one dispatcher-delivered chunk in. Returns the completed frame
    /// once `remaining` reaches zero, `None` while still accumulating.
    pub fn push(&mut self, packet: Vec<u8>) -> Result<Option<(Vec<u8>, FrameMetadata)>> {
        let mut frame_len = 0usize;

        if self.remaining == 0 {
            self.metadata = FrameMetadata::default();

            if packet.len() < 4 {
                return Err(DVRIPError::ProtocolError(
                    "Frame header truncated".to_string(),
                ));
            }

            let magic = BigEndian::read_u32(&packet[0..4]);
            let kind = InlineFrameKind::from_magic(magic).ok_or_else(|| {
                DVRIPError::ProtocolError(format!("Unknown frame magic: 0x{:X}", magic))
            })?;

            match kind {
                InlineFrameKind::IFrame | InlineFrameKind::JpegStream => {
                    frame_len = 16;
                    if packet.len() < frame_len {
                        return Err(DVRIPError::ProtocolError(
                            "I-frame header truncated".to_string(),
                        ));
                    }
                    let media = packet[4];
                    self.metadata.fps = Some(packet[5]);
                    let w = packet[6] as u32;
                    let h = packet[7] as u32;
                    let dt = LittleEndian::read_u32(&packet[8..12]);
                    self.remaining = LittleEndian::read_u32(&packet[12..16]) as i64;

                    self.metadata.width = Some(w * 8);
                    self.metadata.height = Some(h * 8);
                    self.metadata.datetime = Some(Self::to_local_datetime(dt));
                    if kind == InlineFrameKind::IFrame {
                        self.metadata.frame_type = Some("I".to_string());
                    }
                    self.metadata.media_type = Self::internal_to_type(kind, media);
                }
                InlineFrameKind::PFrame => {
                    frame_len = 8;
                    if packet.len() < frame_len {
                        return Err(DVRIPError::ProtocolError(
                            "P-frame header truncated".to_string(),
                        ));
                    }
                    self.remaining = LittleEndian::read_u32(&packet[4..8]) as i64;
                    self.metadata.frame_type = Some("P".to_string());
                }
                InlineFrameKind::Audio => {
                    frame_len = 8;
                    if packet.len() < frame_len {
                        return Err(DVRIPError::ProtocolError(
                            "Audio header truncated".to_string(),
                        ));
                    }
                    let media = packet[4];
                    self.remaining = LittleEndian::read_u16(&packet[6..8]) as i64;
                    self.metadata.media_type = Self::internal_to_type(kind, media);
                }
                InlineFrameKind::Info => {
                    frame_len = 8;
                    if packet.len() < frame_len {
                        return Err(DVRIPError::ProtocolError(
                            "Info header truncated".to_string(),
                        ));
                    }
                    let media = packet[4];
                    self.remaining = LittleEndian::read_u16(&packet[6..8]) as i64;
                    self.metadata.media_type = Self::internal_to_type(kind, media);
                }
                InlineFrameKind::JpegSnapshot => {
                    // No length field: the whole packet is the JPEG.
                    return Ok(Some((packet, FrameMetadata::default())));
                }
            }
        }

        let body: &[u8] = if frame_len < packet.len() {
            &packet[frame_len..]
        } else {
            &[]
        };
        self.buf.extend_from_slice(body);
        self.remaining -= body.len() as i64;

        if self.remaining <= 0 {
            self.remaining = 0;
            let frame = std::mem::take(&mut self.buf);
            let metadata = std::mem::take(&mut self.metadata);
            return Ok(Some((frame, metadata)));
        }

        Ok(None)
    }

    fn internal_to_type(kind: InlineFrameKind, value: u8) -> Option<String> {
        match kind {
            InlineFrameKind::IFrame | InlineFrameKind::PFrame => match value {
                1 => Some("mpeg4".to_string()),
                2 => Some("h264".to_string()),
                3 => Some("h265".to_string()),
                _ => None,
            },
            InlineFrameKind::JpegStream => {
                if value == 0 {
                    Some("jpeg".to_string())
                } else {
                    None
                }
            }
            InlineFrameKind::Info => {
                if value == 1 || value == 6 {
                    Some("info".to_string())
                } else {
                    None
                }
            }
            InlineFrameKind::Audio => {
                if value == 0xE {
                    Some("g711a".to_string())
                } else {
                    None
                }
            }
            InlineFrameKind::JpegSnapshot => None,
        }
    }

    fn to_local_datetime(value: u32) -> chrono::DateTime<chrono::Local> {
        let (year, month, day, hour, minute, second) = unpack_datetime(value);
        chrono::NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, second))
            .map(|dt| chrono::DateTime::from_naive_utc_and_offset(dt, *chrono::Local::now().offset()))
            .unwrap_or_else(chrono::Local::now)
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
pub trait Monitoring: Send + Sync {
    /// Start video monitoring
    async fn start_monitor(&self, callback: FrameCallback, stream: &str, channel: u8)
    -> Result<()>;

    /// Stop video monitoring
    async fn stop_monitor(&self) -> Result<()>;

    /// Get a snapshot (screenshot)
    async fn snapshot(&self, channel: u8) -> Result<Vec<u8>>;

    /// Check if monitoring
    fn is_monitoring(&self) -> bool;
}

#[async_trait]
impl Monitoring for DVRIPCam {
    async fn start_monitor(
        &self,
        callback: FrameCallback,
        stream: &str,
        channel: u8,
    ) -> Result<()> {
        let params = json!({
            "Channel": channel,
            "CombinMode": "NONE",
            "StreamType": stream,
            "TransMode": "TCP",
        });

        let data = json!({
            "Action": "Claim",
            "Parameter": params,
        });

        let reply = self.set_command("OPMonitor", data, None).await?;
        if let Some(ret) = reply.get("Ret").and_then(|r| r.as_u64())
            && !OK_CODES.contains(&(ret as u32))
        {
            return Err(DVRIPError::ProtocolError(
                "Failed to start monitoring".to_string(),
            ));
        }

        let session = self.session_id();
        let start_data = json!({
            "Name": "OPMonitor",
            "SessionID": format!("0x{:08X}", session),
            "OPMonitor": {
                "Action": "Start",
                "Parameter": params,
            },
        });

        self.send_command(1410, start_data, false).await?;

        *self.video_assembler.lock().await = FrameAssembler::new();
        *self.frame_callback.lock().await = Some(callback);
        self.monitoring.store(true, Ordering::Release);

        Ok(())
    }

    async fn stop_monitor(&self) -> Result<()> {
        self.monitoring.store(false, Ordering::Release);
        *self.frame_callback.lock().await = None;
        Ok(())
    }

    async fn snapshot(&self, channel: u8) -> Result<Vec<u8>> {
        let session = self.session_id();
        let snap_code = QCODES.get("OPSNAP").copied().unwrap_or(1560);

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        self.stream_handlers.insert(snap_code, tx);

        let data = json!({
            "Name": "OPSNAP",
            "SessionID": format!("0x{:08X}", session),
            "OPSNAP": {
                "Channel": channel,
            },
        });

        let send_result = self.send_command(snap_code, data, false).await;
        if let Err(e) = send_result {
            self.stream_handlers.remove(&snap_code);
            return Err(e);
        }

        let mut assembler = FrameAssembler::new();
        let result = loop {
            match tokio::time::timeout(self.timeout, rx.recv()).await {
                Ok(Some((_header, chunk))) => match assembler.push(chunk) {
                    Ok(Some((frame, _))) => break Ok(frame),
                    Ok(None) => continue,
                    Err(e) => break Err(e),
                },
                Ok(None) => {
                    break Err(DVRIPError::ConnectionError(
                        "Snapshot stream closed before a full frame arrived".to_string(),
                    ));
                }
                Err(_) => {
                    break Err(DVRIPError::ConnectionError(
                        "Timeout waiting for snapshot".to_string(),
                    ));
                }
            }
        };

        self.stream_handlers.remove(&snap_code);
        result
    }

    fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::Acquire)
    }
}
