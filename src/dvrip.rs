use crate::AudioCodec;
use crate::commands::{AlarmCallback, FrameCallback};
use crate::constants::{OK_CODES, OPFEED_QCODES, QCODES, TCP_PORT};
use crate::error::{DVRIPError, Result};
use crate::protocol::{PacketHeader, ResponseBody, decode_response};
use dashmap::DashMap;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tokio::sync::{self, Mutex};
use tokio::time::Duration;

/// Selects which transport `connect` uses. UDP mirrors dvrip.py's `proto`
/// kwarg; most devices only answer RPCs over TCP, but alarm/keep-alive
/// traffic has historically also been offered on 34568/udp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proto {
    Tcp,
    Udp,
}

pub struct CommandRequest {
    pub header: PacketHeader,
    pub data: Vec<u8>,
    pub response_sender: Option<tokio::sync::oneshot::Sender<(PacketHeader, Vec<u8>)>>,
    pub use_internal_counter: bool,
    pub expected_response_id: Option<u16>,
}

impl CommandRequest {
    pub fn new(header: PacketHeader, data: Vec<u8>) -> Self {
        Self {
            header,
            data,
            response_sender: None,
            use_internal_counter: true,
            expected_response_id: None,
        }
    }

    pub fn with_response(
        mut self,
        sender: tokio::sync::oneshot::Sender<(PacketHeader, Vec<u8>)>,
    ) -> Self {
        self.response_sender = Some(sender);
        self
    }

    pub fn with_counter(mut self, use_internal: bool) -> Self {
        self.use_internal_counter = use_internal;
        self
    }

    pub fn with_expected_response(mut self, id: u16) -> Self {
        self.expected_response_id = Some(id);
        self
    }
}

/// Builds a ready-to-send header/body pair. The send task assigns the final
/// `packet_count` unless the caller already fixed one (see `with_counter`).
pub(crate) fn pack_packet(
    session: u32,
    packet_count: u32,
    msg_id: u16,
    data: &[u8],
    version: u8,
    add_tail: bool,
) -> (PacketHeader, Vec<u8>) {
    let tail: &[u8] = if add_tail { b"\x0a\x00" } else { b"" };
    let mut body = Vec::with_capacity(data.len() + tail.len());
    body.extend_from_slice(data);
    body.extend_from_slice(tail);

    let header = PacketHeader {
        head: PacketHeader::MAGIC,
        version,
        session,
        packet_count,
        msg_id,
        data_len: body.len() as u32,
    };

    (header, body)
}

pub(crate) fn unpack_json(data: &[u8]) -> Result<Value> {
    match decode_response(data) {
        ResponseBody::Parsed(v) => Ok(v),
        ResponseBody::Raw(_) => Err(DVRIPError::SerializationError(
            "Payload is not valid JSON".to_string(),
        )),
    }
}

pub struct DVRIPCam {
    pub(crate) ip: String,
    pub(crate) port: u16,
    pub(crate) timeout: Duration,
    pub(crate) proto: Proto,
    pub(crate) iface: Option<String>,

    pub(crate) username: Option<String>,

    // Atomic state
    pub(crate) connected: Arc<AtomicBool>,
    pub(crate) authenticated: Arc<AtomicBool>,
    pub(crate) monitoring: Arc<AtomicBool>,
    pub(crate) alarm_monitoring: Arc<AtomicBool>,

    // Atomic counters
    pub(crate) session: Arc<AtomicU32>,

    // Callbacks
    pub(crate) alarm_callback: Arc<Mutex<Option<AlarmCallback>>>,
    pub(crate) frame_callback: Arc<Mutex<Option<FrameCallback>>>,

    // Background tasks
    pub(crate) keep_alive_handle: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    pub(crate) recv_handle: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    pub(crate) send_handle: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,

    // Persistent listeners keyed by msg_id (bulk file download, firmware
    // upload acks) that the dispatcher hands chunks to outside the normal
    // pending-response table.
    pub(crate) stream_handlers: Arc<DashMap<u16, sync::mpsc::Sender<(PacketHeader, Vec<u8>)>>>,

    // Configuration
    pub(crate) alive_time: Arc<AtomicU64>,

    pub(crate) codec: Arc<Mutex<Option<AudioCodec>>>,
    pub(crate) backchannel_buffer: Arc<Mutex<Vec<u8>>>,

    // Multi-fragment reassembly state for the live-monitor stream.
    pub(crate) video_assembler: Arc<Mutex<crate::commands::monitoring::FrameAssembler>>,

    pub send_pool: Arc<Option<sync::mpsc::Sender<CommandRequest>>>,
}

impl DVRIPCam {
    pub fn new(ip: impl Into<String>) -> Self {
        let ip = ip.into();

        Self {
            ip,
            username: None,
            port: TCP_PORT,
            proto: Proto::Tcp,
            iface: None,
            codec: Arc::new(Mutex::new(None)),
            recv_handle: Arc::new(Mutex::new(None)),
            send_handle: Arc::new(Mutex::new(None)),
            frame_callback: Arc::new(Mutex::new(None)),
            timeout: Duration::from_secs(10),
            connected: Arc::new(AtomicBool::new(false)),
            authenticated: Arc::new(AtomicBool::new(false)),
            monitoring: Arc::new(AtomicBool::new(false)),
            alarm_monitoring: Arc::new(AtomicBool::new(false)),
            session: Arc::new(AtomicU32::new(0)),
            alarm_callback: Arc::new(Mutex::new(None)),
            keep_alive_handle: Arc::new(Mutex::new(None)),
            alive_time: Arc::new(AtomicU64::new(20)),
            backchannel_buffer: Arc::new(Mutex::new(Vec::new())),
            send_pool: Arc::new(None),
            stream_handlers: Arc::new(DashMap::new()),
            video_assembler: Arc::new(Mutex::new(crate::commands::monitoring::FrameAssembler::new())),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Selects TCP (default, port 34567) or UDP (port 34568) transport.
    pub fn with_proto(mut self, proto: Proto) -> Self {
        self.proto = proto;
        self
    }

    /// Binds the outgoing socket to a named network interface
    /// (`SO_BINDTODEVICE` on Linux). Ignored with a warning elsewhere.
    pub fn with_iface(mut self, iface: impl Into<String>) -> Self {
        self.iface = Some(iface.into());
        self
    }

    pub fn session_id(&self) -> u32 {
        self.session.load(Ordering::Acquire)
    }

    pub async fn __handle_video(
        frame_callback: Arc<tokio::sync::Mutex<Option<FrameCallback>>>,
        assembler: Arc<Mutex<crate::commands::monitoring::FrameAssembler>>,
        data: Vec<u8>,
    ) {
        let completed = {
            let mut guard = assembler.lock().await;
            guard.push(data)
        };
        let Ok(Some((frame, metadata))) = completed else {
            return;
        };

        let Some(callback) = &*frame_callback.lock().await else {
            return;
        };
        callback(frame, metadata);
    }

    pub async fn __handle_alarm(
        alarm_callback: Arc<tokio::sync::Mutex<Option<AlarmCallback>>>,
        session: Arc<AtomicU32>,
        decoded_header: PacketHeader,
        data: Vec<u8>,
    ) {
        if decoded_header.session != session.load(Ordering::Acquire) {
            return;
        }

        if let Ok(data) = unpack_json(&data)
            && let Some(ref callback) = *alarm_callback.lock().await
            && let Some(name) = data.get("Name").and_then(|n| n.as_str())
            && let Some(alarm_data) = data.get(name)
        {
            callback(alarm_data.clone(), decoded_header.packet_count);
        };
    }

    pub async fn send_raw_packet(
        &self,
        msg_id: u16,
        data: Vec<u8>,
        wait_response: bool,
        add_tail: bool,
    ) -> Result<Option<Vec<u8>>> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(DVRIPError::ConnectionError("Not connected".to_string()));
        }

        let ptr = &*self.send_pool;
        let pool = ptr.clone().ok_or_else(|| {
            DVRIPError::ConnectionError("Did you connect to the camera?".to_string())
        })?;

        let session = self.session.load(Ordering::Acquire);

        let packed = pack_packet(session, 0, msg_id, &data, 0, add_tail);

        let mut request = CommandRequest::new(packed.0, packed.1).with_counter(true);

        if wait_response {
            let (send, recv) = tokio::sync::oneshot::channel::<(PacketHeader, Vec<u8>)>();
            request = request.with_response(send);
            let _ = pool.send(request).await;

            let response = tokio::time::timeout(self.timeout, recv)
                .await
                .map_err(|_| {
                    DVRIPError::ConnectionError("Timeout waiting for response".to_string())
                })?
                .map_err(|_| {
                    DVRIPError::ConnectionError("Channel closed unexpectedly".to_string())
                })?;

            return Ok(Some(response.1));
        }

        let _ = pool.send(request).await;
        Ok(None)
    }

    /// Sends a raw packet whose `packet_count` is caller-assigned rather than
    /// taken from the connection's internal counter, and registers a
    /// `stream_handlers` entry to receive whatever reply arrives at
    /// `reply_msg_id`. Used by the firmware upgrade's chunked transfer, which
    /// runs its own sequence numbering independent of ordinary RPCs.
    pub(crate) async fn send_raw_packet_seq(
        &self,
        msg_id: u16,
        packet_count: u32,
        data: Vec<u8>,
    ) -> Result<()> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(DVRIPError::ConnectionError("Not connected".to_string()));
        }

        let ptr = &*self.send_pool;
        let pool = ptr.clone().ok_or_else(|| {
            DVRIPError::ConnectionError("Did you connect to the camera?".to_string())
        })?;

        let session = self.session.load(Ordering::Acquire);
        let (header, body) = pack_packet(session, packet_count, msg_id, &data, 0, false);
        let request = CommandRequest::new(header, body).with_counter(false);
        let _ = pool.send(request).await;
        Ok(())
    }

    pub(crate) async fn send_command_recv_bin(
        &self,
        msg_id: u16,
        data: Value,
        wait_response: bool,
    ) -> Result<Option<Vec<u8>>> {
        let data_bytes = serde_json::to_string(&data)
            .map_err(|e| DVRIPError::SerializationError(e.to_string()))?
            .into_bytes();

        self.send_raw_packet(msg_id, data_bytes, wait_response, true)
            .await
    }

    pub(crate) async fn send_command(
        &self,
        msg_id: u16,
        data: Value,
        wait_response: bool,
    ) -> Result<Option<Value>> {
        let Some(raw) = self
            .send_command_recv_bin(msg_id, data, wait_response)
            .await?
        else {
            return Ok(None);
        };

        match decode_response(&raw) {
            ResponseBody::Parsed(v) => Ok(Some(v)),
            ResponseBody::Raw(_) => Err(DVRIPError::SerializationError(
                "Failed to parse JSON response".to_owned(),
            )),
        }
    }

    /// Looks a command up in `QCODES`, falling back to the GET half of
    /// `OPFEED_QCODES` when the command has distinct get/set codes.
    fn resolve_get_code(command: &str) -> u16 {
        if let Some((get, _set)) = OPFEED_QCODES.get(command) {
            return *get;
        }
        QCODES.get(command).copied().unwrap_or(0)
    }

    /// Mirror of [`resolve_get_code`] for the SET half.
    fn resolve_set_code(command: &str) -> u16 {
        if let Some((_get, set)) = OPFEED_QCODES.get(command) {
            return *set;
        }
        QCODES.get(command).copied().unwrap_or(0)
    }

    pub(crate) async fn get_command(&self, command: &str, code: Option<u32>) -> Result<Value> {
        let msg_id = code.map(|c| c as u16).unwrap_or_else(|| Self::resolve_get_code(command));

        let session = self.session.load(Ordering::Acquire);
        let data = json!({
            "Name": command,
            "SessionID": format!("0x{:08X}", session)
        });

        let reply = self
            .send_command(msg_id, data, true)
            .await?
            .ok_or_else(|| DVRIPError::ProtocolError("Empty response".to_string()))?;

        if let Some(ret) = reply.get("Ret")
            && let Some(ret_code) = ret.as_u64()
            && OK_CODES.contains(&(ret_code as u32))
            && let Some(cmd_data) = reply.get(command)
        {
            return Ok(cmd_data.clone());
        }

        Ok(reply)
    }

    pub(crate) async fn set_command(
        &self,
        command: &str,
        data: Value,
        code: Option<u32>,
    ) -> Result<Value> {
        let msg_id = code.map(|c| c as u16).unwrap_or_else(|| Self::resolve_set_code(command));

        let session = self.session.load(Ordering::Acquire);
        let mut cmd_data = json!({
            "Name": command,
            "SessionID": format!("0x{:08X}", session),
        });
        cmd_data[command] = data;

        let reply = self
            .send_command(msg_id, cmd_data, true)
            .await?
            .ok_or_else(|| DVRIPError::ProtocolError("Empty response".to_string()))?;

        Ok(reply)
    }

    pub(crate) async fn start_keep_alive(&self) {
        let session = self.session.clone();
        let alive_time = self.alive_time.clone();
        let stream = self.send_pool.clone();
        let connected = self.connected.clone();
        let keep_alive_code = QCODES.get("KeepAlive").copied().unwrap_or(1006);

        let handle = tokio::spawn(async move {
            loop {
                if !connected.load(Ordering::Acquire) {
                    break;
                }

                let interval = Duration::from_secs(alive_time.load(Ordering::Acquire));
                tokio::time::sleep(interval).await;

                let Some(s) = &*stream else {
                    connected.store(false, Ordering::Release);
                    break;
                };

                let session_id = session.load(Ordering::Acquire);
                let data = json!({
                    "Name": "KeepAlive",
                    "SessionID": format!("0x{:08X}", session_id)
                });

                let Ok(data_bytes) = serde_json::to_string(&data) else {
                    tracing::warn!("failed to serialize keep-alive payload");
                    continue;
                };

                let (header, body) =
                    pack_packet(session_id, 0, keep_alive_code, &data_bytes.into_bytes(), 0, true);

                let request = CommandRequest::new(header, body).with_counter(true);
                if s.send(request).await.is_err() {
                    tracing::warn!("keep-alive send failed, connection appears closed");
                    connected.store(false, Ordering::Release);
                    break;
                }
            }
        });

        *self.keep_alive_handle.lock().await = Some(handle);
    }
}
