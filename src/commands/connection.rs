use crate::constants::QCODES;
use crate::dvrip::DVRIPCam;
use crate::error::{DVRIPError, Result};
use crate::protocol::PacketHeader;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream, lookup_host};
use tokio::sync;
use tokio::time::Duration;

#[async_trait]
pub trait Connection: Send + Sync {
    /// Connect to the device
    async fn connect(&mut self, timeout: tokio::time::Duration) -> Result<()>;

    /// Disconnect from the device
    async fn close(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get the device IP address
    fn ip(&self) -> &str;

    /// Get the device port
    fn port(&self) -> u16;
}

/// Resolves `ip:port` and opens a TCP connection, optionally binding the
/// socket to a named network interface first (`SO_BINDTODEVICE`, Linux
/// only — elsewhere the option is accepted and ignored with a warning,
/// matching dvrip.py's best-effort `iface` handling).
async fn connect_tcp(
    ip: &str,
    port: u16,
    iface: Option<&str>,
    timeout: Duration,
) -> Result<TcpStream> {
    let addr = lookup_host((ip, port))
        .await?
        .next()
        .ok_or_else(|| DVRIPError::ConnectionError(format!("Could not resolve {}", ip)))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };

    if let Some(iface) = iface {
        #[cfg(target_os = "linux")]
        {
            if let Err(e) = socket.bind_device(Some(iface.as_bytes())) {
                tracing::warn!(iface, error = %e, "failed to bind to interface");
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            tracing::warn!(iface, "interface binding is only supported on Linux; ignoring");
        }
    }

    tokio::time::timeout(timeout, socket.connect(addr))
        .await
        .map_err(|_| DVRIPError::ConnectionError("Connection timeout".to_string()))?
        .map_err(|e| DVRIPError::ConnectionError(format!("Connection error: {}", e)))
}

#[async_trait]
impl Connection for DVRIPCam {
    async fn connect(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;

        let stream = connect_tcp(&self.ip, self.port, self.iface.as_deref(), timeout).await?;
        self.run_with_stream(stream).await
    }

    async fn close(&mut self) -> Result<()> {
        self.connected.store(false, Ordering::Release);
        self.authenticated.store(false, Ordering::Release);
        self.monitoring.store(false, Ordering::Release);
        self.alarm_monitoring.store(false, Ordering::Release);

        if let Some(handle) = self.keep_alive_handle.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.recv_handle.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.send_handle.lock().await.take() {
            handle.abort();
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn ip(&self) -> &str {
        &self.ip
    }

    fn port(&self) -> u16 {
        self.port
    }
}

impl DVRIPCam {
    async fn run_with_stream(&mut self, stream: TcpStream) -> Result<()> {
        let (mut read, mut write) = stream.into_split();

        let pending: Arc<DashMap<u32, tokio::sync::oneshot::Sender<(PacketHeader, Vec<u8>)>>> =
            Arc::new(DashMap::new());

        let pending_recv = Arc::clone(&pending);
        let alarm_callback = Arc::clone(&self.alarm_callback);
        let frame_callback = Arc::clone(&self.frame_callback);
        let video_assembler = Arc::clone(&self.video_assembler);
        let alarm_monitoring = Arc::clone(&self.alarm_monitoring);
        let video_monitoring = Arc::clone(&self.monitoring);
        let stream_handlers = Arc::clone(&self.stream_handlers);
        let connected = Arc::clone(&self.connected);
        let session = Arc::clone(&self.session);

        *self.recv_handle.lock().await = Some(tokio::spawn(async move {
            let alarm_info_code = QCODES.get("AlarmInfo").copied().unwrap_or(1504);
            loop {
                let mut header_buf = [0u8; PacketHeader::SIZE];
                if read.read_exact(&mut header_buf).await.is_err() {
                    connected.store(false, Ordering::Release);
                    break;
                }
                let Ok(decoded_header) = PacketHeader::decode(&header_buf) else {
                    connected.store(false, Ordering::Release);
                    break;
                };

                let mut data = vec![0u8; decoded_header.data_len as usize];
                if read.read_exact(&mut data).await.is_err() {
                    connected.store(false, Ordering::Release);
                    break;
                }

                if decoded_header.msg_id == 1412 && video_monitoring.load(Ordering::Acquire) {
                    DVRIPCam::__handle_video(
                        frame_callback.clone(),
                        video_assembler.clone(),
                        data,
                    )
                    .await;
                    continue;
                }

                if decoded_header.msg_id == alarm_info_code
                    && alarm_monitoring.load(Ordering::Acquire)
                {
                    DVRIPCam::__handle_alarm(
                        Arc::clone(&alarm_callback),
                        Arc::clone(&session),
                        decoded_header,
                        data,
                    )
                    .await;
                    continue;
                }

                if let Some((_, handler)) = pending_recv.remove(&decoded_header.packet_count) {
                    let _ = handler.send((decoded_header, data));
                    continue;
                }

                if let Some(handler) = stream_handlers.get(&decoded_header.msg_id) {
                    let _ = handler.send((decoded_header, data)).await;
                }
            }
        }));

        let (send, mut recv) = sync::mpsc::channel(100);
        self.send_pool = Arc::new(Some(send));
        *self.send_handle.lock().await = Some(tokio::spawn(async move {
            let mut packet_count = 1u32;
            while let Some(request) = recv.recv().await {
                let mut header = request.header;

                if request.use_internal_counter {
                    header.packet_count = packet_count;
                }

                if let Some(sender) = request.response_sender {
                    pending.insert(header.packet_count, sender);
                }

                if write.write_all(&header.encode()).await.is_err() {
                    break;
                }
                if write.write_all(&request.data).await.is_err() {
                    break;
                }
                if write.flush().await.is_err() {
                    break;
                }

                if request.use_internal_counter {
                    packet_count += 1;
                }
            }
        }));

        self.connected.store(true, Ordering::Release);

        Ok(())
    }
}
