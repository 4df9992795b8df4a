use crate::constants::{OK_CODES, QCODES};
use crate::dvrip::DVRIPCam;
use crate::error::{DVRIPError, Result};
use crate::protocol::{ResponseBody, decode_response};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

pub type UpgradeProgressCallback = Box<dyn Fn(String) + Send + Sync>;

#[async_trait]
pub trait Upgrade: Send + Sync {
    /// Get upgrade information
    async fn get_upgrade_info(&mut self) -> Result<Value>;

    /// Perform system upgrade
    async fn upgrade(
        &mut self,
        filename: &str,
        packet_size: usize,
        progress_callback: Option<UpgradeProgressCallback>,
    ) -> Result<Value>;
}

#[async_trait]
impl Upgrade for DVRIPCam {
    async fn get_upgrade_info(&mut self) -> Result<Value> {
        self.get_command("OPSystemUpgrade", None).await
    }

    async fn upgrade(
        &mut self,
        filename: &str,
        packet_size: usize,
        progress_callback: Option<UpgradeProgressCallback>,
    ) -> Result<Value> {
        let start_data = json!({
            "Action": "Start",
            "Type": "System",
        });

        let reply = self
            .set_command("OPSystemUpgrade", start_data, Some(0x5F0))
            .await?;

        if let Some(ret) = reply.get("Ret").and_then(|r| r.as_u64())
            && !OK_CODES.contains(&(ret as u32))
        {
            return Ok(reply);
        }

        let callback = progress_callback.map(Arc::new);

        let mut file = File::open(filename).await?;
        let file_metadata = file.metadata().await?;
        let file_size = file_metadata.len() as usize;
        let mut sent_bytes = 0usize;

        // OPSendFile runs its own sequence numbering independent of the
        // ordinary RPC counter, and every chunk's ack/error/progress reply
        // carries the same msg_id, so it is claimed as a persistent stream
        // handler for the duration of the transfer rather than a one-shot
        // pending response.
        let send_file_code = QCODES.get("OPSendFile").copied().unwrap_or(0x5F2);
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        self.stream_handlers.insert(send_file_code, tx);

        let result: Result<Value> = async {
            let mut blocknum = 0u32;
            loop {
                let mut buffer = vec![0u8; packet_size];
                let bytes_read = file.read(&mut buffer).await?;
                if bytes_read == 0 {
                    break;
                }
                buffer.truncate(bytes_read);

                self.send_raw_packet_seq(send_file_code, blocknum, buffer)
                    .await?;
                blocknum += 1;
                sent_bytes += bytes_read;

                let ack = Self::recv_upgrade_reply(&mut rx, self.timeout).await?;
                if let Some(ret) = ack.get("Ret").and_then(|r| r.as_u64())
                    && ret != 100
                {
                    if let Some(cb) = &callback {
                        cb("Upgrade failed".to_string());
                    }
                    return Ok(ack);
                }

                if let Some(cb) = &callback {
                    let progress = (sent_bytes as f64 / file_size as f64) * 100.0;
                    cb(format!("Uploading: {:.1}%", progress));
                }
            }

            self.send_raw_packet_seq(send_file_code, blocknum, vec![])
                .await?;

            loop {
                let reply_data = Self::recv_upgrade_reply(&mut rx, self.timeout).await?;
                if let Some(ret) = reply_data.get("Ret").and_then(|r| r.as_u64()) {
                    if ret == 515 {
                        if let Some(cb) = &callback {
                            cb("Upgrade successful".to_string());
                        }
                        return Ok(reply_data);
                    } else if [512, 513, 514].contains(&(ret as u32)) {
                        if let Some(cb) = &callback {
                            cb("Upgrade failed".to_string());
                        }
                        return Ok(reply_data);
                    } else if ret <= 100
                        && let Some(cb) = &callback
                    {
                        cb(format!("Upgrading: {}%", ret));
                    }
                }
            }
        }
        .await;

        self.stream_handlers.remove(&send_file_code);
        result
    }
}

impl DVRIPCam {
    async fn recv_upgrade_reply(
        rx: &mut tokio::sync::mpsc::Receiver<(crate::protocol::PacketHeader, Vec<u8>)>,
        timeout: tokio::time::Duration,
    ) -> Result<Value> {
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some((_header, chunk))) => match decode_response(&chunk) {
                ResponseBody::Parsed(v) => Ok(v),
                ResponseBody::Raw(_) => Err(DVRIPError::SerializationError(
                    "Upgrade reply was not valid JSON".to_string(),
                )),
            },
            Ok(None) => Err(DVRIPError::ConnectionError(
                "Upgrade stream closed unexpectedly".to_string(),
            )),
            Err(_) => Err(DVRIPError::ConnectionError(
                "Timeout waiting for upgrade reply".to_string(),
            )),
        }
    }
}
