use crate::constants::QCODES;
use crate::dvrip::DVRIPCam;
use crate::error::{DVRIPError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde_json::{Value, json};
use std::path::Path;
use tokio::{fs::File, io::AsyncWriteExt};

#[async_trait]
pub trait FileManagement: Send + Sync {
    /// List local files on the device
    async fn list_local_files(
        &mut self,
        start_time: DateTime<Local>,
        end_time: DateTime<Local>,
        file_type: &str,
        channel: u8,
    ) -> Result<Vec<Value>>;

    /// Download a file from the device
    async fn download_file(
        &mut self,
        start_time: DateTime<Local>,
        end_time: DateTime<Local>,
        filename: &str,
        target_path: &str,
    ) -> Result<()>;
}

fn file_query(begin: &str, end: &str, channel: u8, file_type: &str) -> Value {
    json!({
        "Name": "OPFileQuery",
        "OPFileQuery": {
            "BeginTime": begin,
            "Channel": channel,
            "DriverTypeMask": "0x0000FFFF",
            "EndTime": end,
            "Event": "*",
            "StreamType": "0x00000000",
            "Type": file_type,
        },
    })
}

/// Drives the two-phase pagination `OPFileQuery` uses: each reply caps out
/// at 64 entries, and the device caps a single logical query's total result
/// at 511 entries. Hitting either cap means "query again starting from the
/// last entry's BeginTime"; the query is exhausted only once two
/// consecutive rounds return the same total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryStatus {
    Init,
    Run,
    Limit,
}

#[async_trait]
impl FileManagement for DVRIPCam {
    async fn list_local_files(
        &mut self,
        start_time: DateTime<Local>,
        end_time: DateTime<Local>,
        file_type: &str,
        channel: u8,
    ) -> Result<Vec<Value>> {
        let start_str = start_time.format("%Y-%m-%d %H:%M:%S").to_string();
        let end_str = end_time.format("%Y-%m-%d %H:%M:%S").to_string();

        let mut reply = self
            .send_command(1440, file_query(&start_str, &end_str, channel, file_type), true)
            .await?
            .ok_or_else(|| DVRIPError::ProtocolError("Empty response".to_string()))?;

        if let Some(ret) = reply.get("Ret").and_then(|r| r.as_u64())
            && ret != 100
        {
            return Ok(vec![]);
        }

        let mut result: Vec<Value> = reply
            .get("OPFileQuery")
            .and_then(|f| f.as_array())
            .cloned()
            .unwrap_or_default();

        let mut status = QueryStatus::Init;
        let mut last_num_results = 0usize;

        loop {
            if !matches!(status, QueryStatus::Init | QueryStatus::Limit) {
                break;
            }
            if status == QueryStatus::Init {
                status = QueryStatus::Run;
            }

            loop {
                let page_len = reply
                    .get("OPFileQuery")
                    .and_then(|f| f.as_array())
                    .map(|a| a.len())
                    .unwrap_or(0);

                if !(page_len == 64 || status == QueryStatus::Limit) {
                    break;
                }

                let Some(new_start) = reply
                    .get("OPFileQuery")
                    .and_then(|f| f.as_array())
                    .and_then(|a| a.last())
                    .and_then(|f| f.get("BeginTime"))
                    .and_then(|t| t.as_str())
                    .map(|s| s.to_string())
                else {
                    break;
                };

                reply = self
                    .send_command(1440, file_query(&new_start, &end_str, channel, file_type), true)
                    .await?
                    .ok_or_else(|| DVRIPError::ProtocolError("Empty response".to_string()))?;

                if let Some(new_files) = reply.get("OPFileQuery").and_then(|f| f.as_array()) {
                    if new_files.is_empty() {
                        break;
                    }
                    result.extend(new_files.clone());
                } else {
                    break;
                }

                status = QueryStatus::Run;
            }

            if result.len() % 511 == 0 || status == QueryStatus::Limit {
                if result.len() == last_num_results {
                    return Ok(result);
                }
                status = QueryStatus::Limit;
                last_num_results = result.len();
            }
        }

        Ok(result)
    }

    async fn download_file(
        &mut self,
        start_time: DateTime<Local>,
        end_time: DateTime<Local>,
        filename: &str,
        target_path: &str,
    ) -> Result<()> {
        if let Some(parent) = Path::new(target_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let start_str = start_time.format("%Y-%m-%d %H:%M:%S").to_string();
        let end_str = end_time.format("%Y-%m-%d %H:%M:%S").to_string();

        let claim_data = json!({
            "Name": "OPPlayBack",
            "OPPlayBack": {
                "Action": "Claim",
                "Parameter": {
                    "PlayMode": "ByName",
                    "FileName": filename,
                    "StreamType": 0,
                    "Value": 0,
                    "TransMode": "TCP",
                },
                "StartTime": start_str,
                "EndTime": end_str,
            },
        });
        self.send_command(1424, claim_data, true).await?;

        let download_code = QCODES.get("OPPlayBack").copied().unwrap_or(1420);
        let (tx, mut rx) = tokio::sync::mpsc::channel(32);
        self.stream_handlers.insert(download_code, tx);

        let download_start_data = json!({
            "Name": "OPPlayBack",
            "OPPlayBack": {
                "Action": "DownloadStart",
                "Parameter": {
                    "PlayMode": "ByName",
                    "FileName": filename,
                    "StreamType": 0,
                    "Value": 0,
                    "TransMode": "TCP",
                },
                "StartTime": start_str,
                "EndTime": end_str,
            },
        });

        let result: Result<()> = async {
            self.send_command(1420, download_start_data, false).await?;

            let mut file_data = Vec::new();
            loop {
                match tokio::time::timeout(self.timeout, rx.recv()).await {
                    Ok(Some((_header, chunk))) => {
                        if chunk.is_empty() {
                            break;
                        }
                        file_data.extend_from_slice(&chunk);
                    }
                    Ok(None) => {
                        return Err(DVRIPError::ConnectionError(
                            "Download stream closed unexpectedly".to_string(),
                        ));
                    }
                    Err(_) => {
                        return Err(DVRIPError::ConnectionError(
                            "Timeout receiving file data".to_string(),
                        ));
                    }
                }
            }

            let mut file = File::create(target_path).await?;
            file.write_all(&file_data).await?;
            file.sync_all().await?;
            Ok(())
        }
        .await;

        self.stream_handlers.remove(&download_code);

        let download_stop_data = json!({
            "Name": "OPPlayBack",
            "OPPlayBack": {
                "Action": "DownloadStop",
                "Parameter": {
                    "FileName": filename,
                    "PlayMode": "ByName",
                    "StreamType": 0,
                    "TransMode": "TCP",
                    "Channel": 0,
                    "Value": 0,
                },
                "StartTime": start_str,
                "EndTime": end_str,
            },
        });
        let _ = self.send_command(1420, download_stop_data, false).await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(target_path).await;
            return Err(e);
        }

        Ok(())
    }
}
