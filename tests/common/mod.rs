#![allow(dead_code)]

use async_trait::async_trait;
use gfs_pipeline::core::{MailTransport, SmtpLogin};
use gfs_pipeline::Result;
use lettre::Message;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 記錄每次送信，不連線
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(SmtpLogin, Vec<u8>)>>,
}

impl RecordingTransport {
    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last_raw(&self) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .last()
            .map(|(_, raw)| String::from_utf8_lossy(raw).into_owned())
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, login: &SmtpLogin, message: Message) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((login.clone(), message.formatted()));
        Ok(())
    }
}

/// Writes a `/bin/sh` stub script and returns its path.
pub fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("set -e\n{}\n", body)).unwrap();
    path
}
