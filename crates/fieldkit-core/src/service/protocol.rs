//! Wire format between the shell and the domain service process.
//!
//! Newline-delimited JSON over the service's stdin/stdout. The shell tags
//! traffic with the connection id it handed out and never looks inside
//! `data`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ShellToService {
    NewClient { connection_id: String },
    Message { connection_id: String, data: Value },
    ClientClosed { connection_id: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServiceToShell {
    Message { connection_id: String, data: Value },
    #[serde(other)]
    Other,
}

pub fn encode_line(message: &ShellToService) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(message)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn decode_line(line: &str) -> serde_json::Result<ServiceToShell> {
    serde_json::from_str(line.trim())
}
