//! Stdin/stdout JSON bridge for the board backend.
//!
//! Reads newline-delimited JSON requests `{ id, method, params }`, runs each
//! through [`rpc::invoke`], and writes `{ id, success, data | kind, error }`
//! replies. Events such as the startup due-date reminder are written as
//! `{ event, payload }` lines on the same stream.
//!
//! Stdout is reserved for the protocol; tracing goes to stderr.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;

use crate::commands::data::loadData;
use crate::commands::notification::{checkDueTasksToday, startupNotification, Notification};
use crate::error::{AppError, Result};
use crate::rpc::{invoke, Reply};
use crate::storage::{Storage, StorageState};

/// Delay before the one-shot due-date reminder
pub const STARTUP_NOTIFICATION_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub id: Value,
    #[serde(flatten)]
    pub reply: Reply,
}

#[derive(Debug, Serialize)]
pub struct Event<T: Serialize> {
    pub event: &'static str,
    pub payload: T,
}

type SharedWriter<W> = Arc<Mutex<BufWriter<W>>>;

/// Reminder for overdue or due-today tasks in the stored document
pub fn startupEvent(storage: &Storage) -> Option<Event<Notification>> {
    let loaded = loadData(storage);
    let due = checkDueTasksToday(&loaded.document.tasks);
    startupNotification(&due).map(|payload| Event {
        event: "notification",
        payload,
    })
}

/// Write a single JSON line and flush.
async fn writeLine<W: AsyncWrite + Unpin>(writer: &mut BufWriter<W>, json: &str) -> Result<()> {
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

async fn send<W: AsyncWrite + Unpin, T: Serialize>(writer: &SharedWriter<W>, message: &T) -> Result<()> {
    let json = serde_json::to_string(message)?;
    let mut w = writer.lock().await;
    writeLine(&mut w, &json).await
}

/// Serve requests from `reader` until EOF.
///
/// When `startupDelay` is set, the due-date reminder is checked once after
/// that delay and emitted as an event if anything is due.
pub async fn serve<R, W>(storage: StorageState, reader: R, writer: W, startupDelay: Option<Duration>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer: SharedWriter<W> = Arc::new(Mutex::new(BufWriter::new(writer)));

    let reminder = startupDelay.map(|delay| {
        let storage = Arc::clone(&storage);
        let writer = Arc::clone(&writer);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(event) = startupEvent(&storage) else {
                tracing::debug!("[startupNotification] Nothing due");
                return;
            };
            tracing::info!("[startupNotification] {}", event.payload.message);
            if let Err(e) = send(&writer, &event).await {
                tracing::warn!("[startupNotification] Could not write event: {}", e);
            }
        })
    });

    let result = readRequests(&storage, reader, &writer).await;

    if let Some(handle) = reminder {
        handle.abort();
        let _ = handle.await;
    }
    result
}

async fn readRequests<R, W>(storage: &Storage, reader: R, writer: &SharedWriter<W>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(trimmed) {
            Ok(request) => Response {
                reply: invoke(storage, None, &request.method, request.params),
                id: request.id,
            },
            Err(e) => {
                tracing::warn!(error = %e, "[bridge] Failed to parse request");
                Response {
                    id: Value::Null,
                    reply: Reply::err(&AppError::malformed(format!("Failed to parse request: {}", e))),
                }
            }
        };

        send(writer, &response).await?;
    }

    tracing::info!("[bridge] stdin closed; shutting down");
    Ok(())
}

/// Run the bridge over the process's stdin and stdout
pub async fn runStdioBridge(storage: StorageState) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    serve(storage, stdin, tokio::io::stdout(), Some(STARTUP_NOTIFICATION_DELAY)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::data::saveData;
    use crate::models::{Task, TaskDocument};
    use crate::storage::initStorage;
    use serde_json::json;

    async fn run(storage: StorageState, input: &str) -> Vec<Value> {
        let (client, server) = tokio::io::duplex(64 * 1024);
        serve(storage, input.as_bytes(), client, None).await.unwrap();

        let mut out = String::new();
        let mut server = BufReader::new(server);
        loop {
            let mut line = String::new();
            // Writer half is dropped once serve returns, so this reaches EOF
            if server.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            out.push_str(&line);
        }
        out.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_request_reply_lines() {
        let dir = tempfile::tempdir().unwrap();
        let storage = initStorage(dir.path()).unwrap();
        let input = concat!(
            r#"{"id": 1, "method": "getSetting", "params": {"key": "theme"}}"#,
            "\n\n",
            r#"{"id": "b", "method": "deleteBackup", "params": {"name": "backup_x.json"}}"#,
            "\n",
            "this is not json\n",
        );

        let replies = run(storage, input).await;
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0], json!({"id": 1, "success": true, "data": "light"}));
        assert_eq!(
            replies[1],
            json!({"id": "b", "success": false, "kind": "notFound", "error": "Backup not found"})
        );
        assert_eq!(replies[2]["id"], Value::Null);
        assert_eq!(replies[2]["kind"], json!("malformedInput"));
    }

    #[test]
    fn test_startup_event() {
        let dir = tempfile::tempdir().unwrap();
        let storage = initStorage(dir.path()).unwrap();
        assert!(startupEvent(&storage).is_none());

        let mut document = TaskDocument::default();
        document
            .tasks
            .push(serde_json::from_value::<Task>(json!({"title": "Late", "targetDate": "2000-01-01"})).unwrap());
        saveData(&storage, document).unwrap();

        let event = startupEvent(&storage).unwrap();
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "notification", "payload": {"title": "Overdue Tasks", "message": "You have 1 overdue task(s)!"}})
        );
    }
}
