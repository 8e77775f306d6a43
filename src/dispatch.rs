use std::sync::Arc;

use arboard::Clipboard;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::app::{AppEvent, Command};

/// Runs controller commands. Network calls go to their own tasks and report
/// back on `event_tx`, so the UI loop never waits on the network.
pub struct Dispatcher {
    client: Arc<ApiClient>,
    event_tx: mpsc::Sender<AppEvent>,
    // Kept alive for the whole session: on X11 the copied text disappears
    // when its owner is dropped.
    clipboard: Option<Clipboard>,
}

impl Dispatcher {
    pub fn new(client: Arc<ApiClient>, event_tx: mpsc::Sender<AppEvent>) -> Self {
        Self {
            client,
            event_tx,
            clipboard: None,
        }
    }

    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::CopyToClipboard(text) => {
                let result = self.copy_to_clipboard(text);
                if self.event_tx.try_send(AppEvent::ClipboardCopied(result)).is_err() {
                    warn!("Event queue full, dropping clipboard result");
                }
            }
            command => {
                let client = Arc::clone(&self.client);
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let event = execute(&client, command).await;
                    if event_tx.send(event).await.is_err() {
                        debug!("Event receiver closed, dropping completion");
                    }
                });
            }
        }
    }

    fn copy_to_clipboard(&mut self, text: String) -> Result<(), String> {
        if self.clipboard.is_none() {
            self.clipboard = Some(Clipboard::new().map_err(|e| e.to_string())?);
        }
        match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(text).map_err(|e| e.to_string()),
            None => Err("clipboard unavailable".to_string()),
        }
    }
}

pub async fn execute(client: &ApiClient, command: Command) -> AppEvent {
    match command {
        Command::Probe => AppEvent::ProbeFinished(client.probe().await),
        Command::FetchVideos { ticket, credential } => AppEvent::VideosLoaded {
            ticket,
            result: client.list_videos(&credential).await,
        },
        Command::FetchTests { ticket, credential } => AppEvent::TestsLoaded {
            ticket,
            result: client.list_tests(&credential).await,
        },
        Command::CreateTest {
            seq,
            credential,
            payload,
        } => AppEvent::TestCreated {
            seq,
            result: client.create_test(&credential, &payload).await,
        },
        Command::CopyToClipboard(_) => {
            AppEvent::ClipboardCopied(Err("clipboard copies run on the UI task".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{RequestTicket, Tab};
    use crate::session::Credential;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fetch_videos_reports_ticket() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/videos")
            .with_status(200)
            .with_body(r#"{"videos":[{"id":"v1","title":"First"}]}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let ticket = RequestTicket {
            tab: Tab::Videos,
            seq: 7,
        };
        let event = execute(
            &client,
            Command::FetchVideos {
                ticket,
                credential: Credential::new("abc123"),
            },
        )
        .await;

        match event {
            AppEvent::VideosLoaded {
                ticket: reported,
                result,
            } => {
                assert_eq!(reported, ticket);
                assert_eq!(result.unwrap().len(), 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers_over_channel() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"{"message":"API is running"}"#)
            .create_async()
            .await;

        let client = Arc::new(ApiClient::new(server.url(), Duration::from_secs(5)).unwrap());
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let mut dispatcher = Dispatcher::new(client, event_tx);

        dispatcher.dispatch(Command::Probe);
        let event = tokio::time::timeout(Duration::from_secs(5), event_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, AppEvent::ProbeFinished(Ok(_))));
    }
}
