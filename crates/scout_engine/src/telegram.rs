//! MTProto backend over `grammers`.
//!
//! The session file is only read; logging in and writing sessions happens
//! elsewhere.
use std::collections::HashMap;
use std::path::PathBuf;

use chrono::DateTime;
use grammers_client::types::Message;
use grammers_client::{Client, Config, InitParams, InvocationError};
use grammers_session::{PackedChat, Session};
use grammers_tl_types as tl;
use scout_logging::scout_debug;

use crate::client::{ClientFactory, SearchClient};
use crate::config::ScoutConfig;
use crate::{ChannelInfo, ChannelRef, ClientError, FoundMessage, GlobalHit};

#[derive(Debug, Clone, Copy, Default)]
pub struct TelegramClientFactory;

impl ClientFactory for TelegramClientFactory {
    fn create(&self, config: &ScoutConfig) -> Result<Box<dyn SearchClient>, ClientError> {
        let credentials = config.credentials.as_ref().ok_or_else(|| {
            ClientError::Unavailable("Telegram API credentials are not configured".to_string())
        })?;
        Ok(Box::new(TelegramSearchClient {
            session_path: config.session_path.clone(),
            api_id: credentials.api_id,
            api_hash: credentials.api_hash.clone(),
            system_version: config.system_version.clone(),
            client: None,
            chats: HashMap::new(),
        }))
    }
}

pub struct TelegramSearchClient {
    session_path: PathBuf,
    api_id: i32,
    api_hash: String,
    system_version: String,
    client: Option<Client>,
    /// Channels resolved during this connection, by id.
    chats: HashMap<i64, PackedChat>,
}

impl TelegramSearchClient {
    fn client(&self) -> Result<&Client, ClientError> {
        self.client.as_ref().ok_or(ClientError::NotConnected)
    }
}

#[async_trait::async_trait]
impl SearchClient for TelegramSearchClient {
    async fn connect(&mut self) -> Result<(), ClientError> {
        let session = Session::load_file(&self.session_path).map_err(|err| {
            ClientError::Unavailable(format!(
                "could not load session file {:?} (a grammers session is required): {err}",
                self.session_path
            ))
        })?;
        let client = Client::connect(Config {
            session,
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            params: InitParams {
                system_version: self.system_version.clone(),
                // Surface every flood wait to the caller instead of sleeping inside the library.
                flood_sleep_threshold: 0,
                ..Default::default()
            },
        })
        .await
        .map_err(|err| ClientError::Network(err.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    async fn is_authorized(&mut self) -> Result<bool, ClientError> {
        self.client()?
            .is_authorized()
            .await
            .map_err(map_invocation_error)
    }

    async fn resolve_channel(&mut self, handle: &str) -> Result<ChannelRef, ClientError> {
        let chat = self
            .client()?
            .resolve_username(handle)
            .await
            .map_err(|err| match map_invocation_error(err) {
                ClientError::Rpc(_) => ClientError::ChannelNotFound(handle.to_string()),
                other => other,
            })?
            .ok_or_else(|| ClientError::ChannelNotFound(handle.to_string()))?;
        let id = chat.id();
        self.chats.insert(id, chat.pack());
        Ok(ChannelRef {
            handle: handle.to_string(),
            id,
        })
    }

    async fn search_channel(
        &mut self,
        channel: &ChannelRef,
        keyword: &str,
        limit: u32,
    ) -> Result<Vec<FoundMessage>, ClientError> {
        let packed = *self
            .chats
            .get(&channel.id)
            .ok_or_else(|| ClientError::ChannelNotFound(channel.handle.clone()))?;
        let mut messages = self
            .client()?
            .search_messages(packed)
            .query(keyword)
            .limit(limit as usize);

        let mut found = Vec::new();
        while let Some(message) = messages.next().await.map_err(map_invocation_error)? {
            found.push(found_message(&message));
        }
        scout_debug!("@{}: {} hits for '{keyword}'", channel.handle, found.len());
        Ok(found)
    }

    async fn search_global(
        &mut self,
        keyword: &str,
        limit: u32,
    ) -> Result<Vec<GlobalHit>, ClientError> {
        // One request, restricted to broadcast channels on the server side.
        let request = tl::functions::messages::SearchGlobal {
            broadcasts_only: true,
            groups_only: false,
            users_only: false,
            folder_id: None,
            q: keyword.to_string(),
            filter: tl::enums::MessagesFilter::InputMessagesFilterEmpty,
            min_date: 0,
            max_date: 0,
            offset_rate: 0,
            offset_peer: tl::enums::InputPeer::Empty,
            offset_id: 0,
            limit: i32::try_from(limit).unwrap_or(i32::MAX),
        };
        let (messages, chats) = match self
            .client()?
            .invoke(&request)
            .await
            .map_err(map_invocation_error)?
        {
            tl::enums::messages::Messages::Messages(found) => (found.messages, found.chats),
            tl::enums::messages::Messages::Slice(found) => (found.messages, found.chats),
            tl::enums::messages::Messages::ChannelMessages(found) => {
                (found.messages, found.chats)
            }
            tl::enums::messages::Messages::NotModified(_) => (Vec::new(), Vec::new()),
        };

        let channels: HashMap<i64, ChannelInfo> = chats
            .into_iter()
            .filter_map(|chat| match chat {
                tl::enums::Chat::Channel(channel) => Some((
                    channel.id,
                    ChannelInfo {
                        id: channel.id,
                        username: channel.username,
                        title: channel.title,
                    },
                )),
                _ => None,
            })
            .collect();

        let hits: Vec<_> = messages
            .into_iter()
            .filter_map(|message| match message {
                tl::enums::Message::Message(message) => Some(message),
                _ => None,
            })
            .map(|message| {
                let channel = match &message.peer_id {
                    tl::enums::Peer::Channel(peer) => channels.get(&peer.channel_id).cloned(),
                    _ => None,
                };
                GlobalHit {
                    message: FoundMessage {
                        id: i64::from(message.id),
                        date: DateTime::from_timestamp(i64::from(message.date), 0)
                            .unwrap_or_default(),
                        text: (!message.message.is_empty()).then_some(message.message),
                    },
                    channel,
                }
            })
            .collect();
        scout_debug!("global search: {} hits for '{keyword}'", hits.len());
        Ok(hits)
    }

    async fn disconnect(&mut self) {
        // Dropping the client closes the connection; the session file stays untouched.
        self.client = None;
        self.chats.clear();
    }
}

fn found_message(message: &Message) -> FoundMessage {
    let text = message.text();
    FoundMessage {
        id: i64::from(message.id()),
        date: message.date(),
        text: (!text.is_empty()).then(|| text.to_string()),
    }
}

fn map_invocation_error(err: InvocationError) -> ClientError {
    match err {
        InvocationError::Rpc(rpc) if rpc.name == "FLOOD_WAIT" => ClientError::FloodWait {
            seconds: u64::from(rpc.value.unwrap_or(0)),
        },
        InvocationError::Rpc(rpc) => ClientError::Rpc(rpc.to_string()),
        other => ClientError::Network(other.to_string()),
    }
}
