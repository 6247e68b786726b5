#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use futures_util::StreamExt;
use scout_core::{DataEvent, ScrapeEvent};
use scout_engine::{
    ChannelInfo, ChannelRef, ClientError, ClientFactory, FoundMessage, GlobalHit, ScoutConfig,
    ScrapeStream, SearchClient,
};
use tempfile::TempDir;

/// What the fake platform answers. Unlisted searches return no messages.
#[derive(Debug, Clone)]
pub struct Script {
    pub authorized: bool,
    pub connect_error: Option<ClientError>,
    pub channels: HashMap<String, i64>,
    pub channel_errors: HashMap<String, ClientError>,
    pub searches: HashMap<(String, String), Result<Vec<FoundMessage>, ClientError>>,
    pub global: HashMap<String, Result<Vec<GlobalHit>, ClientError>>,
    pub panic_on_search: Option<(String, String)>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            authorized: true,
            connect_error: None,
            channels: HashMap::new(),
            channel_errors: HashMap::new(),
            searches: HashMap::new(),
            global: HashMap::new(),
            panic_on_search: None,
        }
    }
}

impl Script {
    pub fn with_channel(mut self, handle: &str, id: i64) -> Self {
        self.channels.insert(handle.to_string(), id);
        self
    }

    pub fn with_search(mut self, handle: &str, keyword: &str, messages: Vec<FoundMessage>) -> Self {
        self.searches
            .insert((handle.to_string(), keyword.to_string()), Ok(messages));
        self
    }

    pub fn with_search_error(mut self, handle: &str, keyword: &str, err: ClientError) -> Self {
        self.searches
            .insert((handle.to_string(), keyword.to_string()), Err(err));
        self
    }

    pub fn with_global(mut self, keyword: &str, hits: Vec<GlobalHit>) -> Self {
        self.global.insert(keyword.to_string(), Ok(hits));
        self
    }

    pub fn with_global_error(mut self, keyword: &str, err: ClientError) -> Self {
        self.global.insert(keyword.to_string(), Err(err));
        self
    }
}

/// Everything the fake clients were asked to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal {
    pub created: usize,
    pub connects: usize,
    pub disconnects: usize,
    pub resolved: Vec<String>,
    pub searches: Vec<(String, String, u32)>,
    pub global_searches: Vec<String>,
}

#[derive(Clone)]
pub struct FakeFactory {
    script: Arc<Script>,
    journal: Arc<Mutex<Journal>>,
}

impl FakeFactory {
    pub fn new(script: Script) -> Self {
        Self {
            script: Arc::new(script),
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }

    pub fn journal(&self) -> Journal {
        self.journal.lock().unwrap().clone()
    }

    pub fn client(&self) -> FakeClient {
        FakeClient {
            script: self.script.clone(),
            journal: self.journal.clone(),
        }
    }
}

impl ClientFactory for FakeFactory {
    fn create(&self, _config: &ScoutConfig) -> Result<Box<dyn SearchClient>, ClientError> {
        self.journal.lock().unwrap().created += 1;
        Ok(Box::new(self.client()))
    }
}

pub struct FakeClient {
    script: Arc<Script>,
    journal: Arc<Mutex<Journal>>,
}

#[async_trait::async_trait]
impl SearchClient for FakeClient {
    async fn connect(&mut self) -> Result<(), ClientError> {
        if let Some(err) = &self.script.connect_error {
            return Err(err.clone());
        }
        self.journal.lock().unwrap().connects += 1;
        Ok(())
    }

    async fn is_authorized(&mut self) -> Result<bool, ClientError> {
        Ok(self.script.authorized)
    }

    async fn resolve_channel(&mut self, handle: &str) -> Result<ChannelRef, ClientError> {
        self.journal.lock().unwrap().resolved.push(handle.to_string());
        if let Some(err) = self.script.channel_errors.get(handle) {
            return Err(err.clone());
        }
        match self.script.channels.get(handle) {
            Some(id) => Ok(ChannelRef {
                handle: handle.to_string(),
                id: *id,
            }),
            None => Err(ClientError::ChannelNotFound(handle.to_string())),
        }
    }

    async fn search_channel(
        &mut self,
        channel: &ChannelRef,
        keyword: &str,
        limit: u32,
    ) -> Result<Vec<FoundMessage>, ClientError> {
        self.journal.lock().unwrap().searches.push((
            channel.handle.clone(),
            keyword.to_string(),
            limit,
        ));
        if let Some((handle, word)) = &self.script.panic_on_search {
            if *handle == channel.handle && word == keyword {
                panic!("search backend exploded");
            }
        }
        match self
            .script
            .searches
            .get(&(channel.handle.clone(), keyword.to_string()))
        {
            Some(Ok(messages)) => Ok(messages.iter().take(limit as usize).cloned().collect()),
            Some(Err(err)) => Err(err.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn search_global(
        &mut self,
        keyword: &str,
        limit: u32,
    ) -> Result<Vec<GlobalHit>, ClientError> {
        self.journal
            .lock()
            .unwrap()
            .global_searches
            .push(keyword.to_string());
        match self.script.global.get(keyword) {
            Some(Ok(hits)) => Ok(hits.iter().take(limit as usize).cloned().collect()),
            Some(Err(err)) => Err(err.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn disconnect(&mut self) {
        self.journal.lock().unwrap().disconnects += 1;
    }
}

pub fn base_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap()
}

/// A text message dated `id` minutes after [`base_date`].
pub fn message(id: i64, text: Option<&str>) -> FoundMessage {
    FoundMessage {
        id,
        date: base_date() + ChronoDuration::minutes(id),
        text: text.map(str::to_string),
    }
}

pub fn channel_hit(id: i64, username: Option<&str>, title: &str, channel_id: i64) -> GlobalHit {
    GlobalHit {
        message: message(id, Some("olive harvest, day two")),
        channel: Some(ChannelInfo {
            id: channel_id,
            username: username.map(str::to_string),
            title: title.to_string(),
        }),
    }
}

/// Configuration with credentials and an existing session file.
pub fn session_config() -> (TempDir, ScoutConfig) {
    let temp = TempDir::new().unwrap();
    let session = temp.path().join("journalist_session.session");
    fs::write(&session, b"session").unwrap();
    let config = ScoutConfig::new(session).with_credentials(12345, "0123456789abcdef");
    (temp, config)
}

pub async fn collect(stream: ScrapeStream) -> Vec<ScrapeEvent> {
    stream.collect().await
}

pub fn logs(events: &[ScrapeEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            ScrapeEvent::Log { message } => Some(message.as_str()),
            _ => None,
        })
        .collect()
}

pub fn data(events: &[ScrapeEvent]) -> Vec<&DataEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            ScrapeEvent::Data(data) => Some(data),
            _ => None,
        })
        .collect()
}

pub fn lines(raw: &str) -> Vec<String> {
    scout_core::parse_lines(raw)
}
