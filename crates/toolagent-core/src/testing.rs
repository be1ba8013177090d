//! Fake model and tool channel shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::action::ToolArgs;
use crate::error::{AgentError, ChannelError, Result};
use crate::provider::ModelInvoker;
use crate::tool::{ToolChannel, ToolDescriptor, ToolOutput, ToolSession};

/// Model that replays canned completions and records what it was sent
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    inputs: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([Err(AgentError::Model(message.into()))])),
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelInvoker for ScriptedModel {
    async fn invoke(&self, text: &str) -> Result<String> {
        self.inputs.lock().unwrap().push(text.to_owned());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("model says: {text}")))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// What a fake tool call does
#[derive(Clone, Debug)]
pub enum FakeReply {
    Output(ToolOutput),
    Error(ChannelError),
    Panic(&'static str),
    Hang,
    /// Output after the given delay
    Slow(Duration, ToolOutput),
}

#[derive(Default)]
struct FakeState {
    opened: AtomicUsize,
    closed: AtomicUsize,
    released: AtomicUsize,
    calls: Mutex<Vec<(String, ToolArgs)>>,
}

/// In-memory tool channel counting session opens and releases
pub struct FakeChannel {
    reply: FakeReply,
    tools: Vec<ToolDescriptor>,
    refuse: Option<ChannelError>,
    close_delay: Duration,
    state: Arc<FakeState>,
}

impl FakeChannel {
    pub fn new(reply: FakeReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            tools: Vec::new(),
            refuse: None,
            close_delay: Duration::ZERO,
            state: Arc::default(),
        })
    }

    pub fn refusing(error: ChannelError) -> Arc<Self> {
        Arc::new(Self {
            reply: FakeReply::Output(ToolOutput::default()),
            tools: Vec::new(),
            refuse: Some(error),
            close_delay: Duration::ZERO,
            state: Arc::default(),
        })
    }

    pub fn with_tools(self: Arc<Self>, tools: Vec<ToolDescriptor>) -> Arc<Self> {
        Arc::new(Self {
            reply: self.reply.clone(),
            tools,
            refuse: self.refuse.clone(),
            close_delay: self.close_delay,
            state: Arc::clone(&self.state),
        })
    }

    /// Sessions take `delay` to close, like a server that is slow to exit
    pub fn with_close_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: self.reply.clone(),
            tools: self.tools.clone(),
            refuse: self.refuse.clone(),
            close_delay: delay,
            state: Arc::clone(&self.state),
        })
    }

    /// Sessions closed explicitly, as opposed to dropped
    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, ToolArgs)> {
        self.state.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolChannel for FakeChannel {
    async fn open(&self) -> std::result::Result<Box<dyn ToolSession>, ChannelError> {
        if let Some(error) = &self.refuse {
            return Err(error.clone());
        }
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            reply: self.reply.clone(),
            tools: self.tools.clone(),
            close_delay: self.close_delay,
            state: Arc::clone(&self.state),
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeSession {
    reply: FakeReply,
    tools: Vec<ToolDescriptor>,
    close_delay: Duration,
    state: Arc<FakeState>,
}

#[async_trait]
impl ToolSession for FakeSession {
    async fn list_tools(&mut self) -> std::result::Result<Vec<ToolDescriptor>, ChannelError> {
        Ok(self.tools.clone())
    }

    async fn call(
        &mut self,
        name: &str,
        args: &ToolArgs,
    ) -> std::result::Result<ToolOutput, ChannelError> {
        self.state
            .calls
            .lock()
            .unwrap()
            .push((name.to_owned(), args.clone()));

        match &self.reply {
            FakeReply::Output(output) => Ok(output.clone()),
            FakeReply::Error(error) => Err(error.clone()),
            FakeReply::Panic(message) => panic!("{message}"),
            FakeReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ToolOutput::default())
            }
            FakeReply::Slow(delay, output) => {
                tokio::time::sleep(*delay).await;
                Ok(output.clone())
            }
        }
    }

    async fn close(self: Box<Self>) {
        tokio::time::sleep(self.close_delay).await;
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }
}
