//! The page synchronizer.
//!
//! ```text
//! Uninitialized ──▶ Loading ──▶ Ready                        (live pages)
//!                          └──▶ ReadyEditing ⟲ update ──▶ Destroyed
//! ```
//!
//! A preview page opens an RPC channel to the editor frame, announces
//! readiness once the hosting document has loaded, and feeds the editor's
//! update events through an [`UpdatePropagator`].

use std::sync::Arc;

use pagesync_core::{Factories, Page, PageModel};
use pagesync_rpc::{listen, MessageTarget, PostMessageTransport, RpcChannel, RpcConfig, WindowMessage};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::api::Api;
use crate::cms::{CmsBridge, ReadyState};
use crate::config::Configuration;
use crate::error::SpaError;
use crate::http::HttpClient;
use crate::propagator::{propagate, UpdateEvent, UpdateOutcome, UpdatePropagator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaState {
    Uninitialized,
    Loading,
    Ready,
    ReadyEditing,
    Destroyed,
}

/// How the SPA window reaches the editor frame.
pub struct EditorLink {
    /// The editor frame.
    pub target: Arc<dyn MessageTarget>,
    /// Messages posted to the SPA window.
    pub inbox: mpsc::UnboundedReceiver<WindowMessage>,
    /// Readiness of the hosting document.
    pub readiness: watch::Receiver<ReadyState>,
    pub rpc: RpcConfig,
}

pub struct Spa {
    state: SpaState,
    config: Configuration,
    api: Arc<Api>,
    factories: Arc<Factories>,
    page: Option<Arc<Page>>,
    bridge: Option<Arc<CmsBridge>>,
    tasks: Vec<JoinHandle<()>>,
    propagator: Option<JoinHandle<()>>,
}

impl Spa {
    pub fn new(config: Configuration, client: Arc<dyn HttpClient>) -> Self {
        let api = Arc::new(Api::new(&config, client));
        Self {
            state: SpaState::Uninitialized,
            config,
            api,
            factories: Arc::new(Factories::default()),
            page: None,
            bridge: None,
            tasks: Vec::new(),
            propagator: None,
        }
    }

    /// Build entities with custom factories.
    pub fn with_factories(mut self, factories: Factories) -> Self {
        self.factories = Arc::new(factories);
        self
    }

    pub fn state(&self) -> SpaState {
        self.state
    }

    pub fn page(&self) -> Option<&Arc<Page>> {
        self.page.as_ref()
    }

    pub fn bridge(&self) -> Option<&Arc<CmsBridge>> {
        self.bridge.as_ref()
    }

    /// Fetch the page model and start synchronizing.
    pub async fn initialize(&mut self, editor: Option<EditorLink>) -> Result<Arc<Page>, SpaError> {
        self.require(SpaState::Uninitialized)?;
        self.state = SpaState::Loading;
        log::info!("Loading page model from {}", self.api.page_url());

        let model = match self.api.page().await {
            Ok(model) => model,
            Err(e) => {
                self.state = SpaState::Uninitialized;
                return Err(e);
            }
        };
        self.start(model, editor)
    }

    /// Start synchronizing a page model obtained elsewhere.
    ///
    /// Without an editor this needs no runtime. With one, the message pump,
    /// propagator and handshake are spawned, so it must be called from within
    /// a Tokio runtime.
    pub fn initialize_with_model(
        &mut self,
        model: PageModel,
        editor: Option<EditorLink>,
    ) -> Result<Arc<Page>, SpaError> {
        self.require(SpaState::Uninitialized)?;
        self.state = SpaState::Loading;
        self.start(model, editor)
    }

    fn start(&mut self, model: PageModel, editor: Option<EditorLink>) -> Result<Arc<Page>, SpaError> {
        let page = match Page::new(model, self.factories.clone()) {
            Ok(page) => Arc::new(page),
            Err(e) => {
                self.state = SpaState::Uninitialized;
                return Err(e.into());
            }
        };

        match editor {
            Some(editor) if page.is_preview() => {
                if let Err(e) = self.open_editor(page.clone(), editor) {
                    page.destroy();
                    self.state = SpaState::Uninitialized;
                    return Err(e);
                }
                self.state = SpaState::ReadyEditing;
            }
            _ => self.state = SpaState::Ready,
        }

        log::info!(
            "Page {} ready{}",
            page.root().id(),
            if self.state == SpaState::ReadyEditing { " for editing" } else { "" }
        );
        self.page = Some(page.clone());
        Ok(page)
    }

    fn open_editor(&mut self, page: Arc<Page>, editor: EditorLink) -> Result<(), SpaError> {
        let origin = self.config.origin()?;
        let transport = PostMessageTransport::new(editor.target, origin.clone());
        let rpc = Arc::new(RpcChannel::new(Arc::new(transport), editor.rpc));
        let bridge = Arc::new(CmsBridge::new(rpc.clone()));

        let updates = bridge.subscribe_updates();
        self.tasks.push(listen(rpc, origin, editor.inbox));
        self.propagator = Some(UpdatePropagator::new(page, self.api.clone()).spawn(updates));

        let handshake = bridge.clone();
        let readiness = editor.readiness;
        self.tasks.push(tokio::spawn(async move {
            if let Err(e) = handshake.announce_ready(readiness).await {
                log::warn!("Ready handshake failed: {e}");
            }
        }));

        self.bridge = Some(bridge);
        Ok(())
    }

    /// Apply one edit event directly, bypassing the event queue.
    pub async fn handle_update(&self, event: &UpdateEvent) -> Result<UpdateOutcome, SpaError> {
        let page = match (&self.page, self.state) {
            (Some(page), SpaState::Ready | SpaState::ReadyEditing) => page,
            _ => {
                return Err(SpaError::InvalidState {
                    expected: SpaState::ReadyEditing,
                    actual: self.state,
                })
            }
        };
        propagate(page, &self.api, event).await
    }

    /// Ask the editor to re-synchronize its overlays.
    pub async fn sync(&self) -> Result<(), SpaError> {
        self.require(SpaState::ReadyEditing)?;
        match &self.bridge {
            Some(bridge) => Ok(bridge.sync().await?),
            None => Err(SpaError::InvalidState {
                expected: SpaState::ReadyEditing,
                actual: self.state,
            }),
        }
    }

    /// Tear the page down. Fragment fetches already in flight complete but
    /// their results are dropped. Idempotent.
    pub fn destroy(&mut self) {
        if self.state == SpaState::Destroyed {
            return;
        }
        if let Some(bridge) = self.bridge.take() {
            bridge.destroy();
        }
        if let Some(page) = &self.page {
            page.destroy();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        // Detached, not aborted: the propagator finishes its current fetch
        // against the destroyed page, then stops once the update queue closes.
        drop(self.propagator.take());
        self.state = SpaState::Destroyed;
        log::info!("Page synchronizer destroyed");
    }

    fn require(&self, expected: SpaState) -> Result<(), SpaError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SpaError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }
}

impl Drop for Spa {
    fn drop(&mut self) {
        self.destroy();
    }
}
