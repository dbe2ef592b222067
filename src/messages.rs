//! Typed request/response protocol between the surfaces and the two contexts.
//!
//! Requests are JSON objects tagged by `action`. [`serve`] speaks it as
//! newline-delimited JSON over any reader/writer pair.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::core::{ResultSet, ScanRecord};
use crate::dom::Document;
use crate::engine::{Engine, ScanMode};
use crate::filters::{self, VisualFilter};
use crate::overlay::{HighlightFilter, Overlay};
use crate::store::{ExportBundle, Settings, Store, track_event};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    QuickScan,
    DetailedScan,
    ScanElement {
        selector: String,
    },
    HighlightIssues {
        #[serde(rename = "type", default)]
        filter: HighlightFilter,
    },
    ClearHighlights,
    ApplyFilter {
        filter: VisualFilter,
    },
    ClearFilter,
    GetSettings,
    SaveSettings {
        settings: Value,
    },
    GetScanHistory,
    SaveScanResult {
        result: ScanRecord,
    },
    ExportData,
    ImportData {
        data: Value,
    },
    ClearData,
    CheckUpdate,
}

impl Request {
    pub const fn action(&self) -> &'static str {
        match self {
            Request::QuickScan => "quickScan",
            Request::DetailedScan => "detailedScan",
            Request::ScanElement { .. } => "scanElement",
            Request::HighlightIssues { .. } => "highlightIssues",
            Request::ClearHighlights => "clearHighlights",
            Request::ApplyFilter { .. } => "applyFilter",
            Request::ClearFilter => "clearFilter",
            Request::GetSettings => "getSettings",
            Request::SaveSettings { .. } => "saveSettings",
            Request::GetScanHistory => "getScanHistory",
            Request::SaveScanResult { .. } => "saveScanResult",
            Request::ExportData => "exportData",
            Request::ImportData { .. } => "importData",
            Request::ClearData => "clearData",
            Request::CheckUpdate => "checkUpdate",
        }
    }

    /// Served by the page-owning context rather than the store.
    pub const fn is_content(&self) -> bool {
        matches!(
            self,
            Request::QuickScan
                | Request::DetailedScan
                | Request::ScanElement { .. }
                | Request::HighlightIssues { .. }
                | Request::ClearHighlights
                | Request::ApplyFilter { .. }
                | Request::ClearFilter
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(err: &anyhow::Error) -> Self {
        Self {
            success: false,
            error: Some(format!("{err:#}")),
        }
    }
}

impl From<Result<()>> for Status {
    fn from(r: Result<()>) -> Self {
        match r {
            Ok(()) => Status::ok(),
            Err(err) => Status::failed(&err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum Response {
    Results(ResultSet),
    #[serde(rename_all = "camelCase")]
    Highlighted {
        drawn: usize,
    },
    Done,
    Settings(Settings),
    History(Vec<ScanRecord>),
    Status(Status),
    Export {
        success: bool,
        data: ExportBundle,
    },
    #[serde(rename_all = "camelCase")]
    Update {
        success: bool,
        update_available: bool,
    },
    Error {
        message: String,
    },
}

impl Response {
    pub fn error(err: &anyhow::Error) -> Self {
        Response::Error {
            message: format!("{err:#}"),
        }
    }
}

/// Owns one page: the engine that scans it, its overlay and the last results.
#[derive(Debug)]
pub struct ContentContext {
    engine: Engine,
    document: Option<Document>,
    overlay: Overlay,
    results: ResultSet,
}

impl ContentContext {
    pub fn new(engine: Engine, overlay: Overlay) -> Self {
        Self {
            engine,
            document: None,
            overlay,
            results: ResultSet::new(),
        }
    }

    pub fn attach(&mut self, doc: Document) {
        self.overlay.clear_highlights();
        self.document = Some(doc);
        self.results = ResultSet::new();
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Swaps in new excluded selectors, custom rules and overlay colors.
    pub fn apply_settings(&mut self, settings: &Settings) {
        let mut opts = self.engine.options().clone();
        opts.rules = opts.rules.with_settings(settings);
        self.engine = Engine::new(opts);
        let doc_overlay = self
            .document
            .as_ref()
            .map(|doc| Overlay::attach(doc, settings.colors.clone()));
        self.overlay = doc_overlay.unwrap_or_else(|| Overlay::new(settings.colors.clone()));
    }

    pub fn handle(&mut self, request: &Request) -> Response {
        let Some(doc) = self.document.as_mut() else {
            tracing::warn!(action = request.action(), "no page attached");
            return Response::Error {
                message: "no page attached".to_string(),
            };
        };
        match request {
            Request::QuickScan | Request::DetailedScan => {
                let mode = if matches!(request, Request::QuickScan) {
                    ScanMode::Quick
                } else {
                    ScanMode::Detailed
                };
                self.results = self.engine.scan(doc, mode).results;
                Response::Results(self.results.clone())
            }
            Request::ScanElement { selector } => match self.engine.scan_element(doc, selector) {
                Ok(pass) => {
                    self.results = pass.results;
                    Response::Results(self.results.clone())
                }
                Err(err) => {
                    tracing::warn!(selector = %selector, error = %err, "element scan failed");
                    Response::error(&err)
                }
            },
            Request::HighlightIssues { filter } => {
                let drawn = self.overlay.highlight(doc, &self.results, *filter);
                Response::Highlighted { drawn }
            }
            Request::ClearHighlights => {
                self.overlay.clear_highlights();
                Response::Done
            }
            Request::ApplyFilter { filter } => {
                if filters::apply(doc, *filter) {
                    Response::Done
                } else {
                    Response::Error {
                        message: "page has no body".to_string(),
                    }
                }
            }
            Request::ClearFilter => {
                filters::clear(doc);
                Response::Done
            }
            other => Response::Error {
                message: format!("not a page action: {}", other.action()),
            },
        }
    }
}

/// Owns the persistent store.
#[derive(Debug, Clone)]
pub struct BackgroundContext {
    store: Store,
}

impl BackgroundContext {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn handle(&mut self, request: &Request) -> Response {
        match self.try_handle(request) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(action = request.action(), error = %format!("{err:#}"), "request failed");
                Response::error(&err)
            }
        }
    }

    fn try_handle(&mut self, request: &Request) -> Result<Response> {
        let response = match request {
            Request::GetSettings => Response::Settings(self.store.settings()?),
            Request::SaveSettings { settings } => {
                let saved = serde_json::from_value::<Settings>(settings.clone())
                    .context("invalid settings")
                    .and_then(|s| self.store.save_settings(s));
                Response::Status(saved.into())
            }
            Request::GetScanHistory => Response::History(self.store.history()?),
            Request::SaveScanResult { result } => {
                Response::Status(self.store.save_scan_result(result.clone()).into())
            }
            Request::ExportData => Response::Export {
                success: true,
                data: self.store.export()?,
            },
            Request::ImportData { data } => {
                Response::Status(self.store.import(data).map(|_| ()).into())
            }
            Request::ClearData => Response::Status(self.store.clear().into()),
            Request::CheckUpdate => {
                let check = self.store.check_update(OffsetDateTime::now_utc())?;
                Response::Update {
                    success: true,
                    update_available: check.update_available,
                }
            }
            other => Response::Error {
                message: format!("not a storage action: {}", other.action()),
            },
        };
        Ok(response)
    }
}

/// Dispatches each request to the context that serves it.
#[derive(Debug)]
pub struct Router {
    pub content: ContentContext,
    pub background: BackgroundContext,
}

impl Router {
    pub fn new(content: ContentContext, background: BackgroundContext) -> Self {
        Self {
            content,
            background,
        }
    }

    /// Attaches a page. With `autoScan` enabled the page is quick-scanned and
    /// the result saved under `url`.
    pub fn open_page(&mut self, doc: Document, url: &str) -> Result<()> {
        self.content.attach(doc);
        let settings = self.background.store().settings()?;
        if settings.auto_scan {
            if let Response::Results(results) = self.content.handle(&Request::QuickScan) {
                self.background
                    .store()
                    .save_scan_result(ScanRecord::new(url, results))?;
            }
        }
        Ok(())
    }

    pub fn handle(&mut self, request: &Request) -> Response {
        tracing::debug!(action = request.action(), "request");
        if let Ok(settings) = self.background.store().settings() {
            track_event(&settings, request.action(), "");
        }
        if request.is_content() {
            return self.content.handle(request);
        }
        let response = self.background.handle(request);
        let settings_changed = matches!(
            (request, &response),
            (
                Request::SaveSettings { .. } | Request::ImportData { .. } | Request::ClearData,
                Response::Status(Status { success: true, .. })
            )
        );
        if settings_changed {
            if let Ok(settings) = self.background.store().settings() {
                self.content.apply_settings(&settings);
            }
        }
        response
    }
}

/// Reads one request per line and writes one response per line until EOF.
/// Blank lines are skipped; undecodable lines get an error response.
pub fn serve(router: &mut Router, input: impl BufRead, mut output: impl Write) -> Result<()> {
    for line in input.lines() {
        let line = line.context("failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => router.handle(&request),
            Err(err) => {
                tracing::warn!(error = %err, "undecodable request");
                Response::Error {
                    message: format!("invalid request: {err}"),
                }
            }
        };
        let mut encoded = serde_json::to_vec(&response).context("failed to encode response")?;
        encoded.push(b'\n');
        match output.write_all(&encoded).and_then(|()| output.flush()) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
            Err(err) => return Err(err).context("failed to write response"),
        }
    }
    Ok(())
}
