//! JSON listing engine
//!
//! Reads listing endpoints that return one page of rows as JSON, such as a
//! server-side DataTables endpoint. Every page is addressed through the
//! `{page}` URL template, so direct jumps are always available.

use crate::config::NavigatorConfig;
use crate::navigation::detail::resolve_link;
use crate::navigation::{
    fetch_text, page_url, politeness_pause, CatalogNavigator, CatalogRow, DetailRef,
    DetailResolver, NavResult, NavigationError, RowExtractionError, RowSlot,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    number: u32,
    body: String,
    document: Value,
}

/// Navigator over a JSON listing endpoint
pub struct JsonNavigator {
    client: Client,
    start_url: Url,
    template: String,
    rows_pointer: String,
    name_field: String,
    detail_field: String,
    total_pointer: Option<String>,
    resolver: DetailResolver,
    politeness: Duration,
    current: Option<LoadedPage>,
    total_hint: Option<u64>,
    /// Largest page seen so far, used to tell the last page from a short one
    page_size: usize,
}

impl JsonNavigator {
    pub fn new(client: Client, config: &NavigatorConfig, resolver: DetailResolver) -> NavResult<Self> {
        let start_url = Url::parse(&config.start_url)
            .map_err(|e| NavigationError::InvalidUrl(format!("{}: {}", config.start_url, e)))?;
        let template = config.page_url_template.clone().ok_or_else(|| {
            NavigationError::InvalidUrl("page-url-template is required by the json engine".into())
        })?;

        Ok(Self {
            client,
            start_url,
            template,
            rows_pointer: config.rows_pointer.clone(),
            name_field: config.name_field.clone(),
            detail_field: config.detail_field.clone(),
            total_pointer: config.total_pointer.clone(),
            resolver,
            politeness: Duration::from_millis(config.politeness_delay_ms),
            current: None,
            total_hint: None,
            page_size: 0,
        })
    }

    async fn load(&mut self, url: Url, number: u32) -> NavResult<()> {
        let body = fetch_text(&self.client, &url).await?;
        politeness_pause(self.politeness).await;

        let document: Value = serde_json::from_str(&body).map_err(|e| NavigationError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let row_count = document
            .pointer(&self.rows_pointer)
            .and_then(Value::as_array)
            .map(Vec::len);
        let Some(row_count) = row_count else {
            self.current = Some(LoadedPage { url: url.clone(), number, body, document });
            return Err(NavigationError::ListingMissing {
                url: url.to_string(),
                reason: format!("no row array at '{}'", self.rows_pointer),
            });
        };
        self.page_size = self.page_size.max(row_count);

        if let Some(pointer) = &self.total_pointer {
            if let Some(total) = document.pointer(pointer).and_then(value_as_u64) {
                self.total_hint = Some(total);
            }
        }

        tracing::debug!("Listing page {} loaded from {} ({} rows)", number, url, row_count);
        self.current = Some(LoadedPage { url, number, body, document });
        Ok(())
    }

    fn page(&self) -> NavResult<&LoadedPage> {
        self.current.as_ref().ok_or(NavigationError::NotOpened)
    }

    fn rows(&self) -> NavResult<&[Value]> {
        let page = self.page()?;
        page.document
            .pointer(&self.rows_pointer)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| NavigationError::ListingMissing {
                url: page.url.to_string(),
                reason: format!("no row array at '{}'", self.rows_pointer),
            })
    }

    fn read_row(&self, index: usize, row: &Value, base_url: &Url) -> RowSlot {
        let name = field(row, &self.name_field)
            .and_then(Value::as_str)
            .map(|name| name.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                RowExtractionError::new(index, format!("missing '{}' text", self.name_field))
            })?;

        let href = field(row, &self.detail_field)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RowExtractionError::new(index, format!("missing '{}' link", self.detail_field))
            })?;

        let detail = resolve_link(href, base_url).ok_or_else(|| {
            RowExtractionError::new(index, format!("unusable detail link '{}'", href))
        })?;

        Ok(CatalogRow::new(name, DetailRef::new(detail)))
    }
}

#[async_trait]
impl CatalogNavigator for JsonNavigator {
    async fn open(&mut self) -> NavResult<()> {
        self.load(self.start_url.clone(), 1).await
    }

    fn current_page(&self) -> u32 {
        self.current.as_ref().map_or(0, |page| page.number)
    }

    async fn list_rows(&mut self) -> NavResult<Vec<RowSlot>> {
        let base_url = self.page()?.url.clone();
        Ok(self
            .rows()?
            .iter()
            .enumerate()
            .map(|(index, row)| self.read_row(index, row, &base_url))
            .collect())
    }

    async fn has_next_page(&mut self) -> NavResult<bool> {
        let number = self.page()?.number;
        let rows_here = self.rows()?.len();
        if rows_here == 0 {
            return Ok(false);
        }

        Ok(match self.total_hint {
            Some(total) => (number as u64) * (self.page_size as u64) < total,
            None => true,
        })
    }

    fn supports_direct_jump(&self) -> bool {
        true
    }

    async fn jump_to_page(&mut self, page: u32) -> NavResult<()> {
        let url = page_url(&self.template, page)?;
        self.load(url, page).await
    }

    async fn next_page(&mut self) -> NavResult<()> {
        let number = self.page()?.number;
        self.jump_to_page(number + 1).await
    }

    async fn resolve_artifact_urls(&mut self, detail: &DetailRef) -> NavResult<Vec<String>> {
        let links = self.resolver.resolve(detail).await?;
        politeness_pause(self.politeness).await;
        Ok(links)
    }

    fn total_hint(&self) -> Option<u64> {
        self.total_hint
    }

    fn snapshot(&self) -> Option<String> {
        self.current.as_ref().map(|page| page.body.clone())
    }
}

/// Looks up a row field by plain key, or by JSON pointer when it starts with '/'
fn field<'a>(row: &'a Value, name: &str) -> Option<&'a Value> {
    if name.starts_with('/') {
        row.pointer(name)
    } else {
        row.get(name)
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}
