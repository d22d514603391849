//! Server-rendered HTML listing engine
//!
//! Pages are fetched with reqwest and read with scraper. Parsed documents are
//! never kept across an await: the raw body of the current page is stored and
//! every query parses it in a synchronous helper.

use crate::config::NavigatorConfig;
use crate::navigation::detail::resolve_link;
use crate::navigation::{
    fetch_text, page_url, politeness_pause, CatalogNavigator, CatalogRow, DetailRef,
    DetailResolver, NavResult, NavigationError, RowExtractionError, RowSlot,
};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use url::Url;

/// The listing page the session is positioned on
#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    number: u32,
    body: String,
}

/// State of the "next page" control on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
enum NextControl {
    Missing,
    Disabled,
    Enabled { href: Option<String> },
}

/// Navigator over an HTML listing
pub struct HtmlNavigator {
    client: Client,
    start_url: Url,
    page_url_template: Option<String>,
    listing: Option<Selector>,
    row: Selector,
    link: Selector,
    any_link: Selector,
    next: Option<Selector>,
    next_disabled_class: String,
    total: Option<Selector>,
    resolver: DetailResolver,
    politeness: Duration,
    current: Option<LoadedPage>,
    total_hint: Option<u64>,
}

impl HtmlNavigator {
    pub fn new(client: Client, config: &NavigatorConfig, resolver: DetailResolver) -> NavResult<Self> {
        let start_url = Url::parse(&config.start_url)
            .map_err(|e| NavigationError::InvalidUrl(format!("{}: {}", config.start_url, e)))?;
        let row_selector = config.row_selector.as_deref().ok_or_else(|| {
            NavigationError::InvalidSelector("row-selector is required by the html engine".into())
        })?;

        Ok(Self {
            client,
            start_url,
            page_url_template: config.page_url_template.clone(),
            listing: config.listing_selector.as_deref().map(parse_selector).transpose()?,
            row: parse_selector(row_selector)?,
            link: parse_selector(&config.link_selector)?,
            any_link: parse_selector("a[href]")?,
            next: config.next_selector.as_deref().map(parse_selector).transpose()?,
            next_disabled_class: config.next_disabled_class.clone(),
            total: config.total_selector.as_deref().map(parse_selector).transpose()?,
            resolver,
            politeness: Duration::from_millis(config.politeness_delay_ms),
            current: None,
            total_hint: None,
        })
    }

    async fn load(&mut self, url: Url, number: u32) -> NavResult<()> {
        let body = fetch_text(&self.client, &url).await?;
        politeness_pause(self.politeness).await;

        if let Some(listing) = &self.listing {
            if !has_match(&body, listing) {
                // Keep the page so the orchestrator can snapshot what was served
                self.current = Some(LoadedPage { url: url.clone(), number, body });
                return Err(NavigationError::ListingMissing {
                    url: url.to_string(),
                    reason: "listing container not present".to_string(),
                });
            }
        }

        if self.total_hint.is_none() {
            if let Some(total) = &self.total {
                self.total_hint = extract_total(&body, total);
            }
        }

        tracing::debug!("Listing page {} loaded from {}", number, url);
        self.current = Some(LoadedPage { url, number, body });
        Ok(())
    }

    fn page(&self) -> NavResult<&LoadedPage> {
        self.current.as_ref().ok_or(NavigationError::NotOpened)
    }

    fn current_rows(&self) -> NavResult<Vec<RowSlot>> {
        let page = self.page()?;
        Ok(extract_rows(
            &page.body,
            &page.url,
            &self.row,
            &self.link,
            &self.any_link,
        ))
    }
}

#[async_trait]
impl CatalogNavigator for HtmlNavigator {
    async fn open(&mut self) -> NavResult<()> {
        self.load(self.start_url.clone(), 1).await
    }

    fn current_page(&self) -> u32 {
        self.current.as_ref().map_or(0, |page| page.number)
    }

    async fn list_rows(&mut self) -> NavResult<Vec<RowSlot>> {
        self.current_rows()
    }

    async fn has_next_page(&mut self) -> NavResult<bool> {
        let page = self.page()?;
        match &self.next {
            Some(next) => Ok(matches!(
                find_next_control(&page.body, &page.url, next, &self.next_disabled_class),
                NextControl::Enabled { .. }
            )),
            None if self.page_url_template.is_some() => {
                Ok(self.current_rows()?.iter().any(Result::is_ok))
            }
            None => Ok(false),
        }
    }

    fn supports_direct_jump(&self) -> bool {
        self.page_url_template.is_some()
    }

    async fn jump_to_page(&mut self, page: u32) -> NavResult<()> {
        let template = self
            .page_url_template
            .as_deref()
            .ok_or(NavigationError::JumpUnsupported)?;
        let url = page_url(template, page)?;
        self.load(url, page).await
    }

    async fn next_page(&mut self) -> NavResult<()> {
        let (number, control) = {
            let page = self.page()?;
            let control = match &self.next {
                Some(next) => {
                    find_next_control(&page.body, &page.url, next, &self.next_disabled_class)
                }
                None => NextControl::Enabled { href: None },
            };
            (page.number, control)
        };

        match control {
            NextControl::Enabled { href: Some(href) } => {
                let url = Url::parse(&href)
                    .map_err(|e| NavigationError::InvalidUrl(format!("{}: {}", href, e)))?;
                self.load(url, number + 1).await
            }
            NextControl::Enabled { href: None } if self.page_url_template.is_some() => {
                self.jump_to_page(number + 1).await
            }
            _ => Err(NavigationError::NoFurtherPage(number)),
        }
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

fn parse_selector(selector: &str) -> NavResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| NavigationError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

fn has_match(body: &str, selector: &Selector) -> bool {
    Html::parse_document(body).select(selector).next().is_some()
}

/// Visible text of an element with whitespace runs collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads every listing row on a page
///
/// The display name is the text of the row's link element. The detail link is
/// that element's href, or else the first link anywhere in the row.
fn extract_rows(
    body: &str,
    base_url: &Url,
    row_selector: &Selector,
    link_selector: &Selector,
    any_link: &Selector,
) -> Vec<RowSlot> {
    let document = Html::parse_document(body);

    document
        .select(row_selector)
        .enumerate()
        .map(|(index, row)| -> RowSlot {
            let link = row.select(link_selector).next();

            let name = link
                .map(element_text)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| RowExtractionError::new(index, "no display name"))?;

            let href = link
                .and_then(|element| element.value().attr("href"))
                .or_else(|| {
                    row.select(any_link)
                        .next()
                        .and_then(|element| element.value().attr("href"))
                })
                .ok_or_else(|| RowExtractionError::new(index, "no detail link"))?;

            let detail = resolve_link(href, base_url).ok_or_else(|| {
                RowExtractionError::new(index, format!("unusable detail link '{}'", href))
            })?;

            Ok(CatalogRow::new(name, DetailRef::new(detail)))
        })
        .collect()
}

fn find_next_control(
    body: &str,
    base_url: &Url,
    selector: &Selector,
    disabled_class: &str,
) -> NextControl {
    let document = Html::parse_document(body);
    let Some(element) = document.select(selector).next() else {
        return NextControl::Missing;
    };

    let has_disabled_class = |el: ElementRef<'_>| el.value().classes().any(|c| c == disabled_class);
    let parent_disabled = element
        .parent()
        .and_then(ElementRef::wrap)
        .is_some_and(has_disabled_class);

    if has_disabled_class(element)
        || parent_disabled
        || element.value().attr("disabled").is_some()
        || element.value().attr("aria-disabled") == Some("true")
    {
        return NextControl::Disabled;
    }

    let href = element
        .value()
        .attr("href")
        .and_then(|href| resolve_link(href, base_url));
    NextControl::Enabled { href }
}

/// Reads a total such as "Showing 1 to 10 of 1,234 entries" as the largest number
fn extract_total(body: &str, selector: &Selector) -> Option<u64> {
    let document = Html::parse_document(body);
    let text = document.select(selector).next().map(element_text)?;
    parse_total(&text)
}

fn parse_total(text: &str) -> Option<u64> {
    text.split(|c: char| !(c.is_ascii_digit() || c == ','))
        .filter_map(|token| token.replace(',', "").parse::<u64>().ok())
        .max()
}
