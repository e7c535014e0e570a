//! Catalog fetchers for the Steam app list.
//!
//! Both endpoints are read with a blocking `ureq` agent. Every failure is
//! fatal for the run: nothing is retried and no partial set is returned, so a
//! flaky page can never be mistaken for a shrunken catalog.
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use ureq::Agent;

/// Steam application identifier.
pub type AppId = u32;

/// Largest response body accepted from the catalog (the legacy list is big).
const MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

/// Source of the complete current set of catalog app IDs.
pub trait CatalogSource {
    fn fetch_app_ids(&self) -> Result<BTreeSet<AppId>>;
}

/// Single-call `ISteamApps/GetAppList/v2` catalog.
pub struct LegacyCatalog {
    agent: Agent,
    url: String,
}

impl LegacyCatalog {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: build_agent(timeout),
            url: url.into(),
        }
    }
}

impl CatalogSource for LegacyCatalog {
    fn fetch_app_ids(&self) -> Result<BTreeSet<AppId>> {
        let start = Instant::now();
        let body = get_json(&self.agent, &self.url, &[])?;
        let ids = parse_legacy_body(&body)?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            apps = ids.len(),
            "catalog fetch complete"
        );
        Ok(ids)
    }
}

/// Cursor-paginated `IStoreService/GetAppList/v1` catalog.
pub struct PagedCatalog {
    agent: Agent,
    url: String,
    key: String,
}

impl PagedCatalog {
    pub fn new(url: impl Into<String>, key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: build_agent(timeout),
            url: url.into(),
            key: key.into(),
        }
    }
}

impl CatalogSource for PagedCatalog {
    fn fetch_app_ids(&self) -> Result<BTreeSet<AppId>> {
        fetch_all_pages(|cursor| {
            get_json(
                &self.agent,
                &self.url,
                &[("key", self.key.clone()), ("last_appid", cursor.to_string())],
            )
        })
    }
}

fn build_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// GET `url` and decode the body as JSON.
///
/// Query values are never echoed into errors or logs since one of them is the
/// API key.
fn get_json(agent: &Agent, url: &str, query: &[(&str, String)]) -> Result<Value> {
    let mut request = agent.get(url);
    for (name, value) in query {
        request = request.query(name, value);
    }
    let mut response = request
        .call()
        .map_err(|err| anyhow!("GET {url} failed: {err}"))?;
    let text = response
        .body_mut()
        .with_config()
        .limit(MAX_BODY_BYTES)
        .read_to_string()
        .map_err(|err| anyhow!("read response body from {url}: {err}"))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON returned from {url}"))
}

/// Walk every page starting at cursor 0 and union their app IDs.
///
/// `fetch_page` receives the `last_appid` cursor for the page to request.
pub fn fetch_all_pages<F>(mut fetch_page: F) -> Result<BTreeSet<AppId>>
where
    F: FnMut(AppId) -> Result<Value>,
{
    let start = Instant::now();
    let mut ids = BTreeSet::new();
    let mut cursor: AppId = 0;
    let mut pages = 0usize;
    loop {
        let page_start = Instant::now();
        let body = fetch_page(cursor)?;
        let page = parse_page(&body, &mut ids)?;
        pages += 1;
        tracing::info!(
            page = pages,
            cursor,
            apps = page.apps,
            elapsed_ms = page_start.elapsed().as_millis(),
            "catalog page fetched"
        );
        if !page.have_more_results {
            break;
        }
        let next = page
            .last_appid
            .ok_or_else(|| anyhow!("JSON key \"last_appid\" not found"))?;
        if next <= cursor {
            return Err(anyhow!(
                "catalog cursor did not advance (last_appid {next} after {cursor})"
            ));
        }
        cursor = next;
    }
    tracing::info!(
        pages,
        apps = ids.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "catalog fetch complete"
    );
    Ok(ids)
}

#[derive(Debug, PartialEq, Eq)]
struct Page {
    apps: usize,
    have_more_results: bool,
    last_appid: Option<AppId>,
}

/// Parse one paged response, adding its app IDs to `ids`.
///
/// The endpoint omits `have_more_results` and `last_appid` on the final page.
fn parse_page(body: &Value, ids: &mut BTreeSet<AppId>) -> Result<Page> {
    let response = field(body, "response")?;
    let apps = collect_app_ids(field(response, "apps")?, ids)?;
    let have_more_results = match response.get("have_more_results") {
        None | Some(Value::Null) => false,
        Some(value) => value
            .as_bool()
            .ok_or_else(|| anyhow!("JSON key \"have_more_results\" is not a boolean"))?,
    };
    let last_appid = response
        .get("last_appid")
        .map(|value| app_id_from_value(value, "last_appid"))
        .transpose()?;
    Ok(Page {
        apps,
        have_more_results,
        last_appid,
    })
}

/// Parse the single-call `{"applist":{"apps":[...]}}` body.
pub fn parse_legacy_body(body: &Value) -> Result<BTreeSet<AppId>> {
    let apps = field(field(body, "applist")?, "apps")?;
    let mut ids = BTreeSet::new();
    collect_app_ids(apps, &mut ids)?;
    Ok(ids)
}

fn collect_app_ids(apps: &Value, ids: &mut BTreeSet<AppId>) -> Result<usize> {
    let apps = apps
        .as_array()
        .ok_or_else(|| anyhow!("JSON key \"apps\" is not an array"))?;
    for app in apps {
        ids.insert(app_id_from_value(field(app, "appid")?, "appid")?);
    }
    Ok(apps.len())
}

fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    value
        .get(key)
        .ok_or_else(|| anyhow!("JSON key {key:?} not found"))
}

fn app_id_from_value(value: &Value, key: &str) -> Result<AppId> {
    value
        .as_u64()
        .and_then(|raw| AppId::try_from(raw).ok())
        .ok_or_else(|| anyhow!("JSON key {key:?} is not a valid app id (got {value})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_body_collects_unique_ids() {
        let body = json!({
            "applist": { "apps": [
                { "appid": 20, "name": "b" },
                { "appid": 10, "name": "a" },
                { "appid": 20, "name": "b again" }
            ]}
        });
        let ids = parse_legacy_body(&body).expect("parse legacy body");
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![10, 20]);
    }

    #[test]
    fn legacy_body_reports_missing_key() {
        let err = parse_legacy_body(&json!({ "apps": [] })).expect_err("missing applist");
        assert_eq!(err.to_string(), "JSON key \"applist\" not found");

        let err = parse_legacy_body(&json!({ "applist": { "apps": [{ "name": "x" }] } }))
            .expect_err("missing appid");
        assert_eq!(err.to_string(), "JSON key \"appid\" not found");
    }

    #[test]
    fn negative_app_id_is_rejected() {
        let err = parse_legacy_body(&json!({ "applist": { "apps": [{ "appid": -1 }] } }))
            .expect_err("negative appid");
        assert!(err.to_string().contains("not a valid app id"));
    }

    #[test]
    fn final_page_may_omit_cursor_fields() {
        let mut ids = BTreeSet::new();
        let page = parse_page(
            &json!({ "response": { "apps": [{ "appid": 5 }] } }),
            &mut ids,
        )
        .expect("parse final page");
        assert_eq!(
            page,
            Page {
                apps: 1,
                have_more_results: false,
                last_appid: None
            }
        );
    }

    #[test]
    fn pages_are_followed_by_cursor() {
        let mut cursors = Vec::new();
        let ids = fetch_all_pages(|cursor| {
            cursors.push(cursor);
            Ok(match cursor {
                0 => json!({ "response": {
                    "apps": [{ "appid": 10 }, { "appid": 20 }],
                    "have_more_results": true,
                    "last_appid": 20
                }}),
                20 => json!({ "response": {
                    "apps": [{ "appid": 30 }],
                    "have_more_results": false,
                    "last_appid": 30
                }}),
                other => panic!("unexpected cursor {other}"),
            })
        })
        .expect("fetch pages");
        assert_eq!(cursors, vec![0, 20]);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![10, 20, 30]);
    }

    #[test]
    fn failing_page_aborts_whole_fetch() {
        let err = fetch_all_pages(|cursor| {
            if cursor == 0 {
                Ok(json!({ "response": {
                    "apps": [{ "appid": 1 }],
                    "have_more_results": true,
                    "last_appid": 1
                }}))
            } else {
                Err(anyhow!("GET catalog failed: http status: 503"))
            }
        })
        .expect_err("second page fails");
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn more_results_without_cursor_is_missing_key() {
        let err = fetch_all_pages(|_| {
            Ok(json!({ "response": { "apps": [], "have_more_results": true } }))
        })
        .expect_err("missing cursor");
        assert_eq!(err.to_string(), "JSON key \"last_appid\" not found");
    }

    #[test]
    fn stalled_cursor_is_an_error() {
        let err = fetch_all_pages(|_| {
            Ok(json!({ "response": {
                "apps": [{ "appid": 7 }],
                "have_more_results": true,
                "last_appid": 7
            }}))
        })
        .expect_err("cursor stalls");
        assert!(err.to_string().contains("did not advance"));
    }
}
