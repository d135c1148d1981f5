//! Resource Client
//!
//! Issues authenticated calls against the Open Cloud collection endpoints,
//! either directly or through the relay (point `base_url` at the relay
//! prefix). Listing walks every page and then attaches icon URLs in small
//! concurrent batches; create and update are single multipart calls.

use crate::catalog::{
    CatalogItem, CreatedItem, IconResponse, ItemDraft, ItemPatch, ListResponse, RawCatalogItem,
    ResourceKind,
};
use crate::config::ClientConfig;
use crate::error::{MonetixError, Result};
use crate::pipeline::{collect_pages, lookup_in_batches, Page};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info};

/// Header carrying the Open Cloud API key
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct ResourceClient {
    http: Client,
    api_key: String,
    config: ClientConfig,
}

impl ResourceClient {
    pub fn new(config: ClientConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| MonetixError::ConfigError(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::with_http_client(http, config, api_key))
    }

    pub fn with_http_client(http: Client, config: ClientConfig, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send with the API key attached; any non-2xx becomes [`MonetixError::Upstream`]
    async fn send_checked(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.header(API_KEY_HEADER, &self.api_key).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonetixError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Fetch a single listing page
    pub async fn fetch_page(
        &self,
        kind: ResourceKind,
        universe_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<CatalogItem>> {
        let mut query = vec![("pageSize", self.config.page_size.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let request = self
            .http
            .get(self.url(&kind.list_path(universe_id)))
            .query(&query);
        let body: ListResponse = self.send_checked(request).await?.json().await?;

        let items = body
            .items
            .into_iter()
            .map(RawCatalogItem::into_item)
            .collect();
        Ok(Page::new(items, body.next_page_token))
    }

    /// Every item of `kind` in the universe, with icons attached
    ///
    /// Page order and per-page order are preserved. A failed page aborts the
    /// listing; a failed icon lookup only leaves that item without an icon.
    pub async fn list_items(
        &self,
        kind: ResourceKind,
        universe_id: &str,
    ) -> Result<Vec<CatalogItem>> {
        let pacing = self.config.pacing(kind);

        let mut items = collect_pages(
            |token: Option<String>| async move {
                self.fetch_page(kind, universe_id, token.as_deref()).await
            },
            pacing.page_delay(),
        )
        .await?;

        self.enrich_icons(kind, &mut items).await;

        info!(
            "Listed {} {} items for universe {}",
            items.len(),
            kind,
            universe_id
        );
        Ok(items)
    }

    pub async fn list_game_passes(&self, universe_id: &str) -> Result<Vec<CatalogItem>> {
        self.list_items(ResourceKind::GamePass, universe_id).await
    }

    pub async fn list_developer_products(&self, universe_id: &str) -> Result<Vec<CatalogItem>> {
        self.list_items(ResourceKind::DeveloperProduct, universe_id)
            .await
    }

    /// Attach icon URLs in place, index by index
    pub async fn enrich_icons(&self, kind: ResourceKind, items: &mut [CatalogItem]) {
        let ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
        let pacing = self.config.pacing(kind);

        let icons = lookup_in_batches(
            &ids,
            self.config.icon_batch_size,
            pacing.icon_batch_delay(),
            |id| self.fetch_icon_url(kind, id),
        )
        .await;

        for (item, icon_url) in items.iter_mut().zip(icons) {
            item.icon_url = icon_url;
        }
    }

    /// Icon URL for one item; any failure reads as "no icon"
    pub async fn fetch_icon_url(&self, kind: ResourceKind, item_id: String) -> Option<String> {
        match self.try_fetch_icon_url(kind, &item_id).await {
            Ok(url) => url,
            Err(e) => {
                debug!("Icon lookup for {} {} failed: {}", kind, item_id, e);
                None
            }
        }
    }

    async fn try_fetch_icon_url(&self, kind: ResourceKind, item_id: &str) -> Result<Option<String>> {
        let request = self.http.get(self.url(&kind.icon_path(item_id)));
        let body: IconResponse = self.send_checked(request).await?.json().await?;
        Ok(body.first_image_url())
    }

    /// Create one item; the result reflects what upstream stored
    pub async fn create_item(
        &self,
        kind: ResourceKind,
        universe_id: &str,
        draft: &ItemDraft,
    ) -> Result<CreatedItem> {
        draft.validate()?;

        let request = self
            .http
            .post(self.url(&kind.collection_path(universe_id)))
            .multipart(draft.to_form()?);
        let raw: RawCatalogItem = self.send_checked(request).await?.json().await?;
        let created = CreatedItem::from_raw(raw, draft);

        info!(
            "Created {} '{}' ({}) at {} Robux",
            kind, created.name, created.id, created.price
        );
        Ok(created)
    }

    /// Update only the fields present in `patch`
    pub async fn update_item(
        &self,
        kind: ResourceKind,
        universe_id: &str,
        item_id: &str,
        patch: &ItemPatch,
    ) -> Result<()> {
        patch.validate()?;

        let request = self
            .http
            .patch(self.url(&kind.item_path(universe_id, item_id)))
            .multipart(patch.to_form()?);
        self.send_checked(request).await?;

        info!("Updated {} {}", kind, item_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ImageFile;
    use crate::config::PacingConfig;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn test_client(server: &MockServer) -> ResourceClient {
        let config = ClientConfig::default()
            .with_base_url(server.base_url())
            .with_pacing(PacingConfig::none());
        ResourceClient::new(config, "test-key").unwrap()
    }

    fn icon_mock<'a>(server: &'a MockServer, kind: ResourceKind, id: &str) -> httpmock::Mock<'a> {
        let url = format!("https://cdn.example/{id}.png");
        server.mock(|when, then| {
            when.method(GET).path(kind.icon_path(id));
            then.status(200)
                .json_body(json!({"data": [{"imageUrl": url, "languageCode": "en"}]}));
        })
    }

    #[tokio::test]
    async fn test_list_walks_every_page_in_order() {
        let server = MockServer::start();
        let path = ResourceKind::GamePass.list_path("99");

        let first = server.mock(|when, then| {
            when.method(GET)
                .path(path.clone())
                .query_param("pageSize", "50")
                .query_param_missing("pageToken")
                .header("x-api-key", "test-key");
            then.status(200).json_body(json!({
                "gamePasses": [
                    {"gamePassId": 1, "name": "one", "isForSale": true,
                     "priceInformation": {"defaultPriceInRobux": 10, "enabledFeatures": ["RegionalPricing"]}},
                    {"gamePassId": 2, "name": "two"}
                ],
                "nextPageToken": "page-2"
            }));
        });
        let second = server.mock(|when, then| {
            when.method(GET)
                .path(path.clone())
                .query_param("pageToken", "page-2");
            then.status(200).json_body(json!({
                "gamePasses": [{"gamePassId": 3, "name": "three"}],
                "nextPageToken": "page-3"
            }));
        });
        let third = server.mock(|when, then| {
            when.method(GET)
                .path(path.clone())
                .query_param("pageToken", "page-3");
            then.status(200).json_body(json!({"gamePasses": []}));
        });
        let icons: Vec<_> = ["1", "2", "3"]
            .iter()
            .map(|id| icon_mock(&server, ResourceKind::GamePass, id))
            .collect();

        let items = test_client(&server).list_game_passes("99").await.unwrap();

        first.assert_calls(1);
        second.assert_calls(1);
        third.assert_calls(1);
        for icon in &icons {
            icon.assert_calls(1);
        }

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(items[0].price, 10);
        assert!(items[0].is_for_sale);
        assert!(items[0].is_regional_pricing_enabled);
        assert_eq!(items[1].price, 0);
        assert!(!items[1].is_regional_pricing_enabled);
        assert_eq!(
            items[2].icon_url.as_deref(),
            Some("https://cdn.example/3.png")
        );
    }

    #[tokio::test]
    async fn test_icon_failures_only_affect_their_item() {
        let server = MockServer::start();
        let kind = ResourceKind::DeveloperProduct;

        server.mock(|when, then| {
            when.method(GET).path(kind.list_path("5"));
            then.status(200).json_body(json!({
                "developerProducts": [
                    {"developerProductId": 11, "name": "a"},
                    {"developerProductId": 12, "name": "b"},
                    {"developerProductId": 13, "name": "c"},
                    {"developerProductId": 14, "name": "d"},
                    {"developerProductId": 15, "name": "e"},
                    {"developerProductId": 16, "name": "f"},
                    {"developerProductId": 17, "name": "g"}
                ]
            }));
        });
        for id in ["11", "13", "14", "16", "17"] {
            icon_mock(&server, kind, id);
        }
        server.mock(|when, then| {
            when.method(GET).path(kind.icon_path("12"));
            then.status(500).body("boom");
        });
        server.mock(|when, then| {
            when.method(GET).path(kind.icon_path("15"));
            then.status(200).body("{\"data\": \"not-a-list\"}");
        });

        let items = test_client(&server)
            .list_developer_products("5")
            .await
            .unwrap();

        assert_eq!(items.len(), 7);
        let icons: Vec<Option<&str>> = items.iter().map(|i| i.icon_url.as_deref()).collect();
        assert_eq!(
            icons,
            vec![
                Some("https://cdn.example/11.png"),
                None,
                Some("https://cdn.example/13.png"),
                Some("https://cdn.example/14.png"),
                None,
                Some("https://cdn.example/16.png"),
                Some("https://cdn.example/17.png"),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_icon_data_is_absent() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(ResourceKind::GamePass.icon_path("1"));
            then.status(200).json_body(json!({"data": []}));
        });

        let icon = test_client(&server)
            .fetch_icon_url(ResourceKind::GamePass, "1".to_string())
            .await;
        assert_eq!(icon, None);
    }

    #[tokio::test]
    async fn test_list_error_aborts_with_status_and_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(ResourceKind::GamePass.list_path("1"));
            then.status(403).body("Invalid API key");
        });

        let err = test_client(&server).list_game_passes("1").await.unwrap_err();
        assert_eq!(
            err,
            MonetixError::Upstream {
                status: 403,
                body: "Invalid API key".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_create_sends_multipart_and_reads_stored_price() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(ResourceKind::GamePass.collection_path("7"))
                .header("x-api-key", "test-key")
                .header_exists("content-type")
                .body_includes("name=\"name\"")
                .body_includes("Sword")
                .body_includes("name=\"isForSale\"")
                .body_includes("name=\"imageFile\"; filename=\"sword.png\"")
                .body_includes("PNGDATA");
            then.status(200).json_body(json!({
                "gamePassId": 123,
                "name": "Sword",
                "priceInformation": {"defaultPriceInRobux": 95}
            }));
        });

        let draft = ItemDraft {
            image_file: Some(ImageFile::new("sword.png", b"PNGDATA".to_vec())),
            ..ItemDraft::new("Sword", 100)
        };
        let created = test_client(&server)
            .create_item(ResourceKind::GamePass, "7", &draft)
            .await
            .unwrap();

        mock.assert_calls(1);
        assert_eq!(created.id, "123");
        assert_eq!(created.price, 95);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name_without_calling_upstream() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            then.status(200);
        });

        let err = test_client(&server)
            .create_item(ResourceKind::GamePass, "7", &ItemDraft::new("  ", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, MonetixError::Validation(_)));
        mock.assert_calls(0);
    }

    #[tokio::test]
    async fn test_update_sends_only_provided_fields() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path(ResourceKind::DeveloperProduct.item_path("7", "55"))
                .body_includes("name=\"price\"")
                .body_includes("50")
                .body_excludes("name=\"name\"")
                .body_excludes("name=\"description\"")
                .body_excludes("name=\"isForSale\"")
                .body_excludes("name=\"isRegionalPricingEnabled\"")
                .body_excludes("name=\"imageFile\"");
            then.status(200).json_body(json!({}));
        });

        let patch = ItemPatch {
            price: Some(50),
            ..Default::default()
        };
        test_client(&server)
            .update_item(ResourceKind::DeveloperProduct, "7", "55", &patch)
            .await
            .unwrap();

        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn test_update_failure_carries_upstream_text() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PATCH);
            then.status(400).body("Price out of range");
        });

        let patch = ItemPatch {
            price: Some(1_000_000_000),
            ..Default::default()
        };
        let err = test_client(&server)
            .update_item(ResourceKind::GamePass, "7", "1", &patch)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Roblox API 400: Price out of range");
    }

    #[tokio::test]
    async fn test_base_url_with_relay_prefix() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(format!("/api/relay{}", ResourceKind::GamePass.list_path("3")));
            then.status(200).json_body(json!({"gamePasses": []}));
        });

        let config = ClientConfig::default()
            .with_base_url(format!("{}/api/relay/", server.base_url()))
            .with_pacing(PacingConfig::none());
        let client = ResourceClient::new(config, "k").unwrap();

        let items = client.list_game_passes("3").await.unwrap();
        assert!(items.is_empty());
        mock.assert_calls(1);
    }

    /// Serve `pages` listing pages (item counts per page) plus an icon per item
    fn mock_catalog(server: &MockServer, kind: ResourceKind, universe_id: &str, pages: &[usize]) {
        let (field, id_field) = match kind {
            ResourceKind::GamePass => ("gamePasses", "gamePassId"),
            ResourceKind::DeveloperProduct => ("developerProducts", "developerProductId"),
        };
        let path = kind.list_path(universe_id);
        let mut next_id = 1;

        for (index, count) in pages.iter().enumerate() {
            let items: Vec<_> = (0..*count)
                .map(|offset| json!({id_field: next_id + offset, "name": format!("item {}", next_id + offset)}))
                .collect();
            for offset in 0..*count {
                icon_mock(server, kind, &(next_id + offset).to_string());
            }
            next_id += count;

            let mut body = json!({field: items});
            if index + 1 < pages.len() {
                body["nextPageToken"] = json!(format!("page-{}", index + 2));
            }
            let token = (index > 0).then(|| format!("page-{}", index + 1));
            let path = path.clone();
            server.mock(move |when, then| {
                let when = when.method(GET).path(path);
                match token {
                    Some(token) => when.query_param("pageToken", token),
                    None => when.query_param_missing("pageToken"),
                };
                then.status(200).json_body(body);
            });
        }
    }

    fn paced_client(server: &MockServer, config: ClientConfig) -> ResourceClient {
        ResourceClient::new(config.with_base_url(server.base_url()), "test-key").unwrap()
    }

    #[tokio::test]
    async fn test_developer_products_use_their_default_pacing() {
        let server = MockServer::start();
        mock_catalog(&server, ResourceKind::DeveloperProduct, "8", &[3, 3]);
        let client = paced_client(&server, ClientConfig::default());

        let started = std::time::Instant::now();
        let items = client.list_developer_products("8").await.unwrap();
        let elapsed = started.elapsed();

        // one 150ms page gap + one 200ms icon batch gap
        assert_eq!(items.len(), 6);
        assert!(items.iter().all(|item| item.icon_url.is_some()));
        assert!(elapsed >= Duration::from_millis(350), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(750), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn test_game_passes_use_their_default_pacing() {
        let server = MockServer::start();
        mock_catalog(&server, ResourceKind::GamePass, "8", &[3, 3]);
        let client = paced_client(&server, ClientConfig::default());

        let started = std::time::Instant::now();
        let items = client.list_game_passes("8").await.unwrap();
        let elapsed = started.elapsed();

        // one 250ms page gap + one 250ms icon batch gap
        assert_eq!(items.len(), 6);
        assert!(elapsed >= Duration::from_millis(500), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(900), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn test_page_and_icon_delays_come_from_the_listed_kind() {
        let config = ClientConfig {
            game_pass: PacingConfig {
                page_delay_ms: 300,
                icon_batch_delay_ms: 0,
            },
            developer_product: PacingConfig {
                page_delay_ms: 0,
                icon_batch_delay_ms: 300,
            },
            ..ClientConfig::default()
        };

        // Two pages, one icon batch: only a page delay can apply
        let server = MockServer::start();
        mock_catalog(&server, ResourceKind::GamePass, "1", &[2, 2]);
        let started = std::time::Instant::now();
        paced_client(&server, config.clone())
            .list_game_passes("1")
            .await
            .unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(600), "elapsed {elapsed:?}");

        // Same shape for products, whose page delay is zero
        let server = MockServer::start();
        mock_catalog(&server, ResourceKind::DeveloperProduct, "1", &[2, 2]);
        let started = std::time::Instant::now();
        paced_client(&server, config.clone())
            .list_developer_products("1")
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(250));

        // One page, two icon batches: only the icon delay can apply
        let server = MockServer::start();
        mock_catalog(&server, ResourceKind::DeveloperProduct, "1", &[6]);
        let started = std::time::Instant::now();
        paced_client(&server, config.clone())
            .list_developer_products("1")
            .await
            .unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(600), "elapsed {elapsed:?}");

        let server = MockServer::start();
        mock_catalog(&server, ResourceKind::GamePass, "1", &[6]);
        let started = std::time::Instant::now();
        paced_client(&server, config)
            .list_game_passes("1")
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(250));
    }
}
