//! Command handlers
//!
//! Each handler resolves credentials, builds a [`ResourceClient`] and
//! prints its result through [`crate::output`].

use std::path::{Path, PathBuf};

use monetix_core::bulk::{BulkRunner, UniverseCreator};
use monetix_core::catalog::{parse_price, ImageFile, ItemDraft, ItemPatch, ResourceKind};
use monetix_core::client::ResourceClient;
use monetix_core::config::AppConfig;
use monetix_core::error::{MonetixError, Result};
use monetix_core::session::{SessionCache, SessionDraft, SessionStore};
use serde::Deserialize;
use tracing::info;

use crate::output::{self, ProgressOutput};

/// API key and universe, either given directly or via a saved session
#[derive(Debug, Clone, Default)]
pub struct CredentialArgs {
    pub api_key: Option<String>,
    pub universe_id: Option<String>,
    pub session: Option<String>,
    pub base_url: Option<String>,
}

/// Resolved credentials for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub universe_id: String,
}

/// Pick explicit credentials, falling back to a saved session
///
/// Either way the pair is saved (or refreshed) in the session cache.
pub async fn resolve_credentials<S: SessionStore>(
    args: &CredentialArgs,
    cache: &SessionCache<S>,
) -> Result<Credentials> {
    let draft = match &args.session {
        Some(id) => {
            let session = cache
                .find(id)
                .await?
                .ok_or_else(|| MonetixError::validation(format!("No saved session {id}.")))?;
            SessionDraft::new(
                args.api_key.as_deref().unwrap_or(&session.api_key),
                args.universe_id.as_deref().unwrap_or(&session.universe_id),
                &session.experience_name,
            )?
        }
        None => SessionDraft::new(
            args.api_key.as_deref().unwrap_or_default(),
            args.universe_id.as_deref().unwrap_or_default(),
            "",
        )?,
    };

    let session = cache.save(draft).await?;
    Ok(Credentials {
        api_key: session.api_key,
        universe_id: session.universe_id,
    })
}

pub fn build_client(
    config: &AppConfig,
    args: &CredentialArgs,
    creds: &Credentials,
) -> Result<ResourceClient> {
    let mut client_config = config.client.clone();
    if let Some(base_url) = &args.base_url {
        client_config = client_config.with_base_url(base_url.clone());
    }
    ResourceClient::new(client_config, creds.api_key.clone())
}

pub async fn list(
    client: &ResourceClient,
    creds: &Credentials,
    kind: ResourceKind,
    json_output: bool,
) -> Result<()> {
    let items = client.list_items(kind, &creds.universe_id).await?;
    output::print_items(&items, json_output).map_err(MonetixError::SerializationError)?;
    info!("Manage these at {}", kind.dashboard_url(&creds.universe_id));
    Ok(())
}

/// Fields entered for a single create
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    pub name: String,
    pub description: String,
    pub price: String,
    pub regional_pricing: bool,
    pub image: Option<PathBuf>,
}

impl CreateArgs {
    pub async fn into_draft(self) -> Result<ItemDraft> {
        let price = parse_price(&self.price)?;
        let mut draft = ItemDraft::new(self.name, price);
        draft.description = self.description;
        draft.is_regional_pricing_enabled = self.regional_pricing;
        draft.image_file = load_image(self.image.as_deref()).await?;
        Ok(draft)
    }
}

pub async fn create(
    client: &ResourceClient,
    creds: &Credentials,
    kind: ResourceKind,
    args: CreateArgs,
    json_output: bool,
) -> Result<()> {
    let draft = args.into_draft().await?;
    let created = client.create_item(kind, &creds.universe_id, &draft).await?;
    output::print_created(&created, json_output).map_err(MonetixError::SerializationError)
}

/// Fields entered for an update; unset fields stay as they are
#[derive(Debug, Clone, Default)]
pub struct UpdateArgs {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub for_sale: Option<bool>,
    pub regional_pricing: Option<bool>,
    pub image: Option<PathBuf>,
}

impl UpdateArgs {
    pub async fn into_patch(self) -> Result<ItemPatch> {
        Ok(ItemPatch {
            name: self.name.map(|s| s.trim().to_string()),
            description: self.description.map(|s| s.trim().to_string()),
            price: self.price.as_deref().map(parse_price).transpose()?,
            is_for_sale: self.for_sale,
            is_regional_pricing_enabled: self.regional_pricing,
            image_file: load_image(self.image.as_deref()).await?,
        })
    }
}

pub async fn update(
    client: &ResourceClient,
    creds: &Credentials,
    kind: ResourceKind,
    item_id: &str,
    args: UpdateArgs,
) -> Result<()> {
    let patch = args.into_patch().await?;
    client
        .update_item(kind, &creds.universe_id, item_id, &patch)
        .await?;
    println!("Updated {kind} {item_id}");
    Ok(())
}

/// One entry of a bulk rows file
#[derive(Debug, Deserialize)]
pub struct RowEntry {
    #[serde(flatten)]
    pub draft: ItemDraft,
    /// Image path, relative to the rows file
    #[serde(default)]
    pub image: Option<PathBuf>,
}

/// Read a JSON array of rows and load their images
pub async fn load_rows(path: &Path) -> Result<Vec<ItemDraft>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MonetixError::IoError(format!("Failed to read {}: {e}", path.display())))?;
    let entries: Vec<RowEntry> = serde_json::from_str(&raw).map_err(|e| {
        MonetixError::SerializationError(format!("Failed to parse {}: {e}", path.display()))
    })?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut draft = entry.draft;
        if let Some(image) = entry.image {
            draft.image_file = Some(ImageFile::load(&base.join(image)).await?);
        }
        rows.push(draft);
    }
    Ok(rows)
}

pub async fn bulk_create(
    client: &ResourceClient,
    config: &AppConfig,
    creds: &Credentials,
    kind: ResourceKind,
    rows_file: &Path,
    json_output: bool,
    tsv: bool,
) -> Result<()> {
    let rows = load_rows(rows_file).await?;
    let mut runner = BulkRunner::new(rows).with_row_delay(config.bulk.row_delay());
    let creator = UniverseCreator::new(client, kind, creds.universe_id.clone());
    let sink = ProgressOutput::select(json_output, tsv);

    info!("Creating {} {} items", runner.rows().len(), kind);
    let report = runner.run(&creator, &sink).await?;

    output::print_report(&report, json_output, tsv).map_err(MonetixError::SerializationError)
}

pub async fn sessions_list<S: SessionStore>(cache: &SessionCache<S>, json_output: bool) -> Result<()> {
    let sessions = cache.list().await?;
    output::print_sessions(&sessions, json_output).map_err(MonetixError::SerializationError)
}

pub async fn sessions_save<S: SessionStore>(
    cache: &SessionCache<S>,
    api_key: &str,
    universe_id: &str,
    name: &str,
) -> Result<()> {
    let session = cache.save(SessionDraft::new(api_key, universe_id, name)?).await?;
    println!("{}", output::format_session(&session));
    Ok(())
}

pub async fn sessions_delete<S: SessionStore>(cache: &SessionCache<S>, id: &str) -> Result<()> {
    if cache.find(id).await?.is_none() {
        return Err(MonetixError::validation(format!("No saved session {id}.")));
    }
    cache.delete(id).await?;
    println!("Deleted session {id}");
    Ok(())
}

async fn load_image(path: Option<&Path>) -> Result<Option<ImageFile>> {
    match path {
        Some(path) => Ok(Some(ImageFile::load(path).await?)),
        None => Ok(None),
    }
}
