use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::traits::CatalogStore;
use crate::catalog::types::PropertyQuery;
use crate::error::{CatalogError, CatalogResult, StoreContext, StoreError};
use crate::models::codes::{generate_agent_code, generate_property_code};
use crate::models::{
    AgentId, Detail, History, HistoryAction, Language, NewHistory, NewProperty, Property,
    PropertyId, PropertyUpdate,
};

pub const DEFAULT_CODE_ATTEMPTS: u32 = 5;

/// Property lifecycle: every mutation commits together with its history entry
#[derive(Clone)]
pub struct PropertyService {
    store: Arc<dyn CatalogStore>,
    code_attempts: u32,
}

fn check_details(details: &[Detail]) -> CatalogResult<()> {
    let mut seen = HashSet::new();
    for detail in details {
        if !seen.insert(detail.language) {
            return Err(CatalogError::Validation(format!(
                "more than one detail for language {}",
                detail.language
            )));
        }
        if detail.price < 0.0 || detail.living_area < 0.0 || detail.plot_size < 0.0 {
            return Err(CatalogError::Validation(format!(
                "negative price or area in {} detail",
                detail.language
            )));
        }
    }
    Ok(())
}

fn check_id(id: PropertyId) -> CatalogResult<()> {
    if id == 0 {
        return Err(CatalogError::Validation("invalid property id".to_string()));
    }
    Ok(())
}

impl PropertyService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            code_attempts: DEFAULT_CODE_ATTEMPTS,
        }
    }

    /// How many fresh code pairs to try when generated codes collide
    pub fn with_code_attempts(mut self, attempts: u32) -> Self {
        self.code_attempts = attempts.max(1);
        self
    }

    pub async fn create(&self, new: NewProperty, agent_id: AgentId) -> CatalogResult<Property> {
        check_details(&new.details)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_create(&new, agent_id).await {
                Err(StoreError::Constraint(reason)) if attempt < self.code_attempts => {
                    warn!("Code collision on attempt {}: {}", attempt, reason);
                }
                result => {
                    let property = result.context("creating property")?;
                    info!(
                        "Created property {} ({} / {})",
                        property.id, property.agent_code, property.property_code
                    );
                    return Ok(property);
                }
            }
        }
    }

    async fn try_create(
        &self,
        new: &NewProperty,
        agent_id: AgentId,
    ) -> Result<Property, StoreError> {
        let now = Utc::now();
        let draft = Property {
            id: 0,
            agent_code: generate_agent_code(new.deal_type, now),
            property_code: generate_property_code(now),
            property_type: new.property_type,
            deal_type: new.deal_type,
            status: new.status,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
            details: new.details.clone(),
            documents: Vec::new(),
            owner: new.owner.clone(),
            history: Vec::new(),
        };

        let mut tx = self.store.begin().await?;
        let mut property = tx.insert_property(draft).await?;
        let entry = tx
            .append_history(NewHistory {
                property_id: property.id,
                action_type: HistoryAction::Create,
                agent_id,
                details: json!({ "action": "property_created" }),
            })
            .await?;
        tx.commit().await?;

        property.history = vec![entry];
        Ok(property)
    }

    /// Applies `update` and returns the stored property with every language
    /// and the owner; codes and creation time never change
    pub async fn update(
        &self,
        id: PropertyId,
        update: PropertyUpdate,
        agent_id: AgentId,
    ) -> CatalogResult<Property> {
        check_id(id)?;
        check_details(&update.details)?;

        let current = self
            .store
            .find_properties(&PropertyQuery::by_ids(vec![id], Language::default()))
            .await
            .with_context(|| format!("loading property {id}"))?
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::not_found("property", id))?;

        let updated = Property {
            property_type: update.property_type.unwrap_or(current.property_type),
            deal_type: update.deal_type.unwrap_or(current.deal_type),
            status: update.status.unwrap_or(current.status),
            updated_at: Utc::now(),
            details: update.details,
            documents: Vec::new(),
            owner: update.owner,
            history: Vec::new(),
            ..current
        };

        let mut tx = self
            .store
            .begin()
            .await
            .context("starting property update")?;
        tx.save_property(&updated)
            .await
            .with_context(|| format!("updating property {id}"))?;
        tx.append_history(NewHistory {
            property_id: id,
            action_type: HistoryAction::Update,
            agent_id,
            details: json!({ "action": "property_updated" }),
        })
        .await
        .with_context(|| format!("recording update of property {id}"))?;
        tx.commit()
            .await
            .with_context(|| format!("committing update of property {id}"))?;

        info!("Updated property {}", id);
        self.reload(id).await
    }

    async fn reload(&self, id: PropertyId) -> CatalogResult<Property> {
        let mut reloaded: Option<Property> = None;
        for language in Language::ALL {
            let found = self
                .store
                .find_properties(&PropertyQuery::by_ids(vec![id], language))
                .await
                .with_context(|| format!("reloading property {id}"))?
                .into_iter()
                .next();
            if let Some(found) = found {
                if let Some(property) = reloaded.as_mut() {
                    property.details.extend(found.details);
                } else {
                    reloaded = Some(found);
                }
            }
        }

        let mut property = reloaded.ok_or_else(|| CatalogError::not_found("property", id))?;
        property.owner = self
            .store
            .find_owner(id)
            .await
            .with_context(|| format!("reloading owner of property {id}"))?;
        Ok(property)
    }

    pub async fn set_status(
        &self,
        id: PropertyId,
        is_active: bool,
        agent_id: AgentId,
    ) -> CatalogResult<()> {
        check_id(id)?;

        let mut tx = self
            .store
            .begin()
            .await
            .context("starting status update")?;
        let existed = tx
            .set_active(id, is_active)
            .await
            .with_context(|| format!("updating status of property {id}"))?;
        if !existed {
            return Err(CatalogError::not_found("property", id));
        }
        tx.append_history(NewHistory {
            property_id: id,
            action_type: HistoryAction::StatusUpdate,
            agent_id,
            details: json!({ "action": "status_updated", "is_active": is_active }),
        })
        .await
        .with_context(|| format!("recording status change of property {id}"))?;
        tx.commit()
            .await
            .with_context(|| format!("committing status change of property {id}"))?;

        info!("Property {} is_active={}", id, is_active);
        Ok(())
    }

    /// Audit trail, newest first
    pub async fn history(&self, id: PropertyId) -> CatalogResult<Vec<History>> {
        check_id(id)?;
        self.store
            .find_history(id)
            .await
            .with_context(|| format!("loading history of property {id}"))
    }
}
