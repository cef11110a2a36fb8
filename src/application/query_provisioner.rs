// One native-query card per spec query, created or updated by external name
use std::collections::BTreeMap;

use crate::application::metabase_api::MetabaseApi;
use crate::domain::filters::FilterBindings;
use crate::domain::metabase::CardDefinition;
use crate::domain::provision::{Action, CreatedEntity, EntityKind, ItemFailure, ProvisionTarget};
use crate::domain::spec::Spec;
use crate::domain::visualization::{Display, map_component};
use crate::error::AppResult;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryProvisionReport {
    /// spec query id -> Metabase card id
    pub cards: BTreeMap<String, i64>,
    pub created: Vec<CreatedEntity>,
    pub failures: Vec<ItemFailure>,
}

/// Deterministic external name of the card backing `query_id`.
pub fn card_name(dashboard_id: &str, query_id: &str, database_id: i64) -> String {
    format!("{}/{} [db {}]", dashboard_id, query_id, database_id)
}

/// Provision every query of the spec. Failures are collected per query and
/// never stop the remaining ones.
pub async fn provision_queries(
    api: &dyn MetabaseApi,
    spec: &Spec,
    bindings: &FilterBindings,
    target: &ProvisionTarget,
) -> QueryProvisionReport {
    let dashboard_id = spec.dashboard_id();
    let mut report = QueryProvisionReport::default();

    for (query_id, query) in &spec.queries {
        let Some(sql) = query.sql_text() else {
            report
                .failures
                .push(ItemFailure::new(EntityKind::Query, query_id, "query has no inline SQL"));
            continue;
        };
        let tags = match bindings.template_tags(query_id, &spec.filters.items) {
            Ok(tags) => tags,
            Err(e) => {
                report.failures.push(ItemFailure::new(EntityKind::Query, query_id, e));
                continue;
            }
        };

        // The card's own display follows the first component that shows it.
        let visualization = spec
            .components()
            .filter(|c| c.query_id.as_deref() == Some(query_id.as_str()))
            .find_map(|c| map_component(c).ok());
        let (display, settings) = match visualization {
            Some(viz) => (viz.display, viz.settings),
            None => (Display::Table, Default::default()),
        };

        let card = CardDefinition::native(
            card_name(&dashboard_id, query_id, target.database_id),
            target.database_id,
            sql,
            &tags,
            display.as_str(),
            settings,
            target.collection_id,
        );

        match upsert_card(api, target.database_id, &card).await {
            Ok((card_id, action)) => {
                tracing::info!(query_id, card_id, ?action, "provisioned query");
                report.cards.insert(query_id.clone(), card_id);
                report.created.push(CreatedEntity {
                    kind: EntityKind::Query,
                    spec_id: query_id.clone(),
                    external_id: card_id,
                    action,
                });
            }
            Err(e) => {
                tracing::warn!(query_id, error = %e, "failed to provision query");
                report.failures.push(ItemFailure::new(EntityKind::Query, query_id, e));
            }
        }
    }

    report
}

async fn upsert_card(api: &dyn MetabaseApi, database_id: i64, card: &CardDefinition) -> AppResult<(i64, Action)> {
    match api.find_card(database_id, &card.name).await? {
        Some(card_id) => {
            api.update_card(card_id, card).await?;
            Ok((card_id, Action::Updated))
        }
        None => Ok((api.create_card(card).await?, Action::Created)),
    }
}
