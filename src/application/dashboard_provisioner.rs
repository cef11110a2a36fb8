// End-to-end provisioning of one dashboard against a Metabase API
use std::collections::BTreeMap;

use crate::application::metabase_api::MetabaseApi;
use crate::application::query_provisioner::provision_queries;
use crate::domain::filters::{FilterBindings, to_parameter};
use crate::domain::grid::{PlacedComponent, layout_section, translate};
use crate::domain::metabase::{DashCard, DashboardDefinition, DashboardLayout, DashboardParameter, ParameterMapping};
use crate::domain::provision::{Action, CreatedEntity, EntityKind, ItemFailure, ProvisionResult, ProvisionTarget};
use crate::domain::spec::Spec;
use crate::domain::visualization::map_component;
use crate::error::{AppError, AppResult};

/// Tag written into the dashboard description so a later run finds the
/// same dashboard again.
pub fn dashboard_marker(dashboard_id: &str) -> String {
    format!("[dashboard-creator:{}]", dashboard_id)
}

fn dashboard_description(spec: &Spec, marker: &str) -> String {
    let description = spec.description().trim();
    if description.is_empty() {
        marker.to_string()
    } else {
        format!("{}\n\n{}", description, marker)
    }
}

/// Dashcards plus the query each one shows, in placement order.
struct Placement {
    dashcards: Vec<DashCard>,
    query_ids: Vec<String>,
}

fn place_components(
    spec: &Spec,
    cards: &BTreeMap<String, i64>,
    created: &mut Vec<CreatedEntity>,
    failures: &mut Vec<ItemFailure>,
) -> Placement {
    let mut placement = Placement {
        dashcards: Vec::new(),
        query_ids: Vec::new(),
    };
    let mut next_id = -1;

    for section in spec.sections() {
        let placed = match layout_section(section) {
            Ok(placed) => placed,
            Err(e) => {
                for component in &section.components {
                    failures.push(ItemFailure::new(EntityKind::Card, &component.id, &e));
                }
                continue;
            }
        };

        for PlacedComponent { component, rect } in placed {
            let Some(query_id) = component.query_id.as_deref() else {
                failures.push(ItemFailure::new(EntityKind::Card, &component.id, "component has no query_id"));
                continue;
            };
            let Some(&card_id) = cards.get(query_id) else {
                failures.push(ItemFailure::new(
                    EntityKind::Card,
                    &component.id,
                    format!("query '{}' was not provisioned", query_id),
                ));
                continue;
            };
            let mapped = translate(&component.id, &rect).and_then(|target| Ok((target, map_component(component)?)));
            let (target, visualization) = match mapped {
                Ok(mapped) => mapped,
                Err(e) => {
                    failures.push(ItemFailure::new(EntityKind::Card, &component.id, e));
                    continue;
                }
            };

            placement
                .dashcards
                .push(DashCard::new(next_id, card_id, target, visualization.settings));
            placement.query_ids.push(query_id.to_string());
            created.push(CreatedEntity {
                kind: EntityKind::Card,
                spec_id: component.id.clone(),
                external_id: card_id,
                action: Action::Created,
            });
            next_id -= 1;
        }
    }

    placement
}

fn build_parameters(spec: &Spec, failures: &mut Vec<ItemFailure>) -> Vec<DashboardParameter> {
    spec.filters
        .items
        .iter()
        .filter_map(|filter| match to_parameter(filter) {
            Ok(parameter) => Some(parameter),
            Err(e) => {
                failures.push(ItemFailure::new(EntityKind::Parameters, &filter.id, e));
                None
            }
        })
        .collect()
}

/// Attach every parameter to each dashcard whose query uses its tag.
fn wire_parameters(placement: &mut Placement, parameters: &[DashboardParameter], bindings: &FilterBindings) {
    for (dashcard, query_id) in placement.dashcards.iter_mut().zip(&placement.query_ids) {
        for (tag, filter_id) in bindings.for_query(query_id) {
            if parameters.iter().any(|p| p.id == filter_id) {
                dashcard
                    .parameter_mappings
                    .push(ParameterMapping::template_tag(filter_id, dashcard.card_id, tag));
            }
        }
    }
}

/// Create or update the dashboard described by a validated spec.
///
/// Only a failure to obtain the dashboard itself or the loss of every query
/// aborts the run. Anything else is recorded per item in the result.
pub async fn provision_dashboard(
    api: &dyn MetabaseApi,
    spec: &Spec,
    target: &ProvisionTarget,
) -> AppResult<ProvisionResult> {
    let spec_id = spec.dashboard_id();
    let marker = dashboard_marker(&spec_id);
    let name = spec.title().unwrap_or(&spec_id).to_string();
    let description = dashboard_description(spec, &marker);

    let (dashboard_id, dashboard_action) = match api.find_dashboard(target.collection_id, &marker).await? {
        Some(id) => (id, Action::Updated),
        None => {
            let definition = DashboardDefinition {
                name: name.clone(),
                description: description.clone(),
                collection_id: target.collection_id,
            };
            (api.create_dashboard(&definition).await?, Action::Created)
        }
    };
    tracing::info!(dashboard = %spec_id, dashboard_id, ?dashboard_action, "resolved dashboard");

    let mut created = vec![CreatedEntity {
        kind: EntityKind::Dashboard,
        spec_id: spec_id.clone(),
        external_id: dashboard_id,
        action: dashboard_action,
    }];

    let bindings = FilterBindings::build(&spec.filters.items, &spec.queries);
    let queries = provision_queries(api, spec, &bindings, target).await;
    if queries.cards.is_empty() {
        return Err(AppError::NoQueriesProvisioned(
            queries.failures.iter().map(|f| format!("{}: {}", f.spec_id, f.error)).collect(),
        ));
    }
    let mut warnings: Vec<String> = queries
        .failures
        .iter()
        .map(|f| format!("query '{}' failed: {}", f.spec_id, f.error))
        .collect();
    let mut failures = queries.failures;
    created.extend(queries.created);

    let mut placement = place_components(spec, &queries.cards, &mut created, &mut failures);
    let parameters = build_parameters(spec, &mut failures);
    wire_parameters(&mut placement, &parameters, &bindings);

    let cards_placed = placement.dashcards.len();
    let parameters_count = parameters.len();
    let layout = DashboardLayout {
        name,
        description,
        dashcards: placement.dashcards,
        parameters,
    };

    let cards_created = match api.update_dashboard(dashboard_id, &layout).await {
        Ok(()) => {
            if parameters_count > 0 {
                created.push(CreatedEntity {
                    kind: EntityKind::Parameters,
                    spec_id: spec_id.clone(),
                    external_id: dashboard_id,
                    action: dashboard_action,
                });
            }
            cards_placed
        }
        Err(e) => {
            tracing::warn!(dashboard_id, error = %e, "failed to save dashboard layout");
            // Nothing was attached; keep only the dashboard and queries.
            created.retain(|c| c.kind != EntityKind::Card);
            warnings.push(format!("dashboard layout could not be saved: {}", e));
            failures.push(ItemFailure::new(EntityKind::Dashboard, &spec_id, e));
            0
        }
    };

    let verb = match dashboard_action {
        Action::Created => "created",
        Action::Updated => "updated",
    };
    let mut message = format!("Dashboard {} successfully with {} cards", verb, cards_created);
    if !failures.is_empty() {
        message.push_str(&format!(" ({} items failed)", failures.len()));
    }

    Ok(ProvisionResult {
        success: failures.is_empty(),
        dashboard_id,
        dashboard_url: format!("{}/dashboard/{}", api.base_url().trim_end_matches('/'), dashboard_id),
        message,
        cards_created,
        created,
        failures,
        warnings,
    })
}
