//! Referential validation for apply and delete
//!
//! Runs before any mutation; a failure aborts the whole operation with no
//! partial effect visible to readers.

use featherstore_core::error::{Error, Result};
use featherstore_core::types::{FcoKind, FcoSpec, RegistrySnapshot, RepoContents};
use std::collections::HashSet;

/// Validate a declared object set ahead of apply
///
/// Checks name invariants (non-empty, unique per kind, case-sensitive) and
/// referential integrity: feature view entities and sources, on-demand view
/// sources, and feature service views must all resolve within the declared
/// set, because that set becomes the entire snapshot after pruning.
pub fn validate_contents(contents: &RepoContents) -> Result<()> {
    let entities = check_names("entity", contents.entities.iter().map(|s| s.name()))?;
    let sources = check_names("data source", contents.data_sources.iter().map(|s| s.name()))?;
    let views = check_names("feature view", contents.feature_views.iter().map(|s| s.name()))?;
    let odfvs = check_names(
        "on-demand feature view",
        contents.on_demand_feature_views.iter().map(|s| s.name()),
    )?;
    check_names(
        "feature service",
        contents.feature_services.iter().map(|s| s.name()),
    )?;

    for view in &contents.feature_views {
        for entity in &view.entities {
            if !entities.contains(entity.as_str()) {
                return Err(Error::validation(format!(
                    "feature view '{}' references undeclared entity '{}'",
                    view.name, entity
                )));
            }
        }
        if !sources.contains(view.source.as_str()) {
            return Err(Error::validation(format!(
                "feature view '{}' references undeclared data source '{}'",
                view.name, view.source
            )));
        }
    }

    for odfv in &contents.on_demand_feature_views {
        for source in &odfv.sources {
            if !views.contains(source.as_str()) && !sources.contains(source.as_str()) {
                return Err(Error::validation(format!(
                    "on-demand feature view '{}' references undeclared source '{}'",
                    odfv.name, source
                )));
            }
        }
    }

    for service in &contents.feature_services {
        for view in &service.views {
            if !views.contains(view.as_str()) && !odfvs.contains(view.as_str()) {
                return Err(Error::validation(format!(
                    "feature service '{}' references undeclared feature view '{}'",
                    service.name, view
                )));
            }
        }
    }

    Ok(())
}

/// Reject deleting an object that something else in the snapshot still
/// references
pub fn validate_delete(snapshot: &RegistrySnapshot, kind: FcoKind, name: &str) -> Result<()> {
    let referenced_by_view = |pred: &dyn Fn(&featherstore_core::FeatureViewSpec) -> bool| {
        snapshot
            .feature_views
            .iter()
            .find(|r| pred(&r.spec))
            .map(|r| r.spec.name.clone())
    };

    match kind {
        FcoKind::Entity => {
            if let Some(view) = referenced_by_view(&|v| v.entities.iter().any(|e| e == name)) {
                return Err(Error::validation(format!(
                    "entity '{}' is still referenced by feature view '{}'",
                    name, view
                )));
            }
        }
        FcoKind::DataSource => {
            if let Some(view) = referenced_by_view(&|v| v.source == name) {
                return Err(Error::validation(format!(
                    "data source '{}' is still referenced by feature view '{}'",
                    name, view
                )));
            }
        }
        FcoKind::FeatureView | FcoKind::OnDemandFeatureView => {
            if let Some(service) = snapshot
                .feature_services
                .iter()
                .find(|r| r.spec.views.iter().any(|v| v == name))
            {
                return Err(Error::validation(format!(
                    "feature view '{}' is still referenced by feature service '{}'",
                    name,
                    service.spec.name
                )));
            }
        }
        FcoKind::FeatureService => {}
    }
    Ok(())
}

fn check_names<'a>(
    kind: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<HashSet<&'a str>> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(Error::validation(format!("{} with empty name", kind)));
        }
        if !seen.insert(name) {
            return Err(Error::validation(format!(
                "duplicate {} name '{}'",
                kind, name
            )));
        }
    }
    Ok(seen)
}
