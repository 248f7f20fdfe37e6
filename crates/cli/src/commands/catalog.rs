use intake_core::catalog::{CatalogEntry, CatalogRegistry, QuestionDefinition};
use intake_core::config::ConfigOverrides;
use serde::Serialize;

use crate::commands::{load_engine, CommandResult};

#[derive(Debug, Serialize)]
struct ServiceSummary<'a> {
    service: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias_of: Option<&'a str>,
    questions: usize,
}

#[derive(Debug, Serialize)]
struct ResolvedReport<'a> {
    requested: &'a str,
    resolved: String,
    via_alias: bool,
    fell_back: bool,
    questions: &'a [QuestionDefinition],
}

pub fn run(service: Option<&str>) -> CommandResult {
    let (_, engine) = match load_engine("catalog", ConfigOverrides::default()) {
        Ok(loaded) => loaded,
        Err(result) => return result,
    };
    let registry = engine.registry();

    match service {
        Some(service) => show(registry, service),
        None => list(registry),
    }
}

fn list(registry: &CatalogRegistry) -> CommandResult {
    let services = registry
        .services()
        .map(|service| {
            let alias_of = match registry.entry(service) {
                Some(CatalogEntry::AliasOf(target)) => Some(target.as_str()),
                _ => None,
            };
            ServiceSummary { service, alias_of, questions: registry.resolve(service).len() }
        })
        .collect::<Vec<_>>();

    CommandResult::success_with_data(
        "catalog",
        format!("{} services available", services.len()),
        services,
    )
}

fn show(registry: &CatalogRegistry, service: &str) -> CommandResult {
    let resolved = registry.resolve_name(service);
    let message = if resolved.fell_back {
        format!("`{service}` is not a known service; using the default catalog")
    } else {
        format!("`{service}` resolves to `{}`", resolved.resolved_name)
    };
    let report = ResolvedReport {
        requested: service,
        resolved: resolved.resolved_name.clone(),
        via_alias: resolved.via_alias,
        fell_back: resolved.fell_back,
        questions: resolved.catalog.questions(),
    };

    CommandResult::success_with_data("catalog", message, report)
}
