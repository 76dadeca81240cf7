use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use scanwiz_core::{CatalogKind, ResourceCatalogs, ScanStatus, WizardSelection};
use scanwiz_session::{
    BackendClient, ClientConfig, ResourceCatalogClient, ScanBackend, ScanSessionController,
    ScanWorkflow, WebSocketConnector,
};
use scanwiz_ui::App;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

fn backend(config: &Arc<ClientConfig>) -> Result<Arc<BackendClient>> {
    let client = BackendClient::new(Arc::clone(config)).context("Failed to build HTTP client")?;
    Ok(Arc::new(client))
}

fn controller(config: &Arc<ClientConfig>, client: Arc<BackendClient>) -> ScanSessionController {
    let connector = Arc::new(WebSocketConnector::new(Arc::clone(config)));
    ScanSessionController::new(client, connector)
}

pub async fn wizard(config: Arc<ClientConfig>) -> Result<()> {
    let client = backend(&config)?;
    let workflow = ScanWorkflow::new(controller(&config, Arc::clone(&client)));

    let mut app = App::new(workflow, ResourceCatalogClient::new(client));
    app.run().await?;

    Ok(())
}

pub async fn catalog(config: Arc<ClientConfig>) -> Result<()> {
    let client = backend(&config)?;
    let catalogs = ResourceCatalogClient::new(client).load().await;

    write_stdout_all(format_catalogs(&catalogs).as_bytes())
}

fn format_catalogs(catalogs: &ResourceCatalogs) -> String {
    let mut out = String::new();
    for kind in [
        CatalogKind::Models,
        CatalogKind::Environments,
        CatalogKind::Probes,
    ] {
        let mut title = kind.label().to_string();
        title[..1].make_ascii_uppercase();
        out.push_str(&format!("{title}:\n"));

        let entries: Vec<String> = match kind {
            CatalogKind::Models => catalogs
                .models
                .iter()
                .map(|m| format!("{} ({})", m.name, m.size))
                .collect(),
            CatalogKind::Environments => catalogs
                .environments
                .iter()
                .map(|e| format!("{} ({})", e.name, e.path))
                .collect(),
            CatalogKind::Probes => catalogs.probes.clone(),
        };

        if entries.is_empty() {
            match catalogs.issue(kind) {
                Some(reason) => out.push_str(&format!("  none available: {reason}\n")),
                None => out.push_str("  none available\n"),
            }
        }
        for entry in entries {
            out.push_str(&format!("  {entry}\n"));
        }
        out.push('\n');
    }
    out
}

/// Selected names missing from a catalog that loaded. Degraded catalogs are skipped.
fn unlisted_selections(catalogs: &ResourceCatalogs, selection: &WizardSelection) -> Vec<String> {
    let mut unlisted = Vec::new();
    if let Some(model) = selection.model.as_deref()
        && catalogs.issue(CatalogKind::Models).is_none()
        && !catalogs.contains_model(model)
    {
        unlisted.push(format!("model '{model}'"));
    }
    if let Some(environment) = selection.environment.as_deref()
        && catalogs.issue(CatalogKind::Environments).is_none()
        && !catalogs.contains_environment(environment)
    {
        unlisted.push(format!("environment '{environment}'"));
    }
    if let Some(probe) = selection.probe.as_deref()
        && catalogs.issue(CatalogKind::Probes).is_none()
        && !catalogs.contains_probe(probe)
    {
        unlisted.push(format!("probe '{probe}'"));
    }
    unlisted
}

/// Run one scan headless, echoing output lines as they arrive.
///
/// Succeeds only if the session completes.
pub async fn scan(config: Arc<ClientConfig>, selection: &WizardSelection) -> Result<()> {
    let client = backend(&config)?;

    let catalogs = ResourceCatalogClient::new(Arc::clone(&client) as _).load().await;
    for entry in unlisted_selections(&catalogs, selection) {
        warn!("Selected {entry} is not listed by the backend");
        eprintln!("Warning: {entry} is not listed by the backend");
    }

    let mut controller = controller(&config, client);

    controller
        .submit(selection)
        .context("Invalid scan selection")?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Creating scan session…");
    spinner.enable_steady_tick(Duration::from_millis(100));

    // Applies the submission result.
    controller.next_event().await;
    spinner.finish_and_clear();

    let Some(session_id) = controller.session().id().map(str::to_owned) else {
        bail!(
            "Failed to start scan: {}",
            controller.last_error().unwrap_or("unknown error")
        );
    };
    eprintln!("Session {session_id}");

    let mut printed = 0;
    let mut rechecked = false;
    loop {
        let more = controller.next_event().await;

        let output = controller.session().output();
        for line in &output[printed..] {
            write_stdout_all(format!("{line}\n").as_bytes())?;
        }
        printed = output.len();

        let status = controller.session().status();
        if status.is_terminal() {
            break;
        }
        if status == ScanStatus::UnknownDisconnect && !rechecked {
            rechecked = true;
            eprintln!("Event stream lost, asking the backend for the session status");
            let status = controller
                .reconcile()
                .await
                .context("Failed to fetch session status")?;
            // A running scan gets its stream reopened.
            if status.is_live() {
                continue;
            }
            break;
        }
        if !more {
            break;
        }
    }
    controller.shutdown();

    match controller.session().status() {
        ScanStatus::Completed => Ok(()),
        ScanStatus::Failed => bail!("Scan {session_id} failed"),
        other => bail!("Scan {session_id} did not finish (status: {})", other.label()),
    }
}

pub async fn status(config: Arc<ClientConfig>, session_id: &str) -> Result<()> {
    let client = backend(&config)?;
    let record = client
        .session_record(session_id)
        .await
        .with_context(|| format!("Failed to fetch session '{session_id}'"))?;

    let mut out = format!(
        "Session:     {}\nStatus:      {}\nModel:       {}\nEnvironment: {}\nTool:        {}\nProbe:       {}\n",
        record.id, record.status, record.model_name, record.environment, record.tool, record.probe,
    );
    if let Some(created) = &record.created_at {
        out.push_str(&format!("Created:     {created}\n"));
    }
    if let Some(completed) = &record.completed_at {
        out.push_str(&format!("Completed:   {completed}\n"));
    }
    if !record.output.is_empty() {
        out.push_str("\n=== output ===\n");
        out.push_str(&record.output);
        if !record.output.ends_with('\n') {
            out.push('\n');
        }
    }

    write_stdout_all(out.as_bytes())
}

fn write_stdout_all(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout();
    if let Err(e) = stdout.write_all(bytes) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanwiz_core::{EnvironmentInfo, ModelInfo, ScanTool};

    #[test]
    fn test_catalog_listing_explains_empty_sections() {
        let mut catalogs = ResourceCatalogs::default();
        catalogs.models = vec![ModelInfo::new("llama3:8b", "4.7 GB")];
        catalogs.environments = vec![EnvironmentInfo::new("garak", "/envs/garak")];
        catalogs.degrade(CatalogKind::Probes, "Backend reported: Garak not installed");

        let text = format_catalogs(&catalogs);

        assert!(text.contains("Models:\n  llama3:8b (4.7 GB)\n"));
        assert!(text.contains("Environments:\n  garak (/envs/garak)\n"));
        assert!(text.contains("Probes:\n  none available: Backend reported: Garak not installed\n"));
    }

    #[test]
    fn test_unlisted_selections_skip_degraded_catalogs() {
        let mut catalogs = ResourceCatalogs::default();
        catalogs.models = vec![ModelInfo::new("llama3:8b", "4.7 GB")];
        catalogs.environments = vec![EnvironmentInfo::new("garak", "/envs/garak")];
        catalogs.degrade(CatalogKind::Probes, "Garak not installed");

        let selection = WizardSelection {
            model: Some("mistral:7b".into()),
            environment: Some("garak".into()),
            tool: ScanTool::Garak,
            probe: Some("dan.Dan_11_0".into()),
        };

        assert_eq!(
            unlisted_selections(&catalogs, &selection),
            ["model 'mistral:7b'"]
        );

        catalogs.models.push(ModelInfo::new("mistral:7b", "4.1 GB"));
        assert!(unlisted_selections(&catalogs, &selection).is_empty());
    }
}
