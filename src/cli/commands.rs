//! Command handlers.

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::adapters::notify::{NullNotifier, WebhookNotifier};
use crate::adapters::pipeline::{HttpPipeline, HttpPipelineConfig, StubPipeline};
use crate::adapters::sqlite::{
    all_embedded_migrations, create_pool, Migrator, SqliteArtifactRepository,
    SqliteOwnerRepository, SqliteTelemetryRepository,
};
use crate::domain::models::{ArtifactStatus, Config, MetricsWindow, Owner};
use crate::domain::ports::{
    ArtifactFilter, ArtifactRepository, GenerationPipeline, Notifier, OwnerRepository,
    TelemetryRepository,
};
use crate::domain::DomainError;
use crate::infrastructure::ConfigLoader;
use crate::services::{
    ControlLoop, DeploymentManager, GenerationOrchestrator, GenerationRequest, QualityMonitor,
};

/// Wired-up application stack shared by the command handlers.
pub struct AppContext {
    pub config: Config,
    pub artifacts: Arc<dyn ArtifactRepository>,
    pub owners: Arc<dyn OwnerRepository>,
    pub telemetry: Arc<dyn TelemetryRepository>,
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub monitor: Arc<QualityMonitor>,
}

pub async fn bootstrap(config_path: Option<&Path>) -> Result<AppContext> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    let database_url = format!("sqlite://{}", config.database.path);
    let pool = create_pool(&database_url, config.database.max_connections)
        .await
        .context("Failed to open the artifact store")?;

    Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .context("Failed to run database migrations")?;

    let artifacts: Arc<dyn ArtifactRepository> =
        Arc::new(SqliteArtifactRepository::new(pool.clone()));
    let owners: Arc<dyn OwnerRepository> = Arc::new(SqliteOwnerRepository::new(pool.clone()));
    let telemetry: Arc<dyn TelemetryRepository> =
        Arc::new(SqliteTelemetryRepository::new(pool.clone()));

    let pipeline: Arc<dyn GenerationPipeline> = match &config.generation.pipeline_endpoint {
        Some(endpoint) => Arc::new(
            HttpPipeline::new(HttpPipelineConfig {
                endpoint: endpoint.clone(),
                timeout: Duration::from_secs(config.generation.pipeline_timeout_secs),
            })
            .context("Failed to construct the pipeline client")?,
        ),
        None => Arc::new(StubPipeline::new()),
    };

    let notifier: Arc<dyn Notifier> = match &config.notify.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(NullNotifier),
    };

    let orchestrator = Arc::new(GenerationOrchestrator::new(
        artifacts.clone(),
        owners.clone(),
        pipeline,
        notifier,
        PathBuf::from(&config.workspace_root),
        config.generation.clone(),
    ));

    let monitor = Arc::new(QualityMonitor::new(
        telemetry.clone(),
        artifacts.clone(),
        orchestrator.clone(),
        config.monitor.clone(),
    ));

    Ok(AppContext {
        config,
        artifacts,
        owners,
        telemetry,
        orchestrator,
        monitor,
    })
}

/// `hatchery init` - write the default project config and create the
/// database.
pub async fn init(json: bool) -> Result<()> {
    let config_dir = Path::new(".hatchery");
    std::fs::create_dir_all(config_dir).context("Failed to create .hatchery directory")?;

    let config_file = config_dir.join("config.yaml");
    if !config_file.exists() {
        std::fs::write(&config_file, default_config_yaml())
            .context("Failed to write default config")?;
    }

    let context = bootstrap(None).await?;
    std::fs::create_dir_all(&context.config.workspace_root)
        .context("Failed to create the workspace root")?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "config": config_file.display().to_string(),
                "database": context.config.database.path,
                "workspace": context.config.workspace_root,
            })
        );
    } else {
        println!("Initialized hatchery project");
        println!("  Config:    {}", config_file.display());
        println!("  Database:  {}", context.config.database.path);
        println!("  Workspace: {}", context.config.workspace_root);
    }
    Ok(())
}

/// `hatchery daemon` - run the control loop until interrupted.
pub async fn daemon(config_path: Option<&Path>) -> Result<()> {
    let context = bootstrap(config_path).await?;

    let control_loop = ControlLoop::new(
        context.artifacts.clone(),
        context.owners.clone(),
        context.telemetry.clone(),
        context.orchestrator.clone(),
        context.monitor.clone(),
        context.config.daemon.clone(),
    );
    let handle = control_loop.handle();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = ctrl_c => {}
                        _ = term.recv() => {}
                    }
                }
                Err(_) => {
                    let _ = ctrl_c.await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        info!("Shutdown signal received; stopping control loop");
        handle.stop();
    });

    control_loop.run().await;
    Ok(())
}

/// `hatchery owner add`
pub async fn owner_add(config_path: Option<&Path>, name: String, json: bool) -> Result<()> {
    let context = bootstrap(config_path).await?;
    let owner = Owner::new(name);
    context.owners.create(&owner).await?;

    if json {
        println!("{}", serde_json::json!({ "owner_id": owner.id, "name": owner.name }));
    } else {
        println!("Owner registered");
        println!("  ID:   {}", owner.id);
        println!("  Name: {}", owner.name);
    }
    Ok(())
}

/// `hatchery owner list`
pub async fn owner_list(config_path: Option<&Path>, json: bool) -> Result<()> {
    let context = bootstrap(config_path).await?;
    let owners = context.owners.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&owners)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Name", "Artifacts", "Calls today"]);
    for owner in owners {
        table.add_row(vec![
            owner.id.to_string(),
            owner.name,
            owner.artifact_count.to_string(),
            owner.calls_today.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// `hatchery generate`
pub async fn generate(
    config_path: Option<&Path>,
    owner: Uuid,
    requirement: String,
    model: Option<String>,
    wait: bool,
    json: bool,
) -> Result<()> {
    let context = bootstrap(config_path).await?;

    let mut request = GenerationRequest::new(owner, requirement);
    request.model = model;
    let task_id = context.orchestrator.start_generation(request).await?;

    if !wait {
        if json {
            println!("{}", serde_json::json!({ "task_id": task_id, "status": "generating" }));
        } else {
            println!("Generation task created: {task_id}");
            println!("The daemon will process it; poll with `hatchery status {task_id}`");
        }
        return Ok(());
    }

    loop {
        let status = context.orchestrator.get_status(task_id).await?;
        if status.status == ArtifactStatus::Failed {
            let record = context.artifacts.get(task_id).await?;
            let reason = record
                .map(|a| a.description)
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "see the daemon log".to_string());
            return Err(DomainError::GenerationFailed(reason).into());
        }
        if status.status != ArtifactStatus::Generating {
            print_status(&status, json)?;
            return Ok(());
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

/// `hatchery status`
pub async fn status(config_path: Option<&Path>, task_id: Uuid, json: bool) -> Result<()> {
    let context = bootstrap(config_path).await?;
    let status = context.orchestrator.get_status(task_id).await?;
    print_status(&status, json)
}

fn print_status(status: &crate::services::GenerationStatus, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "task_id": status.artifact_id,
                "status": status.status.as_str(),
                "progress": status.progress_percent,
                "stage": status.stage.map(|s| s.as_str()),
                "quality_score": status.quality_score,
            })
        );
    } else {
        println!("Task {}", status.artifact_id);
        println!("  Status:   {}", status.status.as_str());
        println!("  Progress: {}%", status.progress_percent);
        if let Some(stage) = status.stage {
            println!("  Stage:    {} ({})", stage.as_str(), stage.message());
        }
        if let Some(score) = status.quality_score {
            println!("  Quality:  {score:.1}");
        }
    }
    Ok(())
}

/// `hatchery deploy` - deploy one artifact and supervise it until
/// interrupted.
pub async fn deploy(config_path: Option<&Path>, artifact_id: Uuid, json: bool) -> Result<()> {
    let context = bootstrap(config_path).await?;

    let artifact = context
        .artifacts
        .get(artifact_id)
        .await?
        .with_context(|| format!("Artifact {artifact_id} not found"))?;

    let Some(entry_location) = artifact.entry_location.clone() else {
        bail!("Artifact {artifact_id} has no generated source to deploy");
    };

    let manager = DeploymentManager::new(context.config.deploy.clone(), context.artifacts.clone());
    let deployment = manager
        .deploy(artifact_id, Path::new(&entry_location))
        .await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "artifact_id": artifact_id,
                "pid": deployment.pid,
                "port": deployment.port,
                "endpoints": deployment.endpoints,
            })
        );
    } else {
        println!("Artifact deployed");
        println!("  PID:  {}", deployment.pid);
        println!("  Port: {}", deployment.port);
        for endpoint in &deployment.endpoints {
            println!("  {endpoint}");
        }
        println!("Press Ctrl-C to stop");
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for interrupt")?;
    manager.stop(artifact_id).await?;
    Ok(())
}

/// `hatchery list`
pub async fn list(config_path: Option<&Path>, status: Option<String>, json: bool) -> Result<()> {
    let context = bootstrap(config_path).await?;

    let status_filter = match status.as_deref() {
        Some(s) => Some(
            ArtifactStatus::from_str(s)
                .with_context(|| format!("Unknown status filter: {s}"))?,
        ),
        None => None,
    };

    let artifacts = context
        .artifacts
        .list(ArtifactFilter {
            status: status_filter,
            ..Default::default()
        })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&artifacts)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "ID",
        "Name",
        "Status",
        "Quality",
        "Port",
        "Refinements",
    ]);
    for artifact in artifacts {
        table.add_row(vec![
            artifact.id.to_string(),
            artifact.name,
            artifact.status.as_str().to_string(),
            artifact
                .quality_score
                .map(|s| format!("{s:.1}"))
                .unwrap_or_else(|| "-".to_string()),
            artifact
                .deployed_port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            artifact.refinement_count.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// `hatchery report`
pub async fn report(
    config_path: Option<&Path>,
    artifact_id: Uuid,
    window: String,
    json: bool,
) -> Result<()> {
    let context = bootstrap(config_path).await?;

    let window = MetricsWindow::from_str(&window)
        .with_context(|| format!("Unknown metrics window: {window}"))?;

    let report = context.monitor.generate_report(artifact_id, window).await?;

    if json {
        println!("{}", serde_json::json!({ "artifact_id": artifact_id, "report": report }));
    } else {
        println!("{report}");
    }
    Ok(())
}

fn default_config_yaml() -> &'static str {
    r#"# Hatchery project configuration.
# Values here override built-in defaults; HATCHERY_* environment
# variables override values here (e.g. HATCHERY_DEPLOY__BASE_PORT).

workspace_root: .hatchery/workspace

database:
  path: .hatchery/hatchery.db

logging:
  level: info
  format: pretty

generation:
  # pipeline_endpoint: http://localhost:9000
  expected_duration_secs: 300

deploy:
  base_port: 8100
  max_port: 8200

monitor:
  error_rate_threshold: 0.05
  p99_latency_threshold_ms: 1000.0

daemon:
  tick_interval_secs: 5
  stuck_timeout_mins: 30
  enable_auto_refine: true

# notify:
#   webhook_url: http://localhost:3000/hooks/hatchery
"#
}
