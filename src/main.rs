//! CarePath - 患者端分诊工作流编排器
//!
//! 入口：初始化日志、加载配置、构建客户端，然后
//! - `carepath <intake.json>`：依次执行评估 → 设施查询 → 远程问诊，输出最终快照与历史记录；
//! - `carepath --history`：仅输出历史统计与复核队列。

use std::path::PathBuf;

use anyhow::Context;
use carepath::config::{load_config, AppConfig};
use carepath::core::{ConsultationOutcome, StepOutcome};
use carepath::history::review_queue;
use carepath::triage::IntakeForm;
use carepath::{observability, ClientBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let client = ClientBuilder::new(cfg)
        .build()
        .context("Failed to build client")?;

    let arg = std::env::args().nth(1);
    match arg.as_deref() {
        Some("--history") => {
            let records = client.ledger().read_all().await;
            let output = serde_json::json!({
                "report": client.report().await,
                "review_queue": review_queue(&records),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Some(path) => {
            let path = PathBuf::from(path);
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read intake form {}", path.display()))?;
            let form: IntakeForm = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid intake form {}", path.display()))?;

            let workflow = client.workflow();
            if workflow.submit_assessment(form).await? == StepOutcome::Completed {
                if let Err(e) = workflow.lookup_facilities().await {
                    tracing::warn!("Facility lookup failed: {}", e);
                }
                if let ConsultationOutcome::Settled(report) = workflow.start_consultation().await? {
                    tracing::info!(
                        patient_id = %report.patient_id,
                        complete = report.fully_succeeded(),
                        "Consultation settled"
                    );
                }
            }

            let output = serde_json::json!({
                "snapshot": workflow.snapshot().await,
                "history": workflow.history().await,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        None => {
            eprintln!("usage: carepath <intake.json> | carepath --history");
            std::process::exit(2);
        }
    }

    Ok(())
}
