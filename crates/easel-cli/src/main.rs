use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easel_core::domain::{InlineAsset, ResultEnvelope};
use easel_core::impls::{InMemoryTaskStore, TimeoutDispatcher};
use easel_core::ports::{DispatchCall, RemoteDispatcher, SystemClock, Target, UlidGenerator};
use easel_core::{CompositeDimensions, EaselConfig, SubmitResult, TaskAction, TaskService};

/// 1x1 transparent PNG.
const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Stand-in for the generation backend: answers every call after a short delay.
struct SimulatedBackend {
    latency: Duration,
}

#[async_trait]
impl RemoteDispatcher for SimulatedBackend {
    async fn upload(&self, file_name: &str, asset: &InlineAsset) -> ResultEnvelope<String> {
        tokio::time::sleep(self.latency / 4).await;
        info!(file_name, media_type = asset.media_type(), bytes = asset.data().len(), "simulated upload");
        ResultEnvelope::success(format!("https://cdn.example.invalid/attachments/{file_name}"))
    }

    async fn dispatch(&self, call: DispatchCall) -> ResultEnvelope<String> {
        tokio::time::sleep(self.latency).await;
        let ack = format!("{}-{}", call.kind(), call.nonce());
        info!(kind = call.kind(), ack = %ack, "simulated dispatch");
        ResultEnvelope::success(ack)
    }
}

#[derive(Serialize)]
struct Report<'a> {
    action: &'a str,
    #[serde(flatten)]
    result: &'a SubmitResult,
}

fn print_report(action: &str, result: &SubmitResult) -> anyhow::Result<()> {
    let line = serde_json::to_string(&Report { action, result })?;
    println!("{line}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "easel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EaselConfig::from_env().context("invalid EASEL_* configuration")?;
    info!(?config, "easel demo starting");

    let remote = Arc::new(TimeoutDispatcher::new(
        Arc::new(SimulatedBackend {
            latency: Duration::from_millis(200),
        }),
        config.remote_timeout,
    ));
    let service = Arc::new(TaskService::new(
        config.queue,
        remote,
        Arc::new(InMemoryTaskStore::new()),
        Arc::new(SystemClock),
        Arc::new(UlidGenerator::new(SystemClock)),
    ));

    let pixel = InlineAsset::from_data_url(PIXEL).context("demo asset is not a data URL")?;

    // One of each action, one at a time.
    let create = service.new_task(TaskAction::Create, "a lighthouse in a storm, oil painting");
    let result = service.submit_create(create, vec![pixel.clone()]).await;
    print_report("CREATE", &result)?;

    let target = Target::new("1200000000000000001", "5f2c9a");
    let upscale = service.new_task(TaskAction::Upscale, "");
    print_report(
        "UPSCALE",
        &service.submit_upscale(upscale, target.clone(), 2).await,
    )?;

    let zoom = service.new_task(TaskAction::ZoomFar, "");
    print_report("ZOOM_FAR", &service.submit_zoom(zoom, target.clone()).await)?;

    let pan = service.new_task(TaskAction::PanRight, "");
    print_report("PAN_RIGHT", &service.submit_pan(pan, target.clone()).await)?;

    let composite = service.new_task(TaskAction::Composite, "");
    let result = service
        .submit_composite(
            composite,
            vec![pixel.clone(), pixel.clone()],
            CompositeDimensions::Landscape,
        )
        .await;
    print_report("COMPOSITE", &result)?;

    // A burst larger than the queue holds; the overflow comes back QUEUE_FULL.
    let burst = config.queue.capacity() + 4;
    let mut handles = Vec::with_capacity(burst);
    for n in 0..burst {
        let service = Arc::clone(&service);
        let task = service.new_task(TaskAction::Create, format!("burst #{n}"));
        handles.push(tokio::spawn(async move {
            service.submit_create(task, Vec::new()).await
        }));
    }
    for handle in handles {
        let result = handle.await.context("submission task panicked")?;
        print_report("CREATE", &result)?;
    }

    println!("{}", serde_json::to_string(&service.counts())?);
    service.shutdown().await;
    Ok(())
}
