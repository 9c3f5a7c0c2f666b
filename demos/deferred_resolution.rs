// Set breakpoints before their classes load and let the dispatcher resolve them

use breakpoint_core::dispatcher::DispatchOutcome;
use breakpoint_core::events::{TargetEvent, TargetState};
use breakpoint_core::mock::MockTarget;
use breakpoint_core::resolver::ResolvedTarget;
use breakpoint_core::{spawn_dispatcher, BreakpointManager};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("breakpoint_core=debug")
        .with_writer(std::io::stderr)
        .init();

    let target = Arc::new(MockTarget::new());
    let manager = Arc::new(BreakpointManager::new(target.clone()));

    let line = manager.create("com.example.Foo:42")?;
    let method = manager.create("com.example.Foo.handle(String)")?;
    for id in [line, method] {
        println!("✓ {}", manager.describe(id, false)?);
    }

    let (dispatcher, mut reports) = spawn_dispatcher(manager.clone());

    println!("\n📦 Loading com.example.Foo...");
    let class = target.load_class("com.example.Foo", "com/example/Foo.java");
    target.add_method(&class, "handle", &["java.lang.String"]);
    target.add_method(&class, "handle", &["int"]);
    target.add_line(&class, 42, 9);

    if let DispatchOutcome::Structural(failures) = dispatcher.deliver(TargetEvent::ClassPrepare { class }).await? {
        for (id, e) in failures {
            println!("⚠️  Breakpoint {} failed to resolve: {}", id, e);
        }
    }
    for id in [line, method] {
        println!("✓ {}", manager.describe(id, false)?);
    }

    let location = manager.with_breakpoint(line, |bp| match bp.binding().map(|b| &b.target) {
        Some(ResolvedTarget::Location { location, .. }) => Some(location.clone()),
        _ => None,
    })?;

    if let Some(location) = location {
        println!("\n🎯 Thread 1 reaches com/example/Foo.java:42");
        for event in target.hits_at(&location, &TargetState::at(1, location.clone())) {
            dispatcher.deliver(event).await?;
        }
    }

    dispatcher.shutdown().await;

    while let Some(report) = reports.recv().await {
        println!(
            "   breakpoint {:?} via request {}: {:?}, suspend {}",
            report.breakpoint, report.request_id, report.decision, report.suspend_policy
        );
    }

    Ok(())
}
