// Walk a line breakpoint through skip and expire counts against the mock target

use breakpoint_core::events::TargetState;
use breakpoint_core::mock::MockTarget;
use breakpoint_core::{BreakpointManager, StopDecision};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("breakpoint_core=debug")
        .with_writer(std::io::stderr)
        .init();

    println!("🔧 Loading com.example.Foo into the mock target...\n");

    let target = Arc::new(MockTarget::new());
    let class = target.load_class("com.example.Foo", "com/example/Foo.java");
    target.add_line(&class, 42, 17);

    let manager = BreakpointManager::new(target.clone());
    let id = manager.create("com.example.Foo:42")?;
    manager.set_skip_count(id, 2)?;
    manager.set_expire_count(id, 2)?;
    println!("✓ Created {}", manager.describe(id, false)?);

    let request_id = manager
        .with_breakpoint(id, |bp| bp.binding().map(|b| b.request_id))?
        .ok_or_else(|| anyhow::anyhow!("breakpoint {} did not resolve", id))?;
    println!("✓ Armed as request {}\n", request_id);

    for n in 1..=5 {
        let report = manager.on_candidate_hit(request_id, &TargetState::default());
        let marker = match report.decision {
            StopDecision::Stop => "🛑 stop",
            StopDecision::Continue => "▶️  continue",
        };
        println!(
            "   hit {}: {} (stop_count={}, expired={})",
            n, marker, report.stop_count, report.expired
        );
    }

    println!("\n📍 Final state: {}", manager.state(id)?);

    manager.reset(id)?;
    println!("✓ After reset: {}", manager.describe(id, false)?);

    Ok(())
}
