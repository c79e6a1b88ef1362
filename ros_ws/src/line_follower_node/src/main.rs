// ================================
// src/main.rs
// ================================
mod node;

use anyhow::Result;
use line_follower::LineFollowerParams;
use node::LineFollowerNode;
use rclrs::*;
use tracing::{info, Level};

fn main() -> Result<()> {
    let params = LineFollowerParams::load()?;

    let level = if params.debug_mode {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Line Follower Node with Rust");
    if params.debug_mode {
        info!("=== Parameters ===\n{:#?}", params);
    }

    let mut executor = Context::default_from_env()?.create_basic_executor();
    let node = LineFollowerNode::new(&executor, params)?;

    // Returns once the context is shut down (Ctrl-C).
    let spin_result = executor.spin(SpinOptions::default()).first_error();

    node.shutdown()?;
    info!("Line follower stopped");

    spin_result?;
    Ok(())
}
