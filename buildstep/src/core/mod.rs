//! Pure, deterministic logic: build identity and the exact command shapes the steps run.
//!
//! Nothing here touches the filesystem, the environment, or child processes.

pub mod commands;
pub mod identity;
