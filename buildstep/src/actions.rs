//! Effectful step bodies.
//!
//! Every action propagates the first error unchanged. The image actions check
//! their environment before running any subprocess, including git.

use tracing::{info, instrument};

use crate::core::commands::{build_image_command, make_command, push_image_commands};
use crate::core::identity::BuildIdentity;
use crate::error::StepError;
use crate::io::artifacts::write_build_id;
use crate::io::config::ImageConfig;
use crate::workspace::Workspace;

#[instrument(skip_all)]
pub fn do_make(ws: &Workspace<'_>) -> Result<(), StepError> {
    ws.commands.run(&ws.workdir, &make_command())
}

/// Read the image configuration, then compare HEAD with the reference tip.
pub fn resolve_identity(ws: &Workspace<'_>) -> Result<(ImageConfig, BuildIdentity), StepError> {
    let cfg = ImageConfig::from_env(ws.env)?;
    let is_tip = ws.refs.is_current_commit_tip_of(&ws.reference)?;
    let identity = BuildIdentity::new(is_tip, cfg.counter.clone());
    info!(
        image = %cfg.image,
        build_id = %identity.build_id(),
        latest = identity.add_latest_tag,
        "resolved build identity"
    );
    Ok((cfg, identity))
}

/// Build the image and record its build id under `artifacts/`.
#[instrument(skip_all)]
pub fn do_build_image(ws: &Workspace<'_>) -> Result<(), StepError> {
    let (cfg, identity) = resolve_identity(ws)?;
    ws.commands
        .run(&ws.workdir, &build_image_command(&cfg.image, &identity))?;
    let path = write_build_id(&ws.workdir, &identity.build_id())?;
    info!(path = %path.display(), "recorded build id");
    Ok(())
}

/// Push the primary tag, then `latest` when applicable.
///
/// The identity is recomputed rather than read back from the build step, so
/// the push can run as its own pipeline invocation.
#[instrument(skip_all)]
pub fn do_push_image(ws: &Workspace<'_>) -> Result<(), StepError> {
    let (cfg, identity) = resolve_identity(ws)?;
    for cmd in push_image_commands(&cfg.image, &identity) {
        ws.commands.run(&ws.workdir, &cmd)?;
    }
    Ok(())
}
