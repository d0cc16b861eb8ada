//! Argument vectors for every subprocess a step runs.

use crate::core::identity::BuildIdentity;

/// Container build descriptor, relative to the working directory.
pub const DESCRIPTOR_PATH: &str = "docker/Dockerfile";

/// `make all`
pub fn make_command() -> Vec<String> {
    vec!["make".to_string(), "all".to_string()]
}

/// `docker build -t <primary> [-t <latest>] -f docker/Dockerfile .`
pub fn build_image_command(image: &str, identity: &BuildIdentity) -> Vec<String> {
    let mut cmd = vec!["docker".to_string(), "build".to_string()];
    for tag in identity.tags(image) {
        cmd.push("-t".to_string());
        cmd.push(tag);
    }
    cmd.push("-f".to_string());
    cmd.push(DESCRIPTOR_PATH.to_string());
    cmd.push(".".to_string());
    cmd
}

/// One `docker push <tag>` per tag, primary first.
pub fn push_image_commands(image: &str, identity: &BuildIdentity) -> Vec<Vec<String>> {
    identity
        .tags(image)
        .into_iter()
        .map(|tag| vec!["docker".to_string(), "push".to_string(), tag])
        .collect()
}
