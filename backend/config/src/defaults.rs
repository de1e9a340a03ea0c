//! Config defaults: fills unset isolated-execution fields.

use crate::schema::SandboxConfig;

/// Default container image.
pub const DEFAULT_IMAGE: &str = "ubuntu:22.04";

/// Default container network mode.
pub const DEFAULT_NETWORK: &str = "host";

/// Default container memory limit.
pub const DEFAULT_MEMORY: &str = "512m";

/// Default container CPU limit.
pub const DEFAULT_CPUS: &str = "2";

/// Default policy mode.
pub const DEFAULT_MODE: &str = "normal";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: SandboxConfig) -> SandboxConfig {
    let config = apply_mode_default(config);
    apply_docker_defaults(config)
}

fn apply_mode_default(mut config: SandboxConfig) -> SandboxConfig {
    if config.mode.trim().is_empty() {
        config.mode = DEFAULT_MODE.to_string();
    }
    config
}

fn apply_docker_defaults(mut config: SandboxConfig) -> SandboxConfig {
    let docker = &mut config.docker;
    fill(&mut docker.image, DEFAULT_IMAGE);
    fill(&mut docker.network, DEFAULT_NETWORK);
    fill(&mut docker.memory, DEFAULT_MEMORY);
    fill(&mut docker.cpus, DEFAULT_CPUS);
    config
}

fn fill(field: &mut String, default: &str) {
    if field.trim().is_empty() {
        *field = default.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DockerConfig;

    #[test]
    fn fills_empty_docker_fields() {
        let cfg = apply_all_defaults(SandboxConfig::default());
        assert_eq!(cfg.mode, "normal");
        assert_eq!(cfg.docker.image, DEFAULT_IMAGE);
        assert_eq!(cfg.docker.network, DEFAULT_NETWORK);
        assert_eq!(cfg.docker.memory, DEFAULT_MEMORY);
        assert_eq!(cfg.docker.cpus, DEFAULT_CPUS);
    }

    #[test]
    fn keeps_user_values() {
        let cfg = SandboxConfig {
            mode: "strict".into(),
            docker: DockerConfig {
                image: "alpine:3.18".into(),
                network: "none".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.mode, "strict");
        assert_eq!(cfg.docker.image, "alpine:3.18");
        assert_eq!(cfg.docker.network, "none");
        assert_eq!(cfg.docker.memory, DEFAULT_MEMORY);
    }
}
