use crate::core::client::kube_resources::{Container, EnvVar, VolumeMount};

/// Idempotent edits on a container. Applying any of these twice with the same
/// input leaves the container as it was after the first call.
pub trait ContainerExt {
    /// Set `name` to `value`, replacing an existing entry in place.
    fn upsert_env(&mut self, name: &str, value: &str);

    /// Append `arg` unless it is already present.
    fn ensure_arg(&mut self, arg: &str);

    /// Replace every arg that starts with `prefix` by a single `prefix` + `value`.
    fn set_prefixed_arg(&mut self, prefix: &str, value: &str);

    /// Replace the mount with the same name, or append it.
    fn upsert_volume_mount(&mut self, mount: VolumeMount);

    fn env_value(&self, name: &str) -> Option<&str>;

    fn has_arg(&self, arg: &str) -> bool;
}

impl ContainerExt for Container {
    fn upsert_env(&mut self, name: &str, value: &str) {
        let env = self.env.get_or_insert_with(Vec::new);
        let var = EnvVar {
            name: name.to_string(),
            value: Some(value.to_string()),
            ..Default::default()
        };
        match env.iter_mut().find(|e| e.name == name) {
            Some(existing) => *existing = var,
            None => env.push(var),
        }
    }

    fn ensure_arg(&mut self, arg: &str) {
        let args = self.args.get_or_insert_with(Vec::new);
        if !args.iter().any(|a| a == arg) {
            args.push(arg.to_string());
        }
    }

    fn set_prefixed_arg(&mut self, prefix: &str, value: &str) {
        let args = self.args.get_or_insert_with(Vec::new);
        let replacement = format!("{prefix}{value}");
        match args.iter().position(|a| a.starts_with(prefix)) {
            Some(first) => {
                args[first] = replacement;
                let mut index = 0;
                args.retain(|a| {
                    let keep = index == first || !a.starts_with(prefix);
                    index += 1;
                    keep
                });
            }
            None => args.push(replacement),
        }
    }

    fn upsert_volume_mount(&mut self, mount: VolumeMount) {
        let mounts = self.volume_mounts.get_or_insert_with(Vec::new);
        match mounts.iter_mut().find(|m| m.name == mount.name) {
            Some(existing) => *existing = mount,
            None => mounts.push(mount),
        }
    }

    fn env_value(&self, name: &str) -> Option<&str> {
        self.env
            .as_ref()?
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.value.as_deref())
    }

    fn has_arg(&self, arg: &str) -> bool {
        self.args
            .as_ref()
            .is_some_and(|args| args.iter().any(|a| a == arg))
    }
}

pub fn read_only_mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        read_only: Some(true),
        ..Default::default()
    }
}

pub fn mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        ..Default::default()
    }
}
