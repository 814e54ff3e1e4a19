use crate::config::HttpConfig;
use anyhow::{bail, Context, Result};
use gateway_controller_k8s_api::{self as k8s, ResourceExt};
use std::{fs, path::PathBuf, process::Command};

/// Signals the data plane to pick up a freshly written configuration.
pub trait Reload {
    fn reload(&self) -> Result<()>;
}

/// Reloads by running a command, `nginx -s reload` by default.
pub struct CommandReload {
    program: String,
    args: Vec<String>,
}

impl CommandReload {
    pub fn new(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = match parts.next() {
            Some(program) => program,
            None => bail!("reload command must not be empty"),
        };
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Reload for CommandReload {
    fn reload(&self) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .with_context(|| format!("failed to run {}", self.program))?;
        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// A certificate payload to materialize under the secrets directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecretFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl SecretFile {
    /// Extracts the PEM payload of a TLS secret: certificate followed by
    /// key. Secrets without both entries are not materialized.
    pub fn from_secret(secret: &k8s::Secret) -> Option<Self> {
        let data = secret.data.as_ref()?;
        let cert = data.get("tls.crt")?;
        let key = data.get("tls.key")?;

        let mut bytes = cert.0.clone();
        bytes.push(b'\n');
        bytes.extend_from_slice(&key.0);

        Some(Self {
            name: secret.name_unchecked(),
            data: bytes,
        })
    }
}

/// Writes the configuration artifact and certificate files, then triggers a
/// data-plane reload. Writes are idempotent; re-emitting an unchanged cycle
/// overwrites files in place.
pub struct Emitter {
    artifact_path: PathBuf,
    secrets_dir: PathBuf,
    reload: Box<dyn Reload + Send + Sync>,
}

impl Emitter {
    pub fn new(
        artifact_path: PathBuf,
        secrets_dir: PathBuf,
        reload: Box<dyn Reload + Send + Sync>,
    ) -> Self {
        Self {
            artifact_path,
            secrets_dir,
            reload,
        }
    }

    pub fn emit(&self, config: &HttpConfig, secrets: &[SecretFile]) -> Result<()> {
        for secret in secrets {
            let path = self.secrets_dir.join(&secret.name);
            fs::write(&path, &secret.data)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }

        let artifact =
            serde_json::to_vec_pretty(config).context("failed to serialize configuration")?;
        fs::write(&self.artifact_path, artifact)
            .with_context(|| format!("failed to write {}", self.artifact_path.display()))?;

        self.reload.reload().context("failed to reload data plane")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_controller_k8s_api::ByteString;
    use maplit::btreemap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingReload(AtomicUsize);

    impl Reload for &RecordingReload {
        fn reload(&self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn tls_secret_renders_cert_then_key() {
        let secret = k8s::Secret {
            metadata: gateway_controller_k8s_api::ObjectMeta {
                namespace: Some("test".to_string()),
                name: Some("cafe-secret".to_string()),
                ..Default::default()
            },
            data: Some(btreemap! {
                "tls.crt".to_string() => ByteString(b"CERT".to_vec()),
                "tls.key".to_string() => ByteString(b"KEY".to_vec()),
            }),
            ..Default::default()
        };

        let file = SecretFile::from_secret(&secret).expect("tls secret must materialize");
        assert_eq!(file.name, "cafe-secret");
        assert_eq!(file.data, b"CERT\nKEY".to_vec());
    }

    #[test]
    fn secret_without_key_material_is_skipped() {
        let secret = k8s::Secret {
            metadata: gateway_controller_k8s_api::ObjectMeta {
                namespace: Some("test".to_string()),
                name: Some("opaque".to_string()),
                ..Default::default()
            },
            data: Some(btreemap! {
                "token".to_string() => ByteString(b"x".to_vec()),
            }),
            ..Default::default()
        };
        assert!(SecretFile::from_secret(&secret).is_none());
    }

    #[test]
    fn emit_writes_artifact_secrets_and_reloads() {
        static RELOADS: RecordingReload = RecordingReload(AtomicUsize::new(0));

        let dir = tempfile::tempdir().expect("tempdir");
        let artifact_path = dir.path().join("config.json");
        let emitter = Emitter::new(
            artifact_path.clone(),
            dir.path().to_path_buf(),
            Box::new(&RELOADS),
        );

        let secrets = vec![SecretFile {
            name: "cafe-secret".to_string(),
            data: b"CERT\nKEY".to_vec(),
        }];
        emitter
            .emit(&HttpConfig::default(), &secrets)
            .expect("emit succeeds");

        let artifact = fs::read_to_string(&artifact_path).expect("artifact exists");
        assert!(artifact.contains("httpServers"));
        assert_eq!(
            fs::read(dir.path().join("cafe-secret")).expect("secret exists"),
            b"CERT\nKEY".to_vec()
        );
        assert_eq!(RELOADS.0.load(Ordering::SeqCst), 1);

        // Overwrite is idempotent.
        emitter
            .emit(&HttpConfig::default(), &secrets)
            .expect("re-emit succeeds");
        assert_eq!(RELOADS.0.load(Ordering::SeqCst), 2);
    }
}
