//! CLI commands

use std::env;
use std::fmt::Display;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::{Error, Result};

pub mod format;
pub mod inventory;
pub mod migrate;
pub mod rollback;

/// Extension trait to convert errors with Display to CLI Error::CommandFailed.
pub trait CommandErrorExt<T> {
    /// Convert an error to `Error::CommandFailed` using its Display implementation.
    fn cmd_err(self) -> Result<T>;
}

impl<T, E: Display> CommandErrorExt<T> for std::result::Result<T, E> {
    fn cmd_err(self) -> Result<T> {
        self.map_err(|e| Error::command_failed(e.to_string()))
    }
}

/// Build a kube [`Client`].
///
/// Uses `explicit` (the `--kubeconfig` flag) when given, otherwise kube
/// defaults: `$KUBECONFIG`, then `~/.kube/config`, then in-cluster config.
pub async fn kube_client(explicit: Option<&str>) -> Result<Client> {
    match explicit.filter(|p| !p.trim().is_empty()) {
        Some(paths) => {
            debug!(kubeconfig = %paths, "using explicit kubeconfig");
            kube_client_from_path(paths).await
        }
        None => Client::try_default().await.cmd_err(),
    }
}

/// Build a kube [`Client`] from kubeconfig file(s), using the current context.
pub async fn kube_client_from_path(paths: &str) -> Result<Client> {
    let kubeconfig = load_kubeconfig(paths)?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .cmd_err()?;
    Client::try_from(config).cmd_err()
}

/// Read a kubeconfig path list, separated the same way as `$KUBECONFIG`.
///
/// Files are merged in order; the first file to set a value wins.
pub fn load_kubeconfig(paths: &str) -> Result<Kubeconfig> {
    let mut merged: Option<Kubeconfig> = None;
    for path in env::split_paths(paths).filter(|p| !p.as_os_str().is_empty()) {
        let next = Kubeconfig::read_from(&path).map_err(|e| {
            Error::command_failed(format!(
                "failed to read kubeconfig {}: {}",
                path.display(),
                e
            ))
        })?;
        merged = Some(match merged {
            Some(kubeconfig) => kubeconfig.merge(next).cmd_err()?,
            None => next,
        });
    }
    merged.ok_or_else(|| Error::command_failed("no kubeconfig path given"))
}
