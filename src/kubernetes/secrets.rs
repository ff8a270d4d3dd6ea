// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret store backed by the Kubernetes API

use crate::error::{Result, SyncError};
use crate::kubernetes::namespaces::list_namespace_names;
use crate::store::{ClusterSecrets, CreateOutcome, SecretRef};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{DeleteParams, PostParams},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::{self, Config as WatcherConfig, Event};
use kube_runtime::WatchStreamExt;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct KubeSecrets {
    client: Client,
}

impl KubeSecrets {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn is_status(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == code)
}

fn deleted_ref(secret: &Secret) -> SecretRef {
    SecretRef {
        namespace: secret.namespace().unwrap_or_default(),
        name: secret.name_any(),
    }
}

#[async_trait]
impl ClusterSecrets for KubeSecrets {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        list_namespace_names(&self.client).await
    }

    #[instrument(skip(self))]
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    #[instrument(skip(self, secret), fields(name = %secret.name_any()))]
    async fn create(&self, namespace: &str, secret: &Secret) -> Result<CreateOutcome> {
        match self.api(namespace).create(&PostParams::default(), secret).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(e) if is_status(&e, 409) => {
                debug!("Secret already exists");
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, secret), fields(name = %secret.name_any()))]
    async fn replace(&self, namespace: &str, secret: &Secret) -> Result<()> {
        self.api(namespace)
            .replace(&secret.name_any(), &PostParams::default(), secret)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        match self.api(namespace).delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_status(&e, 404) => {
                debug!("Secret already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn watch_deletions(&self, label_selector: &str) -> BoxStream<'static, Result<SecretRef>> {
        let secrets: Api<Secret> = Api::all(self.client.clone());
        let config = WatcherConfig::default().labels(label_selector);

        watcher::watcher(secrets, config)
            .default_backoff()
            .filter_map(|event| async move {
                match event {
                    Ok(Event::Delete(secret)) => Some(Ok(deleted_ref(&secret))),
                    Ok(_) => None,
                    Err(e) => Some(Err(SyncError::from(e))),
                }
            })
            .boxed()
    }
}
