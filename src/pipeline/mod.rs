//! The publish pipeline.
//!
//! A [`Publisher`] drives one run through
//! `Idle -> ManifestLoaded -> Transformed -> Written -> Published`, moving to
//! `Failed` and halting as soon as any stage errors. Stages cannot be skipped
//! or repeated; every error is tagged with the stage that produced it.

mod retry;
mod state;

pub use retry::{RetryPolicy, retry_with_backoff};
pub use state::{PipelineState, Stage};

use crate::config::PublisherConfig;
use crate::error::{PublishError, ReleaseError, Result};
use crate::manifest::{self, Manifest};
use crate::registry::{Credential, PublishResult, PublishTarget, RegistryClient};

/// Orchestrates a single publish run
#[derive(Debug)]
pub struct Publisher {
    config: PublisherConfig,
    client: RegistryClient,
    state: PipelineState,
    history: Vec<PipelineState>,
    failed_stage: Option<Stage>,
    credential: Option<Credential>,
}

impl Publisher {
    /// Create a publisher with a default registry client
    pub fn new(config: PublisherConfig) -> Result<Self> {
        Ok(Self::with_client(config, RegistryClient::new()?))
    }

    /// Create a publisher around an existing client
    pub fn with_client(config: PublisherConfig, client: RegistryClient) -> Self {
        Self {
            config,
            client,
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
            failed_stage: None,
            credential: None,
        }
    }

    /// Use this credential instead of reading `token_env` at publish time
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Current state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state visited, in order
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Stage that moved the pipeline to `Failed`
    pub fn failed_stage(&self) -> Option<Stage> {
        self.failed_stage
    }

    /// Configuration this publisher runs with
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Validate configuration and the triggering tag
    pub fn check_trigger(&mut self) -> Result<()> {
        self.enter(Stage::Trigger)?;
        let checked = self.config.validate().and_then(|()| self.config.check_tag());
        match checked {
            Ok(tag_version) => {
                if let Some(version) = &tag_version {
                    log::debug!("Release tag resolves to version {}", version);
                }
                Ok(())
            }
            Err(e) => Err(self.fail(Stage::Trigger, e)),
        }
    }

    /// Idle -> ManifestLoaded
    pub fn load(&mut self) -> Result<Manifest> {
        self.enter(Stage::Load)?;
        let path = self.config.manifest_path();
        match manifest::load_manifest(&path) {
            Ok(manifest) => {
                self.warn_on_tag_mismatch(&manifest);
                self.advance(Stage::Load);
                Ok(manifest)
            }
            Err(e) => Err(self.fail(Stage::Load, e)),
        }
    }

    /// ManifestLoaded -> Transformed
    pub fn transform(&mut self, manifest: Manifest) -> Result<Manifest> {
        self.enter(Stage::Transform)?;
        let steps = self.config.transform_steps();
        match manifest::apply_all(manifest, &steps) {
            Ok(manifest) => {
                log::info!("Applied {} transform step(s)", steps.len());
                self.advance(Stage::Transform);
                Ok(manifest)
            }
            Err(e) => Err(self.fail(Stage::Transform, e)),
        }
    }

    /// Transformed -> Written
    pub fn write(&mut self, manifest: &Manifest) -> Result<()> {
        self.enter(Stage::Write)?;
        let path = self.config.manifest_path();
        match manifest::write_manifest(manifest, &path) {
            Ok(()) => {
                log::info!("Manifest written to {}", path.display());
                self.advance(Stage::Write);
                Ok(())
            }
            Err(e) => Err(self.fail(Stage::Write, e)),
        }
    }

    /// Written -> Published, reading the token from the configured variable
    /// unless a credential was supplied
    ///
    /// The credential is dropped when this call returns.
    pub async fn publish(&mut self) -> Result<PublishResult> {
        self.enter(Stage::Publish)?;
        let credential = self.credential.take();
        let outcome = self.publish_inner(credential).await;
        match outcome {
            Ok(result) => {
                self.advance(Stage::Publish);
                Ok(result)
            }
            Err(e) => Err(self.fail(Stage::Publish, e)),
        }
    }

    async fn publish_inner(&self, credential: Option<Credential>) -> Result<PublishResult> {
        let target = self.config.publish_target()?;
        if self.config.dry_run {
            return self.client.dry_run(&target);
        }

        // Resolved before any request so a missing token never reaches the network
        let credential = match credential {
            Some(credential) => credential,
            None => Credential::from_env(&self.config.token_env)?,
        };

        if self.config.check_existing {
            self.ensure_unpublished(&target).await?;
        }

        let policy = self.config.retry_policy();
        retry_with_backoff(
            || self.client.publish(&target, credential.clone()),
            policy,
            "Registry publish",
        )
        .await
    }

    async fn ensure_unpublished(&self, target: &PublishTarget) -> Result<()> {
        let current = manifest::load_manifest(target.manifest_path())?;
        let (Some(name), Some(version)) = (current.name(), current.version()) else {
            return Ok(());
        };
        if self.client.version_exists(target, name, version).await? {
            return Err(PublishError::Conflict {
                package: name.to_string(),
                version: version.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Run only the local stages: trigger check, load, transform, write
    pub fn run_local(&mut self) -> Result<Manifest> {
        self.check_trigger()?;
        let loaded = self.load()?;
        let transformed = self.transform(loaded)?;
        self.write(&transformed)?;
        Ok(transformed)
    }

    /// Run the whole pipeline
    pub async fn run(&mut self) -> Result<PublishResult> {
        self.run_local()?;
        self.publish().await
    }

    fn warn_on_tag_mismatch(&self, manifest: &Manifest) {
        let Ok(Some(tag_version)) = self.config.check_tag() else {
            return;
        };
        if let Some(version) = manifest.version()
            && semver::Version::parse(version).ok().as_ref() != Some(&tag_version)
        {
            log::warn!(
                "Tag version {} differs from manifest version {}",
                tag_version,
                version
            );
        }
    }

    fn enter(&self, stage: Stage) -> Result<()> {
        let required = stage.requires();
        if self.state != required {
            return Err(ReleaseError::InvalidTransition {
                from: self.state,
                to: stage.produces(),
            });
        }
        log::debug!("Entering {} stage from {}", stage, self.state);
        Ok(())
    }

    fn advance(&mut self, stage: Stage) {
        let next = stage.produces();
        if next != self.state {
            self.state = next;
            self.history.push(next);
        }
    }

    fn fail(&mut self, stage: Stage, error: ReleaseError) -> ReleaseError {
        if error.is_conflict() {
            log::warn!("{} stage stopped: {}", stage, error);
        } else {
            log::error!("{} stage failed: {}", stage, error);
        }
        self.state = PipelineState::Failed;
        self.history.push(PipelineState::Failed);
        self.failed_stage = Some(stage);
        error.at_stage(stage)
    }
}
