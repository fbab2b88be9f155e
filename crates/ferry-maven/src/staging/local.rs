//! Filesystem staging into a Maven-layout directory (`~/.m2/repository` by
//! default). Used for the `local` target and for dry runs.
//!
//! Files are staged under `<root>/.ferry-staging/<session>/` and only copied
//! into the repository layout on release, together with an updated
//! `maven-metadata-local.xml`. Releasing a version that is already present
//! overwrites it.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use ferry_core::coordinates::Coordinates;
use ferry_core::credentials::RepositoryCredentials;
use ferry_core::publication::PublicationFile;
use ferry_util::errors::{FerryError, FerryResult};
use ferry_util::fs::{list_files, write_atomic};

use super::{OpenRequest, SessionId, StagingService, ValidationReport, Violation};
use crate::checksum::{sidecar_algorithm, verify_sidecar};
use crate::metadata::{parse_metadata, render_metadata, MavenMetadata};
use crate::pom::parse_pom;

const STAGING_DIR: &str = ".ferry-staging";
const LOCAL_METADATA: &str = "maven-metadata-local.xml";

/// Local Maven repository acting as a staging target.
pub struct LocalStaging {
    root: PathBuf,
    sessions: Mutex<HashMap<SessionId, Coordinates>>,
}

impl LocalStaging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging_dir(&self, session: &SessionId) -> PathBuf {
        self.root.join(STAGING_DIR).join(session.as_str())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Coordinates>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn coordinates(&self, session: &SessionId) -> FerryResult<Coordinates> {
        self.lock()
            .get(session)
            .cloned()
            .ok_or_else(|| FerryError::State {
                message: format!("unknown local staging session {session}"),
            })
    }

    fn check_staged(&self, session: &SessionId, coords: &Coordinates) -> FerryResult<Vec<Violation>> {
        let dir = self.staging_dir(session);
        let files: BTreeSet<String> = list_files(&dir)?
            .into_iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();

        let is_sidecar = |f: &str| f.ends_with(".asc") || sidecar_algorithm(f).is_some();
        let artifacts: Vec<&String> = files.iter().filter(|f| !is_sidecar(f.as_str())).collect();
        let mut violations = Vec::new();

        let expected_dir = format!("{}/", coords.path());
        for artifact in &artifacts {
            if !artifact.starts_with(&expected_dir) {
                violations.push(Violation::new(
                    "layout",
                    format!("{artifact} is outside {expected_dir}"),
                ));
            }
        }

        for file in &files {
            if let Some(algorithm) = sidecar_algorithm(file) {
                let base = &file[..file.len() - algorithm.len() - 1];
                if !files.contains(base) {
                    violations.push(Violation::new(
                        "checksum",
                        format!("{file} has no matching artifact"),
                    ));
                    continue;
                }
                let data = std::fs::read(dir.join(base))?;
                let sidecar = std::fs::read_to_string(dir.join(file))?;
                if let Err(msg) = verify_sidecar(algorithm, &data, &sidecar) {
                    violations.push(Violation::new("checksum", format!("{base}: {msg}")));
                }
            }
        }

        for artifact in &artifacts {
            for algorithm in ["md5", "sha1"] {
                if !files.contains(&format!("{artifact}.{algorithm}")) {
                    violations.push(Violation::new(
                        "checksum",
                        format!("{artifact} is missing its .{algorithm} checksum"),
                    ));
                }
            }
        }

        let signed = artifacts
            .iter()
            .filter(|a| files.contains(&format!("{a}.asc")))
            .count();
        if signed > 0 && signed < artifacts.len() {
            for artifact in &artifacts {
                if !files.contains(&format!("{artifact}.asc")) {
                    violations.push(Violation::new(
                        "signature",
                        format!("{artifact} is not signed while other files are"),
                    ));
                }
            }
        }

        for pom_file in artifacts.iter().filter(|a| a.ends_with(".pom")) {
            let pom = parse_pom(&std::fs::read_to_string(dir.join(pom_file.as_str()))?)?;
            let declared = (
                pom.group_id.as_deref().unwrap_or(""),
                pom.artifact_id.as_deref().unwrap_or(""),
                pom.version.as_deref().unwrap_or(""),
            );
            if declared != (coords.group.as_str(), coords.artifact.as_str(), coords.version.as_str())
            {
                violations.push(Violation::new(
                    "pom",
                    format!(
                        "{pom_file} declares {}:{}:{} but the session is for {coords}",
                        declared.0, declared.1, declared.2
                    ),
                ));
            }
        }

        Ok(violations)
    }
}

/// Reject staged paths that would escape the staging directory.
fn safe_relative(path: &str) -> FerryResult<PathBuf> {
    let rel = Path::new(path);
    if rel.components().all(|c| matches!(c, Component::Normal(_))) {
        Ok(rel.to_path_buf())
    } else {
        Err(FerryError::Rejected {
            message: format!("refusing to stage file with unsafe path '{path}'"),
        })
    }
}

#[async_trait]
impl StagingService for LocalStaging {
    fn name(&self) -> &str {
        "local"
    }

    fn allows_republish(&self) -> bool {
        true
    }

    async fn open(
        &self,
        _credentials: Option<&RepositoryCredentials>,
        request: &OpenRequest,
    ) -> FerryResult<SessionId> {
        let id = SessionId::new(uuid::Uuid::new_v4().to_string());
        let dir = self.staging_dir(&id);
        std::fs::create_dir_all(&dir).map_err(|e| FerryError::Unavailable {
            message: format!("cannot create {}: {e}", dir.display()),
        })?;
        self.lock().insert(id.clone(), request.coordinates.clone());
        Ok(id)
    }

    async fn upload(&self, session: &SessionId, file: &PublicationFile) -> FerryResult<()> {
        self.coordinates(session)?;
        let target = self.staging_dir(session).join(safe_relative(&file.path)?);
        write_atomic(&target, &file.content)?;
        Ok(())
    }

    async fn validate(&self, session: &SessionId) -> FerryResult<ValidationReport> {
        let coords = self.coordinates(session)?;
        Ok(ValidationReport::from_violations(
            self.check_staged(session, &coords)?,
        ))
    }

    async fn close(&self, session: &SessionId) -> FerryResult<()> {
        self.coordinates(session).map(|_| ())
    }

    async fn release(&self, session: &SessionId) -> FerryResult<()> {
        let coords = self.coordinates(session)?;
        let staged = self.staging_dir(session);

        let version_dir = self.root.join(coords.path());
        if version_dir.is_dir() && !list_files(&version_dir)?.is_empty() {
            tracing::info!(
                "{coords} already exists in {}; overwriting",
                self.root.display()
            );
        }

        for rel in list_files(&staged)? {
            let data = std::fs::read(staged.join(&rel))?;
            write_atomic(&self.root.join(&rel), &data)?;
        }

        let metadata_path = self.root.join(coords.artifact_path()).join(LOCAL_METADATA);
        let mut metadata = if metadata_path.is_file() {
            parse_metadata(&std::fs::read_to_string(&metadata_path)?)?
        } else {
            MavenMetadata::for_coordinates(&coords)
        };
        metadata.add_version(&coords.version);
        write_atomic(&metadata_path, render_metadata(&metadata)?.as_bytes())?;

        std::fs::remove_dir_all(&staged)?;
        self.lock().remove(session);
        tracing::debug!("Installed {coords} into {}", self.root.display());
        Ok(())
    }

    async fn drop_session(&self, session: &SessionId) -> FerryResult<()> {
        let staged = self.staging_dir(session);
        if staged.is_dir() {
            std::fs::remove_dir_all(&staged)?;
        }
        self.lock().remove(session);
        Ok(())
    }
}
