//! maven-metadata.xml: reading the version listing of a released artifact,
//! and writing the `maven-metadata-local.xml` kept by the local target.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use reqwest::Client;

use ferry_core::coordinates::Coordinates;
use ferry_core::credentials::RepositoryCredentials;
use ferry_util::errors::{FerryError, FerryResult};

use crate::download;
use crate::repository;

/// Artifact-level Maven metadata listing available versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MavenMetadata {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub latest: Option<String>,
    pub release: Option<String>,
    pub versions: Vec<String>,
    pub last_updated: Option<String>,
}

impl MavenMetadata {
    pub fn for_coordinates(coords: &Coordinates) -> Self {
        Self {
            group_id: Some(coords.group.clone()),
            artifact_id: Some(coords.artifact.clone()),
            ..Default::default()
        }
    }

    pub fn has_version(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    /// Record `version` as the newest release. Returns `false` when it was
    /// already listed.
    pub fn add_version(&mut self, version: &str) -> bool {
        let added = !self.has_version(version);
        if added {
            self.versions.push(version.to_string());
        }
        self.latest = Some(version.to_string());
        self.release = Some(version.to_string());
        self.last_updated = Some(chrono::Utc::now().format("%Y%m%d%H%M%S").to_string());
        added
    }
}

/// Parse an artifact-level `maven-metadata.xml` that lists available versions.
pub fn parse_metadata(xml: &str) -> FerryResult<MavenMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut meta = MavenMetadata::default();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
                text_buf.clear();
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(_)) => {
                let ctx = path.join(">");

                match ctx.as_str() {
                    "metadata>groupId" => meta.group_id = Some(text_buf.clone()),
                    "metadata>artifactId" => meta.artifact_id = Some(text_buf.clone()),
                    "metadata>versioning>latest" => meta.latest = Some(text_buf.clone()),
                    "metadata>versioning>release" => meta.release = Some(text_buf.clone()),
                    "metadata>versioning>lastUpdated" => {
                        meta.last_updated = Some(text_buf.clone());
                    }
                    "metadata>versioning>versions>version" => {
                        meta.versions.push(text_buf.clone());
                    }
                    _ => {}
                }

                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FerryError::Generic {
                    message: format!("Failed to parse maven-metadata.xml: {e}"),
                });
            }
            _ => {}
        }
    }

    Ok(meta)
}

/// Serialize metadata in the layout Maven itself writes.
pub fn render_metadata(meta: &MavenMetadata) -> FerryResult<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;
    start(&mut writer, "metadata")?;
    optional_text(&mut writer, "groupId", &meta.group_id)?;
    optional_text(&mut writer, "artifactId", &meta.artifact_id)?;

    start(&mut writer, "versioning")?;
    optional_text(&mut writer, "latest", &meta.latest)?;
    optional_text(&mut writer, "release", &meta.release)?;
    start(&mut writer, "versions")?;
    for version in &meta.versions {
        writer
            .create_element("version")
            .write_text_content(BytesText::new(version))
            .map_err(xml_err)?;
    }
    end(&mut writer, "versions")?;
    optional_text(&mut writer, "lastUpdated", &meta.last_updated)?;
    end(&mut writer, "versioning")?;
    end(&mut writer, "metadata")?;

    let mut xml = String::from_utf8(writer.into_inner().into_inner()).map_err(xml_err)?;
    xml.push('\n');
    Ok(xml)
}

fn start<W: std::io::Write>(writer: &mut Writer<W>, tag: &str) -> FerryResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .map_err(xml_err)?;
    Ok(())
}

fn end<W: std::io::Write>(writer: &mut Writer<W>, tag: &str) -> FerryResult<()> {
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(xml_err)?;
    Ok(())
}

fn optional_text<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &Option<String>,
) -> FerryResult<()> {
    if let Some(value) = value {
        writer
            .create_element(tag)
            .write_text_content(BytesText::new(value))
            .map_err(xml_err)?;
    }
    Ok(())
}

fn xml_err(e: impl std::fmt::Display) -> FerryError {
    FerryError::Generic {
        message: format!("Failed to write maven-metadata.xml: {e}"),
    }
}

/// Whether `coords.version` is already listed in the release repository.
///
/// A missing `maven-metadata.xml` means nothing was released yet.
pub async fn is_released(
    client: &Client,
    release_url: &str,
    coords: &Coordinates,
    credentials: Option<&RepositoryCredentials>,
) -> FerryResult<bool> {
    let url = repository::metadata_url(release_url, coords);
    tracing::debug!("Checking released versions at {url}");
    match download::download_text(client, &url, credentials).await? {
        Some(xml) => Ok(parse_metadata(&xml)?.has_version(&coords.version)),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTRAL_METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>io.example</groupId>
  <artifactId>lib</artifactId>
  <versioning>
    <latest>1.1.0</latest>
    <release>1.1.0</release>
    <versions>
      <version>0.9.0</version>
      <version>1.0.0</version>
      <version>1.1.0</version>
    </versions>
    <lastUpdated>20240101120000</lastUpdated>
  </versioning>
</metadata>"#;

    #[test]
    fn parse_artifact_metadata() {
        let meta = parse_metadata(CENTRAL_METADATA).unwrap();
        assert_eq!(meta.group_id.as_deref(), Some("io.example"));
        assert_eq!(meta.artifact_id.as_deref(), Some("lib"));
        assert_eq!(meta.release.as_deref(), Some("1.1.0"));
        assert_eq!(meta.versions, vec!["0.9.0", "1.0.0", "1.1.0"]);
        assert_eq!(meta.last_updated.as_deref(), Some("20240101120000"));
        assert!(meta.has_version("1.0.0"));
        assert!(!meta.has_version("2.0.0"));
    }

    #[test]
    fn rendered_metadata_parses_back() {
        let mut meta = parse_metadata(CENTRAL_METADATA).unwrap();
        assert!(meta.add_version("1.2.0"));
        let xml = render_metadata(&meta).unwrap();
        assert_eq!(parse_metadata(&xml).unwrap(), meta);
    }

    #[test]
    fn add_existing_version_keeps_list() {
        let coords = Coordinates::new("io.example", "lib", "1.0.0");
        let mut meta = MavenMetadata::for_coordinates(&coords);
        assert!(meta.add_version("1.0.0"));
        assert!(!meta.add_version("1.0.0"));
        assert_eq!(meta.versions, vec!["1.0.0"]);
        assert_eq!(meta.latest.as_deref(), Some("1.0.0"));
        assert_eq!(meta.last_updated.as_ref().map(String::len), Some(14));
    }
}
