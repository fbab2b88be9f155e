//! POM generation for publications that do not ship their own, and a reader
//! for the project-level fields used when validating a staged POM.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use ferry_core::artifact::{Artifact, Classifier};
use ferry_core::manifest::PublicationMetadata;
use ferry_util::errors::{FerryError, FerryResult};

const POM_NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const POM_SCHEMA: &str =
    "http://maven.apache.org/POM/4.0.0 https://maven.apache.org/xsd/maven-4.0.0.xsd";

/// Project-level fields of a POM.
#[derive(Debug, Clone, Default)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub licenses: Vec<PomLicense>,
}

/// A license declared in a POM file.
#[derive(Debug, Clone)]
pub struct PomLicense {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// Render a minimal POM for the `[publication]` section.
pub fn generate_pom(meta: &PublicationMetadata) -> FerryResult<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut project = BytesStart::new("project");
    project.push_attribute(("xmlns", POM_NAMESPACE));
    project.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    project.push_attribute(("xsi:schemaLocation", POM_SCHEMA));
    writer.write_event(Event::Start(project)).map_err(xml_err)?;

    text_element(&mut writer, "modelVersion", "4.0.0")?;
    text_element(&mut writer, "groupId", meta.group.trim())?;
    text_element(&mut writer, "artifactId", meta.artifact.trim())?;
    text_element(&mut writer, "version", meta.version.trim())?;
    text_element(&mut writer, "packaging", &meta.packaging)?;

    for (tag, value) in [
        ("name", &meta.name),
        ("description", &meta.description),
        ("url", &meta.url),
    ] {
        if let Some(value) = value {
            text_element(&mut writer, tag, value)?;
        }
    }

    if let Some(license) = &meta.license {
        writer
            .write_event(Event::Start(BytesStart::new("licenses")))
            .map_err(xml_err)?;
        writer
            .write_event(Event::Start(BytesStart::new("license")))
            .map_err(xml_err)?;
        text_element(&mut writer, "name", license)?;
        writer
            .write_event(Event::End(BytesEnd::new("license")))
            .map_err(xml_err)?;
        writer
            .write_event(Event::End(BytesEnd::new("licenses")))
            .map_err(xml_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("project")))
        .map_err(xml_err)?;

    let mut xml = String::from_utf8(writer.into_inner().into_inner()).map_err(xml_err)?;
    xml.push('\n');
    Ok(xml)
}

/// The generated POM as a `pom` artifact ready to join the publication.
pub fn pom_artifact(meta: &PublicationMetadata) -> FerryResult<Artifact> {
    let xml = generate_pom(meta)?;
    tracing::debug!("Generated POM for {}:{}", meta.group, meta.artifact);
    Ok(Artifact::new(Classifier::Pom, "pom", xml.into_bytes()))
}

fn text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &str,
) -> FerryResult<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(value))
        .map_err(xml_err)?;
    Ok(())
}

fn xml_err(e: impl std::fmt::Display) -> FerryError {
    FerryError::Generic {
        message: format!("Failed to write POM XML: {e}"),
    }
}

/// Parse the project-level fields of a POM.
pub fn parse_pom(xml: &str) -> FerryResult<Pom> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pom = Pom::default();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();
    let mut current_license: Option<PomLicense> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
                text_buf.clear();
                if path.join(">") == "project>licenses>license" {
                    current_license = Some(PomLicense {
                        name: None,
                        url: None,
                    });
                }
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(_)) => {
                let ctx = path.join(">");

                match ctx.as_str() {
                    "project>groupId" => pom.group_id = Some(text_buf.clone()),
                    "project>artifactId" => pom.artifact_id = Some(text_buf.clone()),
                    "project>version" => pom.version = Some(text_buf.clone()),
                    "project>packaging" => pom.packaging = Some(text_buf.clone()),
                    "project>name" => pom.name = Some(text_buf.clone()),
                    "project>description" => pom.description = Some(text_buf.clone()),
                    "project>url" => pom.url = Some(text_buf.clone()),
                    "project>licenses>license>name" => {
                        if let Some(license) = current_license.as_mut() {
                            license.name = Some(text_buf.clone());
                        }
                    }
                    "project>licenses>license>url" => {
                        if let Some(license) = current_license.as_mut() {
                            license.url = Some(text_buf.clone());
                        }
                    }
                    "project>licenses>license" => {
                        if let Some(license) = current_license.take() {
                            pom.licenses.push(license);
                        }
                    }
                    _ => {}
                }

                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FerryError::Generic {
                    message: format!("Failed to parse POM XML: {e}"),
                });
            }
            _ => {}
        }
    }

    Ok(pom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> PublicationMetadata {
        PublicationMetadata {
            group: "io.example".to_string(),
            artifact: "lib".to_string(),
            version: "1.0.0".to_string(),
            packaging: "jar".to_string(),
            name: Some("Example <lib> & friends".to_string()),
            description: None,
            url: Some("https://example.io".to_string()),
            license: Some("Apache-2.0".to_string()),
        }
    }

    #[test]
    fn generated_pom_parses_back() {
        let xml = generate_pom(&metadata()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<modelVersion>4.0.0</modelVersion>"));

        let pom = parse_pom(&xml).unwrap();
        assert_eq!(pom.group_id.as_deref(), Some("io.example"));
        assert_eq!(pom.artifact_id.as_deref(), Some("lib"));
        assert_eq!(pom.version.as_deref(), Some("1.0.0"));
        assert_eq!(pom.packaging.as_deref(), Some("jar"));
        assert_eq!(pom.url.as_deref(), Some("https://example.io"));
        assert_eq!(pom.licenses.len(), 1);
        assert_eq!(pom.licenses[0].name.as_deref(), Some("Apache-2.0"));
    }

    #[test]
    fn text_is_escaped() {
        let xml = generate_pom(&metadata()).unwrap();
        assert!(xml.contains("Example &lt;lib&gt; &amp; friends"));
        let pom = parse_pom(&xml).unwrap();
        assert_eq!(pom.name.as_deref(), Some("Example <lib> & friends"));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let mut meta = metadata();
        meta.name = None;
        meta.url = None;
        meta.license = None;
        let xml = generate_pom(&meta).unwrap();
        assert!(!xml.contains("<name>"));
        assert!(!xml.contains("<licenses>"));
        assert!(!xml.contains("<description>"));
    }

    #[test]
    fn pom_artifact_has_pom_classifier() {
        let artifact = pom_artifact(&metadata()).unwrap();
        assert_eq!(artifact.classifier, Classifier::Pom);
        assert_eq!(artifact.extension, "pom");
        assert!(!artifact.is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_pom("<project><groupId>x</artifactId></project>").is_err());
    }
}
