//! Runtime template registry loaded once at startup.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use tera::Tera;
use thiserror::Error;
use tracing::debug;

const TEMPLATE_EXTENSION: &str = "html";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to scan template directory `{path}`")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to compile template `{name}`")]
    Compile {
        name: String,
        #[source]
        source: tera::Error,
    },
    #[error("unknown template `{0}`")]
    Unknown(String),
    #[error("failed to render template `{name}`")]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },
    #[error("failed to build context for template `{name}`")]
    Context {
        name: String,
        #[source]
        source: tera::Error,
    },
}

/// Immutable set of templates compiled from one directory scan.
///
/// Every `*.html` file directly in the directory is registered under its file
/// stem, so `list.html` renders as `list`. A file that fails to compile makes
/// the whole load fail.
#[derive(Debug)]
pub struct TemplateRegistry {
    engine: Tera,
    names: BTreeSet<String>,
}

impl TemplateRegistry {
    pub fn load(directory: &Path) -> Result<Self, TemplateError> {
        let scan_error = |source| TemplateError::Scan {
            path: directory.to_path_buf(),
            source,
        };

        let mut assets = Vec::new();
        for entry in std::fs::read_dir(directory).map_err(scan_error)? {
            let entry = entry.map_err(scan_error)?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            assets.push((stem.to_string(), path));
        }
        assets.sort();

        let mut engine = Tera::default();
        let mut names = BTreeSet::new();
        for (name, path) in assets {
            // Registered under the full filename so Tera's suffix-based HTML
            // autoescaping stays active for every template.
            engine
                .add_template_file(&path, Some(&format!("{name}.{TEMPLATE_EXTENSION}")))
                .map_err(|source| TemplateError::Compile {
                    name: name.clone(),
                    source,
                })?;
            debug!(
                target = "scatto::templates",
                name = %name,
                path = %path.display(),
                "compiled template",
            );
            names.insert(name);
        }

        Ok(Self { engine, names })
    }

    pub fn render(&self, name: &str, context: &tera::Context) -> Result<String, TemplateError> {
        if !self.names.contains(name) {
            return Err(TemplateError::Unknown(name.to_string()));
        }
        self.engine
            .render(&format!("{name}.{TEMPLATE_EXTENSION}"), context)
            .map_err(|source| TemplateError::Render {
                name: name.to_string(),
                source,
            })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write_template(dir: &TempDir, file: &str, body: &str) {
        std::fs::write(dir.path().join(file), body).expect("write template");
    }

    #[test]
    fn loads_html_files_by_stem() {
        let dir = TempDir::new().expect("tempdir");
        write_template(&dir, "list.html", "<ul>{{ label }}</ul>");
        write_template(&dir, "upload.html", "<form>{{ label }}</form>");
        write_template(&dir, "notes.txt", "not a template");

        let registry = TemplateRegistry::load(dir.path()).expect("load should succeed");
        assert_eq!(registry.len(), 2);

        let mut context = tera::Context::new();
        context.insert("label", "hello");
        let html = registry.render("list", &context).expect("render");
        assert_eq!(html, "<ul>hello</ul>");
    }

    #[test]
    fn unknown_template_is_an_explicit_error() {
        let dir = TempDir::new().expect("tempdir");
        write_template(&dir, "list.html", "<ul></ul>");

        let registry = TemplateRegistry::load(dir.path()).expect("load should succeed");
        let err = registry
            .render("missing", &tera::Context::new())
            .expect_err("unknown name must fail");
        assert!(matches!(err, TemplateError::Unknown(name) if name == "missing"));
    }

    #[test]
    fn rendered_values_are_html_escaped() {
        let dir = TempDir::new().expect("tempdir");
        write_template(&dir, "page.html", "{{ label }}");

        let registry = TemplateRegistry::load(dir.path()).expect("load should succeed");
        let mut context = tera::Context::new();
        context.insert("label", "<script>");

        let html = registry.render("page", &context).expect("render");
        assert_eq!(html, "&lt;script&gt;");
    }

    #[test]
    fn repeated_renders_are_identical() {
        let dir = TempDir::new().expect("tempdir");
        write_template(&dir, "page.html", "value: {{ value }}");

        let registry = TemplateRegistry::load(dir.path()).expect("load should succeed");
        let mut context = tera::Context::new();
        context.insert("value", &42);

        let first = registry.render("page", &context).expect("first render");
        let second = registry.render("page", &context).expect("second render");
        assert_eq!(first, second);
    }

    #[test]
    fn compile_failure_fails_the_whole_load() {
        let dir = TempDir::new().expect("tempdir");
        write_template(&dir, "ok.html", "fine");
        write_template(&dir, "broken.html", "{% if unclosed %}");

        let err = TemplateRegistry::load(dir.path()).expect_err("load must fail");
        assert!(matches!(err, TemplateError::Compile { name, .. } if name == "broken"));
    }

    #[test]
    fn missing_directory_is_a_scan_error() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("nope");

        let err = TemplateRegistry::load(&missing).expect_err("load must fail");
        assert!(matches!(err, TemplateError::Scan { .. }));
    }

    #[test]
    fn empty_directory_loads_no_templates() {
        let dir = TempDir::new().expect("tempdir");
        let registry = TemplateRegistry::load(dir.path()).expect("load should succeed");
        assert!(registry.is_empty());
    }
}
