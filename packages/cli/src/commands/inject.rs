use crate::config::Config;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::Args;
use colored::Colorize;
use livepage_dom::{parser::parse_fragment, Document, DomError, NodeId};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const STYLES_TEMPLATE: &str = include_str!("../../templates/editor-styles.html");
const ELEMENTS_TEMPLATE: &str = include_str!("../../templates/editor-elements.html");
const SCRIPT_TEMPLATE: &str = include_str!("../../templates/editor-script.html");
const INLINE_SCRIPT_TEMPLATE: &str = include_str!("../../templates/editor-script-inline.html");
const BOOT_TEMPLATE: &str = include_str!("../../templates/editor-boot.html");

const STYLES_FILE: &str = "editor-styles.html";
const ELEMENTS_FILE: &str = "editor-elements.html";
const SCRIPT_FILE: &str = "editor-script.html";
const INLINE_SCRIPT_FILE: &str = "editor-script-inline.html";
const BOOT_FILE: &str = "editor-boot.html";

/// Placeholders filled in from the overlay bundle
const SCRIPT_SRC_PLACEHOLDER: &str = "{{scriptSrc}}";
const BUNDLE_JS_PLACEHOLDER: &str = "{{bundleJs}}";
const WASM_SOURCE_PLACEHOLDER: &str = "{{wasmSource}}";

/// File names `wasm-pack build packages/wasm --target no-modules` writes
pub const BUNDLE_JS_FILE: &str = "livepage_wasm.js";
pub const BUNDLE_WASM_FILE: &str = "livepage_wasm_bg.wasm";

/// Marks a document that already carries the overlay
const STYLE_BLOCK_ID: &str = "editor-styles";

#[derive(Debug, Args)]
pub struct InjectArgs {
    /// HTML document to make editable
    pub input: PathBuf,

    /// Where to write the editable copy (defaults to <input><suffix>.<ext>)
    pub output: Option<PathBuf>,

    /// Suffix for the default output path (overrides config)
    #[arg(short, long)]
    pub suffix: Option<String>,

    /// Overlay glue script URL for the injected script tag (overrides config)
    #[arg(long)]
    pub script_src: Option<String>,

    /// Overlay wasm module URL (overrides config)
    #[arg(long)]
    pub wasm_src: Option<String>,

    /// wasm-pack output directory to embed, making the page self-contained
    /// (overrides config)
    #[arg(long)]
    pub bundle: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum InjectError {
    #[error("Failed to read template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read overlay bundle {path}: {source}")]
    Bundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build document skeleton: {0}")]
    Dom(#[from] DomError),
}

/// Where the page gets the overlay code from
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayBundle {
    /// Glue script and wasm module served next to the page
    Linked { script_src: String, wasm_src: String },
    /// Both embedded in the page
    Inline { glue: String, wasm: Vec<u8> },
}

impl OverlayBundle {
    pub fn linked(script_src: impl Into<String>, wasm_src: impl Into<String>) -> Self {
        OverlayBundle::Linked {
            script_src: script_src.into(),
            wasm_src: wasm_src.into(),
        }
    }

    /// Load a `wasm-pack --target no-modules` output directory
    pub fn read(dir: &Path) -> Result<Self, InjectError> {
        let glue_path = dir.join(BUNDLE_JS_FILE);
        let glue = fs::read_to_string(&glue_path).map_err(|source| InjectError::Bundle {
            path: glue_path,
            source,
        })?;
        let wasm_path = dir.join(BUNDLE_WASM_FILE);
        let wasm = fs::read(&wasm_path).map_err(|source| InjectError::Bundle {
            path: wasm_path,
            source,
        })?;
        Ok(OverlayBundle::Inline { glue, wasm })
    }
}

/// The overlay fragments, appended in order: styles, markup, script, boot
#[derive(Debug, Clone, PartialEq)]
pub struct Templates {
    pub styles: String,
    pub elements: String,
    pub script: String,
    pub inline_script: String,
    pub boot: String,
}

impl Templates {
    pub fn builtin() -> Self {
        Self {
            styles: STYLES_TEMPLATE.to_string(),
            elements: ELEMENTS_TEMPLATE.to_string(),
            script: SCRIPT_TEMPLATE.to_string(),
            inline_script: INLINE_SCRIPT_TEMPLATE.to_string(),
            boot: BOOT_TEMPLATE.to_string(),
        }
    }

    /// Built-in templates, with any file present in `dir` taking precedence
    pub fn load(dir: Option<&Path>) -> Result<Self, InjectError> {
        let mut templates = Self::builtin();
        let Some(dir) = dir else {
            return Ok(templates);
        };

        for (file, slot) in [
            (STYLES_FILE, &mut templates.styles),
            (ELEMENTS_FILE, &mut templates.elements),
            (SCRIPT_FILE, &mut templates.script),
            (INLINE_SCRIPT_FILE, &mut templates.inline_script),
            (BOOT_FILE, &mut templates.boot),
        ] {
            let path = dir.join(file);
            if !path.exists() {
                continue;
            }
            *slot = fs::read_to_string(&path).map_err(|source| InjectError::Template {
                path: path.clone(),
                source,
            })?;
            debug!(template = %path.display(), "using template override");
        }
        Ok(templates)
    }

    /// The script element and the boot element for `bundle`
    fn scripts_for(&self, bundle: &OverlayBundle) -> (String, String) {
        match bundle {
            OverlayBundle::Linked {
                script_src,
                wasm_src,
            } => (
                self.script.replace(SCRIPT_SRC_PLACEHOLDER, script_src),
                self.boot
                    .replace(WASM_SOURCE_PLACEHOLDER, &js_string(wasm_src)),
            ),
            OverlayBundle::Inline { glue, wasm } => {
                let bytes = format!(
                    "Uint8Array.from(atob({}), function (c) {{ return c.charCodeAt(0); }})",
                    js_string(&STANDARD.encode(wasm))
                );
                (
                    self.inline_script
                        .replace(BUNDLE_JS_PLACEHOLDER, &escape_script(glue)),
                    self.boot.replace(WASM_SOURCE_PLACEHOLDER, &bytes),
                )
            }
        }
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Keep embedded code from closing its `<script>` element early
pub fn escape_script(js: &str) -> String {
    let mut out = String::with_capacity(js.len());
    let mut rest = js;
    while let Some(at) = rest.find("</") {
        out.push_str(&rest[..at]);
        let tail = &rest[at + 2..];
        let closes = tail
            .get(..6)
            .map(|word| word.eq_ignore_ascii_case("script"))
            .unwrap_or(false);
        out.push_str(if closes { "<\\/" } else { "</" });
        rest = tail;
    }
    out.push_str(rest);
    out.replace("<!--", "<\\!--")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    Injected,
    AlreadyEditable,
}

/// Append the overlay to `doc`, creating `<head>`/`<body>` first if needed.
///
/// Documents that already contain the overlay style block are left alone.
pub fn inject_overlay(
    doc: &mut Document,
    templates: &Templates,
    bundle: &OverlayBundle,
) -> Result<Injection, InjectError> {
    if doc.get_element_by_id(STYLE_BLOCK_ID).is_some() {
        return Ok(Injection::AlreadyEditable);
    }

    let (head, body) = ensure_skeleton(doc)?;
    let (script, boot) = templates.scripts_for(bundle);
    parse_fragment(doc, head, &templates.styles);
    parse_fragment(doc, body, &templates.elements);
    parse_fragment(doc, body, &script);
    parse_fragment(doc, body, &boot);
    Ok(Injection::Injected)
}

/// Find or create `<head>` and `<body>`.
///
/// A missing `<head>` becomes the first child of `<html>`, a missing
/// `<body>` its last. A missing `<html>` is appended to the document.
fn ensure_skeleton(doc: &mut Document) -> Result<(NodeId, NodeId), DomError> {
    let html = match doc.first_element_by_tag("html") {
        Some(html) => html,
        None => {
            let html = doc.create_element("html");
            let root = doc.root();
            doc.append_child(root, html)?;
            debug!("created <html>");
            html
        }
    };

    let head = match doc.head() {
        Some(head) => head,
        None => {
            let head = doc.create_element("head");
            match doc.children(html).first().copied() {
                Some(first) => doc.insert_before(first, head)?,
                None => doc.append_child(html, head)?,
            }
            debug!("created <head>");
            head
        }
    };

    let body = match doc.body() {
        Some(body) => body,
        None => {
            let body = doc.create_element("body");
            doc.append_child(html, body)?;
            debug!("created <body>");
            body
        }
    };

    Ok((head, body))
}

/// `dir/page.html` + `-editable` -> `dir/page-editable.html`
pub fn default_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    input.with_file_name(name)
}

pub fn inject(args: InjectArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let suffix = args.suffix.unwrap_or(config.suffix.clone());
    let templates = Templates::load(config.get_template_dir(cwd).as_deref())?;
    let bundle = match args.bundle.or_else(|| config.get_bundle_dir(cwd)) {
        Some(dir) => OverlayBundle::read(&dir)?,
        None => OverlayBundle::linked(
            args.script_src.unwrap_or(config.script_src.clone()),
            args.wasm_src.unwrap_or(config.wasm_src.clone()),
        ),
    };

    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.input, &suffix));

    let html = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let mut doc = Document::parse(&html);

    let injection = inject_overlay(&mut doc, &templates, &bundle)?;
    info!(input = %args.input.display(), ?injection, "overlay injection");

    fs::write(&output, doc.to_html())
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if injection == Injection::AlreadyEditable {
        println!(
            "{} {} is already editable; copied unchanged",
            "⚠️".yellow(),
            args.input.display()
        );
    } else {
        println!("{} Generated editable page", "✓".green());
    }
    println!("  Source:   {}", args.input.display());
    println!("  Editable: {}", output.display().to_string().bright_white());
    if injection == Injection::Injected {
        match &bundle {
            OverlayBundle::Inline { wasm, .. } => {
                println!("  Overlay:  embedded ({} KiB of wasm)", wasm.len() / 1024)
            }
            OverlayBundle::Linked {
                script_src,
                wasm_src,
            } => println!(
                "  Overlay:  {} + {} {}",
                script_src,
                wasm_src,
                "(serve both next to the page)".dimmed()
            ),
        }
    }
    println!();
    println!("Open the editable page in a browser to use:");
    println!("  1. Inspect: view an element's tag, id, classes and size");
    println!("  2. Region edit: duplicate or remove page sections");
    println!("  3. Text edit: edit text in place");
    println!("  4. Image edit: upload images to replace existing ones");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked() -> OverlayBundle {
        OverlayBundle::linked("overlay.js", "overlay_bg.wasm")
    }

    fn inject_str(html: &str) -> (Injection, Document) {
        let mut doc = Document::parse(html);
        let injection = inject_overlay(&mut doc, &Templates::builtin(), &linked()).unwrap();
        (injection, doc)
    }

    #[test]
    fn test_default_output_inserts_suffix_before_extension() {
        assert_eq!(
            default_output(Path::new("site/index.html"), "-editable"),
            PathBuf::from("site/index-editable.html")
        );
        assert_eq!(
            default_output(Path::new("page"), "-baked"),
            PathBuf::from("page-baked")
        );
    }

    #[test]
    fn test_appends_overlay_in_order() {
        let (injection, doc) =
            inject_str("<html><head><title>t</title></head><body><p>x</p></body></html>");
        assert_eq!(injection, Injection::Injected);

        let head = doc.head().unwrap();
        let style = doc.get_element_by_id("editor-styles").unwrap();
        assert_eq!(doc.parent(style), Some(head));

        let body = doc.body().unwrap();
        let children = doc.element_children(body);
        let ids: Vec<_> = children
            .iter()
            .map(|c| doc.attr(*c, "id").unwrap_or(""))
            .collect();
        assert_eq!(
            ids,
            vec![
                "",
                "elementInspector",
                "divEditorButtons",
                "imageUploadModal",
                "editor-script",
                "editor-boot"
            ]
        );

        let script = doc.get_element_by_id("editor-script").unwrap();
        assert_eq!(doc.attr(script, "src"), Some("overlay.js"));
        let boot = doc.get_element_by_id("editor-boot").unwrap();
        assert_eq!(
            doc.inner_html(boot),
            "wasm_bindgen({ module_or_path: \"overlay_bg.wasm\" });"
        );
    }

    #[test]
    fn test_overlay_markup_has_every_control() {
        let (_, doc) = inject_str("<html><head></head><body></body></html>");
        for id in [
            "elementInspector",
            "divEditorButtons",
            "editDuplicateBtn",
            "editRemoveBtn",
            "imageUploadModal",
            "imageUploadDescription",
            "uploadTypeToggle",
            "imageFileInput",
            "multipleImageFileInput",
            "imagePreview",
            "multipleImagePreview",
            "cancelImageUpload",
            "applyImageUpload",
        ] {
            assert!(doc.get_element_by_id(id).is_some(), "missing #{}", id);
        }
        let radios = doc.query_selector_all("input[name=\"uploadType\"]").unwrap();
        assert_eq!(radios.len(), 2);
    }

    #[test]
    fn test_creates_missing_head_and_body() {
        let (_, doc) = inject_str("<html><p>loose</p></html>");
        let html = doc.first_element_by_tag("html").unwrap();
        let head = doc.head().unwrap();
        let body = doc.body().unwrap();
        assert_eq!(doc.element_children(html).first(), Some(&head));
        assert_eq!(doc.element_children(html).last(), Some(&body));
        assert!(doc.get_element_by_id("editor-styles").is_some());
    }

    #[test]
    fn test_creates_html_for_bare_fragment() {
        let (_, doc) = inject_str("");
        let html = doc.document_element().unwrap();
        assert!(doc.is_tag(html, "html"));
        assert!(doc.head().is_some());
        assert!(doc.body().is_some());
    }

    #[test]
    fn test_injection_is_idempotent() {
        let (_, doc) = inject_str("<html><head></head><body></body></html>");
        let once = doc.to_html();

        let mut again = Document::parse(&once);
        let injection = inject_overlay(&mut again, &Templates::builtin(), &linked()).unwrap();
        assert_eq!(injection, Injection::AlreadyEditable);
        for selector in [
            "#editor-styles",
            "#imageUploadModal",
            "#editor-script",
            "#editor-boot",
        ] {
            assert_eq!(again.query_selector_all(selector).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_template_dir_overrides_single_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SCRIPT_FILE),
            "<script id=\"editor-script\" src=\"{{scriptSrc}}?v=2\"></script>",
        )
        .unwrap();

        let templates = Templates::load(Some(dir.path())).unwrap();
        assert_eq!(templates.styles, STYLES_TEMPLATE);
        assert_eq!(templates.boot, BOOT_TEMPLATE);
        let (script, _) = templates.scripts_for(&OverlayBundle::linked("a.js", "a.wasm"));
        assert!(script.contains("src=\"a.js?v=2\""));
    }

    #[test]
    fn test_escape_script_breaks_closing_tags_only() {
        assert_eq!(
            escape_script("let t = \"</SCRIPT>\"; a </b; x<!--y"),
            "let t = \"<\\/SCRIPT>\"; a </b; x<\\!--y"
        );
        assert_eq!(escape_script("ends with </scr"), "ends with </scr");
        assert_eq!(escape_script("é</script>"), "é<\\/script>");
    }

    #[test]
    fn test_bundle_dir_embeds_glue_and_module() {
        let dir = tempfile::tempdir().unwrap();
        let glue = "let wasm_bindgen = (function () { return \"</script>\"; })();";
        fs::write(dir.path().join(BUNDLE_JS_FILE), glue).unwrap();
        fs::write(dir.path().join(BUNDLE_WASM_FILE), b"\0asm").unwrap();
        let bundle = OverlayBundle::read(dir.path()).unwrap();

        let mut doc = Document::parse("<html><head></head><body><p>x</p></body></html>");
        inject_overlay(&mut doc, &Templates::builtin(), &bundle).unwrap();

        // The written page parses back with the whole glue inside one script
        let page = Document::parse(&doc.to_html());
        let script = page.get_element_by_id("editor-script").unwrap();
        assert!(!page.has_attr(script, "src"));
        assert_eq!(page.inner_html(script), escape_script(glue));
        let boot = page.get_element_by_id("editor-boot").unwrap();
        assert!(page.inner_html(boot).contains("atob(\"AGFzbQ==\")"));
        assert_eq!(page.query_selector_all("script").unwrap().len(), 2);
    }

    #[test]
    fn test_missing_bundle_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = OverlayBundle::read(dir.path()).unwrap_err();
        assert!(err.to_string().contains(BUNDLE_JS_FILE));
    }
}
