use super::inject::default_output;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use livepage_dom::Document;
use livepage_editor::replay::replay as replay_edits;
use livepage_editor::ui::HIGHLIGHT_CLASS;
use livepage_editor::{
    EditorSession, FileStorage, MemoryFiles, PersistenceStore, ReplayReport, StaticLayout,
};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use url::Url;

const BAKED_SUFFIX: &str = "-baked";

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// HTML document the edits were made on
    pub input: PathBuf,

    /// Persisted storage file (JSON object of storage keys)
    #[arg(long)]
    pub store: PathBuf,

    /// Where to write the baked document (defaults to <input>-baked.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Base URL for resolving relative image sources (overrides <base href>)
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Apply every stored edit to `html` and serialize the result.
///
/// Runs the same replay pass the overlay runs on load, without attaching
/// any editing controls.
pub fn bake(
    html: &str,
    mut store: PersistenceStore,
    base_url: Option<Url>,
) -> (String, ReplayReport) {
    let mut doc = Document::parse(html);
    if base_url.is_some() {
        doc.set_base_url(base_url);
    }
    store.load();

    let mut session = EditorSession::new(
        doc,
        Box::new(StaticLayout::new()),
        store,
        Box::new(MemoryFiles::new()),
    );
    let report = replay_edits(&mut session);

    let mut doc = session.doc;
    // Highlight overlays are installed with the session; they are not page content
    let selector = format!(".{}", HIGHLIGHT_CLASS);
    for node in doc.query_selector_all(&selector).unwrap_or_default() {
        doc.detach(node);
    }
    (doc.to_html(), report)
}

pub fn replay(args: ReplayArgs, _cwd: &str) -> Result<()> {
    if !args.store.exists() {
        return Err(anyhow!("Store file does not exist: {}", args.store.display()));
    }
    let base_url = args
        .base_url
        .as_deref()
        .map(Url::parse)
        .transpose()
        .context("Invalid --base-url")?;

    let html = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let storage = FileStorage::open(&args.store)?;
    let (baked, report) = bake(&html, PersistenceStore::new(Box::new(storage)), base_url);

    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.input, BAKED_SUFFIX));
    fs::write(&output, baked).with_context(|| format!("Failed to write {}", output.display()))?;
    info!(applied = report.applied, skipped = report.skipped, "replay finished");

    println!("{} Baked stored edits into page", "✓".green());
    println!("  Source: {}", args.input.display());
    println!("  Store:  {}", args.store.display());
    println!("  Baked:  {}", output.display().to_string().bright_white());
    println!();
    if report.skipped == 0 {
        println!("{} edits applied", report.applied.to_string().green());
    } else {
        println!(
            "{} edits applied, {} skipped (no matching element)",
            report.applied.to_string().green(),
            report.skipped.to_string().yellow()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use livepage_editor::MemoryStorage;

    fn store(entries: &[(&str, &str)]) -> PersistenceStore {
        let storage = entries
            .iter()
            .fold(MemoryStorage::new(), |s, (k, v)| s.with_entry(k, v));
        PersistenceStore::new(Box::new(storage))
    }

    #[test]
    fn test_bake_applies_text_edits_without_overlay_residue() {
        let html = "<html><head></head><body><p>old</p><p>keep</p></body></html>";
        let (baked, report) = bake(
            html,
            store(&[(
                "editedTexts",
                r#"{"body > p:nth-of-type(1)": "new <b>text</b>", "body > div#gone": "x"}"#,
            )]),
            None,
        );

        assert_eq!(
            report,
            ReplayReport {
                applied: 1,
                skipped: 1
            }
        );
        assert_eq!(
            baked,
            "<html><head></head><body><p>new <b>text</b></p><p>keep</p></body></html>"
        );
    }

    #[test]
    fn test_bake_uses_base_url_override_for_images() {
        let html = "<html><body><img src=\"img/a.png\"></body></html>";
        let entries = [(
            "editedImages",
            r#"{"https://cdn.example.com/img/a.png": "data:image/png;base64,eA=="}"#,
        )];

        let (_, without) = bake(html, store(&entries), None);
        assert_eq!(without.applied, 0);

        let base = Url::parse("https://cdn.example.com/").unwrap();
        let (baked, with) = bake(html, store(&entries), Some(base));
        assert_eq!(with.applied, 1);
        assert!(baked.contains("src=\"data:image/png;base64,eA==\""));
    }

    #[test]
    fn test_replay_writes_default_baked_path() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.html");
        let store_path = dir.path().join("store.json");
        fs::write(&input, "<html><body><h1>a</h1></body></html>").unwrap();
        fs::write(
            &store_path,
            r#"{"editedTexts": "{\"body > h1:nth-of-type(1)\": \"b\"}"}"#,
        )
        .unwrap();

        let args = ReplayArgs {
            input: input.clone(),
            store: store_path,
            output: None,
            base_url: None,
        };
        replay(args, dir.path().to_str().unwrap()).unwrap();

        let baked = fs::read_to_string(dir.path().join("page-baked.html")).unwrap();
        assert_eq!(baked, "<html><body><h1>b</h1></body></html>");
    }

    #[test]
    fn test_replay_rejects_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let args = ReplayArgs {
            input: dir.path().join("page.html"),
            store: dir.path().join("missing.json"),
            output: None,
            base_url: None,
        };
        assert!(replay(args, ".").is_err());
    }
}
