//! Walkthrough of a template authoring session against the in-memory editor
//!
//! This example shows:
//! - Loading a builder configuration from disk
//! - Opening the field menu with the trigger and filtering it
//! - Inserting, navigating and deleting fields
//! - Exporting the finished template

use anyhow::Context;
use std::sync::Arc;
use stencil_builder::{MemoryEditor, MemoryEditorFactory, TemplateBuilder};
use stencil_core::{BuilderConfig, BuilderEvent, ExportOptions, FieldDefinition, ListPosition};
use tempfile::tempdir;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Template Builder Walkthrough ===\n");

    // Write a configuration file and load it back
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("builder.json");

    let mut config = BuilderConfig::new();
    config.fields.available = vec![
        FieldDefinition::new("customer", "Customer Name").with_category("Contact"),
        FieldDefinition::new("invoice_date", "Invoice Date").with_category("Invoice"),
        FieldDefinition::new("total", "Total Amount")
            .with_category("Invoice")
            .with_default_value("$0.00"),
    ];
    config.list.position = Some(ListPosition::Right);
    config.save_to_file(&config_path)?;

    let config = BuilderConfig::from_file(&config_path)?;
    let report = config.validate().context("configuration is invalid")?;
    println!("✓ Loaded config with {} warnings", report.warnings.len());

    // Attach the editor
    let mut builder = TemplateBuilder::new(config);
    builder.subscribe(Arc::new(|event: &BuilderEvent| {
        println!("  event: {}", event.description());
    }));

    let editor = Arc::new(MemoryEditor::with_text("Bill to: "));
    let factory = MemoryEditorFactory::new(editor.clone());
    if !builder.initialize(&factory, "#editor").await {
        anyhow::bail!("editor failed to initialize");
    }

    // Type the trigger and a query; the builder follows the editor's updates
    editor.type_text("{{");
    builder.next_update().await;
    editor.type_text("cust");
    builder.next_update().await;

    let menu = builder.menu_view();
    for group in &menu.groups {
        println!("  menu: {}", group.header());
    }

    let choice = builder
        .filtered_fields()
        .first()
        .cloned()
        .context("no menu entry matched")?;
    builder.select_menu_field(choice).await;
    println!("✓ Document now reads: {:?}", editor.text());

    // A second field on the next line
    builder.poll_updates();
    editor.type_text("\nTotal: {{");
    builder.poll_updates();
    editor.type_text("total");
    builder.poll_updates();
    if let Some(total) = builder.filtered_fields().first().cloned() {
        builder.select_menu_field(total).await;
    }

    // Navigate and inspect the field list
    builder.next_field();
    builder.next_field();
    let list = builder.list_view();
    println!("\n{}", list.title);
    for row in &list.rows {
        let marker = if row.selected { ">" } else { " " };
        println!("{} {} ({})", marker, row.field.alias, row.field.id);
    }

    // Export
    let export = builder
        .export_template(ExportOptions {
            file_name: "invoice-template".to_string(),
            trigger_download: false,
        })
        .await?;
    println!(
        "\n✓ Exported {} ({} bytes, {} fields)",
        export.file_name,
        export.document.len(),
        export.fields.len()
    );

    builder.teardown();
    println!("✓ Editor destroyed: {}", editor.is_destroyed());

    Ok(())
}
